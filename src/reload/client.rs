//! Browser side of live reload, injected into served pages.

/// Client script template; `{port}` is replaced with the WebSocket port.
const CLIENT_SCRIPT: &str = include_str!("../embed/reload.js");

/// Inject the live-reload client before the last `</body>`, or append it
/// when the page has none.
pub fn inject_client(html: &str, port: u16) -> String {
    #[allow(clippy::literal_string_with_formatting_args)]
    // `{port}` is a template placeholder, not a format arg
    let script = format!(
        "<script>{}</script>",
        CLIENT_SCRIPT.replace("{port}", &port.to_string())
    );

    match html.rfind("</body>") {
        Some(pos) => {
            let mut out = String::with_capacity(html.len() + script.len());
            out.push_str(&html[..pos]);
            out.push_str(&script);
            out.push_str(&html[pos..]);
            out
        }
        None => format!("{html}{script}"),
    }
}
