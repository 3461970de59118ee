//! Path utilities shared by build, serve and watch.

pub mod category;
