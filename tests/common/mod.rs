//! Common test utilities for media-dl process tests

#[allow(dead_code)]
pub mod fake_ytdlp;

#[allow(unused_imports)]
pub use fake_ytdlp::*;
