#![forbid(unsafe_code)]

//! Render kernel: ANSI sequences, text width, and the inline renderer.

pub mod ansi;
pub mod inline;
pub mod text_width;

pub use inline::{InlineRenderer, RendererConfig};
pub use text_width::{char_width, display_width, strip_ansi, truncate};
