//! Rendering module for converting documents and questions to output formats.

mod json;
mod text;

pub use json::{to_json, JsonFormat};
pub use text::{questions_to_text, to_text};
