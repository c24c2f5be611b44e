//! wdom HTML Parser
//!
//! Small regex-driven markup parser used by `innerHTML`. It is not an HTML5
//! parser: implied end tags come from fixed tables and raw-text elements are
//! scanned up to their literal closing tag.

mod parser;
mod tables;

pub use parser::{parse, TreeSink};

/// HTML namespace URI
pub const HTML_NAMESPACE: &str = "http://www.w3.org/1999/xhtml";

/// SVG namespace URI
pub const SVG_NAMESPACE: &str = "http://www.w3.org/2000/svg";

/// Parse error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ParseError {
    /// A raw-text element (`<script>`, `<style>`, ...) was never closed
    #[error("Close markup not found.")]
    CloseMarkupNotFound { tag: String },

    /// The open-element stack did not unwind back to the context root
    #[error("Attempting to parse invalid HTML content.")]
    InvalidContent,

    /// Parsing produced no root element
    #[error("Attempting to parse invalid HTML.")]
    InvalidHtml,

    /// Context element lives in a namespace other than HTML or SVG
    #[error("Namespace not supported: {0}")]
    UnsupportedNamespace(String),
}
