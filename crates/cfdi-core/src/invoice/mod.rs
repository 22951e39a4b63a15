//! CFDI document parsing and business-rule validation.

mod parser;
pub mod rules;

pub use parser::CfdiParser;

use crate::error::ParseError;
use crate::models::invoice::Invoice;

/// Result type for parse operations.
pub type Result<T> = std::result::Result<T, ParseError>;

/// Trait for turning one raw document into an [`Invoice`].
pub trait DocumentParser {
    /// Parse a raw document. `source` identifies it in errors and reports.
    fn parse(&self, bytes: &[u8], source: &str) -> Result<Invoice>;
}
