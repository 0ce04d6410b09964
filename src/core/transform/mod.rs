//! Transform/validate stage
//!
//! Per document, first failure wins:
//!
//! 1. **Validate** required fields ([`validate`])
//! 2. **Sanitize** every free-text field ([`sanitize`])
//! 3. **Normalize** categorical fields and parse addresses/ports ([`normalize`])
//! 4. **Resolve** dimension references and build the row ([`transformer`])
//!
//! Required fields (identifier, timestamp, source address, ASN, category)
//! fail the document. Optional fields that cannot be parsed or resolved are
//! dropped with a warning.

pub mod normalize;
pub mod sanitize;
pub mod transformer;
pub mod validate;

pub use sanitize::{sanitize_bytes, sanitize_text};
pub use transformer::Transformer;
pub use validate::validate_document;
