//! Request payload validation
//!
//! Payload structs derive `validator::Validate`; the `ValidatedJson`
//! extractor runs those rules and turns failures into `ValidationError`.

pub mod extractor;
pub mod validators;

pub use extractor::ValidatedJson;
