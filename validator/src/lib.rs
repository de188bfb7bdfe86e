//! Article validator: treats a finished wiki article as one source and
//! cross-checks it against fresh web evidence.

pub mod markdown;
pub mod validator;

#[cfg(test)]
mod tests;

pub use markdown::{extract_title, markdown_to_text};
pub use validator::{
    ArticleValidator, ValidationReport, WebValidation, WebValidationRecord, IMPORTANT_PREDICATES,
};
