//! Claim extraction from Vietnamese agricultural text.

pub mod chunk;
pub mod extractor;

#[cfg(test)]
mod tests;

pub use chunk::chunk_text;
pub use extractor::{
    ClaimExtractor, ExtractionOutcome, ExtractorConfig, EXTRACTION_SYSTEM_PROMPT,
};
