//! SQL handling shared by the query tools.
//!
//! - `classifier`: read-only / write classification with two strategies
//!   (sqlparser AST walk, keyword matching)
//! - `watermark`: traceability comment prepended to every executed statement
//!
//! The classifier strategy is fixed at build time through [`DefaultClassifier`].
//! Enable the `lexical-classifier` feature to use the keyword matcher.

pub mod classifier;
pub mod lexical;
pub mod watermark;

pub use classifier::{QueryClassifier, QueryVerdict, StructuralClassifier};
pub use lexical::LexicalClassifier;
pub use watermark::WatermarkFields;

/// Classifier used by the query tools.
#[cfg(not(feature = "lexical-classifier"))]
pub type DefaultClassifier = StructuralClassifier;

/// Classifier used by the query tools.
#[cfg(feature = "lexical-classifier")]
pub type DefaultClassifier = LexicalClassifier;
