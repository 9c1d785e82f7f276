// jsfxpp — JSFX Pre-Processor
//
// Library root. Passes run in the order sequence → enums → dispatch; see
// `pipeline::preprocess` for the single entry point.

pub mod diag;
pub mod dispatch;
pub mod enums;
pub mod id;
pub mod pass;
pub mod pipeline;
pub mod rewrite;
pub mod sequence;
pub mod tree;

pub use diag::PreprocessError;
pub use pipeline::{preprocess, Preprocessed};
