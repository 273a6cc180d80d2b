//! Feature extraction
//!
//! Turns match history into fixed-length, normalized input vectors. An
//! interpretation scheme picks the window sizes per family; families decide
//! which past matches count; the window module does the summing.

pub mod extractor;
pub mod families;
pub mod scheme;
pub mod window;

pub use extractor::FeatureExtractor;
pub use families::Family;
pub use scheme::{FeatureMapping, FeatureScheme, InterpretationScheme, SchemeRegistry};
