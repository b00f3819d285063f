//! Feature preprocessing fitted during transformation and bundled with the model.

pub mod transforms;

pub use transforms::{Encoding, FeatureEncoder, Preprocessor};
