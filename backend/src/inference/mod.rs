pub mod metrics;
pub mod model;
pub mod preprocess;

pub use model::{Classifier, InferenceError};
