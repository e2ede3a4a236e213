// Data models and ML structures

pub mod dataset;
pub mod model_artifact;

pub use dataset::*;
pub use model_artifact::*;
