pub mod feature_matrix;
pub mod feature_registry;
pub mod model_config;
pub mod normalizer;
pub mod snapshot;
