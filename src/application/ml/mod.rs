pub mod cache_window;
pub mod rolling_cache;
pub mod sequence_windower;
pub mod snapshot_builder;
pub mod sources;
