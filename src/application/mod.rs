// Indicator library
pub mod indicators;

// Market data processing
pub mod market_data;

// Feature derivation and incremental carry
pub mod feature_engineering_service;

// Rolling window, acquisition sources, training sequences
pub mod ml;

// Wiring from configuration
pub mod bootstrap;
