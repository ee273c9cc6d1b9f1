// Raw market data
pub mod market;

// Feature columns, matrices and scaling
pub mod ml;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
