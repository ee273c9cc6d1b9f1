// Pure indicator transforms; each output has the length of its input
pub mod events;
pub mod momentum;
pub mod moving_average;
pub mod trend;
pub mod volatility;
pub mod volume;
