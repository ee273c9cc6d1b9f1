// Cross-over detection over derived series
pub mod flip_detector;
