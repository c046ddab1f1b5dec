pub mod returns;

pub use returns::{compute_metrics, MetricsResult};
