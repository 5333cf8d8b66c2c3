pub mod stats_monitor;

pub use stats_monitor::{StatsMonitor, StatsState};
