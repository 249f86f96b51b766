pub mod humidity_monitor;

pub use humidity_monitor::{AlertSettings, CheckOutcome, HumidityMonitor, MonitorError};
