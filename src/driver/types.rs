/// Main driver state
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DriverState {
    /// Driver is initializing
    Initializing,
    /// Driver is running the periodic loop
    Running,
    /// Loop has exited after a shutdown request
    Stopped,
}

/// Running totals of the driver's poll cycles
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DriverCounters {
    pub total_polls: u64,
    /// Timeseries lines that could not be written
    pub append_failures: u64,
    /// State documents that could not be published
    pub publish_failures: u64,
}
