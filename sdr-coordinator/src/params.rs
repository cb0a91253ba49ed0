use std::time::Duration;

/// Tunables for the synchronization protocol and execution timing. The
/// defaults match the values named in the specification.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CoordinatorParams {
    /// How many rounds of `setTimeToZeroNextPps` + re-check to attempt
    /// before raising `SyncFailed`.
    pub sync_attempts: u32,
    /// Devices are considered synchronized when `max - min` of their
    /// reported fpga times is below this threshold, in seconds.
    pub sync_threshold_sec: f64,
    /// Added to the slowest device's current fpga time to compute the
    /// shared arming time; must dominate worst-case fan-out wall time.
    pub base_time_offset_sec: f64,
    /// Once devices are confirmed synchronized, `execute` skips the
    /// synchronization protocol for this long.
    pub resync_interval: Duration,
}

impl Default for CoordinatorParams {
    fn default() -> Self {
        Self {
            sync_attempts: 3,
            sync_threshold_sec: 0.2,
            base_time_offset_sec: 0.5,
            resync_interval: Duration::from_secs(20 * 60),
        }
    }
}
