use sdr_types::error::RpcError;

/// Errors a [`crate::DeviceStub`] can raise. Every variant is reported with
/// the originating device's name by the coordinator (see
/// `sdr_coordinator::error::PerDeviceError`); this type itself has no
/// notion of device identity.
#[derive(Debug, thiserror::Error)]
pub enum DeviceError {
    #[error("http transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("device rejected the request: {0}")]
    Remote(#[from] RpcError),

    #[error("front-end must be configured before arming")]
    NotConfigured,

    #[error(
        "sample rate fraction {value} is not within 1% of 1/N for any integer N"
    )]
    InvalidSampleRateFraction { value: f64 },

    #[error("connecting to device timed out")]
    ConnectTimedOut,

    #[error("malformed rf config text: {0}")]
    InvalidRfConfig(#[from] serde_json::Error),
}
