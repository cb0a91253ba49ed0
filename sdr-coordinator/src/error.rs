use sdr_device::DeviceError;

/// A failure that happened on one specific device, with its name attached
/// so callers never have to guess which device misbehaved.
#[derive(Debug, thiserror::Error)]
#[error("device {device_name}: {message}")]
pub struct PerDeviceError {
    pub device_name: String,
    pub message: String,
    #[source]
    pub cause: DeviceError,
}

impl PerDeviceError {
    pub fn new(device_name: impl Into<String>, cause: DeviceError) -> Self {
        let device_name = device_name.into();
        Self {
            message: cause.to_string(),
            device_name,
            cause,
        }
    }
}

/// Raised by a fan-out operation (`execute`, `collect`) when at least one
/// device failed. Carries one [`PerDeviceError`] per failed device, in the
/// coordinator's fixed iteration order.
#[derive(Debug, thiserror::Error)]
#[error("{} of {} devices failed: {}", errors.len(), total_devices, summary(errors))]
pub struct AggregatedError {
    pub errors: Vec<PerDeviceError>,
    pub total_devices: usize,
}

fn summary(errors: &[PerDeviceError]) -> String {
    errors
        .iter()
        .map(|error| error.device_name.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Every failure kind the coordinator's public API can raise.
#[derive(Debug, thiserror::Error)]
pub enum CoordinatorError {
    #[error("a device with that name or (address, port) is already registered")]
    DuplicateDevice,

    #[error("couldn't reach device at {address}:{port}")]
    DeviceUnreachable {
        address: String,
        port: u16,
        #[source]
        cause: DeviceError,
    },

    #[error("sync source policy 'internal' only supports a single device, but {count} are registered")]
    SyncUnsupported { count: usize },

    #[error(
        "devices did not reach a common fpga time within the sync threshold after {attempts} attempts"
    )]
    SyncFailed { attempts: u32 },

    #[error("tx samples exceed |amplitude| = 1 and would clip on transmit")]
    TxClippingRejected,

    #[error(
        "repetitionPeriod ({repetition_period}) must be >= numSamples ({num_samples}) when repeating"
    )]
    InvalidRepetitionPeriod {
        num_samples: u64,
        repetition_period: u64,
    },

    #[error("device {device_name} returned clipped rx samples")]
    RxClippingDetected { device_name: String },

    #[error("front-end must be configured before arming")]
    NotConfigured,

    #[error("no device named {name:?} is registered")]
    UnknownDevice { name: String },

    #[error(transparent)]
    Aggregated(#[from] AggregatedError),

    #[error(transparent)]
    Shape(#[from] sdr_types::error::ShapeError),

    #[error(transparent)]
    Device(#[from] DeviceError),
}
