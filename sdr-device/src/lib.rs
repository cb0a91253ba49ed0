//! One-to-one client of a single remote SDR device.

pub mod error;
mod resync_flag;
mod stub;

pub use error::DeviceError;
pub use resync_flag::ReSyncFlag;
pub use stub::{
    DeviceIdentity,
    DeviceStub,
};
