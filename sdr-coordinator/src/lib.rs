//! The multi-device coordinator: composes many remote SDR devices sharing a
//! common PPS reference into one synchronized instrument.

mod coordinator;
mod device_handle;
pub mod error;
mod params;
mod sync_source;

pub use coordinator::Coordinator;
pub use device_handle::DeviceHandle;
pub use error::CoordinatorError;
pub use params::CoordinatorParams;
pub use sync_source::SyncSourcePolicy;
