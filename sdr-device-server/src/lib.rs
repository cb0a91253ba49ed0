pub mod api;
pub mod driver;
pub mod error;
pub mod state;

pub use driver::{
    LoopbackDriver,
    NativeDriver,
};
pub use state::DeviceServerState;
