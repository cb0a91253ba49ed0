//! Wire types shared between the coordinator, the device stub and the
//! device server.
//!
//! Everything in this crate is meant to cross a process boundary: the
//! `codec` module turns complex sample buffers into the `[reals, imags]`
//! pair form used on the wire, `config` holds the typed configuration
//! records (and their self-describing JSON serialization), and `error`
//! holds the typed error that travels back from a device server instead of
//! a bare transport failure.

pub mod codec;
pub mod config;
pub mod error;
pub mod wire;

pub use codec::{
    Signal,
    decode,
    encode,
};
pub use config::{
    MimoSignal,
    RfConfig,
    RxStreamingConfig,
    TxStreamingConfig,
};
pub use error::{
    LengthMismatch,
    RpcError,
    RpcErrorKind,
    ShapeError,
};

/// A single complex sample, as carried by [`MimoSignal`] and the codec.
pub type Complex64 = num_complex::Complex<f64>;

/// The `[reals, imags]` wire form of one stream's sample sequence.
pub type SamplePair = (Vec<f64>, Vec<f64>);
