use serde::{
    Deserialize,
    Serialize,
};

/// `encode` was given a sample array that was not one-dimensional.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("expected a one-dimensional sample array, got rank {rank}")]
pub struct ShapeError {
    pub rank: usize,
}

/// `decode` was given a `(reals, imags)` pair of mismatched length.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
#[error("real and imaginary sequences have different lengths: {real_len} != {imag_len}")]
pub struct LengthMismatch {
    pub real_len: usize,
    pub imag_len: usize,
}

/// The typed error a device server returns instead of letting a remote call
/// fail as a bare transport error.
///
/// This is the wire form of the "exception propagation across the remote
/// channel" redesign: a handler never lets a panic or a raw driver error
/// escape as an opaque HTTP failure, it always answers with one of these
/// kinds, tagged with a human-readable message.
#[derive(Clone, Debug, Serialize, Deserialize, thiserror::Error)]
#[error("{message}")]
pub struct RpcError {
    pub kind: RpcErrorKind,
    pub message: String,
}

impl RpcError {
    pub fn new(kind: RpcErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn not_configured() -> Self {
        Self::new(RpcErrorKind::NotConfigured, "front-end not configured")
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, thiserror::Error)]
#[serde(rename_all = "snake_case")]
pub enum RpcErrorKind {
    #[error("front-end not configured")]
    NotConfigured,
    #[error("invalid sample rate fraction")]
    InvalidSampleRateFraction,
    #[error("malformed request")]
    BadRequest,
    #[error("native driver error")]
    Driver,
}
