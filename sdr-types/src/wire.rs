//! Request/response payloads for the remote-call surface in the
//! specification's external-interfaces table. Each device-stub method maps
//! to exactly one of these, one request type and (where applicable) one
//! response type.

use serde::{
    Deserialize,
    Serialize,
};

use crate::SamplePair;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigureTxRequest {
    pub send_time_offset: f64,
    pub samples: Vec<SamplePair>,
    pub num_repetitions: u32,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigureRxRequest {
    pub receive_time_offset: f64,
    pub num_samples: u64,
    pub antenna_port: String,
    pub num_repetitions: u32,
    pub repetition_period: u64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConfigureRfConfigRequest {
    pub rf_config: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ArmRequest {
    pub base_time: f64,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct CollectResponse {
    pub streams: Vec<Vec<SamplePair>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetCurrentTimeResponse {
    pub seconds: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetRfConfigResponse {
    pub rf_config: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetMasterClockRateResponse {
    pub hz: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetSupportedSampleRatesResponse {
    pub hz: Vec<f64>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetNumAntennasResponse {
    pub num_antennas: u32,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncSource {
    Internal,
    External,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SetSyncSourceRequest {
    pub source: SyncSource,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct GetVersionResponse {
    pub version: String,
}
