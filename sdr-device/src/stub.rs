use std::{
    sync::atomic::{
        AtomicBool,
        Ordering,
    },
    time::Duration,
};

use sdr_types::{
    SamplePair,
    config::{
        MimoSignal,
        RfConfig,
        RxStreamingConfig,
        TxStreamingConfig,
    },
    wire::{
        ArmRequest,
        CollectResponse,
        ConfigureRfConfigRequest,
        ConfigureRxRequest,
        ConfigureTxRequest,
        GetCurrentTimeResponse,
        GetMasterClockRateResponse,
        GetNumAntennasResponse,
        GetRfConfigResponse,
        GetSupportedSampleRatesResponse,
        GetVersionResponse,
        SetSyncSourceRequest,
        SyncSource,
    },
};
use serde::{
    Serialize,
    de::DeserializeOwned,
};
use url::Url;

use crate::error::DeviceError;

const CONNECT_TIMEOUT: Duration = Duration::from_millis(500);
const SAMPLE_RATE_FRACTION_TOLERANCE: f64 = 0.01;

/// A device's fixed identity, queried once at [`DeviceStub::connect`] time:
/// its address/port, antenna count, master clock rate and the sample rates
/// it supports.
#[derive(Clone, Debug, PartialEq)]
pub struct DeviceIdentity {
    pub address: String,
    pub port: u16,
    pub num_antennas: u32,
    pub master_clock_rate: f64,
    pub supported_sample_rates: Vec<f64>,
    pub version: String,
}

/// Typed, one-to-one client of a single remote device.
///
/// Every public method is a single remote call unless documented otherwise.
/// `arm` is the only method with a local precondition: it refuses to call
/// out to the device at all once `rf-configured-once` is false.
#[derive(Debug)]
pub struct DeviceStub {
    client: reqwest::Client,
    base_url: Url,
    identity: DeviceIdentity,
    rf_configured_once: AtomicBool,
}

impl DeviceStub {
    /// Connects to a device server at `address:port` and reads its identity.
    /// Fails with [`DeviceError::ConnectTimedOut`] (surfaced by the
    /// coordinator as `DeviceUnreachable`) if the device doesn't answer
    /// within a short timeout.
    pub async fn connect(address: &str, port: u16) -> Result<Self, DeviceError> {
        let base_url = Url::parse(&format!("http://{address}:{port}/")).map_err(|error| {
            DeviceError::InvalidRfConfig(serde::de::Error::custom(error.to_string()))
        })?;
        let client = reqwest::Client::new();

        let identity = tokio::time::timeout(CONNECT_TIMEOUT, async {
            let num_antennas: GetNumAntennasResponse =
                get(&client, &base_url, "v1/num-antennas").await?;
            let clock_rate: GetMasterClockRateResponse =
                get(&client, &base_url, "v1/master-clock-rate").await?;
            let sample_rates: GetSupportedSampleRatesResponse =
                get(&client, &base_url, "v1/supported-sample-rates").await?;
            let version: GetVersionResponse = get(&client, &base_url, "v1/version").await?;
            Ok::<_, DeviceError>(DeviceIdentity {
                address: address.to_string(),
                port,
                num_antennas: num_antennas.num_antennas,
                master_clock_rate: clock_rate.hz,
                supported_sample_rates: sample_rates.hz,
                version: version.version,
            })
        })
        .await
        .map_err(|_| DeviceError::ConnectTimedOut)??;

        tracing::debug!(?identity, "connected to device");

        Ok(Self {
            client,
            base_url,
            identity,
            rf_configured_once: AtomicBool::new(false),
        })
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }

    pub fn address(&self) -> &str {
        &self.identity.address
    }

    pub fn port(&self) -> u16 {
        self.identity.port
    }

    pub fn num_antennas(&self) -> u32 {
        self.identity.num_antennas
    }

    pub fn master_clock_rate(&self) -> f64 {
        self.identity.master_clock_rate
    }

    pub fn supported_sample_rates(&self) -> &[f64] {
        &self.identity.supported_sample_rates
    }

    /// Resolves `configureRfConfig`'s relative sample rates (a value `<=
    /// 1` is a `1/N` fraction of the master clock) before sending. The
    /// resolved value is visible to the caller only through
    /// [`DeviceStub::get_rf_config`], echoing back whatever was actually
    /// applied.
    pub async fn configure_rf_config(&self, cfg: &RfConfig) -> Result<(), DeviceError> {
        let mut resolved = cfg.clone();
        resolved.tx_sampling_rate =
            resolve_sample_rate(cfg.tx_sampling_rate, self.identity.master_clock_rate)?;
        resolved.rx_sampling_rate =
            resolve_sample_rate(cfg.rx_sampling_rate, self.identity.master_clock_rate)?;

        self.post_no_response(
            "v1/configure-rf-config",
            &ConfigureRfConfigRequest {
                rf_config: resolved.serialize(),
            },
        )
        .await?;
        self.rf_configured_once.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub async fn configure_tx(&self, cfg: &TxStreamingConfig) -> Result<(), DeviceError> {
        let samples: Vec<SamplePair> = cfg
            .samples
            .to_wire()
            .map_err(|error| DeviceError::InvalidRfConfig(serde::de::Error::custom(error.to_string())))?;
        self.post_no_response(
            "v1/configure-tx",
            &ConfigureTxRequest {
                send_time_offset: cfg.send_time_offset,
                samples,
                num_repetitions: cfg.num_repetitions,
            },
        )
        .await
    }

    pub async fn configure_rx(&self, cfg: &RxStreamingConfig) -> Result<(), DeviceError> {
        self.post_no_response(
            "v1/configure-rx",
            &ConfigureRxRequest {
                receive_time_offset: cfg.receive_time_offset,
                num_samples: cfg.num_samples,
                antenna_port: cfg.antenna_port.clone(),
                num_repetitions: cfg.num_repetitions,
                repetition_period: cfg.repetition_period,
            },
        )
        .await
    }

    pub async fn reset_streaming_configs(&self) -> Result<(), DeviceError> {
        self.post_no_response("v1/reset-streaming-configs", &())
            .await
    }

    /// `baseTime < 0` (the `-1` sentinel, or any negative value) means "arm
    /// immediately, don't wait for a shared base".
    pub async fn arm(&self, base_time: f64) -> Result<(), DeviceError> {
        if !self.rf_configured_once.load(Ordering::SeqCst) {
            return Err(DeviceError::NotConfigured);
        }
        self.post_no_response("v1/arm", &ArmRequest { base_time })
            .await
    }

    pub async fn arm_immediately(&self) -> Result<(), DeviceError> {
        self.arm(-1.0).await
    }

    /// Blocks (from the caller's point of view, awaits) until the device
    /// has produced every enqueued rx block, returned in enqueue order.
    pub async fn collect(&self) -> Result<Vec<MimoSignal>, DeviceError> {
        let response: CollectResponse = self.post("v1/collect", &()).await?;
        response
            .streams
            .into_iter()
            .map(MimoSignal::from_wire)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|error| DeviceError::InvalidRfConfig(serde::de::Error::custom(error.to_string())))
    }

    pub async fn set_time_to_zero_next_pps(&self) -> Result<(), DeviceError> {
        self.post_no_response("v1/set-time-to-zero-next-pps", &())
            .await
    }

    pub async fn current_fpga_time(&self) -> Result<f64, DeviceError> {
        let response: GetCurrentTimeResponse = self.post("v1/current-fpga-time", &()).await?;
        Ok(response.seconds)
    }

    pub async fn current_system_time(&self) -> Result<f64, DeviceError> {
        let response: GetCurrentTimeResponse = self.post("v1/current-system-time", &()).await?;
        Ok(response.seconds)
    }

    pub async fn set_sync_source(&self, source: SyncSource) -> Result<(), DeviceError> {
        self.post_no_response("v1/set-sync-source", &SetSyncSourceRequest { source })
            .await
    }

    pub async fn get_rf_config(&self) -> Result<RfConfig, DeviceError> {
        let response: GetRfConfigResponse = self.post("v1/get-rf-config", &()).await?;
        Ok(RfConfig::deserialize(&response.rf_config)?)
    }

    pub async fn get_version(&self) -> Result<String, DeviceError> {
        let response: GetVersionResponse = get(&self.client, &self.base_url, "v1/version").await?;
        Ok(response.version)
    }

    async fn post<B: Serialize, R: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> Result<R, DeviceError> {
        let response = self
            .client
            .post(self.base_url.join(path).expect("path is a valid relative url"))
            .json(body)
            .send()
            .await?;
        respond(response).await
    }

    async fn post_no_response<B: Serialize>(&self, path: &str, body: &B) -> Result<(), DeviceError> {
        self.post::<B, serde_json::Value>(path, body).await?;
        Ok(())
    }
}

async fn get<R: DeserializeOwned>(
    client: &reqwest::Client,
    base_url: &Url,
    path: &str,
) -> Result<R, DeviceError> {
    let response = client
        .get(base_url.join(path).expect("path is a valid relative url"))
        .send()
        .await?;
    respond(response).await
}

async fn respond<R: DeserializeOwned>(response: reqwest::Response) -> Result<R, DeviceError> {
    if response.status().is_success() {
        Ok(response.json().await?)
    } else {
        let error: sdr_types::error::RpcError = response.json().await?;
        Err(DeviceError::Remote(error))
    }
}

/// If `value <= 1` it's interpreted as a `1/N` fraction of the master clock;
/// fractions not of that form within 1% tolerance are rejected.
fn resolve_sample_rate(value: f64, master_clock_rate: f64) -> Result<f64, DeviceError> {
    if value > 1.0 {
        return Ok(value);
    }
    if value <= 0.0 {
        return Err(DeviceError::InvalidSampleRateFraction { value });
    }
    let n = (1.0 / value).round();
    let approx = 1.0 / n;
    if ((approx - value).abs() / value) > SAMPLE_RATE_FRACTION_TOLERANCE {
        return Err(DeviceError::InvalidSampleRateFraction { value });
    }
    Ok(master_clock_rate / n)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fractional_rate_resolves_against_master_clock() {
        let resolved = resolve_sample_rate(0.5, 200e6).unwrap();
        assert_eq!(resolved, 100e6);
    }

    #[test]
    fn absolute_rate_passes_through() {
        let resolved = resolve_sample_rate(10e6, 200e6).unwrap();
        assert_eq!(resolved, 10e6);
    }

    #[test]
    fn non_reciprocal_fraction_is_rejected() {
        assert!(resolve_sample_rate(0.3, 200e6).is_err());
    }

    #[test]
    fn fraction_within_one_percent_tolerance_is_accepted() {
        // 1/3 = 0.3333...; 0.335 is within 1% of that.
        let resolved = resolve_sample_rate(0.335, 300e6).unwrap();
        assert_eq!(resolved, 100e6);
    }
}
