//! The HTTP boundary shim: decodes remote-call arguments via `sdr-types`,
//! validates local preconditions, and delegates everything else to the
//! [`crate::state::DeviceServerState`] / native driver.
//!
//! This replaces the "dynamic attribute forwarding" pattern flagged in
//! `spec.md` §9 with a statically-checkable dispatch table: every remote
//! call from the external-interfaces section is one named `axum` route.

use axum::{
    Json,
    Router,
    extract::State,
    routing,
};
use sdr_types::{
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
    },
};

use crate::{
    error::ApiError,
    state::DeviceServerState,
};

pub fn router(state: DeviceServerState) -> Router {
    Router::new()
        .route("/v1/num-antennas", routing::get(get_num_antennas))
        .route("/v1/master-clock-rate", routing::get(get_master_clock_rate))
        .route(
            "/v1/supported-sample-rates",
            routing::get(get_supported_sample_rates),
        )
        .route("/v1/version", routing::get(get_version))
        .route("/v1/configure-rf-config", routing::post(configure_rf_config))
        .route("/v1/configure-tx", routing::post(configure_tx))
        .route("/v1/configure-rx", routing::post(configure_rx))
        .route(
            "/v1/reset-streaming-configs",
            routing::post(reset_streaming_configs),
        )
        .route("/v1/arm", routing::post(arm))
        .route("/v1/collect", routing::post(collect))
        .route(
            "/v1/set-time-to-zero-next-pps",
            routing::post(set_time_to_zero_next_pps),
        )
        .route("/v1/current-fpga-time", routing::post(current_fpga_time))
        .route("/v1/current-system-time", routing::post(current_system_time))
        .route("/v1/set-sync-source", routing::post(set_sync_source))
        .route("/v1/get-rf-config", routing::post(get_rf_config))
        .with_state(state)
}

async fn get_num_antennas(State(state): State<DeviceServerState>) -> Json<GetNumAntennasResponse> {
    Json(GetNumAntennasResponse {
        num_antennas: state.driver().num_antennas(),
    })
}

async fn get_master_clock_rate(
    State(state): State<DeviceServerState>,
) -> Json<GetMasterClockRateResponse> {
    Json(GetMasterClockRateResponse {
        hz: state.driver().master_clock_rate(),
    })
}

async fn get_supported_sample_rates(
    State(state): State<DeviceServerState>,
) -> Json<GetSupportedSampleRatesResponse> {
    Json(GetSupportedSampleRatesResponse {
        hz: state.driver().supported_sample_rates(),
    })
}

async fn get_version(State(state): State<DeviceServerState>) -> Json<GetVersionResponse> {
    Json(GetVersionResponse {
        version: state.version().to_string(),
    })
}

async fn configure_rf_config(
    State(state): State<DeviceServerState>,
    Json(request): Json<ConfigureRfConfigRequest>,
) -> Result<Json<()>, ApiError> {
    let cfg = RfConfig::deserialize(&request.rf_config)?;
    state.configure_rf_config(cfg)?;
    Ok(Json(()))
}

async fn configure_tx(
    State(state): State<DeviceServerState>,
    Json(request): Json<ConfigureTxRequest>,
) -> Result<Json<()>, ApiError> {
    let samples = MimoSignal::from_wire(request.samples)?;
    state.queue_tx(TxStreamingConfig {
        send_time_offset: request.send_time_offset,
        samples,
        num_repetitions: request.num_repetitions,
    });
    Ok(Json(()))
}

async fn configure_rx(
    State(state): State<DeviceServerState>,
    Json(request): Json<ConfigureRxRequest>,
) -> Json<()> {
    state.queue_rx(RxStreamingConfig {
        receive_time_offset: request.receive_time_offset,
        num_samples: request.num_samples,
        num_repetitions: request.num_repetitions,
        repetition_period: request.repetition_period,
        antenna_port: request.antenna_port,
    });
    Json(())
}

async fn reset_streaming_configs(State(state): State<DeviceServerState>) -> Json<()> {
    state.reset_streaming_configs();
    Json(())
}

async fn arm(
    State(state): State<DeviceServerState>,
    Json(request): Json<ArmRequest>,
) -> Result<Json<()>, ApiError> {
    if !state.rf_configured_once() {
        return Err(ApiError::not_configured());
    }
    state.arm(request.base_time);
    Ok(Json(()))
}

async fn collect(State(state): State<DeviceServerState>) -> Result<Json<CollectResponse>, ApiError> {
    let streams = state
        .collect()
        .into_iter()
        .map(|signal| signal.to_wire().map_err(ApiError::from))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(CollectResponse { streams }))
}

async fn set_time_to_zero_next_pps(State(state): State<DeviceServerState>) -> Json<()> {
    state.driver().set_time_to_zero_next_pps();
    Json(())
}

async fn current_fpga_time(State(state): State<DeviceServerState>) -> Json<GetCurrentTimeResponse> {
    Json(GetCurrentTimeResponse {
        seconds: state.driver().current_fpga_time(),
    })
}

async fn current_system_time(
    State(state): State<DeviceServerState>,
) -> Json<GetCurrentTimeResponse> {
    Json(GetCurrentTimeResponse {
        seconds: state.driver().current_system_time(),
    })
}

async fn set_sync_source(
    State(state): State<DeviceServerState>,
    Json(request): Json<SetSyncSourceRequest>,
) -> Json<()> {
    state.set_sync_source(request.source);
    Json(())
}

async fn get_rf_config(
    State(state): State<DeviceServerState>,
) -> Result<Json<GetRfConfigResponse>, ApiError> {
    let cfg = state.rf_config().ok_or_else(ApiError::not_configured)?;
    Ok(Json(GetRfConfigResponse {
        rf_config: cfg.serialize(),
    }))
}
