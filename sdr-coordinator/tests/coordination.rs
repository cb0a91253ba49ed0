//! End-to-end coordinator tests against in-process `sdr-device-server`
//! instances, wired to [`LoopbackDriver`]s instead of real hardware — the
//! same substitution `rtlsdr-async`'s own integration tests make with its
//! `Backend` trait.

use std::{
    sync::Arc,
    time::Duration,
};

use num_complex::Complex64;
use sdr_coordinator::{
    Coordinator,
    CoordinatorParams,
    SyncSourcePolicy,
};
use sdr_device_server::{
    LoopbackDriver,
    api,
    state::DeviceServerState,
};
use sdr_types::config::{
    MimoSignal,
    RfConfig,
    RxStreamingConfig,
    TxStreamingConfig,
};
use tokio::net::TcpListener;

const MASTER_CLOCK_RATE: f64 = 200e6;

/// Spins up one device server backed by `driver` and returns the port it's
/// listening on.
async fn spawn_device_server(driver: Arc<LoopbackDriver>) -> u16 {
    let state = DeviceServerState::new(driver);
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let port = listener.local_addr().unwrap().port();
    tokio::spawn(async move {
        axum::serve(listener, api::router(state).into_make_service())
            .await
            .unwrap();
    });
    port
}

fn rf_config(num_streams: u32) -> RfConfig {
    RfConfig {
        tx_analog_filter_bw: 20e6,
        rx_analog_filter_bw: 20e6,
        tx_sampling_rate: 10e6,
        rx_sampling_rate: 10e6,
        tx_gain: 10.0,
        rx_gain: 20.0,
        tx_carrier_frequency: 2.4e9,
        rx_carrier_frequency: 2.4e9,
        no_tx_streams: num_streams,
        no_rx_streams: num_streams,
        tx_antenna_mapping: vec![],
        rx_antenna_mapping: vec![],
    }
}

fn tone(len: usize, amplitude: f64) -> MimoSignal {
    let samples: Vec<Complex64> = (0..len).map(|_| Complex64::new(amplitude, 0.0)).collect();
    MimoSignal::new(vec![samples]).unwrap()
}

async fn connect_usrp(coordinator: &Coordinator, name: &str, port: u16) {
    coordinator.new_usrp("127.0.0.1", name, port).await.unwrap();
}

#[tokio::test]
async fn single_device_immediate_loopback() {
    let driver = Arc::new(LoopbackDriver::new(MASTER_CLOCK_RATE, 1));
    let port = spawn_device_server(driver).await;

    let coordinator = Coordinator::new(SyncSourcePolicy::Auto, CoordinatorParams::default());
    connect_usrp(&coordinator, "usrp1", port).await;
    coordinator.configure_rf_config("usrp1", &rf_config(1)).await.unwrap();

    let mut peak_indices = Vec::new();
    for _ in 0..3 {
        coordinator
            .reset_streaming_configs("usrp1")
            .await
            .unwrap();
        coordinator
            .configure_tx("usrp1", &TxStreamingConfig::new(0.0, tone(2000, 0.5)))
            .await
            .unwrap();
        coordinator
            .configure_rx("usrp1", &RxStreamingConfig::new(0.0, 4000))
            .await
            .unwrap();

        coordinator.execute().await.unwrap();
        let collected = coordinator.collect().await.unwrap();

        let signal = &collected["usrp1"][0];
        let stream = &signal.streams()[0];
        let peak = stream
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(index, _)| index)
            .unwrap();
        peak_indices.push(peak as i64);
    }

    let min = peak_indices.iter().copied().min().unwrap();
    let max = peak_indices.iter().copied().max().unwrap();
    assert!(max - min <= 2, "peak index drifted: {peak_indices:?}");
}

#[tokio::test]
async fn two_device_synchronized_transmission() {
    let driver_a = Arc::new(LoopbackDriver::new(MASTER_CLOCK_RATE, 1));
    let driver_b = Arc::new(LoopbackDriver::new(MASTER_CLOCK_RATE, 1));
    LoopbackDriver::pair(&driver_a, &driver_b);

    let port_a = spawn_device_server(driver_a).await;
    let port_b = spawn_device_server(driver_b).await;

    let coordinator = Coordinator::new(SyncSourcePolicy::Auto, CoordinatorParams::default());
    connect_usrp(&coordinator, "usrp1", port_a).await;
    connect_usrp(&coordinator, "usrp2", port_b).await;
    coordinator.configure_rf_config("usrp1", &rf_config(1)).await.unwrap();
    coordinator.configure_rf_config("usrp2", &rf_config(1)).await.unwrap();

    let mut peak_indices = Vec::new();
    for _ in 0..3 {
        coordinator.reset_streaming_configs("usrp1").await.unwrap();
        coordinator.reset_streaming_configs("usrp2").await.unwrap();

        coordinator
            .configure_tx("usrp1", &TxStreamingConfig::new(0.0, tone(2000, 0.5)))
            .await
            .unwrap();
        coordinator
            .configure_rx("usrp2", &RxStreamingConfig::new(0.0, 4000))
            .await
            .unwrap();

        coordinator.execute().await.unwrap();
        let collected = coordinator.collect().await.unwrap();

        let signal = &collected["usrp2"][0];
        let stream = &signal.streams()[0];
        let peak = stream
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
            .map(|(index, _)| index)
            .unwrap();
        peak_indices.push(peak as i64);
    }

    let min = peak_indices.iter().copied().min().unwrap();
    let max = peak_indices.iter().copied().max().unwrap();
    assert!(max - min <= 4, "peak index drifted: {peak_indices:?}");
}

#[tokio::test]
async fn duplicate_device_name_is_rejected() {
    let driver_a = Arc::new(LoopbackDriver::new(MASTER_CLOCK_RATE, 1));
    let driver_b = Arc::new(LoopbackDriver::new(MASTER_CLOCK_RATE, 1));
    let port_a = spawn_device_server(driver_a).await;
    let port_b = spawn_device_server(driver_b).await;

    let coordinator = Coordinator::new(SyncSourcePolicy::Auto, CoordinatorParams::default());
    connect_usrp(&coordinator, "usrp1", port_a).await;

    let result = coordinator.new_usrp("127.0.0.1", "usrp1", port_b).await;
    assert!(matches!(
        result,
        Err(sdr_coordinator::CoordinatorError::DuplicateDevice)
    ));
    assert_eq!(coordinator.device_names().await, vec!["usrp1".to_string()]);
}

#[tokio::test]
async fn tx_clipping_is_rejected_before_reaching_the_device() {
    let driver = Arc::new(LoopbackDriver::new(MASTER_CLOCK_RATE, 1));
    let port = spawn_device_server(driver).await;

    let coordinator = Coordinator::new(SyncSourcePolicy::Auto, CoordinatorParams::default());
    connect_usrp(&coordinator, "usrp1", port).await;
    coordinator.configure_rf_config("usrp1", &rf_config(1)).await.unwrap();

    let clipped = TxStreamingConfig::new(0.0, tone(100, 1.5));
    let result = coordinator.configure_tx("usrp1", &clipped).await;
    assert!(matches!(
        result,
        Err(sdr_coordinator::CoordinatorError::TxClippingRejected)
    ));

    let accepted = TxStreamingConfig::new(0.0, tone(100, 1.0));
    coordinator.configure_tx("usrp1", &accepted).await.unwrap();
}

#[tokio::test]
async fn short_repetition_period_is_rejected_before_reaching_the_device() {
    let driver = Arc::new(LoopbackDriver::new(MASTER_CLOCK_RATE, 1));
    let port = spawn_device_server(driver).await;

    let coordinator = Coordinator::new(SyncSourcePolicy::Auto, CoordinatorParams::default());
    connect_usrp(&coordinator, "usrp1", port).await;
    coordinator.configure_rf_config("usrp1", &rf_config(1)).await.unwrap();

    let too_short = RxStreamingConfig {
        receive_time_offset: 0.0,
        num_samples: 100,
        num_repetitions: 3,
        repetition_period: 50,
        antenna_port: String::new(),
    };
    let result = coordinator.configure_rx("usrp1", &too_short).await;
    assert!(matches!(
        result,
        Err(sdr_coordinator::CoordinatorError::InvalidRepetitionPeriod {
            num_samples: 100,
            repetition_period: 50,
        })
    ));

    let valid = RxStreamingConfig {
        repetition_period: 100,
        ..too_short
    };
    coordinator.configure_rx("usrp1", &valid).await.unwrap();
}

#[tokio::test]
async fn persistent_clock_divergence_fails_synchronization() {
    let driver_a = Arc::new(LoopbackDriver::new(MASTER_CLOCK_RATE, 1));
    let port_a = spawn_device_server(driver_a).await;

    // `set_time_to_zero_next_pps` on `LoopbackDriver` is a no-op, so starting
    // the second server's clock a full second after the first's reproduces a
    // divergence that no amount of resync attempts can close.
    tokio::time::sleep(Duration::from_secs(1)).await;
    let driver_b = Arc::new(LoopbackDriver::new(MASTER_CLOCK_RATE, 1));
    let port_b = spawn_device_server(driver_b).await;

    let params = CoordinatorParams {
        sync_attempts: 1,
        ..CoordinatorParams::default()
    };
    let coordinator = Coordinator::new(SyncSourcePolicy::Auto, params);
    connect_usrp(&coordinator, "usrp1", port_a).await;
    connect_usrp(&coordinator, "usrp2", port_b).await;

    let result = coordinator.synchronize_usrps().await;
    assert!(matches!(
        result,
        Err(sdr_coordinator::CoordinatorError::SyncFailed { attempts: 1 })
    ));
}

#[tokio::test]
async fn repeated_rx_blocks_land_at_the_configured_offsets() {
    let driver = Arc::new(LoopbackDriver::new(MASTER_CLOCK_RATE, 1));
    let port = spawn_device_server(driver).await;

    let coordinator = Coordinator::new(SyncSourcePolicy::Auto, CoordinatorParams::default());
    connect_usrp(&coordinator, "usrp1", port).await;
    coordinator.configure_rf_config("usrp1", &rf_config(1)).await.unwrap();

    // One queued tx repeats a 200-sample pulse 3 times back to back; a rx
    // block the same length as the pulse, repeated 3 times with no gap,
    // lands one (possibly latency-shifted) copy of the pulse per block.
    let pulse_len = 200;
    let block_len = 200u64;
    let period = block_len; // repetitionPeriod >= numSamples

    coordinator
        .configure_tx(
            "usrp1",
            &TxStreamingConfig::new(0.0, tone(pulse_len, 0.6)).with_repetitions(3),
        )
        .await
        .unwrap();
    let rx_cfg = RxStreamingConfig {
        receive_time_offset: 0.0,
        num_samples: block_len,
        num_repetitions: 3,
        repetition_period: period,
        antenna_port: String::new(),
    };
    coordinator.configure_rx("usrp1", &rx_cfg).await.unwrap();

    coordinator.execute().await.unwrap();
    let collected = coordinator.collect().await.unwrap();

    let signal = &collected["usrp1"][0];
    let stream = &signal.streams()[0];
    assert_eq!(stream.len(), (block_len * 3) as usize);

    for block in 0..3u64 {
        let start = (block * block_len) as usize;
        let block_samples = &stream[start..start + block_len as usize];
        let has_tone = block_samples.iter().any(|s| s.norm() > 0.5);
        assert!(has_tone, "block {block} has no transmitted pulse");
    }
}
