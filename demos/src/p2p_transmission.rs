//! Two-device synchronized transmission, the Rust equivalent of
//! `usrp_p2p_transmission.py`: usrp1 transmits a known tone, usrp2 receives
//! it, and we print the peak sample index per device to show the arming
//! times landed on the shared PPS edge.
//!
//! Device addresses come from `USRP1_IP`/`USRP2_IP` (+ optional
//! `USRP1_PORT`/`USRP2_PORT`), the same environment variables the original
//! hardware tests used — per the specification, these are read only here
//! and in test harnesses, never inside `sdr-coordinator` itself.

use clap::Parser;
use color_eyre::eyre::Error;
use num_complex::Complex64;
use sdr_coordinator::{
    Coordinator,
    CoordinatorParams,
    SyncSourcePolicy,
};
use sdr_types::config::{
    MimoSignal,
    RfConfig,
    RxStreamingConfig,
    TxStreamingConfig,
};

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let coordinator = Coordinator::new(SyncSourcePolicy::Auto, CoordinatorParams::default());
    coordinator
        .new_usrp(&args.usrp1_ip, "usrp1", args.usrp1_port)
        .await?;
    coordinator
        .new_usrp(&args.usrp2_ip, "usrp2", args.usrp2_port)
        .await?;

    let rf_config = RfConfig {
        tx_analog_filter_bw: 400e6,
        rx_analog_filter_bw: 400e6,
        tx_sampling_rate: 62.5e6,
        rx_sampling_rate: 62.5e6,
        tx_gain: 40.0,
        rx_gain: 50.0,
        tx_carrier_frequency: 2e9,
        rx_carrier_frequency: 2e9,
        no_tx_streams: 1,
        no_rx_streams: 1,
        tx_antenna_mapping: vec![],
        rx_antenna_mapping: vec![],
    };
    coordinator.configure_rf_config("usrp1", &rf_config).await?;
    coordinator.configure_rf_config("usrp2", &rf_config).await?;

    let tone: Vec<Complex64> = (0..10_000).map(|_| Complex64::new(1.0, 0.0)).collect();
    let tx_samples = MimoSignal::new(vec![tone])?;

    coordinator
        .configure_tx("usrp1", &TxStreamingConfig::new(2.0, tx_samples))
        .await?;
    coordinator
        .configure_rx("usrp1", &RxStreamingConfig::new(2.1, 60_000))
        .await?;
    coordinator
        .configure_rx("usrp2", &RxStreamingConfig::new(2.0, 60_000))
        .await?;

    coordinator.execute().await?;
    let samples = coordinator.collect().await?;

    for (name, streams) in &samples {
        for (index, stream) in streams.iter().enumerate() {
            let peak = stream
                .streams()
                .first()
                .and_then(|s| {
                    s.iter()
                        .enumerate()
                        .max_by(|a, b| a.1.norm().total_cmp(&b.1.norm()))
                })
                .map(|(i, sample)| (i, sample.norm()));
            if let Some((peak_index, peak_magnitude)) = peak {
                println!("{name} rx block {index}: peak at sample {peak_index} (|x|={peak_magnitude:.3})");
            }
        }
    }

    Ok(())
}

#[derive(Debug, Parser)]
struct Args {
    #[clap(long, env = "USRP1_IP")]
    usrp1_ip: String,
    #[clap(long, env = "USRP1_PORT", default_value_t = 7878)]
    usrp1_port: u16,
    #[clap(long, env = "USRP2_IP")]
    usrp2_ip: String,
    #[clap(long, env = "USRP2_PORT", default_value_t = 7878)]
    usrp2_port: u16,
}
