use std::{
    net::SocketAddr,
    sync::Arc,
};

use clap::Parser;
use color_eyre::eyre::Error;
use sdr_device_server::{
    LoopbackDriver,
    api,
    state::DeviceServerState,
};
use tokio::net::TcpListener;

#[tokio::main]
async fn main() -> Result<(), Error> {
    let _ = dotenvy::dotenv();
    color_eyre::install()?;
    tracing_subscriber::fmt::init();

    let args = Args::parse();

    let driver = Arc::new(LoopbackDriver::new(args.master_clock_rate, args.num_antennas));
    let state = DeviceServerState::new(driver);

    let tcp_listener = TcpListener::bind(args.listen).await?;
    tracing::info!(listen = %args.listen, "sdr-device-server listening");

    axum::serve(tcp_listener, api::router(state).into_make_service()).await?;

    Ok(())
}

#[derive(Debug, Parser)]
struct Args {
    #[clap(long, env = "SDR_LISTEN", default_value = "127.0.0.1:7878")]
    listen: SocketAddr,

    #[clap(long, env = "SDR_MASTER_CLOCK_RATE", default_value_t = 200e6)]
    master_clock_rate: f64,

    #[clap(long, env = "SDR_NUM_ANTENNAS", default_value_t = 2)]
    num_antennas: u32,
}
