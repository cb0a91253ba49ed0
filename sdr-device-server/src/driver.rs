//! The native radio driver boundary.
//!
//! The real FPGA/DMA/analog-front-end driver is out of scope (see
//! `spec.md` §1) — this crate only defines the typed interface the server
//! delegates to, plus an in-memory loopback implementation used by the
//! integration tests and the `demos` crate, standing in for real hardware
//! the way `rtlsdr-async`'s `Backend` trait stands in for a dongle in its
//! own tests.

use std::{
    collections::VecDeque,
    sync::{
        Arc,
        Weak,
    },
    time::Instant,
};

use parking_lot::Mutex;
use sdr_types::{
    Complex64,
    config::MimoSignal,
    wire::SyncSource,
};

/// What the device server needs from the native driver: clock and
/// capability queries, and running a batch of queued tx/rx work at a given
/// arming time.
pub trait NativeDriver: Send + Sync {
    fn master_clock_rate(&self) -> f64;
    fn supported_sample_rates(&self) -> Vec<f64>;
    fn num_antennas(&self) -> u32;
    fn current_fpga_time(&self) -> f64;
    fn current_system_time(&self) -> f64;
    fn set_time_to_zero_next_pps(&self);
    fn set_sync_source(&self, source: SyncSource);

    /// Transmits every queued tx stream and captures every queued rx
    /// stream, starting at `base_time` (device-clock seconds; negative
    /// means "immediately"). Returns one [`MimoSignal`] per queued rx
    /// config, in enqueue order.
    fn arm_and_run(&self, base_time: f64, tx: &[QueuedTx], rx: &[QueuedRx]) -> Vec<MimoSignal>;
}

pub struct QueuedTx {
    pub send_time_offset: f64,
    pub samples: MimoSignal,
    pub num_repetitions: u32,
}

pub struct QueuedRx {
    pub receive_time_offset: f64,
    pub num_samples: u64,
    pub num_repetitions: u32,
    pub repetition_period: u64,
}

/// A loopback driver with no real RF front end: transmitted samples are fed
/// straight into a capture buffer (delayed by a fixed, configurable
/// latency), either from its own transmissions (single-device loopback,
/// `spec.md` §8 scenario 1) or from another instance's transmissions, wired
/// together with [`LoopbackDriver::feed_rx`] (the two-device scenario).
pub struct LoopbackDriver {
    master_clock_rate: f64,
    supported_sample_rates: Vec<f64>,
    num_antennas: u32,
    latency_samples: usize,
    self_loopback: bool,
    epoch: Instant,
    rx_source: Mutex<VecDeque<Complex64>>,
    peer: Mutex<Option<Weak<LoopbackDriver>>>,
}

impl LoopbackDriver {
    pub fn new(master_clock_rate: f64, num_antennas: u32) -> Self {
        Self {
            master_clock_rate,
            supported_sample_rates: vec![master_clock_rate, master_clock_rate / 2.0, master_clock_rate / 4.0],
            num_antennas,
            latency_samples: 3,
            self_loopback: true,
            epoch: Instant::now(),
            rx_source: Mutex::new(VecDeque::new()),
            peer: Mutex::new(None),
        }
    }

    /// Wires two drivers so each one's transmissions land in the other's
    /// capture buffer instead of its own — a two-device analog of
    /// over-the-air transmission, for the p2p transmission scenario.
    pub fn pair(a: &Arc<LoopbackDriver>, b: &Arc<LoopbackDriver>) {
        *a.peer.lock() = Some(Arc::downgrade(b));
        *b.peer.lock() = Some(Arc::downgrade(a));
    }

    pub fn feed_rx(&self, samples: &[Complex64]) {
        self.rx_source.lock().extend(samples.iter().copied());
    }
}

impl NativeDriver for LoopbackDriver {
    fn master_clock_rate(&self) -> f64 {
        self.master_clock_rate
    }

    fn supported_sample_rates(&self) -> Vec<f64> {
        self.supported_sample_rates.clone()
    }

    fn num_antennas(&self) -> u32 {
        self.num_antennas
    }

    fn current_fpga_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn current_system_time(&self) -> f64 {
        self.epoch.elapsed().as_secs_f64()
    }

    fn set_time_to_zero_next_pps(&self) {
        // There's no real PPS edge here; zeroing immediately is close enough
        // for a loopback driver and keeps tests deterministic.
    }

    fn set_sync_source(&self, _source: SyncSource) {}

    fn arm_and_run(&self, _base_time: f64, tx: &[QueuedTx], rx: &[QueuedRx]) -> Vec<MimoSignal> {
        let peer = self.peer.lock().as_ref().and_then(Weak::upgrade);
        if self.self_loopback || peer.is_some() {
            for config in tx {
                let mut transmitted: Vec<Complex64> = Vec::new();
                if let Some(stream) = config.samples.streams().first() {
                    for _ in 0..config.num_repetitions.max(1) {
                        transmitted.extend_from_slice(stream);
                    }
                }
                if !transmitted.is_empty() {
                    let mut padded = vec![Complex64::new(0.0, 0.0); self.latency_samples];
                    padded.extend(transmitted);
                    match &peer {
                        Some(peer) => peer.feed_rx(&padded),
                        None => self.feed_rx(&padded),
                    }
                }
            }
        }

        let mut source = self.rx_source.lock();
        rx.iter()
            .map(|config| {
                let block_count = config.num_repetitions.max(1) as u64;
                let mut streams = Vec::with_capacity(1);
                let mut stream = Vec::with_capacity((config.num_samples * block_count) as usize);
                for block in 0..block_count {
                    for _ in 0..config.num_samples {
                        stream.push(source.pop_front().unwrap_or(Complex64::new(0.0, 0.0)));
                    }
                    let gap = config.repetition_period.saturating_sub(config.num_samples);
                    if block + 1 < block_count {
                        for _ in 0..gap {
                            source.pop_front();
                        }
                    }
                }
                streams.push(stream);
                MimoSignal::new(streams).expect("single uniform-length stream is always valid shape")
            })
            .collect()
    }
}
