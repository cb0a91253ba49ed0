use std::{
    collections::VecDeque,
    sync::{
        Arc,
        atomic::{
            AtomicBool,
            Ordering,
        },
    },
};

use parking_lot::Mutex;
use sdr_types::{
    config::{
        MimoSignal,
        RfConfig,
        RxStreamingConfig,
        TxStreamingConfig,
    },
    wire::SyncSource,
};

use crate::driver::{
    NativeDriver,
    QueuedRx,
    QueuedTx,
};

/// Per-device server state: the boundary shim's own bookkeeping (queued
/// configs, the `rf-configured-once` bit, the last-applied `RfConfig`) plus
/// a handle to the native driver it delegates to.
#[derive(Clone)]
pub struct DeviceServerState(Arc<Inner>);

struct Inner {
    driver: Arc<dyn NativeDriver>,
    version: String,
    rf_config: Mutex<Option<RfConfig>>,
    rf_configured_once: AtomicBool,
    tx_queue: Mutex<VecDeque<TxStreamingConfig>>,
    rx_queue: Mutex<VecDeque<RxStreamingConfig>>,
    pending_collect: Mutex<VecDeque<MimoSignal>>,
    sync_source: Mutex<Option<SyncSource>>,
}

impl DeviceServerState {
    pub fn new(driver: Arc<dyn NativeDriver>) -> Self {
        Self(Arc::new(Inner {
            driver,
            version: env!("CARGO_PKG_VERSION").to_string(),
            rf_config: Mutex::new(None),
            rf_configured_once: AtomicBool::new(false),
            tx_queue: Mutex::new(VecDeque::new()),
            rx_queue: Mutex::new(VecDeque::new()),
            pending_collect: Mutex::new(VecDeque::new()),
            sync_source: Mutex::new(None),
        }))
    }

    pub fn version(&self) -> &str {
        &self.0.version
    }

    pub fn driver(&self) -> &dyn NativeDriver {
        self.0.driver.as_ref()
    }

    pub fn configure_rf_config(&self, cfg: RfConfig) -> Result<(), sdr_types::config::RfConfigError> {
        cfg.validate(self.0.driver.num_antennas())?;
        *self.0.rf_config.lock() = Some(cfg);
        self.0.rf_configured_once.store(true, Ordering::SeqCst);
        Ok(())
    }

    pub fn rf_configured_once(&self) -> bool {
        self.0.rf_configured_once.load(Ordering::SeqCst)
    }

    pub fn rf_config(&self) -> Option<RfConfig> {
        self.0.rf_config.lock().clone()
    }

    pub fn queue_tx(&self, cfg: TxStreamingConfig) {
        self.0.tx_queue.lock().push_back(cfg);
    }

    pub fn queue_rx(&self, cfg: RxStreamingConfig) {
        self.0.rx_queue.lock().push_back(cfg);
    }

    pub fn reset_streaming_configs(&self) {
        self.0.tx_queue.lock().clear();
        self.0.rx_queue.lock().clear();
        self.0.pending_collect.lock().clear();
    }

    pub fn set_sync_source(&self, source: SyncSource) {
        *self.0.sync_source.lock() = Some(source);
        self.0.driver.set_sync_source(source);
    }

    /// Drains the queued tx/rx configs, runs them on the native driver, and
    /// stores the produced rx blocks for the next `collect`.
    pub fn arm(&self, base_time: f64) {
        let tx: Vec<QueuedTx> = self
            .0
            .tx_queue
            .lock()
            .drain(..)
            .map(|cfg| QueuedTx {
                send_time_offset: cfg.send_time_offset,
                samples: cfg.samples,
                num_repetitions: cfg.num_repetitions,
            })
            .collect();
        let rx: Vec<QueuedRx> = self
            .0
            .rx_queue
            .lock()
            .drain(..)
            .map(|cfg| QueuedRx {
                receive_time_offset: cfg.receive_time_offset,
                num_samples: cfg.num_samples,
                num_repetitions: cfg.num_repetitions,
                repetition_period: cfg.repetition_period,
            })
            .collect();

        let results = self.0.driver.arm_and_run(base_time, &tx, &rx);
        self.0.pending_collect.lock().extend(results);
    }

    pub fn collect(&self) -> Vec<MimoSignal> {
        self.0.pending_collect.lock().drain(..).collect()
    }
}
