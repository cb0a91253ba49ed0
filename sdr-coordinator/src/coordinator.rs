use std::{
    collections::HashMap,
    sync::atomic::{
        AtomicBool,
        Ordering,
    },
    time::Duration,
};

use sdr_device::{
    DeviceStub,
    ReSyncFlag,
};
use sdr_types::{
    config::{
        MimoSignal,
        RfConfig,
        RxStreamingConfig,
        TxStreamingConfig,
    },
    wire::SyncSource,
};
use tokio::sync::Mutex;

use crate::{
    device_handle::DeviceHandle,
    error::{
        AggregatedError,
        CoordinatorError,
        PerDeviceError,
    },
    params::CoordinatorParams,
    sync_source::SyncSourcePolicy,
};

/// How long to wait after `setTimeToZeroNextPps` for the PPS edge to have
/// passed on every device. Must be comfortably above 1 second.
const PPS_SETTLE_TIME: Duration = Duration::from_millis(1100);

/// The central object: presents a named set of [`DeviceStub`]s as one
/// synchronized instrument.
///
/// Fan-out (`execute`, `collect`, the synchronization protocol) iterates
/// devices in a fixed, deterministic order — insertion order — sequentially,
/// per the concurrency model: the coordinator is single-threaded
/// cooperative, and the devices' own clocks do the real-time work.
pub struct Coordinator {
    devices: Mutex<Vec<DeviceHandle>>,
    synced: ReSyncFlag,
    sync_source_policy: SyncSourcePolicy,
    sync_source_set: AtomicBool,
    params: CoordinatorParams,
}

impl Coordinator {
    pub fn new(sync_source_policy: SyncSourcePolicy, params: CoordinatorParams) -> Self {
        Self {
            devices: Mutex::new(Vec::new()),
            synced: ReSyncFlag::new(params.resync_interval),
            sync_source_policy,
            sync_source_set: AtomicBool::new(false),
            params,
        }
    }

    /// Connects to a device at `address:port` and registers it as `name`.
    pub async fn new_usrp(
        &self,
        address: &str,
        name: &str,
        port: u16,
    ) -> Result<(), CoordinatorError> {
        let stub =
            DeviceStub::connect(address, port)
                .await
                .map_err(|cause| CoordinatorError::DeviceUnreachable {
                    address: address.to_string(),
                    port,
                    cause,
                })?;
        self.add_usrp(name, stub).await
    }

    /// Registers an already-connected device stub. Rejects a duplicate
    /// `name` or `(address, port)` pair; otherwise resets any streaming
    /// configs left over on the device and clears the synchronization and
    /// sync-source-election state, since membership just changed.
    pub async fn add_usrp(&self, name: &str, stub: DeviceStub) -> Result<(), CoordinatorError> {
        let mut devices = self.devices.lock().await;
        if devices
            .iter()
            .any(|d| d.name == name || (d.address() == stub.address() && d.port() == stub.port()))
        {
            return Err(CoordinatorError::DuplicateDevice);
        }

        stub.reset_streaming_configs().await?;
        devices.push(DeviceHandle::new(name, stub));
        drop(devices);

        self.synced.reset();
        self.sync_source_set.store(false, Ordering::SeqCst);
        Ok(())
    }

    pub async fn device_names(&self) -> Vec<String> {
        self.devices
            .lock()
            .await
            .iter()
            .map(|d| d.name.clone())
            .collect()
    }

    pub async fn configure_rf_config(
        &self,
        device_name: &str,
        cfg: &RfConfig,
    ) -> Result<(), CoordinatorError> {
        let devices = self.devices.lock().await;
        let handle = find_device(&devices, device_name)?;
        Ok(handle.stub.configure_rf_config(cfg).await?)
    }

    /// Rejects the config before it ever reaches the device if its samples
    /// would clip on transmit.
    pub async fn configure_tx(
        &self,
        device_name: &str,
        cfg: &TxStreamingConfig,
    ) -> Result<(), CoordinatorError> {
        if cfg.samples.tx_clipped() {
            return Err(CoordinatorError::TxClippingRejected);
        }
        let devices = self.devices.lock().await;
        let handle = find_device(&devices, device_name)?;
        Ok(handle.stub.configure_tx(cfg).await?)
    }

    /// Rejects the config before it ever reaches the device if it requests
    /// more than one repetition with a period shorter than the block itself.
    pub async fn configure_rx(
        &self,
        device_name: &str,
        cfg: &RxStreamingConfig,
    ) -> Result<(), CoordinatorError> {
        if !cfg.has_valid_repetition_period() {
            return Err(CoordinatorError::InvalidRepetitionPeriod {
                num_samples: cfg.num_samples,
                repetition_period: cfg.repetition_period,
            });
        }
        let devices = self.devices.lock().await;
        let handle = find_device(&devices, device_name)?;
        Ok(handle.stub.configure_rx(cfg).await?)
    }

    pub async fn reset_streaming_configs(&self, device_name: &str) -> Result<(), CoordinatorError> {
        let devices = self.devices.lock().await;
        let handle = find_device(&devices, device_name)?;
        Ok(handle.stub.reset_streaming_configs().await?)
    }

    /// Runs the synchronization protocol: elects/applies a sync source if
    /// membership changed since the last election, returns immediately if
    /// already synced within `resync_interval`, otherwise retries
    /// `setTimeToZeroNextPps` on every device up to `sync_attempts` times.
    pub async fn synchronize_usrps(&self) -> Result<(), CoordinatorError> {
        let devices = self.devices.lock().await;

        if !self.sync_source_set.load(Ordering::SeqCst) {
            self.apply_sync_source(&devices).await?;
            self.sync_source_set.store(true, Ordering::SeqCst);
        }

        if self.synced.is_set() {
            return Ok(());
        }

        if self.synchronisation_valid(&devices).await? {
            self.synced.set();
            return Ok(());
        }

        for attempt in 1..=self.params.sync_attempts {
            for device in devices.iter() {
                device.stub.set_time_to_zero_next_pps().await?;
            }
            tokio::time::sleep(PPS_SETTLE_TIME).await;

            if self.synchronisation_valid(&devices).await? {
                self.synced.set();
                return Ok(());
            }
            tracing::warn!(attempt, max_attempts = self.params.sync_attempts, "synchronization attempt failed");
        }

        Err(CoordinatorError::SyncFailed {
            attempts: self.params.sync_attempts,
        })
    }

    async fn apply_sync_source(&self, devices: &[DeviceHandle]) -> Result<(), CoordinatorError> {
        let source = match self.sync_source_policy {
            SyncSourcePolicy::Internal if devices.len() > 1 => {
                return Err(CoordinatorError::SyncUnsupported {
                    count: devices.len(),
                });
            }
            SyncSourcePolicy::Internal => SyncSource::Internal,
            SyncSourcePolicy::External => SyncSource::External,
            SyncSourcePolicy::Auto if devices.len() <= 1 => SyncSource::Internal,
            SyncSourcePolicy::Auto => SyncSource::External,
        };

        for device in devices {
            device.stub.set_sync_source(source).await?;
        }
        Ok(())
    }

    /// `true` iff every device's `currentFpgaTime` falls within
    /// `sync_threshold_sec` of the others. Queried in fixed iteration
    /// order; the threshold must dominate round-trip jitter.
    async fn synchronisation_valid(&self, devices: &[DeviceHandle]) -> Result<bool, CoordinatorError> {
        let mut times = Vec::with_capacity(devices.len());
        for device in devices {
            times.push(device.stub.current_fpga_time().await?);
        }
        let max = times.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let min = times.iter().copied().fold(f64::INFINITY, f64::min);
        Ok(max - min < self.params.sync_threshold_sec)
    }

    /// Synchronizes, computes a shared arming time from the slowest
    /// device's current fpga time, and fans `arm(baseTime)` out to every
    /// device. A device's failure doesn't abort the fan-out; every device is
    /// called and failures are aggregated afterward.
    pub async fn execute(&self) -> Result<(), CoordinatorError> {
        self.synchronize_usrps().await?;

        let devices = self.devices.lock().await;

        let mut base_time = f64::NEG_INFINITY;
        for device in devices.iter() {
            base_time = base_time.max(device.stub.current_fpga_time().await?);
        }
        base_time += self.params.base_time_offset_sec;

        let mut errors = Vec::new();
        for device in devices.iter() {
            if let Err(cause) = device.stub.arm(base_time).await {
                errors.push(PerDeviceError::new(&device.name, cause));
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(AggregatedError {
                total_devices: devices.len(),
                errors,
            }
            .into())
        }
    }

    /// Fans `collect()` out to every device, in fixed order. All-or-nothing:
    /// on any device failure the partial mapping is discarded and only the
    /// aggregated error is raised. On full success, fails with
    /// `RxClippingDetected` if any returned signal is clipped.
    pub async fn collect(&self) -> Result<HashMap<String, Vec<MimoSignal>>, CoordinatorError> {
        let devices = self.devices.lock().await;

        let mut collected = HashMap::with_capacity(devices.len());
        let mut errors = Vec::new();
        for device in devices.iter() {
            match device.stub.collect().await {
                Ok(signals) => {
                    collected.insert(device.name.clone(), signals);
                }
                Err(cause) => errors.push(PerDeviceError::new(&device.name, cause)),
            }
        }

        if !errors.is_empty() {
            return Err(AggregatedError {
                total_devices: devices.len(),
                errors,
            }
            .into());
        }

        for (device_name, signals) in &collected {
            if signals.iter().any(MimoSignal::rx_clipped) {
                return Err(CoordinatorError::RxClippingDetected {
                    device_name: device_name.clone(),
                });
            }
        }

        Ok(collected)
    }
}

fn find_device<'a>(
    devices: &'a [DeviceHandle],
    name: &str,
) -> Result<&'a DeviceHandle, CoordinatorError> {
    devices
        .iter()
        .find(|d| d.name == name)
        .ok_or_else(|| CoordinatorError::UnknownDevice {
            name: name.to_string(),
        })
}
