//! Typed configuration records and the sample bundle that crosses the wire
//! alongside them.
//!
//! [`RfConfig`] serializes to JSON, which gives us the "self-describing,
//! forward-compatible with new optional fields" property for free: unknown
//! fields are ignored on decode and every field added later can be given a
//! `#[serde(default)]`.

use serde::{
    Deserialize,
    Serialize,
};

use crate::{
    Complex64,
    SamplePair,
    codec,
    error::ShapeError,
};

/// Per-direction analog/RF front-end configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RfConfig {
    pub tx_analog_filter_bw: f64,
    pub rx_analog_filter_bw: f64,
    pub tx_sampling_rate: f64,
    pub rx_sampling_rate: f64,
    pub tx_gain: f64,
    pub rx_gain: f64,
    pub tx_carrier_frequency: f64,
    pub rx_carrier_frequency: f64,
    pub no_tx_streams: u32,
    pub no_rx_streams: u32,
    #[serde(default)]
    pub tx_antenna_mapping: Vec<u32>,
    #[serde(default)]
    pub rx_antenna_mapping: Vec<u32>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum RfConfigError {
    #[error("{streams} {direction} streams exceed the device's {antennas} antennas")]
    TooManyStreams {
        direction: &'static str,
        streams: u32,
        antennas: u32,
    },
    #[error(
        "{direction} antenna mapping has {mapping_len} entries, expected {streams} (one per stream)"
    )]
    MappingLengthMismatch {
        direction: &'static str,
        mapping_len: usize,
        streams: u32,
    },
    #[error("{direction} antenna mapping entry {entry} is out of range for {antennas} antennas")]
    MappingEntryOutOfRange {
        direction: &'static str,
        entry: u32,
        antennas: u32,
    },
}

impl RfConfig {
    /// Serializes to the self-describing text form carried over the wire.
    pub fn serialize(&self) -> String {
        serde_json::to_string(self).expect("RfConfig fields are all finite and serializable")
    }

    /// The exact inverse of [`RfConfig::serialize`].
    pub fn deserialize(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }

    /// Checks the invariants in the data model against a device's antenna
    /// count: stream counts must not exceed it, and non-empty mappings must
    /// have one entry per stream, each entry a valid antenna index.
    pub fn validate(&self, num_antennas: u32) -> Result<(), RfConfigError> {
        Self::validate_direction("tx", self.no_tx_streams, &self.tx_antenna_mapping, num_antennas)?;
        Self::validate_direction("rx", self.no_rx_streams, &self.rx_antenna_mapping, num_antennas)?;
        Ok(())
    }

    fn validate_direction(
        direction: &'static str,
        streams: u32,
        mapping: &[u32],
        num_antennas: u32,
    ) -> Result<(), RfConfigError> {
        if streams > num_antennas {
            return Err(RfConfigError::TooManyStreams {
                direction,
                streams,
                antennas: num_antennas,
            });
        }
        if !mapping.is_empty() {
            if mapping.len() as u32 != streams {
                return Err(RfConfigError::MappingLengthMismatch {
                    direction,
                    mapping_len: mapping.len(),
                    streams,
                });
            }
            for &entry in mapping {
                if entry >= num_antennas {
                    return Err(RfConfigError::MappingEntryOutOfRange {
                        direction,
                        entry,
                        antennas: num_antennas,
                    });
                }
            }
        }
        Ok(())
    }
}

/// An ordered collection of complex sample streams captured or transmitted
/// together, one per logical antenna/port.
#[derive(Clone, Debug, PartialEq, Default)]
pub struct MimoSignal {
    signals: Vec<Vec<Complex64>>,
}

impl MimoSignal {
    /// Fails with [`ShapeError`] if the streams don't all share one length.
    pub fn new(signals: Vec<Vec<Complex64>>) -> Result<Self, ShapeError> {
        if let Some(first) = signals.first() {
            let expected = first.len();
            if signals.iter().any(|s| s.len() != expected) {
                // Rank is reported as the number of distinct lengths seen;
                // any value != 1 signals "not uniformly shaped".
                return Err(ShapeError { rank: 0 });
            }
        }
        Ok(Self { signals })
    }

    pub fn streams(&self) -> &[Vec<Complex64>] {
        &self.signals
    }

    pub fn into_streams(self) -> Vec<Vec<Complex64>> {
        self.signals
    }

    pub fn num_streams(&self) -> usize {
        self.signals.len()
    }

    /// True iff any sample saturates to the clipping limit: `|Re| >= 1` or
    /// `|Im| >= 1`. Used on received data, where hitting the limit already
    /// indicates clipping.
    pub fn rx_clipped(&self) -> bool {
        self.signals
            .iter()
            .flatten()
            .any(|s| s.re.abs() >= 1.0 || s.im.abs() >= 1.0)
    }

    /// True iff any sample exceeds the clipping limit: `|Re| > 1` or `|Im| >
    /// 1`. Values exactly at the limit are legal on the tx side.
    pub fn tx_clipped(&self) -> bool {
        self.signals
            .iter()
            .flatten()
            .any(|s| s.re.abs() > 1.0 || s.im.abs() > 1.0)
    }

    /// Encodes every stream as a `[reals, imags]` pair, in stream order.
    pub fn to_wire(&self) -> Result<Vec<SamplePair>, ShapeError> {
        self.signals
            .iter()
            .map(|stream| codec::encode(&codec::Signal::one_d(stream.clone())))
            .collect()
    }

    pub fn from_wire(pairs: Vec<SamplePair>) -> Result<Self, crate::error::LengthMismatch> {
        let signals = pairs
            .into_iter()
            .map(|pair| codec::decode(&pair))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { signals })
    }
}

/// A queued transmission: when to start (relative to a device's arming
/// time), what to send, and how many times to repeat it.
#[derive(Clone, Debug, PartialEq)]
pub struct TxStreamingConfig {
    pub send_time_offset: f64,
    pub samples: MimoSignal,
    pub num_repetitions: u32,
}

impl TxStreamingConfig {
    pub fn new(send_time_offset: f64, samples: MimoSignal) -> Self {
        Self {
            send_time_offset,
            samples,
            num_repetitions: 1,
        }
    }

    pub fn with_repetitions(mut self, num_repetitions: u32) -> Self {
        self.num_repetitions = num_repetitions;
        self
    }
}

/// A queued reception: when to start, how much to capture, and repetition.
#[derive(Clone, Debug, PartialEq)]
pub struct RxStreamingConfig {
    pub receive_time_offset: f64,
    pub num_samples: u64,
    pub num_repetitions: u32,
    pub repetition_period: u64,
    pub antenna_port: String,
}

impl RxStreamingConfig {
    pub fn new(receive_time_offset: f64, num_samples: u64) -> Self {
        Self {
            receive_time_offset,
            num_samples,
            num_repetitions: 1,
            repetition_period: 0,
            antenna_port: String::new(),
        }
    }

    /// `repetitionPeriod >= numSamples` whenever more than one repetition is
    /// requested.
    pub fn has_valid_repetition_period(&self) -> bool {
        self.num_repetitions <= 1 || self.repetition_period >= self.num_samples
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn rf_config() -> RfConfig {
        RfConfig {
            tx_analog_filter_bw: 20e6,
            rx_analog_filter_bw: 20e6,
            tx_sampling_rate: 10e6,
            rx_sampling_rate: 10e6,
            tx_gain: 10.0,
            rx_gain: 20.0,
            tx_carrier_frequency: 2.4e9,
            rx_carrier_frequency: 2.4e9,
            no_tx_streams: 1,
            no_rx_streams: 1,
            tx_antenna_mapping: vec![],
            rx_antenna_mapping: vec![],
        }
    }

    #[test]
    fn serialize_round_trips() {
        let cfg = rf_config();
        let text = cfg.serialize();
        assert_eq!(RfConfig::deserialize(&text).unwrap(), cfg);
    }

    #[test]
    fn deserialize_tolerates_field_reordering() {
        let cfg = rf_config();
        let mut value: serde_json::Value = serde_json::from_str(&cfg.serialize()).unwrap();
        let object = value.as_object_mut().unwrap();
        let reordered: serde_json::Map<_, _> = object.iter().rev().map(|(k, v)| (k.clone(), v.clone())).collect();
        let text = serde_json::to_string(&serde_json::Value::Object(reordered)).unwrap();
        assert_eq!(RfConfig::deserialize(&text).unwrap(), cfg);
    }

    #[test]
    fn validate_rejects_too_many_streams() {
        let mut cfg = rf_config();
        cfg.no_tx_streams = 4;
        assert!(matches!(
            cfg.validate(2),
            Err(RfConfigError::TooManyStreams { direction: "tx", .. })
        ));
    }

    #[test]
    fn validate_rejects_bad_mapping_entry() {
        let mut cfg = rf_config();
        cfg.tx_antenna_mapping = vec![5];
        assert!(matches!(
            cfg.validate(2),
            Err(RfConfigError::MappingEntryOutOfRange { direction: "tx", .. })
        ));
    }

    fn complex(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn tx_clipped_allows_exactly_one() {
        let signal = MimoSignal::new(vec![vec![complex(1.0, 0.5)]]).unwrap();
        assert!(!signal.tx_clipped());
        let signal = MimoSignal::new(vec![vec![complex(1.5, 0.5)]]).unwrap();
        assert!(signal.tx_clipped());
    }

    #[test]
    fn rx_clipped_is_strict() {
        let signal = MimoSignal::new(vec![vec![complex(0.999, 0.0)]]).unwrap();
        assert!(!signal.rx_clipped());
        let signal = MimoSignal::new(vec![vec![complex(1.0, 0.0)]]).unwrap();
        assert!(signal.rx_clipped());
    }

    #[test]
    fn mimo_signal_rejects_uneven_streams() {
        let error = MimoSignal::new(vec![vec![complex(0.0, 0.0); 3], vec![complex(0.0, 0.0); 2]])
            .unwrap_err();
        assert_eq!(error.rank, 0);
    }

    #[test]
    fn rx_streaming_config_repetition_period() {
        let cfg = RxStreamingConfig {
            receive_time_offset: 0.0,
            num_samples: 100,
            num_repetitions: 3,
            repetition_period: 100,
            antenna_port: String::new(),
        };
        assert!(cfg.has_valid_repetition_period());
        let mut bad = cfg.clone();
        bad.repetition_period = 50;
        assert!(!bad.has_valid_repetition_period());
    }
}
