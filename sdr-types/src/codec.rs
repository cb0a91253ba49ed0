//! Lossless round-trip between in-memory complex sample arrays and the
//! wire-friendly `(reals, imags)` pair form.

use crate::{
    Complex64,
    SamplePair,
    error::{
        LengthMismatch,
        ShapeError,
    },
};

/// A complex sample array with an explicit shape.
///
/// `encode` only accepts rank-1 arrays; anything else is a shape error
/// rather than being silently flattened. Callers building a one-dimensional
/// signal should use [`Signal::one_d`].
#[derive(Clone, Debug, PartialEq)]
pub struct Signal {
    shape: Vec<usize>,
    data: Vec<Complex64>,
}

impl Signal {
    pub fn one_d(data: Vec<Complex64>) -> Self {
        let len = data.len();
        Self {
            shape: vec![len],
            data,
        }
    }

    /// Builds a signal with an explicit shape, e.g. `(2, n)` for a
    /// two-antenna block. `shape`'s product must equal `data.len()`.
    pub fn from_shape(shape: Vec<usize>, data: Vec<Complex64>) -> Self {
        debug_assert_eq!(shape.iter().product::<usize>(), data.len());
        Self { shape, data }
    }

    pub fn rank(&self) -> usize {
        self.shape.len()
    }
}

/// Encodes a one-dimensional signal as a `(reals, imags)` pair.
pub fn encode(signal: &Signal) -> Result<SamplePair, ShapeError> {
    if signal.rank() != 1 {
        return Err(ShapeError {
            rank: signal.rank(),
        });
    }

    let mut reals = Vec::with_capacity(signal.data.len());
    let mut imags = Vec::with_capacity(signal.data.len());
    for sample in &signal.data {
        reals.push(sample.re);
        imags.push(sample.im);
    }
    Ok((reals, imags))
}

/// Decodes a `(reals, imags)` pair back into a complex sample sequence.
pub fn decode(pair: &SamplePair) -> Result<Vec<Complex64>, LengthMismatch> {
    let (reals, imags) = pair;
    if reals.len() != imags.len() {
        return Err(LengthMismatch {
            real_len: reals.len(),
            imag_len: imags.len(),
        });
    }
    Ok(reals
        .iter()
        .zip(imags)
        .map(|(re, im)| Complex64::new(*re, *im))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn complex(re: f64, im: f64) -> Complex64 {
        Complex64::new(re, im)
    }

    #[test]
    fn round_trip_is_lossless() {
        let x = vec![complex(1.0, -0.5), complex(0.0, 0.25), complex(-1.0, 0.0)];
        let encoded = encode(&Signal::one_d(x.clone())).unwrap();
        let decoded = decode(&encoded).unwrap();
        assert_eq!(decoded, x);
    }

    #[test]
    fn pure_real_input_round_trips_with_zero_imaginary() {
        let x = vec![complex(1.0, 0.0), complex(-2.5, 0.0)];
        let (reals, imags) = encode(&Signal::one_d(x.clone())).unwrap();
        assert_eq!(reals, vec![1.0, -2.5]);
        assert_eq!(imags, vec![0.0, 0.0]);
        assert_eq!(decode(&(reals, imags)).unwrap(), x);
    }

    #[test]
    fn multi_dimensional_signal_is_rejected() {
        let signal = Signal::from_shape(vec![2, 3], vec![complex(0.0, 0.0); 6]);
        let error = encode(&signal).unwrap_err();
        assert_eq!(error.rank, 2);
    }

    #[test]
    fn length_mismatch_is_rejected() {
        let error = decode(&(vec![1.0, 2.0], vec![1.0])).unwrap_err();
        assert_eq!(error.real_len, 2);
        assert_eq!(error.imag_len, 1);
    }
}
