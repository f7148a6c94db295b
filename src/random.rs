// Uniform random number sources used by every sampling routine.
//
// Production code passes any `rand` generator (StdRng, SmallRng, ...). Tests
// that need exact replay pass a `FakeStream` holding the numbers to return.

use rand::{Rng, RngCore};

use crate::error::{PhaseSpaceError, Result};

/// A source of uniform random numbers in [0, 1).
pub trait RandomSource {
    /// Return the next uniform random number.
    fn random_number(&mut self) -> Result<f64>;
}

impl<R: RngCore> RandomSource for R {
    #[inline(always)]
    fn random_number(&mut self) -> Result<f64> {
        Ok(self.gen::<f64>())
    }
}

/// Replays a fixed sequence of random numbers.
///
/// Running past the end of the sequence is an error rather than a wrap-around,
/// so a test that consumes more numbers than expected fails loudly.
#[derive(Debug, Clone, Default)]
pub struct FakeStream {
    numbers: Vec<f64>,
    position: usize,
}

impl FakeStream {
    pub fn new(numbers: Vec<f64>) -> Self {
        Self {
            numbers,
            position: 0,
        }
    }

    /// Number of values handed out so far
    pub fn consumed(&self) -> usize {
        self.position
    }

    pub fn remaining(&self) -> usize {
        self.numbers.len() - self.position
    }

    /// Restart the stream from its first value
    pub fn rewind(&mut self) {
        self.position = 0;
    }
}

impl RandomSource for FakeStream {
    fn random_number(&mut self) -> Result<f64> {
        match self.numbers.get(self.position) {
            Some(&number) => {
                self.position += 1;
                Ok(number)
            }
            None => Err(PhaseSpaceError::FakeStreamExhausted {
                consumed: self.position,
            }),
        }
    }
}

/// Check that an explicitly supplied random number lies in [0, 1).
pub(crate) fn check_random_number(random_number: f64) -> Result<()> {
    if (0.0..1.0).contains(&random_number) {
        Ok(())
    } else {
        Err(PhaseSpaceError::InvalidRandomNumber(random_number))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_fake_stream_replays_in_order() {
        let mut stream = FakeStream::new(vec![0.0, 0.5, 1.0 - 1e-15]);

        assert_eq!(stream.random_number().unwrap(), 0.0);
        assert_eq!(stream.random_number().unwrap(), 0.5);
        assert_eq!(stream.random_number().unwrap(), 1.0 - 1e-15);
        assert_eq!(stream.consumed(), 3);
        assert_eq!(stream.remaining(), 0);
    }

    #[test]
    fn test_fake_stream_exhaustion_is_an_error() {
        let mut stream = FakeStream::new(vec![0.25]);
        stream.random_number().unwrap();

        let err = stream.random_number().unwrap_err();
        assert!(matches!(
            err,
            PhaseSpaceError::FakeStreamExhausted { consumed: 1 }
        ));
    }

    #[test]
    fn test_fake_stream_rewind() {
        let mut stream = FakeStream::new(vec![0.25, 0.75]);
        stream.random_number().unwrap();
        stream.rewind();
        assert_eq!(stream.random_number().unwrap(), 0.25);
    }

    #[test]
    fn test_rng_is_a_random_source() {
        let mut rng1 = StdRng::seed_from_u64(12345);
        let mut rng2 = StdRng::seed_from_u64(12345);

        for _ in 0..100 {
            let val = rng1.random_number().unwrap();
            assert!(val >= 0.0 && val < 1.0, "Value {} out of range [0, 1)", val);
            assert_eq!(val, rng2.random_number().unwrap());
        }
    }

    #[test]
    fn test_check_random_number() {
        assert!(check_random_number(0.0).is_ok());
        assert!(check_random_number(1.0 - 1e-15).is_ok());
        assert!(check_random_number(1.0).is_err());
        assert!(check_random_number(-0.1).is_err());
        assert!(check_random_number(f64::NAN).is_err());
    }
}
