//! Temperature sensor interface

pub mod tmp102;

use fixed::types::I28F4;

/// I28F4 is a fixed point number with 4 fractional bits and 28 integer bits.
/// This gives us a precision of 0.0625 degrees Celsius & a range of (-2^27, 2^27 - 0.0625).
pub type Temperature = I28F4;

/// A single poll of a [`Thermometer`].
///
/// An invalid reading carries no temperature at all, so a faulted sensor can never be
/// mistaken for a stale or zero value.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
pub struct TemperatureReading {
    value: Option<Temperature>,
}

impl TemperatureReading {
    #[inline]
    pub const fn valid(value: Temperature) -> Self {
        Self { value: Some(value) }
    }

    #[inline]
    pub const fn invalid() -> Self {
        Self { value: None }
    }

    /// Temperature in degrees Celsius, or `None` if the sensor faulted.
    #[inline]
    pub const fn value(&self) -> Option<Temperature> {
        self.value
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.value.is_some()
    }
}

impl<E> From<Result<Temperature, E>> for TemperatureReading {
    fn from(value: Result<Temperature, E>) -> Self {
        Self { value: value.ok() }
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for TemperatureReading {
    fn format(&self, f: defmt::Formatter) {
        match self.value {
            Some(t) => defmt::write!(f, "{=f32}", t.to_num::<f32>()),
            None => defmt::write!(f, "invalid"),
        }
    }
}

#[allow(async_fn_in_trait)]
pub trait Thermometer {
    type Error;

    /// Read the temperature in degrees Celsius
    ///
    /// Performs a single hardware transaction.
    async fn read(&mut self) -> Result<Temperature, Self::Error>;

    /// Read the temperature, marking the reading invalid if the transaction failed.
    async fn poll(&mut self) -> TemperatureReading {
        TemperatureReading::from(self.read().await)
    }

    /// State of the sensor's over-temperature alert line, if it has one.
    fn alert(&mut self) -> Option<bool> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reading_from_result() {
        let ok: Result<Temperature, ()> = Ok(Temperature::from_num(21.5));
        let reading = TemperatureReading::from(ok);
        assert!(reading.is_valid());
        assert_eq!(reading.value(), Some(Temperature::from_num(21.5)));

        let err: Result<Temperature, ()> = Err(());
        let reading = TemperatureReading::from(err);
        assert!(!reading.is_valid());
        assert_eq!(reading.value(), None);
    }

    #[test]
    fn default_reading_is_invalid() {
        assert_eq!(TemperatureReading::default(), TemperatureReading::invalid());
    }
}
