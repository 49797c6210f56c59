//! Simulated hardware, for running the regulation loop without a board.

use embedded_hal::digital::v2::{OutputPin, StatefulOutputPin};

use crate::{
    cooler::PinCooler,
    thermometer::{Temperature, TemperatureReading, Thermometer},
};

/// A cooler driving a [`SimPin`]
pub type SimCooler = PinCooler<SimPin>;

/// Creates a [`SimCooler`] in the off state. A fresh [`SimPin`] is already low, so no
/// write is made.
pub const fn sim_cooler() -> SimCooler {
    PinCooler::from_low(SimPin::new())
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimPinError;

/// Output pin that records every write
#[derive(Debug, Default)]
pub struct SimPin {
    high: bool,
    set_high: u32,
    set_low: u32,
    fail: bool,
}

impl SimPin {
    pub const fn new() -> Self {
        Self {
            high: false,
            set_high: 0,
            set_low: 0,
            fail: false,
        }
    }

    pub const fn is_high(&self) -> bool {
        self.high
    }

    /// Number of successful `set_high` writes
    pub const fn set_high_count(&self) -> u32 {
        self.set_high
    }

    /// Number of successful `set_low` writes
    pub const fn set_low_count(&self) -> u32 {
        self.set_low
    }

    /// Makes every following write fail until cleared
    pub fn fail_writes(&mut self, fail: bool) {
        self.fail = fail;
    }
}

impl OutputPin for SimPin {
    type Error = SimPinError;

    fn set_low(&mut self) -> Result<(), Self::Error> {
        if self.fail {
            return Err(SimPinError);
        }
        self.high = false;
        self.set_low += 1;
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        if self.fail {
            return Err(SimPinError);
        }
        self.high = true;
        self.set_high += 1;
        Ok(())
    }
}

impl StatefulOutputPin for SimPin {
    fn is_set_high(&self) -> Result<bool, Self::Error> {
        Ok(self.high)
    }

    fn is_set_low(&self) -> Result<bool, Self::Error> {
        Ok(!self.high)
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SimFault;

/// A thermometer that returns whatever reading it was last given
#[derive(Debug, Default)]
pub struct SimThermometer {
    reading: TemperatureReading,
    alert: Option<bool>,
    reads: u32,
}

impl SimThermometer {
    pub fn new(temp: impl Into<Temperature>) -> Self {
        Self {
            reading: TemperatureReading::valid(temp.into()),
            alert: None,
            reads: 0,
        }
    }

    pub fn set(&mut self, temp: impl Into<Temperature>) {
        self.reading = TemperatureReading::valid(temp.into());
    }

    pub fn set_reading(&mut self, reading: TemperatureReading) {
        self.reading = reading;
    }

    /// Fails every read until a temperature is set again
    pub fn fail(&mut self) {
        self.reading = TemperatureReading::invalid();
    }

    pub fn set_alert(&mut self, alert: Option<bool>) {
        self.alert = alert;
    }

    /// Number of hardware transactions performed
    pub fn reads(&self) -> u32 {
        self.reads
    }
}

impl Thermometer for SimThermometer {
    type Error = SimFault;

    async fn read(&mut self) -> Result<Temperature, Self::Error> {
        self.reads += 1;
        self.reading.value().ok_or(SimFault)
    }

    fn alert(&mut self) -> Option<bool> {
        self.alert
    }
}

#[cfg(test)]
mod tests {
    use futures_executor::block_on;

    use super::*;
    use crate::cooler::Cooler;

    #[test]
    fn thermometer_replays_reading() {
        let mut therm = SimThermometer::new(Temperature::from_num(25));
        assert_eq!(block_on(therm.read()), Ok(Temperature::from_num(25)));

        therm.fail();
        assert_eq!(block_on(therm.read()), Err(SimFault));
        assert!(!block_on(therm.poll()).is_valid());

        therm.set(Temperature::from_num(30.5));
        assert_eq!(
            block_on(therm.poll()),
            TemperatureReading::valid(Temperature::from_num(30.5))
        );
        assert_eq!(therm.reads(), 4);
    }

    #[test]
    fn sim_cooler_starts_off_without_writes() {
        let cooler = sim_cooler();
        assert!(!cooler.is_active());
        assert!(!cooler.pin().is_high());
        assert_eq!(cooler.pin().set_low_count(), 0);
        assert_eq!(cooler.pin().set_high_count(), 0);
    }

    #[test]
    fn pin_counts_writes() {
        let mut pin = SimPin::new();
        pin.set_high().unwrap();
        pin.set_high().unwrap();
        pin.set_low().unwrap();

        assert_eq!(pin.set_high_count(), 2);
        assert_eq!(pin.set_low_count(), 1);
        assert_eq!(pin.is_set_low(), Ok(true));

        pin.fail_writes(true);
        assert_eq!(pin.set_high(), Err(SimPinError));
        assert!(!pin.is_high());
    }
}
