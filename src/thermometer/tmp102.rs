//! Implementation for the TMP102 temperature sensor.
//!
//! The sensor converts continuously at 4 Hz, so a read is a single register fetch and
//! never waits on a conversion. Its ALERT output can be programmed to trip at the
//! controller's thresholds, giving a hardware view of the same hysteresis band.

use embedded_hal::{
    blocking::i2c::{Write, WriteRead},
    digital::v2::InputPin,
};

use crate::{
    controller::ControllerConfig,
    thermometer::{Temperature, Thermometer},
};

pub const TEMPERATURE: u8 = 0x00;
pub const CONFIGURATION: u8 = 0x01;
pub const T_LOW: u8 = 0x02;
pub const T_HIGH: u8 = 0x03;

// Configuration register, first byte
const SD: u8 = 1 << 0;
const TM: u8 = 1 << 1;
const POL: u8 = 1 << 2;
const FAULT_QUEUE: u8 = 0b11 << 3;
/// Two consecutive out-of-band conversions before ALERT changes
const FAULT_QUEUE_2: u8 = 0b01 << 3;

/// Raw register values are 12 bit two's complement
const RAW_MIN: i32 = -(1 << 11);
const RAW_MAX: i32 = (1 << 11) - 1;

/// Bus address, selected by what the ADD0 pin is tied to
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Address {
    #[default]
    Gnd,
    Vcc,
    Sda,
    Scl,
}

impl Address {
    #[inline]
    pub const fn addr(self) -> u8 {
        match self {
            Self::Gnd => 0x48,
            Self::Vcc => 0x49,
            Self::Sda => 0x4A,
            Self::Scl => 0x4B,
        }
    }
}

#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Error<E> {
    /// I2C transaction failed
    Bus(E),

    /// The ALERT pin could not be read
    AlertPin,

    /// Temperature can't be represented in a TMP102 register (-128 to 127.9375 °C)
    OutOfRange,
}

impl<E> Error<E> {
    pub fn as_str(&self) -> &'static str {
        match self {
            Error::Bus(_) => "I2C bus error",
            Error::AlertPin => "Alert pin error",
            Error::OutOfRange => "Temperature out of range",
        }
    }
}

impl<E> From<E> for Error<E> {
    fn from(value: E) -> Self {
        Self::Bus(value)
    }
}

impl<E> core::fmt::Display for Error<E> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decodes a temperature, T_LOW or T_HIGH register
#[inline]
pub fn decode(buf: [u8; 2]) -> Temperature {
    // Left-justified; the arithmetic shift keeps the sign
    let raw = i16::from_be_bytes(buf) >> 4;
    Temperature::from_bits(i32::from(raw))
}

/// Encodes a temperature into a T_LOW or T_HIGH register
pub fn encode(temp: Temperature) -> Option<[u8; 2]> {
    let bits = temp.to_bits();
    if !(RAW_MIN..=RAW_MAX).contains(&bits) {
        return None;
    }
    #[allow(clippy::cast_possible_truncation)]
    let raw = (bits as i16) << 4;
    Some(raw.to_be_bytes())
}

pub struct Tmp102<I2C, ALERT> {
    i2c: I2C,
    addr: Address,
    alert: Option<ALERT>,
}

impl<I2C, ALERT, E> Tmp102<I2C, ALERT>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
    ALERT: InputPin,
{
    pub const fn new(i2c: I2C, addr: Address, alert: Option<ALERT>) -> Self {
        Self { i2c, addr, alert }
    }

    /// Releases the bus and alert pin
    pub fn release(self) -> (I2C, Option<ALERT>) {
        (self.i2c, self.alert)
    }

    fn read_register(&mut self, reg: u8) -> Result<[u8; 2], Error<E>> {
        let mut buf = [0u8; 2];
        self.i2c.write_read(self.addr.addr(), &[reg], &mut buf)?;
        Ok(buf)
    }

    fn write_register(&mut self, reg: u8, data: [u8; 2]) -> Result<(), Error<E>> {
        self.i2c.write(self.addr.addr(), &[reg, data[0], data[1]])?;
        Ok(())
    }

    /// Reads the last completed conversion
    pub fn temperature(&mut self) -> Result<Temperature, Error<E>> {
        self.read_register(TEMPERATURE).map(decode)
    }

    /// Reads the configured alert thresholds as `(T_LOW, T_HIGH)`
    pub fn thresholds(&mut self) -> Result<(Temperature, Temperature), Error<E>> {
        let low = decode(self.read_register(T_LOW)?);
        let high = decode(self.read_register(T_HIGH)?);
        Ok((low, high))
    }

    /// Programs ALERT to assert at `max_temp` and release at the re-arm temperature.
    ///
    /// Uses comparator mode with an active-low ALERT, so the pin level tracks the
    /// same band the controller enforces.
    pub fn configure_alert(&mut self, config: &ControllerConfig) -> Result<(), Error<E>> {
        let high = encode(config.max_temp()).ok_or(Error::OutOfRange)?;
        let low = encode(config.rearm_temp()).ok_or(Error::OutOfRange)?;

        self.write_register(T_HIGH, high)?;
        self.write_register(T_LOW, low)?;

        let mut cfg = self.read_register(CONFIGURATION)?;
        cfg[0] &= !(TM | POL | FAULT_QUEUE);
        cfg[0] |= FAULT_QUEUE_2;
        self.write_register(CONFIGURATION, cfg)
    }

    /// Enters or leaves shutdown mode
    pub fn shutdown(&mut self, enable: bool) -> Result<(), Error<E>> {
        let mut cfg = self.read_register(CONFIGURATION)?;
        if enable {
            cfg[0] |= SD;
        } else {
            cfg[0] &= !SD;
        }
        self.write_register(CONFIGURATION, cfg)
    }

    /// Whether ALERT is asserted. Errors if no pin was wired or it can't be read.
    pub fn alert_state(&self) -> Result<bool, Error<E>> {
        let pin = self.alert.as_ref().ok_or(Error::AlertPin)?;
        pin.is_low().map_err(|_| Error::AlertPin)
    }
}

impl<I2C, ALERT, E> Thermometer for Tmp102<I2C, ALERT>
where
    I2C: WriteRead<Error = E> + Write<Error = E>,
    ALERT: InputPin,
{
    type Error = Error<E>;

    async fn read(&mut self) -> Result<Temperature, Self::Error> {
        self.temperature()
    }

    fn alert(&mut self) -> Option<bool> {
        self.alert_state().ok()
    }
}
