//! Thermo-electric cooler (TEC) driver.

use embedded_hal::digital::v2::OutputPin;

/// Commanded state of a [`Cooler`]
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ActuatorState {
    #[default]
    Off,
    On,
}

impl ActuatorState {
    #[inline]
    pub const fn is_on(self) -> bool {
        matches!(self, Self::On)
    }

    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Off => "off",
            Self::On => "on",
        }
    }
}

impl From<bool> for ActuatorState {
    fn from(value: bool) -> Self {
        if value {
            Self::On
        } else {
            Self::Off
        }
    }
}

/// Thermo-electric cooler (TEC) driver.
///
/// Commands are idempotent: turning on a cooler that is already on, or off one that is
/// already off, must not touch the hardware.
pub trait Cooler {
    type Error;

    fn turn_on(&mut self) -> Result<(), Self::Error>;

    fn turn_off(&mut self) -> Result<(), Self::Error>;

    /// Last successfully commanded state. The element has no feedback line, so this is
    /// never a hardware read.
    fn is_active(&self) -> bool;

    fn state(&self) -> ActuatorState {
        ActuatorState::from(self.is_active())
    }
}

/// A cooler that uses a GPIO pin.
pub struct PinCooler<PIN: OutputPin> {
    pin: PIN,
    active: bool,
}

impl<PIN: OutputPin> PinCooler<PIN> {
    /// Drives the pin low so the cooler starts in a known off state.
    pub fn new(mut pin: PIN) -> Result<Self, PIN::Error> {
        pin.set_low()?;
        Ok(Self { pin, active: false })
    }

    /// Wraps a pin the caller already holds low
    pub(crate) const fn from_low(pin: PIN) -> Self {
        Self { pin, active: false }
    }

    pub fn pin(&self) -> &PIN {
        &self.pin
    }
}

impl<PIN: OutputPin> Cooler for PinCooler<PIN> {
    type Error = PIN::Error;

    fn turn_on(&mut self) -> Result<(), Self::Error> {
        if self.active {
            return Ok(());
        }
        self.pin.set_high()?;
        self.active = true;
        Ok(())
    }

    fn turn_off(&mut self) -> Result<(), Self::Error> {
        if !self.active {
            return Ok(());
        }
        self.pin.set_low()?;
        self.active = false;
        Ok(())
    }

    fn is_active(&self) -> bool {
        self.active
    }
}
