//! Controller to decide when the [`Cooler`](crate::cooler::Cooler) should run.

use crate::thermometer::Temperature;

pub mod hysteresis;

pub use hysteresis::Hysteresis;

pub trait Controller {
    /// Run the controller for a single trusted reading
    ///
    /// `cooling` is whether the controller is currently cooling. Returns whether the
    /// cooler should be on.
    fn run(&mut self, temp: Temperature, cooling: bool) -> bool;
}

/// Why a [`ControllerConfig`] was rejected
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// Maximum temperature is NaN or infinite
    NonFiniteMaxTemp,
    /// Hysteresis margin is NaN or infinite
    NonFiniteHysteresis,
    /// Hysteresis margin is zero or negative
    NonPositiveHysteresis,
    /// A threshold doesn't fit in a [`Temperature`]
    OutOfRange,
}

impl ConfigError {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfigError::NonFiniteMaxTemp => "Maximum temperature is not finite",
            ConfigError::NonFiniteHysteresis => "Hysteresis is not finite",
            ConfigError::NonPositiveHysteresis => "Hysteresis must be positive",
            ConfigError::OutOfRange => "Threshold out of range",
        }
    }
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl core::error::Error for ConfigError {}

/// Thresholds of the regulation loop. Immutable once built.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct ControllerConfig {
    max_temp: Temperature,
    hysteresis: Temperature,
}

impl ControllerConfig {
    /// Builds a config from degrees Celsius.
    ///
    /// Values are rounded to the 0.0625 °C resolution of [`Temperature`], so a margin
    /// below half of that is rejected as non-positive.
    pub fn new(max_temp: f32, hysteresis: f32) -> Result<Self, ConfigError> {
        if !max_temp.is_finite() {
            return Err(ConfigError::NonFiniteMaxTemp);
        }
        if !hysteresis.is_finite() {
            return Err(ConfigError::NonFiniteHysteresis);
        }
        let max_temp = Temperature::checked_from_num(max_temp).ok_or(ConfigError::OutOfRange)?;
        let hysteresis =
            Temperature::checked_from_num(hysteresis).ok_or(ConfigError::OutOfRange)?;
        Self::from_fixed(max_temp, hysteresis)
    }

    pub fn from_fixed(max_temp: Temperature, hysteresis: Temperature) -> Result<Self, ConfigError> {
        if hysteresis <= Temperature::ZERO {
            return Err(ConfigError::NonPositiveHysteresis);
        }
        if max_temp.checked_sub(hysteresis).is_none() {
            return Err(ConfigError::OutOfRange);
        }
        Ok(Self {
            max_temp,
            hysteresis,
        })
    }

    /// Trip point: readings at or above it start cooling
    #[inline]
    pub const fn max_temp(&self) -> Temperature {
        self.max_temp
    }

    #[inline]
    pub const fn hysteresis(&self) -> Temperature {
        self.hysteresis
    }

    /// Re-arm point: readings at or below it stop cooling
    #[inline]
    pub fn rearm_temp(&self) -> Temperature {
        // Checked at construction
        self.max_temp.saturating_sub(self.hysteresis)
    }
}

#[cfg(feature = "defmt")]
impl defmt::Format for ControllerConfig {
    fn format(&self, f: defmt::Formatter) {
        defmt::write!(
            f,
            "max {=f32} hysteresis {=f32}",
            self.max_temp.to_num::<f32>(),
            self.hysteresis.to_num::<f32>()
        );
    }
}
