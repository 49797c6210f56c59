//! Closed-loop thermal regulation for the trackpad's Peltier element.
//!
//! A [`ThermalController`] polls a [`Thermometer`], applies a hysteresis band around a
//! configured maximum temperature and drives a [`Cooler`]. Any reading it can't trust
//! forces the cooler off. The last committed [`ControllerStatus`] is what the terminal,
//! display and network reporters read.

#![cfg_attr(not(test), no_std)]
#![warn(clippy::pedantic, clippy::nursery)]
#![allow(clippy::module_name_repetitions, clippy::must_use_candidate)]

pub mod controller;
pub mod cooler;
pub mod line;
pub mod regulator;
pub mod report;
pub mod sim;
pub mod storage;
pub mod thermometer;

pub use controller::{ConfigError, ControllerConfig};
pub use cooler::{ActuatorState, Cooler, PinCooler};
pub use regulator::{ControllerStatus, Fault, RegulatorState, ThermalController};
pub use thermometer::{Temperature, TemperatureReading, Thermometer};
