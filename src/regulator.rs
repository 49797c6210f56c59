//! Closed-loop regulation of the trackpad surface.
//!
//! [`ThermalController`] owns the thermometer and the cooler. Each call to
//! [`ThermalController::regulate`] runs one read-evaluate-act cycle and commits a new
//! [`ControllerStatus`]; readers only ever see whole, committed snapshots.

use crate::{
    controller::{Controller, ControllerConfig, Hysteresis},
    cooler::{ActuatorState, Cooler},
    thermometer::{Temperature, TemperatureReading, Thermometer},
};

#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegulatorState {
    #[default]
    Idle,
    Cooling,
    Fault,
}

impl RegulatorState {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Cooling => "cooling",
            Self::Fault => "fault",
        }
    }
}

/// Cause of a [`RegulatorState::Fault`]
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Fault {
    /// The thermometer gave no trustworthy reading
    Sensor,
    /// The cooler failed to take a commanded state
    Actuator,
}

impl Fault {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Sensor => "sensor",
            Self::Actuator => "actuator",
        }
    }
}

/// Snapshot of the last completed regulation cycle
#[derive(Debug, Copy, Clone, Eq, PartialEq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControllerStatus {
    reading: TemperatureReading,
    actuator: ActuatorState,
    state: RegulatorState,
    fault: Option<Fault>,
    alert: Option<bool>,
    cycle: u32,
}

impl ControllerStatus {
    #[inline]
    pub const fn reading(&self) -> TemperatureReading {
        self.reading
    }

    /// Last temperature, `None` if the last reading was invalid
    #[inline]
    pub const fn temperature(&self) -> Option<Temperature> {
        self.reading.value()
    }

    #[inline]
    pub const fn is_valid(&self) -> bool {
        self.reading.is_valid()
    }

    #[inline]
    pub const fn actuator(&self) -> ActuatorState {
        self.actuator
    }

    #[inline]
    pub const fn state(&self) -> RegulatorState {
        self.state
    }

    #[inline]
    pub const fn is_fault(&self) -> bool {
        self.fault.is_some()
    }

    #[inline]
    pub const fn fault(&self) -> Option<Fault> {
        self.fault
    }

    /// Sensor alert line as sampled during the cycle
    #[inline]
    pub const fn alert(&self) -> Option<bool> {
        self.alert
    }

    /// Number of completed cycles, wrapping. Zero before the first cycle.
    #[inline]
    pub const fn cycle(&self) -> u32 {
        self.cycle
    }
}

pub struct ThermalController<T, C, P = Hysteresis> {
    thermometer: T,
    cooler: C,
    controller: P,
    status: ControllerStatus,
}

impl<T: Thermometer, C: Cooler> ThermalController<T, C, Hysteresis> {
    pub fn new(thermometer: T, cooler: C, config: ControllerConfig) -> Self {
        Self::with_controller(thermometer, cooler, Hysteresis::new(config))
    }

    #[inline]
    pub const fn config(&self) -> &ControllerConfig {
        self.controller.config()
    }
}

impl<T: Thermometer, C: Cooler, P: Controller> ThermalController<T, C, P> {
    pub fn with_controller(thermometer: T, cooler: C, controller: P) -> Self {
        let status = ControllerStatus {
            actuator: cooler.state(),
            ..ControllerStatus::default()
        };
        Self {
            thermometer,
            cooler,
            controller,
            status,
        }
    }

    /// Runs one read-evaluate-act cycle and returns the status it committed.
    ///
    /// Never fails: sensor and actuator problems end the cycle in
    /// [`RegulatorState::Fault`] with the cooler forced off.
    pub async fn regulate(&mut self) -> ControllerStatus {
        let reading = self.thermometer.poll().await;
        let alert = self.thermometer.alert();

        let Some(temp) = reading.value() else {
            return self.fault(reading, alert, Fault::Sensor);
        };

        // Leaving a fault is evaluated like a fresh start from idle
        let cooling = self.status.state == RegulatorState::Cooling;
        let cool = self.controller.run(temp, cooling);

        if self.command(cool).is_err() {
            return self.fault(reading, alert, Fault::Actuator);
        }

        let state = if cool {
            RegulatorState::Cooling
        } else {
            RegulatorState::Idle
        };
        self.commit(reading, alert, state, None)
    }

    /// Last committed snapshot
    #[inline]
    pub fn status(&self) -> ControllerStatus {
        self.status
    }

    #[inline]
    pub fn state(&self) -> RegulatorState {
        self.status.state
    }

    pub fn thermometer(&self) -> &T {
        &self.thermometer
    }

    pub fn thermometer_mut(&mut self) -> &mut T {
        &mut self.thermometer
    }

    pub fn cooler(&self) -> &C {
        &self.cooler
    }

    /// Commands the cooler only if it isn't already in the wanted state
    fn command(&mut self, on: bool) -> Result<(), C::Error> {
        if self.cooler.is_active() == on {
            return Ok(());
        }
        if on {
            self.cooler.turn_on()
        } else {
            self.cooler.turn_off()
        }
    }

    fn fault(
        &mut self,
        reading: TemperatureReading,
        alert: Option<bool>,
        fault: Fault,
    ) -> ControllerStatus {
        // Best effort: if this fails too, the status still reports what the cooler holds
        let _ = self.command(false);
        self.commit(reading, alert, RegulatorState::Fault, Some(fault))
    }

    fn commit(
        &mut self,
        reading: TemperatureReading,
        alert: Option<bool>,
        state: RegulatorState,
        fault: Option<Fault>,
    ) -> ControllerStatus {
        self.status = ControllerStatus {
            reading,
            actuator: self.cooler.state(),
            state,
            fault,
            alert,
            cycle: self.status.cycle.wrapping_add(1),
        };
        self.status
    }
}

#[cfg(test)]
mod tests {
    use futures_executor::block_on;

    use super::*;
    use crate::sim::{sim_cooler, SimCooler, SimThermometer};

    type Sim = ThermalController<SimThermometer, SimCooler>;

    fn temp(t: f32) -> Temperature {
        Temperature::from_num(t)
    }

    fn sim(start: f32) -> Sim {
        ThermalController::new(
            SimThermometer::new(temp(start)),
            sim_cooler(),
            ControllerConfig::new(40.0, 2.0).unwrap(),
        )
    }

    fn step(c: &mut Sim, t: f32) -> ControllerStatus {
        c.thermometer_mut().set(temp(t));
        block_on(c.regulate())
    }

    /// Cooler with scripted command failures
    #[derive(Default)]
    struct FlakyCooler {
        active: bool,
        failing_on: u32,
        failing_off: u32,
    }

    impl Cooler for FlakyCooler {
        type Error = ();

        fn turn_on(&mut self) -> Result<(), ()> {
            if self.failing_on > 0 {
                self.failing_on -= 1;
                return Err(());
            }
            self.active = true;
            Ok(())
        }

        fn turn_off(&mut self) -> Result<(), ()> {
            if self.failing_off > 0 {
                self.failing_off -= 1;
                return Err(());
            }
            self.active = false;
            Ok(())
        }

        fn is_active(&self) -> bool {
            self.active
        }
    }

    fn flaky(cooler: FlakyCooler) -> ThermalController<SimThermometer, FlakyCooler> {
        ThermalController::new(
            SimThermometer::new(temp(41.0)),
            cooler,
            ControllerConfig::new(40.0, 2.0).unwrap(),
        )
    }

    #[test]
    fn initial_status() {
        let c = sim(20.0);
        let status = c.status();
        assert_eq!(status.state(), RegulatorState::Idle);
        assert_eq!(status.actuator(), ActuatorState::Off);
        assert!(!status.is_valid());
        assert!(!status.is_fault());
        assert_eq!(status.cycle(), 0);
    }

    #[test]
    fn status_matches_returned_snapshot() {
        let mut c = sim(20.0);
        let returned = step(&mut c, 41.0);

        assert_eq!(c.status(), returned);
        assert_eq!(returned.temperature(), Some(temp(41.0)));
        assert_eq!(returned.actuator(), ActuatorState::On);
        assert_eq!(returned.cycle(), 1);
        assert_eq!(c.thermometer().reads(), 1);
    }

    #[test]
    fn fault_recovers_straight_to_cooling() {
        let mut c = sim(20.0);
        step(&mut c, 41.0);

        c.thermometer_mut().fail();
        let status = block_on(c.regulate());
        assert_eq!(status.state(), RegulatorState::Fault);
        assert_eq!(status.fault(), Some(Fault::Sensor));
        assert_eq!(status.actuator(), ActuatorState::Off);
        assert_eq!(status.temperature(), None);

        // Inside the band: fresh evaluation from idle keeps the cooler off
        let status = step(&mut c, 39.0);
        assert_eq!(status.state(), RegulatorState::Idle);
        assert!(!status.is_fault());

        c.thermometer_mut().fail();
        block_on(c.regulate());
        let status = step(&mut c, 40.0);
        assert_eq!(status.state(), RegulatorState::Cooling);
        assert_eq!(status.actuator(), ActuatorState::On);
    }

    #[test]
    fn no_redundant_commands() {
        let mut c = sim(20.0);
        for t in [41.0, 45.0, 39.0, 40.0, 38.5] {
            step(&mut c, t);
        }
        assert_eq!(c.cooler().pin().set_high_count(), 1);

        for t in [38.0, 30.0, 39.9375] {
            step(&mut c, t);
        }
        assert_eq!(c.cooler().pin().set_high_count(), 1);
        // Only the single re-arm
        assert_eq!(c.cooler().pin().set_low_count(), 1);
    }

    #[test]
    fn failed_turn_on_faults_then_retries() {
        let mut c = flaky(FlakyCooler {
            failing_on: 1,
            ..FlakyCooler::default()
        });

        let status = block_on(c.regulate());
        assert_eq!(status.state(), RegulatorState::Fault);
        assert_eq!(status.fault(), Some(Fault::Actuator));
        assert_eq!(status.actuator(), ActuatorState::Off);
        assert_eq!(status.temperature(), Some(temp(41.0)));

        let status = block_on(c.regulate());
        assert_eq!(status.state(), RegulatorState::Cooling);
        assert_eq!(status.actuator(), ActuatorState::On);
    }

    #[test]
    fn failed_turn_off_is_reported_honestly() {
        let mut c = flaky(FlakyCooler {
            failing_off: 2,
            ..FlakyCooler::default()
        });
        block_on(c.regulate());
        assert!(c.cooler().is_active());

        c.thermometer_mut().set(temp(30.0));
        let status = block_on(c.regulate());
        assert_eq!(status.fault(), Some(Fault::Actuator));
        // Both the re-arm and the fail-safe turn_off failed
        assert_eq!(status.actuator(), ActuatorState::On);

        // Next cycle re-checks the cooler instead of trusting the last command
        let status = block_on(c.regulate());
        assert_eq!(status.state(), RegulatorState::Idle);
        assert_eq!(status.actuator(), ActuatorState::Off);
    }

    #[test]
    fn alert_is_sampled() {
        let mut c = sim(20.0);
        c.thermometer_mut().set_alert(Some(true));
        assert_eq!(step(&mut c, 41.0).alert(), Some(true));

        c.thermometer_mut().set_alert(None);
        assert_eq!(step(&mut c, 41.0).alert(), None);
    }

    #[test]
    fn cycle_counts_every_outcome() {
        let mut c = sim(20.0);
        step(&mut c, 20.0);
        c.thermometer_mut().fail();
        block_on(c.regulate());
        let status = step(&mut c, 20.0);
        assert_eq!(status.cycle(), 3);
    }
}
