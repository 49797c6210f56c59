use crate::{controller::ControllerConfig, thermometer::Temperature};

/// Threshold controller with a re-arm band below the trip point.
///
/// Both thresholds are closed: a reading equal to the trip point starts cooling and a
/// reading equal to the re-arm point stops it. Anything strictly between the two keeps
/// the current state.
pub struct Hysteresis {
    config: ControllerConfig,
}

impl Hysteresis {
    pub const fn new(config: ControllerConfig) -> Self {
        Self { config }
    }

    pub const fn config(&self) -> &ControllerConfig {
        &self.config
    }
}

impl super::Controller for Hysteresis {
    fn run(&mut self, temp: Temperature, cooling: bool) -> bool {
        if cooling {
            temp > self.config.rearm_temp()
        } else {
            temp >= self.config.max_temp()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::Controller;

    fn controller() -> Hysteresis {
        Hysteresis::new(ControllerConfig::new(40.0, 2.0).unwrap())
    }

    #[test]
    fn trips_at_max_temp() {
        let mut c = controller();
        assert!(!c.run(Temperature::from_num(39.9375), false));
        assert!(c.run(Temperature::from_num(40), false));
        assert!(c.run(Temperature::from_num(55), false));
    }

    #[test]
    fn rearms_at_band_bottom() {
        let mut c = controller();
        assert!(c.run(Temperature::from_num(38.0625), true));
        assert!(!c.run(Temperature::from_num(38), true));
        assert!(!c.run(Temperature::from_num(20), true));
    }

    #[test]
    fn band_keeps_state() {
        let mut c = controller();
        for t in [38.0625, 39.0, 39.9375] {
            let t = Temperature::from_num(t);
            assert!(c.run(t, true));
            assert!(!c.run(t, false));
        }
    }
}
