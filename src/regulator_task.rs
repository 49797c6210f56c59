//! Regulation task

use defmt::*;
use rtic::Mutex;
use rtic_monotonics::{
    stm32::{Tim2 as Mono, *},
    Monotonic,
};
use trackpad_thermal::{ControllerStatus, Fault, RegulatorState};

/// Trackpad surface temperature that starts the Peltier
pub const MAX_TEMP: f32 = 40.0;
/// Drop below `MAX_TEMP` before the Peltier stops again
pub const HYSTERESIS: f32 = 2.0;
/// Seconds between regulation cycles
pub const REGULATION_PERIOD_SECS: u64 = 2;

#[allow(clippy::needless_lifetimes, reason = "clippy bug")]
#[cfg_attr(feature = "sizing", inline(never))]
pub async fn regulator<'a>(mut cx: crate::app::regulator::Context<'a>) {
    let mut now = Mono::now();
    let mut last = cx.local.controller.state();

    loop {
        trace!("regulator");

        let status = cx.local.controller.regulate().await;
        log_cycle(&status, last);
        last = status.state();

        cx.shared.status.lock(|s| *s = status);

        // Stamp at commit, not when the history task gets round to it
        if cx.local.tx.try_send((uptime_secs(), status)).is_err() {
            warn!("History full, dropping cycle {=u32}", status.cycle());
        }

        now += REGULATION_PERIOD_SECS.secs();
        Mono::delay_until(now).await;
    }
}

fn log_cycle(status: &ControllerStatus, last: RegulatorState) {
    debug!("{}", status);

    if status.state() == last {
        return;
    }
    match (status.state(), status.fault()) {
        (RegulatorState::Fault, Some(Fault::Sensor)) => {
            error!("Sensor fault, cooler forced {}", status.actuator());
        }
        (RegulatorState::Fault, _) => {
            error!("Cooler did not take command, now {}", status.actuator());
        }
        (state, _) => info!("{} -> {} at {}", last, state, status.reading()),
    }
}

/// Seconds since startup
#[allow(clippy::cast_possible_truncation)]
pub fn uptime_secs() -> u32 {
    Mono::now().duration_since_epoch().to_secs() as u32
}
