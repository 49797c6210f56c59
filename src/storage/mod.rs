//! In-RAM history of regulation cycles, for the status terminal.

use fixed::types::I12F4;
use heapless::HistoryBuffer;

use crate::{
    cooler::ActuatorState,
    regulator::{ControllerStatus, RegulatorState},
    thermometer::Temperature,
};

pub struct Storage<const N: usize> {
    records: HistoryBuffer<Record, N>,
}

impl<const N: usize> Storage<N> {
    pub const fn new() -> Self {
        Self {
            records: HistoryBuffer::new(),
        }
    }

    /// Records a committed status, `secs` after boot
    pub fn write(&mut self, secs: u32, status: &ControllerStatus) {
        self.records.write(Record::new(secs, status));
    }

    /// Most recently written record
    pub fn recent(&self) -> Option<Record> {
        self.records.recent().copied()
    }

    /// Records from oldest to newest
    pub fn oldest(&self) -> impl Iterator<Item = Record> + '_ {
        self.records.oldest_ordered().copied()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.recent().is_none()
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

impl<const N: usize> Default for Storage<N> {
    fn default() -> Self {
        Self::new()
    }
}

const VALID: u8 = 1 << 0;
const ACTIVE: u8 = 1 << 1;
const STATE_SHIFT: u8 = 4;

#[derive(Debug, Copy, Clone)]
#[repr(C, packed)]
pub struct Record {
    /// Seconds since startup (LSB u24)
    secs: [u8; 3],
    /// Validity, actuator and regulator state
    flags: u8,
    /// Reduced range temperature
    value: I12F4,
}

static_assertions::assert_eq_size!(Record, [u8; 6]);

impl Record {
    #[inline]
    fn new(secs: u32, status: &ControllerStatus) -> Self {
        let mut flags = match status.state() {
            RegulatorState::Idle => 0,
            RegulatorState::Cooling => 1,
            RegulatorState::Fault => 2,
        } << STATE_SHIFT;
        if status.actuator().is_on() {
            flags |= ACTIVE;
        }

        let value = match status.temperature() {
            Some(temp) => {
                flags |= VALID;
                temp.saturating_to_num()
            }
            None => I12F4::ZERO,
        };

        let [secs @ .., _] = secs.to_le_bytes();

        Self { secs, flags, value }
    }

    #[inline]
    pub fn secs(&self) -> u32 {
        let [a, b, c] = self.secs;
        u32::from_le_bytes([a, b, c, 0])
    }

    #[inline]
    pub fn is_valid(&self) -> bool {
        self.flags & VALID != 0
    }

    /// Temperature of the cycle, clamped to ±2048 °C
    #[inline]
    pub fn value(&self) -> Option<Temperature> {
        let value = self.value;
        self.is_valid().then(|| value.to_num())
    }

    #[inline]
    pub fn actuator(&self) -> ActuatorState {
        ActuatorState::from(self.flags & ACTIVE != 0)
    }

    #[inline]
    pub fn state(&self) -> RegulatorState {
        match self.flags >> STATE_SHIFT {
            1 => RegulatorState::Cooling,
            2 => RegulatorState::Fault,
            _ => RegulatorState::Idle,
        }
    }

    #[inline]
    pub fn is_cooling(&self) -> bool {
        self.state() == RegulatorState::Cooling
    }
}

#[cfg(test)]
mod tests {
    use futures_executor::block_on;

    use super::*;
    use crate::{
        controller::ControllerConfig,
        regulator::ThermalController,
        sim::{sim_cooler, SimThermometer},
    };

    fn statuses(temps: &[Option<f32>]) -> heapless::Vec<ControllerStatus, 8> {
        let mut c = ThermalController::new(
            SimThermometer::default(),
            sim_cooler(),
            ControllerConfig::new(40.0, 2.0).unwrap(),
        );
        let mut out = heapless::Vec::new();
        for t in temps {
            match t {
                Some(t) => c.thermometer_mut().set(Temperature::from_num(*t)),
                None => c.thermometer_mut().fail(),
            }
            out.push(block_on(c.regulate())).unwrap();
        }
        out
    }

    #[test]
    fn records_round_trip_status() {
        let s = statuses(&[Some(41.5), None, Some(-3.25)]);
        let mut storage = Storage::<4>::new();
        for (i, status) in s.iter().enumerate() {
            storage.write(10 * i as u32, status);
        }

        let records: heapless::Vec<Record, 4> = storage.oldest().collect();
        assert_eq!(records.len(), 3);

        assert_eq!(records[0].secs(), 0);
        assert_eq!(records[0].value(), Some(Temperature::from_num(41.5)));
        assert_eq!(records[0].state(), RegulatorState::Cooling);
        assert_eq!(records[0].actuator(), ActuatorState::On);
        assert!(records[0].is_cooling());

        assert_eq!(records[1].secs(), 10);
        assert!(!records[1].is_valid());
        assert_eq!(records[1].value(), None);
        assert_eq!(records[1].state(), RegulatorState::Fault);
        assert_eq!(records[1].actuator(), ActuatorState::Off);

        assert_eq!(records[2].value(), Some(Temperature::from_num(-3.25)));
        assert_eq!(records[2].state(), RegulatorState::Idle);
    }

    #[test]
    fn overwrites_oldest() {
        let s = statuses(&[Some(20.0)]);
        let mut storage = Storage::<2>::new();
        assert!(storage.recent().is_none());

        for secs in [1, 2, 3] {
            storage.write(secs, &s[0]);
        }

        assert_eq!(storage.len(), 2);
        let secs: heapless::Vec<u32, 2> = storage.oldest().map(|r| r.secs()).collect();
        assert_eq!(secs.as_slice(), &[2, 3]);
        assert_eq!(storage.recent().map(|r| r.secs()), Some(3));

        storage.clear();
        assert!(storage.is_empty());
    }

    #[test]
    fn secs_wrap_at_24_bits() {
        let s = statuses(&[Some(20.0)]);
        let mut storage = Storage::<1>::new();
        storage.write((1 << 24) + 5, &s[0]);
        assert_eq!(storage.recent().map(|r| r.secs()), Some(5));
    }

    #[test]
    fn value_saturates() {
        let mut c = ThermalController::new(
            SimThermometer::new(Temperature::from_num(5000)),
            sim_cooler(),
            ControllerConfig::new(40.0, 2.0).unwrap(),
        );
        let status = block_on(c.regulate());
        let mut storage = Storage::<1>::new();
        storage.write(0, &status);
        assert_eq!(
            storage.recent().and_then(|r| r.value()),
            Some(Temperature::from_num(I12F4::MAX))
        );
    }
}
