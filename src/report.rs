//! Text rendering of regulation status for the serial terminal.
//!
//! Everything writes straight into a [`core::fmt::Write`] sink without going through
//! `core::fmt` formatting machinery, which keeps it out of the firmware binary.

use core::fmt::{self, Write};

use num_traits::AsPrimitive;

use crate::{
    regulator::ControllerStatus,
    storage::Record,
    thermometer::{Temperature, TemperatureReading},
};

/// Written in place of a temperature when the reading was invalid
pub const MISSING: &str = "---";

/// Writes a temperature with all four fractional digits, e.g. `-3.2500`
pub fn write_temp<W: Write>(tx: &mut W, temp: Temperature) -> fmt::Result {
    const FRAC_MASK: u32 = (1 << Temperature::FRAC_NBITS) - 1;
    // 10^4 / 2^4: the decimal value of one fractional LSB
    const FRAC_STEP: u32 = 625;

    let bits = temp.to_bits().unsigned_abs();
    let int_part = bits >> Temperature::FRAC_NBITS;
    let frac_part = (bits & FRAC_MASK) * FRAC_STEP;

    if temp.is_negative() {
        tx.write_str("-")?;
    }
    write_uint(tx, int_part)?;
    tx.write_str(".")?;
    // Zero pad to four digits
    let mut pad = 1000;
    while pad > 1 && frac_part < pad {
        tx.write_str("0")?;
        pad /= 10;
    }
    write_uint(tx, frac_part)
}

pub fn write_uint<W: Write>(tx: &mut W, mut num: u32) -> fmt::Result {
    const BUF_SIZE: usize = 10;

    let mut buf = [0u8; BUF_SIZE];
    let mut idx = 0;

    loop {
        let digit: u8 = (num % 10).as_();
        num /= 10;

        buf[BUF_SIZE - idx - 1] = b'0' + digit;
        idx += 1;

        if num == 0 {
            break;
        }
    }

    for &b in &buf[BUF_SIZE - idx..] {
        tx.write_char(char::from(b))?;
    }
    Ok(())
}

fn write_reading<W: Write>(tx: &mut W, reading: TemperatureReading) -> fmt::Result {
    match reading.value() {
        Some(temp) => write_temp(tx, temp),
        None => tx.write_str(MISSING),
    }
}

/// Writes one status line, e.g. `41.0625 cooling on\r\n` or `--- fault(sensor) off\r\n`
pub fn write_status<W: Write>(tx: &mut W, status: &ControllerStatus) -> fmt::Result {
    write_reading(tx, status.reading())?;
    tx.write_str(" ")?;
    tx.write_str(status.state().as_str())?;
    if let Some(fault) = status.fault() {
        tx.write_str("(")?;
        tx.write_str(fault.as_str())?;
        tx.write_str(")")?;
    }
    tx.write_str(" ")?;
    tx.write_str(status.actuator().as_str())?;
    if status.alert() == Some(true) {
        tx.write_str(" alert")?;
    }
    tx.write_str("\r\n")
}

/// Writes one history line, e.g. `120 41.0625 cooling on\r\n`
pub fn write_record<W: Write>(tx: &mut W, record: &Record) -> fmt::Result {
    write_uint(tx, record.secs())?;
    tx.write_str(" ")?;
    match record.value() {
        Some(temp) => write_temp(tx, temp)?,
        None => tx.write_str(MISSING)?,
    }
    tx.write_str(" ")?;
    tx.write_str(record.state().as_str())?;
    tx.write_str(" ")?;
    tx.write_str(record.actuator().as_str())?;
    tx.write_str("\r\n")
}
