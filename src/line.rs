//! Line assembly for the serial terminal.
//!
//! Bytes arrive one at a time from the UART interrupt. An over-long line is dropped
//! rather than treated as fatal, so operator input can never stop the firmware.

use heapless::{Deque, Vec};

/// The line buffer was full; everything buffered so far was discarded
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Overflow;

pub struct LineBuffer<const N: usize> {
    buf: Deque<u8, N>,
}

impl<const N: usize> LineBuffer<N> {
    pub const fn new() -> Self {
        Self { buf: Deque::new() }
    }

    /// Appends a received byte. On overflow the partial line is discarded, along with
    /// the byte.
    pub fn push(&mut self, b: u8) -> Result<(), Overflow> {
        if self.buf.push_back(b).is_err() {
            self.buf.clear();
            return Err(Overflow);
        }
        Ok(())
    }

    /// Pops the first complete line, including its terminator
    pub fn take_line(&mut self) -> Option<Vec<u8, N>> {
        let idx = self.buf.iter().position(|b| is_newline(*b))?;

        let mut line = Vec::new();
        for _ in 0..=idx {
            let Some(b) = self.buf.pop_front() else {
                break;
            };
            // Can't overflow: the line came out of a buffer of the same capacity
            let _ = line.push(b);
        }
        Some(line)
    }

    pub fn contains(&self, b: u8) -> bool {
        self.buf.iter().any(|x| *x == b)
    }

    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    pub fn clear(&mut self) {
        self.buf.clear();
    }
}

impl<const N: usize> Default for LineBuffer<N> {
    fn default() -> Self {
        Self::new()
    }
}

#[inline]
pub const fn is_newline(b: u8) -> bool {
    b == b'\n' || b == b'\r'
}

#[inline]
pub const fn is_whitespace(b: u8) -> bool {
    b == b' ' || b == b'\n' || b == b'\r' || b == b'\t'
}
