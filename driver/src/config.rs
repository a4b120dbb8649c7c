//! Driver configuration.

use crate::gain::Gain;
use crate::load_cell::Calibration;
use crate::protocol::PulseTiming;

/// Ring buffer length used when none is given.
pub const DEFAULT_BUFFER_LEN: usize = 16;

/// Everything needed to bring up one load cell.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LoadCellConfig {
    /// Samples averaged by the ring buffer (raised to `MIN_BUFFER_LEN`)
    pub buffer_len: usize,
    /// Initial channel/gain selection
    pub gain: Gain,
    /// PD_SCK pulse widths
    pub timing: PulseTiming,
    /// Starting offset and scale
    pub calibration: Calibration,
}

impl Default for LoadCellConfig {
    fn default() -> Self {
        Self {
            buffer_len: DEFAULT_BUFFER_LEN,
            gain: Gain::A128,
            timing: PulseTiming::default(),
            calibration: Calibration::default(),
        }
    }
}

impl LoadCellConfig {
    pub fn with_buffer_len(mut self, buffer_len: usize) -> Self {
        self.buffer_len = buffer_len;
        self
    }

    pub fn with_gain(mut self, gain: Gain) -> Self {
        self.gain = gain;
        self
    }

    pub fn with_timing(mut self, timing: PulseTiming) -> Self {
        self.timing = timing;
        self
    }

    pub fn with_calibration(mut self, calibration: Calibration) -> Self {
        self.calibration = calibration;
        self
    }
}
