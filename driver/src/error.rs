//! Driver errors.

use thiserror::Error;

use crate::gain::InvalidGain;

/// Errors reported by the HX711 driver.
///
/// `E` is the error type shared by the DOUT and PD_SCK pins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error<E> {
    /// Setting or reading a GPIO pin failed
    #[error("gpio pin error: {0:?}")]
    Pin(E),
    /// Gain code was not one of 128, 64 or 32
    #[error("invalid gain code {0} (expected 128, 64 or 32)")]
    InvalidGain(u8),
    /// Unit conversion requested with a scale factor of zero
    #[error("scale factor is zero")]
    ZeroScale,
    /// Calibration reference weight was zero or not finite
    #[error("calibration reference must be finite and non-zero")]
    InvalidReference,
    /// Calibration attempted with no load signal above the tare offset
    #[error("no signal above tare offset")]
    NoSignal,
}

impl<E> Error<E> {
    /// True for errors raised by the HAL pins rather than the driver itself.
    pub fn is_pin_error(&self) -> bool {
        matches!(self, Error::Pin(_))
    }
}

impl<E> From<InvalidGain> for Error<E> {
    fn from(err: InvalidGain) -> Self {
        Error::InvalidGain(err.0)
    }
}
