//! Channel and gain selection.

use core::fmt;

use thiserror::Error;

/// HX711 input channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    A,
    B,
}

/// Channel/gain selection, applied by extra clock pulses after each read.
///
/// The discriminant is the number of pulses after the 24 data bits.
#[repr(u8)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Gain {
    /// Channel A, gain 128
    #[default]
    A128 = 1,
    /// Channel B, gain 32
    B32 = 2,
    /// Channel A, gain 64
    A64 = 3,
}

impl Gain {
    /// Parse a gain code (128, 64 or 32).
    pub const fn from_code(code: u8) -> Option<Self> {
        match code {
            128 => Some(Gain::A128),
            64 => Some(Gain::A64),
            32 => Some(Gain::B32),
            _ => None,
        }
    }

    /// The gain code this selection was parsed from.
    pub const fn code(self) -> u8 {
        match self {
            Gain::A128 => 128,
            Gain::A64 => 64,
            Gain::B32 => 32,
        }
    }

    /// Extra PD_SCK pulses issued after the data bits.
    pub const fn pulses(self) -> u8 {
        self as u8
    }

    pub const fn channel(self) -> Channel {
        match self {
            Gain::A128 | Gain::A64 => Channel::A,
            Gain::B32 => Channel::B,
        }
    }
}

/// A gain code outside 128, 64 and 32.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("invalid gain code {0} (expected 128, 64 or 32)")]
pub struct InvalidGain(pub u8);

impl TryFrom<u8> for Gain {
    type Error = InvalidGain;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        Gain::from_code(code).ok_or(InvalidGain(code))
    }
}

impl fmt::Display for Gain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let channel = match self.channel() {
            Channel::A => 'A',
            Channel::B => 'B',
        };
        write!(f, "{}{}", channel, self.code())
    }
}
