//! HX711 load cell amplifier driver.
//!
//! The HX711 is a 24-bit ADC with a two-wire interface:
//! - DOUT  - data out, low when a conversion is ready
//! - PD_SCK - clock in, also used for power-down (held high > 60 µs)
//!
//! Readings are clocked out MSB first. The number of extra clock pulses after
//! the 24 data bits selects channel and gain for the next conversion:
//! - 25 pulses: channel A, gain 128
//! - 26 pulses: channel B, gain 32
//! - 27 pulses: channel A, gain 64
//!
//! The crate is split in two layers:
//! - [`Hx711`] bit-bangs the protocol over `embedded-hal` pins
//! - [`LoadCell`] keeps a ring buffer of samples and the tare/scale calibration
//!
//! ```ignore
//! let hx711 = Hx711::new(dout, sck, delay, Gain::A128)?;
//! let mut cell = LoadCell::new(hx711, 16);
//!
//! loop {
//!     if cell.update()? {
//!         info!("weight: {:.1} g", cell.get_units());
//!     }
//! }
//! ```

#![cfg_attr(not(test), no_std)]

extern crate alloc;

pub mod config;
pub mod error;
pub mod gain;
pub mod load_cell;
pub mod protocol;
pub mod ring;

pub use config::{LoadCellConfig, DEFAULT_BUFFER_LEN};
pub use error::Error;
pub use gain::{Channel, Gain, InvalidGain};
pub use load_cell::{Calibration, LoadCell};
pub use protocol::{Hx711, PulseTiming, SampleSource, POWER_DOWN_HOLD_US, SAMPLE_MAX, SAMPLE_MIN};
pub use ring::{SampleRing, MIN_BUFFER_LEN};
