//! HX711 serial protocol over two GPIO pins.
//!
//! A read clocks 24 bits out of DOUT, MSB first, one bit per PD_SCK pulse.
//! DOUT is sampled while PD_SCK is high. After the data bits, 1 to 3 more
//! pulses select the channel and gain of the *next* conversion.
//!
//! Timing budget per pulse (datasheet T3/T4):
//! - PD_SCK high: 0.2 µs min, 50 µs max
//! - PD_SCK low: 0.2 µs min
//!
//! Holding PD_SCK high for more than 60 µs powers the chip down, so a whole
//! read runs in one critical section. An interrupt landing mid-read would
//! otherwise stretch a pulse and every following bit would read back as 1.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, trace, warn};

use crate::error::Error;
use crate::gain::Gain;

/// Smallest raw reading (0x800000 sign-extended).
pub const SAMPLE_MIN: i32 = -(1 << 23);
/// Largest raw reading (0x7FFFFF).
pub const SAMPLE_MAX: i32 = (1 << 23) - 1;

/// How long PD_SCK is held high to enter power-down. Datasheet minimum is 60 µs.
pub const POWER_DOWN_HOLD_US: u32 = 80;

const PULSE_HIGH_MIN_NS: u32 = 200;
const PULSE_HIGH_MAX_NS: u32 = 50_000;
const PULSE_LOW_MIN_NS: u32 = 200;

/// PD_SCK pulse widths used while bit-banging.
///
/// Always inside the datasheet window, see [`PulseTiming::new`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PulseTiming {
    high_ns: u32,
    low_ns: u32,
}

impl PulseTiming {
    /// Pulse widths clamped into the datasheet window.
    pub fn new(high_ns: u32, low_ns: u32) -> Self {
        Self {
            high_ns: high_ns.clamp(PULSE_HIGH_MIN_NS, PULSE_HIGH_MAX_NS),
            low_ns: low_ns.max(PULSE_LOW_MIN_NS),
        }
    }

    pub fn high_ns(&self) -> u32 {
        self.high_ns
    }

    pub fn low_ns(&self) -> u32 {
        self.low_ns
    }
}

impl Default for PulseTiming {
    fn default() -> Self {
        Self {
            high_ns: 1_000,
            low_ns: 1_000,
        }
    }
}

/// Anything that can hand out raw HX711-style samples.
///
/// [`Hx711`] is the hardware implementation; [`crate::LoadCell`] only talks
/// to this trait.
pub trait SampleSource {
    type Error;

    /// True when a conversion is waiting to be read.
    fn is_ready(&mut self) -> Result<bool, Self::Error>;

    /// Read one sample. Does not wait for readiness.
    fn read_sample(&mut self) -> Result<i32, Self::Error>;

    fn power_down(&mut self) -> Result<(), Self::Error>;

    fn power_up(&mut self) -> Result<(), Self::Error>;
}

/// Build a sign-extended sample from the three data bytes, MSB first.
pub const fn assemble(data: [u8; 3]) -> i32 {
    let filler = if data[0] & 0x80 != 0 { 0xFF } else { 0x00 };
    i32::from_be_bytes([filler, data[0], data[1], data[2]])
}

/// Bit-banged HX711 driver owning its DOUT and PD_SCK pins.
pub struct Hx711<DOUT, SCK, D> {
    dout: DOUT,
    sck: SCK,
    delay: D,
    gain: Gain,
    timing: PulseTiming,
}

impl<DOUT, SCK, D, E> Hx711<DOUT, SCK, D>
where
    DOUT: InputPin<Error = E>,
    SCK: OutputPin<Error = E>,
    D: DelayNs,
{
    /// Take ownership of the pins and apply the initial gain.
    ///
    /// Performs one read to program the gain, like [`Hx711::set_gain`].
    pub fn new(dout: DOUT, sck: SCK, delay: D, gain: Gain) -> Result<Self, Error<E>> {
        Self::with_timing(dout, sck, delay, gain, PulseTiming::default())
    }

    pub fn with_timing(
        dout: DOUT,
        sck: SCK,
        delay: D,
        gain: Gain,
        timing: PulseTiming,
    ) -> Result<Self, Error<E>> {
        let mut hx711 = Self {
            dout,
            sck,
            delay,
            gain,
            timing,
        };
        hx711.set_gain(gain)?;
        Ok(hx711)
    }

    /// DOUT low means a conversion is ready.
    pub fn is_ready(&mut self) -> Result<bool, Error<E>> {
        self.dout.is_low().map_err(Error::Pin)
    }

    pub fn gain(&self) -> Gain {
        self.gain
    }

    pub fn timing(&self) -> PulseTiming {
        self.timing
    }

    /// Takes effect from the next pulse.
    pub fn set_timing(&mut self, timing: PulseTiming) {
        self.timing = timing;
    }

    /// Select channel/gain and push it to the chip.
    ///
    /// Drives PD_SCK low (leaving power-down) and performs one read whose
    /// trailing pulses program the new selection. The sample is discarded.
    pub fn set_gain(&mut self, gain: Gain) -> Result<(), Error<E>> {
        debug!("hx711 gain {} -> {}", self.gain, gain);
        self.gain = gain;
        self.sck.set_low().map_err(Error::Pin)?;
        self.read()?;
        Ok(())
    }

    /// Select channel/gain from a raw code (128, 64 or 32).
    ///
    /// An unknown code keeps the current selection. The clock-low and read
    /// sequence still runs, then `Error::InvalidGain` is returned. Callers
    /// that ignore the error get the plain no-op.
    pub fn set_gain_code(&mut self, code: u8) -> Result<(), Error<E>> {
        match Gain::from_code(code) {
            Some(gain) => self.set_gain(gain),
            None => {
                warn!("hx711 ignoring gain code {}, keeping {}", code, self.gain);
                self.set_gain(self.gain)?;
                Err(Error::InvalidGain(code))
            }
        }
    }

    /// Clock out one sample.
    ///
    /// The chip must already be ready (see [`Hx711::is_ready`]); this does
    /// not wait. A chip that is not driving DOUT yields whatever the line
    /// reads, typically -1 (all ones) or 0, not an error.
    pub fn read(&mut self) -> Result<i32, Error<E>> {
        let data = critical_section::with(|_| self.read_frame()).map_err(Error::Pin)?;
        let value = assemble(data);
        trace!("hx711 raw {:02x}{:02x}{:02x} -> {}", data[0], data[1], data[2], value);
        Ok(value)
    }

    fn read_frame(&mut self) -> Result<[u8; 3], E> {
        let mut data = [0u8; 3];
        for byte in data.iter_mut() {
            *byte = self.shift_in()?;
        }
        for _ in 0..self.gain.pulses() {
            self.pulse()?;
        }
        Ok(data)
    }

    /// One byte, MSB first, one clock pulse per bit.
    fn shift_in(&mut self) -> Result<u8, E> {
        let mut byte = 0u8;
        for _ in 0..8 {
            self.sck.set_high()?;
            self.delay.delay_ns(self.timing.high_ns());
            let bit = self.dout.is_high()?;
            byte = (byte << 1) | u8::from(bit);
            self.sck.set_low()?;
            self.delay.delay_ns(self.timing.low_ns());
        }
        Ok(byte)
    }

    fn pulse(&mut self) -> Result<(), E> {
        self.sck.set_high()?;
        self.delay.delay_ns(self.timing.high_ns());
        self.sck.set_low()?;
        self.delay.delay_ns(self.timing.low_ns());
        Ok(())
    }

    /// Enter power-down: PD_SCK low, then high for [`POWER_DOWN_HOLD_US`].
    pub fn power_down(&mut self) -> Result<(), Error<E>> {
        self.sck.set_low().map_err(Error::Pin)?;
        self.sck.set_high().map_err(Error::Pin)?;
        self.delay.delay_us(POWER_DOWN_HOLD_US);
        Ok(())
    }

    /// Leave power-down: PD_SCK low.
    ///
    /// The chip wakes on channel A, gain 128. For any other selection call
    /// `set_gain(self.gain())` once the chip is ready again.
    pub fn power_up(&mut self) -> Result<(), Error<E>> {
        self.sck.set_low().map_err(Error::Pin)
    }

    /// Give back the pins and delay provider.
    pub fn release(self) -> (DOUT, SCK, D) {
        (self.dout, self.sck, self.delay)
    }
}

impl<DOUT, SCK, D, E> SampleSource for Hx711<DOUT, SCK, D>
where
    DOUT: InputPin<Error = E>,
    SCK: OutputPin<Error = E>,
    D: DelayNs,
{
    type Error = Error<E>;

    fn is_ready(&mut self) -> Result<bool, Self::Error> {
        Hx711::is_ready(self)
    }

    fn read_sample(&mut self) -> Result<i32, Self::Error> {
        self.read()
    }

    fn power_down(&mut self) -> Result<(), Self::Error> {
        Hx711::power_down(self)
    }

    fn power_up(&mut self) -> Result<(), Self::Error> {
        Hx711::power_up(self)
    }
}
