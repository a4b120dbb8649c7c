//! Software HX711 for running the driver on a desktop.
//!
//! The chip model sits behind `embedded-hal` pins so the real driver code
//! drives it unchanged. Time only moves when [`SimDelay`] is called (or
//! [`SimulatedHx711::advance_ns`]), so runs are deterministic.
//!
//! Modelled behaviour:
//! - DOUT goes low once a conversion is done (10 SPS by default)
//! - each PD_SCK rising edge shifts the next bit out, MSB first
//! - pulse 25 starts the next conversion (DOUT high), pulses 26 and 27 pick
//!   its gain; the count closes once PD_SCK rests low for [`GAIN_WINDOW_NS`]
//!   and a burst longer than 27 pulses keeps the previous selection
//! - PD_SCK high for 60 µs or more powers the chip down; the falling edge
//!   wakes it on channel A, gain 128

use std::cell::RefCell;
use std::collections::VecDeque;
use std::convert::Infallible;
use std::rc::Rc;

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{ErrorType, InputPin, OutputPin};
use loadcell_hx711::{Gain, SAMPLE_MAX, SAMPLE_MIN};
use log::trace;

/// PD_SCK high time after which the chip powers down.
pub const POWER_DOWN_AFTER_NS: u64 = 60_000;

/// PD_SCK low time after which trailing pulses no longer count toward the
/// gain selection of the conversion in progress.
pub const GAIN_WINDOW_NS: u64 = 50_000;

/// Chip model parameters.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimConfig {
    /// Time between conversions
    pub conversion_ns: u64,
    /// Raw reading with nothing on the cell (at gain 128)
    pub zero_counts: i32,
    /// Raw counts per unit of load (at gain 128)
    pub counts_per_unit: f64,
    /// Peak noise in counts, 0 disables noise
    pub noise: u32,
    /// Noise generator seed, must be non-zero
    pub seed: u32,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            conversion_ns: 100_000_000,
            zero_counts: 150_000,
            counts_per_unit: 420.0,
            noise: 0,
            seed: 0x2545_f491,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    /// DOUT high, clock pulses are ignored.
    Converting { since: u64 },
    /// DOUT low, waiting for the first clock pulse.
    Ready,
    /// `bit` data pulses seen so far (1..=24).
    Shifting { code: u32, bit: u8 },
    /// Conversion running, pulses after the 24th data bit still pick its
    /// gain. `previous` is the selection before this frame.
    Trailing { since: u64, pulses: u8, previous: Gain },
}

struct Chip {
    config: SimConfig,
    now_ns: u64,
    phase: Phase,
    gain: Gain,
    sck_high: bool,
    sck_high_since: u64,
    sck_low_since: u64,
    powered_down: bool,
    load: f64,
    queued: VecDeque<i32>,
    rng: u32,
    frames: u32,
    pulses_seen: u32,
}

impl Chip {
    fn new(config: SimConfig) -> Self {
        Self {
            config,
            now_ns: 0,
            // Power-on settling is skipped: the first conversion is ready.
            phase: Phase::Ready,
            gain: Gain::A128,
            sck_high: false,
            sck_high_since: 0,
            sck_low_since: 0,
            powered_down: false,
            load: 0.0,
            queued: VecDeque::new(),
            rng: config.seed.max(1),
            frames: 0,
            pulses_seen: 0,
        }
    }

    /// Bring power-down, gain window and conversion state up to `now_ns`.
    fn settle(&mut self) {
        let high_for = self.now_ns - self.sck_high_since;
        if self.sck_high && high_for >= POWER_DOWN_AFTER_NS && !self.powered_down {
            trace!("sim hx711 powered down at {} ns", self.now_ns);
            self.powered_down = true;
        }
        if let Phase::Trailing { since, .. } = self.phase {
            if !self.sck_high && self.now_ns - self.sck_low_since >= GAIN_WINDOW_NS {
                self.phase = Phase::Converting { since };
            }
        }
        if let Phase::Converting { since } = self.phase {
            if self.now_ns - since >= self.config.conversion_ns {
                self.phase = Phase::Ready;
            }
        }
    }

    fn dout(&mut self) -> bool {
        self.settle();
        if self.powered_down {
            return true;
        }
        match self.phase {
            Phase::Converting { .. } | Phase::Trailing { .. } => true,
            Phase::Ready => false,
            Phase::Shifting { code, bit } => (code >> (24 - bit)) & 1 == 1,
        }
    }

    fn sck_rising(&mut self) {
        self.settle();
        self.sck_high = true;
        self.sck_high_since = self.now_ns;
        if self.powered_down {
            return;
        }
        let phase = self.phase;
        self.phase = match phase {
            Phase::Ready => {
                self.pulses_seen = 1;
                Phase::Shifting {
                    code: self.next_code(),
                    bit: 1,
                }
            }
            Phase::Shifting { bit: 24, .. } => {
                self.pulses_seen += 1;
                self.frames += 1;
                let previous = self.gain;
                self.gain = Gain::A128;
                Phase::Trailing {
                    since: self.now_ns,
                    pulses: 1,
                    previous,
                }
            }
            Phase::Shifting { code, bit } => {
                self.pulses_seen += 1;
                Phase::Shifting { code, bit: bit + 1 }
            }
            Phase::Trailing {
                since,
                pulses,
                previous,
            } => {
                self.pulses_seen += 1;
                let pulses = pulses.saturating_add(1);
                // A burst longer than 27 pulses keeps the old selection.
                self.gain = match pulses {
                    2 => Gain::B32,
                    3 => Gain::A64,
                    _ => previous,
                };
                Phase::Trailing {
                    since,
                    pulses,
                    previous,
                }
            }
            Phase::Converting { since } => Phase::Converting { since },
        };
    }

    fn sck_falling(&mut self) {
        self.settle();
        self.sck_high = false;
        self.sck_low_since = self.now_ns;
        if self.powered_down {
            trace!("sim hx711 wake up at {} ns", self.now_ns);
            self.powered_down = false;
            self.gain = Gain::A128;
            self.phase = Phase::Converting { since: self.now_ns };
        }
    }

    /// Latch the conversion that is about to be shifted out.
    fn next_code(&mut self) -> u32 {
        let value = match self.queued.pop_front() {
            Some(raw) => raw,
            None => self.measure(),
        };
        let value = value.clamp(SAMPLE_MIN, SAMPLE_MAX);
        trace!("sim hx711 conversion {} at {}", value, self.gain);
        (value as u32) & 0x00FF_FFFF
    }

    fn measure(&mut self) -> i32 {
        let counts = f64::from(self.config.zero_counts) + self.load * self.config.counts_per_unit;
        let scaled = counts * f64::from(self.gain.code()) / 128.0;
        let noisy = scaled.round() as i64 + i64::from(self.noise());
        noisy.clamp(i64::from(SAMPLE_MIN), i64::from(SAMPLE_MAX)) as i32
    }

    fn noise(&mut self) -> i32 {
        if self.config.noise == 0 {
            return 0;
        }
        // xorshift32
        let mut x = self.rng;
        x ^= x << 13;
        x ^= x >> 17;
        x ^= x << 5;
        self.rng = x;
        let span = u64::from(self.config.noise) * 2 + 1;
        (u64::from(x) % span) as i32 - self.config.noise as i32
    }
}

/// Handle to a simulated chip. Cloning shares the same chip.
#[derive(Clone)]
pub struct SimulatedHx711 {
    chip: Rc<RefCell<Chip>>,
}

impl SimulatedHx711 {
    pub fn new(config: SimConfig) -> Self {
        Self {
            chip: Rc::new(RefCell::new(Chip::new(config))),
        }
    }

    /// DOUT, PD_SCK and a delay that advances this chip's clock.
    pub fn pins(&self) -> (DoutPin, SckPin, SimDelay) {
        (
            DoutPin { chip: self.chip.clone() },
            SckPin { chip: self.chip.clone() },
            SimDelay { chip: self.chip.clone() },
        )
    }

    /// Physical load on the cell, in the same unit as `counts_per_unit`.
    pub fn set_load(&self, load: f64) {
        self.chip.borrow_mut().load = load;
    }

    /// Force exact raw readings for the next conversions.
    pub fn queue_raw(&self, raw: impl IntoIterator<Item = i32>) {
        self.chip.borrow_mut().queued.extend(raw);
    }

    /// Selection the chip will use for the next conversion.
    pub fn gain(&self) -> Gain {
        self.chip.borrow().gain
    }

    pub fn is_powered_down(&self) -> bool {
        let mut chip = self.chip.borrow_mut();
        chip.settle();
        chip.powered_down
    }

    pub fn is_ready(&self) -> bool {
        !self.chip.borrow_mut().dout()
    }

    /// Complete read frames clocked out so far.
    pub fn frames(&self) -> u32 {
        self.chip.borrow().frames
    }

    /// PD_SCK pulses counted in the latest frame, data and gain pulses both.
    pub fn pulses_seen(&self) -> u32 {
        self.chip.borrow().pulses_seen
    }

    pub fn now_ns(&self) -> u64 {
        self.chip.borrow().now_ns
    }

    pub fn advance_ns(&self, ns: u64) {
        self.chip.borrow_mut().now_ns += ns;
    }

    pub fn advance_ms(&self, ms: u64) {
        self.advance_ns(ms * 1_000_000);
    }

    /// Run the clock forward until the pending conversion is done.
    pub fn wait_ready(&self) {
        let period = self.chip.borrow().config.conversion_ns;
        self.advance_ns(period);
    }
}

pub struct DoutPin {
    chip: Rc<RefCell<Chip>>,
}

impl ErrorType for DoutPin {
    type Error = Infallible;
}

impl InputPin for DoutPin {
    fn is_high(&mut self) -> Result<bool, Self::Error> {
        Ok(self.chip.borrow_mut().dout())
    }

    fn is_low(&mut self) -> Result<bool, Self::Error> {
        Ok(!self.chip.borrow_mut().dout())
    }
}

pub struct SckPin {
    chip: Rc<RefCell<Chip>>,
}

impl ErrorType for SckPin {
    type Error = Infallible;
}

impl OutputPin for SckPin {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        let mut chip = self.chip.borrow_mut();
        if chip.sck_high {
            chip.sck_falling();
        }
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        let mut chip = self.chip.borrow_mut();
        if !chip.sck_high {
            chip.sck_rising();
        }
        Ok(())
    }
}

/// Delay that moves simulated time instead of sleeping.
#[derive(Clone)]
pub struct SimDelay {
    chip: Rc<RefCell<Chip>>,
}

impl DelayNs for SimDelay {
    fn delay_ns(&mut self, ns: u32) {
        self.chip.borrow_mut().now_ns += u64::from(ns);
    }
}
