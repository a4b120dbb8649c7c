//! Averaging and calibration on top of a sample source.

use embedded_hal::delay::DelayNs;
use embedded_hal::digital::{InputPin, OutputPin};
use log::{debug, trace};

use crate::config::LoadCellConfig;
use crate::error::Error;
use crate::protocol::{Hx711, SampleSource};
use crate::ring::SampleRing;

/// Linear calibration: `units = (raw - offset) / scale`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Calibration {
    /// Raw average that reads as zero units
    pub offset: i32,
    /// Raw counts per unit
    pub scale: f32,
}

impl Default for Calibration {
    fn default() -> Self {
        Self { offset: 0, scale: 1.0 }
    }
}

/// A load cell: sample source, averaging ring and calibration.
///
/// Only [`LoadCell::update`] touches the ring. Every query works on the
/// samples already buffered.
pub struct LoadCell<S> {
    source: S,
    ring: SampleRing,
    calibration: Calibration,
}

impl<DOUT, SCK, D, E> LoadCell<Hx711<DOUT, SCK, D>>
where
    DOUT: InputPin<Error = E>,
    SCK: OutputPin<Error = E>,
    D: DelayNs,
{
    /// Bring up an HX711 on the given pins and wrap it.
    pub fn from_pins(
        dout: DOUT,
        sck: SCK,
        delay: D,
        config: &LoadCellConfig,
    ) -> Result<Self, Error<E>> {
        let hx711 = Hx711::with_timing(dout, sck, delay, config.gain, config.timing)?;
        Ok(Self::from_config(hx711, config))
    }
}

impl<S: SampleSource> LoadCell<S> {
    /// `buffer_len` is raised to [`crate::MIN_BUFFER_LEN`] if smaller.
    pub fn new(source: S, buffer_len: usize) -> Self {
        Self {
            source,
            ring: SampleRing::new(buffer_len),
            calibration: Calibration::default(),
        }
    }

    pub fn from_config(source: S, config: &LoadCellConfig) -> Self {
        Self {
            source,
            ring: SampleRing::new(config.buffer_len),
            calibration: config.calibration,
        }
    }

    /// Pull one sample into the ring if the source is ready.
    ///
    /// Returns `false` and leaves the ring untouched when it is not.
    pub fn update(&mut self) -> Result<bool, S::Error> {
        if !self.source.is_ready()? {
            return Ok(false);
        }
        let sample = self.source.read_sample()?;
        let slot = self.ring.index();
        self.ring.push(sample);
        trace!("load cell slot {} <- {}", slot, sample);
        Ok(true)
    }

    /// Mean of every slot in the ring, truncated to a whole count.
    ///
    /// Slots not yet written count as zero until the ring has been filled
    /// once. See [`LoadCell::read_average_filled`] for the partial mean.
    pub fn read_average(&self) -> f64 {
        self.ring.mean() as f64
    }

    /// Exact mean of the slots written so far, `None` before the first sample.
    pub fn read_average_filled(&self) -> Option<f64> {
        self.ring.mean_filled()
    }

    /// Average with the tare offset removed.
    pub fn get_value(&self) -> f64 {
        self.read_average() - f64::from(self.calibration.offset)
    }

    /// Calibrated reading. A zero scale gives a non-finite result.
    pub fn get_units(&self) -> f32 {
        (self.get_value() / f64::from(self.calibration.scale)) as f32
    }

    /// Zero the reading at the current load. The ring is kept.
    pub fn tare(&mut self) {
        let offset = self.ring.mean() as i32;
        debug!("load cell tare, offset {} -> {}", self.calibration.offset, offset);
        self.calibration.offset = offset;
    }

    pub fn set_offset(&mut self, offset: i32) {
        self.calibration.offset = offset;
    }

    pub fn get_offset(&self) -> i32 {
        self.calibration.offset
    }

    pub fn set_scale(&mut self, scale: f32) {
        self.calibration.scale = scale;
    }

    pub fn get_scale(&self) -> f32 {
        self.calibration.scale
    }

    pub fn calibration(&self) -> Calibration {
        self.calibration
    }

    pub fn set_calibration(&mut self, calibration: Calibration) {
        self.calibration = calibration;
    }

    pub fn power_down(&mut self) -> Result<(), S::Error> {
        self.source.power_down()
    }

    pub fn power_up(&mut self) -> Result<(), S::Error> {
        self.source.power_up()
    }

    pub fn capacity(&self) -> usize {
        self.ring.capacity()
    }

    /// True once every slot holds a real sample.
    pub fn is_full(&self) -> bool {
        self.ring.is_full()
    }

    pub fn ring(&self) -> &SampleRing {
        &self.ring
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn source_mut(&mut self) -> &mut S {
        &mut self.source
    }

    pub fn into_source(self) -> S {
        self.source
    }
}

impl<S, E> LoadCell<S>
where
    S: SampleSource<Error = Error<E>>,
{
    /// Like [`LoadCell::get_units`], but reports a zero scale as an error.
    pub fn try_get_units(&self) -> Result<f32, Error<E>> {
        if self.calibration.scale == 0.0 {
            return Err(Error::ZeroScale);
        }
        Ok(self.get_units())
    }

    /// Derive the scale from a known reference load currently on the cell.
    ///
    /// Tare first, then place `known_units` on the cell and let the ring
    /// refill. Returns the new scale.
    pub fn calibrate(&mut self, known_units: f32) -> Result<f32, Error<E>> {
        if !known_units.is_finite() || known_units == 0.0 {
            return Err(Error::InvalidReference);
        }
        let value = self.get_value();
        if value == 0.0 {
            return Err(Error::NoSignal);
        }
        let scale = (value / f64::from(known_units)) as f32;
        debug!("load cell calibrated, {} counts for {} units, scale {}", value, known_units, scale);
        self.calibration.scale = scale;
        Ok(scale)
    }
}
