//! Load cell PC simulator
//!
//! Runs the HX711 driver against a simulated chip: tare, calibration with a
//! reference weight, then a stream of readings.
//!
//! # Usage
//! ```bash
//! cargo run -p loadcell-simulator -- --load 812.5 --reference 500 --samples 20
//! RUST_LOG=trace cargo run -p loadcell-simulator -- --gain 64 --noise 30
//! ```
//!
//! # Options
//! - `--samples N`: readings to log after calibration (default 10)
//! - `--gain CODE`: 128, 64 or 32 (default 128)
//! - `--buffer N`: ring buffer length (default 16)
//! - `--load G`: load to weigh after calibration (default 1234.5)
//! - `--reference G`: known calibration weight (default 500)
//! - `--noise N`: peak noise in counts (default 20)

use std::str::FromStr;

use anyhow::{anyhow, Context};
use log::{info, warn};
use loadcell_hx711::{Gain, Hx711, LoadCell, LoadCellConfig, DEFAULT_BUFFER_LEN};
use loadcell_simulator::{DoutPin, SckPin, SimConfig, SimDelay, SimulatedHx711};

type SimCell = LoadCell<Hx711<DoutPin, SckPin, SimDelay>>;

struct Options {
    samples: usize,
    gain: Gain,
    buffer_len: usize,
    load: f64,
    reference: f32,
    noise: u32,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            samples: 10,
            gain: Gain::A128,
            buffer_len: DEFAULT_BUFFER_LEN,
            load: 1234.5,
            reference: 500.0,
            noise: 20,
        }
    }
}

fn parse_value<T: FromStr>(args: &[String], name: &str) -> anyhow::Result<Option<T>> {
    let Some(pos) = args.iter().position(|a| a == name) else {
        return Ok(None);
    };
    let raw = args.get(pos + 1).ok_or_else(|| anyhow!("{name} needs a value"))?;
    raw.parse::<T>()
        .map(Some)
        .map_err(|_| anyhow!("invalid value {raw:?} for {name}"))
}

fn parse_options(args: &[String]) -> anyhow::Result<Options> {
    let mut options = Options::default();
    if let Some(samples) = parse_value(args, "--samples")? {
        options.samples = samples;
    }
    if let Some(code) = parse_value::<u8>(args, "--gain")? {
        options.gain = Gain::try_from(code)?;
    }
    if let Some(buffer_len) = parse_value(args, "--buffer")? {
        options.buffer_len = buffer_len;
    }
    if let Some(load) = parse_value(args, "--load")? {
        options.load = load;
    }
    if let Some(reference) = parse_value(args, "--reference")? {
        options.reference = reference;
    }
    if let Some(noise) = parse_value(args, "--noise")? {
        options.noise = noise;
    }
    Ok(options)
}

/// Poll the cell until `n` fresh samples are buffered.
fn refill(sim: &SimulatedHx711, cell: &mut SimCell, n: usize) -> anyhow::Result<()> {
    let mut got = 0;
    while got < n {
        if cell.update().map_err(|e| anyhow!("update failed: {e}"))? {
            got += 1;
        } else {
            sim.advance_ms(5);
        }
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    // Initialize logging
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let options = parse_options(&args).context("bad arguments")?;

    info!("Load cell simulator starting...");
    info!("  gain {}, buffer {}, noise ±{}", options.gain, options.buffer_len, options.noise);

    let sim = SimulatedHx711::new(SimConfig {
        noise: options.noise,
        ..SimConfig::default()
    });
    let (dout, sck, delay) = sim.pins();
    let config = LoadCellConfig::default()
        .with_gain(options.gain)
        .with_buffer_len(options.buffer_len);
    let mut cell = LoadCell::from_pins(dout, sck, delay, &config)
        .map_err(|e| anyhow!("init failed: {e}"))?;
    let capacity = cell.capacity();
    if capacity != options.buffer_len {
        warn!("  buffer length raised to {}", capacity);
    }

    // Step 1: tare with the platform empty
    info!("[1/3] Taring (platform empty)...");
    refill(&sim, &mut cell, capacity)?;
    cell.tare();
    info!("  zero offset: {}", cell.get_offset());

    // Step 2: reference weight
    info!("[2/3] Calibrating with {} g reference...", options.reference);
    sim.set_load(f64::from(options.reference));
    refill(&sim, &mut cell, capacity)?;
    let scale = cell
        .calibrate(options.reference)
        .map_err(|e| anyhow!("calibration failed: {e}"))?;
    info!("  scale: {:.3} counts/g", scale);

    // Step 3: weigh
    info!("[3/3] Weighing {} g load...", options.load);
    sim.set_load(options.load);
    refill(&sim, &mut cell, capacity)?;
    for i in 0..options.samples {
        refill(&sim, &mut cell, 1)?;
        info!(
            "  #{:<3} t={:>7.1} ms  avg={:>9.0}  {:>9.2} g",
            i,
            sim.now_ns() as f64 / 1e6,
            cell.read_average(),
            cell.get_units()
        );
    }

    cell.power_down().map_err(|e| anyhow!("power down failed: {e}"))?;
    info!("Done, chip powered down: {}", sim.is_powered_down());
    Ok(())
}
