//! Driver against the simulated chip.

use loadcell_hx711::{Error, Gain, Hx711, LoadCell, LoadCellConfig};
use loadcell_simulator::{DoutPin, SckPin, SimConfig, SimDelay, SimulatedHx711};

type SimCell = LoadCell<Hx711<DoutPin, SckPin, SimDelay>>;

fn setup(config: &LoadCellConfig) -> (SimulatedHx711, SimCell) {
    let sim = SimulatedHx711::new(SimConfig::default());
    let (dout, sck, delay) = sim.pins();
    let cell = LoadCell::from_pins(dout, sck, delay, config).unwrap();
    (sim, cell)
}

/// Poll until `n` new samples have landed in the ring.
fn collect(sim: &SimulatedHx711, cell: &mut SimCell, n: usize) {
    let mut got = 0;
    while got < n {
        if cell.update().unwrap() {
            got += 1;
        } else {
            sim.advance_ms(10);
        }
    }
}

#[test]
fn tare_and_calibrate() {
    let (sim, mut cell) = setup(&LoadCellConfig::default());
    let capacity = cell.capacity();

    collect(&sim, &mut cell, capacity);
    assert_eq!(cell.read_average(), 150_000.0);
    cell.tare();
    assert_eq!(cell.get_value(), 0.0);

    sim.set_load(250.0);
    collect(&sim, &mut cell, capacity);
    assert_eq!(cell.calibrate(250.0), Ok(420.0));

    sim.set_load(100.0);
    collect(&sim, &mut cell, capacity);
    assert!((cell.get_units() - 100.0).abs() < 0.01);
}

#[test]
fn noisy_cell_averages_out() {
    let sim = SimulatedHx711::new(SimConfig {
        noise: 40,
        ..SimConfig::default()
    });
    let (dout, sck, delay) = sim.pins();
    let config = LoadCellConfig::default().with_buffer_len(64);
    let mut cell = LoadCell::from_pins(dout, sck, delay, &config).unwrap();

    collect(&sim, &mut cell, 64);
    cell.tare();
    cell.set_scale(420.0);

    sim.set_load(50.0);
    collect(&sim, &mut cell, 64);
    assert!((cell.get_units() - 50.0).abs() < 0.5, "units {}", cell.get_units());
}

#[test]
fn initial_gain_reaches_chip() {
    for gain in [Gain::A128, Gain::A64, Gain::B32] {
        let (sim, cell) = setup(&LoadCellConfig::default().with_gain(gain));
        assert_eq!(sim.gain(), gain);
        assert_eq!(cell.source().gain(), gain);
    }
}

#[test]
fn gain_changes_scale_readings() {
    let (sim, mut cell) = setup(&LoadCellConfig::default());
    let capacity = cell.capacity();
    collect(&sim, &mut cell, capacity);
    let at_128 = cell.read_average();

    sim.wait_ready();
    cell.source_mut().set_gain(Gain::B32).unwrap();
    assert_eq!(sim.gain(), Gain::B32);
    collect(&sim, &mut cell, capacity);
    assert_eq!(cell.read_average(), at_128 / 4.0);
}

#[test]
fn invalid_gain_code_is_ignored() {
    let (sim, mut cell) = setup(&LoadCellConfig::default().with_gain(Gain::A64));
    sim.wait_ready();
    let hx711 = cell.source_mut();
    assert!(matches!(hx711.set_gain_code(100), Err(Error::InvalidGain(100))));
    assert_eq!(hx711.gain(), Gain::A64);
    assert_eq!(sim.gain(), Gain::A64);
}

#[test]
fn sign_extension_end_to_end() {
    let (sim, mut cell) = setup(&LoadCellConfig::default());
    let raws = [-1, -8_388_608, 8_388_607, 0, -123_456, 123_456, 1, -2, 42, -42];
    sim.queue_raw(raws);

    let hx711 = cell.source_mut();
    for expected in raws {
        sim.wait_ready();
        assert!(hx711.is_ready().unwrap());
        assert_eq!(hx711.read().unwrap(), expected);
    }
}

#[test]
fn read_does_not_wait_for_ready() {
    let (sim, mut cell) = setup(&LoadCellConfig::default());
    let hx711 = cell.source_mut();
    assert!(!hx711.is_ready().unwrap());
    // DOUT is high for the whole frame.
    assert_eq!(hx711.read().unwrap(), -1);
    assert!(!sim.is_ready());
    // Both bursts run together into one 50 pulse frame, too long to count.
    assert_eq!(sim.pulses_seen(), 50);
    assert_eq!(sim.gain(), Gain::A128);
    assert_eq!(hx711.gain(), Gain::A128);
}

#[test]
fn read_while_converting_keeps_selection() {
    for gain in [Gain::A128, Gain::A64, Gain::B32] {
        let (sim, mut cell) = setup(&LoadCellConfig::default().with_gain(gain));
        sim.advance_ms(1);
        let hx711 = cell.source_mut();
        assert_eq!(hx711.read().unwrap(), -1);
        assert_eq!(sim.gain(), gain);
        assert_eq!(sim.frames(), 1);
    }
}

#[test]
fn power_cycle() {
    let (sim, mut cell) = setup(&LoadCellConfig::default().with_gain(Gain::B32));
    let capacity = cell.capacity();
    collect(&sim, &mut cell, capacity);

    cell.power_down().unwrap();
    assert!(sim.is_powered_down());
    sim.advance_ms(500);
    assert!(!cell.update().unwrap());

    cell.power_up().unwrap();
    assert!(!sim.is_powered_down());
    assert_eq!(sim.gain(), Gain::A128);

    // One discarded read puts the selection back.
    sim.wait_ready();
    let hx711 = cell.source_mut();
    assert!(hx711.is_ready().unwrap());
    let gain = hx711.gain();
    hx711.set_gain(gain).unwrap();
    assert_eq!(sim.gain(), Gain::B32);
}
