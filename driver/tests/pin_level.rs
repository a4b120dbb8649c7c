//! Full driver stack against mocked pins.

use embedded_hal_mock::eh1::delay::NoopDelay;
use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTransaction};
use loadcell_hx711::{Gain, LoadCell, LoadCellConfig, MIN_BUFFER_LEN};

fn dout_frame(raw: u32) -> Vec<PinTransaction> {
    (0..24)
        .rev()
        .map(|bit| {
            let state = if (raw >> bit) & 1 == 1 { State::High } else { State::Low };
            PinTransaction::get(state)
        })
        .collect()
}

fn sck_frame(gain: Gain) -> Vec<PinTransaction> {
    (0..24 + gain.pulses() as usize)
        .flat_map(|_| [PinTransaction::set(State::High), PinTransaction::set(State::Low)])
        .collect()
}

#[test]
fn update_reads_only_after_ready() {
    let gain = Gain::A64;
    // from_pins: clock low + gain read
    let mut dout_exp = dout_frame(0);
    let mut sck_exp = vec![PinTransaction::set(State::Low)];
    sck_exp.extend(sck_frame(gain));

    // Not ready: one DOUT poll, no clock activity.
    dout_exp.push(PinTransaction::get(State::High));

    // Ready: poll, then a 24-bit frame of -256 (0xFFFF00).
    for _ in 0..MIN_BUFFER_LEN {
        dout_exp.push(PinTransaction::get(State::Low));
        dout_exp.extend(dout_frame(0xFF_FF00));
        sck_exp.extend(sck_frame(gain));
    }

    let mut dout = PinMock::new(&dout_exp);
    let mut sck = PinMock::new(&sck_exp);

    let config = LoadCellConfig::default().with_buffer_len(1).with_gain(gain);
    let mut cell =
        LoadCell::from_pins(dout.clone(), sck.clone(), NoopDelay::new(), &config).unwrap();
    assert_eq!(cell.capacity(), MIN_BUFFER_LEN);
    assert_eq!(cell.source().gain(), Gain::A64);

    assert!(!cell.update().unwrap());
    for _ in 0..MIN_BUFFER_LEN {
        assert!(cell.update().unwrap());
    }
    assert!(cell.is_full());
    assert_eq!(cell.read_average(), -256.0);

    cell.tare();
    assert_eq!(cell.get_value(), 0.0);

    dout.done();
    sck.done();
}

#[test]
fn power_down_then_regain_selection() {
    let gain = Gain::B32;
    let dout_exp = {
        let mut v = dout_frame(0);
        // set_gain after wake-up
        v.extend(dout_frame(0));
        v
    };
    let mut sck_exp = vec![PinTransaction::set(State::Low)];
    sck_exp.extend(sck_frame(gain));
    sck_exp.extend([
        PinTransaction::set(State::Low),
        PinTransaction::set(State::High),
        PinTransaction::set(State::Low),
        PinTransaction::set(State::Low),
    ]);
    sck_exp.extend(sck_frame(gain));

    let mut dout = PinMock::new(&dout_exp);
    let mut sck = PinMock::new(&sck_exp);

    let config = LoadCellConfig::default().with_gain(gain);
    let mut cell =
        LoadCell::from_pins(dout.clone(), sck.clone(), NoopDelay::new(), &config).unwrap();

    cell.power_down().unwrap();
    cell.power_up().unwrap();
    let hx711 = cell.source_mut();
    let selection = hx711.gain();
    hx711.set_gain(selection).unwrap();

    dout.done();
    sck.done();
}
