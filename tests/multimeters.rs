//! Bench multimeter drivers checked against scripted wire exchanges.

use daq_scpi::adapters::MockAdapter;
use daq_scpi::error::ScpiError;
use daq_scpi::instrument::fluke_8808a::Fluke8808a;
use daq_scpi::instrument::rigol_dm3068::{self, RigolDm3068};
use daq_scpi::instrument::victor_8045m::{self, Victor8045m};
use daq_scpi::instrument::{DriverKind, Instrument, Scpi};
use daq_scpi::limits::FLUKE_RESET_SETTLE;
use std::time::Instant;
use tracing_test::traced_test;

#[test]
fn dm3068_every_function_survives_a_round_trip() {
    let replies = [
        "DCV", "ACV", "DCI", "ACI", "2WR", "4WR", "FREQ", "PERI", "CONT", "DIODE", "CAP",
    ];
    let mut script = Vec::new();
    for ((_, wire), reply) in rigol_dm3068::FUNCTIONS.iter().zip(replies) {
        script.push((Some(format!(":FUNC:{}", wire)), None));
        script.push((Some(":FUNC?".to_string()), Some(reply.to_string())));
    }
    let mock = MockAdapter::new(script);
    let handle = mock.handle();
    let mut dmm = RigolDm3068::new(mock.boxed());

    for (name, _) in rigol_dm3068::FUNCTIONS {
        dmm.set_function(name).unwrap();
        assert_eq!(dmm.function().unwrap(), name);
    }
    handle.assert_finished();
}

#[test]
fn dm3068_measures_dc_voltage() {
    let mock = MockAdapter::new([
        (Some(":FUNC:VOLT:DC"), None),
        (Some(":MEAS:VOLT:DC?"), Some("-2.500012E+00")),
    ]);
    let mut dmm = RigolDm3068::new(mock.boxed());
    dmm.set_function("DCV").unwrap();
    assert_eq!(dmm.voltage_dc().unwrap(), -2.500012);
}

#[test]
fn victor_range_accepts_volts_or_codes() {
    let mock = MockAdapter::new([
        (Some("RANGE 4"), None),
        (Some("RANGE?"), Some("50V")),
        (Some("RANGE?"), Some("2")),
        (Some("RANGE?"), Some("7V")),
    ]);
    let handle = mock.handle();
    let mut dmm = Victor8045m::new(mock.boxed());

    dmm.set_dcv_range(50.0).unwrap();
    assert_eq!(dmm.dcv_range().unwrap(), 50.0);
    assert_eq!(dmm.dcv_range().unwrap(), 0.5);
    assert!(matches!(dmm.dcv_range(), Err(ScpiError::Lookup(_))));
    assert!(matches!(dmm.set_dcv_range(7.0), Err(ScpiError::Validation(_))));
    handle.assert_finished();
}

#[test]
fn victor_dual_display_reading() {
    let mock = MockAdapter::new([
        (Some("CONF:VOLT:AC"), None),
        (Some("MEAS?"), Some("229.87,50.00")),
        (Some("MEAS1?"), Some("229.87")),
    ]);
    let handle = mock.handle();
    let mut dmm = Victor8045m::new(mock.boxed());

    dmm.set_function("ACV").unwrap();
    assert_eq!(dmm.reading().unwrap(), vec![229.87, 50.0]);
    assert_eq!(dmm.reading_primary().unwrap(), 229.87);
    assert!(dmm.set_function("OHM").is_err());
    handle.assert_finished();
}

#[test]
fn victor_serial_defaults_follow_the_registry() {
    assert_eq!(
        DriverKind::Victor8045m.connection(),
        victor_8045m::connection()
    );
    assert_eq!(DriverKind::Victor8045m.connection().baud_rate, 115_200);
}

#[test]
fn fluke_registry_instrument_consumes_prompts() {
    let mock = MockAdapter::new([
        (Some("VAL1?"), Some("+3.3012E+0")),
        (None, Some("=>")),
    ]);
    let handle = mock.handle();
    let schema = DriverKind::Fluke8808a.schema();
    let mut inst = Instrument::new(DriverKind::Fluke8808a.default_name(), mock.boxed())
        .with_boxed_error_check(DriverKind::Fluke8808a.error_check());

    let value: f64 = inst.get_as(schema.property("value").unwrap()).unwrap();
    assert_eq!(value, 3.3012);
    assert_eq!(inst.name(), "Fluke 7341");
    handle.assert_finished();
}

#[test]
#[traced_test]
fn fluke_reset_waits_for_the_prompt() {
    let mock = MockAdapter::new([(Some("*RST"), None), (None, Some("=>"))]);
    let handle = mock.handle();
    let mut dmm = Fluke8808a::new(mock.boxed());

    let started = Instant::now();
    dmm.reset().unwrap();
    assert!(started.elapsed() >= FLUKE_RESET_SETTLE);
    assert!(logs_contain("reset complete"));
    handle.assert_finished();
}

#[test]
fn fluke_missing_prompt_times_out() {
    let mock = MockAdapter::new([(Some("FUNC1?"), Some("VDC"))]);
    let mut dmm = Fluke8808a::new(mock.boxed());
    assert!(matches!(dmm.function(), Err(ScpiError::Timeout(_))));
}
