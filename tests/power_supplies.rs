//! Power supply drivers checked against scripted wire exchanges.

use daq_scpi::adapters::MockAdapter;
use daq_scpi::error::ScpiError;
use daq_scpi::instrument::etm_l303sp::EtmL303sp;
use daq_scpi::instrument::itech_it6322a::ItechIt6322a;
use daq_scpi::instrument::rigol_dp900::RigolDp900;
use daq_scpi::instrument::{DriverKind, Instrument, Scpi};
use tracing_test::traced_test;

#[test]
fn l303sp_bench_session() {
    let mock = MockAdapter::new([
        (Some("*IDN?"), Some("eTM,L303SP,SN0042,V1.10")),
        (Some("SYST:REM"), None),
        (Some("VOLT 5"), None),
        (Some("CURR 0.25"), None),
        (Some("OUTP:STAT ON"), None),
        (Some("APPL CH1; MEAS:VOLT?"), Some("4.998")),
        (Some("APPL CH1; MEAS:CURR?"), Some("0.012")),
        (Some("OUTP:STAT OFF"), None),
        (Some("SYST:LOC"), None),
    ]);
    let handle = mock.handle();
    let mut psu = EtmL303sp::new(mock.boxed());

    assert_eq!(psu.id().unwrap(), "eTM,L303SP,SN0042,V1.10");
    psu.set_remote_control_enabled(true).unwrap();
    psu.set_voltage_setpoint(5.0).unwrap();
    psu.set_current_setpoint(0.25).unwrap();
    psu.set_output_enabled(true).unwrap();
    {
        let mut out = psu.channel("1").unwrap();
        assert_eq!(out.voltage().unwrap(), 4.998);
        assert_eq!(out.current().unwrap(), 0.012);
    }
    psu.set_output_enabled(false).unwrap();
    psu.set_remote_control_enabled(false).unwrap();
    handle.assert_finished();
}

#[test]
fn l303sp_narrowed_bounds_reject_before_sending() {
    let mock = MockAdapter::new([(Some("VOLT 3.3"), None::<&str>)]);
    let handle = mock.handle();
    let mut psu = EtmL303sp::new(mock.boxed());

    psu.set_voltage_bounds(0.0, 5.0).unwrap();
    assert!(matches!(
        psu.set_voltage_setpoint(12.0),
        Err(ScpiError::Validation(_))
    ));
    psu.set_voltage_setpoint(3.3).unwrap();
    assert_eq!(handle.written(), vec!["VOLT 3.3"]);
}

#[test]
fn dp900_channels_share_one_transport() {
    let mock = MockAdapter::new([
        (Some("SOUR1:VOLT 12"), None),
        (Some("SOUR3:VOLT 3.3"), None),
        (Some("OUTP:STAT CH1, 1"), None),
        (Some("OUTP:STAT? CH3"), Some("0")),
        (Some("MEAS:POW? CH1"), Some("1.2")),
    ]);
    let handle = mock.handle();
    let mut psu = RigolDp900::new(mock.boxed());

    psu.channel("1").unwrap().set_voltage_setpoint(12.0).unwrap();
    psu.channel("3").unwrap().set_voltage_setpoint(3.3).unwrap();
    psu.channel("1").unwrap().set_output_enabled(true).unwrap();
    assert!(!psu.channel("3").unwrap().output_enabled().unwrap());
    assert_eq!(psu.channel("1").unwrap().power().unwrap(), 1.2);
    assert!(matches!(psu.channel("4"), Err(ScpiError::UnknownChannel(_))));
    handle.assert_finished();
}

#[test]
fn dp900_protection_trip_and_clear() {
    let mock = MockAdapter::new([
        (Some("SOUR2:VOLT:PROT 6"), None),
        (Some("SOUR2:VOLT:PROT:STAT 1"), None),
        (Some("SOUR2:VOLT:PROT:TRIP?"), Some("1")),
        (Some("SOUR2:VOLT:PROT:CLE"), None),
        (Some("SOUR2:VOLT:PROT:TRIP?"), Some("0")),
    ]);
    let handle = mock.handle();
    let mut psu = RigolDp900::new(mock.boxed());
    let mut out = psu.channel("2").unwrap();

    out.set_ovp_setpoint(6.0).unwrap();
    out.set_ovp_enabled(true).unwrap();
    assert!(out.ovp_tripped().unwrap());
    out.ovp_clear().unwrap();
    assert!(!out.ovp_tripped().unwrap());
    drop(psu);
    handle.assert_finished();
    assert!(handle.is_closed());
}

#[test]
#[traced_test]
fn dp900_error_queue_is_drained_and_logged() {
    let mock = MockAdapter::new([
        (Some("SYST:ERR?"), Some("-113,\"Undefined header\"")),
        (Some("SYST:ERR?"), Some("-222,\"Data out of range\"")),
        (Some("SYST:ERR?"), Some("0,\"No error\"")),
    ]);
    let handle = mock.handle();
    let mut psu = RigolDp900::new(mock.boxed());

    let errors = psu.check_errors().unwrap();
    assert_eq!(errors, vec!["-113, Undefined header", "-222, Data out of range"]);
    assert!(logs_contain("Undefined header"));
    handle.assert_finished();
}

#[test]
fn it6322a_channel_prefixes() {
    let mock = MockAdapter::new([
        (Some("APPL CH2; VOLT 24"), None),
        (Some("APPL CH2; CURR 0.5"), None),
        (Some("APPL CH2; CHAN:OUTP 1"), None),
        (Some("APPL CH2; VOLT?"), Some("24.000")),
        (Some("APPL CH2; MEAS:VOLT?"), Some("23.998")),
    ]);
    let handle = mock.handle();
    let mut psu = ItechIt6322a::new(mock.boxed());
    let mut out = psu.channel("2").unwrap();

    out.set_voltage_setpoint(24.0).unwrap();
    out.set_current_setpoint(0.5).unwrap();
    assert!(out.set_current_setpoint(1.5).is_err());
    out.set_output_enabled(true).unwrap();
    assert_eq!(out.voltage_setpoint().unwrap(), 24.0);
    assert_eq!(out.voltage().unwrap(), 23.998);
    handle.assert_finished();
}

#[test]
fn generic_instrument_resolves_schema_properties() {
    let schema = DriverKind::RigolDp900.schema();
    let prop = schema.channel_property("2", "current_setpoint").unwrap();

    let mock = MockAdapter::new([(Some("SOUR2:CURR 1.5"), None), (Some("SOUR2:CURR?"), Some("1.500"))]);
    let handle = mock.handle();
    let mut inst = Instrument::new(DriverKind::RigolDp900.default_name(), mock.boxed());
    inst.channel("2").set(prop, 1.5).unwrap();
    let value: f64 = inst.channel("2").get_as(prop).unwrap();
    assert_eq!(value, 1.5);
    handle.assert_finished();

    let driver = RigolDp900::from_instrument(inst);
    drop(driver);
    assert!(handle.is_closed());
}
