//! Oscilloscope drivers, including screen capture through a binary block.

use daq_scpi::adapters::MockAdapter;
use daq_scpi::error::ScpiError;
use daq_scpi::instrument::rigol_dho800::{self, RigolDho800, TriggerLevel};
use daq_scpi::instrument::rigol_ds1054z::RigolDs1054z;
use daq_scpi::instrument::Scpi;
use tracing_test::traced_test;

const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', b'\r', b'\n', 0x1a, b'\n'];

fn screen_block(image: &[u8]) -> Vec<u8> {
    let mut raw = format!("#9{:09}", image.len()).into_bytes();
    raw.extend_from_slice(image);
    raw.push(b'\n');
    raw
}

#[test]
#[traced_test]
fn dho800_save_screen_writes_the_stripped_image() {
    let mut image = PNG_MAGIC.to_vec();
    image.extend(std::iter::repeat(0x42).take(4096));
    let mock = MockAdapter::new([(Some(":DISP:DATA? PNG"), None::<&str>)])
        .with_binary_reply(None, &screen_block(&image));
    let handle = mock.handle();
    let mut scope = RigolDho800::new(mock.boxed());

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("screen.png");
    let written = scope.save_screen(&path, "PNG").unwrap();

    assert_eq!(written, image.len());
    assert_eq!(std::fs::read(&path).unwrap(), image);
    assert!(logs_contain("screen saved"));
    handle.assert_finished();
}

#[test]
fn dho800_save_screen_rejects_a_non_block_reply() {
    let mock = MockAdapter::new([(Some(":DISP:DATA? BMP"), Some("ERROR"))]);
    let mut scope = RigolDho800::new(mock.boxed());
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("screen.bmp");

    assert!(matches!(
        scope.save_screen(&path, "BMP"),
        Err(ScpiError::BinaryBlock(_))
    ));
    assert!(!path.exists());
}

#[test]
fn dho800_channel_vertical_setup() {
    let mock = MockAdapter::new([
        (Some("CHAN3:DISP 1"), None),
        (Some("CHAN3:PROB 10"), None),
        (Some("CHAN3:SCAL 1.00e+01"), None),
        (Some("CHAN3:COUP AC"), None),
        (Some("CHAN3:DISP?"), Some("1")),
        (Some("CHAN3:PROB?"), Some("10.0000")),
    ]);
    let handle = mock.handle();
    let mut scope = RigolDho800::new(mock.boxed());
    let mut ch = scope.channel("3").unwrap();

    ch.set_display(true).unwrap();
    ch.set_attenuation(10.0).unwrap();
    ch.set_scale(20.0).unwrap();
    ch.set_coupling("AC").unwrap();
    assert!(ch.set_attenuation(3.0).is_err());
    assert!(ch.display().unwrap());
    assert_eq!(ch.attenuation().unwrap(), 10.0);
    handle.assert_finished();
}

#[test]
fn dho800_probe_ratio_table() {
    let ratios = rigol_dho800::probe_ratios();
    assert_eq!(ratios.len(), 27);
    assert_eq!(ratios.first(), Some(&0.001));
    assert!(ratios.contains(&50_000.0));
    assert!(ratios.contains(&1500.0));
}

#[test]
fn dho800_run_control_and_trigger() {
    let mock = MockAdapter::new([
        (Some(":CLE"), None),
        (Some(":SING"), None),
        (Some("*OPC?"), Some("1")),
        (Some("TRLV?"), Some("C2:TRLV 1.50E+00 V")),
        (Some(":STOP"), None),
    ]);
    let handle = mock.handle();
    let mut scope = RigolDho800::new(mock.boxed());

    scope.clear().unwrap();
    scope.single().unwrap();
    assert!(scope.is_opc().unwrap());
    assert_eq!(
        scope.trigger_level().unwrap(),
        TriggerLevel {
            source: "C2".to_string(),
            level: 1.5
        }
    );
    scope.stop().unwrap();
    handle.assert_finished();
}

#[test]
fn dho800_counter_settings() {
    let mock = MockAdapter::new([
        (Some(":COUN:ENAB 1"), None),
        (Some(":COUN:SOUR CHAN2"), None),
        (Some("COUN:NDIG 5"), None),
        (Some("COUN:NDIG?"), Some("5")),
        (Some(":COUN:CURR?"), Some("1.000012E+03")),
    ]);
    let handle = mock.handle();
    let mut scope = RigolDho800::new(mock.boxed());

    scope.set_counter_enabled(true).unwrap();
    scope.set_counter_source("CHAN2").unwrap();
    assert!(scope.set_counter_source("CHAN5").is_err());
    scope.set_counter_digits(5).unwrap();
    assert!(scope.set_counter_digits(7).is_err());
    assert_eq!(scope.counter_digits().unwrap(), 5);
    assert_eq!(scope.counter_value().unwrap(), 1000.012);
    handle.assert_finished();
}

#[test]
fn ds1054z_vertical_controls() {
    let mock = MockAdapter::new([
        (Some("C1:VDIV 5.00e-02V"), None),
        (Some("C1:VDIV?"), Some("C1:VDIV 5.00E-02V")),
        (Some("C1:CPL D1M"), None),
        (Some("C1:CPL?"), Some("C1:CPL D1M")),
    ]);
    let handle = mock.handle();
    let mut scope = RigolDs1054z::new(mock.boxed());
    let mut ch = scope.channel("1").unwrap();

    ch.set_vertical_division(0.05).unwrap();
    assert_eq!(ch.vertical_division().unwrap(), 0.05);
    ch.set_coupling("DC").unwrap();
    assert_eq!(ch.coupling().unwrap(), "DC");
    handle.assert_finished();
}
