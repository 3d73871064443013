//! Rigol DHO800 series oscilloscope.
//!
//! Covers the vertical controls of the four analog channels, run control,
//! autoset options, the timebase, the frequency counter, the digital
//! voltmeter and screen capture.

use super::binary_block::parse_definite_block;
use super::channel::Channel;
use super::registry::{require_channel, DriverKind, DriverSchema};
use super::scpi::{idn, Driver, Scpi};
use super::Instrument;
use crate::adapters::{open_resource, Adapter, ConnectionSettings};
use crate::error::{ScpiError, ScpiResult};
use crate::property::{Cast, Property, PropertyValue, ValueMap};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::info;

/// Name used in logs.
pub const DEFAULT_NAME: &str = "Rigol DHO800";

/// Analog channel ids.
pub const CHANNELS: &[&str] = &["1", "2", "3", "4"];

const SOURCES: [&str; 4] = ["CHAN1", "CHAN2", "CHAN3", "CHAN4"];

/// Probe ratios accepted by `CHAN<n>:PROB`: 1-2-5 steps from 0.001 to
/// 50000, plus 150, 1500 and 15000.
pub fn probe_ratios() -> Vec<f64> {
    let mut ratios: Vec<f64> = (-3..=4)
        .flat_map(|exp| [1, 2, 5].map(|mantissa| format!("{}e{}", mantissa, exp)))
        .filter_map(|text| text.parse().ok())
        .collect();
    ratios.extend([150.0, 1500.0, 15000.0]);
    ratios
}

/// On/off control accepting `true`, `"on"`, `"ON"` and their opposites.
fn switch(name: &'static str, get: &'static str, set: &'static str) -> Property {
    Property::control(name, get, set)
        .value_map(ValueMap::on_off_aliases())
        .strict_keys()
}

// Channel scope.

fn bwlimit() -> Property {
    Property::control("bwlimit", ":CHAN{ch}:BWL?", ":CHAN{ch}:BWL %s").strict_set(["20M", "OFF"])
}

fn coupling() -> Property {
    Property::control("coupling", "CHAN{ch}:COUP?", "CHAN{ch}:COUP %s")
        .strict_set(["DC", "AC", "GND"])
}

fn display() -> Property {
    switch("display", "CHAN{ch}:DISP?", "CHAN{ch}:DISP %d")
}

fn offset() -> Property {
    Property::control("offset", "CHAN{ch}:OFFS?", "CHAN{ch}:OFFS %.2e")
}

fn invert() -> Property {
    switch("invert", "CHAN{ch}:INV?", "CHAN{ch}:INV %d")
}

fn scale() -> Property {
    Property::control("scale", "CHAN{ch}:SCAL?", "CHAN{ch}:SCAL %.2e").truncated_range(500e-6, 10.0)
}

fn attenuation() -> Property {
    Property::control("attenuation", "CHAN{ch}:PROB?", "CHAN{ch}:PROB %s")
        .strict_set(probe_ratios())
}

fn label_enabled() -> Property {
    switch("label_enabled", "CHAN{ch}:LAB:SHOW?", "CHAN{ch}:LAB:SHOW %d")
}

fn label() -> Property {
    Property::control("label", ":CHAN{ch}:LAB:CONT?", ":CHAN{ch}:LAB:CONT %s")
        .cast(Cast::Str)
        .no_split()
}

fn vernier_enabled() -> Property {
    switch("vernier_enabled", "CHAN{ch}:VERN?", "CHAN{ch}:VERN %d")
}

fn position() -> Property {
    Property::control("position", "CHAN{ch}:POS?", "CHAN{ch}:POS %.2e")
}

// Trigger.

/// Trigger source and level, decoded from a `TRLV?` reply.
#[derive(Debug, Clone, PartialEq)]
pub struct TriggerLevel {
    /// Trigger source (`C1`, `C2`, `EX`, `EX/5`)
    pub source: String,
    /// Level in volts
    pub level: f64,
}

impl TryFrom<PropertyValue> for TriggerLevel {
    type Error = ScpiError;

    fn try_from(value: PropertyValue) -> ScpiResult<Self> {
        let PropertyValue::Record(mut fields) = value else {
            return Err(ScpiError::Parse(format!(
                "expected a trigger level record, got {} '{}'",
                value.kind(),
                value
            )));
        };
        let source = fields
            .remove("source")
            .ok_or_else(|| ScpiError::Parse("trigger level without source".to_string()))?;
        let level = fields
            .remove("level")
            .ok_or_else(|| ScpiError::Parse("trigger level without level".to_string()))?;
        Ok(Self {
            source: String::try_from(source)?,
            level: f64::try_from(level)?,
        })
    }
}

/// `C1:TRLV 2.50E-01 V`: source before the first colon, level after the
/// first space with the two-character unit suffix removed.
fn parse_trigger_level(raw: &str) -> ScpiResult<PropertyValue> {
    let reply = raw.trim();
    let source = reply.split_once(':').map_or(reply, |(head, _)| head);
    let argument = reply.split_once(' ').map_or(reply, |(_, arg)| arg);
    let mut chars = argument.chars();
    chars.next_back();
    chars.next_back();
    let level: f64 = chars
        .as_str()
        .trim()
        .parse()
        .map_err(|_| ScpiError::Parse(format!("unexpected trigger level reply '{}'", reply)))?;

    let mut fields = BTreeMap::new();
    fields.insert("source".to_string(), PropertyValue::from(source));
    fields.insert("level".to_string(), PropertyValue::Float(level));
    Ok(PropertyValue::Record(fields))
}

fn trigger_level() -> Property {
    Property::measurement("trigger_level", "TRLV?").get_process(parse_trigger_level)
}

// Autoset.

fn autoset_peak() -> Property {
    switch("autoset_peak", ":AUT:PEAK?", ":AUT:PEAK %d")
}

fn autoset_enabled_channels_only() -> Property {
    switch("autoset_enabled_channels_only", ":AUT:OPEN?", ":AUT:OPEN %d")
}

fn autoset_overlap() -> Property {
    switch("autoset_overlap", ":AUT:OVER?", ":AUT:OVER %d")
}

fn autoset_keep_coupling() -> Property {
    switch("autoset_keep_coupling", ":AUT:KEEP?", ":AUT:KEEP %d")
}

fn autoset_lock() -> Property {
    switch("autoset_lock", ":AUT:LOCK?", ":AUT:LOCK %d")
}

// Timebase.

fn timebase_scale() -> Property {
    Property::control("timebase_scale", ":TIM:SCAL?", ":TIM:SCAL %.2e")
}

fn timebase_mode() -> Property {
    Property::control("timebase_mode", "TIM:MODE?", "TIM:MODE %s").strict_set(["MAIN", "XY", "ROLL"])
}

fn timebase_offset() -> Property {
    Property::control("timebase_offset", "TIM:OFFSET?", "TIM:OFFSET %e")
}

// Frequency counter.

fn counter_value() -> Property {
    Property::measurement("counter_value", ":COUN:CURR?")
}

fn counter_enabled() -> Property {
    switch("counter_enabled", ":COUN:ENAB?", ":COUN:ENAB %d")
}

fn counter_source() -> Property {
    Property::control("counter_source", ":COUN:SOUR?", ":COUN:SOUR %s").strict_set(SOURCES)
}

fn counter_mode() -> Property {
    Property::control("counter_mode", "COUN:MODE?", "COUN:MODE %s")
        .strict_set(["FREQUENCY", "PERIOD", "TOTALIZE"])
}

fn counter_digits() -> Property {
    Property::control("counter_digits", "COUN:NDIG?", "COUN:NDIG %d")
        .cast(Cast::Int)
        .strict_set([3i64, 4, 5, 6])
}

fn counter_statistics_enabled() -> Property {
    switch("counter_statistics_enabled", "COUN:TOT:ENAB?", "COUN:TOT:ENAB %d")
}

// Digital voltmeter.

fn dvm_value() -> Property {
    Property::measurement("dvm_value", "DVM:CURR?")
}

fn dvm_enabled() -> Property {
    switch("dvm_enabled", ":DVM:ENAB?", ":DVM:ENAB %d")
}

fn dvm_source() -> Property {
    Property::control("dvm_source", ":DVM:SOUR?", "DVM:SOUR %s").strict_set(SOURCES)
}

fn dvm_mode() -> Property {
    Property::control("dvm_mode", ":DVM:MODE?", ":DVM:MODE %s").strict_set(["ACRMS", "DC", "DCRMS"])
}

/// Declared properties.
pub fn schema() -> DriverSchema {
    DriverSchema {
        kind: DriverKind::RigolDho800,
        channels: CHANNELS,
        properties: vec![
            idn(),
            trigger_level(),
            autoset_peak(),
            autoset_enabled_channels_only(),
            autoset_overlap(),
            autoset_keep_coupling(),
            autoset_lock(),
            timebase_scale(),
            timebase_mode(),
            timebase_offset(),
            counter_value(),
            counter_enabled(),
            counter_source(),
            counter_mode(),
            counter_digits(),
            counter_statistics_enabled(),
            dvm_value(),
            dvm_enabled(),
            dvm_source(),
            dvm_mode(),
        ],
        channel_properties: vec![
            bwlimit(),
            coupling(),
            display(),
            offset(),
            invert(),
            scale(),
            attenuation(),
            label_enabled(),
            label(),
            vernier_enabled(),
            position(),
        ],
    }
}

/// Rigol DHO800 driver.
#[derive(Debug)]
pub struct RigolDho800 {
    inst: Instrument,
}

impl RigolDho800 {
    /// Wrap an opened adapter.
    pub fn new(adapter: Box<dyn Adapter>) -> Self {
        Self::from_instrument(Instrument::new(DEFAULT_NAME, adapter))
    }

    /// Open `resource` with the default connection settings.
    pub fn connect(resource: &str) -> ScpiResult<Self> {
        Ok(Self::new(open_resource(resource, &ConnectionSettings::default())?))
    }

    /// Wrap an existing instrument.
    pub fn from_instrument(inst: Instrument) -> Self {
        Self { inst }
    }

    /// Analog channel `id` ("1" to "4").
    pub fn channel(&mut self, id: &str) -> ScpiResult<DhoChannel<'_>> {
        require_channel(CHANNELS, id)?;
        Ok(DhoChannel {
            ch: self.inst.channel(id),
        })
    }

    /// Set the operation complete bit once pending operations finish.
    pub fn opc(&mut self) -> ScpiResult<()> {
        self.inst.write("*OPC")
    }

    /// True when pending operations have finished.
    pub fn is_opc(&mut self) -> ScpiResult<bool> {
        Ok(self.inst.ask("*OPC?")?.trim() == "1")
    }

    /// Start acquisition.
    pub fn run(&mut self) -> ScpiResult<()> {
        self.inst.write("RUN")
    }

    /// Stop acquisition.
    pub fn stop(&mut self) -> ScpiResult<()> {
        self.inst.write(":STOP")
    }

    /// Arm a single trigger.
    pub fn single(&mut self) -> ScpiResult<()> {
        self.inst.write(":SING")
    }

    /// Force a trigger event.
    pub fn force_trigger(&mut self) -> ScpiResult<()> {
        self.inst.write(":TFOR")
    }

    /// Run the waveform autoset.
    pub fn autoset(&mut self) -> ScpiResult<()> {
        self.inst.write(":AUT")
    }

    /// Current trigger source and level.
    pub fn trigger_level(&mut self) -> ScpiResult<TriggerLevel> {
        self.inst.get_as(&trigger_level())
    }

    /// Peak-to-peak priority in autoset.
    pub fn autoset_peak(&mut self) -> ScpiResult<bool> {
        self.inst.get_as(&autoset_peak())
    }

    /// Enable peak-to-peak priority in autoset.
    pub fn set_autoset_peak(&mut self, enabled: bool) -> ScpiResult<()> {
        self.inst.set(&autoset_peak(), enabled)
    }

    /// Whether autoset only tests the enabled channels.
    pub fn autoset_enabled_channels_only(&mut self) -> ScpiResult<bool> {
        self.inst.get_as(&autoset_enabled_channels_only())
    }

    /// Restrict autoset to the enabled channels. When off, every channel is
    /// tested and channels without a signal are switched off.
    pub fn set_autoset_enabled_channels_only(&mut self, enabled: bool) -> ScpiResult<()> {
        self.inst.set(&autoset_enabled_channels_only(), enabled)
    }

    /// Overlap display mode after autoset.
    pub fn autoset_overlap(&mut self) -> ScpiResult<bool> {
        self.inst.get_as(&autoset_overlap())
    }

    /// Enable overlap display after autoset.
    pub fn set_autoset_overlap(&mut self, enabled: bool) -> ScpiResult<()> {
        self.inst.set(&autoset_overlap(), enabled)
    }

    /// Whether autoset keeps the channel coupling.
    pub fn autoset_keep_coupling(&mut self) -> ScpiResult<bool> {
        self.inst.get_as(&autoset_keep_coupling())
    }

    /// Keep the coupling in autoset. When off, DC coupling is used.
    pub fn set_autoset_keep_coupling(&mut self, enabled: bool) -> ScpiResult<()> {
        self.inst.set(&autoset_keep_coupling(), enabled)
    }

    /// Whether the AUTO key is locked.
    pub fn autoset_lock(&mut self) -> ScpiResult<bool> {
        self.inst.get_as(&autoset_lock())
    }

    /// Lock or unlock the AUTO key.
    pub fn set_autoset_lock(&mut self, locked: bool) -> ScpiResult<()> {
        self.inst.set(&autoset_lock(), locked)
    }

    /// Horizontal scale in s/div.
    pub fn timebase_scale(&mut self) -> ScpiResult<f64> {
        self.inst.get_as(&timebase_scale())
    }

    /// Set the horizontal scale. The scope rounds down to the nearest step.
    pub fn set_timebase_scale(&mut self, seconds: f64) -> ScpiResult<()> {
        self.inst.set(&timebase_scale(), seconds)
    }

    /// Timebase mode, `MAIN`, `XY` or `ROLL`.
    pub fn timebase_mode(&mut self) -> ScpiResult<String> {
        self.inst.get_as(&timebase_mode())
    }

    /// Set the timebase mode.
    pub fn set_timebase_mode(&mut self, mode: &str) -> ScpiResult<()> {
        self.inst.set(&timebase_mode(), mode)
    }

    /// Horizontal offset in seconds.
    pub fn timebase_offset(&mut self) -> ScpiResult<f64> {
        self.inst.get_as(&timebase_offset())
    }

    /// Set the horizontal offset.
    pub fn set_timebase_offset(&mut self, seconds: f64) -> ScpiResult<()> {
        self.inst.set(&timebase_offset(), seconds)
    }

    /// Frequency counter reading.
    pub fn counter_value(&mut self) -> ScpiResult<f64> {
        self.inst.get_as(&counter_value())
    }

    /// Counter state.
    pub fn counter_enabled(&mut self) -> ScpiResult<bool> {
        self.inst.get_as(&counter_enabled())
    }

    /// Enable or disable the counter.
    pub fn set_counter_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.inst.set(&counter_enabled(), enabled)
    }

    /// Counter source, `CHAN1` to `CHAN4`.
    pub fn counter_source(&mut self) -> ScpiResult<String> {
        self.inst.get_as(&counter_source())
    }

    /// Set the counter source.
    pub fn set_counter_source(&mut self, source: &str) -> ScpiResult<()> {
        self.inst.set(&counter_source(), source)
    }

    /// Counter mode, `FREQUENCY`, `PERIOD` or `TOTALIZE`.
    pub fn counter_mode(&mut self) -> ScpiResult<String> {
        self.inst.get_as(&counter_mode())
    }

    /// Set the counter mode.
    pub fn set_counter_mode(&mut self, mode: &str) -> ScpiResult<()> {
        self.inst.set(&counter_mode(), mode)
    }

    /// Counter resolution in digits.
    pub fn counter_digits(&mut self) -> ScpiResult<i64> {
        self.inst.get_as(&counter_digits())
    }

    /// Set the counter resolution, 3 to 6 digits.
    pub fn set_counter_digits(&mut self, digits: i64) -> ScpiResult<()> {
        self.inst.set(&counter_digits(), digits)
    }

    /// Totalizer statistics state.
    pub fn counter_statistics_enabled(&mut self) -> ScpiResult<bool> {
        self.inst.get_as(&counter_statistics_enabled())
    }

    /// Enable or disable the totalizer statistics.
    pub fn set_counter_statistics_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.inst.set(&counter_statistics_enabled(), enabled)
    }

    /// Clear the totalizer.
    pub fn counter_statistics_clear(&mut self) -> ScpiResult<()> {
        self.inst.write(":COUN:TOT:CLE")
    }

    /// Digital voltmeter reading.
    pub fn dvm_value(&mut self) -> ScpiResult<f64> {
        self.inst.get_as(&dvm_value())
    }

    /// Voltmeter state.
    pub fn dvm_enabled(&mut self) -> ScpiResult<bool> {
        self.inst.get_as(&dvm_enabled())
    }

    /// Enable or disable the voltmeter.
    pub fn set_dvm_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.inst.set(&dvm_enabled(), enabled)
    }

    /// Voltmeter source, `CHAN1` to `CHAN4`.
    pub fn dvm_source(&mut self) -> ScpiResult<String> {
        self.inst.get_as(&dvm_source())
    }

    /// Set the voltmeter source.
    pub fn set_dvm_source(&mut self, source: &str) -> ScpiResult<()> {
        self.inst.set(&dvm_source(), source)
    }

    /// Voltmeter mode, `ACRMS`, `DC` or `DCRMS`.
    pub fn dvm_mode(&mut self) -> ScpiResult<String> {
        self.inst.get_as(&dvm_mode())
    }

    /// Set the voltmeter mode.
    pub fn set_dvm_mode(&mut self, mode: &str) -> ScpiResult<()> {
        self.inst.set(&dvm_mode(), mode)
    }

    /// Capture the screen as `format` (`PNG`, `BMP`, `JPG`) and write the
    /// image to `path`. Returns the number of bytes written.
    pub fn save_screen(&mut self, path: impl AsRef<Path>, format: &str) -> ScpiResult<usize> {
        self.inst.write(&format!(":DISP:DATA? {}", format))?;
        let raw = self.inst.read_bytes(None, true)?;
        let block = parse_definite_block(&raw)?;
        let image = block.declared_payload();
        std::fs::write(path.as_ref(), image)?;
        info!(
            instrument = %self.inst.name(),
            path = %path.as_ref().display(),
            bytes = image.len(),
            "screen saved"
        );
        Ok(image.len())
    }
}

impl Driver for RigolDho800 {
    fn instrument(&mut self) -> &mut Instrument {
        &mut self.inst
    }
}

impl Scpi for RigolDho800 {
    /// Clear all waveforms on the screen (`:CLE`).
    fn clear(&mut self) -> ScpiResult<()> {
        self.inst.write(":CLE")
    }
}

/// One DHO800 analog channel.
#[derive(Debug)]
pub struct DhoChannel<'a> {
    ch: Channel<'a>,
}

impl DhoChannel<'_> {
    /// 20 MHz bandwidth limit, `20M` or `OFF`.
    pub fn bwlimit(&mut self) -> ScpiResult<String> {
        self.ch.get_as(&bwlimit())
    }

    /// Set the bandwidth limit.
    pub fn set_bwlimit(&mut self, limit: &str) -> ScpiResult<()> {
        self.ch.set(&bwlimit(), limit)
    }

    /// Coupling, `DC`, `AC` or `GND`.
    pub fn coupling(&mut self) -> ScpiResult<String> {
        self.ch.get_as(&coupling())
    }

    /// Set the coupling.
    pub fn set_coupling(&mut self, mode: &str) -> ScpiResult<()> {
        self.ch.set(&coupling(), mode)
    }

    /// Whether the channel is displayed.
    pub fn display(&mut self) -> ScpiResult<bool> {
        self.ch.get_as(&display())
    }

    /// Show or hide the channel.
    pub fn set_display(&mut self, shown: bool) -> ScpiResult<()> {
        self.ch.set(&display(), shown)
    }

    /// Vertical offset in volts.
    pub fn offset(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&offset())
    }

    /// Set the vertical offset.
    pub fn set_offset(&mut self, volts: f64) -> ScpiResult<()> {
        self.ch.set(&offset(), volts)
    }

    /// Whether the waveform is inverted.
    pub fn invert(&mut self) -> ScpiResult<bool> {
        self.ch.get_as(&invert())
    }

    /// Invert the waveform.
    pub fn set_invert(&mut self, inverted: bool) -> ScpiResult<()> {
        self.ch.set(&invert(), inverted)
    }

    /// Vertical scale in V/div.
    pub fn scale(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&scale())
    }

    /// Set the vertical scale, clamped to 500 uV to 10 V per division.
    pub fn set_scale(&mut self, volts: f64) -> ScpiResult<()> {
        self.ch.set(&scale(), volts)
    }

    /// Probe ratio.
    pub fn attenuation(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&attenuation())
    }

    /// Set the probe ratio, one of [`probe_ratios`].
    pub fn set_attenuation(&mut self, ratio: f64) -> ScpiResult<()> {
        self.ch.set(&attenuation(), ratio)
    }

    /// Whether the channel label is shown.
    pub fn label_enabled(&mut self) -> ScpiResult<bool> {
        self.ch.get_as(&label_enabled())
    }

    /// Show or hide the channel label.
    pub fn set_label_enabled(&mut self, shown: bool) -> ScpiResult<()> {
        self.ch.set(&label_enabled(), shown)
    }

    /// Channel label text.
    pub fn label(&mut self) -> ScpiResult<String> {
        self.ch.get_as(&label())
    }

    /// Set the channel label text.
    pub fn set_label(&mut self, text: &str) -> ScpiResult<()> {
        self.ch.set(&label(), text)
    }

    /// Whether fine vertical adjustment is on.
    pub fn vernier_enabled(&mut self) -> ScpiResult<bool> {
        self.ch.get_as(&vernier_enabled())
    }

    /// Enable fine vertical adjustment.
    pub fn set_vernier_enabled(&mut self, enabled: bool) -> ScpiResult<()> {
        self.ch.set(&vernier_enabled(), enabled)
    }

    /// Vertical position in volts.
    pub fn position(&mut self) -> ScpiResult<f64> {
        self.ch.get_as(&position())
    }

    /// Set the vertical position.
    pub fn set_position(&mut self, volts: f64) -> ScpiResult<()> {
        self.ch.set(&position(), volts)
    }
}
