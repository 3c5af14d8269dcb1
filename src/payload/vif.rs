//! VIF/VIFE classification
//!
//! Maps a value information block (VIF plus VIFEs) onto the value-type range
//! a driver matches against, and onto the unit and decimal exponent the
//! block implies, as defined in EN 13757-3 (primary table and the 0xFB/0xFD
//! extension tables).

use crate::constants::{MBUS_VIF_EXTENSION_TABLE_FB, MBUS_VIF_EXTENSION_TABLE_FD};
use crate::units::{ImpliedUnit, Quantity, Unit};
use serde::{Deserialize, Serialize};

/// Physical-quantity category of a value information block.
///
/// `AnyEnergy`, `AnyVolume` and `AnyPower` are composites for matching only;
/// a record always classifies into one of the concrete ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum VifRange {
    EnergyWh,
    EnergyJ,
    EnergyMWh,
    EnergyGJ,
    Volume,
    VolumeFb,
    Mass,
    OnTime,
    OperatingTime,
    PowerW,
    PowerJh,
    PowerMW,
    PowerGJh,
    VolumeFlow,
    VolumeFlowExt,
    VolumeFlowExtSec,
    MassFlow,
    FlowTemperature,
    ReturnTemperature,
    TemperatureDifference,
    ExternalTemperature,
    Pressure,
    Date,
    DateTime,
    HeatCostAllocation,
    AveragingDuration,
    ActualityDuration,
    FabricationNo,
    EnhancedIdentification,
    BusAddress,
    AccessNumber,
    Medium,
    Manufacturer,
    ParameterSet,
    ModelVersion,
    HardwareVersion,
    FirmwareVersion,
    SoftwareVersion,
    Customer,
    ErrorFlags,
    DigitalOutput,
    DigitalInput,
    DurationSinceReadout,
    Voltage,
    Amperage,
    ResetCounter,
    CumulationCounter,
    RemainingBattery,
    AnyEnergy,
    AnyVolume,
    AnyPower,
}

impl VifRange {
    /// Whether a record classified as `concrete` satisfies this range.
    pub fn contains(self, concrete: VifRange) -> bool {
        use VifRange::*;
        match self {
            AnyEnergy => matches!(concrete, EnergyWh | EnergyJ | EnergyMWh | EnergyGJ),
            AnyVolume => matches!(concrete, Volume | VolumeFb),
            AnyPower => matches!(concrete, PowerW | PowerJh | PowerMW | PowerGJh),
            range => range == concrete,
        }
    }

    /// The quantity values of this range measure, if they are numeric.
    pub fn quantity(self) -> Option<Quantity> {
        use VifRange::*;
        match self {
            EnergyWh | EnergyJ | EnergyMWh | EnergyGJ | AnyEnergy => Some(Quantity::Energy),
            Volume | VolumeFb | AnyVolume => Some(Quantity::Volume),
            Mass => Some(Quantity::Mass),
            OnTime | OperatingTime | AveragingDuration | ActualityDuration
            | DurationSinceReadout | RemainingBattery => Some(Quantity::Time),
            PowerW | PowerJh | PowerMW | PowerGJh | AnyPower => Some(Quantity::Power),
            VolumeFlow | VolumeFlowExt | VolumeFlowExtSec => Some(Quantity::Flow),
            MassFlow => Some(Quantity::MassFlow),
            FlowTemperature | ReturnTemperature | ExternalTemperature => {
                Some(Quantity::Temperature)
            }
            TemperatureDifference => Some(Quantity::TemperatureDifference),
            Pressure => Some(Quantity::Pressure),
            HeatCostAllocation => Some(Quantity::Hca),
            AccessNumber | ResetCounter | CumulationCounter => Some(Quantity::Counter),
            Voltage => Some(Quantity::Voltage),
            Amperage => Some(Quantity::Amperage),
            Date | DateTime | FabricationNo | EnhancedIdentification | BusAddress | Medium
            | Manufacturer | ParameterSet | ModelVersion | HardwareVersion | FirmwareVersion
            | SoftwareVersion | Customer | ErrorFlags | DigitalOutput | DigitalInput => None,
        }
    }
}

/// Classifies a VIF and its extensions into a concrete range.
pub fn classify(vif: u8, vifes: &[u8]) -> Option<VifRange> {
    match vif {
        MBUS_VIF_EXTENSION_TABLE_FB => vifes.first().and_then(|e| classify_fb(e & 0x7F)),
        MBUS_VIF_EXTENSION_TABLE_FD => vifes.first().and_then(|e| classify_fd(e & 0x7F)),
        _ => classify_primary(vif & 0x7F),
    }
}

fn classify_primary(code: u8) -> Option<VifRange> {
    use VifRange::*;
    Some(match code {
        0x00..=0x07 => EnergyWh,
        0x08..=0x0F => EnergyJ,
        0x10..=0x17 => Volume,
        0x18..=0x1F => Mass,
        0x20..=0x23 => OnTime,
        0x24..=0x27 => OperatingTime,
        0x28..=0x2F => PowerW,
        0x30..=0x37 => PowerJh,
        0x38..=0x3F => VolumeFlow,
        0x40..=0x47 => VolumeFlowExt,
        0x48..=0x4F => VolumeFlowExtSec,
        0x50..=0x57 => MassFlow,
        0x58..=0x5B => FlowTemperature,
        0x5C..=0x5F => ReturnTemperature,
        0x60..=0x63 => TemperatureDifference,
        0x64..=0x67 => ExternalTemperature,
        0x68..=0x6B => Pressure,
        0x6C => Date,
        0x6D => DateTime,
        0x6E => HeatCostAllocation,
        0x70..=0x73 => AveragingDuration,
        0x74..=0x77 => ActualityDuration,
        0x78 => FabricationNo,
        0x79 => EnhancedIdentification,
        0x7A => BusAddress,
        _ => return None,
    })
}

fn classify_fb(code: u8) -> Option<VifRange> {
    use VifRange::*;
    Some(match code {
        0x00..=0x01 => EnergyMWh,
        0x08..=0x09 => EnergyGJ,
        0x10..=0x11 => VolumeFb,
        0x28..=0x29 => PowerMW,
        0x30..=0x31 => PowerGJh,
        _ => return None,
    })
}

fn classify_fd(code: u8) -> Option<VifRange> {
    use VifRange::*;
    Some(match code {
        0x08 => AccessNumber,
        0x09 => Medium,
        0x0A => Manufacturer,
        0x0B => ParameterSet,
        0x0C => ModelVersion,
        0x0D => HardwareVersion,
        0x0E => FirmwareVersion,
        0x0F => SoftwareVersion,
        0x11 => Customer,
        0x17 => ErrorFlags,
        0x1A => DigitalOutput,
        0x1B => DigitalInput,
        0x2C..=0x2F => DurationSinceReadout,
        0x40..=0x4F => Voltage,
        0x50..=0x5F => Amperage,
        0x60 => ResetCounter,
        0x61 => CumulationCounter,
        0x74 => RemainingBattery,
        _ => return None,
    })
}

fn time_unit(nn: u8) -> Unit {
    match nn & 0x03 {
        0 => Unit::Second,
        1 => Unit::Minute,
        2 => Unit::Hour,
        _ => Unit::Day,
    }
}

/// The unit and exponent a VIF block implies, including multiplicative
/// correction VIFEs. `None` for ranges that carry no unit (dates, ids, flags).
pub fn implied_unit(vif: u8, vifes: &[u8]) -> Option<ImpliedUnit> {
    let range = classify(vif, vifes)?;
    let table_code = match vif {
        MBUS_VIF_EXTENSION_TABLE_FB | MBUS_VIF_EXTENSION_TABLE_FD => vifes.first()? & 0x7F,
        _ => vif & 0x7F,
    };
    let n = i32::from(table_code & 0x07);
    let nn = i32::from(table_code & 0x03);
    let low_bit = i32::from(table_code & 0x01);

    use VifRange::*;
    let base = match range {
        EnergyWh => ImpliedUnit::new(Unit::Wh, n - 3),
        EnergyJ => ImpliedUnit::new(Unit::J, n),
        Volume => ImpliedUnit::new(Unit::M3, n - 6),
        Mass => ImpliedUnit::new(Unit::Kg, n - 3),
        OnTime | OperatingTime | AveragingDuration | ActualityDuration | DurationSinceReadout => {
            ImpliedUnit::new(time_unit(table_code), 0)
        }
        PowerW => ImpliedUnit::new(Unit::W, n - 3),
        PowerJh => ImpliedUnit::new(Unit::Jh, n),
        VolumeFlow => ImpliedUnit::new(Unit::M3h, n - 6),
        VolumeFlowExt => ImpliedUnit::new(Unit::M3min, n - 7),
        VolumeFlowExtSec => ImpliedUnit::new(Unit::M3s, n - 9),
        MassFlow => ImpliedUnit::new(Unit::Kgh, n - 3),
        FlowTemperature | ReturnTemperature | ExternalTemperature => {
            ImpliedUnit::new(Unit::C, nn - 3)
        }
        TemperatureDifference => ImpliedUnit::new(Unit::K, nn - 3),
        Pressure => ImpliedUnit::new(Unit::Bar, nn - 3),
        HeatCostAllocation => ImpliedUnit::new(Unit::Hca, 0),
        AccessNumber | ResetCounter | CumulationCounter => ImpliedUnit::new(Unit::Counter, 0),
        Voltage => ImpliedUnit::new(Unit::V, i32::from(table_code & 0x0F) - 9),
        Amperage => ImpliedUnit::new(Unit::A, i32::from(table_code & 0x0F) - 12),
        RemainingBattery => ImpliedUnit::new(Unit::Day, 0),
        EnergyMWh => ImpliedUnit::new(Unit::MWh, low_bit - 1),
        EnergyGJ => ImpliedUnit::new(Unit::GJ, low_bit - 1),
        VolumeFb => ImpliedUnit::new(Unit::M3, low_bit + 2),
        PowerMW => ImpliedUnit::new(Unit::MW, low_bit - 1),
        PowerGJh => ImpliedUnit::new(Unit::GJh, low_bit - 1),
        _ => return None,
    };

    Some(base.with_extra_exponent(correction_exponent(vif, vifes)))
}

/// Exponent shift from combinable VIFEs: 0x70-0x77 is `10^(nnn-6)`, 0x7D is `10^3`.
pub fn correction_exponent(vif: u8, vifes: &[u8]) -> i32 {
    let combinables = match vif {
        MBUS_VIF_EXTENSION_TABLE_FB | MBUS_VIF_EXTENSION_TABLE_FD => vifes.get(1..).unwrap_or(&[]),
        _ => vifes,
    };

    combinables
        .iter()
        .map(|e| match e & 0x7F {
            code @ 0x70..=0x77 => i32::from(code & 0x07) - 6,
            0x7D => 3,
            _ => 0,
        })
        .sum()
}
