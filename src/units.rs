//! # Units and Scaling
//!
//! Physical quantities, the units a driver may request for them, and the
//! conversion from the unit a VIF implies (`10^5 J`) to the unit a field is
//! published in (`GJ`).
//!
//! Every unit is stored as a magnitude relative to the base unit of its
//! quantity. Decimal magnitudes are `mantissa * 10^exp` with an exact
//! mantissa (`kWh = 3.6 * 10^6 J`), so a conversion multiplies by at most one
//! mantissa ratio and then applies a single power of ten. Data volumes use
//! binary magnitudes and convert by powers of two.

use crate::error::DecodeError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// What a value measures. Units only convert within one quantity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Quantity {
    Energy,
    Volume,
    Mass,
    Time,
    Power,
    Flow,
    MassFlow,
    Temperature,
    TemperatureDifference,
    Pressure,
    Voltage,
    Amperage,
    Hca,
    Counter,
    DataVolume,
}

impl Quantity {
    /// The unit values of this quantity are published in unless a driver
    /// asks for another.
    pub fn default_unit(self) -> Unit {
        match self {
            Quantity::Energy => Unit::KWh,
            Quantity::Volume => Unit::M3,
            Quantity::Mass => Unit::Kg,
            Quantity::Time => Unit::Hour,
            Quantity::Power => Unit::KW,
            Quantity::Flow => Unit::M3h,
            Quantity::MassFlow => Unit::Kgh,
            Quantity::Temperature => Unit::C,
            Quantity::TemperatureDifference => Unit::K,
            Quantity::Pressure => Unit::Bar,
            Quantity::Voltage => Unit::V,
            Quantity::Amperage => Unit::A,
            Quantity::Hca => Unit::Hca,
            Quantity::Counter => Unit::Counter,
            Quantity::DataVolume => Unit::Byte,
        }
    }
}

/// Units a field can be published in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Unit {
    // Energy (base J)
    Wh,
    KWh,
    MWh,
    GWh,
    J,
    KJ,
    MJ,
    GJ,
    // Volume (base m3)
    L,
    M3,
    // Mass (base kg)
    G,
    Kg,
    T,
    // Time (base s)
    Second,
    Minute,
    Hour,
    Day,
    // Power (base J/h)
    W,
    KW,
    MW,
    Jh,
    KJh,
    MJh,
    GJh,
    // Volume flow (base m3/h)
    Lh,
    M3h,
    M3min,
    M3s,
    // Mass flow (base kg/h)
    Kgh,
    // Temperatures
    C,
    K,
    // Pressure (base bar)
    Bar,
    Pa,
    // Electrical
    V,
    A,
    // Dimensionless
    Hca,
    Counter,
    // Data volume (base byte)
    Byte,
    KiB,
    MiB,
    GiB,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Magnitude {
    Decimal { mantissa: f64, exp: i32 },
    Binary(i32),
}

const fn dec(mantissa: f64, exp: i32) -> Magnitude {
    Magnitude::Decimal { mantissa, exp }
}

impl Unit {
    pub fn quantity(self) -> Quantity {
        use Unit::*;
        match self {
            Wh | KWh | MWh | GWh | J | KJ | MJ | GJ => Quantity::Energy,
            L | M3 => Quantity::Volume,
            G | Kg | T => Quantity::Mass,
            Second | Minute | Hour | Day => Quantity::Time,
            W | KW | MW | Jh | KJh | MJh | GJh => Quantity::Power,
            Lh | M3h | M3min | M3s => Quantity::Flow,
            Kgh => Quantity::MassFlow,
            C => Quantity::Temperature,
            K => Quantity::TemperatureDifference,
            Bar | Pa => Quantity::Pressure,
            V => Quantity::Voltage,
            A => Quantity::Amperage,
            Hca => Quantity::Hca,
            Counter => Quantity::Counter,
            Byte | KiB | MiB | GiB => Quantity::DataVolume,
        }
    }

    fn magnitude(self) -> Magnitude {
        use Unit::*;
        match self {
            J => dec(1.0, 0),
            KJ => dec(1.0, 3),
            MJ => dec(1.0, 6),
            GJ => dec(1.0, 9),
            Wh => dec(3.6, 3),
            KWh => dec(3.6, 6),
            MWh => dec(3.6, 9),
            GWh => dec(3.6, 12),
            L => dec(1.0, -3),
            M3 => dec(1.0, 0),
            G => dec(1.0, -3),
            Kg => dec(1.0, 0),
            T => dec(1.0, 3),
            Second => dec(1.0, 0),
            Minute => dec(6.0, 1),
            Hour => dec(3.6, 3),
            Day => dec(8.64, 4),
            Jh => dec(1.0, 0),
            KJh => dec(1.0, 3),
            MJh => dec(1.0, 6),
            GJh => dec(1.0, 9),
            W => dec(3.6, 3),
            KW => dec(3.6, 6),
            MW => dec(3.6, 9),
            Lh => dec(1.0, -3),
            M3h => dec(1.0, 0),
            M3min => dec(6.0, 1),
            M3s => dec(3.6, 3),
            Kgh => dec(1.0, 0),
            C | K | V | A | Hca | Counter => dec(1.0, 0),
            Bar => dec(1.0, 0),
            Pa => dec(1.0, -5),
            Byte => Magnitude::Binary(0),
            KiB => Magnitude::Binary(10),
            MiB => Magnitude::Binary(20),
            GiB => Magnitude::Binary(30),
        }
    }

    /// Lowercase suffix appended to numeric field names in flat JSON output.
    pub fn suffix(self) -> &'static str {
        use Unit::*;
        match self {
            Wh => "wh",
            KWh => "kwh",
            MWh => "mwh",
            GWh => "gwh",
            J => "j",
            KJ => "kj",
            MJ => "mj",
            GJ => "gj",
            L => "l",
            M3 => "m3",
            G => "g",
            Kg => "kg",
            T => "t",
            Second => "s",
            Minute => "min",
            Hour => "h",
            Day => "d",
            W => "w",
            KW => "kw",
            MW => "mw",
            Jh => "jh",
            KJh => "kjh",
            MJh => "mjh",
            GJh => "gjh",
            Lh => "lh",
            M3h => "m3h",
            M3min => "m3min",
            M3s => "m3s",
            Kgh => "kgh",
            C => "c",
            K => "k",
            Bar => "bar",
            Pa => "pa",
            V => "v",
            A => "a",
            Hca => "hca",
            Counter => "counter",
            Byte => "b",
            KiB => "kib",
            MiB => "mib",
            GiB => "gib",
        }
    }

    /// Human readable symbol.
    pub fn symbol(self) -> &'static str {
        use Unit::*;
        match self {
            Wh => "Wh",
            KWh => "kWh",
            MWh => "MWh",
            GWh => "GWh",
            J => "J",
            KJ => "kJ",
            MJ => "MJ",
            GJ => "GJ",
            L => "l",
            M3 => "m³",
            G => "g",
            Kg => "kg",
            T => "t",
            Second => "s",
            Minute => "min",
            Hour => "h",
            Day => "d",
            W => "W",
            KW => "kW",
            MW => "MW",
            Jh => "J/h",
            KJh => "kJ/h",
            MJh => "MJ/h",
            GJh => "GJ/h",
            Lh => "l/h",
            M3h => "m³/h",
            M3min => "m³/min",
            M3s => "m³/s",
            Kgh => "kg/h",
            C => "°C",
            K => "K",
            Bar => "bar",
            Pa => "Pa",
            V => "V",
            A => "A",
            Hca => "hca",
            Counter => "counter",
            Byte => "B",
            KiB => "KiB",
            MiB => "MiB",
            GiB => "GiB",
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// The unit a value type descriptor implies: `raw * 10^exponent unit`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ImpliedUnit {
    pub unit: Unit,
    pub exponent: i32,
}

impl ImpliedUnit {
    pub const fn new(unit: Unit, exponent: i32) -> Self {
        Self { unit, exponent }
    }

    /// Shift the exponent, used for multiplicative correction VIFEs.
    pub fn with_extra_exponent(self, extra: i32) -> Self {
        Self {
            unit: self.unit,
            exponent: self.exponent + extra,
        }
    }
}

impl fmt::Display for ImpliedUnit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.exponent == 0 {
            write!(f, "{}", self.unit)
        } else {
            write!(f, "10^{} {}", self.exponent, self.unit)
        }
    }
}

/// Scale a raw value with an implied unit into the requested unit.
pub fn scale(raw: f64, implied: ImpliedUnit, requested: Unit) -> Result<f64, DecodeError> {
    convert_scaled(raw, implied.unit, implied.exponent, requested)
}

/// Convert a value between two units of the same quantity.
pub fn convert(value: f64, from: Unit, to: Unit) -> Result<f64, DecodeError> {
    convert_scaled(value, from, 0, to)
}

/// Check that two units measure the same quantity.
pub fn check_compatible(from: Unit, to: Unit) -> Result<(), DecodeError> {
    if from.quantity() == to.quantity() {
        Ok(())
    } else {
        Err(DecodeError::IncompatibleUnit { from, to })
    }
}

fn convert_scaled(value: f64, from: Unit, exponent: i32, to: Unit) -> Result<f64, DecodeError> {
    check_compatible(from, to)?;

    match (from.magnitude(), to.magnitude()) {
        (
            Magnitude::Decimal {
                mantissa: m_from,
                exp: e_from,
            },
            Magnitude::Decimal {
                mantissa: m_to,
                exp: e_to,
            },
        ) => {
            let mut v = value;
            if m_from != m_to {
                v = v * m_from / m_to;
            }
            Ok(apply_pow10(v, exponent + e_from - e_to))
        }
        (Magnitude::Binary(b_from), Magnitude::Binary(b_to)) => {
            Ok(apply_pow10(value * 2f64.powi(b_from - b_to), exponent))
        }
        _ => Err(DecodeError::IncompatibleUnit { from, to }),
    }
}

// Divide for negative exponents; 10^k is exact for small k, 10^-k is not.
fn apply_pow10(value: f64, k: i32) -> f64 {
    match k {
        0 => value,
        k if k > 0 => value * 10f64.powi(k),
        k => value / 10f64.powi(-k),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_energy_scaling_to_gj() {
        // 3900 * 10^5 J
        let implied = ImpliedUnit::new(Unit::J, 5);
        assert_eq!(scale(3900.0, implied, Unit::GJ).unwrap(), 0.39);
    }

    #[test]
    fn test_wh_to_kwh() {
        let implied = ImpliedUnit::new(Unit::Wh, 2);
        assert_eq!(scale(3904.0, implied, Unit::KWh).unwrap(), 390.4);
    }

    #[test]
    fn test_gj_to_kwh() {
        let kwh = convert(1.0, Unit::GJ, Unit::KWh).unwrap();
        assert!((kwh - 277.777_777_777_777_8).abs() < 1e-9);
    }

    #[test]
    fn test_volume_litres() {
        let implied = ImpliedUnit::new(Unit::M3, -3);
        assert_eq!(scale(1234.0, implied, Unit::M3).unwrap(), 1.234);
        assert_eq!(scale(1234.0, implied, Unit::L).unwrap(), 1234.0);
    }

    #[test]
    fn test_binary_data_volume() {
        assert_eq!(convert(3.0, Unit::MiB, Unit::KiB).unwrap(), 3072.0);
        assert_eq!(convert(2048.0, Unit::Byte, Unit::KiB).unwrap(), 2.0);
    }

    #[test]
    fn test_incompatible_units() {
        let implied = ImpliedUnit::new(Unit::J, 5);
        let err = scale(1.0, implied, Unit::M3).unwrap_err();
        assert_eq!(
            err,
            DecodeError::IncompatibleUnit {
                from: Unit::J,
                to: Unit::M3
            }
        );
    }

    #[test]
    fn test_default_units_match_quantity() {
        for quantity in [Quantity::Energy, Quantity::Flow, Quantity::DataVolume, Quantity::Time] {
            assert_eq!(quantity.default_unit().quantity(), quantity);
        }
    }

    #[test]
    fn test_implied_unit_display() {
        assert_eq!(ImpliedUnit::new(Unit::J, 5).to_string(), "10^5 J");
        assert_eq!(ImpliedUnit::new(Unit::C, 0).to_string(), "°C");
    }

    fn energy_units() -> impl Strategy<Value = Unit> {
        prop_oneof![
            Just(Unit::Wh),
            Just(Unit::KWh),
            Just(Unit::MWh),
            Just(Unit::J),
            Just(Unit::KJ),
            Just(Unit::MJ),
            Just(Unit::GJ),
        ]
    }

    proptest! {
        #[test]
        fn prop_energy_round_trip(value in 0u32..100_000_000u32, a in energy_units(), b in energy_units()) {
            let value = value as f64 / 10.0;
            let there = convert(value, a, b).unwrap();
            let back = convert(there, b, a).unwrap();
            let tolerance = (value.abs() * 1e-12).max(1e-12);
            prop_assert!((back - value).abs() <= tolerance, "{} -> {} -> {}", value, there, back);
        }
    }
}
