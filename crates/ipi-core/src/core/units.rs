//! Fixed SI conversion factors and the pure conversions built on them.
//!
//! Every factor maps one unit of its kind into SI base units, so converting a value
//! into SI is a multiplication and converting out of SI is a division. The table is
//! built at compile time and is shared read-only by every driver instance.

use phf::{Map, phf_map};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Bohr radius in meters.
pub const BOHR: f64 = 5.291772108e-11;
/// Angstrom in meters.
pub const ANGSTROM: f64 = 1e-10;
/// Atomic mass unit in kilograms.
pub const AMU: f64 = 1.660539040e-27;
/// Femtosecond in seconds.
pub const FEMTOSECOND: f64 = 1e-15;
/// Picosecond in seconds.
pub const PICOSECOND: f64 = 1e-12;
/// Hartree in joules.
pub const HARTREE: f64 = 4.35974417e-18;
/// Electronvolt in joules.
pub const ELECTRONVOLT: f64 = 1.6021766209e-19;
/// Planck constant in joule seconds.
pub const PLANCK: f64 = 6.626069934e-34;
/// Boltzmann constant in joules per kelvin.
pub const BOLTZMANN: f64 = 1.38064852e-23;
/// Avogadro's number, per mole.
pub const AVOGADRO: f64 = 6.02214129e23;
/// Kilojoule in joules.
pub const KILOJOULE: f64 = 1000.0;
/// Thermochemical kilocalorie in joules.
pub const KILOCALORIE: f64 = 4184.0;

/// The physical dimension a [`Unit`] measures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Dimension {
    Length,
    Mass,
    Time,
    Energy,
    /// Energy times time (J·s).
    Action,
    /// Energy per temperature (J/K).
    Entropy,
    /// Count per amount of substance (1/mol).
    InverseAmount,
}

impl Dimension {
    /// Symbol of the SI unit this dimension is stored in.
    pub const fn si_symbol(self) -> &'static str {
        match self {
            Dimension::Length => "m",
            Dimension::Mass => "kg",
            Dimension::Time => "s",
            Dimension::Energy => "J",
            Dimension::Action => "J s",
            Dimension::Entropy => "J/K",
            Dimension::InverseAmount => "1/mol",
        }
    }
}

impl fmt::Display for Dimension {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Dimension::Length => "length",
            Dimension::Mass => "mass",
            Dimension::Time => "time",
            Dimension::Energy => "energy",
            Dimension::Action => "action",
            Dimension::Entropy => "entropy",
            Dimension::InverseAmount => "inverse amount",
        };
        f.write_str(name)
    }
}

/// A named unit with a fixed factor into SI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Unit {
    Meter,
    Bohr,
    Angstrom,
    Kilogram,
    AtomicMassUnit,
    Second,
    Femtosecond,
    Picosecond,
    Joule,
    Hartree,
    Electronvolt,
    Kilojoule,
    Kilocalorie,
    KilojoulePerMole,
    KilocaloriePerMole,
    Planck,
    Boltzmann,
    Avogadro,
}

static UNIT_NAMES: Map<&'static str, Unit> = phf_map! {
    "m" => Unit::Meter, "meter" => Unit::Meter, "metre" => Unit::Meter,
    "bohr" => Unit::Bohr, "a0" => Unit::Bohr,
    "angstrom" => Unit::Angstrom, "ang" => Unit::Angstrom, "å" => Unit::Angstrom,
    "kg" => Unit::Kilogram, "kilogram" => Unit::Kilogram,
    "amu" => Unit::AtomicMassUnit, "dalton" => Unit::AtomicMassUnit, "da" => Unit::AtomicMassUnit,
    "s" => Unit::Second, "second" => Unit::Second,
    "fs" => Unit::Femtosecond, "femtosecond" => Unit::Femtosecond,
    "ps" => Unit::Picosecond, "picosecond" => Unit::Picosecond,
    "j" => Unit::Joule, "joule" => Unit::Joule,
    "hartree" => Unit::Hartree, "ha" => Unit::Hartree, "eh" => Unit::Hartree,
    "ev" => Unit::Electronvolt, "electronvolt" => Unit::Electronvolt,
    "kj" => Unit::Kilojoule, "kilojoule" => Unit::Kilojoule,
    "kcal" => Unit::Kilocalorie, "kilocalorie" => Unit::Kilocalorie,
    "kj/mol" => Unit::KilojoulePerMole,
    "kcal/mol" => Unit::KilocaloriePerMole,
    "planck" => Unit::Planck, "h" => Unit::Planck,
    "boltzmann" => Unit::Boltzmann, "kb" => Unit::Boltzmann,
    "avogadro" => Unit::Avogadro, "na" => Unit::Avogadro, "mole" => Unit::Avogadro,
};

impl Unit {
    pub const COUNT: usize = 18;

    pub const ALL: [Unit; Unit::COUNT] = [
        Unit::Meter,
        Unit::Bohr,
        Unit::Angstrom,
        Unit::Kilogram,
        Unit::AtomicMassUnit,
        Unit::Second,
        Unit::Femtosecond,
        Unit::Picosecond,
        Unit::Joule,
        Unit::Hartree,
        Unit::Electronvolt,
        Unit::Kilojoule,
        Unit::Kilocalorie,
        Unit::KilojoulePerMole,
        Unit::KilocaloriePerMole,
        Unit::Planck,
        Unit::Boltzmann,
        Unit::Avogadro,
    ];

    /// Canonical lowercase name, accepted by [`FromStr`].
    pub const fn name(self) -> &'static str {
        match self {
            Unit::Meter => "meter",
            Unit::Bohr => "bohr",
            Unit::Angstrom => "angstrom",
            Unit::Kilogram => "kilogram",
            Unit::AtomicMassUnit => "amu",
            Unit::Second => "second",
            Unit::Femtosecond => "femtosecond",
            Unit::Picosecond => "picosecond",
            Unit::Joule => "joule",
            Unit::Hartree => "hartree",
            Unit::Electronvolt => "ev",
            Unit::Kilojoule => "kj",
            Unit::Kilocalorie => "kcal",
            Unit::KilojoulePerMole => "kj/mol",
            Unit::KilocaloriePerMole => "kcal/mol",
            Unit::Planck => "planck",
            Unit::Boltzmann => "boltzmann",
            Unit::Avogadro => "avogadro",
        }
    }

    pub const fn dimension(self) -> Dimension {
        match self {
            Unit::Meter | Unit::Bohr | Unit::Angstrom => Dimension::Length,
            Unit::Kilogram | Unit::AtomicMassUnit => Dimension::Mass,
            Unit::Second | Unit::Femtosecond | Unit::Picosecond => Dimension::Time,
            Unit::Joule
            | Unit::Hartree
            | Unit::Electronvolt
            | Unit::Kilojoule
            | Unit::Kilocalorie
            | Unit::KilojoulePerMole
            | Unit::KilocaloriePerMole => Dimension::Energy,
            Unit::Planck => Dimension::Action,
            Unit::Boltzmann => Dimension::Entropy,
            Unit::Avogadro => Dimension::InverseAmount,
        }
    }

    const fn si_factor(self) -> f64 {
        match self {
            Unit::Meter | Unit::Kilogram | Unit::Second | Unit::Joule => 1.0,
            Unit::Bohr => BOHR,
            Unit::Angstrom => ANGSTROM,
            Unit::AtomicMassUnit => AMU,
            Unit::Femtosecond => FEMTOSECOND,
            Unit::Picosecond => PICOSECOND,
            Unit::Hartree => HARTREE,
            Unit::Electronvolt => ELECTRONVOLT,
            Unit::Kilojoule => KILOJOULE,
            Unit::Kilocalorie => KILOCALORIE,
            Unit::KilojoulePerMole => KILOJOULE / AVOGADRO,
            Unit::KilocaloriePerMole => KILOCALORIE / AVOGADRO,
            Unit::Planck => PLANCK,
            Unit::Boltzmann => BOLTZMANN,
            Unit::Avogadro => AVOGADRO,
        }
    }
}

impl fmt::Display for Unit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Unit {
    type Err = UnitError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase();
        UNIT_NAMES
            .get(key.as_str())
            .copied()
            .ok_or_else(|| UnitError::Unknown(s.trim().to_string()))
    }
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum UnitError {
    #[error("Unknown unit: '{0}'")]
    Unknown(String),

    #[error("Unit '{unit}' measures {found}, expected {expected}")]
    DimensionMismatch {
        unit: Unit,
        expected: Dimension,
        found: Dimension,
    },
}

/// Immutable mapping from [`Unit`] to its multiplicative factor into SI.
#[derive(Debug, Clone, PartialEq)]
pub struct ConversionTable {
    factors: [f64; Unit::COUNT],
}

/// The process-wide table. Never mutated.
pub static STANDARD: ConversionTable = ConversionTable::standard();

impl ConversionTable {
    pub const fn standard() -> Self {
        let mut factors = [0.0; Unit::COUNT];
        let mut i = 0;
        while i < Unit::COUNT {
            factors[Unit::ALL[i] as usize] = Unit::ALL[i].si_factor();
            i += 1;
        }
        Self { factors }
    }

    #[inline]
    pub fn factor(&self, unit: Unit) -> f64 {
        self.factors[unit as usize]
    }

    #[inline]
    pub fn to_si(&self, value: f64, unit: Unit) -> f64 {
        value * self.factor(unit)
    }

    #[inline]
    pub fn from_si(&self, value_si: f64, unit: Unit) -> f64 {
        value_si / self.factor(unit)
    }

    /// Looks a unit up by name or alias (case-insensitive).
    pub fn resolve(&self, name: &str) -> Result<Unit, UnitError> {
        name.parse()
    }

    /// Looks a unit up by name and checks that it measures `expected`.
    pub fn resolve_as(&self, name: &str, expected: Dimension) -> Result<Unit, UnitError> {
        let unit = self.resolve(name)?;
        if unit.dimension() != expected {
            return Err(UnitError::DimensionMismatch {
                unit,
                expected,
                found: unit.dimension(),
            });
        }
        Ok(unit)
    }

    pub fn convert(&self, value: f64, from: Unit, to: Unit) -> Result<f64, UnitError> {
        if from.dimension() != to.dimension() {
            return Err(UnitError::DimensionMismatch {
                unit: to,
                expected: from.dimension(),
                found: to.dimension(),
            });
        }
        Ok(self.from_si(self.to_si(value, from), to))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Unit, f64)> + '_ {
        Unit::ALL.iter().map(|&unit| (unit, self.factor(unit)))
    }
}

impl Default for ConversionTable {
    fn default() -> Self {
        Self::standard()
    }
}

#[inline]
pub fn to_si(value: f64, unit: Unit) -> f64 {
    STANDARD.to_si(value, unit)
}

#[inline]
pub fn from_si(value_si: f64, unit: Unit) -> f64 {
    STANDARD.from_si(value_si, unit)
}

/// The unit convention agreed with the server for every binary payload field.
///
/// Forces travel in `energy / length`, the virial in `energy`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireUnits {
    pub length: Unit,
    pub energy: Unit,
}

impl WireUnits {
    /// Atomic units (Bohr, Hartree), the i-PI convention.
    pub const fn atomic() -> Self {
        Self {
            length: Unit::Bohr,
            energy: Unit::Hartree,
        }
    }

    pub const fn si() -> Self {
        Self {
            length: Unit::Meter,
            energy: Unit::Joule,
        }
    }

    pub fn from_names(length: &str, energy: &str) -> Result<Self, UnitError> {
        Ok(Self {
            length: STANDARD.resolve_as(length, Dimension::Length)?,
            energy: STANDARD.resolve_as(energy, Dimension::Energy)?,
        })
    }

    #[inline]
    pub fn length_factor(&self) -> f64 {
        STANDARD.factor(self.length)
    }

    #[inline]
    pub fn energy_factor(&self) -> f64 {
        STANDARD.factor(self.energy)
    }

    #[inline]
    pub fn force_factor(&self) -> f64 {
        self.energy_factor() / self.length_factor()
    }
}

impl Default for WireUnits {
    fn default() -> Self {
        Self::atomic()
    }
}

impl fmt::Display for WireUnits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.length, self.energy)
    }
}
