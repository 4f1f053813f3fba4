//! Properties a calculator can be asked to produce.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::BitOr;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Property {
    Energy,
    Gradients,
    Hessian,
    AtomicCharges,
    AoToAtomMapping,
    DensityMatrix,
    OverlapMatrix,
    ElectronicOccupation,
    BondOrderMatrix,
    Thermochemistry,
    SuccessfulCalculation,
    ProgramName,
}

impl Property {
    pub const ALL: [Property; 12] = [
        Property::Energy,
        Property::Gradients,
        Property::Hessian,
        Property::AtomicCharges,
        Property::AoToAtomMapping,
        Property::DensityMatrix,
        Property::OverlapMatrix,
        Property::ElectronicOccupation,
        Property::BondOrderMatrix,
        Property::Thermochemistry,
        Property::SuccessfulCalculation,
        Property::ProgramName,
    ];

    fn bit(self) -> u32 {
        1 << (self as u32)
    }

    pub fn name(self) -> &'static str {
        match self {
            Property::Energy => "energy",
            Property::Gradients => "gradients",
            Property::Hessian => "hessian",
            Property::AtomicCharges => "atomic_charges",
            Property::AoToAtomMapping => "ao_to_atom_mapping",
            Property::DensityMatrix => "density_matrix",
            Property::OverlapMatrix => "overlap_matrix",
            Property::ElectronicOccupation => "electronic_occupation",
            Property::BondOrderMatrix => "bond_order_matrix",
            Property::Thermochemistry => "thermochemistry",
            Property::SuccessfulCalculation => "successful_calculation",
            Property::ProgramName => "program_name",
        }
    }
}

impl fmt::Display for Property {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Property {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = s.trim().to_lowercase().replace(['-', ' '], "_");
        Property::ALL
            .iter()
            .copied()
            .find(|p| p.name() == key)
            .ok_or_else(|| format!("unknown property '{s}'"))
    }
}

/// A set of [`Property`] values stored as a bitset.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct PropertyList(u32);

impl PropertyList {
    pub fn empty() -> Self {
        Self(0)
    }

    pub fn from_properties(properties: &[Property]) -> Self {
        properties.iter().fold(Self::empty(), |list, p| list | *p)
    }

    pub fn insert(&mut self, property: Property) {
        self.0 |= property.bit();
    }

    pub fn contains(&self, property: Property) -> bool {
        self.0 & property.bit() != 0
    }

    /// True if every property in `other` is also in `self`.
    pub fn contains_subset(&self, other: PropertyList) -> bool {
        self.0 & other.0 == other.0
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }

    pub fn iter(&self) -> impl Iterator<Item = Property> + '_ {
        Property::ALL.iter().copied().filter(|p| self.contains(*p))
    }

    /// Properties in `self` that are missing from `available`.
    pub fn missing_from(&self, available: PropertyList) -> Vec<Property> {
        self.iter().filter(|p| !available.contains(*p)).collect()
    }
}

impl From<Property> for PropertyList {
    fn from(property: Property) -> Self {
        Self(property.bit())
    }
}

impl BitOr for Property {
    type Output = PropertyList;

    fn bitor(self, rhs: Property) -> PropertyList {
        PropertyList(self.bit() | rhs.bit())
    }
}

impl BitOr<Property> for PropertyList {
    type Output = PropertyList;

    fn bitor(self, rhs: Property) -> PropertyList {
        PropertyList(self.0 | rhs.bit())
    }
}

impl BitOr for PropertyList {
    type Output = PropertyList;

    fn bitor(self, rhs: PropertyList) -> PropertyList {
        PropertyList(self.0 | rhs.0)
    }
}

impl fmt::Display for PropertyList {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let names: Vec<&str> = self.iter().map(Property::name).collect();
        write!(f, "[{}]", names.join(", "))
    }
}
