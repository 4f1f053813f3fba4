//! Molecular structures handed to calculators.

use crate::error::{CoreError, Result};
use nalgebra::Vector3;
use periodic_table_on_an_enum::Element;

/// Conversion factor from Angstrom to Bohr.
pub const ANGSTROM_TO_BOHR: f64 = 1.889_726_124_625_770_2;

/// Elements and Cartesian positions (in Bohr) of a molecular system.
#[derive(Debug, Clone, PartialEq)]
pub struct AtomCollection {
    elements: Vec<Element>,
    positions: Vec<Vector3<f64>>,
}

impl AtomCollection {
    pub fn new(elements: Vec<Element>, positions: Vec<Vector3<f64>>) -> Result<Self> {
        if elements.len() != positions.len() {
            return Err(CoreError::StructureMismatch {
                elements: elements.len(),
                positions: positions.len(),
            });
        }
        Ok(Self {
            elements,
            positions,
        })
    }

    /// Build a structure from element symbols and positions in Bohr.
    pub fn from_symbols(symbols: &[&str], positions: Vec<Vector3<f64>>) -> Result<Self> {
        let elements = symbols
            .iter()
            .map(|symbol| parse_element(symbol))
            .collect::<Result<Vec<_>>>()?;
        Self::new(elements, positions)
    }

    /// Build a structure from element symbols and positions in Angstrom.
    pub fn from_angstrom(symbols: &[&str], positions: &[[f64; 3]]) -> Result<Self> {
        let positions = positions
            .iter()
            .map(|p| Vector3::new(p[0], p[1], p[2]) * ANGSTROM_TO_BOHR)
            .collect();
        Self::from_symbols(symbols, positions)
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn elements(&self) -> &[Element] {
        &self.elements
    }

    pub fn positions(&self) -> &[Vector3<f64>] {
        &self.positions
    }

    pub fn symbols(&self) -> Vec<String> {
        self.elements
            .iter()
            .map(|e| e.get_symbol().to_string())
            .collect()
    }

    pub fn set_positions(&mut self, positions: Vec<Vector3<f64>>) -> Result<()> {
        if positions.len() != self.elements.len() {
            return Err(CoreError::StructureMismatch {
                elements: self.elements.len(),
                positions: positions.len(),
            });
        }
        self.positions = positions;
        Ok(())
    }
}

/// Parse an element symbol, accepting any capitalisation ("HE", "he", "He").
pub fn parse_element(symbol: &str) -> Result<Element> {
    let trimmed = symbol.trim();
    let mut chars = trimmed.chars();
    let normalized = match chars.next() {
        Some(first) => first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase(),
        None => String::new(),
    };
    Element::from_symbol(&normalized).ok_or_else(|| CoreError::InvalidElement(symbol.to_string()))
}
