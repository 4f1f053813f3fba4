//! Method vocabulary shared by the settings mapping, the calculators and the
//! engine: theories, SCF modes, coupled-cluster levels and dispersion
//! corrections.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MethodError {
    #[error("unknown coupled cluster level '{0}'")]
    UnknownCcLevel(String),

    #[error("unknown spin mode '{0}'")]
    UnknownScfMode(String),

    #[error("unknown dispersion correction '{0}'")]
    UnknownDispersion(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Theory {
    Dft,
    Hf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScfMode {
    Restricted,
    Unrestricted,
}

impl FromStr for ScfMode {
    type Err = MethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "restricted" => Ok(ScfMode::Restricted),
            "unrestricted" => Ok(ScfMode::Unrestricted),
            _ => Err(MethodError::UnknownScfMode(s.to_string())),
        }
    }
}

impl fmt::Display for ScfMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ScfMode::Restricted => f.write_str("restricted"),
            ScfMode::Unrestricted => f.write_str("unrestricted"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CcLevel {
    Ccsd,
    CcsdT,
    DlpnoCcsd,
    DlpnoCcsdT0,
}

impl CcLevel {
    /// Levels that add a perturbative triples correction.
    pub fn has_triples(self) -> bool {
        matches!(self, CcLevel::CcsdT | CcLevel::DlpnoCcsdT0)
    }

    /// Triples levels run on localized (IBO) orbitals.
    pub fn needs_localization(self) -> bool {
        self.has_triples()
    }
}

impl FromStr for CcLevel {
    type Err = MethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key: String = s
            .trim()
            .to_lowercase()
            .chars()
            .filter(|c| !matches!(c, '(' | ')' | '-' | '_'))
            .collect();
        match key.as_str() {
            "ccsd" => Ok(CcLevel::Ccsd),
            "ccsdt" => Ok(CcLevel::CcsdT),
            "dlpnoccsd" => Ok(CcLevel::DlpnoCcsd),
            "dlpnoccsdt0" => Ok(CcLevel::DlpnoCcsdT0),
            _ => Err(MethodError::UnknownCcLevel(s.to_string())),
        }
    }
}

/// Energy contributions an electronic structure can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EnergyContribution {
    Total,
    HfEnergy,
    CcsdCorrection,
    TriplesCorrection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Localization {
    Ibo,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Dispersion {
    D3,
    D3Abc,
    D3Bj,
    D3BjAbc,
}

impl FromStr for Dispersion {
    type Err = MethodError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "d3" | "d3zero" => Ok(Dispersion::D3),
            "d3abc" => Ok(Dispersion::D3Abc),
            "d3bj" => Ok(Dispersion::D3Bj),
            "d3bjabc" => Ok(Dispersion::D3BjAbc),
            _ => Err(MethodError::UnknownDispersion(s.to_string())),
        }
    }
}

const DISPERSION_SUFFIXES: [&str; 6] = ["d2", "d3", "d3bj", "d3zero", "d3abc", "d3bjabc"];

/// Split a method label such as `"pbe-d3bj"` into the method and its
/// dispersion suffix. Labels without a recognized suffix are returned whole.
pub fn split_method_and_dispersion(input: &str) -> (String, Option<String>) {
    let input = input.trim();
    if let Some((method, suffix)) = input.rsplit_once('-') {
        let suffix = suffix.to_lowercase();
        if !method.is_empty() && DISPERSION_SUFFIXES.contains(&suffix.as_str()) {
            return (method.to_string(), Some(suffix));
        }
    }
    (input.to_string(), None)
}
