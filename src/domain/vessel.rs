use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Steel grades offered on the quoting desk.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Material {
    S30408,
    S31403,
    S31608,
    S31603,
    Q345R,
    Q235,
    /// Anything not in the catalogue, e.g. titanium TA2. Priced from the
    /// custom-material override.
    Custom(String),
}

/// Stress/density grouping the sizing formulas branch on.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MaterialFamily {
    /// 304-type stainless.
    Austenitic304,
    /// 316/314-type stainless; lighter than 304 in the shop density table.
    Austenitic316,
    Carbon345,
    Carbon235,
    Custom,
}

impl Material {
    pub const CATALOGUE: [Material; 6] = [
        Material::S30408,
        Material::S31403,
        Material::S31608,
        Material::S31603,
        Material::Q345R,
        Material::Q235,
    ];

    /// Parses a grade code. Codes outside the catalogue become `Custom`.
    pub fn parse(code: &str) -> Self {
        let trimmed = code.trim();
        match trimmed.to_ascii_uppercase().as_str() {
            "S30408" => Material::S30408,
            "S31403" => Material::S31403,
            "S31608" => Material::S31608,
            "S31603" => Material::S31603,
            "Q345R" => Material::Q345R,
            "Q235" => Material::Q235,
            _ => Material::Custom(trimmed.to_string()),
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Material::S30408 => "S30408",
            Material::S31403 => "S31403",
            Material::S31608 => "S31608",
            Material::S31603 => "S31603",
            Material::Q345R => "Q345R",
            Material::Q235 => "Q235",
            Material::Custom(name) => name.as_str(),
        }
    }

    pub fn family(&self) -> MaterialFamily {
        match self {
            Material::S30408 => MaterialFamily::Austenitic304,
            Material::S31403 | Material::S31608 | Material::S31603 => {
                MaterialFamily::Austenitic316
            }
            Material::Q345R => MaterialFamily::Carbon345,
            Material::Q235 => MaterialFamily::Carbon235,
            Material::Custom(_) => MaterialFamily::Custom,
        }
    }

    pub fn is_custom(&self) -> bool {
        matches!(self, Material::Custom(_))
    }
}

impl MaterialFamily {
    /// Allowable stress in MPa for the standard (annealed) condition.
    pub fn allowable_stress(self) -> f64 {
        match self {
            MaterialFamily::Carbon345 => 189.0,
            MaterialFamily::Carbon235 => 113.0,
            MaterialFamily::Austenitic304
            | MaterialFamily::Austenitic316
            | MaterialFamily::Custom => 137.0,
        }
    }

    /// Density in g/cm³.
    pub fn density(self) -> f64 {
        match self {
            MaterialFamily::Austenitic304 => 7.93,
            MaterialFamily::Austenitic316
            | MaterialFamily::Carbon345
            | MaterialFamily::Carbon235
            | MaterialFamily::Custom => 7.85,
        }
    }

    pub fn cold_stretch_eligible(self) -> bool {
        matches!(
            self,
            MaterialFamily::Austenitic304 | MaterialFamily::Austenitic316
        )
    }
}

impl fmt::Display for Material {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum HeatExchangeStyle {
    #[default]
    HalfPipeJacket,
    FullJacket,
    InternalCoil,
    None,
}

impl HeatExchangeStyle {
    pub fn label(&self) -> &'static str {
        match self {
            Self::HalfPipeJacket => "Half-pipe jacket",
            Self::FullJacket => "Full jacket",
            Self::InternalCoil => "Internal coil",
            Self::None => "None",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SurfaceFinish {
    #[default]
    Passivation,
    PolishRa04,
    PolishRa06,
    PolishRa08,
}

impl SurfaceFinish {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Passivation => "Pickling & passivation",
            Self::PolishRa04 => "Mechanical polish Ra0.4",
            Self::PolishRa06 => "Mechanical polish Ra0.6",
            Self::PolishRa08 => "Mechanical polish Ra0.8",
        }
    }

    /// Relative effort of the polish grade; `None` when no polishing is done.
    pub fn polish_factor(&self) -> Option<f64> {
        match self {
            Self::Passivation => None,
            Self::PolishRa04 => Some(1.5),
            Self::PolishRa06 => Some(1.2),
            Self::PolishRa08 => Some(1.0),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum EquipmentKind {
    #[default]
    Reactor,
    HeatExchanger,
    StorageTank,
    Column,
}

impl EquipmentKind {
    pub fn label(&self) -> &'static str {
        match self {
            Self::Reactor => "Reactor",
            Self::HeatExchanger => "Heat exchanger",
            Self::StorageTank => "Storage tank",
            Self::Column => "Column",
        }
    }
}

/// Parameters of one vessel enquiry.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct VesselSpec {
    pub kind: EquipmentKind,
    pub volume_m3: f64,
    pub material: Material,
    /// Negative values denote vacuum design.
    pub design_pressure_mpa: f64,
    pub medium: String,
    pub heat_exchange: HeatExchangeStyle,
    pub nozzle_count: u32,
    pub surface_finish: SurfaceFinish,
}

impl Default for VesselSpec {
    fn default() -> Self {
        Self {
            kind: EquipmentKind::Reactor,
            volume_m3: 5.0,
            material: Material::S30408,
            design_pressure_mpa: -0.10,
            medium: "Glycol".to_string(),
            heat_exchange: HeatExchangeStyle::HalfPipeJacket,
            nozzle_count: 8,
            surface_finish: SurfaceFinish::Passivation,
        }
    }
}

#[derive(Debug, Error, PartialEq, Eq)]
#[error("unknown {field} `{value}`, expected one of: {expected}")]
pub struct InputError {
    pub field: &'static str,
    pub value: String,
    pub expected: &'static str,
}

fn normalise(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|ch| ch.is_ascii_alphanumeric())
        .collect()
}

impl FromStr for HeatExchangeStyle {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "halfpipe" | "halfpipejacket" => Ok(Self::HalfPipeJacket),
            "jacket" | "fulljacket" => Ok(Self::FullJacket),
            "coil" | "internalcoil" => Ok(Self::InternalCoil),
            "none" => Ok(Self::None),
            _ => Err(InputError {
                field: "heat exchange style",
                value: s.to_string(),
                expected: "half-pipe, jacket, coil, none",
            }),
        }
    }
}

impl FromStr for SurfaceFinish {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "passivation" | "pickling" => Ok(Self::Passivation),
            "ra04" | "polishra04" => Ok(Self::PolishRa04),
            "ra06" | "polishra06" => Ok(Self::PolishRa06),
            "ra08" | "polishra08" => Ok(Self::PolishRa08),
            _ => Err(InputError {
                field: "surface finish",
                value: s.to_string(),
                expected: "passivation, ra0.4, ra0.6, ra0.8",
            }),
        }
    }
}

impl FromStr for EquipmentKind {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match normalise(s).as_str() {
            "reactor" => Ok(Self::Reactor),
            "heatexchanger" | "exchanger" => Ok(Self::HeatExchanger),
            "storagetank" | "tank" => Ok(Self::StorageTank),
            "column" | "tower" => Ok(Self::Column),
            _ => Err(InputError {
                field: "equipment kind",
                value: s.to_string(),
                expected: "reactor, heat-exchanger, tank, column",
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_catalogue_codes_case_insensitively() {
        assert_eq!(Material::parse("s30408"), Material::S30408);
        assert_eq!(Material::parse(" Q345R "), Material::Q345R);
        assert_eq!(Material::parse("q235"), Material::Q235);
    }

    #[test]
    fn unknown_code_becomes_custom() {
        let material = Material::parse("TA2");
        assert_eq!(material, Material::Custom("TA2".to_string()));
        assert_eq!(material.family(), MaterialFamily::Custom);
        assert_eq!(material.code(), "TA2");
    }

    #[test]
    fn family_table_is_total() {
        for material in Material::CATALOGUE {
            let family = material.family();
            assert!(family.allowable_stress() > 0.0);
            assert!(family.density() > 7.0);
        }
        assert_eq!(MaterialFamily::Carbon345.allowable_stress(), 189.0);
        assert_eq!(MaterialFamily::Carbon235.allowable_stress(), 113.0);
        assert_eq!(Material::S30408.family().density(), 7.93);
        assert_eq!(Material::S31608.family().density(), 7.85);
        assert_eq!(Material::S31603.family().density(), 7.85);
        assert_eq!(Material::S31403.family().density(), 7.85);
        for material in [
            Material::S30408,
            Material::S31403,
            Material::S31608,
            Material::S31603,
        ] {
            assert!(material.family().cold_stretch_eligible());
            assert_eq!(material.family().allowable_stress(), 137.0);
        }
        assert!(!MaterialFamily::Carbon345.cold_stretch_eligible());
        assert!(!MaterialFamily::Custom.cold_stretch_eligible());
    }

    #[test]
    fn parses_enumerations_from_cli_spellings() {
        assert_eq!("half-pipe".parse(), Ok(HeatExchangeStyle::HalfPipeJacket));
        assert_eq!("None".parse(), Ok(HeatExchangeStyle::None));
        assert_eq!("Ra0.4".parse(), Ok(SurfaceFinish::PolishRa04));
        assert_eq!("storage-tank".parse(), Ok(EquipmentKind::StorageTank));
        assert!("sandblast".parse::<SurfaceFinish>().is_err());
    }

    #[test]
    fn polish_factor_only_for_polished_finishes() {
        assert_eq!(SurfaceFinish::Passivation.polish_factor(), None);
        assert_eq!(SurfaceFinish::PolishRa04.polish_factor(), Some(1.5));
    }
}
