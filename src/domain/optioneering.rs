//! Runs the estimator on alternate designs and turns the differences into
//! advisories for the quote.

use serde::{Deserialize, Serialize};

use super::estimate::{estimate, CostBreakdown};
use super::pricing::PriceTable;
use super::vessel::{Material, VesselSpec};

/// Grade that triggers a substitution hint, and the grade suggested instead.
const SUBSTITUTION: (Material, Material) = (Material::S31603, Material::S31608);

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Advisory {
    ColdStretchSavings {
        savings: f64,
        standard_thickness_mm: u32,
        cold_stretch_thickness_mm: u32,
    },
    VacuumDesign {
        design_pressure_mpa: f64,
    },
    MaterialSubstitution {
        from: Material,
        to: Material,
        savings: Option<f64>,
    },
    SizingOutOfRange {
        calc_pressure_mpa: f64,
    },
}

impl Advisory {
    pub fn message(&self) -> String {
        match self {
            Advisory::ColdStretchSavings {
                savings,
                standard_thickness_mm,
                cold_stretch_thickness_mm,
            } => format!(
                "Cold-stretch design saves {savings:.0} \
                 (wall {standard_thickness_mm} mm -> {cold_stretch_thickness_mm} mm)"
            ),
            Advisory::VacuumDesign {
                design_pressure_mpa,
            } => format!(
                "Vacuum design ({design_pressure_mpa:.2} MPa): \
                 check external-pressure stability and stiffening rings"
            ),
            Advisory::MaterialSubstitution { from, to, savings } => match savings {
                Some(value) => format!(
                    "{from} could be replaced by {to} if low-carbon grade is not required \
                     (saves {value:.0})"
                ),
                None => format!(
                    "{from} could be replaced by {to} if low-carbon grade is not required"
                ),
            },
            Advisory::SizingOutOfRange { calc_pressure_mpa } => format!(
                "Calculation pressure {calc_pressure_mpa:.2} MPa is outside the simplified \
                 sizing range; wall thickness needs a full design check"
            ),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct OptionStudy {
    pub standard: CostBreakdown,
    /// Present only for cold-stretch eligible materials.
    pub cold_stretch: Option<CostBreakdown>,
    pub advisories: Vec<Advisory>,
}

impl OptionStudy {
    pub fn cold_stretch_savings(&self) -> Option<f64> {
        self.cold_stretch
            .as_ref()
            .map(|alt| self.standard.total_cost - alt.total_cost)
            .filter(|delta| *delta > 0.0)
    }
}

/// Estimates the standard design and, where the material allows it, the
/// cold-stretch alternative, collecting advisories along the way.
pub fn study_options(spec: &VesselSpec, prices: &PriceTable) -> OptionStudy {
    let standard = estimate(spec, prices, false);
    let cold_stretch = spec
        .material
        .family()
        .cold_stretch_eligible()
        .then(|| estimate(spec, prices, true));

    let mut advisories = Vec::new();

    if standard.sizing_clamped {
        advisories.push(Advisory::SizingOutOfRange {
            calc_pressure_mpa: standard.calc_pressure_mpa,
        });
    }

    if let Some(alt) = cold_stretch.as_ref() {
        let savings = standard.total_cost - alt.total_cost;
        if savings > 0.0 {
            advisories.push(Advisory::ColdStretchSavings {
                savings,
                standard_thickness_mm: standard.wall_thickness_mm,
                cold_stretch_thickness_mm: alt.wall_thickness_mm,
            });
        }
    }

    if spec.design_pressure_mpa < 0.0 {
        advisories.push(Advisory::VacuumDesign {
            design_pressure_mpa: spec.design_pressure_mpa,
        });
    }

    let (from, to) = SUBSTITUTION;
    if spec.material == from {
        let substitute = VesselSpec {
            material: to.clone(),
            ..spec.clone()
        };
        let savings = standard.total_cost - estimate(&substitute, prices, false).total_cost;
        advisories.push(Advisory::MaterialSubstitution {
            from,
            to,
            savings: (savings > 0.0).then_some(savings),
        });
    }

    OptionStudy {
        standard,
        cold_stretch,
        advisories,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::vessel::HeatExchangeStyle;

    fn spec(material: Material, pressure: f64) -> VesselSpec {
        VesselSpec {
            volume_m3: 10.0,
            material,
            design_pressure_mpa: pressure,
            heat_exchange: HeatExchangeStyle::None,
            ..VesselSpec::default()
        }
    }

    #[test]
    fn carbon_steel_has_no_cold_stretch_alternative() {
        let study = study_options(&spec(Material::Q345R, 1.0), &PriceTable::default());
        assert!(study.cold_stretch.is_none());
        assert!(study.cold_stretch_savings().is_none());
        assert!(study.advisories.is_empty());
    }

    #[test]
    fn cold_stretch_savings_reported_when_thinner_wall_pays_off() {
        let study = study_options(&spec(Material::S30408, 1.0), &PriceTable::default());
        let alt = study.cold_stretch.as_ref().map(|b| b.wall_thickness_mm);
        assert_eq!(alt, Some(5));
        assert_eq!(study.standard.wall_thickness_mm, 11);

        let savings = study.cold_stretch_savings();
        assert!(savings.is_some());
        assert!(study.advisories.iter().any(|a| matches!(
            a,
            Advisory::ColdStretchSavings {
                standard_thickness_mm: 11,
                cold_stretch_thickness_mm: 5,
                ..
            }
        )));
    }

    #[test]
    fn no_savings_advisory_when_floor_binds_both_paths() {
        // 3 mm on both paths, so cold stretch only adds its surcharge.
        let study = study_options(&spec(Material::S30408, -0.1), &PriceTable::default());
        assert!(study.cold_stretch_savings().is_none());
        assert!(!study
            .advisories
            .iter()
            .any(|a| matches!(a, Advisory::ColdStretchSavings { .. })));
        assert!(study
            .advisories
            .iter()
            .any(|a| matches!(a, Advisory::VacuumDesign { .. })));
    }

    #[test]
    fn low_carbon_grade_gets_substitution_hint() {
        let study = study_options(&spec(Material::S31603, 0.5), &PriceTable::default());
        let hint = study
            .advisories
            .iter()
            .find(|a| matches!(a, Advisory::MaterialSubstitution { .. }))
            .cloned();
        match hint {
            Some(Advisory::MaterialSubstitution { from, to, savings }) => {
                assert_eq!(from, Material::S31603);
                assert_eq!(to, Material::S31608);
                assert!(savings.unwrap_or_default() > 0.0);
            }
            other => panic!("expected substitution advisory, got {other:?}"),
        }
    }

    #[test]
    fn out_of_range_pressure_is_flagged() {
        let study = study_options(&spec(Material::Q235, 200.0), &PriceTable::default());
        assert!(study
            .advisories
            .iter()
            .any(|a| matches!(a, Advisory::SizingOutOfRange { .. })));
    }

    #[test]
    fn messages_are_human_readable() {
        let msg = Advisory::VacuumDesign {
            design_pressure_mpa: -0.1,
        }
        .message();
        assert!(msg.contains("-0.10 MPa"));
    }
}
