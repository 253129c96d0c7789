//! Wall-thickness sizing and BOM cost roll-up for a single vessel.
//!
//! Everything in here is a pure function of its inputs. The formulas are the
//! simplified shop heuristics used for budget quotes, not a certified design
//! calculation.

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

use super::pricing::PriceTable;
use super::vessel::{HeatExchangeStyle, MaterialFamily, VesselSpec};

/// Straight-shell allowance for heads and fittings.
pub const HEAD_ALLOWANCE_MM: f64 = 600.0;
pub const PRESSURE_MARGIN: f64 = 1.1;
pub const MIN_CALC_PRESSURE_MPA: f64 = 0.2;
pub const JOINT_EFFICIENCY: f64 = 0.85;
/// Allowable stress of cold-worked austenitic shells.
pub const COLD_STRETCH_STRESS_MPA: f64 = 305.0;
pub const STANDARD_ALLOWANCE_MM: f64 = 1.0;
pub const COLD_STRETCH_ALLOWANCE_MM: f64 = 0.5;
pub const MIN_WALL_THICKNESS_MM: u32 = 3;
/// Lower bound on `2·σ·φ − Pc`.
pub const STRESS_MARGIN_FLOOR_MPA: f64 = 1.0;

const HEAD_WEIGHT_FACTOR: f64 = 1.25;
const HEAD_EXTRA_THICKNESS_MM: f64 = 2.0;

pub const AGITATOR_BASE_CHARGE: f64 = 5000.0;
const AGITATOR_BASE_WEIGHT_KG: f64 = 150.0;
const AGITATOR_KG_PER_M3: f64 = 40.0;
pub const AGITATOR_RATE_PER_KG: f64 = 60.0;

const HALF_PIPE_KG_PER_M3: f64 = 60.0;
const HALF_PIPE_PRICE_ADDER: f64 = 10.0;
const HALF_PIPE_M_PER_M3: f64 = 12.0;

pub const NOZZLE_CHARGE: f64 = 800.0;
pub const MISC_BASE_CHARGE: f64 = 3000.0;
const POLISH_M2_PER_M3: f64 = 4.0;

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum CostCategory {
    Material,
    Agitator,
    HeatExchange,
    Fabrication,
    Inspection,
    ColdStretch,
    Miscellaneous,
    CustomFee(String),
}

impl CostCategory {
    pub fn label(&self) -> &str {
        match self {
            Self::Material => "Shell & heads material",
            Self::Agitator => "Agitator system",
            Self::HeatExchange => "Heat-exchange surface",
            Self::Fabrication => "Fabrication",
            Self::Inspection => "Weld inspection (NDT)",
            Self::ColdStretch => "Cold-stretch process",
            Self::Miscellaneous => "Nozzles, fittings & finish",
            Self::CustomFee(name) => name.as_str(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    pub category: CostCategory,
    pub amount: f64,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    /// Whether the cold-stretch path was actually taken.
    pub cold_stretch: bool,
    pub diameter_mm: u32,
    pub height_mm: f64,
    pub calc_pressure_mpa: f64,
    pub allowable_stress_mpa: f64,
    /// Formula thickness before allowance, rounding and clamping.
    pub calc_thickness_mm: f64,
    pub wall_thickness_mm: u32,
    /// Set when the stress-margin floor replaced a non-positive denominator.
    pub sizing_clamped: bool,
    pub vessel_weight_kg: f64,
    pub unit_price: f64,
    pub line_items: Vec<LineItem>,
    pub total_cost: f64,
}

impl CostBreakdown {
    pub fn amount(&self, category: &CostCategory) -> Option<f64> {
        self.line_items
            .iter()
            .find(|item| &item.category == category)
            .map(|item| item.amount)
    }
}

/// Standard shell diameter for a given volume.
pub fn select_diameter_mm(volume_m3: f64) -> u32 {
    if volume_m3 <= 5.0 {
        1600
    } else if volume_m3 <= 20.0 {
        2000
    } else {
        2400
    }
}

pub fn shell_height_mm(volume_m3: f64, diameter_mm: u32) -> f64 {
    let radius = diameter_mm as f64 / 2.0;
    volume_m3 * 1e9 / (PI * radius * radius) + HEAD_ALLOWANCE_MM
}

pub fn calc_pressure_mpa(design_pressure_mpa: f64) -> f64 {
    (design_pressure_mpa.abs() * PRESSURE_MARGIN).max(MIN_CALC_PRESSURE_MPA)
}

pub fn allowable_stress_mpa(family: MaterialFamily, cold_stretch: bool) -> f64 {
    if cold_stretch && family.cold_stretch_eligible() {
        COLD_STRETCH_STRESS_MPA
    } else {
        family.allowable_stress()
    }
}

struct Sizing {
    calc_thickness_mm: f64,
    wall_thickness_mm: u32,
    clamped: bool,
}

fn size_wall(calc_pressure: f64, diameter_mm: u32, stress: f64, cold_stretch: bool) -> Sizing {
    let raw_denominator = 2.0 * stress * JOINT_EFFICIENCY - calc_pressure;
    let clamped = raw_denominator < STRESS_MARGIN_FLOOR_MPA;
    let denominator = raw_denominator.max(STRESS_MARGIN_FLOOR_MPA);
    let calc_thickness_mm = calc_pressure * diameter_mm as f64 / denominator;

    let allowance = if cold_stretch {
        COLD_STRETCH_ALLOWANCE_MM
    } else {
        STANDARD_ALLOWANCE_MM
    };
    let rounded = (calc_thickness_mm + allowance).ceil();
    let wall_thickness_mm = if rounded < MIN_WALL_THICKNESS_MM as f64 {
        MIN_WALL_THICKNESS_MM
    } else {
        rounded as u32
    };

    Sizing {
        calc_thickness_mm,
        wall_thickness_mm,
        clamped,
    }
}

/// Shell plus two elliptical heads, in kg.
fn vessel_weight_kg(diameter_mm: u32, height_mm: f64, thickness_mm: u32, density: f64) -> f64 {
    let diameter_m = diameter_mm as f64 / 1000.0;
    let thickness = thickness_mm as f64;
    let shell = PI * diameter_mm as f64 * height_mm / 1e6 * thickness * density;
    let head_thickness = thickness + HEAD_EXTRA_THICKNESS_MM;
    let heads = 2.0 * HEAD_WEIGHT_FACTOR * diameter_m * diameter_m * head_thickness * density;
    shell + heads
}

/// Sizes the vessel wall and rolls up the BOM cost.
///
/// `cold_stretch` selects the cold-worked allowable stress; it is ignored for
/// materials outside the austenitic family.
pub fn estimate(spec: &VesselSpec, prices: &PriceTable, cold_stretch: bool) -> CostBreakdown {
    let family = spec.material.family();
    let cold_stretch = cold_stretch && family.cold_stretch_eligible();
    let volume = spec.volume_m3;

    let diameter_mm = select_diameter_mm(volume);
    let height_mm = shell_height_mm(volume, diameter_mm);
    let calc_pressure = calc_pressure_mpa(spec.design_pressure_mpa);
    let stress = allowable_stress_mpa(family, cold_stretch);
    let sizing = size_wall(calc_pressure, diameter_mm, stress, cold_stretch);
    if sizing.clamped {
        log::warn!(
            "[estimate] stress margin floor applied: Pc={calc_pressure:.3} MPa, sigma={stress} MPa"
        );
    }

    let vessel_weight_kg = vessel_weight_kg(
        diameter_mm,
        height_mm,
        sizing.wall_thickness_mm,
        family.density(),
    );
    let unit_price = prices.unit_price(&spec.material);
    let rates = &prices.rates;

    let material_cost = vessel_weight_kg * unit_price;

    let agitator_weight_kg = AGITATOR_BASE_WEIGHT_KG + AGITATOR_KG_PER_M3 * volume;
    let agitator_cost = AGITATOR_BASE_CHARGE + agitator_weight_kg * AGITATOR_RATE_PER_KG;

    let (heat_weight_kg, heat_cost) = match spec.heat_exchange {
        HeatExchangeStyle::HalfPipeJacket => {
            let weight = HALF_PIPE_KG_PER_M3 * volume;
            let weld = HALF_PIPE_M_PER_M3 * volume * rates.weld_per_meter;
            (weight, weight * (unit_price + HALF_PIPE_PRICE_ADDER) + weld)
        }
        HeatExchangeStyle::FullJacket
        | HeatExchangeStyle::InternalCoil
        | HeatExchangeStyle::None => (0.0, 0.0),
    };

    let fabrication_cost = (vessel_weight_kg + heat_weight_kg) / 1000.0 * rates.fabrication_per_ton;

    let seam_length_m = 2.0 * PI * diameter_mm as f64 / 1000.0 + height_mm / 1000.0;
    let inspection_cost = seam_length_m * rates.ndt_per_meter;

    let polish_cost = spec
        .surface_finish
        .polish_factor()
        .map(|factor| volume * POLISH_M2_PER_M3 * rates.polish_per_m2 * factor)
        .unwrap_or(0.0);
    let misc_cost = spec.nozzle_count as f64 * NOZZLE_CHARGE + MISC_BASE_CHARGE + polish_cost;

    let mut line_items = vec![
        LineItem {
            category: CostCategory::Material,
            amount: material_cost,
        },
        LineItem {
            category: CostCategory::Agitator,
            amount: agitator_cost,
        },
        LineItem {
            category: CostCategory::HeatExchange,
            amount: heat_cost,
        },
        LineItem {
            category: CostCategory::Fabrication,
            amount: fabrication_cost,
        },
        LineItem {
            category: CostCategory::Inspection,
            amount: inspection_cost,
        },
    ];
    if cold_stretch {
        line_items.push(LineItem {
            category: CostCategory::ColdStretch,
            amount: volume * rates.cold_stretch_per_m3,
        });
    }
    line_items.push(LineItem {
        category: CostCategory::Miscellaneous,
        amount: misc_cost,
    });
    if let Some(fee) = prices.active_custom_fee() {
        line_items.push(LineItem {
            category: CostCategory::CustomFee(fee.name.clone()),
            amount: fee.amount,
        });
    }

    let total_cost = line_items.iter().map(|item| item.amount).sum();

    CostBreakdown {
        cold_stretch,
        diameter_mm,
        height_mm,
        calc_pressure_mpa: calc_pressure,
        allowable_stress_mpa: stress,
        calc_thickness_mm: sizing.calc_thickness_mm,
        wall_thickness_mm: sizing.wall_thickness_mm,
        sizing_clamped: sizing.clamped,
        vessel_weight_kg,
        unit_price,
        line_items,
        total_cost,
    }
}
