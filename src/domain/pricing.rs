use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::vessel::Material;

/// Unit price used when a grade is missing from the table.
pub const DEFAULT_UNIT_PRICE: f64 = 45.0;

/// User-adjustable price defaults. Read by every calculation, never written by one.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PriceTable {
    /// Grade code -> currency/kg.
    pub materials: BTreeMap<String, f64>,
    #[serde(default)]
    pub custom_material: CustomMaterial,
    #[serde(default)]
    pub rates: ProcessRates,
    #[serde(default)]
    pub custom_fee: Option<CustomFee>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct CustomMaterial {
    pub name: Option<String>,
    /// Currency/kg. `None` falls back to [`DEFAULT_UNIT_PRICE`].
    pub price: Option<f64>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessRates {
    pub fabrication_per_ton: f64,
    pub weld_per_meter: f64,
    pub polish_per_m2: f64,
    pub ndt_per_meter: f64,
    pub cold_stretch_per_m3: f64,
}

impl Default for ProcessRates {
    fn default() -> Self {
        Self {
            fabrication_per_ton: 2500.0,
            weld_per_meter: 50.0,
            polish_per_m2: 200.0,
            ndt_per_meter: 100.0,
            cold_stretch_per_m3: 300.0,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CustomFee {
    pub name: String,
    pub amount: f64,
}

impl Default for PriceTable {
    fn default() -> Self {
        let materials = [
            (Material::S30408, 45.0),
            (Material::S31403, 55.0),
            (Material::S31608, 25.0),
            (Material::S31603, 55.0),
            (Material::Q345R, 25.0),
            (Material::Q235, 20.0),
        ]
        .into_iter()
        .map(|(material, price)| (material.code().to_string(), price))
        .collect();

        Self {
            materials,
            custom_material: CustomMaterial::default(),
            rates: ProcessRates::default(),
            custom_fee: None,
        }
    }
}

impl PriceTable {
    /// Currency/kg for `material`. Never fails: misses fall back to
    /// [`DEFAULT_UNIT_PRICE`].
    pub fn unit_price(&self, material: &Material) -> f64 {
        if material.is_custom() {
            return self.custom_material.price.unwrap_or(DEFAULT_UNIT_PRICE);
        }
        self.materials
            .get(material.code())
            .copied()
            .unwrap_or(DEFAULT_UNIT_PRICE)
    }

    pub fn set_material_price(&mut self, material: &Material, price: f64) {
        if material.is_custom() {
            self.custom_material = CustomMaterial {
                name: Some(material.code().to_string()),
                price: Some(price),
            };
        } else {
            self.materials.insert(material.code().to_string(), price);
        }
    }

    /// Custom fee amount when one is configured with a positive value.
    pub fn active_custom_fee(&self) -> Option<&CustomFee> {
        self.custom_fee.as_ref().filter(|fee| fee.amount > 0.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_cover_catalogue() {
        let table = PriceTable::default();
        for material in Material::CATALOGUE {
            assert!(table.materials.contains_key(material.code()));
        }
        assert_eq!(table.unit_price(&Material::S31608), 25.0);
        assert_eq!(table.unit_price(&Material::Q235), 20.0);
    }

    #[test]
    fn table_miss_falls_back_to_default_price() {
        let mut table = PriceTable::default();
        table.materials.remove("Q345R");
        assert_eq!(table.unit_price(&Material::Q345R), DEFAULT_UNIT_PRICE);
    }

    #[test]
    fn custom_material_uses_override_or_default() {
        let mut table = PriceTable::default();
        let titanium = Material::parse("TA2");
        assert_eq!(table.unit_price(&titanium), DEFAULT_UNIT_PRICE);

        table.set_material_price(&titanium, 180.0);
        assert_eq!(table.unit_price(&titanium), 180.0);
        assert_eq!(table.custom_material.name.as_deref(), Some("TA2"));
    }

    #[test]
    fn zero_custom_fee_is_inactive() {
        let mut table = PriceTable::default();
        table.custom_fee = Some(CustomFee {
            name: "Transport".into(),
            amount: 0.0,
        });
        assert!(table.active_custom_fee().is_none());

        table.custom_fee = Some(CustomFee {
            name: "Transport".into(),
            amount: 1200.0,
        });
        assert_eq!(table.active_custom_fee().map(|f| f.amount), Some(1200.0));
    }
}
