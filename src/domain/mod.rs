//! Vessel sizing, pricing and quote advice live here.

pub mod dataset;
pub mod estimate;
pub mod optioneering;
pub mod pricing;
pub mod recommendation;
pub mod settings;
pub mod vessel;

pub use dataset::{assistant_prompt, Dataset};
pub use estimate::{estimate, CostBreakdown, CostCategory, LineItem};
pub use optioneering::{study_options, Advisory, OptionStudy};
pub use pricing::{CustomFee, CustomMaterial, PriceTable, ProcessRates, DEFAULT_UNIT_PRICE};
pub use recommendation::{
    parse_recommendation, recommendation_prompt, AgitatorRecommendation,
    RecommendationParseError,
};
pub use settings::{AiSettings, DriveSettings, NetworkSettings, Settings, SettingsOverrides};
pub use vessel::{
    EquipmentKind, HeatExchangeStyle, InputError, Material, MaterialFamily, SurfaceFinish,
    VesselSpec,
};
