use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::vessel::VesselSpec;

/// Agitator advice returned by the language model.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AgitatorRecommendation {
    pub viscosity: String,
    #[serde(rename = "type")]
    pub agitator_type: String,
    /// Motor power in kW.
    #[serde(deserialize_with = "f64_from_json")]
    pub power: f64,
    pub reason: String,
}

impl AgitatorRecommendation {
    /// Substituted whenever the supplier cannot produce a usable answer.
    pub fn fallback() -> Self {
        Self {
            viscosity: "unavailable".to_string(),
            agitator_type: "generic paddle".to_string(),
            power: 5.5,
            reason: "fallback".to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum RecommendationParseError {
    #[error("no JSON object found in model output")]
    NoJsonObject,
    #[error("malformed recommendation: {0}")]
    Json(#[from] serde_json::Error),
}

pub fn recommendation_prompt(spec: &VesselSpec) -> String {
    format!(
        "You are a chemical process equipment specialist. For a {kind} holding the medium \
         \"{medium}\" with a working volume of {volume} m3:\n\
         1. Estimate the viscosity of the medium at ambient temperature.\n\
         2. Recommend an agitator type.\n\
         3. Estimate the motor power in kW.\n\
         Reply with JSON only: {{\"viscosity\": \"...\", \"type\": \"...\", \
         \"power\": <number>, \"reason\": \"...\"}}",
        kind = spec.kind.label().to_lowercase(),
        medium = spec.medium,
        volume = spec.volume_m3,
    )
}

/// Pulls the recommendation object out of free-form model text, tolerating
/// Markdown code fences and prose around the JSON.
pub fn parse_recommendation(
    text: &str,
) -> Result<AgitatorRecommendation, RecommendationParseError> {
    let cleaned = text.replace("```json", "").replace("```", "");
    let start = cleaned.find('{').ok_or(RecommendationParseError::NoJsonObject)?;
    let end = cleaned.rfind('}').ok_or(RecommendationParseError::NoJsonObject)?;
    if end < start {
        return Err(RecommendationParseError::NoJsonObject);
    }
    Ok(serde_json::from_str(&cleaned[start..=end])?)
}

fn f64_from_json<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: serde::Deserializer<'de>,
{
    struct NumberOrString;

    impl<'de> serde::de::Visitor<'de> for NumberOrString {
        type Value = f64;

        fn expecting(&self, formatter: &mut std::fmt::Formatter) -> std::fmt::Result {
            formatter.write_str("a number or numeric string")
        }

        fn visit_f64<E>(self, value: f64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value)
        }

        fn visit_u64<E>(self, value: u64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value as f64)
        }

        fn visit_i64<E>(self, value: i64) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            Ok(value as f64)
        }

        fn visit_str<E>(self, value: &str) -> Result<Self::Value, E>
        where
            E: serde::de::Error,
        {
            // Models like to answer "7.5 kW".
            let numeric: String = value
                .trim()
                .chars()
                .take_while(|ch| ch.is_ascii_digit() || *ch == '.' || *ch == '-')
                .collect();
            numeric
                .parse::<f64>()
                .map_err(|_| E::invalid_value(serde::de::Unexpected::Str(value), &self))
        }
    }

    deserializer.deserialize_any(NumberOrString)
}
