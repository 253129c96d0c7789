//! Assembles quotes and assistant answers from the estimator and the
//! network collaborators. Collaborator failures end here as a status, never
//! as an error.

use std::time::Duration;

use serde::Serialize;
use time::{format_description::well_known::Rfc3339, OffsetDateTime};
use uuid::Uuid;

use crate::domain::{
    assistant_prompt, parse_recommendation, recommendation_prompt, study_options,
    AgitatorRecommendation, CostBreakdown, Dataset, DriveSettings, OptionStudy, Settings,
    VesselSpec,
};
use crate::infra::{
    cache::{DatasetCache, DatasetStore},
    drive::{find_key_file, key_file_search_dirs, DriveClient},
    gemini::{GeminiClient, GeminiError},
};
use crate::util::persistence::config_dir;

/// Upper bound for the whole dataset lookup (search + download).
pub const DATASET_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum SourceStatus {
    Live,
    Cached,
    Stale,
    Fallback,
    Unavailable,
}

/// A collaborator result together with where it came from.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Sourced<T> {
    pub data: T,
    pub status: SourceStatus,
    /// Advisory text for the user, e.g. why a fallback was used.
    pub note: Option<String>,
}

impl<T> Sourced<T> {
    pub fn live(data: T) -> Self {
        Self {
            data,
            status: SourceStatus::Live,
            note: None,
        }
    }

    fn with_status(data: T, status: SourceStatus, note: impl Into<String>) -> Self {
        Self {
            data,
            status,
            note: Some(note.into()),
        }
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct Quote {
    pub id: Uuid,
    /// RFC 3339 UTC timestamp.
    pub issued_at: String,
    pub spec: VesselSpec,
    pub study: OptionStudy,
    pub recommendation: Sourced<AgitatorRecommendation>,
}

impl Quote {
    pub fn breakdown(&self) -> &CostBreakdown {
        &self.study.standard
    }
}

#[derive(Clone, Debug, Serialize)]
pub struct AssistantReply {
    pub answer: Sourced<String>,
    pub dataset: Sourced<Option<Dataset>>,
}

fn total_ai_budget(settings: &Settings) -> Duration {
    settings.ai.timeout() * settings.ai.models.len().max(1) as u32
}

/// Runs the estimator, then asks for agitator advice unless `offline`.
pub async fn build_quote(spec: VesselSpec, settings: &Settings, offline: bool) -> Quote {
    let study = study_options(&spec, &settings.prices);
    log::info!(
        "[quote] {} {} m3: wall {} mm, total {:.0}",
        spec.material,
        spec.volume_m3,
        study.standard.wall_thickness_mm,
        study.standard.total_cost
    );

    let recommendation = if offline {
        Sourced::with_status(
            AgitatorRecommendation::fallback(),
            SourceStatus::Fallback,
            "AI recommendation skipped (offline)",
        )
    } else {
        match GeminiClient::new(&settings.ai, &settings.network) {
            Ok(client) => recommend(&client, &spec, total_ai_budget(settings)).await,
            Err(err) => fallback_recommendation(err.to_string()),
        }
    };

    Quote {
        id: Uuid::new_v4(),
        issued_at: OffsetDateTime::now_utc()
            .format(&Rfc3339)
            .unwrap_or_default(),
        spec,
        study,
        recommendation,
    }
}

fn fallback_recommendation(reason: String) -> Sourced<AgitatorRecommendation> {
    log::warn!("[quote] using fallback agitator recommendation: {reason}");
    Sourced::with_status(
        AgitatorRecommendation::fallback(),
        SourceStatus::Fallback,
        format!("AI unavailable: {reason}"),
    )
}

/// Agitator advice for `spec`, or the fixed fallback record on any failure.
pub async fn recommend(
    client: &GeminiClient,
    spec: &VesselSpec,
    budget: Duration,
) -> Sourced<AgitatorRecommendation> {
    let prompt = recommendation_prompt(spec);
    let text = match tokio::time::timeout(budget, client.generate(&prompt)).await {
        Ok(Ok(text)) => text,
        Ok(Err(err)) => return fallback_recommendation(err.to_string()),
        Err(_) => return fallback_recommendation(GeminiError::Timeout(budget).to_string()),
    };

    match parse_recommendation(&text) {
        Ok(recommendation) => Sourced::live(recommendation),
        Err(err) => fallback_recommendation(err.to_string()),
    }
}

/// Business dataset from the drive, the local cache, or nothing.
pub async fn load_dataset(settings: &Settings, store: &DatasetStore) -> Sourced<Option<Dataset>> {
    let mut drive = settings.drive.clone();
    if drive.service_account_key.is_none() {
        let dirs = key_file_search_dirs(config_dir().as_deref());
        drive.service_account_key = find_key_file(&dirs);
        if let Some(path) = &drive.service_account_key {
            log::info!("[drive] found service account key {}", path.display());
        }
    }

    let client = if drive.has_credentials() {
        match DriveClient::new(&drive, &settings.network) {
            Ok(client) => Some(client),
            Err(err) => {
                log::warn!("[drive] client unavailable: {err}");
                None
            }
        }
    } else {
        None
    };
    load_dataset_with(client.as_ref(), &drive, store).await
}

pub async fn load_dataset_with(
    client: Option<&DriveClient>,
    drive: &DriveSettings,
    store: &DatasetStore,
) -> Sourced<Option<Dataset>> {
    let pattern = drive.name_pattern.as_str();
    if let Some(cache) = store.load_fresh(pattern) {
        let age = cache.age_string();
        return Sourced::with_status(
            Some(cache.dataset),
            SourceStatus::Cached,
            format!("cached data (age {age})"),
        );
    }

    let Some(client) = client else {
        return stale_or_unavailable(store, pattern, "offline mode: no drive credentials".into());
    };

    let fetch = client.fetch_dataset(pattern, drive.row_limit);
    match tokio::time::timeout(DATASET_TIMEOUT, fetch).await {
        Ok(Ok(dataset)) => {
            if let Err(err) = store.save(&DatasetCache::new(pattern, dataset.clone())) {
                log::warn!("[dataset-cache] failed to save: {err}");
            }
            Sourced::live(Some(dataset))
        }
        Ok(Err(err)) => stale_or_unavailable(store, pattern, err.to_string()),
        Err(_) => stale_or_unavailable(
            store,
            pattern,
            format!("drive did not answer within {DATASET_TIMEOUT:?}"),
        ),
    }
}

fn stale_or_unavailable(
    store: &DatasetStore,
    pattern: &str,
    reason: String,
) -> Sourced<Option<Dataset>> {
    match store.load(pattern) {
        Some(cache) => {
            let age = cache.age_string();
            log::warn!("[drive] {reason}; serving stale dataset (age {age})");
            Sourced::with_status(
                Some(cache.dataset),
                SourceStatus::Stale,
                format!("{reason}; using stale data (age {age})"),
            )
        }
        None => {
            log::warn!("[drive] {reason}; continuing without dataset");
            Sourced::with_status(None, SourceStatus::Unavailable, reason)
        }
    }
}

/// Answers a free-form business question, with the dataset as context when available.
pub async fn ask_assistant(
    query: &str,
    settings: &Settings,
    store: &DatasetStore,
) -> AssistantReply {
    let dataset = load_dataset(settings, store).await;
    let answer = match GeminiClient::new(&settings.ai, &settings.network) {
        Ok(client) => {
            let budget = total_ai_budget(settings);
            answer_with(&client, query, dataset.data.as_ref(), budget).await
        }
        Err(err) => unavailable_answer(err.to_string()),
    };
    AssistantReply { answer, dataset }
}

pub async fn answer_with(
    client: &GeminiClient,
    query: &str,
    dataset: Option<&Dataset>,
    budget: Duration,
) -> Sourced<String> {
    let prompt = assistant_prompt(query, dataset);
    match tokio::time::timeout(budget, client.generate(&prompt)).await {
        Ok(Ok(text)) => Sourced::live(text),
        Ok(Err(err)) => unavailable_answer(err.to_string()),
        Err(_) => unavailable_answer(GeminiError::Timeout(budget).to_string()),
    }
}

fn unavailable_answer(reason: String) -> Sourced<String> {
    Sourced::with_status(
        format!("⚠ {reason}"),
        SourceStatus::Unavailable,
        reason,
    )
}
