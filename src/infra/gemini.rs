//! Thin asynchronous client for the Gemini `generateContent` endpoint.
//!
//! - Tries each configured model in order until one returns text.
//! - Returns the raw model text; callers decide how to interpret it.

use std::time::Duration;

use reqwest::{Client, StatusCode, Url};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::settings::{AiSettings, NetworkSettings};

use super::http_client;

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/";

#[derive(Debug, Error)]
pub enum GeminiError {
    #[error("no API key configured")]
    MissingKey,
    #[error("no models configured")]
    NoModels,
    #[error("invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    #[error("http request error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("model {model} rejected the request ({status}): {message}")]
    Api {
        model: String,
        status: StatusCode,
        message: String,
    },
    #[error("model {0} returned no text")]
    EmptyResponse(String),
    #[error("no answer within {0:?}")]
    Timeout(Duration),
}

#[derive(Clone)]
pub struct GeminiClient {
    http: Client,
    base_url: Url,
    api_key: String,
    models: Vec<String>,
}

impl GeminiClient {
    pub fn new(ai: &AiSettings, network: &NetworkSettings) -> Result<Self, GeminiError> {
        Self::with_base_url(DEFAULT_BASE_URL, ai, network)
    }

    pub fn with_base_url(
        base: &str,
        ai: &AiSettings,
        network: &NetworkSettings,
    ) -> Result<Self, GeminiError> {
        let api_key = ai
            .api_key
            .clone()
            .filter(|key| !key.is_empty())
            .ok_or(GeminiError::MissingKey)?;
        if ai.models.is_empty() {
            return Err(GeminiError::NoModels);
        }
        let base_url = Url::parse(base)?;
        let http = http_client(network, ai.timeout())?;
        Ok(Self {
            http,
            base_url,
            api_key,
            models: ai.models.clone(),
        })
    }

    /// Sends `prompt` to each model in turn and returns the first answer.
    pub async fn generate(&self, prompt: &str) -> Result<String, GeminiError> {
        let mut last_error: Option<GeminiError> = None;
        for model in &self.models {
            match self.generate_with(model, prompt).await {
                Ok(text) => return Ok(text),
                Err(error) => {
                    log::warn!("[gemini] {model} failed: {error}; trying next model if available");
                    last_error = Some(error);
                }
            }
        }
        Err(last_error.unwrap_or(GeminiError::NoModels))
    }

    async fn generate_with(&self, model: &str, prompt: &str) -> Result<String, GeminiError> {
        let mut url = self.base_url.join(&format!("models/{model}:generateContent"))?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let body = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: Some(prompt.to_string()),
                }],
            }],
        };

        log::debug!("[gemini] requesting {model}");
        let response = self.http.post(url).json(&body).send().await?;
        let status = response.status();
        if !status.is_success() {
            let message = response
                .json::<ErrorEnvelope>()
                .await
                .ok()
                .and_then(|envelope| envelope.error)
                .and_then(|error| error.message)
                .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown").to_string());
            return Err(GeminiError::Api {
                model: model.to_string(),
                status,
                message,
            });
        }

        let payload: GenerateResponse = response.json().await?;
        payload
            .first_text()
            .ok_or_else(|| GeminiError::EmptyResponse(model.to_string()))
    }
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<Content>,
}

impl GenerateResponse {
    fn first_text(self) -> Option<String> {
        self.candidates
            .into_iter()
            .filter_map(|candidate| candidate.content)
            .flat_map(|content| content.parts)
            .filter_map(|part| part.text)
            .find(|text| !text.trim().is_empty())
    }
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    #[serde(default)]
    error: Option<ErrorBody>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    message: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;

    fn settings(models: &[&str]) -> AiSettings {
        AiSettings {
            api_key: Some("test-key".into()),
            models: models.iter().map(|m| m.to_string()).collect(),
            timeout_secs: 5,
        }
    }

    fn answer(text: &str) -> serde_json::Value {
        serde_json::json!({
            "candidates": [{
                "content": { "parts": [{ "text": text }], "role": "model" },
                "finishReason": "STOP"
            }]
        })
    }

    #[test]
    fn missing_key_is_rejected_up_front() {
        let ai = AiSettings {
            api_key: None,
            ..AiSettings::default()
        };
        assert!(matches!(
            GeminiClient::new(&ai, &NetworkSettings::default()),
            Err(GeminiError::MissingKey)
        ));
    }

    #[tokio::test]
    async fn returns_first_candidate_text() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/gemini-pro:generateContent")
                    .query_param("key", "test-key");
                then.status(200).json_body(answer("anchor, 7.5 kW"));
            })
            .await;

        let client = GeminiClient::with_base_url(
            &format!("{}/", server.base_url()),
            &settings(&["gemini-pro"]),
            &NetworkSettings::default(),
        )
        .unwrap();
        let text = client.generate("recommend an agitator").await.unwrap();

        assert_eq!(text, "anchor, 7.5 kW");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn falls_back_to_next_model() {
        let server = MockServer::start_async().await;
        let primary = server
            .mock_async(|when, then| {
                when.method(POST).path("/models/fast:generateContent");
                then.status(404).json_body(serde_json::json!({
                    "error": { "code": 404, "message": "model not found", "status": "NOT_FOUND" }
                }));
            })
            .await;
        let secondary = server
            .mock_async(|when, then| {
                when.method(POST).path("/models/steady:generateContent");
                then.status(200).json_body(answer("ok"));
            })
            .await;

        let client = GeminiClient::with_base_url(
            &format!("{}/", server.base_url()),
            &settings(&["fast", "steady"]),
            &NetworkSettings::default(),
        )
        .unwrap();

        assert_eq!(client.generate("hi").await.unwrap(), "ok");
        primary.assert_async().await;
        secondary.assert_async().await;
    }

    #[tokio::test]
    async fn reports_last_api_error_when_all_models_fail() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(403).json_body(serde_json::json!({
                    "error": { "code": 403, "message": "API key not valid" }
                }));
            })
            .await;

        let client = GeminiClient::with_base_url(
            &format!("{}/", server.base_url()),
            &settings(&["a", "b"]),
            &NetworkSettings::default(),
        )
        .unwrap();

        match client.generate("hi").await {
            Err(GeminiError::Api { model, message, .. }) => {
                assert_eq!(model, "b");
                assert_eq!(message, "API key not valid");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_candidates_are_an_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST);
                then.status(200).json_body(serde_json::json!({ "candidates": [] }));
            })
            .await;

        let client = GeminiClient::with_base_url(
            &format!("{}/", server.base_url()),
            &settings(&["gemini-pro"]),
            &NetworkSettings::default(),
        )
        .unwrap();

        assert!(matches!(
            client.generate("hi").await,
            Err(GeminiError::EmptyResponse(_))
        ));
    }
}
