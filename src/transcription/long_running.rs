//! Long-running recognition against the Google Speech-to-Text v1 REST API.
//!
//! `speech:longrunningrecognize` returns an operation name; the backend polls
//! `operations/{name}` until it reports `done` and keeps the top alternative
//! of every result.

use super::backend::{
    AudioPayload, Cue, RecognitionConfig, ResultBody, TranscriptionBackend, TranscriptionRequest,
    TranscriptionResult,
};
use crate::error::{Result, TranscribeError};
use async_trait::async_trait;
use base64::{engine::general_purpose, Engine as _};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::time::Duration;

pub const DEFAULT_SPEECH_ENDPOINT: &str = "https://speech.googleapis.com/v1";

#[derive(Debug, Clone)]
pub struct LongRunningConfig {
    pub endpoint: String,
    /// OAuth access token sent as a bearer token.
    pub access_token: Option<String>,
    /// API key sent as the `key` query parameter.
    pub api_key: Option<String>,
    pub poll_interval: Duration,
}

impl Default for LongRunningConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_SPEECH_ENDPOINT.to_string(),
            access_token: None,
            api_key: None,
            poll_interval: Duration::from_secs(5),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WireConfig<'a> {
    encoding: &'a str,
    audio_channel_count: u16,
    language_code: &'a str,
}

#[derive(Debug, Default, Serialize)]
struct WireAudio {
    #[serde(skip_serializing_if = "Option::is_none")]
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    uri: Option<String>,
}

#[derive(Debug, Serialize)]
struct RecognizeRequest<'a> {
    config: WireConfig<'a>,
    audio: WireAudio,
}

#[derive(Debug, Deserialize)]
struct Operation {
    name: String,
    #[serde(default)]
    done: bool,
    error: Option<OperationError>,
    response: Option<RecognizeResponse>,
}

#[derive(Debug, Deserialize)]
struct OperationError {
    #[serde(default)]
    code: u16,
    #[serde(default)]
    message: String,
}

#[derive(Debug, Default, Deserialize)]
struct RecognizeResponse {
    #[serde(default)]
    results: Vec<RecognitionResult>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RecognitionResult {
    #[serde(default)]
    alternatives: Vec<Alternative>,
    result_end_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Alternative {
    #[serde(default)]
    transcript: String,
}

fn build_request<'a>(config: &'a RecognitionConfig, audio: &AudioPayload) -> RecognizeRequest<'a> {
    let audio = match audio {
        AudioPayload::InlineBytes { bytes, .. } => WireAudio {
            content: Some(general_purpose::STANDARD.encode(bytes)),
            uri: None,
        },
        AudioPayload::StagedUri(uri) => WireAudio {
            content: None,
            uri: Some(uri.clone()),
        },
    };
    RecognizeRequest {
        config: WireConfig {
            encoding: &config.encoding,
            audio_channel_count: config.channel_count,
            language_code: &config.language_code,
        },
        audio,
    }
}

/// Parse a protobuf JSON duration such as `"12.340s"` into milliseconds.
fn parse_duration_ms(value: &str) -> Option<u64> {
    let secs: f64 = value.trim().strip_suffix('s')?.parse().ok()?;
    if secs.is_finite() && secs >= 0.0 {
        Some((secs * 1000.0).round() as u64)
    } else {
        None
    }
}

/// Top alternative of every result, in order. A cue starts where the previous
/// result ended.
fn cues_from_response(response: RecognizeResponse) -> Vec<Cue> {
    let mut previous_end: u64 = 0;
    let mut cues = Vec::with_capacity(response.results.len());
    for result in response.results {
        let Some(top) = result.alternatives.into_iter().next() else {
            continue;
        };
        let end_ms = result.result_end_time.as_deref().and_then(parse_duration_ms);
        let start_ms = end_ms.map(|_| previous_end);
        if let Some(end) = end_ms {
            previous_end = end;
        }
        cues.push(Cue {
            text: top.transcript.trim().to_string(),
            start_ms,
            end_ms,
        });
    }
    cues
}

/// Turn a finished operation into cues, or its error into `BackendError`.
fn resolve_operation(operation: Operation) -> Result<Vec<Cue>> {
    if let Some(err) = operation.error {
        return Err(TranscribeError::BackendError {
            status: err.code,
            message: format!("operation {} failed: {}", operation.name, err.message),
        });
    }
    Ok(cues_from_response(operation.response.unwrap_or_default()))
}

fn transport_error(e: reqwest::Error) -> TranscribeError {
    TranscribeError::BackendError {
        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
        message: e.to_string(),
    }
}

pub struct GoogleSpeechBackend {
    client: reqwest::Client,
    config: LongRunningConfig,
}

impl GoogleSpeechBackend {
    pub fn new(config: LongRunningConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: LongRunningConfig) -> Self {
        Self { client, config }
    }

    fn authorize(&self, mut req: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        if let Some(ref token) = self.config.access_token {
            req = req.bearer_auth(token);
        }
        if let Some(ref key) = self.config.api_key {
            req = req.query(&[("key", key)]);
        }
        req
    }

    async fn send_for_operation(&self, req: reqwest::RequestBuilder) -> Result<Operation> {
        let response = self.authorize(req).send().await.map_err(transport_error)?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(TranscribeError::BackendError {
                status: status.as_u16(),
                message: body,
            });
        }
        response.json::<Operation>().await.map_err(transport_error)
    }

    async fn start(&self, request: &RecognizeRequest<'_>) -> Result<Operation> {
        let url = format!(
            "{}/speech:longrunningrecognize",
            self.config.endpoint.trim_end_matches('/')
        );
        debug!("[long-running] POST {}", url);
        self.send_for_operation(self.client.post(&url).json(request))
            .await
    }

    /// Block until the operation is done. No deadline: the service decides
    /// how long recognition takes.
    async fn wait(&self, mut operation: Operation) -> Result<Operation> {
        let url = format!(
            "{}/operations/{}",
            self.config.endpoint.trim_end_matches('/'),
            operation.name
        );
        let mut polls: u32 = 0;
        while !operation.done {
            tokio::time::sleep(self.config.poll_interval).await;
            polls += 1;
            debug!("[long-running] poll {} for {}", polls, operation.name);
            operation = self.send_for_operation(self.client.get(&url)).await?;
        }
        info!(
            "[long-running] operation {} finished after {} poll(s)",
            operation.name, polls
        );
        Ok(operation)
    }
}

#[async_trait]
impl TranscriptionBackend for GoogleSpeechBackend {
    fn id(&self) -> &'static str {
        "google-long-running"
    }

    fn name(&self) -> &'static str {
        "Google Speech-to-Text (long-running)"
    }

    async fn submit(&self, request: TranscriptionRequest) -> Result<TranscriptionResult> {
        let body = build_request(&request.config, &request.audio);
        let operation = self.start(&body).await?;
        info!("[long-running] started operation {}", operation.name);
        let finished = self.wait(operation).await?;
        let cues = resolve_operation(finished)?;
        Ok(TranscriptionResult {
            chunk_index: request.chunk_index,
            body: ResultBody::Cues(cues),
        })
    }
}
