//! OpenAI-compatible transcription API backend (whisper-1, Voxtral, open-asr-server, etc.)

use super::backend::{
    AudioPayload, ResultBody, TranscriptionBackend, TranscriptionRequest, TranscriptionResult,
};
use crate::error::{Result, TranscribeError};
use async_trait::async_trait;
use log::debug;

pub const DEFAULT_TRANSCRIPTIONS_URL: &str = "https://api.openai.com/v1/audio/transcriptions";

/// Configuration for remote transcription API.
#[derive(Debug, Clone)]
pub struct RemoteTranscriptionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: Option<String>,
    pub response_format: String,
}

impl RemoteTranscriptionConfig {
    pub fn new(base_url: String, model: String, api_key: Option<String>) -> Self {
        Self {
            base_url: base_url.trim().to_string(),
            model,
            api_key,
            response_format: "srt".to_string(),
        }
    }

    pub fn with_response_format(mut self, format: impl Into<String>) -> Self {
        self.response_format = format.into();
        self
    }
}

impl Default for RemoteTranscriptionConfig {
    fn default() -> Self {
        Self::new(
            DEFAULT_TRANSCRIPTIONS_URL.to_string(),
            "whisper-1".to_string(),
            None,
        )
    }
}

fn mime_for(file_name: &str) -> &'static str {
    let ext = file_name.rsplit('.').next().unwrap_or("").to_ascii_lowercase();
    match ext.as_str() {
        "wav" => "audio/wav",
        "mp3" => "audio/mpeg",
        "m4a" | "mp4" => "audio/mp4",
        "flac" => "audio/flac",
        "ogg" | "oga" => "audio/ogg",
        "webm" => "audio/webm",
        _ => "application/octet-stream",
    }
}

/// JSON formats carry the transcript in `text`; every other format is the
/// body itself.
fn extract_text(response_format: &str, body: &str) -> Result<String> {
    match response_format {
        "json" | "verbose_json" => {
            let json: serde_json::Value =
                serde_json::from_str(body).map_err(|e| TranscribeError::BackendError {
                    status: 200,
                    message: format!("unparseable response: {}", e),
                })?;
            Ok(json
                .get("text")
                .and_then(|v| v.as_str())
                .unwrap_or("")
                .to_string())
        }
        _ => Ok(body.to_string()),
    }
}

fn transport_error(e: reqwest::Error) -> TranscribeError {
    TranscribeError::BackendError {
        status: e.status().map(|s| s.as_u16()).unwrap_or(0),
        message: e.to_string(),
    }
}

/// Transcribe audio via OpenAI-compatible API.
/// POSTs to base_url (full endpoint, e.g. http://localhost:8000/v1/audio/transcriptions).
pub async fn transcribe_via_api(
    client: &reqwest::Client,
    config: &RemoteTranscriptionConfig,
    file_name: &str,
    bytes: Vec<u8>,
) -> Result<String> {
    let part = reqwest::multipart::Part::bytes(bytes)
        .file_name(file_name.to_string())
        .mime_str(mime_for(file_name))
        .map_err(|e| TranscribeError::InvalidRequest(e.to_string()))?;

    let form = reqwest::multipart::Form::new()
        .part("file", part)
        .text("model", config.model.clone())
        .text("response_format", config.response_format.clone());

    let mut req = client.post(&config.base_url).multipart(form);

    if let Some(ref key) = config.api_key {
        req = req.bearer_auth(key);
    }

    debug!("[whisper-api] POST {} file={}", config.base_url, file_name);
    let response = req.send().await.map_err(transport_error)?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(TranscribeError::BackendError {
            status: status.as_u16(),
            message: body,
        });
    }

    let body = response.text().await.map_err(transport_error)?;
    extract_text(&config.response_format, &body)
}

/// Inline-bytes backend: one synchronous request per chunk.
pub struct WhisperApiBackend {
    client: reqwest::Client,
    config: RemoteTranscriptionConfig,
}

impl WhisperApiBackend {
    pub fn new(config: RemoteTranscriptionConfig) -> Self {
        Self::with_client(reqwest::Client::new(), config)
    }

    pub fn with_client(client: reqwest::Client, config: RemoteTranscriptionConfig) -> Self {
        Self { client, config }
    }
}

#[async_trait]
impl TranscriptionBackend for WhisperApiBackend {
    fn id(&self) -> &'static str {
        "whisper-api"
    }

    fn name(&self) -> &'static str {
        "OpenAI-compatible transcription API"
    }

    async fn submit(&self, request: TranscriptionRequest) -> Result<TranscriptionResult> {
        let text = match request.audio {
            AudioPayload::InlineBytes { file_name, bytes } => {
                transcribe_via_api(&self.client, &self.config, &file_name, bytes).await?
            }
            AudioPayload::StagedUri(uri) => {
                return Err(TranscribeError::InvalidRequest(format!(
                    "{} only accepts inline audio, got uri {}",
                    self.id(),
                    uri
                )))
            }
        };
        Ok(TranscriptionResult {
            chunk_index: request.chunk_index,
            body: ResultBody::Text(text),
        })
    }
}

/// List available models from an OpenAI-compatible API.
/// GET {host}{models_path || "/v1/models"} with optional Bearer auth.
pub async fn list_models(
    host: &str,
    models_path: Option<&str>,
    api_key: Option<&str>,
) -> Result<Vec<String>> {
    let host = host.trim().trim_end_matches('/');
    let path = models_path
        .filter(|s| !s.trim().is_empty())
        .map(|s| {
            let s = s.trim();
            if s.starts_with('/') {
                s.to_string()
            } else {
                format!("/{}", s)
            }
        })
        .unwrap_or_else(|| "/v1/models".to_string());
    let url = format!("{}{}", host, path);

    let client = reqwest::Client::new();
    let mut req = client.get(&url);
    if let Some(key) = api_key {
        if !key.trim().is_empty() {
            req = req.bearer_auth(key.trim());
        }
    }

    let response = req.send().await.map_err(transport_error)?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(TranscribeError::BackendError {
            status: status.as_u16(),
            message: body,
        });
    }

    let json: serde_json::Value = response.json().await.map_err(transport_error)?;
    parse_model_ids(&json)
}

fn parse_model_ids(json: &serde_json::Value) -> Result<Vec<String>> {
    let data = json
        .get("data")
        .and_then(|v| v.as_array())
        .ok_or_else(|| TranscribeError::BackendError {
            status: 200,
            message: "Expected { data: [...] } in response".to_string(),
        })?;

    Ok(data
        .iter()
        .filter_map(|obj| obj.get("id").and_then(|v| v.as_str()).map(String::from))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::StubServer;
    use crate::transcription::RecognitionConfig;

    #[test]
    fn test_defaults_match_hosted_whisper() {
        let config = RemoteTranscriptionConfig::default();
        assert_eq!(config.model, "whisper-1");
        assert_eq!(config.response_format, "srt");
        assert_eq!(config.base_url, DEFAULT_TRANSCRIPTIONS_URL);
    }

    #[test]
    fn test_srt_body_is_returned_verbatim() {
        let body = "1\n00:00:00,000 --> 00:00:02,000\nשלום\n\n";
        assert_eq!(extract_text("srt", body).unwrap(), body);
    }

    #[test]
    fn test_json_body_yields_text_field() {
        assert_eq!(
            extract_text("json", r#"{"text": "hello"}"#).unwrap(),
            "hello"
        );
        assert!(extract_text("json", "not json").is_err());
    }

    #[test]
    fn test_mime_for_extension() {
        assert_eq!(mime_for("a_chunk_0.mp3"), "audio/mpeg");
        assert_eq!(mime_for("a_chunk_0.WAV"), "audio/wav");
        assert_eq!(mime_for("blob"), "application/octet-stream");
    }

    #[test]
    fn test_parse_model_ids() {
        let json = serde_json::json!({"data": [{"id": "whisper-1"}, {"object": "x"}, {"id": "voxtral"}]});
        assert_eq!(parse_model_ids(&json).unwrap(), vec!["whisper-1", "voxtral"]);
        assert!(parse_model_ids(&serde_json::json!({})).is_err());
    }

    #[tokio::test]
    async fn test_staged_uri_is_rejected_without_network() {
        let backend = WhisperApiBackend::new(RemoteTranscriptionConfig::default());
        let err = backend
            .submit(TranscriptionRequest::staged(
                "gs://bucket/a.flac",
                RecognitionConfig::default(),
            ))
            .await
            .unwrap_err();
        assert!(matches!(err, TranscribeError::InvalidRequest(_)));
    }

    fn config_for(server: &StubServer) -> RemoteTranscriptionConfig {
        RemoteTranscriptionConfig::new(
            format!("{}/v1/audio/transcriptions", server.base_url),
            "whisper-1".to_string(),
            Some("sk-test".to_string()),
        )
    }

    #[tokio::test]
    async fn test_inline_chunk_is_posted_as_multipart() {
        let srt = "1\n00:00:00,000 --> 00:00:02,000\nשלום\n\n";
        let server = StubServer::start(vec![(200, srt)]).await;
        let backend = WhisperApiBackend::new(config_for(&server));
        let request = TranscriptionRequest::inline(
            4,
            AudioPayload::InlineBytes {
                file_name: "talk_chunk_4.mp3".into(),
                bytes: b"ID3-audio".to_vec(),
            },
            RecognitionConfig::default(),
        );

        let result = backend.submit(request).await.unwrap();

        assert_eq!(result.chunk_index, Some(4));
        assert_eq!(result.body, ResultBody::Text(srt.to_string()));
        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].target, "/v1/audio/transcriptions");
        assert_eq!(requests[0].header("authorization"), Some("Bearer sk-test"));
        let form = requests[0].body_text();
        assert!(form.contains("filename=\"talk_chunk_4.mp3\""));
        assert!(form.contains("ID3-audio"));
        assert!(form.contains("whisper-1"));
        assert!(form.contains("name=\"response_format\""));
    }

    #[tokio::test]
    async fn test_error_status_becomes_backend_error() {
        let server = StubServer::start(vec![(401, r#"{"error": "invalid key"}"#)]).await;

        let err = transcribe_via_api(
            &reqwest::Client::new(),
            &config_for(&server),
            "a_chunk_0.wav",
            b"RIFF".to_vec(),
        )
        .await
        .unwrap_err();

        match err {
            TranscribeError::BackendError { status, message } => {
                assert_eq!(status, 401);
                assert!(message.contains("invalid key"));
            }
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_list_models_queries_models_path() {
        let server = StubServer::start(vec![
            (200, r#"{"data": [{"id": "whisper-1"}, {"id": "voxtral"}]}"#),
            (200, r#"{"data": []}"#),
        ])
        .await;

        let ids = list_models(&server.base_url, None, Some("sk-test")).await.unwrap();
        let custom = list_models(&format!("{}/", server.base_url), Some("models"), None)
            .await
            .unwrap();

        assert_eq!(ids, vec!["whisper-1", "voxtral"]);
        assert!(custom.is_empty());
        let requests = server.requests();
        assert_eq!(requests[0].target, "/v1/models");
        assert_eq!(requests[0].header("authorization"), Some("Bearer sk-test"));
        assert_eq!(requests[1].target, "/models");
        assert_eq!(requests[1].header("authorization"), None);
    }
}
