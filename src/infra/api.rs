use crate::domain::{
    AnalysisConfig, AnalysisHistoryItem, AnalysisRequest, AnalysisResult, EntryPage, FileId,
    LogEntry, LogFile, RawAnalysisResponse, RawPagination, normalize,
};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("request to {path} failed: {message}")]
    Transport { path: String, message: String },

    #[error("{path} returned HTTP {status}{}", .message.as_deref().map(|m| format!(": {m}")).unwrap_or_default())]
    Status {
        path: String,
        status: u16,
        message: Option<String>,
    },

    #[error("failed to decode response from {path}: {message}")]
    Decode { path: String, message: String },
}

impl ApiError {
    /// The server-provided explanation, if the failure carried one.
    pub fn server_message(&self) -> Option<&str> {
        match self {
            Self::Status { message, .. } => message.as_deref(),
            Self::Transport { .. } | Self::Decode { .. } => None,
        }
    }

    /// Short text for banners and notices.
    pub fn user_message(&self) -> String {
        match self {
            Self::Status {
                message: Some(message),
                ..
            } => message.clone(),
            Self::Status { status, .. } => format!("The log service returned HTTP {status}."),
            Self::Transport { .. } => "Could not reach the log service.".to_string(),
            Self::Decode { .. } => {
                "The log service sent a response that could not be read.".to_string()
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
}

#[derive(Debug, Deserialize)]
struct EntriesBody {
    #[serde(default)]
    entries: Vec<LogEntry>,
    #[serde(default)]
    pagination: RawPagination,
}

#[derive(Debug, Deserialize)]
struct SuggestionsBody {
    #[serde(default)]
    suggestions: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct FilesBody {
    #[serde(default)]
    files: Vec<LogFile>,
}

#[derive(Debug, Deserialize)]
struct HistoryBody {
    #[serde(default)]
    history: Vec<AnalysisHistoryItem>,
}

/// Blocking client for the log-viewer backend. Each call is one round trip;
/// callers run it on a worker thread.
#[derive(Clone, Debug)]
pub struct BackendClient {
    base_url: String,
    agent: ureq::Agent,
}

impl BackendClient {
    pub fn new(base_url: &str, timeout: Duration) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            agent: make_agent(timeout),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn list_files(&self) -> Result<Vec<LogFile>, ApiError> {
        let body: FilesBody = self.get_json("/files", &[])?;
        Ok(body.files)
    }

    pub fn fetch_entries(
        &self,
        file_id: FileId,
        page: u64,
        per_page: u64,
    ) -> Result<EntryPage, ApiError> {
        let path = format!("/files/{file_id}/entries");
        let page = page.max(1).to_string();
        let per_page_text = per_page.to_string();
        let body: EntriesBody =
            self.get_json(&path, &[("page", page.as_str()), ("per_page", per_page_text.as_str())])?;
        Ok(entry_page_from_body(body, per_page))
    }

    pub fn fetch_suggestions(&self, file_id: FileId) -> Result<Vec<String>, ApiError> {
        let body: SuggestionsBody =
            self.get_json(&format!("/analysis/suggestions/{file_id}"), &[])?;
        Ok(body.suggestions)
    }

    pub fn fetch_config(&self) -> Result<AnalysisConfig, ApiError> {
        self.get_json("/analysis/config", &[])
    }

    pub fn fetch_history(&self, file_id: FileId) -> Result<Vec<AnalysisHistoryItem>, ApiError> {
        let body: HistoryBody = self.get_json(&format!("/analysis/history/{file_id}"), &[])?;
        Ok(body.history)
    }

    pub fn analyze(&self, request: &AnalysisRequest) -> Result<RawAnalysisResponse, ApiError> {
        let path = "/analysis/analyze";
        let url = self.url(path);
        debug!(%url, file_id = %request.file_id, chars = request.text.chars().count(), "POST");
        let result = self.agent.post(&url).send_json(request);
        read_response(path, result)
    }

    fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, ApiError> {
        let url = self.url(path);
        debug!(%url, ?query, "GET");
        let mut builder = self.agent.get(&url);
        for (key, value) in query {
            builder = builder.query(*key, *value);
        }
        read_response(path, builder.call())
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }
}

/// Runs one analysis round trip and resolves every outcome into a result.
pub fn run_analysis(client: &BackendClient, request: &AnalysisRequest) -> AnalysisResult {
    analysis_result_from(client.analyze(request))
}

pub fn analysis_result_from(outcome: Result<RawAnalysisResponse, ApiError>) -> AnalysisResult {
    match outcome {
        Ok(raw) => {
            let result = normalize(&raw);
            info!(outcome = result.label(), "analysis completed");
            result
        }
        Err(error) => {
            warn!(%error, "analysis request failed");
            AnalysisResult::failure(error.server_message())
        }
    }
}

fn make_agent(timeout: Duration) -> ureq::Agent {
    let config = ureq::Agent::config_builder()
        .timeout_global(Some(timeout))
        .http_status_as_error(false)
        .build();
    config.into()
}

fn read_response<T: DeserializeOwned>(
    path: &str,
    result: Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> Result<T, ApiError> {
    let mut response = result.map_err(|error| ApiError::Transport {
        path: path.to_string(),
        message: error.to_string(),
    })?;
    let status = response.status().as_u16();
    let body = response
        .body_mut()
        .read_to_string()
        .map_err(|error| ApiError::Transport {
            path: path.to_string(),
            message: error.to_string(),
        })?;
    decode_body(path, status, &body)
}

/// 2xx bodies decode into `T`; anything else becomes `ApiError::Status`
/// carrying the body's `error` string when there is one.
pub fn decode_body<T: DeserializeOwned>(path: &str, status: u16, body: &str) -> Result<T, ApiError> {
    if !(200..300).contains(&status) {
        let message = serde_json::from_str::<ErrorBody>(body)
            .ok()
            .and_then(|body| body.error)
            .filter(|message| !message.trim().is_empty());
        return Err(ApiError::Status {
            path: path.to_string(),
            status,
            message,
        });
    }

    serde_json::from_str(body).map_err(|error| ApiError::Decode {
        path: path.to_string(),
        message: error.to_string(),
    })
}

fn entry_page_from_body(body: EntriesBody, requested_per_page: u64) -> EntryPage {
    let mut raw = body.pagination;
    if raw.per_page == 0 {
        raw.per_page = requested_per_page;
    }
    EntryPage {
        entries: body.entries,
        pagination: raw.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{AnalysisPayload, GENERIC_FAILURE_MESSAGE, LogLevel};

    #[test]
    fn http_500_without_body_is_generic_failure() {
        let outcome = decode_body::<RawAnalysisResponse>("/analysis/analyze", 500, "");
        let error = outcome.as_ref().expect_err("status error");
        assert!(matches!(error, ApiError::Status { status: 500, message: None, .. }));

        assert_eq!(
            analysis_result_from(outcome),
            AnalysisResult::Failure {
                error_message: GENERIC_FAILURE_MESSAGE.to_string()
            }
        );
    }

    #[test]
    fn user_message_prefers_server_text() {
        let with_body = decode_body::<FilesBody>("/files", 404, r#"{"error":"File not found"}"#)
            .expect_err("status error");
        assert_eq!(with_body.user_message(), "File not found");

        let bare = decode_body::<FilesBody>("/files", 502, "<html>").expect_err("status error");
        assert_eq!(bare.user_message(), "The log service returned HTTP 502.");
    }

    #[test]
    fn non_2xx_with_error_body_surfaces_server_message() {
        let outcome = decode_body::<RawAnalysisResponse>(
            "/analysis/analyze",
            400,
            r#"{"error":"No text provided for analysis"}"#,
        );
        assert_eq!(
            analysis_result_from(outcome),
            AnalysisResult::Failure {
                error_message: "No text provided for analysis".to_string()
            }
        );
    }

    #[test]
    fn transport_error_is_generic_failure() {
        let outcome: Result<RawAnalysisResponse, ApiError> = Err(ApiError::Transport {
            path: "/analysis/analyze".to_string(),
            message: "connection refused".to_string(),
        });
        assert_eq!(
            analysis_result_from(outcome),
            AnalysisResult::failure(None)
        );
    }

    #[test]
    fn invalid_json_on_2xx_is_decode_error() {
        let outcome = decode_body::<RawAnalysisResponse>("/analysis/analyze", 200, "<html>");
        assert!(matches!(outcome, Err(ApiError::Decode { .. })));
        assert_eq!(analysis_result_from(outcome), AnalysisResult::failure(None));
    }

    #[test]
    fn success_envelope_normalizes() {
        let outcome = decode_body::<RawAnalysisResponse>(
            "/analysis/analyze",
            200,
            r###"{"success":true,"analysis":"## Summary","model":"deepseek-chat"}"###,
        );
        assert_eq!(
            analysis_result_from(outcome),
            AnalysisResult::Success {
                payload: AnalysisPayload::Narrative("## Summary".to_string())
            }
        );
    }

    #[test]
    fn entries_body_decodes_with_server_pagination() {
        let body: EntriesBody = decode_body(
            "/files/7/entries",
            200,
            r#"{
                "entries": [{"id":1,"line_number":1,"timestamp":null,"level":"ERROR","source":null,"message":"m","raw_line":"r"}],
                "pagination": {"page": 2, "pages": 99, "per_page": 50, "total": 120},
                "file": {"id": 7}
            }"#,
        )
        .expect("entries");
        let page = entry_page_from_body(body, 50);
        assert_eq!(page.entries[0].level, Some(LogLevel::Error));
        assert_eq!(page.pagination.pages, 3);
        assert_eq!(page.pagination.page, 2);
        assert_eq!(page.pagination.total, 120);
    }

    #[test]
    fn missing_per_page_falls_back_to_requested() {
        let body: EntriesBody = decode_body(
            "/files/7/entries",
            200,
            r#"{"entries": [], "pagination": {"page": 1, "total": 250}}"#,
        )
        .expect("entries");
        let page = entry_page_from_body(body, 100);
        assert_eq!(page.pagination.per_page, 100);
        assert_eq!(page.pagination.pages, 3);
    }

    #[test]
    fn status_error_display_includes_message() {
        let error = ApiError::Status {
            path: "/files/9/entries".to_string(),
            status: 404,
            message: Some("Not Found".to_string()),
        };
        assert_eq!(error.to_string(), "/files/9/entries returned HTTP 404: Not Found");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = BackendClient::new("http://127.0.0.1:5000/api/", Duration::from_secs(1));
        assert_eq!(client.base_url(), "http://127.0.0.1:5000/api");
        assert_eq!(client.url("/files"), "http://127.0.0.1:5000/api/files");
    }
}
