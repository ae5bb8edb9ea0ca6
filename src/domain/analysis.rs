use super::FileId;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

pub const GENERIC_FAILURE_MESSAGE: &str =
    "Analysis request failed: the analysis service could not be reached or returned no details.";

pub const DEFAULT_DEMO_SUMMARY: &str =
    "Demo mode: the analysis service has no credentials configured, so this result is illustrative only.";

#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct AnalysisRequest {
    pub text: String,
    pub file_id: FileId,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issue_description: Option<String>,
}

/// The `/analysis/analyze` envelope exactly as it arrives on the wire.
/// Mistyped fields degrade to absent instead of failing the whole decode.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawAnalysisResponse {
    #[serde(default, deserialize_with = "lenient_flag")]
    pub demo_mode: Option<bool>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub demo_analysis: Option<RawDemoAnalysis>,
    #[serde(default, deserialize_with = "lenient_flag")]
    pub success: Option<bool>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub error: Option<String>,
    #[serde(default)]
    pub analysis: Option<Value>,
}

#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
pub struct RawDemoAnalysis {
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub recommendations: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisResult {
    Demo { summary: String },
    Failure { error_message: String },
    Success { payload: AnalysisPayload },
}

impl AnalysisResult {
    /// A non-blank server message is kept exactly as sent.
    pub fn failure(message: Option<&str>) -> Self {
        let error_message = match message {
            Some(message) if !message.trim().is_empty() => message.to_string(),
            _ => GENERIC_FAILURE_MESSAGE.to_string(),
        };
        Self::Failure { error_message }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Demo { .. } => "demo",
            Self::Failure { .. } => "failure",
            Self::Success { .. } => "success",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AnalysisPayload {
    Narrative(String),
    Structured(StructuredAnalysis),
}

impl AnalysisPayload {
    /// Strings stay narrative, objects become structured; anything else is
    /// shown as its JSON text rather than rejected.
    pub fn from_value(value: &Value) -> Self {
        match value {
            Value::Null => Self::Narrative(String::new()),
            Value::String(text) => Self::Narrative(text.clone()),
            Value::Object(_) => match StructuredAnalysis::deserialize(value) {
                Ok(structured) => Self::Structured(structured),
                Err(_) => Self::Narrative(value.to_string()),
            },
            other => Self::Narrative(other.to_string()),
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Ord, PartialOrd)]
pub enum Severity {
    Critical,
    High,
    Medium,
    Low,
    Info,
}

#[derive(Clone, Debug, Eq, PartialEq)]
pub enum SeverityTag {
    Known(Severity),
    Other(String),
}

impl SeverityTag {
    pub fn parse(value: &str) -> Option<Self> {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            return None;
        }
        let known = match trimmed.to_ascii_lowercase().as_str() {
            "critical" => Some(Severity::Critical),
            "high" => Some(Severity::High),
            "medium" => Some(Severity::Medium),
            "low" => Some(Severity::Low),
            "info" => Some(Severity::Info),
            _ => None,
        };
        Some(match known {
            Some(severity) => Self::Known(severity),
            None => Self::Other(trimmed.to_string()),
        })
    }

    pub fn label(&self) -> &str {
        match self {
            Self::Known(Severity::Critical) => "critical",
            Self::Known(Severity::High) => "high",
            Self::Known(Severity::Medium) => "medium",
            Self::Known(Severity::Low) => "low",
            Self::Known(Severity::Info) => "info",
            Self::Other(value) => value.as_str(),
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct StructuredAnalysis {
    #[serde(default, deserialize_with = "lenient_string")]
    pub summary: Option<String>,
    #[serde(default, deserialize_with = "lenient_severity")]
    pub severity: Option<SeverityTag>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub issues: Vec<AnalysisIssue>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub recommendations: Vec<String>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub patterns: Vec<AnalysisPattern>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub root_cause: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub timeline: Option<String>,
    #[serde(default, deserialize_with = "lenient_object")]
    pub key_metrics: Option<KeyMetrics>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AnalysisIssue {
    #[serde(rename = "type", default, deserialize_with = "lenient_string")]
    pub kind: Option<String>,
    #[serde(default, deserialize_with = "lenient_severity")]
    pub severity: Option<SeverityTag>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub recommendation: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub time: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct AnalysisPattern {
    #[serde(default, deserialize_with = "lenient_string")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub frequency: Option<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub significance: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Deserialize)]
pub struct KeyMetrics {
    #[serde(default, deserialize_with = "lenient_count")]
    pub error_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_count")]
    pub warning_count: Option<u64>,
    #[serde(default, deserialize_with = "lenient_list")]
    pub unique_sources: Vec<String>,
    #[serde(default, deserialize_with = "lenient_string")]
    pub time_range: Option<String>,
}

impl KeyMetrics {
    pub fn is_empty(&self) -> bool {
        self.error_count.is_none()
            && self.warning_count.is_none()
            && self.unique_sources.is_empty()
            && self.time_range.is_none()
    }
}

/// Maps a raw envelope onto exactly one result variant.
///
/// Demo wins over everything, then a falsy `success` is a failure, and
/// only then is `analysis` passed through as the success payload.
pub fn normalize(raw: &RawAnalysisResponse) -> AnalysisResult {
    if raw.demo_mode.unwrap_or(false) {
        let summary = raw
            .demo_analysis
            .as_ref()
            .and_then(|demo| demo.summary.clone())
            .filter(|summary| !summary.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_DEMO_SUMMARY.to_string());
        return AnalysisResult::Demo { summary };
    }

    if !raw.success.unwrap_or(false) {
        return AnalysisResult::failure(raw.error.as_deref());
    }

    let payload = match raw.analysis.as_ref() {
        Some(value) => AnalysisPayload::from_value(value),
        None => AnalysisPayload::Narrative(String::new()),
    };
    AnalysisResult::Success { payload }
}

fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value))
}

/// Truthiness as a JavaScript client would see it.
fn lenient_flag<'de, D>(deserializer: D) -> Result<Option<bool>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        Value::Bool(flag) => Some(flag),
        Value::Number(number) => Some(number.as_f64().is_some_and(|n| n != 0.0)),
        Value::String(text) => Some(!text.is_empty()),
        Value::Array(_) | Value::Object(_) => Some(true),
    })
}

fn lenient_severity<'de, D>(deserializer: D) -> Result<Option<SeverityTag>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value).and_then(|text| SeverityTag::parse(&text)))
}

fn lenient_count<'de, D>(deserializer: D) -> Result<Option<u64>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Number(number) => number
            .as_u64()
            .or_else(|| number.as_f64().filter(|n| *n >= 0.0).map(|n| n as u64)),
        Value::String(text) => text.trim().parse::<u64>().ok(),
        _ => None,
    })
}

fn lenient_list<'de, D, T>(deserializer: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    let Value::Array(items) = value else {
        return Ok(Vec::new());
    };
    Ok(items
        .into_iter()
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn lenient_object<'de, D, T>(deserializer: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: DeserializeOwned,
{
    let value = Value::deserialize(deserializer)?;
    if !value.is_object() {
        return Ok(None);
    }
    Ok(serde_json::from_value(value).ok())
}

fn value_to_text(value: &Value) -> Option<String> {
    let text = match value {
        Value::Null => return None,
        Value::String(text) => text.clone(),
        Value::Number(number) => number.to_string(),
        Value::Bool(flag) => flag.to_string(),
        other => other.to_string(),
    };
    if text.trim().is_empty() {
        None
    } else {
        Some(text)
    }
}
