//! Diffy API request and response types.
//!
//! Responses are kept as raw JSON maps by the resource snapshots; the records
//! here are the typed views of the few fields the SDK itself reads.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::{ApiError, Result};

/// Raw resource data as returned by the API.
pub type Data = Map<String, Value>;

/// Processing state shared by screenshot sets and diffs.
///
/// Screenshot sets walk through every state in order. Diffs only report
/// `Completed` and `Zipfile` as terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(try_from = "RawState")]
pub enum State {
    /// Work has not started.
    NotStarted,
    /// Actively in progress.
    Progress,
    /// Completed, but the "completed" event (notifications, webhooks) has
    /// not fired yet.
    Completed,
    /// The "completed" event fired; the zip file is being built.
    CompletedHookExecuted,
    /// The zip file is ready.
    Zipfile,
    /// A code this client does not know about.
    Unknown(i64),
}

impl State {
    /// The numeric code used on the wire.
    pub fn code(&self) -> i64 {
        match self {
            State::NotStarted => 0,
            State::Progress => 1,
            State::Completed => 2,
            State::CompletedHookExecuted => 3,
            State::Zipfile => 4,
            State::Unknown(code) => *code,
        }
    }
}

impl From<i64> for State {
    fn from(code: i64) -> Self {
        match code {
            0 => State::NotStarted,
            1 => State::Progress,
            2 => State::Completed,
            3 => State::CompletedHookExecuted,
            4 => State::Zipfile,
            other => State::Unknown(other),
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::NotStarted => write!(f, "not started"),
            State::Progress => write!(f, "in progress"),
            State::Completed => write!(f, "completed"),
            State::CompletedHookExecuted => write!(f, "completed (hooks executed)"),
            State::Zipfile => write!(f, "zip file ready"),
            State::Unknown(code) => write!(f, "unknown ({})", code),
        }
    }
}

/// The API sometimes encodes numbers as strings.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawState {
    Code(i64),
    Text(String),
}

impl TryFrom<RawState> for State {
    type Error = String;

    fn try_from(raw: RawState) -> std::result::Result<Self, Self::Error> {
        match raw {
            RawState::Code(code) => Ok(State::from(code)),
            RawState::Text(text) => text
                .trim()
                .parse::<i64>()
                .map(State::from)
                .map_err(|_| format!("invalid state '{}'", text)),
        }
    }
}

/// Environments that can be compared against each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Prod,
    Stage,
    Dev,
    Baseline,
}

impl Environment {
    /// All accepted environments, in the order the API documents them.
    pub const ALL: [Environment; 4] = [
        Environment::Prod,
        Environment::Stage,
        Environment::Dev,
        Environment::Baseline,
    ];

    /// The wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Prod => "prod",
            Environment::Stage => "stage",
            Environment::Dev => "dev",
            Environment::Baseline => "baseline",
        }
    }

    /// Parse the value of the named parameter, reporting the parameter name
    /// on failure.
    pub fn parse_field(field: &str, value: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|env| env.as_str() == value)
            .ok_or_else(|| {
                ApiError::invalid(format!(
                    "\"{}\" is not a valid environment. Can be one of: {}",
                    field,
                    join_names(Self::ALL.iter().map(Environment::as_str))
                ))
            })
    }
}

impl FromStr for Environment {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse_field(s, s)
    }
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Kinds of screenshot sets that can be created for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ScreenshotType {
    Production,
    Staging,
    Development,
    Custom,
    Upload,
}

impl ScreenshotType {
    pub const ALL: [ScreenshotType; 5] = [
        ScreenshotType::Production,
        ScreenshotType::Staging,
        ScreenshotType::Development,
        ScreenshotType::Custom,
        ScreenshotType::Upload,
    ];

    /// The wire name.
    pub fn as_str(&self) -> &'static str {
        match self {
            ScreenshotType::Production => "production",
            ScreenshotType::Staging => "staging",
            ScreenshotType::Development => "development",
            ScreenshotType::Custom => "custom",
            ScreenshotType::Upload => "upload",
        }
    }
}

impl FromStr for ScreenshotType {
    type Err = ApiError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == s)
            .ok_or_else(|| {
                ApiError::invalid(format!(
                    "\"{}\" is not a valid environment. Can be one of: {}",
                    s,
                    join_names(Self::ALL.iter().map(ScreenshotType::as_str))
                ))
            })
    }
}

impl fmt::Display for ScreenshotType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

/// Typed view of a screenshot set returned by `GET snapshots/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotRecord {
    /// Current processing state.
    #[serde(default)]
    pub state: Option<State>,
    /// Progress information. Anything other than an object reads as absent.
    #[serde(default, deserialize_with = "lenient_status")]
    pub status: Option<SnapshotStatus>,
}

fn lenient_status<'de, D>(deserializer: D) -> std::result::Result<Option<SnapshotStatus>, D::Error>
where
    D: serde::Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::Object(_) => Ok(serde_json::from_value(value).ok()),
        _ => Ok(None),
    }
}

/// The `status` object of a screenshot set.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SnapshotStatus {
    /// Server's estimate of the remaining work. Format is server defined.
    #[serde(default)]
    pub estimate: Option<Value>,
}

/// Typed view of a diff returned by `GET diffs/{id}`.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct DiffRecord {
    /// Current processing state.
    #[serde(default)]
    pub state: Option<State>,
}

/// Decode a typed record from raw resource data.
pub(crate) fn decode_record<T: serde::de::DeserializeOwned>(data: &Data) -> Result<T> {
    serde_json::from_value(Value::Object(data.clone()))
        .map_err(|e| ApiError::InvalidResponse(format!("Failed to parse response: {}", e)))
}

/// Interpret a response body as an object.
pub(crate) fn into_data(value: Value) -> Result<Data> {
    match value {
        Value::Object(map) => Ok(map),
        other => Err(ApiError::InvalidResponse(format!(
            "expected a JSON object, got: {}",
            other
        ))),
    }
}
