use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize, Serializer};
use std::fmt;

use crate::engine::error::EngineError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ResultStatus {
    Pending,
    Success,
    Failed,
    Skipped,
}

impl fmt::Display for ResultStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            ResultStatus::Pending => "PENDING",
            ResultStatus::Success => "SUCCESS",
            ResultStatus::Failed => "FAILED",
            ResultStatus::Skipped => "SKIPPED",
        };
        f.write_str(label)
    }
}

/// Outcome of one module execution; tasks and steps record into it.
///
/// Once an error is recorded the status is `Failed` and stays there.
#[derive(Debug, Clone, Serialize)]
pub struct ModuleResult {
    status: ResultStatus,
    message: String,
    #[serde(serialize_with = "serialize_errors")]
    errors: Vec<EngineError>,
    start_time: DateTime<Utc>,
    end_time: Option<DateTime<Utc>>,
}

impl ModuleResult {
    pub fn new() -> Self {
        Self {
            status: ResultStatus::Pending,
            message: String::new(),
            errors: Vec::new(),
            start_time: Utc::now(),
            end_time: None,
        }
    }

    pub fn status(&self) -> ResultStatus {
        self.status
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn errors(&self) -> &[EngineError] {
        &self.errors
    }

    pub fn start_time(&self) -> DateTime<Utc> {
        self.start_time
    }

    pub fn end_time(&self) -> Option<DateTime<Utc>> {
        self.end_time
    }

    pub fn add_error(&mut self, error: EngineError) {
        if self.errors.is_empty() {
            self.message = error.to_string();
        }
        self.errors.push(error);
        self.status = ResultStatus::Failed;
    }

    /// Set an explicit status. Ignored once the result has failed, so a
    /// result carrying errors never reports success or skipped.
    pub fn set_status(&mut self, status: ResultStatus, message: impl Into<String>) -> bool {
        if self.status == ResultStatus::Failed {
            return false;
        }
        self.status = status;
        self.message = message.into();
        true
    }

    pub fn is_failed(&self) -> bool {
        self.status == ResultStatus::Failed
    }

    pub fn is_skipped(&self) -> bool {
        self.status == ResultStatus::Skipped
    }

    pub fn combined_error(&self) -> Option<EngineError> {
        EngineError::combine(&self.errors)
    }

    /// Close the result: a still-pending result becomes a success
    pub fn finish(&mut self) {
        if self.status == ResultStatus::Pending {
            self.status = ResultStatus::Success;
            if self.message.is_empty() {
                self.message = "completed".to_string();
            }
        }
        self.end_time = Some(Utc::now());
    }
}

impl Default for ModuleResult {
    fn default() -> Self {
        Self::new()
    }
}

fn serialize_errors<S>(errors: &[EngineError], serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.collect_seq(errors.iter().map(ToString::to_string))
}
