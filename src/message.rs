use serde::{Deserialize, Serialize};

use crate::page::{FillReport, Page};
use crate::profile::Profile;
use crate::{Error, Result};

/// Incoming request. Only the `autofill` action exists.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum AutofillRequest {
    Autofill {
        #[serde(default)]
        data: Profile,
    },
}

impl AutofillRequest {
    pub fn profile(&self) -> &Profile {
        match self {
            Self::Autofill { data } => data,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FillStatus {
    /// At least one field was written.
    Success,
    /// Fields were recognised but all already held their values.
    AlreadyFilled,
    NoFields,
}

impl FillStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::AlreadyFilled => "already_filled",
            Self::NoFields => "no_fields",
        }
    }
}

/// Whether the page is the top-level document or an embedded frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FrameContext {
    #[default]
    Top,
    Iframe,
}

impl FrameContext {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Top => "top",
            Self::Iframe => "iframe",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AutofillResponse {
    pub status: FillStatus,
    /// Fields written.
    pub count: usize,
    pub matched: usize,
    pub frame: FrameContext,
}

impl AutofillResponse {
    pub(crate) fn from_report(report: FillReport, frame: FrameContext) -> Self {
        Self {
            status: report.status(),
            count: report.filled_count,
            matched: report.matched_count,
            frame,
        }
    }
}

impl Page {
    pub fn handle_request(&mut self, request: &AutofillRequest) -> Result<AutofillResponse> {
        let report = self.autofill(request.profile())?;
        Ok(AutofillResponse::from_report(report, self.frame_context()))
    }

    /// Answers `autofill` messages. Messages carrying any other action, or
    /// none, are not for this page and yield `Ok(None)`.
    pub fn handle_message(&mut self, message: &serde_json::Value) -> Result<Option<AutofillResponse>> {
        if message.get("action").and_then(serde_json::Value::as_str) != Some("autofill") {
            return Ok(None);
        }
        let request = AutofillRequest::deserialize(message)
            .map_err(|err| Error::Message(format!("invalid autofill request: {err}")))?;
        self.handle_request(&request).map(Some)
    }

    pub fn handle_message_json(&mut self, json: &str) -> Result<Option<AutofillResponse>> {
        let message: serde_json::Value = serde_json::from_str(json)
            .map_err(|err| Error::Message(format!("invalid message json: {err}")))?;
        self.handle_message(&message)
    }
}
