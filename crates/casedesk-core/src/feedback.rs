//! Feedback records describe how the opposing party responded to an action
//! the user took. A pending record is turned into a chat message so the
//! assistant can suggest next steps.

use chrono::{DateTime, Datelike, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResponseType {
    Complied,
    PartialCompliance,
    Refused,
    NoResponse,
    CounterOffer,
}

impl ResponseType {
    pub fn label(self) -> &'static str {
        match self {
            ResponseType::Complied => "Complied",
            ResponseType::PartialCompliance => "Partial Compliance",
            ResponseType::Refused => "Refused",
            ResponseType::NoResponse => "No Response",
            ResponseType::CounterOffer => "Counter-offer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        serde_json::from_value(Value::String(s.to_string())).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeedbackDocument {
    pub id: Value,
    #[serde(default, alias = "mime_type")]
    pub media_type: Option<String>,
    #[serde(default)]
    pub original_name: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Feedback {
    pub id: Value,
    #[serde(default)]
    pub response_type: String,
    #[serde(default)]
    pub response_date: Option<String>,
    #[serde(default)]
    pub action_taken_date: Option<String>,
    #[serde(default)]
    pub response_description: String,
    #[serde(default)]
    pub documents: Vec<FeedbackDocument>,
    #[serde(default)]
    pub sent_to_chat: Option<Value>,
}

impl Feedback {
    /// Extract the record from a `pending-feedback` response. `Ok(None)`
    /// when the backend reports nothing pending or `success` is not true; an
    /// error when a record is present but malformed.
    pub fn from_pending_response(body: &Value) -> Result<Option<Self>> {
        let accepted = body.get("success").and_then(Value::as_bool).unwrap_or(false);
        let data = match body.get("data") {
            Some(data) if accepted && !data.is_null() => data,
            _ => return Ok(None),
        };
        Ok(Some(serde_json::from_value(data.clone())?))
    }

    fn response_label(&self) -> String {
        ResponseType::parse(&self.response_type)
            .map(|t| t.label().to_string())
            .unwrap_or_else(|| self.response_type.clone())
    }
}

/// Render a date as `M/D/YYYY`. Unparseable input is returned as given.
pub fn short_date(raw: &str) -> String {
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.date_naive())
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%d %H:%M:%S").map(|dt| dt.date()))
        .or_else(|_| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date()))
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"));
    match date {
        Ok(d) => format!("{}/{}/{}", d.month(), d.day(), d.year()),
        Err(_) => raw.to_string(),
    }
}

pub fn build_feedback_message(feedback: &Feedback) -> String {
    let mut message = String::from("📋 **Response Feedback Update**\n\n");
    message.push_str(&format!("**Response Type:** {}\n", feedback.response_label()));
    if let Some(date) = &feedback.response_date {
        message.push_str(&format!("**Response Date:** {}\n", short_date(date)));
    }
    if let Some(date) = feedback.action_taken_date.as_deref().filter(|d| !d.is_empty()) {
        message.push_str(&format!("**Original Action Date:** {}\n", short_date(date)));
    }

    message.push_str(&format!("\n**Details:**\n{}\n", feedback.response_description));

    if !feedback.documents.is_empty() {
        message.push_str(&format!(
            "\n**Attached Documents:** {} file(s)\n",
            feedback.documents.len()
        ));
    }

    message.push_str("\nBased on this response, what should be my next steps?");
    message
}
