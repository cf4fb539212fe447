//! Assembly of the payload the backend's `/chat/send` endpoint expects.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The case fields the system prompt is written from.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CaseContext {
    #[serde(default, deserialize_with = "lenient_string")]
    pub issue_type: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location_city: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub location_state: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub situation_description: String,
}

fn lenient_string<'de, D>(de: D) -> Result<String, D::Error>
where
    D: serde::Deserializer<'de>,
{
    Ok(match Value::deserialize(de)? {
        Value::Null => String::new(),
        Value::String(s) => s,
        other => other.to_string(),
    })
}

impl CaseContext {
    /// Read case fields from a backend case record, unwrapping `data` when
    /// the record is still wrapped in its response envelope.
    pub fn from_record(record: &Value) -> Option<Self> {
        let inner = match record.get("data") {
            Some(data) if data.is_object() => data,
            _ => record,
        };
        if !inner.is_object() {
            return None;
        }
        serde_json::from_value(inner.clone()).ok()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Base64Source {
    #[serde(rename = "type")]
    pub kind: String,
    pub media_type: String,
    pub data: String,
}

impl Base64Source {
    pub fn new(media_type: impl Into<String>, data: impl Into<String>) -> Self {
        Self {
            kind: "base64".to_string(),
            media_type: media_type.into(),
            data: data.into(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentBlock {
    Text { text: String },
    Image { source: Base64Source },
    Document { source: Base64Source },
}

impl ContentBlock {
    /// An `image` block for image media types, a `document` block otherwise.
    pub fn attachment(media_type: &str, data: String) -> Self {
        let source = Base64Source::new(media_type, data);
        if media_type.starts_with("image/") {
            ContentBlock::Image { source }
        } else {
            ContentBlock::Document { source }
        }
    }

    pub fn is_image(&self) -> bool {
        matches!(self, ContentBlock::Image { .. })
    }
}

/// Message content is either plain text or a list of blocks.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
pub enum MessageContent {
    Text(String),
    Blocks(Vec<ContentBlock>),
    Other(Value),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: MessageContent,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ChatPayload {
    pub all_case_id: Value,
    pub message: String,
    pub system_prompt: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub feedback_id: Option<Value>,
}

/// Whether the conversation is ordinary case chat or a reply to feedback
/// about how the opposing party responded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PromptKind {
    Case,
    Feedback,
}

const DISCLAIMER: &str = "Always remind users this is educational information, not legal advice, and they should consult a licensed attorney for specific legal matters.";

pub fn system_prompt(case: &CaseContext, kind: PromptKind, images: usize) -> String {
    let mut prompt = format!(
        "You are a legal assistant helping with a {} case in {}, {}.\n\nCase Details:\n{}\n\n",
        case.issue_type, case.location_city, case.location_state, case.situation_description
    );

    let subject = match kind {
        PromptKind::Case => "this case",
        PromptKind::Feedback => {
            prompt.push_str(
                "The user has just provided feedback about how the opposing party responded to their previous action. \
                 Analyze this response carefully and provide specific, actionable next steps based on:\n\
                 1. The type of response received\n\
                 2. The legal context and jurisdiction\n\
                 3. Timeline considerations\n\
                 4. Potential outcomes and strategies\n\n",
            );
            "this feedback"
        }
    };

    if images > 0 {
        prompt.push_str(&format!(
            "The user has uploaded {images} image(s) related to {subject}. \
             Analyze them carefully and reference specific details you see in the images.\n\n"
        ));
    }

    match kind {
        PromptKind::Case => prompt.push_str("Provide helpful, accurate legal information. "),
        PromptKind::Feedback => {
            prompt.push_str("Provide clear, practical guidance about what the user should do next. ")
        }
    }
    prompt.push_str(DISCLAIMER);
    prompt
}

/// Keep only `role` and `content` from each history entry; entries without
/// a role are dropped.
pub fn history_from_value(history: Option<&Value>) -> Vec<ChatMessage> {
    let Some(Value::Array(items)) = history else {
        return Vec::new();
    };
    items
        .iter()
        .filter_map(|item| {
            let role = item.get("role")?.as_str()?.to_string();
            let content = match item.get("content") {
                Some(Value::String(s)) => MessageContent::Text(s.clone()),
                Some(v) => serde_json::from_value(v.clone())
                    .map(MessageContent::Blocks)
                    .unwrap_or_else(|_| MessageContent::Other(v.clone())),
                None => MessageContent::Text(String::new()),
            };
            Some(ChatMessage { role, content })
        })
        .collect()
}

/// Build the full `/chat/send` payload. `attachments` are placed ahead of the
/// text block in the final user turn.
pub fn build_payload(
    all_case_id: Value,
    message: &str,
    case: &CaseContext,
    history: Vec<ChatMessage>,
    attachments: Vec<ContentBlock>,
    feedback_id: Option<Value>,
) -> ChatPayload {
    let images = attachments.iter().filter(|b| b.is_image()).count();
    let kind = if feedback_id.is_some() {
        PromptKind::Feedback
    } else {
        PromptKind::Case
    };

    let mut blocks = attachments;
    blocks.push(ContentBlock::Text {
        text: message.to_string(),
    });

    let mut messages = history;
    messages.push(ChatMessage {
        role: "user".to_string(),
        content: MessageContent::Blocks(blocks),
    });

    ChatPayload {
        all_case_id,
        message: message.to_string(),
        system_prompt: system_prompt(case, kind, images),
        messages,
        feedback_id,
    }
}
