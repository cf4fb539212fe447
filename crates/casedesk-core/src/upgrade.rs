//! Plan-limit errors.
//!
//! When a free or lower-tier user hits a plan limit the backend answers with
//! `{ message, errors: { upgrade_required: true, current_plan, upgrade_to,
//! limit_details } }`. The browser expects that payload nested under `data`
//! so it can open the upgrade dialog instead of showing a generic error.

use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpgradeDetails {
    pub upgrade_required: Value,
    #[serde(default)]
    pub current_plan: Value,
    #[serde(default)]
    pub upgrade_to: Value,
    #[serde(default)]
    pub limit_details: Value,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UpgradePrompt {
    pub success: bool,
    pub message: Value,
    pub data: UpgradeDetails,
}

fn truthy(v: &Value) -> bool {
    match v {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}

/// Returns the restructured prompt when `body` is an upgrade-required error.
pub fn upgrade_prompt(body: &Value) -> Option<UpgradePrompt> {
    let errors = body.get("errors")?;
    let flag = errors.get("upgrade_required")?;
    if !truthy(flag) {
        return None;
    }
    let field = |k: &str| errors.get(k).cloned().unwrap_or(Value::Null);
    Some(UpgradePrompt {
        success: false,
        message: body.get("message").cloned().unwrap_or(Value::Null),
        data: UpgradeDetails {
            upgrade_required: flag.clone(),
            current_plan: field("current_plan"),
            upgrade_to: field("upgrade_to"),
            limit_details: field("limit_details"),
        },
    })
}

/// Error bodies pass through unchanged unless they carry an upgrade prompt.
pub fn reshape_error_body(body: Value) -> Value {
    match upgrade_prompt(&body) {
        Some(prompt) => serde_json::to_value(prompt).unwrap_or(body),
        None => body,
    }
}

/// Human label for a plan slug, e.g. `pro_plus` → `Pro Plus`.
pub fn plan_label(plan: &str) -> String {
    match plan.to_ascii_lowercase().as_str() {
        "free" => "Free".to_string(),
        "pro" => "Pro".to_string(),
        "pro_plus" | "pro-plus" | "proplus" => "Pro Plus".to_string(),
        _ => plan
            .split('_')
            .filter(|w| !w.is_empty())
            .map(|w| {
                let mut chars = w.chars();
                match chars.next() {
                    Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
                    None => String::new(),
                }
            })
            .collect::<Vec<_>>()
            .join(" "),
    }
}
