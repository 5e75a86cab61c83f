//! Wire types for the subset of the Cloudflare v4 API the gateway uses.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Name given to every routing rule created through this service.
pub const RULE_NAME: &str = "Auto-generated via Email Manager";

/// Standard Cloudflare response envelope.
#[derive(Debug, Deserialize)]
pub(crate) struct ApiResponse<T> {
    #[serde(default)]
    pub success: bool,
    pub result: Option<T>,
    #[serde(default)]
    pub errors: Vec<ApiMessage>,
    /// Some endpoints report failures with a bare top-level message.
    #[serde(default)]
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ApiMessage {
    #[allow(dead_code)]
    #[serde(default)]
    pub code: Option<i64>,
    pub message: String,
}

/// A DNS zone as listed by Cloudflare.
///
/// Fields the dashboard does not interpret are carried through untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Zone {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct ZoneDetails {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct RuleCreated {
    pub id: String,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct CreateRuleRequest<'a> {
    pub enabled: bool,
    pub matchers: Vec<RuleMatcher<'a>>,
    pub actions: Vec<RuleAction<'a>>,
    pub name: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct RuleMatcher<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub field: &'a str,
    pub value: &'a str,
}

#[derive(Debug, Serialize, PartialEq)]
pub(crate) struct RuleAction<'a> {
    #[serde(rename = "type")]
    pub kind: &'a str,
    pub value: Vec<&'a str>,
}

impl<'a> CreateRuleRequest<'a> {
    /// An enabled rule forwarding mail sent to `full_email` to `destination`.
    pub fn forward(full_email: &'a str, destination: &'a str) -> Self {
        Self {
            enabled: true,
            matchers: vec![RuleMatcher {
                kind: "literal",
                field: "to",
                value: full_email,
            }],
            actions: vec![RuleAction {
                kind: "forward",
                value: vec![destination],
            }],
            name: RULE_NAME,
        }
    }
}
