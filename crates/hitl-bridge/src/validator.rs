// Copyright (C) 2025 SyncMyOrders Sp. z o.o.
// SPDX-License-Identifier: AGPL-3.0-or-later
//! Decision payload validation.
//!
//! Validates the raw request body structurally before anything is sent to
//! the engine. All violations are collected so the caller can fix the
//! request in one round-trip.

use std::fmt;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use utoipa::ToSchema;

/// Maximum workflow ID length accepted by the engine, in bytes.
pub const MAX_WORKFLOW_ID_LEN: usize = 1000;

static WORKFLOW_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z0-9][A-Za-z0-9._:@/-]*$").expect("workflow id pattern compiles")
});

static SIGNAL_NAME_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[A-Za-z_][A-Za-z0-9_.-]{0,127}$").expect("signal name pattern compiles")
});

/// Decision outcome delivered as the signal input.
///
/// `decision` is always lower case. Keys other than the typed ones are kept
/// in `extra` and forwarded untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct DecisionPayload {
    /// The decision, one of the configured allowed values.
    pub decision: String,
    /// Free-text justification.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    /// Who made the decision.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reviewer: Option<String>,
    /// Additional caller-defined fields.
    #[serde(flatten)]
    #[schema(value_type = Object)]
    pub extra: Map<String, Value>,
}

/// A validated, normalized decision request.
#[derive(Debug, Clone, PartialEq)]
pub struct DecisionRequest {
    /// Target workflow execution.
    pub workflow_id: String,
    /// Signal channel, defaulted when the caller gave none.
    pub signal_name: String,
    /// Decision outcome.
    pub payload: DecisionPayload,
}

/// Inbound body shape, for documentation only.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
#[allow(dead_code)]
pub struct DecisionBody {
    /// Target workflow ID.
    workflow_id: String,
    /// Signal channel; defaults to the configured channel.
    signal_name: Option<String>,
    /// Decision outcome.
    payload: DecisionPayload,
}

/// One rule a request broke.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// JSON path of the offending field.
    pub field: String,
    /// What is wrong with it.
    pub reason: String,
}

/// A decision request that failed validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Workflow ID, if one could be read from the request.
    pub workflow_id: Option<String>,
    /// Signal name, if one could be resolved.
    pub signal_name: Option<String>,
    /// Every rule the request broke.
    pub violations: Vec<Violation>,
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid decision request: ")?;
        for (i, v) in self.violations.iter().enumerate() {
            if i > 0 {
                write!(f, "; ")?;
            }
            write!(f, "{}: {}", v.field, v.reason)?;
        }
        Ok(())
    }
}

impl std::error::Error for ValidationError {}

/// Validates workflow identifiers.
///
/// Shared with the query service so describe requests follow the same rules.
pub fn validate_workflow_id(raw: &str) -> Result<String, String> {
    let id = raw.trim();
    if id.is_empty() {
        return Err("must not be empty".to_string());
    }
    if id.len() > MAX_WORKFLOW_ID_LEN {
        return Err(format!("must be at most {} bytes", MAX_WORKFLOW_ID_LEN));
    }
    if !WORKFLOW_ID_PATTERN.is_match(id) {
        return Err(
            "must start with a letter or digit and contain only letters, digits, and . _ : @ / -"
                .to_string(),
        );
    }
    Ok(id.to_string())
}

/// Validates and normalizes decision requests.
#[derive(Debug, Clone)]
pub struct DecisionValidator {
    default_signal: String,
    allowed_decisions: Vec<String>,
}

impl DecisionValidator {
    /// Create a validator.
    ///
    /// `allowed_decisions` are matched case-insensitively.
    pub fn new(default_signal: impl Into<String>, allowed_decisions: &[String]) -> Self {
        Self {
            default_signal: default_signal.into(),
            allowed_decisions: allowed_decisions
                .iter()
                .map(|d| d.trim().to_lowercase())
                .collect(),
        }
    }

    /// The channel used when a request names none.
    pub fn default_signal(&self) -> &str {
        &self.default_signal
    }

    /// Validate a raw JSON body.
    pub fn validate_bytes(&self, body: &[u8]) -> Result<DecisionRequest, ValidationError> {
        match serde_json::from_slice::<Value>(body) {
            Ok(value) => self.validate(&value),
            Err(e) => Err(ValidationError {
                workflow_id: None,
                signal_name: None,
                violations: vec![Violation {
                    field: "body".to_string(),
                    reason: format!("not valid JSON: {}", e),
                }],
            }),
        }
    }

    /// Validate a parsed JSON body.
    pub fn validate(&self, body: &Value) -> Result<DecisionRequest, ValidationError> {
        let mut violations = Vec::new();

        let Some(object) = body.as_object() else {
            return Err(ValidationError {
                workflow_id: None,
                signal_name: None,
                violations: vec![Violation {
                    field: "body".to_string(),
                    reason: "must be a JSON object".to_string(),
                }],
            });
        };

        let raw_workflow_id = field(object, "workflowId", "workflow_id");
        let workflow_id = match raw_workflow_id {
            None | Some(Value::Null) => {
                violations.push(violation("workflowId", "is required"));
                None
            }
            Some(Value::String(s)) => match validate_workflow_id(s) {
                Ok(id) => Some(id),
                Err(reason) => {
                    violations.push(violation("workflowId", &reason));
                    None
                }
            },
            Some(_) => {
                violations.push(violation("workflowId", "must be a string"));
                None
            }
        };

        let signal_name = match field(object, "signalName", "signal_name") {
            None | Some(Value::Null) => Some(self.default_signal.clone()),
            Some(Value::String(s)) if s.trim().is_empty() => Some(self.default_signal.clone()),
            Some(Value::String(s)) => {
                let name = s.trim();
                if SIGNAL_NAME_PATTERN.is_match(name) {
                    Some(name.to_string())
                } else {
                    violations.push(violation(
                        "signalName",
                        "must start with a letter or underscore and contain at most 128 letters, digits, and _ . -",
                    ));
                    None
                }
            }
            Some(_) => {
                violations.push(violation("signalName", "must be a string"));
                None
            }
        };

        let payload = match object.get("payload") {
            None | Some(Value::Null) => {
                violations.push(violation("payload", "is required"));
                None
            }
            Some(Value::Object(map)) => self.validate_payload(map, &mut violations),
            Some(_) => {
                violations.push(violation("payload", "must be a JSON object"));
                None
            }
        };

        match (workflow_id, signal_name, payload) {
            (Some(workflow_id), Some(signal_name), Some(payload)) if violations.is_empty() => {
                Ok(DecisionRequest {
                    workflow_id,
                    signal_name,
                    payload,
                })
            }
            (workflow_id, signal_name, _) => Err(ValidationError {
                // Echo what the caller sent even when it failed validation.
                workflow_id: workflow_id.or_else(|| {
                    raw_workflow_id
                        .and_then(Value::as_str)
                        .map(|s| s.trim().to_string())
                }),
                signal_name,
                violations,
            }),
        }
    }

    fn validate_payload(
        &self,
        map: &Map<String, Value>,
        violations: &mut Vec<Violation>,
    ) -> Option<DecisionPayload> {
        let before = violations.len();

        let decision = match map.get("decision") {
            None | Some(Value::Null) => {
                violations.push(violation("payload.decision", "is required"));
                None
            }
            Some(Value::String(s)) => {
                let normalized = s.trim().to_lowercase();
                if self.allowed_decisions.contains(&normalized) {
                    Some(normalized)
                } else {
                    violations.push(violation(
                        "payload.decision",
                        &format!("must be one of: {}", self.allowed_decisions.join(", ")),
                    ));
                    None
                }
            }
            Some(_) => {
                violations.push(violation("payload.decision", "must be a string"));
                None
            }
        };

        let comment = optional_string(map, "comment", violations);
        let reviewer = optional_string(map, "reviewer", violations);

        let extra: Map<String, Value> = map
            .iter()
            .filter(|(k, _)| !matches!(k.as_str(), "decision" | "comment" | "reviewer"))
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();

        if violations.len() > before {
            return None;
        }
        decision.map(|decision| DecisionPayload {
            decision,
            comment,
            reviewer,
            extra,
        })
    }
}

fn field<'a>(object: &'a Map<String, Value>, name: &str, alias: &str) -> Option<&'a Value> {
    object.get(name).or_else(|| object.get(alias))
}

fn violation(field: &str, reason: &str) -> Violation {
    Violation {
        field: field.to_string(),
        reason: reason.to_string(),
    }
}

fn optional_string(
    map: &Map<String, Value>,
    key: &str,
    violations: &mut Vec<Violation>,
) -> Option<String> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(Value::String(s)) => Some(s.clone()),
        Some(_) => {
            violations.push(violation(&format!("payload.{}", key), "must be a string"));
            None
        }
    }
}
