use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Lifecycle state shared by intents and their steps
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IntentStatus {
    Pending,
    Success,
    Failed,
}

impl IntentStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            IntentStatus::Pending => "pending",
            IntentStatus::Success => "success",
            IntentStatus::Failed => "failed",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "pending" => Some(IntentStatus::Pending),
            "success" => Some(IntentStatus::Success),
            "failed" => Some(IntentStatus::Failed),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, IntentStatus::Pending)
    }
}

impl std::fmt::Display for IntentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One action inside a multi-step intent
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentStep {
    pub action: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
}

/// Caller-submitted request.
///
/// Either the legacy single-step form (`action` + `params`) or the multi-step
/// form (`steps`). `id` and `created_at` are assigned by the service when absent.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intent {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub action: String,
    #[serde(default)]
    pub params: BTreeMap<String, String>,
    #[serde(default)]
    pub steps: Vec<IntentStep>,
    #[serde(default)]
    pub created_at: i64,
}

impl Intent {
    /// Resolve the ordered step list.
    ///
    /// An explicit `steps` list wins; otherwise a non-empty `action` becomes a
    /// one-step workflow. Returns an empty list when nothing is resolvable.
    pub fn normalized_steps(&self) -> Vec<IntentStep> {
        if !self.steps.is_empty() {
            return self.steps.clone();
        }
        if self.action.is_empty() {
            return Vec::new();
        }
        vec![IntentStep {
            action: self.action.clone(),
            params: self.params.clone(),
        }]
    }
}

/// Persisted intent row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentRecord {
    #[serde(rename = "intent_id")]
    pub id: String,
    pub status: IntentStatus,
    pub created_at: i64,
    #[serde(default)]
    pub message: String,
    /// JSON of the submitted intent, kept for audit and replay
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_intent: Option<String>,
}

/// Persisted step row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentStepRecord {
    pub intent_id: String,
    pub step_index: u32,
    pub action: String,
    pub status: IntentStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error_msg: Option<String>,
}

/// Intent record together with its ordered steps, as returned by status queries
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentState {
    #[serde(flatten)]
    pub record: IntentRecord,
    #[serde(default)]
    pub steps: Vec<IntentStepRecord>,
}

/// Outcome of a submission
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IntentResponse {
    pub status: IntentStatus,
    pub intent_id: String,
    pub message: String,
    /// Last transaction hash, for single-step callers
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tx_hash: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tx_hashes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failed_step_index: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Dry-run result
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SimulationResponse {
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_limit: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gas_price: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_cost: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SimulationResponse {
    pub fn invalid(error: impl Into<String>) -> Self {
        Self {
            valid: false,
            error: Some(error.into()),
            ..Default::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payment_params(recipient: &str, amount: &str) -> BTreeMap<String, String> {
        BTreeMap::from([
            ("recipient".to_string(), recipient.to_string()),
            ("amount".to_string(), amount.to_string()),
        ])
    }

    #[test]
    fn test_legacy_action_normalizes_to_single_step() {
        let intent = Intent {
            action: "payment".to_string(),
            params: payment_params("0x71C7656EC7ab88b098defB751B7401B5f6d8976F", "100"),
            ..Default::default()
        };
        let steps = intent.normalized_steps();
        assert_eq!(steps.len(), 1);
        assert_eq!(steps[0].action, "payment");
        assert_eq!(steps[0].params, intent.params);
    }

    #[test]
    fn test_explicit_steps_take_precedence() {
        let intent = Intent {
            action: "payment".to_string(),
            steps: vec![
                IntentStep { action: "a".into(), params: BTreeMap::new() },
                IntentStep { action: "b".into(), params: BTreeMap::new() },
            ],
            ..Default::default()
        };
        let actions: Vec<_> = intent.normalized_steps().into_iter().map(|s| s.action).collect();
        assert_eq!(actions, vec!["a", "b"]);
    }

    #[test]
    fn test_empty_intent_has_no_steps() {
        assert!(Intent::default().normalized_steps().is_empty());
    }

    #[test]
    fn test_deserialize_minimal_request() {
        let intent: Intent = serde_json::from_str(
            r#"{"action":"payment","params":{"recipient":"0xabc","amount":"1"}}"#,
        )
        .unwrap();
        assert!(intent.id.is_empty());
        assert_eq!(intent.created_at, 0);
        assert!(intent.steps.is_empty());
        assert_eq!(intent.params.get("amount").map(String::as_str), Some("1"));
    }

    #[test]
    fn test_status_round_trip() {
        for status in [IntentStatus::Pending, IntentStatus::Success, IntentStatus::Failed] {
            assert_eq!(IntentStatus::from_str(status.as_str()), Some(status));
        }
        assert_eq!(IntentStatus::from_str("confirmed"), None);
        assert!(!IntentStatus::Pending.is_terminal());
        assert!(IntentStatus::Failed.is_terminal());
    }

    #[test]
    fn test_failed_response_shape() {
        let response = IntentResponse {
            status: IntentStatus::Failed,
            intent_id: "abc".into(),
            message: "Execution halted at step 1: boom".into(),
            tx_hash: None,
            tx_hashes: vec![],
            failed_step_index: Some(0),
            error: Some("boom".into()),
        };
        let json = serde_json::to_value(&response).unwrap();
        assert_eq!(json["status"], "failed");
        assert_eq!(json["failed_step_index"], 0);
        assert!(json.get("tx_hash").is_none());
    }
}
