use serde::{Deserialize, Serialize};

/// A decision as listed, newest first.
///
/// `summary` is the document's `summary` field when it parses and has one.
/// `latest` marks the first entry of the descending listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct DecisionInfo {
    pub id: String,
    pub file: String,
    pub summary: Option<String>,
    #[serde(default)]
    pub latest: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionList {
    pub decisions: Vec<DecisionInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DecisionContent {
    pub id: String,
    pub content: serde_json::Value,
}
