use serde::{Deserialize, Serialize};

use crate::vault::{SeedAttributes, VaultKind};

/// A vault as listed: its identity and the file it lives in.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct VaultInfo {
    pub name: String,
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultList {
    pub vaults: Vec<VaultInfo>,
}

/// A parsed vault document, read fresh from disk.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VaultContent {
    pub name: String,
    pub content: serde_json::Value,
}

/// The seeds a vault exposes, in display order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedList {
    pub name: String,
    pub kind: VaultKind,
    pub seeds: Vec<String>,
}

/// A single seed resolved out of its vault.
///
/// `container` is the mapping the seed was found in (`components`,
/// `api_routes`, ...) or `None` for top-level entries like `auth_model`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SeedDetail {
    pub vault: String,
    pub name: String,
    pub container: Option<String>,
    pub attributes: SeedAttributes,
    pub raw: serde_json::Value,
}
