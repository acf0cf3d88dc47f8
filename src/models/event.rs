use serde::{Deserialize, Serialize};

/// Which watched directory a change came from.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "kebab-case")]
pub enum ChangeKind {
    VaultUpdated,
    DecisionUpdated,
}

impl ChangeKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::VaultUpdated => "vault-updated",
            Self::DecisionUpdated => "decision-updated",
        }
    }
}

/// A transient "something changed, re-read it" notification.
///
/// Produced once per qualifying filesystem event and never persisted.
/// `file` is the bare file name (e.g. `frontend.yaml`), not a path.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ChangeEvent {
    pub kind: ChangeKind,
    pub file: String,
}

impl ChangeEvent {
    pub fn new(kind: ChangeKind, file: impl Into<String>) -> Self {
        Self {
            kind,
            file: file.into(),
        }
    }

    pub fn vault(file: impl Into<String>) -> Self {
        Self::new(ChangeKind::VaultUpdated, file)
    }

    pub fn decision(file: impl Into<String>) -> Self {
        Self::new(ChangeKind::DecisionUpdated, file)
    }

    /// The resource identity, i.e. the file name without its YAML extension.
    pub fn resource_name(&self) -> &str {
        crate::store::strip_yaml_extension(&self.file).unwrap_or(&self.file)
    }

    pub fn to_frame(&self) -> StreamFrame {
        let payload = FilePayload {
            file: self.file.clone(),
        };
        match self.kind {
            ChangeKind::VaultUpdated => StreamFrame::VaultUpdated(payload),
            ChangeKind::DecisionUpdated => StreamFrame::DecisionUpdated(payload),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FilePayload {
    pub file: String,
}

/// One `data:` frame on the push stream.
///
/// Serializes as `{"type":"connected"}` or
/// `{"type":"vault-updated","payload":{"file":"frontend.yaml"}}`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "payload", rename_all = "kebab-case")]
pub enum StreamFrame {
    Connected,
    VaultUpdated(FilePayload),
    DecisionUpdated(FilePayload),
}

impl StreamFrame {
    /// The change carried by this frame, or `None` for the `connected` marker.
    pub fn into_change(self) -> Option<ChangeEvent> {
        match self {
            Self::Connected => None,
            Self::VaultUpdated(p) => Some(ChangeEvent::vault(p.file)),
            Self::DecisionUpdated(p) => Some(ChangeEvent::decision(p.file)),
        }
    }
}
