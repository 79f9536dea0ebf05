//! Approval policy evaluators.
//!
//! A configured mode per capability (with a global fallback) is mapped to a
//! boolean decision over a small set of operation features detected upstream
//! (writes, deletes, external I/O).

use std::collections::BTreeMap;

/// Approval mode for a capability category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApprovalMode {
    /// Never ask.
    Disabled,
    /// Ask when the operation looks risky (writes, deletes, or external I/O).
    #[default]
    Selective,
    /// Ask only for operations that write or delete.
    WritesOnly,
    /// Always ask.
    All,
}

impl std::str::FromStr for ApprovalMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "disabled" => Ok(Self::Disabled),
            "selective" => Ok(Self::Selective),
            "writes_only" => Ok(Self::WritesOnly),
            "all" | "all_capabilities" => Ok(Self::All),
            _ => Err(format!("unknown approval mode: {}", s)),
        }
    }
}

/// Operation features detected upstream (e.g. by static analysis of generated
/// code, or declared by the capability itself).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct OperationFeatures {
    pub writes: bool,
    pub deletes: bool,
    pub external_io: bool,
}

impl OperationFeatures {
    pub fn writes() -> Self {
        Self {
            writes: true,
            ..Default::default()
        }
    }

    pub fn read_only() -> Self {
        Self::default()
    }
}

/// Maps a mode and detected features to an approval decision.
pub fn approval_required(mode: ApprovalMode, features: &OperationFeatures) -> bool {
    match mode {
        ApprovalMode::Disabled => false,
        ApprovalMode::All => true,
        ApprovalMode::WritesOnly => features.writes || features.deletes,
        ApprovalMode::Selective => features.writes || features.deletes || features.external_io,
    }
}

/// Per-capability approval policy with a global fallback mode.
///
/// **Interaction**: built from the `approval.*` configuration section;
/// consulted by capabilities (via the runner) before risky operations.
#[derive(Debug, Clone, Default)]
pub struct ApprovalPolicy {
    pub global_mode: ApprovalMode,
    pub per_capability: BTreeMap<String, ApprovalMode>,
}

impl ApprovalPolicy {
    pub fn new(global_mode: ApprovalMode) -> Self {
        Self {
            global_mode,
            per_capability: BTreeMap::new(),
        }
    }

    pub fn with_capability_mode(mut self, capability: impl Into<String>, mode: ApprovalMode) -> Self {
        self.per_capability.insert(capability.into(), mode);
        self
    }

    /// Effective mode for a capability: per-capability override or global.
    pub fn mode_for(&self, capability: &str) -> ApprovalMode {
        self.per_capability
            .get(capability)
            .copied()
            .unwrap_or(self.global_mode)
    }

    /// Whether the capability needs approval for an operation with `features`.
    pub fn requires_approval(&self, capability: &str, features: &OperationFeatures) -> bool {
        approval_required(self.mode_for(capability), features)
    }
}
