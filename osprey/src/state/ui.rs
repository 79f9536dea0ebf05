//! UI artifact registries: append-only lists of displayable outputs.
//!
//! Capabilities append images, notebooks, runnable commands, HTML snippets
//! and files here; the respond node copies relevant artifacts into the
//! response envelope. Registries grow monotonically within a turn.

/// Kind tag for one artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArtifactKind {
    Image,
    Notebook,
    Command,
    Html,
    File,
}

impl ArtifactKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Image => "image",
            Self::Notebook => "notebook",
            Self::Command => "command",
            Self::Html => "html",
            Self::File => "file",
        }
    }
}

/// One artifact: kind, producing capability, timestamp, display metadata.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UiArtifact {
    pub kind: ArtifactKind,
    pub source_capability: String,
    /// ISO-8601 creation timestamp.
    pub created_at: String,
    /// Short display label (e.g. plot title, file name).
    pub label: String,
    /// Kind-specific payload (path, URL, command line, inline HTML).
    pub payload: serde_json::Value,
}

impl UiArtifact {
    pub fn new(
        kind: ArtifactKind,
        source_capability: impl Into<String>,
        label: impl Into<String>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            kind,
            source_capability: source_capability.into(),
            created_at: chrono::Utc::now().to_rfc3339(),
            label: label.into(),
            payload,
        }
    }
}

/// Append-only artifact registries, one list per kind.
#[derive(Debug, Clone, Default, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct UiRegistry {
    pub images: Vec<UiArtifact>,
    pub notebooks: Vec<UiArtifact>,
    pub commands: Vec<UiArtifact>,
    pub html: Vec<UiArtifact>,
    pub files: Vec<UiArtifact>,
}

impl UiRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an artifact to the registry matching its kind.
    pub fn push(&mut self, artifact: UiArtifact) {
        match artifact.kind {
            ArtifactKind::Image => self.images.push(artifact),
            ArtifactKind::Notebook => self.notebooks.push(artifact),
            ArtifactKind::Command => self.commands.push(artifact),
            ArtifactKind::Html => self.html.push(artifact),
            ArtifactKind::File => self.files.push(artifact),
        }
    }

    /// Appends all artifacts of `other`, preserving their order.
    pub fn extend(&mut self, other: &UiRegistry) {
        self.images.extend(other.images.iter().cloned());
        self.notebooks.extend(other.notebooks.iter().cloned());
        self.commands.extend(other.commands.iter().cloned());
        self.html.extend(other.html.iter().cloned());
        self.files.extend(other.files.iter().cloned());
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
            && self.notebooks.is_empty()
            && self.commands.is_empty()
            && self.html.is_empty()
            && self.files.is_empty()
    }

    /// Total artifact count across all kinds.
    pub fn len(&self) -> usize {
        self.images.len()
            + self.notebooks.len()
            + self.commands.len()
            + self.html.len()
            + self.files.len()
    }
}
