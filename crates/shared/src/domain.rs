use serde::{Deserialize, Serialize};

/// Which logical artifact a fetch asks the data source for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum FetchKind {
    Main,
    Narrative,
    TipFrequencies,
    Tree,
}

impl FetchKind {
    /// Stable key used both for fixed-path configuration lookups and as the
    /// remote `type` query qualifier.
    pub fn key(self) -> &'static str {
        match self {
            FetchKind::Main => "main",
            FetchKind::Narrative => "narrative",
            FetchKind::TipFrequencies => "tip-frequencies",
            FetchKind::Tree => "tree",
        }
    }
}

/// One logical dataset fetch, before source resolution. Immutable once built.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestDescriptor {
    /// Logical dataset name, e.g. "flu/h3n2". A leading slash is tolerated.
    pub prefix: String,
    pub kind: FetchKind,
    /// Raw query fragment appended verbatim to the resolved address,
    /// e.g. "&deprecatedSecondTree=na".
    pub extra_query: Option<String>,
}

impl RequestDescriptor {
    pub fn new(prefix: impl Into<String>, kind: FetchKind) -> Self {
        Self {
            prefix: prefix.into(),
            kind,
            extra_query: None,
        }
    }

    pub fn with_extra_query(mut self, fragment: impl Into<String>) -> Self {
        self.extra_query = Some(fragment.into());
        self
    }
}

/// Opaque application-state fragment produced by the state builder. The loader
/// never inspects it; it only carries it inside emitted events.
#[derive(Debug, Clone, PartialEq)]
pub struct StateFragment(pub serde_json::Value);

/// One step of a narrative document. Block 0 decides which dataset the
/// narrative actually displays first.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NarrativeBlock {
    pub dataset: String,
    #[serde(default)]
    pub query: String,
}
