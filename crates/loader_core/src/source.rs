use std::collections::HashMap;

use shared::domain::{FetchKind, RequestDescriptor};

/// A ready-to-execute fetch address produced by a [`SourceResolver`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchTarget {
    pub url: String,
}

/// Decides where a requested dataset actually lives.
///
/// Resolution is pure composition and cannot fail; a nonsensical target
/// surfaces later as a fetch error on the chain that asked for it. The
/// resolver is chosen once at startup and injected into the client, so call
/// sites never branch on the source mode.
pub trait SourceResolver: Send + Sync {
    fn resolve(&self, request: &RequestDescriptor) -> FetchTarget;
}

/// Remote catalog source: composes addresses from a base API endpoint, the
/// request kind and the dataset prefix.
#[derive(Debug, Clone)]
pub struct RemoteSource {
    base: String,
}

impl RemoteSource {
    pub fn new(base: impl Into<String>) -> Self {
        Self {
            base: base.into().trim_end_matches('/').to_string(),
        }
    }
}

impl SourceResolver for RemoteSource {
    fn resolve(&self, request: &RequestDescriptor) -> FetchTarget {
        let endpoint = match request.kind {
            FetchKind::Narrative => "getNarrative",
            _ => "getDataset",
        };
        let prefix = request.prefix.trim_start_matches('/');
        let mut url = format!("{}/{}?prefix={}", self.base, endpoint, prefix);
        if let Some(fragment) = &request.extra_query {
            url.push_str(fragment);
        }
        match request.kind {
            FetchKind::TipFrequencies | FetchKind::Tree => {
                url.push_str("&type=");
                url.push_str(request.kind.key());
            }
            FetchKind::Main | FetchKind::Narrative => {}
        }
        FetchTarget { url }
    }
}

/// Fixed-path source: a single pre-registered dataset whose artifacts are
/// served from static addresses, keyed by fetch kind. The requested prefix is
/// ignored (single-dataset assumption).
#[derive(Debug, Clone, Default)]
pub struct FixedPathSource {
    paths: HashMap<String, String>,
}

impl FixedPathSource {
    pub fn new(paths: HashMap<String, String>) -> Self {
        Self { paths }
    }

    pub fn with_path(mut self, kind: FetchKind, address: impl Into<String>) -> Self {
        self.paths.insert(kind.key().to_string(), address.into());
        self
    }
}

impl SourceResolver for FixedPathSource {
    fn resolve(&self, request: &RequestDescriptor) -> FetchTarget {
        // A kind with no registered address resolves to an empty target,
        // which fails at fetch time on its own chain.
        let url = self.paths.get(request.kind.key()).cloned().unwrap_or_default();
        FetchTarget { url }
    }
}

#[cfg(test)]
#[path = "tests/source_tests.rs"]
mod tests;
