use serde_json::Value;

use crate::domain::StateFragment;

/// Events emitted by the loader toward the rest of the application.
///
/// Exactly one of `CleanStart` / `RedirectNotFound` is emitted per top-level
/// dataset load; everything else is secondary enrichment or advisory.
#[derive(Debug, Clone)]
pub enum StoreEvent {
    /// The currently shown dataset is stale; a new load has begun.
    DataInvalid,
    /// A freshly built application state, replacing everything shown so far.
    CleanStart {
        /// Canonical pathname reported by the server after redirects, when
        /// the effective response URL carried one.
        pathname_should_be: Option<String>,
        state: StateFragment,
    },
    /// The auxiliary tip-frequencies dataset for the current view.
    TipFrequenciesLoaded { data: Value },
    /// The server's list of available datasets for the current location.
    SetAvailable { data: Value },
    /// The load failed; the application should show its not-found view.
    RedirectNotFound { message: String },
    /// User-visible advisory, e.g. a deprecated-URL rewrite notice.
    Warning { message: String, details: String },
    /// A second tree merged against the already-loaded state.
    TreeTooData { segment: String, state: StateFragment },
}
