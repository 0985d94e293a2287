use std::sync::Arc;

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;
use shared::{
    domain::{FetchKind, NarrativeBlock, RequestDescriptor, StateFragment},
    events::StoreEvent,
    query::QueryParams,
};
use tokio::sync::{broadcast, Mutex};
use tracing::{error, info, warn};

pub mod config;
pub mod error;
mod fetch;
pub mod source;

pub use source::{FetchTarget, FixedPathSource, RemoteSource, SourceResolver};

const DEPRECATED_SECOND_TREE_KEY: &str = "tt";
const NARRATIVE_STEP_KEY: &str = "n";
const NARRATIVE_PATH_MARKER: &str = "narratives";
const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Builds application state from fetched payloads. This is the seam to the
/// rest of the application: the loader acquires data, the builder interprets
/// it. A builder failure on the primary chain is fatal to that load session.
pub trait StateBuilder: Send + Sync {
    /// Full state from a freshly fetched dataset payload.
    fn state_from_dataset(
        &self,
        json: &Value,
        query: &QueryParams,
        narrative: Option<&[NarrativeBlock]>,
    ) -> Result<StateFragment>;

    /// Merged state fragment from a second tree against the current state.
    fn state_for_second_tree(
        &self,
        tree: &Value,
        current: &StateFragment,
        segment: &str,
    ) -> Result<StateFragment>;
}

/// State builder that passes fetched payloads through untouched, for shells
/// that derive their view state downstream of the event stream.
pub struct PassthroughStateBuilder;

impl StateBuilder for PassthroughStateBuilder {
    fn state_from_dataset(
        &self,
        json: &Value,
        _query: &QueryParams,
        _narrative: Option<&[NarrativeBlock]>,
    ) -> Result<StateFragment> {
        Ok(StateFragment(json.clone()))
    }

    fn state_for_second_tree(
        &self,
        tree: &Value,
        _current: &StateFragment,
        _segment: &str,
    ) -> Result<StateFragment> {
        Ok(StateFragment(tree.clone()))
    }
}

struct LoaderState {
    loaded: bool,
    current: Option<StateFragment>,
}

/// Client-side data-loading orchestrator.
///
/// Sequences the dependent fetches behind one dataset view: optional
/// narrative resolution, the primary dataset fetch, and the non-critical
/// secondary fetches (tip frequencies, available-dataset list, second tree).
/// All outcomes are emitted as [`StoreEvent`]s on a broadcast channel.
pub struct DatasetClient {
    http: Client,
    resolver: Arc<dyn SourceResolver>,
    state_builder: Arc<dyn StateBuilder>,
    server_address: String,
    inner: Mutex<LoaderState>,
    events: broadcast::Sender<StoreEvent>,
}

impl DatasetClient {
    pub fn new(
        server_address: impl Into<String>,
        resolver: Arc<dyn SourceResolver>,
        state_builder: Arc<dyn StateBuilder>,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Arc::new(Self {
            http: Client::new(),
            resolver,
            state_builder,
            server_address: server_address.into().trim_end_matches('/').to_string(),
            inner: Mutex::new(LoaderState {
                loaded: false,
                current: None,
            }),
            events,
        })
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<StoreEvent> {
        self.events.subscribe()
    }

    fn emit(&self, event: StoreEvent) {
        let _ = self.events.send(event);
    }

    /// Loads the dataset denoted by a location pathname and raw search string.
    ///
    /// Exactly one of `CleanStart` / `RedirectNotFound` is emitted per call.
    /// Secondary chains (tip frequencies, available list) continue in the
    /// background after this returns; their failures never affect the primary
    /// outcome. A second overlapping call does not cancel the first; both
    /// sessions run to completion and both emit their events.
    pub async fn load_dataset(self: &Arc<Self>, pathname: &str, search: &str) {
        if self.inner.lock().await.loaded {
            self.emit(StoreEvent::DataInvalid);
        }
        let query = QueryParams::parse(search);

        if pathname.contains(NARRATIVE_PATH_MARKER) {
            // The narrative document tells us which dataset to actually load.
            match self.resolve_narrative(pathname, &query).await {
                Ok((prefix, derived_query, blocks)) => {
                    self.fetch_dataset_and_emit(pathname, &prefix, derived_query, Some(blocks))
                        .await;
                }
                Err(err) => {
                    error!("narrative resolution failed path={pathname} err={err:#}");
                    self.emit(StoreEvent::RedirectNotFound {
                        message: format!("Couldn't load narrative for {pathname}"),
                    });
                }
            }
        } else {
            self.fetch_dataset_and_emit(pathname, pathname, query, None)
                .await;
        }
    }

    /// Fetches one additional tree and merges it against the already-loaded
    /// state for side-by-side comparison. Failures are logged and dropped;
    /// they never invalidate the primary dataset.
    pub async fn load_second_tree(&self, segment: &str, parts: &[String]) {
        let descriptor = RequestDescriptor::new(parts.join("/"), FetchKind::Tree);
        match self.second_tree_state(segment, &descriptor).await {
            Ok(state) => {
                self.emit(StoreEvent::TreeTooData {
                    segment: segment.to_string(),
                    state,
                });
            }
            Err(err) => {
                error!("failed to fetch additional tree segment={segment} err={err:#}");
            }
        }
    }

    async fn resolve_narrative(
        &self,
        pathname: &str,
        incoming: &QueryParams,
    ) -> Result<(String, QueryParams, Vec<NarrativeBlock>)> {
        let target = self
            .resolver
            .resolve(&RequestDescriptor::new(pathname, FetchKind::Narrative));
        let response = fetch::fetch_validated(&self.http, &target).await?;
        let document = fetch::decode_json(response, &target.url).await?;
        let blocks: Vec<NarrativeBlock> =
            serde_json::from_value(document).context("narrative document has unexpected shape")?;
        let first = blocks
            .first()
            .context("narrative document contains no blocks")?;

        // Block 0 carries its own query; an incoming step index wins over it.
        let mut derived = QueryParams::parse(&first.query);
        if let Some(step) = incoming.get_text(NARRATIVE_STEP_KEY) {
            derived.insert_text(NARRATIVE_STEP_KEY, step);
        }
        info!(
            "narrative resolved path={pathname} dataset={} blocks={}",
            first.dataset,
            blocks.len()
        );
        Ok((first.dataset.clone(), derived, blocks))
    }

    async fn fetch_dataset_and_emit(
        self: &Arc<Self>,
        pathname: &str,
        prefix: &str,
        query: QueryParams,
        narrative: Option<Vec<NarrativeBlock>>,
    ) {
        // Backwards compatibility with the deprecated tt=... second-tree
        // syntax: the rewrite rides on the fetch itself and the warning goes
        // out immediately, never waiting on the chain.
        let mut descriptor = RequestDescriptor::new(prefix, FetchKind::Main);
        if let Some(second_tree) = query.get_text(DEPRECATED_SECOND_TREE_KEY) {
            descriptor =
                descriptor.with_extra_query(format!("&deprecatedSecondTree={second_tree}"));
            self.emit(StoreEvent::Warning {
                message: format!(
                    "Specifying a second tree via \"tt={second_tree}\" is deprecated."
                ),
                details: "The URL has been updated to reflect the new syntax.".into(),
            });
        }

        match self.run_primary_chain(&descriptor, &query, narrative.as_deref()).await {
            Ok(wants_frequencies) => {
                if wants_frequencies {
                    self.spawn_frequencies_fetch(prefix);
                }
                self.spawn_available_fetch(pathname);
            }
            Err(err) => {
                warn!("dataset load failed prefix={prefix} err={err:#}");
                self.emit(StoreEvent::RedirectNotFound {
                    message: format!("Couldn't load JSONs for {prefix}"),
                });
            }
        }
    }

    async fn run_primary_chain(
        &self,
        descriptor: &RequestDescriptor,
        query: &QueryParams,
        narrative: Option<&[NarrativeBlock]>,
    ) -> Result<bool> {
        let target = self.resolver.resolve(descriptor);
        let response = fetch::fetch_validated(&self.http, &target).await?;
        // The server may have redirected us; the pathname shown to the user
        // should match what it actually served.
        let pathname_should_be = prefix_from_effective_url(response.url());
        let json = fetch::decode_json(response, &target.url).await?;
        let state = self
            .state_builder
            .state_from_dataset(&json, query, narrative)?;

        {
            let mut guard = self.inner.lock().await;
            guard.loaded = true;
            guard.current = Some(state.clone());
        }
        self.emit(StoreEvent::CleanStart {
            pathname_should_be,
            state,
        });
        Ok(advertises_frequencies(&json))
    }

    fn spawn_frequencies_fetch(self: &Arc<Self>, prefix: &str) {
        let descriptor = RequestDescriptor::new(prefix, FetchKind::TipFrequencies);
        let client = Arc::clone(self);
        tokio::spawn(async move {
            match client.fetch_json(&descriptor).await {
                Ok(data) => client.emit(StoreEvent::TipFrequenciesLoaded { data }),
                Err(err) => error!("tip frequencies failed to fetch: {err:#}"),
            }
        });
    }

    fn spawn_available_fetch(self: &Arc<Self>, pathname: &str) {
        // Fixed endpoint, deliberately outside the source resolver: the
        // available-dataset list always comes from the catalog server.
        let target = FetchTarget {
            url: format!("{}/getAvailable?prefix={pathname}", self.server_address),
        };
        let client = Arc::clone(self);
        tokio::spawn(async move {
            let data = async {
                let response = fetch::fetch_validated(&client.http, &target).await?;
                fetch::decode_json(response, &target.url).await
            }
            .await;
            match data {
                Ok(data) => client.emit(StoreEvent::SetAvailable { data }),
                Err(err) => warn!("available datasets fetch failed: {err:#}"),
            }
        });
    }

    async fn fetch_json(&self, descriptor: &RequestDescriptor) -> Result<Value> {
        let target = self.resolver.resolve(descriptor);
        let response = fetch::fetch_validated(&self.http, &target).await?;
        Ok(fetch::decode_json(response, &target.url).await?)
    }

    async fn second_tree_state(
        &self,
        segment: &str,
        descriptor: &RequestDescriptor,
    ) -> Result<StateFragment> {
        let json = self.fetch_json(descriptor).await?;
        let current = {
            let guard = self.inner.lock().await;
            guard.current.clone()
        }
        .context("no dataset loaded to merge the second tree into")?;
        // Tree documents usually wrap the tree under a "tree" field; accept
        // bare tree payloads as well.
        let tree = json.get("tree").unwrap_or(&json);
        self.state_builder
            .state_for_second_tree(tree, &current, segment)
    }
}

/// The `prefix` parameter of the effective (post-redirect) response URL.
fn prefix_from_effective_url(url: &reqwest::Url) -> Option<String> {
    url.query_pairs()
        .find(|(key, _)| key == "prefix")
        .map(|(_, value)| value.into_owned())
}

/// Whether the dataset payload advertises the frequencies panel.
fn advertises_frequencies(json: &Value) -> bool {
    json.get("meta")
        .and_then(|meta| meta.get("panels"))
        .and_then(Value::as_array)
        .is_some_and(|panels| panels.iter().any(|panel| panel.as_str() == Some("frequencies")))
}

#[cfg(test)]
#[path = "tests/lib_tests.rs"]
mod tests;
