use thiserror::Error;

/// Failures on a dataset-loading chain.
///
/// On the primary chain any of these is fatal to the load session and surfaces
/// as a single redirect-to-error event. On secondary chains (tip frequencies,
/// available list, second tree) they are logged and dropped.
#[derive(Debug, Error)]
pub enum LoadError {
    /// The server answered, but not with 200 OK.
    #[error("server responded {status} for {url}")]
    Remote { status: reqwest::StatusCode, url: String },
    /// The request never produced a response (bad address, connection error).
    #[error("request for {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },
    /// The response body was not the structured payload we expected.
    #[error("failed to decode payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: reqwest::Error,
    },
}
