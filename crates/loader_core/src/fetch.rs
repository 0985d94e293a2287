use reqwest::{Client, Response, StatusCode};

use crate::{error::LoadError, source::FetchTarget};

/// Executes one GET against a resolved target and validates the HTTP outcome.
///
/// The raw response is handed back rather than the decoded body so that the
/// caller can inspect response metadata, in particular the effective
/// post-redirect URL, before committing to decode.
pub(crate) async fn fetch_validated(
    http: &Client,
    target: &FetchTarget,
) -> Result<Response, LoadError> {
    let response = http
        .get(&target.url)
        .send()
        .await
        .map_err(|source| LoadError::Transport {
            url: target.url.clone(),
            source,
        })?;
    if response.status() != StatusCode::OK {
        return Err(LoadError::Remote {
            status: response.status(),
            url: target.url.clone(),
        });
    }
    Ok(response)
}

/// Decodes a validated response body as JSON.
pub(crate) async fn decode_json(
    response: Response,
    url: &str,
) -> Result<serde_json::Value, LoadError> {
    response.json().await.map_err(|source| LoadError::Decode {
        url: url.to_string(),
        source,
    })
}
