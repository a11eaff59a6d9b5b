//! Application shell: the header title comes from the web manifest.

use color_eyre::{eyre::eyre, Result};
use serde::Deserialize;
use tracing::{debug, warn};

use crate::worker::{CacheStorage, Network, OfflineWorker, Request};

pub const FALLBACK_TITLE: &str = "Pocket Secrets";
pub const MANIFEST_PATH: &str = "/manifest.json";

#[derive(Debug, Deserialize)]
struct WebManifest {
  name: Option<String>,
  short_name: Option<String>,
}

/// App name from a web manifest body, preferring `name` over `short_name`.
pub fn manifest_name(body: &[u8]) -> Result<String> {
  let manifest: WebManifest =
    serde_json::from_slice(body).map_err(|e| eyre!("Failed to parse web manifest: {}", e))?;
  manifest
    .name
    .or(manifest.short_name)
    .map(|n| n.trim().to_string())
    .filter(|n| !n.is_empty())
    .ok_or_else(|| eyre!("Web manifest has no name"))
}

/// Fetch the manifest through the worker when one is registered, straight
/// from `network` otherwise.
pub async fn fetch_manifest_name<S, N>(
  worker: Option<&OfflineWorker<S, N>>,
  network: &N,
  request: &Request,
) -> Result<String>
where
  S: CacheStorage,
  N: Network,
{
  let response = match worker {
    Some(worker) => worker.fetch(request).await?,
    None => network.fetch(request).await?,
  };
  if !response.ok() {
    return Err(eyre!("Manifest request failed with status {}", response.status));
  }
  manifest_name(&response.body)
}

/// Header title: the configured override, else the manifest name, else
/// [`FALLBACK_TITLE`].
pub async fn resolve_title<S, N>(
  configured: Option<&str>,
  worker: Option<&OfflineWorker<S, N>>,
  network: &N,
  request: &Request,
) -> String
where
  S: CacheStorage,
  N: Network,
{
  if let Some(title) = configured {
    return title.to_string();
  }
  match fetch_manifest_name(worker, network, request).await {
    Ok(name) => {
      debug!(%name, "loaded shell title from manifest");
      name
    }
    Err(e) => {
      warn!("Could not load web manifest: {}", e);
      FALLBACK_TITLE.to_string()
    }
  }
}
