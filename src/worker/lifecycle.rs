use color_eyre::{eyre::eyre, Result};
use futures::future::join_all;
use reqwest::Method;
use std::collections::BTreeSet;
use tracing::{debug, error, info, warn};
use url::Url;

use super::clients::{ClickOutcome, Clients};
use super::network::Network;
use super::push::{Notification, NotificationSink, PushPayload};
use super::request::{Request, Response};
use super::store::CacheStorage;
use crate::backend::PasswordBackend;
use crate::config::Config;
use crate::sync::{MutationQueue, SyncReport, SYNC_TAG};

/// Static description of one worker version.
#[derive(Debug, Clone)]
pub struct WorkerOptions {
  /// Registration scope
  pub scope: String,
  pub prefix: String,
  /// Version token, part of the cache name
  pub version: String,
  pub origin: Url,
  /// Requests to this host are never intercepted
  pub api_host: String,
  /// Paths pre-cached on install, relative to `origin`
  pub manifest: Vec<String>,
}

impl WorkerOptions {
  pub fn from_config(config: &Config) -> Result<Self> {
    let origin =
      Url::parse(&config.origin).map_err(|e| eyre!("Invalid origin {}: {}", config.origin, e))?;

    Ok(Self {
      scope: "/".to_string(),
      prefix: config.cache.prefix.clone(),
      version: config.cache.version.clone(),
      origin,
      api_host: config.api_host()?,
      manifest: config.cache.manifest.clone(),
    })
  }

  pub fn cache_name(&self) -> String {
    self.cache_name_for(&self.version)
  }

  fn cache_name_for(&self, version: &str) -> String {
    format!("{}-{}", self.prefix, version)
  }

  /// Resolve `path` against the origin as a plain GET.
  pub fn request(&self, path: &str) -> Result<Request> {
    let url = self
      .origin
      .join(path)
      .map_err(|e| eyre!("Invalid asset path {}: {}", path, e))?;
    Ok(Request::get(url))
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerState {
  Uninstalled,
  Installing,
  Installed,
  Activating,
  Activated,
  /// Failed to install, or unregistered
  Redundant,
}

/// What activation did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivationReport {
  /// Old caches that were deleted
  pub purged: Vec<String>,
  /// Clients newly controlled by this version
  pub claimed: usize,
}

/// Why a request was left to the network untouched.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Passthrough {
  ApiRequest,
  NotControlled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheSource {
  Cache,
  Network,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchOutcome {
  Passthrough(Passthrough),
  Response(Response, CacheSource),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
  /// Not a tag this worker handles
  Ignored,
  Flushed(SyncReport),
}

/// One version of the offline worker over an explicit cache store.
pub struct OfflineWorker<S, N> {
  store: S,
  network: N,
  options: WorkerOptions,
  state: WorkerState,
  /// Version currently controlling clients, possibly an older one
  controller: Option<String>,
  skip_waiting: bool,
  clients: Clients,
  sync_tags: BTreeSet<String>,
}

impl<S: CacheStorage, N: Network> OfflineWorker<S, N> {
  pub fn new(store: S, network: N, options: WorkerOptions) -> Self {
    Self {
      store,
      network,
      options,
      state: WorkerState::Uninstalled,
      controller: None,
      skip_waiting: false,
      clients: Clients::default(),
      sync_tags: BTreeSet::new(),
    }
  }

  /// Pick up the persisted registration. If this version is already active
  /// the worker resumes as activated; otherwise it still needs installing.
  pub fn restore(&mut self) -> Result<()> {
    let active = self.store.active_version(&self.options.scope)?;

    if active.as_deref() == Some(self.options.version.as_str()) {
      debug!("[worker] resuming active version {}", self.options.version);
      self.state = WorkerState::Activated;
    } else {
      self.state = WorkerState::Uninstalled;
    }
    self.controller = active;
    Ok(())
  }

  pub fn state(&self) -> WorkerState {
    self.state
  }

  pub fn options(&self) -> &WorkerOptions {
    &self.options
  }

  /// Version controlling clients right now, if any.
  pub fn controller(&self) -> Option<&str> {
    self.controller.as_deref()
  }

  pub fn needs_install(&self) -> bool {
    self.state == WorkerState::Uninstalled
  }

  /// Set once install finishes; activation then proceeds without waiting
  /// for old clients to close.
  pub fn skip_waiting_requested(&self) -> bool {
    self.skip_waiting
  }

  #[cfg(test)]
  pub fn clients(&self) -> &Clients {
    &self.clients
  }

  /// Attach a client opened in this scope. It starts out controlled by the
  /// active version, if there is one.
  pub fn attach_client(&self, url: &str) -> Result<String> {
    self.clients.attach_controlled(url, self.controller.as_deref())
  }

  /// Fetch the manifest and store it in this version's cache.
  ///
  /// All or nothing: if any asset cannot be fetched with an OK status,
  /// nothing is stored and the worker becomes redundant.
  pub async fn install(&mut self) -> Result<()> {
    if self.state != WorkerState::Uninstalled {
      return Err(eyre!("Cannot install worker in state {:?}", self.state));
    }
    self.state = WorkerState::Installing;

    let cache_name = self.options.cache_name();
    info!("[install] caching app shell into {}", cache_name);

    match self.fetch_manifest().await {
      Ok(entries) => {
        if let Err(e) = self.store.put_all(&cache_name, &entries) {
          self.state = WorkerState::Redundant;
          return Err(e);
        }
        info!("[install] cached {} assets", entries.len());
        self.state = WorkerState::Installed;
        self.skip_waiting = true;
        Ok(())
      }
      Err(e) => {
        error!("[install] failed: {}", e);
        self.state = WorkerState::Redundant;
        Err(e)
      }
    }
  }

  async fn fetch_manifest(&self) -> Result<Vec<(Request, Response)>> {
    let requests = self
      .options
      .manifest
      .iter()
      .map(|path| self.options.request(path))
      .collect::<Result<Vec<_>>>()?;

    let responses = join_all(requests.iter().map(|r| self.network.fetch(r))).await;

    requests
      .into_iter()
      .zip(responses)
      .map(|(request, response)| {
        let response = response?;
        if !response.ok() {
          return Err(eyre!("{} returned status {}", request.url, response.status));
        }
        Ok((request, response))
      })
      .collect()
  }

  /// Delete every other cache, record this version as active and take
  /// control of all clients.
  pub fn activate(&mut self) -> Result<ActivationReport> {
    if self.state != WorkerState::Installed {
      return Err(eyre!("Cannot activate worker in state {:?}", self.state));
    }
    self.state = WorkerState::Activating;

    let current = self.options.cache_name();
    let mut purged = Vec::new();
    for name in self.store.keys()? {
      if name != current {
        info!("[activate] deleting old cache {}", name);
        self.store.delete(&name)?;
        purged.push(name);
      }
    }

    self
      .store
      .set_active_version(&self.options.scope, &self.options.version)?;
    let claimed = self.clients.claim(&self.options.version)?;

    self.controller = Some(self.options.version.clone());
    self.state = WorkerState::Activated;
    info!("[activate] {} now controls {} new client(s)", current, claimed);

    Ok(ActivationReport { purged, claimed })
  }

  /// Cache-first handling of a client request.
  pub async fn handle_fetch(&self, request: &Request) -> Result<FetchOutcome> {
    if request.url.as_str().contains(&self.options.api_host) {
      return Ok(FetchOutcome::Passthrough(Passthrough::ApiRequest));
    }
    let Some(controller) = self.controller.as_deref() else {
      return Ok(FetchOutcome::Passthrough(Passthrough::NotControlled));
    };
    if self.state == WorkerState::Redundant {
      return Ok(FetchOutcome::Passthrough(Passthrough::NotControlled));
    }

    let cache_name = self.options.cache_name_for(controller);
    if let Some(hit) = self.store.match_request(&cache_name, request)? {
      debug!("[fetch] cache hit {}", request.url);
      return Ok(FetchOutcome::Response(hit, CacheSource::Cache));
    }

    let response = self.network.fetch(request).await.map_err(|e| {
      error!("[fetch] {} failed: {}", request.url, e);
      e
    })?;

    if request.method == Method::GET && response.is_cacheable() {
      if let Err(e) = self.store.put(&cache_name, request, &response) {
        warn!("[fetch] could not cache {}: {}", request.url, e);
      }
    }

    Ok(FetchOutcome::Response(response, CacheSource::Network))
  }

  /// Fetch through the worker, or straight from the network when the
  /// request is not intercepted.
  pub async fn fetch(&self, request: &Request) -> Result<Response> {
    match self.handle_fetch(request).await? {
      FetchOutcome::Response(response, _) => Ok(response),
      FetchOutcome::Passthrough(_) => self.network.fetch(request).await,
    }
  }

  pub fn register_sync(&mut self, tag: &str) -> Result<()> {
    if self.state == WorkerState::Redundant {
      return Err(eyre!("Cannot register sync on a redundant worker"));
    }
    self.sync_tags.insert(tag.to_string());
    Ok(())
  }

  pub fn has_sync(&self, tag: &str) -> bool {
    self.sync_tags.contains(tag)
  }

  /// Run the background sync for `tag`: replay queued mutations.
  pub async fn handle_sync<B: PasswordBackend>(
    &self,
    tag: &str,
    queue: &MutationQueue,
    backend: &B,
  ) -> Result<SyncOutcome> {
    if tag != SYNC_TAG || !self.has_sync(tag) {
      return Ok(SyncOutcome::Ignored);
    }
    info!("[sync] {} triggered", tag);
    Ok(SyncOutcome::Flushed(queue.flush(backend).await?))
  }

  /// Turn a push message into a notification and show it.
  pub fn handle_push(&self, data: Option<&[u8]>, sink: &dyn NotificationSink) -> Notification {
    let notification = Notification::from(PushPayload::parse(data));
    if let Err(e) = sink.show(&notification) {
      warn!("[push] could not show notification: {}", e);
    }
    notification
  }

  pub fn handle_notification_click(&self, notification: &Notification) -> Result<ClickOutcome> {
    self.clients.focus_or_open(&notification.url)
  }

  /// Remove the registration. Caches stay until a later activation purges
  /// them.
  pub fn unregister(&mut self) -> Result<bool> {
    let removed = self.store.clear_registration(&self.options.scope)?;
    self.clients.release()?;
    self.controller = None;
    self.sync_tags.clear();
    self.state = WorkerState::Redundant;
    info!("[worker] unregistered scope {}", self.options.scope);
    Ok(removed)
  }
}

#[cfg(test)]
pub(crate) mod tests {
  use super::*;
  use crate::backend::memory::MemoryBackend;
  use crate::db::Database;
  use crate::sync::EntryMutation;
  use crate::worker::push::NotificationSink;
  use crate::worker::request::ResponseKind;
  use crate::worker::store::SqliteCacheStore;
  use std::collections::HashMap;
  use std::sync::{Arc, Mutex};

  pub const ORIGIN: &str = "https://vault.example.com";

  /// Network double serving canned responses by URL.
  #[derive(Clone, Default)]
  pub struct StubNetwork {
    responses: Arc<Mutex<HashMap<String, Response>>>,
    calls: Arc<Mutex<Vec<String>>>,
  }

  impl StubNetwork {
    /// Serves every default manifest path from the test origin.
    pub fn with_manifest() -> Self {
      let network = Self::default();
      for path in crate::config::DEFAULT_MANIFEST {
        network.serve(path, 200, ResponseKind::Basic, path);
      }
      network
    }

    pub fn serve(&self, path: &str, status: u16, kind: ResponseKind, body: &str) {
      let url = Url::parse(ORIGIN).unwrap().join(path).unwrap().to_string();
      self.responses.lock().unwrap().insert(
        url.clone(),
        Response {
          url,
          status,
          kind,
          content_type: None,
          body: body.as_bytes().to_vec(),
        },
      );
    }

    pub fn calls_to(&self, path: &str) -> usize {
      let url = Url::parse(ORIGIN).unwrap().join(path).unwrap().to_string();
      self.calls.lock().unwrap().iter().filter(|u| **u == url).count()
    }

    pub fn total_calls(&self) -> usize {
      self.calls.lock().unwrap().len()
    }
  }

  impl Network for StubNetwork {
    async fn fetch(&self, request: &Request) -> Result<Response> {
      let url = request.url.to_string();
      self.calls.lock().unwrap().push(url.clone());
      self
        .responses
        .lock()
        .unwrap()
        .get(&url)
        .cloned()
        .ok_or_else(|| eyre!("connection refused: {}", url))
    }
  }

  pub fn options(version: &str) -> WorkerOptions {
    WorkerOptions {
      scope: "/".to_string(),
      prefix: "pocket-secrets".to_string(),
      version: version.to_string(),
      origin: Url::parse(ORIGIN).unwrap(),
      api_host: "abc.supabase.co".to_string(),
      manifest: crate::config::DEFAULT_MANIFEST.iter().map(|s| s.to_string()).collect(),
    }
  }

  type TestWorker = OfflineWorker<SqliteCacheStore, StubNetwork>;

  fn worker(db: &Database, network: &StubNetwork, version: &str) -> TestWorker {
    let mut worker = OfflineWorker::new(
      SqliteCacheStore::new(db.conn()),
      network.clone(),
      options(version),
    );
    worker.restore().unwrap();
    worker
  }

  async fn activated(db: &Database, network: &StubNetwork) -> TestWorker {
    let mut worker = worker(db, network, "v1");
    worker.install().await.unwrap();
    worker.activate().unwrap();
    worker
  }

  fn get(path: &str) -> Request {
    Request::get(Url::parse(ORIGIN).unwrap().join(path).unwrap())
  }

  #[tokio::test]
  async fn test_install_caches_manifest() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    let mut worker = worker(&db, &network, "v1");
    assert!(worker.needs_install());

    worker.install().await.unwrap();

    assert_eq!(worker.state(), WorkerState::Installed);
    assert!(worker.skip_waiting_requested());
    let store = SqliteCacheStore::new(db.conn());
    assert_eq!(store.len("pocket-secrets-v1").unwrap(), 7);
  }

  #[tokio::test]
  async fn test_install_failure_stores_nothing() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    network.serve("/src/main.tsx", 404, ResponseKind::Basic, "missing");
    let mut worker = worker(&db, &network, "v1");

    assert!(worker.install().await.is_err());
    assert_eq!(worker.state(), WorkerState::Redundant);
    assert!(SqliteCacheStore::new(db.conn()).keys().unwrap().is_empty());
    assert!(worker.activate().is_err());
  }

  #[tokio::test]
  async fn test_install_twice_is_rejected() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    let mut worker = worker(&db, &network, "v1");
    worker.install().await.unwrap();
    assert!(worker.install().await.is_err());
  }

  #[tokio::test]
  async fn test_activate_purges_old_caches_and_claims() {
    let db = Database::open_in_memory().unwrap();
    let store = SqliteCacheStore::new(db.conn());
    let stale = Response {
      url: format!("{}/", ORIGIN),
      status: 200,
      kind: ResponseKind::Basic,
      content_type: None,
      body: b"old".to_vec(),
    };
    store.put("pocket-secrets-v0", &get("/"), &stale).unwrap();
    store.open("unrelated").unwrap();

    let network = StubNetwork::with_manifest();
    let mut worker = worker(&db, &network, "v1");
    worker.attach_client("/").unwrap();
    worker.attach_client("/vault").unwrap();
    worker.install().await.unwrap();
    let report = worker.activate().unwrap();

    assert_eq!(report.claimed, 2);
    assert_eq!(report.purged.len(), 2);
    assert_eq!(store.keys().unwrap(), vec!["pocket-secrets-v1".to_string()]);
    assert_eq!(store.active_version("/").unwrap().as_deref(), Some("v1"));
    assert_eq!(worker.controller(), Some("v1"));
    assert_eq!(worker.state(), WorkerState::Activated);
  }

  #[tokio::test]
  async fn test_attached_client_follows_active_version() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();

    let mut first = worker(&db, &network, "v1");
    let session = first.attach_client("/").unwrap();
    assert_eq!(first.clients().match_all().unwrap()[0].controller, None);
    first.install().await.unwrap();
    assert_eq!(first.activate().unwrap().claimed, 1);

    // a later run resumes under v1 without claiming anything
    let resumed = worker(&db, &network, "v1");
    let id = resumed.attach_client("/").unwrap();
    assert_ne!(id, session);
    let client = resumed.clients().match_all().unwrap().remove(0);
    assert_eq!(client.controller.as_deref(), Some("v1"));

    let mut upgraded = worker(&db, &network, "v2");
    upgraded.attach_client("/").unwrap();
    upgraded.install().await.unwrap();
    assert_eq!(upgraded.activate().unwrap().claimed, 1);
  }

  #[tokio::test]
  async fn test_api_requests_pass_through() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    let worker = activated(&db, &network).await;
    let before = network.total_calls();

    let request = Request::get(Url::parse("https://abc.supabase.co/rest/v1/password_entries").unwrap());
    let outcome = worker.handle_fetch(&request).await.unwrap();

    assert_eq!(outcome, FetchOutcome::Passthrough(Passthrough::ApiRequest));
    assert_eq!(network.total_calls(), before);
  }

  #[tokio::test]
  async fn test_uncontrolled_client_passes_through() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    let worker = worker(&db, &network, "v1");

    let outcome = worker.handle_fetch(&get("/index.html")).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Passthrough(Passthrough::NotControlled));

    let response = worker.fetch(&get("/index.html")).await.unwrap();
    assert_eq!(response.text(), "/index.html");
  }

  #[tokio::test]
  async fn test_manifest_served_from_cache() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    let worker = activated(&db, &network).await;
    let before = network.total_calls();

    let outcome = worker.handle_fetch(&get("/manifest.json")).await.unwrap();
    let FetchOutcome::Response(response, source) = outcome else {
      panic!("expected a response");
    };
    assert_eq!(source, CacheSource::Cache);
    assert_eq!(response.text(), "/manifest.json");
    assert_eq!(network.total_calls(), before);
  }

  #[tokio::test]
  async fn test_cold_then_warm() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    network.serve("/assets/app.js", 200, ResponseKind::Basic, "js");
    let worker = activated(&db, &network).await;

    let first = worker.handle_fetch(&get("/assets/app.js")).await.unwrap();
    let second = worker.handle_fetch(&get("/assets/app.js")).await.unwrap();

    assert!(matches!(first, FetchOutcome::Response(_, CacheSource::Network)));
    assert!(matches!(second, FetchOutcome::Response(_, CacheSource::Cache)));
    assert_eq!(network.calls_to("/assets/app.js"), 1);
  }

  #[tokio::test]
  async fn test_uncacheable_responses_always_hit_network() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    network.serve("/missing", 404, ResponseKind::Basic, "nope");
    network.serve("/font.woff", 200, ResponseKind::Cors, "font");
    network.serve("/pixel.gif", 0, ResponseKind::Opaque, "");
    network.serve("/created", 201, ResponseKind::Basic, "ok");
    let worker = activated(&db, &network).await;

    for path in ["/missing", "/font.woff", "/pixel.gif", "/created"] {
      worker.handle_fetch(&get(path)).await.unwrap();
      let outcome = worker.handle_fetch(&get(path)).await.unwrap();
      assert!(matches!(outcome, FetchOutcome::Response(_, CacheSource::Network)), "{path}");
      assert_eq!(network.calls_to(path), 2, "{path}");
    }
  }

  #[tokio::test]
  async fn test_non_get_not_cached() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    network.serve("/form", 200, ResponseKind::Basic, "ok");
    let worker = activated(&db, &network).await;

    let post = get("/form").with_method(Method::POST);
    worker.handle_fetch(&post).await.unwrap();
    worker.handle_fetch(&post).await.unwrap();
    assert_eq!(network.calls_to("/form"), 2);
  }

  #[tokio::test]
  async fn test_network_failure_is_an_error() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    let worker = activated(&db, &network).await;

    assert!(worker.handle_fetch(&get("/not-served")).await.is_err());
  }

  #[tokio::test]
  async fn test_restore_resumes_or_reinstalls() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    activated(&db, &network).await;

    let same = worker(&db, &network, "v1");
    assert_eq!(same.state(), WorkerState::Activated);
    assert!(!same.needs_install());
    let outcome = same.handle_fetch(&get("/")).await.unwrap();
    assert!(matches!(outcome, FetchOutcome::Response(_, CacheSource::Cache)));

    let next = worker(&db, &network, "v2");
    assert!(next.needs_install());
    assert_eq!(next.controller(), Some("v1"));
    // the old version keeps serving until the new one activates
    let outcome = next.handle_fetch(&get("/")).await.unwrap();
    assert!(matches!(outcome, FetchOutcome::Response(_, CacheSource::Cache)));
  }

  #[tokio::test]
  async fn test_unregister() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    let mut worker = activated(&db, &network).await;
    worker.register_sync(SYNC_TAG).unwrap();

    assert!(worker.unregister().unwrap());
    assert_eq!(worker.state(), WorkerState::Redundant);
    assert!(!worker.has_sync(SYNC_TAG));

    let store = SqliteCacheStore::new(db.conn());
    assert_eq!(store.active_version("/").unwrap(), None);
    assert_eq!(store.keys().unwrap().len(), 1);

    let outcome = worker.handle_fetch(&get("/")).await.unwrap();
    assert_eq!(outcome, FetchOutcome::Passthrough(Passthrough::NotControlled));
    assert!(worker.register_sync(SYNC_TAG).is_err());
  }

  #[tokio::test]
  async fn test_sync_flushes_queue() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    let mut worker = activated(&db, &network).await;
    let backend = MemoryBackend::signed_in("u1");
    let id = backend.insert_row("u1", "GitHub", "me", None);

    let queue = MutationQueue::new(db.conn());
    queue.enqueue(EntryMutation::Delete { id }).unwrap();

    // not registered yet
    let outcome = worker.handle_sync(SYNC_TAG, &queue, &backend).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Ignored);

    worker.register_sync(SYNC_TAG).unwrap();
    let outcome = worker.handle_sync("other-tag", &queue, &backend).await.unwrap();
    assert_eq!(outcome, SyncOutcome::Ignored);

    let SyncOutcome::Flushed(report) = worker.handle_sync(SYNC_TAG, &queue, &backend).await.unwrap()
    else {
      panic!("expected a flush");
    };
    assert_eq!(report.replayed, 1);
    assert!(backend.rows().is_empty());
  }

  #[derive(Default)]
  struct RecordingSink {
    shown: Mutex<Vec<Notification>>,
    fail: bool,
  }

  impl NotificationSink for RecordingSink {
    fn show(&self, notification: &Notification) -> Result<()> {
      if self.fail {
        return Err(eyre!("permission denied"));
      }
      self.shown.lock().unwrap().push(notification.clone());
      Ok(())
    }
  }

  #[tokio::test]
  async fn test_push_and_click() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    let worker = activated(&db, &network).await;
    let root = worker.attach_client("/").unwrap();

    let sink = RecordingSink::default();
    let notification = worker.handle_push(None, &sink);
    assert_eq!(sink.shown.lock().unwrap().as_slice(), &[notification.clone()]);
    assert_eq!(notification.title, "Pocket Secrets");

    assert_eq!(
      worker.handle_notification_click(&notification).unwrap(),
      ClickOutcome::Focused(root)
    );

    let other = worker.handle_push(Some(br#"{"url":"/settings"}"#), &sink);
    assert!(matches!(
      worker.handle_notification_click(&other).unwrap(),
      ClickOutcome::Opened(_)
    ));
  }

  #[tokio::test]
  async fn test_push_sink_failure_is_swallowed() {
    let db = Database::open_in_memory().unwrap();
    let network = StubNetwork::with_manifest();
    let worker = activated(&db, &network).await;
    let sink = RecordingSink {
      fail: true,
      ..RecordingSink::default()
    };

    let notification = worker.handle_push(Some(b"{"), &sink);
    assert_eq!(notification.body, "New notification from Pocket Secrets");
  }
}
