//! Requests and responses as seen by the offline worker.

use reqwest::Method;
use sha2::{Digest, Sha256};
use url::Url;

/// How a request may cross origins.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestMode {
  #[default]
  Cors,
  /// Cross-origin reads come back opaque
  NoCors,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Request {
  pub method: Method,
  pub url: Url,
  pub mode: RequestMode,
}

impl Request {
  pub fn get(url: Url) -> Self {
    Self {
      method: Method::GET,
      url,
      mode: RequestMode::default(),
    }
  }

  #[cfg(test)]
  pub fn with_method(mut self, method: Method) -> Self {
    self.method = method;
    self
  }

  #[cfg(test)]
  pub fn with_mode(mut self, mode: RequestMode) -> Self {
    self.mode = mode;
    self
  }

  /// Stable key for cache lookups: method plus URL without fragment.
  pub fn cache_key(&self) -> String {
    let mut url = self.url.clone();
    url.set_fragment(None);

    let mut hasher = Sha256::new();
    hasher.update(self.method.as_str().as_bytes());
    hasher.update(b" ");
    hasher.update(url.as_str().as_bytes());
    hex::encode(hasher.finalize())
  }
}

/// Provenance of a response, which decides whether it may be cached.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseKind {
  /// Same-origin
  Basic,
  /// Cross-origin with CORS headers
  Cors,
  /// Cross-origin, no-cors: status and body are hidden
  Opaque,
}

impl ResponseKind {
  pub fn as_str(&self) -> &'static str {
    match self {
      ResponseKind::Basic => "basic",
      ResponseKind::Cors => "cors",
      ResponseKind::Opaque => "opaque",
    }
  }

  pub fn parse(s: &str) -> Option<Self> {
    match s {
      "basic" => Some(ResponseKind::Basic),
      "cors" => Some(ResponseKind::Cors),
      "opaque" => Some(ResponseKind::Opaque),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
  pub url: String,
  pub status: u16,
  pub kind: ResponseKind,
  pub content_type: Option<String>,
  pub body: Vec<u8>,
}

impl Response {
  pub fn ok(&self) -> bool {
    (200..300).contains(&self.status)
  }

  /// Only complete same-origin responses go into the cache.
  pub fn is_cacheable(&self) -> bool {
    self.status == 200 && self.kind == ResponseKind::Basic
  }

  pub fn text(&self) -> String {
    String::from_utf8_lossy(&self.body).into_owned()
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn url(s: &str) -> Url {
    Url::parse(s).unwrap()
  }

  #[test]
  fn test_cache_key_ignores_fragment() {
    let a = Request::get(url("https://vault.example.com/index.html#top"));
    let b = Request::get(url("https://vault.example.com/index.html"));
    assert_eq!(a.cache_key(), b.cache_key());
  }

  #[test]
  fn test_cache_key_depends_on_method_and_query() {
    let get = Request::get(url("https://vault.example.com/a?x=1"));
    let other_query = Request::get(url("https://vault.example.com/a?x=2"));
    let post = get.clone().with_method(Method::POST);
    assert_ne!(get.cache_key(), other_query.cache_key());
    assert_ne!(get.cache_key(), post.cache_key());
  }

  #[test]
  fn test_only_basic_200_is_cacheable() {
    let mut response = Response {
      url: "https://vault.example.com/".to_string(),
      status: 200,
      kind: ResponseKind::Basic,
      content_type: None,
      body: Vec::new(),
    };
    assert!(response.is_cacheable());

    response.status = 204;
    assert!(response.ok());
    assert!(!response.is_cacheable());

    response.status = 200;
    response.kind = ResponseKind::Cors;
    assert!(!response.is_cacheable());
    response.kind = ResponseKind::Opaque;
    assert!(!response.is_cacheable());
  }

  #[test]
  fn test_kind_round_trips_through_storage_name() {
    for kind in [ResponseKind::Basic, ResponseKind::Cors, ResponseKind::Opaque] {
      assert_eq!(ResponseKind::parse(kind.as_str()), Some(kind));
    }
    assert_eq!(ResponseKind::parse("error"), None);
  }
}
