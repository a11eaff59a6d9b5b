use color_eyre::{eyre::eyre, Result};
use std::future::Future;
use url::Url;

use super::request::{Request, RequestMode, Response, ResponseKind};

/// Where the worker goes on a cache miss.
pub trait Network: Send + Sync {
  fn fetch(&self, request: &Request) -> impl Future<Output = Result<Response>> + Send;
}

/// Live network access through reqwest.
#[derive(Clone)]
pub struct HttpNetwork {
  http: reqwest::Client,
  origin: Url,
}

impl HttpNetwork {
  /// `origin` decides which responses count as same-origin.
  pub fn new(origin: Url) -> Self {
    Self {
      http: reqwest::Client::new(),
      origin,
    }
  }

  /// Classify by where the response came from after redirects.
  fn kind_for(&self, final_url: &Url, request: &Request) -> ResponseKind {
    if final_url.origin() == self.origin.origin() {
      ResponseKind::Basic
    } else if request.mode == RequestMode::NoCors {
      ResponseKind::Opaque
    } else {
      ResponseKind::Cors
    }
  }
}

impl Network for HttpNetwork {
  async fn fetch(&self, request: &Request) -> Result<Response> {
    let response = self
      .http
      .request(request.method.clone(), request.url.clone())
      .send()
      .await
      .map_err(|e| eyre!("Failed to fetch {}: {}", request.url, e))?;

    let kind = self.kind_for(response.url(), request);
    let url = response.url().to_string();
    let status = response.status().as_u16();
    let content_type = response
      .headers()
      .get(reqwest::header::CONTENT_TYPE)
      .and_then(|v| v.to_str().ok())
      .map(String::from);
    let body = response
      .bytes()
      .await
      .map_err(|e| eyre!("Failed to read body of {}: {}", request.url, e))?
      .to_vec();

    if kind == ResponseKind::Opaque {
      return Ok(Response {
        url,
        status: 0,
        kind,
        content_type: None,
        body: Vec::new(),
      });
    }

    Ok(Response {
      url,
      status,
      kind,
      content_type,
      body,
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use httpmock::prelude::*;

  #[tokio::test]
  async fn test_same_origin_is_basic() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/index.html");
        then.status(200).header("content-type", "text/html").body("<html>");
      })
      .await;

    let network = HttpNetwork::new(Url::parse(&server.base_url()).unwrap());
    let url = Url::parse(&server.url("/index.html")).unwrap();
    let response = network.fetch(&Request::get(url)).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.kind, ResponseKind::Basic);
    assert_eq!(response.content_type.as_deref(), Some("text/html"));
    assert_eq!(response.text(), "<html>");
  }

  #[tokio::test]
  async fn test_cross_origin_kinds() {
    let server = MockServer::start_async().await;
    server
      .mock_async(|when, then| {
        when.method(GET).path("/font.woff");
        then.status(200).body("font");
      })
      .await;

    let network = HttpNetwork::new(Url::parse("https://vault.example.com").unwrap());
    let url = Url::parse(&server.url("/font.woff")).unwrap();

    let cors = network.fetch(&Request::get(url.clone())).await.unwrap();
    assert_eq!(cors.kind, ResponseKind::Cors);
    assert_eq!(cors.text(), "font");

    let opaque = network
      .fetch(&Request::get(url).with_mode(RequestMode::NoCors))
      .await
      .unwrap();
    assert_eq!(opaque.kind, ResponseKind::Opaque);
    assert_eq!(opaque.status, 0);
    assert!(opaque.body.is_empty());
  }

  #[tokio::test]
  async fn test_redirect_to_other_origin_is_not_basic() {
    let elsewhere = MockServer::start_async().await;
    elsewhere
      .mock_async(|when, then| {
        when.method(GET).path("/app.js");
        then.status(200).body("console.log(1)");
      })
      .await;

    let server = MockServer::start_async().await;
    let target = elsewhere.url("/app.js");
    server
      .mock_async(|when, then| {
        when.method(GET).path("/app.js");
        then.status(302).header("location", target.as_str());
      })
      .await;

    let network = HttpNetwork::new(Url::parse(&server.base_url()).unwrap());
    let url = Url::parse(&server.url("/app.js")).unwrap();
    let response = network.fetch(&Request::get(url)).await.unwrap();

    assert_eq!(response.status, 200);
    assert_eq!(response.kind, ResponseKind::Cors);
    assert_eq!(response.url, target);
  }

  #[tokio::test]
  async fn test_unreachable_host_is_an_error() {
    let network = HttpNetwork::new(Url::parse("http://127.0.0.1:9").unwrap());
    let url = Url::parse("http://127.0.0.1:9/").unwrap();
    assert!(network.fetch(&Request::get(url)).await.is_err());
  }
}
