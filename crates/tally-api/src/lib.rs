//! JSON REST API for the Tally uniqueness ledger.
//!
//! Exposes an axum [`Router`] backed by any
//! [`tally_core::ledger::UniquenessLedger`]. This crate is the "operation
//! intake" and "operation closure" surface: it normalizes raw field sets,
//! extracts claims, and translates typed ledger failures into structured
//! HTTP responses. Auth, TLS, and transport concerns are the caller's
//! responsibility.

pub mod claims;
pub mod error;
pub mod operations;

use std::{path::PathBuf, sync::Arc};

use axum::{
  Router,
  routing::{get, post},
};
use serde::Deserialize;
use tally_core::{
  claim::IdentifierClass,
  extract::{ClaimExtractor, ExtractorConfig},
  ledger::UniquenessLedger,
};
use tower_http::trace::TraceLayer;

pub use error::ApiError;

// ─── Configuration ────────────────────────────────────────────────────────────

/// Runtime server configuration, deserialised from `config.toml`.
#[derive(Deserialize, Clone)]
pub struct ServerConfig {
  pub host:        String,
  pub port:        u16,
  pub ledger_path: PathBuf,
  /// Extraction policy overrides; anything unset falls back to the default
  /// production ruleset.
  #[serde(default)]
  pub extractor:   ExtractorSettings,
}

/// Optional extraction-policy overrides for `config.toml`. Kept separate from
/// [`ExtractorConfig`] so the file can set only what it cares about.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ExtractorSettings {
  pub multi_separator:   Option<char>,
  pub derived_prefix:    Option<String>,
  pub renewable_classes: Option<Vec<IdentifierClass>>,
}

impl ExtractorSettings {
  pub fn into_config(self) -> ExtractorConfig {
    let mut config = ExtractorConfig::default();
    if let Some(sep) = self.multi_separator {
      config.multi_separator = sep;
    }
    if let Some(prefix) = self.derived_prefix {
      config.derived_prefix = prefix;
    }
    if let Some(classes) = self.renewable_classes {
      config.renewable_classes = classes.into_iter().collect();
    }
    config
  }
}

// ─── Application state ────────────────────────────────────────────────────────

/// Shared state threaded through all axum handlers.
#[derive(Clone)]
pub struct AppState<S: UniquenessLedger> {
  pub ledger:    Arc<S>,
  pub extractor: Arc<ClaimExtractor>,
}

// ─── Router ───────────────────────────────────────────────────────────────────

/// Build a fully-materialised API router for `state`.
pub fn router<S>(state: AppState<S>) -> Router
where
  S: UniquenessLedger + Clone + Send + Sync + 'static,
  S::Error: std::error::Error + Send + Sync + 'static,
{
  Router::new()
    // Operations
    .route(
      "/operations",
      get(operations::list::<S>).post(operations::create::<S>),
    )
    .route("/operations/{id}", get(operations::get_one::<S>))
    .route("/operations/{id}/claims", get(operations::claims::<S>))
    .route("/operations/{id}/close", post(operations::close_one::<S>))
    // Advisory check
    .route("/claims/check", post(claims::check::<S>))
    .layer(TraceLayer::new_for_http())
    .with_state(state)
}

// ─── Integration tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
  use super::*;

  use axum::{
    body::Body,
    http::{Request, StatusCode, header},
  };
  use serde_json::{Value, json};
  use tally_store_sqlite::SqliteLedger;
  use tower::ServiceExt as _;
  use uuid::Uuid;

  async fn make_state() -> AppState<SqliteLedger> {
    let ledger = SqliteLedger::open_in_memory().await.unwrap();
    AppState {
      ledger:    Arc::new(ledger),
      extractor: Arc::new(ClaimExtractor::default()),
    }
  }

  async fn request(
    state: AppState<SqliteLedger>,
    method: &str,
    uri: &str,
    body: Option<Value>,
  ) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    let body = match body {
      Some(v) => {
        builder = builder.header(header::CONTENT_TYPE, "application/json");
        Body::from(v.to_string())
      }
      None => Body::empty(),
    };

    let resp = router(state)
      .oneshot(builder.body(body).unwrap())
      .await
      .unwrap();

    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
      .await
      .unwrap();
    let json = if bytes.is_empty() {
      Value::Null
    } else {
      serde_json::from_slice(&bytes).unwrap()
    };
    (status, json)
  }

  #[tokio::test]
  async fn create_normalizes_and_returns_201() {
    let state = make_state().await;
    let (status, body) = request(
      state,
      "POST",
      "/operations",
      Some(json!({ "booking": "  abc   123 ", "thermographs": "t1/ T1 /t2" })),
    )
    .await;

    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["state"], "open");
    assert_eq!(body["fields"]["booking"], "ABC 123");
    assert_eq!(body["fields"]["thermographs"], "T1/T2");
  }

  #[tokio::test]
  async fn duplicate_booking_returns_409_with_conflicts() {
    let state = make_state().await;
    let booking = json!({ "booking": "BK-1" });

    request(state.clone(), "POST", "/operations", Some(booking.clone())).await;
    let (status, body) =
      request(state, "POST", "/operations", Some(booking)).await;

    assert_eq!(status, StatusCode::CONFLICT);
    let conflicts = body["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["class"], "booking");
    assert_eq!(conflicts[0]["value"], "BK-1");
    assert_eq!(conflicts[0]["kind"], "permanently_used");
  }

  #[tokio::test]
  async fn awb_frees_up_after_close() {
    let state = make_state().await;
    let awb = json!({ "awb": "AWB-9" });

    let (_, created) =
      request(state.clone(), "POST", "/operations", Some(awb.clone())).await;
    let id = created["operation_id"].as_str().unwrap().to_owned();

    let (status, body) =
      request(state.clone(), "POST", "/operations", Some(awb.clone())).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["conflicts"][0]["kind"], "actively_locked");

    let (status, outcome) = request(
      state.clone(),
      "POST",
      &format!("/operations/{id}/close"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(outcome["released"], 1);
    assert_eq!(outcome["already_closed"], false);

    let (status, _) = request(state, "POST", "/operations", Some(awb)).await;
    assert_eq!(status, StatusCode::CREATED);
  }

  #[tokio::test]
  async fn close_is_idempotent_over_http() {
    let state = make_state().await;
    let (_, created) = request(
      state.clone(),
      "POST",
      "/operations",
      Some(json!({ "booking": "BK-CLOSE" })),
    )
    .await;
    let id = created["operation_id"].as_str().unwrap().to_owned();
    let uri = format!("/operations/{id}/close");

    let (status, first) = request(state.clone(), "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first["already_closed"], false);

    let (status, second) = request(state, "POST", &uri, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(second["already_closed"], true);
    assert_eq!(second["released"], 0);
  }

  #[tokio::test]
  async fn unknown_operation_returns_404() {
    let state = make_state().await;
    let id = Uuid::new_v4();

    let (status, _) =
      request(state.clone(), "GET", &format!("/operations/{id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = request(
      state,
      "POST",
      &format!("/operations/{id}/close"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
  }

  #[tokio::test]
  async fn check_reports_intents_and_conflicts() {
    let state = make_state().await;
    request(
      state.clone(),
      "POST",
      "/operations",
      Some(json!({ "awb": "AWB-CHK" })),
    )
    .await;

    let (status, body) = request(
      state,
      "POST",
      "/claims/check",
      Some(json!({ "awb": "awb-chk", "booking": "BK-NEW" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["intents"].as_array().unwrap().len(), 2);
    let conflicts = body["conflicts"].as_array().unwrap();
    assert_eq!(conflicts.len(), 1);
    assert_eq!(conflicts[0]["class"], "awb");
    assert_eq!(conflicts[0]["kind"], "actively_locked");
  }

  #[tokio::test]
  async fn derived_seal_claims_over_http() {
    let state = make_state().await;
    let (_, created) = request(
      state.clone(),
      "POST",
      "/operations",
      Some(json!({ "sanitary_cert": "SEN1", "line_seal": "LIN9" })),
    )
    .await;
    assert_eq!(created["fields"]["sanitary_line_seal"], "SEN1/PS.LIN9");

    let id = created["operation_id"].as_str().unwrap().to_owned();
    let (status, claims) = request(
      state,
      "GET",
      &format!("/operations/{id}/claims"),
      None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let claims = claims.as_array().unwrap();
    assert_eq!(claims.len(), 1);
    assert_eq!(claims[0]["class"], "sanitary_line_seal");
    assert_eq!(claims[0]["value"], "SEN1/PS.LIN9");
  }
}
