//! # Relay Client
//!
//! HTTP client for the relay service that fronts the external point-of-sale
//! API.
//!
//! ## Protocol
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  POST /api/login                                                        │
//! │       200 → { "token": "…" }                                            │
//! │       4xx/5xx → { "message": "…", "details": … }                        │
//! │                                                                         │
//! │  GET /api/sales?pageNum=1&pageSize=100&startDate=…&endDate=…&token=…    │
//! │       200 → { "code": 200, "msg": "…", "data": [RawSaleLine, …] }       │
//! │                                                                         │
//! │  code != 200, or no data  → InvalidResponse (data shape)                │
//! │  401 / 403               → AuthFailed                                   │
//! │  other HTTP errors       → RelayUnavailable                             │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The relay passes the POS rows through untouched, so numeric fields may
//! arrive as numbers or as strings. They are read leniently and validated
//! later, when bills are built.

use std::str::FromStr;

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use tracing::{debug, info};
use url::Url;

use crate::config::RelaySettings;
use crate::error::{SyncError, SyncResult};

// =============================================================================
// Wire Types
// =============================================================================

/// One sold line as reported by the point-of-sale system.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSaleLine {
    #[serde(default, deserialize_with = "loose_text")]
    pub bill_no: Option<String>,
    /// "YYYY-MM-DD HH:MM:SS", UTC.
    #[serde(default, deserialize_with = "loose_text")]
    pub oper_date: Option<String>,
    #[serde(default, deserialize_with = "loose_text")]
    pub goods_name: Option<String>,
    /// Quantity sold.
    #[serde(default, deserialize_with = "loose_decimal")]
    pub num_num: Option<Decimal>,
    /// Unit price.
    #[serde(default, deserialize_with = "loose_decimal")]
    pub num_price: Option<Decimal>,
    /// Extra charge on the line (supplements).
    #[serde(default, deserialize_with = "loose_decimal")]
    pub num_price_add: Option<Decimal>,
    /// Percentage actually paid; 100 means no discount.
    #[serde(default, deserialize_with = "loose_decimal")]
    pub discount: Option<Decimal>,
    /// Quantity returned.
    #[serde(default, deserialize_with = "loose_decimal")]
    pub num_back: Option<Decimal>,
}

fn loose_text<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<String>, D::Error> {
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}

fn loose_decimal<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<Decimal>, D::Error> {
    let raw = match Value::deserialize(deserializer)? {
        Value::String(s) => s.trim().replace(',', "."),
        Value::Number(n) => n.to_string(),
        _ => return Ok(None),
    };
    Ok(Decimal::from_str(&raw)
        .or_else(|_| Decimal::from_scientific(&raw))
        .ok())
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    token: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RelayErrorBody {
    message: Option<String>,
    details: Option<Value>,
}

impl RelayErrorBody {
    /// Most specific message available, like `details.message || details || message`.
    fn describe(&self, status: StatusCode) -> String {
        let from_details = match &self.details {
            Some(Value::Object(map)) => map.get("message").and_then(Value::as_str).map(str::to_string),
            Some(Value::String(s)) => Some(s.clone()),
            Some(Value::Null) | None => None,
            Some(other) => Some(other.to_string()),
        };
        from_details
            .or_else(|| self.message.clone())
            .unwrap_or_else(|| format!("Status {}", status.as_u16()))
    }
}

#[derive(Debug, Deserialize)]
struct SalesPage {
    code: Option<i64>,
    msg: Option<String>,
    data: Option<Vec<RawSaleLine>>,
}

// =============================================================================
// Sales Feed
// =============================================================================

/// Page request for one import run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageQuery {
    /// 1-based.
    pub page: u32,
    pub page_size: u32,
    pub start: NaiveDate,
    pub end: NaiveDate,
}

/// Source of external sale lines. [`RelayClient`] in production.
#[async_trait]
pub trait SalesFeed: Send + Sync {
    /// Exchanges the relay's stored credentials for a bearer token.
    async fn authenticate(&self) -> SyncResult<String>;

    /// Fetches one page of sale lines.
    async fn fetch_page(&self, token: &str, query: PageQuery) -> SyncResult<Vec<RawSaleLine>>;
}

// =============================================================================
// Relay Client
// =============================================================================

#[derive(Debug, Clone)]
pub struct RelayClient {
    http: reqwest::Client,
    base_url: Url,
}

impl RelayClient {
    pub fn new(settings: &RelaySettings) -> SyncResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(settings.timeout())
            .build()
            .map_err(|e| SyncError::InvalidConfig(e.to_string()))?;
        Ok(RelayClient {
            http,
            base_url: settings.base_url()?,
        })
    }

    /// `path` is relative, so a base like `https://host/relay/` keeps its prefix.
    fn endpoint(&self, path: &str) -> SyncResult<Url> {
        Ok(self.base_url.join(path)?)
    }
}

async fn error_body(response: reqwest::Response) -> RelayErrorBody {
    response.json().await.unwrap_or_default()
}

#[async_trait]
impl SalesFeed for RelayClient {
    async fn authenticate(&self) -> SyncResult<String> {
        let url = self.endpoint("api/login")?;
        debug!(%url, "Authenticating with relay");

        let response = self.http.post(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(SyncError::AuthFailed(body.describe(status)));
        }

        let login: LoginResponse = response
            .json()
            .await
            .map_err(|e| SyncError::InvalidResponse(format!("login: {}", e)))?;
        match login.token {
            Some(token) if !token.trim().is_empty() => {
                info!("Relay authentication successful");
                Ok(token)
            }
            _ => Err(SyncError::MissingToken),
        }
    }

    async fn fetch_page(&self, token: &str, query: PageQuery) -> SyncResult<Vec<RawSaleLine>> {
        let url = self.endpoint("api/sales")?;
        let page = query.page.to_string();
        let page_size = query.page_size.to_string();
        let start = query.start.format("%Y-%m-%d").to_string();
        let end = query.end.format("%Y-%m-%d").to_string();

        let response = self
            .http
            .get(url)
            .query(&[
                ("pageNum", page.as_str()),
                ("pageSize", page_size.as_str()),
                ("startDate", start.as_str()),
                ("endDate", end.as_str()),
                ("token", token),
            ])
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            let body = error_body(response).await;
            return Err(SyncError::AuthFailed(body.describe(status)));
        }
        if !status.is_success() {
            let body = error_body(response).await;
            return Err(SyncError::RelayUnavailable {
                page: query.page,
                status: status.as_u16(),
                message: body.describe(status),
            });
        }

        let body: SalesPage = response
            .json()
            .await
            .map_err(|e| SyncError::InvalidResponse(format!("page {}: {}", query.page, e)))?;
        match (body.code, body.data) {
            (Some(200), Some(data)) => {
                debug!(page = query.page, lines = data.len(), "Fetched sales page");
                Ok(data)
            }
            (code, _) => Err(SyncError::InvalidResponse(format!(
                "page {}: code {}, {}",
                query.page,
                code.map_or_else(|| "missing".to_string(), |c| c.to_string()),
                body.msg.unwrap_or_else(|| "no data".to_string())
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use httpmock::prelude::*;
    use serde_json::json;
    use solo_core::ErrorKind;

    fn client_for(server: &MockServer) -> RelayClient {
        RelayClient::new(&RelaySettings {
            url: server.base_url(),
            ..RelaySettings::default()
        })
        .unwrap()
    }

    fn query(page: u32) -> PageQuery {
        PageQuery {
            page,
            page_size: 100,
            start: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            end: NaiveDate::from_ymd_opt(2024, 3, 2).unwrap(),
        }
    }

    #[test]
    fn test_lines_accept_numbers_and_strings() {
        let line: RawSaleLine = serde_json::from_value(json!({
            "billNo": 1042,
            "operDate": "2024-03-01 12:30:00",
            "goodsName": "Margherita",
            "numNum": "2",
            "numPrice": 45.5,
            "numPriceAdd": null,
            "discount": "abc",
            "numBack": "0,5"
        }))
        .unwrap();
        assert_eq!(line.bill_no.as_deref(), Some("1042"));
        assert_eq!(line.num_num, Some(Decimal::TWO));
        assert_eq!(line.num_price, Some(Decimal::new(455, 1)));
        assert_eq!(line.num_price_add, None);
        assert_eq!(line.discount, None);
        assert_eq!(line.num_back, Some(Decimal::new(5, 1)));
    }

    #[tokio::test]
    async fn test_login_returns_token() {
        let server = MockServer::start_async().await;
        let login = server
            .mock_async(|when, then| {
                when.method(POST).path("/api/login");
                then.status(200).json_body(json!({ "token": "tok-1" }));
            })
            .await;

        let token = client_for(&server).authenticate().await.unwrap();
        assert_eq!(token, "tok-1");
        login.assert_async().await;
    }

    #[tokio::test]
    async fn test_relay_under_path_prefix() {
        let server = MockServer::start_async().await;
        let login = server
            .mock_async(|when, then| {
                when.method(POST).path("/relay/api/login");
                then.status(200).json_body(json!({ "token": "tok-2" }));
            })
            .await;
        let sales = server
            .mock_async(|when, then| {
                when.method(GET).path("/relay/api/sales").query_param("token", "tok-2");
                then.status(200).json_body(json!({ "code": 200, "msg": "ok", "data": [] }));
            })
            .await;

        let client = RelayClient::new(&RelaySettings {
            url: server.url("/relay"),
            ..RelaySettings::default()
        })
        .unwrap();
        let token = client.authenticate().await.unwrap();
        let lines = client.fetch_page(&token, query(1)).await.unwrap();

        assert!(lines.is_empty());
        login.assert_async().await;
        sales.assert_async().await;
    }

    #[tokio::test]
    async fn test_login_failure_is_an_auth_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/login");
                then.status(401).json_body(json!({
                    "message": "Échec d'authentification externe",
                    "details": { "message": "bad password" }
                }));
            })
            .await;

        let err = client_for(&server).authenticate().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalAuth);
        assert!(err.to_string().contains("bad password"));
    }

    #[tokio::test]
    async fn test_login_without_token() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/api/login");
                then.status(200).json_body(json!({}));
            })
            .await;

        let err = client_for(&server).authenticate().await.unwrap_err();
        assert!(matches!(err, SyncError::MissingToken));
    }

    #[tokio::test]
    async fn test_sales_page_sends_query() {
        let server = MockServer::start_async().await;
        let sales = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/api/sales")
                    .query_param("pageNum", "2")
                    .query_param("pageSize", "100")
                    .query_param("startDate", "2024-03-01")
                    .query_param("endDate", "2024-03-02")
                    .query_param("token", "tok-1");
                then.status(200).json_body(json!({
                    "code": 200,
                    "msg": "ok",
                    "data": [{ "billNo": "B1", "goodsName": "Coca", "numNum": 1, "numPrice": 12 }]
                }));
            })
            .await;

        let lines = client_for(&server).fetch_page("tok-1", query(2)).await.unwrap();
        sales.assert_async().await;
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].goods_name.as_deref(), Some("Coca"));
    }

    #[tokio::test]
    async fn test_non_200_code_is_a_shape_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/sales");
                then.status(200).json_body(json!({ "code": 500, "msg": "token expired" }));
            })
            .await;

        let err = client_for(&server).fetch_page("tok", query(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalDataShape);
        assert!(err.to_string().contains("token expired"));
    }

    #[tokio::test]
    async fn test_http_errors_are_classified() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/sales").query_param("pageNum", "1");
                then.status(401).json_body(json!({ "message": "Jeton manquant" }));
            })
            .await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/api/sales").query_param("pageNum", "2");
                then.status(502).body("upstream down");
            })
            .await;

        let client = client_for(&server);
        let err = client.fetch_page("tok", query(1)).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalAuth);

        let err = client.fetch_page("tok", query(2)).await.unwrap_err();
        assert!(matches!(err, SyncError::RelayUnavailable { page: 2, status: 502, .. }));
        assert_eq!(err.kind(), ErrorKind::ExternalNetwork);
    }

    #[tokio::test]
    async fn test_unreachable_relay_is_a_network_error() {
        let client = RelayClient::new(&RelaySettings {
            url: "http://127.0.0.1:9".into(),
            ..RelaySettings::default()
        })
        .unwrap();
        let err = client.authenticate().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ExternalNetwork);
    }
}
