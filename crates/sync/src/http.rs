//! HTTP implementations of the endpoint and connectivity probe.
//!
//! The order endpoint accepts `POST {base}/cart` with a JSON body of the form
//! `{"items": [...]}` and answers with the created record. The record's `id`
//! (or `orderId`) becomes the receipt's order id.

use crate::connectivity::Probe;
use crate::endpoint::{OrderId, SubmitReceipt, SyncEndpoint};
use crate::EndpointError;
use model::CartLine;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use serde_json::Value;
use std::fmt;
use std::time::Duration;

#[derive(Serialize)]
struct SubmitRequest<'a> {
    items: &'a [CartLine],
}

fn build_client(timeout: Duration) -> Result<Client, EndpointError> {
    Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| EndpointError::Config(e.to_string()))
}

fn join_url(base_url: &str, path: &str) -> String {
    format!("{}/{}", base_url.trim_end_matches('/'), path)
}

/// Order endpoint reached over HTTP
#[derive(Debug, Clone)]
pub struct HttpSyncEndpoint {
    client: Client,
    cart_url: String,
}

impl HttpSyncEndpoint {
    /// Create an endpoint for the API rooted at `base_url`
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EndpointError> {
        Ok(Self {
            client: build_client(timeout)?,
            cart_url: join_url(base_url, "cart"),
        })
    }

    /// URL submissions are posted to
    pub fn cart_url(&self) -> &str {
        &self.cart_url
    }
}

impl SyncEndpoint for HttpSyncEndpoint {
    async fn submit(&self, lines: &[CartLine]) -> Result<SubmitReceipt, EndpointError> {
        let response = self
            .client
            .post(&self.cart_url)
            .json(&SubmitRequest { items: lines })
            .send()
            .await
            .map_err(|e| EndpointError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(rejection(status, response.text().await));
        }

        let order_id = match response.text().await {
            Ok(body) => parse_order_id(&body),
            Err(e) => {
                tracing::warn!("Order accepted but its response body was unreadable: {}", e);
                None
            }
        };
        Ok(SubmitReceipt { order_id })
    }
}

/// Map a non-success answer to an error, keeping the body when it was readable
fn rejection<E: fmt::Display>(status: StatusCode, body: Result<String, E>) -> EndpointError {
    match body {
        Ok(body) => EndpointError::Server {
            status: status.as_u16(),
            body,
        },
        Err(e) => EndpointError::InvalidResponse(format!(
            "status {} with unreadable body: {}",
            status.as_u16(),
            e
        )),
    }
}

/// Pull the order id out of a response body.
///
/// An accepted submission is never turned into a failure here; resubmitting
/// it would place a duplicate order.
fn parse_order_id(body: &str) -> Option<OrderId> {
    let value: Value = serde_json::from_str(body).ok()?;
    let id = value.get("orderId").or_else(|| value.get("id"))?;
    match id {
        Value::String(s) if !s.is_empty() => Some(OrderId::new(s.clone())),
        Value::Number(n) => Some(OrderId::new(n.to_string())),
        _ => None,
    }
}

/// Connectivity probe that considers the API reachable when it answers at all
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    url: String,
}

impl HttpProbe {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, EndpointError> {
        Ok(Self {
            client: build_client(timeout)?,
            url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

impl Probe for HttpProbe {
    async fn check(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(_) => true,
            Err(e) => {
                tracing::debug!("Connectivity probe failed: {}", e);
                false
            }
        }
    }
}
