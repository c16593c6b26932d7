//! HTTP client for the bakery REST API

use crate::{ClientConfig, ClientError, ClientResult};
use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use shared::error::ErrorBody;
use shared::models::Product;
use shared::order::{CartLine, Order, OrderStatus};

/// A status transition result; `warning` is set when the transition went
/// through but the customer notification failed
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatusUpdate {
    pub order: Order,
    pub warning: Option<String>,
}

/// A charge whose order commit failed, awaiting manual follow-up
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingReconciliation {
    pub payment_intent_id: String,
    pub customer_id: u64,
    pub reason: String,
    pub created_at: i64,
}

/// A subscriber currently connected to the event channel
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChannelClient {
    pub id: String,
    pub addr: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CommitOrderRequest<'a> {
    products: &'a [CartLine],
    payment_intent_id: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ValidateStockRequest<'a> {
    products: &'a [CartLine],
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct CreateIntentRequest<'a> {
    amount: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    currency: Option<&'a str>,
    receipt_email: &'a str,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateIntentResponse {
    client_secret: String,
}

/// HTTP client for making network requests to the bakery server
#[derive(Debug, Clone)]
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

impl HttpClient {
    /// Create a new HTTP client from configuration
    pub fn new(config: &ClientConfig) -> Self {
        let client = Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout))
            .build()
            .expect("Failed to build HTTP client");

        Self {
            client,
            base_url: config.base_url.clone(),
            token: config.token.clone(),
        }
    }

    /// Set the authentication token
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    /// Get the current token
    pub fn token(&self) -> Option<&str> {
        self.token.as_deref()
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            path.trim_start_matches('/')
        )
    }

    fn auth_header(&self) -> Option<String> {
        self.token.as_ref().map(|t| format!("Bearer {}", t))
    }

    /// Make a GET request
    pub async fn get<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let mut request = self.client.get(self.url(path));
        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        Self::handle_response(request.send().await?).await
    }

    /// Make a POST request with JSON body
    pub async fn post<T: DeserializeOwned, B: Serialize>(
        &self,
        path: &str,
        body: &B,
    ) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path)).json(body);
        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        Self::handle_response(request.send().await?).await
    }

    /// Make a POST request without body
    pub async fn post_empty<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let mut request = self.client.post(self.url(path));
        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        Self::handle_response(request.send().await?).await
    }

    /// Make a PUT request
    pub async fn put<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let mut request = self.client.put(self.url(path));
        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        Self::handle_response(request.send().await?).await
    }

    /// Make a DELETE request
    pub async fn delete<T: DeserializeOwned>(&self, path: &str) -> ClientResult<T> {
        let mut request = self.client.delete(self.url(path));
        if let Some(auth) = self.auth_header() {
            request = request.header(reqwest::header::AUTHORIZATION, auth);
        }
        Self::handle_response(request.send().await?).await
    }

    /// Handle the HTTP response
    ///
    /// Error bodies carry a `{code, message}` envelope with a stable
    /// string code; fall back to status-based mapping if the body does
    /// not parse.
    async fn handle_response<T: DeserializeOwned>(response: reqwest::Response) -> ClientResult<T> {
        let status = response.status();

        if !status.is_success() {
            let text = response.text().await?;
            if let Ok(body) = serde_json::from_str::<ErrorBody>(&text) {
                return Err(ClientError::Api {
                    code: body.code,
                    message: body.message,
                });
            }
            return match status {
                StatusCode::UNAUTHORIZED => Err(ClientError::Unauthorized),
                StatusCode::FORBIDDEN => Err(ClientError::Forbidden(text)),
                StatusCode::NOT_FOUND => Err(ClientError::NotFound(text)),
                StatusCode::BAD_REQUEST => Err(ClientError::Validation(text)),
                _ => Err(ClientError::Internal(text)),
            };
        }

        response.json().await.map_err(Into::into)
    }

    // ========== Products API ==========

    /// Full catalog listing
    pub async fn products(&self) -> ClientResult<Vec<Product>> {
        self.get("/api/products").await
    }

    /// Pre-checkout stock check
    ///
    /// Advisory only; the commit re-validates inside its transaction.
    pub async fn validate_stock(&self, products: &[CartLine]) -> ClientResult<()> {
        let _: serde_json::Value = self
            .post("/api/products/validate-stock", &ValidateStockRequest { products })
            .await?;
        Ok(())
    }

    // ========== Payment API ==========

    /// Create a payment intent; returns the client secret
    pub async fn create_payment_intent(
        &self,
        amount: i64,
        currency: Option<&str>,
        receipt_email: &str,
    ) -> ClientResult<String> {
        let response: CreateIntentResponse = self
            .post(
                "/api/payment/create-payment-intent",
                &CreateIntentRequest {
                    amount,
                    currency,
                    receipt_email,
                },
            )
            .await?;
        Ok(response.client_secret)
    }

    // ========== Orders API ==========

    /// Commit a paid cart as a new order
    pub async fn commit_order(
        &self,
        products: &[CartLine],
        payment_intent_id: &str,
    ) -> ClientResult<Order> {
        self.post(
            "/api/orders/payment",
            &CommitOrderRequest {
                products,
                payment_intent_id,
            },
        )
        .await
    }

    /// Transition an order's status (admin)
    pub async fn update_status(
        &self,
        order_id: u64,
        status: OrderStatus,
        pickup_time: Option<&str>,
    ) -> ClientResult<StatusUpdate> {
        let mut path = format!("/api/orders/{}/status?status={}", order_id, status);
        if let Some(time) = pickup_time {
            path.push_str("&pickupTime=");
            path.push_str(time);
        }
        self.put(&path).await
    }

    /// Today's orders (admin board seed and poll refresh)
    pub async fn orders_today(&self) -> ClientResult<Vec<Order>> {
        self.get("/api/orders/today").await
    }

    /// The caller's visible order history
    pub async fn my_orders(&self) -> ClientResult<Vec<Order>> {
        self.get("/api/orders/my").await
    }

    /// Fetch one order
    pub async fn order(&self, order_id: u64) -> ClientResult<Order> {
        self.get(&format!("/api/orders/{}", order_id)).await
    }

    /// Hide a cancelled order from the caller's history
    pub async fn delete_order(&self, order_id: u64) -> ClientResult<()> {
        let _: serde_json::Value = self.delete(&format!("/api/orders/{}", order_id)).await?;
        Ok(())
    }

    /// Re-send the ticket email for an order (admin)
    pub async fn resend_ticket(&self, order_id: u64) -> ClientResult<()> {
        let _: serde_json::Value = self
            .post_empty(&format!("/api/orders/{}/resend-ticket", order_id))
            .await?;
        Ok(())
    }

    // ========== Admin API ==========

    /// Pending reconciliation queue (admin)
    pub async fn reconciliations(&self) -> ClientResult<Vec<PendingReconciliation>> {
        self.get("/api/admin/reconciliation").await
    }

    /// Currently connected event channel subscribers (admin)
    pub async fn channel_clients(&self) -> ClientResult<Vec<ChannelClient>> {
        self.get("/api/admin/channel-clients").await
    }

    /// Server liveness check
    pub async fn health(&self) -> ClientResult<()> {
        let _: serde_json::Value = self.get("/api/health").await?;
        Ok(())
    }
}
