use std::sync::Arc;

use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Serialize};
use storefront_common::Rupees;

use crate::{
    config::GatewayConfig,
    data_objects::{GatewayOrder, NewGatewayOrder},
    helpers::to_minor_units,
    GatewayApiError,
};

#[derive(Clone)]
pub struct GatewayApi {
    config: GatewayConfig,
    client: Arc<Client>,
}

impl GatewayApi {
    pub fn new(config: GatewayConfig) -> Result<Self, GatewayApiError> {
        let mut headers = HeaderMap::with_capacity(1);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| GatewayApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        body: Option<B>,
    ) -> Result<T, GatewayApiError> {
        let url = self.url(path);
        trace!("💳 Sending gateway request: {method} {url}");
        let mut req = self
            .client
            .request(method, url)
            .basic_auth(&self.config.key_id, Some(self.config.key_secret.reveal()));
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| GatewayApiError::RequestError(e.to_string()))?;
        if response.status().is_success() {
            trace!("💳 Gateway request successful. {}", response.status());
            response.json::<T>().await.map_err(|e| GatewayApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| GatewayApiError::RequestError(e.to_string()))?;
            Err(GatewayApiError::QueryError { status, message })
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Opens a gateway order for `amount`. The returned id is what the checkout page hands to the gateway, and what
    /// comes back to us in the signed callback.
    pub async fn create_order(
        &self,
        amount: Rupees,
        currency: &str,
        receipt: &str,
    ) -> Result<GatewayOrder, GatewayApiError> {
        if !amount.is_chargeable() {
            return Err(GatewayApiError::InvalidCurrencyAmount(format!("Cannot charge {amount}")));
        }
        let body = NewGatewayOrder {
            amount: to_minor_units(amount)?,
            currency: currency.to_string(),
            receipt: receipt.to_string(),
        };
        debug!("💳 Creating gateway order for {amount} {currency} ({receipt})");
        let order = self.rest_query::<GatewayOrder, _>(Method::POST, "/orders", Some(body)).await?;
        info!("💳 Created gateway order {} for {amount} {currency}", order.id);
        Ok(order)
    }

    pub async fn fetch_order(&self, gateway_order_id: &str) -> Result<GatewayOrder, GatewayApiError> {
        let path = format!("/orders/{gateway_order_id}");
        self.rest_query::<GatewayOrder, ()>(Method::GET, &path, None).await
    }
}
