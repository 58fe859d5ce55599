use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};

use crate::models::{Account, Product};
use super::{AccountPort, CatalogPort, PortError};

// ============================================================================
// HTTP Port Adapters
// ============================================================================
//
// JSON clients for the Account and Catalog services. The client-side timeout
// is a backstop; the orchestrator additionally bounds every call with its
// own deadline.
//
// ============================================================================

fn build_client(timeout: Duration) -> Result<Client, reqwest::Error> {
    Client::builder().timeout(timeout).build()
}

/// Client for the Account service.
#[derive(Debug, Clone)]
pub struct HttpAccountClient {
    client: Client,
    base_url: String,
}

impl HttpAccountClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PortError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl AccountPort for HttpAccountClient {
    async fn get_account(&self, id: &str) -> Result<Option<Account>, PortError> {
        let url = format!("{}/accounts/{}", self.base_url, id);
        let response = self.client.get(&url).send().await?;

        match response.status() {
            StatusCode::OK => Ok(Some(response.json::<Account>().await?)),
            StatusCode::NOT_FOUND => Ok(None),
            status => Err(PortError::UnexpectedStatus(status)),
        }
    }
}

/// Client for the Catalog service.
#[derive(Debug, Clone)]
pub struct HttpCatalogClient {
    client: Client,
    base_url: String,
}

impl HttpCatalogClient {
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, PortError> {
        Ok(Self {
            client: build_client(timeout)?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl CatalogPort for HttpCatalogClient {
    async fn get_products(&self, ids: &[String]) -> Result<Vec<Product>, PortError> {
        let url = format!("{}/products", self.base_url);
        let response = self
            .client
            .get(&url)
            .query(&[("ids", ids.join(","))])
            .send()
            .await?;

        match response.status() {
            StatusCode::OK => Ok(response.json::<Vec<Product>>().await?),
            status => Err(PortError::UnexpectedStatus(status)),
        }
    }
}
