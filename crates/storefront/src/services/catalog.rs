//! Catalog service client.
//!
//! The catalog is an external collaborator consulted exactly once per order,
//! at creation time, to resolve authoritative product names and unit prices.
//! The resulting snapshots are frozen onto the order lines and never re-read.

use std::collections::HashMap;

use cloudberry_core::{Money, ProductId};
use reqwest::header::{HeaderMap, HeaderValue};
use secrecy::ExposeSecret;
use serde::Deserialize;
use thiserror::Error;

use crate::config::CatalogConfig;

/// Errors that can occur when resolving catalog snapshots.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// HTTP request failed.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// API returned an error response.
    #[error("API error: {status} - {message}")]
    Api { status: u16, message: String },

    /// A requested product does not exist in the catalog.
    #[error("unknown product: {0}")]
    UnknownProduct(ProductId),

    /// Failed to parse the response.
    #[error("Parse error: {0}")]
    Parse(String),
}

/// A product's catalog state at the moment of checkout.
#[derive(Debug, Clone, Deserialize)]
pub struct ProductSnapshot {
    pub id: ProductId,
    pub name: String,
    /// Authoritative unit price in minor units.
    pub unit_price: Money,
}

/// Catalog API client.
#[derive(Clone)]
pub struct CatalogClient {
    client: reqwest::Client,
    base_url: String,
}

impl CatalogClient {
    /// Create a new catalog client.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client fails to build.
    pub fn new(config: &CatalogConfig) -> Result<Self, CatalogError> {
        let mut headers = HeaderMap::new();

        let auth_value = format!("Bearer {}", config.api_token.expose_secret());
        headers.insert(
            "Authorization",
            HeaderValue::from_str(&auth_value)
                .map_err(|e| CatalogError::Parse(format!("Invalid API token format: {e}")))?,
        );

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_owned(),
        })
    }

    /// Resolve snapshots for a set of product IDs.
    ///
    /// Every requested ID must resolve; a product missing from the catalog
    /// fails the whole lookup with [`CatalogError::UnknownProduct`] so a
    /// checkout can never silently drop a line.
    ///
    /// # Errors
    ///
    /// Returns error if the API request fails or a product is unknown.
    pub async fn snapshots(
        &self,
        ids: &[ProductId],
    ) -> Result<HashMap<ProductId, ProductSnapshot>, CatalogError> {
        let id_list = ids
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(",");
        let url = format!("{}/api/products/snapshots?ids={id_list}", self.base_url);

        let response = self.client.get(&url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(CatalogError::Api {
                status: status.as_u16(),
                message,
            });
        }

        let snapshots: Vec<ProductSnapshot> = response
            .json()
            .await
            .map_err(|e| CatalogError::Parse(e.to_string()))?;

        let by_id: HashMap<ProductId, ProductSnapshot> =
            snapshots.into_iter().map(|s| (s.id, s)).collect();

        for id in ids {
            if !by_id.contains_key(id) {
                return Err(CatalogError::UnknownProduct(*id));
            }
        }

        Ok(by_id)
    }
}
