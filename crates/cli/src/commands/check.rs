//! Backend connectivity check.
//!
//! Lists the regions visible to the publishable key. A wrong key or URL
//! fails here instead of on the first storefront request.
//!
//! # Environment Variables
//!
//! - `COMMERCE_BACKEND_URL` - Base URL of the commerce backend
//! - `COMMERCE_PUBLISHABLE_KEY` - Store API publishable key

use harbor_storefront::commerce::{CommerceError, StoreClient};
use harbor_storefront::config::{CommerceConfig, ConfigError};
use thiserror::Error;

/// Errors that can occur during the check.
#[derive(Debug, Error)]
pub enum CheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Store API error: {0}")]
    Commerce(#[from] CommerceError),

    #[error("The backend has no regions; the storefront cannot price products")]
    NoRegions,
}

/// Fetch the regions and log what the storefront will sell into.
///
/// # Errors
///
/// Returns an error if the configuration is invalid, the backend rejects the
/// request, or no region is configured.
pub async fn backend() -> Result<(), CheckError> {
    let _ = dotenvy::dotenv();

    let config = CommerceConfig::from_env()?;
    tracing::info!(backend = %config.backend_url, "Checking Store API...");

    let client = StoreClient::new(&config)?;
    let regions = client.list_regions().await?;
    if regions.is_empty() {
        return Err(CheckError::NoRegions);
    }

    for region in &regions {
        let countries: Vec<String> = region.countries.iter().map(|c| c.iso_2.clone()).collect();
        tracing::info!(
            region = %region.name,
            currency = %region.currency_code,
            countries = %countries.join(", "),
            "Region available"
        );
    }

    tracing::info!(regions = regions.len(), "Store API check passed");
    Ok(())
}
