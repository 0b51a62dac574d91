//! The four ARES lookups.
//!
//! Each lookup normalizes its input, consults the cache, and only on a miss
//! fetches, maps and stores. Invalid input is rejected before any I/O.

use async_trait::async_trait;
use tracing::{debug, info};

use crate::address::AddressResolver;
use crate::cache::{CacheKey, Operation, ResponseCache};
use crate::config::{AresConfig, ConfigManager};
use crate::document::parse_document;
use crate::endpoints::Endpoints;
use crate::error::{AresError, Result};
use crate::http_client::{AsyncHttpClient, Fetcher, HttpClientConfig};
use crate::identifier::CompanyId;
use crate::mapper::{self, AddressSource};
use crate::record::{Address, AresRecord, AresRecords, TaxRecord};

/// Shortest accepted company name query, in characters
pub const MIN_SEARCH_LENGTH: usize = 3;

/// Source of tax identifiers for the resident lookup
#[async_trait]
pub trait TaxLookup: Send + Sync {
    async fn tax_record(&self, id: CompanyId) -> Result<TaxRecord>;
}

/// ARES registry client
pub struct AresClient<F: Fetcher = AsyncHttpClient> {
    fetcher: F,
    endpoints: Endpoints,
    cache: ResponseCache,
}

impl AresClient {
    /// Client talking to the configured endpoint over HTTP
    pub fn new(config: &AresConfig) -> Result<Self> {
        ConfigManager::validate_config(config)?;

        let fetcher = AsyncHttpClient::new(HttpClientConfig::from(&config.network))?;
        let endpoints = Endpoints::new(config.endpoint.base_url.as_str());
        let cache = ResponseCache::new(&config.cache);

        Ok(Self::with_parts(fetcher, endpoints, cache))
    }
}

impl<F: Fetcher> AresClient<F> {
    pub fn with_parts(fetcher: F, endpoints: Endpoints, cache: ResponseCache) -> Self {
        Self {
            fetcher,
            endpoints,
            cache,
        }
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    pub fn cache(&self) -> &ResponseCache {
        &self.cache
    }

    /// Basic record from `darv_bas`.
    ///
    /// A free-text address is normalized with a second request.
    pub async fn find_by_identification_number(&self, id: &str) -> Result<AresRecord> {
        let id = CompanyId::parse(id)?;
        let key = self.cache.id_key(Operation::Basic, id);
        if let Some(record) = self.cache.lookup(&key).await {
            return Ok(record);
        }

        let url = self.endpoints.basic(id);
        let body = self.fetch(&key, &url).await?;
        let (mut record, source) = mapper::map_basic(parse_document(&body, &url)?, id)?;

        record.address = match source {
            AddressSource::Inline(address) => address,
            AddressSource::FreeText(text) => {
                AddressResolver::new(&self.fetcher, &self.endpoints)
                    .resolve(&text)
                    .await?
            }
            AddressSource::Absent => Address::default(),
        };

        self.cache.store(&key, &record).await;
        Ok(record)
    }

    /// Resident record from `darv_res`, completed with the tax identifier
    /// from this client.
    pub async fn find_in_res_by_id(&self, id: &str) -> Result<AresRecord> {
        self.find_in_res_by_id_with(id, self).await
    }

    /// Resident record from `darv_res`; the tax identifier comes from `tax`.
    pub async fn find_in_res_by_id_with(
        &self,
        id: &str,
        tax: &impl TaxLookup,
    ) -> Result<AresRecord> {
        let id = CompanyId::parse(id)?;
        let key = self.cache.id_key(Operation::Resident, id);
        if let Some(record) = self.cache.lookup(&key).await {
            return Ok(record);
        }

        let url = self.endpoints.resident(id);
        let body = self.fetch(&key, &url).await?;
        let mut record = mapper::map_resident(parse_document(&body, &url)?, id)?;
        record.tax_id = tax.tax_record(id).await?.tax_id;

        self.cache.store(&key, &record).await;
        Ok(record)
    }

    /// Tax identifier from `ares_es`.
    pub async fn find_vat_by_id(&self, id: &str) -> Result<TaxRecord> {
        let id = CompanyId::parse(id)?;
        self.lookup_tax(id).await
    }

    /// Companies matching `name`, optionally restricted to `city`.
    pub async fn find_by_name(&self, name: &str, city: Option<&str>) -> Result<AresRecords> {
        let name = name.trim();
        if name.chars().count() < MIN_SEARCH_LENGTH {
            return Err(AresError::InvalidInput(format!(
                "company name must have at least {} characters",
                MIN_SEARCH_LENGTH
            )));
        }
        let city = city.map(str::trim).filter(|city| !city.is_empty());

        let key = self.cache.search_key(name, city);
        if let Some(records) = self.cache.lookup(&key).await {
            return Ok(records);
        }

        let url = self.endpoints.search(name, city);
        let body = self.fetch(&key, &url).await?;
        let records = mapper::map_search(parse_document(&body, &url)?)?;
        info!(name, city, count = records.len(), "search finished");

        self.cache.store(&key, &records).await;
        Ok(records)
    }

    async fn lookup_tax(&self, id: CompanyId) -> Result<TaxRecord> {
        let key = self.cache.id_key(Operation::Tax, id);
        if let Some(record) = self.cache.lookup(&key).await {
            return Ok(record);
        }

        let url = self.endpoints.tax(id);
        let body = self.fetch(&key, &url).await?;
        let record = mapper::map_tax(parse_document(&body, &url)?, id)?;

        self.cache.store(&key, &record).await;
        Ok(record)
    }

    async fn fetch(&self, key: &CacheKey, url: &str) -> Result<Vec<u8>> {
        debug!(url, operation = key.operation.prefix(), "fetching");
        let body = self.fetcher.fetch(url).await?;
        self.cache.store_raw(key, &body).await;
        Ok(body)
    }
}

#[async_trait]
impl<F: Fetcher> TaxLookup for AresClient<F> {
    async fn tax_record(&self, id: CompanyId) -> Result<TaxRecord> {
        self.lookup_tax(id).await
    }
}
