//! # ares-client Library
//!
//! An async client for the Czech business registry (ARES) with a time-bucketed
//! response cache, typed XML mapping and free-text address normalization.

pub mod address;
pub mod cache;
pub mod client;
pub mod config;
pub mod document;
pub mod endpoints;
pub mod error;
pub mod http_client;
pub mod identifier;
pub mod mapper;
pub mod record;

pub use address::AddressResolver;
pub use cache::{
    CACHE_FORMAT_VERSION, CacheKey, CacheStrategy, Clock, DiskCache, FixedClock, MemoryCache,
    Operation, ResponseCache, SystemClock,
};
pub use client::{AresClient, MIN_SEARCH_LENGTH, TaxLookup};
pub use config::{
    AresConfig, CacheConfig, ConfigError, ConfigManager, EndpointConfig, EnvProvider,
    NetworkConfig, SystemEnvProvider,
};
pub use endpoints::{DEFAULT_BASE_URL, Endpoints};
pub use error::{AresError, CacheError, ErrorKind, Result};
pub use http_client::{AsyncHttpClient, Fetcher, HttpClientConfig};
pub use identifier::CompanyId;
pub use mapper::AddressSource;
pub use record::{Address, AresRecord, AresRecords, TaxRecord};
