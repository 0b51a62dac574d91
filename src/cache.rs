//! Time-bucketed response cache.
//!
//! Records are stored as versioned JSON envelopes named after the operation,
//! the identifier (or a hash of the search query) and the current time
//! bucket. A bucket is never revisited once the calendar moves on, so old
//! files are simply ignored rather than evicted. Cache failures are logged
//! and behave like a miss.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, Datelike, Local, NaiveDate, Utc};
use moka::future::Cache;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tokio::fs;
use tracing::{debug, warn};

use crate::config::CacheConfig;
use crate::error::{CacheError, CacheResult};
use crate::identifier::CompanyId;

/// Bumped whenever the envelope or a record layout changes
pub const CACHE_FORMAT_VERSION: u32 = 1;

/// Granularity of the cache validity window
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CacheStrategy {
    Day,
    /// ISO week-numbering year and week
    #[default]
    YearWeek,
    YearMonth,
    Year,
}

impl CacheStrategy {
    pub fn bucket(self, date: NaiveDate) -> String {
        match self {
            CacheStrategy::Day => date.format("%Y%m%d").to_string(),
            CacheStrategy::YearWeek => {
                let week = date.iso_week();
                format!("{}{:02}", week.year(), week.week())
            }
            CacheStrategy::YearMonth => date.format("%Y%m").to_string(),
            CacheStrategy::Year => date.format("%Y").to_string(),
        }
    }
}

impl std::str::FromStr for CacheStrategy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "day" => Ok(CacheStrategy::Day),
            "year_week" | "week" => Ok(CacheStrategy::YearWeek),
            "year_month" | "month" => Ok(CacheStrategy::YearMonth),
            "year" => Ok(CacheStrategy::Year),
            other => Err(format!("unknown cache strategy: {}", other)),
        }
    }
}

/// Trait for abstracting the current date
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

/// Local calendar date
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

/// Always reports the same date
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Cached lookup operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Operation {
    #[serde(rename = "bas")]
    Basic,
    #[serde(rename = "res")]
    Resident,
    #[serde(rename = "tax")]
    Tax,
    #[serde(rename = "find")]
    Search,
}

impl Operation {
    pub fn prefix(self) -> &'static str {
        match self {
            Operation::Basic => "bas",
            Operation::Resident => "res",
            Operation::Tax => "tax",
            Operation::Search => "find",
        }
    }
}

/// Identifies one cache entry
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub operation: Operation,
    pub key: String,
}

impl CacheKey {
    /// `{id}_{bucket}`
    pub fn for_id(operation: Operation, id: CompanyId, bucket: &str) -> Self {
        Self {
            operation,
            key: format!("{}_{}", id, bucket),
        }
    }

    /// `{bucket}_{sha256(name, city)}`
    pub fn for_search(name: &str, city: Option<&str>, bucket: &str) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(name.as_bytes());
        hasher.update([0u8]);
        hasher.update(city.unwrap_or_default().as_bytes());

        Self {
            operation: Operation::Search,
            key: format!("{}_{}", bucket, hex::encode(hasher.finalize())),
        }
    }

    pub fn file_name(&self) -> String {
        format!("{}_{}.json", self.operation.prefix(), self.key)
    }

    pub fn raw_file_name(&self) -> String {
        format!("{}_raw_{}.xml", self.operation.prefix(), self.key)
    }
}

#[derive(Debug, Serialize, Deserialize)]
struct CacheEnvelope<T> {
    version: u32,
    operation: Operation,
    key: String,
    created_at: DateTime<Utc>,
    record: T,
}

fn encode_envelope<T: Serialize>(key: &CacheKey, record: &T) -> CacheResult<Vec<u8>> {
    let envelope = CacheEnvelope {
        version: CACHE_FORMAT_VERSION,
        operation: key.operation,
        key: key.key.clone(),
        created_at: Utc::now(),
        record,
    };

    serde_json::to_vec_pretty(&envelope).map_err(|e| CacheError::WriteError {
        key: key.file_name(),
        details: format!("Failed to serialize record: {}", e),
    })
}

fn decode_envelope<T: DeserializeOwned>(key: &CacheKey, bytes: &[u8]) -> CacheResult<T> {
    let corruption = |details: String| CacheError::Corruption {
        key: key.file_name(),
        details,
    };

    let envelope: CacheEnvelope<serde_json::Value> =
        serde_json::from_slice(bytes).map_err(|e| corruption(e.to_string()))?;

    if envelope.version != CACHE_FORMAT_VERSION {
        return Err(corruption(format!(
            "unsupported format version {}",
            envelope.version
        )));
    }
    if envelope.operation != key.operation || envelope.key != key.key {
        return Err(corruption("entry belongs to another key".to_string()));
    }

    serde_json::from_value(envelope.record).map_err(|e| corruption(e.to_string()))
}

/// File-per-entry store under the cache directory
pub struct DiskCache {
    directory: PathBuf,
}

impl DiskCache {
    pub fn new(directory: PathBuf) -> Self {
        Self { directory }
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub async fn read(&self, name: &str) -> CacheResult<Option<Vec<u8>>> {
        match fs::read(self.directory.join(name)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(CacheError::ReadError {
                key: name.to_string(),
                details: e.to_string(),
            }),
        }
    }

    pub async fn write(&self, name: &str, bytes: &[u8]) -> CacheResult<()> {
        fs::create_dir_all(&self.directory)
            .await
            .map_err(|e| CacheError::InitializationFailed {
                details: format!(
                    "Failed to create cache directory {}: {}",
                    self.directory.display(),
                    e
                ),
            })?;

        fs::write(self.directory.join(name), bytes)
            .await
            .map_err(|e| CacheError::WriteError {
                key: name.to_string(),
                details: e.to_string(),
            })
    }
}

/// In-process tier in front of the disk, holding encoded envelopes
pub struct MemoryCache {
    cache: Cache<String, Arc<Vec<u8>>>,
}

impl MemoryCache {
    pub fn new(max_capacity: u64) -> Self {
        let cache = Cache::builder().max_capacity(max_capacity).build();
        Self { cache }
    }

    pub async fn get(&self, name: &str) -> Option<Arc<Vec<u8>>> {
        self.cache.get(name).await
    }

    pub async fn set(&self, name: String, bytes: Arc<Vec<u8>>) {
        self.cache.insert(name, bytes).await;
    }
}

struct Tiers {
    memory: MemoryCache,
    disk: DiskCache,
}

/// Two-tier response cache; a pass-through when no directory is configured
pub struct ResponseCache {
    tiers: Option<Tiers>,
    strategy: CacheStrategy,
    capture_raw: bool,
    clock: Arc<dyn Clock>,
}

impl ResponseCache {
    pub fn new(config: &CacheConfig) -> Self {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: &CacheConfig, clock: Arc<dyn Clock>) -> Self {
        if let Some(directory) = &config.directory {
            // Writes retry the creation
            if let Err(e) = std::fs::create_dir_all(directory) {
                warn!(directory = %directory.display(), error = %e, "cannot create cache directory");
            }
        }

        let tiers = config.directory.as_ref().map(|directory| Tiers {
            memory: MemoryCache::new(config.max_memory_entries),
            disk: DiskCache::new(directory.clone()),
        });

        Self {
            capture_raw: config.debug && tiers.is_some(),
            tiers,
            strategy: config.strategy,
            clock,
        }
    }

    pub fn disabled() -> Self {
        Self::new(&CacheConfig::default())
    }

    pub fn is_enabled(&self) -> bool {
        self.tiers.is_some()
    }

    pub fn directory(&self) -> Option<&Path> {
        self.tiers.as_ref().map(|tiers| tiers.disk.directory())
    }

    pub fn current_bucket(&self) -> String {
        self.strategy.bucket(self.clock.today())
    }

    pub fn id_key(&self, operation: Operation, id: CompanyId) -> CacheKey {
        CacheKey::for_id(operation, id, &self.current_bucket())
    }

    pub fn search_key(&self, name: &str, city: Option<&str>) -> CacheKey {
        CacheKey::for_search(name, city, &self.current_bucket())
    }

    /// Memory first, then disk; disk hits repopulate memory.
    pub async fn lookup<T: DeserializeOwned>(&self, key: &CacheKey) -> Option<T> {
        let tiers = self.tiers.as_ref()?;
        let name = key.file_name();

        if let Some(bytes) = tiers.memory.get(&name).await {
            match decode_envelope(key, &bytes) {
                Ok(record) => {
                    debug!(entry = %name, "memory cache hit");
                    return Some(record);
                }
                Err(e) => warn!(error = %e, "discarding memory cache entry"),
            }
        }

        let bytes = match tiers.disk.read(&name).await {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                debug!(entry = %name, "cache miss");
                return None;
            }
            Err(e) => {
                warn!(error = %e, "cache read failed, treating as miss");
                return None;
            }
        };

        match decode_envelope(key, &bytes) {
            Ok(record) => {
                debug!(entry = %name, "disk cache hit");
                tiers.memory.set(name, Arc::new(bytes)).await;
                Some(record)
            }
            Err(e) => {
                warn!(error = %e, "ignoring unreadable cache entry");
                None
            }
        }
    }

    pub async fn store<T: Serialize>(&self, key: &CacheKey, record: &T) {
        let Some(tiers) = self.tiers.as_ref() else {
            return;
        };
        let name = key.file_name();

        let bytes = match encode_envelope(key, record) {
            Ok(bytes) => bytes,
            Err(e) => {
                warn!(error = %e, "not caching record");
                return;
            }
        };

        if let Err(e) = tiers.disk.write(&name, &bytes).await {
            warn!(error = %e, "cache write failed");
        }
        tiers.memory.set(name, Arc::new(bytes)).await;
    }

    /// Keeps the unparsed upstream body next to the entry when debugging.
    pub async fn store_raw(&self, key: &CacheKey, bytes: &[u8]) {
        if !self.capture_raw {
            return;
        }
        let Some(tiers) = self.tiers.as_ref() else {
            return;
        };

        if let Err(e) = tiers.disk.write(&key.raw_file_name(), bytes).await {
            warn!(error = %e, "raw response capture failed");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{AresRecord, TaxRecord};
    use tempfile::TempDir;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn create_test_cache(debug: bool) -> (ResponseCache, TempDir) {
        let temp_dir = TempDir::new().unwrap();
        let config = CacheConfig {
            directory: Some(temp_dir.path().to_path_buf()),
            debug,
            ..Default::default()
        };
        let cache = ResponseCache::with_clock(&config, Arc::new(FixedClock(date(2025, 10, 15))));
        (cache, temp_dir)
    }

    fn tax(id: &str) -> TaxRecord {
        TaxRecord {
            tax_id: format!("CZ{}", id),
        }
    }

    #[test]
    fn test_bucket_formats() {
        let day = date(2025, 3, 7);
        assert_eq!(CacheStrategy::Day.bucket(day), "20250307");
        assert_eq!(CacheStrategy::YearWeek.bucket(day), "202510");
        assert_eq!(CacheStrategy::YearMonth.bucket(day), "202503");
        assert_eq!(CacheStrategy::Year.bucket(day), "2025");
    }

    #[test]
    fn test_year_week_uses_iso_year_at_boundary() {
        // Monday 2024-12-30 belongs to ISO week 1 of 2025
        assert_eq!(CacheStrategy::YearWeek.bucket(date(2024, 12, 30)), "202501");
        assert_eq!(CacheStrategy::YearWeek.bucket(date(2024, 1, 3)), "202401");
        assert_ne!(
            CacheStrategy::YearWeek.bucket(date(2024, 12, 30)),
            CacheStrategy::YearWeek.bucket(date(2024, 1, 3))
        );
    }

    #[test]
    fn test_strategy_from_str() {
        assert_eq!("day".parse::<CacheStrategy>().unwrap(), CacheStrategy::Day);
        assert_eq!("YEAR_WEEK".parse::<CacheStrategy>().unwrap(), CacheStrategy::YearWeek);
        assert_eq!("month".parse::<CacheStrategy>().unwrap(), CacheStrategy::YearMonth);
        assert!("hourly".parse::<CacheStrategy>().is_err());
    }

    #[test]
    fn test_cache_key_generation() {
        let id = CompanyId::from(27074358);
        let key = CacheKey::for_id(Operation::Basic, id, "202542");
        assert_eq!(key.file_name(), "bas_27074358_202542.json");
        assert_eq!(key.raw_file_name(), "bas_raw_27074358_202542.xml");

        let search = CacheKey::for_search("Asseco", Some("Praha"), "202542");
        assert!(search.key.starts_with("202542_"));
        assert!(search.file_name().starts_with("find_202542_"));
        assert_eq!(search, CacheKey::for_search("Asseco", Some("Praha"), "202542"));

        // Name/city boundary is part of the hash
        assert_ne!(
            CacheKey::for_search("ab", Some("c"), "1"),
            CacheKey::for_search("a", Some("bc"), "1")
        );
        assert_eq!(
            CacheKey::for_search("abc", None, "1"),
            CacheKey::for_search("abc", Some(""), "1")
        );
    }

    #[tokio::test]
    async fn test_disabled_cache_always_misses() {
        let cache = ResponseCache::disabled();
        assert!(!cache.is_enabled());

        let key = cache.id_key(Operation::Tax, CompanyId::from(1));
        cache.store(&key, &tax("1")).await;
        cache.store_raw(&key, b"<raw/>").await;
        assert!(cache.lookup::<TaxRecord>(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_store_then_lookup() {
        let (cache, temp_dir) = create_test_cache(false);
        let key = cache.id_key(Operation::Tax, CompanyId::from(27074358));
        assert_eq!(key.key, "27074358_202542");

        assert!(cache.lookup::<TaxRecord>(&key).await.is_none());
        cache.store(&key, &tax("27074358")).await;

        assert_eq!(cache.lookup::<TaxRecord>(&key).await, Some(tax("27074358")));
        assert!(temp_dir.path().join(key.file_name()).exists());
    }

    #[tokio::test]
    async fn test_disk_entry_survives_new_instance() {
        let (cache, temp_dir) = create_test_cache(false);
        let key = cache.id_key(Operation::Basic, CompanyId::from(1));
        let record = AresRecord {
            company_id: "1".to_string(),
            company_name: "One".to_string(),
            ..Default::default()
        };
        cache.store(&key, &record).await;

        let config = CacheConfig {
            directory: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let reopened = ResponseCache::with_clock(&config, Arc::new(FixedClock(date(2025, 10, 16))));
        assert_eq!(reopened.lookup::<AresRecord>(&key).await, Some(record));

        let tiers = reopened.tiers.as_ref().unwrap();
        assert!(tiers.memory.get(&key.file_name()).await.is_some());
    }

    #[tokio::test]
    async fn test_next_bucket_is_a_miss() {
        let (cache, temp_dir) = create_test_cache(false);
        let key = cache.id_key(Operation::Tax, CompanyId::from(1));
        cache.store(&key, &tax("1")).await;

        let config = CacheConfig {
            directory: Some(temp_dir.path().to_path_buf()),
            ..Default::default()
        };
        let next_week = ResponseCache::with_clock(&config, Arc::new(FixedClock(date(2025, 10, 22))));
        let next_key = next_week.id_key(Operation::Tax, CompanyId::from(1));
        assert_ne!(key, next_key);
        assert!(next_week.lookup::<TaxRecord>(&next_key).await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_entry_is_a_miss() {
        let (cache, temp_dir) = create_test_cache(false);
        let key = cache.id_key(Operation::Tax, CompanyId::from(1));
        std::fs::write(temp_dir.path().join(key.file_name()), b"{ not json").unwrap();

        assert!(cache.lookup::<TaxRecord>(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_foreign_version_is_a_miss() {
        let (cache, temp_dir) = create_test_cache(false);
        let key = cache.id_key(Operation::Tax, CompanyId::from(1));
        let content = serde_json::json!({
            "version": CACHE_FORMAT_VERSION + 1,
            "operation": "tax",
            "key": key.key.clone(),
            "created_at": "2025-10-15T10:00:00Z",
            "record": { "tax_id": "CZ1" }
        });
        std::fs::write(
            temp_dir.path().join(key.file_name()),
            serde_json::to_vec(&content).unwrap(),
        )
        .unwrap();

        assert!(cache.lookup::<TaxRecord>(&key).await.is_none());
    }

    #[tokio::test]
    async fn test_envelope_is_inspectable_json() {
        let (cache, temp_dir) = create_test_cache(false);
        let key = cache.id_key(Operation::Tax, CompanyId::from(5));
        cache.store(&key, &tax("5")).await;

        let content = std::fs::read_to_string(temp_dir.path().join(key.file_name())).unwrap();
        let value: serde_json::Value = serde_json::from_str(&content).unwrap();
        assert_eq!(value["version"], CACHE_FORMAT_VERSION);
        assert_eq!(value["operation"], "tax");
        assert_eq!(value["record"]["tax_id"], "CZ5");
    }

    #[tokio::test]
    async fn test_raw_capture_requires_debug() {
        let (quiet, quiet_dir) = create_test_cache(false);
        let key = quiet.id_key(Operation::Basic, CompanyId::from(1));
        quiet.store_raw(&key, b"<raw/>").await;
        assert!(!quiet_dir.path().join(key.raw_file_name()).exists());

        let (debug, debug_dir) = create_test_cache(true);
        debug.store_raw(&key, b"<raw/>").await;
        let raw = std::fs::read(debug_dir.path().join(key.raw_file_name())).unwrap();
        assert_eq!(raw, b"<raw/>");
    }

    #[tokio::test]
    async fn test_cache_directory_is_created() {
        let temp_dir = TempDir::new().unwrap();
        let directory = temp_dir.path().join("nested").join("ares");
        let config = CacheConfig {
            directory: Some(directory.clone()),
            ..Default::default()
        };
        let cache = ResponseCache::new(&config);
        assert!(directory.is_dir());

        std::fs::remove_dir_all(&directory).unwrap();
        let key = cache.id_key(Operation::Tax, CompanyId::from(9));
        cache.store(&key, &tax("9")).await;

        assert!(directory.join(key.file_name()).is_file());
    }

    #[tokio::test]
    async fn test_memory_cache_basic_operations() {
        let cache = MemoryCache::new(10);
        assert!(cache.get("entry").await.is_none());

        cache.set("entry".to_string(), Arc::new(b"data".to_vec())).await;
        assert_eq!(cache.get("entry").await.unwrap().as_slice(), b"data");
        assert!(cache.get("other").await.is_none());
    }
}
