use std::path::PathBuf;
use std::sync::{Arc, Once};

use chrono::NaiveDate;
use tempfile::TempDir;

use ares_client::{
    AresClient, CacheConfig, CacheStrategy, Endpoints, FixedClock, ResponseCache,
};

use super::mocks::ScriptedFetcher;

pub const BASE_URL: &str = "http://ares.test/cgi-bin/ares";

/// Test fixture paths
pub struct TestFixtures {
    pub fixtures_dir: PathBuf,
}

impl TestFixtures {
    pub fn new() -> Self {
        let fixtures_dir = PathBuf::from(env!("CARGO_MANIFEST_DIR"))
            .join("tests")
            .join("fixtures");

        Self { fixtures_dir }
    }

    pub fn load(&self, name: &str) -> Vec<u8> {
        std::fs::read(self.fixtures_dir.join(name))
            .unwrap_or_else(|e| panic!("missing fixture {}: {}", name, e))
    }
}

/// Route library logs to the test output, filtered by `RUST_LOG`
pub fn init_tracing() {
    static INIT: Once = Once::new();
    INIT.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .with_test_writer()
            .try_init();
    });
}

pub fn endpoints() -> Endpoints {
    Endpoints::new(BASE_URL)
}

pub fn date(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

pub fn cache_config(temp_dir: &TempDir) -> CacheConfig {
    CacheConfig {
        directory: Some(temp_dir.path().to_path_buf()),
        strategy: CacheStrategy::YearWeek,
        ..Default::default()
    }
}

pub fn cache_at(config: &CacheConfig, today: NaiveDate) -> ResponseCache {
    ResponseCache::with_clock(config, Arc::new(FixedClock(today)))
}

/// Client over a scripted fetcher; the fetcher handle stays usable for
/// scripting and inspecting requests.
pub fn client_with(
    fetcher: &ScriptedFetcher,
    cache: ResponseCache,
) -> AresClient<ScriptedFetcher> {
    AresClient::with_parts(fetcher.clone(), endpoints(), cache)
}
