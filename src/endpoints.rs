//! URL construction for the ARES endpoints.

use unicode_normalization::UnicodeNormalization;
use unicode_normalization::char::is_combining_mark;

use crate::identifier::CompanyId;

pub const DEFAULT_BASE_URL: &str = "http://wwwinfo.mfcr.cz/cgi-bin/ares";

const ADDRESS_QUERY: &str = "kraj=&pobvod=&okres=&psc=&obec=&ulice=&mestska_cast=&cislo_do_adresy=&max_pocet=20&cast_obce=&xml=0&jazyk=cz&adresa_textem=";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    base_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL)
    }
}

impl Endpoints {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn basic(&self, id: CompanyId) -> String {
        format!("{}/darv_bas.cgi?ico={}", self.base_url, id)
    }

    pub fn resident(&self, id: CompanyId) -> String {
        format!("{}/darv_res.cgi?ICO={}", self.base_url, id)
    }

    pub fn tax(&self, id: CompanyId) -> String {
        format!("{}/ares_es.cgi?ico={}", self.base_url, id)
    }

    pub fn search(&self, name: &str, city: Option<&str>) -> String {
        format!(
            "{}/ares_es.cgi?obch_jm={}&obec={}",
            self.base_url,
            urlencoding::encode(&strip_diacritics(name)),
            urlencoding::encode(&strip_diacritics(city.unwrap_or_default()))
        )
    }

    /// `encoded_text` must already be percent-encoded in the charset the
    /// address service expects.
    pub fn address(&self, encoded_text: &str) -> String {
        format!(
            "{}/darv_adr.cgi?{}{}",
            self.base_url, ADDRESS_QUERY, encoded_text
        )
    }
}

/// "Příliš žluťoučký" -> "Prilis zlutoucky"
pub fn strip_diacritics(text: &str) -> String {
    text.nfd().filter(|c| !is_combining_mark(*c)).collect()
}
