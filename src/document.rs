//! Typed shapes of the XML documents returned by ARES.
//!
//! Every response is wrapped in `are:Ares_odpovedi/are:Odpoved`, with payload
//! elements in a second namespace (`D:` for the `darv_*` services, `dtt:` for
//! `ares_es` and the address normalizer). The deserializer matches elements by
//! local name, so prefixes are resolved once here and nowhere else. Every field
//! is optional: a well-formed document that lacks the expected entity maps to
//! "not found", only a document that cannot be read at all is an upstream
//! failure.

use encoding_rs::Encoding;
use serde::Deserialize;
use serde::de::DeserializeOwned;

use crate::error::{AresError, Result};

/// Text content of a leaf element; attributes such as `zdroj="OR"` are ignored.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Text {
    #[serde(rename = "$text", default)]
    value: String,
}

impl Text {
    pub fn as_str(&self) -> &str {
        self.value.trim()
    }

    pub fn is_empty(&self) -> bool {
        self.as_str().is_empty()
    }

    pub fn to_owned_string(&self) -> String {
        self.as_str().to_string()
    }
}

impl From<&str> for Text {
    fn from(value: &str) -> Self {
        Self {
            value: value.to_string(),
        }
    }
}

/// `darv_bas`: basic company record
#[derive(Debug, Default, Deserialize)]
pub struct BasicDocument {
    #[serde(rename = "Odpoved", default)]
    pub response: Option<BasicResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BasicResponse {
    #[serde(rename = "VBAS", default)]
    pub entity: Option<BasicEntity>,
}

#[derive(Debug, Default, Deserialize)]
pub struct BasicEntity {
    #[serde(rename = "ICO", default)]
    pub company_id: Text,
    #[serde(rename = "DIC", default)]
    pub tax_id: Text,
    #[serde(rename = "OF", default)]
    pub company_name: Text,
    #[serde(rename = "AA", default)]
    pub address: Option<InlineAddress>,
}

/// Structured address block shared by `darv_bas` (`AA`) and `darv_res` (`SI`)
#[derive(Debug, Clone, Default, Deserialize)]
pub struct InlineAddress {
    #[serde(rename = "NU", default)]
    pub street: Text,
    #[serde(rename = "CD", default)]
    pub house_number: Text,
    #[serde(rename = "CO", default)]
    pub orientation_number: Text,
    #[serde(rename = "N", default)]
    pub town: Text,
    #[serde(rename = "NCO", default)]
    pub town_part: Text,
    #[serde(rename = "PSC", default)]
    pub zip: Text,
    /// Free-text address, used when the structured fields are missing
    #[serde(rename = "AT", default)]
    pub text: Text,
}

/// `darv_res`: register of economic subjects
#[derive(Debug, Default, Deserialize)]
pub struct ResidentDocument {
    #[serde(rename = "Odpoved", default)]
    pub response: Option<ResidentResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResidentResponse {
    #[serde(rename = "Vypis_RES", default)]
    pub extract: Option<ResidentExtract>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResidentExtract {
    #[serde(rename = "ZAU", default)]
    pub entity: Option<ResidentEntity>,
    #[serde(rename = "SI", default)]
    pub address: Option<InlineAddress>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ResidentEntity {
    #[serde(rename = "ICO", default)]
    pub company_id: Text,
    #[serde(rename = "OF", default)]
    pub company_name: Text,
}

/// `ares_es`: economic subjects, used both for the tax lookup and for search
#[derive(Debug, Default, Deserialize)]
pub struct SubjectsDocument {
    #[serde(rename = "Odpoved", default)]
    pub response: Option<SubjectsResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubjectsResponse {
    #[serde(rename = "V", default)]
    pub list: Option<SubjectList>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SubjectList {
    #[serde(rename = "S", default)]
    pub subjects: Vec<Subject>,
}

#[derive(Debug, Default, Deserialize)]
pub struct Subject {
    #[serde(rename = "ico", default)]
    pub company_id: Text,
    #[serde(rename = "ojm", default)]
    pub company_name: Text,
    #[serde(rename = "jmn", default)]
    pub address_text: Text,
    /// VAT payer flag; `p_dph` is only meaningful when this is set
    #[serde(rename = "dph", default)]
    pub vat_flag: Text,
    #[serde(rename = "p_dph", default)]
    pub vat_id: Text,
}

impl SubjectsDocument {
    pub fn into_subjects(self) -> Vec<Subject> {
        self.response
            .and_then(|response| response.list)
            .map(|list| list.subjects)
            .unwrap_or_default()
    }
}

/// `darv_adr`: free-text address normalization
#[derive(Debug, Default, Deserialize)]
pub struct AddressDocument {
    #[serde(rename = "Odpoved", default)]
    pub response: Option<AddressResponse>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressResponse {
    #[serde(rename = "Stdadr_odpoved", default)]
    pub normalized: Option<NormalizedAddresses>,
}

#[derive(Debug, Default, Deserialize)]
pub struct NormalizedAddresses {
    #[serde(rename = "Vsechna_slova", default)]
    pub all_words: Option<AddressMatches>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressMatches {
    #[serde(rename = "Seznam_navracenych", default)]
    pub returned: Option<AddressCandidates>,
}

#[derive(Debug, Default, Deserialize)]
pub struct AddressCandidates {
    #[serde(rename = "Adresa_ARES", default)]
    pub candidates: Vec<AddressCandidate>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AddressCandidate {
    #[serde(rename = "Kod_statu", default)]
    pub country_code: Text,
    #[serde(rename = "Nazev_ulice", default)]
    pub street: Text,
    #[serde(rename = "Cislo_domovni", default)]
    pub house_number: Text,
    #[serde(rename = "Cislo_orientacni", default)]
    pub orientation_number: Text,
    #[serde(rename = "Nazev_obce", default)]
    pub town: Text,
    #[serde(rename = "Nazev_casti_obce", default)]
    pub town_part: Text,
    #[serde(rename = "PSC", default)]
    pub zip: Text,
}

impl AddressDocument {
    /// The service orders candidates by relevance.
    pub fn into_best_match(self) -> Option<AddressCandidate> {
        self.response
            .and_then(|response| response.normalized)
            .and_then(|normalized| normalized.all_words)
            .and_then(|words| words.returned)
            .and_then(|returned| returned.candidates.into_iter().next())
    }
}

/// Decode and deserialize a response body.
///
/// Empty, undecodable or malformed bodies are reported as an unavailable
/// upstream for `url`.
pub fn parse_document<T: DeserializeOwned>(bytes: &[u8], url: &str) -> Result<T> {
    let text = decode(bytes, url)?;
    let text = text.trim_start_matches('\u{feff}').trim_start();

    if !text.starts_with('<') {
        return Err(AresError::unavailable(url, "empty or non-XML response"));
    }

    quick_xml::de::from_str(text)
        .map_err(|e| AresError::unavailable(url, format!("malformed document: {}", e)))
}

fn decode(bytes: &[u8], url: &str) -> Result<String> {
    let encoding = declared_encoding(bytes).unwrap_or(encoding_rs::UTF_8);
    let (text, _, had_errors) = encoding.decode(bytes);
    if had_errors {
        return Err(AresError::unavailable(
            url,
            format!("response is not valid {}", encoding.name()),
        ));
    }
    Ok(text.into_owned())
}

/// Encoding named in the `<?xml ... encoding="..."?>` declaration, if any.
fn declared_encoding(bytes: &[u8]) -> Option<&'static Encoding> {
    let head = &bytes[..bytes.len().min(256)];
    let head = String::from_utf8_lossy(head);
    let head = head.trim_start_matches('\u{feff}').trim_start();
    let declaration = head.strip_prefix("<?xml")?;
    let declaration = &declaration[..declaration.find("?>")?];

    let after = &declaration[declaration.find("encoding")? + "encoding".len()..];
    let after = after.trim_start().strip_prefix('=')?.trim_start();
    let quote = after.chars().next().filter(|c| *c == '"' || *c == '\'')?;
    let value = &after[1..];
    let label = &value[..value.find(quote)?];

    Encoding::for_label(label.as_bytes())
}
