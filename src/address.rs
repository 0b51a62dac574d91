//! Free-text address normalization through `darv_adr`.
//!
//! The service only understands ISO-8859-2, so the text is transcoded and
//! percent-encoded byte by byte before it goes into the query string.

use std::borrow::Cow;

use encoding_rs::ISO_8859_2;
use tracing::{debug, warn};

use crate::document::{AddressDocument, parse_document};
use crate::endpoints::Endpoints;
use crate::error::{AresError, Result};
use crate::http_client::Fetcher;
use crate::mapper::build_address;
use crate::record::Address;

/// Resolves free-text addresses into structured ones
pub struct AddressResolver<'a, F: Fetcher + ?Sized> {
    fetcher: &'a F,
    endpoints: &'a Endpoints,
}

impl<'a, F: Fetcher + ?Sized> AddressResolver<'a, F> {
    pub fn new(fetcher: &'a F, endpoints: &'a Endpoints) -> Self {
        Self { fetcher, endpoints }
    }

    /// Best match for `text`; NotFound when the service returns no usable candidate.
    pub async fn resolve(&self, text: &str) -> Result<Address> {
        let url = self.endpoints.address(&encode_query_text(text));
        debug!(%url, "normalizing address");

        let body = self.fetcher.fetch(&url).await?;
        let document: AddressDocument = parse_document(&body, &url)?;

        let candidate = document
            .into_best_match()
            .filter(|candidate| !candidate.country_code.is_empty())
            .ok_or_else(|| AresError::NotFound(format!("address is not valid: {}", text)))?;

        Ok(build_address(
            &candidate.street,
            &candidate.house_number,
            &candidate.orientation_number,
            &candidate.town,
            &candidate.town_part,
            &candidate.zip,
        ))
    }
}

/// ISO-8859-2 bytes of `text`, percent-encoded.
///
/// Characters outside the charset turn into numeric character references.
pub fn encode_query_text(text: &str) -> String {
    let (bytes, _, unmappable) = ISO_8859_2.encode(text);
    if unmappable {
        warn!(text, "address contains characters outside ISO-8859-2");
    }
    match urlencoding::encode_binary(&bytes) {
        Cow::Borrowed(encoded) => encoded.to_string(),
        Cow::Owned(encoded) => encoded,
    }
}
