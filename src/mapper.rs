//! Mapping of parsed ARES documents into records.
//!
//! Nothing here performs I/O. The one step that needs a second request, the
//! free-text address of a basic record, is returned as [`AddressSource::FreeText`]
//! for the caller to resolve.

use crate::document::{
    BasicDocument, InlineAddress, ResidentDocument, Subject, SubjectsDocument, Text,
};
use crate::error::{AresError, Result};
use crate::identifier::CompanyId;
use crate::record::{Address, AresRecord, AresRecords, TaxRecord};

/// Internal VAT prefix token used by `ares_es`
const VAT_PREFIX_TOKEN: &str = "dic=";
const COUNTRY_PREFIX: &str = "CZ";

/// Where the address of a basic record comes from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AddressSource {
    Inline(Address),
    /// Needs the address normalization service
    FreeText(String),
    Absent,
}

pub fn map_basic(doc: BasicDocument, id: CompanyId) -> Result<(AresRecord, AddressSource)> {
    let entity = doc
        .response
        .and_then(|response| response.entity)
        .filter(|entity| id.matches(entity.company_id.as_str()))
        .ok_or_else(|| company_not_found(id))?;

    let source = match &entity.address {
        Some(block) if !block.street.is_empty() => {
            AddressSource::Inline(map_inline_address(block))
        }
        Some(block) if !block.text.is_empty() => {
            AddressSource::FreeText(block.text.to_owned_string())
        }
        _ => AddressSource::Absent,
    };

    let record = AresRecord {
        company_id: id.to_string(),
        tax_id: entity.tax_id.to_owned_string(),
        company_name: entity.company_name.to_owned_string(),
        address: Address::default(),
    };

    Ok((record, source))
}

/// Maps everything but the tax identifier, which `darv_res` does not carry.
pub fn map_resident(doc: ResidentDocument, id: CompanyId) -> Result<AresRecord> {
    let extract = doc
        .response
        .and_then(|response| response.extract)
        .ok_or_else(|| company_not_found(id))?;

    let entity = extract
        .entity
        .filter(|entity| id.matches(entity.company_id.as_str()))
        .ok_or_else(|| company_not_found(id))?;

    Ok(AresRecord {
        company_id: id.to_string(),
        tax_id: String::new(),
        company_name: entity.company_name.to_owned_string(),
        address: extract
            .address
            .as_ref()
            .map(map_resident_address)
            .unwrap_or_default(),
    })
}

/// `darv_res` reports the town without its part
fn map_resident_address(block: &InlineAddress) -> Address {
    build_address(
        &block.street,
        &block.house_number,
        &block.orientation_number,
        &block.town,
        &Text::default(),
        &block.zip,
    )
}

pub fn map_tax(doc: SubjectsDocument, id: CompanyId) -> Result<TaxRecord> {
    let subject = doc
        .into_subjects()
        .into_iter()
        .next()
        .filter(|subject| id.matches(subject.company_id.as_str()))
        .ok_or_else(|| AresError::NotFound(format!("tax identifier of company {}", id)))?;

    Ok(TaxRecord {
        tax_id: rewrite_tax_prefix(subject.vat_id.as_str()),
    })
}

pub fn map_search(doc: SubjectsDocument) -> Result<AresRecords> {
    let records = doc.into_subjects().iter().map(map_subject).collect();
    AresRecords::new(records)
        .ok_or_else(|| AresError::NotFound("no company matches the search".to_string()))
}

/// The tax identifier of a search hit is only reported when the VAT flag is
/// set, even if `p_dph` is present. Upstream quirk, kept as is.
fn map_subject(subject: &Subject) -> AresRecord {
    let tax_id = if subject.vat_flag.is_empty() {
        String::new()
    } else {
        rewrite_tax_prefix(subject.vat_id.as_str())
    };

    AresRecord {
        company_id: subject.company_id.to_owned_string(),
        tax_id,
        company_name: subject.company_name.to_owned_string(),
        address: Address::default(),
    }
}

/// "dic=27074358" -> "CZ27074358"
pub fn rewrite_tax_prefix(raw: &str) -> String {
    raw.trim().replace(VAT_PREFIX_TOKEN, COUNTRY_PREFIX)
}

pub fn map_inline_address(block: &InlineAddress) -> Address {
    build_address(
        &block.street,
        &block.house_number,
        &block.orientation_number,
        &block.town,
        &block.town_part,
        &block.zip,
    )
}

/// Shared by the inline and the normalized address paths.
pub(crate) fn build_address(
    street: &Text,
    house_number: &Text,
    orientation_number: &Text,
    town: &Text,
    town_part: &Text,
    zip: &Text,
) -> Address {
    let town = if town_part.is_empty() {
        town.to_owned_string()
    } else {
        format!("{} - {}", town.as_str(), town_part.as_str())
    };

    Address {
        street: street.to_owned_string(),
        house_number: house_number.to_owned_string(),
        orientation_number: (!orientation_number.is_empty())
            .then(|| orientation_number.to_owned_string()),
        town,
        zip: zip.to_owned_string(),
    }
}

fn company_not_found(id: CompanyId) -> AresError {
    AresError::NotFound(format!("company identification number {} was not found", id))
}
