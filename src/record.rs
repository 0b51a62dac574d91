use std::ops::Deref;

use serde::{Deserialize, Serialize};

/// Postal address of a registered company
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub street: String,
    /// Descriptive ("číslo popisné") number
    pub house_number: String,
    /// Present only when the registry distinguishes orientation numbering
    pub orientation_number: Option<String>,
    /// Town, or "town - part" when the registry names a part of the town
    pub town: String,
    pub zip: String,
}

impl Address {
    pub fn is_empty(&self) -> bool {
        self.street.is_empty()
            && self.house_number.is_empty()
            && self.orientation_number.is_none()
            && self.town.is_empty()
            && self.zip.is_empty()
    }

    /// "Street 12/3a", "Street 12" or just the street name.
    pub fn street_with_numbers(&self) -> String {
        let mut out = self.street.clone();
        if !self.house_number.is_empty() {
            if !out.is_empty() {
                out.push(' ');
            }
            out.push_str(&self.house_number);
            if let Some(orientation) = &self.orientation_number {
                out.push('/');
                out.push_str(orientation);
            }
        }
        out
    }
}

/// Company record returned by the identification number lookups and by search
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AresRecord {
    pub company_id: String,
    /// "CZ..." tax identifier, empty when the company has none or it is unknown
    pub tax_id: String,
    pub company_name: String,
    pub address: Address,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaxRecord {
    pub tax_id: String,
}

/// Non-empty, ordered list of search matches
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "Vec<AresRecord>", into = "Vec<AresRecord>")]
pub struct AresRecords(Vec<AresRecord>);

impl AresRecords {
    /// Returns `None` for an empty list; an empty search is not a result.
    pub fn new(records: Vec<AresRecord>) -> Option<Self> {
        if records.is_empty() {
            None
        } else {
            Some(Self(records))
        }
    }

    pub fn into_inner(self) -> Vec<AresRecord> {
        self.0
    }
}

impl Deref for AresRecords {
    type Target = [AresRecord];

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl IntoIterator for AresRecords {
    type Item = AresRecord;
    type IntoIter = std::vec::IntoIter<AresRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

impl<'a> IntoIterator for &'a AresRecords {
    type Item = &'a AresRecord;
    type IntoIter = std::slice::Iter<'a, AresRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

impl TryFrom<Vec<AresRecord>> for AresRecords {
    type Error = String;

    fn try_from(records: Vec<AresRecord>) -> Result<Self, Self::Error> {
        Self::new(records).ok_or_else(|| "search result list must not be empty".to_string())
    }
}

impl From<AresRecords> for Vec<AresRecord> {
    fn from(records: AresRecords) -> Self {
        records.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(id: &str) -> AresRecord {
        AresRecord {
            company_id: id.to_string(),
            company_name: format!("Company {}", id),
            ..Default::default()
        }
    }

    #[test]
    fn test_street_with_numbers() {
        let mut address = Address {
            street: "Budějovická".to_string(),
            house_number: "778".to_string(),
            orientation_number: Some("3a".to_string()),
            town: "Praha - Michle".to_string(),
            zip: "14000".to_string(),
        };
        assert_eq!(address.street_with_numbers(), "Budějovická 778/3a");

        address.orientation_number = None;
        assert_eq!(address.street_with_numbers(), "Budějovická 778");

        address.street.clear();
        assert_eq!(address.street_with_numbers(), "778");
    }

    #[test]
    fn test_empty_address() {
        assert!(Address::default().is_empty());
        let address = Address {
            zip: "11000".to_string(),
            ..Default::default()
        };
        assert!(!address.is_empty());
    }

    #[test]
    fn test_records_reject_empty() {
        assert!(AresRecords::new(vec![]).is_none());
        let records = AresRecords::new(vec![record("1"), record("2")]).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].company_id, "1");
        let ids: Vec<_> = records.iter().map(|r| r.company_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[test]
    fn test_records_deserialize_rejects_empty_list() {
        let result: Result<AresRecords, _> = serde_json::from_str("[]");
        assert!(result.is_err());

        let json = serde_json::to_string(&AresRecords::new(vec![record("7")]).unwrap()).unwrap();
        let back: AresRecords = serde_json::from_str(&json).unwrap();
        assert_eq!(back.into_inner(), vec![record("7")]);
    }
}
