//! Test fixtures and sample data.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Collection used by tests that don't care about the schema name.
pub const TEST_SCHEMA: &str = "TEST_SCHEMA";

/// Contact details nested inside a [`CaseDocument`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactDetails {
    /// Given name
    pub forename: String,
    /// Family name
    pub surname: String,
}

/// Sample document stored by tests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CaseDocument {
    /// Case identifier, also used as the document key
    pub id: Uuid,
    /// Respondent contact
    pub contact: ContactDetails,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl CaseDocument {
    /// Create a case for the given respondent.
    #[must_use]
    pub fn new(forename: &str, surname: &str) -> Self {
        Self {
            id: Uuid::new_v4(),
            contact: ContactDetails {
                forename: forename.to_string(),
                surname: surname.to_string(),
            },
            created_at: Utc::now(),
        }
    }

    /// Create a sample case.
    #[must_use]
    pub fn sample() -> Self {
        Self::new("Ada", "Lovelace")
    }

    /// Document key for this case.
    #[must_use]
    pub fn key(&self) -> String {
        self.id.to_string()
    }
}

/// Create several sample cases sharing a surname.
#[must_use]
pub fn sample_cases(surname: &str, count: usize) -> Vec<CaseDocument> {
    (0..count)
        .map(|i| CaseDocument::new(&format!("respondent-{i}"), surname))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sample_case_serializes_camel_case() {
        let case = CaseDocument::sample();
        let json = serde_json::to_value(&case).unwrap();

        assert_eq!(json["contact"]["surname"], "Lovelace");
        assert!(json.get("createdAt").is_some());
        assert_eq!(json["id"], case.key());
    }

    #[test]
    fn test_sample_cases_unique_ids() {
        let cases = sample_cases("Smith", 3);
        assert_eq!(cases.len(), 3);
        assert_ne!(cases[0].id, cases[1].id);
        assert!(cases.iter().all(|c| c.contact.surname == "Smith"));
    }
}
