use serde::{Deserialize, Serialize};

/// A persisted license document. Never mutated once written.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseRecord {
    pub license: String,
    pub domain: String,
    pub email: String,
    pub amount: f64,
    /// Payment-provider capture id, only set for licenses issued by a paid capture
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transaction_id: Option<String>,
    /// RFC 3339 timestamp set by the store at insert time
    pub created_at: String,
}

/// A license record together with its document id.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredLicense {
    pub id: String,
    pub record: LicenseRecord,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewLicense {
    pub license: String,
    pub domain: String,
    pub email: String,
    pub amount: f64,
    pub transaction_id: Option<String>,
}

impl NewLicense {
    pub fn into_record(self, created_at: String) -> LicenseRecord {
        LicenseRecord {
            license: self.license,
            domain: self.domain,
            email: self.email,
            amount: self.amount,
            transaction_id: self.transaction_id,
            created_at,
        }
    }
}

/// Exact-match lookup filter. Present fields are AND-combined.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LicenseFilter {
    pub license: Option<String>,
    pub domain: String,
}

impl LicenseFilter {
    pub fn by_key_and_domain(license: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            license: Some(license.into()),
            domain: domain.into(),
        }
    }

    pub fn by_domain(domain: impl Into<String>) -> Self {
        Self {
            license: None,
            domain: domain.into(),
        }
    }

    /// Document field / expected value pairs for the equality query.
    pub fn predicates(&self) -> Vec<(&'static str, &str)> {
        let mut predicates = Vec::with_capacity(2);
        if let Some(ref license) = self.license {
            predicates.push(("license", license.as_str()));
        }
        predicates.push(("domain", self.domain.as_str()));
        predicates
    }
}

/// What a verifying client gets to see about a matching license.
#[derive(Debug, Clone, Serialize)]
pub struct VerifiedLicense {
    pub license: String,
    pub domain: String,
    pub verified: bool,
}

impl From<LicenseRecord> for VerifiedLicense {
    fn from(record: LicenseRecord) -> Self {
        Self {
            license: record.license,
            domain: record.domain,
            verified: true,
        }
    }
}
