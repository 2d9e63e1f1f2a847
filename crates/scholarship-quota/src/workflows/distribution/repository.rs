use serde::{Deserialize, Serialize};

use super::domain::{ConfigurationId, Ranking, RankingId, SubTypeCode};
use super::eligibility::EligibilityRule;
use super::quota::QuotaConfiguration;

/// Storage abstraction for ranking aggregates and their items.
pub trait RankingRepository: Send + Sync {
    fn fetch(&self, id: &RankingId) -> Result<Option<Ranking>, RepositoryError>;
    fn update(&self, ranking: Ranking) -> Result<(), RepositoryError>;
}

/// Read side of the scholarship configuration tables consumed by distribution.
pub trait ScholarshipCatalog: Send + Sync {
    fn configuration_by_id(
        &self,
        id: &ConfigurationId,
    ) -> Result<Option<QuotaConfiguration>, RepositoryError>;

    /// Active configuration for the period; `semester: None` disables the semester filter.
    fn find_active_configuration(
        &self,
        scholarship_type: &str,
        academic_year: i32,
        semester: Option<&str>,
    ) -> Result<Option<QuotaConfiguration>, RepositoryError>;

    fn sub_types(&self, scholarship_type: &str) -> Result<Vec<SubTypeEntry>, RepositoryError>;

    fn eligibility_rules(
        &self,
        scholarship_type: &str,
    ) -> Result<Vec<EligibilityRule>, RepositoryError>;

    /// Display-ordered codes of the active sub-types; this is the allocation priority.
    fn sub_type_priority(
        &self,
        scholarship_type: &str,
    ) -> Result<Vec<SubTypeCode>, RepositoryError> {
        let entries = self.sub_types(scholarship_type)?;
        Ok(priority_order(entries))
    }
}

/// Sub-type configured for a scholarship type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTypeEntry {
    pub scholarship_type: String,
    pub code: SubTypeCode,
    pub display_order: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

pub fn priority_order(mut entries: Vec<SubTypeEntry>) -> Vec<SubTypeCode> {
    entries.retain(|entry| entry.is_active);
    entries.sort_by(|left, right| {
        left.display_order
            .cmp(&right.display_order)
            .then_with(|| left.code.cmp(&right.code))
    });
    entries.into_iter().map(|entry| entry.code).collect()
}

/// Error enumeration for repository failures.
#[derive(Debug, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
