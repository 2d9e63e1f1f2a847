//! Matrix quota distribution for scholarship rankings.
//!
//! A ranking's applicants are partitioned into admitted, waitlisted, and
//! rejected sets across (sub-type, college) quota pools. Sub-types are
//! processed in their configured priority order and an admission in an earlier
//! pool locks the applicant out of every later one.

pub mod domain;
pub mod eligibility;
pub mod engine;
pub mod import;
pub mod quota;
pub mod rejection;
pub mod repository;
pub mod resolution;
pub mod router;
pub mod service;
pub mod summary;

#[cfg(test)]
mod tests;

pub use domain::{
    AllocationState, ApplicationId, ApplicationSnapshot, BackupAllocation, CollegeCode,
    ConfigurationId, ItemStatus, Ranking, RankingId, RankingItem, RankingItemId, SubTypeCode,
};
pub use eligibility::{
    check_eligibility, EligibilityEvaluator, EligibilityRule, EligibilityVerdict,
    PermissiveEvaluator, RuleOperator, StudentDataEvaluator,
};
pub use engine::{DistributionOutcome, ItemAssignment, MatrixDistributionEngine};
pub use import::{RankingHeader, RankingImportError, RankingImporter};
pub use quota::{QuotaConfiguration, QuotaManagementMode, QuotaMatrix, QuotaMatrixError};
pub use rejection::{determine_rejection_reason, RejectionReason};
pub use repository::{
    priority_order, RankingRepository, RepositoryError, ScholarshipCatalog, SubTypeEntry,
};
pub use resolution::{normalize_semester, resolve_configuration, ConfigurationError};
pub use router::distribution_router;
pub use service::{DistributionService, DistributionServiceError, ItemResultView};
pub use summary::{
    AdmittedEntry, BackupEntry, CollegePoolSummary, DistributionSummary, SubTypeBreakdown,
};
