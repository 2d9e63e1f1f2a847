use serde::{Deserialize, Serialize};

use super::domain::ApplicationSnapshot;
use super::quota::QuotaMatrix;

/// Why an item ended a distribution run with neither an allocation nor a backup slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectionReason {
    ApplicationRejected,
    NoSubTypesApplied,
    MissingCollege,
    NoCollegeQuota,
    QuotasExhausted,
}

impl RejectionReason {
    pub fn summary(&self) -> &'static str {
        match self {
            RejectionReason::ApplicationRejected => "application already rejected by review",
            RejectionReason::NoSubTypesApplied => "did not apply for any eligible sub-type",
            RejectionReason::MissingCollege => "incomplete student record (missing college)",
            RejectionReason::NoCollegeQuota => {
                "student's college has no quota in any applied sub-type"
            }
            RejectionReason::QuotasExhausted => "all applied sub-type quotas exhausted",
        }
    }
}

/// Picks the most actionable reason; checks run in a fixed order and the first match wins.
pub fn determine_rejection_reason(
    application: &ApplicationSnapshot,
    quota_matrix: &QuotaMatrix,
) -> RejectionReason {
    if application.is_rejected() {
        return RejectionReason::ApplicationRejected;
    }

    if application.scholarship_subtype_list.is_empty() {
        return RejectionReason::NoSubTypesApplied;
    }

    let Some(college) = application.college_code() else {
        return RejectionReason::MissingCollege;
    };

    let any_quota = application
        .scholarship_subtype_list
        .iter()
        .any(|sub_type| quota_matrix.has_quota_for(sub_type, &college));
    if !any_quota {
        return RejectionReason::NoCollegeQuota;
    }

    RejectionReason::QuotasExhausted
}
