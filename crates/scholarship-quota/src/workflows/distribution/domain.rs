use std::collections::HashMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::engine::DistributionOutcome;
use super::rejection::RejectionReason;

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn new(value: impl Into<String>) -> Self {
                Self(value.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

string_id!(
    /// Identifier of a persisted ranking aggregate.
    RankingId
);
string_id!(RankingItemId);
string_id!(ApplicationId);
string_id!(
    /// Identifier of a scholarship quota configuration.
    ConfigurationId
);
string_id!(
    /// Scholarship sub-type code such as `nstc` or `moe_1w`.
    SubTypeCode
);
string_id!(
    /// College code as recorded in the student information system.
    CollegeCode
);

impl SubTypeCode {
    pub fn matches(&self, other: &str) -> bool {
        self.0.trim().eq_ignore_ascii_case(other.trim())
    }
}

impl CollegeCode {
    pub fn matches(&self, other: &str) -> bool {
        self.0.trim().eq_ignore_ascii_case(other.trim())
    }
}

/// Keys under which the student information system has stored the college code,
/// checked in order.
pub const COLLEGE_CODE_KEYS: [&str; 4] = ["college_code", "std_academyno", "academy_code", "college"];

/// Read-only view of the application behind a ranking item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApplicationSnapshot {
    pub id: ApplicationId,
    pub status: String,
    #[serde(default)]
    pub scholarship_subtype_list: Vec<SubTypeCode>,
    #[serde(default)]
    pub student_data: Map<String, Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scholarship_configuration_id: Option<ConfigurationId>,
}

impl ApplicationSnapshot {
    pub fn is_rejected(&self) -> bool {
        self.status.trim().eq_ignore_ascii_case("rejected")
    }

    pub fn applied_for(&self, sub_type: &SubTypeCode) -> bool {
        self.scholarship_subtype_list
            .iter()
            .any(|applied| applied.matches(sub_type.as_str()))
    }

    pub fn college_code(&self) -> Option<CollegeCode> {
        COLLEGE_CODE_KEYS.iter().find_map(|key| {
            match self.student_data.get(*key) {
                Some(Value::String(raw)) if !raw.trim().is_empty() => {
                    Some(CollegeCode::new(raw.trim()))
                }
                Some(Value::Number(number)) => Some(CollegeCode::new(number.to_string())),
                _ => None,
            }
        })
    }
}

/// Disposition of a ranking item after the latest distribution run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemStatus {
    #[default]
    Ranked,
    Allocated,
    Waitlisted,
    Rejected,
}

impl ItemStatus {
    pub const fn label(self) -> &'static str {
        match self {
            ItemStatus::Ranked => "ranked",
            ItemStatus::Allocated => "allocated",
            ItemStatus::Waitlisted => "waitlisted",
            ItemStatus::Rejected => "rejected",
        }
    }
}

/// One waitlist slot held by an item in a (sub-type, college) pool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupAllocation {
    pub sub_type: SubTypeCode,
    pub backup_position: u32,
    pub college: CollegeCode,
    pub allocation_reason: String,
}

/// Allocation fields rewritten by every distribution run.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct AllocationState {
    pub allocated_sub_type: Option<SubTypeCode>,
    #[serde(default)]
    pub backup_allocations: Vec<BackupAllocation>,
    #[serde(default)]
    pub status: ItemStatus,
    pub allocation_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<RejectionReason>,
}

impl AllocationState {
    pub fn is_allocated(&self) -> bool {
        self.allocated_sub_type.is_some()
    }

    /// Primary backup rank, i.e. the slot taken in the first pool that waitlisted the item.
    pub fn backup_position(&self) -> Option<u32> {
        self.backup_allocations
            .first()
            .map(|backup| backup.backup_position)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankingItem {
    pub id: RankingItemId,
    pub rank_position: u32,
    #[serde(default)]
    pub total_score: Option<f64>,
    pub application: ApplicationSnapshot,
    #[serde(default)]
    pub state: AllocationState,
}

/// Ranking aggregate for one scholarship type and academic period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Ranking {
    pub id: RankingId,
    pub scholarship_type: String,
    pub academic_year: i32,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default)]
    pub items: Vec<RankingItem>,
    #[serde(default)]
    pub total_allocated: usize,
    #[serde(default)]
    pub distribution_executed: bool,
    #[serde(default)]
    pub distribution_executed_at: Option<DateTime<Utc>>,
}

impl Ranking {
    pub fn new(
        id: RankingId,
        scholarship_type: impl Into<String>,
        academic_year: i32,
        semester: Option<String>,
    ) -> Self {
        Self {
            id,
            scholarship_type: scholarship_type.into(),
            academic_year,
            semester,
            items: Vec::new(),
            total_allocated: 0,
            distribution_executed: false,
            distribution_executed_at: None,
        }
    }

    pub fn sort_items(&mut self) {
        self.items.sort_by_key(|item| item.rank_position);
    }

    /// Writes the engine's per-item states back onto the aggregate.
    ///
    /// Items missing from the outcome fall back to the reset state so a stale
    /// allocation never survives a re-run.
    pub fn apply_outcome(&mut self, outcome: &DistributionOutcome, executed_at: DateTime<Utc>) {
        let states: HashMap<&RankingItemId, &AllocationState> = outcome
            .assignments
            .iter()
            .map(|assignment| (&assignment.item_id, &assignment.state))
            .collect();

        for item in &mut self.items {
            item.state = states
                .get(&item.id)
                .map(|state| (*state).clone())
                .unwrap_or_default();
        }

        self.total_allocated = outcome.summary.total_allocated;
        self.distribution_executed = true;
        self.distribution_executed_at = Some(executed_at);
    }
}
