use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use super::domain::{
    AllocationState, BackupAllocation, CollegeCode, ItemStatus, RankingItem, RankingItemId,
    SubTypeCode,
};
use super::eligibility::{
    check_eligibility, EligibilityEvaluator, EligibilityRule, PermissiveEvaluator,
};
use super::quota::QuotaMatrix;
use super::rejection::determine_rejection_reason;
use super::summary::{
    AdmittedEntry, BackupEntry, CollegePoolSummary, DistributionSummary, SubTypeBreakdown,
};

/// New allocation state computed for one ranking item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemAssignment {
    pub item_id: RankingItemId,
    pub state: AllocationState,
}

/// Engine output: the summary plus one assignment per input item, in input order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionOutcome {
    pub summary: DistributionSummary,
    pub assignments: Vec<ItemAssignment>,
}

impl DistributionOutcome {
    pub fn state_for(&self, item_id: &RankingItemId) -> Option<&AllocationState> {
        self.assignments
            .iter()
            .find(|assignment| &assignment.item_id == item_id)
            .map(|assignment| &assignment.state)
    }
}

pub(crate) fn admit_message(sub_type: &SubTypeCode, college: &CollegeCode) -> String {
    format!("admitted to {sub_type} quota for college {college}")
}

pub(crate) fn waitlist_message(
    sub_type: &SubTypeCode,
    college: &CollegeCode,
    backup_position: u32,
) -> String {
    format!("waitlisted #{backup_position} for {sub_type} quota in college {college}")
}

/// Partitions ranked applicants across (sub-type, college) quota pools.
///
/// Sub-types are processed in priority order and, within a pool, items are
/// visited strictly in input order. An admitted item is locked and skipped by
/// every later pool; a waitlisted item keeps competing in later pools.
pub struct MatrixDistributionEngine {
    evaluator: Arc<dyn EligibilityEvaluator>,
}

impl Default for MatrixDistributionEngine {
    fn default() -> Self {
        Self::new(Arc::new(PermissiveEvaluator))
    }
}

impl MatrixDistributionEngine {
    pub fn new(evaluator: Arc<dyn EligibilityEvaluator>) -> Self {
        Self { evaluator }
    }

    /// Runs one distribution over `items`, which must be sorted by ascending rank.
    ///
    /// Inputs are never mutated: every run starts from a blank state per item,
    /// so repeated runs over the same inputs produce the same outcome.
    pub fn distribute(
        &self,
        items: &[RankingItem],
        quota_matrix: &QuotaMatrix,
        sub_type_priority: &[SubTypeCode],
        eligibility_rules: &[EligibilityRule],
    ) -> DistributionOutcome {
        debug_assert!(
            items
                .windows(2)
                .all(|pair| pair[0].rank_position <= pair[1].rank_position),
            "ranking items must be sorted by rank_position"
        );

        let mut states = vec![AllocationState::default(); items.len()];

        if items.is_empty() {
            return DistributionOutcome {
                summary: DistributionSummary::empty(0),
                assignments: Vec::new(),
            };
        }

        let mut total_allocated = 0usize;
        let mut breakdown = BTreeMap::new();
        let mut processed: HashSet<&SubTypeCode> = HashSet::new();

        for sub_type in sub_type_priority {
            if !processed.insert(sub_type) {
                continue;
            }
            let Some(colleges) = quota_matrix.colleges(sub_type) else {
                debug!(%sub_type, "no quota matrix entry for sub-type, skipping");
                continue;
            };

            let mut sub_type_breakdown = SubTypeBreakdown::default();
            for (college, &college_quota) in colleges {
                let pool = self.fill_pool(
                    items,
                    &mut states,
                    sub_type,
                    college,
                    college_quota,
                    eligibility_rules,
                );
                total_allocated += pool.admitted_count as usize;
                debug!(
                    %sub_type,
                    %college,
                    quota = college_quota,
                    admitted = pool.admitted_count,
                    backup = pool.backup_count,
                    "quota pool processed"
                );
                sub_type_breakdown.colleges.insert(college.clone(), pool);
            }
            breakdown.insert(sub_type.clone(), sub_type_breakdown);
        }

        for (item, state) in items.iter().zip(states.iter_mut()) {
            if state.is_allocated() {
                continue;
            }
            if let Some(first) = state.backup_allocations.first() {
                state.status = ItemStatus::Waitlisted;
                state.allocation_reason = Some(first.allocation_reason.clone());
            } else {
                let reason = determine_rejection_reason(&item.application, quota_matrix);
                state.status = ItemStatus::Rejected;
                state.allocation_reason = Some(reason.summary().to_string());
                state.rejection_reason = Some(reason);
            }
        }

        info!(
            total_applications = items.len(),
            total_allocated,
            "matrix distribution completed"
        );

        let assignments = items
            .iter()
            .zip(states)
            .map(|(item, state)| ItemAssignment {
                item_id: item.id.clone(),
                state,
            })
            .collect();

        DistributionOutcome {
            summary: DistributionSummary {
                ranking_id: None,
                total_allocated,
                total_applications: items.len(),
                distribution_summary: breakdown,
            },
            assignments,
        }
    }

    fn fill_pool(
        &self,
        items: &[RankingItem],
        states: &mut [AllocationState],
        sub_type: &SubTypeCode,
        college: &CollegeCode,
        college_quota: u32,
        eligibility_rules: &[EligibilityRule],
    ) -> CollegePoolSummary {
        let mut pool = CollegePoolSummary {
            quota: college_quota,
            ..CollegePoolSummary::default()
        };

        for (item, state) in items.iter().zip(states.iter_mut()) {
            if state.is_allocated() {
                continue;
            }

            let application = &item.application;
            if application.is_rejected() || !application.applied_for(sub_type) {
                continue;
            }

            let same_college = application
                .college_code()
                .is_some_and(|code| college.matches(code.as_str()));
            if !same_college {
                continue;
            }

            let verdict = check_eligibility(
                application,
                sub_type,
                eligibility_rules,
                self.evaluator.as_ref(),
            );
            if !verdict.is_eligible {
                trace!(item_id = %item.id, %sub_type, reason = %verdict.reason, "item ineligible for pool");
                continue;
            }

            if pool.admitted_count < college_quota {
                pool.admitted_count += 1;
                state.allocated_sub_type = Some(sub_type.clone());
                state.status = ItemStatus::Allocated;
                state.allocation_reason = Some(admit_message(sub_type, college));
                pool.admitted.push(AdmittedEntry {
                    item_id: item.id.clone(),
                    application_id: application.id.clone(),
                    rank_position: item.rank_position,
                });
            } else {
                pool.backup_count += 1;
                let backup_position = pool.backup_count;
                state.backup_allocations.push(BackupAllocation {
                    sub_type: sub_type.clone(),
                    backup_position,
                    college: college.clone(),
                    allocation_reason: waitlist_message(sub_type, college, backup_position),
                });
                state.status = ItemStatus::Waitlisted;
                pool.backup.push(BackupEntry {
                    item_id: item.id.clone(),
                    application_id: application.id.clone(),
                    rank_position: item.rank_position,
                    backup_position,
                });
            }
        }

        pool
    }
}
