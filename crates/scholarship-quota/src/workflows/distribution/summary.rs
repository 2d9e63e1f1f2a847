use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::domain::{ApplicationId, CollegeCode, RankingId, RankingItemId, SubTypeCode};

/// Result of one distribution run, shaped for reporting and issue generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionSummary {
    pub ranking_id: Option<RankingId>,
    pub total_allocated: usize,
    pub total_applications: usize,
    pub distribution_summary: BTreeMap<SubTypeCode, SubTypeBreakdown>,
}

impl DistributionSummary {
    pub(crate) fn empty(total_applications: usize) -> Self {
        Self {
            ranking_id: None,
            total_allocated: 0,
            total_applications,
            distribution_summary: BTreeMap::new(),
        }
    }

    pub fn pool(&self, sub_type: &str, college: &str) -> Option<&CollegePoolSummary> {
        self.distribution_summary
            .get(&SubTypeCode::new(sub_type))?
            .colleges
            .get(&CollegeCode::new(college))
    }

    /// Every (sub-type, college, pool) triple in sub-type then college order.
    pub fn pools(&self) -> impl Iterator<Item = (&SubTypeCode, &CollegeCode, &CollegePoolSummary)> {
        self.distribution_summary
            .iter()
            .flat_map(|(sub_type, breakdown)| {
                breakdown
                    .colleges
                    .iter()
                    .map(move |(college, pool)| (sub_type, college, pool))
            })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SubTypeBreakdown {
    pub colleges: BTreeMap<CollegeCode, CollegePoolSummary>,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CollegePoolSummary {
    pub quota: u32,
    pub admitted: Vec<AdmittedEntry>,
    pub backup: Vec<BackupEntry>,
    pub admitted_count: u32,
    pub backup_count: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdmittedEntry {
    pub item_id: RankingItemId,
    pub application_id: ApplicationId,
    pub rank_position: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackupEntry {
    pub item_id: RankingItemId,
    pub application_id: ApplicationId,
    pub rank_position: u32,
    pub backup_position: u32,
}
