use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use super::domain::{
    ApplicationId, BackupAllocation, CollegeCode, Ranking, RankingId, RankingItem,
    RankingItemId, SubTypeCode,
};
use super::eligibility::EligibilityEvaluator;
use super::engine::MatrixDistributionEngine;
use super::repository::{RankingRepository, RepositoryError, ScholarshipCatalog};
use super::resolution::{resolve_configuration, ConfigurationError};
use super::summary::DistributionSummary;

/// Service composing the ranking repository, scholarship catalog, and engine.
pub struct DistributionService<R, C> {
    rankings: Arc<R>,
    catalog: Arc<C>,
    engine: MatrixDistributionEngine,
    in_flight: Mutex<HashSet<RankingId>>,
}

/// Releases the per-ranking run slot when a distribution finishes or fails.
struct RunGuard<'a> {
    in_flight: &'a Mutex<HashSet<RankingId>>,
    ranking_id: RankingId,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        self.in_flight
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.ranking_id);
    }
}

impl<R, C> DistributionService<R, C>
where
    R: RankingRepository + 'static,
    C: ScholarshipCatalog + 'static,
{
    pub fn new(rankings: Arc<R>, catalog: Arc<C>) -> Self {
        Self::with_engine(rankings, catalog, MatrixDistributionEngine::default())
    }

    pub fn with_evaluator(
        rankings: Arc<R>,
        catalog: Arc<C>,
        evaluator: Arc<dyn EligibilityEvaluator>,
    ) -> Self {
        Self::with_engine(rankings, catalog, MatrixDistributionEngine::new(evaluator))
    }

    fn with_engine(rankings: Arc<R>, catalog: Arc<C>, engine: MatrixDistributionEngine) -> Self {
        Self {
            rankings,
            catalog,
            engine,
            in_flight: Mutex::new(HashSet::new()),
        }
    }

    fn claim(&self, ranking_id: &RankingId) -> Result<RunGuard<'_>, DistributionServiceError> {
        let mut guard = self.in_flight.lock().unwrap_or_else(PoisonError::into_inner);
        if !guard.insert(ranking_id.clone()) {
            return Err(DistributionServiceError::AlreadyRunning(ranking_id.clone()));
        }
        Ok(RunGuard {
            in_flight: &self.in_flight,
            ranking_id: ranking_id.clone(),
        })
    }

    fn load(&self, ranking_id: &RankingId) -> Result<Ranking, DistributionServiceError> {
        self.rankings
            .fetch(ranking_id)?
            .ok_or_else(|| DistributionServiceError::RankingNotFound(ranking_id.clone()))
    }

    /// Run the matrix distribution for a ranking and persist the resulting item states.
    ///
    /// Nothing is written unless the whole run succeeds.
    pub fn execute(
        &self,
        ranking_id: &RankingId,
    ) -> Result<DistributionSummary, DistributionServiceError> {
        let _run = self.claim(ranking_id)?;

        let mut ranking = self.load(ranking_id)?;
        let configuration = resolve_configuration(&ranking, self.catalog.as_ref())?;
        let quota_matrix = configuration.matrix()?;
        let priority = self
            .catalog
            .sub_type_priority(&ranking.scholarship_type)
            .map_err(ConfigurationError::from)?;
        let rules = self
            .catalog
            .eligibility_rules(&ranking.scholarship_type)
            .map_err(ConfigurationError::from)?;

        let unprioritized: Vec<&SubTypeCode> = quota_matrix
            .sub_types()
            .filter(|code| !priority.contains(code))
            .collect();
        if !unprioritized.is_empty() {
            warn!(
                ranking_id = %ranking.id,
                sub_types = ?unprioritized,
                "quota matrix sub-types missing from the priority order are not distributed"
            );
        }

        ranking.sort_items();
        let mut outcome = self
            .engine
            .distribute(&ranking.items, &quota_matrix, &priority, &rules);
        outcome.summary.ranking_id = Some(ranking.id.clone());

        ranking.apply_outcome(&outcome, Utc::now());
        self.rankings.update(ranking)?;

        info!(
            %ranking_id,
            configuration_id = %configuration.id,
            total_allocated = outcome.summary.total_allocated,
            total_applications = outcome.summary.total_applications,
            "distribution persisted"
        );

        Ok(outcome.summary)
    }

    /// Current allocation state of every item, in rank order.
    pub fn results(
        &self,
        ranking_id: &RankingId,
    ) -> Result<Vec<ItemResultView>, DistributionServiceError> {
        let mut ranking = self.load(ranking_id)?;
        ranking.sort_items();
        Ok(ranking.items.iter().map(ItemResultView::from_item).collect())
    }

    /// Roster CSV. Allocated items lead with their admission row; every backup slot
    /// then gets its own row, so waitlisted items appear once per pool.
    pub fn export_roster(&self, ranking_id: &RankingId) -> Result<String, DistributionServiceError> {
        let mut ranking = self.load(ranking_id)?;
        if !ranking.distribution_executed {
            return Err(DistributionServiceError::NotDistributed(ranking_id.clone()));
        }
        ranking.sort_items();

        let mut writer = csv::Writer::from_writer(Vec::new());
        for item in &ranking.items {
            let view = ItemResultView::from_item(item);
            if item.state.is_allocated() || item.state.backup_allocations.is_empty() {
                writer.serialize(RosterRow::new(&view, None))?;
            }
            for backup in &item.state.backup_allocations {
                writer.serialize(RosterRow::new(&view, Some(backup)))?;
            }
        }

        let bytes = writer
            .into_inner()
            .map_err(|err| csv::Error::from(err.into_error()))?;
        String::from_utf8(bytes).map_err(|err| {
            DistributionServiceError::Roster(csv::Error::from(std::io::Error::new(
                std::io::ErrorKind::InvalidData,
                err,
            )))
        })
    }
}

/// Sanitized representation of an item's allocation for API responses.
#[derive(Debug, Clone, Serialize)]
pub struct ItemResultView {
    pub item_id: RankingItemId,
    pub application_id: ApplicationId,
    pub rank_position: u32,
    pub status: &'static str,
    pub allocated_sub_type: Option<SubTypeCode>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub backup_position: Option<u32>,
    pub backup_count: usize,
    pub college: Option<CollegeCode>,
    pub allocation_reason: Option<String>,
}

impl ItemResultView {
    pub fn from_item(item: &RankingItem) -> Self {
        Self {
            item_id: item.id.clone(),
            application_id: item.application.id.clone(),
            rank_position: item.rank_position,
            status: item.state.status.label(),
            allocated_sub_type: item.state.allocated_sub_type.clone(),
            backup_position: item.state.backup_position(),
            backup_count: item.state.backup_allocations.len(),
            college: item.application.college_code(),
            allocation_reason: item.state.allocation_reason.clone(),
        }
    }
}

#[derive(Debug, Serialize)]
struct RosterRow<'a> {
    rank_position: u32,
    application_id: &'a str,
    college: &'a str,
    status: &'a str,
    allocated_sub_type: &'a str,
    backup_sub_type: &'a str,
    backup_college: &'a str,
    backup_position: Option<u32>,
    allocation_reason: &'a str,
}

impl<'a> RosterRow<'a> {
    fn new(view: &'a ItemResultView, backup: Option<&'a BackupAllocation>) -> Self {
        Self {
            rank_position: view.rank_position,
            application_id: view.application_id.as_str(),
            college: view.college.as_ref().map_or("", CollegeCode::as_str),
            status: view.status,
            allocated_sub_type: view.allocated_sub_type.as_ref().map_or("", SubTypeCode::as_str),
            backup_sub_type: backup.map_or("", |slot| slot.sub_type.as_str()),
            backup_college: backup.map_or("", |slot| slot.college.as_str()),
            backup_position: backup.map(|slot| slot.backup_position),
            allocation_reason: match backup {
                Some(slot) => slot.allocation_reason.as_str(),
                None => view.allocation_reason.as_deref().unwrap_or(""),
            },
        }
    }
}

/// Error raised by the distribution service.
#[derive(Debug, thiserror::Error)]
pub enum DistributionServiceError {
    #[error("ranking {0} not found")]
    RankingNotFound(RankingId),
    #[error("distribution already running for ranking {0}")]
    AlreadyRunning(RankingId),
    #[error("ranking {0} has not been distributed yet")]
    NotDistributed(RankingId),
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
    #[error("failed to render roster: {0}")]
    Roster(#[from] csv::Error),
}
