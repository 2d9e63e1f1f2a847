use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use axum::response::Response;
use serde_json::{json, Map, Value};

use crate::workflows::distribution::domain::{
    AllocationState, ApplicationId, ApplicationSnapshot, ConfigurationId, Ranking, RankingId,
    RankingItem, RankingItemId, SubTypeCode,
};
use crate::workflows::distribution::eligibility::EligibilityRule;
use crate::workflows::distribution::quota::{QuotaConfiguration, QuotaManagementMode};
use crate::workflows::distribution::repository::{
    RankingRepository, RepositoryError, ScholarshipCatalog, SubTypeEntry,
};
use crate::workflows::distribution::resolution::normalize_semester;
use crate::workflows::distribution::DistributionService;

pub(super) const SCHOLARSHIP_TYPE: &str = "phd";

pub(super) fn application(
    id: &str,
    status: &str,
    sub_types: &[&str],
    college: Option<&str>,
) -> ApplicationSnapshot {
    let mut student_data = Map::new();
    if let Some(college) = college {
        student_data.insert("std_academyno".to_string(), Value::String(college.to_string()));
    }
    ApplicationSnapshot {
        id: ApplicationId::new(id),
        status: status.to_string(),
        scholarship_subtype_list: sub_types.iter().map(|code| SubTypeCode::new(*code)).collect(),
        student_data,
        scholarship_configuration_id: None,
    }
}

pub(super) fn item(
    rank_position: u32,
    status: &str,
    sub_types: &[&str],
    college: Option<&str>,
) -> RankingItem {
    RankingItem {
        id: RankingItemId(format!("item-{rank_position}")),
        rank_position,
        total_score: Some(100.0 - rank_position as f64),
        application: application(&format!("app-{rank_position}"), status, sub_types, college),
        state: AllocationState::default(),
    }
}

pub(super) fn item_id(rank_position: u32) -> RankingItemId {
    RankingItemId(format!("item-{rank_position}"))
}

pub(super) fn codes(values: &[&str]) -> Vec<SubTypeCode> {
    values.iter().map(|code| SubTypeCode::new(*code)).collect()
}

pub(super) fn ranking(id: &str, items: Vec<RankingItem>) -> Ranking {
    let mut ranking = Ranking::new(RankingId::new(id), SCHOLARSHIP_TYPE, 113, Some("yearly".to_string()));
    ranking.items = items;
    ranking
}

pub(super) fn matrix_configuration(id: &str, quotas: Value) -> QuotaConfiguration {
    QuotaConfiguration {
        id: ConfigurationId::new(id),
        scholarship_type: SCHOLARSHIP_TYPE.to_string(),
        academic_year: 113,
        semester: None,
        is_active: true,
        quota_management_mode: QuotaManagementMode::MatrixBased,
        quotas: Some(quotas),
    }
}

pub(super) fn sub_type_entries(codes: &[&str]) -> Vec<SubTypeEntry> {
    codes
        .iter()
        .enumerate()
        .map(|(index, code)| SubTypeEntry {
            scholarship_type: SCHOLARSHIP_TYPE.to_string(),
            code: SubTypeCode::new(*code),
            display_order: index as i32,
            is_active: true,
        })
        .collect()
}

#[derive(Default, Clone)]
pub(super) struct MemoryRankings {
    pub(super) records: Arc<Mutex<HashMap<RankingId, Ranking>>>,
    pub(super) updates: Arc<Mutex<usize>>,
}

impl MemoryRankings {
    pub(super) fn with(rankings: Vec<Ranking>) -> Self {
        let repository = Self::default();
        {
            let mut guard = repository.records.lock().expect("repository mutex poisoned");
            for ranking in rankings {
                guard.insert(ranking.id.clone(), ranking);
            }
        }
        repository
    }

    pub(super) fn get(&self, id: &str) -> Ranking {
        self.records
            .lock()
            .expect("repository mutex poisoned")
            .get(&RankingId::new(id))
            .cloned()
            .expect("ranking stored")
    }

    pub(super) fn update_count(&self) -> usize {
        *self.updates.lock().expect("update counter poisoned")
    }
}

impl RankingRepository for MemoryRankings {
    fn fetch(&self, id: &RankingId) -> Result<Option<Ranking>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, ranking: Ranking) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        guard.insert(ranking.id.clone(), ranking);
        *self.updates.lock().expect("update counter poisoned") += 1;
        Ok(())
    }
}

#[derive(Default, Clone)]
pub(super) struct MemoryCatalog {
    pub(super) configurations: Vec<QuotaConfiguration>,
    pub(super) sub_types: Vec<SubTypeEntry>,
    pub(super) rules: Vec<EligibilityRule>,
}

impl ScholarshipCatalog for MemoryCatalog {
    fn configuration_by_id(
        &self,
        id: &ConfigurationId,
    ) -> Result<Option<QuotaConfiguration>, RepositoryError> {
        Ok(self
            .configurations
            .iter()
            .find(|configuration| &configuration.id == id)
            .cloned())
    }

    fn find_active_configuration(
        &self,
        scholarship_type: &str,
        academic_year: i32,
        semester: Option<&str>,
    ) -> Result<Option<QuotaConfiguration>, RepositoryError> {
        Ok(self
            .configurations
            .iter()
            .filter(|configuration| configuration.is_active)
            .filter(|configuration| configuration.scholarship_type == scholarship_type)
            .filter(|configuration| configuration.academic_year == academic_year)
            .find(|configuration| match semester {
                Some(semester) => {
                    normalize_semester(configuration.semester.as_deref()).as_deref()
                        == Some(semester)
                }
                None => true,
            })
            .cloned())
    }

    fn sub_types(&self, scholarship_type: &str) -> Result<Vec<SubTypeEntry>, RepositoryError> {
        Ok(self
            .sub_types
            .iter()
            .filter(|entry| entry.scholarship_type == scholarship_type)
            .cloned()
            .collect())
    }

    fn eligibility_rules(
        &self,
        _scholarship_type: &str,
    ) -> Result<Vec<EligibilityRule>, RepositoryError> {
        Ok(self.rules.clone())
    }
}

pub(super) struct UnavailableRankings;

impl RankingRepository for UnavailableRankings {
    fn fetch(&self, _id: &RankingId) -> Result<Option<Ranking>, RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }

    fn update(&self, _ranking: Ranking) -> Result<(), RepositoryError> {
        Err(RepositoryError::Unavailable("database offline".to_string()))
    }
}

/// Two sub-types competing for engineering and science seats.
pub(super) fn standard_catalog() -> MemoryCatalog {
    MemoryCatalog {
        configurations: vec![matrix_configuration(
            "cfg-113",
            json!({
                "nstc": { "E": 1, "S": 1 },
                "moe_1w": { "E": 1 }
            }),
        )],
        sub_types: sub_type_entries(&["nstc", "moe_1w"]),
        rules: Vec::new(),
    }
}

pub(super) fn standard_ranking() -> Ranking {
    ranking(
        "rk-113",
        vec![
            item(1, "approved", &["nstc", "moe_1w"], Some("E")),
            item(2, "approved", &["nstc", "moe_1w"], Some("E")),
            item(3, "approved", &["nstc", "moe_1w"], Some("E")),
            item(4, "approved", &["nstc"], Some("S")),
            item(5, "approved", &["nstc"], Some("C")),
        ],
    )
}

pub(super) fn build_service() -> (
    DistributionService<MemoryRankings, MemoryCatalog>,
    MemoryRankings,
) {
    let rankings = MemoryRankings::with(vec![standard_ranking()]);
    let service = DistributionService::new(Arc::new(rankings.clone()), Arc::new(standard_catalog()));
    (service, rankings)
}

pub(super) async fn read_json_body(response: Response) -> Value {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    serde_json::from_slice(&body).expect("json payload")
}

pub(super) async fn read_text_body(response: Response) -> String {
    let body = axum::body::to_bytes(response.into_body(), 64 * 1024)
        .await
        .expect("read body");
    String::from_utf8(body.to_vec()).expect("utf-8 body")
}
