use metrics_exporter_prometheus::PrometheusHandle;
use scholarship_quota::error::AppError;
use scholarship_quota::workflows::distribution::{
    normalize_semester, ConfigurationId, EligibilityRule, QuotaConfiguration, Ranking, RankingId,
    RankingRepository, RepositoryError, ScholarshipCatalog, SubTypeEntry,
};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::AtomicBool;
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub(crate) struct AppState {
    pub(crate) readiness: Arc<AtomicBool>,
    pub(crate) metrics: Arc<PrometheusHandle>,
}

#[derive(Default, Clone)]
pub(crate) struct InMemoryRankingRepository {
    records: Arc<Mutex<HashMap<RankingId, Ranking>>>,
}

impl InMemoryRankingRepository {
    pub(crate) fn insert(&self, ranking: Ranking) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&ranking.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.insert(ranking.id.clone(), ranking);
        Ok(())
    }
}

impl RankingRepository for InMemoryRankingRepository {
    fn fetch(&self, id: &RankingId) -> Result<Option<Ranking>, RepositoryError> {
        let guard = self.records.lock().expect("repository mutex poisoned");
        Ok(guard.get(id).cloned())
    }

    fn update(&self, ranking: Ranking) -> Result<(), RepositoryError> {
        let mut guard = self.records.lock().expect("repository mutex poisoned");
        if guard.contains_key(&ranking.id) {
            guard.insert(ranking.id.clone(), ranking);
            Ok(())
        } else {
            Err(RepositoryError::NotFound)
        }
    }
}

/// Read-only catalog loaded once at startup.
#[derive(Default, Clone)]
pub(crate) struct InMemoryScholarshipCatalog {
    configurations: Vec<QuotaConfiguration>,
    sub_types: Vec<SubTypeEntry>,
    rules: HashMap<String, Vec<EligibilityRule>>,
}

impl ScholarshipCatalog for InMemoryScholarshipCatalog {
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
            .filter(|configuration| match semester {
                Some(semester) => {
                    normalize_semester(configuration.semester.as_deref()).as_deref()
                        == Some(semester)
                }
                None => true,
            })
            .min_by(|left, right| left.id.cmp(&right.id))
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
        scholarship_type: &str,
    ) -> Result<Vec<EligibilityRule>, RepositoryError> {
        Ok(self
            .rules
            .get(scholarship_type)
            .cloned()
            .unwrap_or_default())
    }
}

/// Snapshot of rankings and scholarship tables used to hydrate the in-memory adapters.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct SeedData {
    #[serde(default)]
    pub(crate) rankings: Vec<Ranking>,
    #[serde(default)]
    pub(crate) configurations: Vec<QuotaConfiguration>,
    #[serde(default)]
    pub(crate) sub_types: Vec<SubTypeEntry>,
    /// Rules keyed by scholarship type.
    #[serde(default)]
    pub(crate) eligibility_rules: HashMap<String, Vec<EligibilityRule>>,
}

impl SeedData {
    pub(crate) fn from_path(path: &Path) -> Result<Self, AppError> {
        let raw = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&raw)?)
    }

    pub(crate) fn into_stores(
        self,
    ) -> Result<(InMemoryRankingRepository, InMemoryScholarshipCatalog), AppError> {
        let rankings = InMemoryRankingRepository::default();
        for ranking in self.rankings {
            let id = ranking.id.clone();
            rankings.insert(ranking).map_err(|err| {
                AppError::Io(std::io::Error::new(
                    std::io::ErrorKind::InvalidData,
                    format!("seed ranking {id}: {err}"),
                ))
            })?;
        }

        let catalog = InMemoryScholarshipCatalog {
            configurations: self.configurations,
            sub_types: self.sub_types,
            rules: self.eligibility_rules,
        };
        Ok((rankings, catalog))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SEED: &str = include_str!("../seed/phd-113.json");

    fn seeded() -> (InMemoryRankingRepository, InMemoryScholarshipCatalog) {
        let seed: SeedData = serde_json::from_str(SEED).expect("seed parses");
        seed.into_stores().expect("seed loads")
    }

    #[test]
    fn seed_hydrates_rankings_and_catalog() {
        let (rankings, catalog) = seeded();

        let ranking = rankings
            .fetch(&RankingId::new("rk-113-phd"))
            .expect("fetch succeeds")
            .expect("ranking seeded");
        assert_eq!(ranking.items.len(), 5);

        let priority = catalog.sub_type_priority("phd").expect("priority");
        let codes: Vec<&str> = priority.iter().map(|code| code.as_str()).collect();
        assert_eq!(codes, vec!["nstc", "moe_1w"]);
        assert_eq!(catalog.eligibility_rules("phd").expect("rules").len(), 1);
        assert!(catalog.eligibility_rules("master").expect("rules").is_empty());
    }

    #[test]
    fn active_lookup_ignores_inactive_and_other_semesters() {
        let (_, catalog) = seeded();

        let yearly = catalog
            .find_active_configuration("phd", 113, None)
            .expect("lookup")
            .expect("active configuration");
        assert_eq!(yearly.id.as_str(), "cfg-113-phd");

        let second = catalog
            .find_active_configuration("phd", 113, Some("second"))
            .expect("lookup");
        assert!(second.is_none());
    }

    #[test]
    fn duplicate_seed_rankings_are_rejected() {
        let mut seed: SeedData = serde_json::from_str(SEED).expect("seed parses");
        let duplicate = seed.rankings[0].clone();
        seed.rankings.push(duplicate);

        assert!(seed.into_stores().is_err());
    }

    #[test]
    fn update_requires_an_existing_ranking() {
        let repository = InMemoryRankingRepository::default();
        let ranking = Ranking::new(RankingId::new("rk-unknown"), "phd", 113, None);

        assert!(matches!(
            repository.update(ranking),
            Err(RepositoryError::NotFound)
        ));
    }
}
