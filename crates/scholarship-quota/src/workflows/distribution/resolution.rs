use std::collections::BTreeSet;

use tracing::{debug, warn};

use super::domain::{ConfigurationId, Ranking};
use super::quota::{QuotaConfiguration, QuotaMatrixError};
use super::repository::{RepositoryError, ScholarshipCatalog};

/// Fatal configuration problems; the caller has to fix quotas and retry.
#[derive(Debug, thiserror::Error)]
pub enum ConfigurationError {
    #[error(
        "no active quota configuration for {scholarship_type} {academic_year} ({})",
        .semester.as_deref().unwrap_or("all semesters")
    )]
    NoActiveConfiguration {
        scholarship_type: String,
        academic_year: i32,
        semester: Option<String>,
    },
    #[error("configuration {configuration_id} has no matrix quotas defined")]
    NoMatrixQuotas { configuration_id: ConfigurationId },
    #[error("configuration {configuration_id} has an invalid quota matrix: {source}")]
    InvalidMatrix {
        configuration_id: ConfigurationId,
        #[source]
        source: QuotaMatrixError,
    },
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// Yearly rankings apply to every semester, so they carry no semester filter.
pub fn normalize_semester(semester: Option<&str>) -> Option<String> {
    let trimmed = semester?.trim();
    if trimmed.is_empty()
        || trimmed.eq_ignore_ascii_case("yearly")
        || trimmed.eq_ignore_ascii_case("year")
    {
        return None;
    }
    Some(trimmed.to_string())
}

/// Locates the quota configuration governing a ranking.
///
/// The configuration referenced by the ranked applications wins. When several
/// are referenced the smallest id is used and the ambiguity is logged. Without
/// a usable reference the active configuration for the ranking's period is used.
pub fn resolve_configuration<C>(
    ranking: &Ranking,
    catalog: &C,
) -> Result<QuotaConfiguration, ConfigurationError>
where
    C: ScholarshipCatalog + ?Sized,
{
    let referenced: BTreeSet<&ConfigurationId> = ranking
        .items
        .iter()
        .filter_map(|item| item.application.scholarship_configuration_id.as_ref())
        .collect();

    if let Some(&chosen) = referenced.iter().next() {
        if referenced.len() > 1 {
            let ids: Vec<&str> = referenced.iter().map(|id| id.as_str()).collect();
            warn!(
                ranking_id = %ranking.id,
                configuration_ids = ?ids,
                chosen = %chosen,
                "ranking references multiple scholarship configurations"
            );
        }

        match catalog.configuration_by_id(chosen)? {
            Some(configuration) => return Ok(configuration),
            None => debug!(
                ranking_id = %ranking.id,
                configuration_id = %chosen,
                "referenced configuration missing, falling back to period lookup"
            ),
        }
    }

    let semester = normalize_semester(ranking.semester.as_deref());
    catalog
        .find_active_configuration(
            &ranking.scholarship_type,
            ranking.academic_year,
            semester.as_deref(),
        )?
        .ok_or_else(|| ConfigurationError::NoActiveConfiguration {
            scholarship_type: ranking.scholarship_type.clone(),
            academic_year: ranking.academic_year,
            semester,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_semester_drops_yearly_markers() {
        assert_eq!(normalize_semester(None), None);
        assert_eq!(normalize_semester(Some("")), None);
        assert_eq!(normalize_semester(Some("yearly")), None);
        assert_eq!(normalize_semester(Some(" YEAR ")), None);
        assert_eq!(normalize_semester(Some("first")), Some("first".to_string()));
    }

    #[test]
    fn missing_configuration_message_names_the_period() {
        let error = ConfigurationError::NoActiveConfiguration {
            scholarship_type: "phd".to_string(),
            academic_year: 113,
            semester: None,
        };
        assert_eq!(
            error.to_string(),
            "no active quota configuration for phd 113 (all semesters)"
        );
    }
}
