use std::collections::HashSet;
use std::io::Read;
use std::path::Path;

use serde::{Deserialize, Deserializer};
use serde_json::{Map, Value};

use super::domain::{
    AllocationState, ApplicationId, ApplicationSnapshot, ConfigurationId, Ranking, RankingId,
    RankingItem, RankingItemId, SubTypeCode,
};

#[derive(Debug)]
pub enum RankingImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    DuplicateRank { rank_position: u32 },
}

impl std::fmt::Display for RankingImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RankingImportError::Io(err) => write!(f, "failed to read ranking export: {}", err),
            RankingImportError::Csv(err) => write!(f, "invalid ranking CSV data: {}", err),
            RankingImportError::DuplicateRank { rank_position } => write!(
                f,
                "rank position {} appears more than once; ties must be broken before import",
                rank_position
            ),
        }
    }
}

impl std::error::Error for RankingImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RankingImportError::Io(err) => Some(err),
            RankingImportError::Csv(err) => Some(err),
            RankingImportError::DuplicateRank { .. } => None,
        }
    }
}

impl From<std::io::Error> for RankingImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for RankingImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Header describing the ranking the imported rows belong to.
#[derive(Debug, Clone)]
pub struct RankingHeader {
    pub id: RankingId,
    pub scholarship_type: String,
    pub academic_year: i32,
    pub semester: Option<String>,
}

/// Builds a ranking from a batch CSV export of ranked applications.
pub struct RankingImporter;

impl RankingImporter {
    pub fn from_path<P: AsRef<Path>>(
        path: P,
        header: RankingHeader,
    ) -> Result<Ranking, RankingImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file, header)
    }

    pub fn from_reader<R: Read>(
        reader: R,
        header: RankingHeader,
    ) -> Result<Ranking, RankingImportError> {
        let mut csv_reader = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(reader);

        let mut ranking = Ranking::new(
            header.id,
            header.scholarship_type,
            header.academic_year,
            header.semester,
        );
        let mut seen_ranks = HashSet::new();

        for record in csv_reader.deserialize::<RankingRow>() {
            let row = record?;
            if !seen_ranks.insert(row.rank_position) {
                return Err(RankingImportError::DuplicateRank {
                    rank_position: row.rank_position,
                });
            }
            ranking.items.push(row.into_item(&ranking.id));
        }

        ranking.sort_items();
        Ok(ranking)
    }
}

#[derive(Debug, Deserialize)]
struct RankingRow {
    rank_position: u32,
    application_id: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    status: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    sub_types: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    college_code: Option<String>,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    configuration_id: Option<String>,
    /// Blank cells are `None`; anything else must parse as a number.
    #[serde(default)]
    total_score: Option<f64>,
}

impl RankingRow {
    fn into_item(self, ranking_id: &RankingId) -> RankingItem {
        let scholarship_subtype_list = self
            .sub_types
            .as_deref()
            .map(split_sub_types)
            .unwrap_or_default();

        let mut student_data = Map::new();
        if let Some(college) = self.college_code {
            student_data.insert("college_code".to_string(), Value::String(college));
        }

        RankingItem {
            id: RankingItemId(format!("{}-{:04}", ranking_id, self.rank_position)),
            rank_position: self.rank_position,
            total_score: self.total_score,
            application: ApplicationSnapshot {
                id: ApplicationId(self.application_id),
                status: self.status.unwrap_or_else(|| "submitted".to_string()),
                scholarship_subtype_list,
                student_data,
                scholarship_configuration_id: self.configuration_id.map(ConfigurationId),
            },
            state: AllocationState::default(),
        }
    }
}

fn split_sub_types(raw: &str) -> Vec<SubTypeCode> {
    raw.split(';')
        .map(str::trim)
        .filter(|code| !code.is_empty())
        .map(SubTypeCode::new)
        .collect()
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}
