use std::collections::BTreeMap;

use serde::{Deserialize, Serialize, Serializer};
use serde_json::Value;

use super::domain::{CollegeCode, ConfigurationId, SubTypeCode};
use super::resolution::ConfigurationError;

/// Validation failures raised while turning stored quota JSON into a matrix.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QuotaMatrixError {
    #[error("quota matrix must be an object keyed by sub-type")]
    NotAnObject,
    #[error("quotas for sub-type '{sub_type}' must be an object keyed by college")]
    SubTypeNotAnObject { sub_type: String },
    #[error("quota for {sub_type}/{college} must be a non-negative integer, found {found}")]
    InvalidCapacity {
        sub_type: String,
        college: String,
        found: String,
    },
}

/// Capacity per (sub-type, college) pool.
///
/// An absent pool has no capacity and is never visited by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize)]
#[serde(try_from = "BTreeMap<String, BTreeMap<String, Value>>")]
pub struct QuotaMatrix {
    pools: BTreeMap<SubTypeCode, BTreeMap<CollegeCode, u32>>,
}

impl QuotaMatrix {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(
        mut self,
        sub_type: impl Into<String>,
        college: impl Into<String>,
        capacity: u32,
    ) -> Self {
        self.set_quota(SubTypeCode::new(sub_type), CollegeCode::new(college), capacity);
        self
    }

    pub fn set_quota(&mut self, sub_type: SubTypeCode, college: CollegeCode, capacity: u32) {
        self.pools
            .entry(sub_type)
            .or_default()
            .insert(college, capacity);
    }

    pub fn from_json(value: &Value) -> Result<Self, QuotaMatrixError> {
        let object = value.as_object().ok_or(QuotaMatrixError::NotAnObject)?;
        let mut raw = BTreeMap::new();
        for (sub_type, colleges) in object {
            let colleges = colleges
                .as_object()
                .ok_or_else(|| QuotaMatrixError::SubTypeNotAnObject {
                    sub_type: sub_type.clone(),
                })?;
            raw.insert(
                sub_type.clone(),
                colleges
                    .iter()
                    .map(|(college, capacity)| (college.clone(), capacity.clone()))
                    .collect(),
            );
        }
        Self::try_from(raw)
    }

    pub fn is_empty(&self) -> bool {
        self.pools.values().all(BTreeMap::is_empty)
    }

    pub fn sub_types(&self) -> impl Iterator<Item = &SubTypeCode> {
        self.pools.keys()
    }

    pub fn colleges(&self, sub_type: &SubTypeCode) -> Option<&BTreeMap<CollegeCode, u32>> {
        self.pools.get(sub_type)
    }

    pub fn capacity(&self, sub_type: &SubTypeCode, college: &CollegeCode) -> Option<u32> {
        self.pools.get(sub_type)?.get(college).copied()
    }

    /// Case-insensitive check for any pool matching the sub-type and college.
    pub fn has_quota_for(&self, sub_type: &SubTypeCode, college: &CollegeCode) -> bool {
        self.pools
            .iter()
            .filter(|(code, _)| code.matches(sub_type.as_str()))
            .any(|(_, colleges)| colleges.keys().any(|code| code.matches(college.as_str())))
    }
}

impl Serialize for QuotaMatrix {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.pools.serialize(serializer)
    }
}

impl TryFrom<BTreeMap<String, BTreeMap<String, Value>>> for QuotaMatrix {
    type Error = QuotaMatrixError;

    fn try_from(raw: BTreeMap<String, BTreeMap<String, Value>>) -> Result<Self, Self::Error> {
        let mut matrix = QuotaMatrix::new();
        for (sub_type, colleges) in raw {
            let pools = matrix.pools.entry(SubTypeCode::new(sub_type.clone())).or_default();
            for (college, capacity) in colleges {
                let parsed = capacity
                    .as_u64()
                    .and_then(|value| u32::try_from(value).ok())
                    .ok_or_else(|| QuotaMatrixError::InvalidCapacity {
                        sub_type: sub_type.clone(),
                        college: college.clone(),
                        found: capacity.to_string(),
                    })?;
                pools.insert(CollegeCode::new(college), parsed);
            }
        }
        Ok(matrix)
    }
}

/// How a scholarship configuration expresses its quotas.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaManagementMode {
    #[default]
    None,
    Simple,
    MatrixBased,
}

/// Stored quota configuration for a scholarship type and academic period.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuotaConfiguration {
    pub id: ConfigurationId,
    pub scholarship_type: String,
    pub academic_year: i32,
    #[serde(default)]
    pub semester: Option<String>,
    #[serde(default = "default_active")]
    pub is_active: bool,
    #[serde(default)]
    pub quota_management_mode: QuotaManagementMode,
    #[serde(default)]
    pub quotas: Option<Value>,
}

fn default_active() -> bool {
    true
}

impl QuotaConfiguration {
    /// Validated matrix quotas, failing when the configuration is not matrix based.
    pub fn matrix(&self) -> Result<QuotaMatrix, ConfigurationError> {
        let no_matrix = || ConfigurationError::NoMatrixQuotas {
            configuration_id: self.id.clone(),
        };

        if self.quota_management_mode != QuotaManagementMode::MatrixBased {
            return Err(no_matrix());
        }

        let raw = self.quotas.as_ref().ok_or_else(no_matrix)?;
        let matrix = QuotaMatrix::from_json(raw).map_err(|source| {
            ConfigurationError::InvalidMatrix {
                configuration_id: self.id.clone(),
                source,
            }
        })?;

        if matrix.is_empty() {
            return Err(no_matrix());
        }

        Ok(matrix)
    }
}
