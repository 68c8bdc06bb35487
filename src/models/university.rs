// src/models/university.rs

//! University records and their schema migrations.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sha2::{Digest, Sha256};

use crate::error::{AppError, Result};
use crate::services::cgpa;

/// Schema version written by this build.
pub const UNIVERSITY_SCHEMA_VERSION: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum UniversityType {
    #[default]
    Public,
    Private,
}

/// How a record entered the database.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum RecordSource {
    #[default]
    Manual,
    Populated,
    Scraped,
}

/// Annual tuition range.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TuitionRange {
    pub min: f64,
    pub max: f64,
    pub currency: String,
}

/// Minimum admission scores. CGPA is on the 10-point scale.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct AdmissionRequirements {
    #[serde(default)]
    pub min_cgpa: Option<f64>,
    #[serde(default)]
    pub min_ielts: Option<f64>,
    #[serde(default)]
    pub min_toefl: Option<u32>,
    #[serde(default)]
    pub min_gre: Option<u32>,
}

/// A university document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UniversityRecord {
    pub id: String,
    pub name: String,
    pub country: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub university_type: UniversityType,
    #[serde(default)]
    pub ranking: Option<u32>,
    #[serde(default)]
    pub tuition: Option<TuitionRange>,
    #[serde(default)]
    pub admission: AdmissionRequirements,
    #[serde(default)]
    pub programs: Vec<String>,
    #[serde(default)]
    pub website: Option<String>,
    #[serde(default)]
    pub address: Option<String>,
    #[serde(default)]
    pub place_id: Option<String>,
    #[serde(default)]
    pub source: RecordSource,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default)]
    pub schema_version: u32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UniversityRecord {
    /// Build a new unverified record with a derived id.
    pub fn new(name: &str, city: &str, country: &str, source: RecordSource) -> Self {
        let now = Utc::now();
        Self {
            id: university_id(name, city, country),
            name: name.trim().to_string(),
            country: country.trim().to_string(),
            city: city.trim().to_string(),
            university_type: UniversityType::default(),
            ranking: None,
            tuition: None,
            admission: AdmissionRequirements::default(),
            programs: Vec::new(),
            website: None,
            address: None,
            place_id: None,
            source,
            is_verified: false,
            schema_version: UNIVERSITY_SCHEMA_VERSION,
            created_at: now,
            updated_at: now,
        }
    }

    /// Number of populated optional fields, used to pick the best duplicate.
    pub fn completeness_score(&self) -> usize {
        let filled = |s: &str| !s.trim().is_empty();
        [
            filled(&self.name),
            filled(&self.country),
            filled(&self.city),
            self.ranking.is_some(),
            self.tuition.is_some(),
            self.admission.min_cgpa.is_some(),
            self.admission.min_ielts.is_some(),
            self.admission.min_toefl.is_some(),
            self.admission.min_gre.is_some(),
            !self.programs.is_empty(),
            self.website.as_deref().is_some_and(filled),
            self.address.as_deref().is_some_and(filled),
            self.place_id.is_some(),
        ]
        .into_iter()
        .filter(|f| *f)
        .count()
    }

    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(AppError::validation("University name is required"));
        }
        if self.country.trim().is_empty() {
            return Err(AppError::validation("University country is required"));
        }
        if let Some(t) = &self.tuition {
            if t.min < 0.0 || t.max < t.min {
                return Err(AppError::validation("Invalid tuition range"));
            }
        }
        if let Some(cgpa) = self.admission.min_cgpa {
            if !(0.0..=10.0).contains(&cgpa) {
                return Err(AppError::validation("min_cgpa must be within 0-10"));
            }
        }
        Ok(())
    }
}

/// Stable id derived from name, city and country.
pub fn university_id(name: &str, city: &str, country: &str) -> String {
    let mut hasher = Sha256::new();
    for part in [name, city, country] {
        hasher.update(part.trim().to_lowercase().as_bytes());
        hasher.update(b"|");
    }
    hex::encode(&hasher.finalize()[..8])
}

/// Bring a stored document up to the current schema.
///
/// - v0: no `schema_version`, `is_verified` may be absent, and `min_cgpa`
///   may still be on the 4-point scale.
pub fn migrate_university(mut doc: Value) -> Result<UniversityRecord> {
    let version = doc
        .get("schema_version")
        .and_then(Value::as_u64)
        .unwrap_or(0) as u32;

    if version < 1 {
        let obj = doc
            .as_object_mut()
            .ok_or_else(|| AppError::validation("University document is not an object"))?;

        obj.entry("is_verified").or_insert(Value::Bool(false));

        if let Some(admission) = obj.get_mut("admission").and_then(Value::as_object_mut) {
            if let Some(cgpa) = admission.get("min_cgpa").and_then(Value::as_f64) {
                let converted = cgpa::convert_cgpa(cgpa)?;
                admission.insert("min_cgpa".into(), converted.into());
            }
        }

        obj.insert("schema_version".into(), Value::from(1));
    }

    Ok(serde_json::from_value(doc)?)
}
