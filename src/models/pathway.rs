// src/models/pathway.rs

//! Pathway profile, template and step structures.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Academic level of the intended study.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AcademicLevel {
    Diploma,
    Undergraduate,
    Postgraduate,
    Doctorate,
}

impl AcademicLevel {
    pub const ALL: [AcademicLevel; 4] = [
        AcademicLevel::Diploma,
        AcademicLevel::Undergraduate,
        AcademicLevel::Postgraduate,
        AcademicLevel::Doctorate,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AcademicLevel::Diploma => "diploma",
            AcademicLevel::Undergraduate => "undergraduate",
            AcademicLevel::Postgraduate => "postgraduate",
            AcademicLevel::Doctorate => "doctorate",
        }
    }

    /// Human-readable label used in prompts and titles.
    pub fn label(&self) -> &'static str {
        match self {
            AcademicLevel::Diploma => "Diploma",
            AcademicLevel::Undergraduate => "Bachelor's",
            AcademicLevel::Postgraduate => "Master's",
            AcademicLevel::Doctorate => "PhD",
        }
    }

    /// Typical programme length in years.
    pub fn typical_years(&self) -> u32 {
        match self {
            AcademicLevel::Diploma => 1,
            AcademicLevel::Undergraduate => 4,
            AcademicLevel::Postgraduate => 2,
            AcademicLevel::Doctorate => 4,
        }
    }
}

impl fmt::Display for AcademicLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Annual budget bucket in USD.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BudgetRange {
    /// Under 20k USD per year
    Low,
    /// 20k to 40k USD per year
    Medium,
    /// 40k to 60k USD per year
    High,
    /// Above 60k USD per year
    Premium,
}

impl BudgetRange {
    pub const ALL: [BudgetRange; 4] = [
        BudgetRange::Low,
        BudgetRange::Medium,
        BudgetRange::High,
        BudgetRange::Premium,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BudgetRange::Low => "low",
            BudgetRange::Medium => "medium",
            BudgetRange::High => "high",
            BudgetRange::Premium => "premium",
        }
    }

    /// Upper bound of the bucket in USD per year, `None` when open-ended.
    pub fn upper_bound_usd(&self) -> Option<f64> {
        match self {
            BudgetRange::Low => Some(20_000.0),
            BudgetRange::Medium => Some(40_000.0),
            BudgetRange::High => Some(60_000.0),
            BudgetRange::Premium => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            BudgetRange::Low => "under $20,000 per year",
            BudgetRange::Medium => "$20,000 - $40,000 per year",
            BudgetRange::High => "$40,000 - $60,000 per year",
            BudgetRange::Premium => "above $60,000 per year",
        }
    }
}

impl fmt::Display for BudgetRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The request key of a pathway: who wants to study what, where.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct PathwayProfile {
    pub country: String,
    pub course: String,
    pub academic_level: AcademicLevel,
    pub budget_range: BudgetRange,
    pub nationality: String,
}

impl PathwayProfile {
    /// Deterministic lookup key for the template cache.
    ///
    /// Every part is lowercased and stripped of non-alphanumeric characters,
    /// so `"United Kingdom"` and `"united-kingdom"` map to the same key.
    pub fn key(&self) -> String {
        [
            normalize_key_part(&self.country),
            normalize_key_part(&self.course),
            normalize_key_part(self.academic_level.as_str()),
            normalize_key_part(self.budget_range.as_str()),
            normalize_key_part(&self.nationality),
        ]
        .join("_")
    }

    /// Reject profiles with blank free-text fields.
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("country", &self.country),
            ("course", &self.course),
            ("nationality", &self.nationality),
        ] {
            if normalize_key_part(value).is_empty() {
                return Err(AppError::validation(format!("{field} must not be empty")));
            }
        }
        Ok(())
    }

    /// Same country, case- and punctuation-insensitive.
    pub fn same_country(&self, other: &str) -> bool {
        normalize_key_part(&self.country) == normalize_key_part(other)
    }

    pub fn same_course(&self, other: &str) -> bool {
        normalize_key_part(&self.course) == normalize_key_part(other)
    }
}

/// Lowercase and drop everything that is not alphanumeric.
pub fn normalize_key_part(value: &str) -> String {
    value
        .to_lowercase()
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect()
}

/// A single step of a pathway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Step {
    /// 1-based position, also the merge key for user progress
    pub number: u32,
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub tasks: Vec<String>,
    /// Free-form duration such as "2-4 weeks"
    #[serde(default)]
    pub duration: String,
    /// Estimated cost of the step in the template currency
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub estimated_cost: Option<f64>,
    #[serde(default)]
    pub is_limited: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimelineEntry {
    pub phase: String,
    pub duration: String,
}

/// Yearly cost estimate for a pathway.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub currency: String,
    pub tuition_per_year: f64,
    pub living_per_year: f64,
    #[serde(default)]
    pub insurance_per_year: f64,
    #[serde(default)]
    pub visa_fee: f64,
    #[serde(default)]
    pub application_fees: f64,
}

impl CostBreakdown {
    /// Everything due in the first year of study.
    pub fn total_first_year(&self) -> f64 {
        self.tuition_per_year
            + self.living_per_year
            + self.insurance_per_year
            + self.visa_fee
            + self.application_fees
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct VisaInfo {
    pub visa_type: String,
    #[serde(default)]
    pub processing_time: String,
    #[serde(default)]
    pub requirements: Vec<String>,
    #[serde(default)]
    pub work_rights: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scholarship {
    pub name: String,
    #[serde(default)]
    pub amount: String,
    #[serde(default)]
    pub eligibility: String,
}

/// Where a pathway came from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum PathwayKind {
    /// Hard-coded plan keyed by country and level
    Static,
    /// Produced by the generative model
    AiGenerated { model: String },
    /// Borrowed from a template of a neighbouring profile
    Adapted { source_key: String },
    /// Reduced view handed to free-tier users
    Limited { full_step_count: usize },
}

/// User-specific additions applied when a template is served.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Personalization {
    pub budget_message: String,
    #[serde(default)]
    pub notes: Vec<String>,
}

/// A profile-keyed study-abroad plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathwayTemplate {
    pub key: String,
    pub profile: PathwayProfile,
    pub title: String,
    #[serde(default)]
    pub summary: String,
    pub steps: Vec<Step>,
    #[serde(default)]
    pub timeline: Vec<TimelineEntry>,
    /// `None` when masked for the free tier
    #[serde(default)]
    pub costs: Option<CostBreakdown>,
    #[serde(default)]
    pub visa: VisaInfo,
    #[serde(default)]
    pub scholarships: Vec<Scholarship>,
    /// Recommended university names
    #[serde(default)]
    pub universities: Vec<String>,
    pub kind: PathwayKind,
    #[serde(default)]
    pub is_adapted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub personalization: Option<Personalization>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub upgrade_prompt: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl PathwayTemplate {
    /// Relabel this template for another profile.
    pub fn adapted_to(mut self, profile: &PathwayProfile) -> Self {
        let source_key = self.key.clone();
        self.key = profile.key();
        self.title = pathway_title(profile);
        self.profile = profile.clone();
        self.kind = PathwayKind::Adapted { source_key };
        self.is_adapted = true;
        self
    }

    pub fn step(&self, number: u32) -> Option<&Step> {
        self.steps.iter().find(|s| s.number == number)
    }
}

/// Default title for a profile, e.g. "Master's in Computer Science in Canada".
pub fn pathway_title(profile: &PathwayProfile) -> String {
    format!(
        "{} in {} in {}",
        profile.academic_level.label(),
        profile.course,
        profile.country
    )
}
