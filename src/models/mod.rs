// src/models/mod.rs

//! Domain models for the advising backend.
//!
//! One struct per stored collection, plus the configuration tree.

mod config;
mod currency;
mod pathway;
mod subscription;
mod university;
mod user;

// Re-export all public types
pub use config::{
    AiConfig, AuthConfig, Config, CurrencyConfig, DevToken, HttpConfig, PlacesConfig,
    PopulateTarget, ScrapingConfig, ServerConfig,
};
pub use currency::{ExchangeRates, RateSource};
pub use pathway::{
    AcademicLevel, BudgetRange, CostBreakdown, PathwayKind, PathwayProfile, PathwayTemplate,
    Personalization, Scholarship, Step, TimelineEntry, VisaInfo, normalize_key_part,
    pathway_title,
};
pub use subscription::{Feature, Plan, PlanLimits, SubscriptionUsage};
pub use university::{
    AdmissionRequirements, RecordSource, TuitionRange, UNIVERSITY_SCHEMA_VERSION,
    UniversityRecord, UniversityType, migrate_university, university_id,
};
pub use user::{StepStatus, UserPathway, UserProfile, UserStep};

#[cfg(test)]
pub(crate) mod fixtures {
    pub use super::pathway::tests::sample_profile;
    pub use super::university::tests::sample_university;
}
