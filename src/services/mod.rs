//! Service layer for the advising backend.
//!
//! This module contains the business logic for:
//! - Pathway resolution (`PathwayResolver`) and its static fallback
//! - AI pathway generation and analysis (`GeminiClient`)
//! - Profiles (`ProfileService`) and saved pathways (`UserPathwayService`)
//! - Subscription gating (`UsageService`)
//! - University search and admin edits (`UniversityService`)
//! - Duplicate detection, CGPA and currency conversion
//! - Places lookups (`PlacesClient`) and token verification (`Authenticator`)

pub mod ai;
pub mod auth;
pub mod cgpa;
pub mod currency;
pub mod duplicates;
pub mod pathways;
pub mod places;
pub mod profiles;
pub mod static_pathway;
pub mod universities;
pub mod usage;
pub mod user_pathways;

pub use ai::{GeminiClient, PathwayGenerator};
pub use auth::{AuthUser, Authenticator, TokenVerifier};
pub use currency::CurrencyService;
pub use pathways::{PathwayResolver, PathwaySource, ResolvedPathway};
pub use places::{PlaceSource, PlacesClient};
pub use profiles::{ProfileService, ProfileUpdate};
pub use universities::{UniversityQuery, UniversityService};
pub use usage::{Gate, UsageService};
pub use user_pathways::{StepUpdate, UserPathwayService};
