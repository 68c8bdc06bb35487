// src/services/profiles.rs

//! Student profiles.

use chrono::Utc;
use serde::Deserialize;

use crate::error::{AppError, Result};
use crate::models::UserProfile;
use crate::services::auth::AuthUser;
use crate::services::cgpa::convert_cgpa;
use crate::storage::Db;

/// Fields a user may change on their profile.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileUpdate {
    pub display_name: Option<String>,
    pub nationality: Option<String>,
    /// Either scale, stored on the 10-point scale
    pub cgpa: Option<f64>,
    pub ielts: Option<f64>,
    pub target_countries: Option<Vec<String>>,
}

#[derive(Clone)]
pub struct ProfileService {
    db: Db,
}

impl ProfileService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    /// Create the profile for a signed-in user, or return the existing one.
    pub async fn register(&self, user: &AuthUser, display_name: Option<String>) -> Result<(UserProfile, bool)> {
        if let Some(existing) = self.db.profile(&user.uid).await? {
            return Ok((existing, false));
        }

        let mut profile = UserProfile::new(&user.uid, &user.email);
        profile.display_name = display_name.unwrap_or_default().trim().to_string();
        self.db.save_profile(&profile).await?;
        log::info!("Registered user {}", user.uid);
        Ok((profile, true))
    }

    pub async fn get(&self, uid: &str) -> Result<UserProfile> {
        self.db
            .profile(uid)
            .await?
            .ok_or_else(|| AppError::not_found("Profile", uid))
    }

    pub async fn update(&self, uid: &str, update: ProfileUpdate) -> Result<UserProfile> {
        let mut profile = self.get(uid).await?;

        if let Some(name) = update.display_name {
            profile.display_name = name.trim().to_string();
        }
        if let Some(nationality) = update.nationality {
            let nationality = nationality.trim().to_string();
            profile.nationality = (!nationality.is_empty()).then_some(nationality);
        }
        if let Some(cgpa) = update.cgpa {
            profile.cgpa = Some(convert_cgpa(cgpa)?);
        }
        if let Some(ielts) = update.ielts {
            if !(0.0..=9.0).contains(&ielts) {
                return Err(AppError::validation("IELTS band must be between 0 and 9"));
            }
            profile.ielts = Some(ielts);
        }
        if let Some(countries) = update.target_countries {
            profile.target_countries = countries
                .into_iter()
                .map(|c| c.trim().to_string())
                .filter(|c| !c.is_empty())
                .collect();
        }

        profile.updated_at = Utc::now();
        self.db.save_profile(&profile).await?;
        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> AuthUser {
        AuthUser {
            uid: "u1".into(),
            email: "student@example.com".into(),
            is_admin: false,
        }
    }

    #[tokio::test]
    async fn register_is_idempotent() {
        let service = ProfileService::new(Db::in_memory());
        let (first, created) = service.register(&user(), Some(" Asha ".into())).await.unwrap();
        assert!(created);
        assert_eq!(first.display_name, "Asha");

        let (second, created) = service.register(&user(), None).await.unwrap();
        assert!(!created);
        assert_eq!(second, first);
    }

    #[tokio::test]
    async fn update_normalizes_cgpa_and_validates_ielts() {
        let service = ProfileService::new(Db::in_memory());
        service.register(&user(), None).await.unwrap();

        let profile = service
            .update(
                "u1",
                ProfileUpdate {
                    cgpa: Some(3.6),
                    target_countries: Some(vec!["Canada".into(), " ".into()]),
                    ..Default::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(profile.cgpa, Some(9.0));
        assert_eq!(profile.target_countries, vec!["Canada"]);

        let bad = ProfileUpdate {
            ielts: Some(10.0),
            ..Default::default()
        };
        assert!(service.update("u1", bad).await.is_err());
        assert!(matches!(
            service.get("nobody").await.unwrap_err(),
            AppError::NotFound { .. }
        ));
    }
}
