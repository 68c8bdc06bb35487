// src/services/universities.rs

//! University search and admin maintenance.

use std::cmp::Ordering;

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{
    AdmissionRequirements, RecordSource, TuitionRange, UniversityRecord, UniversityType,
};
use crate::services::cgpa::convert_cgpa;
use crate::services::duplicates::{Candidate, find_duplicate};
use crate::storage::Db;

pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;

/// Search filters. Every field is optional.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UniversityQuery {
    /// Case-insensitive substring of the name
    pub search: Option<String>,
    pub country: Option<String>,
    pub city: Option<String>,
    pub university_type: Option<UniversityType>,
    /// Upper bound on the minimum yearly tuition, in the record's currency
    pub max_tuition: Option<f64>,
    pub min_ranking: Option<u32>,
    pub max_ranking: Option<u32>,
    /// Case-insensitive substring of any offered program
    pub program: Option<String>,
    pub verified_only: Option<bool>,
    /// Student CGPA, either scale
    pub student_cgpa: Option<f64>,
    pub student_ielts: Option<f64>,
    pub page: Option<usize>,
    pub limit: Option<usize>,
}

/// One page of results.
#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: usize,
    pub page: usize,
    pub limit: usize,
    pub total_pages: usize,
}

fn contains_ci(haystack: &str, needle: &str) -> bool {
    haystack.to_lowercase().contains(&needle.trim().to_lowercase())
}

fn eq_ci(a: &str, b: &str) -> bool {
    a.trim().eq_ignore_ascii_case(b.trim())
}

impl UniversityQuery {
    fn matches(&self, record: &UniversityRecord, student_cgpa: Option<f64>) -> bool {
        if let Some(search) = self.search.as_deref().filter(|s| !s.trim().is_empty()) {
            if !contains_ci(&record.name, search) {
                return false;
            }
        }
        if self.country.as_deref().is_some_and(|c| !eq_ci(&record.country, c)) {
            return false;
        }
        if self.city.as_deref().is_some_and(|c| !eq_ci(&record.city, c)) {
            return false;
        }
        if self.university_type.is_some_and(|t| t != record.university_type) {
            return false;
        }
        if let Some(max) = self.max_tuition {
            if !record.tuition.as_ref().is_some_and(|t| t.min <= max) {
                return false;
            }
        }
        if self.min_ranking.is_some() || self.max_ranking.is_some() {
            let Some(rank) = record.ranking else {
                return false;
            };
            if self.min_ranking.is_some_and(|min| rank < min)
                || self.max_ranking.is_some_and(|max| rank > max)
            {
                return false;
            }
        }
        if let Some(program) = self.program.as_deref() {
            if !record.programs.iter().any(|p| contains_ci(p, program)) {
                return false;
            }
        }
        if self.verified_only.unwrap_or(false) && !record.is_verified {
            return false;
        }
        if let (Some(student), Some(required)) = (student_cgpa, record.admission.min_cgpa) {
            if student < required {
                return false;
            }
        }
        if let (Some(student), Some(required)) = (self.student_ielts, record.admission.min_ielts) {
            if student < required {
                return false;
            }
        }
        true
    }
}

/// Ranked first by ranking (unranked last), then by name.
fn by_ranking_then_name(a: &UniversityRecord, b: &UniversityRecord) -> Ordering {
    match (a.ranking, b.ranking) {
        (Some(x), Some(y)) => x.cmp(&y),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
    .then_with(|| a.name.to_lowercase().cmp(&b.name.to_lowercase()))
}

/// Filter, sort and paginate records.
pub fn search(records: Vec<UniversityRecord>, query: &UniversityQuery) -> Result<Page<UniversityRecord>> {
    let student_cgpa = query.student_cgpa.map(convert_cgpa).transpose()?;

    let mut matched: Vec<UniversityRecord> = records
        .into_iter()
        .filter(|r| query.matches(r, student_cgpa))
        .collect();
    matched.sort_by(by_ranking_then_name);

    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let page = query.page.unwrap_or(1).max(1);
    let total = matched.len();
    let total_pages = total.div_ceil(limit);

    let items = matched
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .collect();

    Ok(Page {
        items,
        total,
        page,
        limit,
        total_pages,
    })
}

/// Admin-supplied university fields.
#[derive(Debug, Clone, Deserialize)]
pub struct UniversityInput {
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
}

impl UniversityInput {
    fn apply(self, record: &mut UniversityRecord) -> Result<()> {
        record.name = self.name.trim().to_string();
        record.country = self.country.trim().to_string();
        record.city = self.city.trim().to_string();
        record.university_type = self.university_type;
        record.ranking = self.ranking;
        record.tuition = self.tuition;
        record.admission = self.admission;
        record.admission.min_cgpa = record.admission.min_cgpa.map(convert_cgpa).transpose()?;
        record.programs = self.programs;
        record.website = self.website;
        record.address = self.address;
        record.updated_at = Utc::now();
        record.validate()
    }
}

#[derive(Clone)]
pub struct UniversityService {
    db: Db,
}

impl UniversityService {
    pub fn new(db: Db) -> Self {
        Self { db }
    }

    pub async fn search(&self, query: &UniversityQuery) -> Result<Page<UniversityRecord>> {
        search(self.db.universities().await?, query)
    }

    pub async fn get(&self, id: &str) -> Result<UniversityRecord> {
        self.db
            .university(id)
            .await?
            .ok_or_else(|| AppError::not_found("University", id))
    }

    /// Insert a new manual record. Duplicates are rejected.
    pub async fn create(&self, input: UniversityInput) -> Result<UniversityRecord> {
        let mut record =
            UniversityRecord::new(&input.name, &input.city, &input.country, RecordSource::Manual);
        input.apply(&mut record)?;

        let existing = self.db.universities().await?;
        if let Some(dup) = find_duplicate(Candidate::from(&record), &existing) {
            return Err(AppError::validation(format!(
                "University already exists: {} ({})",
                dup.name, dup.id
            )));
        }

        self.db.save_university(&record).await?;
        log::info!("Created university {} ({})", record.name, record.id);
        Ok(record)
    }

    /// Replace the editable fields of a record, keeping id and provenance.
    pub async fn update(&self, id: &str, input: UniversityInput) -> Result<UniversityRecord> {
        let mut record = self.get(id).await?;
        input.apply(&mut record)?;

        let others: Vec<UniversityRecord> = self
            .db
            .universities()
            .await?
            .into_iter()
            .filter(|r| r.id != record.id)
            .collect();
        if let Some(dup) = find_duplicate(Candidate::from(&record), &others) {
            return Err(AppError::validation(format!(
                "Another university has the same identity: {} ({})",
                dup.name, dup.id
            )));
        }

        self.db.save_university(&record).await?;
        Ok(record)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        if !self.db.delete_university(id).await? {
            return Err(AppError::not_found("University", id));
        }
        log::info!("Deleted university {}", id);
        Ok(())
    }

    pub async fn set_verified(&self, id: &str, verified: bool) -> Result<UniversityRecord> {
        let mut record = self.get(id).await?;
        record.is_verified = verified;
        record.updated_at = Utc::now();
        self.db.save_university(&record).await?;
        Ok(record)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sample_university;

    fn records() -> Vec<UniversityRecord> {
        let mut toronto = sample_university("University of Toronto", "Toronto", "Canada");
        toronto.ranking = Some(21);
        toronto.admission.min_cgpa = Some(8.0);
        toronto.programs = vec!["Computer Science".into()];
        toronto.is_verified = true;

        let mut mcgill = sample_university("McGill University", "Montreal", "Canada");
        mcgill.ranking = Some(30);
        mcgill.admission.min_cgpa = Some(7.0);
        mcgill.tuition = Some(TuitionRange {
            min: 20_000.0,
            max: 45_000.0,
            currency: "CAD".into(),
        });

        let unranked = sample_university("Acadia University", "Wolfville", "Canada");
        let abroad = sample_university("University of Melbourne", "Melbourne", "Australia");
        vec![unranked, abroad, mcgill, toronto]
    }

    #[test]
    fn sorts_by_ranking_with_unranked_last() {
        let page = search(records(), &UniversityQuery::default()).unwrap();
        let names: Vec<_> = page.items.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "University of Toronto",
                "McGill University",
                "Acadia University",
                "University of Melbourne"
            ]
        );
        assert_eq!(page.total, 4);
        assert_eq!(page.total_pages, 1);
    }

    #[test]
    fn filters_combine() {
        let query = UniversityQuery {
            country: Some("canada".into()),
            max_ranking: Some(25),
            ..Default::default()
        };
        let page = search(records(), &query).unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.items[0].name, "University of Toronto");

        let query = UniversityQuery {
            program: Some("computer".into()),
            verified_only: Some(true),
            ..Default::default()
        };
        assert_eq!(search(records(), &query).unwrap().total, 1);

        let query = UniversityQuery {
            max_tuition: Some(25_000.0),
            ..Default::default()
        };
        assert_eq!(search(records(), &query).unwrap().items[0].name, "McGill University");
    }

    #[test]
    fn eligibility_uses_ten_point_scale() {
        // 3.0 on the 4-point scale is 7.5
        let query = UniversityQuery {
            student_cgpa: Some(3.0),
            country: Some("Canada".into()),
            ..Default::default()
        };
        let page = search(records(), &query).unwrap();
        let names: Vec<_> = page.items.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["McGill University", "Acadia University"]);

        let bad = UniversityQuery {
            student_cgpa: Some(12.0),
            ..Default::default()
        };
        assert!(search(records(), &bad).is_err());
    }

    #[test]
    fn pagination_bounds() {
        let query = UniversityQuery {
            limit: Some(3),
            page: Some(2),
            ..Default::default()
        };
        let page = search(records(), &query).unwrap();
        assert_eq!(page.items.len(), 1);
        assert_eq!(page.total_pages, 2);

        let query = UniversityQuery {
            limit: Some(1000),
            page: Some(0),
            ..Default::default()
        };
        let page = search(records(), &query).unwrap();
        assert_eq!(page.limit, MAX_PAGE_SIZE);
        assert_eq!(page.page, 1);

        let query = UniversityQuery {
            page: Some(9),
            ..Default::default()
        };
        assert!(search(records(), &query).unwrap().items.is_empty());
    }

    fn input(name: &str, city: &str) -> UniversityInput {
        UniversityInput {
            name: name.into(),
            country: "USA".into(),
            city: city.into(),
            university_type: UniversityType::Private,
            ranking: Some(4),
            tuition: None,
            admission: AdmissionRequirements {
                min_cgpa: Some(3.6),
                ..Default::default()
            },
            programs: vec![],
            website: None,
            address: None,
        }
    }

    #[tokio::test]
    async fn create_rejects_duplicates_and_normalizes_cgpa() {
        let service = UniversityService::new(Db::in_memory());
        let created = service
            .create(input("Harvard University", "Cambridge"))
            .await
            .unwrap();
        assert_eq!(created.admission.min_cgpa, Some(9.0));
        assert!(!created.is_verified);

        let err = service
            .create(input("Harvard Univ.", "Cambridge"))
            .await
            .unwrap_err();
        assert!(matches!(err, AppError::Validation(_)));

        service
            .create(input("Harvard Univ.", "Boston"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn verify_update_and_delete() {
        let service = UniversityService::new(Db::in_memory());
        let created = service.create(input("Yale University", "New Haven")).await.unwrap();

        let verified = service.set_verified(&created.id, true).await.unwrap();
        assert!(verified.is_verified);

        let mut edit = input("Yale University", "New Haven");
        edit.ranking = Some(9);
        let updated = service.update(&created.id, edit).await.unwrap();
        assert_eq!(updated.ranking, Some(9));
        assert!(updated.is_verified);
        assert_eq!(updated.id, created.id);

        service.delete(&created.id).await.unwrap();
        assert!(matches!(
            service.delete(&created.id).await.unwrap_err(),
            AppError::NotFound { .. }
        ));
    }
}
