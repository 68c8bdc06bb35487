//! University duplicate detection and merging.
//!
//! A candidate is a duplicate when its lowercased name equals an existing
//! name, or when the normalized names are more than 85% similar by
//! Levenshtein distance *and* city and country match.

use crate::models::UniversityRecord;

/// Minimum similarity (exclusive) for a fuzzy name match.
pub const SIMILARITY_THRESHOLD: f64 = 0.85;

/// Word-level expansions applied before fuzzy comparison.
const ABBREVIATIONS: &[(&str, &str)] = &[
    ("univ", "university"),
    ("uni", "university"),
    ("inst", "institute"),
    ("tech", "technology"),
    ("coll", "college"),
    ("natl", "national"),
    ("intl", "international"),
    ("st", "saint"),
    ("&", "and"),
];

/// Identity fields of a university used for comparison.
#[derive(Debug, Clone, Copy)]
pub struct Candidate<'a> {
    pub name: &'a str,
    pub city: &'a str,
    pub country: &'a str,
}

impl<'a> From<&'a UniversityRecord> for Candidate<'a> {
    fn from(record: &'a UniversityRecord) -> Self {
        Self {
            name: &record.name,
            city: &record.city,
            country: &record.country,
        }
    }
}

/// Levenshtein edit distance over chars.
pub fn levenshtein(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let mut prev: Vec<usize> = (0..=b.len()).collect();
    let mut curr = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let cost = usize::from(ca != cb);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[b.len()]
}

/// Similarity in `[0, 1]`: one minus distance over the longer length.
pub fn similarity(a: &str, b: &str) -> f64 {
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - levenshtein(a, b) as f64 / longest as f64
}

/// Lowercase, drop punctuation and expand common abbreviations.
pub fn normalize_name(name: &str) -> String {
    let cleaned: String = name
        .to_lowercase()
        .chars()
        .map(|c| if c.is_alphanumeric() || c == '&' { c } else { ' ' })
        .collect();

    let words: Vec<&str> = cleaned
        .split_whitespace()
        .filter(|w| *w != "the")
        .map(|w| {
            ABBREVIATIONS
                .iter()
                .find(|(short, _)| *short == w)
                .map_or(w, |(_, long)| *long)
        })
        .collect();

    words.join(" ")
}

fn same_place(a: &str, b: &str) -> bool {
    a.trim().to_lowercase() == b.trim().to_lowercase()
}

/// Decide whether `candidate` is the same university as `existing`.
pub fn is_duplicate(candidate: Candidate<'_>, existing: Candidate<'_>) -> bool {
    if candidate.name.trim().to_lowercase() == existing.name.trim().to_lowercase() {
        return true;
    }

    similarity(
        &normalize_name(candidate.name),
        &normalize_name(existing.name),
    ) > SIMILARITY_THRESHOLD
        && same_place(candidate.city, existing.city)
        && same_place(candidate.country, existing.country)
}

/// First existing record the candidate duplicates, if any.
pub fn find_duplicate<'a>(
    candidate: Candidate<'_>,
    existing: &'a [UniversityRecord],
) -> Option<&'a UniversityRecord> {
    existing
        .iter()
        .find(|record| is_duplicate(candidate, Candidate::from(*record)))
}

/// A set of records considered the same university.
#[derive(Debug, Clone)]
pub struct DuplicateGroup {
    /// Record with the highest completeness score
    pub keep: UniversityRecord,
    /// Records to remove
    pub remove: Vec<UniversityRecord>,
}

/// Group records into duplicate clusters of two or more.
///
/// Records are visited oldest first and each joins the first cluster holding
/// any record it duplicates, so a cluster can chain through near matches.
/// Within a group the most complete record is kept; ties keep the earliest
/// created.
pub fn group_duplicates(records: &[UniversityRecord]) -> Vec<DuplicateGroup> {
    let mut sorted: Vec<&UniversityRecord> = records.iter().collect();
    sorted.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));

    let mut clusters: Vec<Vec<&UniversityRecord>> = Vec::new();
    for record in sorted {
        let home = clusters.iter_mut().find(|cluster| {
            cluster
                .iter()
                .any(|member| is_duplicate(Candidate::from(record), Candidate::from(*member)))
        });
        match home {
            Some(cluster) => cluster.push(record),
            None => clusters.push(vec![record]),
        }
    }

    clusters
        .into_iter()
        .filter(|cluster| cluster.len() > 1)
        .map(|cluster| {
            let best = cluster
                .iter()
                .enumerate()
                .max_by(|(ia, a), (ib, b)| {
                    a.completeness_score()
                        .cmp(&b.completeness_score())
                        .then(ib.cmp(ia))
                })
                .map(|(i, _)| i)
                .unwrap_or(0);

            let keep = cluster[best].clone();
            let remove = cluster
                .iter()
                .enumerate()
                .filter(|(i, _)| *i != best)
                .map(|(_, r)| (*r).clone())
                .collect();
            DuplicateGroup { keep, remove }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures::sample_university;

    fn candidate<'a>(name: &'a str, city: &'a str, country: &'a str) -> Candidate<'a> {
        Candidate {
            name,
            city,
            country,
        }
    }

    #[test]
    fn levenshtein_basics() {
        assert_eq!(levenshtein("kitten", "sitting"), 3);
        assert_eq!(levenshtein("", "abc"), 3);
        assert_eq!(levenshtein("same", "same"), 0);
    }

    #[test]
    fn abbreviation_is_similar_in_same_city() {
        let existing = candidate("Harvard University", "Cambridge", "USA");
        let new = candidate("Harvard Univ.", "Cambridge", "USA");
        assert!(is_duplicate(new, existing));
    }

    #[test]
    fn abbreviation_in_other_city_is_distinct() {
        let existing = candidate("Harvard University", "Cambridge", "USA");
        let new = candidate("Harvard Univ.", "Boston", "USA");
        assert!(!is_duplicate(new, existing));
    }

    #[test]
    fn exact_name_ignores_location() {
        let existing = candidate("Monash University", "Melbourne", "Australia");
        let new = candidate("  monash university ", "Clayton", "Australia");
        assert!(is_duplicate(new, existing));
    }

    #[test]
    fn typo_within_threshold_matches() {
        let existing = candidate("University of British Columbia", "Vancouver", "Canada");
        let new = candidate("University of Britsh Columbia", "vancouver", "canada");
        assert!(is_duplicate(new, existing));

        let other = candidate("University of Toronto", "Vancouver", "Canada");
        assert!(!is_duplicate(other, existing));
    }

    #[test]
    fn place_names_compare_beyond_ascii() {
        let existing = candidate("ETH Zürich", "Zürich", "Switzerland");
        let new = candidate("ETH Zurich", " ZÜRICH", "SWITZERLAND");
        assert!(is_duplicate(new, existing));
    }

    #[test]
    fn normalize_expands_and_strips() {
        assert_eq!(
            normalize_name("The Massachusetts Inst. of Tech."),
            "massachusetts institute of technology"
        );
    }

    #[test]
    fn group_keeps_most_complete_record() {
        let sparse = sample_university("Harvard Univ.", "Cambridge", "USA");
        let mut rich = sample_university("Harvard University", "Cambridge", "USA");
        rich.ranking = Some(3);
        rich.website = Some("https://harvard.edu".into());
        let unrelated = sample_university("Boston University", "Boston", "USA");

        let groups = group_duplicates(&[sparse.clone(), rich.clone(), unrelated]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].keep.id, rich.id);
        assert_eq!(groups[0].remove.len(), 1);
        assert_eq!(groups[0].remove[0].id, sparse.id);
    }

    #[test]
    fn group_chains_through_any_member() {
        let mut main = sample_university("Monash University", "Melbourne", "Australia");
        main.ranking = Some(42);
        let mut campus = sample_university("monash university", "Clayton", "Australia");
        campus.created_at = main.created_at + chrono::Duration::seconds(1);
        // only a duplicate of `campus`, which is not the kept record
        let mut short = sample_university("Monash Univ.", "Clayton", "Australia");
        short.created_at = main.created_at + chrono::Duration::seconds(2);
        assert!(!is_duplicate(Candidate::from(&short), Candidate::from(&main)));

        let groups = group_duplicates(&[short.clone(), main.clone(), campus.clone()]);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].keep.id, main.id);
        let removed: Vec<&str> = groups[0].remove.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(removed, vec![campus.id.as_str(), short.id.as_str()]);
    }

    #[test]
    fn find_duplicate_returns_match() {
        let records = vec![sample_university("University of Oxford", "Oxford", "UK")];
        let found = find_duplicate(candidate("Univ. of Oxford", "Oxford", "UK"), &records);
        assert!(found.is_some());
        assert!(find_duplicate(candidate("Oxford Brookes University", "Oxford", "UK"), &records).is_none());
    }
}
