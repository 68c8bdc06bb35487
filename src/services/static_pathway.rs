//! Deterministic pathway generation without AI or database access.
//!
//! Keyed only by destination country and academic level. This is the last
//! link of the resolution chain, so it cannot fail: unknown countries get a
//! generic plan priced in USD.

use chrono::Utc;

use crate::models::{
    AcademicLevel, CostBreakdown, PathwayKind, PathwayProfile, PathwayTemplate, Scholarship, Step,
    TimelineEntry, VisaInfo, normalize_key_part, pathway_title,
};

/// Per-country reference data.
struct CountryProfile {
    currency: &'static str,
    /// Annual tuition for diploma, undergraduate, postgraduate, doctorate
    tuition: [f64; 4],
    living_per_year: f64,
    insurance_per_year: f64,
    visa_type: &'static str,
    visa_fee: f64,
    processing_time: &'static str,
    work_rights: &'static str,
    proof_of_funds: &'static str,
    scholarships: &'static [(&'static str, &'static str)],
    universities: &'static [&'static str],
}

const USA: CountryProfile = CountryProfile {
    currency: "USD",
    tuition: [15_000.0, 35_000.0, 30_000.0, 28_000.0],
    living_per_year: 15_000.0,
    insurance_per_year: 2_000.0,
    visa_type: "F-1 Student Visa",
    visa_fee: 185.0,
    processing_time: "3-8 weeks after the interview",
    work_rights: "20 hours/week on campus; OPT after graduation",
    proof_of_funds: "I-20 showing funds for the first year",
    scholarships: &[
        ("Fulbright Foreign Student Program", "Full tuition and living"),
        ("University merit scholarships", "Partial tuition"),
        ("Graduate assistantships", "Tuition waiver and stipend"),
    ],
    universities: &[
        "Arizona State University",
        "University of Texas at Dallas",
        "Northeastern University",
    ],
};

const UK: CountryProfile = CountryProfile {
    currency: "GBP",
    tuition: [12_000.0, 22_000.0, 24_000.0, 22_000.0],
    living_per_year: 12_000.0,
    insurance_per_year: 776.0,
    visa_type: "Student Visa (Tier 4)",
    visa_fee: 490.0,
    processing_time: "3 weeks",
    work_rights: "20 hours/week in term; Graduate Route for 2 years",
    proof_of_funds: "Course fees plus 9 months of living costs held for 28 days",
    scholarships: &[
        ("Chevening Scholarships", "Full tuition and living"),
        ("Commonwealth Scholarships", "Full tuition and living"),
        ("GREAT Scholarships", "GBP 10,000"),
    ],
    universities: &[
        "University of Manchester",
        "University of Leeds",
        "University of Glasgow",
    ],
};

const CANADA: CountryProfile = CountryProfile {
    currency: "CAD",
    tuition: [15_000.0, 30_000.0, 25_000.0, 20_000.0],
    living_per_year: 20_635.0,
    insurance_per_year: 900.0,
    visa_type: "Study Permit",
    visa_fee: 150.0,
    processing_time: "8-12 weeks",
    work_rights: "24 hours/week off campus; PGWP after graduation",
    proof_of_funds: "GIC or bank statements covering tuition and living",
    scholarships: &[
        ("Vanier Canada Graduate Scholarships", "CAD 50,000 per year"),
        ("Lester B. Pearson International Scholarship", "Full tuition and living"),
        ("Provincial graduate scholarships", "CAD 10,000 - 15,000"),
    ],
    universities: &[
        "University of Waterloo",
        "University of Alberta",
        "Dalhousie University",
    ],
};

const AUSTRALIA: CountryProfile = CountryProfile {
    currency: "AUD",
    tuition: [20_000.0, 38_000.0, 42_000.0, 35_000.0],
    living_per_year: 29_710.0,
    insurance_per_year: 700.0,
    visa_type: "Student Visa (Subclass 500)",
    visa_fee: 1_600.0,
    processing_time: "4-6 weeks",
    work_rights: "48 hours per fortnight in term",
    proof_of_funds: "Evidence of tuition, travel and 12 months of living costs",
    scholarships: &[
        ("Australia Awards", "Full tuition and living"),
        ("Destination Australia", "AUD 15,000 per year"),
        ("Research Training Program", "Tuition and stipend"),
    ],
    universities: &[
        "Monash University",
        "University of Queensland",
        "RMIT University",
    ],
};

const GERMANY: CountryProfile = CountryProfile {
    currency: "EUR",
    tuition: [1_500.0, 1_500.0, 1_500.0, 500.0],
    living_per_year: 11_904.0,
    insurance_per_year: 1_440.0,
    visa_type: "National Visa for Study (Type D)",
    visa_fee: 75.0,
    processing_time: "6-12 weeks",
    work_rights: "140 full days per year; 18-month job seeker permit",
    proof_of_funds: "Blocked account with one year of living costs",
    scholarships: &[
        ("DAAD Scholarships", "EUR 934 per month"),
        ("Deutschlandstipendium", "EUR 300 per month"),
        ("Heinrich Boell Foundation", "Monthly stipend"),
    ],
    universities: &[
        "Technical University of Munich",
        "RWTH Aachen University",
        "University of Stuttgart",
    ],
};

const GENERIC: CountryProfile = CountryProfile {
    currency: "USD",
    tuition: [10_000.0, 20_000.0, 22_000.0, 18_000.0],
    living_per_year: 12_000.0,
    insurance_per_year: 1_000.0,
    visa_type: "Student Visa",
    visa_fee: 150.0,
    processing_time: "4-8 weeks",
    work_rights: "Check the host country's part-time work rules",
    proof_of_funds: "Bank statements covering tuition and one year of living costs",
    scholarships: &[
        ("Government-funded scholarships", "Varies"),
        ("University international scholarships", "Partial tuition"),
    ],
    universities: &[],
};

fn country_profile(country: &str) -> &'static CountryProfile {
    match normalize_key_part(country).as_str() {
        "usa" | "us" | "unitedstates" | "unitedstatesofamerica" | "america" => &USA,
        "uk" | "unitedkingdom" | "england" | "greatbritain" | "britain" => &UK,
        "canada" => &CANADA,
        "australia" => &AUSTRALIA,
        "germany" | "deutschland" => &GERMANY,
        _ => &GENERIC,
    }
}

fn level_index(level: AcademicLevel) -> usize {
    match level {
        AcademicLevel::Diploma => 0,
        AcademicLevel::Undergraduate => 1,
        AcademicLevel::Postgraduate => 2,
        AcademicLevel::Doctorate => 3,
    }
}

fn entrance_tests(level: AcademicLevel, country: &CountryProfile) -> &'static str {
    match level {
        AcademicLevel::Undergraduate if country.currency == "USD" => "IELTS/TOEFL and SAT/ACT",
        AcademicLevel::Postgraduate | AcademicLevel::Doctorate if country.currency == "USD" => {
            "IELTS/TOEFL and GRE/GMAT"
        }
        AcademicLevel::Postgraduate | AcademicLevel::Doctorate => "IELTS/TOEFL (GRE if required)",
        _ => "IELTS/TOEFL",
    }
}

fn step(number: u32, title: &str, description: String, tasks: &[&str], duration: &str, cost: Option<f64>) -> Step {
    Step {
        number,
        title: title.to_string(),
        description,
        tasks: tasks.iter().map(|t| t.to_string()).collect(),
        duration: duration.to_string(),
        estimated_cost: cost,
        is_limited: false,
    }
}

/// Build the fallback pathway for a profile.
pub fn generate(profile: &PathwayProfile) -> PathwayTemplate {
    let country = country_profile(&profile.country);
    let level = profile.academic_level;
    let tests = entrance_tests(level, country);
    let application_fees = 100.0 * 4.0;

    let mut steps = vec![
        step(
            1,
            "Research universities and programmes",
            format!(
                "Shortlist {} programmes in {} that match your academic record and budget.",
                profile.course, profile.country
            ),
            &[
                "List 8-10 programmes with entry requirements",
                "Compare tuition, location and rankings",
                "Check intake dates and application deadlines",
                "Attend virtual open days",
            ],
            "4-6 weeks",
            None,
        ),
        step(
            2,
            "Prepare for entrance tests",
            format!("Book and prepare for {tests}."),
            &[
                "Take a diagnostic test",
                "Follow a structured study plan",
                "Book the test date at least 6 weeks ahead",
                "Send official scores to universities",
            ],
            "2-3 months",
            Some(250.0),
        ),
        step(
            3,
            "Prepare application documents",
            "Collect transcripts and write the documents every application needs.".to_string(),
            &[
                "Request official transcripts",
                "Draft the statement of purpose",
                "Ask for two or three recommendation letters",
                "Update your CV",
            ],
            "3-4 weeks",
            None,
        ),
        step(
            4,
            "Submit applications",
            "Apply to the shortlisted programmes before their deadlines.".to_string(),
            &[
                "Fill in the online application forms",
                "Pay the application fees",
                "Track each application status",
            ],
            "2-4 weeks",
            Some(application_fees),
        ),
        step(
            5,
            "Arrange finances and scholarships",
            format!(
                "Apply for scholarships and prepare proof of funds: {}.",
                country.proof_of_funds
            ),
            &[
                "Apply to eligible scholarships",
                "Compare education loan offers",
                "Prepare bank statements and sponsor letters",
            ],
            "4-8 weeks",
            None,
        ),
        step(
            6,
            "Apply for the student visa",
            format!(
                "Apply for the {} once you hold an offer letter.",
                country.visa_type
            ),
            &[
                "Gather the visa document checklist",
                "Pay the visa fee and book biometrics",
                "Attend the visa interview if required",
            ],
            country.processing_time,
            Some(country.visa_fee),
        ),
        step(
            7,
            "Prepare for departure",
            "Sort out accommodation, insurance and travel before the intake.".to_string(),
            &[
                "Book accommodation",
                "Buy health insurance",
                "Book flights",
                "Register for orientation",
            ],
            "2-4 weeks",
            Some(country.insurance_per_year),
        ),
    ];

    if level == AcademicLevel::Doctorate {
        steps.insert(
            1,
            step(
                2,
                "Contact potential supervisors",
                "Find supervisors whose research matches your interests and write a proposal."
                    .to_string(),
                &[
                    "Read recent papers of target research groups",
                    "Email supervisors with a short research summary",
                    "Draft a research proposal",
                ],
                "4-8 weeks",
                None,
            ),
        );
        for (i, s) in steps.iter_mut().enumerate() {
            s.number = i as u32 + 1;
        }
    }

    let costs = CostBreakdown {
        currency: country.currency.to_string(),
        tuition_per_year: country.tuition[level_index(level)],
        living_per_year: country.living_per_year,
        insurance_per_year: country.insurance_per_year,
        visa_fee: country.visa_fee,
        application_fees,
    };

    let timeline = vec![
        TimelineEntry {
            phase: "Research and tests".into(),
            duration: "Months 1-3".into(),
        },
        TimelineEntry {
            phase: "Applications".into(),
            duration: "Months 4-6".into(),
        },
        TimelineEntry {
            phase: "Offers, funding and visa".into(),
            duration: "Months 7-9".into(),
        },
        TimelineEntry {
            phase: "Departure".into(),
            duration: "Months 10-12".into(),
        },
    ];

    let now = Utc::now();
    PathwayTemplate {
        key: profile.key(),
        profile: profile.clone(),
        title: pathway_title(profile),
        summary: format!(
            "A {}-year {} plan for studying {} in {}, starting about 12 months before intake.",
            level.typical_years(),
            level.label(),
            profile.course,
            profile.country
        ),
        steps,
        timeline,
        costs: Some(costs),
        visa: VisaInfo {
            visa_type: country.visa_type.to_string(),
            processing_time: country.processing_time.to_string(),
            requirements: vec![
                "Offer letter from a recognised institution".into(),
                "Valid passport".into(),
                country.proof_of_funds.to_string(),
                format!("English proficiency ({tests})"),
            ],
            work_rights: country.work_rights.to_string(),
        },
        scholarships: country
            .scholarships
            .iter()
            .map(|(name, amount)| Scholarship {
                name: name.to_string(),
                amount: amount.to_string(),
                eligibility: format!("International {} applicants", level.label()),
            })
            .collect(),
        universities: country.universities.iter().map(|u| u.to_string()).collect(),
        kind: PathwayKind::Static,
        is_adapted: false,
        personalization: None,
        upgrade_prompt: None,
        created_at: now,
        updated_at: now,
    }
}
