//! ============================================================================
//! Profile Projections - Total formatting over partial summary records
//! ============================================================================
//! Summaries come from an LLM and may miss any field or use unexpected
//! shapes. Every accessor here is total: absent or malformed fields project
//! to `None`/empty and the corresponding prompt line is omitted.
//! ============================================================================

use serde_json::Value;

use crate::memory::truncate_chars;
use crate::types::{
    CandidateDetail, CandidateMatch, CandidateSummary, ProfileRecord, RankedResult,
};

/// Education entries included in a prompt block
pub const EDUCATION_LIMIT: usize = 3;

/// Experience entries included in a prompt block
pub const EXPERIENCE_LIMIT: usize = 4;

/// Skills included in a prompt block
pub const SKILLS_LIMIT: usize = 15;

/// Languages included in a prompt block
pub const LANGUAGES_LIMIT: usize = 5;

/// Characters of indexed text used when a profile has no summary
pub const SOURCE_TEXT_LIMIT: usize = 300;

/// Characters of indexed text shown in a candidate detail view
pub const TEXT_PREVIEW_LIMIT: usize = 500;

/// A ranked profile together with its structured summary, if one exists
#[derive(Debug, Clone)]
pub struct RetrievedProfile {
    pub result: RankedResult,
    pub summary: Option<Value>,
}

/// Look up a field by its canonical capitalized key, falling back to
/// lowercase. Null, empty strings and empty arrays count as absent.
pub(crate) fn field<'a>(summary: &'a Value, key: &str) -> Option<&'a Value> {
    let object = summary.as_object()?;
    let value = object
        .get(key)
        .or_else(|| object.get(&key.to_lowercase()))?;

    match value {
        Value::Null => None,
        Value::String(s) if s.trim().is_empty() => None,
        Value::Array(items) if items.is_empty() => None,
        other => Some(other),
    }
}

/// Render a scalar as display text; nested structures are skipped
fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

fn text_field(entry: &Value, key: &str) -> Option<String> {
    field(entry, key).and_then(scalar_text)
}

/// Apply `render` to each list item, or to a lone non-list value
fn list_entries<F>(value: Option<&Value>, limit: usize, render: F) -> Vec<String>
where
    F: Fn(&Value) -> Option<String>,
{
    match value {
        Some(Value::Array(items)) => items.iter().filter_map(&render).take(limit).collect(),
        Some(other) => render(other).into_iter().take(limit).collect(),
        None => Vec::new(),
    }
}

pub fn candidate_name(summary: &Value) -> Option<String> {
    text_field(summary, "Name")
}

/// "Degree - School", or whichever of the two is present
pub fn education_entries(summary: &Value, limit: usize) -> Vec<String> {
    list_entries(field(summary, "Education"), limit, |entry| {
        if entry.is_object() {
            match (text_field(entry, "Degree"), text_field(entry, "School")) {
                (Some(degree), Some(school)) => Some(format!("{} - {}", degree, school)),
                (Some(degree), None) => Some(degree),
                (None, Some(school)) => Some(school),
                (None, None) => None,
            }
        } else {
            scalar_text(entry)
        }
    })
}

/// "Role at Company", or whichever of the two is present
pub fn experience_entries(summary: &Value, limit: usize) -> Vec<String> {
    list_entries(field(summary, "Experience"), limit, |entry| {
        if entry.is_object() {
            match (text_field(entry, "Role"), text_field(entry, "Company")) {
                (Some(role), Some(company)) => Some(format!("{} at {}", role, company)),
                (Some(role), None) => Some(role),
                (None, Some(company)) => Some(company),
                (None, None) => None,
            }
        } else {
            scalar_text(entry)
        }
    })
}

pub fn email(summary: &Value) -> Option<String> {
    text_field(summary, "Email")
}

pub fn skills(summary: &Value, limit: usize) -> Vec<String> {
    list_entries(field(summary, "Skills"), limit, scalar_text)
}

pub fn languages(summary: &Value, limit: usize) -> Vec<String> {
    list_entries(field(summary, "Languages"), limit, scalar_text)
}

/// Prompt block for one ranked profile.
///
/// Without a summary the block falls back to the indexed source text.
pub fn format_profile_block(rank: usize, profile: &RetrievedProfile) -> String {
    let mut lines = vec![format!("=== CANDIDATE {} ===", rank)];

    match &profile.summary {
        Some(summary) => {
            if let Some(name) = candidate_name(summary) {
                lines.push(format!("Name: {}", name));
            }
            if let Some(email) = text_field(summary, "Email") {
                lines.push(format!("Email: {}", email));
            }

            let education = education_entries(summary, EDUCATION_LIMIT);
            if !education.is_empty() {
                lines.push("Education:".to_string());
                lines.extend(education.into_iter().map(|e| format!("  • {}", e)));
            }

            let experience = experience_entries(summary, EXPERIENCE_LIMIT);
            if !experience.is_empty() {
                lines.push("Experience:".to_string());
                lines.extend(experience.into_iter().map(|e| format!("  • {}", e)));
            }

            let skills = skills(summary, SKILLS_LIMIT);
            if !skills.is_empty() {
                lines.push(format!("Skills: {}", skills.join(", ")));
            }

            let languages = languages(summary, LANGUAGES_LIMIT);
            if !languages.is_empty() {
                lines.push(format!("Languages: {}", languages.join(" | ")));
            }
        }
        None => {
            let text = profile.result.source_text.trim();
            if !text.is_empty() {
                lines.push(format!("Profile: {}", truncate_chars(text, SOURCE_TEXT_LIMIT)));
            }
        }
    }

    lines.push(format!("(Relevance Score: {:.3})", profile.result.score));
    lines.join("\n") + "\n\n"
}

/// Caller-facing projection of one ranked profile
pub fn candidate_match(rank: usize, profile: &RetrievedProfile) -> CandidateMatch {
    let summary = profile.summary.as_ref();
    CandidateMatch {
        rank,
        profile_id: profile.result.profile_id.clone(),
        score: profile.result.score,
        candidate_name: summary.and_then(candidate_name),
        skills: summary.map(|s| skills(s, 10)).unwrap_or_default(),
        experience: summary.map(|s| experience_entries(s, 2)).unwrap_or_default(),
        education: summary.map(|s| education_entries(s, 2)).unwrap_or_default(),
    }
}

/// Listing projection of a stored profile
pub fn candidate_summary(record: &ProfileRecord) -> CandidateSummary {
    let summary = record.summary.as_ref();
    CandidateSummary {
        profile_id: record.vector.profile_id.clone(),
        candidate_name: summary.and_then(candidate_name),
        email: summary.and_then(email),
        skills: summary.map(|s| skills(s, 10)).unwrap_or_default(),
        experience: summary.map(|s| experience_entries(s, 3)).unwrap_or_default(),
        education: summary.map(|s| education_entries(s, 3)).unwrap_or_default(),
        updated_at: record.updated_at,
    }
}

pub fn candidate_detail(record: ProfileRecord) -> CandidateDetail {
    CandidateDetail {
        candidate: candidate_summary(&record),
        text_preview: truncate_chars(&record.vector.source_text, TEXT_PREVIEW_LIMIT),
        summary: record.summary,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{OwnerId, ProfileVector};
    use serde_json::json;

    fn retrieved(summary: Option<Value>) -> RetrievedProfile {
        RetrievedProfile {
            result: RankedResult {
                profile_id: "cv-1".to_string(),
                owner_id: OwnerId::parse("owner").unwrap(),
                score: 0.8734,
                source_text: "Name: Ada | Skills: rust python".to_string(),
            },
            summary,
        }
    }

    #[test]
    fn test_full_block() {
        let summary = json!({
            "Name": "Ada Lovelace",
            "Education": [{"Degree": "BSc Mathematics", "School": "London"}, "Self-taught"],
            "Experience": [{"Role": "Engineer", "Company": "Analytical Engines"}, {"Company": "Babbage Ltd"}],
            "Skills": ["python", "rust"],
            "Languages": ["English", "French"]
        });
        let block = format_profile_block(1, &retrieved(Some(summary)));

        assert!(block.starts_with("=== CANDIDATE 1 ===\n"));
        assert!(block.contains("Name: Ada Lovelace\n"));
        assert!(block.contains("  • BSc Mathematics - London\n"));
        assert!(block.contains("  • Self-taught\n"));
        assert!(block.contains("  • Engineer at Analytical Engines\n"));
        assert!(block.contains("  • Babbage Ltd\n"));
        assert!(block.contains("Skills: python, rust\n"));
        assert!(block.contains("Languages: English | French\n"));
        assert!(block.contains("(Relevance Score: 0.873)"));
    }

    #[test]
    fn test_lists_are_truncated() {
        let skills_list: Vec<String> = (0..30).map(|i| format!("skill{}", i)).collect();
        let experience: Vec<Value> = (0..10).map(|i| json!({"Role": format!("Role{}", i)})).collect();
        let summary = json!({ "Skills": skills_list, "Experience": experience });

        assert_eq!(skills(&summary, SKILLS_LIMIT).len(), 15);
        assert_eq!(experience_entries(&summary, EXPERIENCE_LIMIT).len(), 4);

        let block = format_profile_block(2, &retrieved(Some(summary)));
        assert!(block.contains("skill14"));
        assert!(!block.contains("skill15"));
        assert!(block.contains("Role3"));
        assert!(!block.contains("Role4"));
    }

    #[test]
    fn test_missing_and_malformed_fields_are_omitted() {
        for summary in [
            json!({}),
            json!({"Name": null, "Skills": [], "Education": "", "Experience": [{}]}),
            json!({"Name": {"first": "A"}, "Skills": [{"nested": true}], "Education": [[1, 2]]}),
            json!("just a string"),
            json!([1, 2, 3]),
        ] {
            let block = format_profile_block(3, &retrieved(Some(summary)));
            assert_eq!(block, "=== CANDIDATE 3 ===\n(Relevance Score: 0.873)\n\n");
        }
    }

    #[test]
    fn test_lowercase_keys_and_scalar_skills() {
        let summary = json!({"name": "Grace", "skills": "COBOL, compilers"});
        let block = format_profile_block(1, &retrieved(Some(summary)));
        assert!(block.contains("Name: Grace\n"));
        assert!(block.contains("Skills: COBOL, compilers\n"));
    }

    #[test]
    fn test_missing_summary_uses_source_text() {
        let block = format_profile_block(1, &retrieved(None));
        assert!(block.contains("Profile: Name: Ada | Skills: rust python\n"));
    }

    #[test]
    fn test_candidate_match_projection() {
        let summary = json!({
            "Name": "Linus",
            "Experience": [{"Role": "Maintainer"}, {"Role": "Student"}, {"Role": "Intern"}],
        });
        let matched = candidate_match(1, &retrieved(Some(summary)));
        assert_eq!(matched.candidate_name.as_deref(), Some("Linus"));
        assert_eq!(matched.experience, vec!["Maintainer", "Student"]);
        assert!(matched.skills.is_empty());
        assert_eq!(matched.profile_id, "cv-1");
    }

    fn stored(source_text: &str, summary: Option<Value>) -> ProfileRecord {
        ProfileRecord {
            vector: ProfileVector {
                profile_id: "cv-1".to_string(),
                owner_id: OwnerId::parse("owner").unwrap(),
                vector: vec![1.0, 0.0],
                source_text: source_text.to_string(),
            },
            summary,
            updated_at: 42,
        }
    }

    #[test]
    fn test_candidate_detail_projection() {
        let summary = json!({
            "Name": "Ada",
            "email": "ada@example.com",
            "Education": ["BSc", "MSc", "PhD", "Postdoc"],
        });
        let detail = candidate_detail(stored("Name: Ada | Skills: rust", Some(summary.clone())));
        assert_eq!(detail.candidate.profile_id, "cv-1");
        assert_eq!(detail.candidate.email.as_deref(), Some("ada@example.com"));
        assert_eq!(detail.candidate.education, vec!["BSc", "MSc", "PhD"]);
        assert_eq!(detail.candidate.updated_at, 42);
        assert_eq!(detail.text_preview, "Name: Ada | Skills: rust");
        assert_eq!(detail.summary, Some(summary));

        let detail = candidate_detail(stored(&"x".repeat(800), None));
        assert_eq!(detail.text_preview.chars().count(), TEXT_PREVIEW_LIMIT + 3);
        assert!(detail.text_preview.ends_with("..."));
        assert!(detail.candidate.candidate_name.is_none());
        assert!(detail.candidate.skills.is_empty());
    }
}
