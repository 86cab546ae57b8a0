//! ============================================================================
//! Prompt Module - Bounded prompt assembly from profiles and context
//! ============================================================================
//! ```text
//! [rendered context] + preamble + query + CANDIDATE blocks + closing
//! ```
//! List fields are capped per block (3 education, 4 experience, 15 skills)
//! to keep prompt size bounded.
//! ============================================================================

mod composer;
mod profile;

pub use composer::compose;
pub use profile::{
    candidate_detail, candidate_match, candidate_name, candidate_summary, education_entries,
    email, experience_entries, format_profile_block, languages, skills, RetrievedProfile,
    EDUCATION_LIMIT, EXPERIENCE_LIMIT, LANGUAGES_LIMIT, SKILLS_LIMIT, TEXT_PREVIEW_LIMIT,
};
pub(crate) use profile::field;
