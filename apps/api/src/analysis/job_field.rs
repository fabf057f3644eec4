//! Job field extraction — a coarse label used to specialize the prompt.

/// Known fields, in priority order. The first one found in the job
/// description wins, even when a later one also appears.
pub const KNOWN_JOB_FIELDS: [&str; 6] = [
    "Data Science",
    "Software Engineering",
    "Data Engineering",
    "Machine Learning",
    "DevOps",
    "Cloud Engineering",
];

/// Returned when no known field is mentioned.
pub const FALLBACK_JOB_FIELD: &str = "Technology";

/// Case-insensitive scan of `job_description` for a known field name.
pub fn extract_job_field(job_description: &str) -> &'static str {
    let haystack = job_description.to_lowercase();
    KNOWN_JOB_FIELDS
        .iter()
        .copied()
        .find(|field| haystack.contains(&field.to_lowercase()))
        .unwrap_or(FALLBACK_JOB_FIELD)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_first_listed_field_wins_over_later_match() {
        let jd = "We need someone strong in Data Science and Machine Learning.";
        assert_eq!(extract_job_field(jd), "Data Science");
    }

    #[test]
    fn test_list_order_beats_text_order() {
        // Machine Learning appears first in the text, Data Science first in the list.
        let jd = "Machine Learning platform team, Data Science background preferred";
        assert_eq!(extract_job_field(jd), "Data Science");
    }

    #[test]
    fn test_match_is_case_insensitive() {
        assert_eq!(extract_job_field("senior DEVOPS engineer"), "DevOps");
        assert_eq!(extract_job_field("cloud engineering lead"), "Cloud Engineering");
    }

    #[test]
    fn test_empty_text_falls_back() {
        assert_eq!(extract_job_field(""), FALLBACK_JOB_FIELD);
    }

    #[test]
    fn test_unmatched_text_falls_back() {
        assert_eq!(extract_job_field("Barista, morning shifts"), "Technology");
    }

    #[test]
    fn test_partial_name_does_not_match() {
        // "Data Engineer" is not "Data Engineering".
        assert_eq!(extract_job_field("Looking for a Data Engineer"), "Technology");
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let jd = "Software Engineering role with DevOps duties";
        let first = extract_job_field(jd);
        for _ in 0..10 {
            assert_eq!(extract_job_field(jd), first);
        }
        assert_eq!(first, "Software Engineering");
    }
}
