//! User feedback injection.
//!
//! When an iteration carries feedback, it goes last in the prompt as a
//! mandatory directive so it outranks everything the stage asked for before.

/// Trimmed feedback, or `None` when there is nothing to inject.
pub fn normalize(feedback: Option<&str>) -> Option<&str> {
    feedback.map(str::trim).filter(|text| !text.is_empty())
}

/// Append the feedback directive to `prompt` when feedback is present.
pub fn inject(mut prompt: String, feedback: Option<&str>) -> String {
    if let Some(text) = normalize(feedback) {
        prompt.push_str("\n\n");
        prompt.push_str(&directive(text));
    }
    prompt
}

fn directive(feedback: &str) -> String {
    format!(
        "## MANDATORY USER FEEDBACK\n\
         The user reviewed the previous version and asked for the following:\n\
         \"\"\"\n{feedback}\n\"\"\"\n\
         This feedback overrides every earlier instruction. Restructure your entire \
         answer around it: change the substance, not just the wording, and do not merely \
         append a note. Every field of your response must reflect this direction."
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feedback_is_last_and_verbatim() {
        let prompt = inject("Analyze this.".to_string(), Some("focus on enterprise customers"));
        assert!(prompt.starts_with("Analyze this."));
        assert!(prompt.contains("focus on enterprise customers"));
        assert!(prompt.contains("MANDATORY"));
        assert!(prompt.contains("Restructure"));
        let directive_at = prompt.find("MANDATORY").unwrap();
        assert!(directive_at > prompt.find("Analyze this.").unwrap());
    }

    #[test]
    fn test_blank_feedback_is_ignored() {
        assert_eq!(inject("p".to_string(), Some("   ")), "p");
        assert_eq!(inject("p".to_string(), None), "p");
        assert_eq!(normalize(Some("  x ")), Some("x"));
    }
}
