//! Fixed question set substituted when remote generation fails.
//!
//! The requirements slot is filled with the paper title when the caller gave
//! no requirements.

/// Number of questions in the fallback set
pub const FALLBACK_SET_SIZE: usize = 8;

/// Deterministic question set used when remote generation fails.
///
/// `requirements` falls back to the title when the caller supplied none.
pub fn fallback_questions(title: &str, requirements: Option<&str>) -> Vec<String> {
    let requirements = requirements
        .map(str::trim)
        .filter(|r| !r.is_empty())
        .unwrap_or(title);

    vec![
        format!("Q: What is the main idea of {}?", title),
        format!("Q: Explain the significance of {}.", requirements),
        "Q: List three key points discussed.".to_string(),
        "Q: How does this topic relate to current events?".to_string(),
        "Q: What are possible future developments?".to_string(),
        format!(
            "Q: Which of the following best describes {}?\nA) Option 1\nB) Option 2\nC) Option 3\nD) Option 4\nAnswer: A",
            title
        ),
        format!("Q: What is a real-world application of {}?", title),
        format!("Q: Write a very short answer about {}.", title),
    ]
}
