use crate::parser::{QUESTION_MARKER, Section};

pub const SYSTEM_MESSAGE: &str = "You are an academic assistant.";

const UNSPECIFIED: &str = "Unspecified";

/// Inputs of the main question-generation prompt
#[derive(Debug, Clone, Default)]
pub struct PromptParams<'a> {
    pub topics: &'a str,
    pub special_requests: &'a str,
    pub grade_level: Option<&'a str>,
    pub timeline: Option<&'a str>,
    pub source_text: Option<&'a str>,
}

pub fn build_generation_prompt(params: &PromptParams<'_>) -> String {
    let grade_level = params.grade_level.unwrap_or(UNSPECIFIED);
    let timeline = params.timeline.unwrap_or(UNSPECIFIED);

    let mut prompt = format!(
        "You are an advanced academic question generator. Research the topic(s): '{}'. \
         Special requests: {}. \
         Generate a set of questions for the grade level: {}. \
         The complexity, vocabulary, and depth should match this grade level. \
         Time allowed for the paper: {}. ",
        params.topics, params.special_requests, grade_level, timeline
    );

    if let Some(source) = params.source_text {
        prompt.push_str(&format!(
            "\n\nThe following file or image content should be used as the main source material \
             for generating questions. Use its facts, structure, and details wherever possible.\n\
             ---\n{}\n---\n",
            source
        ));
    }

    prompt.push_str(
        "Use Bloom's taxonomy (remember, understand, apply, analyze, evaluate, create), \
         real-world scenarios, and higher-order thinking. Include: ",
    );
    prompt.push_str(&format!(
        "{} Multiple Choice Questions (MCQ) with 4 plausible options (A-D), only one correct, \
         and 3 strong distractors. Each MCQ should require analysis, synthesis, or evaluation, \
         not just recall. Mark the correct answer. ",
        Section::MultipleChoice.requested_count()
    ));
    prompt.push_str(&format!(
        "{} Very Short Answer Questions (1-2 sentences) that require precise, critical responses, \
         not just definitions. ",
        Section::VeryShortAnswer.requested_count()
    ));
    prompt.push_str(&format!(
        "{} Short Answer Questions (2-4 sentences) that require explanation, comparison, or application. ",
        Section::ShortAnswer.requested_count()
    ));
    prompt.push_str(&format!(
        "{} Long Answer/Essay Questions (1+ paragraphs) that require argumentation, critical \
         analysis, or creative synthesis. ",
        Section::LongAnswer.requested_count()
    ));

    let headers = Section::ALL
        .iter()
        .map(|section| format!("'{}'", section.header()))
        .collect::<Vec<_>>()
        .join(", ");
    prompt.push_str(&format!(
        "Format the output as sections: {}, each header on its own line. ",
        headers
    ));
    prompt.push_str(&format!(
        "For MCQ, use: '{marker}...', then options A-D, then 'Answer: ...'. For others, use '{marker}...'. ",
        marker = QUESTION_MARKER
    ));
    prompt.push_str("Number all questions. Use real-world or novel scenarios where possible. ");
    prompt.push_str(&format!(
        "At the top of the paper, display: 'Time Allowed: {}'. ",
        timeline
    ));

    prompt
}

/// Asks the model to pull topics and special requests out of uploaded source text
pub fn build_extraction_prompt(source_text: &str) -> String {
    format!(
        "You are an expert academic assistant. Given the following file content, extract the main \
         topic or topics (as a comma-separated list) and any special requests or instructions for \
         question generation (such as 'focus on applications', 'include diagrams', etc). \
         If no special requests are found, return 'None'.\n\
         ---\n{}\n---\n\
         Respond in JSON as: {{\"topics\": [list of topics], \"special_requests\": [list of special requests or []]}}",
        source_text
    )
}

pub fn build_regenerate_prompt(paper_title: &str, current_text: &str, extra_prompt: Option<&str>) -> String {
    let mut prompt = format!(
        "You are revising one question of an exam paper titled '{}'.\n\
         Current question:\n---\n{}\n---\n\
         Write a single replacement question that tests the same topic at the same difficulty \
         but is worded differently.",
        paper_title, current_text
    );

    if let Some(extra) = extra_prompt.map(str::trim).filter(|e| !e.is_empty()) {
        prompt.push_str(&format!(" Additional instructions: {}.", extra));
    }

    prompt.push_str(&format!(
        " Start the question with '{}'. If it is a multiple choice question, keep four options \
         labelled A-D followed by 'Answer: ...'. Respond with the question only.",
        QUESTION_MARKER
    ));
    prompt
}

pub fn build_additional_question_prompt(paper_title: &str, existing_questions: &[String]) -> String {
    let listing = if existing_questions.is_empty() {
        "(no questions yet)".to_string()
    } else {
        existing_questions.join("\n")
    };

    format!(
        "The exam paper titled '{}' contains these questions:\n---\n{}\n---\n\
         Write one new question for this paper that does not repeat any of them and matches \
         their style and level. Start the question with '{}'. Respond with the question only.",
        paper_title, listing, QUESTION_MARKER
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generation_prompt_requests_full_rubric() {
        let prompt = build_generation_prompt(&PromptParams {
            topics: "Cell Biology",
            special_requests: "",
            grade_level: Some("10"),
            timeline: Some("45 min"),
            source_text: None,
        });

        assert!(prompt.contains("Research the topic(s): 'Cell Biology'"));
        assert!(prompt.contains("grade level: 10"));
        assert!(prompt.contains("10 Multiple Choice Questions"));
        assert!(prompt.contains("10 Very Short Answer Questions"));
        assert!(prompt.contains("10 Short Answer Questions"));
        assert!(prompt.contains("7 Long Answer/Essay Questions"));
        assert!(prompt.contains("'Multiple Choice', 'Very Short Answer', 'Short Answer', 'Long Answer'"));
        assert!(prompt.contains("'Q: ...'"));
        assert!(prompt.contains("Time Allowed: 45 min"));
        assert!(!prompt.contains("---"));
    }

    #[test]
    fn test_generation_prompt_defaults_unspecified() {
        let prompt = build_generation_prompt(&PromptParams {
            topics: "Untitled Paper",
            ..Default::default()
        });

        assert!(prompt.contains("grade level: Unspecified"));
        assert!(prompt.contains("Time allowed for the paper: Unspecified"));
        assert!(prompt.contains("Time Allowed: Unspecified"));
    }

    #[test]
    fn test_generation_prompt_embeds_source_text() {
        let prompt = build_generation_prompt(&PromptParams {
            topics: "Volcanoes",
            special_requests: "include diagrams",
            source_text: Some("Magma rises through the crust."),
            ..Default::default()
        });

        assert!(prompt.contains("Special requests: include diagrams."));
        assert!(prompt.contains("---\nMagma rises through the crust.\n---\n"));
    }

    #[test]
    fn test_extraction_prompt_asks_for_json() {
        let prompt = build_extraction_prompt("Chapter 4: Thermodynamics");
        assert!(prompt.contains("---\nChapter 4: Thermodynamics\n---\n"));
        assert!(prompt.contains("{\"topics\": [list of topics]"));
    }

    #[test]
    fn test_regenerate_prompt_includes_extra_instructions() {
        let prompt = build_regenerate_prompt("Algebra", "Q: Solve x + 1 = 2", Some("make it harder"));
        assert!(prompt.contains("titled 'Algebra'"));
        assert!(prompt.contains("Q: Solve x + 1 = 2"));
        assert!(prompt.contains("Additional instructions: make it harder."));

        let prompt = build_regenerate_prompt("Algebra", "Q: Solve x + 1 = 2", Some("   "));
        assert!(!prompt.contains("Additional instructions"));
    }

    #[test]
    fn test_additional_question_prompt_lists_existing() {
        let existing = vec!["Q: First".to_string(), "Q: Second".to_string()];
        let prompt = build_additional_question_prompt("History", &existing);
        assert!(prompt.contains("Q: First\nQ: Second"));

        let prompt = build_additional_question_prompt("History", &[]);
        assert!(prompt.contains("(no questions yet)"));
    }
}
