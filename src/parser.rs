use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeMap;

/// Total number of questions requested from the model (10 + 10 + 10 + 7)
pub const MAX_QUESTIONS: usize = 37;

pub const QUESTION_MARKER: &str = "Q: ";

/// Header lines partitioning a completion, matched case-insensitively
static SECTION_HEADER: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?im)^[ \t]*(multiple choice|very short answer|short answer|long answer)[ \t]*:?[ \t]*\r?$",
    )
    .expect("section header pattern is valid")
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    MultipleChoice,
    VeryShortAnswer,
    ShortAnswer,
    LongAnswer,
}

impl Section {
    pub const ALL: [Section; 4] = [
        Section::MultipleChoice,
        Section::VeryShortAnswer,
        Section::ShortAnswer,
        Section::LongAnswer,
    ];

    pub fn header(&self) -> &'static str {
        match self {
            Section::MultipleChoice => "Multiple Choice",
            Section::VeryShortAnswer => "Very Short Answer",
            Section::ShortAnswer => "Short Answer",
            Section::LongAnswer => "Long Answer",
        }
    }

    /// Number of questions of this type the prompt asks for
    pub fn requested_count(&self) -> usize {
        match self {
            Section::LongAnswer => 7,
            _ => 10,
        }
    }

    pub fn from_header(text: &str) -> Option<Section> {
        let text = text.trim();
        Section::ALL
            .into_iter()
            .find(|section| section.header().eq_ignore_ascii_case(text))
    }
}

/// Questions extracted from one completion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParsedCompletion {
    /// Flat list in encounter order, capped at [`MAX_QUESTIONS`]
    pub questions: Vec<String>,
    /// Entries found under each header, before the cap
    pub sections: BTreeMap<Section, Vec<String>>,
    /// Set when no header produced an entry and the plain marker split was used
    pub used_marker_split: bool,
}

impl ParsedCompletion {
    pub fn is_empty(&self) -> bool {
        self.questions.is_empty()
    }

    pub fn section_count(&self, section: Section) -> usize {
        self.sections.get(&section).map_or(0, Vec::len)
    }
}

/// Converts raw completion text into an ordered list of question entries.
///
/// Entries are collected section by section; when that yields nothing the
/// whole text is split on `"\nQ: "` instead. The result never exceeds
/// [`MAX_QUESTIONS`] and is never padded.
pub fn parse_completion(text: &str) -> ParsedCompletion {
    let mut parsed = parse_sections(text);

    if parsed.questions.is_empty() {
        parsed.questions = split_on_marker(text);
        parsed.used_marker_split = !parsed.questions.is_empty();
    }

    parsed.questions.truncate(MAX_QUESTIONS);
    parsed
}

fn parse_sections(text: &str) -> ParsedCompletion {
    let mut parsed = ParsedCompletion::default();
    let mut current: Option<Section> = None;
    let mut cursor = 0;

    for captures in SECTION_HEADER.captures_iter(text) {
        let (Some(whole), Some(name)) = (captures.get(0), captures.get(1)) else {
            continue;
        };

        if let Some(section) = current {
            collect_entries(&text[cursor..whole.start()], section, &mut parsed);
        }

        current = Section::from_header(name.as_str());
        cursor = whole.end();
    }

    if let Some(section) = current {
        collect_entries(&text[cursor..], section, &mut parsed);
    }

    parsed
}

fn collect_entries(body: &str, section: Section, parsed: &mut ParsedCompletion) {
    let body = body.trim();
    if body.is_empty() {
        return;
    }

    for entry in split_entries(body) {
        parsed.sections.entry(section).or_default().push(entry.clone());
        parsed.questions.push(entry);
    }
}

/// Splits a section body before every line that starts with the marker
fn split_entries(body: &str) -> Vec<String> {
    let separator = format!("\n{}", QUESTION_MARKER);
    let mut entries = Vec::new();

    for (index, chunk) in body.split(separator.as_str()).enumerate() {
        let entry = if index == 0 {
            chunk.trim().to_string()
        } else {
            format!("{}{}", QUESTION_MARKER, chunk).trim().to_string()
        };

        if !entry.is_empty() {
            entries.push(entry);
        }
    }

    entries
}

fn split_on_marker(text: &str) -> Vec<String> {
    let separator = format!("\n{}", QUESTION_MARKER);

    text.split(separator.as_str())
        .map(str::trim)
        .filter(|chunk| !chunk.is_empty())
        .map(ensure_marker)
        .collect()
}

/// Prefixes the question marker when the text does not already start with it
pub fn ensure_marker(text: &str) -> String {
    let text = text.trim();
    if text.starts_with(QUESTION_MARKER) {
        text.to_string()
    } else {
        format!("{}{}", QUESTION_MARKER, text)
    }
}
