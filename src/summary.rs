//! Session summary parsing
//!
//! Models are asked for a bare JSON object but often wrap it in prose or code
//! fences. The first `{` through the last `}` is taken as the object, and every
//! field is validated on the way in.

use chrono::{Days, NaiveDate};
use regex::Regex;
use serde_json::Value;

use crate::error::{Result, TutorError};
use crate::models::{MistakeCategory, NewMistakeEvent, NewVocabItem};

/// Takeaway used when the model gives none or summarization fails
pub const DEFAULT_TAKEAWAY: &str = "Great session! Review your phrases in Progress.";

/// Context recorded on vocab rows created from a summary
pub const VOCAB_CONTEXT: &str = "Session";

/// Most phrases kept from one summary
pub const MAX_PHRASES: usize = 5;

const JSON_OBJECT_PATTERN: &str = r"(?s)\{.*\}";

/// A phrase worth reviewing later
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Phrase {
    pub es: String,
    pub en: Option<String>,
}

/// A learner correction
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Correction {
    pub category: MistakeCategory,
    pub before: String,
    pub after: String,
}

/// Validated summary of one session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionExtraction {
    pub takeaway: String,
    pub phrases: Vec<Phrase>,
    pub mistakes: Vec<Correction>,
    pub memory: Option<String>,
}

impl Default for SessionExtraction {
    fn default() -> Self {
        Self {
            takeaway: DEFAULT_TAKEAWAY.to_string(),
            phrases: Vec::new(),
            mistakes: Vec::new(),
            memory: None,
        }
    }
}

impl SessionExtraction {
    /// Text stored on the session row
    #[must_use]
    pub fn summary_text(&self) -> String {
        match &self.memory {
            Some(memory) => format!("{} | Memory: {}", self.takeaway, memory),
            None => self.takeaway.clone(),
        }
    }

    /// Mistake rows for the session
    #[must_use]
    pub fn mistake_events(&self, user_id: &str, session_id: &str) -> Vec<NewMistakeEvent> {
        self.mistakes
            .iter()
            .map(|mistake| NewMistakeEvent {
                user_id: user_id.to_string(),
                session_id: session_id.to_string(),
                category: mistake.category,
                example_before: mistake.before.clone(),
                example_after: mistake.after.clone(),
            })
            .collect()
    }

    /// Vocab rows, each first due the day after `today`
    #[must_use]
    pub fn vocab_items(&self, user_id: &str, today: NaiveDate) -> Vec<NewVocabItem> {
        let next_review_date = today.checked_add_days(Days::new(1)).unwrap_or(today);
        self.phrases
            .iter()
            .map(|phrase| NewVocabItem {
                user_id: user_id.to_string(),
                phrase_es: phrase.es.clone(),
                phrase_en: phrase.en.clone(),
                context: Some(VOCAB_CONTEXT.to_string()),
                next_review_date,
                interval_days: 1,
            })
            .collect()
    }
}

/// Greedy slice from the first `{` to the last `}`
pub fn extract_json_object(text: &str) -> Result<Option<&str>> {
    let object_regex = Regex::new(JSON_OBJECT_PATTERN)
        .map_err(|e| TutorError::Other(format!("Failed to compile JSON object regex: {e}")))?;
    Ok(object_regex.find(text).map(|found| found.as_str()))
}

/// Parse a model reply into a validated extraction
pub fn parse_session_summary(text: &str) -> Result<SessionExtraction> {
    let object = extract_json_object(text)?
        .ok_or_else(|| TutorError::InvalidInput("no JSON object in summary reply".to_string()))?;
    let value: Value = serde_json::from_str(object)?;
    let Value::Object(fields) = value else {
        return Err(TutorError::InvalidInput("summary reply is not a JSON object".to_string()));
    };

    let mut extraction = SessionExtraction::default();

    if let Some(takeaway) = non_blank(fields.get("takeaway")) {
        extraction.takeaway = takeaway;
    }

    extraction.phrases = array(fields.get("phrases"))
        .filter_map(|phrase| {
            let es = non_blank(phrase.get("es"))?;
            Some(Phrase { es, en: non_blank(phrase.get("en")) })
        })
        .take(MAX_PHRASES)
        .collect();

    extraction.mistakes = array(fields.get("mistakes"))
        .filter_map(|mistake| {
            let category = mistake.get("category").and_then(Value::as_str).and_then(MistakeCategory::parse)?;
            Some(Correction {
                category,
                before: non_blank(mistake.get("before"))?,
                after: non_blank(mistake.get("after"))?,
            })
        })
        .collect();

    extraction.memory = non_blank(fields.get("memory"));

    Ok(extraction)
}

fn array(value: Option<&Value>) -> impl Iterator<Item = &Value> {
    value.and_then(Value::as_array).into_iter().flatten()
}

fn non_blank(value: Option<&Value>) -> Option<String> {
    value
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(String::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_object_inside_prose_and_fences() {
        let reply = "Here you go:\n```json\n{\"takeaway\": \"Use estar for location.\", \"memory\": \"A0 learner\"}\n```";
        let extraction = parse_session_summary(reply).unwrap();
        assert_eq!(extraction.takeaway, "Use estar for location.");
        assert_eq!(extraction.summary_text(), "Use estar for location. | Memory: A0 learner");
    }

    #[test]
    fn test_invalid_mistakes_are_dropped() {
        let reply = r#"{"takeaway":"x","mistakes":[
            {"category":"spelling","before":"a","after":"b"},
            {"category":"ser_estar","before":"","after":"b"},
            {"category":"ser_estar","before":"Soy cansado","after":"Estoy cansado"}
        ]}"#;
        let extraction = parse_session_summary(reply).unwrap();
        assert_eq!(extraction.mistakes.len(), 1);
        assert_eq!(extraction.mistakes[0].category, MistakeCategory::SerEstar);
    }

    #[test]
    fn test_phrases_capped_and_blank_es_dropped() {
        let reply = r#"{"phrases":[{"es":""},{"es":"uno"},{"es":"dos","en":"two"},{"es":"tres"},{"es":"cuatro"},{"es":"cinco"},{"es":"seis"}]}"#;
        let extraction = parse_session_summary(reply).unwrap();
        assert_eq!(extraction.phrases.len(), MAX_PHRASES);
        assert_eq!(extraction.phrases[0].es, "uno");
        assert_eq!(extraction.phrases[1].en.as_deref(), Some("two"));
        assert_eq!(extraction.takeaway, DEFAULT_TAKEAWAY);
    }

    #[test]
    fn test_no_object_is_an_error() {
        assert!(parse_session_summary("I cannot summarize that.").is_err());
        assert!(parse_session_summary("{ not json }").is_err());
    }

    #[test]
    fn test_vocab_due_tomorrow() {
        let extraction = SessionExtraction {
            phrases: vec![Phrase { es: "Hola".into(), en: None }],
            ..SessionExtraction::default()
        };
        let today = NaiveDate::from_ymd_opt(2026, 3, 31).unwrap();
        let items = extraction.vocab_items("u1", today);
        assert_eq!(items[0].next_review_date, NaiveDate::from_ymd_opt(2026, 4, 1).unwrap());
        assert_eq!(items[0].interval_days, 1);
        assert_eq!(items[0].context.as_deref(), Some(VOCAB_CONTEXT));
    }
}
