//! Prompt construction
//!
//! Pure string builders for the three model calls the service makes: the
//! opening greeting, a tutoring turn and the end-of-session summary.

use std::fmt::Write as _;

use crate::models::{AccentRegion, ChatTurn, MistakeCategory, SessionMode};

/// User turn sent alongside the opening prompt
pub const OPENING_TRIGGER: &str = "Send your opening message now.";

/// Greeting used when the provider answers the opening call with nothing
pub const OPENING_FALLBACK: &str = "¡Hola! Type **Hola** in the box below to say hello.";

/// Reply used when the provider answers a turn with nothing
pub const TURN_FALLBACK: &str = "No response.";

/// Inputs for the tutor system prompt
#[derive(Debug, Clone, Default)]
pub struct TutorPromptOptions<'a> {
    pub week: u32,
    pub mode: SessionMode,
    pub accent: AccentRegion,
    pub learner_memory: Option<&'a str>,
    /// Newest first
    pub last_mistakes: &'a [MistakeCategory],
}

/// Theme for a program week; weeks outside 1-4 get the week-1 theme
#[must_use]
pub const fn week_theme(week: u32) -> &'static str {
    match week {
        2 => "Roleplays, past/future basics, longer turns",
        3 => "Natural conversation, listening, speed, optional slang",
        4 => "Immersion, opinions/debates, polishing",
        _ => "Survival speaking, present tense, high-frequency phrases",
    }
}

#[must_use]
pub const fn mode_instruction(mode: SessionMode) -> &'static str {
    match mode {
        SessionMode::FreeConversation => {
            "Have a natural back-and-forth. Ask follow-up questions. Keep turns short so the learner can respond."
        },
        SessionMode::Roleplay => {
            "Set a simple scenario (e.g. ordering food, asking directions). Stay in character. Gently correct and encourage."
        },
        SessionMode::Storytelling => {
            "Ask the learner to tell a short story (their day, a memory). Ask clarifying questions. Correct key errors."
        },
        SessionMode::SpeedRound => {
            "Keep exchanges very short. Quick questions, quick answers. Gently note errors without long explanations."
        },
        SessionMode::Debate => {
            "Introduce a simple opinion topic. Ask for their view, then a counter. Keep it light; correct form."
        },
    }
}

#[must_use]
pub const fn accent_note(accent: AccentRegion) -> &'static str {
    match accent {
        AccentRegion::Mexico => "Prefer vocabulary and expressions common in Mexico.",
        AccentRegion::Spain => "Prefer vocabulary and expressions common in Spain (e.g. vosotros if natural).",
        AccentRegion::Colombia => "Prefer vocabulary and expressions common in Colombia.",
        AccentRegion::Neutral => "Use neutral Spanish.",
    }
}

/// System prompt for a tutoring turn
#[must_use]
pub fn build_tutor_system_prompt(options: &TutorPromptOptions<'_>) -> String {
    let mut prompt = format!(
        "You are a Spanish immersion tutor. Your goal is to help the learner reach conversational fluency in 4 weeks.

RULES:
- Speak primarily in Spanish. In week 1 only, you may use a very short English explanation if the learner is clearly stuck (one short phrase max).
- Adapt your level to week {week}: {theme}.
- Encourage the learner to produce output: ask follow-up questions, ask them to re-say a corrected sentence.
- Keep corrections brief. Format: give the correct version, then one short \"Why\" (in Spanish), then \"Try again\" or \"Repite, por favor.\"
- No long grammar lectures. Micro-lessons: 2–5 sentences max when you explain something.
- Session mode: {mode}. {mode_instruction}
- {accent_note}
",
        week = options.week,
        theme = week_theme(options.week),
        mode = options.mode.as_str(),
        mode_instruction = mode_instruction(options.mode),
        accent_note = accent_note(options.accent),
    );

    if let Some(memory) = options.learner_memory.filter(|memory| !memory.trim().is_empty()) {
        let _ = write!(prompt, "\nLearner context (use to personalize):\n{memory}\n");
    }

    if !options.last_mistakes.is_empty() {
        let joined = options
            .last_mistakes
            .iter()
            .map(MistakeCategory::as_str)
            .collect::<Vec<_>>()
            .join(", ");
        let _ = write!(prompt, "\nRecent mistake categories to watch for: {joined}.\n");
    }

    prompt.push_str(
        "\nReply in Spanish only (except rare week-1 English). Keep your reply concise (2–4 sentences unless doing a micro-lesson).",
    );
    prompt
}

/// Prompt asking the model to distill a transcript into a JSON object
#[must_use]
pub fn build_session_summary_prompt(messages: &[ChatTurn]) -> String {
    let transcript = messages
        .iter()
        .map(|message| format!("{}: {}", message.role, message.content))
        .collect::<Vec<_>>()
        .join("\n");

    let categories = MistakeCategory::ALL.map(|category| category.as_str()).join(", ");

    format!(
        "You are summarizing a Spanish practice session. Extract the following in JSON format only, no other text.

Transcript:
{transcript}

Return a single JSON object with these keys:
- \"takeaway\": One short sentence (in English) the learner should remember (e.g. one correction or one tip).
- \"phrases\": Array of up to 5 objects with \"es\" (Spanish phrase) and \"en\" (English, optional). Key phrases learned or practiced.
- \"mistakes\": Array of objects with \"category\" (one of: {categories}), \"before\" (learner's incorrect text), \"after\" (corrected version). Only include clear corrections from the session.
- \"memory\": A compact 2–4 sentence summary of what the learner worked on and their level, for future sessions.

Output only the JSON object."
    )
}

/// System prompt for the tutor's first message of a session
#[must_use]
pub fn build_opening_prompt(week: u32) -> String {
    if week == 1 {
        "The learner has just started their first practice session. They may have zero Spanish. \
         Your job: greet them warmly in Spanish, then tell them exactly what to type to begin. \
         Give ONE simple phrase, e.g. \"Hola\" or \"¿Cómo estás?\" and say they can type it in the box. \
         You may add the meaning in English in parentheses. Keep your message to 2-3 short sentences. Be encouraging."
            .to_string()
    } else {
        format!(
            "The learner has just started a practice session (week {week}). Greet them in Spanish and give one \
             short prompt or question they can respond to (e.g. a simple question or a phrase to repeat). \
             Keep it to 2-3 sentences."
        )
    }
}
