use spanish_tutor::models::{AccentRegion, ChatTurn, MistakeCategory, SessionMode};
use spanish_tutor::prompts::{
    accent_note, build_opening_prompt, build_session_summary_prompt, build_tutor_system_prompt, mode_instruction,
    week_theme, TutorPromptOptions,
};

#[test]
fn test_week_two_roleplay_spain_prompt() {
    let prompt = build_tutor_system_prompt(&TutorPromptOptions {
        week: 2,
        mode: SessionMode::Roleplay,
        accent: AccentRegion::Spain,
        learner_memory: None,
        last_mistakes: &[],
    });

    assert!(prompt.starts_with("You are a Spanish immersion tutor."));
    assert!(prompt.contains("Adapt your level to week 2: Roleplays, past/future basics, longer turns."));
    assert!(prompt.contains("Session mode: roleplay. Set a simple scenario"));
    assert!(prompt.contains("- Prefer vocabulary and expressions common in Spain (e.g. vosotros if natural)."));
    assert!(!prompt.contains("Learner context"));
    assert!(!prompt.contains("Recent mistake categories"));
    assert!(prompt.ends_with("(2–4 sentences unless doing a micro-lesson)."));
}

#[test]
fn test_memory_and_mistakes_are_appended() {
    let prompt = build_tutor_system_prompt(&TutorPromptOptions {
        week: 1,
        mode: SessionMode::FreeConversation,
        accent: AccentRegion::Neutral,
        learner_memory: Some("Knows greetings."),
        last_mistakes: &[MistakeCategory::SerEstar, MistakeCategory::Articles],
    });

    assert!(prompt.contains("\nLearner context (use to personalize):\nKnows greetings.\n"));
    assert!(prompt.contains("\nRecent mistake categories to watch for: ser_estar, articles.\n"));
    let memory_at = prompt.find("Learner context").unwrap();
    let mistakes_at = prompt.find("Recent mistake categories").unwrap();
    assert!(memory_at < mistakes_at);
}

#[test]
fn test_prompt_is_deterministic() {
    let options = TutorPromptOptions {
        week: 3,
        mode: SessionMode::SpeedRound,
        accent: AccentRegion::Colombia,
        learner_memory: Some("x"),
        last_mistakes: &[MistakeCategory::Other],
    };
    assert_eq!(build_tutor_system_prompt(&options), build_tutor_system_prompt(&options));
}

#[test]
fn test_every_mode_and_accent_has_text() {
    for mode in SessionMode::ALL {
        assert!(!mode_instruction(mode).is_empty());
    }
    for accent in [AccentRegion::Mexico, AccentRegion::Spain, AccentRegion::Colombia, AccentRegion::Neutral] {
        assert!(!accent_note(accent).is_empty());
    }
    assert_eq!(accent_note(AccentRegion::default()), "Use neutral Spanish.");
}

#[test]
fn test_week_themes() {
    assert_eq!(week_theme(1), "Survival speaking, present tense, high-frequency phrases");
    assert_eq!(week_theme(4), "Immersion, opinions/debates, polishing");
    assert_eq!(week_theme(0), week_theme(1));
    assert_eq!(week_theme(12), week_theme(1));
}

#[test]
fn test_summary_prompt_transcript_lines() {
    let prompt = build_session_summary_prompt(&[
        ChatTurn::assistant("¡Hola! Escribe Hola."),
        ChatTurn::user("Hola"),
    ]);

    assert!(prompt.contains("Transcript:\nassistant: ¡Hola! Escribe Hola.\nuser: Hola\n\n"));
    for key in ["\"takeaway\"", "\"phrases\"", "\"mistakes\"", "\"memory\""] {
        assert!(prompt.contains(key), "missing {key}");
    }
    assert!(prompt.ends_with("Output only the JSON object."));
}

#[test]
fn test_opening_prompts() {
    let first = build_opening_prompt(1);
    assert!(first.contains("They may have zero Spanish."));
    assert!(first.contains("Be encouraging."));

    let later = build_opening_prompt(3);
    assert!(later.contains("(week 3)"));
    assert!(later.ends_with("Keep it to 2-3 sentences."));
}
