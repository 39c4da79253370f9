//! Practice-mode suggestion from program week and recent history

use crate::models::SessionMode;

/// How many recent sessions the suggestion looks at
pub const RECENT_MODES_WINDOW: usize = 5;

/// Suggest a mode for the next session.
///
/// `recent` holds the modes of the learner's last sessions as stored strings;
/// unrecognized entries simply never match.
#[must_use]
pub fn suggested_mode<S: AsRef<str>>(week: u32, recent: &[S]) -> SessionMode {
    let count = |mode: SessionMode| recent.iter().filter(|m| m.as_ref() == mode.as_str()).count();

    match week {
        1 => SessionMode::FreeConversation,
        2 => SessionMode::Roleplay,
        3 if count(SessionMode::SpeedRound) < 2 => SessionMode::SpeedRound,
        4 if count(SessionMode::Debate) < 1 => SessionMode::Debate,
        _ => SessionMode::FreeConversation,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_week_three_rotates_after_two_speed_rounds() {
        assert_eq!(suggested_mode(3, &["speed_round"]), SessionMode::SpeedRound);
        assert_eq!(suggested_mode(3, &["speed_round", "speed_round"]), SessionMode::FreeConversation);
    }

    #[test]
    fn test_week_four_debate_once() {
        let empty: [&str; 0] = [];
        assert_eq!(suggested_mode(4, &empty), SessionMode::Debate);
        assert_eq!(suggested_mode(4, &["debate"]), SessionMode::FreeConversation);
    }

    #[test]
    fn test_unknown_entries_are_ignored() {
        assert_eq!(suggested_mode(4, &["x", "debatex"]), SessionMode::Debate);
    }

    fn mode_name() -> impl Strategy<Value = String> {
        prop_oneof![
            Just("free_conversation".to_string()),
            Just("roleplay".to_string()),
            Just("storytelling".to_string()),
            Just("speed_round".to_string()),
            Just("debate".to_string()),
            "[a-z_]{0,12}",
        ]
    }

    proptest! {
        #[test]
        fn prop_early_weeks_ignore_history(recent in prop::collection::vec(mode_name(), 0..5)) {
            prop_assert_eq!(suggested_mode(1, &recent), SessionMode::FreeConversation);
            prop_assert_eq!(suggested_mode(2, &recent), SessionMode::Roleplay);
        }

        #[test]
        fn prop_out_of_range_weeks_are_free(week in 5u32.., recent in prop::collection::vec(mode_name(), 0..5)) {
            prop_assert_eq!(suggested_mode(week, &recent), SessionMode::FreeConversation);
            prop_assert_eq!(suggested_mode(0, &recent), SessionMode::FreeConversation);
        }

        #[test]
        fn prop_week_three_is_speed_or_free(recent in prop::collection::vec(mode_name(), 0..5)) {
            let speed = recent.iter().filter(|m| m.as_str() == "speed_round").count();
            let expected = if speed < 2 { SessionMode::SpeedRound } else { SessionMode::FreeConversation };
            prop_assert_eq!(suggested_mode(3, &recent), expected);
        }
    }
}
