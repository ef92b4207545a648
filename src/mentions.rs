//! `@mention` handling in session notes
//!
//! Two independent passes over the note text:
//! - while typing: the text after the last `@` filters exercise names for
//!   autocomplete
//! - at finish: every `@word` claims the text up to the next `@` as a note
//!   for the exercise it names

use std::collections::BTreeMap;

use crate::exercises::Exercise;

/// Longer tails after `@` are treated as abandoned mentions
pub const MAX_MENTION_LEN: usize = 20;

/// Autocomplete shows at most this many exercises
pub const MAX_SUGGESTIONS: usize = 4;

/// The mention currently being typed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActiveMention {
    /// Byte offset of the `@`
    pub start: usize,
    /// Lowercased text typed after the `@`
    pub filter: String,
}

/// Find the mention being typed at the end of `text`, if any
pub fn active_mention(text: &str) -> Option<ActiveMention> {
    let start = text.rfind('@')?;
    let tail = &text[start + 1..];
    if tail.contains(' ') || tail.contains('\n') || tail.chars().count() > MAX_MENTION_LEN {
        return None;
    }
    Some(ActiveMention {
        start,
        filter: tail.to_lowercase(),
    })
}

/// Exercises matching the mention being typed, empty when there is none
pub fn suggest<'a>(
    text: &str,
    exercises: impl IntoIterator<Item = &'a Exercise>,
) -> Vec<&'a Exercise> {
    let Some(mention) = active_mention(text) else {
        return Vec::new();
    };
    exercises
        .into_iter()
        .filter(|e| e.name.to_lowercase().contains(&mention.filter))
        .take(MAX_SUGGESTIONS)
        .collect()
}

/// Replace the mention being typed with the chosen exercise
pub fn complete_mention(text: &str, exercise: &Exercise) -> String {
    let head = match text.rfind('@') {
        Some(start) => &text[..start],
        None => text,
    };
    format!("{}@{} ", head, exercise.mention_name())
}

/// Map exercise id -> note fragment for every resolvable `@mention`.
///
/// A fragment runs from the end of the mention word to the next `@` or the
/// end of the text. The word is compared case-insensitively against names
/// with whitespace removed: an exact match wins, otherwise the first name
/// containing the word. Unmatched mentions and empty fragments are dropped;
/// repeated mentions of one exercise are joined with a space.
pub fn resolve_exercise_notes<'a>(
    text: &str,
    exercises: impl IntoIterator<Item = &'a Exercise>,
) -> BTreeMap<String, String> {
    let names: Vec<(String, &Exercise)> = exercises
        .into_iter()
        .map(|e| (e.mention_name().to_lowercase(), e))
        .collect();

    let mut notes: BTreeMap<String, String> = BTreeMap::new();

    for segment in text.split('@').skip(1) {
        let word_end = segment
            .find(char::is_whitespace)
            .unwrap_or(segment.len());
        let word = segment[..word_end].to_lowercase();
        if word.is_empty() {
            continue;
        }

        let matched = names
            .iter()
            .find(|(name, _)| *name == word)
            .or_else(|| names.iter().find(|(name, _)| name.contains(&word)));
        let Some((_, exercise)) = matched else {
            continue;
        };

        let fragment = segment[word_end..].trim();
        if fragment.is_empty() {
            continue;
        }

        notes
            .entry(exercise.id.clone())
            .and_modify(|existing| {
                existing.push(' ');
                existing.push_str(fragment);
            })
            .or_insert_with(|| fragment.to_string());
    }

    notes
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exercises::Category;

    fn create_exercises() -> Vec<Exercise> {
        vec![
            Exercise::new("bench", "Bench Press", "3x8", Category::Main),
            Exercise::new("squat", "Squat", "3x5", Category::Main),
            Exercise::new("goblet", "Goblet Squat", "3x10", Category::Main),
            Exercise::new("pushups", "Push-ups", "3x12", Category::Main),
            Exercise::new("plank", "Plank", "3x45 sec", Category::Main),
        ]
    }

    #[test]
    fn test_no_at_no_suggestions() {
        let exercises = create_exercises();
        assert!(active_mention("felt good").is_none());
        assert!(suggest("felt good", &exercises).is_empty());
    }

    #[test]
    fn test_empty_filter_first_four() {
        let exercises = create_exercises();
        let names: Vec<_> = suggest("note @", &exercises)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(names, vec!["bench", "squat", "goblet", "pushups"]);
    }

    #[test]
    fn test_filter_case_insensitive_substring() {
        let exercises = create_exercises();
        let names: Vec<_> = suggest("@SQU", &exercises)
            .iter()
            .map(|e| e.id.as_str())
            .collect();
        assert_eq!(names, vec!["squat", "goblet"]);
    }

    #[test]
    fn test_space_or_newline_abandons_mention() {
        let exercises = create_exercises();
        assert!(suggest("@Bench ", &exercises).is_empty());
        assert!(suggest("@Bench\n", &exercises).is_empty());
    }

    #[test]
    fn test_long_tail_abandons_mention() {
        let tail = "a".repeat(MAX_MENTION_LEN);
        assert!(active_mention(&format!("@{tail}")).is_some());
        assert!(active_mention(&format!("@{tail}a")).is_none());
    }

    #[test]
    fn test_only_last_at_counts() {
        let mention = active_mention("@Squat heavy, @pl").unwrap();
        assert_eq!(mention.start, 14);
        assert_eq!(mention.filter, "pl");
    }

    #[test]
    fn test_complete_mention() {
        let bench = &create_exercises()[0];
        let text = complete_mention("felt strong @ben", bench);
        assert_eq!(text, "felt strong @BenchPress ");
        assert!(active_mention(&text).is_none());
    }

    #[test]
    fn test_resolve_mixed_note() {
        let exercises = vec![
            Exercise::new("b", "Bench Press", "3x8", Category::Main),
            Exercise::new("s", "Squat", "3x5", Category::Main),
        ];
        let notes = resolve_exercise_notes("felt good after @Bench todo more @Squat heavy", &exercises);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes["b"], "todo more");
        assert_eq!(notes["s"], "heavy");
    }

    #[test]
    fn test_resolve_whitespace_stripped_name() {
        let exercises = create_exercises();
        let notes = resolve_exercise_notes("@benchpress slow negatives", &exercises);
        assert_eq!(notes["bench"], "slow negatives");
    }

    #[test]
    fn test_resolve_prefers_exact_match() {
        let exercises = create_exercises();
        let notes = resolve_exercise_notes("@GobletSquat easy @Squat hard", &exercises);
        assert_eq!(notes["goblet"], "easy");
        assert_eq!(notes["squat"], "hard");
    }

    #[test]
    fn test_resolve_drops_unmatched() {
        let exercises = create_exercises();
        let notes = resolve_exercise_notes("@Deadlift heavy @Plank shaky", &exercises);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes["plank"], "shaky");
    }

    #[test]
    fn test_resolve_punctuation_is_literal() {
        let exercises = create_exercises();
        let notes = resolve_exercise_notes("@push-ups clean @pushups sloppy", &exercises);
        // "pushups" is not a substring of "push-ups"
        assert_eq!(notes["pushups"], "clean");
        assert_eq!(notes.len(), 1);
    }

    #[test]
    fn test_resolve_repeated_mentions_join() {
        let exercises = create_exercises();
        let notes = resolve_exercise_notes("@Squat depth ok @Squat knees in", &exercises);
        assert_eq!(notes["squat"], "depth ok knees in");
    }

    #[test]
    fn test_resolve_empty_fragment_dropped() {
        let exercises = create_exercises();
        assert!(resolve_exercise_notes("@Squat", &exercises).is_empty());
        assert!(resolve_exercise_notes("@ nothing", &exercises).is_empty());
    }
}
