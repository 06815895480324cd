use std::sync::LazyLock;

use regex::{Captures, Regex, RegexBuilder};

use super::Segment;

const PROFANITY: &[&str] = &[
    "fuck", "fucked", "fucking", "fucker", "fucks", "fuckin", "motherfucker", "motherfuckers",
    "shit", "shitty", "shitting", "shits", "bullshit", "damn", "damned", "dammit", "damnit",
    "goddamn", "bitch", "bitches", "bitchy", "ass", "asses", "asshole", "dumbass", "jackass",
    "bastard", "bastards", "crap", "crappy", "piss", "pissed", "pissing", "dick", "dicks",
    "dickhead", "douche", "fck", "fuk", "fvck", "sh1t", "b1tch", "btch",
];

static PROFANITY_PATTERN: LazyLock<Option<Regex>> = LazyLock::new(|| {
    let alternation = PROFANITY
        .iter()
        .map(|word| regex::escape(word))
        .collect::<Vec<_>>()
        .join("|");
    RegexBuilder::new(&format!(r"\b(?:{alternation})\b"))
        .case_insensitive(true)
        .build()
        .map_err(|err| tracing::warn!(%err, "profanity pattern failed to compile"))
        .ok()
});

/// Masks profanity, keeping the first letter of each word (`damn` -> `d***`).
pub fn censor_text(text: &str) -> String {
    let Some(pattern) = PROFANITY_PATTERN.as_ref() else {
        return text.to_string();
    };

    pattern
        .replace_all(text, |caps: &Captures<'_>| {
            let word = &caps[0];
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => {
                    let mut masked = String::with_capacity(word.len());
                    masked.push(first);
                    masked.extend(chars.map(|_| '*'));
                    masked
                }
                None => String::new(),
            }
        })
        .into_owned()
}

pub fn censor_segments(segments: &[Segment]) -> Vec<Segment> {
    segments
        .iter()
        .map(|segment| Segment {
            text: censor_text(&segment.text),
            ..segment.clone()
        })
        .collect()
}
