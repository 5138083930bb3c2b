//! crates/storywriter_core/src/composer.rs
//!
//! Offline fallback composer. Fills a fixed template from the story options so
//! that a draft can still be shown when the generation backend is unreachable.
//! The output is a pure function of the options.

use crate::domain::StoryOptions;

const CONFLICT_SEEDS: [&str; 4] = [
    "a promise made years ago starts to break",
    "a map rewrites itself whenever moonlight appears",
    "an ally withholds the one truth that matters",
    "the city clock begins to run backward",
];

/// Sums the character codes of `input` and picks `values[sum % len]`.
///
/// Each character contributes its first UTF-16 code unit, so characters
/// outside the BMP count as their high surrogate. Anagrams of the seed collide.
fn pick_by_hash<'a>(input: &str, values: &[&'a str]) -> &'a str {
    let hash = input.chars().fold(0u64, |acc, ch| {
        let mut units = [0u16; 2];
        acc.wrapping_add(u64::from(ch.encode_utf16(&mut units)[0]))
    });
    values[(hash % values.len() as u64) as usize]
}

/// Composes a placeholder story for the given options.
pub fn compose_story(options: &StoryOptions) -> String {
    let paragraphs = options.length.paragraph_count();
    let seed = format!(
        "{}|{}|{}|{}",
        options.title, options.premise, options.genre, options.tone
    );
    let conflict = pick_by_hash(&seed, &CONFLICT_SEEDS);

    let opening = format!(
        "{} was spoken about in whispers across the {} lanes of the old quarter. {} Everyone believed the mystery was harmless, until {}.",
        options.title,
        options.genre.to_lowercase(),
        options.premise,
        conflict
    );

    let dialogue = if options.include_dialogue {
        "\"If the lanterns go dark tonight, we lose more than light,\" the mentor warned, but the protagonist stepped forward anyway."
    } else {
        "No one spoke aloud, yet the silence was clearer than any warning bell."
    };

    let twist = if options.include_twist {
        "Then came the twist: the messages were not from the past but from futures that would vanish if ignored."
    } else {
        "Instead of a dramatic reversal, the story leaned into slow realization and emotional payoff."
    };

    let body = [
        format!(
            "The narration moved in a {} rhythm, and every decision carried weight for {} readers.",
            options.tone.to_lowercase(),
            options.audience.to_lowercase()
        ),
        dialogue.to_string(),
        format!(
            "Told through {}, each scene revealed how fear and courage can share the same heartbeat.",
            options.point_of_view.to_lowercase()
        ),
        twist.to_string(),
        "By dawn, the protagonist lit the final lantern and learned that hope is not found\u{2014}it is built, choice by choice."
            .to_string(),
        "The city changed quietly afterward: fewer secrets, kinder streets, and one keeper who now taught others to read the light."
            .to_string(),
    ];

    std::iter::once(opening)
        .chain(body)
        .take(paragraphs)
        .collect::<Vec<_>>()
        .join("\n\n")
}
