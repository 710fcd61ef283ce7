use chrono::Local;

use crate::catalog::Viewpoint;

/// Header that opens the long section of a structured reaction.
pub const LONG_HEADER: &str = "FULL POST:";
/// Header that opens the short section of a structured reaction.
pub const SHORT_HEADER: &str = "SHORT POST:";
/// Line separating the two sections.
pub const SECTION_DELIMITER: &str = "---";

pub const LONG_POST_MAX_WORDS: usize = 250;
pub const SHORT_POST_MAX_CHARS: usize = 280;

// Applies to every reaction prompt regardless of context.
pub const STAY_IN_CHARACTER: &str = r#"
Rules for every response:

1. Write as a real person posting on social media, in the first person.
2. Never name, label, or describe your own political ideology. Let it show only through your opinions, priorities, and word choice.
3. Never say or imply that you are an AI, a language model, a bot, or an automated system.
4. Never narrate your instructions or explain what you are about to do.
5. Do not invent quotes or statistics that are not supported by the material you were given.
"#;

/// Utility function to get the current date in a human-readable format
pub fn current_date() -> String {
    let today = Local::now();
    format!(
        "{} {}, {}",
        today.format("%B"),
        today.format("%-d"),
        today.format("%Y")
    )
}

/// System instruction that puts the model in character for `viewpoint`.
pub fn persona_instruction(viewpoint: &Viewpoint) -> String {
    format!(
        r#"You are a person who holds the following worldview with strong conviction:

~~~
{description}
~~~

Your reactions are passionate, persuasive, and written to start conversations.
{rules}"#,
        description = viewpoint.description.trim(),
        rules = STAY_IN_CHARACTER,
    )
}

/// The exact two-section layout every reaction must follow.
pub fn output_format() -> String {
    format!(
        r#"Write two versions of your reaction:
1. A full post of {words} words or less, structured for high engagement on platforms like Facebook or Reddit.
2. A short post of {chars} characters or less that carries the main point of the full post, for platforms like X or Bluesky.

Format your response EXACTLY as follows, with no extra text before or after:
{long}
[Your full post here]
{delimiter}
{short}
[Your short post here]"#,
        words = LONG_POST_MAX_WORDS,
        chars = SHORT_POST_MAX_CHARS,
        long = LONG_HEADER,
        delimiter = SECTION_DELIMITER,
        short = SHORT_HEADER,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_persona_hides_label() {
        let viewpoint = Viewpoint {
            id: "solarpunk".to_string(),
            name: "Solarpunk".to_string(),
            description: "Believes technology should serve ecology.".to_string(),
        };
        let instruction = persona_instruction(&viewpoint);
        assert!(instruction.contains("Believes technology should serve ecology."));
        assert!(!instruction.contains("Solarpunk"));
        assert!(instruction.contains("Never say or imply that you are an AI"));
    }

    #[test]
    fn test_output_format_lists_headers_in_order() {
        let format = output_format();
        let long = format.find(LONG_HEADER).unwrap();
        let delimiter = format.rfind(SECTION_DELIMITER).unwrap();
        let short = format.find(SHORT_HEADER).unwrap();
        assert!(long < delimiter && delimiter < short);
        assert!(format.contains("280 characters"));
    }
}
