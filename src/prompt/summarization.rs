use crate::prompt::common::SHORT_POST_MAX_CHARS;

/// Asks for a short-post rendition of an already written long post.
pub fn short_post_prompt(long_text: &str) -> String {
    format!(
        r#"Summarize the following text in {chars} characters or less for posting on social media like X or Bluesky. Keep the voice and opinion of the original. Output only the summarized text, without any introductory phrases:

"{text}""#,
        chars = SHORT_POST_MAX_CHARS,
        text = long_text.trim(),
    )
}
