/// Turns a reaction into a short, neutral visual description that image
/// models will not refuse.
pub fn image_description_prompt(post_text: &str) -> String {
    format!(
        r#"Summarize the following text into a short, descriptive, and neutral prompt for an image generator. Describe a symbolic or metaphorical scene representing the core idea of the text. Avoid any controversial, political, or sensitive terms, names of real people, and slogans. Focus only on visual elements that can be depicted photorealistically. Use just a few words and do not include any other text in your response.

Text: "{text}""#,
        text = post_text.trim(),
    )
}

pub fn image_generation_prompt(description: &str) -> String {
    format!(
        r#"Create a visually striking, symbolic, and photorealistic image based on the following description. Do not render any text or words in the image itself.

Description: "{description}""#,
        description = description.trim(),
    )
}
