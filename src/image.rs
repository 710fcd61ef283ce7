//! Image pipeline: neutral description, then the image itself. Callers
//! that must always show something use [`PostImage::Placeholder`] when
//! this fails.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::error::ImageError;
use crate::llm::{GeneratedImage, GenerationRequest, ImageGenerator, ImageRequest, TextGenerator};
use crate::prompt::{image_description_prompt, image_generation_prompt};
use crate::util::{bounded_call, collapse_whitespace, take_chars, CallError};
use crate::TARGET_LLM_REQUEST;

pub const FALLBACK_IMAGE_PROMPT: &str = "An abstract image representing diverse opinions and discussion.";

/// Descriptions are a few words; anything past this is noise.
const MAX_DESCRIPTION_CHARS: usize = 400;

pub const PLACEHOLDER_SVG: &str = include_str!("../assets/placeholder.svg");
pub const PLACEHOLDER_MIME: &str = "image/svg+xml";

pub struct ImageParams<'a> {
    pub text_generator: &'a dyn TextGenerator,
    pub image_generator: &'a dyn ImageGenerator,
    pub timeout: Duration,
    pub cancel: &'a CancellationToken,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PostImage {
    Generated(GeneratedImage),
    Placeholder,
}

impl PostImage {
    pub fn data_url(&self) -> String {
        match self {
            PostImage::Generated(image) => image.data_url(),
            PostImage::Placeholder => format!(
                "data:{};base64,{}",
                PLACEHOLDER_MIME,
                STANDARD.encode(PLACEHOLDER_SVG.as_bytes())
            ),
        }
    }

    pub fn is_placeholder(&self) -> bool {
        matches!(self, PostImage::Placeholder)
    }
}

fn clean_description(raw: &str) -> Option<String> {
    let cleaned = collapse_whitespace(raw.trim().trim_matches(|c| c == '"' || c == '\''));
    if cleaned.is_empty() {
        None
    } else {
        Some(take_chars(&cleaned, MAX_DESCRIPTION_CHARS).to_string())
    }
}

/// First call: a neutral description of `post_text`, or the fixed fallback
/// when the model fails or answers with nothing.
pub async fn image_description(
    post_text: &str,
    params: &ImageParams<'_>,
) -> Result<String, ImageError> {
    let request = GenerationRequest::text(image_description_prompt(post_text));
    let result = bounded_call(params.cancel, params.timeout, params.text_generator.generate(&request)).await;
    match result {
        Ok(response) => match clean_description(&response.text) {
            Some(description) => {
                debug!(target: TARGET_LLM_REQUEST, "Image description: {}", description);
                Ok(description)
            }
            None => {
                warn!(target: TARGET_LLM_REQUEST, "Image description was empty, using fallback prompt");
                Ok(FALLBACK_IMAGE_PROMPT.to_string())
            }
        },
        Err(CallError::Cancelled) => Err(ImageError::Cancelled),
        Err(e) => {
            warn!(target: TARGET_LLM_REQUEST, "Image description failed ({}), using fallback prompt", e);
            Ok(FALLBACK_IMAGE_PROMPT.to_string())
        }
    }
}

/// Generates an illustration for `post_text`.
pub async fn generate_image(
    post_text: &str,
    params: &ImageParams<'_>,
) -> Result<GeneratedImage, ImageError> {
    let description = image_description(post_text, params).await?;
    let request = ImageRequest::new(image_generation_prompt(&description));

    let image = bounded_call(
        params.cancel,
        params.timeout,
        params.image_generator.generate_image(&request),
    )
    .await
    .map_err(|e| match e {
        CallError::TimedOut(limit) => ImageError::TimedOut(limit.as_secs()),
        CallError::Cancelled => ImageError::Cancelled,
        CallError::Failed(err) => ImageError::Failed(err),
    })?;

    if image.bytes.is_empty() {
        return Err(ImageError::NoImageData);
    }
    Ok(image)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;

    async fn run(
        text_generator: &FakeTextGenerator,
        image_generator: &FakeImageGenerator,
    ) -> Result<GeneratedImage, ImageError> {
        let cancel = CancellationToken::new();
        let params = ImageParams {
            text_generator,
            image_generator,
            timeout: Duration::from_millis(200),
            cancel: &cancel,
        };
        generate_image("Rents are out of control and nobody is listening.", &params).await
    }

    #[tokio::test]
    async fn test_description_feeds_image_prompt() {
        let text_generator = FakeTextGenerator::new(false, vec![text("\"A lone key on an empty table\"\n")]);
        let image_generator = FakeImageGenerator::returning(b"jpeg");

        let image = run(&text_generator, &image_generator).await.unwrap();

        assert_eq!(image.bytes, b"jpeg");
        assert_eq!(image.mime_type, "image/jpeg");
        assert!(text_generator.request(0).text_prompt().contains("Rents are out of control"));
        let prompts = image_generator.prompts();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains("Description: \"A lone key on an empty table\""));
        assert!(prompts[0].contains("photorealistic"));
    }

    #[tokio::test]
    async fn test_failed_description_uses_fallback() {
        for reply in [Reply::Fail, text(" "), Reply::Hang] {
            let text_generator = FakeTextGenerator::new(false, vec![reply]);
            let image_generator = FakeImageGenerator::returning(b"jpeg");
            run(&text_generator, &image_generator).await.unwrap();
            assert!(image_generator.prompts()[0].contains(FALLBACK_IMAGE_PROMPT));
        }
    }

    #[tokio::test]
    async fn test_image_failure_is_an_error() {
        let text_generator = FakeTextGenerator::new(false, vec![text("a bridge")]);
        let image_generator = FakeImageGenerator::failing();
        assert!(matches!(
            run(&text_generator, &image_generator).await,
            Err(ImageError::Failed(_))
        ));

        let text_generator = FakeTextGenerator::new(false, vec![text("a bridge")]);
        let image_generator = FakeImageGenerator::returning(b"");
        assert!(matches!(
            run(&text_generator, &image_generator).await,
            Err(ImageError::NoImageData)
        ));
    }

    #[test]
    fn test_placeholder_data_url() {
        let url = PostImage::Placeholder.data_url();
        assert!(url.starts_with("data:image/svg+xml;base64,"));
        let decoded = STANDARD
            .decode(url.trim_start_matches("data:image/svg+xml;base64,"))
            .unwrap();
        assert_eq!(decoded, PLACEHOLDER_SVG.as_bytes());
        assert!(PostImage::Placeholder.is_placeholder());
    }
}
