//! Provider-neutral request and response types for text and image models.

use anyhow::Result;
use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde::{Deserialize, Serialize};

/// A web page cited by a grounded answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Source {
    pub uri: String,
    pub title: String,
}

impl Source {
    /// Only citations with both a uri and a title can be attributed.
    pub fn is_attributable(&self) -> bool {
        !self.uri.trim().is_empty() && !self.title.trim().is_empty()
    }
}

/// An inline image handed to a model, base64-encoded.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImageAttachment {
    pub mime_type: String,
    pub data: String,
}

impl ImageAttachment {
    pub fn from_bytes(mime_type: impl Into<String>, bytes: &[u8]) -> Self {
        Self {
            mime_type: mime_type.into(),
            data: STANDARD.encode(bytes),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PromptPart {
    Text(String),
    Image(ImageAttachment),
}

#[derive(Debug, Clone, Default)]
pub struct GenerationRequest {
    pub parts: Vec<PromptPart>,
    pub system_instruction: Option<String>,
    /// Ask the backend to ground the answer with live web search.
    pub web_search: bool,
}

impl GenerationRequest {
    pub fn text(prompt: impl Into<String>) -> Self {
        Self {
            parts: vec![PromptPart::Text(prompt.into())],
            ..Default::default()
        }
    }

    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system_instruction = Some(system.into());
        self
    }

    pub fn with_image(mut self, image: ImageAttachment) -> Self {
        self.parts.push(PromptPart::Image(image));
        self
    }

    pub fn with_web_search(mut self, enabled: bool) -> Self {
        self.web_search = enabled;
        self
    }

    /// All text parts joined by blank lines.
    pub fn text_prompt(&self) -> String {
        self.parts
            .iter()
            .filter_map(|part| match part {
                PromptPart::Text(text) => Some(text.as_str()),
                PromptPart::Image(_) => None,
            })
            .collect::<Vec<_>>()
            .join("\n\n")
    }

    pub fn images(&self) -> impl Iterator<Item = &ImageAttachment> {
        self.parts.iter().filter_map(|part| match part {
            PromptPart::Image(image) => Some(image),
            PromptPart::Text(_) => None,
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GenerationResponse {
    pub text: String,
    /// Grounding citations, in the order the backend returned them.
    pub citations: Vec<Source>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ImageRequest {
    pub prompt: String,
    pub number_of_images: u8,
    pub aspect_ratio: String,
    pub output_mime_type: String,
}

impl ImageRequest {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            number_of_images: 1,
            aspect_ratio: "16:9".to_string(),
            output_mime_type: "image/jpeg".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedImage {
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

impl GeneratedImage {
    pub fn data_url(&self) -> String {
        format!("data:{};base64,{}", self.mime_type, STANDARD.encode(&self.bytes))
    }
}

#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<GenerationResponse>;

    /// Whether `web_search` requests are honoured.
    fn supports_web_search(&self) -> bool;
}

#[async_trait]
pub trait ImageGenerator: Send + Sync {
    async fn generate_image(&self, request: &ImageRequest) -> Result<GeneratedImage>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_prompt_skips_images() {
        let request = GenerationRequest::text("first")
            .with_image(ImageAttachment::from_bytes("image/png", b"png"))
            .with_system("sys");
        assert_eq!(request.text_prompt(), "first");
        assert_eq!(request.images().count(), 1);
        assert_eq!(request.system_instruction.as_deref(), Some("sys"));
        assert!(!request.web_search);
    }

    #[test]
    fn test_data_url() {
        let image = GeneratedImage {
            mime_type: "image/jpeg".to_string(),
            bytes: b"abc".to_vec(),
        };
        assert_eq!(image.data_url(), "data:image/jpeg;base64,YWJj");
    }

    #[test]
    fn test_image_request_defaults() {
        let request = ImageRequest::new("a lighthouse");
        assert_eq!(request.number_of_images, 1);
        assert_eq!(request.aspect_ratio, "16:9");
        assert_eq!(request.output_mime_type, "image/jpeg");
    }
}
