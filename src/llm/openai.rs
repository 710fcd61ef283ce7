use anyhow::{anyhow, Result};
use async_openai::types::{
    ChatCompletionRequestMessageContentPartImage, ChatCompletionRequestMessageContentPartText,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    ChatCompletionRequestUserMessageContent, ChatCompletionRequestUserMessageContentPart,
    CreateChatCompletionRequestArgs, CreateImageRequestArgs, Image, ImageModel, ImageResponseFormat,
    ImageSize, ImageUrl,
};
use async_openai::{config::OpenAIConfig, Client as OpenAIClient};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use tracing::debug;

use super::types::{GeneratedImage, GenerationRequest, GenerationResponse, ImageRequest, PromptPart};
use crate::TARGET_LLM_REQUEST;

fn user_content(request: &GenerationRequest) -> ChatCompletionRequestUserMessageContent {
    if request.images().next().is_none() {
        return ChatCompletionRequestUserMessageContent::Text(request.text_prompt());
    }
    let parts = request
        .parts
        .iter()
        .map(|part| match part {
            PromptPart::Text(text) => ChatCompletionRequestUserMessageContentPart::Text(
                ChatCompletionRequestMessageContentPartText { text: text.clone() },
            ),
            PromptPart::Image(image) => ChatCompletionRequestUserMessageContentPart::ImageUrl(
                ChatCompletionRequestMessageContentPartImage {
                    image_url: ImageUrl {
                        url: format!("data:{};base64,{}", image.mime_type, image.data),
                        detail: None,
                    },
                },
            ),
        })
        .collect();
    ChatCompletionRequestUserMessageContent::Array(parts)
}

pub async fn chat(
    client: &OpenAIClient<OpenAIConfig>,
    model: &str,
    temperature: f32,
    request: &GenerationRequest,
) -> Result<GenerationResponse> {
    let mut messages = Vec::new();
    if let Some(system) = &request.system_instruction {
        messages.push(
            ChatCompletionRequestSystemMessageArgs::default()
                .content(system.as_str())
                .build()?
                .into(),
        );
    }
    messages.push(
        ChatCompletionRequestUserMessageArgs::default()
            .content(user_content(request))
            .build()?
            .into(),
    );

    let chat_request = CreateChatCompletionRequestArgs::default()
        .model(model)
        .temperature(temperature)
        .messages(messages)
        .build()?;

    debug!(target: TARGET_LLM_REQUEST, model = %model, "OpenAI chat request");
    let response = client.chat().create(chat_request).await?;
    let text = response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .unwrap_or_default();

    Ok(GenerationResponse {
        text,
        citations: Vec::new(),
    })
}

fn image_model(name: &str) -> ImageModel {
    match name {
        "dall-e-3" => ImageModel::DallE3,
        "dall-e-2" => ImageModel::DallE2,
        other => ImageModel::Other(other.to_string()),
    }
}

/// Closest supported size for the requested aspect ratio.
fn image_size(aspect_ratio: &str) -> ImageSize {
    match aspect_ratio {
        "1:1" => ImageSize::S1024x1024,
        "9:16" | "3:4" => ImageSize::S1024x1792,
        _ => ImageSize::S1792x1024,
    }
}

pub async fn create_image(
    client: &OpenAIClient<OpenAIConfig>,
    model: &str,
    request: &ImageRequest,
) -> Result<GeneratedImage> {
    let image_request = CreateImageRequestArgs::default()
        .prompt(request.prompt.as_str())
        .model(image_model(model))
        .n(request.number_of_images)
        .response_format(ImageResponseFormat::B64Json)
        .size(image_size(&request.aspect_ratio))
        .build()?;

    debug!(target: TARGET_LLM_REQUEST, model = %model, "OpenAI image request");
    let response = client.images().create(image_request).await?;
    for image in response.data {
        if let Image::B64Json { b64_json, .. } = image.as_ref() {
            return Ok(GeneratedImage {
                mime_type: "image/png".to_string(),
                bytes: STANDARD.decode(b64_json.as_bytes())?,
            });
        }
    }
    Err(anyhow!("OpenAI returned no base64 image data"))
}
