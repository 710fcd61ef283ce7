use anyhow::Result;
use ollama_rs::generation::completion::request::GenerationRequest as OllamaRequest;
use ollama_rs::generation::options::GenerationOptions;
use ollama_rs::Ollama;
use tracing::{debug, warn};

use super::types::{GenerationRequest, GenerationResponse};
use crate::TARGET_LLM_REQUEST;

/// Flattens the request into a single completion prompt. The system
/// instruction leads; images are dropped.
pub fn flatten_prompt(request: &GenerationRequest) -> String {
    let prompt = request.text_prompt();
    match &request.system_instruction {
        Some(system) => format!("{}\n\n{}", system, prompt),
        None => prompt,
    }
}

pub async fn generate(
    ollama: &Ollama,
    model: &str,
    temperature: f32,
    request: &GenerationRequest,
) -> Result<GenerationResponse> {
    let dropped = request.images().count();
    if dropped > 0 {
        warn!(target: TARGET_LLM_REQUEST, "Ollama backend ignores {} attached image(s)", dropped);
    }

    let mut ollama_request = OllamaRequest::new(model.to_string(), flatten_prompt(request));
    ollama_request.options = Some(GenerationOptions::default().temperature(temperature));

    debug!(target: TARGET_LLM_REQUEST, model = %model, "Sending Ollama request");
    let response = ollama.generate(ollama_request).await?;
    debug!(target: TARGET_LLM_REQUEST, "Ollama response received: {} chars", response.response.len());

    Ok(GenerationResponse {
        text: response.response,
        citations: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flatten_prompt() {
        let request = GenerationRequest::text("the prompt").with_system("the persona");
        assert_eq!(flatten_prompt(&request), "the persona\n\nthe prompt");
        assert_eq!(flatten_prompt(&GenerationRequest::text("bare")), "bare");
    }
}
