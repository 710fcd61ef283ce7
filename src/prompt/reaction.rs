//! One prompt builder per `GenerationContext` variant.

use crate::catalog::Viewpoint;
use crate::llm::GenerationRequest;
use crate::prompt::common::{current_date, output_format, persona_instruction};
use crate::resolve::{GenerationContext, ManualContext, ResolvedContent};

/// Builds the complete reaction request for `context`.
pub fn reaction_request(
    viewpoint: &Viewpoint,
    context: &GenerationContext,
    url: &str,
) -> GenerationRequest {
    let request = match context {
        GenerationContext::NoContext => GenerationRequest::text(no_context_prompt(url)),
        GenerationContext::ScrapedText(content) => {
            GenerationRequest::text(scraped_text_prompt(url, content))
        }
        GenerationContext::UserSupplied(manual) => user_supplied_request(url, manual),
        GenerationContext::GroundedSearch => {
            GenerationRequest::text(grounded_search_prompt(url)).with_web_search(true)
        }
    };
    request.with_system(persona_instruction(viewpoint))
}

pub fn no_context_prompt(url: &str) -> String {
    format!(
        r#"Someone just shared this link: {url}

You cannot open it. Infer what it is most likely about from the address itself and react to that topic. Do not claim details you cannot know from the address.

{format}"#,
        url = url,
        format = output_format(),
    )
}

pub fn scraped_text_prompt(url: &str, content: &ResolvedContent) -> String {
    format!(
        r#"React to the following content, shared from {url}:

----------
{excerpt}
----------

Base your reaction only on the content above.

{format}"#,
        url = url,
        excerpt = content.excerpt.as_deref().unwrap_or_default().trim(),
        format = output_format(),
    )
}

/// The caller's own description (and optional screenshot) replaces any
/// fetched content.
pub fn user_supplied_request(url: &str, manual: &ManualContext) -> GenerationRequest {
    let description = match manual.text.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => format!(
            "The person who shared it describes it like this:\n\n----------\n{}\n----------\n\n",
            text
        ),
        _ => String::new(),
    };
    let image_note = if manual.image.is_some() {
        "A screenshot of the post is attached. Read it carefully and react to what it shows.\n\n"
    } else {
        ""
    };
    let prompt = format!(
        r#"React to the post at {url}.

{description}{image_note}Base your reaction only on what was provided here.

{format}"#,
        url = url,
        description = description,
        image_note = image_note,
        format = output_format(),
    );

    let mut request = GenerationRequest::text(prompt);
    if let Some(image) = &manual.image {
        request = request.with_image(image.clone());
    }
    request
}

pub fn grounded_search_prompt(url: &str) -> String {
    format!(
        r#"Use web search to find out what the page at "{url}" says, then react to it.
Today's date: {date}

{format}"#,
        url = url,
        date = current_date(),
        format = output_format(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::ImageAttachment;
    use crate::resolve::ContentOrigin;

    fn viewpoint() -> Viewpoint {
        Viewpoint {
            id: "localist".to_string(),
            name: "Localist".to_string(),
            description: "Cares most about neighbourhood self-reliance.".to_string(),
        }
    }

    #[test]
    fn test_only_grounded_search_enables_web_search() {
        let url = "https://example.com/story";
        let scraped = GenerationContext::ScrapedText(ResolvedContent {
            excerpt: Some("The council voted.".to_string()),
            origin: ContentOrigin::RedditApi,
        });
        for context in [GenerationContext::NoContext, scraped] {
            let request = reaction_request(&viewpoint(), &context, url);
            assert!(!request.web_search, "{}", context.mode());
        }
        let grounded = reaction_request(&viewpoint(), &GenerationContext::GroundedSearch, url);
        assert!(grounded.web_search);
        assert!(grounded.text_prompt().contains(url));
    }

    #[test]
    fn test_scraped_text_is_embedded() {
        let context = GenerationContext::ScrapedText(ResolvedContent {
            excerpt: Some("  The council voted.  ".to_string()),
            origin: ContentOrigin::RedditApi,
        });
        let request = reaction_request(&viewpoint(), &context, "https://reddit.com/r/x");
        assert!(request.text_prompt().contains("\nThe council voted.\n"));
        assert!(request
            .system_instruction
            .as_deref()
            .unwrap()
            .contains("neighbourhood self-reliance"));
    }

    #[test]
    fn test_user_supplied_attaches_image() {
        let manual = ManualContext::new(
            Some("A photo of a flooded street".to_string()),
            Some(ImageAttachment::from_bytes("image/png", b"png")),
        );
        let request = reaction_request(
            &viewpoint(),
            &GenerationContext::UserSupplied(manual),
            "https://x.com/a/status/1",
        );
        assert_eq!(request.images().count(), 1);
        assert!(request.text_prompt().contains("A photo of a flooded street"));
        assert!(request.text_prompt().contains("screenshot"));
        assert!(!request.web_search);
    }
}
