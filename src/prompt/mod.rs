mod common;
mod image;
mod reaction;
mod summarization;

pub use common::*;
pub use image::{image_description_prompt, image_generation_prompt};
pub use reaction::{
    grounded_search_prompt, no_context_prompt, reaction_request, scraped_text_prompt,
    user_supplied_request,
};
pub use summarization::short_post_prompt;
