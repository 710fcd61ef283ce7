//! Open Graph / meta tag extraction from scraped HTML.

use scraper::{Html, Selector};

use crate::util::collapse_whitespace;

const DESCRIPTION_SELECTORS: &[&str] = &[
    r#"meta[property="og:description"]"#,
    r#"meta[name="twitter:description"]"#,
    r#"meta[property="twitter:description"]"#,
    r#"meta[name="description"]"#,
];

const TITLE_SELECTORS: &[&str] = &[
    r#"meta[property="og:title"]"#,
    r#"meta[name="twitter:title"]"#,
];

/// Page metadata read from `<meta>` tags.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PageMeta {
    pub title: Option<String>,
    pub description: Option<String>,
}

impl PageMeta {
    /// Renders the metadata as a prompt excerpt. Only pages with a
    /// description count as content.
    pub fn excerpt(&self) -> Option<String> {
        let description = self.description.as_deref()?;
        Some(match self.title.as_deref() {
            Some(title) if !description.starts_with(title) => {
                format!("{}\n\n{}", title, description)
            }
            _ => description.to_string(),
        })
    }
}

fn first_content(document: &Html, selectors: &[&str]) -> Option<String> {
    selectors.iter().find_map(|raw| {
        let selector = Selector::parse(raw).ok()?;
        document
            .select(&selector)
            .filter_map(|el| el.value().attr("content"))
            .map(collapse_whitespace)
            .find(|content| !content.is_empty())
    })
}

pub fn extract_page_meta(html: &str) -> PageMeta {
    let document = Html::parse_document(html);
    PageMeta {
        title: first_content(&document, TITLE_SELECTORS),
        description: first_content(&document, DESCRIPTION_SELECTORS),
    }
}
