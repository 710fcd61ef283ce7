//! Content resolution: per-platform resolvers and the orchestrator that
//! decides between direct content, grounded search and manual context.

mod article;
mod bluesky;
pub mod client;
mod html;
mod mirror;
mod orchestrator;
mod reddit;
mod types;

pub use self::article::ArticleResolver;
pub use self::bluesky::BlueskyResolver;
pub use self::client::WebClient;
pub use self::html::{extract_page_meta, PageMeta};
pub use self::mirror::{default_mirror_hosts, mirror_hosts, MirrorResolver};
pub use self::orchestrator::{settle, Orchestrator, Resolution, ResolutionState, Settlement};
pub use self::reddit::RedditResolver;
pub use self::types::*;

use crate::normalize::Platform;

/// Builds the resolver chain in priority order: structured APIs first, then
/// every mirror of every scraped platform, then (optionally) readability
/// extraction for ordinary pages. Each resolver only runs for URLs it handles.
pub fn default_resolvers(
    web: &WebClient,
    article_extraction: bool,
) -> Vec<Box<dyn ContentResolver>> {
    let mut resolvers: Vec<Box<dyn ContentResolver>> = vec![
        Box::new(RedditResolver::new(web.clone())),
        Box::new(BlueskyResolver::new(web.clone())),
    ];

    for platform in Platform::ALL {
        for host in mirror_hosts(platform) {
            resolvers.push(Box::new(MirrorResolver::new(web.clone(), platform, host)));
        }
    }

    if article_extraction {
        resolvers.push(Box::new(ArticleResolver::new(web.clone())));
    }

    resolvers
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::normalize::normalize_url;
    use std::time::Duration;

    fn handling(resolvers: &[Box<dyn ContentResolver>], url: &str) -> Vec<String> {
        let target = normalize_url(url).unwrap();
        resolvers
            .iter()
            .filter(|r| r.handles(&target))
            .map(|r| r.name())
            .collect()
    }

    #[test]
    fn test_resolver_chain_per_platform() {
        let web = WebClient::new(None, Duration::from_secs(5)).unwrap();
        let resolvers = default_resolvers(&web, false);

        assert_eq!(
            handling(&resolvers, "https://www.reddit.com/r/a/comments/b/c"),
            vec!["reddit-api"]
        );
        assert_eq!(
            handling(&resolvers, "https://bsky.app/profile/a/post/b"),
            vec!["bluesky-api"]
        );
        assert_eq!(
            handling(&resolvers, "https://twitter.com/a/status/1"),
            vec!["mirror:fxtwitter.com", "mirror:vxtwitter.com", "mirror:fixupx.com"]
        );
        assert!(handling(&resolvers, "https://news.example.com/story").is_empty());

        let with_articles = default_resolvers(&web, true);
        assert_eq!(
            handling(&with_articles, "https://news.example.com/story"),
            vec!["article-extract"]
        );
    }
}
