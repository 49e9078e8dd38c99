use std::sync::LazyLock;

use regex::Regex;

// Each strategy has both attribute orders. Markup is matched, not parsed.
static OG_IMAGE_RE: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"(?i)<meta[^>]*property=["']og:image["'][^>]*content=["']([^"']+)["']"#).unwrap(),
        Regex::new(r#"(?i)<meta[^>]*content=["']([^"']+)["'][^>]*property=["']og:image["']"#).unwrap(),
    ]
});
static TWITTER_IMAGE_RE: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"(?i)<meta[^>]*name=["']twitter:image["'][^>]*content=["']([^"']+)["']"#).unwrap(),
        Regex::new(r#"(?i)<meta[^>]*content=["']([^"']+)["'][^>]*name=["']twitter:image["']"#).unwrap(),
    ]
});
static MARKED_IMG_RE: LazyLock<[Regex; 2]> = LazyLock::new(|| {
    [
        Regex::new(r#"(?i)<img[^>]*class=["'][^"']*(?:product|hero|main|featured)[^"']*["'][^>]*src=["']([^"']+)["']"#).unwrap(),
        Regex::new(r#"(?i)<img[^>]*src=["']([^"']+)["'][^>]*class=["'][^"']*(?:product|hero|main|featured)[^"']*["']"#).unwrap(),
    ]
});

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageStrategy {
    OpenGraph,
    TwitterCard,
    MarkedImg,
}

impl ImageStrategy {
    /// Priority order: page metadata before guessing at `<img>` tags.
    pub const CASCADE: [ImageStrategy; 3] = [
        ImageStrategy::OpenGraph,
        ImageStrategy::TwitterCard,
        ImageStrategy::MarkedImg,
    ];

    fn patterns(self) -> &'static [Regex; 2] {
        match self {
            ImageStrategy::OpenGraph => &*OG_IMAGE_RE,
            ImageStrategy::TwitterCard => &*TWITTER_IMAGE_RE,
            ImageStrategy::MarkedImg => &*MARKED_IMG_RE,
        }
    }

    /// Raw attribute value, before normalization.
    pub fn find(self, html: &str) -> Option<String> {
        self.patterns()
            .iter()
            .find_map(|re| re.captures(html))
            .map(|c| c[1].trim().to_string())
            .filter(|s| !s.is_empty())
    }
}

/// First strategy in cascade order that matches.
pub fn find_image(html: &str) -> Option<(ImageStrategy, String)> {
    ImageStrategy::CASCADE
        .iter()
        .find_map(|s| s.find(html).map(|url| (*s, url)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn og_either_attribute_order() {
        let a = r#"<meta property="og:image" content="https://x.com/a.jpg">"#;
        let b = r#"<meta content='https://x.com/b.jpg' property='og:image' />"#;
        assert_eq!(ImageStrategy::OpenGraph.find(a).as_deref(), Some("https://x.com/a.jpg"));
        assert_eq!(ImageStrategy::OpenGraph.find(b).as_deref(), Some("https://x.com/b.jpg"));
    }

    #[test]
    fn og_beats_twitter_and_img() {
        let html = r#"
            <img class="product-main" src="/img/p.png">
            <meta name="twitter:image" content="https://x.com/tw.jpg">
            <meta property="og:image" content="https://x.com/og.jpg">
        "#;
        let (strategy, url) = find_image(html).unwrap();
        assert_eq!(strategy, ImageStrategy::OpenGraph);
        assert_eq!(url, "https://x.com/og.jpg");
    }

    #[test]
    fn twitter_when_no_og() {
        let html = r#"<META NAME="twitter:image" CONTENT="https://x.com/tw.jpg">"#;
        assert_eq!(
            find_image(html),
            Some((ImageStrategy::TwitterCard, "https://x.com/tw.jpg".to_string()))
        );
    }

    #[test]
    fn marked_img_either_order() {
        let a = r#"<img class="gallery hero-shot" alt="x" src="//cdn.x.com/h.jpg">"#;
        let b = r#"<img src="/p.jpg" width="10" class="featured">"#;
        assert_eq!(ImageStrategy::MarkedImg.find(a).as_deref(), Some("//cdn.x.com/h.jpg"));
        assert_eq!(ImageStrategy::MarkedImg.find(b).as_deref(), Some("/p.jpg"));
    }

    #[test]
    fn unmarked_img_is_ignored() {
        let html = r#"<img class="avatar" src="/me.png"><img src="/logo.svg">"#;
        assert_eq!(find_image(html), None);
    }
}
