use crate::extract::normalize::bare_host;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FallbackRule {
    pub domain: &'static str,
    pub image_url: Option<&'static str>,
    pub use_source_url_as_image: bool,
}

impl FallbackRule {
    const fn image(domain: &'static str, image_url: &'static str) -> Self {
        FallbackRule {
            domain,
            image_url: Some(image_url),
            use_source_url_as_image: false,
        }
    }

    /// Known domain with nothing usable: resolve as unavailable.
    const fn unsupported(domain: &'static str) -> Self {
        FallbackRule {
            domain,
            image_url: None,
            use_source_url_as_image: false,
        }
    }

    const fn source_is_image(domain: &'static str) -> Self {
        FallbackRule {
            domain,
            image_url: None,
            use_source_url_as_image: true,
        }
    }
}

/// Outcome of a matched rule for one source URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FallbackMatch {
    Image(String),
    Unsupported,
}

pub const DEFAULT_RULES: &[FallbackRule] = &[
    FallbackRule::image("suno.ai", "https://cdn.suno.com/social-preview.png"),
    FallbackRule::image(
        "traderjoes.com",
        "https://www.traderjoes.com/content/dam/trjo/images/products/ube-mochi-pancake-and-waffle-mix-068389.jpg",
    ),
    FallbackRule::image("perplexity.ai", "https://www.perplexity.ai/images/og-image.png"),
    FallbackRule::image("huckberry.com", "https://huckberry.com/og-image.jpg"),
    FallbackRule::unsupported("kickstarter.com"),
    FallbackRule::image(
        "evergoods.us",
        "https://evergoods.us/cdn/shop/products/CPL16_V2_BlackDiamond_01.jpg",
    ),
    FallbackRule::image(
        "insta360.com",
        "https://static.insta360.com/assets/cube/product/insta360-link/link-og.jpg",
    ),
    FallbackRule::image("bambulab.com", "https://cdn.bambulab.com/image/a1.jpg"),
    FallbackRule::unsupported("apps.apple.com"),
    FallbackRule::unsupported("phys.org"),
    FallbackRule::unsupported("wisdomexperience.org"),
    FallbackRule::source_is_image("hodderscape.co.uk"),
    FallbackRule::image("neal.fun", "https://neal.fun/internet-artifacts/social.png"),
    FallbackRule::unsupported("music.apple.com"),
    FallbackRule::unsupported("poetryfoundation.org"),
    FallbackRule::image(
        "goretroid.com",
        "https://www.goretroid.com/cdn/shop/products/RP3PlusBlack16bit.png",
    ),
    FallbackRule::unsupported("tech.lgbt"),
];

/// Substring match on the bare host, in declaration order, first match wins.
pub struct DomainFallbackTable {
    rules: Vec<FallbackRule>,
}

impl Default for DomainFallbackTable {
    fn default() -> Self {
        Self::new(DEFAULT_RULES.to_vec())
    }
}

impl DomainFallbackTable {
    pub fn new(rules: Vec<FallbackRule>) -> Self {
        DomainFallbackTable { rules }
    }

    pub fn rule_for(&self, url: &str) -> Option<&FallbackRule> {
        let host = bare_host(url)?;
        self.rules.iter().find(|r| host.contains(r.domain))
    }

    /// `None` means no rule knows this domain at all.
    pub fn lookup(&self, url: &str) -> Option<FallbackMatch> {
        let rule = self.rule_for(url)?;
        let found = if rule.use_source_url_as_image {
            FallbackMatch::Image(url.to_string())
        } else {
            match rule.image_url {
                Some(img) => FallbackMatch::Image(img.to_string()),
                None => FallbackMatch::Unsupported,
            }
        };
        Some(found)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn substring_match_on_subdomain() {
        let table = DomainFallbackTable::new(vec![
            FallbackRule::unsupported("apple.com"),
            FallbackRule::image("example.com", "https://example.com/og.png"),
        ]);
        assert_eq!(
            table.lookup("https://music.apple.com/us/album/1"),
            Some(FallbackMatch::Unsupported)
        );
        assert_eq!(table.lookup("https://unknown.org/x"), None);
    }

    #[test]
    fn first_rule_wins() {
        let table = DomainFallbackTable::new(vec![
            FallbackRule::image("shop.example.com", "https://a/1.png"),
            FallbackRule::image("example.com", "https://a/2.png"),
        ]);
        assert_eq!(
            table.lookup("https://shop.example.com/p"),
            Some(FallbackMatch::Image("https://a/1.png".into()))
        );
        assert_eq!(
            table.lookup("https://www.example.com/p"),
            Some(FallbackMatch::Image("https://a/2.png".into()))
        );
    }

    #[test]
    fn default_table() {
        let table = DomainFallbackTable::default();
        assert_eq!(
            table.lookup("https://www.suno.ai/song/1"),
            Some(FallbackMatch::Image("https://cdn.suno.com/social-preview.png".into()))
        );
        assert_eq!(
            table.lookup("https://www.kickstarter.com/projects/x/y"),
            Some(FallbackMatch::Unsupported)
        );
        let cover = "https://www.hodderscape.co.uk/wp-content/uploads/cover.jpg";
        assert_eq!(table.lookup(cover), Some(FallbackMatch::Image(cover.into())));
        assert_eq!(
            table.lookup("https://music.apple.com/us/album/1"),
            Some(FallbackMatch::Unsupported)
        );
        assert_eq!(table.lookup("https://shop.example.com/p"), None);
    }

    #[test]
    fn unparseable_url_matches_nothing() {
        assert_eq!(DomainFallbackTable::default().lookup("not a url"), None);
    }
}
