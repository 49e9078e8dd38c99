use url::Url;

/// Resolve an extracted image reference against the page it came from.
/// `//host/x` becomes `https://host/x`, `/x` is joined to the source origin,
/// anything else passes through.
pub fn normalize_image_url(raw: &str, source_url: &str) -> String {
    let raw = decode_entities(raw.trim());
    if raw.starts_with("//") {
        return format!("https:{}", raw);
    }
    if raw.starts_with('/') {
        if let Some(origin) = origin_of(source_url) {
            return format!("{}{}", origin, raw);
        }
    }
    raw
}

/// `scheme://host[:port]` of a URL, if it has one.
pub fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let origin = parsed.origin();
    origin.is_tuple().then(|| origin.ascii_serialization())
}

/// Lowercased host with a leading `www.` removed.
pub fn bare_host(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let host = parsed.host_str()?.to_ascii_lowercase();
    Some(host.strip_prefix("www.").unwrap_or(&host).to_string())
}

fn decode_entities(s: &str) -> String {
    s.replace("&amp;", "&")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = "https://shop.example.com/p";

    #[test]
    fn protocol_relative() {
        assert_eq!(
            normalize_image_url("//cdn.example.com/a.png", SOURCE),
            "https://cdn.example.com/a.png"
        );
    }

    #[test]
    fn root_relative() {
        assert_eq!(
            normalize_image_url("/a.png", SOURCE),
            "https://shop.example.com/a.png"
        );
        assert_eq!(
            normalize_image_url("/a.png", "http://localhost:8080/x/y"),
            "http://localhost:8080/a.png"
        );
    }

    #[test]
    fn absolute_and_entities() {
        assert_eq!(
            normalize_image_url("https://img.x.com/a.jpg?w=1&amp;h=2", SOURCE),
            "https://img.x.com/a.jpg?w=1&h=2"
        );
        assert_eq!(normalize_image_url("img/a.png", SOURCE), "img/a.png");
    }

    #[test]
    fn unparseable_source_keeps_path() {
        assert_eq!(normalize_image_url("/a.png", "not a url"), "/a.png");
    }

    #[test]
    fn bare_host_strips_www() {
        assert_eq!(bare_host("https://WWW.Apple.com/x").as_deref(), Some("apple.com"));
        assert_eq!(bare_host("https://music.apple.com/a").as_deref(), Some("music.apple.com"));
        assert_eq!(bare_host("nope"), None);
    }
}
