//! Per-platform extractors that derive an image URL from the source URL
//! alone, with no fetch.

use std::sync::LazyLock;

use regex::Regex;
use url::Url;

use crate::extract::normalize::bare_host;

static VIDEO_ID_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        r"youtu\.be/([^?&/#]+)",
        r"youtube\.com/watch\?(?:[^#]*&)?v=([^&#]+)",
        r"youtube\.com/shorts/([^?&/#]+)",
        r"youtube\.com/embed/([^?&/#]+)",
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

const IMAGE_EXTENSIONS: &[&str] = &[".jpg", ".jpeg", ".png", ".gif", ".webp", ".avif"];

pub trait SpecializedExtractor {
    fn name(&self) -> &'static str;
    fn matches(&self, url: &str) -> bool;
    fn extract_image(&self, url: &str) -> Option<String>;
}

/// YouTube watch, short-link, shorts and embed URLs.
pub struct VideoThumbnail;

impl VideoThumbnail {
    pub fn video_id(url: &str) -> Option<String> {
        VIDEO_ID_RES
            .iter()
            .find_map(|re| re.captures(url))
            .map(|c| c[1].to_string())
    }

    pub fn thumbnail_url(id: &str) -> String {
        format!("https://i.ytimg.com/vi/{}/maxresdefault.jpg", id)
    }
}

impl SpecializedExtractor for VideoThumbnail {
    fn name(&self) -> &'static str {
        "video"
    }

    fn matches(&self, url: &str) -> bool {
        bare_host(url).is_some_and(|h| {
            h == "youtu.be" || h == "youtube.com" || h.ends_with(".youtube.com")
        })
    }

    fn extract_image(&self, url: &str) -> Option<String> {
        Self::video_id(url).map(|id| Self::thumbnail_url(&id))
    }
}

/// A source URL that already points at an image file.
pub struct DirectImage;

impl SpecializedExtractor for DirectImage {
    fn name(&self) -> &'static str {
        "direct-image"
    }

    fn matches(&self, url: &str) -> bool {
        Url::parse(url).is_ok_and(|u| {
            let path = u.path().to_ascii_lowercase();
            IMAGE_EXTENSIONS.iter().any(|ext| path.ends_with(ext))
        })
    }

    fn extract_image(&self, url: &str) -> Option<String> {
        self.matches(url).then(|| url.to_string())
    }
}

/// Ordered set of extractors; the first one that matches and yields an
/// image wins.
pub struct SpecializedExtractors {
    extractors: Vec<Box<dyn SpecializedExtractor + Send + Sync>>,
}

impl Default for SpecializedExtractors {
    fn default() -> Self {
        SpecializedExtractors {
            extractors: vec![Box::new(VideoThumbnail), Box::new(DirectImage)],
        }
    }
}

impl SpecializedExtractors {
    pub fn matches(&self, url: &str) -> bool {
        self.extractors.iter().any(|e| e.matches(url))
    }

    /// (extractor name, image url)
    pub fn extract_image(&self, url: &str) -> Option<(&'static str, String)> {
        self.extractors
            .iter()
            .filter(|e| e.matches(url))
            .find_map(|e| e.extract_image(url).map(|img| (e.name(), img)))
    }
}
