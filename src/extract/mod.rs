pub mod image;
pub mod normalize;
pub mod price;

use tracing::debug;

/// Result of running the cascade on one page. Both fields empty is a valid
/// outcome, not an error.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub image_url: Option<String>,
    pub price: Option<String>,
}

impl Extracted {
    pub fn is_empty(&self) -> bool {
        self.image_url.is_none() && self.price.is_none()
    }
}

/// Image: og:image, then twitter:image, then a marker-classed `<img>`.
/// Price: first matching price pattern.
pub fn extract(html: &str, source_url: &str) -> Extracted {
    let image_url = image::find_image(html).map(|(strategy, raw)| {
        debug!("image via {:?}: {}", strategy, raw);
        normalize::normalize_image_url(&raw, source_url)
    });
    let price = price::find_price(html);
    Extracted { image_url, price }
}
