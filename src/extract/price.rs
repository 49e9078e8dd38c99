use std::sync::LazyLock;

use regex::Regex;

const AMOUNT: &str = r"(\d+(?:,\d{3})*(?:\.\d{2})?)";

static PRICE_RES: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    [
        // $1,299.00
        format!(r"\$\s*{AMOUNT}"),
        // "price": 49.99 / cost: $12
        format!(r#"(?i)(?:price|cost)["']?\s*[>:]\s*["']?\$?\s*{AMOUNT}"#),
        // <span class="sale-price">USD 19.99
        format!(r#"(?i)<[a-z][a-z0-9]*[^>]*class=["'][^"']*price[^"']*["'][^>]*>(?:[^$]*\$)?\s*{AMOUNT}"#),
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

/// First matching pattern wins. The amount is always rendered with a `$`
/// prefix and no thousands separators, whatever currency the page used.
pub fn find_price(html: &str) -> Option<String> {
    PRICE_RES
        .iter()
        .find_map(|re| re.captures(html))
        .map(|c| format!("${}", c[1].replace(',', "")))
}
