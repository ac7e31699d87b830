//! Anchor extraction from directory listing pages.

use scraper::{Html, Selector};
use url::Url;

/// All `<a href>` targets of `html` that live on the same origin as `base_dir`,
/// in document order. Relative hrefs are resolved against `base_dir`; hrefs
/// that do not form a valid URL are skipped.
pub fn extract_same_origin_links(html: &str, base_dir: &Url) -> Vec<Url> {
    let Ok(anchors) = Selector::parse("a[href]") else {
        return Vec::new();
    };
    let document = Html::parse_document(html);
    let origin = base_dir.origin();

    document
        .select(&anchors)
        .filter_map(|a| a.value().attr("href"))
        .filter_map(|href| resolve(href.trim(), base_dir))
        .filter(|link| link.origin() == origin)
        .collect()
}

fn resolve(href: &str, base_dir: &Url) -> Option<Url> {
    if href.starts_with("http://") || href.starts_with("https://") {
        Url::parse(href).ok()
    } else {
        base_dir.join(href).ok()
    }
}
