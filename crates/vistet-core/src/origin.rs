//! Storefront origin extraction.

use url::Url;

/// Scheme and host of a storefront page URL.
///
/// Given `"https://rehabclo.cl/collections/productos"`, returns
/// `"https://rehabclo.cl"`. Relative image paths on the page are resolved
/// against this. Input that does not parse falls back to its first three
/// `/`-separated segments.
#[must_use]
pub fn extract_store_origin(page_url: &str) -> String {
    Url::parse(page_url).map_or_else(
        |_| {
            page_url
                .trim_end_matches('/')
                .splitn(4, '/')
                .take(3)
                .collect::<Vec<_>>()
                .join("/")
        },
        |u| u.origin().ascii_serialization(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn origin_drops_the_collection_path() {
        assert_eq!(
            extract_store_origin("https://rehabclo.cl/collections/productos?page=2"),
            "https://rehabclo.cl"
        );
    }

    #[test]
    fn origin_keeps_a_non_default_port() {
        assert_eq!(
            extract_store_origin("http://127.0.0.1:8081/collections/all"),
            "http://127.0.0.1:8081"
        );
    }

    #[test]
    fn origin_falls_back_to_split_for_unparseable_input() {
        assert_eq!(extract_store_origin("rehabclo.cl/a/b/c"), "rehabclo.cl/a/b");
    }
}
