//! Product extraction from a storefront collection page.
//!
//! The page embeds two unrelated JSON blobs: the analytics `var meta = {...}`
//! object with a `products` array, and the `collection_viewed` pixel event
//! whose `productVariants` carry image paths. Each is parsed on its own and
//! a failure in one leaves the other usable. Products are then joined to
//! their image by product id.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;
use vistet_core::scraped::integer_from_value;
use vistet_core::{ScrapedProduct, ScrapedVariant};

static META_ASSIGN_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"var\s+meta\s*=\s*\{").expect("valid regex"));
static COLLECTION_VIEWED_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"webPixelsManagerAPI\.publish\(\s*"collection_viewed"\s*,\s*\{"#)
        .expect("valid regex")
});

static SCHEME_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("valid regex"));

const PRODUCTS_MARKER: &str = r#""products":["#;
const PRODUCT_VARIANTS_MARKER: &str = r#""productVariants":["#;

/// Result of extracting one page, with the per-stage counts kept for logging.
#[derive(Debug, Default)]
pub struct PageExtraction {
    pub products: Vec<ScrapedProduct>,
    /// Raw entries found in the `meta` products array.
    pub meta_products_found: usize,
    /// Distinct product ids with a valid image URL.
    pub image_mappings: usize,
}

/// Extract every product on the page, joined with its image URL.
///
/// `origin` is the storefront's scheme and host (e.g. `https://rehabclo.cl`)
/// used to absolutize relative image paths. Never fails: a page without the
/// `meta` block yields no products.
#[must_use]
pub fn extract_products(html: &str, origin: &str) -> Vec<ScrapedProduct> {
    extract_page(html, origin).products
}

/// Like [`extract_products`] but also reports how much each stage found.
#[must_use]
pub fn extract_page(html: &str, origin: &str) -> PageExtraction {
    let raw_products = extract_meta_products(html);
    let images = extract_image_lookup(html, origin);

    let products: Vec<ScrapedProduct> = raw_products
        .iter()
        .filter_map(|raw| build_product(raw, &images))
        .collect();

    tracing::debug!(
        meta_products = raw_products.len(),
        image_mappings = images.len(),
        products = products.len(),
        "page extraction complete"
    );

    PageExtraction {
        meta_products_found: raw_products.len(),
        image_mappings: images.len(),
        products,
    }
}

/// Raw product objects from the `var meta = {...}` assignment.
///
/// Returns an empty list when the assignment is absent, unterminated, or
/// not valid JSON.
pub(crate) fn extract_meta_products(html: &str) -> Vec<Value> {
    let Some(blob) = find_embedded_object(html, &META_ASSIGN_RE, PRODUCTS_MARKER) else {
        tracing::debug!("no meta products block on page");
        return Vec::new();
    };

    match serde_json::from_str::<Value>(blob) {
        Ok(meta) => match meta.get("products") {
            Some(Value::Array(products)) => products.clone(),
            _ => Vec::new(),
        },
        Err(e) => {
            tracing::warn!(error = %e, "meta products block is not valid JSON");
            Vec::new()
        }
    }
}

/// Product id to absolute image URL, from the `collection_viewed` event.
///
/// Entries without a product id, without an image path, or whose path does
/// not normalize to an absolute URL are skipped. When a product appears
/// more than once the last entry wins.
pub(crate) fn extract_image_lookup(html: &str, origin: &str) -> HashMap<i64, String> {
    let mut lookup = HashMap::new();

    let Some(blob) = find_embedded_object(html, &COLLECTION_VIEWED_RE, PRODUCT_VARIANTS_MARKER)
    else {
        tracing::warn!("collection_viewed event not found on page");
        return lookup;
    };

    let event = match serde_json::from_str::<Value>(blob) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(error = %e, "collection_viewed event is not valid JSON");
            return lookup;
        }
    };

    let variants = event
        .pointer("/collection/productVariants")
        .or_else(|| event.get("productVariants"))
        .and_then(Value::as_array);

    for entry in variants.into_iter().flatten() {
        let Some(product_id) = entry.pointer("/product/id").and_then(integer_from_value) else {
            continue;
        };
        let Some(src) = entry
            .pointer("/image/src")
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
        else {
            continue;
        };

        match normalize_image_url(src, origin) {
            Some(url) => {
                lookup.insert(product_id, url);
            }
            None => {
                tracing::warn!(product_id, src, "skipping invalid image URL");
            }
        }
    }

    lookup
}

/// Turn an image path from the page into an absolute URL.
///
/// - `//cdn/x.jpg` gets an `https:` prefix
/// - `/x.jpg` is joined to `origin`
/// - `x.jpg` (no scheme) is joined to `origin` with one `/`
/// - anything with a scheme passes through
///
/// Returns `None` unless the result has both a scheme and a host.
#[must_use]
pub fn normalize_image_url(src: &str, origin: &str) -> Option<String> {
    let src = src.trim();
    if src.is_empty() {
        return None;
    }
    let origin = origin.trim_end_matches('/');

    let candidate = if src.starts_with("//") {
        format!("https:{src}")
    } else if src.starts_with('/') {
        format!("{origin}{src}")
    } else if SCHEME_RE.is_match(src) {
        src.to_string()
    } else {
        format!("{origin}/{}", src.trim_start_matches('/'))
    };

    let parsed = reqwest::Url::parse(&candidate).ok()?;
    if parsed.scheme().is_empty() || !parsed.has_host() {
        return None;
    }
    Some(candidate)
}

/// Display name for a raw product.
///
/// Tries `title`, `name`, then `product_title`; then the first variant's
/// `name` up to `" - "`; finally `"Product {id}"`.
#[must_use]
pub fn resolve_display_name(raw: &Value, id: i64) -> String {
    for field in ["title", "name", "product_title"] {
        if let Some(name) = raw
            .get(field)
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
        {
            return name.to_string();
        }
    }

    if let Some((left, _)) = raw
        .pointer("/variants/0/name")
        .and_then(Value::as_str)
        .and_then(|n| n.split_once(" - "))
    {
        let left = left.trim();
        if !left.is_empty() {
            return left.to_string();
        }
    }

    format!("Product {id}")
}

fn build_product(raw: &Value, images: &HashMap<i64, String>) -> Option<ScrapedProduct> {
    let Some(id) = raw
        .get("id")
        .and_then(integer_from_value)
        .filter(|id| *id != 0)
    else {
        tracing::warn!("skipping meta product without an id");
        return None;
    };

    let title = resolve_display_name(raw, id);
    let text = |key: &str| {
        raw.get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };

    let mut variants = Vec::new();
    for (index, item) in raw
        .get("variants")
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
        .enumerate()
    {
        match ScrapedVariant::from_value(item) {
            Ok(v) => variants.push(v),
            Err(reason) => {
                tracing::warn!(
                    product_id = id,
                    index,
                    %reason,
                    "skipping product with malformed variant"
                );
                return None;
            }
        }
    }

    let image_url = images.get(&id).cloned().unwrap_or_default();
    if image_url.is_empty() {
        tracing::debug!(product_id = id, title = %title, "no image for product");
    }

    Some(ScrapedProduct {
        id,
        gid: text("gid"),
        vendor: text("vendor"),
        product_type: text("type"),
        title,
        variants,
        image_url,
    })
}

/// Locate the first `{...}` object that follows a match of `start_re` and
/// contains `marker`.
///
/// `start_re` must end on the opening brace.
fn find_embedded_object<'a>(html: &'a str, start_re: &Regex, marker: &str) -> Option<&'a str> {
    for m in start_re.find_iter(html) {
        let brace = m.end() - 1;
        match extract_balanced_object(&html[brace..]) {
            Some(obj) if obj.contains(marker) => return Some(obj),
            Some(_) => {}
            None => {
                tracing::warn!(offset = brace, "unterminated embedded JSON object");
            }
        }
    }
    None
}

/// Try to extract a balanced JSON object from the start of `s`.
///
/// Scans `s` character-by-character tracking brace depth, respecting
/// string literals and escape sequences. Returns the shortest prefix of `s`
/// that forms a complete `{...}` object, or `None` if the object is
/// unterminated. Only `}` at depth 0 triggers a return, so `{42]` is never
/// accepted.
pub(crate) fn extract_balanced_object(s: &str) -> Option<&str> {
    if !s.starts_with('{') {
        return None;
    }
    let mut depth: i32 = 0;
    let mut in_string = false;
    let mut escape = false;
    for (i, c) in s.char_indices() {
        if escape {
            escape = false;
            continue;
        }
        if in_string {
            match c {
                '\\' => escape = true,
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }
        match c {
            '"' => in_string = true,
            '[' | '{' => depth += 1,
            ']' => depth -= 1,
            '}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(&s[..=i]);
                }
            }
            _ => {}
        }
    }
    None
}

#[cfg(test)]
#[path = "extract_test.rs"]
mod tests;
