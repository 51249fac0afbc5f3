use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::clothing::{map_vendor_type, ClothingType};
use crate::validate::{is_absolute_url, FieldErrors};

/// A product as published by the storefront, joined with its image URL.
///
/// This is the body of `POST /clothe/from-scraped/` and one entry of the
/// bulk endpoint's `products` array.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScrapedProduct {
    /// Vendor-assigned product id.
    pub id: i64,
    /// Namespaced vendor id, e.g. `"gid://shopify/Product/7731842056254"`.
    #[serde(default)]
    pub gid: String,
    #[serde(default)]
    pub vendor: String,
    /// Free-text vendor category, e.g. `"Shorts"` or `"Pantalón"`.
    #[serde(rename = "type", default)]
    pub product_type: String,
    pub title: String,
    #[serde(default)]
    pub variants: Vec<ScrapedVariant>,
    /// Absolute image URL, or empty when the page carried no image for this id.
    #[serde(default)]
    pub image_url: String,
}

/// One storefront variant.
///
/// The object is kept exactly as the storefront sent it; the typed
/// accessors read from it. Only `price` is validated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Map<String, Value>", into = "Map<String, Value>")]
pub struct ScrapedVariant {
    /// Price in minor currency units (centavos).
    price: i64,
    raw: Map<String, Value>,
}

impl ScrapedVariant {
    /// Parse one storefront variant object.
    ///
    /// A missing price counts as zero.
    ///
    /// # Errors
    ///
    /// Returns a message when `item` is not an object or its price is not
    /// an integer.
    pub fn from_value(item: &Value) -> Result<Self, String> {
        let Some(obj) = item.as_object() else {
            return Err("Expected a dictionary of items.".to_string());
        };
        Self::try_from(obj.clone())
    }

    /// Price in minor currency units.
    #[must_use]
    pub fn price(&self) -> i64 {
        self.price
    }

    #[must_use]
    pub fn id(&self) -> Option<i64> {
        self.raw.get("id").and_then(integer_from_value)
    }

    #[must_use]
    pub fn name(&self) -> Option<String> {
        self.raw.get("name").and_then(label_from_value)
    }

    /// Size label, e.g. `"S/28US"`.
    #[must_use]
    pub fn public_title(&self) -> Option<String> {
        self.raw.get("public_title").and_then(label_from_value)
    }

    #[must_use]
    pub fn sku(&self) -> Option<String> {
        self.raw.get("sku").and_then(label_from_value)
    }

    /// The object as received.
    #[must_use]
    pub fn as_map(&self) -> &Map<String, Value> {
        &self.raw
    }
}

impl TryFrom<Map<String, Value>> for ScrapedVariant {
    type Error = String;

    fn try_from(raw: Map<String, Value>) -> Result<Self, Self::Error> {
        let price = match raw.get("price") {
            None | Some(Value::Null) => 0,
            Some(v) => integer_from_value(v).ok_or("price must be an integer")?,
        };
        Ok(Self { price, raw })
    }
}

impl From<ScrapedVariant> for Map<String, Value> {
    fn from(variant: ScrapedVariant) -> Self {
        variant.raw
    }
}

/// Either a single price shared by every variant or the min/max across them.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum PriceRange {
    Single {
        #[serde(with = "rust_decimal::serde::float_option")]
        price: Option<Decimal>,
    },
    Range {
        #[serde(with = "rust_decimal::serde::float")]
        min_price: Decimal,
        #[serde(with = "rust_decimal::serde::float")]
        max_price: Decimal,
    },
}

impl ScrapedProduct {
    /// Validate a raw JSON entry and convert it.
    ///
    /// Every problem is reported under its field name so callers can return
    /// the whole map at once.
    ///
    /// # Errors
    ///
    /// Returns [`FieldErrors`] when the id is missing or not an integer, the
    /// title is blank, a text field has the wrong type, a variant is not an
    /// object with an integer price, or `image_url` is neither empty nor an
    /// absolute URL.
    pub fn from_value(value: &Value) -> Result<Self, FieldErrors> {
        let mut errors = FieldErrors::new();

        let Some(obj) = value.as_object() else {
            errors.add("non_field_errors", "Expected a JSON object.");
            return Err(errors);
        };

        let id = match obj.get("id") {
            None | Some(Value::Null) => {
                errors.add("id", "This field is required.");
                None
            }
            Some(v) => {
                let parsed = integer_from_value(v);
                if parsed.is_none() {
                    errors.add("id", "A valid integer is required.");
                }
                parsed
            }
        };

        let title = optional_text(obj, "title", &mut errors);
        if title.trim().is_empty() && !errors.contains("title") {
            errors.add("title", "This field may not be blank.");
        }
        let gid = optional_text(obj, "gid", &mut errors);
        let vendor = optional_text(obj, "vendor", &mut errors);
        let product_type = optional_text(obj, "type", &mut errors);

        let image_url = optional_text(obj, "image_url", &mut errors);
        if !image_url.is_empty() && !is_absolute_url(&image_url) {
            errors.add("image_url", "Enter a valid URL.");
        }

        let variants = match obj.get("variants") {
            None | Some(Value::Null) => Vec::new(),
            Some(Value::Array(items)) => {
                let mut parsed = Vec::with_capacity(items.len());
                for (i, item) in items.iter().enumerate() {
                    match ScrapedVariant::from_value(item) {
                        Ok(v) => parsed.push(v),
                        Err(message) => errors.add("variants", format!("Item {i}: {message}")),
                    }
                }
                parsed
            }
            Some(_) => {
                errors.add("variants", "Expected a list of items.");
                Vec::new()
            }
        };

        errors.into_result()?;

        Ok(Self {
            id: id.unwrap_or_default(),
            gid,
            vendor,
            product_type,
            title,
            variants,
            image_url,
        })
    }

    /// System clothing type for this product's vendor label.
    #[must_use]
    pub fn clothing_type(&self) -> ClothingType {
        map_vendor_type(&self.product_type)
    }

    /// First variant's price converted from minor to major units.
    ///
    /// `None` when the product has no variants.
    #[must_use]
    pub fn base_price(&self) -> Option<Decimal> {
        self.variants.first().map(|v| minor_to_major(v.price()))
    }

    /// The variant list as stored alongside the clothe, unchanged from the
    /// storefront.
    #[must_use]
    pub fn variants_json(&self) -> Value {
        Value::Array(
            self.variants
                .iter()
                .map(|v| Value::Object(v.as_map().clone()))
                .collect(),
        )
    }
}

/// Convert an integer minor-unit amount (centavos) to a two-decimal amount.
#[must_use]
pub fn minor_to_major(minor: i64) -> Decimal {
    Decimal::new(minor, 2)
}

/// Price range over a stored variant list.
///
/// Entries without an integer `price` are ignored.
#[must_use]
pub fn price_range(variants: &Value) -> PriceRange {
    let prices = variants
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.get("price").and_then(integer_from_value))
                .collect::<Vec<_>>()
        })
        .unwrap_or_default();

    let (Some(min), Some(max)) = (prices.iter().min(), prices.iter().max()) else {
        return PriceRange::Single { price: None };
    };
    if min == max {
        PriceRange::Single {
            price: Some(minor_to_major(*min)),
        }
    } else {
        PriceRange::Range {
            min_price: minor_to_major(*min),
            max_price: minor_to_major(*max),
        }
    }
}

/// Size labels of a stored variant list, in order, empty labels excluded.
#[must_use]
pub fn available_sizes(variants: &Value) -> Vec<String> {
    variants
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.get("public_title").and_then(label_from_value))
                .filter(|s| !s.is_empty())
                .collect()
        })
        .unwrap_or_default()
}

/// Integers arrive either as JSON numbers or as numeric strings.
#[must_use]
pub fn integer_from_value(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    }
}

/// Labels are usually strings, but numeric sizes (`32`) arrive as numbers.
fn label_from_value(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn optional_text(obj: &Map<String, Value>, field: &str, errors: &mut FieldErrors) -> String {
    match obj.get(field) {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => {
            errors.add(field, "Not a valid string.");
            String::new()
        }
    }
}

#[cfg(test)]
#[path = "scraped_test.rs"]
mod tests;
