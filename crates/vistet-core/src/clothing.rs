use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::CoreError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ClothingType {
    Shirt,
    Pants,
    Dress,
    Shoes,
    Jacket,
    Sweater,
    Shorts,
    Skirt,
    Blouse,
    Hoodie,
    Coat,
    Jeans,
    Accessories,
    Polera,
    Other,
}

impl ClothingType {
    pub const ALL: [ClothingType; 15] = [
        ClothingType::Shirt,
        ClothingType::Pants,
        ClothingType::Dress,
        ClothingType::Shoes,
        ClothingType::Jacket,
        ClothingType::Sweater,
        ClothingType::Shorts,
        ClothingType::Skirt,
        ClothingType::Blouse,
        ClothingType::Hoodie,
        ClothingType::Coat,
        ClothingType::Jeans,
        ClothingType::Accessories,
        ClothingType::Polera,
        ClothingType::Other,
    ];

    /// Stored form, matching the `clothes.type` check constraint.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ClothingType::Shirt => "SHIRT",
            ClothingType::Pants => "PANTS",
            ClothingType::Dress => "DRESS",
            ClothingType::Shoes => "SHOES",
            ClothingType::Jacket => "JACKET",
            ClothingType::Sweater => "SWEATER",
            ClothingType::Shorts => "SHORTS",
            ClothingType::Skirt => "SKIRT",
            ClothingType::Blouse => "BLOUSE",
            ClothingType::Hoodie => "HOODIE",
            ClothingType::Coat => "COAT",
            ClothingType::Jeans => "JEANS",
            ClothingType::Accessories => "ACCESSORIES",
            ClothingType::Polera => "POLERA",
            ClothingType::Other => "OTHER",
        }
    }

    /// Human label used as the key of the per-type statistics.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            ClothingType::Shirt => "Shirt",
            ClothingType::Pants => "Pants",
            ClothingType::Dress => "Dress",
            ClothingType::Shoes => "Shoes",
            ClothingType::Jacket => "Jacket",
            ClothingType::Sweater => "Sweater",
            ClothingType::Shorts => "Shorts",
            ClothingType::Skirt => "Skirt",
            ClothingType::Blouse => "Blouse",
            ClothingType::Hoodie => "Hoodie",
            ClothingType::Coat => "Coat",
            ClothingType::Jeans => "Jeans",
            ClothingType::Accessories => "Accessories",
            ClothingType::Polera => "Polera",
            ClothingType::Other => "Other",
        }
    }
}

impl std::fmt::Display for ClothingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ClothingType {
    type Err = CoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ClothingType::ALL
            .into_iter()
            .find(|t| t.as_str() == s)
            .ok_or_else(|| CoreError::InvalidClothingType(s.to_string()))
    }
}

/// Vendor category labels seen on the storefront and the type each one maps to.
///
/// Matching is exact. New labels get a new row here.
pub const VENDOR_TYPE_TABLE: &[(&str, ClothingType)] = &[
    ("Shorts", ClothingType::Shorts),
    ("Pantalón", ClothingType::Pants),
    ("Polera", ClothingType::Polera),
    ("Accesorio", ClothingType::Accessories),
];

/// Translate a vendor category label into a [`ClothingType`].
///
/// Labels missing from [`VENDOR_TYPE_TABLE`] map to [`ClothingType::Other`].
#[must_use]
pub fn map_vendor_type(label: &str) -> ClothingType {
    VENDOR_TYPE_TABLE
        .iter()
        .find(|(vendor_label, _)| *vendor_label == label)
        .map_or(ClothingType::Other, |(_, t)| *t)
}
