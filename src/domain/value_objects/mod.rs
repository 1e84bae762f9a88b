//! Value Objects for the storefront cart

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identity of a cart line: a product plus its optional size variant.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineKey {
    pub product_id: String,
    #[serde(default)]
    pub size: Option<String>,
}

impl LineKey {
    pub fn new(product_id: impl Into<String>, size: Option<&str>) -> Self {
        Self { product_id: product_id.into(), size: size.map(str::to_string) }
    }
    pub fn size(&self) -> Option<&str> { self.size.as_deref() }
}

impl fmt::Display for LineKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.size {
            Some(size) => write!(f, "{}/{}", self.product_id, size),
            None => write!(f, "{}", self.product_id),
        }
    }
}

/// Delivery region driving the shipping fee.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum CityTier {
    #[serde(rename = "metroA")]
    MetroA,
    #[serde(rename = "metroB")]
    MetroB,
    #[serde(rename = "other")]
    Other,
}

impl CityTier {
    /// Metro tiers are zoned and need a sub-location.
    pub fn requires_sub_location(&self) -> bool { !matches!(self, Self::Other) }
    pub fn as_str(&self) -> &'static str {
        match self { Self::MetroA => "metroA", Self::MetroB => "metroB", Self::Other => "other" }
    }
}

impl fmt::Display for CityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "{}", self.as_str()) }
}

/// A complete shipping choice. `sub_location` is ignored for [`CityTier::Other`].
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingSelection {
    pub city_tier: CityTier,
    #[serde(default)]
    pub sub_location: Option<String>,
}

impl ShippingSelection {
    pub fn metro(city_tier: CityTier, sub_location: impl Into<String>) -> Self {
        Self { city_tier, sub_location: Some(sub_location.into()) }
    }
    pub fn other() -> Self { Self { city_tier: CityTier::Other, sub_location: None } }

    /// Human readable label sent along with the order.
    pub fn label(&self) -> String {
        match (&self.city_tier, self.sub_location.as_deref()) {
            (CityTier::Other, _) | (_, None) => self.city_tier.to_string(),
            (tier, Some(sub)) => format!("{} - {}", tier, sub),
        }
    }
}

/// Quantity requested by an add operation; always at least one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Quantity(u32);

impl Quantity {
    pub fn new(value: u32) -> Result<Self, QuantityError> {
        if value == 0 { return Err(QuantityError::Zero); }
        Ok(Self(value))
    }
    pub fn value(&self) -> u32 { self.0 }
}

#[derive(Debug, Clone)] pub enum QuantityError { Zero }
impl std::error::Error for QuantityError {}
impl fmt::Display for QuantityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { write!(f, "Quantity must be at least 1") }
}
