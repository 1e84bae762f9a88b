//! Cart Aggregate

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};
use crate::domain::value_objects::{LineKey, Quantity};

/// A cart owned either by a signed-in user or by an anonymous session.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cart {
    #[serde(default)]
    owner_id: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    items: Vec<CartLineItem>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CartLineItem {
    pub product_id: String,
    #[serde(default)]
    pub size: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub quantity: u32,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
}

/// Missing and `null` both decode to the type's default.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Display and price data captured when a guest adds a product.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductSnapshot {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub category: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub price: Decimal,
    #[serde(default)]
    pub sale_price: Option<Decimal>,
}

impl CartLineItem {
    pub fn from_snapshot(key: &LineKey, quantity: Quantity, snapshot: &ProductSnapshot) -> Self {
        Self {
            product_id: key.product_id.clone(), size: key.size.clone(), quantity: quantity.value(),
            title: snapshot.title.clone(), image: snapshot.image.clone(), category: snapshot.category.clone(),
            price: snapshot.price, sale_price: snapshot.sale_price,
        }
    }

    pub fn key(&self) -> LineKey { LineKey { product_id: self.product_id.clone(), size: self.size.clone() } }

    pub fn matches(&self, key: &LineKey) -> bool { self.product_id == key.product_id && self.size == key.size }
}

impl Cart {
    pub fn guest() -> Self { Self::default() }

    pub fn for_owner(owner_id: impl Into<String>) -> Self {
        Self { owner_id: Some(owner_id.into()), items: vec![] }
    }

    pub fn owner_id(&self) -> Option<&str> { self.owner_id.as_deref() }
    pub fn items(&self) -> &[CartLineItem] { &self.items }
    pub fn item_count(&self) -> usize { self.items.len() }
    pub fn is_empty(&self) -> bool { self.items.is_empty() }
    pub fn total_quantity(&self) -> u32 { self.items.iter().fold(0u32, |acc, i| acc.saturating_add(i.quantity)) }
    pub fn find(&self, key: &LineKey) -> Option<&CartLineItem> { self.items.iter().find(|i| i.matches(key)) }

    /// Adds `quantity` of the keyed product, merging into an existing line when one matches.
    pub fn add_item(&mut self, key: &LineKey, quantity: Quantity, snapshot: &ProductSnapshot) {
        if let Some(existing) = self.items.iter_mut().find(|i| i.matches(key)) {
            existing.quantity = existing.quantity.saturating_add(quantity.value());
        } else {
            self.items.push(CartLineItem::from_snapshot(key, quantity, snapshot));
        }
    }

    /// Sets the quantity of a line, dropping it when `quantity <= 0`.
    /// Returns false when no line matches.
    pub fn set_quantity(&mut self, key: &LineKey, quantity: i64) -> bool {
        let Some(pos) = self.items.iter().position(|i| i.matches(key)) else { return false };
        if quantity <= 0 {
            self.items.remove(pos);
        } else if let Some(item) = self.items.get_mut(pos) {
            item.quantity = u32::try_from(quantity).unwrap_or(u32::MAX);
        }
        true
    }

    /// Returns false when no line matches.
    pub fn remove_item(&mut self, key: &LineKey) -> bool {
        let before = self.items.len();
        self.items.retain(|i| !i.matches(key));
        self.items.len() != before
    }

    pub fn clear(&mut self) { self.items.clear(); }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot(price: i64) -> ProductSnapshot {
        ProductSnapshot { title: Some("Tee".into()), price: Decimal::new(price, 0), ..Default::default() }
    }

    #[test]
    fn test_add_merges_same_key() {
        let mut cart = Cart::guest();
        let key = LineKey::new("P1", Some("M"));
        cart.add_item(&key, Quantity::new(2).unwrap(), &snapshot(10));
        cart.add_item(&key, Quantity::new(1).unwrap(), &snapshot(10));
        cart.add_item(&LineKey::new("P1", Some("L")), Quantity::new(1).unwrap(), &snapshot(10));
        assert_eq!(cart.item_count(), 2);
        assert_eq!(cart.find(&key).unwrap().quantity, 3);
        assert_eq!(cart.total_quantity(), 4);
    }

    #[test]
    fn test_set_quantity_zero_removes_line() {
        let mut cart = Cart::guest();
        let key = LineKey::new("P1", None);
        cart.add_item(&key, Quantity::new(2).unwrap(), &snapshot(10));
        assert!(cart.set_quantity(&key, 5));
        assert_eq!(cart.find(&key).unwrap().quantity, 5);
        assert!(cart.set_quantity(&key, 0));
        assert!(cart.is_empty());
        assert!(!cart.set_quantity(&key, 1));
    }

    #[test]
    fn test_remove_item() {
        let mut cart = Cart::guest();
        let key = LineKey::new("P1", Some("S"));
        cart.add_item(&key, Quantity::new(1).unwrap(), &snapshot(10));
        assert!(cart.remove_item(&key));
        assert!(!cart.remove_item(&key));
    }

    #[test]
    fn test_decode_defaults_missing_fields() {
        let cart: Cart = serde_json::from_str(r#"{"items":[{"productId":"P1"}]}"#).unwrap();
        let item = &cart.items()[0];
        assert_eq!(item.quantity, 0);
        assert_eq!(item.price, Decimal::ZERO);
        assert_eq!(cart.owner_id(), None);
    }

    #[test]
    fn test_decode_null_price_and_quantity_as_zero() {
        let cart: Cart = serde_json::from_str(
            r#"{"items":[{"productId":"P1","quantity":2,"price":null},{"productId":"P2","quantity":null,"price":5,"salePrice":null}]}"#,
        ).unwrap();
        assert_eq!(cart.items()[0].price, Decimal::ZERO);
        assert_eq!(cart.items()[0].quantity, 2);
        assert_eq!(cart.items()[1].quantity, 0);
        assert_eq!(cart.items()[1].price, Decimal::new(5, 0));
        assert_eq!(cart.items()[1].sale_price, None);

        let empty: Cart = serde_json::from_str(r#"{"ownerId":null,"items":null}"#).unwrap();
        assert!(empty.is_empty());
        let snapshot: ProductSnapshot = serde_json::from_str(r#"{"price":null}"#).unwrap();
        assert_eq!(snapshot.price, Decimal::ZERO);
    }
}
