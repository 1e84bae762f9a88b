//! Pricing engine
//!
//! Pure functions from cart lines, shipping choice and coupon to [`OrderTotals`].
//! Nothing here performs I/O, so quotes can be recomputed on every request.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::domain::aggregates::CartLineItem;
use crate::domain::value_objects::{CityTier, ShippingSelection};

/// Coupon already validated by the coupon service; the amount is taken as-is.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedCoupon {
    pub code: String,
    #[serde(default)]
    pub discount_amount: Decimal,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderTotals {
    pub subtotal: Decimal,
    pub shipping_fee: Decimal,
    pub discount: Decimal,
    pub total: Decimal,
}

/// Base fee for a zoned metro plus per-zone surcharges.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MetroRate {
    pub base: Decimal,
    #[serde(default)]
    pub surcharges: BTreeMap<String, Decimal>,
}

impl MetroRate {
    fn new(base: i64, zones: &[(&str, i64)]) -> Self {
        Self {
            base: Decimal::new(base, 0),
            surcharges: zones.iter().map(|(z, s)| (z.to_string(), Decimal::new(*s, 0))).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingRates {
    pub metro_a: MetroRate,
    pub metro_b: MetroRate,
    pub other_flat: Decimal,
}

impl Default for ShippingRates {
    fn default() -> Self {
        Self {
            metro_a: MetroRate::new(300, &[("Zone1", 0), ("Zone2", 50), ("Zone3", 100)]),
            metro_b: MetroRate::new(350, &[("Zone1", 0), ("Zone2", 60)]),
            other_flat: Decimal::new(500, 0),
        }
    }
}

impl ShippingRates {
    pub fn metro(&self, tier: CityTier) -> Option<&MetroRate> {
        match tier {
            CityTier::MetroA => Some(&self.metro_a),
            CityTier::MetroB => Some(&self.metro_b),
            CityTier::Other => None,
        }
    }

    /// Whether `sub_location` is one of the zones of `tier`.
    pub fn knows_sub_location(&self, tier: CityTier, sub_location: &str) -> bool {
        self.metro(tier).is_some_and(|rate| rate.surcharges.contains_key(sub_location))
    }
}

/// Sale price when it is set and positive, list price otherwise.
pub fn effective_unit_price(item: &CartLineItem) -> Decimal {
    match item.sale_price {
        Some(sale) if sale > Decimal::ZERO => sale,
        _ => item.price,
    }
}

pub fn subtotal(items: &[CartLineItem]) -> Decimal {
    items.iter().fold(Decimal::ZERO, |acc, item| {
        acc.saturating_add(effective_unit_price(item).saturating_mul(Decimal::from(item.quantity)))
    })
}

/// Coupon amount, never negative.
pub fn discount(coupon: Option<&AppliedCoupon>) -> Decimal {
    coupon.map_or(Decimal::ZERO, |c| c.discount_amount.max(Decimal::ZERO))
}

/// Grand total, floored at zero.
pub fn total(subtotal: Decimal, shipping_fee: Decimal, discount: Decimal) -> Decimal {
    subtotal.saturating_add(shipping_fee).saturating_sub(discount).max(Decimal::ZERO)
}

#[derive(Clone, Debug, Default)]
pub struct PricingEngine {
    rates: ShippingRates,
}

impl PricingEngine {
    pub fn new(rates: ShippingRates) -> Self { Self { rates } }

    pub fn rates(&self) -> &ShippingRates { &self.rates }

    /// Zero until a tier is chosen. Unknown zones add no surcharge.
    pub fn shipping_fee(&self, selection: Option<&ShippingSelection>) -> Decimal {
        let Some(selection) = selection else { return Decimal::ZERO };
        match self.rates.metro(selection.city_tier) {
            Some(rate) => {
                let surcharge = selection
                    .sub_location
                    .as_deref()
                    .and_then(|sub| rate.surcharges.get(sub).copied())
                    .unwrap_or(Decimal::ZERO);
                rate.base.saturating_add(surcharge)
            }
            None => self.rates.other_flat,
        }
    }

    pub fn quote(&self, items: &[CartLineItem], selection: Option<&ShippingSelection>, coupon: Option<&AppliedCoupon>) -> OrderTotals {
        let subtotal = subtotal(items);
        let shipping_fee = self.shipping_fee(selection);
        let discount = discount(coupon);
        OrderTotals { subtotal, shipping_fee, discount, total: total(subtotal, shipping_fee, discount) }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(price: i64, sale: Option<i64>, quantity: u32) -> CartLineItem {
        CartLineItem {
            product_id: "P".into(), quantity,
            price: Decimal::new(price, 0), sale_price: sale.map(|s| Decimal::new(s, 0)),
            ..Default::default()
        }
    }

    fn coupon(amount: i64) -> AppliedCoupon { AppliedCoupon { code: "SAVE".into(), discount_amount: Decimal::new(amount, 0) } }

    #[test]
    fn test_effective_unit_price() {
        assert_eq!(effective_unit_price(&item(100, Some(80), 1)), Decimal::new(80, 0));
        assert_eq!(effective_unit_price(&item(100, Some(0), 1)), Decimal::new(100, 0));
        assert_eq!(effective_unit_price(&item(100, None, 1)), Decimal::new(100, 0));
        assert_eq!(effective_unit_price(&item(100, Some(-5), 1)), Decimal::new(100, 0));
    }

    #[test]
    fn test_subtotal_uses_sale_price_and_tolerates_zeroes() {
        let items = [item(100, Some(80), 2), item(50, None, 3), item(0, None, 0)];
        assert_eq!(subtotal(&items), Decimal::new(310, 0));
        assert_eq!(subtotal(&[]), Decimal::ZERO);
    }

    #[test]
    fn test_shipping_fee_tiers() {
        let engine = PricingEngine::default();
        let zone2 = ShippingSelection::metro(CityTier::MetroA, "Zone2");
        assert_eq!(engine.shipping_fee(Some(&zone2)), Decimal::new(350, 0));
        let unknown = ShippingSelection::metro(CityTier::MetroA, "Zone9");
        assert_eq!(engine.shipping_fee(Some(&unknown)), Decimal::new(300, 0));
        let other = ShippingSelection { city_tier: CityTier::Other, sub_location: Some("Zone2".into()) };
        assert_eq!(engine.shipping_fee(Some(&other)), Decimal::new(500, 0));
        assert_eq!(engine.shipping_fee(None), Decimal::ZERO);
    }

    #[test]
    fn test_total_floors_at_zero() {
        assert_eq!(total(Decimal::new(500, 0), Decimal::new(300, 0), Decimal::new(1000, 0)), Decimal::ZERO);
        for (s, sh, d) in [(0, 0, 1), (10, 0, 10), (10, 5, 16), (1, 1, 0)] {
            assert!(total(Decimal::new(s, 0), Decimal::new(sh, 0), Decimal::new(d, 0)) >= Decimal::ZERO);
        }
    }

    #[test]
    fn test_quote_with_coupon_exceeding_order() {
        let engine = PricingEngine::default();
        let totals = engine.quote(&[item(250, None, 2)], Some(&ShippingSelection::metro(CityTier::MetroA, "Zone1")), Some(&coupon(1000)));
        assert_eq!(totals.subtotal, Decimal::new(500, 0));
        assert_eq!(totals.shipping_fee, Decimal::new(300, 0));
        assert_eq!(totals.discount, Decimal::new(1000, 0));
        assert_eq!(totals.total, Decimal::ZERO);
    }

    #[test]
    fn test_negative_coupon_never_raises_total() {
        assert_eq!(discount(Some(&coupon(-50))), Decimal::ZERO);
        assert_eq!(discount(None), Decimal::ZERO);
        let totals = PricingEngine::default().quote(&[item(100, None, 1)], None, Some(&coupon(-50)));
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(100, 0));
    }

    #[test]
    fn test_quote_without_coupon() {
        let totals = PricingEngine::default().quote(&[item(100, Some(90), 1)], Some(&ShippingSelection::other()), None);
        assert_eq!(totals.discount, Decimal::ZERO);
        assert_eq!(totals.total, Decimal::new(590, 0));
    }

    #[test]
    fn test_rates_know_zones() {
        let rates = ShippingRates::default();
        assert!(rates.knows_sub_location(CityTier::MetroA, "Zone3"));
        assert!(!rates.knows_sub_location(CityTier::MetroB, "Zone3"));
        assert!(!rates.knows_sub_location(CityTier::Other, "Zone1"));
    }
}
