//! Checkout assembly
//!
//! A checkout moves `Collecting -> Validated -> Submitting` and ends either
//! `Confirmed` or back in `Collecting` with the failure message kept for display.
//! Editing the form at any point returns it to `Collecting`.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::aggregates::{AddressInfo, Cart, OrderDraft, OrderInitiation, OrderPayload};
use crate::domain::value_objects::{CityTier, ShippingSelection};
use crate::pricing::{AppliedCoupon, PricingEngine, ShippingRates};
use crate::remote::OrderGateway;
use crate::Result;

const MIN_NAME_LEN: usize = 2;
const MIN_PHONE_LEN: usize = 10;

/// Precondition failures, each with its own user-facing message.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckoutError {
    #[error("Please enter your email address.")]
    MissingEmail,
    #[error("Please enter a valid email address.")]
    InvalidEmail,
    #[error("Please select a delivery address.")]
    NoAddressSelected,
    #[error("Please enter your full name (at least 2 characters).")]
    NameTooShort,
    #[error("Please enter your street address.")]
    MissingAddressLine,
    #[error("Please enter your city.")]
    MissingCity,
    #[error("Please enter a valid phone number (at least 10 digits).")]
    PhoneTooShort,
    #[error("Please choose a shipping area.")]
    MissingCityTier,
    #[error("Please choose a delivery zone for {0}.")]
    MissingSubLocation(CityTier),
    #[error("{sub_location} is not a delivery zone of {city_tier}.")]
    UnknownSubLocation { city_tier: CityTier, sub_location: String },
    #[error("Your cart is empty.")]
    EmptyCart,
    #[error("Checkout details must be confirmed before placing the order.")]
    NotValidated,
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GuestAddress {
    #[serde(default)]
    pub full_name: String,
    #[serde(default)]
    pub address_line: String,
    #[serde(default)]
    pub city: String,
    #[serde(default)]
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
}

/// An address from the signed-in user's address book.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedAddress {
    pub id: String,
    pub full_name: String,
    pub address_line: String,
    pub city: String,
    pub phone: String,
    #[serde(default)]
    pub notes: Option<String>,
}

impl From<&SavedAddress> for AddressInfo {
    fn from(a: &SavedAddress) -> Self {
        Self {
            address_id: Some(a.id.clone()), full_name: a.full_name.clone(), address_line: a.address_line.clone(),
            city: a.city.clone(), phone: a.phone.clone(), notes: a.notes.clone(),
        }
    }
}

impl From<&GuestAddress> for AddressInfo {
    fn from(a: &GuestAddress) -> Self {
        Self {
            address_id: None, full_name: a.full_name.trim().to_string(), address_line: a.address_line.trim().to_string(),
            city: a.city.trim().to_string(), phone: a.phone.trim().to_string(), notes: a.notes.clone(),
        }
    }
}

/// Shipping choice as entered; either half may still be missing.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingChoice {
    #[serde(default)]
    pub city_tier: Option<CityTier>,
    #[serde(default)]
    pub sub_location: Option<String>,
}

impl ShippingChoice {
    /// The selection to price, once a tier has been picked.
    pub fn selection(&self) -> Option<ShippingSelection> {
        let city_tier = self.city_tier?;
        let sub_location = if city_tier.requires_sub_location() { self.sub_location.clone() } else { None };
        Some(ShippingSelection { city_tier, sub_location })
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckoutForm {
    /// Present for signed-in shoppers.
    #[serde(default)]
    pub owner_id: Option<String>,
    #[serde(default)]
    pub contact_email: String,
    /// Account display name, used for signed-in shoppers.
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub selected_address: Option<SavedAddress>,
    #[serde(default)]
    pub guest_address: GuestAddress,
    #[serde(default)]
    pub shipping: ShippingChoice,
}

impl CheckoutForm {
    pub fn is_guest(&self) -> bool { self.owner_id.is_none() }

    fn customer_display_name(&self) -> String {
        if self.is_guest() {
            return self.guest_address.full_name.trim().to_string();
        }
        self.customer_name
            .as_deref()
            .map(str::trim)
            .filter(|name| !name.is_empty())
            .map(str::to_string)
            .or_else(|| self.selected_address.as_ref().map(|a| a.full_name.clone()))
            .unwrap_or_default()
    }

    fn address_info(&self) -> Option<AddressInfo> {
        if self.is_guest() {
            Some(AddressInfo::from(&self.guest_address))
        } else {
            self.selected_address.as_ref().map(AddressInfo::from)
        }
    }
}

/// Checks the form in order and reports only the first failure.
pub fn validate_form(form: &CheckoutForm, rates: &ShippingRates) -> std::result::Result<(), CheckoutError> {
    let email = form.contact_email.trim();
    if email.is_empty() {
        return Err(CheckoutError::MissingEmail);
    }
    if !validator::validate_email(email) {
        return Err(CheckoutError::InvalidEmail);
    }

    if form.is_guest() {
        let a = &form.guest_address;
        if a.full_name.trim().chars().count() < MIN_NAME_LEN { return Err(CheckoutError::NameTooShort); }
        if a.address_line.trim().is_empty() { return Err(CheckoutError::MissingAddressLine); }
        if a.city.trim().is_empty() { return Err(CheckoutError::MissingCity); }
        if a.phone.trim().chars().count() < MIN_PHONE_LEN { return Err(CheckoutError::PhoneTooShort); }
    } else if form.selected_address.is_none() {
        return Err(CheckoutError::NoAddressSelected);
    }

    let city_tier = form.shipping.city_tier.ok_or(CheckoutError::MissingCityTier)?;
    if city_tier.requires_sub_location() {
        let sub_location = form.shipping.sub_location.as_deref().map(str::trim).unwrap_or_default();
        if sub_location.is_empty() {
            return Err(CheckoutError::MissingSubLocation(city_tier));
        }
        if !rates.knows_sub_location(city_tier, sub_location) {
            return Err(CheckoutError::UnknownSubLocation { city_tier, sub_location: sub_location.to_string() });
        }
    }
    Ok(())
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CheckoutPhase {
    Collecting,
    Validated,
    Submitting,
    Confirmed(OrderInitiation),
}

pub struct Checkout {
    form: CheckoutForm,
    pricing: PricingEngine,
    phase: CheckoutPhase,
    last_error: Option<String>,
}

impl Checkout {
    pub fn new(form: CheckoutForm, pricing: PricingEngine) -> Self {
        Self { form, pricing, phase: CheckoutPhase::Collecting, last_error: None }
    }

    pub fn form(&self) -> &CheckoutForm { &self.form }
    pub fn phase(&self) -> &CheckoutPhase { &self.phase }
    pub fn last_error(&self) -> Option<&str> { self.last_error.as_deref() }

    /// Opens the form for editing, which sends the checkout back to `Collecting`.
    pub fn edit(&mut self) -> &mut CheckoutForm {
        self.phase = CheckoutPhase::Collecting;
        &mut self.form
    }

    pub fn validate(&mut self) -> std::result::Result<(), CheckoutError> {
        match validate_form(&self.form, self.pricing.rates()) {
            Ok(()) => {
                self.phase = CheckoutPhase::Validated;
                self.last_error = None;
                Ok(())
            }
            Err(e) => {
                self.phase = CheckoutPhase::Collecting;
                self.last_error = Some(e.to_string());
                Err(e)
            }
        }
    }

    /// Totals here are advisory. Guest lines carry the prices captured in their
    /// product snapshots, so the order API re-prices every line before charging.
    pub fn build_order_payload(&self, cart: &Cart, coupon: Option<&AppliedCoupon>) -> std::result::Result<OrderPayload, CheckoutError> {
        if self.phase != CheckoutPhase::Validated {
            return Err(CheckoutError::NotValidated);
        }
        if cart.is_empty() {
            return Err(CheckoutError::EmptyCart);
        }
        let selection = self.form.shipping.selection().ok_or(CheckoutError::MissingCityTier)?;
        let address_info = self.form.address_info().ok_or(CheckoutError::NoAddressSelected)?;
        let totals = self.pricing.quote(cart.items(), Some(&selection), coupon);
        Ok(OrderPayload::assemble(OrderDraft {
            owner_id: self.form.owner_id.clone(),
            line_items: cart.items().to_vec(),
            address_info,
            shipping_label: selection.label(),
            totals,
            contact_email: self.form.contact_email.trim().to_string(),
            customer_display_name: self.form.customer_display_name(),
            coupon_code: coupon.map(|c| c.code.clone()),
        }))
    }

    /// Hands the payload to the order gateway. Failures are not retried.
    pub async fn submit(&mut self, gateway: &dyn OrderGateway, payload: &OrderPayload) -> Result<OrderInitiation> {
        if self.phase != CheckoutPhase::Validated {
            return Err(CheckoutError::NotValidated.into());
        }
        self.phase = CheckoutPhase::Submitting;
        match gateway.create_order(payload).await {
            Ok(initiation) => {
                tracing::info!(order_ref = %payload.order_ref, total = %payload.totals.total, guest = payload.is_guest(), "order submitted");
                self.phase = CheckoutPhase::Confirmed(initiation.clone());
                Ok(initiation)
            }
            Err(e) => {
                tracing::warn!(order_ref = %payload.order_ref, error = %e, "order submission failed");
                self.phase = CheckoutPhase::Collecting;
                self.last_error = Some(e.to_string());
                Err(e.into())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::aggregates::ProductSnapshot;
    use crate::domain::value_objects::{LineKey, Quantity};
    use crate::remote::InMemoryOrderGateway;
    use crate::StorefrontError;
    use rust_decimal::Decimal;

    fn guest_form() -> CheckoutForm {
        CheckoutForm {
            contact_email: "ada@example.com".into(),
            guest_address: GuestAddress {
                full_name: "Ada Lovelace".into(), address_line: "12 Analytical Row".into(),
                city: "London".into(), phone: "01234567890".into(), notes: None,
            },
            shipping: ShippingChoice { city_tier: Some(CityTier::MetroA), sub_location: Some("Zone2".into()) },
            ..Default::default()
        }
    }

    fn account_form() -> CheckoutForm {
        CheckoutForm {
            owner_id: Some("U1".into()),
            contact_email: "grace@example.com".into(),
            customer_name: Some("Grace".into()),
            selected_address: Some(SavedAddress {
                id: "A1".into(), full_name: "Grace Hopper".into(), address_line: "1 Harbor".into(),
                city: "Arlington".into(), phone: "5550001111".into(), notes: None,
            }),
            shipping: ShippingChoice { city_tier: Some(CityTier::Other), sub_location: None },
            ..Default::default()
        }
    }

    fn cart() -> Cart {
        let mut cart = Cart::guest();
        let snapshot = ProductSnapshot { price: Decimal::new(250, 0), sale_price: Some(Decimal::new(200, 0)), ..Default::default() };
        cart.add_item(&LineKey::new("P1", Some("M")), Quantity::new(2).unwrap(), &snapshot);
        cart
    }

    fn check(form: &CheckoutForm) -> std::result::Result<(), CheckoutError> {
        validate_form(form, &ShippingRates::default())
    }

    #[test]
    fn test_valid_forms_pass() {
        assert_eq!(check(&guest_form()), Ok(()));
        assert_eq!(check(&account_form()), Ok(()));
    }

    #[test]
    fn test_missing_email_reported_first() {
        let form = CheckoutForm::default();
        assert_eq!(check(&form), Err(CheckoutError::MissingEmail));
        let form = CheckoutForm { owner_id: Some("U1".into()), ..Default::default() };
        assert_eq!(check(&form), Err(CheckoutError::MissingEmail));
    }

    #[test]
    fn test_each_failure_has_its_own_message() {
        let mut cases = vec![];
        let mut f = guest_form(); f.contact_email = "not-an-email".into(); cases.push((f, CheckoutError::InvalidEmail));
        let mut f = guest_form(); f.guest_address.full_name = " A ".into(); cases.push((f, CheckoutError::NameTooShort));
        let mut f = guest_form(); f.guest_address.address_line = "  ".into(); cases.push((f, CheckoutError::MissingAddressLine));
        let mut f = guest_form(); f.guest_address.city.clear(); cases.push((f, CheckoutError::MissingCity));
        let mut f = guest_form(); f.guest_address.phone = "12345".into(); cases.push((f, CheckoutError::PhoneTooShort));
        let mut f = guest_form(); f.shipping.city_tier = None; cases.push((f, CheckoutError::MissingCityTier));
        let mut f = guest_form(); f.shipping.sub_location = None; cases.push((f, CheckoutError::MissingSubLocation(CityTier::MetroA)));
        let mut f = guest_form(); f.shipping.city_tier = Some(CityTier::MetroB); f.shipping.sub_location = Some("Zone3".into());
        cases.push((f, CheckoutError::UnknownSubLocation { city_tier: CityTier::MetroB, sub_location: "Zone3".into() }));
        let mut f = account_form(); f.selected_address = None; cases.push((f, CheckoutError::NoAddressSelected));

        let mut messages = std::collections::HashSet::new();
        for (form, expected) in cases {
            let err = check(&form).unwrap_err();
            assert_eq!(err, expected);
            assert!(messages.insert(err.to_string()), "duplicate message for {expected:?}");
        }
    }

    #[test]
    fn test_address_checked_before_shipping() {
        let mut form = guest_form();
        form.guest_address.city.clear();
        form.shipping = ShippingChoice::default();
        assert_eq!(check(&form), Err(CheckoutError::MissingCity));
    }

    #[test]
    fn test_payload_requires_validation() {
        let mut checkout = Checkout::new(guest_form(), PricingEngine::default());
        assert_eq!(checkout.build_order_payload(&cart(), None), Err(CheckoutError::NotValidated));
        checkout.validate().unwrap();
        assert_eq!(checkout.phase(), &CheckoutPhase::Validated);
        checkout.edit().contact_email = "ada@example.org".into();
        assert_eq!(checkout.phase(), &CheckoutPhase::Collecting);
        assert_eq!(checkout.build_order_payload(&cart(), None), Err(CheckoutError::NotValidated));
    }

    #[test]
    fn test_failed_validation_keeps_message() {
        let mut form = guest_form();
        form.contact_email.clear();
        let mut checkout = Checkout::new(form, PricingEngine::default());
        assert!(checkout.validate().is_err());
        assert_eq!(checkout.phase(), &CheckoutPhase::Collecting);
        assert_eq!(checkout.last_error(), Some("Please enter your email address."));
    }

    #[test]
    fn test_guest_payload() {
        let mut checkout = Checkout::new(guest_form(), PricingEngine::default());
        checkout.validate().unwrap();
        let coupon = AppliedCoupon { code: "WELCOME".into(), discount_amount: Decimal::new(100, 0) };
        let payload = checkout.build_order_payload(&cart(), Some(&coupon)).unwrap();
        assert_eq!(payload.owner_id, None);
        assert_eq!(payload.line_items.len(), 1);
        assert_eq!(payload.shipping_label, "metroA - Zone2");
        assert_eq!(payload.totals.subtotal, Decimal::new(400, 0));
        assert_eq!(payload.totals.shipping_fee, Decimal::new(350, 0));
        assert_eq!(payload.totals.total, Decimal::new(650, 0));
        assert_eq!(payload.customer_display_name, "Ada Lovelace");
        assert_eq!(payload.coupon_code.as_deref(), Some("WELCOME"));
        assert_eq!(payload.address_info.city, "London");
        assert_eq!(payload.address_info.address_id, None);
    }

    #[test]
    fn test_account_payload_uses_saved_address() {
        let mut checkout = Checkout::new(account_form(), PricingEngine::default());
        checkout.validate().unwrap();
        let payload = checkout.build_order_payload(&cart(), None).unwrap();
        assert_eq!(payload.owner_id.as_deref(), Some("U1"));
        assert_eq!(payload.address_info.address_id.as_deref(), Some("A1"));
        assert_eq!(payload.customer_display_name, "Grace");
        assert_eq!(payload.shipping_label, "other");
        assert_eq!(payload.totals.shipping_fee, Decimal::new(500, 0));
        assert_eq!(payload.coupon_code, None);
    }

    #[test]
    fn test_empty_cart_has_no_payload() {
        let mut checkout = Checkout::new(guest_form(), PricingEngine::default());
        checkout.validate().unwrap();
        assert_eq!(checkout.build_order_payload(&Cart::guest(), None), Err(CheckoutError::EmptyCart));
    }

    #[tokio::test]
    async fn test_submit_success_confirms() {
        let gateway = InMemoryOrderGateway::new();
        let mut checkout = Checkout::new(guest_form(), PricingEngine::default());
        checkout.validate().unwrap();
        let payload = checkout.build_order_payload(&cart(), None).unwrap();
        let initiation = checkout.submit(&gateway, &payload).await.unwrap();
        assert!(initiation.approval_url.is_some());
        assert_eq!(checkout.phase(), &CheckoutPhase::Confirmed(initiation));
        assert_eq!(gateway.orders().await, vec![payload]);
    }

    #[tokio::test]
    async fn test_submit_failure_returns_to_collecting() {
        let gateway = InMemoryOrderGateway::new();
        gateway.set_failure(Some("payment declined")).await;
        let mut checkout = Checkout::new(guest_form(), PricingEngine::default());
        checkout.validate().unwrap();
        let payload = checkout.build_order_payload(&cart(), None).unwrap();
        let err = checkout.submit(&gateway, &payload).await.unwrap_err();
        assert!(matches!(err, StorefrontError::Remote(_)));
        assert_eq!(checkout.phase(), &CheckoutPhase::Collecting);
        assert_eq!(checkout.last_error(), Some("request rejected: payment declined"));
        assert!(gateway.orders().await.is_empty());
        assert!(matches!(checkout.submit(&gateway, &payload).await, Err(StorefrontError::Checkout(CheckoutError::NotValidated))));
    }
}
