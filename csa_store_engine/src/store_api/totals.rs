//! Cart totalling: items, discount, delivery fee. Pure functions so the checkout preview and the close job
//! cannot drift apart.

use std::collections::HashMap;

use csa_common::Money;

use crate::db_types::{CartLine, DiscountCode, MemberProfile};

/// Home-delivery fee configuration. `by_zip` overrides the default charge for specific zip codes.
#[derive(Debug, Clone)]
pub struct DeliveryFees {
    /// Orders at or above this amount ship free.
    pub free_threshold: Money,
    pub default_charge: Money,
    pub by_zip: HashMap<String, Money>,
}

impl Default for DeliveryFees {
    fn default() -> Self {
        Self { free_threshold: Money::from_dollars(125), default_charge: Money::from_dollars(5), by_zip: HashMap::new() }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CartTotals {
    pub item_total: Money,
    pub discount_total: Money,
    pub shipping_total: Money,
    pub total: Money,
}

/// A discount code together with the SKUs it is scoped to. An empty scope applies to the whole cart.
#[derive(Debug, Clone)]
pub struct ScopedDiscount {
    pub code: DiscountCode,
    pub scope_skus: Vec<String>,
}

impl ScopedDiscount {
    /// The reduction over these lines. A scoped code discounts each matching line per unit; an unscoped code
    /// discounts the item total once. Never more than the item total.
    pub fn reduction(&self, lines: &[CartLine], item_total: Money) -> Money {
        let raw = if self.scope_skus.is_empty() {
            self.code.calculate(item_total)
        } else {
            lines
                .iter()
                .filter(|l| self.scope_skus.contains(&l.sku))
                .map(|l| self.code.calculate(l.unit_price) * l.quantity)
                .fold(Money::default(), |acc, m| acc + m)
        };
        raw.min(item_total)
    }
}

pub fn cart_totals(
    lines: &[CartLine],
    discount: Option<&ScopedDiscount>,
    profile: &MemberProfile,
    fees: &DeliveryFees,
) -> CartTotals {
    let item_total = lines.iter().map(|l| l.total_price()).fold(Money::default(), |acc, m| acc + m);
    let discount_total = discount.map(|d| d.reduction(lines, item_total)).unwrap_or_default();
    let shipping_total = delivery_fee(item_total - discount_total, discount, profile, fees);
    CartTotals { item_total, discount_total, shipping_total, total: item_total - discount_total + shipping_total }
}

fn delivery_fee(
    discounted_total: Money,
    discount: Option<&ScopedDiscount>,
    profile: &MemberProfile,
    fees: &DeliveryFees,
) -> Money {
    if !profile.home_delivery {
        return Money::default();
    }
    if discount.map(|d| d.code.free_shipping).unwrap_or(false) || discounted_total >= fees.free_threshold {
        return Money::default();
    }
    profile
        .delivery_zip
        .as_ref()
        .and_then(|zip| fees.by_zip.get(zip))
        .copied()
        .unwrap_or(fees.default_charge)
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::test_utils::profile_fixture;

    fn line(sku: &str, unit_price: Money, quantity: i64) -> CartLine {
        CartLine {
            cart_item_id: 1,
            user_id: 1,
            variation_id: 1,
            product_id: 1,
            sku: sku.to_string(),
            description: sku.to_string(),
            category: "Vegetables".to_string(),
            unit_price,
            vendor_price: unit_price,
            quantity,
            in_inventory: false,
            is_frozen: false,
        }
    }

    fn percent_code(percent: i64) -> DiscountCode {
        DiscountCode {
            id: 1,
            code: "SAVE".into(),
            active: true,
            valid_from: None,
            valid_to: None,
            free_shipping: false,
            min_purchase: None,
            deduct: None,
            percent: Some(percent),
            target_total: None,
            uses_remaining: None,
        }
    }

    #[test]
    fn unscoped_discount_applies_to_item_total() {
        let lines = vec![line("A", Money::from_dollars(10), 2), line("B", Money::from_dollars(5), 1)];
        let discount = ScopedDiscount { code: percent_code(10), scope_skus: vec![] };
        let totals = cart_totals(&lines, Some(&discount), &profile_fixture(1), &DeliveryFees::default());
        assert_eq!(totals.item_total, Money::from_dollars(25));
        assert_eq!(totals.discount_total, Money::from_cents(250));
        assert_eq!(totals.total, Money::from_cents(2250));
    }

    #[test]
    fn scoped_discount_applies_per_matching_unit() {
        let lines = vec![line("A", Money::from_dollars(10), 2), line("B", Money::from_dollars(5), 1)];
        let discount = ScopedDiscount { code: percent_code(10), scope_skus: vec!["A".into()] };
        let totals = cart_totals(&lines, Some(&discount), &profile_fixture(1), &DeliveryFees::default());
        // 10% of $10, twice; B untouched
        assert_eq!(totals.discount_total, Money::from_dollars(2));
    }

    #[test]
    fn fixed_deduction_never_exceeds_item_total() {
        let lines = vec![line("A", Money::from_dollars(2), 1)];
        let mut code = percent_code(0);
        code.percent = None;
        code.deduct = Some(Money::from_dollars(1));
        let discount = ScopedDiscount { code, scope_skus: vec![] };
        let totals = cart_totals(&lines, Some(&discount), &profile_fixture(1), &DeliveryFees::default());
        assert_eq!(totals.discount_total, Money::from_dollars(1));
        assert_eq!(totals.total, Money::from_dollars(1));
    }

    #[test]
    fn delivery_fee_waived_above_threshold() {
        let mut profile = profile_fixture(1);
        profile.home_delivery = true;
        profile.delivery_zip = Some("97217".into());
        let fees = DeliveryFees::default();
        let small = vec![line("A", Money::from_dollars(20), 1)];
        let totals = cart_totals(&small, None, &profile, &fees);
        assert_eq!(totals.shipping_total, Money::from_dollars(5));
        let big = vec![line("A", Money::from_dollars(130), 1)];
        let totals = cart_totals(&big, None, &profile, &fees);
        assert_eq!(totals.shipping_total, Money::default());
    }

    #[test]
    fn zip_override_beats_default_charge() {
        let mut profile = profile_fixture(1);
        profile.home_delivery = true;
        profile.delivery_zip = Some("97203".into());
        let mut fees = DeliveryFees::default();
        fees.by_zip.insert("97203".into(), Money::from_dollars(8));
        let lines = vec![line("A", Money::from_dollars(20), 1)];
        let totals = cart_totals(&lines, None, &profile, &fees);
        assert_eq!(totals.shipping_total, Money::from_dollars(8));
    }

    #[test]
    fn free_shipping_code_zeroes_the_fee() {
        let mut profile = profile_fixture(1);
        profile.home_delivery = true;
        let mut code = percent_code(0);
        code.free_shipping = true;
        let discount = ScopedDiscount { code, scope_skus: vec![] };
        let lines = vec![line("A", Money::from_dollars(20), 1)];
        let totals = cart_totals(&lines, Some(&discount), &profile, &DeliveryFees::default());
        assert_eq!(totals.shipping_total, Money::default());
    }
}
