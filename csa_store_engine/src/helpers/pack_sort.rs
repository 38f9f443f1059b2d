//! The stable grouping key used by invoices and pack lists.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

/// Items with no explicit sort weight group under this key.
pub const DEFAULT_GROUP_KEY: f64 = 5.0;

/// Pack-sort inputs for one SKU, as stored on the catalog side.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PackKeyInfo {
    /// Set directly on the product; takes precedence over everything else.
    pub order_on_invoice: Option<f64>,
    /// The product's (first) category weight; zero means unset.
    pub category_order: Option<f64>,
    /// The parent category's weight, when the category has a parent.
    pub parent_order: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PackKey {
    pub group: f64,
    pub description: String,
}

impl Eq for PackKey {}

impl Ord for PackKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.group.total_cmp(&other.group).then_with(|| self.description.cmp(&other.description))
    }
}

impl PartialOrd for PackKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Compute the grouping key for an item:
/// 1. the product's own `order_on_invoice` when set;
/// 2. else, when its category has a parent, "parent.category" read as a decimal, substituting
///    [`DEFAULT_GROUP_KEY`] for an unset category weight;
/// 3. else [`DEFAULT_GROUP_KEY`].
pub fn pack_sort_key(info: Option<&PackKeyInfo>, description: &str) -> PackKey {
    let group = match info {
        Some(PackKeyInfo { order_on_invoice: Some(v), .. }) => *v,
        Some(PackKeyInfo { parent_order: Some(parent), category_order, .. }) => {
            let minor = match category_order {
                Some(c) if *c != 0.0 => *c,
                _ => DEFAULT_GROUP_KEY,
            };
            format!("{}.{}", trim_num(*parent), trim_num(minor)).parse().unwrap_or(DEFAULT_GROUP_KEY)
        },
        _ => DEFAULT_GROUP_KEY,
    };
    PackKey { group, description: description.to_string() }
}

fn trim_num(v: f64) -> String {
    if v.fract() == 0.0 {
        format!("{}", v as i64)
    } else {
        format!("{v}")
    }
}
