//! The weekly report pipeline. Everything here is a pure function over the day's [`ReportLine`]s so the
//! reports can be tested without a database; [`crate::store_api::ReportApi`] does the fetching.

use std::collections::{BTreeMap, HashMap};

use csa_common::Money;
use serde::{Deserialize, Serialize};

use crate::{
    db_types::ReportLine,
    helpers::{pack_sort_key, PackKeyInfo},
};

//--------------------------------------   ReportSettings     ---------------------------------------------------------

/// Category lists that steer the reports. The defaults mirror how the farm actually runs; every list can be
/// overridden from configuration, and omitted fields fall back to these defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReportSettings {
    /// Drop sites that get a market checklist.
    pub market_checklists: Vec<String>,
    /// Categories that always pack frozen.
    pub frozen_categories: Vec<String>,
    pub grain_beans_categories: Vec<String>,
    /// Categories included in the weekly product totals.
    pub product_order_categories: Vec<String>,
    /// Categories left off the packing tickets.
    pub order_ticket_exclude_categories: Vec<String>,
    /// The farm's own meat vendor. Its made-to-order items pack with the frozen run.
    pub farm_vendor: String,
    /// Categories that make up the dairy pack lists.
    pub dairy_categories: Vec<String>,
    /// Vendors that get their own dairy totals sheet.
    pub dairy_pack_vendors: Vec<String>,
}

impl Default for ReportSettings {
    fn default() -> Self {
        Self {
            market_checklists: vec![
                "LCFM".to_string(),
                "Hollywood".to_string(),
                "PSU".to_string(),
                "St Johns".to_string(),
                "Woodstock".to_string(),
            ],
            frozen_categories: vec!["pasture raised meats".to_string()],
            grain_beans_categories: vec!["grains & beans".to_string()],
            product_order_categories: vec![
                "vegetables".to_string(),
                "eggs".to_string(),
                "fruit".to_string(),
                "mushroom".to_string(),
            ],
            order_ticket_exclude_categories: vec!["raw dairy".to_string()],
            farm_vendor: "Deck Family Farm".to_string(),
            dairy_categories: vec!["raw dairy".to_string()],
            dairy_pack_vendors: vec!["Deck Family Farm".to_string(), "Woven Roots".to_string()],
        }
    }
}

fn category_matches_any(line: &ReportLine, needles: &[String]) -> bool {
    let category = line.category.to_lowercase();
    needles.iter().any(|n| category.contains(&n.to_lowercase()))
}

fn sort_lines(lines: &mut [ReportLine], keys: &HashMap<String, PackKeyInfo>) {
    lines.sort_by_cached_key(|l| pack_sort_key(keys.get(&l.sku), &l.description));
}

//--------------------------------------     Pack sheets      ---------------------------------------------------------

/// One member's packing sheet for the day: their order's lines in pack order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackSheet {
    pub order_id: i64,
    pub member_name: String,
    pub drop_site: Option<String>,
    pub home_delivery: bool,
    pub lines: Vec<ReportLine>,
}

pub fn pack_sheets(lines: &[ReportLine], keys: &HashMap<String, PackKeyInfo>) -> Vec<PackSheet> {
    let mut by_order: BTreeMap<i64, Vec<ReportLine>> = BTreeMap::new();
    for line in lines {
        by_order.entry(line.order_id).or_default().push(line.clone());
    }
    by_order
        .into_iter()
        .map(|(order_id, mut lines)| {
            sort_lines(&mut lines, keys);
            let first = &lines[0];
            PackSheet {
                order_id,
                member_name: format!("{} {}", first.first_name, first.last_name),
                drop_site: first.drop_site.clone(),
                home_delivery: first.home_delivery,
                lines,
            }
        })
        .collect()
}

//--------------------------------------    Vendor orders     ---------------------------------------------------------

/// What the farm owes one vendor for the day, aggregated per SKU.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorOrder {
    pub vendor: String,
    pub lines: Vec<VendorOrderLine>,
    pub total: Money,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorOrderLine {
    pub sku: String,
    pub description: String,
    pub quantity: i64,
    pub vendor_price: Money,
    pub total: Money,
}

/// Items the farm already holds in inventory are packed, not re-ordered, so they never reach a vendor order.
pub fn vendor_orders(lines: &[ReportLine]) -> Vec<VendorOrder> {
    let mut by_vendor: BTreeMap<String, BTreeMap<String, VendorOrderLine>> = BTreeMap::new();
    for line in lines.iter().filter(|l| !l.in_inventory) {
        let entry = by_vendor
            .entry(line.vendor.clone())
            .or_default()
            .entry(line.sku.clone())
            .or_insert_with(|| VendorOrderLine {
                sku: line.sku.clone(),
                description: line.description.clone(),
                quantity: 0,
                vendor_price: line.vendor_price,
                total: Money::default(),
            });
        entry.quantity += line.quantity;
        entry.total += line.vendor_price * line.quantity;
    }
    by_vendor
        .into_iter()
        .map(|(vendor, lines)| {
            let lines: Vec<VendorOrderLine> = lines.into_values().collect();
            let total = lines.iter().map(|l| l.total).sum();
            VendorOrder { vendor, lines, total }
        })
        .collect()
}

//--------------------------------------  Delivery manifest   ---------------------------------------------------------

/// One stop on the home-delivery route.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryStop {
    pub order_id: i64,
    pub member_name: String,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zip: Option<String>,
    pub phone: Option<String>,
    pub instructions: Option<String>,
    pub item_count: i64,
}

pub fn delivery_manifest(lines: &[ReportLine]) -> Vec<DeliveryStop> {
    let mut by_order: BTreeMap<i64, DeliveryStop> = BTreeMap::new();
    for line in lines.iter().filter(|l| l.home_delivery) {
        let stop = by_order.entry(line.order_id).or_insert_with(|| DeliveryStop {
            order_id: line.order_id,
            member_name: format!("{} {}", line.first_name, line.last_name),
            address: line.address.clone(),
            city: line.city.clone(),
            zip: line.zip.clone(),
            phone: line.phone.clone(),
            instructions: line.shipping_instructions.clone(),
            item_count: 0,
        });
        stop.item_count += line.quantity;
    }
    by_order.into_values().collect()
}

//--------------------------------------  Market checklists   ---------------------------------------------------------

/// How a checklist column treats the frozen flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FrozenRule {
    /// Match on category alone.
    Ignore,
    /// Frozen items never land in this column, whatever their category.
    RequireNotFrozen,
    /// Frozen items always land in this column, whatever their category.
    OrFrozen,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistColumn {
    pub name: String,
    /// Category substrings, matched case-insensitively.
    pub categories: Vec<String>,
    pub frozen: FrozenRule,
    /// A fixed tally per member when set; otherwise the member's actual item quantity is shown.
    pub default_quantity: Option<i64>,
}

impl ChecklistColumn {
    fn matches(&self, line: &ReportLine) -> bool {
        let by_category = category_matches_any(line, &self.categories);
        match self.frozen {
            FrozenRule::Ignore => by_category,
            FrozenRule::RequireNotFrozen => by_category && !line.is_frozen,
            FrozenRule::OrFrozen => by_category || line.is_frozen,
        }
    }
}

/// The standard four market-stand columns.
pub fn market_checklist_columns() -> Vec<ChecklistColumn> {
    let cats = |names: &[&str]| names.iter().map(|s| s.to_string()).collect::<Vec<_>>();
    vec![
        ChecklistColumn {
            name: "Tote".to_string(),
            categories: cats(&[
                "grain", "vegetables", "fruit", "eggs", "swag", "bread", "mushroom", "nut", "coffee", "pantry",
            ]),
            frozen: FrozenRule::RequireNotFrozen,
            default_quantity: Some(1),
        },
        ChecklistColumn {
            name: "Meat".to_string(),
            categories: cats(&["meat", "butter"]),
            frozen: FrozenRule::OrFrozen,
            default_quantity: Some(1),
        },
        ChecklistColumn {
            name: "Dairy".to_string(),
            categories: cats(&["dairy"]),
            frozen: FrozenRule::Ignore,
            default_quantity: None,
        },
        ChecklistColumn {
            name: "Flowers".to_string(),
            categories: cats(&["flowers"]),
            frozen: FrozenRule::Ignore,
            default_quantity: None,
        },
    ]
}

/// One member's row at a market stand: a tally (or item count) per column, `None` where they collect nothing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChecklistRow {
    pub member_name: String,
    pub cells: Vec<Option<i64>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarketChecklist {
    pub drop_site: String,
    pub columns: Vec<String>,
    pub rows: Vec<ChecklistRow>,
}

pub fn market_checklists(lines: &[ReportLine], settings: &ReportSettings) -> Vec<MarketChecklist> {
    let columns = market_checklist_columns();
    settings
        .market_checklists
        .iter()
        .map(|site| {
            let site_lines: Vec<&ReportLine> =
                lines.iter().filter(|l| l.drop_site.as_deref() == Some(site.as_str())).collect();
            let mut by_member: BTreeMap<(i64, String), Vec<&ReportLine>> = BTreeMap::new();
            for line in site_lines {
                let name = format!("{} {}", line.first_name, line.last_name);
                by_member.entry((line.user_id, name)).or_default().push(line);
            }
            let rows = by_member
                .into_iter()
                .map(|((_, member_name), member_lines)| {
                    let cells = columns
                        .iter()
                        .map(|col| {
                            let matched: i64 =
                                member_lines.iter().filter(|l| col.matches(l)).map(|l| l.quantity).sum();
                            if matched == 0 {
                                None
                            } else {
                                Some(col.default_quantity.unwrap_or(matched))
                            }
                        })
                        .collect();
                    ChecklistRow { member_name, cells }
                })
                .collect();
            MarketChecklist {
                drop_site: site.clone(),
                columns: columns.iter().map(|c| c.name.clone()).collect(),
                rows,
            }
        })
        .collect()
}

//--------------------------------------    Order tickets     ---------------------------------------------------------

/// Like a pack sheet, but with the excluded categories (items the members collect directly) left off.
pub fn order_tickets(
    lines: &[ReportLine],
    keys: &HashMap<String, PackKeyInfo>,
    settings: &ReportSettings,
) -> Vec<PackSheet> {
    let filtered: Vec<ReportLine> = lines
        .iter()
        .filter(|l| !category_matches_any(l, &settings.order_ticket_exclude_categories))
        .cloned()
        .collect();
    pack_sheets(&filtered, keys)
}

//--------------------------------------   Product totals     ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProductTotal {
    pub sku: String,
    pub description: String,
    pub quantity: i64,
}

fn totals_for_categories(lines: &[ReportLine], categories: &[String]) -> Vec<ProductTotal> {
    let mut by_sku: BTreeMap<String, ProductTotal> = BTreeMap::new();
    for line in lines.iter().filter(|l| category_matches_any(l, categories)) {
        let entry = by_sku.entry(line.sku.clone()).or_insert_with(|| ProductTotal {
            sku: line.sku.clone(),
            description: line.description.clone(),
            quantity: 0,
        });
        entry.quantity += line.quantity;
    }
    by_sku.into_values().collect()
}

/// Grain and bean totals for the mill.
pub fn grains_and_beans(lines: &[ReportLine], settings: &ReportSettings) -> Vec<ProductTotal> {
    totals_for_categories(lines, &settings.grain_beans_categories)
}

/// Field harvest totals: what to pull from the ground this week.
pub fn product_totals(lines: &[ReportLine], settings: &ReportSettings) -> Vec<ProductTotal> {
    totals_for_categories(lines, &settings.product_order_categories)
}

//--------------------------------------  Farm stock reports   ---------------------------------------------------------

/// A totalled line on one of the farm's own packing reports: one SKU, summed over every order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmStockLine {
    pub sku: String,
    pub description: String,
    pub category: String,
    pub quantity: i64,
}

fn tally<F: Fn(&ReportLine) -> bool>(lines: &[ReportLine], keep: F) -> Vec<FarmStockLine> {
    let mut by_sku: BTreeMap<String, FarmStockLine> = BTreeMap::new();
    for line in lines.iter().filter(|l| keep(l)) {
        let entry = by_sku.entry(line.sku.clone()).or_insert_with(|| FarmStockLine {
            sku: line.sku.clone(),
            description: line.description.clone(),
            category: line.category.clone(),
            quantity: 0,
        });
        entry.quantity += line.quantity;
    }
    let mut totals: Vec<FarmStockLine> = by_sku.into_values().collect();
    totals.sort_by(|a, b| (&a.category, &a.description).cmp(&(&b.category, &b.description)));
    totals
}

/// The frozen run: explicitly frozen items, the always-frozen categories, and anything the farm's own
/// vendor butchers to order (not held in inventory), except the categories members collect directly.
pub fn is_frozen_item(line: &ReportLine, settings: &ReportSettings) -> bool {
    line.is_frozen
        || category_matches_any(line, &settings.frozen_categories)
        || (line.vendor.eq_ignore_ascii_case(&settings.farm_vendor)
            && !line.in_inventory
            && !category_matches_any(line, &settings.order_ticket_exclude_categories))
}

/// Everything going out with the frozen run, totalled per SKU.
pub fn frozen_items(lines: &[ReportLine], settings: &ReportSettings) -> Vec<FarmStockLine> {
    tally(lines, |l| is_frozen_item(l, settings))
}

/// What to pull from the farm's own inventory, minus the items the frozen and grain lists already carry.
pub fn inventory_items(lines: &[ReportLine], settings: &ReportSettings) -> Vec<FarmStockLine> {
    let mut covered_elsewhere = settings.frozen_categories.clone();
    covered_elsewhere.extend(settings.grain_beans_categories.iter().cloned());
    tally(lines, |l| l.in_inventory && !l.is_frozen && !category_matches_any(l, &covered_elsewhere))
}

//--------------------------------------      Pack lists       ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackListLine {
    pub description: String,
    pub quantity: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackListMember {
    pub member_name: String,
    pub lines: Vec<PackListLine>,
}

/// One drop site's slice of a pack list, members in surname order.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PackListSite {
    pub drop_site: String,
    pub members: Vec<PackListMember>,
}

fn pack_list<F: Fn(&ReportLine) -> bool>(lines: &[ReportLine], keep: F) -> Vec<PackListSite> {
    let mut sites: BTreeMap<String, BTreeMap<(String, i64), PackListMember>> = BTreeMap::new();
    for line in lines.iter().filter(|l| keep(l)) {
        let site = line.drop_site.clone().unwrap_or_else(|| "Home Delivery".to_string());
        let member = sites
            .entry(site)
            .or_default()
            .entry((line.last_name.clone(), line.user_id))
            .or_insert_with(|| PackListMember {
                member_name: format!("{} {}", line.first_name, line.last_name),
                lines: Vec::new(),
            });
        member.lines.push(PackListLine { description: line.description.clone(), quantity: line.quantity });
    }
    sites
        .into_iter()
        .map(|(drop_site, members)| {
            let members = members
                .into_values()
                .map(|mut m| {
                    m.lines.sort_by(|a, b| a.description.cmp(&b.description));
                    m
                })
                .collect();
            PackListSite { drop_site, members }
        })
        .collect()
}

/// Who gets what out of the frozen run, by drop site then member.
pub fn frozen_pack_list(lines: &[ReportLine], settings: &ReportSettings) -> Vec<PackListSite> {
    pack_list(lines, |l| is_frozen_item(l, settings))
}

/// The dairy cooler pack list, by drop site then member.
pub fn dairy_pack_list(lines: &[ReportLine], settings: &ReportSettings) -> Vec<PackListSite> {
    pack_list(lines, |l| category_matches_any(l, &settings.dairy_categories))
}

/// Dairy totals per configured vendor, for bottling. A vendor with no dairy in the day's orders still gets
/// an (empty) sheet so the packer knows nothing was missed.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VendorPackList {
    pub vendor: String,
    pub lines: Vec<ProductTotal>,
}

pub fn dairy_vendor_lists(lines: &[ReportLine], settings: &ReportSettings) -> Vec<VendorPackList> {
    settings
        .dairy_pack_vendors
        .iter()
        .map(|vendor| {
            let mut by_description: BTreeMap<String, ProductTotal> = BTreeMap::new();
            for line in lines.iter().filter(|l| {
                l.vendor.eq_ignore_ascii_case(vendor) && category_matches_any(l, &settings.dairy_categories)
            }) {
                let entry = by_description.entry(line.description.clone()).or_insert_with(|| ProductTotal {
                    sku: line.sku.clone(),
                    description: line.description.clone(),
                    quantity: 0,
                });
                entry.quantity += line.quantity;
            }
            VendorPackList { vendor: vendor.clone(), lines: by_description.into_values().collect() }
        })
        .collect()
}

//--------------------------------------   Master checklist    ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterRow {
    pub drop_site: String,
    pub totals: Vec<i64>,
}

/// Per-drop-site totals over the market checklist columns: how many totes, meat bags and so on each site
/// needs loaded onto the truck.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MasterChecklist {
    pub columns: Vec<String>,
    pub rows: Vec<MasterRow>,
}

pub fn master_checklist(lines: &[ReportLine]) -> MasterChecklist {
    let columns = market_checklist_columns();
    let mut by_order: BTreeMap<i64, (String, Vec<&ReportLine>)> = BTreeMap::new();
    for line in lines {
        let site = line.drop_site.clone().unwrap_or_else(|| "Home Delivery".to_string());
        by_order.entry(line.order_id).or_insert_with(|| (site, Vec::new())).1.push(line);
    }
    // The fixed tallies are per order, so each order resolves its own cells before the site sums them.
    let mut by_site: BTreeMap<String, Vec<i64>> = BTreeMap::new();
    for (site, order_lines) in by_order.into_values() {
        let totals = by_site.entry(site).or_insert_with(|| vec![0; columns.len()]);
        for (i, col) in columns.iter().enumerate() {
            let matched: i64 = order_lines.iter().filter(|l| col.matches(l)).map(|l| l.quantity).sum();
            if matched > 0 {
                totals[i] += col.default_quantity.unwrap_or(matched);
            }
        }
    }
    MasterChecklist {
        columns: columns.iter().map(|c| c.name.clone()).collect(),
        rows: by_site.into_iter().map(|(drop_site, totals)| MasterRow { drop_site, totals }).collect(),
    }
}

//--------------------------------------    Home delivery      ---------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeDeliveryRow {
    pub member_name: String,
    pub city: Option<String>,
    pub address: Option<String>,
    pub instructions: Option<String>,
    pub cells: Vec<Option<i64>>,
}

/// The market checklist's home-delivery sibling, one row per order, in driving order (city, then surname).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeDeliveryChecklist {
    pub columns: Vec<String>,
    pub rows: Vec<HomeDeliveryRow>,
}

pub fn home_delivery_checklist(lines: &[ReportLine]) -> HomeDeliveryChecklist {
    let columns = market_checklist_columns();
    let mut by_order: BTreeMap<i64, Vec<&ReportLine>> = BTreeMap::new();
    for line in lines.iter().filter(|l| l.home_delivery) {
        by_order.entry(line.order_id).or_default().push(line);
    }
    let mut rows: Vec<HomeDeliveryRow> = by_order
        .into_values()
        .map(|order_lines| {
            let first = order_lines[0];
            let cells = columns
                .iter()
                .map(|col| {
                    let matched: i64 = order_lines.iter().filter(|l| col.matches(l)).map(|l| l.quantity).sum();
                    if matched == 0 {
                        None
                    } else {
                        Some(col.default_quantity.unwrap_or(matched))
                    }
                })
                .collect();
            HomeDeliveryRow {
                member_name: format!("{} {}", first.first_name, first.last_name),
                city: first.city.clone(),
                address: first.address.clone(),
                instructions: first.shipping_instructions.clone(),
                cells,
            }
        })
        .collect();
    rows.sort_by(|a, b| (&a.city, &a.member_name).cmp(&(&b.city, &b.member_name)));
    HomeDeliveryChecklist { columns: columns.iter().map(|c| c.name.clone()).collect(), rows }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryNote {
    pub member_name: String,
    pub city: Option<String>,
    pub instructions: String,
}

/// Delivery instructions the drivers need to read before they head out, in driving order.
pub fn home_delivery_notes(lines: &[ReportLine]) -> Vec<DeliveryNote> {
    let mut by_order: BTreeMap<i64, DeliveryNote> = BTreeMap::new();
    for line in lines.iter().filter(|l| l.home_delivery) {
        let Some(instructions) = line.shipping_instructions.as_deref().filter(|s| !s.trim().is_empty()) else {
            continue;
        };
        by_order.entry(line.order_id).or_insert_with(|| DeliveryNote {
            member_name: format!("{} {}", line.first_name, line.last_name),
            city: line.city.clone(),
            instructions: instructions.to_string(),
        });
    }
    let mut notes: Vec<DeliveryNote> = by_order.into_values().collect();
    notes.sort_by(|a, b| (&a.city, &a.member_name).cmp(&(&b.city, &b.member_name)));
    notes
}

//--------------------------------------    Weekly bundle      ---------------------------------------------------------

/// Every sub-report for one pickup day, assembled in the order the packing crew works through them.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeeklyReport {
    pub vendor_orders: Vec<VendorOrder>,
    pub dairy_vendor_lists: Vec<VendorPackList>,
    pub frozen_items: Vec<FarmStockLine>,
    pub inventory_items: Vec<FarmStockLine>,
    pub dairy_pack_list: Vec<PackListSite>,
    pub frozen_pack_list: Vec<PackListSite>,
    pub grains_and_beans: Vec<ProductTotal>,
    pub market_checklists: Vec<MarketChecklist>,
    pub home_delivery_checklist: HomeDeliveryChecklist,
    pub home_delivery_notes: Vec<DeliveryNote>,
    pub master_checklist: MasterChecklist,
    pub product_totals: Vec<ProductTotal>,
    pub pack_sheets: Vec<PackSheet>,
    pub order_tickets: Vec<PackSheet>,
    pub delivery_manifest: Vec<DeliveryStop>,
}

pub fn weekly_report(
    lines: &[ReportLine],
    keys: &HashMap<String, PackKeyInfo>,
    settings: &ReportSettings,
) -> WeeklyReport {
    WeeklyReport {
        vendor_orders: vendor_orders(lines),
        dairy_vendor_lists: dairy_vendor_lists(lines, settings),
        frozen_items: frozen_items(lines, settings),
        inventory_items: inventory_items(lines, settings),
        dairy_pack_list: dairy_pack_list(lines, settings),
        frozen_pack_list: frozen_pack_list(lines, settings),
        grains_and_beans: grains_and_beans(lines, settings),
        market_checklists: market_checklists(lines, settings),
        home_delivery_checklist: home_delivery_checklist(lines),
        home_delivery_notes: home_delivery_notes(lines),
        master_checklist: master_checklist(lines),
        product_totals: product_totals(lines, settings),
        pack_sheets: pack_sheets(lines, keys),
        order_tickets: order_tickets(lines, keys, settings),
        delivery_manifest: delivery_manifest(lines),
    }
}

#[cfg(test)]
mod test {
    use chrono::Utc;

    use super::*;

    fn line(order_id: i64, user_id: i64, sku: &str, category: &str, vendor: &str, quantity: i64) -> ReportLine {
        ReportLine {
            order_id,
            user_id,
            order_time: Utc::now(),
            first_name: format!("User{user_id}"),
            last_name: "Test".to_string(),
            drop_site: Some("LCFM".to_string()),
            home_delivery: false,
            city: None,
            zip: None,
            address: None,
            phone: None,
            shipping_instructions: None,
            sku: sku.to_string(),
            description: sku.to_string(),
            category: category.to_string(),
            vendor: vendor.to_string(),
            vendor_price: Money::from_cents(300),
            unit_price: Money::from_cents(500),
            quantity,
            total_price: Money::from_cents(500) * quantity,
            in_inventory: false,
            is_frozen: false,
        }
    }

    #[test]
    fn vendor_orders_aggregate_per_sku() {
        let lines = vec![
            line(1, 1, "kale", "Vegetables", "Field Co", 2),
            line(2, 2, "kale", "Vegetables", "Field Co", 3),
            line(2, 2, "milk", "Dairy", "Creamery", 1),
        ];
        let orders = vendor_orders(&lines);
        assert_eq!(orders.len(), 2);
        let field = orders.iter().find(|o| o.vendor == "Field Co").unwrap();
        assert_eq!(field.lines.len(), 1);
        assert_eq!(field.lines[0].quantity, 5);
        assert_eq!(field.total, Money::from_cents(1500));
    }

    #[test]
    fn inventory_items_are_never_re_ordered_from_vendors() {
        let mut jam = line(1, 1, "jam", "Pantry", "Field Co", 5);
        jam.in_inventory = true;
        let lines = vec![jam, line(1, 1, "kale", "Vegetables", "Field Co", 2)];
        let orders = vendor_orders(&lines);
        assert_eq!(orders.len(), 1);
        assert_eq!(orders[0].lines.len(), 1);
        assert_eq!(orders[0].lines[0].sku, "kale");
    }

    #[test]
    fn checklist_columns_route_items() {
        let columns = market_checklist_columns();
        let tote = &columns[0];
        let meat = &columns[1];
        let veg = line(1, 1, "kale", "Vegetables", "V", 1);
        assert!(tote.matches(&veg));
        assert!(!meat.matches(&veg));
        let mut frozen_veg = veg.clone();
        frozen_veg.is_frozen = true;
        // frozen items leave the tote and join the meat column
        assert!(!tote.matches(&frozen_veg));
        assert!(meat.matches(&frozen_veg));
        let butter = line(1, 1, "butter", "Butter", "V", 1);
        assert!(meat.matches(&butter));
    }

    #[test]
    fn checklist_uses_default_tally_for_tote_and_quantity_for_dairy() {
        let settings = ReportSettings::default();
        let lines = vec![
            line(1, 1, "kale", "Vegetables", "V", 4),
            line(1, 1, "milk", "Raw Dairy", "V", 2),
            line(2, 2, "flowers", "Flowers", "V", 1),
        ];
        let checklists = market_checklists(&lines, &settings);
        let lcfm = checklists.iter().find(|c| c.drop_site == "LCFM").unwrap();
        assert_eq!(lcfm.rows.len(), 2);
        let row1 = &lcfm.rows[0];
        // tote tallies one per member regardless of quantity; dairy shows the real count
        assert_eq!(row1.cells[0], Some(1));
        assert_eq!(row1.cells[2], Some(2));
        assert_eq!(row1.cells[3], None);
        let row2 = &lcfm.rows[1];
        assert_eq!(row2.cells[0], None);
        assert_eq!(row2.cells[3], Some(1));
    }

    #[test]
    fn order_tickets_drop_excluded_categories() {
        let settings = ReportSettings::default();
        let lines =
            vec![line(1, 1, "kale", "Vegetables", "V", 1), line(1, 1, "milk", "Raw Dairy", "V", 1)];
        let tickets = order_tickets(&lines, &HashMap::new(), &settings);
        assert_eq!(tickets.len(), 1);
        assert_eq!(tickets[0].lines.len(), 1);
        assert_eq!(tickets[0].lines[0].sku, "kale");
    }

    #[test]
    fn pack_sheets_sort_by_group_then_description() {
        let mut keys = HashMap::new();
        keys.insert("zucchini".to_string(), PackKeyInfo { order_on_invoice: Some(1.0), ..Default::default() });
        let lines = vec![
            line(1, 1, "kale", "Vegetables", "V", 1),
            line(1, 1, "zucchini", "Vegetables", "V", 1),
            line(1, 1, "apples", "Fruit", "V", 1),
        ];
        let sheets = pack_sheets(&lines, &keys);
        let skus: Vec<&str> = sheets[0].lines.iter().map(|l| l.sku.as_str()).collect();
        // zucchini has an explicit low weight, the rest fall in the default group alphabetically
        assert_eq!(skus, vec!["zucchini", "apples", "kale"]);
    }

    #[test]
    fn grain_totals_only_count_their_category() {
        let settings = ReportSettings::default();
        let lines = vec![
            line(1, 1, "oats", "Grains & Beans", "V", 2),
            line(2, 2, "oats", "Grains & Beans", "V", 1),
            line(2, 2, "kale", "Vegetables", "V", 5),
        ];
        let totals = grains_and_beans(&lines, &settings);
        assert_eq!(totals.len(), 1);
        assert_eq!(totals[0].quantity, 3);
    }

    #[test]
    fn frozen_run_unions_flags_categories_and_farm_vendor_items() {
        let settings = ReportSettings::default();
        let mut flagged = line(1, 1, "berries", "Fruit", "Berry Co", 1);
        flagged.is_frozen = true;
        let by_category = line(2, 2, "beef", "Pasture Raised Meats", "Deck Family Farm", 2);
        // fresh-to-order from the farm's vendor, so it ships with the frozen run
        let fresh = line(3, 3, "sausage", "Charcuterie", "deck family farm", 1);
        let mut held = line(4, 4, "bacon", "Charcuterie", "Deck Family Farm", 1);
        held.in_inventory = true;
        let dairy = line(5, 5, "milk", "Raw Dairy", "Deck Family Farm", 1);
        let other = line(6, 6, "kale", "Vegetables", "Field Co", 1);

        let items = frozen_items(&[flagged, by_category, fresh, held, dairy, other], &settings);
        let skus: Vec<&str> = items.iter().map(|i| i.sku.as_str()).collect();
        // inventory-held, dairy and unrelated items stay off; the rest total per SKU, category order
        assert_eq!(skus, vec!["sausage", "berries", "beef"]);
    }

    #[test]
    fn inventory_list_leaves_frozen_and_grain_to_their_own_sheets() {
        let settings = ReportSettings::default();
        let mut jam = line(1, 1, "jam", "Pantry", "Farm", 3);
        jam.in_inventory = true;
        let mut jam2 = line(2, 2, "jam", "Pantry", "Farm", 1);
        jam2.in_inventory = true;
        let mut oats = line(1, 1, "oats", "Grains & Beans", "Farm", 2);
        oats.in_inventory = true;
        let mut frozen = line(1, 1, "beef", "Pasture Raised Meats", "Farm", 1);
        frozen.in_inventory = true;
        let fresh = line(1, 1, "kale", "Vegetables", "Field Co", 1);

        let items = inventory_items(&[jam, jam2, oats, frozen, fresh], &settings);
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].sku, "jam");
        assert_eq!(items[0].quantity, 4);
    }

    #[test]
    fn dairy_pack_list_groups_by_site_then_member() {
        let settings = ReportSettings::default();
        let mut milk_psu = line(1, 1, "milk", "Raw Dairy", "V", 2);
        milk_psu.drop_site = Some("PSU".to_string());
        let milk_lcfm = line(2, 2, "milk", "Raw Dairy", "V", 1);
        let kale = line(2, 2, "kale", "Vegetables", "V", 1);

        let sites = dairy_pack_list(&[milk_psu, milk_lcfm, kale], &settings);
        assert_eq!(sites.len(), 2);
        assert_eq!(sites[0].drop_site, "LCFM");
        assert_eq!(sites[0].members[0].member_name, "User2 Test");
        assert_eq!(sites[0].members[0].lines.len(), 1);
        assert_eq!(sites[1].drop_site, "PSU");
        assert_eq!(sites[1].members[0].lines[0].quantity, 2);
    }

    #[test]
    fn dairy_vendor_sheets_total_per_description() {
        let settings = ReportSettings::default();
        let lines = vec![
            line(1, 1, "milk", "Raw Dairy", "Deck Family Farm", 2),
            line(2, 2, "milk", "Raw Dairy", "deck family farm", 3),
            line(3, 3, "milk", "Raw Dairy", "Woven Roots", 1),
            line(3, 3, "cheese", "Cheese", "Woven Roots", 4),
        ];
        let sheets = dairy_vendor_lists(&lines, &settings);
        assert_eq!(sheets.len(), 2);
        assert_eq!(sheets[0].vendor, "Deck Family Farm");
        assert_eq!(sheets[0].lines.len(), 1);
        assert_eq!(sheets[0].lines[0].quantity, 5);
        assert_eq!(sheets[1].vendor, "Woven Roots");
        // cheese is not a dairy pack category
        assert_eq!(sheets[1].lines.len(), 1);
        assert_eq!(sheets[1].lines[0].quantity, 1);
    }

    #[test]
    fn master_checklist_tallies_the_default_per_order_before_summing() {
        let lines = vec![
            // two LCFM orders with totes: 1 tote each, however many items
            line(1, 1, "kale", "Vegetables", "V", 4),
            line(1, 1, "apples", "Fruit", "V", 2),
            line(2, 2, "kale", "Vegetables", "V", 1),
            // one PSU order with dairy, which shows the real quantity
            {
                let mut l = line(3, 3, "milk", "Raw Dairy", "V", 3);
                l.drop_site = Some("PSU".to_string());
                l
            },
        ];
        let master = master_checklist(&lines);
        assert_eq!(master.columns[0], "Tote");
        let lcfm = master.rows.iter().find(|r| r.drop_site == "LCFM").unwrap();
        assert_eq!(lcfm.totals[0], 2);
        assert_eq!(lcfm.totals[2], 0);
        let psu = master.rows.iter().find(|r| r.drop_site == "PSU").unwrap();
        assert_eq!(psu.totals[0], 0);
        assert_eq!(psu.totals[2], 3);
    }

    fn home_line(order_id: i64, user_id: i64, city: &str, instructions: Option<&str>) -> ReportLine {
        let mut l = line(order_id, user_id, "kale", "Vegetables", "V", 1);
        l.home_delivery = true;
        l.drop_site = None;
        l.city = Some(city.to_string());
        l.shipping_instructions = instructions.map(|s| s.to_string());
        l
    }

    #[test]
    fn home_delivery_checklist_rides_in_city_order() {
        let lines = vec![
            home_line(1, 1, "Veneta", None),
            home_line(2, 2, "Eugene", None),
            line(3, 3, "kale", "Vegetables", "V", 1),
        ];
        let checklist = home_delivery_checklist(&lines);
        assert_eq!(checklist.rows.len(), 2);
        assert_eq!(checklist.rows[0].city.as_deref(), Some("Eugene"));
        assert_eq!(checklist.rows[1].city.as_deref(), Some("Veneta"));
        assert_eq!(checklist.rows[0].cells[0], Some(1));
    }

    #[test]
    fn delivery_notes_only_list_orders_with_instructions() {
        let lines = vec![
            home_line(1, 1, "Veneta", Some("Gate code 4411")),
            home_line(2, 2, "Eugene", Some("   ")),
            home_line(3, 3, "Eugene", None),
        ];
        let notes = home_delivery_notes(&lines);
        assert_eq!(notes.len(), 1);
        assert_eq!(notes[0].instructions, "Gate code 4411");
    }

    #[test]
    fn weekly_report_assembles_every_sheet() {
        let settings = ReportSettings::default();
        let lines = vec![
            line(1, 1, "milk", "Raw Dairy", "Deck Family Farm", 2),
            line(2, 2, "kale", "Vegetables", "Field Co", 1),
        ];
        let report = weekly_report(&lines, &HashMap::new(), &settings);
        assert_eq!(report.vendor_orders.len(), 2);
        assert_eq!(report.dairy_vendor_lists[0].lines[0].quantity, 2);
        assert_eq!(report.dairy_pack_list.len(), 1);
        assert_eq!(report.pack_sheets.len(), 2);
        assert!(report.frozen_items.is_empty());
        assert_eq!(report.master_checklist.rows.len(), 1);
    }

    #[test]
    fn manifest_lists_home_delivery_orders_only() {
        let mut home = line(1, 1, "kale", "Vegetables", "V", 2);
        home.home_delivery = true;
        home.address = Some("1 Farm Rd".to_string());
        let pickup = line(2, 2, "kale", "Vegetables", "V", 1);
        let manifest = delivery_manifest(&[home, pickup]);
        assert_eq!(manifest.len(), 1);
        assert_eq!(manifest[0].order_id, 1);
        assert_eq!(manifest[0].item_count, 2);
    }
}
