//! The weekly cycle worker.
//!
//! Ticks once a minute. When the ordering window crosses its cutoff, it runs the close (carts become
//! orders, the farm's extra over-order is synthesized, the store resets) and then emails each
//! auto-dispatch vendor their order for the coming pickup.

use chrono::{DateTime, Duration, Utc};
use csa_store_engine::{
    events::EventProducers,
    helpers::OrderWindow,
    store_api::{report_objects::VendorOrder, DeliveryFees},
    traits::CatalogManagement,
    OrderCloseApi,
    ReportApi,
    ReportSettings,
    SqliteDatabase,
};
use log::*;
use sendinblue_tools::{SendinblueApi, TransactionalEmail};
use tokio::task::JoinHandle;

/// Orders written by a close are dated one day out, matching the engine's pickup offset.
const PICKUP_OFFSET_DAYS: i64 = 1;

/// Starts the cycle worker. Do not await the returned JoinHandle, as it will run indefinitely.
pub fn start_cycle_worker(
    db: SqliteDatabase,
    windows: Vec<OrderWindow>,
    fees: DeliveryFees,
    settings: ReportSettings,
    producers: EventProducers,
    mailer: Option<SendinblueApi>,
    operators: Vec<String>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut timer = tokio::time::interval(std::time::Duration::from_secs(60));
        let close_api = OrderCloseApi::new(db.clone(), fees, producers);
        let report_api = ReportApi::new(db.clone(), settings);
        let mut last_tick = Utc::now();
        info!("🕰️ Cycle worker started with {} ordering window(s)", windows.len());
        loop {
            timer.tick().await;
            let now = Utc::now();
            if !cutoff_crossed(&windows, last_tick, now) {
                last_tick = now;
                continue;
            }
            last_tick = now;
            info!("🕰️ Ordering cutoff crossed; closing the cycle");
            match close_api.close_cycle(now).await {
                Ok(summary) => {
                    info!(
                        "🕰️ Cycle closed: {} orders, extra order {:?}, {} carts cleared, {} failures",
                        summary.order_ids.len(),
                        summary.extra_order_id,
                        summary.carts_cleared,
                        summary.failures.len()
                    );
                    for failure in &summary.failures {
                        warn!("🕰️ Cart for user {} did not convert: {}", failure.user_id, failure.reason);
                    }
                },
                Err(e) => {
                    error!("🕰️ Error closing the ordering cycle: {e}");
                    continue;
                },
            }
            let pickup = (now + Duration::days(PICKUP_OFFSET_DAYS)).date_naive();
            if let Some(mailer) = &mailer {
                dispatch_vendor_orders(&db, &report_api, mailer, pickup, &operators).await;
            }
        }
    })
}

/// True when a window that was open at `prev` has closed by `now` and no other window is still open.
pub fn cutoff_crossed(windows: &[OrderWindow], prev: DateTime<Utc>, now: DateTime<Utc>) -> bool {
    let any_closed = windows.iter().any(|w| w.is_open(prev) && !w.is_open(now));
    let any_open = windows.iter().any(|w| w.is_open(now));
    any_closed && !any_open
}

async fn dispatch_vendor_orders(
    db: &SqliteDatabase,
    reports: &ReportApi<SqliteDatabase>,
    mailer: &SendinblueApi,
    pickup: chrono::NaiveDate,
    operators: &[String],
) {
    let orders = match reports.vendor_orders_for_date(pickup).await {
        Ok(orders) => orders,
        Err(e) => {
            error!("🕰️ Could not build vendor orders for {pickup}: {e}");
            return;
        },
    };
    let vendors = match db.fetch_vendors().await {
        Ok(vendors) => vendors,
        Err(e) => {
            error!("🕰️ Could not list vendors: {e}");
            return;
        },
    };
    for vendor in vendors.iter().filter(|v| v.auto_send_order) {
        let Some(email) = &vendor.email else {
            warn!("🕰️ Vendor {} is set to auto-send but has no email address", vendor.title);
            continue;
        };
        let Some(order) = orders.iter().find(|o| o.vendor == vendor.title) else {
            debug!("🕰️ No order for vendor {} this cycle", vendor.title);
            continue;
        };
        let mail = TransactionalEmail::new(
            email.clone(),
            format!("Order for {}", pickup.format("%A, %B %-d")),
            vendor_order_html(order),
        )
        .with_name(vendor.title.clone());
        match mailer.send_transactional(mail).await {
            Ok(message_id) => info!("🕰️ Sent order to vendor {} ({message_id})", vendor.title),
            Err(e) => {
                // The close is never retried over a mail failure; the operators place the order by hand.
                error!("🕰️ Could not send order to vendor {}: {e}", vendor.title);
                escalate_send_failure(mailer, operators, &vendor.title, order, pickup).await;
            },
        }
    }
}

async fn escalate_send_failure(
    mailer: &SendinblueApi,
    operators: &[String],
    vendor: &str,
    order: &VendorOrder,
    pickup: chrono::NaiveDate,
) {
    for operator in operators {
        let mail = TransactionalEmail::new(
            operator.clone(),
            format!("Vendor order for {vendor} did not send"),
            format!(
                "<p>The order below could not be emailed to {vendor} for {}. Please place it manually.</p>{}",
                pickup.format("%A, %B %-d"),
                vendor_order_html(order)
            ),
        );
        if let Err(e) = mailer.send_transactional(mail).await {
            error!("🕰️ Could not escalate the {vendor} order to {operator}: {e}");
        }
    }
}

/// A plain HTML table of the vendor's order lines.
pub fn vendor_order_html(order: &VendorOrder) -> String {
    let mut html = String::from("<table><tr><th>SKU</th><th>Item</th><th>Qty</th><th>Total</th></tr>");
    for line in &order.lines {
        html.push_str(&format!(
            "<tr><td>{}</td><td>{}</td><td>{}</td><td>{}</td></tr>",
            line.sku, line.description, line.quantity, line.total
        ));
    }
    html.push_str(&format!("<tr><td colspan=\"3\">Total</td><td>{}</td></tr></table>", order.total));
    html
}

#[cfg(test)]
mod test {
    use chrono::TimeZone;
    use csa_common::Money;
    use csa_store_engine::store_api::report_objects::VendorOrderLine;

    use super::*;

    // Wednesday 12:00 through Sunday 16:00, UTC.
    fn window() -> OrderWindow {
        OrderWindow::new(3, "12:00", 7, "16:00", vec!["Ferry".to_string()], vec![]).unwrap()
    }

    #[test]
    fn crossing_the_cutoff_is_detected_once() {
        let windows = vec![window()];
        // 2026-08-23 is a Sunday
        let before = Utc.with_ymd_and_hms(2026, 8, 23, 15, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 8, 23, 16, 1, 0).unwrap();
        assert!(cutoff_crossed(&windows, before, after));
        // The next tick sees a closed window on both sides
        let later = Utc.with_ymd_and_hms(2026, 8, 23, 16, 2, 0).unwrap();
        assert!(!cutoff_crossed(&windows, after, later));
    }

    #[test]
    fn no_cutoff_while_the_window_is_open() {
        let windows = vec![window()];
        let t1 = Utc.with_ymd_and_hms(2026, 8, 22, 10, 0, 0).unwrap();
        let t2 = Utc.with_ymd_and_hms(2026, 8, 22, 10, 1, 0).unwrap();
        assert!(!cutoff_crossed(&windows, t1, t2));
    }

    #[test]
    fn a_still_open_sibling_window_defers_the_close() {
        // Second window runs to Sunday 20:00, so the 16:00 close must wait for it.
        let late = OrderWindow::new(3, "12:00", 7, "20:00", vec!["Campus".to_string()], vec![]).unwrap();
        let windows = vec![window(), late];
        let before = Utc.with_ymd_and_hms(2026, 8, 23, 15, 59, 0).unwrap();
        let after = Utc.with_ymd_and_hms(2026, 8, 23, 16, 1, 0).unwrap();
        assert!(!cutoff_crossed(&windows, before, after));
        let evening_before = Utc.with_ymd_and_hms(2026, 8, 23, 19, 59, 0).unwrap();
        let evening_after = Utc.with_ymd_and_hms(2026, 8, 23, 20, 1, 0).unwrap();
        assert!(cutoff_crossed(&windows, evening_before, evening_after));
    }

    #[test]
    fn vendor_order_renders_every_line() {
        let order = VendorOrder {
            vendor: "River Dairy".to_string(),
            lines: vec![VendorOrderLine {
                sku: "MILK-1".to_string(),
                description: "Whole milk, quart".to_string(),
                quantity: 12,
                vendor_price: Money::from_cents(250),
                total: Money::from_cents(3000),
            }],
            total: Money::from_cents(3000),
        };
        let html = vendor_order_html(&order);
        assert!(html.contains("MILK-1"));
        assert!(html.contains("Whole milk, quart"));
        assert!(html.contains("12"));
    }
}
