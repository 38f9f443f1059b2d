//! `ReportApi` fetches a day's order lines and pack keys, then hands off to the pure functions in
//! [`crate::store_api::report_objects`].

use std::{collections::HashMap, fmt::Debug};

use chrono::NaiveDate;
use log::debug;
use thiserror::Error;

use crate::{
    db_types::ReportLine,
    helpers::PackKeyInfo,
    store_api::report_objects::{
        dairy_pack_list,
        dairy_vendor_lists,
        delivery_manifest,
        frozen_items,
        frozen_pack_list,
        grains_and_beans,
        home_delivery_checklist,
        home_delivery_notes,
        inventory_items,
        market_checklists,
        master_checklist,
        order_tickets,
        pack_sheets,
        product_totals,
        vendor_orders,
        weekly_report,
        DeliveryNote,
        DeliveryStop,
        FarmStockLine,
        HomeDeliveryChecklist,
        MarketChecklist,
        MasterChecklist,
        PackListSite,
        PackSheet,
        ProductTotal,
        ReportSettings,
        VendorOrder,
        VendorPackList,
        WeeklyReport,
    },
    traits::{CatalogError, CatalogManagement, OrderError, OrderManagement},
};

#[derive(Debug, Clone, Error)]
pub enum ReportError {
    #[error("Could not fetch order data: {0}")]
    OrderData(#[from] OrderError),
    #[error("Could not fetch catalog data: {0}")]
    CatalogData(#[from] CatalogError),
}

pub struct ReportApi<B> {
    db: B,
    settings: ReportSettings,
}

impl<B> Debug for ReportApi<B> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "ReportApi")
    }
}

impl<B> ReportApi<B> {
    pub fn new(db: B, settings: ReportSettings) -> Self {
        Self { db, settings }
    }

    pub fn settings(&self) -> &ReportSettings {
        &self.settings
    }
}

impl<B> ReportApi<B>
where B: OrderManagement + CatalogManagement
{
    async fn lines_and_keys(
        &self,
        date: NaiveDate,
    ) -> Result<(Vec<ReportLine>, HashMap<String, PackKeyInfo>), ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        let mut skus: Vec<String> = lines.iter().map(|l| l.sku.clone()).collect();
        skus.sort();
        skus.dedup();
        let keys = self.db.pack_keys(&skus).await?;
        debug!("📈️ Fetched {} report lines over {} SKUs for {date}", lines.len(), skus.len());
        Ok((lines, keys))
    }

    pub async fn pack_sheets_for_date(&self, date: NaiveDate) -> Result<Vec<PackSheet>, ReportError> {
        let (lines, keys) = self.lines_and_keys(date).await?;
        Ok(pack_sheets(&lines, &keys))
    }

    pub async fn order_tickets_for_date(&self, date: NaiveDate) -> Result<Vec<PackSheet>, ReportError> {
        let (lines, keys) = self.lines_and_keys(date).await?;
        Ok(order_tickets(&lines, &keys, &self.settings))
    }

    pub async fn vendor_orders_for_date(&self, date: NaiveDate) -> Result<Vec<VendorOrder>, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(vendor_orders(&lines))
    }

    pub async fn delivery_manifest_for_date(&self, date: NaiveDate) -> Result<Vec<DeliveryStop>, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(delivery_manifest(&lines))
    }

    pub async fn market_checklists_for_date(&self, date: NaiveDate) -> Result<Vec<MarketChecklist>, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(market_checklists(&lines, &self.settings))
    }

    pub async fn grains_and_beans_for_date(&self, date: NaiveDate) -> Result<Vec<ProductTotal>, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(grains_and_beans(&lines, &self.settings))
    }

    pub async fn product_totals_for_date(&self, date: NaiveDate) -> Result<Vec<ProductTotal>, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(product_totals(&lines, &self.settings))
    }

    pub async fn frozen_items_for_date(&self, date: NaiveDate) -> Result<Vec<FarmStockLine>, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(frozen_items(&lines, &self.settings))
    }

    pub async fn inventory_items_for_date(&self, date: NaiveDate) -> Result<Vec<FarmStockLine>, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(inventory_items(&lines, &self.settings))
    }

    pub async fn frozen_pack_list_for_date(&self, date: NaiveDate) -> Result<Vec<PackListSite>, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(frozen_pack_list(&lines, &self.settings))
    }

    pub async fn dairy_pack_list_for_date(&self, date: NaiveDate) -> Result<Vec<PackListSite>, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(dairy_pack_list(&lines, &self.settings))
    }

    pub async fn dairy_vendor_lists_for_date(&self, date: NaiveDate) -> Result<Vec<VendorPackList>, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(dairy_vendor_lists(&lines, &self.settings))
    }

    pub async fn master_checklist_for_date(&self, date: NaiveDate) -> Result<MasterChecklist, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(master_checklist(&lines))
    }

    pub async fn home_delivery_checklist_for_date(
        &self,
        date: NaiveDate,
    ) -> Result<HomeDeliveryChecklist, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(home_delivery_checklist(&lines))
    }

    pub async fn home_delivery_notes_for_date(&self, date: NaiveDate) -> Result<Vec<DeliveryNote>, ReportError> {
        let lines = self.db.report_lines_for_date(date).await?;
        Ok(home_delivery_notes(&lines))
    }

    /// Every sheet for the day in one bundle, the way the packing crew prints it.
    pub async fn weekly_report_for_date(&self, date: NaiveDate) -> Result<WeeklyReport, ReportError> {
        let (lines, keys) = self.lines_and_keys(date).await?;
        Ok(weekly_report(&lines, &keys, &self.settings))
    }
}
