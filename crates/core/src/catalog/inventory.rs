use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use crate::domain::product::{ProductId, VariantId};

pub const DEFAULT_LOW_STOCK_THRESHOLD: u32 = 5;
pub const DEFAULT_PAGE_SIZE: usize = 20;
pub const MAX_PAGE_SIZE: usize = 100;
pub const MANUAL_EDIT_REASON: &str = "manual_edit";

fn default_low_stock_threshold() -> u32 {
    DEFAULT_LOW_STOCK_THRESHOLD
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryItem {
    pub variant_id: VariantId,
    pub product_id: ProductId,
    pub product_name: String,
    #[serde(default)]
    pub variant_title: String,
    #[serde(default)]
    pub sku: Option<String>,
    pub stock_quantity: u32,
    #[serde(default = "default_low_stock_threshold")]
    pub low_stock_threshold: u32,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl InventoryItem {
    pub fn is_out_of_stock(&self) -> bool {
        self.stock_quantity == 0
    }

    pub fn is_low_stock(&self) -> bool {
        self.stock_quantity > 0 && self.stock_quantity <= self.low_stock_threshold
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockFilter {
    #[default]
    All,
    /// Above the low-stock threshold.
    InStock,
    LowStock,
    OutOfStock,
}

impl StockFilter {
    fn matches(self, item: &InventoryItem) -> bool {
        match self {
            Self::All => true,
            Self::InStock => item.stock_quantity > item.low_stock_threshold,
            Self::LowStock => item.is_low_stock(),
            Self::OutOfStock => item.is_out_of_stock(),
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    #[default]
    ProductName,
    Sku,
    Stock,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryQuery {
    #[serde(default)]
    pub search: Option<String>,
    #[serde(default)]
    pub filter: StockFilter,
    #[serde(default)]
    pub sort: SortKey,
    #[serde(default)]
    pub direction: SortDirection,
    pub page: usize,
    pub page_size: usize,
}

impl Default for InventoryQuery {
    fn default() -> Self {
        Self {
            search: None,
            filter: StockFilter::All,
            sort: SortKey::ProductName,
            direction: SortDirection::Asc,
            page: 1,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryPage {
    pub items: Vec<InventoryItem>,
    pub total: usize,
    pub page: usize,
    pub page_size: usize,
    pub total_pages: usize,
}

/// Mutation produced by an inline stock edit.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct StockAdjustment {
    pub variant_id: VariantId,
    pub quantity_change: i64,
    pub reason: String,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum InventoryError {
    #[error("page must be at least 1")]
    InvalidPage,
    #[error("page size must be between 1 and {max}, got {got}")]
    InvalidPageSize { got: usize, max: usize },
    #[error("stock cannot be negative (got {0})")]
    NegativeStock(i64),
    #[error("stock value {0} is too large")]
    StockOverflow(i64),
    #[error("variant `{0}` is not in the grid")]
    UnknownVariant(VariantId),
}

#[derive(Clone, Debug, Default)]
pub struct InventoryGrid {
    items: Vec<InventoryItem>,
}

impl InventoryGrid {
    pub fn new(items: Vec<InventoryItem>) -> Self {
        Self { items }
    }

    pub fn items(&self) -> &[InventoryItem] {
        &self.items
    }

    pub fn query(&self, query: &InventoryQuery) -> Result<InventoryPage, InventoryError> {
        if query.page == 0 {
            return Err(InventoryError::InvalidPage);
        }
        if query.page_size == 0 || query.page_size > MAX_PAGE_SIZE {
            return Err(InventoryError::InvalidPageSize { got: query.page_size, max: MAX_PAGE_SIZE });
        }

        let needle = query
            .search
            .as_deref()
            .map(str::trim)
            .filter(|search| !search.is_empty())
            .map(str::to_lowercase);

        let mut rows: Vec<&InventoryItem> = self
            .items
            .iter()
            .filter(|item| query.filter.matches(item))
            .filter(|item| match &needle {
                Some(needle) => {
                    item.product_name.to_lowercase().contains(needle)
                        || item
                            .sku
                            .as_deref()
                            .is_some_and(|sku| sku.to_lowercase().contains(needle))
                }
                None => true,
            })
            .collect();

        rows.sort_by(|left, right| {
            let ordering = match query.sort {
                SortKey::ProductName => left
                    .product_name
                    .to_lowercase()
                    .cmp(&right.product_name.to_lowercase()),
                SortKey::Sku => left.sku.cmp(&right.sku),
                SortKey::Stock => left.stock_quantity.cmp(&right.stock_quantity),
            };
            let ordering = match query.direction {
                SortDirection::Asc => ordering,
                SortDirection::Desc => ordering.reverse(),
            };
            match ordering {
                Ordering::Equal => left.variant_id.cmp(&right.variant_id),
                other => other,
            }
        });

        let total = rows.len();
        let total_pages = total.div_ceil(query.page_size);
        // Pages past the addressable range are simply empty.
        let offset = (query.page - 1).checked_mul(query.page_size).unwrap_or(usize::MAX);
        let items = rows
            .into_iter()
            .skip(offset)
            .take(query.page_size)
            .cloned()
            .collect();

        Ok(InventoryPage { items, total, page: query.page, page_size: query.page_size, total_pages })
    }

    /// Turns an inline stock edit into the adjustment to send upstream.
    ///
    /// Returns `Ok(None)` when the value is unchanged.
    pub fn stage_edit(
        &mut self,
        variant_id: &VariantId,
        new_stock: i64,
    ) -> Result<Option<StockAdjustment>, InventoryError> {
        if new_stock < 0 {
            return Err(InventoryError::NegativeStock(new_stock));
        }
        let stock = u32::try_from(new_stock).map_err(|_| InventoryError::StockOverflow(new_stock))?;
        let item = self
            .items
            .iter_mut()
            .find(|item| &item.variant_id == variant_id)
            .ok_or_else(|| InventoryError::UnknownVariant(variant_id.clone()))?;

        let quantity_change = new_stock - i64::from(item.stock_quantity);
        if quantity_change == 0 {
            return Ok(None);
        }
        item.stock_quantity = stock;

        info!(
            event_name = "catalog.stock_edit_staged",
            variant_id = %variant_id,
            quantity_change,
            "inline stock edit staged"
        );
        Ok(Some(StockAdjustment {
            variant_id: variant_id.clone(),
            quantity_change,
            reason: MANUAL_EDIT_REASON.to_string(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::{
        InventoryError, InventoryGrid, InventoryItem, InventoryQuery, SortDirection, SortKey,
        StockFilter, MANUAL_EDIT_REASON,
    };
    use crate::domain::product::{ProductId, VariantId};

    fn item(id: &str, product: &str, sku: &str, stock: u32) -> InventoryItem {
        InventoryItem {
            variant_id: VariantId(id.to_string()),
            product_id: ProductId(format!("p-{product}")),
            product_name: product.to_string(),
            variant_title: "M / Black".to_string(),
            sku: Some(sku.to_string()),
            stock_quantity: stock,
            low_stock_threshold: 5,
            is_active: true,
        }
    }

    fn grid() -> InventoryGrid {
        InventoryGrid::new(vec![
            item("v1", "Oversized Tee", "TEE-OS-M", 12),
            item("v2", "Cargo Pants", "CRG-32", 0),
            item("v3", "Linen Shirt", "LIN-L", 3),
            item("v4", "oversized hoodie", "HOD-OS-L", 5),
            item("v5", "Denim Jacket", "DNM-M", 40),
        ])
    }

    fn ids(items: &[InventoryItem]) -> Vec<&str> {
        items.iter().map(|item| item.variant_id.0.as_str()).collect()
    }

    #[test]
    fn search_matches_name_or_sku_case_insensitively() {
        let page = grid()
            .query(&InventoryQuery { search: Some("OVERSIZED".to_string()), ..InventoryQuery::default() })
            .expect("query");
        assert_eq!(ids(&page.items), vec!["v4", "v1"]);

        let page = grid()
            .query(&InventoryQuery { search: Some("dnm".to_string()), ..InventoryQuery::default() })
            .expect("query");
        assert_eq!(ids(&page.items), vec!["v5"]);
    }

    #[test]
    fn search_ignores_variant_titles() {
        let page = grid()
            .query(&InventoryQuery { search: Some("Black".to_string()), ..InventoryQuery::default() })
            .expect("query");
        assert!(page.items.is_empty());
        assert_eq!(page.total, 0);
    }

    #[test]
    fn stock_filters_partition_the_grid() {
        let run = |filter| {
            let page = grid()
                .query(&InventoryQuery { filter, sort: SortKey::Stock, ..InventoryQuery::default() })
                .expect("query");
            ids(&page.items).into_iter().map(str::to_string).collect::<Vec<_>>()
        };

        assert_eq!(run(StockFilter::OutOfStock), vec!["v2"]);
        assert_eq!(run(StockFilter::LowStock), vec!["v3", "v4"]);
        assert_eq!(run(StockFilter::InStock), vec!["v1", "v5"]);
        assert_eq!(run(StockFilter::All).len(), 5);
    }

    #[test]
    fn huge_page_numbers_return_an_empty_page() {
        let query = InventoryQuery { page: usize::MAX / 50, page_size: 100, ..InventoryQuery::default() };
        let page = grid().query(&query).expect("query");

        assert!(page.items.is_empty());
        assert_eq!(page.total, 5);
        assert_eq!(page.page, usize::MAX / 50);
    }

    #[test]
    fn sorts_descending_and_paginates() {
        let query = InventoryQuery {
            sort: SortKey::Stock,
            direction: SortDirection::Desc,
            page: 2,
            page_size: 2,
            ..InventoryQuery::default()
        };
        let page = grid().query(&query).expect("query");

        assert_eq!(ids(&page.items), vec!["v4", "v3"]);
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);

        let past_end = grid().query(&InventoryQuery { page: 9, ..query }).expect("query");
        assert!(past_end.items.is_empty());
    }

    #[test]
    fn rejects_out_of_range_paging() {
        let grid = grid();
        assert_eq!(
            grid.query(&InventoryQuery { page: 0, ..InventoryQuery::default() }),
            Err(InventoryError::InvalidPage)
        );
        assert_eq!(
            grid.query(&InventoryQuery { page_size: 101, ..InventoryQuery::default() }),
            Err(InventoryError::InvalidPageSize { got: 101, max: 100 })
        );
    }

    #[test]
    fn inline_edits_become_adjustments() {
        let mut grid = grid();
        let id = VariantId("v3".to_string());

        assert_eq!(grid.stage_edit(&id, 3), Ok(None));

        let adjustment = grid.stage_edit(&id, 10).expect("edit").expect("adjustment");
        assert_eq!(adjustment.quantity_change, 7);
        assert_eq!(adjustment.reason, MANUAL_EDIT_REASON);

        let adjustment = grid.stage_edit(&id, 0).expect("edit").expect("adjustment");
        assert_eq!(adjustment.quantity_change, -10);
        assert_eq!(grid.items()[2].stock_quantity, 0);
    }

    #[test]
    fn inline_edits_reject_bad_values() {
        let mut grid = grid();
        assert_eq!(
            grid.stage_edit(&VariantId("v1".to_string()), -1),
            Err(InventoryError::NegativeStock(-1))
        );
        assert_eq!(
            grid.stage_edit(&VariantId("nope".to_string()), 1),
            Err(InventoryError::UnknownVariant(VariantId("nope".to_string())))
        );
        assert_eq!(grid.items()[0].stock_quantity, 12);
    }
}
