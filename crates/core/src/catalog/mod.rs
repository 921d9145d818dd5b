//! Admin-side catalog helpers: variant generation and the inventory grid.

pub mod inventory;
pub mod variants;

pub use inventory::{
    InventoryError, InventoryGrid, InventoryItem, InventoryPage, InventoryQuery, SortDirection,
    SortKey, StockAdjustment, StockFilter,
};
pub use variants::{
    combination_key, OptionDefinition, Variant, VariantError, VariantGenerator, VariantManager,
    COMBINATION_SEPARATOR, MAX_OPTIONS,
};
