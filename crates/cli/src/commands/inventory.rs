use std::fs;
use std::path::PathBuf;

use nexure_core::catalog::{
    InventoryGrid, InventoryItem, InventoryQuery, SortDirection, SortKey, StockFilter,
};
use nexure_core::domain::product::VariantId;
use nexure_core::errors::DomainError;
use serde_json::json;

use crate::commands::{CommandResult, EXIT_FAILURE, EXIT_VALIDATION};

const COMMAND: &str = "inventory";

#[derive(Clone, Debug)]
pub struct InventoryArgs {
    /// JSON array of inventory rows.
    pub file: PathBuf,
    pub search: Option<String>,
    pub filter: StockFilter,
    pub sort: SortKey,
    pub descending: bool,
    pub page: usize,
    pub page_size: usize,
    /// Inline edits as `VARIANT_ID=NEW_STOCK`, applied before the query.
    pub set_stock: Vec<String>,
}

impl InventoryArgs {
    pub fn new(file: impl Into<PathBuf>) -> Self {
        let defaults = InventoryQuery::default();
        Self {
            file: file.into(),
            search: defaults.search,
            filter: defaults.filter,
            sort: defaults.sort,
            descending: false,
            page: defaults.page,
            page_size: defaults.page_size,
            set_stock: Vec::new(),
        }
    }
}

pub fn run(args: &InventoryArgs) -> CommandResult {
    let raw = match fs::read_to_string(&args.file) {
        Ok(raw) => raw,
        Err(error) => {
            return CommandResult::failure(
                COMMAND,
                "io",
                format!("could not read `{}`: {error}", args.file.display()),
                EXIT_FAILURE,
            )
        }
    };
    let items: Vec<InventoryItem> = match serde_json::from_str(&raw) {
        Ok(items) => items,
        Err(error) => {
            return invalid_input(format!(
                "`{}` is not a JSON array of inventory rows: {error}",
                args.file.display()
            ))
        }
    };

    let mut grid = InventoryGrid::new(items);
    let mut adjustments = Vec::new();
    for edit in &args.set_stock {
        let (variant_id, stock) = match parse_edit(edit) {
            Ok(parsed) => parsed,
            Err(message) => return invalid_input(message),
        };
        match grid.stage_edit(&variant_id, stock) {
            Ok(Some(adjustment)) => adjustments.push(adjustment),
            Ok(None) => {}
            Err(error) => return CommandResult::from_error(COMMAND, DomainError::from(error)),
        }
    }

    let query = InventoryQuery {
        search: args.search.clone(),
        filter: args.filter,
        sort: args.sort,
        direction: if args.descending { SortDirection::Desc } else { SortDirection::Asc },
        page: args.page,
        page_size: args.page_size,
    };
    match grid.query(&query) {
        Ok(page) => CommandResult::data(COMMAND, json!({ "page": page, "adjustments": adjustments })),
        Err(error) => CommandResult::from_error(COMMAND, DomainError::from(error)),
    }
}

fn parse_edit(spec: &str) -> Result<(VariantId, i64), String> {
    let (variant_id, stock) = spec
        .split_once('=')
        .ok_or_else(|| format!("stock edit `{spec}` must look like VARIANT_ID=NEW_STOCK"))?;
    let stock = stock
        .trim()
        .parse::<i64>()
        .map_err(|_| format!("stock edit `{spec}` has a non-numeric stock value"))?;
    Ok((VariantId(variant_id.trim().to_string()), stock))
}

fn invalid_input(message: impl Into<String>) -> CommandResult {
    CommandResult::failure(COMMAND, "invalid_input", message, EXIT_VALIDATION)
}
