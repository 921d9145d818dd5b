use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use nexure_core::catalog::{OptionDefinition, Variant, VariantGenerator};
use nexure_core::errors::DomainError;
use nexure_core::format::format_price;
use rust_decimal::Decimal;
use serde_json::json;

use crate::commands::{CommandResult, EXIT_FAILURE, EXIT_VALIDATION};

const COMMAND: &str = "variants";

#[derive(Clone, Debug, Default)]
pub struct VariantsArgs {
    /// `Name=value1,value2` specs in option order.
    pub options: Vec<String>,
    pub base_price: String,
    /// JSON array of previously saved variants to reconcile against.
    pub existing: Option<PathBuf>,
}

pub fn run(args: &VariantsArgs) -> CommandResult {
    let base_price = match Decimal::from_str(args.base_price.trim()) {
        Ok(price) if price >= Decimal::ZERO => price,
        Ok(_) => return invalid_input("base price must not be negative"),
        Err(error) => return invalid_input(format!("invalid base price `{}`: {error}", args.base_price)),
    };

    let options = match args.options.iter().map(|spec| parse_option(spec)).collect::<Result<Vec<_>, _>>() {
        Ok(options) => options,
        Err(message) => return invalid_input(message),
    };

    let existing = match &args.existing {
        Some(path) => match read_existing(path) {
            Ok(existing) => existing,
            Err(result) => return result,
        },
        None => Vec::new(),
    };

    let variants = match VariantGenerator::new(base_price).generate(&options, &existing) {
        Ok(variants) => variants,
        Err(error) => return CommandResult::from_error(COMMAND, DomainError::from(error)),
    };

    let rows: Vec<_> = variants
        .iter()
        .map(|variant| {
            json!({
                "title": variant.combination_key(),
                "display_price": format_price(variant.price),
                "variant": variant,
            })
        })
        .collect();

    CommandResult::data(
        COMMAND,
        json!({
            "base_price": base_price,
            "count": rows.len(),
            "variants": rows,
        }),
    )
}

/// Parses `Size=S,M,L` into an option definition.
pub fn parse_option(spec: &str) -> Result<OptionDefinition, String> {
    let (name, values) = spec
        .split_once('=')
        .ok_or_else(|| format!("option `{spec}` must look like Name=value1,value2"))?;
    Ok(OptionDefinition::new(name.trim(), values.split(',')))
}

fn read_existing(path: &Path) -> Result<Vec<Variant>, CommandResult> {
    let raw = fs::read_to_string(path).map_err(|error| {
        CommandResult::failure(
            COMMAND,
            "io",
            format!("could not read `{}`: {error}", path.display()),
            EXIT_FAILURE,
        )
    })?;
    serde_json::from_str(&raw).map_err(|error| {
        invalid_input(format!("`{}` is not a JSON array of variants: {error}", path.display()))
    })
}

fn invalid_input(message: impl Into<String>) -> CommandResult {
    CommandResult::failure(COMMAND, "invalid_input", message, EXIT_VALIDATION)
}

#[cfg(test)]
mod tests {
    use super::parse_option;

    #[test]
    fn option_specs_split_on_equals_and_commas() {
        let option = parse_option(" Size = S, M ,L").expect("valid spec");
        assert_eq!(option.name, "Size");
        assert_eq!(option.normalized_values(), vec!["S", "M", "L"]);
    }

    #[test]
    fn option_specs_need_a_name() {
        assert!(parse_option("S,M").is_err());
    }
}
