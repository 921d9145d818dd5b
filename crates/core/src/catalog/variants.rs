use std::collections::{HashMap, HashSet};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::domain::product::VariantId;

/// Most option axes a product may carry.
pub const MAX_OPTIONS: usize = 3;
pub const COMBINATION_SEPARATOR: &str = " / ";

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptionDefinition {
    pub name: String,
    pub values: Vec<String>,
}

impl OptionDefinition {
    pub fn new<V: Into<String>>(name: impl Into<String>, values: impl IntoIterator<Item = V>) -> Self {
        Self { name: name.into(), values: values.into_iter().map(Into::into).collect() }
    }

    /// Trimmed, non-empty values in their original order, first occurrence wins.
    pub fn normalized_values(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.values
            .iter()
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
            .filter(|value| seen.insert(value.to_string()))
            .map(str::to_string)
            .collect()
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variant {
    #[serde(default)]
    pub id: Option<VariantId>,
    pub option_values: Vec<String>,
    pub price: Decimal,
    #[serde(default)]
    pub sku: Option<String>,
    #[serde(default)]
    pub stock_quantity: u32,
    pub is_active: bool,
    #[serde(default)]
    pub image_url: Option<String>,
}

impl Variant {
    fn synthesized(option_values: Vec<String>, base_price: Decimal) -> Self {
        Self {
            id: None,
            option_values,
            price: base_price,
            sku: None,
            stock_quantity: 0,
            is_active: true,
            image_url: None,
        }
    }

    pub fn combination_key(&self) -> String {
        combination_key(&self.option_values)
    }
}

pub fn combination_key(values: &[String]) -> String {
    values.join(COMBINATION_SEPARATOR)
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum VariantError {
    #[error("at most {max} options are supported, got {count}")]
    TooManyOptions { count: usize, max: usize },
    #[error("option name must not be empty")]
    EmptyOptionName,
    #[error("option `{0}` is defined more than once")]
    DuplicateOptionName(String),
    #[error("option `{0}` does not exist")]
    UnknownOption(String),
    #[error("no variant matches combination `{0}`")]
    UnknownVariant(String),
}

/// Cartesian product of option values, reconciled against saved variants.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct VariantGenerator {
    base_price: Decimal,
}

impl VariantGenerator {
    pub fn new(base_price: Decimal) -> Self {
        Self { base_price }
    }

    pub fn base_price(&self) -> Decimal {
        self.base_price
    }

    pub fn generate(
        &self,
        options: &[OptionDefinition],
        existing: &[Variant],
    ) -> Result<Vec<Variant>, VariantError> {
        validate_options(options)?;

        let axes: Vec<Vec<String>> = options
            .iter()
            .map(OptionDefinition::normalized_values)
            .filter(|values| !values.is_empty())
            .collect();
        if axes.is_empty() {
            return Ok(Vec::new());
        }

        let mut combinations: Vec<Vec<String>> = vec![Vec::new()];
        for values in &axes {
            combinations = combinations
                .into_iter()
                .flat_map(|prefix| {
                    values.iter().map(move |value| {
                        let mut combination = prefix.clone();
                        combination.push(value.clone());
                        combination
                    })
                })
                .collect();
        }

        // Matched on the exact value tuple: a value may itself contain the separator.
        let mut saved: HashMap<&[String], &Variant> = HashMap::new();
        for variant in existing {
            saved.entry(variant.option_values.as_slice()).or_insert(variant);
        }

        let mut reused = 0usize;
        let variants: Vec<Variant> = combinations
            .into_iter()
            .map(|combination| match saved.get(combination.as_slice()) {
                Some(variant) => {
                    reused += 1;
                    Variant { option_values: combination, ..(*variant).clone() }
                }
                None => Variant::synthesized(combination, self.base_price),
            })
            .collect();

        debug!(
            event_name = "catalog.variants_generated",
            options = axes.len(),
            variants = variants.len(),
            reused,
            "variant set regenerated"
        );
        Ok(variants)
    }
}

fn validate_options(options: &[OptionDefinition]) -> Result<(), VariantError> {
    if options.len() > MAX_OPTIONS {
        return Err(VariantError::TooManyOptions { count: options.len(), max: MAX_OPTIONS });
    }
    let mut names = HashSet::new();
    for option in options {
        let name = option.name.trim();
        if name.is_empty() {
            return Err(VariantError::EmptyOptionName);
        }
        if !names.insert(name) {
            return Err(VariantError::DuplicateOptionName(name.to_string()));
        }
    }
    Ok(())
}

/// Editable option set whose variants are regenerated on every change.
#[derive(Clone, Debug)]
pub struct VariantManager {
    generator: VariantGenerator,
    options: Vec<OptionDefinition>,
    variants: Vec<Variant>,
}

impl VariantManager {
    pub fn new(base_price: Decimal) -> Self {
        Self { generator: VariantGenerator::new(base_price), options: Vec::new(), variants: Vec::new() }
    }

    pub fn from_saved(
        base_price: Decimal,
        options: Vec<OptionDefinition>,
        variants: Vec<Variant>,
    ) -> Result<Self, VariantError> {
        let generator = VariantGenerator::new(base_price);
        let variants = generator.generate(&options, &variants)?;
        Ok(Self { generator, options, variants })
    }

    pub fn options(&self) -> &[OptionDefinition] {
        &self.options
    }

    pub fn variants(&self) -> &[Variant] {
        &self.variants
    }

    /// Adds `option`, or replaces the option with the same name.
    pub fn set_option(&mut self, option: OptionDefinition) -> Result<(), VariantError> {
        let mut options = self.options.clone();
        match options.iter_mut().find(|existing| existing.name.trim() == option.name.trim()) {
            Some(existing) => *existing = option,
            None => options.push(option),
        }
        self.apply(options)
    }

    pub fn remove_option(&mut self, name: &str) -> Result<(), VariantError> {
        let mut options = self.options.clone();
        let before = options.len();
        options.retain(|option| option.name.trim() != name.trim());
        if options.len() == before {
            return Err(VariantError::UnknownOption(name.to_string()));
        }
        self.apply(options)
    }

    pub fn edit_variant(
        &mut self,
        key: &str,
        edit: impl FnOnce(&mut Variant),
    ) -> Result<(), VariantError> {
        let variant = self
            .variants
            .iter_mut()
            .find(|variant| variant.combination_key() == key)
            .ok_or_else(|| VariantError::UnknownVariant(key.to_string()))?;
        edit(variant);
        Ok(())
    }

    fn apply(&mut self, options: Vec<OptionDefinition>) -> Result<(), VariantError> {
        self.variants = self.generator.generate(&options, &self.variants)?;
        self.options = options;
        Ok(())
    }
}
