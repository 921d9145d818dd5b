pub mod commands;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand, ValueEnum};
use nexure_core::catalog::{SortKey, StockFilter};
use nexure_core::config::{AppConfig, ConfigOverrides, LoadOptions};

use crate::commands::inventory::InventoryArgs;
use crate::commands::variants::VariantsArgs;

#[derive(Debug, Parser)]
#[command(
    name = "nexure",
    about = "NEXURE storefront support CLI",
    long_about = "Chat with the storefront support flows, preview product variants, browse inventory exports, and inspect configuration.",
    after_help = "Examples:\n  nexure chat\n  nexure variants --option Size=S,M,L --option Color=Black,White --base-price 3000\n  nexure inventory --file stock.json --stock low\n  nexure config"
)]
pub struct Cli {
    #[arg(long, global = true, help = "Path to a TOML config file")]
    config: Option<PathBuf>,
    #[arg(long, global = true, help = "Override the configured log level")]
    log_level: Option<String>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    #[command(about = "Start an interactive support conversation on the terminal")]
    Chat,
    #[command(about = "Generate the variant matrix for a set of product options")]
    Variants {
        #[arg(long = "option", value_name = "NAME=V1,V2", help = "Option definition, repeatable")]
        options: Vec<String>,
        #[arg(long, default_value = "0", help = "Base price applied to new variants")]
        base_price: String,
        #[arg(long, help = "JSON file of saved variants to reconcile against")]
        existing: Option<PathBuf>,
    },
    #[command(about = "Search, filter, page and edit an inventory export")]
    Inventory {
        #[arg(long, help = "JSON file of inventory rows")]
        file: PathBuf,
        #[arg(long, help = "Match product name or SKU")]
        search: Option<String>,
        #[arg(long, value_enum, default_value_t = StockArg::All)]
        stock: StockArg,
        #[arg(long, value_enum, default_value_t = SortArg::Name)]
        sort: SortArg,
        #[arg(long, help = "Sort descending")]
        desc: bool,
        #[arg(long, default_value_t = 1)]
        page: usize,
        #[arg(long, default_value_t = 20)]
        page_size: usize,
        #[arg(long = "set-stock", value_name = "VARIANT_ID=N", help = "Stage a stock edit, repeatable")]
        set_stock: Vec<String>,
    },
    #[command(about = "Validate a flow table file, or the built-in flows when none is given")]
    Flows {
        #[arg(long, help = "TOML flow table to validate")]
        file: Option<PathBuf>,
    },
    #[command(
        about = "Inspect effective configuration values with source attribution and redaction"
    )]
    Config,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum StockArg {
    All,
    In,
    Low,
    Out,
}

impl From<StockArg> for StockFilter {
    fn from(value: StockArg) -> Self {
        match value {
            StockArg::All => Self::All,
            StockArg::In => Self::InStock,
            StockArg::Low => Self::LowStock,
            StockArg::Out => Self::OutOfStock,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SortArg {
    Name,
    Sku,
    Stock,
}

impl From<SortArg> for SortKey {
    fn from(value: SortArg) -> Self {
        match value {
            SortArg::Name => Self::ProductName,
            SortArg::Sku => Self::Sku,
            SortArg::Stock => Self::Stock,
        }
    }
}

fn init_logging(config: &AppConfig) {
    use nexure_core::config::LogFormat::*;
    use tracing::Level;

    let log_level = config.logging.level.parse::<Level>().unwrap_or(Level::WARN);
    let builder = tracing_subscriber::fmt()
        .with_target(false)
        .with_max_level(log_level)
        .with_writer(std::io::stderr);

    // stdout carries command payloads, so logs go to stderr.
    let _ = match config.logging.format {
        Compact => builder.compact().try_init(),
        Pretty => builder.pretty().try_init(),
        Json => builder.json().try_init(),
    };
}

pub fn run() -> ExitCode {
    let cli = Cli::parse();

    let options = LoadOptions {
        config_path: cli.config.clone(),
        require_file: cli.config.is_some(),
        overrides: ConfigOverrides { log_level: cli.log_level.clone(), ..ConfigOverrides::default() },
    };
    if let Ok(config) = AppConfig::load(options.clone()) {
        init_logging(&config);
    }

    let result = match cli.command {
        Command::Chat => commands::chat::run(&options),
        Command::Variants { options: option_specs, base_price, existing } => {
            commands::variants::run(&VariantsArgs { options: option_specs, base_price, existing })
        }
        Command::Inventory { file, search, stock, sort, desc, page, page_size, set_stock } => {
            commands::inventory::run(&InventoryArgs {
                search,
                filter: stock.into(),
                sort: sort.into(),
                descending: desc,
                page,
                page_size,
                set_stock,
                ..InventoryArgs::new(file)
            })
        }
        Command::Flows { file } => commands::flows::run(&options, file),
        Command::Config => commands::config::run(&options),
    };

    println!("{}", result.output);
    ExitCode::from(result.exit_code)
}
