use std::env;
use std::fs;
use std::sync::{Mutex, OnceLock};

use nexure_cli::commands::inventory::{self, InventoryArgs};
use nexure_cli::commands::variants::{self, VariantsArgs};
use nexure_cli::commands::{config, flows};
use nexure_core::catalog::StockFilter;
use nexure_core::config::LoadOptions;
use serde_json::Value;

#[test]
fn variants_returns_full_matrix_with_display_prices() {
    let result = variants::run(&VariantsArgs {
        options: vec!["Size=S,M".to_string(), "Color=Black,White".to_string()],
        base_price: "3000".to_string(),
        existing: None,
    });
    assert_eq!(result.exit_code, 0, "expected variant generation to succeed");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "variants");
    assert_eq!(payload["status"], "ok");
    assert_eq!(payload["data"]["count"], 4);

    let titles: Vec<&str> = payload["data"]["variants"]
        .as_array()
        .expect("variants array")
        .iter()
        .filter_map(|row| row["title"].as_str())
        .collect();
    assert_eq!(titles, vec!["S / Black", "S / White", "M / Black", "M / White"]);
    assert_eq!(payload["data"]["variants"][0]["display_price"], "Rs. 3,000");
}

#[test]
fn variants_keeps_saved_rows_when_reconciling() {
    let dir = tempfile::tempdir().expect("temp dir");
    let existing = dir.path().join("variants.json");
    fs::write(
        &existing,
        r#"[{"id":"var-1","option_values":["M"],"price":"3500","sku":"TEE-M","stock_quantity":9,"is_active":true,"image_url":null}]"#,
    )
    .expect("write saved variants");

    let result = variants::run(&VariantsArgs {
        options: vec!["Size=S,M".to_string()],
        base_price: "3000".to_string(),
        existing: Some(existing),
    });
    assert_eq!(result.exit_code, 0, "{}", result.output);

    let payload = parse_payload(&result.output);
    let medium = &payload["data"]["variants"][1];
    assert_eq!(medium["title"], "M");
    assert_eq!(medium["variant"]["sku"], "TEE-M");
    assert_eq!(medium["variant"]["stock_quantity"], 9);
    assert_eq!(medium["display_price"], "Rs. 3,500");
}

#[test]
fn variants_rejects_more_than_three_options() {
    let result = variants::run(&VariantsArgs {
        options: vec![
            "Size=S".to_string(),
            "Color=Black".to_string(),
            "Fit=Slim".to_string(),
            "Sleeve=Long".to_string(),
        ],
        base_price: "3000".to_string(),
        existing: None,
    });
    assert_eq!(result.exit_code, 2, "expected validation exit code");

    let payload = parse_payload(&result.output);
    assert_eq!(payload["status"], "error");
    assert_eq!(payload["error_class"], "bad_request");
}

#[test]
fn variants_rejects_unparseable_base_price() {
    let result = variants::run(&VariantsArgs {
        options: vec!["Size=S".to_string()],
        base_price: "three thousand".to_string(),
        existing: None,
    });
    assert_eq!(result.exit_code, 2);
    assert_eq!(parse_payload(&result.output)["error_class"], "invalid_input");
}

#[test]
fn inventory_filters_pages_and_stages_edits() {
    let dir = tempfile::tempdir().expect("temp dir");
    let file = dir.path().join("stock.json");
    fs::write(
        &file,
        r#"[
            {"variant_id":"v-1","product_id":"p-1","product_name":"Linen Shirt","variant_title":"S","sku":"LS-S","stock_quantity":2},
            {"variant_id":"v-2","product_id":"p-1","product_name":"Linen Shirt","variant_title":"M","sku":"LS-M","stock_quantity":40},
            {"variant_id":"v-3","product_id":"p-2","product_name":"Cargo Pants","variant_title":"32","sku":"CP-32","stock_quantity":0}
        ]"#,
    )
    .expect("write inventory rows");

    let mut args = InventoryArgs::new(&file);
    args.filter = StockFilter::LowStock;
    args.set_stock = vec!["v-2=3".to_string()];

    let result = inventory::run(&args);
    assert_eq!(result.exit_code, 0, "{}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["data"]["page"]["total"], 2);
    assert_eq!(payload["data"]["adjustments"][0]["variant_id"], "v-2");
    assert_eq!(payload["data"]["adjustments"][0]["quantity_change"], -37);
    assert_eq!(payload["data"]["adjustments"][0]["reason"], "manual_edit");
}

#[test]
fn inventory_rejects_negative_stock_edits() {
    let dir = tempfile::tempdir().expect("temp dir");
    let file = dir.path().join("stock.json");
    fs::write(
        &file,
        r#"[{"variant_id":"v-1","product_id":"p-1","product_name":"Linen Shirt","stock_quantity":2}]"#,
    )
    .expect("write inventory rows");

    let mut args = InventoryArgs::new(&file);
    args.set_stock = vec!["v-1=-4".to_string()];

    let result = inventory::run(&args);
    assert_eq!(result.exit_code, 2);
    assert_eq!(parse_payload(&result.output)["error_class"], "bad_request");
}

#[test]
fn inventory_reports_missing_file_as_io_failure() {
    let result = inventory::run(&InventoryArgs::new("does-not-exist.json"));
    assert_eq!(result.exit_code, 1);
    assert_eq!(parse_payload(&result.output)["error_class"], "io");
}

#[test]
fn flows_validates_builtin_table() {
    with_env(&[], || {
        let result = flows::run(&LoadOptions::default(), None);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["data"]["source"], "builtin");
        assert_eq!(payload["data"]["welcome"], "welcome");
        let steps = payload["data"]["steps"].as_array().expect("steps array");
        assert!(steps.iter().any(|step| step == "track_order_email"));
    });
}

#[test]
fn flows_reports_broken_table_file_as_bad_request() {
    let dir = tempfile::tempdir().expect("temp dir");
    let file = dir.path().join("flows.toml");
    fs::write(&file, "welcome = \"missing\"\nsteps = []\n").expect("write flow table");

    let result = flows::run(&LoadOptions::default(), Some(file));
    assert_eq!(result.exit_code, 2, "{}", result.output);

    let payload = parse_payload(&result.output);
    assert_eq!(payload["command"], "flows");
    assert_eq!(payload["error_class"], "bad_request");
}

#[test]
fn config_reports_env_sources_and_redacts_api_key() {
    with_env(
        &[("NEXURE_API_KEY", "nx-live-secret"), ("NEXURE_LOG_LEVEL", "debug")],
        || {
            let result = config::run(&LoadOptions::default());
            assert_eq!(result.exit_code, 0, "{}", result.output);
            assert!(!result.output.contains("nx-live-secret"));

            let payload = parse_payload(&result.output);
            let data = &payload["data"];
            assert_eq!(data["effective"]["api"]["api_key"], "<redacted>");
            assert_eq!(data["effective"]["logging"]["level"], "debug");
            assert_eq!(data["sources"]["api.api_key"], "env (NEXURE_API_KEY)");
            assert_eq!(data["sources"]["logging.level"], "env (NEXURE_LOG_LEVEL)");
            assert_eq!(data["sources"]["chat.flows_path"], "default");
        },
    );
}

#[test]
fn config_attributes_values_to_explicit_file() {
    with_env(&[], || {
        let dir = tempfile::tempdir().expect("temp dir");
        let path = dir.path().join("nexure.toml");
        fs::write(&path, "[api]\nbase_url = \"https://api.nexure.test/api/v1\"\n")
            .expect("write config file");

        let options =
            LoadOptions { config_path: Some(path.clone()), require_file: true, ..LoadOptions::default() };
        let result = config::run(&options);
        assert_eq!(result.exit_code, 0, "{}", result.output);

        let payload = parse_payload(&result.output);
        let data = &payload["data"];
        assert_eq!(data["effective"]["api"]["base_url"], "https://api.nexure.test/api/v1");
        assert_eq!(data["sources"]["api.base_url"], format!("file ({})", path.display()));
        assert_eq!(data["sources"]["api.timeout_secs"], "default");
    });
}

#[test]
fn config_returns_validation_failure_for_bad_env_override() {
    with_env(&[("NEXURE_API_TIMEOUT_SECS", "soon")], || {
        let result = config::run(&LoadOptions::default());
        assert_eq!(result.exit_code, 2);

        let payload = parse_payload(&result.output);
        assert_eq!(payload["command"], "config");
        assert_eq!(payload["error_class"], "config_validation");
    });
}

fn parse_payload(output: &str) -> Value {
    serde_json::from_str(output).expect("command output should be valid JSON")
}

fn with_env(vars: &[(&str, &str)], test_fn: impl FnOnce()) {
    static ENV_LOCK: OnceLock<Mutex<()>> = OnceLock::new();
    let _guard =
        ENV_LOCK.get_or_init(|| Mutex::new(())).lock().expect("env mutex should not be poisoned");

    let keys = [
        "NEXURE_API_BASE_URL",
        "NEXURE_API_TIMEOUT_SECS",
        "NEXURE_API_KEY",
        "NEXURE_STOREFRONT_BASE_URL",
        "NEXURE_CHAT_MAX_MESSAGE_CHARS",
        "NEXURE_CHAT_FLOWS_PATH",
        "NEXURE_LOGGING_LEVEL",
        "NEXURE_LOGGING_FORMAT",
        "NEXURE_LOG_LEVEL",
        "NEXURE_LOG_FORMAT",
    ];

    let previous_values: Vec<(&str, Option<String>)> =
        keys.iter().map(|key| (*key, env::var(key).ok())).collect();

    for key in &keys {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    test_fn();

    for (key, value) in previous_values {
        if let Some(value) = value {
            env::set_var(key, value);
        } else {
            env::remove_var(key);
        }
    }
}
