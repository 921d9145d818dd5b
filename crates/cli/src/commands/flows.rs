use std::path::{Path, PathBuf};

use nexure_core::config::{AppConfig, LoadOptions};
use nexure_core::errors::DomainError;
use nexure_core::flows::{storefront_flows, FlowDefinitionError, FlowTable};
use serde_json::json;

use crate::commands::CommandResult;

const COMMAND: &str = "flows";

/// Loads the flow table at `path`, or the built-in storefront table.
pub fn load_flow_table(path: Option<&Path>) -> Result<(FlowTable, String), FlowDefinitionError> {
    match path {
        Some(path) => Ok((FlowTable::load(path)?, path.display().to_string())),
        None => Ok((storefront_flows()?, "builtin".to_string())),
    }
}

pub fn run(options: &LoadOptions, file: Option<PathBuf>) -> CommandResult {
    let path = match file {
        Some(file) => Some(file),
        None => match AppConfig::load(options.clone()) {
            Ok(config) => config.chat.flows_path,
            Err(error) => return CommandResult::config_failure(COMMAND, error),
        },
    };

    match load_flow_table(path.as_deref()) {
        Ok((table, source)) => {
            let mut steps: Vec<&str> = table.step_ids().map(|id| id.as_str()).collect();
            steps.sort_unstable();
            CommandResult::data(
                COMMAND,
                json!({
                    "source": source,
                    "welcome": table.welcome().as_str(),
                    "step_count": table.len(),
                    "steps": steps,
                }),
            )
        }
        Err(error) => CommandResult::from_error(COMMAND, DomainError::from(error)),
    }
}
