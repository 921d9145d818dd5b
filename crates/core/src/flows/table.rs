use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::chat::{ChatOption, MessageKind, NewMessage};
use crate::flows::action::{Action, StepId};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepKind {
    Text,
    Options,
    Input,
    Welcome,
}

impl StepKind {
    fn message_kind(self) -> MessageKind {
        match self {
            Self::Text | Self::Input => MessageKind::Text,
            Self::Options => MessageKind::Options,
            Self::Welcome => MessageKind::Welcome,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowOptionDefinition {
    pub label: String,
    pub target: Action,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct InputFieldDefinition {
    pub name: String,
    #[serde(default)]
    pub placeholder: String,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub error_message: Option<String>,
    pub next: Action,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowStepDefinition {
    pub id: StepId,
    pub prompt: String,
    pub kind: StepKind,
    #[serde(default)]
    pub options: Vec<FlowOptionDefinition>,
    #[serde(default)]
    pub input: Option<InputFieldDefinition>,
}

/// Steps the controller falls back to when it builds its own recovery options.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecoveryRoutes {
    pub main_menu: StepId,
    pub track_order: StepId,
    pub contact_support: StepId,
}

/// Serializable form of a flow table, as written in a TOML flow file.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct FlowTableDefinition {
    pub welcome: StepId,
    pub recovery: RecoveryRoutes,
    pub steps: Vec<FlowStepDefinition>,
}

#[derive(Debug, Error)]
pub enum FlowDefinitionError {
    #[error("flow table has no steps")]
    Empty,
    #[error("step `{0}` is defined more than once")]
    DuplicateStep(StepId),
    #[error("step `{step}` option `{label}` targets unknown step `{target}`")]
    DanglingOption { step: StepId, label: String, target: StepId },
    #[error("step `{step}` input `{field}` continues to unknown step `{target}`")]
    DanglingInput { step: StepId, field: String, target: StepId },
    #[error("step `{step}` input `{field}` has an invalid pattern: {source}")]
    InvalidPattern { step: StepId, field: String, source: regex::Error },
    #[error("step `{step}` declares kind input but has no input field")]
    MissingInputField { step: StepId },
    #[error("{route} route points at unknown step `{target}`")]
    UnknownRoute { route: &'static str, target: StepId },
    #[error("could not read flow file `{path}`: {source}")]
    ReadFile { path: PathBuf, source: std::io::Error },
    #[error("could not parse flow file `{path}`: {source}")]
    ParseFile { path: PathBuf, source: toml::de::Error },
}

#[derive(Clone, Debug)]
pub struct InputField {
    pub name: String,
    pub placeholder: String,
    pub pattern: Option<Regex>,
    pub error_message: Option<String>,
    pub next: Action,
}

impl InputField {
    pub const DEFAULT_ERROR: &'static str = "That doesn't look right. Please try again.";

    /// Returns the error to show when `value` fails the field's pattern.
    pub fn validate(&self, value: &str) -> Result<(), String> {
        match &self.pattern {
            Some(pattern) if !pattern.is_match(value) => Err(self
                .error_message
                .clone()
                .unwrap_or_else(|| Self::DEFAULT_ERROR.to_string())),
            _ => Ok(()),
        }
    }
}

#[derive(Clone, Debug)]
pub struct FlowStep {
    pub id: StepId,
    pub prompt: String,
    pub kind: StepKind,
    pub options: Vec<ChatOption>,
    pub input: Option<InputField>,
}

impl FlowStep {
    pub fn to_message(&self) -> NewMessage {
        NewMessage::bot_with_kind(self.kind.message_kind(), self.prompt.clone())
            .with_options(self.options.clone())
    }
}

/// Immutable, fully wired set of flow steps.
#[derive(Clone, Debug)]
pub struct FlowTable {
    welcome: StepId,
    recovery: RecoveryRoutes,
    steps: BTreeMap<StepId, FlowStep>,
}

impl FlowTable {
    pub fn from_definition(definition: FlowTableDefinition) -> Result<Self, FlowDefinitionError> {
        if definition.steps.is_empty() {
            return Err(FlowDefinitionError::Empty);
        }

        let mut steps = BTreeMap::new();
        for step in definition.steps {
            if steps.contains_key(&step.id) {
                return Err(FlowDefinitionError::DuplicateStep(step.id));
            }
            let compiled = compile_step(step)?;
            steps.insert(compiled.id.clone(), compiled);
        }

        let table = Self { welcome: definition.welcome, recovery: definition.recovery, steps };
        table.check_wiring()?;
        Ok(table)
    }

    pub fn load(path: &Path) -> Result<Self, FlowDefinitionError> {
        let raw = fs::read_to_string(path)
            .map_err(|source| FlowDefinitionError::ReadFile { path: path.to_path_buf(), source })?;
        let definition = toml::from_str::<FlowTableDefinition>(&raw)
            .map_err(|source| FlowDefinitionError::ParseFile { path: path.to_path_buf(), source })?;
        Self::from_definition(definition)
    }

    pub fn get(&self, id: &StepId) -> Option<&FlowStep> {
        self.steps.get(id)
    }

    pub fn contains(&self, id: &StepId) -> bool {
        self.steps.contains_key(id)
    }

    pub fn welcome(&self) -> &StepId {
        &self.welcome
    }

    pub fn recovery(&self) -> &RecoveryRoutes {
        &self.recovery
    }

    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn step_ids(&self) -> impl Iterator<Item = &StepId> {
        self.steps.keys()
    }

    fn check_wiring(&self) -> Result<(), FlowDefinitionError> {
        let routes = [
            ("welcome", &self.welcome),
            ("main_menu", &self.recovery.main_menu),
            ("track_order", &self.recovery.track_order),
            ("contact_support", &self.recovery.contact_support),
        ];
        for (route, target) in routes {
            if !self.contains(target) {
                return Err(FlowDefinitionError::UnknownRoute { route, target: target.clone() });
            }
        }

        for step in self.steps.values() {
            for option in &step.options {
                if let Some(target) = option.action.target_step() {
                    if !self.contains(target) {
                        return Err(FlowDefinitionError::DanglingOption {
                            step: step.id.clone(),
                            label: option.label.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }

            if let Some(input) = &step.input {
                if let Some(target) = input.next.target_step() {
                    if !self.contains(target) {
                        return Err(FlowDefinitionError::DanglingInput {
                            step: step.id.clone(),
                            field: input.name.clone(),
                            target: target.clone(),
                        });
                    }
                }
            }
        }

        Ok(())
    }
}

fn compile_step(step: FlowStepDefinition) -> Result<FlowStep, FlowDefinitionError> {
    if step.kind == StepKind::Input && step.input.is_none() {
        return Err(FlowDefinitionError::MissingInputField { step: step.id });
    }

    let input = match step.input {
        Some(field) => {
            let pattern = match field.pattern {
                Some(pattern) => Some(Regex::new(&pattern).map_err(|source| {
                    FlowDefinitionError::InvalidPattern {
                        step: step.id.clone(),
                        field: field.name.clone(),
                        source,
                    }
                })?),
                None => None,
            };
            Some(InputField {
                name: field.name,
                placeholder: field.placeholder,
                pattern,
                error_message: field.error_message,
                next: field.next,
            })
        }
        None => None,
    };

    let options = step
        .options
        .into_iter()
        .map(|option| ChatOption::new(option.label, option.target))
        .collect();

    Ok(FlowStep { id: step.id, prompt: step.prompt, kind: step.kind, options, input })
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::TempDir;

    use super::{
        FlowDefinitionError, FlowOptionDefinition, FlowStepDefinition, FlowTable,
        FlowTableDefinition, InputFieldDefinition, RecoveryRoutes, StepKind,
    };
    use crate::domain::chat::MessageKind;
    use crate::flows::action::{Action, StepId};

    fn step(id: &str, kind: StepKind, options: Vec<(&str, Action)>) -> FlowStepDefinition {
        FlowStepDefinition {
            id: StepId::from(id),
            prompt: format!("prompt for {id}"),
            kind,
            options: options
                .into_iter()
                .map(|(label, target)| FlowOptionDefinition { label: label.to_string(), target })
                .collect(),
            input: None,
        }
    }

    fn definition(steps: Vec<FlowStepDefinition>) -> FlowTableDefinition {
        FlowTableDefinition {
            welcome: "welcome".into(),
            recovery: RecoveryRoutes {
                main_menu: "welcome".into(),
                track_order: "welcome".into(),
                contact_support: "welcome".into(),
            },
            steps,
        }
    }

    #[test]
    fn dangling_option_targets_are_rejected_at_construction() {
        let error = FlowTable::from_definition(definition(vec![step(
            "welcome",
            StepKind::Welcome,
            vec![("Shipping", Action::enter("shiping_info"))],
        )]))
        .expect_err("typo in target must be rejected");

        assert!(matches!(
            error,
            FlowDefinitionError::DanglingOption { ref target, .. } if target.as_str() == "shiping_info"
        ));
    }

    #[test]
    fn reserved_terminals_need_no_table_entry() {
        let table = FlowTable::from_definition(definition(vec![step(
            "welcome",
            StepKind::Welcome,
            vec![
                ("Track", Action::TrackOrder),
                ("Shop", Action::navigate("/shop")),
                ("Sizes", Action::ask("What sizes do you stock?")),
            ],
        )]))
        .expect("terminal actions are always valid");

        assert_eq!(table.len(), 1);
        let message = table.get(table.welcome()).expect("welcome step").to_message();
        assert_eq!(message.kind, MessageKind::Welcome);
        assert_eq!(message.options.len(), 3);
    }

    #[test]
    fn duplicate_steps_and_invalid_patterns_are_rejected() {
        let duplicate = FlowTable::from_definition(definition(vec![
            step("welcome", StepKind::Welcome, vec![]),
            step("welcome", StepKind::Text, vec![]),
        ]))
        .expect_err("duplicate ids");
        assert!(matches!(duplicate, FlowDefinitionError::DuplicateStep(_)));

        let mut input_step = step("ask", StepKind::Input, vec![]);
        input_step.input = Some(InputFieldDefinition {
            name: "order_number".to_string(),
            placeholder: String::new(),
            pattern: Some("([unclosed".to_string()),
            error_message: None,
            next: Action::TrackOrder,
        });
        let invalid = FlowTable::from_definition(definition(vec![
            step("welcome", StepKind::Welcome, vec![]),
            input_step,
        ]))
        .expect_err("invalid regex");
        assert!(matches!(invalid, FlowDefinitionError::InvalidPattern { .. }));
    }

    #[test]
    fn input_steps_require_an_input_field_and_routes_must_resolve() {
        let missing = FlowTable::from_definition(definition(vec![
            step("welcome", StepKind::Welcome, vec![]),
            step("ask", StepKind::Input, vec![]),
        ]))
        .expect_err("input kind without field");
        assert!(matches!(missing, FlowDefinitionError::MissingInputField { .. }));

        let mut bad_routes = definition(vec![step("welcome", StepKind::Welcome, vec![])]);
        bad_routes.recovery.contact_support = "support".into();
        let error = FlowTable::from_definition(bad_routes).expect_err("unknown route");
        assert!(matches!(error, FlowDefinitionError::UnknownRoute { route: "contact_support", .. }));
    }

    #[test]
    fn tables_load_from_toml_files() {
        let dir = TempDir::new().expect("tempdir");
        let path = dir.path().join("flows.toml");
        fs::write(
            &path,
            r#"
welcome = "welcome"

[recovery]
main_menu = "welcome"
track_order = "order"
contact_support = "welcome"

[[steps]]
id = "welcome"
prompt = "Hi there!"
kind = "welcome"
options = [
  { label = "Track", target = { type = "enter_step", step = "order" } },
  { label = "Shop", target = { type = "navigate_to", path = "/shop" } },
]

[[steps]]
id = "order"
prompt = "Your order number?"
kind = "input"

[steps.input]
name = "order_number"
placeholder = "e.g. 100042"
pattern = "^[0-9]+$"
error_message = "Digits only"
next = { type = "track_order" }
"#,
        )
        .expect("write flow file");

        let table = FlowTable::load(&path).expect("flow file loads");
        let order = table.get(&"order".into()).expect("order step");
        let input = order.input.as_ref().expect("input field");
        assert_eq!(input.validate("100042"), Ok(()));
        assert_eq!(input.validate("abc"), Err("Digits only".to_string()));
        assert_eq!(input.next, Action::TrackOrder);
    }
}
