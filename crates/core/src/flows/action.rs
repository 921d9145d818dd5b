use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct StepId(pub String);

impl StepId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for StepId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for StepId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

/// Everything a chat option or an input field can trigger.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    /// Open a storefront page, optionally entering a step afterwards.
    NavigateTo {
        path: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        step: Option<StepId>,
    },
    EnterStep { step: StepId },
    TrackOrder,
    FreeFormReply { text: String },
}

impl Action {
    pub fn enter(step: impl Into<StepId>) -> Self {
        Self::EnterStep { step: step.into() }
    }

    pub fn navigate(path: impl Into<String>) -> Self {
        Self::NavigateTo { path: path.into(), step: None }
    }

    pub fn ask(text: impl Into<String>) -> Self {
        Self::FreeFormReply { text: text.into() }
    }

    /// Step this action will enter through the flow table, if any.
    pub fn target_step(&self) -> Option<&StepId> {
        match self {
            Self::EnterStep { step } => Some(step),
            Self::NavigateTo { step, .. } => step.as_ref(),
            Self::TrackOrder | Self::FreeFormReply { .. } => None,
        }
    }

    pub fn action_key(&self) -> String {
        match self {
            Self::NavigateTo { path, .. } => format!("navigate:{path}"),
            Self::EnterStep { step } => format!("step:{step}"),
            Self::TrackOrder => "track_order".to_string(),
            Self::FreeFormReply { .. } => "free_form_reply".to_string(),
        }
    }
}
