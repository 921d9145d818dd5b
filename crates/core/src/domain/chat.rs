use serde::{Deserialize, Serialize};

use crate::domain::order::OrderResultData;
use crate::flows::action::Action;

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct MessageId(pub u64);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Sender {
    User,
    Bot,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum MessageKind {
    Text,
    Options,
    Loading,
    Welcome,
    OrderResult,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatOption {
    pub label: String,
    pub action: Action,
}

impl ChatOption {
    pub fn new(label: impl Into<String>, action: Action) -> Self {
        Self { label: label.into(), action }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: MessageId,
    pub sender: Sender,
    pub kind: MessageKind,
    pub content: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<ChatOption>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order: Option<OrderResultData>,
}

impl ChatMessage {
    pub fn is_loading(&self) -> bool {
        self.kind == MessageKind::Loading
    }

    pub fn option_labels(&self) -> Vec<&str> {
        self.options.iter().map(|option| option.label.as_str()).collect()
    }
}

/// Message contents before the store assigns an id.
#[derive(Clone, Debug, PartialEq)]
pub struct NewMessage {
    pub sender: Sender,
    pub kind: MessageKind,
    pub content: String,
    pub options: Vec<ChatOption>,
    pub order: Option<OrderResultData>,
}

impl NewMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self { sender: Sender::User, ..Self::bot_with_kind(MessageKind::Text, content) }
    }

    pub fn bot(content: impl Into<String>) -> Self {
        Self::bot_with_kind(MessageKind::Text, content)
    }

    pub fn bot_options(content: impl Into<String>, options: Vec<ChatOption>) -> Self {
        Self { options, ..Self::bot_with_kind(MessageKind::Options, content) }
    }

    pub fn loading(content: impl Into<String>) -> Self {
        Self::bot_with_kind(MessageKind::Loading, content)
    }

    pub fn order_result(content: impl Into<String>, order: OrderResultData) -> Self {
        Self { order: Some(order), ..Self::bot_with_kind(MessageKind::OrderResult, content) }
    }

    pub fn bot_with_kind(kind: MessageKind, content: impl Into<String>) -> Self {
        Self {
            sender: Sender::Bot,
            kind,
            content: content.into(),
            options: Vec::new(),
            order: None,
        }
    }

    pub fn with_options(mut self, options: Vec<ChatOption>) -> Self {
        self.options = options;
        self
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    User,
    Model,
}

/// One entry of the history forwarded to the reply endpoint.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct HistoryEntry {
    pub role: Role,
    pub content: String,
}

impl HistoryEntry {
    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn model(content: impl Into<String>) -> Self {
        Self { role: Role::Model, content: content.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyRequest {
    pub message: String,
    pub history: Vec<HistoryEntry>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplyResponse {
    pub reply: String,
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{HistoryEntry, MessageKind, NewMessage, ReplyRequest, Sender};

    #[test]
    fn user_messages_are_plain_text_from_the_user() {
        let message = NewMessage::user("where is my parcel");
        assert_eq!(message.sender, Sender::User);
        assert_eq!(message.kind, MessageKind::Text);
        assert!(message.options.is_empty());
    }

    #[test]
    fn reply_request_uses_lowercase_roles_on_the_wire() {
        let request = ReplyRequest {
            message: "do you ship to Lahore?".to_string(),
            history: vec![HistoryEntry::user("hi"), HistoryEntry::model("Hello!")],
        };

        let encoded = serde_json::to_value(&request).expect("encode");
        assert_eq!(
            encoded,
            json!({
                "message": "do you ship to Lahore?",
                "history": [
                    {"role": "user", "content": "hi"},
                    {"role": "model", "content": "Hello!"}
                ]
            })
        );
    }

    #[test]
    fn order_result_kind_serializes_kebab_case() {
        let encoded = serde_json::to_value(MessageKind::OrderResult).expect("encode");
        assert_eq!(encoded, json!("order-result"));
    }
}
