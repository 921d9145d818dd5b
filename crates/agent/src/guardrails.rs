use nexure_core::flows::RemoteError;

pub const DEFAULT_MAX_MESSAGE_CHARS: usize = 1000;
pub const MAX_ORDER_NUMBER_CHARS: usize = 30;

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailIntent<'a> {
    FreeFormMessage { message: &'a str },
    OrderLookup { order_number: &'a str },
}

impl GuardrailIntent<'_> {
    pub fn action_key(&self) -> &'static str {
        match self {
            Self::FreeFormMessage { .. } => "chat.free_form_message",
            Self::OrderLookup { .. } => "orders.track",
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum GuardrailDecision {
    Allow,
    Deny { reason_code: &'static str, user_message: String },
}

impl GuardrailDecision {
    /// Denials become validation errors so they never reach the network.
    pub fn into_result(self) -> Result<(), RemoteError> {
        match self {
            Self::Allow => Ok(()),
            Self::Deny { user_message, .. } => Err(RemoteError::Validation(user_message)),
        }
    }
}

/// Checks outbound requests against the limits the storefront API enforces.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ChatGuardrail {
    pub max_message_chars: usize,
}

impl Default for ChatGuardrail {
    fn default() -> Self {
        Self { max_message_chars: DEFAULT_MAX_MESSAGE_CHARS }
    }
}

impl ChatGuardrail {
    pub fn new(max_message_chars: usize) -> Self {
        Self { max_message_chars }
    }

    pub fn evaluate(&self, intent: &GuardrailIntent<'_>) -> GuardrailDecision {
        match intent {
            GuardrailIntent::FreeFormMessage { message } if message.trim().is_empty() => {
                GuardrailDecision::Deny {
                    reason_code: "empty_message",
                    user_message: "Please type a message first.".to_string(),
                }
            }
            GuardrailIntent::FreeFormMessage { message }
                if message.chars().count() > self.max_message_chars =>
            {
                GuardrailDecision::Deny {
                    reason_code: "message_too_long",
                    user_message: format!(
                        "Messages can be at most {} characters long.",
                        self.max_message_chars
                    ),
                }
            }
            GuardrailIntent::OrderLookup { order_number } if order_number.trim().is_empty() => {
                GuardrailDecision::Deny {
                    reason_code: "missing_order_number",
                    user_message: "An order number is required.".to_string(),
                }
            }
            GuardrailIntent::OrderLookup { order_number }
                if order_number.chars().count() > MAX_ORDER_NUMBER_CHARS =>
            {
                GuardrailDecision::Deny {
                    reason_code: "order_number_too_long",
                    user_message: format!(
                        "Order numbers are at most {MAX_ORDER_NUMBER_CHARS} characters long."
                    ),
                }
            }
            _ => GuardrailDecision::Allow,
        }
    }
}

#[cfg(test)]
mod tests {
    use nexure_core::flows::RemoteError;

    use super::{ChatGuardrail, GuardrailDecision, GuardrailIntent};

    #[test]
    fn intents_name_the_endpoint_they_guard() {
        assert_eq!(
            GuardrailIntent::FreeFormMessage { message: "hi" }.action_key(),
            "chat.free_form_message"
        );
        assert_eq!(GuardrailIntent::OrderLookup { order_number: "NX-1" }.action_key(), "orders.track");
    }

    #[test]
    fn ordinary_message_is_allowed() {
        let guardrail = ChatGuardrail::default();
        let decision =
            guardrail.evaluate(&GuardrailIntent::FreeFormMessage { message: "Do you ship to Lahore?" });
        assert_eq!(decision, GuardrailDecision::Allow);
    }

    #[test]
    fn oversized_message_denial() {
        let guardrail = ChatGuardrail::new(10);
        let decision =
            guardrail.evaluate(&GuardrailIntent::FreeFormMessage { message: "eleven chars" });

        let (reason_code, user_message) = match decision {
            GuardrailDecision::Deny { reason_code, user_message } => (reason_code, user_message),
            GuardrailDecision::Allow => ("", String::new()),
        };

        assert_eq!(reason_code, "message_too_long");
        assert!(user_message.contains("at most 10 characters"));
    }

    #[test]
    fn limit_counts_characters_not_bytes() {
        let guardrail = ChatGuardrail::new(4);
        let decision = guardrail.evaluate(&GuardrailIntent::FreeFormMessage { message: "سلام" });
        assert_eq!(decision, GuardrailDecision::Allow);
    }

    #[test]
    fn long_order_number_becomes_validation_error() {
        let guardrail = ChatGuardrail::default();
        let order_number = "N".repeat(31);
        let result = guardrail
            .evaluate(&GuardrailIntent::OrderLookup { order_number: &order_number })
            .into_result();

        assert!(matches!(result, Err(RemoteError::Validation(message)) if message.contains("30")));
        assert_eq!(
            guardrail.evaluate(&GuardrailIntent::OrderLookup { order_number: "100042" }),
            GuardrailDecision::Allow
        );
    }
}
