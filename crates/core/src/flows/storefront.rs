//! Built-in support flows for the storefront chat widget.

use crate::flows::action::{Action, StepId};
use crate::flows::controller::{EMAIL_FIELD, ORDER_NUMBER_FIELD};
use crate::flows::table::{
    FlowDefinitionError, FlowOptionDefinition, FlowStepDefinition, FlowTable,
    FlowTableDefinition, InputFieldDefinition, RecoveryRoutes, StepKind,
};

pub const WELCOME: &str = "welcome";
pub const TRACK_ORDER: &str = "track_order";
pub const TRACK_ORDER_EMAIL: &str = "track_order_email";
pub const SHIPPING_INFO: &str = "shipping_info";
pub const RETURNS_INFO: &str = "returns_info";
pub const PAYMENT_INFO: &str = "payment_info";
pub const CANCELLATION_INFO: &str = "cancellation_info";
pub const ASK_QUESTION: &str = "ask_question";
pub const CONTACT_SUPPORT: &str = "contact_support";

const ORDER_NUMBER_PATTERN: &str = r"^[A-Za-z0-9-]{1,30}$";
const EMAIL_PATTERN: &str = r"^[^\s@]+@[^\s@]+\.[^\s@]+$";

pub fn storefront_flows() -> Result<FlowTable, FlowDefinitionError> {
    FlowTable::from_definition(storefront_definition())
}

pub fn storefront_definition() -> FlowTableDefinition {
    FlowTableDefinition {
        welcome: WELCOME.into(),
        recovery: RecoveryRoutes {
            main_menu: WELCOME.into(),
            track_order: TRACK_ORDER.into(),
            contact_support: CONTACT_SUPPORT.into(),
        },
        steps: vec![
            step(
                WELCOME,
                StepKind::Welcome,
                "Hi! Welcome to NEXURE. How can I help you today?",
                vec![
                    option("Track My Order", Action::enter(TRACK_ORDER)),
                    option("Shipping Info", Action::enter(SHIPPING_INFO)),
                    option("Returns & Exchanges", Action::enter(RETURNS_INFO)),
                    option("Payment Methods", Action::enter(PAYMENT_INFO)),
                    option("Order Cancellation", Action::enter(CANCELLATION_INFO)),
                    option("Ask a Question", Action::enter(ASK_QUESTION)),
                    option("Contact Support", Action::enter(CONTACT_SUPPORT)),
                    option("Browse Products", Action::navigate("/shop")),
                ],
            ),
            FlowStepDefinition {
                input: Some(InputFieldDefinition {
                    name: ORDER_NUMBER_FIELD.to_string(),
                    placeholder: "e.g. NX-100042".to_string(),
                    pattern: Some(ORDER_NUMBER_PATTERN.to_string()),
                    error_message: Some(
                        "Order numbers only contain letters, numbers and dashes.".to_string(),
                    ),
                    next: Action::enter(TRACK_ORDER_EMAIL),
                }),
                ..step(
                    TRACK_ORDER,
                    StepKind::Input,
                    "Sure! Please enter your order number. You can find it in your confirmation email.",
                    Vec::new(),
                )
            },
            FlowStepDefinition {
                input: Some(InputFieldDefinition {
                    name: EMAIL_FIELD.to_string(),
                    placeholder: "you@example.com".to_string(),
                    pattern: Some(EMAIL_PATTERN.to_string()),
                    error_message: Some("Please enter a valid email address.".to_string()),
                    next: Action::TrackOrder,
                }),
                ..step(
                    TRACK_ORDER_EMAIL,
                    StepKind::Input,
                    "Thanks! Now enter the email address you used when placing the order.",
                    Vec::new(),
                )
            },
            step(
                SHIPPING_INFO,
                StepKind::Options,
                "We deliver across Pakistan in 3-5 business days. Shipping is FREE on orders above Rs. 5,000; otherwise standard shipping is Rs. 200.",
                vec![
                    option("Track My Order", Action::enter(TRACK_ORDER)),
                    option("Main Menu", Action::enter(WELCOME)),
                ],
            ),
            step(
                RETURNS_INFO,
                StepKind::Options,
                "Returns are accepted within 30 days of delivery. Items must be unworn, unwashed and in original packaging with tags attached. Sale items and underwear are final sale.",
                vec![
                    option("Contact Support", Action::enter(CONTACT_SUPPORT)),
                    option("Main Menu", Action::enter(WELCOME)),
                ],
            ),
            step(
                PAYMENT_INFO,
                StepKind::Options,
                "We currently accept Cash on Delivery only. You pay in cash when your order arrives.",
                vec![option("Main Menu", Action::enter(WELCOME))],
            ),
            step(
                CANCELLATION_INFO,
                StepKind::Options,
                "Orders can be cancelled while they are Pending or Confirmed. Track your order to check its current status.",
                vec![
                    option("Track My Order", Action::enter(TRACK_ORDER)),
                    option("Contact Support", Action::enter(CONTACT_SUPPORT)),
                    option("Main Menu", Action::enter(WELCOME)),
                ],
            ),
            step(
                ASK_QUESTION,
                StepKind::Text,
                "Go ahead and type your question below. Our assistant will reply in a moment.",
                Vec::new(),
            ),
            step(
                CONTACT_SUPPORT,
                StepKind::Options,
                "You can reach us at support@nexure.com or +92 300 1234567, Mon - Sat, 10am - 8pm PKT.",
                vec![
                    option(
                        "Contact Page",
                        Action::NavigateTo { path: "/contact".to_string(), step: None },
                    ),
                    option("Main Menu", Action::enter(WELCOME)),
                ],
            ),
        ],
    }
}

fn step(
    id: &str,
    kind: StepKind,
    prompt: &str,
    options: Vec<FlowOptionDefinition>,
) -> FlowStepDefinition {
    FlowStepDefinition {
        id: StepId::from(id),
        prompt: prompt.to_string(),
        kind,
        options,
        input: None,
    }
}

fn option(label: &str, target: Action) -> FlowOptionDefinition {
    FlowOptionDefinition { label: label.to_string(), target }
}

#[cfg(test)]
mod tests {
    use super::{storefront_flows, TRACK_ORDER, TRACK_ORDER_EMAIL, WELCOME};
    use crate::flows::action::Action;
    use crate::flows::controller::EMAIL_FIELD;

    #[test]
    fn builtin_table_is_fully_wired() {
        let table = storefront_flows().expect("built-in flows are valid");
        assert_eq!(table.welcome().as_str(), WELCOME);
        assert_eq!(table.len(), 9);
    }

    #[test]
    fn order_number_then_email_then_lookup() {
        let table = storefront_flows().expect("built-in flows are valid");

        let order_step = table.get(&TRACK_ORDER.into()).expect("order step");
        let order_input = order_step.input.as_ref().expect("order input");
        assert!(order_input.validate("100042").is_ok());
        assert!(order_input.validate("NX-100042").is_ok());
        assert!(order_input.validate("100 042").is_err());
        assert_eq!(order_input.next, Action::enter(TRACK_ORDER_EMAIL));

        let email_step = table.get(&TRACK_ORDER_EMAIL.into()).expect("email step");
        let email_input = email_step.input.as_ref().expect("email input");
        assert_eq!(email_input.name, EMAIL_FIELD);
        assert!(email_input.validate("a@b.com").is_ok());
        assert_eq!(
            email_input.validate("not-an-email"),
            Err("Please enter a valid email address.".to_string())
        );
        assert_eq!(email_input.next, Action::TrackOrder);
    }
}
