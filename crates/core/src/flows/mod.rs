pub mod action;
pub mod controller;
pub mod remote;
pub mod store;
pub mod storefront;
pub mod table;

pub use action::{Action, StepId};
pub use controller::{ControlOutcome, FlowController, EMAIL_FIELD, ORDER_NUMBER_FIELD};
pub use remote::{Navigator, NoopNavigator, OrderLookup, RemoteError, ReplyService};
pub use store::{ConversationStore, PendingCall};
pub use storefront::{storefront_definition, storefront_flows};
pub use table::{
    FlowDefinitionError, FlowStep, FlowTable, FlowTableDefinition, InputField, RecoveryRoutes,
    StepKind,
};
