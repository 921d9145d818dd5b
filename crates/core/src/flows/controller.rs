use std::sync::{Arc, Mutex};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, TracingAuditSink};
use crate::domain::chat::{ChatOption, HistoryEntry, NewMessage};
use crate::domain::order::{OrderResultData, TrackOrderRequest};
use crate::flows::action::{Action, StepId};
use crate::flows::remote::{Navigator, NoopNavigator, OrderLookup, RemoteError, ReplyService};
use crate::flows::store::{ConversationStore, PendingCall};
use crate::flows::table::FlowTable;

pub const ORDER_NUMBER_FIELD: &str = "order_number";
pub const EMAIL_FIELD: &str = "email";

const LOOKUP_PLACEHOLDER: &str = "Looking up your order...";
const REPLY_PLACEHOLDER: &str = "Typing...";
const LOOKUP_FOLLOW_UP: &str = "Is there anything else I can help you with?";
const LOOKUP_FAILED: &str = "Sorry, we couldn't find an order matching that order number and email. Please double-check the details and try again.";
const REPLY_FAILED: &str = "Sorry, I'm having trouble connecting right now. Please try again in a moment or reach out to our support team.";

/// What a controller call did to the conversation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlOutcome {
    EnteredStep(StepId),
    Navigated { path: String, entered: Option<StepId> },
    UnknownStep(StepId),
    InputRejected { error: String },
    OrderFound { order_number: String },
    OrderNotFound,
    Replied,
    ReplyFailed,
    /// Another remote call is still outstanding.
    Busy,
    /// Blank input.
    Ignored,
    /// The conversation was reset while the call was in flight.
    Discarded,
}

enum Submission {
    Busy,
    Rejected(String),
    Captured(Action),
    FreeText { call: PendingCall, text: String, history: Vec<HistoryEntry> },
}

/// Interprets chat actions against a flow table and owns the side effects.
///
/// Cloning is cheap and every clone drives the same conversation.
#[derive(Clone)]
pub struct FlowController {
    table: Arc<FlowTable>,
    store: Arc<Mutex<ConversationStore>>,
    orders: Arc<dyn OrderLookup>,
    replies: Arc<dyn ReplyService>,
    navigator: Arc<dyn Navigator>,
    audit: Arc<dyn AuditSink>,
    conversation_id: String,
}

impl FlowController {
    pub fn new(
        table: FlowTable,
        orders: Arc<dyn OrderLookup>,
        replies: Arc<dyn ReplyService>,
    ) -> Self {
        Self {
            table: Arc::new(table),
            store: Arc::new(Mutex::new(ConversationStore::new())),
            orders,
            replies,
            navigator: Arc::new(NoopNavigator),
            audit: Arc::new(TracingAuditSink),
            conversation_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn with_store(mut self, store: Arc<Mutex<ConversationStore>>) -> Self {
        self.store = store;
        self
    }

    pub fn with_navigator(mut self, navigator: Arc<dyn Navigator>) -> Self {
        self.navigator = navigator;
        self
    }

    pub fn with_audit_sink(mut self, audit: Arc<dyn AuditSink>) -> Self {
        self.audit = audit;
        self
    }

    pub fn conversation_id(&self) -> &str {
        &self.conversation_id
    }

    pub fn table(&self) -> &FlowTable {
        &self.table
    }

    pub fn read<T>(&self, reader: impl FnOnce(&ConversationStore) -> T) -> T {
        match self.store.lock() {
            Ok(store) => reader(&store),
            Err(poisoned) => reader(&poisoned.into_inner()),
        }
    }

    pub fn snapshot(&self) -> ConversationStore {
        self.read(ConversationStore::clone)
    }

    fn mutate<T>(&self, writer: impl FnOnce(&mut ConversationStore) -> T) -> T {
        match self.store.lock() {
            Ok(mut store) => writer(&mut store),
            Err(poisoned) => writer(&mut poisoned.into_inner()),
        }
    }

    /// Opens the widget; an empty conversation starts at the welcome step.
    pub fn open(&self) -> Option<ControlOutcome> {
        let welcome = self.table.welcome().clone();
        let entered = self.mutate(|store| {
            store.set_open(true);
            store.messages().is_empty() && self.enter_step(store, &welcome)
        });
        entered.then(|| {
            self.record_step_entered(&new_correlation_id(), &welcome);
            ControlOutcome::EnteredStep(welcome)
        })
    }

    pub fn close(&self) {
        self.mutate(|store| store.set_open(false));
    }

    pub fn set_draft(&self, draft: impl Into<String>) {
        let draft = draft.into();
        self.mutate(|store| store.set_draft(draft));
    }

    /// Drops the conversation and starts again at the welcome step.
    ///
    /// Calls still in flight settle into the void.
    pub fn reset(&self) -> ControlOutcome {
        let correlation_id = new_correlation_id();
        let welcome = self.table.welcome().clone();
        let generation = self.mutate(|store| {
            store.reset();
            self.enter_step(store, &welcome);
            store.generation()
        });
        self.emit(
            AuditEvent::new(
                &self.conversation_id,
                &correlation_id,
                "chat.reset",
                AuditCategory::Session,
                AuditOutcome::Success,
            )
            .with_metadata("generation", generation.to_string()),
        );
        self.record_step_entered(&correlation_id, &welcome);
        ControlOutcome::EnteredStep(welcome)
    }

    pub async fn handle_action(&self, action: Action) -> ControlOutcome {
        let correlation_id = new_correlation_id();
        debug!(
            event_name = "chat.action_received",
            conversation_id = %self.conversation_id,
            correlation_id = %correlation_id,
            action = %action.action_key(),
            "handling chat action"
        );

        match action {
            Action::NavigateTo { path, step } => {
                self.navigator.navigate(&path);
                self.emit(
                    AuditEvent::new(
                        &self.conversation_id,
                        &correlation_id,
                        "chat.navigation_requested",
                        AuditCategory::Navigation,
                        AuditOutcome::Success,
                    )
                    .with_metadata("path", path.clone()),
                );
                let entered = match step {
                    Some(step) => match self.apply_step(&correlation_id, step) {
                        ControlOutcome::EnteredStep(step) => Some(step),
                        _ => None,
                    },
                    None => None,
                };
                ControlOutcome::Navigated { path, entered }
            }
            Action::EnterStep { step } => self.apply_step(&correlation_id, step),
            Action::TrackOrder => self.perform_order_tracking(&correlation_id).await,
            Action::FreeFormReply { text } => {
                let text = text.trim().to_string();
                if text.is_empty() {
                    return ControlOutcome::Ignored;
                }
                let started = self.mutate(|store| {
                    if store.is_loading() {
                        return None;
                    }
                    store.append(NewMessage::user(text.clone()));
                    store.set_step(None);
                    let history = store.history().to_vec();
                    store.begin_call(REPLY_PLACEHOLDER).map(|call| (call, history))
                });
                match started {
                    Some((call, history)) => {
                        self.complete_reply(&correlation_id, call, text, history).await
                    }
                    None => ControlOutcome::Busy,
                }
            }
        }
    }

    pub async fn handle_input_submit(&self, raw: &str) -> ControlOutcome {
        let value = raw.trim();
        if value.is_empty() {
            return ControlOutcome::Ignored;
        }
        let correlation_id = new_correlation_id();

        let submission = self.mutate(|store| {
            if store.is_loading() {
                return Submission::Busy;
            }

            let field = store
                .current_step()
                .and_then(|id| self.table.get(id))
                .and_then(|step| step.input.as_ref());

            match field {
                Some(field) => match field.validate(value) {
                    Err(error) => {
                        store.set_input_error(Some(error.clone()));
                        Submission::Rejected(error)
                    }
                    Ok(()) => {
                        store.append(NewMessage::user(value));
                        store.set_field(field.name.clone(), value);
                        store.clear_input();
                        Submission::Captured(field.next.clone())
                    }
                },
                None => {
                    store.append(NewMessage::user(value));
                    store.clear_input();
                    store.set_step(None);
                    let history = store.history().to_vec();
                    match store.begin_call(REPLY_PLACEHOLDER) {
                        Some(call) => {
                            Submission::FreeText { call, text: value.to_string(), history }
                        }
                        None => Submission::Busy,
                    }
                }
            }
        });

        match submission {
            Submission::Busy => {
                debug!(
                    event_name = "chat.submit_while_busy",
                    conversation_id = %self.conversation_id,
                    correlation_id = %correlation_id,
                    "ignoring submission while a call is outstanding"
                );
                ControlOutcome::Busy
            }
            Submission::Rejected(error) => {
                let step = self.read(|store| store.current_step().cloned());
                self.emit(
                    AuditEvent::new(
                        &self.conversation_id,
                        &correlation_id,
                        "chat.input_rejected",
                        AuditCategory::Input,
                        AuditOutcome::Rejected,
                    )
                    .with_metadata(
                        "step",
                        step.map(|step| step.to_string()).unwrap_or_default(),
                    ),
                );
                ControlOutcome::InputRejected { error }
            }
            Submission::Captured(next) => self.handle_action(next).await,
            Submission::FreeText { call, text, history } => {
                self.complete_reply(&correlation_id, call, text, history).await
            }
        }
    }

    async fn perform_order_tracking(&self, correlation_id: &str) -> ControlOutcome {
        let started = self.mutate(|store| {
            if store.is_loading() {
                return None;
            }
            let request = match (store.field(ORDER_NUMBER_FIELD), store.field(EMAIL_FIELD)) {
                (Some(order_number), Some(email)) => Some(TrackOrderRequest {
                    order_number: order_number.to_string(),
                    email: email.to_string(),
                }),
                _ => None,
            };
            store.begin_call(LOOKUP_PLACEHOLDER).map(|call| (call, request))
        });
        let Some((call, request)) = started else {
            return ControlOutcome::Busy;
        };

        let result = match &request {
            Some(request) => self.orders.track_order(request).await,
            None => Err(RemoteError::Validation(
                "order number and email must be collected first".to_string(),
            )),
        };

        let routes = self.table.recovery().clone();
        let applied = self.mutate(|store| {
            if !store.settle(call) {
                return false;
            }
            match &result {
                Ok(order) => {
                    store.append(NewMessage::order_result(order.summary(), order.clone()));
                    store.append(NewMessage::bot_options(
                        LOOKUP_FOLLOW_UP,
                        vec![
                            ChatOption::new("Track Another Order", Action::enter(routes.track_order.clone())),
                            ChatOption::new("Main Menu", Action::enter(routes.main_menu.clone())),
                        ],
                    ));
                }
                Err(_) => {
                    store.append(NewMessage::bot_options(
                        LOOKUP_FAILED,
                        vec![
                            ChatOption::new("Try Again", Action::enter(routes.track_order.clone())),
                            ChatOption::new(
                                "Contact Support",
                                Action::enter(routes.contact_support.clone()),
                            ),
                            ChatOption::new("Main Menu", Action::enter(routes.main_menu.clone())),
                        ],
                    ));
                }
            }
            store.clear_flow_data();
            store.set_step(None);
            true
        });

        if !applied {
            return self.discard(correlation_id, AuditCategory::OrderLookup);
        }

        match result {
            Ok(order) => self.order_found(correlation_id, &order),
            Err(error) => {
                warn!(
                    event_name = "chat.order_lookup_failed",
                    conversation_id = %self.conversation_id,
                    correlation_id = %correlation_id,
                    error = %error,
                    "order lookup failed"
                );
                self.emit(
                    AuditEvent::new(
                        &self.conversation_id,
                        correlation_id,
                        "chat.order_lookup_failed",
                        AuditCategory::OrderLookup,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                ControlOutcome::OrderNotFound
            }
        }
    }

    async fn complete_reply(
        &self,
        correlation_id: &str,
        call: PendingCall,
        text: String,
        history: Vec<HistoryEntry>,
    ) -> ControlOutcome {
        let result = self.replies.reply(&text, &history).await;

        let routes = self.table.recovery().clone();
        let applied = self.mutate(|store| {
            if !store.settle(call) {
                return false;
            }
            match &result {
                Ok(reply) => {
                    store.append(NewMessage::bot_options(
                        reply.clone(),
                        vec![ChatOption::new("Main Menu", Action::enter(routes.main_menu.clone()))],
                    ));
                    store.push_exchange(HistoryEntry::user(text.clone()), HistoryEntry::model(reply.clone()));
                }
                Err(_) => {
                    store.append(NewMessage::bot_options(
                        REPLY_FAILED,
                        vec![
                            ChatOption::new(
                                "Contact Support",
                                Action::enter(routes.contact_support.clone()),
                            ),
                            ChatOption::new("Main Menu", Action::enter(routes.main_menu.clone())),
                        ],
                    ));
                }
            }
            true
        });

        if !applied {
            return self.discard(correlation_id, AuditCategory::Reply);
        }

        match result {
            Ok(reply) => {
                self.emit(
                    AuditEvent::new(
                        &self.conversation_id,
                        correlation_id,
                        "chat.reply_completed",
                        AuditCategory::Reply,
                        AuditOutcome::Success,
                    )
                    .with_metadata("reply_chars", reply.chars().count().to_string()),
                );
                ControlOutcome::Replied
            }
            Err(error) => {
                warn!(
                    event_name = "chat.reply_failed",
                    conversation_id = %self.conversation_id,
                    correlation_id = %correlation_id,
                    error = %error,
                    "free-form reply failed"
                );
                self.emit(
                    AuditEvent::new(
                        &self.conversation_id,
                        correlation_id,
                        "chat.reply_failed",
                        AuditCategory::Reply,
                        AuditOutcome::Failed,
                    )
                    .with_metadata("error", error.to_string()),
                );
                ControlOutcome::ReplyFailed
            }
        }
    }

    fn apply_step(&self, correlation_id: &str, step: StepId) -> ControlOutcome {
        let entered = self.mutate(|store| self.enter_step(store, &step));
        if entered {
            self.record_step_entered(correlation_id, &step);
            ControlOutcome::EnteredStep(step)
        } else {
            warn!(
                event_name = "chat.step_missing",
                conversation_id = %self.conversation_id,
                correlation_id = %correlation_id,
                step = %step,
                "ignoring action for unknown step"
            );
            self.emit(
                AuditEvent::new(
                    &self.conversation_id,
                    correlation_id,
                    "chat.step_missing",
                    AuditCategory::Flow,
                    AuditOutcome::Rejected,
                )
                .with_metadata("step", step.to_string()),
            );
            ControlOutcome::UnknownStep(step)
        }
    }

    fn enter_step(&self, store: &mut ConversationStore, id: &StepId) -> bool {
        let Some(step) = self.table.get(id) else {
            return false;
        };
        store.append(step.to_message());
        store.set_step(Some(id.clone()));
        store.clear_input();
        true
    }

    fn order_found(&self, correlation_id: &str, order: &OrderResultData) -> ControlOutcome {
        info!(
            event_name = "chat.order_lookup_completed",
            conversation_id = %self.conversation_id,
            correlation_id = %correlation_id,
            order_number = %order.order_number,
            status = order.status.label(),
            "order lookup completed"
        );
        self.emit(
            AuditEvent::new(
                &self.conversation_id,
                correlation_id,
                "chat.order_lookup_completed",
                AuditCategory::OrderLookup,
                AuditOutcome::Success,
            )
            .with_metadata("order_number", order.order_number.clone())
            .with_metadata("status", order.status.label()),
        );
        ControlOutcome::OrderFound { order_number: order.order_number.clone() }
    }

    fn discard(&self, correlation_id: &str, category: AuditCategory) -> ControlOutcome {
        info!(
            event_name = "chat.stale_result_discarded",
            conversation_id = %self.conversation_id,
            correlation_id = %correlation_id,
            "conversation was reset while the call was in flight"
        );
        self.emit(AuditEvent::new(
            &self.conversation_id,
            correlation_id,
            "chat.stale_result_discarded",
            category,
            AuditOutcome::Discarded,
        ));
        ControlOutcome::Discarded
    }

    fn record_step_entered(&self, correlation_id: &str, step: &StepId) {
        self.emit(
            AuditEvent::new(
                &self.conversation_id,
                correlation_id,
                "chat.step_entered",
                AuditCategory::Flow,
                AuditOutcome::Success,
            )
            .with_metadata("step", step.to_string()),
        );
    }

    fn emit(&self, event: AuditEvent) {
        self.audit.emit(event);
    }
}

fn new_correlation_id() -> String {
    Uuid::new_v4().to_string()
}
