use std::collections::BTreeMap;

use crate::domain::chat::{ChatMessage, HistoryEntry, MessageId, NewMessage};
use crate::flows::action::StepId;

/// Handle for one outstanding remote call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PendingCall {
    pub generation: u64,
    pub placeholder: MessageId,
}

/// Transcript and flow state of one chat session.
///
/// Only the flow controller mutates the store; front ends read it.
#[derive(Clone, Debug, Default)]
pub struct ConversationStore {
    messages: Vec<ChatMessage>,
    next_message_id: u64,
    current_step: Option<StepId>,
    flow_data: BTreeMap<String, String>,
    history: Vec<HistoryEntry>,
    draft: String,
    input_error: Option<String>,
    loading: bool,
    open: bool,
    generation: u64,
}

impl ConversationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn last_message(&self) -> Option<&ChatMessage> {
        self.messages.last()
    }

    pub fn current_step(&self) -> Option<&StepId> {
        self.current_step.as_ref()
    }

    pub fn flow_data(&self) -> &BTreeMap<String, String> {
        &self.flow_data
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.flow_data.get(name).map(String::as_str)
    }

    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn input_error(&self) -> Option<&str> {
        self.input_error.as_deref()
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn is_open(&self) -> bool {
        self.open
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn append(&mut self, message: NewMessage) -> MessageId {
        self.next_message_id += 1;
        let id = MessageId(self.next_message_id);
        self.messages.push(ChatMessage {
            id,
            sender: message.sender,
            kind: message.kind,
            content: message.content,
            options: message.options,
            order: message.order,
        });
        id
    }

    /// Removes a loading placeholder. Other message kinds are never removed.
    pub fn remove_placeholder(&mut self, id: MessageId) -> bool {
        match self.messages.iter().position(|message| message.id == id && message.is_loading()) {
            Some(index) => {
                self.messages.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn set_step(&mut self, step: Option<StepId>) {
        self.current_step = step;
    }

    pub fn set_field(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.flow_data.insert(name.into(), value.into());
    }

    pub fn clear_flow_data(&mut self) {
        self.flow_data.clear();
    }

    pub fn push_exchange(&mut self, user: HistoryEntry, model: HistoryEntry) {
        self.history.push(user);
        self.history.push(model);
    }

    pub fn set_draft(&mut self, draft: impl Into<String>) {
        self.draft = draft.into();
    }

    pub fn set_input_error(&mut self, error: Option<String>) {
        self.input_error = error;
    }

    pub fn clear_input(&mut self) {
        self.draft.clear();
        self.input_error = None;
    }

    pub fn set_open(&mut self, open: bool) {
        self.open = open;
    }

    /// Marks the conversation busy and appends the placeholder shown while waiting.
    ///
    /// Returns `None` when another call is already outstanding.
    pub fn begin_call(&mut self, placeholder_text: &str) -> Option<PendingCall> {
        if self.loading {
            return None;
        }
        self.loading = true;
        let placeholder = self.append(NewMessage::loading(placeholder_text));
        Some(PendingCall { generation: self.generation, placeholder })
    }

    /// Settles `call`: drops its placeholder and clears the busy flag.
    ///
    /// Returns `false` without touching anything when the conversation was
    /// reset after the call was issued.
    pub fn settle(&mut self, call: PendingCall) -> bool {
        if call.generation != self.generation {
            return false;
        }
        self.remove_placeholder(call.placeholder);
        self.loading = false;
        true
    }

    /// Starts a fresh conversation. Message ids keep increasing across resets.
    pub fn reset(&mut self) {
        self.messages.clear();
        self.current_step = None;
        self.flow_data.clear();
        self.history.clear();
        self.clear_input();
        self.loading = false;
        self.generation += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::ConversationStore;
    use crate::domain::chat::{HistoryEntry, MessageKind, NewMessage};

    #[test]
    fn message_ids_are_monotonic_across_resets() {
        let mut store = ConversationStore::new();
        let first = store.append(NewMessage::bot("hello"));
        let second = store.append(NewMessage::user("hi"));
        assert!(second > first);

        store.reset();
        let third = store.append(NewMessage::bot("hello again"));
        assert!(third > second);
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn only_one_call_can_be_outstanding() {
        let mut store = ConversationStore::new();
        let call = store.begin_call("Looking that up...").expect("first call starts");
        assert!(store.is_loading());
        assert_eq!(store.last_message().map(|message| message.kind), Some(MessageKind::Loading));
        assert!(store.begin_call("again").is_none());
        assert_eq!(store.messages().len(), 1);

        assert!(store.settle(call));
        assert!(!store.is_loading());
        assert!(store.messages().is_empty());
    }

    #[test]
    fn settle_after_reset_is_discarded() {
        let mut store = ConversationStore::new();
        let call = store.begin_call("Thinking...").expect("call starts");
        store.reset();
        store.append(NewMessage::bot("fresh start"));

        assert!(!store.settle(call));
        assert_eq!(store.messages().len(), 1);
        assert_eq!(store.messages()[0].content, "fresh start");
    }

    #[test]
    fn placeholders_are_the_only_removable_messages() {
        let mut store = ConversationStore::new();
        let text = store.append(NewMessage::bot("keep me"));
        assert!(!store.remove_placeholder(text));
        assert_eq!(store.messages().len(), 1);
    }

    #[test]
    fn reset_clears_flow_state_and_history() {
        let mut store = ConversationStore::new();
        store.set_step(Some("track_order".into()));
        store.set_field("order_number", "100042");
        store.push_exchange(HistoryEntry::user("hi"), HistoryEntry::model("hello"));
        store.set_draft("half typed");
        store.set_input_error(Some("bad".to_string()));

        store.reset();

        assert!(store.current_step().is_none());
        assert!(store.flow_data().is_empty());
        assert!(store.history().is_empty());
        assert_eq!(store.draft(), "");
        assert!(store.input_error().is_none());
        assert_eq!(store.generation(), 1);
    }
}
