pub mod audit;
pub mod catalog;
pub mod config;
pub mod domain;
pub mod errors;
pub mod flows;
pub mod format;

pub use audit::{AuditCategory, AuditEvent, AuditOutcome, AuditSink, InMemoryAuditSink, TracingAuditSink};
pub use catalog::{
    InventoryGrid, InventoryItem, InventoryPage, InventoryQuery, OptionDefinition, StockAdjustment,
    Variant, VariantGenerator, VariantManager,
};
pub use config::{AppConfig, ConfigError, LoadOptions, LogFormat};
pub use domain::chat::{ChatMessage, ChatOption, HistoryEntry, MessageId, MessageKind, Role, Sender};
pub use domain::order::{OrderResultData, OrderStatus, TrackOrderRequest};
pub use domain::product::{ProductId, VariantId};
pub use errors::{ApplicationError, DomainError, InterfaceError};
pub use flows::{
    storefront_flows, Action, ControlOutcome, ConversationStore, FlowController, FlowTable,
    OrderLookup, RemoteError, ReplyService, StepId,
};
pub use format::format_price;
