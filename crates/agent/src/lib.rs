//! Storefront API adapters for the chat flow controller.
//!
//! `StorefrontClient` implements the `OrderLookup` and `ReplyService` ports
//! from `nexure-core` over HTTP. Every outbound request passes the
//! `ChatGuardrail` first; a denied request fails with
//! `RemoteError::Validation` and is never sent.

pub mod client;
pub mod guardrails;

pub use client::StorefrontClient;
pub use guardrails::{ChatGuardrail, GuardrailDecision, GuardrailIntent};
