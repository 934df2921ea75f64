//! # gateway-domain
//!
//! Pure domain model for the device-integration gateway.
//!
//! ## Responsibilities
//! - Foundational types: string-backed device/scenario/room identifiers,
//!   the error taxonomy, and time/formatting helpers
//! - **Devices**: the class-agnostic config envelope ([`device`]) and
//!   runtime state ([`state`])
//! - **Commands**: parameter declarations and validation ([`command`])
//! - **Scenarios**: named, role-addressable device bundles with startup and
//!   shutdown sequences ([`scenario`])
//! - **Rooms**: display-only device groupings ([`room`])
//! - The restricted condition language scenario steps are gated by
//!   ([`condition`])
//! - WB virtual-device topic conventions and control metadata inference
//!   ([`wb`], [`order`])
//! - The maintenance guard that suppresses bus-origin mutations right after
//!   a rule-engine restart ([`maintenance`])
//! - **Events**: the SSE payload shape ([`event`])
//!
//! ## Dependency rule
//! This crate has **no internal dependencies**.
//! It must never import anything from `app`, adapters, or external IO crates.
//! All IO boundaries are expressed as traits in the `app` crate (ports).

pub mod command;
pub mod condition;
pub mod device;
pub mod error;
pub mod event;
pub mod id;
pub mod maintenance;
pub mod order;
pub mod room;
pub mod scenario;
pub mod state;
pub mod time;
pub mod wb;
