//! # gateway-app
//!
//! Application layer — use-cases and **port definitions** (traits).
//!
//! ## Responsibilities
//! - Define **port traits** that adapters must implement (driven/outbound ports):
//!   - `DeviceDriver` — per-class device control/state translation
//!   - `MessageBusPort` — publish/subscribe over the MQTT bus
//!   - `StateRepository` — persisted device and scenario state
//!   - `EventPublisher` — in-process event fan-out for the SSE surface
//! - Provide **use-case services** that orchestrate domain objects without
//!   knowing *how* persistence, MQTT, or HTTP transport work:
//!   - `DeviceManager` — device registry, WB publication, command dispatch
//!   - `ScenarioManager` — scenario loading and minimal-disruption switching
//!   - `ScenarioWbAdapter` — projects the active scenario as a virtual device
//! - Provide **in-process infrastructure** (event bus) that doesn't need IO
//!
//! ## Dependency rule
//! Depends on `gateway-domain` only (plus `tokio::sync` for channels).
//! Never imports adapter crates. Adapters depend on *this* crate, not the
//! reverse.

pub mod event_bus;
pub mod ports;
pub mod services;
