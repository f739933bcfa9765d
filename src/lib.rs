//! # beam-core
//!
//! Core library for the beam presentation-control system: one operator
//! drives a shared display from any number of control contexts, and every
//! context converges on the same display state.
//!
//! This crate contains:
//! - **Command**: `Command`, `Envelope`, `OriginId` — the wire protocol
//!   for display commands with origin tagging and one-hop forwarding
//! - **Transport**: `BroadcastBus` multicast plus `DirectLink`/`Mailbox`
//!   peer links, both fire-and-forget
//! - **Session**: `SessionContext` — per-context link set and dedup state
//! - **Hub**: `SyncHub` — validate/apply/dispatch on issue, dedup/apply/
//!   forward on receipt
//! - **Color**: `ConversionEngine` and `SpaceRegistry` — colorimetric
//!   conversion between device spaces through a CIE XYZ (D65) pivot
//! - **Template**: `TemplateResolver` — cached async template loading
//!   with last-request-wins cancellation
//! - **Surface**: `DisplaySurface` contract plus in-memory reference impl
//! - **Config**: `SessionConfig` — TOML session configuration
//! - **Error**: `BeamError` — typed, `thiserror`-based error hierarchy

pub mod color;
pub mod command;
pub mod config;
pub mod error;
pub mod hub;
pub mod session;
pub mod surface;
pub mod template;
pub mod transport;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use color::{ConversionEngine, InputMode, SpaceRegistry, Xyz};
pub use command::{Command, Envelope, OriginId};
pub use config::SessionConfig;
pub use error::BeamError;
pub use hub::{DispatchStatus, PumpStats, SyncHub};
pub use session::SessionContext;
pub use surface::{DisplayState, DisplaySurface, InMemorySurface, NullSurface};
pub use template::{
    PendingRequest, RequestToken, ResolveOutcome, ResolvedTemplate, StaticTemplateStore,
    TemplateMeta, TemplateResolver, TemplateStore,
};
pub use transport::{Arrival, BroadcastBus, BroadcastLink, DirectLink, Mailbox, PeerHandle};
