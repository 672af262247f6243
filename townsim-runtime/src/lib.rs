//! # townsim-runtime — Running Town for townsim
//!
//! Drives a [`townsim_core::SimulationWorld`] in real time: a tick loop,
//! deferred conversation turns with generated (or canned) dialogue, an
//! update observer and the control surface a UI calls into.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────┐
//! │                 Simulation                 │
//! │  tick loop ──▶ world.tick() ──▶ observer   │
//! │      │                                     │
//! │      ▼                                     │
//! │  TurnScheduler ──▶ turn task               │
//! │                      ├─ snapshot (lock)    │
//! │                      ├─ TextGenerator      │
//! │                      └─ record (lock)      │
//! │  control API ──▶ world (lock)              │
//! └────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - `simulation` — the shared handle, tick loop and turn execution
//! - `control` — bool-returning control operations
//! - `scheduler` — pending turn tasks per conversation
//! - `dialogue` — prompt building and gateway fallback
//! - `config` — config loading and gateway settings
//! - `telemetry` — tracing subscriber setup

#![deny(clippy::unwrap_used)]
#![warn(missing_docs)]

pub mod config;
pub mod control;
pub mod dialogue;
pub mod scheduler;
pub mod simulation;
pub mod telemetry;

pub use scheduler::TurnScheduler;
pub use simulation::{Simulation, UpdateObserver};
