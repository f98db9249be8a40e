//! # Trainflow
//!
//! Trainflow is a lightweight flow engine for conversational training bots
//! written in Rust. It is designed to be embedded in applications that let
//! trainers author a scripted conversation as a directed graph and serve it
//! to learners as a live chat session.
//!
//! ## Core Features
//!
//! - **Typed Flow Graphs**: start/text/question/decision/assessment/end
//!   nodes with kind-specific payloads, connected by conditionally-routed
//!   edges
//! - **One Validator**: a single pure validation pass (structural errors,
//!   content warnings, advisory suggestions) shared by the publish gate and
//!   interactive pre-submit checks
//! - **Gated Publishing**: a flow version only goes live when validation
//!   passes, written through an optimistic-concurrency store update
//! - **Pluggable Storage**: in-memory storage (testing) and PostgreSQL
//!   (production)
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use trainflow::{EngineBuilder, FlowModel};
//!
//! let engine = EngineBuilder::new().build()?;
//! engine.launch();
//!
//! let flow = FlowModel::from_json(json_str)?;
//! engine.deploy(&flow)?;
//! engine.publish(&flow.id, "trainer-1")?;
//!
//! let session = engine.build_session(&flow.id)?;
//! let mut turn = engine.run_session(&session)?;
//! while !turn.completed {
//!     turn = session.advance("learner answer")?;
//! }
//! ```

mod builder;
mod common;
mod config;
mod engine;
mod error;
pub mod events;
pub mod flow;
pub mod model;
mod runtime;
pub mod store;
mod utils;

use std::sync::{Arc, RwLock};

pub use builder::EngineBuilder;
pub use config::{Config, PostgresConfig, StoreConfig, StoreType};
pub use engine::Engine;
pub use error::TrainflowError;
pub use flow::{
    Complexity, FlowGraph, FlowStats, NodeKind, Severity, ValidationPolicy, ValidationReport, estimate_duration, flow_stats, validate_flow,
};
pub use model::{EdgeModel, FlowModel, FlowSettings, NodeModel};
pub use runtime::{Channel, ChannelEvent, ChannelOptions, NodePrompt, Session, SessionId, Turn};

/// Result type alias for Trainflow operations.
pub type Result<T> = std::result::Result<T, TrainflowError>;

/// Thread-safe shared lock wrapper using Arc<RwLock<T>>.
pub(crate) type ShareLock<T> = Arc<RwLock<T>>;
