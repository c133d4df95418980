//! Request/response engine for MSP flight controllers.
//!
//! The [`Engine`] owns the [`FcState`](mspwire_schema::FcState) store and a
//! [`FrameSink`] for outbound requests. Every frame the transport receives
//! goes through [`Engine::on_frame`]: it is decoded into state, then the
//! callbacks waiting on its code fire.

pub mod batch;
pub mod config;
pub mod correlator;
pub mod engine;
pub mod error;
pub mod sink;

pub use batch::{BatchReply, BatchScheduler, BatchState};
pub use config::EngineConfig;
pub use correlator::{Callback, Response};
pub use engine::{Engine, Request};
pub use error::{EngineError, Result};
pub use sink::{FrameSink, MemorySink};
