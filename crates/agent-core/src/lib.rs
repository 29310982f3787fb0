//! # agent-core
//!
//! Capability registry, reasoning executors and agent sessions.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       AgentSession                           │
//! │  ┌─────────────┐  ┌──────────────┐  ┌────────────────────┐  │
//! │  │  Executor   │  │  Capability  │  │   ModelHandle      │  │
//! │  │ (strategy)  │──│   Registry   │──│   (LlmProvider)    │  │
//! │  └─────────────┘  └──────────────┘  └────────────────────┘  │
//! │                  SharedMemory (turn history)                 │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! Capabilities are probed once at startup. Anything whose credentials or
//! runtime are missing is recorded as unavailable instead of failing the
//! build, and invoking a capability never fails: errors come back as
//! observation text the reasoning loop can act on.

pub mod agent;
pub mod capability;
pub mod config;
pub mod error;
pub mod executor;
pub mod memory;
pub mod message;
pub mod provider;
pub mod registry;
pub mod session;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use agent::{AgentBuilder, Strategy};
pub use capability::{Capability, CapabilityDescriptor, CapabilitySchema, FnCapability};
pub use config::Credentials;
pub use error::{AgentError, Result};
pub use executor::{EARLY_STOP_MESSAGE, Executor, NO_ANSWER, TraceStep};
pub use memory::SharedMemory;
pub use message::{Message, Role};
pub use provider::{LlmProvider, ModelFactory, ModelHandle};
pub use registry::{CapabilityRegistry, CapabilityStatus, Precondition};
pub use session::{AgentOutput, AgentSession};
