//! Domain types for the broker.
//!
//! Configuration, errors, call arguments, the id allocator and the
//! outstanding-set of pending requests.

pub mod args;
pub mod audio;
pub mod config;
pub mod correlation;
pub mod error;
pub mod pending;

// Re-exports for convenience
pub use args::{CallArgs, ResolvedCall};
pub use audio::AudioBuffer;
pub use config::{BrokerConfig, ChannelSelection, RenderConfig, TransportConfig, WorkerConfig};
pub use correlation::{allocate, IdAllocator, RandomIdAllocator};
pub use error::{BeatDetectorError, BrokerResult, ConfigError, RenderError};
pub use pending::{PendingRequestStore, PendingStats};
