//! Beat Broker - client-side tempo detection against a background worker.
//!
//! The broker turns `analyze`/`guess` calls on an audio buffer into
//! id-tagged requests for a worker that runs the actual beat detection, and
//! routes the worker's responses back to the call that issued them.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                        BeatDetector                           │
//! │                                                               │
//! │  analyze / guess                                              │
//! │       │                                                       │
//! │  ┌────┴─────────────┐   ┌──────────────────────────────────┐  │
//! │  │ OfflineRenderer  │   │      Pending Request Store        │  │
//! │  │ window → mono →  │   │  id → oneshot (DashMap, atomic    │  │
//! │  │ low-pass 240 Hz  │   │  allocate + register)             │  │
//! │  └────┬─────────────┘   └───────────────▲──────────────────┘  │
//! │       │                                 │                     │
//! │  WorkerSender                  ResponseDispatcher             │
//! └───────┼─────────────────────────────────┼─────────────────────┘
//!         │  {id, method, params}           │  {id, error, result}
//!         ▼                                 │
//!      worker (in-memory channel or child process over JSON lines)
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use beat_broker::{AudioBuffer, BeatDetector, BrokerConfig, TempoSettings};
//!
//! let detector = BeatDetector::load(&BrokerConfig::from_env())?;
//! let source = AudioBuffer::mono(samples, 44100)?;
//!
//! let bpm = detector.analyze(&source, ()).await?;
//! let guess = detector.guess(&source, (1.5, TempoSettings::range(90.0, 180.0))).await?;
//! ```

#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod domain;
pub mod ipc;
pub mod render;
pub mod service;

// Re-exports for public API
pub use beat_protocol::{Guess, Method, RequestId, TempoSettings, WorkerRequest, WorkerResponse};
pub use domain::args::{CallArgs, ResolvedCall};
pub use domain::audio::AudioBuffer;
pub use domain::config::{BrokerConfig, ChannelSelection, RenderConfig, TransportConfig, WorkerConfig};
pub use domain::correlation::{IdAllocator, RandomIdAllocator};
pub use domain::error::{BeatDetectorError, BrokerResult, ConfigError, RenderError};
pub use domain::pending::PendingStats;
pub use ipc::{create_channel, TransportError, WorkerEndpoint, WorkerReceiver, WorkerSender};
pub use render::{OfflineRenderer, RenderedAudio, Renderer};
pub use service::{BeatDetector, BeatDetectorBuilder};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
