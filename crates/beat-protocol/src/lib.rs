//! # Beat Protocol
//!
//! Message types exchanged between the broker and a beat-detector worker.
//!
//! ## Wire Contract
//!
//! ```text
//!  broker ──▶ worker   { id, method: "analyze" | "guess",
//!                        params: { channelData, sampleRate, tempoSettings? } }
//!
//!  worker ──▶ broker   { id, error: null | { message }, result? }
//! ```
//!
//! - `id` is a JSON-safe integer (at most 2^53 - 1).
//! - `tempoSettings` is omitted entirely when the caller supplied none.
//! - `analyze` answers with a tempo; `guess` answers with `{ bpm, offset }`.

pub mod errors;
pub mod ids;
pub mod messages;
pub mod results;
pub mod settings;

pub use errors::ProtocolError;
pub use ids::{RequestId, MAX_SAFE_INTEGER};
pub use messages::{Method, RequestParams, WorkerError, WorkerRequest, WorkerResponse};
pub use results::{decode_analyze, decode_guess, Guess};
pub use settings::TempoSettings;
