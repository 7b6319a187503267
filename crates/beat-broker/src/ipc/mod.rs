//! Worker transport.
//!
//! The broker talks to the worker through a `WorkerSender`/`WorkerReceiver`
//! pair. Every inbound response flows through one `ResponseDispatcher`, which
//! demultiplexes by request id into the pending request store.

pub mod handler;
pub mod process;

pub use handler::channel::{create_channel, ChannelReceiver, ChannelSender, WorkerEndpoint};
pub use handler::{ResponseDispatcher, TransportError, WorkerReceiver, WorkerSender};
pub use process::{spawn_worker, LineReceiver, LineSender, ProcessReceiver, ProcessSender};
