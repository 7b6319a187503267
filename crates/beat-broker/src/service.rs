//! Beat detector - the request/response correlator in front of a worker.
//!
//! Each call renders its window, registers a pending request under a fresh
//! id, sends the request and then waits only on its own completion handle.
//! A single dispatcher task routes every inbound response by id, so any
//! number of calls can be in flight and complete in any order.

use crate::domain::args::CallArgs;
use crate::domain::audio::AudioBuffer;
use crate::domain::config::{BrokerConfig, TransportConfig};
use crate::domain::correlation::{IdAllocator, RandomIdAllocator};
use crate::domain::error::{BeatDetectorError, BrokerResult};
use crate::domain::pending::{PendingRequestStore, PendingStats};
use crate::ipc::handler::channel::{create_channel, WorkerEndpoint};
use crate::ipc::handler::{ResponseDispatcher, WorkerReceiver, WorkerSender};
use crate::ipc::process::spawn_worker;
use crate::render::{OfflineRenderer, Renderer};
use beat_protocol::{decode_analyze, decode_guess, Guess, Method, RequestId, WorkerRequest, WorkerResponse};
use std::sync::Arc;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Tempo detection client bound to one worker channel.
///
/// Must be created inside a Tokio runtime: construction spawns the response
/// dispatcher. Dropping the detector stops the dispatcher.
pub struct BeatDetector {
    pending: Arc<PendingRequestStore>,
    sender: Arc<dyn WorkerSender>,
    renderer: Arc<dyn Renderer>,
    dispatcher: JoinHandle<()>,
}

/// Overrides applied before the detector starts dispatching.
pub struct BeatDetectorBuilder {
    renderer: Arc<dyn Renderer>,
    allocator: Arc<dyn IdAllocator>,
}

impl Default for BeatDetectorBuilder {
    fn default() -> Self {
        Self {
            renderer: Arc::new(OfflineRenderer::default()),
            allocator: Arc::new(RandomIdAllocator),
        }
    }
}

impl BeatDetectorBuilder {
    /// Replace the window renderer.
    pub fn with_renderer(mut self, renderer: Arc<dyn Renderer>) -> Self {
        self.renderer = renderer;
        self
    }

    /// Replace the source of candidate request ids.
    pub fn with_allocator(mut self, allocator: Arc<dyn IdAllocator>) -> Self {
        self.allocator = allocator;
        self
    }

    /// Wrap an existing worker channel.
    pub fn wrap<S, R>(self, sender: S, receiver: R) -> BeatDetector
    where
        S: WorkerSender + 'static,
        R: WorkerReceiver + 'static,
    {
        let pending = Arc::new(PendingRequestStore::with_allocator(self.allocator));
        let dispatcher = ResponseDispatcher::new(Arc::clone(&pending), Arc::new(receiver));

        BeatDetector {
            pending,
            sender: Arc::new(sender),
            renderer: self.renderer,
            dispatcher: tokio::spawn(dispatcher.run()),
        }
    }

    /// Create an in-memory channel and wrap its broker side.
    ///
    /// The returned endpoint is for an in-process worker to serve.
    pub fn in_memory(self, config: &TransportConfig) -> (BeatDetector, WorkerEndpoint) {
        let (sender, receiver, endpoint) = create_channel(config.channel_capacity.max(1));
        (self.wrap(sender, receiver), endpoint)
    }

    /// Launch the configured worker process and wrap its stdio.
    ///
    /// The configured render settings replace any renderer set earlier.
    pub fn load(self, config: &BrokerConfig) -> BrokerResult<BeatDetector> {
        config.validate()?;
        let program = config.worker.program()?;
        let (sender, receiver) = spawn_worker(&config.worker)?;

        info!(
            program = program,
            cutoff_hz = config.render.lowpass_cutoff_hz,
            "Beat detector worker loaded"
        );

        Ok(self
            .with_renderer(Arc::new(OfflineRenderer::new(config.render.clone())))
            .wrap(sender, receiver))
    }
}

impl BeatDetector {
    /// Start configuring a detector.
    pub fn builder() -> BeatDetectorBuilder {
        BeatDetectorBuilder::default()
    }

    /// Wrap an existing worker channel with default rendering and random ids.
    pub fn wrap<S, R>(sender: S, receiver: R) -> Self
    where
        S: WorkerSender + 'static,
        R: WorkerReceiver + 'static,
    {
        Self::builder().wrap(sender, receiver)
    }

    /// Launch a worker process from `config`.
    pub fn load(config: &BrokerConfig) -> BrokerResult<Self> {
        Self::builder().load(config)
    }

    /// Estimate the tempo of a window of `source`, in beats per minute.
    ///
    /// `args` is any of the accepted call shapes: `()`, an offset, tempo
    /// settings, `(offset, duration)`, `(offset, settings)` or
    /// `(offset, duration, settings)`.
    pub async fn analyze(&self, source: &AudioBuffer, args: impl Into<CallArgs>) -> BrokerResult<f64> {
        let response = self.call(Method::Analyze, source, args.into()).await?;
        decode_analyze(response.result).map_err(|e| BeatDetectorError::unexpected(Method::Analyze, e))
    }

    /// Estimate tempo and the offset of the first beat in a window of `source`.
    pub async fn guess(&self, source: &AudioBuffer, args: impl Into<CallArgs>) -> BrokerResult<Guess> {
        let response = self.call(Method::Guess, source, args.into()).await?;
        decode_guess(response.result).map_err(|e| BeatDetectorError::unexpected(Method::Guess, e))
    }

    /// Number of requests awaiting a response.
    pub fn pending_count(&self) -> usize {
        self.pending.pending_count()
    }

    /// Counters of the pending request store.
    pub fn stats(&self) -> &PendingStats {
        self.pending.stats()
    }

    async fn call(&self, method: Method, source: &AudioBuffer, args: CallArgs) -> BrokerResult<WorkerResponse> {
        let call = args.resolve(source.duration());

        // Nothing is registered until the window renders.
        let rendered = self.renderer.render(source, call.offset, call.duration).await?;

        let (id, rx) = self.pending.register(method)?;
        let mut waiter = Waiter::new(&self.pending, id, rx);

        let request = WorkerRequest::new(
            id,
            method,
            rendered.channel_data,
            rendered.sample_rate,
            call.tempo_settings,
        );
        let samples = request.sample_count();

        // On failure the waiter drops and takes the pending entry with it.
        self.sender.send(request).await?;

        debug!(
            request_id = %id,
            method = %method,
            samples = samples,
            sample_rate = rendered.sample_rate,
            "Sent worker request"
        );

        let response = waiter.wait().await?;
        match response.error {
            Some(error) => Err(BeatDetectorError::Remote {
                message: error.message,
            }),
            None => Ok(response),
        }
    }
}

impl Drop for BeatDetector {
    fn drop(&mut self) {
        self.dispatcher.abort();
    }
}

/// Caller side of one pending request.
///
/// If the call is abandoned before settling, dropping the waiter removes the
/// pending entry.
struct Waiter<'a> {
    pending: &'a PendingRequestStore,
    id: RequestId,
    rx: Option<oneshot::Receiver<WorkerResponse>>,
}

impl<'a> Waiter<'a> {
    fn new(pending: &'a PendingRequestStore, id: RequestId, rx: oneshot::Receiver<WorkerResponse>) -> Self {
        Self {
            pending,
            id,
            rx: Some(rx),
        }
    }

    async fn wait(&mut self) -> BrokerResult<WorkerResponse> {
        let Some(rx) = self.rx.as_mut() else {
            return Err(BeatDetectorError::Disconnected);
        };
        let outcome = rx.await;
        // Settled either way; the store has already dropped the entry.
        self.rx = None;
        outcome.map_err(|_| BeatDetectorError::Disconnected)
    }
}

impl Drop for Waiter<'_> {
    fn drop(&mut self) {
        if let Some(rx) = self.rx.take() {
            drop(rx);
            self.pending.cancel_abandoned(self.id);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::correlation::testing::ScriptedIdAllocator;
    use crate::domain::error::RenderError;
    use crate::ipc::handler::channel::create_channel;
    use crate::ipc::handler::TransportError;
    use crate::render::RenderedAudio;
    use async_trait::async_trait;
    use beat_protocol::TempoSettings;
    use serde_json::json;
    use std::sync::atomic::Ordering;
    use std::time::Duration;

    fn silence(frames: usize) -> AudioBuffer {
        AudioBuffer::mono(vec![0.0; frames], 44100).unwrap()
    }

    /// Renderer that never touches the samples; reports the requested window.
    struct WindowEcho;

    #[async_trait]
    impl Renderer for WindowEcho {
        async fn render(
            &self,
            _source: &AudioBuffer,
            offset: f64,
            duration: f64,
        ) -> Result<RenderedAudio, RenderError> {
            Ok(RenderedAudio {
                channel_data: vec![offset as f32, duration as f32],
                sample_rate: 1,
            })
        }
    }

    #[tokio::test]
    async fn test_analyze_round_trip() {
        let (sender, receiver, mut worker) = create_channel(8);
        let detector = BeatDetector::wrap(sender, receiver);
        let source = silence(2000);

        let call = detector.analyze(&source, ());
        let serve = async {
            let request = worker.requests.recv().await.unwrap();
            assert_eq!(request.method, Method::Analyze);
            assert_eq!(request.params.channel_data.len(), 2000);
            assert_eq!(request.params.sample_rate, 44100);
            assert!(request.params.tempo_settings.is_none());
            worker
                .responses
                .send(WorkerResponse::success(request.id, json!(128.0)))
                .await
                .unwrap();
        };

        let (tempo, ()) = tokio::join!(call, serve);
        assert_eq!(tempo.unwrap(), 128.0);
        assert_eq!(detector.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_guess_with_offset_and_duration() {
        let (sender, receiver, mut worker) = create_channel(8);
        let detector = BeatDetector::wrap(sender, receiver);
        let source = silence(2000);

        let call = detector.guess(&source, (500.0 / 44100.0, 1000.0 / 44100.0));
        let serve = async {
            let request = worker.requests.recv().await.unwrap();
            assert_eq!(request.method, Method::Guess);
            assert_eq!(request.params.channel_data.len(), 1000);
            worker
                .responses
                .send(WorkerResponse::success(
                    request.id,
                    json!({ "bpm": 120.0, "offset": 0.1 }),
                ))
                .await
                .unwrap();
        };

        let (guess, ()) = tokio::join!(call, serve);
        assert_eq!(
            guess.unwrap(),
            Guess {
                bpm: 120.0,
                offset: 0.1
            }
        );
    }

    #[tokio::test]
    async fn test_render_failure_registers_nothing() {
        let (sender, receiver, _worker) = create_channel(8);
        let detector = BeatDetector::wrap(sender, receiver);
        let source = silence(44100);

        let err = detector.analyze(&source, (0.5, 0.75)).await.unwrap_err();

        assert!(matches!(err, BeatDetectorError::Render(RenderError::InvalidWindow { .. })));
        assert_eq!(detector.stats().total_registered.load(Ordering::Relaxed), 0);
    }

    #[tokio::test]
    async fn test_remote_error_message_is_verbatim() {
        let (sender, receiver, mut worker) = create_channel(8);
        let detector = BeatDetector::wrap(sender, receiver);
        let source = silence(100);

        let call = detector.analyze(&source, ());
        let serve = async {
            let request = worker.requests.recv().await.unwrap();
            worker
                .responses
                .send(WorkerResponse::failure(request.id, "boom"))
                .await
                .unwrap();
        };

        let (result, ()) = tokio::join!(call, serve);
        let err = result.unwrap_err();
        assert!(err.is_remote());
        assert_eq!(err.to_string(), "boom");
    }

    #[tokio::test]
    async fn test_send_failure_removes_pending_entry() {
        let (sender, receiver, worker) = create_channel(8);
        let detector = BeatDetector::wrap(sender, receiver);
        drop(worker.requests);

        let err = detector.analyze(&silence(100), ()).await.unwrap_err();

        assert!(matches!(err, BeatDetectorError::Transport(TransportError::ChannelClosed)));
        assert_eq!(detector.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_disconnect_fails_outstanding_call() {
        let (sender, receiver, mut worker) = create_channel(8);
        let detector = BeatDetector::wrap(sender, receiver);
        let source = silence(100);

        let call = detector.analyze(&source, ());
        let serve = async move {
            let _request = worker.requests.recv().await.unwrap();
            drop(worker.responses);
        };

        let (result, ()) = tokio::join!(call, serve);
        assert!(matches!(result, Err(BeatDetectorError::Disconnected)));
        assert_eq!(detector.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_call_after_disconnect_fails_without_sending() {
        let (sender, receiver, mut worker) = create_channel(8);
        let detector = BeatDetector::wrap(sender, receiver);
        drop(worker.responses);

        tokio::time::timeout(Duration::from_secs(1), async {
            while !detector.pending.is_closed() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .expect("dispatcher should observe the close");

        let result = tokio::time::timeout(
            Duration::from_millis(500),
            detector.analyze(&silence(100), ()),
        )
        .await
        .expect("call should not hang");

        assert!(matches!(result, Err(BeatDetectorError::Disconnected)));
        assert!(worker.requests.try_recv().is_err());
        assert_eq!(detector.pending_count(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_call_is_removed() {
        let (sender, receiver, mut worker) = create_channel(8);
        let detector = BeatDetector::builder()
            .with_renderer(Arc::new(WindowEcho))
            .wrap(sender, receiver);
        let source = silence(100);

        let abandoned = tokio::time::timeout(Duration::from_millis(50), detector.analyze(&source, ())).await;
        assert!(abandoned.is_err());

        let request = worker.requests.recv().await.unwrap();
        assert_eq!(detector.pending_count(), 0);
        assert_eq!(detector.stats().total_cancelled.load(Ordering::Relaxed), 1);

        // A late answer for the abandoned id is dropped as unmatched.
        worker
            .responses
            .send(WorkerResponse::success(request.id, json!(90.0)))
            .await
            .unwrap();
        tokio::time::timeout(Duration::from_secs(1), async {
            while detector.stats().total_unmatched.load(Ordering::Relaxed) == 0 {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_wrong_result_shape_is_unexpected() {
        let (sender, receiver, mut worker) = create_channel(8);
        let detector = BeatDetector::wrap(sender, receiver);
        let source = silence(100);

        let call = detector.guess(&source, ());
        let serve = async {
            let request = worker.requests.recv().await.unwrap();
            worker
                .responses
                .send(WorkerResponse::success(request.id, json!("fast")))
                .await
                .unwrap();
        };

        let (result, ()) = tokio::join!(call, serve);
        assert!(matches!(
            result,
            Err(BeatDetectorError::UnexpectedResult {
                method: Method::Guess,
                ..
            })
        ));
    }

    #[tokio::test]
    async fn test_builder_overrides_renderer_and_allocator() {
        let (sender, receiver, mut worker) = create_channel(8);
        let detector = BeatDetector::builder()
            .with_renderer(Arc::new(WindowEcho))
            .with_allocator(Arc::new(ScriptedIdAllocator::new(vec![42])))
            .wrap(sender, receiver);
        let source = silence(44100);
        let settings = TempoSettings::range(90.0, 180.0);

        let call = detector.analyze(&source, (0.25, settings.clone()));
        let serve = async {
            let request = worker.requests.recv().await.unwrap();
            assert_eq!(request.id.get(), 42);
            assert_eq!(request.params.channel_data, vec![0.25, 0.75]);
            assert_eq!(request.params.tempo_settings, Some(settings.clone()));
            worker
                .responses
                .send(WorkerResponse::success(request.id, json!({ "tempo": 100.0 })))
                .await
                .unwrap();
        };

        let (tempo, ()) = tokio::join!(call, serve);
        assert_eq!(tempo.unwrap(), 100.0);
    }

    #[tokio::test]
    async fn test_in_memory_endpoint_serves_requests() {
        let (detector, mut worker) = BeatDetector::builder().in_memory(&TransportConfig::default());

        let samples = silence(441);
        let call = detector.analyze(&samples, 0.0);
        let serve = async {
            let request = worker.requests.recv().await.unwrap();
            assert_eq!(request.params.channel_data.len(), 441);
            worker
                .responses
                .send(WorkerResponse::success(request.id, json!(75)))
                .await
                .unwrap();
        };

        let (tempo, ()) = tokio::join!(call, serve);
        assert_eq!(tempo.unwrap(), 75.0);
    }

    #[tokio::test]
    async fn test_load_rejects_missing_program() {
        let result = BeatDetector::load(&BrokerConfig::default());
        assert!(matches!(result, Err(BeatDetectorError::Config(_))));
    }
}
