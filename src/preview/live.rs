// src/preview/live.rs
use super::{
    ensure_metrics_described, ContentGenerator, PreviewContent, PreviewEvent, PreviewRequest,
    PreviewState,
};
use crate::insights::config::PreviewConfig;
use anyhow::anyhow;
use metrics::counter;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, watch};
use tokio::task::{JoinError, JoinHandle};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

/// Events retained for a slow consumer; older ones are dropped first.
pub const EVENT_BUFFER: usize = 32;

enum Command {
    Update(PreviewRequest),
    Cancel,
}

struct InFlight {
    revision: u64,
    token: CancellationToken,
    handle: JoinHandle<anyhow::Result<PreviewContent>>,
}

impl InFlight {
    fn abort(self) -> u64 {
        self.token.cancel();
        self.handle.abort();
        self.revision
    }
}

/// Handle to a spawned preview actor. Dropping it stops the actor and cancels
/// any in-flight generation.
///
/// Events go through a ring buffer of [`EVENT_BUFFER`] entries, so a UI that
/// only watches [`state`](Self::state) never accumulates undrained events.
pub struct LivePreview {
    commands: mpsc::UnboundedSender<Command>,
    state: watch::Receiver<PreviewState>,
    events: broadcast::Receiver<PreviewEvent>,
    task: JoinHandle<()>,
}

impl LivePreview {
    /// Spawn the actor on the current Tokio runtime.
    pub fn spawn(generator: Arc<dyn ContentGenerator>, config: PreviewConfig) -> Self {
        ensure_metrics_described();
        let (cmd_tx, cmd_rx) = mpsc::unbounded_channel();
        let (state_tx, state_rx) = watch::channel(PreviewState::Idle);
        let (event_tx, event_rx) = broadcast::channel(EVENT_BUFFER);

        let actor = Actor {
            generator,
            debounce: config.debounce(),
            state: state_tx,
            events: event_tx,
            revision: 0,
            last: None,
            pending: None,
            deadline: None,
            in_flight: None,
        };
        let task = tokio::spawn(actor.run(cmd_rx));

        Self {
            commands: cmd_tx,
            state: state_rx,
            events: event_rx,
            task,
        }
    }

    /// Replace the current request. Cancels any in-flight generation and
    /// restarts the debounce; an empty selection returns to `Idle`. Re-sending
    /// the request that is already debouncing, generating or delivered does
    /// nothing.
    pub fn update(&self, request: PreviewRequest) -> anyhow::Result<()> {
        self.commands
            .send(Command::Update(request))
            .map_err(|_| anyhow!("preview actor has stopped"))
    }

    /// Drop the pending request and cancel any in-flight generation.
    pub fn cancel(&self) -> anyhow::Result<()> {
        self.commands
            .send(Command::Cancel)
            .map_err(|_| anyhow!("preview actor has stopped"))
    }

    pub fn state(&self) -> PreviewState {
        *self.state.borrow()
    }

    /// Watch channel for UIs that render on every transition.
    pub fn subscribe(&self) -> watch::Receiver<PreviewState> {
        self.state.clone()
    }

    /// Next delivery, failure or cancellation notice. `None` once the actor
    /// stopped. Events overwritten while nobody was reading are skipped.
    pub async fn next_event(&mut self) -> Option<PreviewEvent> {
        loop {
            match self.events.recv().await {
                Ok(event) => return Some(event),
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    debug!(target: "preview", skipped, "preview consumer lagged; oldest events dropped");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }

    /// Stop the actor and wait for it to wind down.
    pub async fn shutdown(self) {
        let LivePreview { commands, task, .. } = self;
        drop(commands);
        if let Err(e) = task.await {
            warn!(target: "preview", error = %e, "preview actor ended abnormally");
        }
    }
}

struct Actor {
    generator: Arc<dyn ContentGenerator>,
    debounce: Duration,
    state: watch::Sender<PreviewState>,
    events: broadcast::Sender<PreviewEvent>,
    revision: u64,
    /// Last non-empty request accepted.
    last: Option<PreviewRequest>,
    pending: Option<PreviewRequest>,
    deadline: Option<Instant>,
    in_flight: Option<InFlight>,
}

impl Actor {
    async fn run(mut self, mut commands: mpsc::UnboundedReceiver<Command>) {
        loop {
            tokio::select! {
                cmd = commands.recv() => match cmd {
                    Some(Command::Update(request)) => self.on_update(request),
                    Some(Command::Cancel) => self.on_cancel(),
                    None => {
                        self.cancel_in_flight();
                        break;
                    }
                },
                _ = sleep_until(self.deadline) => {
                    self.deadline = None;
                    self.start_generation();
                }
                (revision, joined) = join_in_flight(&mut self.in_flight) => {
                    self.in_flight = None;
                    self.on_finished(revision, joined);
                }
            }
        }
        debug!(target: "preview", "preview actor stopped");
    }

    fn on_update(&mut self, request: PreviewRequest) {
        if self.last.as_ref() == Some(&request) && self.is_live() {
            debug!(target: "preview", revision = self.revision, "unchanged preview request ignored");
            return;
        }
        self.revision += 1;
        counter!("preview_requests_total").increment(1);
        self.cancel_in_flight();

        if request.is_empty() {
            self.last = None;
            self.pending = None;
            self.deadline = None;
            self.set_state(PreviewState::Idle);
            return;
        }
        self.last = Some(request.clone());
        self.pending = Some(request);
        self.deadline = Some(Instant::now() + self.debounce);
        self.set_state(PreviewState::Debouncing {
            revision: self.revision,
        });
    }

    /// Debouncing, generating or delivered: re-sending the same request is a no-op.
    fn is_live(&self) -> bool {
        matches!(
            *self.state.borrow(),
            PreviewState::Debouncing { .. }
                | PreviewState::Generating { .. }
                | PreviewState::Delivered { .. }
        )
    }

    fn on_cancel(&mut self) {
        let had_work = self.pending.take().is_some() || self.in_flight.is_some();
        self.deadline = None;
        self.cancel_in_flight();
        if had_work {
            self.set_state(PreviewState::Cancelled {
                revision: self.revision,
            });
        }
    }

    fn cancel_in_flight(&mut self) {
        if let Some(flight) = self.in_flight.take() {
            let revision = flight.abort();
            counter!("preview_cancelled_total").increment(1);
            debug!(target: "preview", revision, "cancelled in-flight preview");
            let _ = self.events.send(PreviewEvent::Cancelled { revision });
        }
    }

    fn start_generation(&mut self) {
        let Some(request) = self.pending.take() else {
            return;
        };
        let revision = self.revision;
        let token = CancellationToken::new();
        let generator = Arc::clone(&self.generator);
        let child = token.clone();
        let handle = tokio::spawn(async move { generator.generate(request, child).await });
        self.in_flight = Some(InFlight {
            revision,
            token,
            handle,
        });
        self.set_state(PreviewState::Generating { revision });
    }

    fn on_finished(
        &mut self,
        revision: u64,
        joined: Result<anyhow::Result<PreviewContent>, JoinError>,
    ) {
        // Only the newest revision may publish.
        if revision != self.revision {
            return;
        }
        match joined {
            Ok(Ok(content)) => {
                self.set_state(PreviewState::Delivered { revision });
                let _ = self.events.send(PreviewEvent::Delivered { revision, content });
            }
            Ok(Err(e)) => self.fail(revision, format!("{e:#}")),
            Err(e) if e.is_cancelled() => {}
            Err(e) => self.fail(revision, format!("generator task panicked: {e}")),
        }
    }

    fn fail(&mut self, revision: u64, error: String) {
        warn!(target: "preview", revision, error = %error, "preview generation failed");
        self.set_state(PreviewState::Failed { revision });
        let _ = self.events.send(PreviewEvent::Failed { revision, error });
    }

    fn set_state(&self, next: PreviewState) {
        self.state.send_replace(next);
    }
}

/// Pending forever when no deadline is armed.
async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(d) => tokio::time::sleep_until(d).await,
        None => std::future::pending().await,
    }
}

/// Pending forever when nothing is in flight.
async fn join_in_flight(
    slot: &mut Option<InFlight>,
) -> (u64, Result<anyhow::Result<PreviewContent>, JoinError>) {
    match slot {
        Some(flight) => (flight.revision, (&mut flight.handle).await),
        None => std::future::pending().await,
    }
}
