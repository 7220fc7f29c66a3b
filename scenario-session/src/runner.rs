//! Tokio task driving an [`AlarmSession`] on a fixed tick.
//!
//! The tick never overlaps itself: evaluation runs inline in the task loop and
//! missed ticks are skipped rather than replayed.

use chrono::{DateTime, Utc};
use tokio::sync::{broadcast, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, info, info_span, Instrument};

use crate::{AlarmEvent, AlarmSession, MonitorView, SessionAction, SessionConfig, SessionError};

struct Command {
    action: SessionAction,
    reply: oneshot::Sender<Result<(), SessionError>>,
}

/// Control and subscription side of a running session.
pub struct SessionHandle {
    commands: mpsc::Sender<Command>,
    cancel: watch::Sender<bool>,
    events: broadcast::Sender<AlarmEvent>,
    view: watch::Receiver<MonitorView>,
    task: JoinHandle<MonitorView>,
}

/// Moves `session` onto a tokio task. Must be called from within a runtime.
///
/// Returns the handle plus a first event receiver, subscribed before the first
/// tick so no change is missed.
pub fn spawn(
    session: AlarmSession,
    config: &SessionConfig,
) -> (SessionHandle, broadcast::Receiver<AlarmEvent>) {
    let (commands, command_rx) = mpsc::channel(8);
    let (cancel, cancelled) = watch::channel(false);
    let (events, first_subscriber) = broadcast::channel(config.event_capacity());
    let (view_tx, view) = watch::channel(session.view());

    let span = info_span!(
        "alarm_session",
        duration_seconds = session.scenario().total_duration_seconds,
        keyframes = session.scenario().timeline.len()
    );
    let task = tokio::spawn(
        run(
            session,
            config.tick_interval(),
            command_rx,
            cancelled,
            events.clone(),
            view_tx,
        )
        .instrument(span),
    );

    let handle = SessionHandle {
        commands,
        cancel,
        events,
        view,
        task,
    };
    (handle, first_subscriber)
}

impl SessionHandle {
    pub fn subscribe(&self) -> broadcast::Receiver<AlarmEvent> {
        self.events.subscribe()
    }

    /// Latest published view.
    pub fn view(&self) -> MonitorView {
        self.view.borrow().clone()
    }

    pub fn watch_view(&self) -> watch::Receiver<MonitorView> {
        self.view.clone()
    }

    pub async fn start(&self) -> Result<(), SessionError> {
        self.send(SessionAction::Start).await
    }

    pub async fn pause(&self) -> Result<(), SessionError> {
        self.send(SessionAction::Pause).await
    }

    pub async fn resume(&self) -> Result<(), SessionError> {
        self.send(SessionAction::Resume).await
    }

    /// Requests the session to end. Calling it again is a no-op.
    pub fn end(&self) {
        self.cancel.send_replace(true);
    }

    /// Waits for the task to finish and returns the final view.
    pub async fn join(self) -> Result<MonitorView, SessionError> {
        self.task.await.map_err(|_| SessionError::Closed)
    }

    pub async fn shutdown(self) -> Result<MonitorView, SessionError> {
        self.end();
        self.join().await
    }

    async fn send(&self, action: SessionAction) -> Result<(), SessionError> {
        let (reply, response) = oneshot::channel();
        self.commands
            .send(Command { action, reply })
            .await
            .map_err(|_| SessionError::Closed)?;
        response.await.map_err(|_| SessionError::Closed)?
    }
}

async fn run(
    mut session: AlarmSession,
    tick_interval: std::time::Duration,
    mut commands: mpsc::Receiver<Command>,
    mut cancelled: watch::Receiver<bool>,
    events: broadcast::Sender<AlarmEvent>,
    view: watch::Sender<MonitorView>,
) -> MonitorView {
    let clock = WallClock::new();
    let mut ticker = time::interval(tick_interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    info!(state = %session.state(), "session task started");

    loop {
        tokio::select! {
            biased;

            _ = cancelled.changed() => {
                break;
            }
            Some(command) = commands.recv() => {
                let result = session.apply(command.action, clock.now());
                if let Err(err) = &result {
                    debug!(action = %command.action, error = %err, "command rejected");
                }
                let _ = command.reply.send(result);
                view.send_replace(session.view());
            }
            _ = ticker.tick() => {
                let outcome = session.tick(clock.now());
                for event in outcome.events {
                    // No subscribers is fine; the view still carries the flag.
                    let _ = events.send(event);
                }
                view.send_replace(session.view());
            }
        }
    }

    session.end(clock.now());
    let final_view = session.view();
    view.send_replace(final_view.clone());
    info!(elapsed_seconds = final_view.elapsed_seconds, "session task finished");
    final_view
}

/// Wall-clock timestamps advanced by tokio's clock, so paused test time
/// drives the session the same way real time does.
struct WallClock {
    origin_wall: DateTime<Utc>,
    origin: Instant,
}

impl WallClock {
    fn new() -> Self {
        Self {
            origin_wall: Utc::now(),
            origin: Instant::now(),
        }
    }

    fn now(&self) -> DateTime<Utc> {
        let elapsed = chrono::Duration::from_std(self.origin.elapsed())
            .unwrap_or_else(|_| chrono::Duration::zero());
        self.origin_wall + elapsed
    }
}
