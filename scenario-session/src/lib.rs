//! Live alarm session: plays a scaled scenario against a clock and reports
//! alarm-state changes for the monitored vital signs.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use scenario_core::{
    classify, progress, resolve_keyframe, AlarmConfig, Flag, ParameterKey, ParameterSnapshot,
    Scenario, ScenarioError,
};
use serde::Serialize;
use tracing::{debug, info};

mod clock;
mod config;
pub mod runner;

pub use clock::SessionClock;
pub use config::SessionConfig;
pub use runner::{spawn, SessionHandle};

/// Lifecycle: `Idle -> Running <-> Paused -> Ended`.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    Idle,
    Running,
    Paused,
    Ended,
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionState::Idle => "idle",
            SessionState::Running => "running",
            SessionState::Paused => "paused",
            SessionState::Ended => "ended",
        };
        f.write_str(label)
    }
}

/// Explicit triggers coming from outside the session.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum SessionAction {
    Start,
    Pause,
    Resume,
}

impl fmt::Display for SessionAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SessionAction::Start => "start",
            SessionAction::Pause => "pause",
            SessionAction::Resume => "resume",
        };
        f.write_str(label)
    }
}

/// Flag change for one parameter.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct AlarmEvent {
    pub parameter: ParameterKey,
    pub value: f64,
    pub flag: Flag,
    pub previous: Flag,
    pub timestamp: DateTime<Utc>,
    pub elapsed_seconds: f64,
}

/// Current value and flag of a monitored parameter.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonitoredValue {
    pub parameter: ParameterKey,
    pub value: f64,
    pub flag: Flag,
}

/// What the display layer polls.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct MonitorView {
    pub state: SessionState,
    pub elapsed_seconds: f64,
    pub progress: f64,
    pub keyframe_index: Option<usize>,
    pub keyframe_label: Option<String>,
    pub snapshot: ParameterSnapshot,
    pub flags: Vec<MonitoredValue>,
    pub completed: bool,
    /// Number of ticks that evaluated the snapshot.
    pub evaluations: u64,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickOutcome {
    pub events: Vec<AlarmEvent>,
    pub completed: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),
    #[error("scenario is disabled")]
    ScenarioDisabled,
    #[error("cannot {action} a session that is {from}")]
    InvalidTransition {
        from: SessionState,
        action: SessionAction,
    },
    #[error("session task is no longer running")]
    Closed,
}

/// State machine evaluating one scenario. Owns its own scaled copy of the
/// scenario; nothing is shared with other sessions.
#[derive(Debug, Clone)]
pub struct AlarmSession {
    scenario: Scenario,
    alarms: AlarmConfig,
    state: SessionState,
    clock: Option<SessionClock>,
    elapsed_seconds: f64,
    keyframe_index: Option<usize>,
    flags: BTreeMap<ParameterKey, MonitoredValue>,
    evaluations: u64,
}

impl AlarmSession {
    /// Creates the session; `auto_start` scenarios go straight to `Running`.
    pub fn new(
        scenario: Scenario,
        alarms: AlarmConfig,
        now: DateTime<Utc>,
    ) -> Result<Self, SessionError> {
        if !scenario.enabled {
            return Err(SessionError::ScenarioDisabled);
        }
        // Fields are public, so the scenario may not have gone through `Scenario::new`.
        scenario.validate()?;

        let auto_start = scenario.auto_start;
        let mut session = Self {
            scenario,
            alarms,
            state: SessionState::Idle,
            clock: None,
            elapsed_seconds: 0.0,
            keyframe_index: None,
            flags: BTreeMap::new(),
            evaluations: 0,
        };
        if auto_start {
            session.start(now)?;
        }
        Ok(session)
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn scenario(&self) -> &Scenario {
        &self.scenario
    }

    pub fn clock(&self) -> Option<&SessionClock> {
        self.clock.as_ref()
    }

    /// Elapsed time as of the last tick or transition.
    pub fn elapsed_seconds(&self) -> f64 {
        self.elapsed_seconds
    }

    pub fn apply(&mut self, action: SessionAction, now: DateTime<Utc>) -> Result<(), SessionError> {
        match action {
            SessionAction::Start => self.start(now),
            SessionAction::Pause => self.pause(now),
            SessionAction::Resume => self.resume(now),
        }
    }

    pub fn start(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        match self.state {
            SessionState::Idle => {
                self.clock = Some(SessionClock::start(now));
                self.transition(SessionState::Running);
                Ok(())
            }
            SessionState::Running => Ok(()),
            from => Err(SessionError::InvalidTransition {
                from,
                action: SessionAction::Start,
            }),
        }
    }

    pub fn pause(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        match self.state {
            SessionState::Running => {
                if let Some(clock) = self.clock.as_mut() {
                    clock.pause(now);
                    self.elapsed_seconds = clock.elapsed_seconds();
                }
                self.transition(SessionState::Paused);
                Ok(())
            }
            SessionState::Paused => Ok(()),
            from => Err(SessionError::InvalidTransition {
                from,
                action: SessionAction::Pause,
            }),
        }
    }

    pub fn resume(&mut self, now: DateTime<Utc>) -> Result<(), SessionError> {
        match self.state {
            SessionState::Paused => {
                if let Some(clock) = self.clock.as_mut() {
                    clock.resume(now);
                }
                self.transition(SessionState::Running);
                Ok(())
            }
            SessionState::Running => Ok(()),
            from => Err(SessionError::InvalidTransition {
                from,
                action: SessionAction::Resume,
            }),
        }
    }

    /// Ends the session from any state and releases the clock. Idempotent.
    pub fn end(&mut self, now: DateTime<Utc>) {
        if self.state == SessionState::Ended {
            return;
        }
        if let Some(mut clock) = self.clock.take() {
            self.elapsed_seconds = clock.advance(now);
        }
        self.transition(SessionState::Ended);
    }

    /// One evaluation step. Only a running session does any work.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if self.state != SessionState::Running {
            return TickOutcome::default();
        }
        let Some(clock) = self.clock.as_mut() else {
            return TickOutcome::default();
        };

        let elapsed_seconds = clock.advance(now);
        self.elapsed_seconds = elapsed_seconds;
        self.evaluations += 1;

        let active = resolve_keyframe(&self.scenario.timeline, elapsed_seconds);
        if self.keyframe_index != Some(active.index) {
            info!(
                index = active.index,
                label = %active.keyframe.label,
                elapsed_seconds,
                "scenario reached keyframe"
            );
            self.keyframe_index = Some(active.index);
        }

        let mut events = Vec::new();
        let mut current = BTreeMap::new();
        for (parameter, value) in active.keyframe.snapshot.iter() {
            let Some(range) = self.alarms.effective_range(parameter) else {
                continue;
            };
            let flag = classify(value, &range);
            let previous = self
                .flags
                .get(parameter)
                .map_or(Flag::Normal, |monitored| monitored.flag);

            if flag != previous {
                debug!(%parameter, value, %previous, %flag, "alarm flag changed");
                events.push(AlarmEvent {
                    parameter: parameter.clone(),
                    value,
                    flag,
                    previous,
                    timestamp: now,
                    elapsed_seconds,
                });
            }
            current.insert(
                parameter.clone(),
                MonitoredValue {
                    parameter: parameter.clone(),
                    value,
                    flag,
                },
            );
        }
        self.flags = current;

        TickOutcome {
            events,
            completed: self.is_completed(),
        }
    }

    pub fn is_completed(&self) -> bool {
        self.elapsed_seconds >= self.scenario.total_duration_seconds
    }

    /// Current flag for `parameter`, if it was monitored on the last tick.
    pub fn flag(&self, parameter: &str) -> Option<Flag> {
        self.flags
            .get(&ParameterKey::new(parameter))
            .map(|monitored| monitored.flag)
    }

    pub fn view(&self) -> MonitorView {
        let keyframe = self
            .keyframe_index
            .and_then(|index| self.scenario.timeline.keyframes().get(index));

        MonitorView {
            state: self.state,
            elapsed_seconds: self.elapsed_seconds,
            progress: progress(self.elapsed_seconds, self.scenario.total_duration_seconds),
            keyframe_index: self.keyframe_index,
            keyframe_label: keyframe.map(|kf| kf.label.clone()),
            snapshot: keyframe.map(|kf| kf.snapshot.clone()).unwrap_or_default(),
            flags: self.flags.values().cloned().collect(),
            completed: self.is_completed(),
            evaluations: self.evaluations,
        }
    }

    fn transition(&mut self, to: SessionState) {
        info!(
            from = %self.state,
            %to,
            elapsed_seconds = self.elapsed_seconds,
            "session state changed"
        );
        self.state = to;
    }
}
