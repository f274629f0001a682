//! Headless driver
//!
//! Runs a trial against a virtual clock: frames fire on refresh multiples,
//! timers at their due time and scripted key presses at their timestamp.
//! Events due at the same instant are delivered timer first, then key, then
//! frame. Nothing sleeps, so a 500 ms trial completes instantly and
//! reproducibly.

use super::scheduler::{
    FrameHost, FrameRequestId, FrameScheduler, SchedulerState, TimerId, TrialResult,
};
use super::snapshot::Renderer;
use crate::error::{ConfigError, Result, SchedulerError};
use crate::models::config::ResolvedTrial;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

pub const DEFAULT_REFRESH_HZ: f64 = 60.0;
pub const MAX_REFRESH_HZ: f64 = 1000.0;

/// Hard stop for trials that would otherwise never end (no duration, no response).
pub const DEFAULT_MAX_DURATION_MS: f64 = 60_000.0;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct HeadlessOptions {
    pub refresh_hz: f64,
    pub max_duration_ms: f64,
}

impl Default for HeadlessOptions {
    fn default() -> Self {
        Self { refresh_hz: DEFAULT_REFRESH_HZ, max_duration_ms: DEFAULT_MAX_DURATION_MS }
    }
}

impl HeadlessOptions {
    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if !(self.refresh_hz > 0.0 && self.refresh_hz <= MAX_REFRESH_HZ) {
            let reason = format!("must be in (0, {MAX_REFRESH_HZ}]");
            return Err(ConfigError::invalid("refresh_hz", reason));
        }
        if !(self.max_duration_ms.is_finite() && self.max_duration_ms >= 0.0) {
            return Err(ConfigError::invalid("max_duration_ms", "must be a non-negative number"));
        }
        Ok(())
    }
}

/// A key press delivered `at_ms` after the trial starts.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct ScriptedKey {
    pub key: String,
    pub at_ms: f64,
}

impl ScriptedKey {
    pub fn new(key: impl Into<String>, at_ms: f64) -> Self {
        Self { key: key.into(), at_ms }
    }

    fn validate(&self) -> std::result::Result<(), ConfigError> {
        if self.at_ms.is_finite() && self.at_ms >= 0.0 {
            Ok(())
        } else {
            let reason = format!("key time {} must be a non-negative number", self.at_ms);
            Err(ConfigError::invalid("responses", reason))
        }
    }
}

/// `FrameHost` backed by a virtual millisecond clock.
#[derive(Debug, Clone)]
pub struct VirtualHost {
    now_ms: f64,
    frame_period_ms: f64,
    next_id: u64,
    pending_frame: Option<(FrameRequestId, f64)>,
    timers: Vec<(TimerId, f64)>,
    listening: bool,
}

impl VirtualHost {
    pub fn new(refresh_hz: f64) -> Self {
        Self {
            now_ms: 0.0,
            frame_period_ms: 1000.0 / refresh_hz,
            next_id: 0,
            pending_frame: None,
            timers: Vec::new(),
            listening: false,
        }
    }

    pub fn now_ms(&self) -> f64 {
        self.now_ms
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn has_pending_frame(&self) -> bool {
        self.pending_frame.is_some()
    }

    pub fn pending_timers(&self) -> usize {
        self.timers.len()
    }

    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn earliest_timer(&self) -> Option<(TimerId, f64)> {
        self.timers.iter().copied().min_by(|a, b| a.1.total_cmp(&b.1))
    }
}

impl FrameHost for VirtualHost {
    fn request_frame(&mut self) -> FrameRequestId {
        let id = FrameRequestId(self.next_id());
        let mut refresh = (self.now_ms / self.frame_period_ms).floor() + 1.0;
        while refresh * self.frame_period_ms <= self.now_ms {
            refresh += 1.0;
        }
        let due = refresh * self.frame_period_ms;
        self.pending_frame = Some((id, due));
        id
    }

    fn cancel_frame(&mut self, id: FrameRequestId) {
        if matches!(self.pending_frame, Some((pending, _)) if pending == id) {
            self.pending_frame = None;
        }
    }

    fn arm_timer(&mut self, delay_ms: f64) -> TimerId {
        let id = TimerId(self.next_id());
        self.timers.push((id, self.now_ms + delay_ms));
        id
    }

    fn cancel_timer(&mut self, id: TimerId) {
        self.timers.retain(|(t, _)| *t != id);
    }

    fn listen_keys(&mut self) {
        self.listening = true;
    }

    fn unlisten_keys(&mut self) {
        self.listening = false;
    }
}

enum Due {
    Timer(TimerId),
    Key,
    Frame(FrameRequestId),
}

/// Run one trial to completion on a virtual clock.
///
/// Returns the trial result and the renderer (holding whatever it captured).
pub fn run_headless<R: Renderer>(
    trial: ResolvedTrial,
    renderer: R,
    keys: &[ScriptedKey],
    options: &HeadlessOptions,
) -> Result<(TrialResult, R)> {
    options.validate()?;
    for key in keys {
        key.validate()?;
    }

    let mut script: Vec<&ScriptedKey> = keys.iter().collect();
    script.sort_by(|a, b| a.at_ms.total_cmp(&b.at_ms));
    let mut script = script.into_iter().peekable();

    let mut host = VirtualHost::new(options.refresh_hz);
    let mut scheduler = FrameScheduler::new(trial, renderer);
    scheduler.start(&mut host, 0.0)?;

    while scheduler.state() == SchedulerState::Running {
        let mut next: Option<(f64, Due)> = None;
        let mut consider = |at: f64, due: Due| {
            if next.as_ref().map_or(true, |(best, _)| at < *best) {
                next = Some((at, due));
            }
        };
        // Strict `<` keeps the earlier candidate on ties: timer, key, frame.
        if let Some((id, at)) = host.earliest_timer() {
            consider(at, Due::Timer(id));
        }
        if let Some(key) = script.peek() {
            consider(key.at_ms, Due::Key);
        }
        if let Some((id, at)) = host.pending_frame {
            consider(at, Due::Frame(id));
        }

        match next {
            Some((at, due)) if at <= options.max_duration_ms => {
                host.now_ms = host.now_ms.max(at);
                let now = host.now_ms;
                match due {
                    Due::Timer(id) => {
                        host.cancel_timer(id);
                        scheduler.on_timer(&mut host, id, now);
                    }
                    Due::Key => {
                        if let Some(key) = script.next() {
                            if host.listening {
                                scheduler.on_key(&mut host, &key.key, now);
                            }
                        }
                    }
                    Due::Frame(id) => {
                        host.pending_frame = None;
                        scheduler.on_frame(&mut host, id, now);
                    }
                }
            }
            _ => {
                host.now_ms = host.now_ms.max(options.max_duration_ms);
                debug!(at_ms = host.now_ms, "headless run hit its duration cap");
                let now = host.now_ms;
                scheduler.end_trial(&mut host, now)?;
            }
        }
    }

    let (result, renderer) = scheduler.into_parts();
    let result = result.ok_or(SchedulerError::NotRunning)?;
    Ok((result, renderer))
}
