//! Frame scheduler
//!
//! Drives one trial: Idle → Running → Terminating → Stopped.
//!
//! The scheduler never touches a clock or an event loop itself. A `FrameHost`
//! delivers frame ticks, timer expiry and key presses (each with a timestamp
//! in milliseconds) and executes the scheduler's requests. Timer and key
//! races are settled by the state machine alone: whichever event arrives
//! first ends the trial, the other one finds the scheduler `Stopped` and is
//! dropped.

use super::snapshot::Renderer;
use super::stimulus::Stimulus;
use crate::error::SchedulerError;
use crate::models::config::ResolvedTrial;
use crate::models::response::{is_correct, TrialResponse};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct FrameRequestId(pub u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct TimerId(pub u64);

/// Host environment: display refresh, one-shot timers and keyboard.
pub trait FrameHost {
    /// Ask for one callback at the next display refresh.
    fn request_frame(&mut self) -> FrameRequestId;
    fn cancel_frame(&mut self, id: FrameRequestId);
    /// One-shot timer firing `delay_ms` from now.
    fn arm_timer(&mut self, delay_ms: f64) -> TimerId;
    fn cancel_timer(&mut self, id: TimerId);
    fn listen_keys(&mut self);
    fn unlisten_keys(&mut self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum SchedulerState {
    Idle,
    Running,
    Terminating,
    Stopped,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct TrialResult {
    pub response: TrialResponse,
    pub correct: bool,
    /// Resolved per-aperture parameters, including the seed actually used.
    pub config: ResolvedTrial,
    /// Mean of the logged frame intervals; `None` with fewer than two frames.
    pub average_frame_interval_ms: Option<f64>,
    pub frame_count: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub frame_intervals_ms: Option<Vec<f64>>,
    /// Time from `start` to termination.
    pub elapsed_ms: f64,
}

pub struct FrameScheduler<R: Renderer> {
    trial: ResolvedTrial,
    stimulus: Stimulus,
    renderer: R,
    state: SchedulerState,
    pending_frame: Option<FrameRequestId>,
    timer: Option<TimerId>,
    listening: bool,
    start_ms: f64,
    onset_ms: Option<f64>,
    last_frame_ms: Option<f64>,
    intervals: Vec<f64>,
    frame_count: u64,
    response: Option<TrialResponse>,
    result: Option<TrialResult>,
}

impl<R: Renderer> FrameScheduler<R> {
    pub fn new(trial: ResolvedTrial, renderer: R) -> Self {
        let stimulus = Stimulus::new(&trial);
        Self {
            trial,
            stimulus,
            renderer,
            state: SchedulerState::Idle,
            pending_frame: None,
            timer: None,
            listening: false,
            start_ms: 0.0,
            onset_ms: None,
            last_frame_ms: None,
            intervals: Vec::new(),
            frame_count: 0,
            response: None,
            result: None,
        }
    }

    /// Request the first frame and open the response window.
    ///
    /// Only one frame loop may ever run per scheduler.
    pub fn start<H: FrameHost>(
        &mut self,
        host: &mut H,
        now_ms: f64,
    ) -> Result<(), SchedulerError> {
        if self.state != SchedulerState::Idle {
            return Err(SchedulerError::AlreadyStarted);
        }
        self.state = SchedulerState::Running;
        self.start_ms = now_ms;
        self.pending_frame = Some(host.request_frame());
        if !self.trial.choices.is_empty() {
            host.listen_keys();
            self.listening = true;
        }
        debug!(
            seed = self.trial.seed,
            apertures = self.trial.apertures.len(),
            "frame loop started"
        );
        Ok(())
    }

    /// Display refresh callback. Stale or late ticks are ignored.
    pub fn on_frame<H: FrameHost>(&mut self, host: &mut H, id: FrameRequestId, now_ms: f64) {
        if self.state != SchedulerState::Running || self.pending_frame != Some(id) {
            return;
        }
        self.pending_frame = None;

        match self.last_frame_ms {
            None => {
                self.onset_ms = Some(now_ms);
                if let Some(duration) = self.trial.timing.trial_duration_ms {
                    self.timer = Some(host.arm_timer(duration));
                }
            }
            Some(previous) => self.intervals.push(now_ms - previous),
        }
        self.last_frame_ms = Some(now_ms);

        self.stimulus.advance_frame();
        self.renderer.render(&self.stimulus.snapshot());
        self.frame_count += 1;
        self.pending_frame = Some(host.request_frame());
    }

    /// Key press. Returns true when the key was taken as the response.
    pub fn on_key<H: FrameHost>(&mut self, host: &mut H, key: &str, now_ms: f64) -> bool {
        if self.state != SchedulerState::Running || !self.listening || self.response.is_some() {
            return false;
        }
        if !self.trial.choices.accepts(key) {
            return false;
        }
        let rt_ms = now_ms - self.onset_ms.unwrap_or(self.start_ms);
        self.response = Some(TrialResponse::Key { key: key.to_string(), rt_ms });
        host.unlisten_keys();
        self.listening = false;
        debug!(key, rt_ms, "response recorded");

        if self.trial.timing.response_ends_trial {
            self.finish(host, now_ms);
        }
        true
    }

    /// Duration timer expiry.
    pub fn on_timer<H: FrameHost>(&mut self, host: &mut H, id: TimerId, now_ms: f64) {
        if self.state != SchedulerState::Running || self.timer != Some(id) {
            return;
        }
        self.timer = None;
        self.finish(host, now_ms);
    }

    /// Stop the frame loop, release every host resource and build the result.
    pub fn end_trial<H: FrameHost>(
        &mut self,
        host: &mut H,
        now_ms: f64,
    ) -> Result<(), SchedulerError> {
        if self.state != SchedulerState::Running {
            return Err(SchedulerError::NotRunning);
        }
        self.finish(host, now_ms);
        Ok(())
    }

    /// Teardown for a running trial. Callers check the state first.
    fn finish<H: FrameHost>(&mut self, host: &mut H, now_ms: f64) {
        self.state = SchedulerState::Terminating;

        if let Some(id) = self.pending_frame.take() {
            host.cancel_frame(id);
        }
        if let Some(id) = self.timer.take() {
            host.cancel_timer(id);
        }
        if self.listening {
            host.unlisten_keys();
            self.listening = false;
        }

        let response = self.response.clone().unwrap_or(TrialResponse::Timeout);
        let correct = is_correct(&response, &self.trial.correct_choice);
        let average_frame_interval_ms = if self.intervals.is_empty() {
            None
        } else {
            Some(self.intervals.iter().sum::<f64>() / self.intervals.len() as f64)
        };
        let frame_intervals_ms =
            self.trial.timing.record_frame_intervals.then(|| self.intervals.clone());

        debug!(
            frames = self.frame_count,
            ?average_frame_interval_ms,
            timeout = matches!(response, TrialResponse::Timeout),
            "trial ended"
        );

        self.result = Some(TrialResult {
            response,
            correct,
            config: self.trial.clone(),
            average_frame_interval_ms,
            frame_count: self.frame_count,
            frame_intervals_ms,
            elapsed_ms: now_ms - self.start_ms,
        });
        self.state = SchedulerState::Stopped;
    }

    pub fn state(&self) -> SchedulerState {
        self.state
    }

    pub fn result(&self) -> Option<&TrialResult> {
        self.result.as_ref()
    }

    pub fn stimulus(&self) -> &Stimulus {
        &self.stimulus
    }

    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    pub fn into_parts(self) -> (Option<TrialResult>, R) {
        (self.result, self.renderer)
    }
}
