//! The driving loop.
//!
//! [`Core`] owns a [`Scheduler`] and a [`Renderer`] and runs them on a fixed
//! cadence. Each iteration handles pending signal messages, reloads the store when
//! asked to or when its marker moved, ticks the engine and redraws if the engine
//! raised `refresh_needed`. Between iterations it blocks on the signal channel, so a
//! reload or shutdown request is picked up immediately in real time.

use anyhow::Result;
use std::sync::Arc;
use std::sync::mpsc::RecvTimeoutError;
use std::time::Duration;

use crate::{
    io::signals::{SignalState, handle_signal_message},
    render::{DisplayContent, Renderer},
    schedule::ModificationMarker,
    scheduler::Scheduler,
    time::source::TimeSource,
};

/// Added to a sleep that ends at a slot's due instant.
const PROMOTION_MARGIN: Duration = Duration::from_millis(1);

/// Everything a [`Core`] needs.
pub struct CoreParams {
    pub scheduler: Scheduler,
    pub renderer: Box<dyn Renderer>,
    pub clock: Arc<dyn TimeSource>,
    pub signal_state: SignalState,
    pub tick_interval: Duration,
    /// Sleep between iterations while no slot is current
    pub empty_schedule_delay: Duration,
    pub debug_enabled: bool,
}

/// Runtime state of the driving loop.
pub struct Core {
    scheduler: Scheduler,
    renderer: Box<dyn Renderer>,
    clock: Arc<dyn TimeSource>,
    signal_state: SignalState,
    tick_interval: Duration,
    empty_schedule_delay: Duration,
    debug_enabled: bool,
    /// Marker of the last reload that failed, so it is retried only once the
    /// store changes again
    failed_marker: Option<ModificationMarker>,
    first_iteration: bool,
}

impl Core {
    pub fn new(params: CoreParams) -> Self {
        Self {
            scheduler: params.scheduler,
            renderer: params.renderer,
            clock: params.clock,
            signal_state: params.signal_state,
            tick_interval: params.tick_interval,
            empty_schedule_delay: params.empty_schedule_delay,
            debug_enabled: params.debug_enabled,
            failed_marker: None,
            first_iteration: true,
        }
    }

    /// Run until shutdown or until a simulated clock reaches its end.
    pub fn execute(mut self) -> Result<()> {
        log_block_start!("Rendering with {} renderer", self.renderer.name());

        while self.signal_state.is_running() && !self.clock.is_ended() {
            let sleep_duration = self.run_iteration();
            self.wait(sleep_duration);
        }

        if self.debug_enabled {
            log_pipe!();
            log_debug!("Driving loop finished");
        }
        Ok(())
    }

    /// One pass of the loop. Returns how long to sleep before the next.
    pub fn run_iteration(&mut self) -> Duration {
        self.process_pending_signals();
        self.reload_if_needed();
        self.scheduler.tick();
        self.render_if_needed();

        if self.scheduler.current_slot().is_some() {
            self.tick_interval
        } else {
            self.until_next_slot()
                .map_or(self.empty_schedule_delay, |until| {
                    until.min(self.empty_schedule_delay)
                })
        }
    }

    pub fn scheduler(&self) -> &Scheduler {
        &self.scheduler
    }

    pub fn signal_state(&self) -> &SignalState {
        &self.signal_state
    }

    /// Time left until the upcoming slot takes over, just past its due instant.
    fn until_next_slot(&self) -> Option<Duration> {
        let due = self.scheduler.next_slot_due()?;
        let due_at = self.scheduler.config().zone.to_instant(due);
        let remaining = (due_at - self.clock.now()).to_std().unwrap_or_default();
        // Promotion needs the wall clock strictly past the due instant
        Some(remaining + PROMOTION_MARGIN)
    }

    fn process_pending_signals(&mut self) {
        while let Ok(message) = self.signal_state.signal_receiver.try_recv() {
            handle_signal_message(message, &self.signal_state, self.debug_enabled);
        }
    }

    fn reload_if_needed(&mut self) {
        let forced = self.signal_state.take_reload();

        let marker = match self.scheduler.store_marker() {
            Ok(marker) => marker,
            Err(e) => {
                if forced || self.debug_enabled {
                    log_pipe!();
                    log_warning!("Cannot check schedule store: {e}");
                }
                return;
            }
        };

        let changed = marker != self.scheduler.last_reload_marker();
        if !forced && (!changed || self.failed_marker == Some(marker)) {
            return;
        }

        match self.scheduler.reload() {
            Ok(_) => self.failed_marker = None,
            Err(e) => {
                log_pipe!();
                log_error!("Failed to reload schedule: {e:#}");
                log_indented!("Keeping the previous schedule until the store changes again");
                self.failed_marker = Some(marker);
            }
        }
    }

    fn render_if_needed(&mut self) {
        if self.signal_state.take_redraw() {
            self.scheduler.request_refresh();
        }
        if !(self.first_iteration || self.scheduler.refresh_needed()) {
            return;
        }
        self.first_iteration = false;

        let content = DisplayContent::resolve(&self.scheduler.snapshot());
        if let Err(e) = self.renderer.show(&content) {
            log_pipe!();
            log_error!("{} renderer failed: {e:#}", self.renderer.name());
            log_indented!("Will retry on next refresh");
        }
        self.scheduler.clear_refresh_needed();
    }

    /// Sleep for `duration`, waking early for signal messages in real time.
    fn wait(&mut self, duration: Duration) {
        if self.clock.is_simulated() {
            // The simulated clock scales the sleep; messages wait for the next pass
            self.clock.sleep(duration);
            return;
        }

        match self.signal_state.signal_receiver.recv_timeout(duration) {
            Ok(message) => handle_signal_message(message, &self.signal_state, self.debug_enabled),
            Err(RecvTimeoutError::Timeout) => {}
            Err(RecvTimeoutError::Disconnected) => {
                // Both ends live in SignalState, so this only happens on teardown
                self.clock.sleep(duration);
            }
        }
    }
}

#[cfg(test)]
mod tests;
