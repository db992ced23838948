//! Signal handling for the driving loop.
//!
//! Unix signals and the store watcher both feed one channel of [`SignalMessage`]s.
//! The driving loop drains it at the top of every iteration and also blocks on it
//! while sleeping, so a signal cuts a real-time sleep short.

use anyhow::{Context, Result};
use signal_hook::{
    consts::signal::{SIGHUP, SIGINT, SIGTERM, SIGUSR1, SIGUSR2},
    iterator::Signals,
};
use std::{
    sync::Arc,
    sync::atomic::{AtomicBool, Ordering},
    sync::mpsc::{Receiver, Sender},
    thread,
};

/// Unified message type for everything that can interrupt the driving loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignalMessage {
    /// Re-fetch the store now (SIGUSR2, or the store watcher)
    Reload,
    /// Redraw the current content even if nothing changed (SIGUSR1)
    Redraw,
    /// Stop the driving loop (SIGTERM, SIGINT, SIGHUP)
    Shutdown,
}

/// Signal handling state shared between threads
pub struct SignalState {
    /// Cleared when the driving loop should exit
    pub running: Arc<AtomicBool>,
    pub signal_receiver: Receiver<SignalMessage>,
    /// Cloned by the store watcher
    pub signal_sender: Sender<SignalMessage>,
    /// Set by a reload request, consumed by the driving loop
    pub needs_reload: Arc<AtomicBool>,
    /// Set by a redraw request, consumed by the driving loop
    pub needs_redraw: Arc<AtomicBool>,
}

impl SignalState {
    /// State with no OS handlers attached; messages arrive only through `signal_sender`.
    pub fn detached() -> Self {
        let (signal_sender, signal_receiver) = std::sync::mpsc::channel();
        Self {
            running: Arc::new(AtomicBool::new(true)),
            signal_receiver,
            signal_sender,
            needs_reload: Arc::new(AtomicBool::new(false)),
            needs_redraw: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// Consume a pending reload request.
    pub fn take_reload(&self) -> bool {
        self.needs_reload.swap(false, Ordering::SeqCst)
    }

    /// Consume a pending redraw request.
    pub fn take_redraw(&self) -> bool {
        self.needs_redraw.swap(false, Ordering::SeqCst)
    }
}

/// Handle a signal message received in the driving loop
pub fn handle_signal_message(signal_msg: SignalMessage, signal_state: &SignalState, debug_enabled: bool) {
    match signal_msg {
        SignalMessage::Reload => {
            if debug_enabled {
                log_pipe!();
                log_debug!("Reload requested");
            }
            signal_state.needs_reload.store(true, Ordering::SeqCst);
        }
        SignalMessage::Redraw => {
            if debug_enabled {
                log_pipe!();
                log_debug!("Redraw requested");
            }
            signal_state.needs_redraw.store(true, Ordering::SeqCst);
        }
        SignalMessage::Shutdown => {
            signal_state.running.store(false, Ordering::SeqCst);
        }
    }
}

/// Set up signal handling for the application.
///
/// Spawns a background thread that turns Unix signals into [`SignalMessage`]s.
pub fn setup_signal_handler(debug_enabled: bool) -> Result<SignalState> {
    let state = SignalState::detached();

    let mut signals = Signals::new([SIGINT, SIGTERM, SIGHUP, SIGUSR1, SIGUSR2])
        .context("failed to register signal handlers")?;

    let running = state.running.clone();
    let sender = state.signal_sender.clone();

    thread::spawn(move || {
        for sig in signals.forever() {
            let message = match sig {
                SIGUSR2 => {
                    log_pipe!();
                    log_info!("Received schedule reload signal");
                    SignalMessage::Reload
                }
                SIGUSR1 => {
                    log_pipe!();
                    log_info!("Received redraw signal");
                    SignalMessage::Redraw
                }
                SIGINT => {
                    log_pipe!();
                    if debug_enabled {
                        log_info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                    } else {
                        log_info!("Received interrupt signal, initiating graceful shutdown...");
                    }
                    SignalMessage::Shutdown
                }
                SIGTERM => {
                    log_pipe!();
                    log_info!("Received termination request, initiating graceful shutdown...");
                    SignalMessage::Shutdown
                }
                // SIGHUP: the terminal is gone, so stay quiet
                _ => SignalMessage::Shutdown,
            };

            let is_shutdown = message == SignalMessage::Shutdown;
            if is_shutdown {
                // Set before sending so a loop between iterations still sees it
                running.store(false, Ordering::SeqCst);
            }

            if sender.send(message).is_err() {
                // Driving loop has gone away
                running.store(false, Ordering::SeqCst);
                break;
            }
            if is_shutdown {
                break;
            }
        }
    });

    Ok(state)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_set_flags() {
        let state = SignalState::detached();

        handle_signal_message(SignalMessage::Reload, &state, false);
        handle_signal_message(SignalMessage::Redraw, &state, false);
        assert!(state.take_reload());
        assert!(!state.take_reload());
        assert!(state.take_redraw());
        assert!(state.is_running());

        handle_signal_message(SignalMessage::Shutdown, &state, false);
        assert!(!state.is_running());
    }

    #[test]
    fn test_detached_channel_delivers_messages() {
        let state = SignalState::detached();
        state.signal_sender.send(SignalMessage::Reload).unwrap();
        assert_eq!(state.signal_receiver.try_recv().unwrap(), SignalMessage::Reload);
    }
}
