//! Application coordinator that manages the complete lifecycle of kenban.
//!
//! Handles resource acquisition (configuration, instance lock, signal handlers,
//! store watcher) and then hands over to the driving loop in [`crate::core`].
//!
//! The `Kenban` struct uses a builder pattern to support different startup contexts:
//! - Normal startup: `Kenban::new(debug_enabled).run()`
//! - Simulation mode: `Kenban::new(debug_enabled).without_lock().with_clock(clock).run()`

use anyhow::{Context, Result};
use std::sync::Arc;

use crate::{
    common::utils::private_path,
    config::{self, Config},
    core::{Core, CoreParams},
    io::{lock, signals::setup_signal_handler},
    logger::Log,
    render::{LogRenderer, Renderer},
    schedule::{JsonFileStore, watcher::start_store_watcher},
    scheduler::Scheduler,
    time::source::{RealTimeSource, TimeSource},
};

/// Builder for configuring and running the kenban agent.
///
/// ```no_run
/// use kenban::Kenban;
///
/// # fn main() -> anyhow::Result<()> {
/// Kenban::new(false).run()?;
/// # Ok(())
/// # }
/// ```
pub struct Kenban {
    debug_enabled: bool,
    create_lock: bool,
    show_headers: bool,
    clock: Option<Arc<dyn TimeSource>>,
    renderer: Option<Box<dyn Renderer>>,
}

impl Kenban {
    /// Create a new runner with defaults matching a normal run
    pub fn new(debug_enabled: bool) -> Self {
        Self {
            debug_enabled,
            create_lock: true,
            show_headers: true,
            clock: None,
            renderer: None,
        }
    }

    /// Skip lock file creation (simulations run next to nothing else)
    pub fn without_lock(mut self) -> Self {
        self.create_lock = false;
        self
    }

    /// Skip the version header (the caller already printed one)
    pub fn without_headers(mut self) -> Self {
        self.show_headers = false;
        self
    }

    /// Drive the loop from `clock` instead of the system clock
    pub fn with_clock(mut self, clock: Arc<dyn TimeSource>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Draw through `renderer` instead of the log renderer
    pub fn with_renderer(mut self, renderer: Box<dyn Renderer>) -> Self {
        self.renderer = Some(renderer);
        self
    }

    /// Execute the application with the configured settings.
    ///
    /// Returns once the driving loop stops (shutdown signal, or the end of a
    /// simulation). The instance lock is released on return.
    pub fn run(self) -> Result<()> {
        if self.show_headers {
            log_version!();
        }

        let config = Config::load().context("Configuration failed")?;

        if let Some(custom_dir) = config::get_custom_config_dir() {
            log_block_start!("Base directory: {}", private_path(&custom_dir));
        }

        // Held until the loop returns
        let _lock = if self.create_lock {
            let lock = lock::acquire_lock()?;
            if self.debug_enabled {
                log_pipe!();
                log_debug!("Lock acquired at {}", private_path(lock.path()));
            }
            Some(lock)
        } else {
            None
        };

        let signal_state = setup_signal_handler(self.debug_enabled)?;

        config.log_config();

        let store_path = config.store_path()?;
        if config.watch_store()
            && let Err(e) = start_store_watcher(
                signal_state.signal_sender.clone(),
                &store_path,
                self.debug_enabled,
            )
        {
            log_pipe!();
            log_warning!("Store watching unavailable: {e:#}");
            log_indented!("Changes will be picked up by polling the store instead");
        }

        let scheduler_config = config.scheduler_config(self.debug_enabled)?;
        let clock: Arc<dyn TimeSource> = match self.clock {
            Some(clock) => {
                Log::set_simulated_clock(clock.clone(), scheduler_config.zone);
                clock
            }
            None => Arc::new(RealTimeSource),
        };

        let store = JsonFileStore::new(&store_path);
        let scheduler = Scheduler::new(Box::new(store), clock.clone(), scheduler_config)?;

        log_block_start!(
            "Loaded {} slots and {} events",
            scheduler.slots().len(),
            scheduler.events().len()
        );

        let renderer = self
            .renderer
            .unwrap_or_else(|| Box::new(LogRenderer::new(self.debug_enabled)));

        let core = Core::new(CoreParams {
            scheduler,
            renderer,
            clock,
            signal_state,
            tick_interval: config.tick_interval(),
            empty_schedule_delay: config.empty_schedule_delay(),
            debug_enabled: self.debug_enabled,
        });
        core.execute()?;

        log_block_start!("Shutting down kenban...");
        log_end!();
        Ok(())
    }
}
