//! What goes on screen, and the seam to whatever draws it.
//!
//! [`DisplayContent`] is resolved from a [`ScheduleSnapshot`] so renderers never
//! have to look at the engine directly. Drawing itself (templates, images, a
//! browser) lives behind the [`Renderer`] trait.

use anyhow::Result;
use serde::Serialize;

use crate::schedule::Event;
use crate::scheduler::ScheduleSnapshot;

/// Content for one redraw.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DisplayContent {
    /// No slot is current
    Loading,
    Slot(SlotContent),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SlotContent {
    pub slot_id: String,
    pub template_id: String,
    pub foreground_image_id: Option<String>,
    /// Empty when neither the slot nor an overriding event has text
    pub display_text: String,
    pub time_format: Option<String>,
    /// Every active event, in list order
    pub events: Vec<Event>,
    /// Id of the event whose image and text replaced the slot's
    pub overridden_by: Option<String>,
}

impl DisplayContent {
    /// Resolve what to draw for `snapshot`.
    ///
    /// An overriding primary event replaces the slot's image and text; the slot's
    /// template stays.
    pub fn resolve(snapshot: &ScheduleSnapshot) -> Self {
        let Some(slot) = snapshot.current_slot.as_deref() else {
            return DisplayContent::Loading;
        };

        let mut content = SlotContent {
            slot_id: slot.id.clone(),
            template_id: slot.template_id.clone(),
            foreground_image_id: slot.foreground_image_id.clone(),
            display_text: slot.display_text.clone().unwrap_or_default(),
            time_format: slot.time_format.clone(),
            events: snapshot.active_events.clone(),
            overridden_by: None,
        };

        if let Some(event) = snapshot.primary_event()
            && event.override_slot
        {
            content.foreground_image_id = event.foreground_image_id.clone();
            content.display_text = event.display_text.clone().unwrap_or_default();
            content.overridden_by = Some(event.id.clone());
        }

        DisplayContent::Slot(content)
    }

    pub fn is_loading(&self) -> bool {
        matches!(self, DisplayContent::Loading)
    }
}

/// Something that can put [`DisplayContent`] on a screen.
pub trait Renderer: Send {
    fn show(&mut self, content: &DisplayContent) -> Result<()>;

    fn name(&self) -> &'static str;
}

/// Renderer that reports each redraw through the logger.
#[derive(Debug, Default)]
pub struct LogRenderer {
    debug_enabled: bool,
}

impl LogRenderer {
    pub fn new(debug_enabled: bool) -> Self {
        Self { debug_enabled }
    }
}

impl Renderer for LogRenderer {
    fn show(&mut self, content: &DisplayContent) -> Result<()> {
        match content {
            DisplayContent::Loading => {
                log_block_start!("Showing loading screen");
            }
            DisplayContent::Slot(slot) => {
                log_block_start!("Showing slot {} (template {})", slot.slot_id, slot.template_id);
                if !slot.display_text.is_empty() {
                    log_indented!("Text: {}", slot.display_text);
                }
                if let Some(image) = &slot.foreground_image_id {
                    log_indented!("Image: {}", image);
                }
                if let Some(event_id) = &slot.overridden_by {
                    log_indented!("Overridden by event {}", event_id);
                }
                if self.debug_enabled && !slot.events.is_empty() {
                    let ids: Vec<&str> = slot.events.iter().map(|e| e.id.as_str()).collect();
                    log_debug!("Active events: {}", ids.join(", "));
                }
            }
        }
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}
