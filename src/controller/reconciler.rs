use super::guard::ReconfigureTicket;
use crate::config::DisplayMode;
use crate::modules::logging::{log_debug, log_error, log_warn};
use crate::renderer::{LayoutPolicy, RenderSurface};
use crate::state::{Display, DisplayId, DisplaySet, Rect, WindowHandle, WindowId};

/// The display a single bar stuck to. Platform ids change when a monitor is
/// re-plugged, so the connector name is matched first.
#[derive(Debug, Clone, PartialEq, Eq)]
struct StickyDisplay {
    id: DisplayId,
    name: Option<String>,
}

impl StickyDisplay {
    fn of(display: &Display) -> Self {
        Self {
            id: display.id,
            name: display.name.clone(),
        }
    }

    fn find<'a>(&self, displays: &'a DisplaySet) -> Option<&'a Display> {
        match &self.name {
            Some(name) => displays.by_name(name),
            None => displays.get(self.id),
        }
    }
}

/// Maps the connected displays to live bar windows.
///
/// Every rebuild retires all windows before creating new ones and bumps the
/// arena epoch, so no handle outlives the topology it was created for.
pub struct Reconciler {
    mode: DisplayMode,
    windows: Vec<WindowHandle>,
    epoch: u64,
    next_id: u64,
    initial: Option<StickyDisplay>,
}

impl Reconciler {
    pub fn new(mode: DisplayMode) -> Self {
        Self {
            mode,
            windows: Vec::new(),
            epoch: 0,
            next_id: 1,
            initial: None,
        }
    }

    pub fn windows(&self) -> &[WindowHandle] {
        &self.windows
    }

    pub fn epoch(&self) -> u64 {
        self.epoch
    }

    /// The display the bar stuck to in single-display mode.
    pub fn initial_display(&self) -> Option<DisplayId> {
        self.initial.as_ref().map(|sticky| sticky.id)
    }

    /// Retires every window. Used on rebuild and on shutdown.
    pub fn retire_all(&mut self, surface: &mut impl RenderSurface) {
        for handle in self.windows.drain(..) {
            log_debug(
                "CTRL",
                &format!("Retiring {} (epoch {})", handle.id, handle.epoch),
            );
            surface.retire(handle.id);
        }
    }

    /// Replaces all windows with fresh ones for `displays`. The ticket proves
    /// the caller holds the reconfiguration guard.
    pub fn rebuild(
        &mut self,
        _ticket: &ReconfigureTicket,
        surface: &mut impl RenderSurface,
        displays: &DisplaySet,
        layout: &LayoutPolicy,
        height: u32,
    ) {
        self.retire_all(surface);
        self.epoch += 1;

        let selected = self.select(displays);
        if selected.is_empty() {
            log_warn("CTRL", "No displays connected, running without windows");
            return;
        }

        for display in selected {
            let handle = WindowHandle {
                id: WindowId(self.next_id),
                display: display.id,
                frame: Rect::new(display.frame.x, display.frame.y, display.frame.width, height),
                epoch: self.epoch,
            };
            self.next_id += 1;

            match surface.create_window(&handle, display, layout) {
                Ok(()) => {
                    log_debug(
                        "CTRL",
                        &format!(
                            "Created {} on {} at {:?}",
                            handle.id,
                            display.name.as_deref().unwrap_or("unnamed output"),
                            handle.frame
                        ),
                    );
                    self.windows.push(handle);
                }
                Err(e) => log_error(
                    "CTRL",
                    &format!("Failed to create window on display {:?}: {:#}", display.id, e),
                ),
            }
        }
    }

    fn select<'a>(&mut self, displays: &'a DisplaySet) -> Vec<&'a Display> {
        match &self.mode {
            DisplayMode::All => displays.displays.iter().collect(),
            DisplayMode::Named(name) => match displays.by_name(name) {
                Some(display) => vec![display],
                None => {
                    log_warn(
                        "CTRL",
                        &format!("Output {:?} not connected, using the primary display", name),
                    );
                    displays.primary().into_iter().collect()
                }
            },
            DisplayMode::Sticky => self.sticky(displays).into_iter().collect(),
        }
    }

    fn sticky<'a>(&mut self, displays: &'a DisplaySet) -> Option<&'a Display> {
        if let Some(sticky) = self.initial.as_mut()
            && let Some(display) = sticky.find(displays)
        {
            sticky.id = display.id;
            return Some(display);
        }
        let primary = displays.primary()?;
        if self.initial.is_none() {
            self.initial = Some(StickyDisplay::of(primary));
        }
        Some(primary)
    }
}
