mod layout;
mod types;

pub use layout::LayoutPolicy;
pub use types::{Align, LabelFrame};

use crate::event::BarEvent;
use crate::state::{Display, DisplaySet, Slot, WindowHandle, WindowId};
use anyhow::Result;
use std::future::Future;

/// Draws bar windows. The controller decides what text goes where; the
/// surface owns pixels, fonts and compositor objects.
///
/// Writes and retires addressed to an id the surface does not know (already
/// retired, or never created) must be silent no-ops.
pub trait RenderSurface {
    /// Map a new window for `handle` on `display`.
    fn create_window(
        &mut self,
        handle: &WindowHandle,
        display: &Display,
        layout: &LayoutPolicy,
    ) -> Result<()>;

    fn write(&mut self, id: WindowId, slot: Slot, text: &str);

    /// Hide the window immediately and release it.
    fn retire(&mut self, id: WindowId);

    /// Push pending label changes to the screen.
    fn present(&mut self) {}
}

/// Source of the connected display topology.
pub trait DisplaySource {
    /// Fresh snapshot; callers must not hold on to it across rebuilds.
    fn displays(&self) -> DisplaySet;
}

/// A platform the controller can run on: it renders, reports displays and
/// surfaces its own platform events (display hotplug) to the controller.
pub trait Backend: RenderSurface + DisplaySource {
    /// Wait for the next batch of platform events. Must be cancel safe: the
    /// controller drops this future whenever another event source wins.
    fn pump(&mut self) -> impl Future<Output = Result<Vec<BarEvent>>>;
}
