pub mod handlers;
pub mod paint;
pub mod text;

use crate::config::BarConfig;
use crate::event::BarEvent;
use crate::modules::logging::{log_debug, log_error, log_info};
use crate::renderer::{Backend, DisplaySource, LabelFrame, LayoutPolicy, RenderSurface};
use crate::state::{Display, DisplayId, DisplaySet, Rect, Slot, WindowHandle, WindowId};
use anyhow::{Context, Result, anyhow};
use paint::PaintStyle;
use smithay_client_toolkit::{
    compositor::CompositorState,
    output::OutputState,
    reexports::client::{
        Connection, EventQueue, QueueHandle, backend::WaylandError,
        globals::registry_queue_init, protocol::wl_shm,
    },
    registry::RegistryState,
    shell::{
        WaylandSurface,
        wlr_layer::{Anchor, Layer, LayerShell, LayerSurface},
    },
    shm::{Shm, slot::SlotPool},
};
use std::collections::{BTreeMap, HashMap};
use std::os::fd::{AsFd, OwnedFd};
use text::TextRenderer;
use tokio::io::unix::AsyncFd;

const NAMESPACE: &str = "ybar";

/// One layer surface showing one bar.
pub struct Bar {
    pub layer: LayerSurface,
    pool: SlotPool,
    layout: LayoutPolicy,
    frames: Vec<LabelFrame>,
    labels: BTreeMap<Slot, String>,
    pub width: u32,
    pub height: u32,
    pub configured: bool,
    pub dirty: bool,
}

impl Bar {
    /// Applies the size the compositor settled on and re-runs the layout.
    pub fn resize(&mut self, width: u32, height: u32) {
        if width != 0 {
            self.width = width;
        }
        if height != 0 {
            self.height = height;
        }
        self.frames = self.layout.place(self.width, self.height);
        self.configured = true;
        self.dirty = true;
    }

    fn draw(&mut self, text: &mut TextRenderer, style: &PaintStyle) -> Result<()> {
        let (width, height) = (self.width, self.height);
        if width == 0 || height == 0 {
            return Ok(());
        }
        let stride = width as i32 * 4;

        let (buffer, canvas) = self
            .pool
            .create_buffer(
                width as i32,
                height as i32,
                stride,
                wl_shm::Format::Argb8888,
            )
            .context("Failed to create buffer")?;

        paint::fill_background(canvas, style.background, style.opacity);
        for frame in &self.frames {
            if let Some(label) = self.labels.get(&frame.slot) {
                paint::draw_label(canvas, width, height, frame, label, text, style.text);
            }
        }

        let surface = self.layer.wl_surface();
        buffer
            .attach_to(surface)
            .context("Failed to attach buffer")?;
        surface.damage_buffer(0, 0, width as i32, height as i32);
        surface.commit();

        self.dirty = false;
        Ok(())
    }
}

pub struct WaylandState {
    pub registry_state: RegistryState,
    pub output_state: OutputState,
    pub compositor_state: CompositorState,
    pub shm: Shm,
    pub layer_shell: LayerShell,

    pub bars: HashMap<WindowId, Bar>,
    pub text: TextRenderer,
    pub style: PaintStyle,
    pub pending: PendingWakeup,
}

impl WaylandState {
    pub fn bar_for_layer(&mut self, layer: &LayerSurface) -> Option<(WindowId, &mut Bar)> {
        self.bars
            .iter_mut()
            .find(|(_, bar)| bar.layer.wl_surface() == layer.wl_surface())
            .map(|(id, bar)| (*id, bar))
    }
}

/// What dispatching left for the controller: platform events, and whether a
/// configure left a bar waiting for its first frame.
#[derive(Debug, Default)]
pub struct PendingWakeup {
    events: Vec<BarEvent>,
    needs_present: bool,
}

impl PendingWakeup {
    pub fn push(&mut self, event: BarEvent) {
        self.events.push(event);
    }

    pub fn request_present(&mut self) {
        self.needs_present = true;
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }

    /// Hands out the collected events once there is anything for the
    /// controller to do. An empty batch still makes it present.
    pub fn take(&mut self) -> Option<Vec<BarEvent>> {
        if self.events.is_empty() && !self.needs_present {
            return None;
        }
        self.needs_present = false;
        Some(std::mem::take(&mut self.events))
    }
}

/// Render surface and display source backed by `wlr-layer-shell`.
pub struct WaylandBackend {
    conn: Connection,
    event_queue: EventQueue<WaylandState>,
    qh: QueueHandle<WaylandState>,
    state: WaylandState,
    fd: AsyncFd<OwnedFd>,
}

impl WaylandBackend {
    pub fn connect(config: &BarConfig) -> Result<Self> {
        let conn = Connection::connect_to_env().context("Failed to connect to Wayland")?;

        let (globals, mut event_queue) =
            registry_queue_init::<WaylandState>(&conn).context("Failed to init registry queue")?;
        let qh = event_queue.handle();

        let registry_state = RegistryState::new(&globals);
        let compositor_state =
            CompositorState::bind(&globals, &qh).context("Failed to bind compositor")?;
        let layer_shell = LayerShell::bind(&globals, &qh).context("Failed to bind layer shell")?;
        let shm = Shm::bind(&globals, &qh).context("Failed to bind shm")?;
        let output_state = OutputState::new(&globals, &qh);

        let mut state = WaylandState {
            registry_state,
            output_state,
            compositor_state,
            shm,
            layer_shell,
            bars: HashMap::new(),
            text: TextRenderer::new(&config.style.font, config.style.font_size),
            style: PaintStyle::from_config(config),
            pending: PendingWakeup::default(),
        };

        // wl_output and xdg-output details arrive over two roundtrips.
        for _ in 0..2 {
            event_queue
                .roundtrip(&mut state)
                .context("Failed initial roundtrip")?;
        }
        // The controller's first build covers the outputs seen so far.
        state.pending.clear();

        let fd = conn
            .as_fd()
            .try_clone_to_owned()
            .context("Failed to duplicate Wayland socket")?;
        let fd = AsyncFd::new(fd).context("Failed to register Wayland socket")?;

        log_info(
            "WAYLAND",
            &format!(
                "Connected, {} output(s) advertised",
                state.output_state.outputs().count()
            ),
        );

        Ok(Self {
            conn,
            event_queue,
            qh,
            state,
            fd,
        })
    }

    fn flush(&self) {
        if let Err(e) = self.conn.flush() {
            log_error("WAYLAND", &format!("Flush failed: {}", e));
        }
    }
}

impl RenderSurface for WaylandBackend {
    fn create_window(
        &mut self,
        handle: &WindowHandle,
        display: &Display,
        layout: &LayoutPolicy,
    ) -> Result<()> {
        let output = self
            .state
            .output_state
            .outputs()
            .find(|o| {
                self.state
                    .output_state
                    .info(o)
                    .is_some_and(|info| info.id == display.id.0)
            })
            .ok_or_else(|| anyhow!("output {:?} is gone", display.id))?;

        let height = handle.frame.height;
        let pool = SlotPool::new(
            (handle.frame.width.max(1) * height.max(1) * 4) as usize,
            &self.state.shm,
        )
        .context("Failed to create Shm pool")?;

        let surface = self.state.compositor_state.create_surface(&self.qh);
        let layer = self.state.layer_shell.create_layer_surface(
            &self.qh,
            surface,
            Layer::Top,
            Some(NAMESPACE),
            Some(&output),
        );
        layer.set_anchor(Anchor::TOP | Anchor::LEFT | Anchor::RIGHT);
        layer.set_size(0, height);
        layer.set_exclusive_zone(height as i32);
        layer.commit();

        self.state.bars.insert(
            handle.id,
            Bar {
                layer,
                pool,
                layout: layout.clone(),
                frames: layout.place(handle.frame.width, height),
                labels: BTreeMap::new(),
                width: handle.frame.width,
                height,
                configured: false,
                dirty: true,
            },
        );
        Ok(())
    }

    fn write(&mut self, id: WindowId, slot: Slot, text: &str) {
        let Some(bar) = self.state.bars.get_mut(&id) else {
            return;
        };
        if bar.labels.get(&slot).map(String::as_str) != Some(text) {
            bar.labels.insert(slot, text.to_string());
            bar.dirty = true;
        }
    }

    fn retire(&mut self, id: WindowId) {
        // Dropping the layer surface destroys it on the compositor side.
        if self.state.bars.remove(&id).is_some() {
            log_debug("WAYLAND", &format!("Destroyed surface for {}", id));
            self.flush();
        }
    }

    fn present(&mut self) {
        let state = &mut self.state;
        for (id, bar) in state.bars.iter_mut() {
            if !(bar.configured && bar.dirty) {
                continue;
            }
            if let Err(e) = bar.draw(&mut state.text, &state.style) {
                log_error("WAYLAND", &format!("Failed to draw {}: {:#}", id, e));
            }
        }
        self.flush();
    }
}

impl DisplaySource for WaylandBackend {
    fn displays(&self) -> DisplaySet {
        let outputs = &self.state.output_state;
        let displays = outputs
            .outputs()
            .filter_map(|output| {
                let info = outputs.info(&output)?;
                let (x, y) = info.logical_position.unwrap_or(info.location);
                let (width, height) = info
                    .logical_size
                    .or_else(|| info.modes.iter().find(|m| m.current).map(|m| m.dimensions))?;
                Some(Display {
                    id: DisplayId(info.id),
                    name: info.name.clone(),
                    frame: Rect::new(x, y, width.max(0) as u32, height.max(0) as u32),
                })
            })
            .collect();
        DisplaySet::new(displays)
    }
}

impl Backend for WaylandBackend {
    async fn pump(&mut self) -> Result<Vec<BarEvent>> {
        loop {
            self.event_queue
                .dispatch_pending(&mut self.state)
                .context("Wayland dispatch failed")?;
            if let Some(batch) = self.state.pending.take() {
                return Ok(batch);
            }

            self.event_queue.flush().context("Wayland flush failed")?;
            let Some(read) = self.event_queue.prepare_read() else {
                continue;
            };

            let mut ready = self
                .fd
                .readable()
                .await
                .context("Wayland socket poll failed")?;
            match read.read() {
                Ok(_) => {}
                Err(WaylandError::Io(e)) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    ready.clear_ready();
                }
                Err(e) => return Err(e).context("Failed to read Wayland events"),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nothing_pending_keeps_pumping() {
        let mut pending = PendingWakeup::default();
        assert_eq!(pending.take(), None);
    }

    #[test]
    fn test_configure_wakes_with_empty_batch() {
        let mut pending = PendingWakeup::default();
        pending.request_present();
        assert_eq!(pending.take(), Some(Vec::new()));
        assert_eq!(pending.take(), None);
    }

    #[test]
    fn test_events_handed_out_once() {
        let mut pending = PendingWakeup::default();
        pending.push(BarEvent::DisplaysChanged);
        pending.request_present();
        assert_eq!(pending.take(), Some(vec![BarEvent::DisplaysChanged]));
        assert_eq!(pending.take(), None);

        pending.push(BarEvent::DisplaysChanged);
        pending.clear();
        assert_eq!(pending.take(), None);
    }
}
