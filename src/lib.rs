pub mod config;
pub mod controller;
pub mod event;
pub mod renderer;
pub mod sources;
pub mod state;

pub mod modules;
pub mod wayland;

pub mod prelude {
    pub use crate::config::BarConfig;
    pub use crate::controller::Controller;
    pub use crate::event::BarEvent;
    pub use crate::renderer::{Backend, DisplaySource, RenderSurface};
    pub use crate::state::{Display, DisplaySet, Slot, WindowHandle, WindowId};
}
