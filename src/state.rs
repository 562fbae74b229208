use std::fmt;

/// Named text slots every bar window carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Slot {
    Clock,
    Date,
    Workspace,
    Battery,
}

impl Slot {
    pub fn as_str(self) -> &'static str {
        match self {
            Slot::Clock => "clock",
            Slot::Date => "date",
            Slot::Workspace => "workspace",
            Slot::Battery => "battery",
        }
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WindowId(pub u64);

impl fmt::Display for WindowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "win#{}", self.0)
    }
}

/// Platform identity of a display. On Wayland this is the `wl_output`
/// global name, which stays stable while the output is connected but is
/// reissued when the monitor is plugged in again.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DisplayId(pub u32);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Rect {
    pub x: i32,
    pub y: i32,
    pub width: u32,
    pub height: u32,
}

impl Rect {
    pub fn new(x: i32, y: i32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Display {
    pub id: DisplayId,
    pub name: Option<String>,
    pub frame: Rect,
}

/// Snapshot of the connected displays, in platform order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DisplaySet {
    pub displays: Vec<Display>,
    pub primary: Option<DisplayId>,
}

impl DisplaySet {
    pub fn new(displays: Vec<Display>) -> Self {
        let primary = displays.first().map(|d| d.id);
        Self { displays, primary }
    }

    pub fn get(&self, id: DisplayId) -> Option<&Display> {
        self.displays.iter().find(|d| d.id == id)
    }

    pub fn by_name(&self, name: &str) -> Option<&Display> {
        self.displays
            .iter()
            .find(|d| d.name.as_deref() == Some(name))
    }

    pub fn primary(&self) -> Option<&Display> {
        self.primary
            .and_then(|id| self.get(id))
            .or_else(|| self.displays.first())
    }

    pub fn is_empty(&self) -> bool {
        self.displays.is_empty()
    }

    pub fn len(&self) -> usize {
        self.displays.len()
    }
}

/// A live bar window. Only the reconciler creates these, and a handle never
/// survives the rebuild that retires it: its `epoch` is the arena generation
/// it was created in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowHandle {
    pub id: WindowId,
    pub display: DisplayId,
    pub frame: Rect,
    pub epoch: u64,
}
