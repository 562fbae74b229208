use crate::event::BarEvent;
use crate::renderer::{Backend, DisplaySource, LayoutPolicy, RenderSurface};
use crate::sources::{BatteryStatus, PowerSource};
use crate::state::{Display, DisplayId, DisplaySet, Rect, Slot, WindowHandle, WindowId};
use anyhow::{Result, bail};
use std::collections::{BTreeMap, HashSet, VecDeque};
use std::path::Path;
use std::time::Duration;

pub fn display(id: u32, name: &str, x: i32, y: i32, width: u32) -> Display {
    Display {
        id: DisplayId(id),
        name: Some(name.to_string()),
        frame: Rect::new(x, y, width, 1080),
    }
}

/// In-memory render surface. Records every call and counts writes that hit
/// a retired or unknown window.
#[derive(Default)]
pub struct FakeBackend {
    pub displays: DisplaySet,
    pub fail_on: HashSet<DisplayId>,
    pub created: Vec<WindowHandle>,
    pub retired: Vec<WindowId>,
    pub labels: BTreeMap<WindowId, BTreeMap<Slot, String>>,
    pub writes: Vec<(WindowId, Slot, String)>,
    pub stray_writes: usize,
    pub presents: usize,
    /// Batches `pump` hands out, oldest first. Pumping stays pending once
    /// this is empty.
    pub batches: VecDeque<Vec<BarEvent>>,
}

impl FakeBackend {
    pub fn with_displays(displays: Vec<Display>) -> Self {
        Self {
            displays: DisplaySet::new(displays),
            ..Default::default()
        }
    }

    pub fn live_count(&self) -> usize {
        self.labels.len()
    }

    pub fn label(&self, id: WindowId, slot: Slot) -> Option<&str> {
        self.labels.get(&id)?.get(&slot).map(String::as_str)
    }

    pub fn writes_to(&self, slot: Slot) -> usize {
        self.writes.iter().filter(|(_, s, _)| *s == slot).count()
    }
}

impl RenderSurface for FakeBackend {
    fn create_window(
        &mut self,
        handle: &WindowHandle,
        display: &Display,
        _layout: &LayoutPolicy,
    ) -> Result<()> {
        if self.fail_on.contains(&display.id) {
            bail!("refusing to map a surface on {:?}", display.id);
        }
        self.created.push(handle.clone());
        self.labels.insert(handle.id, BTreeMap::new());
        Ok(())
    }

    fn write(&mut self, id: WindowId, slot: Slot, text: &str) {
        match self.labels.get_mut(&id) {
            Some(labels) => {
                labels.insert(slot, text.to_string());
                self.writes.push((id, slot, text.to_string()));
            }
            None => self.stray_writes += 1,
        }
    }

    fn retire(&mut self, id: WindowId) {
        if self.labels.remove(&id).is_some() {
            self.retired.push(id);
        }
    }

    fn present(&mut self) {
        self.presents += 1;
    }
}

impl DisplaySource for FakeBackend {
    fn displays(&self) -> DisplaySet {
        self.displays.clone()
    }
}

impl Backend for FakeBackend {
    async fn pump(&mut self) -> Result<Vec<BarEvent>> {
        match self.batches.pop_front() {
            Some(batch) => Ok(batch),
            None => std::future::pending().await,
        }
    }
}

pub struct FakePower(pub Option<BatteryStatus>);

impl PowerSource for FakePower {
    fn read(&self) -> Option<BatteryStatus> {
        self.0
    }
}

/// Shell script that forks `sleep 30` into the background, records its pid in
/// `pid_file` and waits. Killing only the shell would orphan the sleep.
pub fn forking_script(pid_file: &Path) -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        format!("sleep 30 & echo $! > '{}'; wait", pid_file.display()),
    ]
}

pub async fn read_pid(pid_file: &Path) -> i32 {
    for _ in 0..250 {
        if let Some(pid) = std::fs::read_to_string(pid_file)
            .ok()
            .and_then(|s| s.trim().parse().ok())
        {
            return pid;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("no pid written to {}", pid_file.display());
}

/// Whether `pid` is a running process. Zombies count as gone: nothing may
/// reap orphans inside a test container.
pub fn process_alive(pid: i32) -> bool {
    let Ok(stat) = std::fs::read_to_string(format!("/proc/{}/stat", pid)) else {
        return false;
    };
    let state = stat
        .rsplit_once(')')
        .and_then(|(_, rest)| rest.trim_start().chars().next());
    !matches!(state, Some('Z') | Some('X') | None)
}

pub async fn wait_for_exit(pid: i32) -> bool {
    for _ in 0..250 {
        if !process_alive(pid) {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}
