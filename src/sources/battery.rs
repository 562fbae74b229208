use std::fs;
use std::path::{Path, PathBuf};

const POWER_SUPPLY_DIR: &str = "/sys/class/power_supply";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BatteryStatus {
    pub percent: u8,
    pub charging: bool,
    pub plugged: bool,
}

impl BatteryStatus {
    /// `⚡85%` on AC or while charging, `🔋07%` otherwise.
    pub fn label(&self) -> String {
        let symbol = if self.charging || self.plugged {
            "⚡"
        } else {
            "🔋"
        };
        format!("{}{:02}%", symbol, self.percent)
    }
}

/// Platform power-source table. Reads are blocking and run on a worker.
pub trait PowerSource: Send + Sync + 'static {
    fn read(&self) -> Option<BatteryStatus>;
}

/// Battery label for a read; machines without a battery get an empty label.
pub fn battery_label(status: Option<BatteryStatus>) -> String {
    status.map(|s| s.label()).unwrap_or_default()
}

/// Linux power supplies exposed under `/sys/class/power_supply`.
#[derive(Debug, Clone)]
pub struct SysfsPowerSource {
    root: PathBuf,
}

impl Default for SysfsPowerSource {
    fn default() -> Self {
        Self::new(POWER_SUPPLY_DIR)
    }
}

impl SysfsPowerSource {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }
}

impl PowerSource for SysfsPowerSource {
    fn read(&self) -> Option<BatteryStatus> {
        let mut entries: Vec<PathBuf> = fs::read_dir(&self.root)
            .ok()?
            .flatten()
            .map(|e| e.path())
            .collect();
        // BAT0 before BAT1
        entries.sort();

        let plugged = entries.iter().any(|p| {
            read_attr(p, "type").as_deref() == Some("Mains")
                && read_attr(p, "online").as_deref() == Some("1")
        });

        entries
            .iter()
            .filter(|p| read_attr(p, "type").as_deref() == Some("Battery"))
            .find_map(|p| {
                let percent = read_attr(p, "capacity")?.parse::<u8>().ok()?.min(100);
                let charging = read_attr(p, "status").as_deref() == Some("Charging");
                Some(BatteryStatus {
                    percent,
                    charging,
                    plugged,
                })
            })
    }
}

fn read_attr(dir: &Path, name: &str) -> Option<String> {
    fs::read_to_string(dir.join(name))
        .ok()
        .map(|s| s.trim().to_string())
}
