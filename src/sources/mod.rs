//! Live values shown on the bar: clock/date, battery and the focused workspace.

pub mod battery;
pub mod clock;
pub mod workspace;

pub use battery::{BatteryStatus, PowerSource, SysfsPowerSource, battery_label};
pub use clock::ClockFormatter;
pub use workspace::{QueryOutcome, workspace_label};
