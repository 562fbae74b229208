use super::types::{Align, LabelFrame};
use crate::config::BarConfig;
use crate::state::{Rect, Slot};

const REFERENCE_FONT_SIZE: f32 = 13.0;

const WORKSPACE_WIDTH: u32 = 200;
const WORKSPACE_WIDTH_DOUBLED: u32 = 80;
const CLOCK_WIDTH: u32 = 45;
const DATE_WIDTH: u32 = 85;
const BATTERY_WIDTH: u32 = 60;

/// Label placement rules, resolved once from the config.
#[derive(Debug, Clone, PartialEq)]
pub struct LayoutPolicy {
    pub show_clock: bool,
    pub show_workspace: bool,
    pub show_battery: bool,
    pub center_clock: bool,
    pub center_workspace: bool,
    pub padding: u32,
    pub item_spacing: u32,
    pub right_margin: u32,
    pub scale: f32,
}

impl LayoutPolicy {
    pub fn from_config(config: &BarConfig) -> Self {
        let scale = if config.style.font_size > 0.0 {
            config.style.font_size / REFERENCE_FONT_SIZE
        } else {
            1.0
        };
        Self {
            show_clock: config.modules.show_clock,
            show_workspace: config.modules.show_workspace,
            show_battery: config.modules.show_battery,
            center_clock: config.layout.center_clock,
            center_workspace: config.layout.center_workspace,
            padding: config.layout.padding,
            item_spacing: config.layout.item_spacing,
            right_margin: config.layout.right_margin,
            scale,
        }
    }

    fn scaled(&self, width: u32) -> u32 {
        (width as f32 * self.scale).round() as u32
    }

    /// Both centred labels share the middle of the bar, split at the centre line.
    fn doubled(&self) -> bool {
        self.show_clock && self.show_workspace && self.center_clock && self.center_workspace
    }

    pub fn place(&self, width: u32, height: u32) -> Vec<LabelFrame> {
        let mut frames = Vec::with_capacity(4);
        let label_h = height.saturating_sub(self.padding);
        let y = ((height - label_h) / 2) as i32;
        let w = width as i32;
        let half_pad = (self.padding / 2) as i32;

        if self.show_workspace {
            let frame = if self.doubled() {
                let ws_w = self.scaled(WORKSPACE_WIDTH_DOUBLED);
                LabelFrame {
                    slot: Slot::Workspace,
                    rect: Rect::new(w / 2 - ws_w as i32 - half_pad, y, ws_w, label_h),
                    align: Align::Right,
                }
            } else if self.center_workspace {
                let ws_w = self.scaled(WORKSPACE_WIDTH);
                LabelFrame {
                    slot: Slot::Workspace,
                    rect: Rect::new((w - ws_w as i32) / 2, y, ws_w, label_h),
                    align: Align::Center,
                }
            } else {
                LabelFrame {
                    slot: Slot::Workspace,
                    rect: Rect::new(self.padding as i32, y, self.scaled(WORKSPACE_WIDTH), label_h),
                    align: Align::Left,
                }
            };
            frames.push(frame);
        }

        let clock_w = self.scaled(CLOCK_WIDTH);
        if self.show_clock && self.center_clock {
            let frame = if self.doubled() {
                LabelFrame {
                    slot: Slot::Clock,
                    rect: Rect::new(w / 2 + half_pad, y, clock_w, label_h),
                    align: Align::Left,
                }
            } else {
                LabelFrame {
                    slot: Slot::Clock,
                    rect: Rect::new((w - clock_w as i32) / 2, y, clock_w, label_h),
                    align: Align::Center,
                }
            };
            frames.push(frame);
        }

        // Right group, ordered left to right.
        let mut right: Vec<(Slot, u32)> = Vec::with_capacity(3);
        if self.show_battery {
            right.push((Slot::Battery, self.scaled(BATTERY_WIDTH)));
        }
        right.push((Slot::Date, self.scaled(DATE_WIDTH)));
        if self.show_clock && !self.center_clock {
            right.push((Slot::Clock, clock_w));
        }

        let last = right.len() - 1;
        let mut x = w - self.padding as i32 - self.right_margin as i32;
        for (index, (slot, item_w)) in right.into_iter().enumerate().rev() {
            x -= item_w as i32;
            frames.push(LabelFrame {
                slot,
                rect: Rect::new(x, y, item_w, label_h),
                align: if index == last {
                    Align::Right
                } else {
                    Align::Left
                },
            });
            if index > 0 {
                x -= self.item_spacing as i32;
            }
        }

        frames
    }
}
