use crate::state::{Rect, Slot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Align {
    Left,
    Center,
    Right,
}

/// Where one label slot sits inside a bar window, in surface-local pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LabelFrame {
    pub slot: Slot,
    pub rect: Rect,
    pub align: Align,
}
