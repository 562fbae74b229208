use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct BarConfig {
    #[serde(default)]
    pub window: WindowConfig,
    #[serde(default)]
    pub style: StyleConfig,
    #[serde(default)]
    pub layout: LayoutConfig,
    #[serde(default)]
    pub modules: ModulesConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_debug_filter")]
    pub debug_filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            debug_filter: default_debug_filter(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_debug_filter() -> String {
    "info,ybar=debug".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WindowConfig {
    #[serde(default = "default_height")]
    pub height: u32,
    #[serde(default = "default_opacity")]
    pub opacity: f32,
    /// `""` follows the primary output and sticks to it, `"all"` covers every
    /// output, anything else names an output.
    #[serde(default)]
    pub monitor: String,
}

impl Default for WindowConfig {
    fn default() -> Self {
        Self {
            height: default_height(),
            opacity: default_opacity(),
            monitor: String::new(),
        }
    }
}

impl WindowConfig {
    pub fn display_mode(&self) -> DisplayMode {
        match self.monitor.trim() {
            "" => DisplayMode::Sticky,
            "all" | "*" => DisplayMode::All,
            name => DisplayMode::Named(name.to_string()),
        }
    }

    pub fn clamped_opacity(&self) -> f32 {
        if self.opacity.is_nan() {
            return default_opacity();
        }
        self.opacity.clamp(0.0, 1.0)
    }
}

/// Which outputs get a bar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisplayMode {
    /// One bar on the output that was primary at first launch, falling back
    /// to the current primary while it is disconnected.
    Sticky,
    /// One bar on the named output, sticky fallback while it is missing.
    Named(String),
    All,
}

fn default_height() -> u32 {
    24
}

fn default_opacity() -> f32 {
    0.7
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct StyleConfig {
    #[serde(default = "default_font")]
    pub font: String,
    #[serde(default = "default_font_size")]
    pub font_size: f32,
    #[serde(default = "default_text_color")]
    pub text_color: String,
    #[serde(default = "default_background")]
    pub background: String,
}

impl Default for StyleConfig {
    fn default() -> Self {
        Self {
            font: default_font(),
            font_size: default_font_size(),
            text_color: default_text_color(),
            background: default_background(),
        }
    }
}

impl StyleConfig {
    pub fn text_rgb(&self) -> Rgb {
        parse_hex_color(&self.text_color).unwrap_or(Rgb::WHITE)
    }

    pub fn background_rgb(&self) -> Rgb {
        parse_hex_color(&self.background).unwrap_or(Rgb::BLACK)
    }
}

fn default_font() -> String {
    "system".to_string()
}

fn default_font_size() -> f32 {
    13.0
}

fn default_text_color() -> String {
    "#FFFFFF".to_string()
}

fn default_background() -> String {
    "#000000".to_string()
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LayoutConfig {
    #[serde(default)]
    pub center_clock: bool,
    #[serde(default)]
    pub center_workspace: bool,
    #[serde(default = "default_padding")]
    pub padding: u32,
    #[serde(default = "default_item_spacing")]
    pub item_spacing: u32,
    #[serde(default = "default_right_margin")]
    pub right_margin: u32,
}

impl Default for LayoutConfig {
    fn default() -> Self {
        Self {
            center_clock: false,
            center_workspace: false,
            padding: default_padding(),
            item_spacing: default_item_spacing(),
            right_margin: default_right_margin(),
        }
    }
}

fn default_padding() -> u32 {
    10
}

fn default_item_spacing() -> u32 {
    10
}

fn default_right_margin() -> u32 {
    20
}

#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct ModulesConfig {
    #[serde(default = "default_true")]
    pub show_clock: bool,
    #[serde(default = "default_true")]
    pub show_workspace: bool,
    #[serde(default = "default_true")]
    pub show_battery: bool,
    /// chrono strftime syntax.
    #[serde(default = "default_clock_format")]
    pub clock_format: String,
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default)]
    pub workspace_prefix: String,
    /// Shown when the workspace query fails or prints nothing.
    #[serde(default)]
    pub workspace_placeholder: String,
    #[serde(default = "default_workspace_command")]
    pub workspace_command: Vec<String>,
}

impl Default for ModulesConfig {
    fn default() -> Self {
        Self {
            show_clock: true,
            show_workspace: true,
            show_battery: true,
            clock_format: default_clock_format(),
            date_format: default_date_format(),
            workspace_prefix: String::new(),
            workspace_placeholder: String::new(),
            workspace_command: default_workspace_command(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_clock_format() -> String {
    "%H:%M".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_workspace_command() -> Vec<String> {
    vec![
        "sh".to_string(),
        "-c".to_string(),
        "hyprctl activeworkspace -j | jq -r .name".to_string(),
    ]
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const WHITE: Rgb = Rgb {
        r: 255,
        g: 255,
        b: 255,
    };
    pub const BLACK: Rgb = Rgb { r: 0, g: 0, b: 0 };
}

/// Accepts `#RRGGBB` and `RRGGBB`.
pub fn parse_hex_color(hex: &str) -> Option<Rgb> {
    let digits = hex.trim().trim_start_matches('#');
    if digits.len() != 6 || !digits.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    let rgb = u32::from_str_radix(digits, 16).ok()?;
    Some(Rgb {
        r: ((rgb >> 16) & 0xFF) as u8,
        g: ((rgb >> 8) & 0xFF) as u8,
        b: (rgb & 0xFF) as u8,
    })
}
