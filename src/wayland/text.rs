use crate::modules::logging::{log_debug, log_warn};
use cosmic_text::fontdb::{Database, Source};
use cosmic_text::{Attrs, Family, FontSystem, SwashCache};
use std::path::{Path, PathBuf};
use std::process::Command;
use std::sync::Arc;

/// Fonts and glyph cache shared by every bar.
pub struct TextRenderer {
    pub font_system: FontSystem,
    pub swash_cache: SwashCache,
    pub font_size: f32,
    pub line_height: f32,
    /// Family of the primary font, as the database names it.
    pub family: Option<String>,
}

impl TextRenderer {
    /// `font` is `system`, `monospace`, a family name or a font file path.
    pub fn new(font: &str, font_size: f32) -> Self {
        let font_size = if font_size > 0.0 { font_size } else { 13.0 };

        // Empty database avoids scanning all system fonts (slow on large font collections).
        let mut db = Database::new();

        let primary = resolve_font(font);
        if primary
            .as_ref()
            .and_then(|path| load_font(&mut db, path))
            .is_none()
        {
            log_warn(
                "FONT",
                &format!("Could not load font '{}', text may not render", font),
            );
        }

        // Battery and power glyphs usually live in the emoji font.
        if let Some(emoji) = resolve_font_via_fc_match("emoji") {
            let _ = load_font(&mut db, &PathBuf::from(emoji));
        }

        let family = db
            .faces()
            .next()
            .and_then(|face| face.families.first())
            .map(|(name, _)| name.clone());

        for face in db.faces() {
            log_debug(
                "FONT",
                &format!(
                    "Loaded face: {:?} (Families: {:?})",
                    face.post_script_name, face.families
                ),
            );
        }

        Self {
            font_system: FontSystem::new_with_locale_and_db("en-US".into(), db),
            swash_cache: SwashCache::new(),
            font_size,
            line_height: (font_size * 1.2).ceil(),
            family,
        }
    }
}

pub fn family_attrs(family: Option<&str>) -> Attrs<'_> {
    match family {
        Some(name) => Attrs::new().family(Family::Name(name)),
        None => Attrs::new().family(Family::SansSerif),
    }
}

fn resolve_font(font: &str) -> Option<PathBuf> {
    let query = match font {
        "" | "system" => "sans-serif",
        other => other,
    };

    let path = PathBuf::from(query);
    if path.is_file() {
        return Some(path);
    }

    log_debug("FONT", &format!("Resolving '{}' through fontconfig", query));
    resolve_font_via_fc_match(query)
        .or_else(|| resolve_font_via_fc_match("sans-serif"))
        .map(PathBuf::from)
}

fn load_font(db: &mut Database, path: &Path) -> Option<()> {
    match std::fs::read(path) {
        Ok(data) => {
            db.load_font_source(Source::Binary(Arc::new(data)));
            log_debug("FONT", &format!("Loaded font file: {:?}", path));
            Some(())
        }
        Err(e) => {
            log_warn("FONT", &format!("Failed to read font file {:?}: {}", path, e));
            None
        }
    }
}

fn resolve_font_via_fc_match(font_name: &str) -> Option<String> {
    match Command::new("fc-match")
        .arg("--format=%{file}")
        .arg(font_name)
        .output()
    {
        Ok(output) if output.status.success() => {
            let path = String::from_utf8_lossy(&output.stdout).trim().to_string();
            (!path.is_empty()).then_some(path)
        }
        Ok(_) => None,
        Err(e) => {
            log_debug("FONT", &format!("Failed to run fc-match: {}", e));
            None
        }
    }
}
