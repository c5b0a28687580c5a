//! Theme loading: btop-style `theme[key]="value"` and hex → ratatui Color.

use crate::board::Puyo;
use ratatui::style::Color;
use std::collections::HashMap;
use std::path::Path;
use thiserror::Error;

/// Puyo and UI colours, One Dark unless a theme file says otherwise.
#[derive(Debug, Clone)]
pub struct Theme {
    /// Puyo colours by `Puyo::color_index`: red, blue, yellow, green.
    pub puyo: [Color; 4],
    /// Board background.
    pub bg: Color,
    /// Borders.
    pub div_line: Color,
    /// Text (score, controls).
    pub main_fg: Color,
    /// Panel titles.
    pub title: Color,
    /// Overlay hints.
    pub inactive_fg: Color,
}

#[derive(Debug, Error)]
pub enum ThemeError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("invalid hex: {0}")]
    InvalidHex(String),
}

impl Default for Theme {
    fn default() -> Self {
        Self::onedark_default()
    }
}

/// One Dark hex values, shared by the defaults and the per-key fallbacks.
const ONEDARK_RED: Color = Color::Rgb(0xE0, 0x6C, 0x75);
const ONEDARK_BLUE: Color = Color::Rgb(0x61, 0xAF, 0xEF);
const ONEDARK_YELLOW: Color = Color::Rgb(0xE5, 0xC0, 0x7B);
const ONEDARK_GREEN: Color = Color::Rgb(0x98, 0xC3, 0x79);
const ONEDARK_BG: Color = Color::Rgb(0x31, 0x35, 0x3F);
const ONEDARK_DIV: Color = Color::Rgb(0x3F, 0x44, 0x4F);
const ONEDARK_FG: Color = Color::Rgb(0xAB, 0xB2, 0xBF);
const ONEDARK_INACTIVE: Color = Color::Rgb(0x5C, 0x63, 0x70);

impl Theme {
    pub fn onedark_default() -> Self {
        Self {
            puyo: [ONEDARK_RED, ONEDARK_BLUE, ONEDARK_YELLOW, ONEDARK_GREEN],
            bg: ONEDARK_BG,
            div_line: ONEDARK_DIV,
            main_fg: ONEDARK_FG,
            title: ONEDARK_YELLOW,
            inactive_fg: ONEDARK_INACTIVE,
        }
    }

    /// Load theme from a btop-style file: `theme[key]="value"` or `theme[key]='value'`.
    /// Missing path means One Dark; `palette` then overrides the puyo colours.
    pub fn load(path: Option<&Path>, palette: crate::Palette) -> Result<Self, ThemeError> {
        let mut theme = match path {
            Some(p) if p.exists() => Self::from_map(&parse_theme_file(&std::fs::read_to_string(p)?)),
            _ => Self::onedark_default(),
        };
        theme.apply_palette(palette);
        Ok(theme)
    }

    pub fn apply_palette(&mut self, palette: crate::Palette) {
        match palette {
            crate::Palette::Normal => {}
            crate::Palette::HighContrast => {
                self.puyo = [
                    Color::Rgb(0xFF, 0x00, 0x00),
                    Color::Rgb(0x00, 0x88, 0xFF),
                    Color::Rgb(0xFF, 0xFF, 0x00),
                    Color::Rgb(0x00, 0xFF, 0x00),
                ];
            }
            crate::Palette::Colorblind => {
                // Okabe-Ito style: no red/green pair that differs by hue alone
                self.puyo = [
                    Color::Rgb(0xCC, 0x33, 0x11),
                    Color::Rgb(0x00, 0x77, 0xBB),
                    Color::Rgb(0xEE, 0xCC, 0x33),
                    Color::Rgb(0x00, 0x99, 0x88),
                ];
            }
        }
    }

    fn from_map(map: &HashMap<String, String>) -> Self {
        let get = |key: &str| map.get(key).and_then(|v| parse_hex(v).ok());
        Self {
            puyo: [
                get("cpu_end").or_else(|| get("temp_end")).unwrap_or(ONEDARK_RED),
                get("cpu_box").unwrap_or(ONEDARK_BLUE),
                get("title").or_else(|| get("cpu_mid")).unwrap_or(ONEDARK_YELLOW),
                get("mem_box").or_else(|| get("cpu_start")).unwrap_or(ONEDARK_GREEN),
            ],
            bg: get("meter_bg").unwrap_or(ONEDARK_BG),
            div_line: get("div_line").unwrap_or(ONEDARK_DIV),
            main_fg: get("main_fg").unwrap_or(ONEDARK_FG),
            title: get("title").unwrap_or(ONEDARK_YELLOW),
            inactive_fg: get("inactive_fg").unwrap_or(ONEDARK_INACTIVE),
        }
    }

    #[inline]
    pub fn puyo_color(&self, puyo: Puyo) -> Color {
        self.puyo[puyo.color_index() as usize]
    }
}

/// Parse btop-style theme file into key -> value map.
fn parse_theme_file(s: &str) -> HashMap<String, String> {
    let mut map = HashMap::new();
    for line in s.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        if let Some(stripped) = line.strip_prefix("theme[") {
            if let Some(end) = stripped.find(']') {
                let key = stripped[..end].trim();
                let rest = stripped[end + 1..].trim();
                if let Some(eq) = rest.find('=') {
                    let value = rest[eq + 1..]
                        .trim()
                        .trim_matches('"')
                        .trim_matches('\'')
                        .to_string();
                    if !value.is_empty() {
                        map.insert(key.to_string(), value);
                    }
                }
            }
        }
    }
    map
}

/// Parse hex colour "#RRGGBB" or "#RGB" into ratatui Color.
pub fn parse_hex(s: &str) -> Result<Color, ThemeError> {
    let s = s.trim().trim_start_matches('#');
    if !s.is_ascii() {
        return Err(ThemeError::InvalidHex(s.to_string()));
    }
    let (r, g, b) = if s.len() == 6 {
        let r =
            u8::from_str_radix(&s[0..2], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        let g =
            u8::from_str_radix(&s[2..4], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        let b =
            u8::from_str_radix(&s[4..6], 16).map_err(|_| ThemeError::InvalidHex(s.to_string()))?;
        (r, g, b)
    } else if s.len() == 3 {
        let r = u8::from_str_radix(&s[0..1], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        let g = u8::from_str_radix(&s[1..2], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        let b = u8::from_str_radix(&s[2..3], 16)
            .map_err(|_| ThemeError::InvalidHex(s.to_string()))?
            * 17;
        (r, g, b)
    } else {
        return Err(ThemeError::InvalidHex(s.to_string()));
    };
    Ok(Color::Rgb(r, g, b))
}
