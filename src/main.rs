//! puyotui — match four same-coloured puyos in the terminal.

mod app;
mod board;
mod game;
mod input;
mod piece;
mod queue;
mod schedule;
mod theme;
mod ui;

use anyhow::Result;
use app::App;
use clap::{Parser, ValueEnum};
use game::Timing;
use std::time::Duration;
use thiserror::Error;

/// Options derived from CLI that affect game behaviour.
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub timing: Timing,
    pub seed: Option<u64>,
    pub autostart: bool,
    pub no_animation: bool,
    pub frame_rate: f64,
}

#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("{name} must be greater than zero")]
    ZeroDuration { name: &'static str },
    #[error("frame rate must be a positive number, got {0}")]
    FrameRate(f64),
}

impl GameConfig {
    pub fn from_args(args: &Args) -> Result<Self, ConfigError> {
        if args.fall_interval_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                name: "--fall-interval-ms",
            });
        }
        if args.drop_window_ms == 0 {
            return Err(ConfigError::ZeroDuration {
                name: "--drop-window-ms",
            });
        }
        if !(args.frame_rate.is_finite() && args.frame_rate > 0.0) {
            return Err(ConfigError::FrameRate(args.frame_rate));
        }
        let timing = Timing {
            fall_interval: Duration::from_millis(args.fall_interval_ms),
            drop_window: Duration::from_millis(args.drop_window_ms),
            ..Timing::default()
        };
        Ok(Self {
            timing,
            seed: args.seed,
            autostart: args.autostart,
            no_animation: args.no_animation,
            frame_rate: args.frame_rate,
        })
    }
}

fn main() -> Result<()> {
    let args = Args::parse();
    let config = GameConfig::from_args(&args)?;
    let theme = theme::Theme::load(args.theme.as_deref(), args.palette).unwrap_or_default();
    let mut app = App::new(config, theme);
    app.run()?;
    Ok(())
}

/// Falling-pair colour matching puzzle in the terminal.
#[derive(Debug, Parser)]
#[command(
    name = "puyotui",
    version,
    about = "Falling-pair puzzle in the terminal. Connect four puyos of one colour to pop them; chains multiply the score.",
    long_about = "puyotui is a terminal puzzle game of falling coloured pairs.\n\n\
        Pairs drop into a 6x12 well. Four or more same-coloured puyos touching up, down, left \
        or right pop; whatever was above falls and may pop again as a chain. Each chain step \
        multiplies the points.\n\n\
        CONTROLS:\n  Left/Right  Move    Up / x     Rotate CW   z          Rotate CCW\n  Down        Drop    Space      Start       R          Reset   Q / Esc  Quit\n\n\
        Vim keys h/l move, k rotates, j drops. Use --theme to load a btop-style theme (e.g. onedark.theme)."
)]
pub struct Args {
    /// Path to theme file (btop-style theme[key]=\"value\"). Uses One Dark if not set.
    #[arg(short, long, value_name = "FILE")]
    pub theme: Option<std::path::PathBuf>,

    /// Colour palette: normal (theme), high-contrast, or colorblind.
    #[arg(long, default_value = "normal")]
    pub palette: Palette,

    /// Seed for the pair sequence; same seed, same pairs.
    #[arg(long, value_name = "N")]
    pub seed: Option<u64>,

    /// Milliseconds between automatic fall steps.
    #[arg(long, default_value = "1000", value_name = "MS")]
    pub fall_interval_ms: u64,

    /// How long a drop keeps accelerating the pair, in milliseconds.
    #[arg(long, default_value = "3000", value_name = "MS")]
    pub drop_window_ms: u64,

    /// Skip the start screen and begin playing immediately.
    #[arg(long)]
    pub autostart: bool,

    /// Disable the pop fade animation.
    #[arg(long)]
    pub no_animation: bool,

    /// Target render frames per second.
    #[arg(long, default_value = "60.0", value_name = "RATE")]
    pub frame_rate: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum Palette {
    #[default]
    Normal,

    #[value(alias = "highcontrast", alias = "contrast")]
    HighContrast,

    #[value(alias = "colourblind")]
    Colorblind,
}
