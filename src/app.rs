//! App: terminal init, main loop, key handling.

use crate::GameConfig;
use crate::game::{Direction, GameState, Status};
use crate::input::{Action, key_to_action};
use crate::piece::Spin;
use crate::queue::RandomPairs;
use crate::theme::Theme;
use anyhow::Result;
use crossterm::event::{self, Event, KeyEventKind};
use ratatui::DefaultTerminal;
use std::time::{Duration, Instant};
use tachyonfx::Effect;

pub struct App {
    config: GameConfig,
    theme: Theme,
    state: GameState,
    /// TachyonFX fade for popped puyos (created when a pop is first drawn).
    pop_effect: Option<Effect>,
    /// Last time the pop effect was processed (for delta).
    pop_effect_process_time: Option<Instant>,
}

impl App {
    pub fn new(config: GameConfig, theme: Theme) -> Self {
        let pairs = Box::new(RandomPairs::new(config.seed));
        let mut state = GameState::new(config.timing, pairs);
        if config.autostart {
            state.start(Instant::now());
        }
        Self {
            config,
            theme,
            state,
            pop_effect: None,
            pop_effect_process_time: None,
        }
    }

    /// Apply one player action. Returns false when the player quits.
    fn apply_action(&mut self, action: Action, now: Instant) -> bool {
        match action {
            Action::Quit => return false,
            Action::MoveLeft => self.state.move_piece(Direction::Left),
            Action::MoveRight => self.state.move_piece(Direction::Right),
            Action::RotateCw => self.state.rotate(Spin::Clockwise),
            Action::RotateCcw => self.state.rotate(Spin::CounterClockwise),
            Action::HardDrop => self.state.hard_drop(now),
            Action::Start => {
                if matches!(self.state.status(), Status::Idle | Status::GameOver) {
                    self.state.start(now);
                }
            }
            Action::Reset => self.state.reset(),
            Action::None => {}
        }
        true
    }

    pub fn run(&mut self) -> Result<()> {
        use crossterm::{
            execute,
            terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
        };

        enable_raw_mode()?;
        let mut stdout = std::io::stdout();
        execute!(stdout, EnterAlternateScreen)?;

        let result = ratatui::DefaultTerminal::new(ratatui::backend::CrosstermBackend::new(stdout))
            .map_err(anyhow::Error::from)
            .and_then(|mut terminal| self.run_loop(&mut terminal));

        // Restore
        execute!(std::io::stdout(), LeaveAlternateScreen)?;
        disable_raw_mode()?;

        result
    }

    fn run_loop(&mut self, terminal: &mut DefaultTerminal) -> Result<()> {
        let frame_duration = Duration::from_secs_f64(1.0 / self.config.frame_rate);
        loop {
            let now = Instant::now();
            self.state.update(now);

            if self.state.popped().is_empty() {
                self.pop_effect = None;
                self.pop_effect_process_time = None;
            }

            terminal.draw(|f| {
                crate::ui::draw(
                    f,
                    &self.state,
                    &self.theme,
                    f.area(),
                    &mut self.pop_effect,
                    &mut self.pop_effect_process_time,
                    now,
                    self.config.no_animation,
                );
            })?;

            let timeout = frame_duration.saturating_sub(now.elapsed());
            if event::poll(timeout)? {
                while event::poll(Duration::ZERO)? {
                    if let Event::Key(key) = event::read()? {
                        // Only the first press counts; OS repeats and releases are ignored.
                        if key.kind != KeyEventKind::Press {
                            continue;
                        }
                        if !self.apply_action(key_to_action(key), Instant::now()) {
                            return Ok(());
                        }
                    }
                }
            }
        }
    }
}
