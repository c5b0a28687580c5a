//! Game state: board, falling pair, next pair, score, chain, status and timers.

use crate::board::{Board, ROWS};
use crate::piece::{Pair, Piece, Spin};
use crate::queue::PairSource;
use crate::schedule::{Event, Phase, Scheduler};
use std::time::{Duration, Instant};

/// Points per popped puyo, before the chain multiplier.
const POINTS_PER_PUYO: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Idle,
    Playing,
    Falling,
    Clearing,
    GameOver,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

/// Delays between simulation steps.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timing {
    /// Automatic fall interval.
    pub fall_interval: Duration,
    /// Interval between hard-drop ticks.
    pub drop_interval: Duration,
    /// How long a hard drop keeps ticking at most.
    pub drop_window: Duration,
    /// Lock to gravity pass.
    pub lock_settle: Duration,
    /// Pop to gravity pass.
    pub pop_settle: Duration,
    /// Gravity pass to next resolve.
    pub resolve_delay: Duration,
    /// How long the chain banner stays up.
    pub banner: Duration,
}

impl Default for Timing {
    fn default() -> Self {
        Self {
            fall_interval: Duration::from_millis(1000),
            drop_interval: Duration::from_millis(50),
            drop_window: Duration::from_millis(3000),
            lock_settle: Duration::from_millis(300),
            pop_settle: Duration::from_millis(500),
            resolve_delay: Duration::from_millis(300),
            banner: Duration::from_millis(1000),
        }
    }
}

#[derive(Debug)]
pub struct GameState {
    board: Board,
    piece: Option<Piece>,
    next: Pair,
    pairs: Box<dyn PairSource>,
    score: u32,
    status: Status,
    chain: u32,
    show_chain_banner: bool,
    /// Cells removed by the latest pop; cleared by the next gravity pass.
    popped: Vec<(usize, usize)>,
    timing: Timing,
    timers: Scheduler,
}

impl GameState {
    pub fn new(timing: Timing, mut pairs: Box<dyn PairSource>) -> Self {
        let next = pairs.next_pair();
        Self {
            board: Board::new(),
            piece: None,
            next,
            pairs,
            score: 0,
            status: Status::Idle,
            chain: 0,
            show_chain_banner: false,
            popped: Vec::new(),
            timing,
            timers: Scheduler::default(),
        }
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn piece(&self) -> Option<&Piece> {
        self.piece.as_ref()
    }

    pub fn next_pair(&self) -> Pair {
        self.next
    }

    pub fn score(&self) -> u32 {
        self.score
    }

    pub fn status(&self) -> Status {
        self.status
    }

    pub fn chain(&self) -> u32 {
        self.chain
    }

    pub fn show_chain_banner(&self) -> bool {
        self.show_chain_banner
    }

    pub fn popped(&self) -> &[(usize, usize)] {
        &self.popped
    }

    /// Fresh board and counters; every pending timer dropped.
    fn clear_round(&mut self) {
        self.timers.cancel_all();
        self.board = Board::new();
        self.piece = None;
        self.score = 0;
        self.chain = 0;
        self.show_chain_banner = false;
        self.popped.clear();
    }

    /// Start a new game from the currently queued pair.
    pub fn start(&mut self, now: Instant) {
        self.clear_round();
        self.spawn_next();
        self.status = Status::Playing;
        self.timers.start_fall(now, self.timing.fall_interval);
    }

    /// Back to idle with a fresh queued pair; nothing keeps running.
    pub fn reset(&mut self) {
        self.clear_round();
        self.next = self.pairs.next_pair();
        self.status = Status::Idle;
    }

    pub fn end_game(&mut self) {
        self.timers.cancel_fall();
        self.timers.cancel_phase();
        self.status = Status::GameOver;
        self.piece = None;
    }

    fn spawn_next(&mut self) {
        self.piece = Some(Piece::spawn(self.next));
        self.next = self.pairs.next_pair();
    }

    fn active_piece(&self) -> Option<Piece> {
        if self.status == Status::Playing { self.piece } else { None }
    }

    pub fn move_piece(&mut self, direction: Direction) {
        let Some(piece) = self.active_piece() else {
            return;
        };
        let dx = match direction {
            Direction::Left => -1,
            Direction::Right => 1,
        };
        let moved = piece.shifted(dx, 0);
        if self.board.can_place(&moved) {
            self.piece = Some(moved);
        }
    }

    pub fn rotate(&mut self, spin: Spin) {
        let Some(piece) = self.active_piece() else {
            return;
        };
        if let Some(rotated) = self.board.try_rotate(&piece, spin) {
            self.piece = Some(rotated);
        }
    }

    /// Tick quickly for a bounded time; the burst stops once the pair locks.
    /// This does not guarantee reaching the floor.
    pub fn hard_drop(&mut self, now: Instant) {
        self.timers
            .start_drop(now, self.timing.drop_interval, self.timing.drop_window);
    }

    /// One gravity step for the falling pair; locks it when blocked.
    pub fn tick(&mut self, now: Instant) {
        let Some(piece) = self.active_piece() else {
            return;
        };
        let below = piece.shifted(0, 1);
        if self.board.can_place(&below) {
            self.piece = Some(below);
            return;
        }
        self.lock(piece, now);
    }

    fn lock(&mut self, piece: Piece, now: Instant) {
        let (mx, my) = piece.main_position();
        self.board.set(mx as usize, my as usize, Some(piece.pair.main));
        let (sx, sy) = piece.sub_position();
        if (0..ROWS as i32).contains(&sy) {
            self.board.set(sx as usize, sy as usize, Some(piece.pair.sub));
        }
        self.piece = None;
        self.status = Status::Falling;

        if self.board.top_row_occupied() {
            self.end_game();
            return;
        }
        self.timers
            .schedule_phase(Phase::Settle, now + self.timing.lock_settle);
    }

    /// Advance one phase; returns the follow-up phase and its delay.
    fn step_phase(&mut self, phase: Phase, now: Instant) -> Option<(Phase, Duration)> {
        match phase {
            Phase::Settle => {
                self.board.apply_gravity();
                self.popped.clear();
                self.status = Status::Clearing;
                Some((Phase::Resolve, self.timing.resolve_delay))
            }
            Phase::Resolve => self.resolve_clears(now),
        }
    }

    /// Pop every qualifying group at once, or end the cascade and spawn.
    fn resolve_clears(&mut self, now: Instant) -> Option<(Phase, Duration)> {
        let groups = self.board.find_groups();
        if groups.is_empty() {
            self.chain = 0;
            self.spawn_next();
            self.status = Status::Playing;
            return None;
        }

        let cells: Vec<(usize, usize)> = groups.into_iter().flatten().collect();
        self.board.remove(&cells);
        self.chain += 1;
        self.score += cells.len() as u32 * POINTS_PER_PUYO * self.chain;
        self.popped = cells;
        self.show_chain_banner = true;
        self.timers.arm_banner(now + self.timing.banner);
        self.status = Status::Falling;
        Some((Phase::Settle, self.timing.pop_settle))
    }

    /// Fire everything due up to `now`, in time order.
    pub fn update(&mut self, now: Instant) {
        while let Some((due, event)) = self.timers.next_due() {
            if due > now {
                break;
            }
            if self.timers.fire(event) {
                self.handle(event, due);
            }
        }
    }

    fn handle(&mut self, event: Event, at: Instant) {
        match event {
            Event::Phase(phase) => {
                if let Some((next, delay)) = self.step_phase(phase, at) {
                    self.timers.schedule_phase(next, at + delay);
                }
            }
            Event::Fall => self.tick(at),
            Event::DropTick => {
                if self.status == Status::Playing {
                    self.tick(at);
                } else {
                    self.timers.cancel_drop();
                }
            }
            Event::BannerExpired => self.show_chain_banner = false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Puyo;
    use crate::piece::Rotation;
    use crate::queue::ScriptedPairs;

    const MS: Duration = Duration::from_millis(1);

    const RED: Pair = Pair::new(Puyo::Red, Puyo::Red);
    const BLUE_GREEN: Pair = Pair::new(Puyo::Blue, Puyo::Green);
    const YELLOW: Pair = Pair::new(Puyo::Yellow, Puyo::Yellow);

    fn game(pairs: Vec<Pair>) -> GameState {
        GameState::new(Timing::default(), Box::new(ScriptedPairs::new(pairs)))
    }

    fn started(pairs: Vec<Pair>) -> (GameState, Instant) {
        let mut g = game(pairs);
        let t0 = Instant::now();
        g.start(t0);
        (g, t0)
    }

    #[test]
    fn new_game_is_idle_with_a_queued_pair() {
        let g = game(vec![RED, BLUE_GREEN]);
        assert_eq!(g.status(), Status::Idle);
        assert_eq!(g.next_pair(), RED);
        assert!(g.piece().is_none());
    }

    #[test]
    fn start_spawns_queued_pair_and_refills() {
        let (g, _) = started(vec![RED, BLUE_GREEN, YELLOW]);
        let piece = g.piece().copied().unwrap();
        assert_eq!(piece.pair, RED);
        assert_eq!(piece.main_position(), (2, 0));
        assert_eq!(piece.rotation, Rotation::Up);
        assert_eq!(g.next_pair(), BLUE_GREEN);
        assert_eq!(g.status(), Status::Playing);
        assert!(g.timers.fall_active());
    }

    #[test]
    fn actions_are_ignored_when_not_playing() {
        let mut g = game(vec![RED]);
        let t0 = Instant::now();
        g.move_piece(Direction::Left);
        g.rotate(Spin::Clockwise);
        g.tick(t0);
        assert_eq!(g.status(), Status::Idle);
        assert!(g.piece().is_none());
        assert_eq!(g.board().filled_count(), 0);
    }

    #[test]
    fn moves_stop_at_the_walls() {
        let (mut g, _) = started(vec![RED]);
        for _ in 0..10 {
            g.move_piece(Direction::Left);
        }
        assert_eq!(g.piece().unwrap().x, 0);
        for _ in 0..10 {
            g.move_piece(Direction::Right);
        }
        assert_eq!(g.piece().unwrap().x, 5);
    }

    #[test]
    fn blocked_rotation_kicks_left_by_one() {
        let (mut g, _) = started(vec![RED]);
        for _ in 0..3 {
            g.move_piece(Direction::Right);
        }
        g.rotate(Spin::Clockwise);
        let piece = g.piece().unwrap();
        assert_eq!((piece.x, piece.y), (4, 0));
        assert_eq!(piece.rotation, Rotation::Right);
    }

    #[test]
    fn fully_blocked_rotation_changes_nothing() {
        let (mut g, t0) = started(vec![RED]);
        for _ in 0..5 {
            g.tick(t0);
        }
        for _ in 0..2 {
            g.move_piece(Direction::Left);
        }
        g.board.set(1, 5, Some(Puyo::Yellow));
        let before = *g.piece().unwrap();
        assert_eq!((before.x, before.y), (0, 5));
        g.rotate(Spin::CounterClockwise);
        assert_eq!(*g.piece().unwrap(), before);
    }

    #[test]
    fn fall_timer_moves_the_pair_down() {
        let (mut g, t0) = started(vec![RED]);
        g.update(t0 + 999 * MS);
        assert_eq!(g.piece().unwrap().y, 0);
        g.update(t0 + 3000 * MS);
        assert_eq!(g.piece().unwrap().y, 3);
    }

    #[test]
    fn locking_into_the_top_row_ends_the_game() {
        let (mut g, t0) = started(vec![RED, BLUE_GREEN]);
        let column = [Puyo::Blue, Puyo::Green];
        for y in 1..ROWS {
            g.board.set(2, y, Some(column[y % 2]));
        }
        g.tick(t0);
        assert_eq!(g.status(), Status::GameOver);
        assert!(g.piece().is_none());
        assert!(!g.timers.fall_active());
        assert_eq!(g.board().get(2, 0), Some(Puyo::Red));
        assert_eq!(g.timers.pending_phase(), None);
        g.update(t0 + 10_000 * MS);
        assert_eq!(g.status(), Status::GameOver);
        assert!(g.piece().is_none());
    }

    #[test]
    fn lock_settle_resolve_then_next_pair() {
        let (mut g, t0) = started(vec![RED, BLUE_GREEN, YELLOW]);
        for _ in 0..4 {
            g.tick(t0);
        }
        assert_eq!(g.piece().unwrap().main_position(), (2, 4));

        g.board.set(2, 5, Some(Puyo::Red));
        g.board.set(2, 6, Some(Puyo::Red));
        g.tick(t0);
        assert_eq!(g.status(), Status::Falling);
        assert!(g.piece().is_none());
        assert_eq!(g.timers.pending_phase(), Some(Phase::Settle));
        assert_eq!(g.board().get(2, 3), Some(Puyo::Red));
        assert_eq!(g.board().get(2, 4), Some(Puyo::Red));

        g.update(t0 + 300 * MS);
        assert_eq!(g.status(), Status::Clearing);
        assert_eq!(g.board().get(2, 11), Some(Puyo::Red));
        assert_eq!(g.board().get(2, 8), Some(Puyo::Red));

        g.update(t0 + 600 * MS);
        assert_eq!(g.score(), 40);
        assert_eq!(g.chain(), 1);
        assert!(g.show_chain_banner());
        assert_eq!(g.status(), Status::Falling);
        assert_eq!(g.board().filled_count(), 0);
        assert_eq!(g.popped().len(), 4);

        g.update(t0 + 1100 * MS);
        assert_eq!(g.status(), Status::Clearing);
        assert!(g.popped().is_empty());

        g.update(t0 + 1400 * MS);
        assert_eq!(g.chain(), 0);
        assert_eq!(g.status(), Status::Playing);
        assert_eq!(g.piece().unwrap().pair, BLUE_GREEN);
        assert_eq!(g.next_pair(), YELLOW);
        assert_eq!(g.score(), 40);
    }

    #[test]
    fn two_round_chain_scores_140() {
        let mut g = game(vec![RED]);
        let t0 = Instant::now();
        g.board = Board::from_rows(&[
            "B.....", //
            "B.....",
            "R.....",
            "RB....",
            "RB....",
            "RB....",
        ]);
        g.status = Status::Clearing;
        g.timers.schedule_phase(Phase::Resolve, t0);

        g.update(t0);
        assert_eq!(g.score(), 40);
        assert_eq!(g.chain(), 1);

        g.update(t0 + 800 * MS);
        assert_eq!(g.score(), 140);
        assert_eq!(g.chain(), 2);

        g.update(t0 + 1600 * MS);
        assert_eq!(g.chain(), 0);
        assert_eq!(g.status(), Status::Playing);
        assert_eq!(g.board().filled_count(), 0);
    }

    #[test]
    fn banner_hides_after_one_second() {
        let mut g = game(vec![RED]);
        let t0 = Instant::now();
        g.board = Board::from_rows(&["YYYY.."]);
        g.status = Status::Clearing;
        g.timers.schedule_phase(Phase::Resolve, t0);
        g.update(t0);
        assert!(g.show_chain_banner());
        g.update(t0 + 999 * MS);
        assert!(g.show_chain_banner());
        g.update(t0 + 1000 * MS);
        assert!(!g.show_chain_banner());
    }

    #[test]
    fn first_pop_banner_expires_on_time_during_a_chain() {
        let mut g = game(vec![RED]);
        let t0 = Instant::now();
        g.board = Board::from_rows(&[
            "B.....", //
            "B.....",
            "R.....",
            "RB....",
            "RB....",
            "RB....",
        ]);
        g.status = Status::Clearing;
        g.timers.schedule_phase(Phase::Resolve, t0);

        g.update(t0 + 800 * MS);
        assert_eq!(g.chain(), 2);
        assert!(g.show_chain_banner());
        g.update(t0 + 1000 * MS);
        assert!(!g.show_chain_banner());
        g.update(t0 + 1800 * MS);
        assert!(!g.show_chain_banner());
    }

    #[test]
    fn hard_drop_lands_then_stops_ticking() {
        let (mut g, t0) = started(vec![RED, BLUE_GREEN]);
        g.hard_drop(t0);
        g.update(t0 + 550 * MS);
        assert_eq!(g.piece().unwrap().y, 11);
        g.update(t0 + 600 * MS);
        assert_eq!(g.status(), Status::Falling);
        assert_eq!(g.board().get(2, 11), Some(Puyo::Red));
        assert_eq!(g.board().get(2, 10), Some(Puyo::Red));
        g.update(t0 + 650 * MS);
        assert!(!g.timers.drop_active());

        g.update(t0 + 1200 * MS);
        assert_eq!(g.status(), Status::Playing);
        g.update(t0 + 1900 * MS);
        assert_eq!(g.piece().unwrap().y, 0);
    }

    #[test]
    fn hard_drop_while_idle_does_nothing() {
        let mut g = game(vec![RED]);
        let t0 = Instant::now();
        g.hard_drop(t0);
        g.update(t0 + 100 * MS);
        assert_eq!(g.status(), Status::Idle);
        assert!(!g.timers.drop_active());
    }

    #[test]
    fn restart_keeps_a_single_fall_timer() {
        let (mut g, t0) = started(vec![RED, BLUE_GREEN, YELLOW]);
        g.start(t0 + 500 * MS);
        g.update(t0 + 1000 * MS);
        assert_eq!(g.piece().unwrap().y, 0);
        g.update(t0 + 1500 * MS);
        assert_eq!(g.piece().unwrap().y, 1);
    }

    #[test]
    fn reset_returns_to_idle_and_stops_everything() {
        let (mut g, t0) = started(vec![RED, BLUE_GREEN, YELLOW]);
        g.hard_drop(t0);
        g.update(t0 + 600 * MS);
        g.reset();
        assert_eq!(g.status(), Status::Idle);
        assert!(g.piece().is_none());
        assert_eq!(g.board().filled_count(), 0);
        assert_eq!(g.score(), 0);
        assert_eq!(g.next_pair(), YELLOW);
        assert_eq!(g.timers.next_due(), None);
        g.update(t0 + 10_000 * MS);
        assert_eq!(g.status(), Status::Idle);
    }
}
