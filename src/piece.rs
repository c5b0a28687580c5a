//! Falling pair: colours, rotation, geometry and placement checks.

use crate::board::{Board, Puyo, ROWS};

/// Spawn column of the main puyo.
pub const SPAWN_X: i32 = 2;
/// Spawn row of the main puyo.
pub const SPAWN_Y: i32 = 0;

/// Wall kick order when an in-place rotation is blocked: left, right, up.
pub const KICKS: [(i32, i32); 3] = [(-1, 0), (1, 0), (0, -1)];

/// Two colours that fall together. `main` is the pivot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pair {
    pub main: Puyo,
    pub sub: Puyo,
}

impl Pair {
    pub const fn new(main: Puyo, sub: Puyo) -> Self {
        Self { main, sub }
    }
}

/// Where the sub puyo sits relative to the main one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Rotation {
    /// 0 degrees.
    #[default]
    Up,
    /// 90 degrees.
    Right,
    /// 180 degrees.
    Down,
    /// 270 degrees.
    Left,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Spin {
    Clockwise,
    CounterClockwise,
}

impl Rotation {
    /// Unit offset (dx, dy) from main to sub.
    pub fn offset(self) -> (i32, i32) {
        match self {
            Self::Up => (0, -1),
            Self::Right => (1, 0),
            Self::Down => (0, 1),
            Self::Left => (-1, 0),
        }
    }

    pub fn turned(self, spin: Spin) -> Self {
        match (spin, self) {
            (Spin::Clockwise, Self::Up) | (Spin::CounterClockwise, Self::Down) => Self::Right,
            (Spin::Clockwise, Self::Right) | (Spin::CounterClockwise, Self::Left) => Self::Down,
            (Spin::Clockwise, Self::Down) | (Spin::CounterClockwise, Self::Up) => Self::Left,
            (Spin::Clockwise, Self::Left) | (Spin::CounterClockwise, Self::Right) => Self::Up,
        }
    }
}

/// Active pair with the main puyo at (x, y).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Piece {
    pub pair: Pair,
    pub x: i32,
    pub y: i32,
    pub rotation: Rotation,
}

impl Piece {
    pub fn spawn(pair: Pair) -> Self {
        Self {
            pair,
            x: SPAWN_X,
            y: SPAWN_Y,
            rotation: Rotation::Up,
        }
    }

    pub fn main_position(&self) -> (i32, i32) {
        (self.x, self.y)
    }

    pub fn sub_position(&self) -> (i32, i32) {
        let (dx, dy) = self.rotation.offset();
        (self.x + dx, self.y + dy)
    }

    /// Same piece shifted by (dx, dy).
    pub fn shifted(&self, dx: i32, dy: i32) -> Self {
        Self {
            x: self.x + dx,
            y: self.y + dy,
            ..*self
        }
    }

    pub fn with_rotation(&self, rotation: Rotation) -> Self {
        Self { rotation, ..*self }
    }
}

impl Board {
    /// True if the piece fits: main cell on the board and empty; sub cell in
    /// a valid column, at most one row above the board, and empty when on it.
    pub fn can_place(&self, piece: &Piece) -> bool {
        let (mx, my) = piece.main_position();
        if !self.is_vacant(mx, my) {
            return false;
        }
        let (sx, sy) = piece.sub_position();
        match sy {
            -1 => Self::in_bounds(sx, 0),
            _ => sy < ROWS as i32 && self.is_vacant(sx, sy),
        }
    }

    /// Rotation result for `piece`, trying wall kicks when the in-place turn
    /// is blocked. `None` when every candidate is blocked.
    pub fn try_rotate(&self, piece: &Piece, spin: Spin) -> Option<Piece> {
        let turned = piece.with_rotation(piece.rotation.turned(spin));
        if self.can_place(&turned) {
            return Some(turned);
        }
        KICKS
            .iter()
            .map(|&(dx, dy)| turned.shifted(dx, dy))
            .find(|candidate| self.can_place(candidate))
    }
}
