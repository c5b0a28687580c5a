//! Board: the 6x12 grid of settled puyos, gravity and group discovery.

/// Board width in columns.
pub const COLS: usize = 6;
/// Board height in rows. Row 0 is the top.
pub const ROWS: usize = 12;

/// Groups at least this large pop.
pub const POP_THRESHOLD: usize = 4;

/// Puyo colours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Puyo {
    Red,
    Blue,
    Yellow,
    Green,
}

impl Puyo {
    pub const ALL: [Self; 4] = [Self::Red, Self::Blue, Self::Yellow, Self::Green];

    /// Colour index 0..4 for theme.puyo_color().
    pub fn color_index(self) -> u8 {
        match self {
            Self::Red => 0,
            Self::Blue => 1,
            Self::Yellow => 2,
            Self::Green => 3,
        }
    }
}

/// A grid cell: `None` is empty.
pub type Cell = Option<Puyo>;

/// Settled puyos. rows[y][x]; rows[0] is the top.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Board {
    rows: [[Cell; COLS]; ROWS],
}

impl Default for Board {
    fn default() -> Self {
        Self::new()
    }
}

impl Board {
    pub fn new() -> Self {
        Self {
            rows: [[None; COLS]; ROWS],
        }
    }

    /// True if (x, y) lies on the board.
    #[inline]
    pub fn in_bounds(x: i32, y: i32) -> bool {
        (0..COLS as i32).contains(&x) && (0..ROWS as i32).contains(&y)
    }

    /// Colour at (x, y); `None` when empty or off the board.
    #[inline]
    pub fn get(&self, x: usize, y: usize) -> Cell {
        self.rows.get(y).and_then(|row| row.get(x)).copied().flatten()
    }

    #[inline]
    pub fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if let Some(slot) = self.rows.get_mut(y).and_then(|row| row.get_mut(x)) {
            *slot = cell;
        }
    }

    /// True if (x, y) is on the board and holds nothing.
    pub fn is_vacant(&self, x: i32, y: i32) -> bool {
        Self::in_bounds(x, y) && self.rows[y as usize][x as usize].is_none()
    }

    /// Game over if anything sits in the top row.
    pub fn top_row_occupied(&self) -> bool {
        self.rows[0].iter().any(Option::is_some)
    }

    /// Compact every column toward the bottom, keeping top-to-bottom order.
    /// Returns true if anything moved.
    pub fn apply_gravity(&mut self) -> bool {
        let mut moved = false;
        for x in 0..COLS {
            let mut write = ROWS;
            for y in (0..ROWS).rev() {
                if let Some(puyo) = self.rows[y][x] {
                    write -= 1;
                    if write != y {
                        self.rows[write][x] = Some(puyo);
                        self.rows[y][x] = None;
                        moved = true;
                    }
                }
            }
        }
        moved
    }

    /// Same-colour, 4-connected groups of at least POP_THRESHOLD cells.
    /// Scan is row-major; each group lists its (x, y) cells.
    pub fn find_groups(&self) -> Vec<Vec<(usize, usize)>> {
        const NEIGHBOURS_4: [(i32, i32); 4] = [(1, 0), (-1, 0), (0, 1), (0, -1)];

        let mut visited = [[false; COLS]; ROWS];
        let mut groups = Vec::new();

        for start_y in 0..ROWS {
            for start_x in 0..COLS {
                let Some(color) = self.rows[start_y][start_x] else {
                    continue;
                };
                if visited[start_y][start_x] {
                    continue;
                }

                let mut group = Vec::new();
                let mut stack = vec![(start_x, start_y)];
                visited[start_y][start_x] = true;

                while let Some((x, y)) = stack.pop() {
                    group.push((x, y));
                    for (dx, dy) in NEIGHBOURS_4 {
                        let nx = x as i32 + dx;
                        let ny = y as i32 + dy;
                        if !Self::in_bounds(nx, ny) {
                            continue;
                        }
                        let (nx, ny) = (nx as usize, ny as usize);
                        if !visited[ny][nx] && self.rows[ny][nx] == Some(color) {
                            visited[ny][nx] = true;
                            stack.push((nx, ny));
                        }
                    }
                }

                if group.len() >= POP_THRESHOLD {
                    groups.push(group);
                }
            }
        }
        groups
    }

    /// Empty every listed cell.
    pub fn remove(&mut self, cells: &[(usize, usize)]) {
        for &(x, y) in cells {
            self.set(x, y, None);
        }
    }
}

#[cfg(test)]
impl Board {
    pub fn filled_count(&self) -> usize {
        self.rows.iter().flatten().filter(|c| c.is_some()).count()
    }

    /// Build a board from the bottom rows up: `R B Y G` are colours, `.` is empty.
    /// The last string is row 11.
    pub fn from_rows(rows: &[&str]) -> Self {
        let mut board = Self::new();
        let top = ROWS - rows.len();
        for (i, line) in rows.iter().enumerate() {
            for (x, ch) in line.chars().filter(|c| !c.is_whitespace()).enumerate() {
                let cell = match ch {
                    'R' => Some(Puyo::Red),
                    'B' => Some(Puyo::Blue),
                    'Y' => Some(Puyo::Yellow),
                    'G' => Some(Puyo::Green),
                    _ => None,
                };
                board.set(x, top + i, cell);
            }
        }
        board
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_board_is_empty() {
        let board = Board::new();
        assert_eq!(board.filled_count(), 0);
        assert!(!board.top_row_occupied());
        assert!(board.is_vacant(0, 0));
        assert!(!board.is_vacant(6, 0));
        assert!(!board.is_vacant(0, -1));
    }

    #[test]
    fn gravity_compacts_columns_in_order() {
        let mut board = Board::from_rows(&[
            "R.....", //
            "......",
            "B..G..",
            "......",
            "Y.....",
        ]);
        assert!(board.apply_gravity());
        assert_eq!(board.get(0, 9), Some(Puyo::Red));
        assert_eq!(board.get(0, 10), Some(Puyo::Blue));
        assert_eq!(board.get(0, 11), Some(Puyo::Yellow));
        assert_eq!(board.get(3, 11), Some(Puyo::Green));
        assert_eq!(board.get(3, 9), None);
        assert_eq!(board.filled_count(), 4);
    }

    #[test]
    fn gravity_is_idempotent() {
        let mut board = Board::from_rows(&[
            "R.G...", //
            "..B..Y",
            "B.....",
            ".R..G.",
        ]);
        board.apply_gravity();
        let once = board.clone();
        assert!(!board.apply_gravity());
        assert_eq!(board, once);
    }

    #[test]
    fn three_connected_never_pop() {
        let board = Board::from_rows(&["RRR...", "BBGGYY"]);
        assert!(board.find_groups().is_empty());
    }

    #[test]
    fn four_connected_pop_as_one_group() {
        let board = Board::from_rows(&["R.....", "RR....", "RB...."]);
        let groups = board.find_groups();
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].len(), 4);
        assert!(groups[0].contains(&(1, 10)));
    }

    #[test]
    fn diagonal_cells_are_not_connected() {
        let board = Board::from_rows(&["R.R...", ".R.R.."]);
        assert!(board.find_groups().is_empty());
    }

    #[test]
    fn separate_groups_are_reported_separately() {
        let board = Board::from_rows(&["GGYYYY", "GGBBRR"]);
        let mut sizes: Vec<usize> = board.find_groups().iter().map(Vec::len).collect();
        sizes.sort_unstable();
        assert_eq!(sizes, vec![4, 4]);
    }

    #[test]
    fn remove_clears_listed_cells() {
        let mut board = Board::from_rows(&["RRRR.."]);
        let groups = board.find_groups();
        board.remove(&groups[0]);
        assert_eq!(board.filled_count(), 0);
    }
}
