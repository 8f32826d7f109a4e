//! Text rendering of the board for a human watching the leader's log.

use log::info;
use shared::{Hazard, Position, RosterEntry};

/// Receives the state of the board once per round.
pub trait Renderer: Send {
    fn render(&mut self, roster: &[RosterEntry], hazard: &Hazard, leader: Position);
}

/// Draws the board as a grid of characters:
/// `.` empty, `*` blast area, `L` leader, `1`-`9` members (`M` above 9),
/// `#` where more than one unit stands.
#[derive(Debug, Clone)]
pub struct TextBoard {
    board_size: i32,
    round: u32,
}

impl TextBoard {
    pub fn new(board_size: i32) -> Self {
        Self {
            board_size,
            round: 0,
        }
    }

    pub fn draw(&self, roster: &[RosterEntry], hazard: &Hazard, leader: Position) -> String {
        let n = self.board_size.max(0) as usize;
        let mut grid = vec![vec!['.'; n]; n];

        for (y, row) in grid.iter_mut().enumerate() {
            for (x, cell) in row.iter_mut().enumerate() {
                if hazard.covers(Position::new(x as i32, y as i32), self.board_size) {
                    *cell = '*';
                }
            }
        }

        let members = roster
            .iter()
            .filter_map(|e| e.last_known_position.map(|p| (p, Self::marker(e.id))));
        for (position, marker) in std::iter::once((leader, 'L')).chain(members) {
            if let Some(cell) = Self::cell(&mut grid, position) {
                *cell = match *cell {
                    '.' | '*' => marker,
                    _ => '#',
                };
            }
        }

        grid.iter()
            .map(|row| row.iter().collect::<String>())
            .collect::<Vec<_>>()
            .join("\n")
    }

    fn marker(id: u32) -> char {
        char::from_digit(id, 10).unwrap_or('M')
    }

    fn cell(grid: &mut [Vec<char>], position: Position) -> Option<&mut char> {
        let x = usize::try_from(position.x).ok()?;
        let y = usize::try_from(position.y).ok()?;
        grid.get_mut(y)?.get_mut(x)
    }
}

impl Renderer for TextBoard {
    fn render(&mut self, roster: &[RosterEntry], hazard: &Hazard, leader: Position) {
        self.round += 1;
        info!(
            "Round {}: hazard kind {} at ({}, {}), {} members in play",
            self.round,
            hazard.kind,
            hazard.center.x,
            hazard.center.y,
            roster.len()
        );
        for line in self.draw(roster, hazard, leader).lines() {
            info!("  {}", line);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(id: u32, x: i32, y: i32) -> RosterEntry {
        RosterEntry {
            id,
            address: String::new(),
            last_known_position: Some(Position::new(x, y)),
        }
    }

    #[test]
    fn test_draw_marks_units_and_blast() {
        let board = TextBoard::new(5);
        let hazard = Hazard::new(2, Position::new(2, 2));
        let drawn = board.draw(&[entry(1, 4, 0), entry(2, 0, 4)], &hazard, Position::new(0, 0));

        let rows: Vec<&str> = drawn.lines().collect();
        assert_eq!(rows.len(), 5);
        assert_eq!(rows[0], "L...1");
        assert_eq!(rows[1], ".***.");
        assert_eq!(rows[2], ".***.");
        assert_eq!(rows[3], ".***.");
        assert_eq!(rows[4], "2....");
    }

    #[test]
    fn test_draw_shared_cell() {
        let board = TextBoard::new(5);
        let hazard = Hazard::new(1, Position::new(4, 4));
        let drawn = board.draw(&[entry(3, 1, 1)], &hazard, Position::new(1, 1));
        assert_eq!(drawn.lines().nth(1), Some(".#..."));
    }

    #[test]
    fn test_unknown_positions_skipped() {
        let board = TextBoard::new(5);
        let hazard = Hazard::new(1, Position::new(4, 4));
        let drawn = board.draw(&[RosterEntry::new(12, "x:1")], &hazard, Position::new(0, 0));
        assert_eq!(drawn.matches('L').count(), 1);
        assert!(!drawn.contains('M'));
    }
}
