//! Board geometry. Every function here is pure and total.

use crate::Position;

/// True iff both coordinates lie in `[0, board_size)`.
pub fn in_bounds(point: Position, board_size: i32) -> bool {
    (0..board_size).contains(&point.x) && (0..board_size).contains(&point.y)
}

/// Half-width of the square a hazard of `kind` covers.
///
/// Kind 1 covers only the centre cell; each further kind grows the square by
/// one cell on every side.
pub fn blast_radius(kind: u8) -> i32 {
    i32::from(kind) - 1
}

/// True iff `point` lies inside the blast square centred on `center`,
/// clipped to the board.
pub fn in_blast_radius(point: Position, kind: u8, center: Position, board_size: i32) -> bool {
    in_bounds(point, board_size) && point.chebyshev_distance(center) <= blast_radius(kind)
}
