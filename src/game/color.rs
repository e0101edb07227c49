use std::fmt;

/// Contents of a single cell, doubling as the identity of a player.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Color {
    Empty,
    Black,
    White,
}

impl Color {
    /// The opposing player. `Empty` has no opponent and maps to itself.
    pub fn opposite(self) -> Color {
        match self {
            Color::Black => Color::White,
            Color::White => Color::Black,
            Color::Empty => Color::Empty,
        }
    }

    /// Whether this is a player color rather than an empty cell.
    pub fn is_player(self) -> bool {
        self != Color::Empty
    }

    /// Get color name for display
    pub fn name(self) -> &'static str {
        match self {
            Color::Black => "Black",
            Color::White => "White",
            Color::Empty => "Empty",
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
