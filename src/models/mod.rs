use serde::{Deserialize, Serialize};

/// Coordinate of the currently highlighted target word
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Hash, Eq, PartialEq)]
pub struct Pointer {
    pub row: usize,
    pub col: usize,
}

/// A row of words; insertion order is display order
pub type Row = Vec<String>;

/// The full play field. Rows that empty out are dropped and the
/// survivors keep their relative order.
pub type Grid = Vec<Row>;
