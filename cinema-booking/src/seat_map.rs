use rand::seq::index::sample;
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;

pub const ROWS: u8 = 8;
pub const COLS: u8 = 10;
pub const OCCUPANCY_RATE: f64 = 0.3;
pub const MAX_TICKETS: u8 = 10;

/// A seat addressed by row letter and 1-based column, written `"A1"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct SeatId {
    pub row: char,
    pub col: u8,
}

impl SeatId {
    pub fn new(row: char, col: u8) -> Self {
        Self { row, col }
    }

    fn from_index(index: usize, cols: u8) -> Self {
        let cols = cols as usize;
        Self {
            row: (b'A' + (index / cols) as u8) as char,
            col: (index % cols) as u8 + 1,
        }
    }

    fn within(&self, rows: u8, cols: u8) -> bool {
        let last_row = (b'A' + rows - 1) as char;
        ('A'..=last_row).contains(&self.row) && (1..=cols).contains(&self.col)
    }
}

impl fmt::Display for SeatId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.row, self.col)
    }
}

impl FromStr for SeatId {
    type Err = SeatError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        let mut chars = s.chars();
        let row = chars
            .next()
            .filter(char::is_ascii_alphabetic)
            .ok_or_else(|| SeatError::InvalidSeat(s.to_string()))?
            .to_ascii_uppercase();
        let col = chars
            .as_str()
            .parse::<u8>()
            .map_err(|_| SeatError::InvalidSeat(s.to_string()))?;
        Ok(Self { row, col })
    }
}

impl TryFrom<String> for SeatId {
    type Error = SeatError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<SeatId> for String {
    fn from(seat: SeatId) -> Self {
        seat.to_string()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeatState {
    Available,
    Occupied,
    Selected,
}

/// Seat grid for one visit of the seat page.
///
/// Occupancy is random and regenerated on every mount; nothing is reserved.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct SeatMap {
    rows: u8,
    cols: u8,
    occupied: BTreeSet<SeatId>,
    // Selection order matters for display.
    selected: Vec<SeatId>,
    ticket_count: u8,
    max_tickets: u8,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatView {
    pub id: SeatId,
    pub state: SeatState,
}

#[derive(Debug, Clone, Serialize)]
pub struct SeatRowView {
    pub row: char,
    pub seats: Vec<SeatView>,
}

impl SeatMap {
    /// Builds the standard 8x10 room with fresh random occupancy.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R, max_tickets: u8) -> Self {
        let mut map = Self {
            rows: ROWS,
            cols: COLS,
            occupied: BTreeSet::new(),
            selected: Vec::new(),
            ticket_count: 1,
            max_tickets: max_tickets.clamp(1, MAX_TICKETS),
        };
        map.remount(rng);
        map
    }

    /// New occupancy, empty selection. The ticket count survives.
    pub fn remount<R: Rng + ?Sized>(&mut self, rng: &mut R) {
        let total = self.rows as usize * self.cols as usize;
        let amount = (total as f64 * OCCUPANCY_RATE).floor() as usize;
        self.occupied = sample(rng, total, amount)
            .into_iter()
            .map(|index| SeatId::from_index(index, self.cols))
            .collect();
        self.selected.clear();
    }

    pub fn ticket_count(&self) -> u8 {
        self.ticket_count
    }

    pub fn max_tickets(&self) -> u8 {
        self.max_tickets
    }

    pub fn occupied(&self) -> &BTreeSet<SeatId> {
        &self.occupied
    }

    pub fn selected(&self) -> &[SeatId] {
        &self.selected
    }

    pub fn set_ticket_count(&mut self, count: u8) -> Result<(), SeatError> {
        if !(1..=self.max_tickets).contains(&count) {
            return Err(SeatError::InvalidTicketCount {
                count,
                max: self.max_tickets,
            });
        }
        // A smaller count keeps the current selection; continue stays blocked until it matches.
        self.ticket_count = count;
        Ok(())
    }

    pub fn increment(&mut self) -> u8 {
        self.ticket_count = (self.ticket_count + 1).min(self.max_tickets);
        self.ticket_count
    }

    pub fn decrement(&mut self) -> u8 {
        self.ticket_count = self.ticket_count.saturating_sub(1).max(1);
        self.ticket_count
    }

    pub fn state_of(&self, seat: &SeatId) -> SeatState {
        if self.selected.contains(seat) {
            SeatState::Selected
        } else if self.occupied.contains(seat) {
            SeatState::Occupied
        } else {
            SeatState::Available
        }
    }

    /// Selects or deselects a seat and returns its new state.
    pub fn toggle(&mut self, seat: SeatId) -> Result<SeatState, SeatError> {
        if !seat.within(self.rows, self.cols) {
            return Err(SeatError::InvalidSeat(seat.to_string()));
        }
        if let Some(position) = self.selected.iter().position(|s| *s == seat) {
            self.selected.remove(position);
            return Ok(SeatState::Available);
        }
        if self.occupied.contains(&seat) {
            return Err(SeatError::Occupied(seat));
        }
        if self.selected.len() >= self.ticket_count as usize {
            return Err(SeatError::LimitReached {
                limit: self.ticket_count,
            });
        }
        self.selected.push(seat);
        Ok(SeatState::Selected)
    }

    pub fn can_continue(&self) -> bool {
        self.selected.len() == self.ticket_count as usize
    }

    pub fn grid(&self) -> Vec<SeatRowView> {
        (0..self.rows)
            .map(|r| {
                let row = (b'A' + r) as char;
                let seats = (1..=self.cols)
                    .map(|col| {
                        let id = SeatId::new(row, col);
                        SeatView {
                            id,
                            state: self.state_of(&id),
                        }
                    })
                    .collect();
                SeatRowView { row, seats }
            })
            .collect()
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum SeatError {
    #[error("Invalid seat: {0}")]
    InvalidSeat(String),

    #[error("Seat {0} is already occupied")]
    Occupied(SeatId),

    #[error("Seat limit reached: {limit} tickets selected")]
    LimitReached { limit: u8 },

    #[error("Ticket count {count} out of range 1..={max}")]
    InvalidTicketCount { count: u8, max: u8 },
}
