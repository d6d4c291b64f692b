//! Draw: one historical lottery outcome.

use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

use super::features::DrawFeatures;

/// Candidates are the numbers `1..=DOMAIN_SIZE`.
pub const DOMAIN_SIZE: usize = 60;

/// Numbers per draw and per ticket.
pub const TICKET_SIZE: usize = 6;

/// Why a set of numbers is not a valid draw.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DrawError {
    #[error("draw {id}: expected 6 numbers, got {got}")]
    WrongCount { id: u32, got: usize },
    #[error("draw {id}: number {number} is outside 1..=60")]
    OutOfRange { id: u32, number: i64 },
    #[error("draw {id}: number {number} appears more than once")]
    Duplicate { id: u32, number: u8 },
}

/// A validated historical draw.
///
/// `numbers` is private so the invariant (exactly six distinct values in
/// `1..=60`, stored ascending) can only be established through [`Draw::new`].
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Draw {
    pub id: u32,
    pub date: NaiveDate,
    numbers: [u8; TICKET_SIZE],
    pub features: Option<DrawFeatures>,
}

impl Draw {
    pub fn new(
        id: u32,
        date: NaiveDate,
        numbers: &[i64],
        features: Option<DrawFeatures>,
    ) -> Result<Self, DrawError> {
        if numbers.len() != TICKET_SIZE {
            return Err(DrawError::WrongCount {
                id,
                got: numbers.len(),
            });
        }

        let mut validated = [0u8; TICKET_SIZE];
        let mut seen = [false; DOMAIN_SIZE + 1];
        for (slot, &raw) in validated.iter_mut().zip(numbers) {
            if !(1..=DOMAIN_SIZE as i64).contains(&raw) {
                return Err(DrawError::OutOfRange { id, number: raw });
            }
            let n = raw as u8;
            if seen[n as usize] {
                return Err(DrawError::Duplicate { id, number: n });
            }
            seen[n as usize] = true;
            *slot = n;
        }
        validated.sort_unstable();

        Ok(Self {
            id,
            date,
            numbers: validated,
            features,
        })
    }

    /// The six drawn numbers, ascending.
    pub fn numbers(&self) -> &[u8; TICKET_SIZE] {
        &self.numbers
    }
}
