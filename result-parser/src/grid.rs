// Copyright (c) James Kassemi, SC, US. All rights reserved.

//! Best-effort board decoding. Lossy on purpose: only the raw grid is stored,
//! nothing downstream depends on it being exact.

use core_types::{GRID_COLUMNS, MAX_TRIES, ScoreMatrix, Square};

const VARIATION_SELECTOR: char = '\u{FE0F}';
const ZERO_WIDTH_JOINER: char = '\u{200D}';

pub struct GridDecoder;

impl GridDecoder {
    /// Decodes board rows until a blank line, a line with no board squares, or
    /// `MAX_TRIES` rows. Rows are cut or padded to `GRID_COLUMNS`.
    pub fn decode<'a, I>(lines: I) -> ScoreMatrix
    where
        I: IntoIterator<Item = &'a str>,
    {
        let mut grid = ScoreMatrix::default();
        for line in lines.into_iter().take(MAX_TRIES as usize) {
            let cells: Vec<char> = line
                .trim()
                .chars()
                .filter(|ch| *ch != VARIATION_SELECTOR && *ch != ZERO_WIDTH_JOINER)
                .collect();
            if cells.is_empty() || !cells.iter().any(|ch| classify(*ch).is_some()) {
                break;
            }
            let mut row = [Square::Empty; GRID_COLUMNS];
            for (slot, ch) in row.iter_mut().zip(cells) {
                *slot = classify(ch).unwrap_or(Square::Empty);
            }
            grid.push_row(row);
        }
        grid
    }
}

fn classify(ch: char) -> Option<Square> {
    match ch {
        '⬛' | '⬜' => Some(Square::Empty),
        // 🟦 is the high-contrast "present"
        '🟨' | '🟦' => Some(Square::Present),
        // 🟧 is the high-contrast "correct"
        '🟩' | '🟧' => Some(Square::Correct),
        _ => None,
    }
}
