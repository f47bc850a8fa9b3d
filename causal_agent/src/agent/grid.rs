//! Candidate intervention grid.
//!
//! Interventions form a `rows x cols` grid flattened row-major:
//! `index = col + cols * row`.

/// Row-major intervention index space.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CandidateGrid {
    rows: usize,
    cols: usize,
}

impl CandidateGrid {
    pub fn new(rows: usize, cols: usize) -> Self {
        Self { rows, cols }
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    /// Number of candidate interventions.
    pub fn len(&self) -> usize {
        self.rows * self.cols
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, index: usize) -> bool {
        index < self.len()
    }

    /// Flattened index of `(row, col)`.
    pub fn flatten(&self, row: usize, col: usize) -> usize {
        col + self.cols * row
    }

    /// `(row, col)` of a flattened index.
    pub fn unflatten(&self, index: usize) -> (usize, usize) {
        (index / self.cols, index % self.cols)
    }

    /// Cell holding the global maximum of a row-major grid of values.
    ///
    /// Ties go to the first cell in row-major order (lowest flattened index).
    /// NaN never wins; an all-NaN grid selects cell 0.
    pub fn argmax(&self, values: &[f32]) -> (usize, usize) {
        debug_assert_eq!(values.len(), self.len());

        let mut best: Option<(usize, f32)> = None;
        for (index, &value) in values.iter().enumerate() {
            if value.is_nan() {
                continue;
            }
            match best {
                Some((_, current)) if value <= current => {}
                _ => best = Some((index, value)),
            }
        }

        self.unflatten(best.map_or(0, |(index, _)| index))
    }

    /// Flattened index of the global maximum, same tie-break as [`argmax`](Self::argmax).
    pub fn argmax_index(&self, values: &[f32]) -> usize {
        let (row, col) = self.argmax(values);
        self.flatten(row, col)
    }
}
