use crate::config::Backend;
use crate::constants::TRAIL_MAX;
use rayon::prelude::*;

/// 2D trail intensity grid, row-major with the origin at the top-left.
///
/// Coordinates outside the grid wrap toroidally on read and write, so agents
/// that were reset to the corner can still sense and deposit.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TrailField {
    width: usize,
    height: usize,
    data: Vec<u8>,
}

impl TrailField {
    pub fn new(width: usize, height: usize) -> Self {
        assert!(width > 0 && height > 0, "field dimensions must be positive");
        Self {
            width,
            height,
            data: vec![0; width * height],
        }
    }

    /// Build a field from row-major cells. Panics if `cells.len() != width * height`.
    pub fn from_cells(width: usize, height: usize, cells: Vec<u8>) -> Self {
        assert!(width > 0 && height > 0, "field dimensions must be positive");
        assert_eq!(
            cells.len(),
            width * height,
            "cell buffer does not match {width}x{height}"
        );
        Self {
            width,
            height,
            data: cells,
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// In-grid read. Panics when `(x, y)` lies outside the field.
    pub fn get(&self, x: usize, y: usize) -> u8 {
        assert!(x < self.width && y < self.height, "cell ({x}, {y}) outside field");
        self.data[y * self.width + x]
    }

    pub fn set(&mut self, x: usize, y: usize, value: u8) {
        assert!(x < self.width && y < self.height, "cell ({x}, {y}) outside field");
        self.data[y * self.width + x] = value;
    }

    #[inline]
    fn wrapped_index(&self, x: i64, y: i64) -> usize {
        let cx = x.rem_euclid(self.width as i64) as usize;
        let cy = y.rem_euclid(self.height as i64) as usize;
        cy * self.width + cx
    }

    /// Read with toroidal wrapping on both axes.
    #[inline]
    pub fn get_wrapped(&self, x: i64, y: i64) -> u8 {
        self.data[self.wrapped_index(x, y)]
    }

    /// Sum of the `size x size` patch whose top-left corner is `(left, top)`.
    pub fn patch_sum(&self, left: i64, top: i64, size: u32) -> u32 {
        let size = size as i64;
        let inside = left >= 0
            && top >= 0
            && left + size <= self.width as i64
            && top + size <= self.height as i64;
        if inside {
            let (left, top, size) = (left as usize, top as usize, size as usize);
            return (top..top + size)
                .map(|y| {
                    let start = y * self.width + left;
                    self.data[start..start + size]
                        .iter()
                        .map(|&v| v as u32)
                        .sum::<u32>()
                })
                .sum();
        }
        let mut sum = 0u32;
        for dy in 0..size {
            for dx in 0..size {
                sum += self.get_wrapped(left + dx, top + dy) as u32;
            }
        }
        sum
    }

    /// Saturate every listed position. Idempotent; overlapping agents write the same value.
    pub fn deposit<I>(&mut self, positions: I)
    where
        I: IntoIterator<Item = (i32, i32)>,
    {
        for (x, y) in positions {
            let idx = self.wrapped_index(x as i64, y as i64);
            self.data[idx] = TRAIL_MAX;
        }
    }

    /// Subtract `amount` from every cell, flooring at zero.
    pub fn evaporate(&mut self, amount: u8, backend: Backend) {
        if amount == 0 {
            return;
        }
        match backend {
            Backend::Sequential => {
                for cell in &mut self.data {
                    *cell = cell.saturating_sub(amount);
                }
            }
            Backend::Parallel => {
                self.data
                    .par_chunks_mut(self.width)
                    .for_each(|row| {
                        for cell in row {
                            *cell = cell.saturating_sub(amount);
                        }
                    });
            }
        }
    }

    pub fn clear(&mut self) {
        self.data.fill(0);
    }

    /// Exchange the cell buffer with `buffer`, which must hold `width * height` cells.
    pub(crate) fn swap_cells(&mut self, buffer: &mut Vec<u8>) {
        debug_assert_eq!(buffer.len(), self.data.len());
        std::mem::swap(&mut self.data, buffer);
    }

    pub(crate) fn cells_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn total(&self) -> u64 {
        self.data.iter().map(|&v| v as u64).sum()
    }

    /// Number of cells holding any trail.
    pub fn lit_cells(&self) -> usize {
        self.data.iter().filter(|&&v| v > 0).count()
    }

    /// Number of cells at full intensity.
    pub fn saturated_cells(&self) -> usize {
        self.data.iter().filter(|&&v| v == TRAIL_MAX).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp_field(width: usize, height: usize) -> TrailField {
        let cells = (0..width * height).map(|i| (i * 37 % 256) as u8).collect();
        TrailField::from_cells(width, height, cells)
    }

    #[test]
    fn evaporate_floors_at_zero() {
        let mut field = ramp_field(16, 9);
        let before = field.clone();
        field.evaporate(40, Backend::Sequential);
        for (after, before) in field.as_slice().iter().zip(before.as_slice()) {
            assert_eq!(*after, before.saturating_sub(40));
        }
    }

    #[test]
    fn evaporate_zero_is_identity() {
        let mut field = ramp_field(7, 5);
        let before = field.clone();
        field.evaporate(0, Backend::Sequential);
        assert_eq!(field, before);
    }

    #[test]
    fn evaporate_backends_agree() {
        let mut sequential = ramp_field(33, 21);
        let mut parallel = sequential.clone();
        sequential.evaporate(13, Backend::Sequential);
        parallel.evaporate(13, Backend::Parallel);
        assert_eq!(sequential, parallel);
    }

    #[test]
    fn deposit_is_idempotent() {
        let positions = vec![(1, 1), (4, 2), (4, 2), (0, 0)];
        let mut once = TrailField::new(6, 4);
        once.deposit(positions.iter().copied());
        let mut twice = once.clone();
        twice.deposit(positions.iter().copied());
        assert_eq!(once, twice);
        assert_eq!(once.saturated_cells(), 3);
        assert_eq!(once.get(4, 2), TRAIL_MAX);
    }

    #[test]
    fn deposit_wraps_negative_coordinates() {
        let mut field = TrailField::new(5, 4);
        field.deposit([(-1, 0), (0, -1)]);
        assert_eq!(field.get(4, 0), TRAIL_MAX);
        assert_eq!(field.get(0, 3), TRAIL_MAX);
        assert_eq!(field.saturated_cells(), 2);
    }

    #[test]
    fn patch_sum_matches_cellwise_sum_inside_and_across_edges() {
        let field = ramp_field(10, 8);
        for (left, top) in [(2, 3), (-1, -1), (8, 6), (0, 0)] {
            let mut expected = 0u32;
            for dy in 0..3 {
                for dx in 0..3 {
                    expected += field.get_wrapped(left + dx, top + dy) as u32;
                }
            }
            assert_eq!(field.patch_sum(left, top, 3), expected);
        }
    }

    #[test]
    fn counters_track_cells() {
        let mut field = TrailField::new(4, 4);
        field.set(0, 0, 10);
        field.set(1, 0, TRAIL_MAX);
        assert_eq!(field.lit_cells(), 2);
        assert_eq!(field.saturated_cells(), 1);
        assert_eq!(field.total(), 10 + 255);
        field.clear();
        assert_eq!(field.total(), 0);
    }
}
