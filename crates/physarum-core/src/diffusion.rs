//! Box-blur diffusion of the trail field.
//!
//! Both strategies share one blur kernel: for every interior cell (at least
//! `kernel_size / 2` away from each edge) the sum over the square window of
//! radius `kernel_size / 2` is divided by `kernel_size^2`, truncated, and
//! clamped to 255. For odd sizes that is the plain window mean; even sizes keep
//! the wider `2r + 1` window with the `k^2` divisor, which is why the clamp is
//! needed. The blur is computed separably (sliding horizontal sums, then
//! vertical accumulation) into a buffer distinct from the field, so the field
//! being convolved is never read after it has been written.

use crate::config::{Backend, DiffusionMode, SimConfig};
use crate::constants::TRAIL_MAX;
use crate::field::TrailField;
use rayon::prelude::*;

pub trait DiffusionStrategy {
    /// Diffuse `field` in place using a `kernel_size x kernel_size` box blur.
    fn diffuse(&mut self, field: &mut TrailField, kernel_size: usize, backend: Backend);
}

/// Pure-replace blur: interior cells take the blurred value, border cells keep theirs.
#[derive(Clone, Debug, Default)]
pub struct ReplaceBlur {
    row_sums: Vec<u32>,
    output: Vec<u8>,
}

impl DiffusionStrategy for ReplaceBlur {
    fn diffuse(&mut self, field: &mut TrailField, kernel_size: usize, backend: Backend) {
        self.output.clear();
        self.output.extend_from_slice(field.as_slice());
        blur_interior(
            field.as_slice(),
            field.width(),
            field.height(),
            kernel_size,
            &mut self.row_sums,
            &mut self.output,
            backend,
        );
        field.swap_cells(&mut self.output);
    }
}

/// Additive blend: the blurred field is added onto the deposited field, while
/// cells whose blurred neighborhood is weak fade by a fixed amount instead.
#[derive(Clone, Debug)]
pub struct AdditiveBlend {
    threshold: u8,
    fade: u8,
    row_sums: Vec<u32>,
    blurred: Vec<u8>,
}

impl AdditiveBlend {
    pub fn new(threshold: u8, fade: u8) -> Self {
        Self {
            threshold,
            fade,
            row_sums: Vec::new(),
            blurred: Vec::new(),
        }
    }
}

impl DiffusionStrategy for AdditiveBlend {
    fn diffuse(&mut self, field: &mut TrailField, kernel_size: usize, backend: Backend) {
        self.blurred.clear();
        self.blurred.resize(field.as_slice().len(), 0);
        blur_interior(
            field.as_slice(),
            field.width(),
            field.height(),
            kernel_size,
            &mut self.row_sums,
            &mut self.blurred,
            backend,
        );

        let (threshold, fade) = (self.threshold, self.fade);
        let blend = |cell: &mut u8, blurred: u8| {
            let sum = *cell as u16 + blurred as u16;
            *cell = if sum > TRAIL_MAX as u16 {
                TRAIL_MAX
            } else if blurred <= threshold {
                cell.saturating_sub(fade)
            } else {
                sum as u8
            };
        };
        let width = field.width();
        match backend {
            Backend::Sequential => {
                for (cell, &b) in field.cells_mut().iter_mut().zip(&self.blurred) {
                    blend(cell, b);
                }
            }
            Backend::Parallel => {
                field
                    .cells_mut()
                    .par_chunks_mut(width)
                    .zip(self.blurred.par_chunks(width))
                    .for_each(|(row, blurred_row)| {
                        for (cell, &b) in row.iter_mut().zip(blurred_row) {
                            blend(cell, b);
                        }
                    });
            }
        }
    }
}

/// Diffusion strategy selected by [`DiffusionMode`].
#[derive(Clone, Debug)]
pub enum Diffuser {
    Replace(ReplaceBlur),
    AdditiveBlend(AdditiveBlend),
}

impl Diffuser {
    pub fn from_config(config: &SimConfig) -> Self {
        match config.diffusion_mode {
            DiffusionMode::Replace => Diffuser::Replace(ReplaceBlur::default()),
            DiffusionMode::AdditiveBlend => {
                Diffuser::AdditiveBlend(AdditiveBlend::new(config.blend_threshold, config.blend_fade))
            }
        }
    }
}

impl DiffusionStrategy for Diffuser {
    fn diffuse(&mut self, field: &mut TrailField, kernel_size: usize, backend: Backend) {
        match self {
            Diffuser::Replace(strategy) => strategy.diffuse(field, kernel_size, backend),
            Diffuser::AdditiveBlend(strategy) => strategy.diffuse(field, kernel_size, backend),
        }
    }
}

/// Write the blurred value of every interior cell of `src` into `out`.
/// Cells of `out` outside the interior are left untouched.
fn blur_interior(
    src: &[u8],
    width: usize,
    height: usize,
    kernel_size: usize,
    row_sums: &mut Vec<u32>,
    out: &mut [u8],
    backend: Backend,
) {
    debug_assert_eq!(src.len(), width * height);
    debug_assert_eq!(out.len(), width * height);
    let radius = kernel_size / 2;
    if kernel_size == 0 || 2 * radius >= width || 2 * radius >= height {
        return;
    }
    let divisor = (kernel_size * kernel_size) as u64;

    row_sums.clear();
    row_sums.resize(width * height, 0);
    match backend {
        Backend::Sequential => {
            for (sums, row) in row_sums.chunks_mut(width).zip(src.chunks(width)) {
                horizontal_window_sums(row, sums, radius);
            }
        }
        Backend::Parallel => {
            row_sums
                .par_chunks_mut(width)
                .zip(src.par_chunks(width))
                .for_each(|(sums, row)| horizontal_window_sums(row, sums, radius));
        }
    }

    let row_sums = &row_sums[..];
    let vertical = |y: usize, out_row: &mut [u8], acc: &mut Vec<u64>| {
        if y < radius || y >= height - radius {
            return;
        }
        acc.clear();
        acc.resize(width, 0);
        for sums in row_sums[(y - radius) * width..(y + radius + 1) * width].chunks(width) {
            for x in radius..width - radius {
                acc[x] += sums[x] as u64;
            }
        }
        for x in radius..width - radius {
            out_row[x] = (acc[x] / divisor).min(TRAIL_MAX as u64) as u8;
        }
    };
    match backend {
        Backend::Sequential => {
            let mut acc = Vec::with_capacity(width);
            for (y, out_row) in out.chunks_mut(width).enumerate() {
                vertical(y, out_row, &mut acc);
            }
        }
        Backend::Parallel => {
            out.par_chunks_mut(width).enumerate().for_each_init(
                || Vec::with_capacity(width),
                |acc, (y, out_row)| vertical(y, out_row, acc),
            );
        }
    }
}

/// `sums[x]` = sum of `row[x - radius ..= x + radius]` for interior `x`.
fn horizontal_window_sums(row: &[u8], sums: &mut [u32], radius: usize) {
    let width = row.len();
    let mut window: u32 = row[..=2 * radius].iter().map(|&v| v as u32).sum();
    sums[radius] = window;
    for x in radius + 1..width - radius {
        window += row[x + radius] as u32;
        window -= row[x - radius - 1] as u32;
        sums[x] = window;
    }
}
