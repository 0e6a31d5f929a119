//! Separable 2-D wavelet transforms, lifting-scheme 1-D kernels underneath.
//!
//! Row-passes and column-passes act on disjoint axes of the grid, so their
//! composition order doesn't change the result — analysis here always runs
//! rows-then-columns per level (matching the Butterworth reference order),
//! and synthesis the mirror, columns-then-rows.

use crate::grid::Grid;

const DAUB_ALPHA: f64 = -1.58615986717275;
const DAUB_BETA: f64 = -0.05297864003258;
const DAUB_GAMMA: f64 = 0.88293362717904;
const DAUB_DELTA: f64 = 0.44350482244527;
const DAUB_EPSILON: f64 = 1.14960430535816;

const BUTTER_GAMMA: f64 = 0.1715728752538099023966225515806;
const BUTTER_ALPHA: f64 = 0.3333333333333333333333333333333;
const BUTTER_NORM: f64 = 1.4142135623730950488016887242097;
const BUTTER_LOOKAHEAD: usize = 8;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WaveletKind {
  Daubechies97,
  Butterworth,
}

fn daub97_analysis_1d(signal_in: &mut [f64], signal_out: &mut [f64]) {
  let n = signal_in.len();

  for i in (1..n.saturating_sub(2)).step_by(2) {
    signal_in[i] += DAUB_ALPHA * (signal_in[i - 1] + signal_in[i + 1]);
  }
  signal_in[n - 1] += 2.0 * DAUB_ALPHA * signal_in[n - 2];

  signal_in[0] += 2.0 * DAUB_BETA * signal_in[1];
  for i in (2..n).step_by(2) {
    signal_in[i] += DAUB_BETA * (signal_in[i + 1] + signal_in[i - 1]);
  }

  for i in (1..n.saturating_sub(2)).step_by(2) {
    signal_in[i] += DAUB_GAMMA * (signal_in[i - 1] + signal_in[i + 1]);
  }
  signal_in[n - 1] += 2.0 * DAUB_GAMMA * signal_in[n - 2];

  signal_in[0] = DAUB_EPSILON * (signal_in[0] + 2.0 * DAUB_DELTA * signal_in[1]);
  for i in (2..n).step_by(2) {
    signal_in[i] = DAUB_EPSILON * (signal_in[i] + DAUB_DELTA * (signal_in[i + 1] + signal_in[i - 1]));
  }

  for i in (1..n).step_by(2) {
    signal_in[i] /= -DAUB_EPSILON;
  }

  let half = n >> 1;
  for i in 0..half {
    signal_out[i] = signal_in[i << 1];
    signal_out[half + i] = signal_in[(i << 1) + 1];
  }
}

fn daub97_synthesis_1d(signal_in: &mut [f64], signal_out: &mut [f64]) {
  let n = signal_in.len();
  let half = n >> 1;

  for i in 0..half {
    signal_out[i << 1] = signal_in[i];
    signal_out[(i << 1) + 1] = signal_in[half + i];
  }

  for i in (1..n).step_by(2) {
    signal_out[i] *= -DAUB_EPSILON;
  }

  signal_out[0] = signal_out[0] / DAUB_EPSILON - 2.0 * DAUB_DELTA * signal_out[1];
  for i in (2..n).step_by(2) {
    signal_out[i] = signal_out[i] / DAUB_EPSILON - DAUB_DELTA * (signal_out[i + 1] + signal_out[i - 1]);
  }

  for i in (1..n.saturating_sub(2)).step_by(2) {
    signal_out[i] -= DAUB_GAMMA * (signal_out[i - 1] + signal_out[i + 1]);
  }
  signal_out[n - 1] -= 2.0 * DAUB_GAMMA * signal_out[n - 2];

  signal_out[0] -= 2.0 * DAUB_BETA * signal_out[1];
  for i in (2..n).step_by(2) {
    signal_out[i] -= DAUB_BETA * (signal_out[i + 1] + signal_out[i - 1]);
  }

  for i in (1..n.saturating_sub(2)).step_by(2) {
    signal_out[i] -= DAUB_ALPHA * (signal_out[i - 1] + signal_out[i + 1]);
  }
  signal_out[n - 1] -= 2.0 * DAUB_ALPHA * signal_out[n - 2];
}

/// Recursive causal/anticausal filter pair behind both Butterworth lifting
/// steps; `gamma` selects the F2 (`BUTTER_GAMMA`) or PHI3 (`-BUTTER_ALPHA`)
/// pole and `is_r3` picks the `filter_r3` numerator, used only by PHI3.
fn butter_filter(x: &[f64], y: &mut [f64], t: &mut [f64], is_r3: bool) {
  let n = x.len();
  let lookahead = n.min(BUTTER_LOOKAHEAD);
  let pole = if is_r3 { -BUTTER_ALPHA } else { -BUTTER_GAMMA };

  let mut init_val = x[0];
  let mut pow_val = pole;
  for i in 1..=lookahead {
    init_val += pow_val * x[i - 1];
    pow_val *= pole;
  }
  y[0] = init_val;

  if is_r3 {
    for i in 1..n {
      y[i] = x[i - 1] - BUTTER_ALPHA * y[i - 1];
    }
  } else {
    for i in 1..n {
      y[i] = x[i] - BUTTER_GAMMA * y[i - 1];
    }
  }

  let mut init_val = x[n - 1];
  let mut pow_val = pole;
  for i in 1..=lookahead {
    init_val += pow_val * x[n - i];
    pow_val *= pole;
  }
  t[n - 1] = init_val;

  if is_r3 {
    for i in (0..n - 1).rev() {
      t[i] = x[i] - BUTTER_ALPHA * t[i + 1];
    }
    for i in 0..n - 1 {
      y[i] = (-8.0 * t[i] - 8.0 / 9.0 * y[i] + x[i + 1] + 35.0 / 3.0 * x[i]) / 6.0;
    }
    y[n - 1] = (-8.0 * t[n - 1] - 8.0 / 9.0 * y[n - 1] + x[n - 1] + 35.0 / 3.0 * x[n - 1]) / 6.0;
  } else {
    for i in (0..n - 1).rev() {
      t[i] = x[i + 1] - BUTTER_GAMMA * t[i + 1];
    }
    for i in 0..n {
      y[i] = (4.0 * BUTTER_GAMMA / (1.0 + BUTTER_GAMMA)) * (y[i] + t[i]);
    }
  }
}

fn f2(x: &[f64], y: &mut [f64], t: &mut [f64]) {
  butter_filter(x, y, t, false);
}

fn phi3(x: &[f64], y: &mut [f64], t: &mut [f64]) {
  butter_filter(x, y, t, true);

  // Shift-then-halve, high index to low so each write reads the old value
  // of its neighbor before that neighbor is overwritten.
  let n = y.len();
  for i in (1..n).rev() {
    y[i] = 0.5 * y[i - 1];
  }
  y[0] *= 0.5;
}

fn butterworth_decompose(x: &mut [f64], y: &mut [f64]) {
  let n = x.len();
  let half = n >> 1;

  // `x` holds the input samples; de-interleave them into `y` before `x` is
  // reused as scratch space by `f2`/`phi3`.
  let mut source = vec![0.0; n];
  source.copy_from_slice(x);

  let (temp_1, temp_2) = x.split_at_mut(half);
  let (even, odd) = y.split_at_mut(half);

  for i in 0..half {
    even[i] = source[i << 1];
    odd[i] = source[(i << 1) + 1];
  }

  f2(even, temp_1, temp_2);
  for i in 0..half {
    odd[i] -= temp_1[i];
  }

  phi3(odd, temp_1, temp_2);
  for i in 0..half {
    even[i] += temp_1[i];
  }

  for i in 0..half {
    even[i] *= BUTTER_NORM;
    odd[i] /= BUTTER_NORM;
  }
}

fn butterworth_reconstruct(x: &mut [f64], y: &mut [f64]) {
  let n = x.len();
  let half = n >> 1;

  let (even, odd) = x.split_at_mut(half);
  let (temp_1, temp_2) = y.split_at_mut(half);

  for i in 0..half {
    even[i] /= BUTTER_NORM;
    odd[i] *= BUTTER_NORM;
  }

  phi3(odd, temp_1, temp_2);
  for i in 0..half {
    even[i] -= temp_1[i];
  }

  f2(even, temp_1, temp_2);
  for i in 0..half {
    odd[i] += temp_1[i];
  }

  for i in 0..half {
    y[i << 1] = even[i];
    y[(i << 1) + 1] = odd[i];
  }
}

fn analysis_1d(kind: WaveletKind, signal_in: &mut [f64], signal_out: &mut [f64]) {
  match kind {
    WaveletKind::Daubechies97 => daub97_analysis_1d(signal_in, signal_out),
    WaveletKind::Butterworth => butterworth_decompose(signal_in, signal_out),
  }
}

fn synthesis_1d(kind: WaveletKind, signal_in: &mut [f64], signal_out: &mut [f64]) {
  match kind {
    WaveletKind::Daubechies97 => daub97_synthesis_1d(signal_in, signal_out),
    WaveletKind::Butterworth => butterworth_reconstruct(signal_in, signal_out),
  }
}

/// In-place multi-level forward transform, DC level shift and final
/// quantization to integers (still stored as `f64`) included.
pub fn analysis_2d(kind: WaveletKind, image: &mut Grid<f64>, levels: u32) {
  let rows = image.rows();
  let cols = image.cols();
  let max = rows.max(cols);

  for r in 0..rows {
    for c in 0..cols {
      image[r][c] -= 128.0;
    }
  }

  let mut signal_in = vec![0.0; max];
  let mut signal_out = vec![0.0; max];

  let mut cur_rows = rows;
  let mut cur_cols = cols;

  for _ in 0..levels {
    for r in 0..cur_rows {
      signal_in[..cur_cols].copy_from_slice(&image[r][..cur_cols]);
      analysis_1d(kind, &mut signal_in[..cur_cols], &mut signal_out[..cur_cols]);
      image[r][..cur_cols].copy_from_slice(&signal_out[..cur_cols]);
    }

    for c in 0..cur_cols {
      image.load_col(c, &mut signal_in[..cur_rows]);
      analysis_1d(kind, &mut signal_in[..cur_rows], &mut signal_out[..cur_rows]);
      image.store_col(c, &signal_out[..cur_rows]);
    }

    cur_rows >>= 1;
    cur_cols >>= 1;
  }

  for r in 0..rows {
    for c in 0..cols {
      image[r][c] = image[r][c].round();
    }
  }
}

/// Inverse of [`analysis_2d`]: undoes the quantization rounding implicitly
/// (the coefficients are already integral by the time this runs) and the DC
/// level shift, clamping the result back to `[0, 255]`.
pub fn synthesis_2d(kind: WaveletKind, image: &mut Grid<f64>, levels: u32) {
  let rows = image.rows();
  let cols = image.cols();
  let max = rows.max(cols);

  let mut signal_in = vec![0.0; max];
  let mut signal_out = vec![0.0; max];

  let mut cur_rows = rows >> (levels - 1);
  let mut cur_cols = cols >> (levels - 1);

  for _ in 0..levels {
    for c in 0..cur_cols {
      image.load_col(c, &mut signal_in[..cur_rows]);
      synthesis_1d(kind, &mut signal_in[..cur_rows], &mut signal_out[..cur_rows]);
      image.store_col(c, &signal_out[..cur_rows]);
    }

    for r in 0..cur_rows {
      signal_in[..cur_cols].copy_from_slice(&image[r][..cur_cols]);
      synthesis_1d(kind, &mut signal_in[..cur_cols], &mut signal_out[..cur_cols]);
      image[r][..cur_cols].copy_from_slice(&signal_out[..cur_cols]);
    }

    cur_rows <<= 1;
    cur_cols <<= 1;
  }

  for r in 0..rows {
    for c in 0..cols {
      let v = (image[r][c] + 128.0).round();
      image[r][c] = v.clamp(0.0, 255.0);
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn ramp(rows: usize, cols: usize) -> Grid<f64> {
    let mut g = Grid::<f64>::zeroed(rows, cols);
    for r in 0..rows {
      for c in 0..cols {
        g[r][c] = ((r * cols + c) % 256) as f64;
      }
    }
    g
  }

  #[test]
  fn daubechies_round_trips_a_ramp() {
    let mut g = ramp(16, 16);
    let original = g.clone();

    analysis_2d(WaveletKind::Daubechies97, &mut g, 2);
    synthesis_2d(WaveletKind::Daubechies97, &mut g, 2);

    for r in 0..16 {
      for c in 0..16 {
        assert!((g[r][c] - original[r][c]).abs() <= 1.0, "({r},{c}): {} vs {}", g[r][c], original[r][c]);
      }
    }
  }

  #[test]
  fn butterworth_round_trips_a_ramp() {
    let mut g = ramp(16, 16);
    let original = g.clone();

    analysis_2d(WaveletKind::Butterworth, &mut g, 2);
    synthesis_2d(WaveletKind::Butterworth, &mut g, 2);

    for r in 0..16 {
      for c in 0..16 {
        assert!((g[r][c] - original[r][c]).abs() <= 1.0, "({r},{c}): {} vs {}", g[r][c], original[r][c]);
      }
    }
  }

  #[test]
  fn flat_image_stays_flat_after_daubechies() {
    let mut g = Grid::<f64>::zeroed(8, 8);
    for r in 0..8 {
      for c in 0..8 {
        g[r][c] = 128.0;
      }
    }

    analysis_2d(WaveletKind::Daubechies97, &mut g, 1);
    synthesis_2d(WaveletKind::Daubechies97, &mut g, 1);

    for r in 0..8 {
      for c in 0..8 {
        assert_eq!(g[r][c], 128.0);
      }
    }
  }
}
