//! RGB <-> YCbCr conversion for the truecolor pipeline, in place over
//! interleaved `[r, g, b]` byte triples.

fn round(x: f64) -> f64 {
  if x < 0.0 {
    (x - 0.5).trunc()
  } else {
    (x + 0.5).trunc()
  }
}

fn fix(x: f64) -> u8 {
  x.clamp(0.0, 255.0) as u8
}

/// Converts `buf` from interleaved RGB to interleaved YCbCr. `buf.len()` must
/// be a multiple of 3.
pub fn rgb_to_ycbcr(buf: &mut [u8]) {
  for px in buf.chunks_exact_mut(3) {
    let r = px[0] as f64;
    let g = px[1] as f64;
    let b = px[2] as f64;

    let lum = round(0.299 * r + 0.587 * g + 0.114 * b);
    let cb = round((b - lum) / 1.772 + 127.5);
    let cr = round((r - lum) / 1.402 + 127.5);

    px[0] = fix(lum);
    px[1] = fix(cb);
    px[2] = fix(cr);
  }
}

/// Inverse of [`rgb_to_ycbcr`].
pub fn ycbcr_to_rgb(buf: &mut [u8]) {
  for px in buf.chunks_exact_mut(3) {
    let lum = px[0] as f64;
    let cb = px[1] as f64 - 127.5;
    let cr = px[2] as f64 - 127.5;

    let r = round(lum + cr * 1.402);
    let b = round(lum + cb * 1.772);
    let g = round((lum - 0.114 * b - 0.299 * r) / 0.587);

    px[0] = fix(r);
    px[1] = fix(g);
    px[2] = fix(b);
  }
}
