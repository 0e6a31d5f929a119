//! Binary PGM/PPM (P5/P6) reader and writer for the command-line tool.

use crate::error::{AppError, AppResult};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PnmKind {
  Gray,
  Rgb,
}

pub struct PnmImage {
  pub kind: PnmKind,
  pub width: usize,
  pub height: usize,
  pub data: Vec<u8>,
}

struct Cursor<'a> {
  buf: &'a [u8],
  pos: usize,
}

impl<'a> Cursor<'a> {
  fn new(buf: &'a [u8]) -> Self {
    Self { buf, pos: 0 }
  }

  fn get_byte(&mut self) -> Option<u8> {
    if self.pos >= self.buf.len() {
      return None;
    }
    let b = self.buf[self.pos];
    self.pos += 1;
    Some(b)
  }

  /// Mirrors `get_char`: a `#` comment runs to end-of-line and is swallowed,
  /// returning the newline that ended it rather than the `#` itself.
  fn get_char(&mut self) -> Option<u8> {
    let mut ch = self.get_byte()?;
    if ch == b'#' {
      loop {
        match self.get_byte() {
          None => return None,
          Some(b'\n') => {
            ch = b'\n';
            break;
          }
          Some(_) => continue,
        }
      }
    }
    Some(ch)
  }

  fn get_integer(&mut self) -> Option<i64> {
    let mut ch = loop {
      let c = self.get_char()?;
      if !matches!(c, b' ' | b'\t' | b'\n' | b'\r') {
        break c;
      }
    };

    if !ch.is_ascii_digit() {
      return None;
    }

    let mut val: i64 = (ch - b'0') as i64;
    loop {
      match self.get_char() {
        Some(c) if c.is_ascii_digit() => {
          val = val * 10 + (c - b'0') as i64;
          ch = c;
        }
        _ => break,
      }
    }
    let _ = ch;

    Some(val)
  }
}

fn bad(msg: &str) -> AppError {
  AppError::Usage(format!("malformed PNM file: {msg}"))
}

/// Parses a complete in-memory PGM (`P5`) or PPM (`P6`) file.
pub fn read_pnm(buf: &[u8]) -> AppResult<PnmImage> {
  let mut cur = Cursor::new(buf);

  if cur.get_byte() != Some(b'P') {
    return Err(bad("missing 'P' magic"));
  }

  let kind = match cur.get_byte() {
    Some(b'5') => PnmKind::Gray,
    Some(b'6') => PnmKind::Rgb,
    _ => return Err(bad("only P5 (PGM) and P6 (PPM) are supported")),
  };

  let width = cur.get_integer().ok_or_else(|| bad("missing width"))?;
  let height = cur.get_integer().ok_or_else(|| bad("missing height"))?;
  let max_val = cur.get_integer().ok_or_else(|| bad("missing max value"))?;

  if width < 0 || height < 0 || max_val < 0 || max_val > 255 {
    return Err(bad("width/height/max value out of range"));
  }

  let components = if kind == PnmKind::Gray { 1 } else { 3 };
  let expected_len = width as usize * height as usize * components;
  let remaining = buf.len() - cur.pos;

  if remaining != expected_len {
    return Err(bad("pixel data length does not match header"));
  }

  let data = buf[cur.pos..].to_vec();

  Ok(PnmImage { kind, width: width as usize, height: height as usize, data })
}

/// Serializes `image` back out as a binary PGM/PPM file.
pub fn write_pnm(image: &PnmImage) -> Vec<u8> {
  let magic = if image.kind == PnmKind::Gray { "P5" } else { "P6" };
  let mut out = format!("{magic}\n{} {}\n255\n", image.width, image.height).into_bytes();
  out.extend_from_slice(&image.data);
  out
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn reads_a_minimal_pgm() {
    let file = b"P5\n2 2\n255\n\x00\x40\x80\xff".to_vec();
    let img = read_pnm(&file).unwrap();
    assert_eq!(img.kind, PnmKind::Gray);
    assert_eq!(img.width, 2);
    assert_eq!(img.height, 2);
    assert_eq!(img.data, vec![0x00, 0x40, 0x80, 0xff]);
  }

  #[test]
  fn reads_a_ppm_with_a_comment_in_the_header() {
    let file = b"P6\n# test image\n2 1\n255\n\x01\x02\x03\x04\x05\x06".to_vec();
    let img = read_pnm(&file).unwrap();
    assert_eq!(img.kind, PnmKind::Rgb);
    assert_eq!(img.width, 2);
    assert_eq!(img.height, 1);
    assert_eq!(img.data, vec![1, 2, 3, 4, 5, 6]);
  }

  #[test]
  fn round_trips_write_then_read() {
    let image = PnmImage { kind: PnmKind::Gray, width: 3, height: 1, data: vec![10, 20, 30] };
    let bytes = write_pnm(&image);
    let parsed = read_pnm(&bytes).unwrap();
    assert_eq!(parsed.data, image.data);
    assert_eq!(parsed.width, image.width);
  }

  #[test]
  fn rejects_truncated_pixel_data() {
    let file = b"P5\n4 4\n255\n\x00\x00".to_vec();
    assert!(read_pnm(&file).is_err());
  }
}
