//! 22-byte stream header: magic, geometry, wavelet/image-type tags, per-channel
//! payload sizes, and a mod-13 checksum byte.

use byteorder::{BigEndian, ByteOrder};

use crate::error::{CodecError, CodecResult};
use crate::wavelet::WaveletKind;

pub const HEADER_SIZE: usize = 22;

const MAGIC: [u8; 2] = [0x54, 0x69]; // "Ti"

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ImageKind {
  Grayscale,
  Truecolor,
}

impl ImageKind {
  fn to_byte(self) -> u8 {
    match self {
      ImageKind::Grayscale => 0,
      ImageKind::Truecolor => 1,
    }
  }

  fn from_byte(b: u8) -> CodecResult<Self> {
    match b {
      0 => Ok(ImageKind::Grayscale),
      1 => Ok(ImageKind::Truecolor),
      _ => Err(CodecError::DamagedHeader),
    }
  }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Header {
  pub width: u16,
  pub height: u16,
  pub scales: u8,
  pub image_kind: ImageKind,
  pub wavelet: WaveletKind,
  pub lum_size: u32,
  pub cb_size: u32,
  pub cr_size: u32,
}

fn check_sum(buf: &[u8]) -> u8 {
  if buf.is_empty() {
    return 1;
  }

  let mut s1: u32 = 1;
  let mut s2: u32 = 0;
  for &b in buf {
    s1 = (s1 + b as u32) % 13;
    s2 = (s1 + s2) % 13;
  }

  ((s2 << 4) + s1) as u8
}

impl Header {
  pub fn write(&self, out: &mut [u8]) {
    debug_assert!(out.len() >= HEADER_SIZE);

    out[0] = MAGIC[0];
    out[1] = MAGIC[1];
    BigEndian::write_u16(&mut out[2..4], self.width);
    BigEndian::write_u16(&mut out[4..6], self.height);
    out[6] = self.scales;
    out[7] = self.image_kind.to_byte();
    out[8] = match self.wavelet {
      WaveletKind::Butterworth => 0,
      WaveletKind::Daubechies97 => 1,
    };
    BigEndian::write_u32(&mut out[9..13], self.lum_size);
    BigEndian::write_u32(&mut out[13..17], self.cb_size);
    BigEndian::write_u32(&mut out[17..21], self.cr_size);
    out[21] = check_sum(&out[..HEADER_SIZE - 1]);
  }

  pub fn read(buf: &[u8]) -> CodecResult<Self> {
    if buf.len() < HEADER_SIZE {
      return Err(CodecError::DamagedHeader);
    }

    if buf[0] != MAGIC[0] || buf[1] != MAGIC[1] {
      return Err(CodecError::DamagedHeader);
    }

    if check_sum(&buf[..HEADER_SIZE - 1]) != buf[21] {
      return Err(CodecError::DamagedHeader);
    }

    let width = BigEndian::read_u16(&buf[2..4]);
    let height = BigEndian::read_u16(&buf[4..6]);
    let scales = buf[6];
    let image_kind = ImageKind::from_byte(buf[7])?;
    let wavelet = match buf[8] {
      0 => WaveletKind::Butterworth,
      1 => WaveletKind::Daubechies97,
      _ => return Err(CodecError::DamagedHeader),
    };
    let lum_size = BigEndian::read_u32(&buf[9..13]);
    let cb_size = BigEndian::read_u32(&buf[13..17]);
    let cr_size = BigEndian::read_u32(&buf[17..21]);

    Ok(Self { width, height, scales, image_kind, wavelet, lum_size, cb_size, cr_size })
  }

  /// Just the geometry and image kind, the way `TiCheckHeader` validates a
  /// stream without committing to a full decode.
  pub fn peek(buf: &[u8]) -> CodecResult<(u16, u16, ImageKind)> {
    let header = Self::read(buf)?;
    Ok((header.width, header.height, header.image_kind))
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn round_trips_through_bytes() {
    let header = Header {
      width: 640,
      height: 480,
      scales: 5,
      image_kind: ImageKind::Truecolor,
      wavelet: WaveletKind::Daubechies97,
      lum_size: 12345,
      cb_size: 678,
      cr_size: 9,
    };

    let mut buf = [0u8; HEADER_SIZE];
    header.write(&mut buf);

    let parsed = Header::read(&buf).unwrap();
    assert_eq!(parsed.width, 640);
    assert_eq!(parsed.height, 480);
    assert_eq!(parsed.scales, 5);
    assert_eq!(parsed.image_kind, ImageKind::Truecolor);
    assert_eq!(parsed.wavelet, WaveletKind::Daubechies97);
    assert_eq!(parsed.lum_size, 12345);
    assert_eq!(parsed.cb_size, 678);
    assert_eq!(parsed.cr_size, 9);
  }

  #[test]
  fn flipping_any_byte_trips_the_checksum() {
    let header = Header {
      width: 16,
      height: 16,
      scales: 2,
      image_kind: ImageKind::Grayscale,
      wavelet: WaveletKind::Butterworth,
      lum_size: 100,
      cb_size: 0,
      cr_size: 0,
    };

    let mut buf = [0u8; HEADER_SIZE];
    header.write(&mut buf);

    buf[3] ^= 0xFF;
    assert_eq!(Header::read(&buf), Err(CodecError::DamagedHeader));
  }

  #[test]
  fn rejects_a_stream_shorter_than_the_header() {
    let buf = [0u8; HEADER_SIZE - 1];
    assert_eq!(Header::read(&buf), Err(CodecError::DamagedHeader));
  }
}
