//! Adaptive binary arithmetic coder (Witten-Neal-Cleary), 16-bit registers.
//!
//! I.H. Witten, R.M. Neal, J.H. Cleary, "Arithmetic coding for data
//! compression", CACM vol. 30, 1987.

use crate::bitstream::{BitReader, BitWriter};
use crate::error::{CodecError, CodecResult};

const CODE_BITS: u32 = 16;
const TOP_VALUE: i32 = 0xFFFF;
const FIRST_QTR: i32 = 0x4000;
const HALF: i32 = 0x8000;
const THIRD_QTR: i32 = 0xC000;
const MAX_FREQ: i32 = 128;

/// The adaptive two-symbol frequency model shared by the encoder and decoder.
/// Both sides must call [`Model::update`] with the same symbol immediately
/// after coding it, or they desynchronize.
#[derive(Clone, Copy, Debug)]
pub struct Model {
  cum_freq: [i32; 3],
}

impl Model {
  pub fn new() -> Self {
    Self { cum_freq: [0, 1, 2] }
  }

  pub fn update(&mut self, symbol: u32) {
    for i in (symbol as usize + 1)..=2 {
      self.cum_freq[i] += 1;
    }

    if self.cum_freq[2] >= MAX_FREQ {
      self.cum_freq[0] = 0;
      for i in 1..=2 {
        self.cum_freq[i] >>= 1;
        if self.cum_freq[i] <= self.cum_freq[i - 1] {
          self.cum_freq[i] = self.cum_freq[i - 1] + 1;
        }
      }
    }
  }
}

impl Default for Model {
  fn default() -> Self {
    Self::new()
  }
}

pub struct ArithEncoder<'a> {
  writer: BitWriter<'a>,
  low: i32,
  high: i32,
  underflow_bits: u32,
}

impl<'a> ArithEncoder<'a> {
  pub fn new(writer: BitWriter<'a>) -> Self {
    Self { writer, low: 0, high: TOP_VALUE, underflow_bits: 0 }
  }

  fn bit_plus_follow(&mut self, bit: u32) -> CodecResult<()> {
    self.writer.write_bit(bit)?;
    while self.underflow_bits > 0 {
      self.writer.write_bit(1 - bit)?;
      self.underflow_bits -= 1;
    }
    Ok(())
  }

  /// Encode a single binary `symbol` (0 or 1) under the current model and
  /// renormalize. Returns [`CodecError::BufferFull`] if the underlying bit
  /// stream runs out of room — a graceful stopping point, not a fatal error.
  pub fn encode(&mut self, model: &Model, symbol: u32) -> CodecResult<()> {
    let range = self.high - self.low + 1;
    let cum = &model.cum_freq;

    self.high = self.low + (range * cum[symbol as usize + 1]) / cum[2] - 1;
    self.low += (range * cum[symbol as usize]) / cum[2];

    loop {
      if self.high < HALF {
        self.bit_plus_follow(0)?;
      } else if self.low >= HALF {
        self.bit_plus_follow(1)?;
        self.low -= HALF;
        self.high -= HALF;
      } else if self.low >= FIRST_QTR && self.high < THIRD_QTR {
        self.underflow_bits += 1;
        self.low -= FIRST_QTR;
        self.high -= FIRST_QTR;
      } else {
        break;
      }

      self.low <<= 1;
      self.high = (self.high << 1) + 1;
    }

    Ok(())
  }

  /// Flush the final 16 bits of state and pad the bit stream to a byte
  /// boundary. Call exactly once, after the last `encode`.
  pub fn finish(&mut self) -> CodecResult<()> {
    for _ in 0..CODE_BITS {
      if self.low >= HALF {
        self.bit_plus_follow(1)?;
        self.low -= HALF;
      } else {
        self.bit_plus_follow(0)?;
      }
      self.low <<= 1;
    }

    self.writer.flush()
  }

  pub fn bytes_written(&self) -> usize {
    self.writer.bytes_written()
  }
}

pub struct ArithDecoder<'a> {
  reader: BitReader<'a>,
  low: i32,
  high: i32,
  value: i32,
}

impl<'a> ArithDecoder<'a> {
  pub fn new(mut reader: BitReader<'a>) -> CodecResult<Self> {
    let mut value = 0i32;
    for _ in 0..CODE_BITS {
      value = (value << 1) | reader.read_bit()? as i32;
    }
    Ok(Self { reader, low: 0, high: TOP_VALUE, value })
  }

  /// Decode a single binary symbol under the current model and renormalize.
  /// Returns [`CodecError::BufferEmpty`] when the bit stream is exhausted —
  /// a graceful stopping point matching the encoder's `BufferFull`.
  pub fn decode(&mut self, model: &Model) -> CodecResult<u32> {
    let range = self.high - self.low + 1;
    let cum = &model.cum_freq;

    let cum_scaled = ((self.value - self.low + 1) * cum[2] - 1) / range;

    let symbol: u32 = if cum[1] <= cum_scaled { 1 } else { 0 };

    self.high = self.low + (range * cum[symbol as usize + 1]) / cum[2] - 1;
    self.low += (range * cum[symbol as usize]) / cum[2];

    loop {
      if self.high < HALF {
        // nothing to subtract from `value`
      } else if self.low >= HALF {
        self.value -= HALF;
        self.low -= HALF;
        self.high -= HALF;
      } else if self.low >= FIRST_QTR && self.high < THIRD_QTR {
        self.value -= FIRST_QTR;
        self.low -= FIRST_QTR;
        self.high -= FIRST_QTR;
      } else {
        break;
      }

      self.low <<= 1;
      self.high = (self.high << 1) + 1;

      let bit = self.reader.read_bit()?;
      self.value = (self.value << 1) | bit as i32;
    }

    Ok(symbol)
  }
}
