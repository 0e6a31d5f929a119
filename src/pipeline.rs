//! Top-level compress/decompress orchestration: geometry alignment, budget
//! splitting across channels, and wiring the wavelet/SPIHT/color stages
//! together into one container stream.

use log::debug;

use crate::color::{rgb_to_ycbcr, ycbcr_to_rgb};
use crate::error::{CodecError, CodecResult};
use crate::extend::{extract_image, extend_image};
use crate::grid::Grid;
use crate::header::{Header, ImageKind, HEADER_SIZE};
use crate::pnm::{PnmImage, PnmKind};
use crate::spiht::{decode_dwt, encode_dwt};
use crate::wavelet::{analysis_2d, synthesis_2d, WaveletKind};

const DEFAULT_SCALES: u32 = 5;
const DEFAULT_LUM_RATIO: u32 = 90;
const DEFAULT_CB_RATIO: u32 = 5;
const DEFAULT_CR_RATIO: u32 = 5;

const MAX_DIMENSION: usize = 16383;

#[derive(Clone, Copy, Debug)]
pub struct CompressParams {
  pub wavelet: WaveletKind,
  pub desired_size: usize,
  /// 0 selects the automatic scale count.
  pub scales: u32,
  /// All three ratios must be 0 (use the built-in defaults) or sum to 100.
  pub lum_ratio: u32,
  pub cb_ratio: u32,
  pub cr_ratio: u32,
}

fn align(x: usize, bits: u32) -> usize {
  let mask = (1usize << bits) - 1;
  if x & mask != 0 {
    (x & !mask) + (1 << bits)
  } else {
    x
  }
}

fn default_scales(width: usize, height: usize) -> u32 {
  let width_bits = width.trailing_zeros();
  let height_bits = height.trailing_zeros();
  DEFAULT_SCALES.max(width_bits.min(height_bits))
}

fn validate_params(image: &PnmImage, params: &CompressParams) -> CodecResult<()> {
  if image.width == 0 || image.height == 0 {
    return Err(CodecError::BadParams);
  }
  if image.width > MAX_DIMENSION || image.height > MAX_DIMENSION {
    return Err(CodecError::BadParams);
  }

  let min_size = match image.kind {
    PnmKind::Gray => HEADER_SIZE + 2,
    PnmKind::Rgb => HEADER_SIZE + 6,
  };
  if params.desired_size < min_size {
    return Err(CodecError::BadParams);
  }

  let ratio_sum = params.lum_ratio + params.cb_ratio + params.cr_ratio;
  let any_zero = params.lum_ratio == 0 || params.cb_ratio == 0 || params.cr_ratio == 0;
  if ratio_sum != 0 && (any_zero || ratio_sum != 100) {
    return Err(CodecError::BadParams);
  }

  Ok(())
}

fn channel_budgets(payload: usize, params: &CompressParams) -> (usize, usize, usize) {
  let (lum_ratio, cb_ratio, cr_ratio) = if params.lum_ratio == 0 {
    (DEFAULT_LUM_RATIO, DEFAULT_CB_RATIO, DEFAULT_CR_RATIO)
  } else {
    (params.lum_ratio, params.cb_ratio, params.cr_ratio)
  };

  let channel_size = |ratio: u32| -> usize { ((payload * ratio as usize / 100) as i64 - 4).max(2) as usize };

  let cr_size = channel_size(cr_ratio);
  let cb_size = channel_size(cb_ratio);
  let lum_size = payload - cr_size - cb_size;

  (lum_size, cb_size, cr_size)
}

fn encode_plane(plane: &[u8], rows: usize, cols: usize, scales: u32, wavelet: WaveletKind, budget: usize) -> CodecResult<Vec<u8>> {
  let align_rows = align(rows, scales);
  let align_cols = align(cols, scales);

  let mut grid = Grid::<f64>::zeroed(align_rows, align_cols);
  extend_image(plane, &mut grid, rows, cols);
  analysis_2d(wavelet, &mut grid, scales);

  let mut buffer = vec![0u8; budget];
  let written = encode_dwt(&grid, scales, &mut buffer)?;
  buffer.truncate(written);
  Ok(buffer)
}

fn decode_plane(stream: &[u8], rows: usize, cols: usize, scales: u32, wavelet: WaveletKind) -> CodecResult<Vec<u8>> {
  let align_rows = align(rows, scales);
  let align_cols = align(cols, scales);
  let mut grid = Grid::<f64>::zeroed(align_rows, align_cols);

  if stream.len() >= 2 {
    decode_dwt(&mut grid, scales, stream)?;
  }

  synthesis_2d(wavelet, &mut grid, scales);

  let mut out = vec![0u8; rows * cols];
  extract_image(&grid, &mut out, rows, cols);
  Ok(out)
}

/// Compresses `image` into a self-contained container stream no larger than
/// `params.desired_size`.
pub fn compress(image: &PnmImage, params: &CompressParams) -> CodecResult<Vec<u8>> {
  validate_params(image, params)?;

  let scales = if params.scales == 0 { default_scales(image.width, image.height) } else { params.scales };

  debug!("compress: {}x{}, scales={scales}, wavelet={:?}", image.width, image.height, params.wavelet);

  match image.kind {
    PnmKind::Gray => {
      let payload_budget = params.desired_size - HEADER_SIZE;
      let encoded = encode_plane(&image.data, image.height, image.width, scales, params.wavelet, payload_budget)?;

      let header = Header {
        width: image.width as u16,
        height: image.height as u16,
        scales: scales as u8,
        image_kind: ImageKind::Grayscale,
        wavelet: params.wavelet,
        lum_size: encoded.len() as u32,
        cb_size: 0,
        cr_size: 0,
      };

      let mut out = vec![0u8; HEADER_SIZE];
      header.write(&mut out);
      out.extend_from_slice(&encoded);
      Ok(out)
    }

    PnmKind::Rgb => {
      let payload = params.desired_size - HEADER_SIZE;
      let (lum_budget, cb_budget, cr_budget) = channel_budgets(payload, params);

      let mut ycbcr = image.data.clone();
      rgb_to_ycbcr(&mut ycbcr);

      let n = image.width * image.height;
      let lum_plane: Vec<u8> = ycbcr.chunks_exact(3).map(|p| p[0]).collect();
      let cb_plane: Vec<u8> = ycbcr.chunks_exact(3).map(|p| p[1]).collect();
      let cr_plane: Vec<u8> = ycbcr.chunks_exact(3).map(|p| p[2]).collect();
      debug_assert_eq!(lum_plane.len(), n);

      let lum_enc = encode_plane(&lum_plane, image.height, image.width, scales, params.wavelet, lum_budget)?;
      let cb_enc = encode_plane(&cb_plane, image.height, image.width, scales, params.wavelet, cb_budget)?;
      let cr_enc = encode_plane(&cr_plane, image.height, image.width, scales, params.wavelet, cr_budget)?;

      let merged = crate::split::merge_channels(&lum_enc, &cb_enc, &cr_enc);

      let header = Header {
        width: image.width as u16,
        height: image.height as u16,
        scales: scales as u8,
        image_kind: ImageKind::Truecolor,
        wavelet: params.wavelet,
        lum_size: lum_enc.len() as u32,
        cb_size: cb_enc.len() as u32,
        cr_size: cr_enc.len() as u32,
      };

      let mut out = vec![0u8; HEADER_SIZE];
      header.write(&mut out);
      out.extend_from_slice(&merged);
      Ok(out)
    }
  }
}

/// Validates and peeks a stream's geometry without decoding its payload,
/// letting a caller allocate an output buffer ahead of a full [`decompress`].
pub fn check_header(stream: &[u8]) -> CodecResult<(u16, u16, ImageKind)> {
  Header::peek(stream)
}

/// Fully decompresses a container stream written by [`compress`].
pub fn decompress(stream: &[u8]) -> CodecResult<PnmImage> {
  let header = Header::read(stream)?;
  let width = header.width as usize;
  let height = header.height as usize;
  let scales = header.scales as u32;

  debug!("decompress: {width}x{height}, scales={scales}, wavelet={:?}", header.wavelet);

  match header.image_kind {
    ImageKind::Grayscale => {
      let lum_stream = &stream[HEADER_SIZE..HEADER_SIZE + header.lum_size as usize];
      let data = decode_plane(lum_stream, height, width, scales, header.wavelet)?;
      Ok(PnmImage { kind: PnmKind::Gray, width, height, data })
    }

    ImageKind::Truecolor => {
      let payload = &stream[HEADER_SIZE..];
      let (lum_buf, cb_buf, cr_buf) =
        crate::split::split_channels(payload, header.lum_size as usize, header.cb_size as usize, header.cr_size as usize);

      let lum_plane = decode_plane(&lum_buf, height, width, scales, header.wavelet)?;
      let cb_plane = decode_plane(&cb_buf, height, width, scales, header.wavelet)?;
      let cr_plane = decode_plane(&cr_buf, height, width, scales, header.wavelet)?;

      let mut data = vec![0u8; width * height * 3];
      for i in 0..width * height {
        data[i * 3] = lum_plane[i];
        data[i * 3 + 1] = cb_plane[i];
        data[i * 3 + 2] = cr_plane[i];
      }
      ycbcr_to_rgb(&mut data);

      Ok(PnmImage { kind: PnmKind::Rgb, width, height, data })
    }
  }
}
