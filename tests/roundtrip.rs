use tiwave::{check_header, compress, decompress, CodecError, CompressParams, Header, ImageKind, PnmImage, PnmKind, WaveletKind};

fn default_params(desired_size: usize) -> CompressParams {
  CompressParams { wavelet: WaveletKind::Daubechies97, desired_size, scales: 0, lum_ratio: 0, cb_ratio: 0, cr_ratio: 0 }
}

#[test]
fn all_black_8x8_grayscale_decodes_to_all_zero() {
  let image = PnmImage { kind: PnmKind::Gray, width: 8, height: 8, data: vec![0u8; 64] };
  let stream = compress(&image, &default_params(64)).unwrap();

  let header = Header::read(&stream).unwrap();
  assert_eq!(header.image_kind, ImageKind::Grayscale);

  let decoded = decompress(&stream).unwrap();
  assert_eq!(decoded.data, vec![0u8; 64]);
}

#[test]
fn all_255_8x8_grayscale_decodes_to_all_255() {
  let image = PnmImage { kind: PnmKind::Gray, width: 8, height: 8, data: vec![255u8; 64] };
  let stream = compress(&image, &default_params(64)).unwrap();
  let decoded = decompress(&stream).unwrap();
  assert_eq!(decoded.data, vec![255u8; 64]);
}

#[test]
fn grayscale_ramp_reconstructs_within_two_levels() {
  let width = 64;
  let height = 64;
  let data: Vec<u8> = (0..height).flat_map(|r| (0..width).map(move |c| ((r * 64 + c) % 256) as u8)).collect();
  let image = PnmImage { kind: PnmKind::Gray, width, height, data: data.clone() };

  let params = CompressParams { wavelet: WaveletKind::Daubechies97, desired_size: 4096, scales: 3, lum_ratio: 0, cb_ratio: 0, cr_ratio: 0 };
  let stream = compress(&image, &params).unwrap();
  let decoded = decompress(&stream).unwrap();

  for i in 0..data.len() {
    let diff = (data[i] as i32 - decoded.data[i] as i32).abs();
    assert!(diff <= 2, "pixel {i}: expected within 2 of {}, got {}", data[i], decoded.data[i]);
  }
}

#[test]
fn truecolor_32x32_budget_splits_by_channel_ratio() {
  let width = 32;
  let height = 32;
  let data: Vec<u8> = (0..width * height * 3).map(|i| (i * 7 % 256) as u8).collect();
  let image = PnmImage { kind: PnmKind::Rgb, width, height, data };

  let params = CompressParams { wavelet: WaveletKind::Daubechies97, desired_size: 2048, scales: 0, lum_ratio: 80, cb_ratio: 10, cr_ratio: 10 };
  let stream = compress(&image, &params).unwrap();
  let header = Header::read(&stream).unwrap();

  assert!(header.lum_size > header.cb_size);
  assert!(header.lum_size > header.cr_size);

  let total_channels = header.lum_size + header.cb_size + header.cr_size;
  assert_eq!(total_channels as usize + tiwave::HEADER_SIZE, stream.len());

  let decoded = decompress(&stream).unwrap();
  assert_eq!(decoded.width, width);
  assert_eq!(decoded.height, height);
  assert_eq!(decoded.kind, PnmKind::Rgb);
}

#[test]
fn flipping_the_checksum_byte_is_detected_by_check_header() {
  let image = PnmImage { kind: PnmKind::Gray, width: 8, height: 8, data: vec![64u8; 64] };
  let mut stream = compress(&image, &default_params(256)).unwrap();

  stream[21] ^= 0xFF;
  assert_eq!(check_header(&stream), Err(CodecError::DamagedHeader));
  assert_eq!(decompress(&stream).err(), Some(CodecError::DamagedHeader));
}

#[test]
fn a_larger_budget_never_reconstructs_worse_than_a_smaller_one() {
  let width = 32;
  let height = 32;
  let data: Vec<u8> = (0..width * height).map(|i| ((i * 53) % 256) as u8).collect();
  let image = PnmImage { kind: PnmKind::Gray, width, height, data: data.clone() };

  let small = compress(&image, &default_params(96)).unwrap();
  let large = compress(&image, &default_params(1024)).unwrap();

  let decoded_small = decompress(&small).unwrap();
  let decoded_large = decompress(&large).unwrap();

  let sse = |out: &[u8]| -> i64 { data.iter().zip(out).map(|(&a, &b)| { let d = a as i64 - b as i64; d * d }).sum() };

  assert!(sse(&decoded_large.data) <= sse(&decoded_small.data));
}

#[test]
fn pnm_round_trip_through_the_public_reader_and_writer() {
  let image = PnmImage { kind: PnmKind::Gray, width: 3, height: 2, data: vec![1, 2, 3, 4, 5, 6] };
  let bytes = tiwave::write_pnm(&image);
  let parsed = tiwave::read_pnm(&bytes).unwrap();

  assert_eq!(parsed.width, image.width);
  assert_eq!(parsed.height, image.height);
  assert_eq!(parsed.data, image.data);
}
