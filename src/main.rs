//! Command-line front end: reads a PGM/PPM file, compresses or decompresses
//! it through the library, and writes the result back out.

use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::Parser;
use log::info;

use tiwave::{check_header, compress, decompress, read_pnm, write_pnm, AppError, AppResult, CompressParams, ImageKind, PnmImage, PnmKind, WaveletKind};

/// TiCodec - lossy image compressor based on a wavelet/SPIHT core.
///
/// `-y`/`-b`/`-r` must either all be given (and sum to 100) or all be
/// omitted, in which case the built-in 90/5/5 default applies.
#[derive(Parser, Debug)]
#[command(name = "ticodec", version, about)]
struct Cli {
  /// Encode an image into a compressed stream
  #[arg(short = 'e', long, conflicts_with = "decode")]
  encode: bool,

  /// Decode a compressed stream back into a PGM/PPM image
  #[arg(short = 'd', long)]
  decode: bool,

  /// Input file name
  #[arg(short = 'i', long)]
  input: PathBuf,

  /// Output file name
  #[arg(short = 'o', long)]
  output: PathBuf,

  /// Desired encoded file size in bytes (encode only)
  #[arg(short = 's', long)]
  size: Option<usize>,

  /// Use the Butterworth wavelet transform
  #[arg(short = 'B', long, conflicts_with = "daubechies")]
  butterworth: bool,

  /// Use the Daubechies 9/7 wavelet transform (default)
  #[arg(short = 'D', long)]
  daubechies: bool,

  /// Number of DWT transform levels (default: chosen automatically)
  #[arg(short = 'l', long)]
  levels: Option<u32>,

  /// Bit budget in percent for the Y channel (default 90)
  #[arg(short = 'y')]
  lum: Option<u32>,

  /// Bit budget in percent for the Cb channel (default 5)
  #[arg(short = 'b')]
  cb: Option<u32>,

  /// Bit budget in percent for the Cr channel (default 5)
  #[arg(short = 'r')]
  cr: Option<u32>,
}

const MIN_ENCODED_SIZE: usize = tiwave::HEADER_SIZE + 2 + 2 + 2;

fn validate_args(cli: &Cli) -> AppResult<()> {
  if !cli.encode && !cli.decode {
    return Err(AppError::Usage("one of --encode or --decode is required".into()));
  }

  if cli.encode {
    let size = cli.size.ok_or_else(|| AppError::Usage("--size is required when encoding".into()))?;
    if size < MIN_ENCODED_SIZE {
      return Err(AppError::Usage(format!("--size must be at least {MIN_ENCODED_SIZE}")));
    }

    let ratio_flags = cli.lum.is_some() as u32 + cli.cb.is_some() as u32 + cli.cr.is_some() as u32;
    if ratio_flags != 0 && ratio_flags != 3 {
      return Err(AppError::Usage("-y, -b, and -r must all be given together or all omitted".into()));
    }
    if ratio_flags == 3 {
      let (lum, cb, cr) = (cli.lum.unwrap(), cli.cb.unwrap(), cli.cr.unwrap());
      if lum == 0 || cb == 0 || cr == 0 {
        return Err(AppError::Usage("-y, -b, and -r must each be greater than zero".into()));
      }
      if lum + cb + cr != 100 {
        return Err(AppError::Usage("-y + -b + -r must equal 100".into()));
      }
    }
  } else if cli.size.is_some() || cli.levels.is_some() || cli.lum.is_some() || cli.cb.is_some() || cli.cr.is_some() || cli.butterworth || cli.daubechies {
    return Err(AppError::Usage("encode-only options were given with --decode".into()));
  }

  Ok(())
}

fn compress_file(cli: &Cli) -> AppResult<()> {
  let bytes = fs::read(&cli.input)?;
  let image = read_pnm(&bytes)?;

  let wavelet = if cli.butterworth { WaveletKind::Butterworth } else { WaveletKind::Daubechies97 };
  let params = CompressParams {
    wavelet,
    desired_size: cli.size.expect("validated by validate_args"),
    scales: cli.levels.unwrap_or(0),
    lum_ratio: cli.lum.unwrap_or(0),
    cb_ratio: cli.cb.unwrap_or(0),
    cr_ratio: cli.cr.unwrap_or(0),
  };

  info!("encoding {:?} ({}x{}) to {} bytes", cli.input, image.width, image.height, params.desired_size);

  let stream = compress(&image, &params)?;
  fs::write(&cli.output, &stream)?;

  info!("wrote {} bytes to {:?}", stream.len(), cli.output);
  Ok(())
}

fn decompress_file(cli: &Cli) -> AppResult<()> {
  let stream = fs::read(&cli.input)?;

  let (width, height, kind) = check_header(&stream)?;
  info!("decoding {:?} ({width}x{height}, {kind:?})", cli.input);

  let image = decompress(&stream)?;
  let pnm_kind = match kind {
    ImageKind::Grayscale => PnmKind::Gray,
    ImageKind::Truecolor => PnmKind::Rgb,
  };
  debug_assert_eq!(pnm_kind, image.kind);

  let out = write_pnm(&PnmImage { kind: image.kind, width: image.width, height: image.height, data: image.data });
  fs::write(&cli.output, &out)?;

  info!("wrote {} bytes to {:?}", out.len(), cli.output);
  Ok(())
}

fn run() -> AppResult<()> {
  let cli = Cli::parse();
  validate_args(&cli)?;

  if cli.encode {
    compress_file(&cli)
  } else {
    decompress_file(&cli)
  }
}

fn main() -> ExitCode {
  env_logger::init();

  match run() {
    Ok(()) => ExitCode::SUCCESS,
    Err(e) => {
      eprintln!("ticodec: {e}");
      ExitCode::FAILURE
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn base_cli() -> Cli {
    Cli {
      encode: false,
      decode: false,
      input: PathBuf::from("in.pgm"),
      output: PathBuf::from("out.Ti"),
      size: None,
      butterworth: false,
      daubechies: false,
      levels: None,
      lum: None,
      cb: None,
      cr: None,
    }
  }

  #[test]
  fn encode_without_size_is_rejected() {
    let cli = Cli { encode: true, ..base_cli() };
    assert!(validate_args(&cli).is_err());
  }

  #[test]
  fn mismatched_channel_ratios_are_rejected() {
    let cli = Cli { encode: true, size: Some(1000), lum: Some(90), cb: Some(5), cr: None, ..base_cli() };
    assert!(validate_args(&cli).is_err());

    let cli = Cli { encode: true, size: Some(1000), lum: Some(80), cb: Some(10), cr: Some(5), ..base_cli() };
    assert!(validate_args(&cli).is_err());
  }

  #[test]
  fn documented_defaults_are_accepted() {
    let cli = Cli { encode: true, size: Some(1000), ..base_cli() };
    assert!(validate_args(&cli).is_ok());

    let cli = Cli { encode: true, size: Some(1000), lum: Some(80), cb: Some(10), cr: Some(10), ..base_cli() };
    assert!(validate_args(&cli).is_ok());
  }

  #[test]
  fn decode_rejects_encode_only_flags() {
    let cli = Cli { decode: true, size: Some(1000), ..base_cli() };
    assert!(validate_args(&cli).is_err());
  }
}
