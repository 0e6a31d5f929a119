use thiserror::Error;

/// Unified error type for the codec core and its surrounding I/O.
///
/// `BufferFull`/`BufferEmpty` are not really "errors" from the orchestrator's point
/// of view — they signal that the bit budget ran out mid-stream, which the pipeline
/// converts back into `Ok` with a truncated/partial result. They are kept as
/// distinct variants so inner routines can propagate them with `?` and let the
/// pipeline decide how to handle them.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CodecError {
  #[error("invalid parameters")]
  BadParams,

  #[error("memory allocation failed")]
  MemoryError,

  #[error("damaged or unrecognized header")]
  DamagedHeader,

  #[error("internal invariant violated")]
  InternalError,

  #[error("bit stream buffer is full")]
  BufferFull,

  #[error("bit stream buffer is empty")]
  BufferEmpty,
}

/// Wraps [`CodecError`] together with `std::io::Error` for the binary and the
/// PGM/PPM reader/writer, which the core library itself never touches.
#[derive(Error, Debug)]
pub enum AppError {
  #[error(transparent)]
  Codec(#[from] CodecError),

  #[error(transparent)]
  Io(#[from] std::io::Error),

  #[error("{0}")]
  Usage(String),
}

pub type CodecResult<T> = Result<T, CodecError>;
pub type AppResult<T> = Result<T, AppError>;
