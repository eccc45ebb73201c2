
use thiserror::Error;

/// Top-level error type surfaced by the correction core.
/// A corrector failing to repair a read is *not* an error; only structural
/// failures (bad configuration, I/O trouble, unusable k-mer spectrum) are.
#[derive(Debug, Error)]
pub enum Error {
    /// See enum [Cli]
    #[error(transparent)]
    Cli(#[from] Cli),

    /// See enum [IO]
    #[error(transparent)]
    IO(#[from] IO),

    /// The k-mer spectrum has no usable valley to derive a solidity threshold from
    #[error("could not derive a minimum solid abundance from the k-mer spectrum")]
    CantComputeAbundance,

    /// A sequence window contained a symbol outside the A/C/G/T alphabet
    #[error("symbol {0:#04x} is not a nucleotide")]
    InvalidSymbol(u8),
}

/// Configuration errors, reported before any correction work starts.
#[derive(Debug, Error)]
pub enum Cli {
    #[error("the number of input files must match the number of output files")]
    NotSameNumberOfInAndOut,

    #[error("a solid k-mer source is required: trusted sequence files or a k-mer length to count with")]
    NoSolidityNoKmer,

    #[error("trusted k-mer files require an explicit k-mer length")]
    KmerSolidNeedK,

    #[error("k-mer length is outside the supported range")]
    KmerTooLarge,

    #[error("unknown correction method \"{0}\"")]
    UnknownCorrectionMethod(String),
}

/// File-level errors; fatal for the affected file, reported per operation.
#[derive(Debug, Error)]
pub enum IO {
    #[error("could not create file")]
    CantCreateFile,

    #[error("could not open file")]
    CantOpenFile,

    #[error("write failed mid-stream")]
    ErrorDuringWrite,

    #[error("read failed mid-stream")]
    ErrorDuringRead,
}
