use std::io;
use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("block size must be greater than zero")]
    ZeroBlockSize,
    #[error("worker count must be greater than zero")]
    ZeroWorkers,
    #[error("queue capacity must be greater than zero")]
    ZeroQueueCapacity,
}

/// A record that does not have the `name;value` shape.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ParseError {
    #[error("station name longer than {capacity} bytes in line {line:?}")]
    NameTooLong { capacity: usize, line: String },
    #[error("missing ';' delimiter in line {line:?}")]
    MissingDelimiter { line: String },
    #[error("no digits in value of line {line:?}")]
    MissingDigits { line: String },
    #[error("unexpected byte {byte:#04x} in value of line {line:?}")]
    UnexpectedByte { byte: u8, line: String },
    #[error("value out of range in line {line:?}")]
    ValueOutOfRange { line: String },
    #[error("running sum out of range for station {station:?}")]
    SumOutOfRange { station: String },
}

#[derive(Debug, Clone, Copy, Error, PartialEq, Eq)]
#[error("running sum out of range")]
pub struct SumOverflow;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("failed to open {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("failed to read input: {0}")]
    Read(#[source] io::Error),
    #[error("malformed input: {0}")]
    Parse(#[from] ParseError),
    #[error("failed to start pipeline thread: {0}")]
    Spawn(#[source] io::Error),
}
