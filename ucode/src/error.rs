use packed_struct::PackingError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UcodeError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },
    #[error("unknown opcode {0:05b}")]
    UnknownOpcode(u8),
    #[error("control word {0:#x} is wider than 36 bits")]
    WordTooWide(u64),
    #[error("control word {0:#x} has padding bits set")]
    NonZeroPadding(u64),
    #[error("control word does not decode: {0:?}")]
    Decode(PackingError),
}

impl UcodeError {
    pub(crate) fn parse(line: usize, message: &str) -> Self {
        UcodeError::Parse {
            line,
            message: message.to_string(),
        }
    }
}
