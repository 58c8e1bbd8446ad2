use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DiceError {
    #[error("client seed can't be empty")]
    BlankClientSeed,
    #[error("secure random source unavailable: {0}")]
    RandomSourceUnavailable(String),
    /// Every 5-char window of the HMAC exceeded the ceiling. Not retried: skipping the
    /// nonce would leave a hole in the committed sequence.
    #[error("no usable hmac window for nonce {nonce}")]
    InvalidDerivation { nonce: u64 },
    #[error("server seed is required")]
    MissingServerSeed,
    #[error("commitment does not match server seed")]
    CommitmentMismatch,
    #[error("nonce counter exhausted")]
    NonceExhausted,
}

pub type DiceResult<T> = Result<T, DiceError>;
