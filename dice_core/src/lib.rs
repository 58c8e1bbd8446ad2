pub mod engine;
pub mod error;
pub mod rng;
pub mod seed;
pub mod session;

pub use crate::engine::{roll_at, verify_outcome, verify_roll, Roll};
pub use crate::error::{DiceError, DiceResult};
pub use crate::rng::{compute_hmac_hex, compute_outcome, normalize, select_window};
pub use crate::seed::{commit, commitment_hex, verify_commitment, Commitment, SERVER_SEED_LEN};
pub use crate::session::{Session, SessionSnapshot};
