use std::fmt;
use std::sync::{Mutex, MutexGuard, PoisonError};

use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::engine::{roll_at, Roll};
use crate::error::{DiceError, DiceResult};
use crate::seed::{commit, generate_server_seed, verify_commitment, Commitment};

/// A game session for a single client: fixed seeds, a published commitment
/// and the nonce counter that every roll advances.
pub struct Session {
    client_seed: Vec<u8>,
    server_seed: Vec<u8>,
    commitment: Commitment,
    // Held for the whole derive-then-increment step so that a failed roll
    // never leaves a gap and two callers never share a nonce.
    nonce: Mutex<u64>,
}

/// Everything storage needs to resume a session. Byte fields travel as lowercase hex.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionSnapshot {
    #[serde(with = "hex")]
    pub client_seed: Vec<u8>,
    #[serde(with = "hex")]
    pub server_seed: Vec<u8>,
    #[serde(with = "hex")]
    pub commitment: Commitment,
    pub nonce: u64,
}

impl Session {
    /// Creates a session, drawing a fresh server seed from the OS CSPRNG when
    /// `server_seed` is absent or empty.
    pub fn create(client_seed: &[u8], server_seed: Option<&[u8]>) -> DiceResult<Self> {
        Self::create_with_rng(client_seed, server_seed, &mut OsRng)
    }

    pub fn create_with_rng<R: RngCore + CryptoRng>(
        client_seed: &[u8],
        server_seed: Option<&[u8]>,
        rng: &mut R,
    ) -> DiceResult<Self> {
        if client_seed.is_empty() {
            return Err(DiceError::BlankClientSeed);
        }
        let server_seed = match server_seed {
            Some(seed) if !seed.is_empty() => seed.to_vec(),
            _ => generate_server_seed(rng)?,
        };
        let commitment = commit(&server_seed);
        debug!(commitment = %hex::encode(commitment), "session created");
        Ok(Self {
            client_seed: client_seed.to_vec(),
            server_seed,
            commitment,
            nonce: Mutex::new(0),
        })
    }

    /// Rebuilds a session from revealed seeds positioned at `nonce`.
    pub fn at_nonce(client_seed: &[u8], server_seed: &[u8], nonce: u64) -> DiceResult<Self> {
        Self::restore(SessionSnapshot {
            client_seed: client_seed.to_vec(),
            server_seed: server_seed.to_vec(),
            commitment: commit(server_seed),
            nonce,
        })
    }

    pub fn restore(snapshot: SessionSnapshot) -> DiceResult<Self> {
        if snapshot.client_seed.is_empty() {
            return Err(DiceError::BlankClientSeed);
        }
        if snapshot.server_seed.is_empty() {
            return Err(DiceError::MissingServerSeed);
        }
        if !verify_commitment(&snapshot.server_seed, &snapshot.commitment) {
            return Err(DiceError::CommitmentMismatch);
        }
        debug!(nonce = snapshot.nonce, "session restored");
        Ok(Self {
            client_seed: snapshot.client_seed,
            server_seed: snapshot.server_seed,
            commitment: snapshot.commitment,
            nonce: Mutex::new(snapshot.nonce),
        })
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            client_seed: self.client_seed.clone(),
            server_seed: self.server_seed.clone(),
            commitment: self.commitment,
            nonce: self.nonce(),
        }
    }

    pub fn client_seed(&self) -> &[u8] {
        &self.client_seed
    }

    /// The secret seed. Only hand this out once play on the session is over.
    pub fn server_seed(&self) -> &[u8] {
        &self.server_seed
    }

    pub fn commitment(&self) -> &Commitment {
        &self.commitment
    }

    pub fn commitment_hex(&self) -> String {
        hex::encode(self.commitment)
    }

    /// The nonce the next roll will use.
    pub fn nonce(&self) -> u64 {
        *self.lock_nonce()
    }

    /// Outcome at the current nonce, without advancing.
    pub fn peek(&self) -> DiceResult<f64> {
        roll_at(&self.server_seed, &self.client_seed, self.nonce()).map(|r| r.outcome)
    }

    /// Computes the outcome for the current nonce, then advances the nonce.
    /// The first roll of a fresh session always uses nonce 0.
    pub fn roll(&self) -> DiceResult<f64> {
        self.roll_with_proof().map(|r| r.outcome)
    }

    pub fn roll_with_proof(&self) -> DiceResult<Roll> {
        self.advance_with(|nonce| roll_at(&self.server_seed, &self.client_seed, nonce))
    }

    fn advance_with<F>(&self, derive: F) -> DiceResult<Roll>
    where
        F: FnOnce(u64) -> DiceResult<Roll>,
    {
        let mut nonce = self.lock_nonce();
        let current = *nonce;
        let next = current.checked_add(1).ok_or(DiceError::NonceExhausted)?;
        let roll = derive(current).map_err(|err| {
            warn!(nonce = current, %err, "roll failed, nonce not advanced");
            err
        })?;
        *nonce = next;
        debug!(nonce = current, outcome = roll.outcome, "rolled");
        Ok(roll)
    }

    // A plain integer can't be left half-written, so a poisoned lock is still usable.
    fn lock_nonce(&self) -> MutexGuard<'_, u64> {
        self.nonce.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("commitment", &self.commitment_hex())
            .field("nonce", &self.nonce())
            .finish_non_exhaustive()
    }
}
