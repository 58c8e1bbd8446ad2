use serde::{Deserialize, Serialize};

/// Published before the first roll on a seed.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct CommitmentNotice {
    pub commitment: String, // sha256(server_seed), hex
    pub client_seed: String,
    pub next_nonce: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RollRecord {
    pub nonce: u64,
    pub outcome: f64,
    pub hmac: String,
}

/// Published once play on a seed has ended.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct SeedReveal {
    pub server_seed: String, // hex
    pub client_seed: String,
    pub commitment: String,
    pub final_nonce: u64,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct VerifyRequest {
    pub client_seed: String,
    pub server_seed: String, // hex
    pub nonce: u64,
    pub outcome: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct VerifyResponse {
    pub verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub commitment_matches: Option<bool>,
}

impl VerifyResponse {
    pub fn passed(&self) -> bool {
        self.verified && self.commitment_matches.unwrap_or(true)
    }
}
