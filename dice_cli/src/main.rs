use std::io::Write;

use anyhow::{bail, Context};
use clap::{Args, Parser, Subcommand};
use dice_core::{verify_commitment, verify_outcome, Roll, Session};
use dice_shared::{CommitmentNotice, RollRecord, SeedReveal, VerifyRequest, VerifyResponse};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dice", about = "Commit, roll and verify provably-fair dice outcomes")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
    /// Print JSON instead of plain text
    #[arg(long, global = true)]
    json: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a session and print its commitment (and the seed to reveal later)
    Commit {
        #[command(flatten)]
        seeds: SeedArgs,
    },
    /// Roll `count` outcomes starting at `nonce`
    Roll {
        #[command(flatten)]
        seeds: SeedArgs,
        #[arg(long, default_value_t = 0)]
        nonce: u64,
        #[arg(long, default_value_t = 1)]
        count: u64,
    },
    /// Check a claimed outcome against revealed seeds
    Verify {
        #[command(flatten)]
        seeds: SeedArgs,
        #[arg(long)]
        nonce: u64,
        #[arg(long)]
        outcome: f64,
        /// Published commitment (hex) to check the server seed against
        #[arg(long)]
        commitment: Option<String>,
    },
    /// Export a roll ledger to CSV
    ExportCsv {
        path: String,
        #[command(flatten)]
        seeds: SeedArgs,
        #[arg(long, default_value_t = 0)]
        nonce: u64,
        #[arg(long, default_value_t = 100)]
        count: u64,
    },
}

#[derive(Args)]
struct SeedArgs {
    #[arg(long, env = "DICE_CLIENT_SEED")]
    client_seed: String,
    /// Server seed taken as literal bytes
    #[arg(long, env = "DICE_SERVER_SEED")]
    server_seed: Option<String>,
    /// Server seed given as hex, e.g. one generated by `commit`. Wins over --server-seed.
    #[arg(long)]
    server_seed_hex: Option<String>,
}

impl SeedArgs {
    fn server_seed(&self) -> anyhow::Result<Vec<u8>> {
        match (&self.server_seed, &self.server_seed_hex) {
            (_, Some(h)) => hex::decode(h).context("server seed hex is malformed"),
            (Some(s), None) => Ok(s.as_bytes().to_vec()),
            (None, None) => Ok(Vec::new()),
        }
    }
}

fn record(roll: Roll) -> RollRecord {
    RollRecord {
        nonce: roll.nonce,
        outcome: roll.outcome,
        hmac: roll.hmac_hex,
    }
}

/// Rolls `count` outcomes from `nonce`, handing each to `emit` as soon as it is derived.
fn roll_range<F>(seeds: &SeedArgs, nonce: u64, count: u64, mut emit: F) -> anyhow::Result<u64>
where
    F: FnMut(RollRecord) -> anyhow::Result<()>,
{
    let session = Session::at_nonce(seeds.client_seed.as_bytes(), &seeds.server_seed()?, nonce)?;
    for _ in 0..count {
        emit(record(session.roll_with_proof()?))?;
    }
    Ok(count)
}

fn commit(seeds: &SeedArgs) -> anyhow::Result<(CommitmentNotice, SeedReveal)> {
    let server_seed = seeds.server_seed()?;
    let session = Session::create(seeds.client_seed.as_bytes(), Some(server_seed.as_slice()))?;
    let notice = CommitmentNotice {
        commitment: session.commitment_hex(),
        client_seed: seeds.client_seed.clone(),
        next_nonce: session.nonce(),
    };
    let reveal = SeedReveal {
        server_seed: hex::encode(session.server_seed()),
        client_seed: seeds.client_seed.clone(),
        commitment: session.commitment_hex(),
        final_nonce: session.nonce(),
    };
    info!(commitment = %notice.commitment, "committed server seed");
    Ok((notice, reveal))
}

fn verify(
    seeds: &SeedArgs,
    nonce: u64,
    outcome: f64,
    commitment: Option<String>,
) -> anyhow::Result<VerifyResponse> {
    let server_seed = seeds.server_seed()?;
    let req = VerifyRequest {
        client_seed: seeds.client_seed.clone(),
        server_seed: hex::encode(&server_seed),
        nonce,
        outcome,
        commitment,
    };
    let commitment_matches = match &req.commitment {
        Some(c) => {
            let c = hex::decode(c).context("commitment hex is malformed")?;
            Some(verify_commitment(&server_seed, &c))
        }
        None => None,
    };
    Ok(VerifyResponse {
        verified: verify_outcome(req.client_seed.as_bytes(), &server_seed, req.nonce, req.outcome)?,
        commitment_matches,
    })
}

// Turns a failed check into an error so the process exits non-zero.
fn ensure_passed(resp: &VerifyResponse, nonce: u64) -> anyhow::Result<()> {
    if !resp.passed() {
        warn!(nonce, "verification failed");
        bail!("verification failed for nonce {nonce}");
    }
    Ok(())
}

fn export_csv<W: Write>(
    seeds: &SeedArgs,
    nonce: u64,
    count: u64,
    wtr: &mut csv::Writer<W>,
) -> anyhow::Result<u64> {
    let written = roll_range(seeds, nonce, count, |r| Ok(wtr.serialize(r)?))?;
    wtr.flush()?;
    Ok(written)
}

fn print_json<T: serde::Serialize>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Commit { seeds } => {
            let (notice, reveal) = commit(&seeds)?;
            if cli.json {
                print_json(&serde_json::json!({ "notice": notice, "reveal": reveal }))?;
            } else {
                println!("commitment:  {}", notice.commitment);
                println!("server seed: {} (keep secret until play ends)", reveal.server_seed);
            }
        }
        Commands::Roll {
            seeds,
            nonce,
            count,
        } => {
            let stdout = std::io::stdout();
            let mut out = stdout.lock();
            // JSON output is one record per line so long ranges stream
            roll_range(&seeds, nonce, count, |r| {
                if cli.json {
                    writeln!(out, "{}", serde_json::to_string(&r)?)?;
                } else {
                    writeln!(out, "nonce={:>6} outcome={:>5.2} hmac={}", r.nonce, r.outcome, r.hmac)?;
                }
                Ok(())
            })?;
        }
        Commands::Verify {
            seeds,
            nonce,
            outcome,
            commitment,
        } => {
            let resp = verify(&seeds, nonce, outcome, commitment)?;
            if cli.json {
                print_json(&resp)?;
            } else {
                println!("outcome verified: {}", resp.verified);
                if let Some(m) = resp.commitment_matches {
                    println!("commitment matches: {m}");
                }
            }
            ensure_passed(&resp, nonce)?;
        }
        Commands::ExportCsv {
            path,
            seeds,
            nonce,
            count,
        } => {
            let mut wtr = csv::Writer::from_path(&path)?;
            let written = export_csv(&seeds, nonce, count, &mut wtr)?;
            println!("Exported {} rolls to {}", written, path);
        }
    }

    Ok(())
}
