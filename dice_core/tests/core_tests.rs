use std::collections::BTreeSet;
use std::sync::Arc;
use std::thread;

use dice_core::{
    commit, compute_hmac_hex, compute_outcome, verify_commitment, verify_outcome, DiceError,
    Session, SessionSnapshot, SERVER_SEED_LEN,
};
use rand::rngs::StdRng;
use rand::{CryptoRng, RngCore, SeedableRng};

const CLIENT_SEED: &[u8] = b"ClientSeedForDiceSites.com";
const SERVER_SEED: &[u8] = b"293d5d2ddd365f54759283a8097ab2640cbe6f8864adc2b1b31e65c14c999f04";

const FIXTURE: [(u64, &str, f64); 4] = [
    (
        0,
        "aa671aad5e4565ebffb8dc5c185e4df1ae6d9aca2578b5c03ec9c7750f881922276d8044e5e3d84f158ce411f667e224e9b0c1ac50fc94e9c5eb883a678f6ca2",
        79.69,
    ),
    (
        1,
        "7b9062b1a8188feff82d643c0c8f2883bc744240594952f55126b24c76b05648a73850905e68fe86fe64c9fbd9a9ef9f677264d3771bd98db64b022ad183da53",
        61.18,
    ),
    (
        2,
        "a5644976f61b4012c0eb27848bbe3d05d43d34dcb89e2032b8d93ba0992b26ad916223caf9ba5421229508144a370ba053f27893b5e7f6e8283231cce90e1535",
        74.44,
    ),
    (
        3,
        "8bd6805955d0ca66fb5eb672b75bd0874bea59ecbe1d21e101ad50faf19e7d67256d6d4714c53fa848d801d92874f72813a78e447431b1fd609ba328d18d3875",
        27.76,
    ),
];

fn fixture_session() -> Session {
    let session = Session::create(CLIENT_SEED, Some(SERVER_SEED)).unwrap();
    assert_eq!(session.nonce(), 0);
    assert_eq!(session.client_seed(), CLIENT_SEED);
    assert_eq!(session.server_seed(), SERVER_SEED);
    assert_eq!(session.commitment().len(), 32);
    session
}

struct BrokenSource;

impl RngCore for BrokenSource {
    fn next_u32(&mut self) -> u32 {
        0
    }

    fn next_u64(&mut self) -> u64 {
        0
    }

    fn fill_bytes(&mut self, _dest: &mut [u8]) {}

    fn try_fill_bytes(&mut self, _dest: &mut [u8]) -> Result<(), rand::Error> {
        Err(rand::Error::new(std::io::Error::new(
            std::io::ErrorKind::Other,
            "entropy pool offline",
        )))
    }
}

impl CryptoRng for BrokenSource {}

#[test]
fn fixture_rolls_match() {
    let session = fixture_session();
    for (nonce, hmac, outcome) in FIXTURE {
        assert_eq!(session.nonce(), nonce);
        assert_eq!(compute_hmac_hex(SERVER_SEED, CLIENT_SEED, nonce), hmac);
        let roll = session.roll_with_proof().unwrap();
        assert_eq!(roll.nonce, nonce);
        assert_eq!(roll.hmac_hex, hmac);
        assert_eq!(roll.outcome, outcome);
    }
    assert_eq!(session.nonce(), 4);
}

#[test]
fn fixture_outcomes_verify() {
    for (nonce, _, outcome) in FIXTURE {
        assert!(verify_outcome(CLIENT_SEED, SERVER_SEED, nonce, outcome).unwrap());
        assert!(!verify_outcome(CLIENT_SEED, SERVER_SEED, nonce, outcome + 0.01).unwrap());
    }
}

#[test]
fn compute_is_pure() {
    let session = fixture_session();
    for _ in 0..3 {
        assert_eq!(compute_outcome(SERVER_SEED, CLIENT_SEED, 0).unwrap(), 79.69);
    }
    assert_eq!(session.nonce(), 0);
}

#[test]
fn random_server_seed() {
    let session = Session::create(CLIENT_SEED, None).unwrap();
    assert_eq!(session.nonce(), 0);
    assert_eq!(session.client_seed(), CLIENT_SEED);
    assert_eq!(session.server_seed().len(), SERVER_SEED_LEN);
    assert_eq!(session.commitment().len(), 32);
    assert!(verify_commitment(session.server_seed(), session.commitment()));

    let empty = Session::create(CLIENT_SEED, Some(b"")).unwrap();
    assert_eq!(empty.server_seed().len(), SERVER_SEED_LEN);
}

#[test]
fn injected_source_is_used() {
    let a = Session::create_with_rng(CLIENT_SEED, None, &mut StdRng::seed_from_u64(11)).unwrap();
    let b = Session::create_with_rng(CLIENT_SEED, None, &mut StdRng::seed_from_u64(11)).unwrap();
    assert_eq!(a.server_seed(), b.server_seed());
    assert_eq!(a.commitment(), b.commitment());
}

#[test]
fn broken_source_aborts_creation() {
    let err = Session::create_with_rng(CLIENT_SEED, None, &mut BrokenSource).unwrap_err();
    assert!(matches!(err, DiceError::RandomSourceUnavailable(msg) if msg.contains("entropy pool offline")));

    // a supplied seed never touches the source
    assert!(Session::create_with_rng(CLIENT_SEED, Some(SERVER_SEED), &mut BrokenSource).is_ok());
}

#[test]
fn blank_client_seed_rejected() {
    assert_eq!(
        Session::create(b"", Some(SERVER_SEED)).unwrap_err(),
        DiceError::BlankClientSeed
    );
    assert_eq!(
        Session::create(b"", None).unwrap_err(),
        DiceError::BlankClientSeed
    );
}

#[test]
fn commitment_matches_revealed_seed() {
    let session = Session::create(CLIENT_SEED, None).unwrap();
    let published = *session.commitment();
    for _ in 0..5 {
        session.roll().unwrap();
    }
    assert_eq!(*session.commitment(), published);
    assert_eq!(commit(session.server_seed()), published);
}

#[test]
fn concurrent_rolls_issue_every_nonce_once() {
    const THREADS: u64 = 8;
    const PER_THREAD: u64 = 250;

    let session = Arc::new(Session::create(CLIENT_SEED, None).unwrap());
    let handles: Vec<_> = (0..THREADS)
        .map(|_| {
            let session = Arc::clone(&session);
            thread::spawn(move || {
                (0..PER_THREAD)
                    .map(|_| session.roll_with_proof().unwrap())
                    .collect::<Vec<_>>()
            })
        })
        .collect();

    let rolls: Vec<_> = handles
        .into_iter()
        .flat_map(|h| h.join().unwrap())
        .collect();
    let nonces: BTreeSet<u64> = rolls.iter().map(|r| r.nonce).collect();

    assert_eq!(rolls.len() as u64, THREADS * PER_THREAD);
    assert_eq!(nonces, (0..THREADS * PER_THREAD).collect());
    assert_eq!(session.nonce(), THREADS * PER_THREAD);
    for roll in &rolls {
        assert!(verify_outcome(CLIENT_SEED, session.server_seed(), roll.nonce, roll.outcome).unwrap());
    }
}

#[test]
fn snapshot_resumes_sequence() {
    let session = fixture_session();
    session.roll().unwrap();
    session.roll().unwrap();

    let json = serde_json::to_string(&session.snapshot()).unwrap();
    let snapshot: SessionSnapshot = serde_json::from_str(&json).unwrap();
    assert_eq!(snapshot.nonce, 2);
    assert!(json.contains(&hex::encode(SERVER_SEED)));

    let resumed = Session::restore(snapshot).unwrap();
    assert_eq!(resumed.commitment(), session.commitment());
    assert_eq!(resumed.roll().unwrap(), 74.44);
    assert_eq!(resumed.roll().unwrap(), 27.76);
}

#[test]
fn restore_rejects_bad_snapshots() {
    let good = fixture_session().snapshot();

    let mut tampered = good.clone();
    tampered.commitment[0] ^= 0xff;
    assert_eq!(
        Session::restore(tampered).unwrap_err(),
        DiceError::CommitmentMismatch
    );

    let mut no_server = good.clone();
    no_server.server_seed.clear();
    assert_eq!(
        Session::restore(no_server).unwrap_err(),
        DiceError::MissingServerSeed
    );

    let mut no_client = good;
    no_client.client_seed.clear();
    assert_eq!(
        Session::restore(no_client).unwrap_err(),
        DiceError::BlankClientSeed
    );
}

#[test]
fn at_nonce_rebuilds_for_verification() {
    let session = Session::at_nonce(CLIENT_SEED, SERVER_SEED, 3).unwrap();
    assert_eq!(session.peek().unwrap(), 27.76);
    assert_eq!(
        Session::at_nonce(CLIENT_SEED, b"", 0).unwrap_err(),
        DiceError::MissingServerSeed
    );
}
