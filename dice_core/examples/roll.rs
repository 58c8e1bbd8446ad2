use dice_core::{verify_outcome, Session};

fn main() {
    // Example end-to-end session: commit, roll a few times, reveal and verify
    let client_seed = b"example-client-seed";
    let session = Session::create(client_seed, None).expect("session");
    println!("commitment={}", session.commitment_hex());

    let rolls: Vec<_> = (0..3)
        .map(|_| session.roll_with_proof().expect("roll"))
        .collect();
    for roll in &rolls {
        println!("nonce={} outcome={:.2} hmac={}", roll.nonce, roll.outcome, roll.hmac_hex);
    }

    println!("server_seed={}", hex::encode(session.server_seed()));
    for roll in &rolls {
        let ok = verify_outcome(client_seed, session.server_seed(), roll.nonce, roll.outcome)
            .expect("verify");
        println!("nonce={} verified={}", roll.nonce, ok);
    }
}
