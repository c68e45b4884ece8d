use num::bigint::BigUint;

use bleichenbacher::vectors::Fixture;
use bleichenbacher::{Attack, Config, LocalOracle, Recovery, Round};

// run the attack on a local fixture with a strict local oracle
#[allow(dead_code)]
pub fn run_local(fixture: &Fixture, config: Config) -> Recovery {
    let attack = Attack::new(
        LocalOracle::new(fixture.key.clone()),
        fixture.key.public().clone(),
        fixture.ciphertext.clone(),
        config,
    )
    .unwrap();

    attack.run().unwrap()
}

// the plaintext integer the attack should recover
#[allow(dead_code)]
pub fn target_value(fixture: &Fixture) -> BigUint {
    BigUint::from_bytes_be(&fixture.padded)
}

// total candidate count per round
#[allow(dead_code)]
pub fn sizes(rounds: &[Round]) -> Vec<BigUint> {
    rounds.iter().map(|r| r.intervals.size()).collect()
}
