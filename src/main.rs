use std::path::PathBuf;
use std::time::Duration;

use anyhow::{bail, Context};
use clap::Parser;
use rand::thread_rng;
use tracing_subscriber::EnvFilter;

use bleichenbacher::cache::QueryCache;
use bleichenbacher::message::{printable, strip_digest};
use bleichenbacher::vectors::{self, Fixture};
use bleichenbacher::{Attack, Config, LocalOracle, Recovery, RemoteOracle};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Attack mode: 1 fixed test vector, 2 fresh ciphertext, 3 generated key, 4 remote oracle
    #[arg(default_value_t = 1, value_parser = clap::value_parser!(u8).range(1..=4))]
    mode: u8,

    /// Base URL of the remote padding oracle
    #[arg(long, env = "ORACLE_SERVER")]
    server: Option<String>,

    /// File memoizing remote oracle answers
    #[arg(long, default_value = "cache.json")]
    cache: PathBuf,

    /// Remote oracle request timeout in seconds
    #[arg(long, default_value_t = 10)]
    timeout: u64,

    /// Modulus size for generated keys
    #[arg(long, default_value_t = 384)]
    bits: usize,

    /// Abort after this many oracle queries
    #[arg(long)]
    query_limit: Option<u64>,

    /// Empty narrowing rounds tolerated before aborting
    #[arg(long, default_value_t = 2)]
    max_empty_rounds: u32,
}

impl Cli {
    fn config(&self, self_test: bool) -> Config {
        Config {
            max_empty_rounds: self.max_empty_rounds,
            query_limit: self.query_limit,
            self_test,
        }
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let mut rng = thread_rng();

    match cli.mode {
        1 => {
            let fixture = vectors::fixed()?;
            if !fixture.verify() {
                bail!("fixed ciphertext does not decrypt to the recorded padded plaintext");
            }
            local_attack(&cli, fixture)
        }
        2 => local_attack(&cli, vectors::local(&mut rng)?),
        3 => local_attack(&cli, vectors::generated(&mut rng, cli.bits)?),
        _ => remote_attack(&cli),
    }
}

fn local_attack(cli: &Cli, fixture: Fixture) -> anyhow::Result<()> {
    tracing::info!(plaintext = %printable(fixture.plaintext), "local attack");

    let oracle = LocalOracle::new(fixture.key.clone());
    let attack = Attack::new(
        oracle,
        fixture.key.public().clone(),
        fixture.ciphertext.clone(),
        cli.config(true),
    )?;
    let counter = attack.counter();

    let recovery = match attack.run() {
        Ok(recovery) => recovery,
        Err(e) => {
            println!("{} queries", counter.get());
            return Err(e.into());
        }
    };
    report(&recovery);

    let message = strip_digest(&recovery.message).context("recovered message has no valid digest")?;
    println!("plaintext => {}", printable(message));
    if message != fixture.plaintext {
        bail!("recovered plaintext does not match the encrypted one");
    }

    Ok(())
}

fn remote_attack(cli: &Cli) -> anyhow::Result<()> {
    let server = match &cli.server {
        Some(server) => server,
        None => bail!("remote mode needs an oracle URL (--server or ORACLE_SERVER)"),
    };
    tracing::info!(%server, cache = %cli.cache.display(), "remote attack");

    let (key, c0) = vectors::remote()?;
    let oracle = RemoteOracle::new(
        server,
        key.byte_len(),
        QueryCache::open(&cli.cache),
        Duration::from_secs(cli.timeout),
    )?;

    let attack = Attack::new(oracle, key, c0, cli.config(false))?;
    let counter = attack.counter();

    match attack.run() {
        Ok(recovery) => {
            report(&recovery);
            println!("plaintext => {}", printable(&recovery.message));
            Ok(())
        }
        Err(e) => {
            println!("{} queries", counter.get());
            Err(e.into())
        }
    }
}

fn report(recovery: &Recovery) {
    println!("success => {}", recovery.value);
    println!("block => {}", hex::encode(&recovery.block));
    println!("{} rounds", recovery.rounds.len() - 1);
    println!("{} queries", recovery.queries);
}
