//! hexpack command-line tool.
//!
//! Thin wrapper over `hexpack-core`: resolves the key, then packs, unpacks,
//! dumps the code table, or runs a seeded round-trip demo.

mod config;
mod input_gen;

use std::process::ExitCode;

use config::{Command, Config};
use hexpack_core::{Codec, Result};
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let config = match Config::from_args(&args) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("error: {e}");
            eprintln!("run with --help for usage");
            return ExitCode::from(2);
        }
    };

    if config.print_config {
        config.print();
    }

    match run(&config) {
        Ok(true) => ExitCode::SUCCESS,
        Ok(false) => ExitCode::FAILURE,
        Err(e) => {
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

/// Returns `Ok(false)` when the demo saw a mismatch.
fn run(config: &Config) -> Result<bool> {
    let mut codec = Codec::with_seed(config.seed);

    if let Some(key) = config.load_key()? {
        let report = codec.install_key(&key)?;
        for line in &report.rejected {
            eprintln!("warning: {line}");
        }
        tracing::info!(
            custom_entries = report.custom_entries,
            fingerprint = report.fingerprint,
            "key loaded"
        );
    }

    match &config.command {
        Command::Pack(text) => {
            println!("{}", codec.pack_str(text)?);
        }
        Command::Unpack(packed) => {
            let bytes = codec.unpack(packed)?;
            println!("{}", String::from_utf8_lossy(&bytes));
        }
        Command::Table => {
            println!("key fingerprint: {:08x}", codec.fingerprint()?);
            print!("{}", codec.code_table()?);
        }
        Command::Demo => {
            return run_demo(&mut codec, config);
        }
    }

    Ok(true)
}

fn run_demo(codec: &mut Codec, config: &Config) -> Result<bool> {
    println!("seed: {}", config.seed);
    println!("key fingerprint: {:08x}", codec.fingerprint()?);
    println!();

    let mut mismatches = 0;
    for payload in input_gen::generate_payloads(config.seed, config.count) {
        let packed = codec.pack_str(&payload)?;
        let unpacked = codec.unpack_str(&packed)?;
        let status = if unpacked == payload { "ok" } else { "MISMATCH" };
        if unpacked != payload {
            mismatches += 1;
        }
        println!("{status:>8}  {:>3} -> {:>3}  {}", payload.len(), packed.len() / 2, packed);
    }

    if config.print_metrics {
        println!();
        println!("{}", codec.metrics());
    }

    if mismatches == 0 {
        println!("\nVerification: PASSED ✓");
    } else {
        println!("\nVerification: FAILED ✗ ({mismatches} mismatches)");
    }

    Ok(mismatches == 0)
}
