use mangler_core::config::MutatorConfig;
use mangler_core::havoc::HavocEngine;

use clap::Parser;
use rand_chacha::ChaCha8Rng;
use rand_core::SeedableRng;
use std::path::PathBuf;
use std::time::Instant;

/// Fallback 8-byte value mutated when no input file is given.
const DEFAULT_VALUE: u64 = 0x0000_0000_0000_0001;

#[derive(Parser, Debug)]
#[clap(author, version, about, long_about = None)]
struct Cli {
    /// TOML file with havoc tuning; defaults to mangler.toml when present.
    #[clap(short, long, value_parser)]
    config_file: Option<PathBuf>,
    /// Seed input whose bytes form the initial value.
    #[clap(short, long)]
    input: Option<PathBuf>,
    /// Where to write the final mutated value.
    #[clap(short, long)]
    output: Option<PathBuf>,
    /// Buffer capacity in bytes; defaults to four times the input length.
    #[clap(long)]
    capacity: Option<usize>,
    /// Number of havoc passes, each feeding its result into the next.
    #[clap(short = 'n', long, default_value_t = 1000)]
    iterations: u64,
    /// Generator seed; overrides the config file value.
    #[clap(short, long)]
    seed: Option<u64>,
}

fn main() -> Result<(), anyhow::Error> {
    let cli = Cli::parse();

    let config = match cli.config_file {
        Some(config_path) => {
            println!("Loading configuration from specified path: {config_path:?}");
            MutatorConfig::load_from_file(&config_path)?
        }
        None => {
            let default_config_path = PathBuf::from("mangler.toml");
            if default_config_path.exists() {
                println!("No config file specified via CLI, loading default: {default_config_path:?}");
                MutatorConfig::load_from_file(&default_config_path)?
            } else {
                MutatorConfig::default()
            }
        }
    };

    let value = match &cli.input {
        Some(path) => std::fs::read(path)
            .map_err(|e| anyhow::anyhow!("Failed to read input file {path:?}: {e}"))?,
        None => DEFAULT_VALUE.to_le_bytes().to_vec(),
    };

    let capacity = cli.capacity.unwrap_or(value.len().max(1) * 4);
    anyhow::ensure!(
        capacity >= value.len(),
        "capacity {} cannot hold the {}-byte input",
        capacity,
        value.len()
    );

    let mut buffer = vec![0u8; capacity];
    buffer[..value.len()].copy_from_slice(&value);
    let mut size = value.len();

    let seed = cli.seed.or(config.seed).unwrap_or(0);
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let engine = HavocEngine::with_settings(config.havoc.clone());

    println!(
        "Mutating {size} bytes in a {capacity}-byte buffer for {} passes (seed {seed})",
        cli.iterations
    );

    let started = Instant::now();
    for _ in 0..cli.iterations {
        size = engine.havoc(&mut buffer, size, &mut rng)?;
    }
    let elapsed = started.elapsed();

    let digest = md5::compute(&buffer[..size]);
    println!(
        "Done: {} passes in {:.3}s, final size {size}, md5 {:x}",
        cli.iterations,
        elapsed.as_secs_f64(),
        digest
    );

    if let Some(output_path) = cli.output {
        std::fs::write(&output_path, &buffer[..size])
            .map_err(|e| anyhow::anyhow!("Failed to write output file {output_path:?}: {e}"))?;
        println!("Wrote mutated value to {output_path:?}");
    }

    Ok(())
}
