//! deepdig - A deterministic 2D mining world engine
//!
//! Headless runner: builds a world from configuration, plays an input script
//! for a fixed number of ticks and writes the event stream and a save.

mod config;
mod headless;
mod scripted_input;

use anyhow::Result;
use config::GameConfig;
use headless::HeadlessConfig;
use std::{env, path::PathBuf};
use tracing::info;

const DEFAULT_TICKS: u64 = 600;

fn main() -> Result<()> {
    // Initialize tracing with INFO level by default (can be overridden via RUST_LOG env var)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    info!("Starting deepdig v{}", env!("CARGO_PKG_VERSION"));

    let cli = CliOptions::parse(env::args().skip(1));
    if cli.help {
        print_usage();
        return Ok(());
    }

    let mut game = match &cli.config {
        Some(path) => GameConfig::load_from_path(path),
        None => GameConfig::load(),
    };
    if let Some(seed) = cli.seed {
        game.world.seed = seed;
    }
    if let Some(path) = &cli.write_config {
        game.save_to_path(path)?;
        info!(path = %path.display(), "Wrote effective configuration");
    }

    let ticks = cli.ticks.unwrap_or(DEFAULT_TICKS);
    info!(seed = game.world.seed, ticks, "Running headless simulation");
    headless::run(HeadlessConfig {
        game,
        ticks,
        script: cli.script,
        events: cli.events,
        save: cli.save,
        load: cli.load,
        exit_when_script_finished: cli.exit_when_script_finished,
    })?;
    Ok(())
}

fn print_usage() {
    println!(
        "usage: deepdig [--config PATH] [--seed N] [--ticks N] [--script PATH] \
         [--events PATH] [--save PATH] [--load PATH] [--write-config PATH] \
         [--exit-when-script-finished]"
    );
}

#[derive(Debug, Clone, Default, PartialEq)]
struct CliOptions {
    help: bool,
    config: Option<PathBuf>,
    seed: Option<u64>,
    ticks: Option<u64>,
    script: Option<PathBuf>,
    events: Option<PathBuf>,
    save: Option<PathBuf>,
    load: Option<PathBuf>,
    write_config: Option<PathBuf>,
    exit_when_script_finished: bool,
}

impl CliOptions {
    fn parse<I: Iterator<Item = String>>(mut args: I) -> Self {
        let mut opts = CliOptions::default();

        while let Some(arg) = args.next() {
            match arg.as_str() {
                "-h" | "--help" => opts.help = true,
                "--config" => opts.config = path_arg(&arg, args.next()),
                "--script" => opts.script = path_arg(&arg, args.next()),
                "--events" => opts.events = path_arg(&arg, args.next()),
                "--save" => opts.save = path_arg(&arg, args.next()),
                "--load" => opts.load = path_arg(&arg, args.next()),
                "--write-config" => opts.write_config = path_arg(&arg, args.next()),
                "--seed" => opts.seed = int_arg(&arg, args.next()),
                "--ticks" => opts.ticks = int_arg(&arg, args.next()),
                "--exit-when-script-finished" => opts.exit_when_script_finished = true,
                other => {
                    tracing::warn!(arg = %other, "Ignoring unknown argument");
                }
            }
        }

        opts
    }
}

fn path_arg(flag: &str, value: Option<String>) -> Option<PathBuf> {
    match value {
        Some(path) => Some(PathBuf::from(path)),
        None => {
            tracing::error!("{flag} requires a file path");
            None
        }
    }
}

fn int_arg(flag: &str, value: Option<String>) -> Option<u64> {
    let Some(raw) = value else {
        tracing::error!("{flag} requires an integer");
        return None;
    };
    match raw.parse::<u64>() {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::error!(%err, value = %raw, "{flag} must be an integer");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> CliOptions {
        CliOptions::parse(args.iter().map(|s| s.to_string()))
    }

    #[test]
    fn flags_are_parsed() {
        let opts = parse(&[
            "--seed",
            "42",
            "--ticks",
            "120",
            "--script",
            "demos/dig_down.json",
            "--save",
            "out/save.json",
            "--exit-when-script-finished",
        ]);
        assert_eq!(opts.seed, Some(42));
        assert_eq!(opts.ticks, Some(120));
        assert_eq!(opts.script, Some(PathBuf::from("demos/dig_down.json")));
        assert_eq!(opts.save, Some(PathBuf::from("out/save.json")));
        assert!(opts.exit_when_script_finished);
        assert_eq!(opts.load, None);
    }

    #[test]
    fn bad_values_are_dropped() {
        let opts = parse(&["--seed", "forty-two", "--ticks"]);
        assert_eq!(opts.seed, None);
        assert_eq!(opts.ticks, None);
    }
}
