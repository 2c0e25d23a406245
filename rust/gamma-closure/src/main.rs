//! gamma-closure CLI: classify Gamma(n) generator sets over a range of moduli.
//!
//! Usage:
//!   gamma-closure --from=2 --to=49
//!
//! Options:
//!   --from=<N>              First modulus (default: 2)
//!   --to=<N>                Last modulus, inclusive (default: 49)
//!   --generators-dir=<dir>  Directory holding gamma_{n}_generators.txt (default: generators)
//!   --threads=<N>           Worker threads (default: 16)
//!   --batch-size=<N>        Candidates per task (default: 32)
//!   --policy=ladder|cycle   Escalation policy (default: ladder)
//!   --ceiling=<N>           Highest multiplication level (default: 2)
//!   --modulus-power=<K>     Reduce arithmetic mod n^K (default: 2)
//!   --format=gamma|tilde    Generator file encoding; tilde rows hold (X - I)/n (default: gamma)
//!   --no-pruning            Test every generator instead of one per class
//!   --config=<file.json>    Load settings; flags above override it
//!   --report=<file.json>    Write the full run summary as JSON
//!   --stats-dir=<dir>       Write per-modulus gamma_{n}_stat.json files

use std::path::{Path, PathBuf};
use std::time::Instant;

use gamma_core::GeneratorFormat;

use gamma_closure::config::ClosureConfig;
use gamma_closure::error::{ClassifyError, ConfigError};
use gamma_closure::escalation::EscalationPolicy;
use gamma_closure::pool::{TaskExecutor, WorkerPool};
use gamma_closure::report::{LoadFailure, ModulusOutcome, RunSummary};
use gamma_closure::state::classify;

/// CLI configuration parsed from command-line arguments.
struct CliConfig {
    from: u64,
    to: u64,
    generators_dir: PathBuf,
    config_file: Option<PathBuf>,
    threads: Option<usize>,
    batch_size: Option<usize>,
    policy: Option<EscalationPolicy>,
    ceiling: Option<usize>,
    modulus_power: Option<u32>,
    format: Option<GeneratorFormat>,
    no_pruning: bool,
    report: Option<PathBuf>,
    stats_dir: Option<PathBuf>,
}

fn flag_value<'a>(args: &'a [String], name: &str) -> Option<&'a str> {
    let prefix = format!("--{}=", name);
    args.iter().find_map(|a| a.strip_prefix(prefix.as_str()))
}

fn parse_args() -> CliConfig {
    let args: Vec<String> = std::env::args().collect();

    let from = flag_value(&args, "from")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(2);

    let to = flag_value(&args, "to")
        .and_then(|v| v.parse::<u64>().ok())
        .unwrap_or(49);

    let generators_dir = flag_value(&args, "generators-dir")
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("generators"));

    let policy = flag_value(&args, "policy").and_then(|v| match v.parse::<EscalationPolicy>() {
        Ok(p) => Some(p),
        Err(e) => {
            eprintln!("Ignoring --policy: {}", e);
            None
        }
    });

    let format = flag_value(&args, "format").and_then(|v| match v.parse::<GeneratorFormat>() {
        Ok(f) => Some(f),
        Err(e) => {
            eprintln!("Ignoring --format: {}", e);
            None
        }
    });

    CliConfig {
        from,
        to,
        generators_dir,
        config_file: flag_value(&args, "config").map(PathBuf::from),
        threads: flag_value(&args, "threads").and_then(|v| v.parse().ok()),
        batch_size: flag_value(&args, "batch-size").and_then(|v| v.parse().ok()),
        policy,
        ceiling: flag_value(&args, "ceiling").and_then(|v| v.parse().ok()),
        modulus_power: flag_value(&args, "modulus-power").and_then(|v| v.parse().ok()),
        format,
        no_pruning: args.iter().any(|a| a == "--no-pruning"),
        report: flag_value(&args, "report").map(PathBuf::from),
        stats_dir: flag_value(&args, "stats-dir").map(PathBuf::from),
    }
}

/// File settings first, then command-line overrides.
fn resolve_config(cli: &CliConfig) -> Result<ClosureConfig, ConfigError> {
    let mut config = match &cli.config_file {
        Some(path) => ClosureConfig::from_json_file(path)?,
        None => ClosureConfig::default(),
    };
    if let Some(threads) = cli.threads {
        config.threads = threads;
    }
    if let Some(batch_size) = cli.batch_size {
        config.batch_size = batch_size;
    }
    if let Some(policy) = cli.policy {
        config.policy = policy;
    }
    if let Some(ceiling) = cli.ceiling {
        config.ceiling = ceiling;
    }
    if let Some(power) = cli.modulus_power {
        config.modulus_power = power;
    }
    if let Some(format) = cli.format {
        config.format = format;
    }
    if cli.no_pruning {
        config.pruning = false;
    }
    config.validate()?;
    Ok(config)
}

fn write_json<T: serde::Serialize>(path: &Path, value: &T) -> std::io::Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let json = serde_json::to_string_pretty(value).map_err(std::io::Error::other)?;
    std::fs::write(path, json)
}

fn run_modulus(
    n: u64,
    cli: &CliConfig,
    config: &ClosureConfig,
    pool: &WorkerPool,
) -> Result<ModulusOutcome, ClassifyError> {
    let (arith, set) = config.load_modulus(&cli.generators_dir, n)?;
    log::info!("Gamma({}): {} generators loaded", n, set.len());

    let options = config.classifier_options();
    Ok(classify(&arith, &set, pool, &options))
}

fn main() {
    env_logger::init();

    let cli = parse_args();

    println!("========================================");
    println!("  gamma-closure: Generator Closure Search");
    println!("========================================");
    println!();

    let config = match resolve_config(&cli) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error: {}", e);
            std::process::exit(1);
        }
    };

    let pool = match WorkerPool::new(config.threads) {
        Ok(pool) => pool,
        Err(e) => {
            eprintln!("Error: {}", ConfigError::from(e));
            std::process::exit(1);
        }
    };

    println!("Moduli:          {}..={}", cli.from, cli.to);
    println!("Generators dir:  {}", cli.generators_dir.display());
    println!("Workers:         {}", pool.workers());
    println!("Batch size:      {}", config.batch_size);
    println!(
        "Escalation:      {:?} (ceiling {}): {}",
        config.policy,
        config.ceiling,
        config
            .escalation_table()
            .steps()
            .iter()
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" -> ")
    );
    println!("Class pruning:   {}", if config.pruning { "on" } else { "off" });
    println!("Reduction:       n^{}", config.modulus_power);
    if config.format == GeneratorFormat::Tilde {
        println!("Format:          tilde (X = I + nY)");
    }
    println!();

    println!(
        "{:>5} {:>7} {:>7} {:>9} {:>6} {:>10} {:>10}  {}",
        "n", "gens", "classes", "success", "rounds", "strategy", "time", "status"
    );
    println!("{}", "-".repeat(78));

    let start = Instant::now();
    let mut summary = RunSummary::new(config.clone());

    for n in cli.from..=cli.to {
        let mut outcome = match run_modulus(n, &cli, &config, &pool) {
            Ok(outcome) => outcome,
            Err(e) => {
                log::error!("{}", e);
                println!("{:>5} {:>62}  SKIPPED ({})", n, "", e);
                summary.load_failures.push(LoadFailure {
                    modulus: n,
                    message: e.to_string(),
                });
                continue;
            }
        };

        println!("{}", outcome);
        if let Some(e) = outcome.error() {
            log::error!("{}", e);
        }

        if let Some(dir) = &cli.stats_dir {
            let path = dir.join(format!("gamma_{}_stat.json", n));
            if let Err(e) = write_json(&path, &outcome.stats) {
                log::warn!("Failed to write {}: {}", path.display(), e);
            }
        }
        // Per-generator stats go to their own files, not the summary.
        outcome.stats = Vec::new();
        summary.outcomes.push(outcome);
    }

    println!("{}", "-".repeat(78));
    println!();
    println!("Summary ({:.1}s):", start.elapsed().as_secs_f64());
    println!("  Succeeded:     {}", summary.succeeded());
    println!("  Failed:        {}", summary.failed());
    println!("  Skipped:       {}", summary.load_failures.len());

    let failed: Vec<String> = summary
        .outcomes
        .iter()
        .filter(|o| !o.succeeded())
        .map(|o| o.modulus.to_string())
        .collect();
    if !failed.is_empty() {
        println!("  Failed moduli: {}", failed.join(", "));
    }

    if let Some(path) = &cli.report {
        match write_json(path, &summary) {
            Ok(()) => println!("\nReport written to {}", path.display()),
            Err(e) => log::error!("Failed to write report {}: {}", path.display(), e),
        }
    }
}
