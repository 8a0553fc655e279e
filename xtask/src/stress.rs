//! Randomized stress runner
//!
//! This module provides the `stress` subcommand. It drives a `TreeMap` and a
//! `std::collections::BTreeMap` through the same weighted sequence of
//! operations, fails on the first disagreement, and periodically checks the
//! red-black invariants with `TreeMap::validate`.

use anyhow::{Context, Result, bail};
use clap::Args;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rbmap::map::TreeMap;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::ops::Bound;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info};

/// Arguments for the stress subcommand
#[derive(Args, Debug, Default)]
pub struct StressArgs {
    /// Scenario YAML file path
    #[arg(long, short = 's')]
    pub scenario: Option<PathBuf>,

    /// Random seed for a reproducible run
    #[arg(long)]
    pub seed: Option<u64>,

    /// Number of operations to perform
    #[arg(long)]
    pub operations: Option<u64>,

    /// Keys are drawn from 0..key_space
    #[arg(long)]
    pub key_space: Option<u32>,

    /// Validate the tree every N operations (0 = only at the end)
    #[arg(long)]
    pub validate_every: Option<u64>,

    /// Write a JSON report to this path
    #[arg(long)]
    pub report: Option<PathBuf>,
}

/// Scenario configuration from YAML
#[derive(Debug, Default, Deserialize)]
struct ScenarioConfig {
    name: Option<String>,
    seed: Option<u64>,
    operations: Option<u64>,
    key_space: Option<u32>,
    validate_every: Option<u64>,
    weights: Option<Weights>,
}

/// Relative frequency of each operation kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
struct Weights {
    insert: u32,
    erase: u32,
    lookup: u32,
    bounds: u32,
    erase_range: u32,
}

impl Default for Weights {
    fn default() -> Self {
        Self {
            insert: 40,
            erase: 30,
            lookup: 15,
            bounds: 10,
            erase_range: 5,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum OperationKind {
    Insert,
    Erase,
    Lookup,
    Bounds,
    EraseRange,
}

impl Weights {
    /// Sum of all weights, `None` if it does not fit in a `u32`.
    fn total(&self) -> Option<u32> {
        self.insert
            .checked_add(self.erase)?
            .checked_add(self.lookup)?
            .checked_add(self.bounds)?
            .checked_add(self.erase_range)
    }

    /// Maps a roll in `0..total()` onto an operation kind.
    const fn pick(&self, roll: u32) -> OperationKind {
        let mut threshold = self.insert;
        if roll < threshold {
            return OperationKind::Insert;
        }
        threshold += self.erase;
        if roll < threshold {
            return OperationKind::Erase;
        }
        threshold += self.lookup;
        if roll < threshold {
            return OperationKind::Lookup;
        }
        threshold += self.bounds;
        if roll < threshold {
            return OperationKind::Bounds;
        }
        OperationKind::EraseRange
    }
}

/// Fully resolved run configuration
#[derive(Debug, Clone, PartialEq, Eq)]
struct StressConfig {
    name: String,
    seed: u64,
    operations: u64,
    key_space: u32,
    validate_every: u64,
    weights: Weights,
}

impl StressConfig {
    /// Priority: CLI > Environment > Scenario YAML > Default
    ///
    /// A missing seed is drawn from the OS so that every unseeded run
    /// explores a different sequence; the chosen seed is logged.
    fn resolve(
        args: &StressArgs,
        scenario: &ScenarioConfig,
        environment: impl Fn(&str) -> Option<String>,
    ) -> Result<Self> {
        let seed = args
            .seed
            .or_else(|| environment("RBMAP_SEED").and_then(|value| value.parse().ok()))
            .or(scenario.seed)
            .unwrap_or_else(|| StdRng::from_os_rng().random());

        let operations = args
            .operations
            .or_else(|| environment("RBMAP_OPERATIONS").and_then(|value| value.parse().ok()))
            .or(scenario.operations)
            .unwrap_or(100_000);

        let key_space = args.key_space.or(scenario.key_space).unwrap_or(1024);
        let validate_every = args
            .validate_every
            .or(scenario.validate_every)
            .unwrap_or(1000);
        let weights = scenario.weights.unwrap_or_default();

        if key_space == 0 {
            bail!("key_space must be positive");
        }
        match weights.total() {
            None => bail!("operation weights must sum to at most {}", u32::MAX),
            Some(0) => bail!("at least one operation weight must be positive"),
            Some(_) => {}
        }

        Ok(Self {
            name: scenario
                .name
                .clone()
                .unwrap_or_else(|| "default".to_string()),
            seed,
            operations,
            key_space,
            validate_every,
            weights,
        })
    }
}

/// Summary written at the end of a successful run
#[derive(Debug, Default, Serialize)]
struct StressReport {
    scenario: String,
    seed: u64,
    operations: u64,
    weights: Weights,
    inserts: u64,
    erases: u64,
    lookups: u64,
    bound_queries: u64,
    range_erases: u64,
    validations: u64,
    final_length: usize,
    max_height: usize,
    final_black_height: usize,
    elapsed_ms: u128,
}

/// Runs the configured workload, comparing every result with the oracle.
fn execute(config: &StressConfig) -> Result<StressReport> {
    let started = Instant::now();
    let mut rng = StdRng::seed_from_u64(config.seed);
    let mut map: TreeMap<u32, u64> = TreeMap::new();
    let mut oracle: BTreeMap<u32, u64> = BTreeMap::new();
    let mut report = StressReport {
        scenario: config.name.clone(),
        seed: config.seed,
        operations: config.operations,
        weights: config.weights,
        ..StressReport::default()
    };
    let total = config
        .weights
        .total()
        .context("operation weights overflow")?;

    for step in 0..config.operations {
        let key = rng.random_range(0..config.key_space);
        match config.weights.pick(rng.random_range(0..total)) {
            OperationKind::Insert => {
                let value: u64 = rng.random();
                let (position, inserted) = map.insert(key, value);
                let expected = !oracle.contains_key(&key);
                oracle.entry(key).or_insert(value);
                if inserted != expected {
                    bail!("step {step}: insert({key}) returned {inserted}, expected {expected}");
                }
                if map.get_at(position).map(|(found, _)| *found) != Some(key) {
                    bail!("step {step}: insert({key}) returned a position for another key");
                }
                report.inserts += 1;
            }
            OperationKind::Erase => {
                let removed = map.erase(&key);
                let expected = usize::from(oracle.remove(&key).is_some());
                if removed != expected {
                    bail!("step {step}: erase({key}) removed {removed}, expected {expected}");
                }
                report.erases += 1;
            }
            OperationKind::Lookup => {
                if map.get(&key) != oracle.get(&key) {
                    bail!("step {step}: get({key}) disagrees with oracle");
                }
                report.lookups += 1;
            }
            OperationKind::Bounds => {
                let lower = map.get_at(map.lower_bound(&key)).map(|(found, _)| *found);
                let expected_lower = oracle.range(key..).next().map(|(found, _)| *found);
                if lower != expected_lower {
                    bail!("step {step}: lower_bound({key}) = {lower:?}, want {expected_lower:?}");
                }
                let upper = map.get_at(map.upper_bound(&key)).map(|(found, _)| *found);
                let expected_upper = oracle
                    .range((Bound::Excluded(key), Bound::Unbounded))
                    .next()
                    .map(|(found, _)| *found);
                if upper != expected_upper {
                    bail!("step {step}: upper_bound({key}) = {upper:?}, want {expected_upper:?}");
                }
                report.bound_queries += 1;
            }
            OperationKind::EraseRange => {
                let end = key.saturating_add(rng.random_range(1..=8));
                let removed = map
                    .erase_range(map.lower_bound(&key), map.lower_bound(&end))
                    .with_context(|| format!("step {step}: erase_range({key}..{end})"))?;
                let doomed: Vec<u32> = oracle.range(key..end).map(|(found, _)| *found).collect();
                for doomed_key in &doomed {
                    oracle.remove(doomed_key);
                }
                if removed != doomed.len() {
                    bail!(
                        "step {step}: erase_range({key}..{end}) removed {removed}, expected {}",
                        doomed.len()
                    );
                }
                report.range_erases += 1;
            }
        }

        if map.len() != oracle.len() {
            bail!(
                "step {step}: length {} disagrees with oracle length {}",
                map.len(),
                oracle.len()
            );
        }

        if config.validate_every > 0 && (step + 1) % config.validate_every == 0 {
            let shape = map
                .validate()
                .with_context(|| format!("invariants broken after step {step}"))?;
            report.validations += 1;
            report.max_height = report.max_height.max(shape.height);
            debug!(
                step,
                length = map.len(),
                height = shape.height,
                black_height = shape.black_height,
                "validated"
            );
        }
    }

    let shape = map
        .validate()
        .context("invariants broken at the end of the run")?;
    if !map.iter().eq(oracle.iter()) {
        bail!("final in-order sequence disagrees with oracle");
    }

    report.validations += 1;
    report.max_height = report.max_height.max(shape.height);
    report.final_black_height = shape.black_height;
    report.final_length = map.len();
    report.elapsed_ms = started.elapsed().as_millis();
    Ok(report)
}

/// Get project root directory
fn project_root() -> PathBuf {
    let manifest_dir = env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."));

    // xtask is in project_root/xtask, so go up one level
    if manifest_dir.ends_with("xtask") {
        manifest_dir
            .parent()
            .map_or_else(|| manifest_dir.clone(), Path::to_path_buf)
    } else {
        manifest_dir
    }
}

/// Resolves a scenario path, falling back to `xtask/scenarios/`.
fn resolve_scenario_path(root: &Path, scenario: &Path) -> Result<PathBuf> {
    let direct = if scenario.is_absolute() {
        scenario.to_path_buf()
    } else {
        root.join(scenario)
    };
    if direct.exists() {
        return Ok(direct);
    }

    let alternative = root.join("xtask/scenarios").join(scenario);
    if alternative.exists() {
        Ok(alternative)
    } else {
        bail!(
            "Scenario file not found: {} or {}",
            direct.display(),
            alternative.display()
        );
    }
}

/// Main entry point for the stress command
pub fn run(args: StressArgs) -> Result<()> {
    let root = project_root();

    let scenario = match &args.scenario {
        Some(path) => {
            let path = resolve_scenario_path(&root, path)?;
            let content = fs::read_to_string(&path).context("Failed to read scenario file")?;
            serde_yaml::from_str(&content).context("Failed to parse scenario YAML")?
        }
        None => ScenarioConfig::default(),
    };

    let config = StressConfig::resolve(&args, &scenario, |name| env::var(name).ok())?;

    info!(
        scenario = %config.name,
        seed = config.seed,
        operations = config.operations,
        key_space = config.key_space,
        validate_every = config.validate_every,
        "starting stress run"
    );

    let report = execute(&config)
        .with_context(|| format!("stress run failed (seed {})", config.seed))?;

    info!(
        final_length = report.final_length,
        max_height = report.max_height,
        validations = report.validations,
        elapsed_ms = report.elapsed_ms as u64,
        "stress run passed"
    );

    if let Some(path) = &args.report {
        let path = if path.is_absolute() {
            path.clone()
        } else {
            root.join(path)
        };
        let json = serde_json::to_string_pretty(&report).context("Failed to encode report")?;
        fs::write(&path, json)
            .with_context(|| format!("Failed to write report to {}", path.display()))?;
        info!(path = %path.display(), "report written");
    }

    Ok(())
}
