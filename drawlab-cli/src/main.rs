//! DrawLab CLI: backtest, tuning, merge, forecast and report commands.
//!
//! Commands:
//! - `backtest`: walk-forward backtest of the `[predictor]` configuration
//! - `tune`: grid, candidate and random search over one index chunk
//! - `merge`: combine `tuning_chunk_*.json` files from a directory
//! - `predict`: tickets for the draw after the loaded history
//! - `report`: Markdown summary of a tuning result file
//!
//! Settings come from an optional TOML file (`--config`). The flags below
//! override it and can also be set through the environment.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::info;
use tracing_subscriber::{prelude::*, EnvFilter};

use drawlab_runner::export::{
    export_forecast_csv, export_tuning_csv, generate_tuning_report, save_json, write_artifact,
};
use drawlab_runner::{
    load_draws, load_target_features, merge_dir, read_tuning_report, run_backtest, run_forecast,
    run_tuning, BacktestReport, DrawLabConfig, ForecastReport, SearchGroup, TuningReport,
};

#[derive(Parser)]
#[command(
    name = "drawlab",
    about = "DrawLab CLI: adaptive lottery number weighting and backtesting"
)]
struct Cli {
    /// Path to a TOML config file. Defaults apply when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: Overrides,

    #[command(subcommand)]
    command: Commands,
}

/// Per-run overrides of config file values.
#[derive(Args, Debug)]
struct Overrides {
    /// Sliding window length in draws.
    #[arg(long, env = "WINDOW", global = true)]
    window: Option<usize>,

    /// Tickets per evaluated draw, and tickets written by `predict`.
    #[arg(long, env = "TICKETS", global = true)]
    tickets: Option<usize>,

    /// Recency decay half-life in draws.
    #[arg(long, env = "HALF_LIFE", global = true)]
    half_life: Option<f64>,

    /// Weight of the uniform component in the final blend.
    #[arg(long, env = "EXPLORE", global = true)]
    explore: Option<f64>,

    /// Draws required before the first evaluation.
    #[arg(long, env = "MIN_HISTORY", global = true)]
    min_history: Option<usize>,

    #[arg(long, env = "SEED", global = true)]
    seed: Option<u32>,

    /// Lookback for the hot/cold split.
    #[arg(long, env = "COLD_WINDOW", global = true)]
    cold_window: Option<usize>,

    #[arg(long, env = "HOT_BOOST", global = true)]
    hot_boost: Option<f64>,

    #[arg(long, env = "COLD_BOOST", global = true)]
    cold_boost: Option<f64>,

    /// Evaluate every n-th target draw (tuning only).
    #[arg(long, env = "STRIDE", global = true)]
    stride: Option<usize>,

    /// Random search trials (tuning only).
    #[arg(long, env = "RANDOM_TRIALS", global = true)]
    random_trials: Option<usize>,

    /// First target index of the chunk (tuning only).
    #[arg(long, env = "START_IDX", global = true)]
    start_idx: Option<usize>,

    /// End target index of the chunk, exclusive (tuning only).
    #[arg(long, env = "END_IDX", global = true)]
    end_idx: Option<usize>,
}

impl Overrides {
    fn apply(&self, config: &mut DrawLabConfig) {
        let predictor = &mut config.predictor;
        let tuning = &mut config.tuning;
        let forecast = &mut config.forecast;

        if let Some(v) = self.window {
            predictor.window_size = v;
        }
        if let Some(v) = self.tickets {
            predictor.tickets_per_draw = v;
            tuning.tickets_per_draw = v;
            forecast.tickets = v;
        }
        if let Some(v) = self.half_life {
            predictor.half_life = v;
        }
        if let Some(v) = self.explore {
            predictor.explore = v;
        }
        if let Some(v) = self.min_history {
            predictor.min_history = v;
            tuning.min_history = v;
        }
        if let Some(v) = self.seed {
            predictor.seed = v;
            tuning.seed = v;
        }
        if let Some(v) = self.cold_window {
            predictor.cold_window = v;
        }
        if let Some(v) = self.hot_boost {
            predictor.hot_boost = v;
        }
        if let Some(v) = self.cold_boost {
            predictor.cold_boost = v;
        }
        if let Some(v) = self.stride {
            tuning.stride = v;
        }
        if let Some(v) = self.random_trials {
            tuning.random_trials = v;
        }
        if self.start_idx.is_some() {
            tuning.start_idx = self.start_idx;
        }
        if self.end_idx.is_some() {
            tuning.end_idx = self.end_idx;
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Walk-forward backtest of a single configuration.
    Backtest {
        /// Enriched draw history (JSON array).
        #[arg(long, default_value = "data/draws.json")]
        input: PathBuf,

        /// Output JSON with the summary and per-draw records.
        #[arg(long, default_value = "results/backtest.json")]
        output: PathBuf,
    },
    /// Parameter search over one chunk of target draws.
    Tune {
        /// Enriched draw history (JSON array).
        #[arg(long, default_value = "data/draws.json")]
        input: PathBuf,

        /// Output JSON. Name it `tuning_chunk_*.json` to merge it later.
        #[arg(long, default_value = "results/tuning_results.json")]
        output: PathBuf,

        /// Also write a flat CSV table.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Merge the tuning chunk files found in a directory.
    Merge {
        /// Directory holding `tuning_chunk_*.json` files.
        #[arg(long, default_value = "results")]
        dir: PathBuf,

        #[arg(long, default_value = "results/tuning_results.json")]
        output: PathBuf,

        /// Also write a flat CSV table.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Forecast tickets for the next draw.
    Predict {
        /// Enriched draw history (JSON array).
        #[arg(long, default_value = "data/draws.json")]
        input: PathBuf,

        /// Features of the draw being forecast. Astro weighting is neutral without it.
        #[arg(long)]
        target: Option<PathBuf>,

        /// Number of tickets. Overrides `--tickets` and `[forecast] tickets`.
        #[arg(long)]
        count: Option<usize>,

        #[arg(long, default_value = "results/forecast.json")]
        output: PathBuf,

        /// Also write the tickets as CSV.
        #[arg(long)]
        csv: Option<PathBuf>,
    },
    /// Render a Markdown report from a tuning result file.
    Report {
        #[arg(long, default_value = "results/tuning_results.json")]
        input: PathBuf,

        #[arg(long, default_value = "results/tuning_report.md")]
        output: PathBuf,

        /// Rows shown per search group.
        #[arg(long, default_value_t = 10)]
        top: usize,
    },
}

fn init_tracing() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = tracing_subscriber::fmt::layer().with_writer(std::io::stdout);
    tracing_subscriber::registry()
        .with(filter)
        .with(stdout_layer)
        .try_init()
        .context("failed to initialize tracing")
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing()?;

    let path = cli.config.as_deref();
    match cli.command {
        Commands::Backtest { input, output } => {
            let config = load_config(path, &cli.overrides, None)?;
            run_backtest_cmd(&config, &input, &output)
        }
        Commands::Tune { input, output, csv } => {
            let config = load_config(path, &cli.overrides, None)?;
            run_tune_cmd(&config, &input, &output, csv.as_deref())
        }
        Commands::Merge { dir, output, csv } => run_merge(&dir, &output, csv.as_deref()),
        Commands::Predict {
            input,
            target,
            count,
            output,
            csv,
        } => {
            let config = load_config(path, &cli.overrides, count)?;
            run_predict_cmd(&config, &input, target.as_deref(), &output, csv.as_deref())
        }
        Commands::Report { input, output, top } => run_report(&input, &output, top),
    }
}

/// Config file (or defaults), then overrides, then `--count`, then validation.
fn load_config(
    path: Option<&Path>,
    overrides: &Overrides,
    forecast_tickets: Option<usize>,
) -> Result<DrawLabConfig> {
    let mut config = DrawLabConfig::load_or_default(path).context("failed to load configuration")?;
    overrides.apply(&mut config);
    if let Some(n) = forecast_tickets {
        config.forecast.tickets = n;
    }
    config.validate().context("invalid configuration")?;
    Ok(config)
}

fn run_backtest_cmd(config: &DrawLabConfig, input: &Path, output: &Path) -> Result<()> {
    let loaded = load_draws(input).context("failed to load draws")?;
    let report = run_backtest(&loaded, &config.predictor)?;

    print_backtest_summary(&report);

    save_json(output, &report)?;
    println!("Results saved to: {}", output.display());
    Ok(())
}

fn run_tune_cmd(
    config: &DrawLabConfig,
    input: &Path,
    output: &Path,
    csv: Option<&Path>,
) -> Result<()> {
    let loaded = load_draws(input).context("failed to load draws")?;
    let report = run_tuning(&loaded, &config.tuning)?;

    print_tuning_summary(&report);
    save_tuning(&report, output, csv)
}

fn run_merge(dir: &Path, output: &Path, csv: Option<&Path>) -> Result<()> {
    let report =
        merge_dir(dir).with_context(|| format!("failed to merge chunks in {}", dir.display()))?;
    info!(chunks = report.summary.chunks, results = report.len(), "merge finished");

    print_tuning_summary(&report);
    save_tuning(&report, output, csv)
}

fn run_predict_cmd(
    config: &DrawLabConfig,
    input: &Path,
    target: Option<&Path>,
    output: &Path,
    csv: Option<&Path>,
) -> Result<()> {
    let loaded = load_draws(input).context("failed to load draws")?;
    let target = target
        .map(load_target_features)
        .transpose()
        .context("failed to load target features")?;
    let report = run_forecast(&loaded, target, &config.predictor, &config.forecast)?;

    print_forecast_summary(&report);

    save_json(output, &report)?;
    println!("Forecast saved to: {}", output.display());
    if let Some(path) = csv {
        write_artifact(path, &export_forecast_csv(&report.forecast)?)?;
        println!("Tickets CSV saved to: {}", path.display());
    }
    Ok(())
}

fn run_report(input: &Path, output: &Path, top: usize) -> Result<()> {
    let report = read_tuning_report(input)?;
    write_artifact(output, &generate_tuning_report(&report, top))?;
    println!("Report saved to: {}", output.display());
    Ok(())
}

fn save_tuning(report: &TuningReport, output: &Path, csv: Option<&Path>) -> Result<()> {
    save_json(output, report)?;
    println!("Results saved to: {}", output.display());
    if let Some(path) = csv {
        write_artifact(path, &export_tuning_csv(report)?)?;
        println!("CSV saved to: {}", path.display());
    }
    Ok(())
}

fn print_backtest_summary(report: &BacktestReport) {
    let s = &report.summary;
    println!();
    println!("=== Backtest Summary ===");
    println!("Dataset:          {}", report.dataset_hash.short());
    println!(
        "Window:           {} (half-life {}, explore {})",
        s.window_size, s.half_life, s.explore
    );
    println!(
        "Hot/Cold:         lookback {}, boosts {} / {}",
        s.cold_window, s.hot_boost, s.cold_boost
    );
    println!("Tickets/Draw:     {}", s.tickets_per_draw);
    println!("Seed:             {}", s.seed);
    println!();
    println!("Evaluated Draws:  {}", s.total_draws);
    println!("Avg Best Hits:    {:.4}", s.avg_best_hits);
    println!("Avg Hits:         {:.4}", s.avg_avg_hits);
    println!("Best >= 2:        {:.2}%", s.pct_at_least_2 * 100.0);
    println!("Best >= 3:        {:.2}%", s.pct_at_least_3 * 100.0);
    println!();
}

fn print_tuning_summary(report: &TuningReport) {
    let s = &report.summary;
    println!();
    println!("=== Tuning Summary ===");
    println!("Dataset:          {}", s.dataset_hash.short());
    println!("Target Range:     {}..{} (stride {})", s.start_idx, s.end_idx, s.stride);
    println!("Evaluated Draws:  {}", s.evaluated_draws);
    if s.chunks > 1 {
        println!("Chunks:           {}", s.chunks);
    }
    for group in SearchGroup::ALL {
        println!("{:<17} {}", format!("{}:", group.title()), report.group(group).len());
    }

    if let Some((group, best)) = report.best() {
        let p = &best.params;
        println!();
        println!("Best ({group}): {}", if best.name.is_empty() { "-" } else { best.name.as_str() });
        println!(
            "  window {}, half-life {}, explore {}, hot {}, cold {}, cold window {}",
            p.window_size, p.half_life, p.explore, p.hot_boost, p.cold_boost, p.cold_window
        );
        println!(
            "  avg best {:.4}, avg {:.4}, >=2 {:.2}%, >=3 {:.2}%",
            best.rates.avg_best_hits,
            best.rates.avg_avg_hits,
            best.rates.pct_at_least_2 * 100.0,
            best.rates.pct_at_least_3 * 100.0
        );
    }
    println!();
}

fn print_forecast_summary(report: &ForecastReport) {
    let f = &report.forecast;
    let join = |nums: &[u8]| {
        nums.iter()
            .map(|n| format!("{n:02}"))
            .collect::<Vec<_>>()
            .join(" ")
    };

    println!();
    println!("=== Forecast ===");
    println!("History:          {} draws", report.history_draws);
    if let Some(id) = report.last_draw_id {
        println!("Next Draw:        {}", id + 1);
    }
    println!(
        "Coefficients:     freq {:.3}, recency {:.3}, astro {:.3}",
        f.coefficients.freq, f.coefficients.recency, f.coefficients.astro
    );
    println!("Hot:              {}", join(&f.hot_numbers));
    println!("Cold:             {} numbers", f.cold_numbers.len());
    println!();
    for (i, scored) in f.tickets.iter().enumerate() {
        println!(
            "{:>3}. {}  (entropy {:.3})",
            i + 1,
            join(scored.ticket.numbers()),
            scored.entropy
        );
    }
    println!();
}
