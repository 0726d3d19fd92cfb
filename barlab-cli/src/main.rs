//! BarLab CLI: compute and replay indicator charts over CSV bars.
//!
//! Commands:
//! - `compute`: load one or more bar files, build a chart per file from a
//!   TOML config and print (or save) every indicator output
//! - `replay`: feed a bar file one bar per session and verify the result
//!   against a single batch refresh
//! - `indicators`: list indicator kinds with their default options

mod bars;

use anyhow::{bail, Context, Result};
use barlab_core::chart::Chart;
use barlab_core::config::ChartConfig;
use barlab_core::domain::Bar;
use barlab_core::indicators::IndicatorKind;
use barlab_core::series::is_sentinel;
use chrono::NaiveDateTime;
use clap::{Parser, Subcommand, ValueEnum};
use log::info;
use rayon::prelude::*;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "barlab",
    about = "BarLab CLI: incremental indicator engine over CSV bars"
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Format {
    Csv,
    Json,
}

#[derive(Subcommand)]
enum Commands {
    /// Compute every configured indicator over one or more bar files.
    Compute {
        /// CSV bar files (time,open,high,low,close,volume).
        #[arg(long, required = true, num_args = 1..)]
        bars: Vec<PathBuf>,

        /// Chart config TOML. Defaults to one of each indicator kind.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Compute through this bar index only.
        #[arg(long)]
        to: Option<usize>,

        /// Output format.
        #[arg(long, value_enum, default_value_t = Format::Csv)]
        format: Format,

        /// Write `<file stem>.<format>` here instead of printing.
        #[arg(long)]
        output_dir: Option<PathBuf>,
    },
    /// Replay a bar file one bar per session and check it against a batch run.
    Replay {
        /// CSV bar file.
        #[arg(long)]
        bars: PathBuf,

        /// Chart config TOML. Defaults to one of each indicator kind.
        #[arg(long)]
        config: Option<PathBuf>,

        /// Revise each bar this many times before the next one arrives.
        #[arg(long, default_value_t = 0)]
        revisions: usize,
    },
    /// List indicator kinds and their default options.
    Indicators,
}

fn main() -> Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    match cli.command {
        Commands::Compute {
            bars,
            config,
            to,
            format,
            output_dir,
        } => run_compute(&bars, config.as_deref(), to, format, output_dir.as_deref()),
        Commands::Replay {
            bars,
            config,
            revisions,
        } => run_replay(&bars, config.as_deref(), revisions),
        Commands::Indicators => run_indicators(),
    }
}

fn load_config(path: Option<&Path>, symbol: &str) -> Result<ChartConfig> {
    match path {
        Some(path) => {
            let mut config = ChartConfig::from_file(path)?;
            config.symbol = symbol.to_string();
            Ok(config)
        }
        None => Ok(ChartConfig::default_chart(symbol)),
    }
}

fn symbol_of(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "UNKNOWN".into())
}

fn build_chart(config: &ChartConfig, bars: &[Bar]) -> Result<Chart> {
    let chart = Chart::from_config(config)?;
    for bar in bars {
        chart.append(bar)?;
    }
    Ok(chart)
}

// ── Output table ─────────────────────────────────────────────────────

/// Every indicator output of a chart, one column per output.
#[derive(Debug, Serialize)]
struct ChartTable {
    symbol: String,
    timeframe: String,
    columns: Vec<String>,
    rows: Vec<TableRow>,
}

#[derive(Debug, Serialize)]
struct TableRow {
    time: NaiveDateTime,
    values: Vec<Option<f32>>,
}

impl ChartTable {
    fn from_chart(chart: &Chart, through: usize) -> Self {
        let base = chart.base();
        let outputs: Vec<_> = chart
            .indicators()
            .flat_map(|ind| {
                ind.outputs()
                    .iter()
                    .map(move |o| (format!("{}.{}", ind.kind(), o.name()), o.series()))
            })
            .collect();
        let rows = (0..base.len().min(through.saturating_add(1)))
            .filter_map(|i| {
                let time = base.time_at(i)?;
                let values = outputs
                    .iter()
                    .map(|(_, series)| Some(series.get(i)).filter(|v| !is_sentinel(*v)))
                    .collect();
                Some(TableRow { time, values })
            })
            .collect();
        Self {
            symbol: base.symbol().to_string(),
            timeframe: base.timeframe().to_string(),
            columns: outputs.into_iter().map(|(name, _)| name).collect(),
            rows,
        }
    }

    fn write_csv<W: Write>(&self, writer: W) -> Result<()> {
        let mut csv = csv::Writer::from_writer(writer);
        let mut header = vec!["time".to_string()];
        header.extend(self.columns.iter().cloned());
        csv.write_record(&header)?;
        for row in &self.rows {
            let mut record = vec![row.time.to_string()];
            record.extend(
                row.values
                    .iter()
                    .map(|v| v.map(|v| v.to_string()).unwrap_or_default()),
            );
            csv.write_record(&record)?;
        }
        csv.flush()?;
        Ok(())
    }

    fn write<W: Write>(&self, format: Format, mut writer: W) -> Result<()> {
        match format {
            Format::Csv => self.write_csv(writer),
            Format::Json => {
                serde_json::to_writer_pretty(&mut writer, self)?;
                writeln!(writer)?;
                Ok(())
            }
        }
    }
}

// ── Commands ─────────────────────────────────────────────────────────

fn compute_file(
    path: &Path,
    config_path: Option<&Path>,
    to: Option<usize>,
) -> Result<ChartTable> {
    let bars = bars::load_bars(path)?;
    let config = load_config(config_path, &symbol_of(path))?;
    let chart = build_chart(&config, &bars)?;
    let through = to.unwrap_or(usize::MAX);
    chart.refresh_to(through)?;
    info!(
        "{}: {} bars, {} indicators, {} live functions",
        config.symbol,
        chart.len(),
        chart.indicator_count(),
        chart.cache().live_count()
    );
    Ok(ChartTable::from_chart(&chart, through))
}

fn run_compute(
    files: &[PathBuf],
    config: Option<&Path>,
    to: Option<usize>,
    format: Format,
    output_dir: Option<&Path>,
) -> Result<()> {
    let tables: Vec<Result<ChartTable>> = files
        .par_iter()
        .map(|path| {
            compute_file(path, config, to).with_context(|| format!("compute {}", path.display()))
        })
        .collect();

    if let Some(dir) = output_dir {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("create output directory {}", dir.display()))?;
    }

    let mut failures = 0;
    for (path, table) in files.iter().zip(tables) {
        let table = match table {
            Ok(table) => table,
            Err(e) => {
                eprintln!("Error: {e:#}");
                failures += 1;
                continue;
            }
        };
        match output_dir {
            Some(dir) => {
                let ext = match format {
                    Format::Csv => "csv",
                    Format::Json => "json",
                };
                let out = dir.join(format!("{}.{ext}", symbol_of(path)));
                let file = std::fs::File::create(&out)
                    .with_context(|| format!("create {}", out.display()))?;
                table.write(format, std::io::BufWriter::new(file))?;
                println!("{} -> {}", path.display(), out.display());
            }
            None => table.write(format, std::io::stdout().lock())?,
        }
    }

    if failures > 0 {
        bail!("{failures} of {} files failed", files.len());
    }
    Ok(())
}

fn run_replay(path: &Path, config_path: Option<&Path>, revisions: usize) -> Result<()> {
    let bars = bars::load_bars(path)?;
    let config = load_config(config_path, &symbol_of(path))?;

    let live = Chart::from_config(&config)?;
    let mut sessions = 0usize;
    for bar in &bars {
        live.append(bar)?;
        live.refresh()?;
        sessions += 1;
        // Walk the close towards its final value, as intraday ticks would.
        for step in 1..=revisions {
            let mut tick = *bar;
            let weight = step as f32 / (revisions + 1) as f32;
            tick.close = bar.open + (bar.close - bar.open) * weight;
            tick.high = tick.high.max(tick.close);
            tick.low = tick.low.min(tick.close);
            live.update_last(&tick)?;
            live.refresh()?;
            sessions += 1;
        }
        if revisions > 0 {
            live.update_last(bar)?;
            live.refresh()?;
            sessions += 1;
        }
    }

    let batch = build_chart(&config, &bars)?;
    batch.refresh()?;

    let live_table = ChartTable::from_chart(&live, usize::MAX);
    let batch_table = ChartTable::from_chart(&batch, usize::MAX);
    let mut mismatches = 0usize;
    for (l, b) in live_table.rows.iter().zip(&batch_table.rows) {
        for (column, (lv, bv)) in live_table.columns.iter().zip(l.values.iter().zip(&b.values)) {
            let agree = match (lv, bv) {
                (None, None) => true,
                (Some(a), Some(b)) => (a - b).abs() <= 1e-3 * b.abs().max(1.0),
                _ => false,
            };
            if !agree {
                mismatches += 1;
                if mismatches <= 10 {
                    eprintln!("mismatch {column} at {}: live={lv:?} batch={bv:?}", l.time);
                }
            }
        }
    }

    println!(
        "{}: {} bars, {sessions} sessions, {} outputs, {mismatches} mismatches",
        config.symbol,
        bars.len(),
        live_table.columns.len()
    );
    if mismatches > 0 {
        bail!("replay diverged from batch in {mismatches} values");
    }
    Ok(())
}

fn run_indicators() -> Result<()> {
    for kind in IndicatorKind::all() {
        let meta = kind.meta();
        let placement = if meta.overlay { "overlay" } else { "pane" };
        println!("{kind:<4} {} ({placement})", meta.long_name);
        for option in kind.default_options() {
            match option.bounds() {
                Some(b) => println!(
                    "       {:<14} {:>8}   [{} ..= {}, step {}]",
                    option.label(),
                    option.value(),
                    b.min,
                    b.max,
                    b.step
                ),
                None => println!("       {:<14} {:>8}", option.label(), option.value()),
            }
        }
    }
    Ok(())
}
