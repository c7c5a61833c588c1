//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;

use crate::adapters::csv_adapter::CsvCandleAdapter;
use crate::adapters::csv_report_adapter::CsvReportAdapter;
use crate::adapters::ini_config_adapter::IniConfigAdapter;
use crate::domain::backtest::{run_backtest, BacktestResult, ExitMode, RunParams};
use crate::domain::candle::MIN_CANDLES;
use crate::domain::config_validation::validate_run_config;
use crate::domain::error::OrobtError;
use crate::ports::candle_port::CandlePort;
use crate::ports::config_port::ConfigPort;
use crate::ports::report_port::{ReportPort, RunMeta};

const DEFAULT_SYMBOL: &str = "PAXGUSDT";
const DEFAULT_TIMEFRAME: &str = "5m";

#[derive(Parser, Debug)]
#[command(name = "orobt", about = "Moving-average crossover backtester with tiered exits")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Run a backtest over historical candles
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Candle directory; overrides [data] path from the config
        #[arg(long)]
        data: Option<PathBuf>,
        /// Directory for report.csv and trades.csv
        #[arg(short, long)]
        output: Option<PathBuf>,
        #[arg(long)]
        symbol: Option<String>,
        #[arg(long)]
        timeframe: Option<String>,
        #[arg(long)]
        dry_run: bool,
    },
    /// Validate a run configuration
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
    /// List symbols available in a candle directory
    ListSymbols {
        #[arg(long)]
        data: PathBuf,
        #[arg(long, default_value = DEFAULT_TIMEFRAME)]
        timeframe: String,
    },
    /// Show the candle range stored for a symbol
    Info {
        #[arg(long)]
        data: PathBuf,
        #[arg(long)]
        symbol: String,
        #[arg(long, default_value = DEFAULT_TIMEFRAME)]
        timeframe: String,
    },
}

pub fn run(cli: Cli) -> ExitCode {
    match cli.command {
        Command::Backtest {
            config,
            data,
            output,
            symbol,
            timeframe,
            dry_run,
        } => run_backtest_cmd(
            &config,
            data.as_ref(),
            output.as_ref(),
            symbol.as_deref(),
            timeframe.as_deref(),
            dry_run,
        ),
        Command::Validate { config } => run_validate(&config),
        Command::ListSymbols { data, timeframe } => run_list_symbols(&data, &timeframe),
        Command::Info {
            data,
            symbol,
            timeframe,
        } => run_info(&data, &symbol, &timeframe),
    }
}

pub fn load_config(path: &PathBuf) -> Result<IniConfigAdapter, ExitCode> {
    IniConfigAdapter::from_file(path).map_err(|e| {
        let err = OrobtError::ConfigParse {
            file: path.display().to_string(),
            reason: e.to_string(),
        };
        eprintln!("error: {err}");
        ExitCode::from(&err)
    })
}

/// Build the immutable run parameters from a validated config.
pub fn build_run_params(adapter: &dyn ConfigPort) -> RunParams {
    let defaults = RunParams::default();
    let exit_mode = adapter
        .get_string("execution", "exit_mode")
        .and_then(|s| ExitMode::parse(&s))
        .unwrap_or_default();

    RunParams {
        fast_window: adapter.get_int("strategy", "fast_window", defaults.fast_window as i64)
            as usize,
        slow_window: adapter.get_int("strategy", "slow_window", defaults.slow_window as i64)
            as usize,
        stop_loss_pct: adapter.get_double("risk", "stop_loss_pct", defaults.stop_loss_pct),
        take_profit_1_pct: adapter.get_double(
            "risk",
            "take_profit_1_pct",
            defaults.take_profit_1_pct,
        ),
        take_profit_2_pct: adapter.get_double(
            "risk",
            "take_profit_2_pct",
            defaults.take_profit_2_pct,
        ),
        tp1_partial: adapter.get_double("risk", "tp1_partial", defaults.tp1_partial),
        taker_fee: adapter.get_double("execution", "taker_fee", defaults.taker_fee),
        max_open_positions: adapter.get_int(
            "risk",
            "max_open_positions",
            defaults.max_open_positions as i64,
        ) as usize,
        base_notional: adapter.get_double("execution", "base_notional", defaults.base_notional),
        min_notional: adapter.get_double("execution", "min_notional", defaults.min_notional),
        qty_step: adapter.get_double("execution", "qty_step", defaults.qty_step),
        exit_mode,
    }
}

fn run_backtest_cmd(
    config_path: &PathBuf,
    data_override: Option<&PathBuf>,
    output_path: Option<&PathBuf>,
    symbol_override: Option<&str>,
    timeframe_override: Option<&str>,
    dry_run: bool,
) -> ExitCode {
    // Stage 1: Load config
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    // Stage 2: Validate config
    if let Err(e) = validate_run_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 3: Build run parameters
    let params = build_run_params(&adapter);
    if let Err(e) = params.validate() {
        eprintln!("error: {e}");
        return (&e).into();
    }

    // Stage 4: Resolve data directory, symbol and timeframe
    let symbol = resolve_or(symbol_override, &adapter, "symbol", DEFAULT_SYMBOL);
    let timeframe = resolve_or(timeframe_override, &adapter, "timeframe", DEFAULT_TIMEFRAME);

    if dry_run {
        eprintln!("Config validated successfully");
        eprintln!("  symbol:    {symbol}");
        eprintln!("  timeframe: {timeframe}");
        eprintln!("  windows:   {}/{}", params.fast_window, params.slow_window);
        eprintln!("  rules:     {}", params.rules_summary());
        eprintln!("  exit mode: {}", params.exit_mode.as_str());
        return ExitCode::SUCCESS;
    }

    let data_dir = match data_override.cloned().or_else(|| {
        adapter
            .get_string("data", "path")
            .map(PathBuf::from)
    }) {
        Some(d) => d,
        None => {
            let err = OrobtError::ConfigMissing {
                section: "data".into(),
                key: "path".into(),
            };
            eprintln!("error: {err} (or pass --data)");
            return (&err).into();
        }
    };

    // Stage 5: Fetch candles
    eprintln!("Loading candles for {symbol} {timeframe} from {}", data_dir.display());
    let candle_port = CsvCandleAdapter::new(data_dir);
    let candles = match candle_port.fetch_candles(&symbol, &timeframe) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };
    if candles.len() < MIN_CANDLES {
        let err = OrobtError::InsufficientData {
            bars: candles.len(),
            minimum: MIN_CANDLES,
        };
        eprintln!("error: {err}");
        return (&err).into();
    }
    eprintln!("  {} candles loaded", candles.len());

    // Stage 6: Run the simulation
    let result = match run_backtest(&candles, &params) {
        Ok(r) => r,
        Err(e) => {
            eprintln!("error: {e}");
            return (&e).into();
        }
    };

    // Stage 7: Console summary
    print_summary(&result, &symbol, &timeframe, &params);

    // Stage 8: Write CSV reports
    if let Some(output) = output_path {
        let meta = RunMeta {
            symbol,
            timeframe,
            params,
        };
        let report_port = CsvReportAdapter::new(output.clone());
        match report_port.write(&result, &meta) {
            Ok(()) => eprintln!("\nReports written to: {}", output.display()),
            Err(e) => {
                eprintln!("error: {e}");
                return (&e).into();
            }
        }
    }

    ExitCode::SUCCESS
}

fn resolve_or(
    flag: Option<&str>,
    adapter: &dyn ConfigPort,
    key: &str,
    default: &str,
) -> String {
    match flag {
        Some(v) => v.to_string(),
        None => adapter
            .get_string("data", key)
            .unwrap_or_else(|| default.to_string()),
    }
}

fn print_summary(result: &BacktestResult, symbol: &str, timeframe: &str, params: &RunParams) {
    let kpis = &result.kpis;
    eprintln!("\n=== Backtest KPIs ===");
    eprintln!("Symbol:           {symbol}");
    eprintln!("Timeframe:        {timeframe}");
    eprintln!("Trades opened:    {}", kpis.trades_opened);
    eprintln!("Positions closed: {}", kpis.positions_closed);
    eprintln!("Win rate:         {:.2}%", kpis.win_rate);
    eprintln!("Total P&L:        {:.2}", kpis.realized_pnl);
    eprintln!("Avg win:          {:.3}", kpis.avg_win);
    eprintln!("Avg loss:         {:.3}", kpis.avg_loss);
    eprintln!("Expectancy:       {:.3}", kpis.expectancy);
    eprintln!("Max drawdown:     {:.2}", kpis.max_drawdown);
    eprintln!("Rules:            {}", params.rules_summary());
}

fn run_validate(config_path: &PathBuf) -> ExitCode {
    eprintln!("Loading config from {}", config_path.display());
    let adapter = match load_config(config_path) {
        Ok(a) => a,
        Err(code) => return code,
    };

    if let Err(e) = validate_run_config(&adapter) {
        eprintln!("error: {e}");
        return (&e).into();
    }
    let params = build_run_params(&adapter);
    if let Err(e) = params.validate() {
        eprintln!("error: {e}");
        return (&e).into();
    }

    eprintln!("Config validated successfully");
    eprintln!("  rules: {}", params.rules_summary());
    ExitCode::SUCCESS
}

fn run_list_symbols(data: &PathBuf, timeframe: &str) -> ExitCode {
    let port = CsvCandleAdapter::new(data.clone());
    match port.list_symbols(timeframe) {
        Ok(symbols) if symbols.is_empty() => {
            eprintln!("No {timeframe} candle files in {}", data.display());
            ExitCode::SUCCESS
        }
        Ok(symbols) => {
            for symbol in symbols {
                println!("{symbol}");
            }
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn run_info(data: &PathBuf, symbol: &str, timeframe: &str) -> ExitCode {
    let port = CsvCandleAdapter::new(data.clone());
    match port.data_range(symbol, timeframe) {
        Ok(Some((first, last, bars))) => {
            println!("{symbol} {timeframe}: {bars} candles");
            println!("  first: {}", format_millis(first));
            println!("  last:  {}", format_millis(last));
            ExitCode::SUCCESS
        }
        Ok(None) => {
            eprintln!("No data for {symbol} {timeframe} in {}", data.display());
            ExitCode::from(5)
        }
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

fn format_millis(millis: i64) -> String {
    chrono::DateTime::from_timestamp_millis(millis)
        .map(|dt| dt.format("%Y-%m-%d %H:%M:%S UTC").to_string())
        .unwrap_or_else(|| millis.to_string())
}
