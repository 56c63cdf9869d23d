use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use goldcross::prelude::*;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "goldcross")]
#[command(about = "Moving average crossover backtester for daily futures data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    //run a single backtest
    Run {
        //path to csv data file (overrides the config file)
        #[arg(long)]
        data: Option<PathBuf>,

        //load every setting from a json configuration file
        #[arg(long)]
        config: Option<PathBuf>,

        //write the effective configuration to a json file
        #[arg(long)]
        save_config: Option<PathBuf>,

        #[command(flatten)]
        account: AccountArgs,

        //fast sma length
        #[arg(long, default_value = "25")]
        fast: usize,

        //slow sma length
        #[arg(long, default_value = "200")]
        slow: usize,

        #[command(flatten)]
        stop: StopArgs,

        //disable the atr trailing stop
        #[arg(long)]
        no_stop: bool,

        //output path for equity curve csv
        #[arg(long)]
        output_equity_csv: Option<PathBuf>,

        //output path for fills csv
        #[arg(long)]
        output_trades_csv: Option<PathBuf>,
    },

    //sweep fast/slow lengths and confirm the best pair
    Optimize {
        //path to csv data file
        #[arg(long)]
        data: PathBuf,

        #[command(flatten)]
        account: AccountArgs,

        //fast lengths as start:end:step, end exclusive
        #[arg(long, default_value = "10:31:5")]
        fast_range: LengthRange,

        //slow lengths as start:end:step, end exclusive
        #[arg(long, default_value = "50:200:10")]
        slow_range: LengthRange,

        //add the atr trailing stop to every run
        #[arg(long)]
        with_stop: bool,

        #[command(flatten)]
        stop: StopArgs,

        //run combinations on the rayon thread pool
        #[arg(long)]
        parallel: bool,

        //output path for the confirmation run's equity curve csv
        #[arg(long)]
        output_equity_csv: Option<PathBuf>,
    },
}

#[derive(Args, Clone)]
struct AccountArgs {
    //initial cash
    #[arg(long, default_value = "100000")]
    cash: f64,

    //commission as a fraction of traded value
    #[arg(long, default_value = "0.0001")]
    commission_rate: f64,

    //flat commission per contract per side
    #[arg(long, default_value = "0")]
    commission: f64,

    //slippage per contract per side
    #[arg(long, default_value = "0")]
    slippage: f64,

    //contracts per order
    #[arg(long, default_value = "10")]
    size: u32,

    //contract symbol used in reports
    #[arg(long, default_value = "GC=F")]
    symbol: String,

    //minimum price move
    #[arg(long, default_value = "0.01")]
    tick_size: f64,

    //dollar value of one tick
    #[arg(long, default_value = "0.01")]
    tick_value: f64,

    //initial margin per contract (defaults to full notional)
    #[arg(long)]
    margin: Option<f64>,
}

impl AccountArgs {
    fn contract(&self) -> ContractConfig {
        ContractConfig {
            symbol: self.symbol.clone(),
            tick_size: self.tick_size,
            tick_value: self.tick_value,
            initial_margin: self.margin,
        }
    }

    fn fees(&self) -> FeeSchedule {
        FeeSchedule {
            commission_rate: self.commission_rate,
            commission_per_contract: self.commission,
            slippage_per_contract: self.slippage,
        }
    }
}

#[derive(Args, Clone, Copy)]
struct StopArgs {
    //atr lookback for the trailing stop
    #[arg(long, default_value = "14")]
    atr_period: usize,

    //stop distance in atrs
    #[arg(long, default_value = "2.0")]
    atr_multiple: f64,
}

impl StopArgs {
    fn params(&self) -> TrailingStopParams {
        TrailingStopParams {
            atr_period: self.atr_period,
            atr_multiple: self.atr_multiple,
        }
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            data,
            config,
            save_config,
            account,
            fast,
            slow,
            stop,
            no_stop,
            output_equity_csv,
            output_trades_csv,
        } => {
            let configuration = match config {
                Some(path) => {
                    let mut loaded = BacktestConfiguration::from_json_file(&path)
                        .context(format!("Failed to load config from {:?}", path))?;
                    if let Some(data) = data {
                        loaded.data_path = data;
                    }
                    loaded
                }
                None => {
                    let data_path =
                        data.ok_or_else(|| anyhow::anyhow!("--data or --config is required"))?;
                    BacktestConfiguration {
                        data_path,
                        contract: account.contract(),
                        initial_balance: account.cash,
                        fees: account.fees(),
                        strategy: StrategyParams {
                            fast_length: fast,
                            slow_length: slow,
                            size: account.size,
                            trailing_stop: (!no_stop).then(|| stop.params()),
                        },
                        output_equity_csv,
                        output_trades_csv,
                    }
                }
            };

            configuration.strategy.validate()?;
            if let Some(path) = save_config {
                configuration.to_json_file(&path)?;
                println!("Configuration saved to {:?}", path);
            }

            run_backtest(&configuration)?;
        }
        Commands::Optimize {
            data,
            account,
            fast_range,
            slow_range,
            with_stop,
            stop,
            parallel,
            output_equity_csv,
        } => {
            let base_params = StrategyParams {
                size: account.size,
                trailing_stop: with_stop.then(|| stop.params()),
                ..StrategyParams::crossover(fast_range.start, slow_range.start)
            };
            let grid = ParamGrid::from_ranges(fast_range, slow_range);

            run_optimization(
                &data,
                &account,
                base_params,
                &grid,
                parallel,
                output_equity_csv.as_deref(),
            )?;
        }
    }

    Ok(())
}

fn load_bars(path: &Path) -> Result<Vec<Bar>> {
    println!("Loading data from {:?}...", path);
    let bars = load_csv(path).context(format!("Failed to load data from {:?}", path))?;

    match (bars.first(), bars.last()) {
        (Some(first), Some(last)) => {
            println!("Loaded {} bars", bars.len());
            println!("Date range: {} to {}\n", first.date(), last.date());
        }
        _ => anyhow::bail!("No bars found in {:?}", path),
    }

    Ok(bars)
}

fn run_backtest(configuration: &BacktestConfiguration) -> Result<()> {
    println!("Gold Cross Backtester");
    println!("=====================\n");

    let bars = load_bars(&configuration.data_path)?;
    let contract = configuration.contract.to_futures_contract();
    let params = &configuration.strategy;

    match &params.trailing_stop {
        Some(stop) => println!(
            "Strategy: fast={}, slow={}, ATR stop {}x{}",
            params.fast_length, params.slow_length, stop.atr_period, stop.atr_multiple
        ),
        None => println!(
            "Strategy: fast={}, slow={}, no stop",
            params.fast_length, params.slow_length
        ),
    }
    println!("Contract: {} (point value ${})", contract.symbol, contract.point_value);
    println!("Size: {} contract(s)", params.size);
    println!("Initial balance: ${:.2}\n", configuration.initial_balance);

    if bars.len() < params.warm_up() {
        tracing::warn!(
            "only {} bars for a {}-bar warm-up, no signals will be produced",
            bars.len(),
            params.warm_up()
        );
    }

    let mut strategy = DualMovingAverage::new(params.clone())?;
    let engine = BacktestEngine::new(configuration.engine_config(), &bars, contract);
    let result = engine.run(&mut strategy);

    print_result(&result);

    if let Some(path) = &configuration.output_equity_csv {
        save_equity_csv(&result.equity_curve, path)?;
        println!("\nEquity curve saved to {:?}", path);
    }

    if let Some(path) = &configuration.output_trades_csv {
        save_trades_csv(&result.fills, path)?;
        println!("Fills saved to {:?}", path);
    }

    Ok(())
}

fn run_optimization(
    data: &Path,
    account: &AccountArgs,
    base_params: StrategyParams,
    grid: &ParamGrid,
    parallel: bool,
    output_equity_csv: Option<&Path>,
) -> Result<()> {
    println!("Gold Cross Optimizer");
    println!("====================\n");

    let bars = load_bars(data)?;
    let config = BacktestConfig {
        initial_balance: account.cash,
        fees: account.fees(),
    };

    println!("Running {} parameter combinations...\n", grid.size());
    let sweep = ParamSweep::new(
        &bars,
        account.contract().to_futures_contract(),
        config,
        base_params,
    )
    .with_parallelism(parallel);

    let optimization = match sweep.optimize(grid)? {
        Some(optimization) => optimization,
        None => {
            println!("No valid parameter combinations, nothing to re-run.");
            return Ok(());
        }
    };

    println!("Optimization Results");
    println!("====================");
    for (&(fast, slow), summary) in optimization.results.iter() {
        println!("  fast_length: {}, slow_length: {}", fast, slow);
        println!("    Final equity: {:.2}", summary.final_balance);
        println!("    Total return: {:.2}%", summary.total_return_pct * 100.0);
        println!("    Closed trades: {}", summary.num_trades);
        println!("    Sharpe ratio: {}", summary.sharpe_display());
    }

    let (fast, slow) = optimization.best;
    if let Some(best) = optimization.results.get(optimization.best) {
        println!("\nBest Combination");
        println!("================");
        println!("  Fast MA length: {}", fast);
        println!("  Slow MA length: {}", slow);
        println!("  Final equity: {:.2}", best.final_balance);
        println!("  Total return: {:.2}%", best.total_return_pct * 100.0);
        println!("  Closed trades: {}", best.num_trades);
        println!("  Sharpe ratio: {}", best.sharpe_display());
    }

    println!("\nConfirmation Run");
    println!("================\n");
    print_result(&optimization.confirmation);

    if let Some(path) = output_equity_csv {
        save_equity_csv(&optimization.confirmation.equity_curve, path)?;
        println!("\nEquity curve saved to {:?}", path);
    }

    Ok(())
}

fn print_result(result: &BacktestResult) {
    let summary = &result.summary;

    println!("{} Results", result.strategy_name);
    println!("Final equity: {:.2}", summary.final_balance);
    println!("Total return: {:.2}%", summary.total_return_pct * 100.0);
    println!("Log return: {:.4}", summary.log_return);
    if summary.num_trades > 0 {
        println!("Closed trades: {}", summary.num_trades);
    } else {
        println!("No trades were closed.");
    }
    println!("Sharpe ratio: {}", summary.sharpe_display());
    if result.unfilled_orders > 0 {
        println!("Orders left unfilled at end of data: {}", result.unfilled_orders);
    }
    println!();

    summary.pretty_print_table();
}

fn save_equity_csv(equity_curve: &[EquityPoint], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .context(format!("Failed to create {:?}", path))?;

    for point in equity_curve {
        writer.serialize(point)?;
    }
    writer.flush()?;

    Ok(())
}

fn save_trades_csv(fills: &[Fill], path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .context(format!("Failed to create {:?}", path))?;

    for fill in fills {
        writer.serialize(fill)?;
    }
    writer.flush()?;

    Ok(())
}
