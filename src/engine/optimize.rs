use crate::config::{LengthRange, ParamsError, StrategyParams};
use crate::data::Bar;
use crate::engine::backtest::{BacktestConfig, BacktestEngine, BacktestResult};
use crate::instrument::FuturesContract;
use crate::metrics::SummaryMetrics;
use crate::strategy::dual_ma::DualMovingAverage;
use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{info, info_span};

//(fast length, slow length)
pub type LengthPair = (usize, usize);

//lengths to sweep
#[derive(Debug, Clone, PartialEq)]
pub struct ParamGrid {
    pub fast_lengths: Vec<usize>,
    pub slow_lengths: Vec<usize>,
}

impl Default for ParamGrid {
    //fast 10..=30 step 5, slow 50..=190 step 10
    fn default() -> Self {
        ParamGrid::from_ranges(LengthRange::new(10, 31, 5), LengthRange::new(50, 200, 10))
    }
}

impl ParamGrid {
    pub fn from_ranges(fast: LengthRange, slow: LengthRange) -> Self {
        ParamGrid {
            fast_lengths: fast.values(),
            slow_lengths: slow.values(),
        }
    }

    //every (fast, slow) pair with fast < slow, fast-major order
    pub fn combinations(&self) -> Vec<LengthPair> {
        let mut pairs = Vec::with_capacity(self.fast_lengths.len() * self.slow_lengths.len());

        for &fast in &self.fast_lengths {
            for &slow in &self.slow_lengths {
                //skip invalid combinations
                if fast == 0 || fast >= slow {
                    continue;
                }
                pairs.push((fast, slow));
            }
        }

        pairs
    }

    //returns the number of runs this grid produces
    pub fn size(&self) -> usize {
        self.combinations().len()
    }
}

//metrics per parameter pair, in grid order
#[derive(Debug, Clone, Default)]
pub struct SweepResults {
    entries: IndexMap<LengthPair, SummaryMetrics>,
}

impl SweepResults {
    pub fn new(entries: IndexMap<LengthPair, SummaryMetrics>) -> Self {
        SweepResults { entries }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&LengthPair, &SummaryMetrics)> {
        self.entries.iter()
    }

    pub fn get(&self, pair: LengthPair) -> Option<&SummaryMetrics> {
        self.entries.get(&pair)
    }

    //highest total return; the earliest pair wins ties
    pub fn best(&self) -> Option<(LengthPair, &SummaryMetrics)> {
        let mut best: Option<(LengthPair, &SummaryMetrics)> = None;

        for (&pair, summary) in &self.entries {
            let better = best.map_or(true, |(_, current)| {
                summary.total_return_pct > current.total_return_pct
            });
            if better {
                best = Some((pair, summary));
            }
        }

        best
    }
}

//outcome of a sweep plus the confirmation run of the winner
#[derive(Debug, Clone)]
pub struct Optimization {
    pub results: SweepResults,
    pub best: LengthPair,
    pub confirmation: BacktestResult,
}

//runs one independent backtest per grid pair over shared bars
pub struct ParamSweep<'a> {
    bars: &'a [Bar],
    contract: FuturesContract,
    config: BacktestConfig,
    base_params: StrategyParams,
    parallel: bool,
}

impl<'a> ParamSweep<'a> {
    pub fn new(
        bars: &'a [Bar],
        contract: FuturesContract,
        config: BacktestConfig,
        base_params: StrategyParams,
    ) -> Self {
        ParamSweep {
            bars,
            contract,
            config,
            base_params,
            parallel: false,
        }
    }

    //enables or disables parallel execution
    pub fn with_parallelism(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    //single backtest with the base params at the given lengths
    pub fn run_pair(&self, (fast, slow): LengthPair) -> Result<BacktestResult, ParamsError> {
        let params = self.base_params.with_lengths(fast, slow);

        let _span = info_span!("backtest", fast, slow).entered();
        let mut strategy = DualMovingAverage::new(params)?;
        let engine = BacktestEngine::new(self.config, self.bars, self.contract.clone());
        Ok(engine.run(&mut strategy))
    }

    //executes the sweep over the grid
    pub fn sweep(&self, grid: &ParamGrid) -> Result<SweepResults, ParamsError> {
        let pairs = grid.combinations();
        info!("Sweeping {} parameter combinations", pairs.len());

        let run = |pair: &LengthPair| -> Result<(LengthPair, SummaryMetrics), ParamsError> {
            let result = self.run_pair(*pair)?;
            info!(
                "fast {} slow {}: return {:.2}%, trades {}, sharpe {}",
                pair.0,
                pair.1,
                result.summary.total_return_pct * 100.0,
                result.summary.num_trades,
                result.summary.sharpe_display()
            );
            Ok((*pair, result.summary))
        };

        let summaries: Vec<(LengthPair, SummaryMetrics)> = if self.parallel {
            pairs.par_iter().map(run).collect::<Result<_, _>>()?
        } else {
            pairs.iter().map(run).collect::<Result<_, _>>()?
        };

        Ok(SweepResults::new(summaries.into_iter().collect()))
    }

    //sweeps, picks the best pair and re-runs it; none if the grid was empty
    pub fn optimize(&self, grid: &ParamGrid) -> Result<Option<Optimization>, ParamsError> {
        let results = self.sweep(grid)?;

        let best = match results.best() {
            Some((pair, _)) => pair,
            None => return Ok(None),
        };

        info!("Re-running best combination fast {} slow {}", best.0, best.1);
        let confirmation = self.run_pair(best)?;

        Ok(Some(Optimization {
            results,
            best,
            confirmation,
        }))
    }
}
