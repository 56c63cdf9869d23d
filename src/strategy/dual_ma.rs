use crate::config::{ParamsError, StrategyParams};
use crate::data::Bar;
use crate::engine::execution::{OrderEvent, OrderSide, OrderStatus};
use crate::indicators::{Atr, Sma};
use crate::portfolio::ClosedTrade;
use crate::strategy::rule::{CrossoverRule, MaPair, RuleInput, Signal};
use crate::strategy::{Strategy, StrategyContext};
use tracing::{debug, info, warn};

//dual moving average crossover, long only
//enters on a golden cross, exits on the atr trailing stop or a death cross
#[derive(Debug, Clone)]
pub struct DualMovingAverage {
    params: StrategyParams,
    fast: Sma,
    slow: Sma,
    atr: Option<Atr>,
    rule: CrossoverRule,

    //state
    prev: Option<MaPair>,
    last_atr: Option<f64>,
    //buy fill price waiting for the fill bar's atr
    unseeded_entry: Option<f64>,
    pending_order: Option<u64>,
    signals: Vec<Signal>,
}

impl DualMovingAverage {
    pub fn new(params: StrategyParams) -> Result<Self, ParamsError> {
        params.validate()?;
        if params.stop_lags_warm_up() {
            warn!(
                "stop ATR needs {:?} bars but signals start after {}, early entries have no stop",
                params.stop_warm_up(),
                params.warm_up()
            );
        }
        Ok(DualMovingAverage::build(params))
    }

    fn build(params: StrategyParams) -> Self {
        let stop = params.trailing_stop;
        DualMovingAverage {
            fast: Sma::new(params.fast_length),
            slow: Sma::new(params.slow_length),
            atr: stop.map(|s| Atr::new(s.atr_period)),
            rule: CrossoverRule::new(stop.map(|s| s.atr_multiple)),
            params,
            prev: None,
            last_atr: None,
            unseeded_entry: None,
            pending_order: None,
            signals: Vec::new(),
        }
    }

    pub fn params(&self) -> &StrategyParams {
        &self.params
    }

    pub fn stop_level(&self) -> Option<f64> {
        self.rule.stop_level()
    }

    //non-hold signals acted on so far, in order
    pub fn signals(&self) -> &[Signal] {
        &self.signals
    }

    pub fn has_pending_order(&self) -> bool {
        self.pending_order.is_some()
    }

    fn act(
        &mut self,
        context: &mut StrategyContext<'_>,
        signal: Signal,
        current: MaPair,
        bar: &Bar,
    ) {
        match signal {
            Signal::Hold => return,
            Signal::Enter => {
                info!(
                    "{} buy signal: fast {:.2} > slow {:.2}",
                    bar.date(),
                    current.fast,
                    current.slow
                );
                self.pending_order = Some(context.buy(self.params.size));
            }
            Signal::StopHit { stop } => {
                info!(
                    "{} stop triggered: close {:.2} < stop {:.2}",
                    bar.date(),
                    bar.close,
                    stop
                );
                self.pending_order = context.close();
            }
            Signal::DeathCross => {
                info!(
                    "{} death cross exit: fast {:.2} < slow {:.2}",
                    bar.date(),
                    current.fast,
                    current.slow
                );
                self.pending_order = context.close();
            }
        }
        self.signals.push(signal);
    }
}

impl Strategy for DualMovingAverage {
    fn on_start(&mut self) {
        *self = DualMovingAverage::build(self.params.clone());
    }

    fn on_bar(&mut self, context: &mut StrategyContext<'_>, bar: &Bar) {
        //indicators advance on every bar, even while an order is pending
        let fast = self.fast.update(bar.close);
        let slow = self.slow.update(bar.close);
        if let Some(atr) = self.atr.as_mut() {
            self.last_atr = atr.update(bar);
        }

        //the stop is seeded once the fill bar's atr is known
        if let Some(entry) = self.unseeded_entry.take() {
            let stop = self.rule.seed_stop(entry, self.last_atr);
            info!(
                "{} initial stop {}",
                bar.date(),
                stop.map_or_else(|| "none".to_string(), |s| format!("{:.2}", s))
            );
        }

        let current = match (fast, slow) {
            (Some(fast), Some(slow)) => Some(MaPair::new(fast, slow)),
            _ => None,
        };
        let prev = std::mem::replace(&mut self.prev, current);

        if context.bar_count() < self.params.warm_up() {
            return;
        }

        if self.pending_order.is_some() {
            return;
        }

        let (Some(prev), Some(current)) = (prev, current) else {
            return;
        };

        let input = RuleInput {
            prev,
            current,
            close: bar.close,
            atr: self.last_atr,
            in_position: context.position().is_long(),
        };

        let stop_before = self.rule.stop_level();
        let signal = self.rule.evaluate(&input);
        if !signal.is_exit() && self.rule.stop_level() != stop_before {
            debug!(
                "{} stop raised to {:.2}",
                bar.date(),
                self.rule.stop_level().unwrap_or_default()
            );
        }

        self.act(context, signal, current, bar);
    }

    fn on_order(&mut self, event: &OrderEvent) {
        match (event.status, &event.fill) {
            (OrderStatus::Completed, Some(fill)) => match fill.side {
                OrderSide::Buy => {
                    if self.rule.uses_stop() {
                        self.unseeded_entry = Some(fill.fill_price);
                    }
                    info!(
                        "{} buy executed: price {:.2}, qty {}, commission {:.2}",
                        fill.timestamp.date_naive(),
                        fill.fill_price,
                        fill.qty,
                        fill.fees
                    );
                }
                OrderSide::Sell => {
                    info!(
                        "{} sell executed: price {:.2}, qty {}, commission {:.2}",
                        fill.timestamp.date_naive(),
                        fill.fill_price,
                        fill.qty.abs(),
                        fill.fees
                    );
                }
            },
            (status, _) => {
                warn!(
                    "{} order {} not filled: {:?}",
                    event.timestamp.date_naive(),
                    event.order_id,
                    status
                );
            }
        }

        if self.pending_order == Some(event.order_id) {
            self.pending_order = None;
        }
    }

    fn on_trade(&mut self, trade: &ClosedTrade) {
        info!(
            "{} trade closed: gross pnl {:.2}, net pnl {:.2}",
            trade.closed_at.date_naive(),
            trade.pnl,
            trade.pnl_net
        );
    }

    fn on_end(&mut self, context: &mut StrategyContext<'_>) {
        if context.position().is_long() {
            debug!(
                "ending with {} contracts open, marked to market",
                context.position().net_qty
            );
        }
    }

    fn name(&self) -> &str {
        if self.rule.uses_stop() {
            "Dual MA + ATR Stop"
        } else {
            "Dual MA Crossover"
        }
    }
}
