//property tests for the trailing stop and the long-only signal sequence

use chrono::{Duration, TimeZone, Utc};
use goldcross::prelude::{
    BacktestConfig, BacktestEngine, Bar, CrossoverRule, DualMovingAverage, FuturesContract,
    MaPair, OrderSide, RuleInput, Signal, StrategyParams, TrailingStopParams,
};
use proptest::prelude::*;

//strategies

fn arb_close() -> impl Strategy<Value = f64> {
    (50.0..200.0_f64).prop_map(|p| (p * 100.0).round() / 100.0)
}

fn arb_atr() -> impl Strategy<Value = f64> {
    0.1..10.0_f64
}

//random walk of closes that stays positive
fn arb_walk(len: usize) -> impl Strategy<Value = Vec<f64>> {
    prop::collection::vec(-3.0..3.0_f64, len).prop_map(|steps| {
        let mut price = 100.0_f64;
        steps
            .into_iter()
            .map(|step| {
                price = (price + step).max(1.0);
                price
            })
            .collect()
    })
}

fn walk_bars(closes: &[f64]) -> Vec<Bar> {
    let base = Utc.with_ymd_and_hms(2015, 1, 1, 0, 0, 0).unwrap();
    let mut prev = closes.first().copied().unwrap_or(100.0);
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = prev;
            prev = close;
            let high = open.max(close) + 0.5;
            let low = (open.min(close) - 0.5).max(0.01);
            Bar::new(base + Duration::days(i as i64), open, high, low, close, 1.0).unwrap()
        })
        .collect()
}

//rule

proptest! {
    //while held and no exit fires, the stop only moves up
    #[test]
    fn stop_never_decreases_while_held(
        entry in arb_close(),
        seed_atr in arb_atr(),
        path in prop::collection::vec((arb_close(), prop::option::of(arb_atr())), 1..60),
        multiple in 0.5..4.0_f64,
    ) {
        let mut rule = CrossoverRule::new(Some(multiple));
        rule.seed_stop(entry, Some(seed_atr));

        //fast stays above slow so only the stop can end the trade
        let ma = MaPair::new(11.0, 10.0);
        let mut last_stop = rule.stop_level();

        for (close, atr) in path {
            let signal = rule.evaluate(&RuleInput {
                prev: ma,
                current: ma,
                close,
                atr,
                in_position: true,
            });

            if let Signal::StopHit { stop } = signal {
                prop_assert!(close < stop);
                prop_assert_eq!(rule.stop_level(), None);
                break;
            }

            prop_assert_eq!(signal, Signal::Hold);
            let stop = rule.stop_level();
            if let (Some(before), Some(after)) = (last_stop, stop) {
                prop_assert!(after >= before);
            }
            prop_assert!(stop.is_some() || last_stop.is_none());
            last_stop = stop;
        }
    }

    //any exit signal clears the stop
    #[test]
    fn exits_clear_the_stop(
        entry in arb_close(),
        atr in arb_atr(),
        close in arb_close(),
    ) {
        let mut rule = CrossoverRule::new(Some(2.0));
        rule.seed_stop(entry, Some(atr));

        let signal = rule.evaluate(&RuleInput {
            prev: MaPair::new(11.0, 10.0),
            current: MaPair::new(9.0, 10.0),
            close,
            atr: Some(atr),
            in_position: true,
        });

        prop_assert!(signal.is_exit());
        prop_assert_eq!(rule.stop_level(), None);
    }
}

//strategy

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    //long only: entries and exits alternate, one order in flight at a time
    #[test]
    fn signals_alternate_between_entry_and_exit(
        closes in arb_walk(150),
        fast in 2usize..8,
        extra in 1usize..20,
        use_stop in any::<bool>(),
    ) {
        let slow = fast + extra;
        let params = StrategyParams {
            trailing_stop: use_stop.then(|| TrailingStopParams {
                atr_period: 5,
                atr_multiple: 1.5,
            }),
            ..StrategyParams::crossover(fast, slow)
        };
        let bars = walk_bars(&closes);

        let mut strategy = DualMovingAverage::new(params).unwrap();
        let engine =
            BacktestEngine::new(BacktestConfig::default(), &bars, FuturesContract::default());
        let result = engine.run(&mut strategy);

        for (i, signal) in strategy.signals().iter().enumerate() {
            if i % 2 == 0 {
                prop_assert_eq!(*signal, Signal::Enter);
            } else {
                prop_assert!(signal.is_exit());
            }
        }

        //every signal is either filled or still waiting on the last bar
        prop_assert_eq!(
            strategy.signals().len(),
            result.fills.len() + result.unfilled_orders
        );
        prop_assert!(result.unfilled_orders <= 1);

        let sells = result.fills.iter().filter(|f| f.side == OrderSide::Sell).count();
        prop_assert_eq!(sells, result.closed_trades.len());

        //no fill happens before the slow average is complete
        if let Some(first) = result.fills.first() {
            prop_assert!(first.timestamp > bars[slow - 1].timestamp);
        }
    }
}
