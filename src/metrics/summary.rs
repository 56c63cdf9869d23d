use crate::metrics::timeseries::{calculate_returns, max_drawdown, yearly_returns, EquityPoint};
use crate::portfolio::ClosedTrade;
use prettytable::{Cell, Row, Table};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

//annual risk-free rate used for the sharpe ratio
pub const RISK_FREE_RATE: f64 = 0.01;

//summary metrics for a backtest
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SummaryMetrics {
    pub initial_balance: f64,
    pub final_balance: f64,
    pub total_return: f64,
    pub total_return_pct: f64,
    //ln(final / initial)
    pub log_return: f64,
    pub cagr: f64,
    pub max_drawdown: f64,
    //none when fewer than two distinct yearly returns exist
    pub sharpe_ratio: Option<f64>,
    pub sortino_ratio: f64,
    pub win_rate: f64,
    pub avg_win: f64,
    pub avg_loss: f64,
    pub profit_factor: f64,
    pub num_trades: usize,
    pub num_winning_trades: usize,
    pub num_losing_trades: usize,
    pub largest_win: f64,
    pub largest_loss: f64,
}

impl SummaryMetrics {
    //calculate summary metrics from equity curve and closed trades
    pub fn from_backtest(
        equity_curve: &[EquityPoint],
        trades: &[ClosedTrade],
        initial_balance: f64,
    ) -> Self {
        let final_balance = equity_curve
            .last()
            .map(|p| p.equity)
            .unwrap_or(initial_balance);

        let total_return = final_balance - initial_balance;
        let total_return_pct = total_return / initial_balance;
        let log_return = if final_balance > 0.0 {
            (final_balance / initial_balance).ln()
        } else {
            f64::NEG_INFINITY
        };

        //calculate cagr
        let cagr = match (equity_curve.first(), equity_curve.last()) {
            (Some(first), Some(last)) if equity_curve.len() >= 2 => {
                let duration_days = (last.timestamp - first.timestamp).num_days() as f64;
                let years = duration_days / 365.25;

                if years > 0.0 && final_balance > 0.0 {
                    ((final_balance / initial_balance).powf(1.0 / years) - 1.0) * 100.0
                } else {
                    0.0
                }
            }
            _ => 0.0,
        };

        let yearly: Vec<f64> = yearly_returns(equity_curve, initial_balance)
            .into_iter()
            .map(|(_, r)| r)
            .collect();
        let sharpe_ratio = calculate_sharpe_ratio(&yearly, RISK_FREE_RATE);

        let equity_values: Vec<f64> = equity_curve.iter().map(|p| p.equity).collect();
        let daily = calculate_returns(&equity_values);
        let sortino_ratio = calculate_sortino_ratio(&daily);

        let trade_stats = calculate_trade_statistics(trades);

        SummaryMetrics {
            initial_balance,
            final_balance,
            total_return,
            total_return_pct,
            log_return,
            cagr,
            max_drawdown: max_drawdown(equity_curve),
            sharpe_ratio,
            sortino_ratio,
            win_rate: trade_stats.win_rate,
            avg_win: trade_stats.avg_win,
            avg_loss: trade_stats.avg_loss,
            profit_factor: trade_stats.profit_factor,
            num_trades: trade_stats.num_trades,
            num_winning_trades: trade_stats.num_winning_trades,
            num_losing_trades: trade_stats.num_losing_trades,
            largest_win: trade_stats.largest_win,
            largest_loss: trade_stats.largest_loss,
        }
    }

    //sharpe formatted to four places, or N/A
    pub fn sharpe_display(&self) -> String {
        self.sharpe_ratio
            .map_or_else(|| "N/A".to_string(), |s| format!("{:.4}", s))
    }

    //prints metrics in a formatted table
    pub fn pretty_print_table(&self) {
        let mut table = Table::new();

        table.add_row(Row::new(vec![Cell::new("Metric"), Cell::new("Value")]));

        let rows = [
            ("Initial Balance", format!("${:.2}", self.initial_balance)),
            ("Final Balance", format!("${:.2}", self.final_balance)),
            (
                "Total Return",
                format!(
                    "${:.2} ({:.2}%)",
                    self.total_return,
                    self.total_return_pct * 100.0
                ),
            ),
            ("Log Return", format!("{:.2}%", self.log_return * 100.0)),
            ("CAGR", format!("{:.2}%", self.cagr)),
            ("Max Drawdown", format!("{:.2}%", self.max_drawdown * 100.0)),
            ("Sharpe Ratio (annual)", self.sharpe_display()),
            ("Sortino Ratio", format!("{:.3}", self.sortino_ratio)),
            ("Closed Trades", format!("{}", self.num_trades)),
            ("Win Rate", format!("{:.2}%", self.win_rate * 100.0)),
            ("Avg Win", format!("${:.2}", self.avg_win)),
            ("Avg Loss", format!("${:.2}", self.avg_loss)),
            ("Largest Win", format!("${:.2}", self.largest_win)),
            ("Largest Loss", format!("${:.2}", self.largest_loss)),
            ("Profit Factor", format!("{:.3}", self.profit_factor)),
        ];

        for (name, value) in rows {
            table.add_row(Row::new(vec![Cell::new(name), Cell::new(&value)]));
        }

        table.printstd();
    }
}

#[derive(Default)]
struct TradeStats {
    num_trades: usize,
    num_winning_trades: usize,
    num_losing_trades: usize,
    win_rate: f64,
    avg_win: f64,
    avg_loss: f64,
    profit_factor: f64,
    largest_win: f64,
    largest_loss: f64,
}

//statistics over round trips, using pnl net of fees
fn calculate_trade_statistics(trades: &[ClosedTrade]) -> TradeStats {
    if trades.is_empty() {
        return TradeStats::default();
    }

    let winning_trades: Vec<f64> = trades
        .iter()
        .map(|t| t.pnl_net)
        .filter(|&pnl| pnl > 0.0)
        .collect();
    let losing_trades: Vec<f64> = trades
        .iter()
        .map(|t| t.pnl_net)
        .filter(|&pnl| pnl < 0.0)
        .collect();

    let num_winning = winning_trades.len();
    let num_losing = losing_trades.len();
    let total = trades.len();

    let avg_win = if num_winning > 0 {
        winning_trades.iter().sum::<f64>() / num_winning as f64
    } else {
        0.0
    };

    let avg_loss = if num_losing > 0 {
        losing_trades.iter().sum::<f64>() / num_losing as f64
    } else {
        0.0
    };

    let total_wins: f64 = winning_trades.iter().sum();
    let total_losses: f64 = losing_trades.iter().sum::<f64>().abs();

    let profit_factor = if total_losses > 0.0 {
        total_wins / total_losses
    } else if total_wins > 0.0 {
        f64::INFINITY
    } else {
        0.0
    };

    TradeStats {
        num_trades: total,
        num_winning_trades: num_winning,
        num_losing_trades: num_losing,
        win_rate: num_winning as f64 / total as f64,
        avg_win,
        avg_loss,
        profit_factor,
        largest_win: winning_trades.iter().fold(0.0f64, |a, &b| a.max(b)),
        largest_loss: losing_trades.iter().fold(0.0f64, |a, &b| a.min(b)),
    }
}

//mean excess return over its population standard deviation
fn calculate_sharpe_ratio(returns: &[f64], risk_free: f64) -> Option<f64> {
    if returns.is_empty() {
        return None;
    }

    let excess: Vec<f64> = returns.iter().map(|r| r - risk_free).collect();
    let mean = excess.iter().mean();
    let std_dev = excess.iter().population_std_dev();

    if std_dev == 0.0 || !std_dev.is_finite() {
        return None;
    }

    Some(mean / std_dev)
}

fn calculate_sortino_ratio(returns: &[f64]) -> f64 {
    if returns.is_empty() {
        return 0.0;
    }

    let mean = returns.mean();

    //downside deviation (only negative returns)
    let negative_returns: Vec<f64> = returns.iter().filter(|&&r| r < 0.0).copied().collect();

    if negative_returns.is_empty() {
        return if mean > 0.0 { f64::INFINITY } else { 0.0 };
    }

    let downside_dev = negative_returns.std_dev();

    if downside_dev == 0.0 || !downside_dev.is_finite() {
        return 0.0;
    }

    //annualize assuming daily returns
    (mean / downside_dev) * (252.0_f64).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::calculate_equity_curve;
    use chrono::{TimeZone, Utc};

    fn trade(pnl_net: f64) -> ClosedTrade {
        let ts = Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap();
        ClosedTrade {
            opened_at: ts,
            closed_at: ts,
            qty: 10,
            entry_price: 100.0,
            exit_price: 100.0,
            pnl: pnl_net,
            pnl_net,
        }
    }

    #[test]
    fn trade_statistics() {
        let stats = calculate_trade_statistics(&[trade(300.0), trade(-100.0), trade(100.0)]);
        assert_eq!(stats.num_trades, 3);
        assert_eq!(stats.num_winning_trades, 2);
        assert_eq!(stats.num_losing_trades, 1);
        assert!((stats.profit_factor - 4.0).abs() < 1e-12);
        assert!((stats.avg_win - 200.0).abs() < 1e-12);
        assert_eq!(stats.largest_loss, -100.0);
    }

    #[test]
    fn sharpe_undefined_for_single_year() {
        assert_eq!(calculate_sharpe_ratio(&[0.2], RISK_FREE_RATE), None);
        assert_eq!(calculate_sharpe_ratio(&[], RISK_FREE_RATE), None);
    }

    #[test]
    fn sharpe_over_years() {
        //excess returns 0.09 and -0.01: mean 0.04, population std 0.05
        let sharpe = calculate_sharpe_ratio(&[0.10, 0.0], RISK_FREE_RATE).unwrap();
        assert!((sharpe - 0.8).abs() < 1e-9);
    }

    #[test]
    fn summary_without_trades() {
        let times = [
            Utc.with_ymd_and_hms(2024, 1, 2, 0, 0, 0).unwrap(),
            Utc.with_ymd_and_hms(2024, 1, 3, 0, 0, 0).unwrap(),
        ];
        let curve = calculate_equity_curve(&times, &[100_000.0, 100_000.0], 100_000.0);
        let summary = SummaryMetrics::from_backtest(&curve, &[], 100_000.0);

        assert_eq!(summary.num_trades, 0);
        assert_eq!(summary.total_return, 0.0);
        assert_eq!(summary.log_return, 0.0);
        assert_eq!(summary.sharpe_display(), "N/A");
    }
}
