//! End-to-end tests: engine scenarios at realistic history lengths and
//! the full CSV-in/CSV-out pipeline.

mod common;

use approx::assert_relative_eq;
use common::*;
use orobt::adapters::csv_adapter::CsvCandleAdapter;
use orobt::adapters::csv_report_adapter::CsvReportAdapter;
use orobt::domain::candle::MIN_CANDLES;
use orobt::domain::execution::{entry_fee, entry_quantity, fill_pnl, round_step};
use orobt::domain::signal::{ma_cross_signal, Signal};
use orobt::domain::trade_log::TradeEvent;
use orobt::ports::candle_port::CandlePort;
use orobt::ports::report_port::{ReportPort, RunMeta};
use std::fs;
use tempfile::TempDir;

mod scenarios {
    use super::*;

    #[test]
    fn flat_series_produces_no_trades() {
        // 60 flat candles: no crossing is possible on a constant series.
        let candles = make_candles(&vec![100.0; 60]);
        let result = run_backtest(&candles, &RunParams::default()).unwrap();

        assert_eq!(result.kpis.trades_opened, 0);
        assert_eq!(result.kpis.positions_closed, 0);
        assert!((result.kpis.realized_pnl - 0.0).abs() < f64::EPSILON);
        assert!((result.kpis.max_drawdown - 0.0).abs() < f64::EPSILON);
        assert!(result.trade_log.is_empty());
    }

    #[test]
    fn single_cross_rides_through_both_tiers() {
        // Cross at bar 55 with close 100 → tp1 = 101, tp2 = 102, sl = 99.5.
        // Price then rises monotonically to 102 and holds.
        let closes = single_cross_series(
            99.5,
            55,
            100.0,
            &[100.5, 101.0, 101.5, 102.0, 102.0],
        );
        let candles = make_candles(&closes);
        let params = RunParams::default();
        let result = run_backtest(&candles, &params).unwrap();

        assert_eq!(
            ma_cross_signal(&closes[..=55], params.fast_window, params.slow_window),
            Signal::Buy
        );
        assert_eq!(result.kpis.trades_opened, 1);
        assert_eq!(result.kpis.positions_closed, 1);
        assert_relative_eq!(result.kpis.win_rate, 100.0, max_relative = 1e-12);

        let actions: Vec<&str> = result.trade_log.iter().map(|ev| ev.action()).collect();
        assert_eq!(actions, vec!["OPEN", "TP1 partial", "TP2 close"]);

        // TP1 fires on the first bar at or above 101, TP2 at 102.
        assert_eq!(result.trade_log[1].time(), ts(57));
        assert_eq!(result.trade_log[2].time(), ts(59));

        let qty = entry_quantity(params.base_notional, params.min_notional, 100.0, params.qty_step);
        let fee = entry_fee(100.0, qty, params.taker_fee);
        let tp1_qty = round_step(qty * params.tp1_partial, params.qty_step);
        let tp1_pnl = fill_pnl(100.0, 101.0, tp1_qty, params.taker_fee);
        let tp2_qty = round_step(qty - tp1_qty, params.qty_step);
        let tp2_pnl = fill_pnl(100.0, 102.0, tp2_qty, params.taker_fee);

        assert_relative_eq!(
            result.kpis.realized_pnl,
            tp1_pnl + tp2_pnl - fee,
            max_relative = 1e-9
        );
        assert!(result.kpis.realized_pnl > 0.0);

        let pos = &result.positions[0];
        assert!(pos.closed && pos.took_tp1);
        assert_relative_eq!(pos.realized_pnl, tp1_pnl + tp2_pnl, max_relative = 1e-9);
    }

    #[test]
    fn drop_to_stop_loss_before_tier_one() {
        // Same entry, but price falls to 99.4 before ever reaching 101:
        // the stop closes the full quantity and no TP1 is recorded.
        let closes = single_cross_series(99.5, 55, 100.0, &[100.2, 99.8, 99.4, 99.4]);
        let candles = make_candles(&closes);
        let params = RunParams::default();
        let result = run_backtest(&candles, &params).unwrap();

        assert_eq!(result.kpis.trades_opened, 1);
        assert_eq!(result.kpis.positions_closed, 1);
        assert!((result.kpis.win_rate - 0.0).abs() < 1e-12);
        assert!(result.kpis.realized_pnl < 0.0);

        let actions: Vec<&str> = result.trade_log.iter().map(|ev| ev.action()).collect();
        assert_eq!(actions, vec!["OPEN", "SL close"]);

        let pos = &result.positions[0];
        assert!(pos.closed && !pos.took_tp1);
        assert!(pos.realized_pnl < 0.0);
    }

    #[test]
    fn cap_holds_while_all_slots_are_open() {
        // A staircase re-arms the cross every third bar; exits are pushed
        // out of reach so slots never free up. The sixth signal is
        // ignored while five positions remain open.
        let params = RunParams {
            fast_window: 2,
            slow_window: 3,
            stop_loss_pct: 0.90,
            take_profit_1_pct: 10.0,
            take_profit_2_pct: 20.0,
            max_open_positions: 5,
            ..RunParams::default()
        };
        let mut closes = vec![100.0; 4];
        let mut level = 100.0;
        for _ in 0..6 {
            level *= 1.1;
            closes.extend_from_slice(&[level, level, level]);
        }
        let candles = make_candles(&closes);
        let result = run_backtest(&candles, &params).unwrap();

        assert_eq!(result.kpis.trades_opened, 5);
        assert_eq!(result.positions.len(), 5);
        assert!(result
            .positions
            .iter()
            .all(|p| p.closed && p.close_time == Some(ts(closes.len() - 1))));
    }

    #[test]
    fn equity_round_trip_over_mixed_run() {
        // A run with a TP1 partial followed by a stop-out: the final
        // equity equals the sum of every logged P&L including entry fees.
        let closes = single_cross_series(
            99.5,
            55,
            100.0,
            &[101.0, 99.4, 99.4, 99.4, 100.5, 100.5, 100.5, 102.5],
        );
        let candles = make_candles(&closes);
        let result = run_backtest(&candles, &RunParams::default()).unwrap();

        let log_sum: f64 = result.trade_log.iter().map(|ev| ev.pnl()).sum();
        assert_relative_eq!(result.kpis.realized_pnl, log_sum, max_relative = 1e-9);
    }
}

mod exit_modes {
    use super::*;

    fn extreme_bar_closes() -> Vec<f64> {
        // Entry at 100, then one bar at 115 clears tp1 and tp2 at once.
        single_cross_series(99.5, 55, 100.0, &[115.0, 115.0])
    }

    #[test]
    fn independent_mode_doubles_up_on_an_extreme_bar() {
        let candles = make_candles(&extreme_bar_closes());
        let result = run_backtest(&candles, &RunParams::default()).unwrap();

        let actions: Vec<&str> = result.trade_log.iter().map(|ev| ev.action()).collect();
        assert_eq!(actions, vec!["OPEN", "TP1 partial", "TP2 close"]);
        // both exits on the same bar
        assert_eq!(result.trade_log[1].time(), result.trade_log[2].time());
    }

    #[test]
    fn exclusive_mode_spreads_exits_across_bars() {
        let params = RunParams {
            exit_mode: ExitMode::Exclusive,
            ..RunParams::default()
        };
        let candles = make_candles(&extreme_bar_closes());
        let result = run_backtest(&candles, &params).unwrap();

        let actions: Vec<&str> = result.trade_log.iter().map(|ev| ev.action()).collect();
        assert_eq!(actions, vec!["OPEN", "TP1 partial", "TP2 close"]);
        assert!(result.trade_log[1].time() < result.trade_log[2].time());
    }

    #[test]
    fn modes_agree_when_no_bar_is_extreme() {
        let closes = single_cross_series(99.5, 55, 100.0, &[100.5, 101.0, 101.5, 102.0]);
        let candles = make_candles(&closes);

        let independent = run_backtest(&candles, &RunParams::default()).unwrap();
        let exclusive = run_backtest(
            &candles,
            &RunParams {
                exit_mode: ExitMode::Exclusive,
                ..RunParams::default()
            },
        )
        .unwrap();

        assert_eq!(independent.trade_log, exclusive.trade_log);
        assert_eq!(independent.kpis, exclusive.kpis);
    }
}

mod csv_pipeline {
    use super::*;

    #[test]
    fn file_to_report_round_trip() {
        let dir = TempDir::new().unwrap();
        let data_dir = dir.path().join("candles");
        fs::create_dir(&data_dir).unwrap();

        // Enough history to clear the CLI minimum, with one tradeable
        // cross near the end.
        let closes = single_cross_series(
            99.5,
            110,
            100.0,
            &[100.5, 101.0, 101.5, 102.0, 102.0],
        );
        assert!(closes.len() >= MIN_CANDLES);
        let candles = make_candles(&closes);
        fs::write(data_dir.join("PAXGUSDT_5m.csv"), candles_to_csv(&candles)).unwrap();

        let candle_port = CsvCandleAdapter::new(data_dir);
        let loaded = candle_port.fetch_candles("PAXGUSDT", "5m").unwrap();
        assert_eq!(loaded, candles);

        let params = RunParams::default();
        let result = run_backtest(&loaded, &params).unwrap();
        assert_eq!(result.kpis.trades_opened, 1);

        let out_dir = dir.path().join("out");
        let report_port = CsvReportAdapter::new(out_dir.clone());
        let meta = RunMeta {
            symbol: "PAXGUSDT".into(),
            timeframe: "5m".into(),
            params,
        };
        report_port.write(&result, &meta).unwrap();

        let report = fs::read_to_string(out_dir.join("report.csv")).unwrap();
        assert!(report.contains("Symbol,PAXGUSDT"));
        assert!(report.contains("Trades opened,1"));
        assert!(report.contains("Positions closed,1"));

        let trades = fs::read_to_string(out_dir.join("trades.csv")).unwrap();
        assert_eq!(trades.lines().count(), result.trade_log.len() + 1);
        assert!(trades.contains("TP1 partial"));
    }

    #[test]
    fn loaded_candles_drive_identical_runs() {
        let dir = TempDir::new().unwrap();
        let closes = single_cross_series(99.5, 110, 100.0, &[100.5, 99.4, 99.4]);
        let candles = make_candles(&closes);
        fs::write(
            dir.path().join("PAXGUSDT_5m.csv"),
            candles_to_csv(&candles),
        )
        .unwrap();

        let port = CsvCandleAdapter::new(dir.path().to_path_buf());
        let loaded = port.fetch_candles("PAXGUSDT", "5m").unwrap();

        let params = RunParams::default();
        let from_memory = run_backtest(&candles, &params).unwrap();
        let from_file = run_backtest(&loaded, &params).unwrap();
        assert_eq!(from_memory, from_file);
    }
}

mod trade_log_consistency {
    use super::*;

    #[test]
    fn closed_position_pnl_matches_its_exit_events() {
        // Single position: its realized P&L must equal the sum of the
        // logged exit fills (the entry fee stays on the run total).
        let closes = single_cross_series(99.5, 55, 100.0, &[101.0, 101.5, 99.4]);
        let candles = make_candles(&closes);
        let result = run_backtest(&candles, &RunParams::default()).unwrap();

        assert_eq!(result.positions.len(), 1);
        let exit_sum: f64 = result
            .trade_log
            .iter()
            .filter(|ev| ev.is_exit())
            .map(|ev| ev.pnl())
            .sum();
        assert_relative_eq!(
            result.positions[0].realized_pnl,
            exit_sum,
            max_relative = 1e-9
        );
    }

    #[test]
    fn open_events_match_position_count() {
        let closes = single_cross_series(99.5, 55, 100.0, &[101.0, 99.4, 99.4, 100.0, 103.0]);
        let candles = make_candles(&closes);
        let result = run_backtest(&candles, &RunParams::default()).unwrap();

        let opens = result
            .trade_log
            .iter()
            .filter(|ev| matches!(ev, TradeEvent::Open { .. }))
            .count();
        assert_eq!(opens, result.positions.len());
        assert_eq!(opens, result.kpis.trades_opened);
    }
}
