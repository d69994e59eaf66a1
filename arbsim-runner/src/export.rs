//! Reporting and export: JSON report, trade log and snapshot CSV.
//!
//! The JSON report carries a `schema_version` field. Reports written by a
//! newer schema are rejected on load.

use std::path::Path;

use anyhow::{bail, Context, Result};

use crate::runner::{PnlSnapshot, RunReport, SCHEMA_VERSION};
use crate::sweep::SweepRow;

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `RunReport` to pretty JSON.
pub fn export_json(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).context("failed to serialize RunReport to JSON")
}

/// Deserialize a `RunReport` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<RunReport> {
    let report: RunReport =
        serde_json::from_str(json).context("failed to deserialize RunReport from JSON")?;
    if report.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            report.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(report)
}

pub fn write_json(report: &RunReport, path: &Path) -> Result<()> {
    let json = export_json(report)?;
    std::fs::write(path, json).with_context(|| format!("failed to write {}", path.display()))
}

// ─── Text / CSV export ──────────────────────────────────────────────

/// Write the trade log exactly as the engine produced it.
pub fn write_trade_log(report: &RunReport, path: &Path) -> Result<()> {
    std::fs::write(path, &report.trade_log)
        .with_context(|| format!("failed to write trade log to {}", path.display()))
}

/// Snapshots as CSV with columns time, total_pnl, mid_b, mid_a.
pub fn export_snapshots_csv(snapshots: &[PnlSnapshot]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["time", "total_pnl", "mid_b", "mid_a"])?;
    for s in snapshots {
        wtr.write_record([
            s.time.to_string(),
            format!("{:.6}", s.total_pnl),
            format!("{:.6}", s.mid_b),
            format!("{:.6}", s.mid_a),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Sweep results as CSV, one row per grid point in ranked order.
pub fn export_sweep_csv(rows: &[SweepRow]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "rank",
        "min_arbitrage_edge",
        "max_abs_exposure_lots",
        "stop_loss_pnl",
        "total_pnl",
        "worst_pnl",
        "traded_lots",
        "max_abs_exposure",
        "halted",
    ])?;
    for (i, row) in rows.iter().enumerate() {
        let p = &row.params;
        let s = &row.summary;
        wtr.write_record([
            (i + 1).to_string(),
            p.min_arbitrage_edge().to_string(),
            p.max_abs_exposure_lots().to_string(),
            p.stop_loss_pnl().to_string(),
            format!("{:.6}", s.total_pnl),
            format!("{:.6}", s.worst_pnl),
            s.traded_lots.to_string(),
            s.max_abs_exposure.to_string(),
            s.halted.to_string(),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runner::TimingStats;
    use arbsim_core::{MergeStats, RunSummary, StrategyParams, TieBreak};

    fn report() -> RunReport {
        RunReport {
            schema_version: SCHEMA_VERSION,
            run_id: "abc".into(),
            dataset_hash: "def".into(),
            generated_at: chrono::Utc::now(),
            params: StrategyParams::new(1.0, 2, -3.0).unwrap(),
            tie_break: TieBreak::Seeded { seed: 9 },
            summary: RunSummary {
                total_pnl: 1.5,
                best_pnl: 2.0,
                worst_pnl: -0.5,
                max_abs_exposure: 2,
                traded_lots: 4,
                dropped_buys: 1,
                dropped_sells: 0,
                final_position: 0,
                trade_count: 3,
                halted: false,
            },
            merge_stats: MergeStats {
                emitted_a: 5,
                emitted_b: 6,
                ties: 1,
            },
            snapshots: vec![PnlSnapshot {
                time: 60,
                total_pnl: 1.0,
                mid_a: 100.0,
                mid_b: 100.5,
            }],
            timing: TimingStats::default(),
            trade_log: "1,BUY,FutureB,1,100\n".into(),
        }
    }

    #[test]
    fn json_round_trip() {
        let original = report();
        let back = import_json(&export_json(&original).unwrap()).unwrap();
        assert_eq!(back.params, original.params);
        assert_eq!(back.tie_break, original.tie_break);
        assert_eq!(back.summary, original.summary);
        assert_eq!(back.snapshots, original.snapshots);
        assert_eq!(back.trade_log, original.trade_log);
        assert_eq!(back.generated_at, original.generated_at);
    }

    #[test]
    fn rejects_newer_schema() {
        let mut r = report();
        r.schema_version = SCHEMA_VERSION + 1;
        let json = export_json(&r).unwrap();
        let err = import_json(&json).unwrap_err();
        assert!(err.to_string().contains("unsupported schema version"));
    }

    #[test]
    fn missing_schema_version_defaults() {
        let mut value: serde_json::Value = serde_json::to_value(report()).unwrap();
        value.as_object_mut().unwrap().remove("schema_version");
        let back = import_json(&value.to_string()).unwrap();
        assert_eq!(back.schema_version, SCHEMA_VERSION);
    }

    #[test]
    fn invalid_params_in_json_are_rejected() {
        let mut value: serde_json::Value = serde_json::to_value(report()).unwrap();
        value["params"]["max_abs_exposure_lots"] = serde_json::json!(0);
        assert!(import_json(&value.to_string()).is_err());
    }

    #[test]
    fn snapshot_csv() {
        let csv = export_snapshots_csv(&report().snapshots).unwrap();
        let lines: Vec<&str> = csv.lines().collect();
        assert_eq!(lines[0], "time,total_pnl,mid_b,mid_a");
        assert_eq!(lines[1], "60,1.000000,100.500000,100.000000");
    }

    #[test]
    fn writes_files() {
        let dir = tempfile::tempdir().unwrap();
        let r = report();
        let log = dir.path().join("trades.log");
        let json = dir.path().join("report.json");
        write_trade_log(&r, &log).unwrap();
        write_json(&r, &json).unwrap();
        assert_eq!(std::fs::read_to_string(&log).unwrap(), r.trade_log);
        let back = import_json(&std::fs::read_to_string(&json).unwrap()).unwrap();
        assert_eq!(back.run_id, "abc");
    }
}
