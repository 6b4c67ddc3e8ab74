//! # Schedule Subcommand
//!
//! Prints the vesting table for a set of escrow terms: one row per interval
//! with the amount that vests at that step and the running total.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use tranche_types::{EscrowTerms, TimeSpan, constants};
use tranche_vesting::{ScheduleRow, VestingSchedule, schedule_table, step_count};

/// Arguments for the `tranche schedule` subcommand.
#[derive(Args, Debug)]
pub struct ScheduleArgs {
    /// Path to an escrow terms JSON file.
    #[arg(long, value_name = "TERMS_JSON")]
    pub terms: PathBuf,

    /// Dispute extension to apply, in seconds.
    #[arg(long, default_value_t = 0)]
    pub extension: TimeSpan,

    /// Also show cumulative amounts in major units.
    #[arg(long)]
    pub major_units: bool,

    /// Currency decimals used by `--major-units`.
    #[arg(long, default_value_t = constants::DEFAULT_DISPLAY_DECIMALS)]
    pub decimals: u32,

    /// Emit rows as JSON lines instead of a table.
    #[arg(long)]
    pub rows_json: bool,
}

/// Execute the schedule subcommand.
///
/// Returns exit code 0 on success.
pub fn run_schedule(args: &ScheduleArgs) -> Result<u8> {
    let terms = EscrowTerms::load(&args.terms)
        .with_context(|| format!("failed to load terms: {}", args.terms.display()))?;
    let rows = schedule_rows(&terms, args.extension)?;
    tracing::debug!(rows = rows.len(), extension = args.extension, "schedule computed");

    let mut out = std::io::stdout().lock();
    if args.rows_json {
        for row in &rows {
            writeln!(out, "{}", serde_json::to_string(row)?)?;
        }
    } else {
        let decimals = args.major_units.then_some(args.decimals);
        write_table(&mut out, &terms, &rows, decimals)?;
    }
    Ok(0)
}

/// Validate `terms` and tabulate their schedule with `extension` applied.
///
/// Schedules with more than [`constants::MAX_SCHEDULE_ROWS`] intervals are
/// refused rather than truncated.
pub fn schedule_rows(terms: &EscrowTerms, extension: TimeSpan) -> Result<Vec<ScheduleRow>> {
    terms.validate().context("terms are invalid")?;
    let schedule = VestingSchedule::from_terms(terms).with_extension(extension);
    let steps = step_count(&schedule);
    if steps > constants::MAX_SCHEDULE_ROWS {
        bail!(
            "schedule has {steps} intervals; at most {} can be tabulated",
            constants::MAX_SCHEDULE_ROWS
        );
    }
    Ok(schedule_table(&schedule))
}

fn write_table(
    out: &mut impl Write,
    terms: &EscrowTerms,
    rows: &[ScheduleRow],
    decimals: Option<u32>,
) -> Result<()> {
    let schedule = VestingSchedule::from_terms(terms);
    writeln!(
        out,
        "total {}  vested {}%  vested share {}  settlement share {}",
        terms.total_amount,
        terms.vested_percentage,
        schedule.vested_share(),
        schedule.settlement_share()
    )?;
    writeln!(out, "{:>6}  {:>10}  {:>24}  {:>24}", "step", "offset_s", "increment", "cumulative")?;
    for row in rows {
        let cumulative = match decimals.and_then(|d| row.cumulative.to_major_units(d)) {
            Some(major) => format!("{} ({major})", row.cumulative),
            None => row.cumulative.to_string(),
        };
        writeln!(
            out,
            "{:>6}  {:>10}  {:>24}  {:>24}",
            row.step, row.offset, row.increment, cumulative
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tranche_types::{Amount, PartyId};

    fn terms() -> EscrowTerms {
        EscrowTerms::new(
            PartyId([1u8; 20]),
            PartyId([2u8; 20]),
            Amount(1_000_000),
            70,
            60,
            10,
        )
    }

    #[test]
    fn rows_end_at_vested_share() {
        let rows = schedule_rows(&terms(), 0).unwrap();
        assert_eq!(rows.len(), 6);
        assert_eq!(rows[2].cumulative, Amount(350_000));
        assert_eq!(rows[5].cumulative, Amount(700_000));
    }

    #[test]
    fn extension_adds_rows() {
        let rows = schedule_rows(&terms(), 20).unwrap();
        assert_eq!(rows.len(), 8);
        assert_eq!(rows[7].cumulative, Amount(700_000));
    }

    #[test]
    fn invalid_terms_rejected() {
        let mut bad = terms();
        bad.interval = 7;
        assert!(schedule_rows(&bad, 0).is_err());
    }

    #[test]
    fn oversized_schedule_refused() {
        let mut long = terms();
        long.total_duration = 1_000_000_000_000_000;
        long.interval = 1;
        let err = schedule_rows(&long, 0).unwrap_err();
        assert!(err.to_string().contains("intervals"));

        long.total_duration = constants::MAX_SCHEDULE_ROWS;
        let rows = schedule_rows(&long, 0).unwrap();
        assert_eq!(rows.last().map(|r| r.cumulative), Some(Amount(700_000)));
    }

    #[test]
    fn table_mentions_major_units() {
        let t = EscrowTerms::new(
            PartyId([1u8; 20]),
            PartyId([2u8; 20]),
            Amount(2_000_000_000_000_000_000),
            50,
            20,
            10,
        );
        let rows = schedule_rows(&t, 0).unwrap();
        let mut buf = Vec::new();
        write_table(&mut buf, &t, &rows, Some(constants::DEFAULT_DISPLAY_DECIMALS)).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("(0.5)"));
        assert!(text.contains("(1)"));
    }

    #[test]
    fn loads_terms_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("terms.json");
        std::fs::write(&path, serde_json::to_string(&terms()).unwrap()).unwrap();
        let args = ScheduleArgs {
            terms: path,
            extension: 0,
            major_units: false,
            decimals: constants::DEFAULT_DISPLAY_DECIMALS,
            rows_json: true,
        };
        assert_eq!(run_schedule(&args).unwrap(), 0);
    }
}
