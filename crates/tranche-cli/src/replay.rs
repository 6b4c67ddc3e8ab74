//! # Replay Subcommand
//!
//! Runs a scripted escrow session against the engine with in-memory
//! custody and prints what happened as JSON lines.
//!
//! ## Script format
//!
//! ```json
//! {
//!   "terms": { "client": "0x11..", "service_provider": "0x22..", ... },
//!   "start": 1700000000,
//!   "steps": [
//!     { "at": 0,  "caller": "client",   "op": "deposit" },
//!     { "at": 30, "caller": "provider", "op": "claim_provider_payout" },
//!     { "at": 30, "caller": "client",   "op": "claim_client_refund", "amount": 650000 },
//!     { "at": 40, "caller": "client",   "op": "query" }
//!   ]
//! }
//! ```
//!
//! `at` is an offset from `start` in seconds; without `start` the session
//! begins at the current wall-clock time. `amount` applies to deposits
//! (default: the escrow total) and refunds (default: the current maximum);
//! `extension` applies to dispute resolution. A rejected step is reported
//! and the replay carries on with the next one.

use std::io::Write;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tranche_engine::{CallContext, Clock, Entitlements, Escrow, InMemoryCustody, SystemClock};
use tranche_types::{
    Amount, DisplayStatus, EscrowId, EscrowStatus, EscrowTerms, PartyId, TimeSpan, UnixTime,
};

/// Arguments for the `tranche replay` subcommand.
#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Path to a replay script JSON file.
    #[arg(long, value_name = "SCRIPT_JSON")]
    pub script: PathBuf,

    /// Exit with code 1 if any step was rejected.
    #[arg(long)]
    pub strict: bool,
}

/// A scripted session.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayScript {
    pub terms: EscrowTerms,
    /// Schedule time of step offset 0; wall-clock time when absent.
    #[serde(default)]
    pub start: Option<UnixTime>,
    /// Nonce for the deterministic escrow id.
    #[serde(default)]
    pub nonce: u64,
    /// Client wallet balance before the first step; defaults to the total.
    #[serde(default)]
    pub client_funds: Option<Amount>,
    pub steps: Vec<ReplayStep>,
}

/// One timed operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplayStep {
    pub at: TimeSpan,
    pub caller: Actor,
    pub op: Operation,
    #[serde(default)]
    pub amount: Option<Amount>,
    #[serde(default)]
    pub extension: TimeSpan,
}

/// Who makes a call.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Actor {
    Client,
    Provider,
    Party(PartyId),
}

/// Scriptable engine operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Deposit,
    RaiseDispute,
    ResolveDispute,
    ApproveCompletion,
    ClaimProviderPayout,
    ClaimClientRefund,
    Query,
}

impl Operation {
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Deposit => "deposit",
            Self::RaiseDispute => "raise_dispute",
            Self::ResolveDispute => "resolve_dispute",
            Self::ApproveCompletion => "approve_completion",
            Self::ClaimProviderPayout => "claim_provider_payout",
            Self::ClaimClientRefund => "claim_client_refund",
            Self::Query => "query",
        }
    }
}

/// Outcome of a whole replay.
#[derive(Debug)]
pub struct ReplayReport {
    pub escrow_id: EscrowId,
    /// One JSON document per output line, in order. Lines are encoded
    /// directly to text so amounts above `u64::MAX` stay exact.
    pub lines: Vec<String>,
    pub rejected: usize,
    pub final_status: EscrowStatus,
    pub client_balance: Amount,
    pub provider_balance: Amount,
}

/// Execute the replay subcommand.
///
/// Returns exit code 0, or 1 under `--strict` when a step was rejected.
pub fn run_replay(args: &ReplayArgs) -> Result<u8> {
    let raw = std::fs::read_to_string(&args.script)
        .with_context(|| format!("failed to read script: {}", args.script.display()))?;
    let script: ReplayScript = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse script: {}", args.script.display()))?;

    let report = replay(&script)?;
    let mut out = std::io::stdout().lock();
    for line in &report.lines {
        writeln!(out, "{line}")?;
    }
    tracing::info!(
        escrow = %report.escrow_id,
        steps = script.steps.len(),
        rejected = report.rejected,
        status = %report.final_status,
        "replay finished"
    );
    Ok(u8::from(args.strict && report.rejected > 0))
}

/// Run `script` to completion.
///
/// Engine rejections become `rejected` lines; only setup failures (invalid
/// terms, custody funding) and output encoding errors abort the replay.
pub fn replay(script: &ReplayScript) -> Result<ReplayReport> {
    let terms = &script.terms;
    let (client, provider) = (terms.client, terms.service_provider);
    let escrow_id = EscrowId::derive(client, provider, script.nonce);
    let mut escrow = Escrow::create(escrow_id, terms.clone()).context("invalid escrow terms")?;

    let mut custody = InMemoryCustody::new();
    custody
        .fund_wallet(client, script.client_funds.unwrap_or(terms.total_amount))
        .context("failed to fund client wallet")?;

    let start = script.start.unwrap_or_else(|| SystemClock.now());
    let mut lines = Vec::new();
    let mut rejected = 0;
    for (index, step) in script.steps.iter().enumerate() {
        let now = start.saturating_add(step.at);
        let caller = match step.caller {
            Actor::Client => client,
            Actor::Provider => provider,
            Actor::Party(party) => party,
        };
        let ctx = CallContext::new(caller, now);

        let outcome = match step.op {
            Operation::Query => {
                lines.push(query_line(index, &escrow, now)?);
                continue;
            }
            Operation::Deposit => {
                let amount = step.amount.unwrap_or(terms.total_amount);
                escrow.deposit(ctx, amount, &mut custody)
            }
            Operation::RaiseDispute => escrow.raise_dispute(ctx),
            Operation::ResolveDispute => escrow.resolve_dispute(ctx, step.extension),
            Operation::ApproveCompletion => escrow.approve_completion(ctx),
            Operation::ClaimProviderPayout => escrow.claim_provider_payout(ctx, &mut custody),
            Operation::ClaimClientRefund => {
                let amount = step
                    .amount
                    .unwrap_or_else(|| escrow.max_client_refund(now));
                escrow.claim_client_refund(ctx, amount, &mut custody)
            }
        };

        match outcome {
            Ok(transition) if transition.is_noop() => {
                lines.push(
                    json!({ "step": index, "op": step.op.name(), "result": "noop" }).to_string(),
                );
            }
            Ok(transition) => {
                for event in &transition.events {
                    lines.push(serde_json::to_string(event)?);
                }
            }
            Err(err) => {
                rejected += 1;
                tracing::warn!(step = index, op = step.op.name(), error = %err, "step rejected");
                let line = json!({
                    "step": index,
                    "op": step.op.name(),
                    "result": "rejected",
                    "error": err.to_string(),
                });
                lines.push(line.to_string());
            }
        }
    }

    custody
        .verify_supply()
        .context("custody supply check failed after replay")?;

    Ok(ReplayReport {
        escrow_id,
        lines,
        rejected,
        final_status: escrow.status(),
        client_balance: custody.balance(client),
        provider_balance: custody.balance(provider),
    })
}

/// Output line of a `query` step.
#[derive(Serialize)]
struct QueryLine {
    step: usize,
    op: &'static str,
    at: UnixTime,
    status: DisplayStatus,
    effective_end_time: Option<UnixTime>,
    original_end_time: Option<UnixTime>,
    entitlements: Entitlements,
}

fn query_line(index: usize, escrow: &Escrow, now: UnixTime) -> Result<String> {
    let line = QueryLine {
        step: index,
        op: Operation::Query.name(),
        at: now,
        status: escrow.display_status(),
        effective_end_time: escrow.effective_end_time(),
        original_end_time: escrow.original_end_time(),
        entitlements: escrow.entitlements(now),
    };
    Ok(serde_json::to_string(&line)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    fn parsed(report: &ReplayReport) -> Vec<Value> {
        report
            .lines
            .iter()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect()
    }

    const SCRIPT: &str = r#"{
        "terms": {
            "client": "0x1111111111111111111111111111111111111111",
            "service_provider": "0x2222222222222222222222222222222222222222",
            "total_amount": 1000000,
            "vested_percentage": 70,
            "total_duration": 60,
            "interval": 10
        },
        "start": 1000,
        "steps": [
            { "at": 0,  "caller": "client",   "op": "deposit" },
            { "at": 5,  "caller": "client",   "op": "deposit" },
            { "at": 30, "caller": "provider", "op": "claim_provider_payout" },
            { "at": 30, "caller": "provider", "op": "claim_provider_payout" },
            { "at": 40, "caller": "provider", "op": "raise_dispute" },
            { "at": 45, "caller": "client",   "op": "resolve_dispute", "extension": 20 },
            { "at": 50, "caller": "client",   "op": "query" },
            { "at": 90, "caller": "provider", "op": "claim_provider_payout" },
            { "at": 90, "caller": "client",   "op": "claim_client_refund" }
        ]
    }"#;

    #[test]
    fn script_runs_to_closure() {
        let script: ReplayScript = serde_json::from_str(SCRIPT).unwrap();
        let report = replay(&script).unwrap();

        assert_eq!(report.rejected, 1);
        assert_eq!(report.final_status, EscrowStatus::Closed);
        assert_eq!(report.provider_balance, Amount(700_000));
        assert_eq!(report.client_balance, Amount(300_000));

        let lines = parsed(&report);
        assert_eq!(lines[0]["type"], "funds_deposited");
        assert_eq!(lines[1]["result"], "rejected");
        assert_eq!(lines[2]["type"], "provider_paid");
        assert_eq!(lines[2]["amount"], 350_000);
        assert_eq!(lines[3]["result"], "noop");
        assert_eq!(lines[5]["effective_end"], 1_080);
        assert_eq!(lines[6]["status"], "funded");
        assert_eq!(lines.last().unwrap()["type"], "escrow_closed");
    }

    #[test]
    fn wei_amounts_above_u64_replay_exactly() {
        // 20 ETH in wei does not fit in a u64.
        let script: ReplayScript = serde_json::from_str(
            r#"{
                "terms": {
                    "client": "0x1111111111111111111111111111111111111111",
                    "service_provider": "0x2222222222222222222222222222222222222222",
                    "total_amount": 20000000000000000000,
                    "vested_percentage": 50,
                    "total_duration": 20,
                    "interval": 10
                },
                "start": 1000,
                "steps": [
                    { "at": 0,  "caller": "client",   "op": "deposit" },
                    { "at": 10, "caller": "client",   "op": "query" },
                    { "at": 20, "caller": "provider", "op": "claim_provider_payout" }
                ]
            }"#,
        )
        .unwrap();
        let report = replay(&script).unwrap();

        assert_eq!(report.rejected, 0);
        assert!(report.lines[0].contains(r#""amount":20000000000000000000"#));
        assert!(report.lines[1].contains(r#""provider_vested":5000000000000000000"#));
        assert!(report.lines[2].contains(r#""amount":10000000000000000000"#));
        assert_eq!(report.provider_balance, Amount(10_000_000_000_000_000_000));
    }

    #[test]
    fn missing_start_uses_wall_clock() {
        let mut script: ReplayScript = serde_json::from_str(SCRIPT).unwrap();
        script.start = None;
        let before = SystemClock.now();
        let report = replay(&script).unwrap();
        let deposited_at = parsed(&report)[0]["at"].as_u64().unwrap();
        assert!(deposited_at >= before);
        assert_eq!(report.final_status, EscrowStatus::Closed);
    }

    #[test]
    fn escrow_id_is_deterministic() {
        let script: ReplayScript = serde_json::from_str(SCRIPT).unwrap();
        let a = replay(&script).unwrap();
        let b = replay(&script).unwrap();
        assert_eq!(a.escrow_id, b.escrow_id);
        assert_eq!(a.lines, b.lines);
    }

    #[test]
    fn invalid_terms_abort() {
        let mut script: ReplayScript = serde_json::from_str(SCRIPT).unwrap();
        script.terms.vested_percentage = 91;
        assert!(replay(&script).is_err());
    }

    #[test]
    fn strict_mode_fails_on_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("script.json");
        std::fs::write(&path, SCRIPT).unwrap();

        let lenient = ReplayArgs {
            script: path.clone(),
            strict: false,
        };
        assert_eq!(run_replay(&lenient).unwrap(), 0);
        let strict = ReplayArgs {
            script: path,
            strict: true,
        };
        assert_eq!(run_replay(&strict).unwrap(), 1);
    }
}
