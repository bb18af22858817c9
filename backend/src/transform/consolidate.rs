//! Merge dated deposits and withdrawals into the Transactions fact table.
//!
//! ```text
//! deposits    ─┐ D<id>, "deposit"
//!              ├─▶ project ─▶ concat ─▶ status == "complete" ─▶ facts
//! withdrawals ─┘ W<id>, "withdrawal"
//! ```

use tracing::info;

use crate::models::{Dated, TransId, TransType, Transaction, TransactionFact};

/// A fact row that still carries the status it will be filtered on.
#[derive(Debug, Clone)]
struct StagedFact {
    fact: TransactionFact,
    complete: bool,
}

fn project(source: &[Dated<Transaction>], kind: TransType) -> impl Iterator<Item = StagedFact> + '_ {
    source.iter().map(move |dated| {
        let tx = &dated.record;
        StagedFact {
            fact: TransactionFact {
                trans_id: TransId::new(kind, tx.id),
                date_id: dated.date_id,
                user_id: tx.user_id.clone(),
                amount: tx.amount,
                currency: tx.currency.clone(),
                trans_type: kind,
            },
            complete: tx.is_complete(),
        }
    })
}

/// Build the fact table: deposits first, then withdrawals, each in source
/// order, keeping only completed transactions.
pub fn consolidate(
    deposits: &[Dated<Transaction>],
    withdrawals: &[Dated<Transaction>],
) -> Vec<TransactionFact> {
    let staged: Vec<StagedFact> = project(deposits, TransType::Deposit)
        .chain(project(withdrawals, TransType::Withdrawal))
        .collect();
    let total = staged.len();

    let facts: Vec<TransactionFact> = staged
        .into_iter()
        .filter(|s| s.complete)
        .map(|s| s.fact)
        .collect();

    info!(
        staged = total,
        not_complete = total - facts.len(),
        facts = facts.len(),
        "Consolidated transactions"
    );
    facts
}
