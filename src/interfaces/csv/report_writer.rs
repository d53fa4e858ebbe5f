use crate::domain::membership::{MembershipRequest, MembershipStatus};
use crate::domain::transaction::{Transaction, TransactionStatus};
use crate::error::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Serialize)]
struct MembershipRow {
    membership: u64,
    user: u64,
    price: String,
    status: MembershipStatus,
}

#[derive(Serialize)]
struct TransactionRow {
    transaction: String,
    membership: u64,
    user: u64,
    price: String,
    gateway_transaction: Option<String>,
    status: TransactionStatus,
}

/// Writes the final membership and transaction tables as two CSV blocks
/// separated by a blank line.
pub struct ReportWriter<W: Write> {
    out: W,
}

impl<W: Write> ReportWriter<W> {
    pub fn new(out: W) -> Self {
        Self { out }
    }

    pub fn write_report(
        &mut self,
        memberships: Vec<MembershipRequest>,
        transactions: Vec<Transaction>,
    ) -> Result<()> {
        {
            let mut writer = csv::Writer::from_writer(&mut self.out);
            for m in memberships {
                writer.serialize(MembershipRow {
                    membership: m.id.0,
                    user: m.user.0,
                    price: m.price.to_string(),
                    status: m.status,
                })?;
            }
            writer.flush()?;
        }
        writeln!(self.out)?;
        {
            let mut writer = csv::Writer::from_writer(&mut self.out);
            for tx in transactions {
                writer.serialize(TransactionRow {
                    transaction: tx.id.to_string(),
                    membership: tx.membership.0,
                    user: tx.user.0,
                    price: tx.price.to_string(),
                    gateway_transaction: tx.gateway_transaction_id,
                    status: tx.status,
                })?;
            }
            writer.flush()?;
        }
        Ok(())
    }
}
