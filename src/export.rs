// CSV export of contribution ledgers

use crate::entities::Contribution;
use anyhow::Result;
use serde::Serialize;
use std::io::Write;

#[derive(Debug, Serialize)]
struct LedgerRow<'a> {
    id: u64,
    owner: String,
    amount: String,
    purpose: &'a str,
    date: String,
}

/// Write contributions as `id,owner,amount,purpose,date`; returns rows written
pub fn write_contributions_csv<W: Write>(writer: W, contributions: &[Contribution]) -> Result<usize> {
    let mut wtr = csv::Writer::from_writer(writer);

    for c in contributions {
        wtr.serialize(LedgerRow {
            id: c.id,
            owner: c.owner.to_string(),
            amount: format!("{:.2}", c.amount),
            purpose: &c.purpose,
            date: c.date.format("%Y-%m-%d").to_string(),
        })?;
    }

    wtr.flush()?;
    Ok(contributions.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entities::{ContributionOwner, NewContribution};
    use chrono::NaiveDate;

    #[test]
    fn test_ledger_csv() {
        let date = NaiveDate::from_ymd_opt(2024, 8, 15).unwrap();
        let rows = vec![
            Contribution::new(1, NewContribution::new(ContributionOwner::Family(3), 1000.0, "Feast").on(date)),
            Contribution::new(2, NewContribution::new(ContributionOwner::Family(3), 250.5, "Charity, poor fund").on(date)),
        ];

        let mut out = Vec::new();
        let written = write_contributions_csv(&mut out, &rows).unwrap();
        assert_eq!(written, 2);

        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "id,owner,amount,purpose,date");
        assert_eq!(lines[1], "1,family:3,1000.00,Feast,2024-08-15");
        assert_eq!(lines[2], "2,family:3,250.50,\"Charity, poor fund\",2024-08-15");
    }

    #[test]
    fn test_empty_ledger_writes_nothing() {
        let mut out = Vec::new();
        assert_eq!(write_contributions_csv(&mut out, &[]).unwrap(), 0);
        assert!(out.is_empty());
    }
}
