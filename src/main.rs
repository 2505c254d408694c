use anyhow::{bail, Context, Result};
use std::env;
use std::path::Path;

use ledger_advisor::{
    normalize_row, AdvisorSession, RawRow, RecommendationStatus, RecordKind,
};

fn main() -> Result<()> {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: ledger-advisor <expenses.csv> [--json]");
        std::process::exit(2);
    }

    let csv_path = &args[1];
    let as_json = args.iter().any(|a| a == "--json");

    let records = load_rows(Path::new(csv_path))?;
    if records.is_empty() {
        bail!("no rows found in {}", csv_path);
    }

    let mut session = AdvisorSession::new();
    session.import(records);

    if as_json {
        println!("{}", serde_json::to_string_pretty(session.recommendations())?);
        return Ok(());
    }

    print_report(&session);
    Ok(())
}

/// Load raw rows from a header-mapped CSV and normalize them as expenses.
fn load_rows(path: &Path) -> Result<Vec<ledger_advisor::Record>> {
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file: {:?}", path))?;

    let mut records = Vec::new();
    for (index, row) in reader.deserialize::<RawRow>().enumerate() {
        let mut raw: RawRow = row.with_context(|| format!("Failed to parse CSV row {}", index + 2))?;
        if raw.row_num.is_none() {
            raw.row_num = Some(index as u64 + 2); // header is row 1
        }
        records.push(normalize_row(&raw, RecordKind::Expense));
    }

    Ok(records)
}

fn print_report(session: &AdvisorSession) {
    let recommendations = session.recommendations();
    let pending: Vec<_> = recommendations
        .iter()
        .filter(|r| r.status == RecommendationStatus::Pending)
        .collect();

    println!("Loaded {} records", session.store().len());
    println!("{} pending recommendations\n", pending.len());

    for rec in pending {
        println!(
            "[{:22}] {:.0}%  {}",
            rec.kind.as_str(),
            rec.confidence * 100.0,
            rec.description
        );
    }
}
