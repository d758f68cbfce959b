//! CSV format handling for journal rows and account output
//!
//! This module centralizes all CSV format concerns, providing:
//! - JournalRow structure for deserialization
//! - Conversion from journal rows to ledger commands
//! - Account output serialization
//!
//! All functions are pure (no I/O) for easy testing.

use crate::types::{ExpenseId, Identity, ReplayError, Timestamp};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::io::Write;
use std::str::FromStr;

/// Separator for list-valued cells
pub const LIST_SEPARATOR: char = ';';

/// One raw row of the journal
///
/// Header: `op,caller,expense,members,amounts,description,rate,at`.
/// Every column except `op` and `caller` may be empty.
#[derive(Debug, Deserialize, Clone, PartialEq, Default)]
pub struct JournalRow {
    pub op: String,
    pub caller: String,
    pub expense: Option<String>,
    pub members: Option<String>,
    pub amounts: Option<String>,
    pub description: Option<String>,
    pub rate: Option<String>,
    pub at: Option<String>,
}

/// A validated journal command
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerCommand {
    /// Add simulated funds to a wallet
    Fund { identity: Identity, amount: Decimal },
    Create {
        owner: Identity,
        members: Vec<Identity>,
        amounts: Vec<Decimal>,
        description: String,
        rate: Decimal,
        at: Option<Timestamp>,
    },
    Edit {
        caller: Identity,
        expense: ExpenseId,
        description: String,
    },
    Delete {
        caller: Identity,
        expense: ExpenseId,
    },
    /// Mark shares paid without moving funds; an empty member list means the caller
    Pay {
        caller: Identity,
        expense: ExpenseId,
        members: Vec<Identity>,
    },
    /// Pay the caller's shares of `expenses` through the coordinator
    Settle {
        payer: Identity,
        expenses: Vec<ExpenseId>,
        at: Option<Timestamp>,
    },
}

/// Convert a raw journal row into a command
///
/// Op names are case-insensitive and cells are trimmed. Returns `InvalidRow`
/// describing the first problem found.
pub fn convert_journal_row(row: JournalRow) -> Result<LedgerCommand, ReplayError> {
    let op = row.op.trim().to_lowercase();
    let caller = Identity::new(&row.caller)
        .map_err(|_| ReplayError::invalid_row(format!("{op}: missing caller")))?;

    let command = match op.as_str() {
        "fund" => LedgerCommand::Fund {
            identity: caller,
            amount: parse_decimal(&op, "amounts", require(&op, "amounts", &row.amounts)?)?,
        },
        "create" => LedgerCommand::Create {
            owner: caller,
            members: parse_identities(&op, row.members.as_deref().unwrap_or(""))?,
            amounts: split_list(row.amounts.as_deref().unwrap_or(""))
                .map(|amount| parse_decimal(&op, "amounts", amount))
                .collect::<Result<_, _>>()?,
            description: row.description.unwrap_or_default().trim().to_string(),
            rate: match cell(&row.rate) {
                Some(rate) => parse_decimal(&op, "rate", rate)?,
                None => Decimal::ZERO,
            },
            at: parse_timestamp(&op, &row.at)?,
        },
        "edit" => LedgerCommand::Edit {
            caller,
            expense: parse_expense_id(&op, require(&op, "expense", &row.expense)?)?,
            description: require(&op, "description", &row.description)?.to_string(),
        },
        "delete" => LedgerCommand::Delete {
            caller,
            expense: parse_expense_id(&op, require(&op, "expense", &row.expense)?)?,
        },
        "pay" => LedgerCommand::Pay {
            caller,
            expense: parse_expense_id(&op, require(&op, "expense", &row.expense)?)?,
            members: parse_identities(&op, row.members.as_deref().unwrap_or(""))?,
        },
        "settle" => LedgerCommand::Settle {
            payer: caller,
            expenses: split_list(require(&op, "expense", &row.expense)?)
                .map(|expense| parse_expense_id(&op, expense))
                .collect::<Result<_, _>>()?,
            at: parse_timestamp(&op, &row.at)?,
        },
        _ => {
            return Err(ReplayError::invalid_row(format!(
                "unknown op '{}'",
                row.op.trim()
            )))
        }
    };

    Ok(command)
}

fn cell(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn require<'a>(op: &str, column: &str, value: &'a Option<String>) -> Result<&'a str, ReplayError> {
    cell(value).ok_or_else(|| ReplayError::invalid_row(format!("{op} requires '{column}'")))
}

fn split_list(value: &str) -> impl Iterator<Item = &str> {
    value
        .split(LIST_SEPARATOR)
        .map(str::trim)
        .filter(|item| !item.is_empty())
}

fn parse_decimal(op: &str, column: &str, value: &str) -> Result<Decimal, ReplayError> {
    Decimal::from_str(value.trim())
        .map_err(|_| ReplayError::invalid_row(format!("{op}: invalid {column} '{value}'")))
}

fn parse_expense_id(op: &str, value: &str) -> Result<ExpenseId, ReplayError> {
    value
        .trim()
        .parse()
        .map_err(|_| ReplayError::invalid_row(format!("{op}: invalid expense id '{value}'")))
}

fn parse_identities(op: &str, value: &str) -> Result<Vec<Identity>, ReplayError> {
    split_list(value)
        .map(|member| {
            Identity::new(member)
                .map_err(|e| ReplayError::invalid_row(format!("{op}: {e}")))
        })
        .collect()
}

fn parse_timestamp(op: &str, value: &Option<String>) -> Result<Option<Timestamp>, ReplayError> {
    cell(value)
        .map(|at| {
            at.parse()
                .map_err(|_| ReplayError::invalid_row(format!("{op}: invalid timestamp '{at}'")))
        })
        .transpose()
}

/// Final per-identity view written by the replay
#[derive(Debug, Clone, PartialEq)]
pub struct AccountView {
    pub identity: Identity,
    /// Outstanding debt
    pub owed: Decimal,
    /// Reward credit
    pub credit: u64,
    /// Simulated wallet balance
    pub wallet: Decimal,
}

/// Write account views as CSV, sorted by identity, amounts with 6 decimal places
pub fn write_accounts_csv(
    accounts: &[AccountView],
    output: &mut dyn Write,
) -> Result<(), ReplayError> {
    use csv::Writer;

    let mut writer = Writer::from_writer(output);

    writer.write_record(["identity", "owed", "credit", "wallet"])?;

    // Sort by identity for deterministic output
    let mut sorted_accounts = accounts.to_vec();
    sorted_accounts.sort_by(|a, b| a.identity.cmp(&b.identity));

    for account in sorted_accounts {
        writer.write_record(&[
            account.identity.to_string(),
            format!("{:.6}", account.owed),
            account.credit.to_string(),
            format!("{:.6}", account.wallet),
        ])?;
    }

    writer.flush()?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn id(token: &str) -> Identity {
        Identity::new(token).unwrap()
    }

    fn row(op: &str, caller: &str) -> JournalRow {
        JournalRow {
            op: op.to_string(),
            caller: caller.to_string(),
            ..JournalRow::default()
        }
    }

    fn with(value: &str) -> Option<String> {
        Some(value.to_string())
    }

    #[test]
    fn test_convert_create_row() {
        let row = JournalRow {
            members: with("0xA; 0xb"),
            amounts: with("1.5;2"),
            description: with("  Dinner "),
            rate: with("5"),
            at: with("1700000000"),
            ..row("create", "0xO")
        };

        assert_eq!(
            convert_journal_row(row).unwrap(),
            LedgerCommand::Create {
                owner: id("0xo"),
                members: vec![id("0xa"), id("0xb")],
                amounts: vec![Decimal::new(15, 1), Decimal::from(2)],
                description: "Dinner".to_string(),
                rate: Decimal::from(5),
                at: Some(1_700_000_000),
            }
        );
    }

    #[test]
    fn test_create_rate_and_time_are_optional() {
        let row = JournalRow {
            members: with("0xa"),
            amounts: with("1"),
            ..row("CREATE", "0xo")
        };

        match convert_journal_row(row).unwrap() {
            LedgerCommand::Create { rate, at, .. } => {
                assert_eq!(rate, Decimal::ZERO);
                assert_eq!(at, None);
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[rstest]
    #[case::fund(
        JournalRow { amounts: with("10"), ..row("Fund", "0xa") },
        LedgerCommand::Fund { identity: id("0xa"), amount: Decimal::from(10) }
    )]
    #[case::edit(
        JournalRow { expense: with("3"), description: with("Lunch"), ..row("edit", "0xo") },
        LedgerCommand::Edit { caller: id("0xo"), expense: 3, description: "Lunch".to_string() }
    )]
    #[case::delete(
        JournalRow { expense: with(" 0 "), ..row("delete", "0xo") },
        LedgerCommand::Delete { caller: id("0xo"), expense: 0 }
    )]
    #[case::pay_self(
        JournalRow { expense: with("1"), ..row("pay", "0xa") },
        LedgerCommand::Pay { caller: id("0xa"), expense: 1, members: vec![] }
    )]
    #[case::pay_many(
        JournalRow { expense: with("1"), members: with("0xa;0xb"), ..row("pay", "0xo") },
        LedgerCommand::Pay { caller: id("0xo"), expense: 1, members: vec![id("0xa"), id("0xb")] }
    )]
    #[case::settle(
        JournalRow { expense: with("0;2"), at: with("86400"), ..row("SETTLE", "0xa") },
        LedgerCommand::Settle { payer: id("0xa"), expenses: vec![0, 2], at: Some(86_400) }
    )]
    fn test_convert_commands(#[case] row: JournalRow, #[case] expected: LedgerCommand) {
        assert_eq!(convert_journal_row(row).unwrap(), expected);
    }

    #[rstest]
    #[case::unknown_op(row("refund", "0xa"), "unknown op")]
    #[case::missing_caller(row("fund", "  "), "missing caller")]
    #[case::fund_without_amount(row("fund", "0xa"), "requires 'amounts'")]
    #[case::bad_amount(JournalRow { amounts: with("ten"), ..row("fund", "0xa") }, "invalid amounts")]
    #[case::bad_expense_id(JournalRow { expense: with("-1"), ..row("delete", "0xa") }, "invalid expense id")]
    #[case::edit_without_description(JournalRow { expense: with("1"), ..row("edit", "0xa") }, "requires 'description'")]
    #[case::bad_timestamp(JournalRow { expense: with("1"), at: with("soon"), ..row("settle", "0xa") }, "invalid timestamp")]
    fn test_convert_errors(#[case] row: JournalRow, #[case] expected_error: &str) {
        let error = convert_journal_row(row).unwrap_err();
        assert!(
            error.to_string().contains(expected_error),
            "'{error}' should contain '{expected_error}'"
        );
    }

    #[rstest]
    #[case::sorted_by_identity(
        vec![
            AccountView { identity: id("0xb"), owed: Decimal::ZERO, credit: 100, wallet: Decimal::new(25, 1) },
            AccountView { identity: id("0xa"), owed: Decimal::from(3), credit: 0, wallet: Decimal::ZERO },
        ],
        "identity,owed,credit,wallet\n0xa,3.000000,0,0.000000\n0xb,0.000000,100,2.500000\n"
    )]
    #[case::six_decimal_precision(
        vec![AccountView { identity: id("0xa"), owed: Decimal::new(1_234_567, 6), credit: 0, wallet: Decimal::ZERO }],
        "identity,owed,credit,wallet\n0xa,1.234567,0,0.000000\n"
    )]
    #[case::empty(vec![], "identity,owed,credit,wallet\n")]
    fn test_write_accounts_csv(#[case] accounts: Vec<AccountView>, #[case] expected_output: &str) {
        let mut output = Vec::new();
        write_accounts_csv(&accounts, &mut output).unwrap();

        assert_eq!(String::from_utf8(output).unwrap(), expected_output);
    }
}
