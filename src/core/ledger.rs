//! Expense ledger
//!
//! This module provides the ExpenseLedger component that owns the append-only table
//! of expense records and the per-identity balance view derived from it.
//!
//! # Storage
//!
//! Records live in a `Vec` indexed by their id. Ids are allocated sequentially and
//! slots are never compacted, so a deleted expense keeps its id forever and the
//! next created expense never reuses it.
//!
//! # Balances
//!
//! The balance of an identity is the sum of its unpaid shares across every expense,
//! tombstoned ones included. It is kept as a cache that is updated inside the same
//! `&mut self` call that changes the table, so it cannot drift across a mutation
//! boundary. [`ExpenseLedger::recompute_balance`] derives the same number from the
//! table alone for audits.

use crate::types::{
    Expense, ExpenseFilter, ExpenseId, ExpenseStatus, Identity, LedgerError, NewExpense,
    AMOUNT_SCALE,
};
use log::debug;
use rust_decimal::Decimal;
use std::collections::{BTreeSet, HashMap, HashSet};

/// Expense table plus the derived balance cache
#[derive(Debug, Default)]
pub struct ExpenseLedger {
    /// Every record ever created, indexed by id
    expenses: Vec<Expense>,

    /// Outstanding amount per debtor
    balances: HashMap<Identity, Decimal>,
}

impl ExpenseLedger {
    /// Create a new empty ledger
    pub fn new() -> Self {
        ExpenseLedger {
            expenses: Vec::new(),
            balances: HashMap::new(),
        }
    }

    /// Record a new expense
    ///
    /// Allocates the next sequential id, appends the record with every share unpaid
    /// and increases each member's balance by its share.
    ///
    /// # Errors
    ///
    /// Returns `InvalidExpenseInput` if:
    /// - `members` is empty
    /// - `members` and `amounts` differ in length
    /// - a member appears twice
    /// - an amount is negative or finer than the smallest denomination
    /// - the interest rate is negative
    ///
    /// Returns `ArithmeticOverflow` if a member's balance would overflow. Nothing is
    /// recorded when an error is returned.
    pub fn create(&mut self, new: NewExpense) -> Result<ExpenseId, LedgerError> {
        validate(&new)?;

        // Stage the new balances first so an overflow leaves the ledger untouched
        let mut staged = Vec::with_capacity(new.members.len());
        for (member, amount) in new.members.iter().zip(&new.amounts) {
            let updated = self
                .balance(member)
                .checked_add(*amount)
                .ok_or_else(|| LedgerError::arithmetic_overflow("create_expense"))?;
            staged.push((member.clone(), updated));
        }

        let id = self.expenses.len() as ExpenseId;
        let member_count = new.members.len();
        self.expenses.push(Expense {
            id,
            owner: new.owner,
            description: new.description,
            interest_rate: new.interest_rate,
            created_at: new.created_at,
            involved_members: new.members,
            amounts_owed: new.amounts,
            has_paid: vec![false; member_count],
            is_settled: false,
            status: ExpenseStatus::Active,
        });
        self.balances.extend(staged);

        debug!("Created expense {} with {} members", id, member_count);
        Ok(id)
    }

    /// Look up an active expense
    ///
    /// # Errors
    ///
    /// Returns `NotFound` if the id was never allocated or the expense was deleted.
    pub fn get(&self, id: ExpenseId) -> Result<&Expense, LedgerError> {
        self.expenses
            .get(id as usize)
            .filter(|expense| expense.is_active())
            .ok_or_else(|| LedgerError::not_found(id))
    }

    fn get_mut(&mut self, id: ExpenseId) -> Result<&mut Expense, LedgerError> {
        self.expenses
            .get_mut(id as usize)
            .filter(|expense| expense.is_active())
            .ok_or_else(|| LedgerError::not_found(id))
    }

    /// Replace the description of an expense
    ///
    /// # Errors
    ///
    /// - `NotFound` if the expense is unknown or deleted
    /// - `NotOwner` if `caller` does not own the expense
    pub fn edit(
        &mut self,
        id: ExpenseId,
        description: impl Into<String>,
        caller: &Identity,
    ) -> Result<(), LedgerError> {
        let expense = self.get_mut(id)?;
        if &expense.owner != caller {
            return Err(LedgerError::not_owner(id, caller));
        }
        expense.description = description.into();
        Ok(())
    }

    /// Tombstone an expense
    ///
    /// Clears the description and marks the record deleted. Amounts and payment
    /// flags are kept, so balances still reflect unpaid shares.
    ///
    /// # Errors
    ///
    /// - `NotFound` if the expense is unknown or already deleted
    /// - `NotOwner` if `caller` does not own the expense
    pub fn delete(&mut self, id: ExpenseId, caller: &Identity) -> Result<(), LedgerError> {
        let expense = self.get_mut(id)?;
        if &expense.owner != caller {
            return Err(LedgerError::not_owner(id, caller));
        }
        expense.description.clear();
        expense.status = ExpenseStatus::Deleted;
        Ok(())
    }

    /// Active expenses owned by `identity` or owed by it, in ascending id order
    pub fn list_involving(&self, identity: &Identity, filter: ExpenseFilter) -> Vec<&Expense> {
        self.active()
            .filter(|expense| expense.involves(identity) && filter.matches(expense))
            .collect()
    }

    /// Active expenses owned by `identity`, in ascending id order
    pub fn list_owned_by(&self, identity: &Identity, filter: ExpenseFilter) -> Vec<&Expense> {
        self.active()
            .filter(|expense| &expense.owner == identity && filter.matches(expense))
            .collect()
    }

    /// Outstanding amount `identity` owes across all expenses
    pub fn balance(&self, identity: &Identity) -> Decimal {
        self.balances
            .get(identity)
            .copied()
            .unwrap_or(Decimal::ZERO)
    }

    /// Derive the balance of `identity` from the expense table alone
    pub fn recompute_balance(&self, identity: &Identity) -> Decimal {
        self.expenses
            .iter()
            .filter_map(|expense| {
                expense
                    .position_of(identity)
                    .filter(|pos| !expense.has_paid[*pos])
                    .map(|pos| expense.amounts_owed[pos])
            })
            .sum()
    }

    /// Every identity that owns or owes on any record, tombstones included
    pub fn identities(&self) -> BTreeSet<Identity> {
        self.expenses
            .iter()
            .flat_map(|expense| std::iter::once(&expense.owner).chain(&expense.involved_members))
            .cloned()
            .collect()
    }

    /// All records, tombstones included, in id order
    pub fn records(&self) -> &[Expense] {
        &self.expenses
    }

    /// Number of ids allocated so far
    pub fn len(&self) -> usize {
        self.expenses.len()
    }

    pub fn is_empty(&self) -> bool {
        self.expenses.is_empty()
    }

    fn active(&self) -> impl Iterator<Item = &Expense> {
        self.expenses.iter().filter(|expense| expense.is_active())
    }

    /// Flip the share at `position` of expense `id` to paid
    ///
    /// The caller must have checked that the expense is active and the share is
    /// unpaid. Returns the amount of the share and whether this flip settled the
    /// expense.
    pub(crate) fn mark_position_paid(&mut self, id: ExpenseId, position: usize) -> (Decimal, bool) {
        let expense = &mut self.expenses[id as usize];
        expense.has_paid[position] = true;
        let amount = expense.amounts_owed[position];
        let member = expense.involved_members[position].clone();

        let settled_now = !expense.is_settled && expense.has_paid.iter().all(|paid| *paid);
        if settled_now {
            expense.is_settled = true;
        }

        // The cached balance always includes this unpaid share, so it cannot go negative
        if let Some(balance) = self.balances.get_mut(&member) {
            *balance -= amount;
        }

        (amount, settled_now)
    }
}

fn validate(new: &NewExpense) -> Result<(), LedgerError> {
    if new.members.is_empty() {
        return Err(LedgerError::invalid_input("members must not be empty"));
    }
    if new.members.len() != new.amounts.len() {
        return Err(LedgerError::invalid_input(format!(
            "{} members but {} amounts",
            new.members.len(),
            new.amounts.len()
        )));
    }

    let mut seen = HashSet::with_capacity(new.members.len());
    for member in &new.members {
        if !seen.insert(member) {
            return Err(LedgerError::invalid_input(format!(
                "member {} appears more than once",
                member
            )));
        }
    }

    for amount in &new.amounts {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(LedgerError::invalid_input(format!(
                "amount {} is negative",
                amount
            )));
        }
        if amount.normalize().scale() > AMOUNT_SCALE {
            return Err(LedgerError::invalid_input(format!(
                "amount {} is finer than {} decimal places",
                amount, AMOUNT_SCALE
            )));
        }
    }

    if new.interest_rate.is_sign_negative() && !new.interest_rate.is_zero() {
        return Err(LedgerError::invalid_input(format!(
            "interest rate {} is negative",
            new.interest_rate
        )));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn id(token: &str) -> Identity {
        Identity::new(token).unwrap()
    }

    fn dinner(owner: &str, members: &[&str], amounts: &[i64]) -> NewExpense {
        NewExpense {
            owner: id(owner),
            members: members.iter().map(|m| id(m)).collect(),
            amounts: amounts.iter().map(|a| Decimal::from(*a)).collect(),
            description: "Dinner".to_string(),
            interest_rate: Decimal::from(5),
            created_at: 1_700_000_000,
        }
    }

    #[test]
    fn test_create_assigns_sequential_ids() {
        let mut ledger = ExpenseLedger::new();

        let first = ledger.create(dinner("0xo", &["0xa"], &[100])).unwrap();
        let second = ledger.create(dinner("0xo", &["0xb"], &[200])).unwrap();

        assert_eq!(first, 0);
        assert_eq!(second, 1);
        assert_eq!(ledger.len(), 2);
    }

    #[test]
    fn test_create_starts_unpaid_and_open() {
        let mut ledger = ExpenseLedger::new();

        let expense_id = ledger
            .create(dinner("0xo", &["0xa", "0xb"], &[100, 200]))
            .unwrap();

        let expense = ledger.get(expense_id).unwrap();
        assert_eq!(expense.owner, id("0xo"));
        assert_eq!(expense.description, "Dinner");
        assert_eq!(expense.has_paid, vec![false, false]);
        assert!(!expense.is_settled);
        assert_eq!(expense.status, ExpenseStatus::Active);
    }

    #[test]
    fn test_create_increases_member_balances() {
        let mut ledger = ExpenseLedger::new();

        ledger
            .create(dinner("0xo", &["0xa", "0xb"], &[100, 200]))
            .unwrap();
        ledger.create(dinner("0xo", &["0xa"], &[150])).unwrap();

        assert_eq!(ledger.balance(&id("0xa")), Decimal::from(250));
        assert_eq!(ledger.balance(&id("0xb")), Decimal::from(200));
        assert_eq!(ledger.balance(&id("0xo")), Decimal::ZERO);
    }

    #[rstest]
    #[case::no_members(dinner("0xo", &[], &[]), "must not be empty")]
    #[case::length_mismatch(dinner("0xo", &["0xa", "0xb"], &[100]), "2 members but 1 amounts")]
    #[case::duplicate_member(dinner("0xo", &["0xa", "0xA"], &[1, 2]), "appears more than once")]
    #[case::negative_amount(dinner("0xo", &["0xa"], &[-1]), "is negative")]
    fn test_create_rejects_invalid_input(#[case] new: NewExpense, #[case] expected: &str) {
        let mut ledger = ExpenseLedger::new();

        let err = ledger.create(new).unwrap_err();

        assert!(matches!(err, LedgerError::InvalidExpenseInput { .. }));
        assert!(err.to_string().contains(expected), "{}", err);
        assert!(ledger.is_empty());
    }

    #[test]
    fn test_create_rejects_negative_interest_rate() {
        let mut ledger = ExpenseLedger::new();
        let mut new = dinner("0xo", &["0xa"], &[100]);
        new.interest_rate = Decimal::from(-1);

        assert!(matches!(
            ledger.create(new),
            Err(LedgerError::InvalidExpenseInput { .. })
        ));
    }

    #[test]
    fn test_create_rejects_sub_unit_precision() {
        let mut ledger = ExpenseLedger::new();
        let mut new = dinner("0xo", &["0xa"], &[0]);
        new.amounts = vec![Decimal::new(1, 7)];

        assert!(matches!(
            ledger.create(new),
            Err(LedgerError::InvalidExpenseInput { .. })
        ));
        assert_eq!(ledger.balance(&id("0xa")), Decimal::ZERO);
    }

    #[test]
    fn test_create_accepts_zero_amount() {
        let mut ledger = ExpenseLedger::new();

        let expense_id = ledger.create(dinner("0xo", &["0xa"], &[0])).unwrap();

        assert_eq!(ledger.get(expense_id).unwrap().amounts_owed[0], Decimal::ZERO);
    }

    #[test]
    fn test_create_overflow_leaves_ledger_untouched() {
        let mut ledger = ExpenseLedger::new();
        let mut huge = dinner("0xo", &["0xa"], &[0]);
        huge.amounts = vec![Decimal::MAX];
        ledger.create(huge.clone()).unwrap();

        let err = ledger.create(huge).unwrap_err();

        assert!(matches!(err, LedgerError::ArithmeticOverflow { .. }));
        assert_eq!(ledger.len(), 1);
        assert_eq!(ledger.balance(&id("0xa")), Decimal::MAX);
    }

    #[test]
    fn test_get_unknown_expense() {
        let ledger = ExpenseLedger::new();

        assert_eq!(ledger.get(42), Err(LedgerError::not_found(42)));
    }

    #[test]
    fn test_edit_by_owner() {
        let mut ledger = ExpenseLedger::new();
        let expense_id = ledger.create(dinner("0xo", &["0xa"], &[100])).unwrap();

        ledger
            .edit(expense_id, "New Description", &id("0xO"))
            .unwrap();

        assert_eq!(ledger.get(expense_id).unwrap().description, "New Description");
    }

    #[test]
    fn test_edit_by_non_owner() {
        let mut ledger = ExpenseLedger::new();
        let expense_id = ledger.create(dinner("0xo", &["0xa"], &[100])).unwrap();

        let result = ledger.edit(expense_id, "Hijacked", &id("0xa"));

        assert_eq!(result, Err(LedgerError::not_owner(expense_id, &id("0xa"))));
        assert_eq!(ledger.get(expense_id).unwrap().description, "Dinner");
    }

    #[test]
    fn test_delete_tombstones_record() {
        let mut ledger = ExpenseLedger::new();
        let expense_id = ledger.create(dinner("0xo", &["0xa"], &[100])).unwrap();

        ledger.delete(expense_id, &id("0xo")).unwrap();

        assert_eq!(ledger.get(expense_id), Err(LedgerError::not_found(expense_id)));
        let record = &ledger.records()[expense_id as usize];
        assert_eq!(record.description, "");
        assert_eq!(record.status, ExpenseStatus::Deleted);
        assert_eq!(record.amounts_owed, vec![Decimal::from(100)]);
    }

    #[test]
    fn test_delete_keeps_debt_and_id_slot() {
        let mut ledger = ExpenseLedger::new();
        let deleted = ledger.create(dinner("0xo", &["0xa"], &[100])).unwrap();
        ledger.delete(deleted, &id("0xo")).unwrap();

        let next = ledger.create(dinner("0xo", &["0xa"], &[50])).unwrap();

        assert_eq!(next, deleted + 1);
        assert_eq!(ledger.balance(&id("0xa")), Decimal::from(150));
        assert_eq!(ledger.recompute_balance(&id("0xa")), Decimal::from(150));
    }

    #[rstest]
    #[case::non_owner("0xa", LedgerError::not_owner(0, &Identity::new("0xa").unwrap()))]
    fn test_delete_by_non_owner(#[case] caller: &str, #[case] expected: LedgerError) {
        let mut ledger = ExpenseLedger::new();
        ledger.create(dinner("0xo", &["0xa"], &[100])).unwrap();

        assert_eq!(ledger.delete(0, &id(caller)), Err(expected));
        assert!(ledger.get(0).is_ok());
    }

    #[test]
    fn test_edit_and_delete_after_delete_are_not_found() {
        let mut ledger = ExpenseLedger::new();
        ledger.create(dinner("0xo", &["0xa"], &[100])).unwrap();
        ledger.delete(0, &id("0xo")).unwrap();

        assert_eq!(ledger.edit(0, "x", &id("0xo")), Err(LedgerError::not_found(0)));
        assert_eq!(ledger.delete(0, &id("0xo")), Err(LedgerError::not_found(0)));
    }

    #[test]
    fn test_list_involving_includes_owner_and_member_roles() {
        let mut ledger = ExpenseLedger::new();
        ledger
            .create(dinner("0xo", &["0xa", "0xb"], &[100, 200]))
            .unwrap();
        ledger
            .create(dinner("0xa", &["0xo", "0xb"], &[300, 100]))
            .unwrap();
        ledger.create(dinner("0xo", &["0xb"], &[10])).unwrap();

        let ids: Vec<ExpenseId> = ledger
            .list_involving(&id("0xa"), ExpenseFilter::All)
            .iter()
            .map(|expense| expense.id)
            .collect();

        assert_eq!(ids, vec![0, 1]);
    }

    #[test]
    fn test_list_owned_by_skips_tombstones() {
        let mut ledger = ExpenseLedger::new();
        ledger.create(dinner("0xo", &["0xa"], &[100])).unwrap();
        ledger.create(dinner("0xo", &["0xb"], &[200])).unwrap();
        ledger.create(dinner("0xb", &["0xa"], &[300])).unwrap();
        ledger.delete(0, &id("0xo")).unwrap();

        let owned = ledger.list_owned_by(&id("0xo"), ExpenseFilter::All);

        assert_eq!(owned.len(), 1);
        assert_eq!(owned[0].id, 1);
    }

    #[test]
    fn test_list_filters_by_settlement() {
        let mut ledger = ExpenseLedger::new();
        ledger.create(dinner("0xo", &["0xa"], &[100])).unwrap();
        ledger.create(dinner("0xo", &["0xa"], &[200])).unwrap();
        ledger.mark_position_paid(1, 0);

        let settled = ledger.list_owned_by(&id("0xo"), ExpenseFilter::Settled);
        let unsettled = ledger.list_involving(&id("0xa"), ExpenseFilter::Unsettled);

        assert_eq!(settled.len(), 1);
        assert_eq!(settled[0].id, 1);
        assert_eq!(unsettled.len(), 1);
        assert_eq!(unsettled[0].id, 0);
    }

    #[test]
    fn test_mark_position_paid_updates_balance_and_settlement() {
        let mut ledger = ExpenseLedger::new();
        ledger
            .create(dinner("0xo", &["0xa", "0xb"], &[100, 200]))
            .unwrap();

        let (amount, settled) = ledger.mark_position_paid(0, 0);
        assert_eq!(amount, Decimal::from(100));
        assert!(!settled);
        assert_eq!(ledger.balance(&id("0xa")), Decimal::ZERO);
        assert_eq!(ledger.balance(&id("0xb")), Decimal::from(200));

        let (_, settled) = ledger.mark_position_paid(0, 1);
        assert!(settled);
        assert!(ledger.get(0).unwrap().is_settled);
    }

    #[test]
    fn test_identities_collects_owners_and_members() {
        let mut ledger = ExpenseLedger::new();
        ledger
            .create(dinner("0xo", &["0xa", "0xb"], &[100, 200]))
            .unwrap();
        ledger.delete(0, &id("0xo")).unwrap();
        ledger.create(dinner("0xc", &["0xa"], &[1])).unwrap();

        let identities: Vec<String> = ledger
            .identities()
            .into_iter()
            .map(String::from)
            .collect();

        assert_eq!(identities, vec!["0xa", "0xb", "0xc", "0xo"]);
    }
}
