use std::fmt::{Debug, Display, Formatter};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::core::finance::Money;
use crate::core::planning::{ItemId, ItemSpec, Op, Record, ValueRule};

/// One computed step: the item together with its rounded value.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ItemResult {
    pub spec: ItemSpec,
    pub value: Money,
}

/// Results keyed by item id, in evaluation order.
///
/// "Last inserted" queries must follow insertion order, not id order, so this
/// is a list of pairs rather than a hash map.
#[derive(Debug, PartialEq, Clone, Default, Serialize, Deserialize)]
pub struct Results(Vec<ItemResult>);

impl Results {
    fn insert(&mut self, spec: ItemSpec, value: Money) {
        self.0.push(ItemResult { spec, value });
    }

    #[must_use]
    pub fn get(&self, id: &ItemId) -> Option<Money> {
        self.0.iter().find(|r| &r.spec.id == id).map(|r| r.value)
    }

    #[must_use]
    pub fn last(&self) -> Option<&ItemResult> {
        self.0.last()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<'a> IntoIterator for &'a Results {
    type Item = &'a ItemResult;
    type IntoIter = std::slice::Iter<'a, ItemResult>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// The distributed outcome of a record, produced fresh on every run.
#[derive(PartialEq, Clone, Serialize, Deserialize)]
pub struct Distribution {
    pub total_income: Money,
    pub total_expense: Money,
    pub net_result: Money,
    pub final_result: Money,
    pub uses_overrides: bool,
    pub items: Results,
}

impl Debug for Distribution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Distribution")
            .field("total_income", &self.total_income)
            .field("total_expense", &self.total_expense)
            .field("final_result", &self.final_result)
            .field("uses_overrides", &self.uses_overrides)
            .field("items_count", &self.items.len())
            .finish()
    }
}

impl Distribution {
    /// The defined fallback: no items ran, the result is the net.
    fn net_only(record: &Record) -> Self {
        Self {
            total_income: record.total_income,
            total_expense: record.total_expense,
            net_result: record.net(),
            final_result: record.net(),
            uses_overrides: false,
            items: Results::default(),
        }
    }
}

impl Display for Distribution {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Distribution:")?;
        writeln!(f, "├── Income:  {:>14}", self.total_income.to_string())?;
        writeln!(f, "├── Expense: {:>14}", self.total_expense.to_string())?;
        writeln!(f, "├── Net:     {:>14}", self.net_result.to_string())?;
        if self.uses_overrides {
            writeln!(f, "├── (per-record overrides)")?;
        }
        writeln!(f, "│")?;
        for result in &self.items {
            writeln!(
                f,
                "├── {:<25} {:>14}",
                result.spec.name,
                result.value.to_string()
            )?;
        }
        writeln!(f, "└── Final:   {:>14}", self.final_result.to_string())
    }
}

/// Derives an item's value before its operation is applied.
///
/// A reference to a missing or not-yet-evaluated item degrades to zero; the
/// engine reports it but never fails on it.
fn raw_value(item: &ItemSpec, income: Money, expense: Money, results: &Results) -> Decimal {
    match &item.value {
        ValueRule::TotalIncome => income.as_decimal(),
        ValueRule::TotalExpense => expense.as_decimal(),
        ValueRule::Fixed { amount } => Money::from_major(*amount).as_decimal(),
        ValueRule::PercentOfIncome { rate } => rate.apply_to(income.as_decimal()),
        ValueRule::PercentOfExpense { rate } => rate.apply_to(expense.as_decimal()),
        ValueRule::Reference { item: referenced } => results.get(referenced).map_or_else(
            || {
                warn!(
                    item = %item.id,
                    reference = %referenced,
                    "reference to a missing or later item, contributing 0"
                );
                Decimal::ZERO
            },
            Money::as_decimal,
        ),
    }
}

/// Combines the raw value with the item's operand.
fn apply_operation(item: &ItemSpec, raw: Decimal, results: &Results) -> Decimal {
    let operand = || {
        item.operation
            .operand
            .as_ref()
            .and_then(|id| results.get(id))
            .or_else(|| results.last().map(|r| r.value))
            .map_or(Decimal::ZERO, Money::as_decimal)
    };
    match item.operation.op {
        Op::Set => raw,
        Op::Add => operand() + raw,
        Op::Subtract => operand() - raw,
        Op::Multiply => operand() * raw,
        // The item's own raw value is the divisor, not the operand.
        Op::Divide => {
            if raw.is_zero() {
                Decimal::ZERO
            } else {
                operand() / raw
            }
        }
    }
}

/// Evaluates the record's effective items in order and returns the
/// distribution.
///
/// A single linear pass: each item's raw value is combined with its operand,
/// rounded to whole minor units, and stored; the final result is the value of
/// the last item evaluated. When the record opts out of calculation or no
/// items are configured, the final result is the net.
///
/// Total over its inputs: never fails and never mutates the record.
#[must_use]
pub fn distribute(record: &Record) -> Distribution {
    if !record.use_calculation {
        return Distribution::net_only(record);
    }
    let items = record.effective_items();
    if items.is_empty() {
        return Distribution::net_only(record);
    }

    let mut results = Results::default();
    for item in items {
        let raw = raw_value(&item, record.total_income, record.total_expense, &results);
        let combined = apply_operation(&item, raw, &results);
        results.insert(item, Money::round(combined));
    }

    let final_result = results.last().map_or_else(|| record.net(), |r| r.value);
    Distribution {
        total_income: record.total_income,
        total_expense: record.total_expense,
        net_result: record.net(),
        final_result,
        uses_overrides: record.uses_overrides(),
        items: results,
    }
}
