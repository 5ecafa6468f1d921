use std::fmt::{Display, Formatter};

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::finance::{Money, Percentage};

/// Identifier of an item, unique within its owning list.
#[derive(Debug, PartialEq, Eq, Hash, Clone, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(String);

impl ItemId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for ItemId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl Display for ItemId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How an item derives its raw value, before its operation is applied.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueRule {
    /// The period's total income.
    TotalIncome,
    /// The period's total expense.
    TotalExpense,
    /// A fixed amount in major currency units.
    Fixed { amount: Decimal },
    /// A share of the total income.
    PercentOfIncome { rate: Percentage },
    /// A share of the total expense.
    PercentOfExpense { rate: Percentage },
    /// The already-computed value of an earlier item.
    Reference { item: ItemId },
}

#[derive(Debug, PartialEq, Eq, Copy, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Op {
    Set,
    Add,
    Subtract,
    Multiply,
    Divide,
}

/// The combination step of an item: `op` between an operand and the raw value.
///
/// The operand is the stored result of `operand` when set and already
/// computed; otherwise the most recently computed result; otherwise zero.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct OperationRule {
    pub op: Op,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub operand: Option<ItemId>,
}

impl OperationRule {
    #[must_use]
    pub fn new(op: Op) -> Self {
        Self { op, operand: None }
    }

    #[must_use]
    pub fn against(op: Op, operand: ItemId) -> Self {
        Self {
            op,
            operand: Some(operand),
        }
    }
}

/// One step of a distribution: derives a raw value and combines it with an
/// operand to produce this item's stored result.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct ItemSpec {
    pub id: ItemId,
    pub order_index: i32,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: ValueRule,
    pub operation: OperationRule,
}

impl ItemSpec {
    #[must_use]
    pub fn new(
        id: impl Into<ItemId>,
        order_index: i32,
        name: impl Into<String>,
        value: ValueRule,
        operation: OperationRule,
    ) -> Self {
        Self {
            id: id.into(),
            order_index,
            name: name.into(),
            description: None,
            value,
            operation,
        }
    }
}

/// A reusable, named ordered list of item templates.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    pub name: String,
    pub items: Vec<ItemSpec>,
}

impl Profile {
    #[must_use]
    pub fn new(name: impl Into<String>, items: Vec<ItemSpec>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            items,
        }
    }
}

impl Display for Profile {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Profile: {}", self.name)?;
        let mut items = self.items.clone();
        items.sort_by_key(|i| i.order_index);
        let len = items.len();
        for (n, item) in items.iter().enumerate() {
            let prefix = if n + 1 == len { "└──" } else { "├──" };
            writeln!(f, "{prefix} {:<3} {}", item.order_index, item.name)?;
        }
        Ok(())
    }
}

/// A closed operating period whose result is being distributed.
///
/// The totals are aggregated by the external ledger and are immutable inputs
/// to a single run; the engine never writes them back.
#[derive(Debug, PartialEq, Clone, Serialize, Deserialize)]
pub struct Record {
    pub total_income: Money,
    pub total_expense: Money,
    pub profile: Option<Profile>,
    pub overrides: Vec<ItemSpec>,
    pub use_calculation: bool,
}

impl Record {
    #[must_use]
    pub fn new(total_income: Money, total_expense: Money, profile: Option<Profile>) -> Self {
        Self {
            total_income,
            total_expense,
            profile,
            overrides: Vec::new(),
            use_calculation: true,
        }
    }

    /// Per-record items that replace the profile's items wholesale.
    #[must_use]
    pub fn with_overrides(mut self, overrides: Vec<ItemSpec>) -> Self {
        self.overrides = overrides;
        self
    }

    /// Opts the record out of calculation; its result is then the net.
    #[must_use]
    pub fn without_calculation(mut self) -> Self {
        self.use_calculation = false;
        self
    }

    #[must_use]
    pub fn net(&self) -> Money {
        self.total_income - self.total_expense
    }

    #[must_use]
    pub fn uses_overrides(&self) -> bool {
        !self.overrides.is_empty()
    }

    /// The effective ordered item list: overrides if any exist, else the
    /// profile's items, else empty. Sorted by `order_index`; the sort is
    /// stable, so ties keep their list order.
    #[must_use]
    pub fn effective_items(&self) -> Vec<ItemSpec> {
        let source = if self.uses_overrides() {
            &self.overrides
        } else if let Some(profile) = &self.profile {
            &profile.items
        } else {
            return Vec::new();
        };
        let mut items = source.clone();
        items.sort_by_key(|i| i.order_index);
        items
    }
}

#[cfg(test)]
mod test_planning {
    use super::*;
    use crate::core::finance::Money;

    fn item(id: &str, order_index: i32) -> ItemSpec {
        ItemSpec::new(
            id,
            order_index,
            id.to_uppercase(),
            ValueRule::TotalIncome,
            OperationRule::new(Op::Set),
        )
    }

    fn record(profile: Option<Profile>) -> Record {
        Record::new(Money::from_minor(1000), Money::from_minor(400), profile)
    }

    #[test]
    fn no_profile_no_overrides_is_empty() {
        assert!(record(None).effective_items().is_empty());
    }

    #[test]
    fn profile_items_sorted_by_order_index() {
        let profile = Profile::new("p", vec![item("b", 2), item("c", 3), item("a", 1)]);
        let ids: Vec<_> = record(Some(profile))
            .effective_items()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["a".into(), "b".into(), "c".into()]);
    }

    #[test]
    fn duplicate_order_index_keeps_insertion_order() {
        let profile = Profile::new("p", vec![item("x", 1), item("y", 1), item("z", 1)]);
        let ids: Vec<_> = record(Some(profile))
            .effective_items()
            .into_iter()
            .map(|i| i.id)
            .collect();
        assert_eq!(ids, vec!["x".into(), "y".into(), "z".into()]);
    }

    #[test]
    fn overrides_replace_profile_entirely() {
        let profile = Profile::new("p", vec![item("a", 1), item("b", 2)]);
        let record = record(Some(profile)).with_overrides(vec![item("only", 5)]);
        assert!(record.uses_overrides());
        let ids: Vec<_> = record.effective_items().into_iter().map(|i| i.id).collect();
        assert_eq!(ids, vec!["only".into()]);
    }

    #[test]
    fn net_is_income_minus_expense() {
        assert_eq!(record(None).net(), Money::from_minor(600));
    }
}
