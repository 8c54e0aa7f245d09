use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use uuid::Uuid;

/// Account classification. Decides which transaction kinds grow the
/// balance and which shrink it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountClass {
    /// Checking, savings, investment: money held.
    Asset,
    /// Credit card, loan: money owed. Balance is the outstanding debt.
    Liability,
}

impl AccountClass {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountClass::Asset => "asset",
            AccountClass::Liability => "liability",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "asset" => Some(AccountClass::Asset),
            "liability" => Some(AccountClass::Liability),
            _ => None,
        }
    }

    /// Sign convention for an account-side amount. Pure; the create and
    /// update paths must go through this same function.
    ///
    /// Asset accounts: deposits, contributions and interest add to the
    /// balance, everything else subtracts. Liability accounts: a payment
    /// reduces the debt, everything else grows it.
    pub fn signed_amount(&self, magnitude: Decimal, kind: AccountTransactionKind) -> Decimal {
        let magnitude = magnitude.abs();
        match self {
            AccountClass::Asset => match kind {
                AccountTransactionKind::Deposit
                | AccountTransactionKind::Contribution
                | AccountTransactionKind::Interest => magnitude,
                _ => -magnitude,
            },
            AccountClass::Liability => match kind {
                AccountTransactionKind::Payment => -magnitude,
                _ => magnitude,
            },
        }
    }
}

/// Account-side transaction kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum AccountTransactionKind {
    Deposit,
    Withdrawal,
    Payment,
    Contribution,
    Interest,
    Transfer,
}

impl AccountTransactionKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccountTransactionKind::Deposit => "deposit",
            AccountTransactionKind::Withdrawal => "withdrawal",
            AccountTransactionKind::Payment => "payment",
            AccountTransactionKind::Contribution => "contribution",
            AccountTransactionKind::Interest => "interest",
            AccountTransactionKind::Transfer => "transfer",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "deposit" => Some(AccountTransactionKind::Deposit),
            "withdrawal" => Some(AccountTransactionKind::Withdrawal),
            "payment" => Some(AccountTransactionKind::Payment),
            "contribution" => Some(AccountTransactionKind::Contribution),
            "interest" => Some(AccountTransactionKind::Interest),
            "transfer" => Some(AccountTransactionKind::Transfer),
            _ => None,
        }
    }

    /// How this kind reads from the budget side: money leaving
    /// (withdrawal, payment) is an expense, everything else income.
    pub fn entry_type(&self) -> EntryType {
        match self {
            AccountTransactionKind::Withdrawal | AccountTransactionKind::Payment => {
                EntryType::Expense
            }
            _ => EntryType::Income,
        }
    }
}

/// Budget-side entry type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum EntryType {
    /// Money spent (negative budget-side amount)
    #[default]
    Expense,
    /// Money received (positive budget-side amount)
    Income,
}

impl EntryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntryType::Expense => "expense",
            EntryType::Income => "income",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "expense" => Some(EntryType::Expense),
            "income" => Some(EntryType::Income),
            _ => None,
        }
    }

    /// Budget-side sign convention: expenses negative, income positive.
    pub fn signed_amount(&self, magnitude: Decimal) -> Decimal {
        let magnitude = magnitude.abs();
        match self {
            EntryType::Expense => -magnitude,
            EntryType::Income => magnitude,
        }
    }

    /// The account-side kind a fresh unified write of this type produces.
    pub fn default_kind(&self) -> AccountTransactionKind {
        match self {
            EntryType::Expense => AccountTransactionKind::Withdrawal,
            EntryType::Income => AccountTransactionKind::Deposit,
        }
    }
}

/// Category flavor. Savings goals and debt payments may carry a linked
/// settlement account the suggestion resolver hands out.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum CategoryType {
    #[default]
    Regular,
    SavingsGoal,
    DebtPayment,
}

impl CategoryType {
    pub fn as_str(&self) -> &'static str {
        match self {
            CategoryType::Regular => "regular",
            CategoryType::SavingsGoal => "savings_goal",
            CategoryType::DebtPayment => "debt_payment",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "regular" => Some(CategoryType::Regular),
            "savings_goal" => Some(CategoryType::SavingsGoal),
            "debt_payment" => Some(CategoryType::DebtPayment),
            _ => None,
        }
    }
}

/// Database model for accounts. `current_balance` must always equal
/// `opening_balance` plus the sum of the account's signed transaction
/// amounts; the writer and mutator maintain it with absolute-value writes.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Account {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub account_class: String,
    pub opening_balance: Decimal,
    pub current_balance: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Account {
    pub fn class(&self) -> AccountClass {
        AccountClass::parse(&self.account_class).unwrap_or(AccountClass::Asset)
    }
}

/// Database model for categories, including the read-only type
/// configuration owned by the budgeting feature.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Category {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub name: String,
    pub budget_cap: Decimal,
    pub category_type: String,
    pub linked_account_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Category {
    pub fn category_type(&self) -> CategoryType {
        CategoryType::parse(&self.category_type).unwrap_or_default()
    }
}

/// Database model for budget-side transactions. `amount` is signed:
/// expenses negative, income positive.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Transaction {
    pub id: Uuid,
    pub owner_id: Uuid,
    pub category_id: Option<Uuid>,
    pub amount: Decimal,
    pub transaction_date: DateTime<Utc>,
    pub description: String,
    pub source: String,
    pub account_transaction_id: Option<Uuid>,
    pub recurring_id: Option<Uuid>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Database model for account-side transactions. `amount` is signed per
/// the owning account's class.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AccountTransaction {
    pub id: Uuid,
    pub account_id: Uuid,
    pub amount: Decimal,
    pub kind: String,
    pub transaction_date: DateTime<Utc>,
    pub description: String,
    pub transaction_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl AccountTransaction {
    pub fn kind(&self) -> AccountTransactionKind {
        AccountTransactionKind::parse(&self.kind).unwrap_or(AccountTransactionKind::Withdrawal)
    }
}

/// Insert payload for a budget-side transaction. The store assigns id and
/// timestamps.
#[derive(Debug, Clone)]
pub struct NewTransaction {
    pub owner_id: Uuid,
    pub category_id: Option<Uuid>,
    pub amount: Decimal,
    pub transaction_date: DateTime<Utc>,
    pub description: String,
    pub source: String,
    pub account_transaction_id: Option<Uuid>,
    pub recurring_id: Option<Uuid>,
    pub notes: Option<String>,
}

/// Insert payload for an account-side transaction.
#[derive(Debug, Clone)]
pub struct NewAccountTransaction {
    pub account_id: Uuid,
    pub amount: Decimal,
    pub kind: AccountTransactionKind,
    pub transaction_date: DateTime<Utc>,
    pub description: String,
    pub transaction_id: Option<Uuid>,
}

/// Partial update for a budget-side transaction. Absolute new values;
/// `None` leaves the column untouched. The double option on the link
/// column distinguishes "leave it" from "clear it".
#[derive(Debug, Clone, Default)]
pub struct TransactionChange {
    pub amount: Option<Decimal>,
    pub transaction_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
    pub account_transaction_id: Option<Option<Uuid>>,
    pub notes: Option<Option<String>>,
}

/// Partial update for an account-side transaction. Absolute new values.
#[derive(Debug, Clone, Default)]
pub struct AccountTransactionChange {
    pub amount: Option<Decimal>,
    pub kind: Option<AccountTransactionKind>,
    pub transaction_date: Option<DateTime<Utc>>,
    pub description: Option<String>,
}

/// Date-window filter for listing a category's transactions.
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodFilter {
    pub start: Option<DateTime<Utc>>,
    pub end: Option<DateTime<Utc>>,
}

impl PeriodFilter {
    pub fn contains(&self, date: DateTime<Utc>) -> bool {
        if let Some(start) = self.start {
            if date < start {
                return false;
            }
        }
        if let Some(end) = self.end {
            if date > end {
                return false;
            }
        }
        true
    }
}
