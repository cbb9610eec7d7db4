use std::collections::BTreeMap;

use chrono::{Datelike, Months, NaiveDate};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};

use super::Page;
use crate::format;

/// Page size used for every financial ledger.
pub const LEDGER_PAGE_SIZE: usize = 100;

/// Months of history requested for the monthly summary.
pub const MONTHLY_SUMMARY_MONTHS: u32 = 24;

/// Sales split for one revenue type.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct WalletBreakdown {
    pub sales_cents: i64,
    pub tax_collected_cents: i64,
    pub arenamatic_fee_cents: i64,
    pub stripe_clawback_cents: i64,
}

/// `/web/financials/room-summary/{slug}`
///
/// All totals are computed server-side; missing ones read as zero.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct RoomFinancialSummary {
    pub room_slug: String,
    pub currency: String,
    pub period_start: String,
    pub period_end: String,

    pub all_wallet_breakdown: BTreeMap<String, WalletBreakdown>,

    pub room_wallet_sales_cents: i64,
    pub room_wallet_tax_cents: i64,
    pub room_wallet_arenamatic_fees_cents: i64,

    pub platform_wallet_sales_cents: i64,
    pub platform_wallet_tax_cents: i64,
    pub platform_wallet_arenamatic_fees_cents: i64,
    pub platform_processing_fees_cents: i64,

    pub total_due_to_room_cents: i64,

    pub bonus_outstanding_start_cents: i64,
    pub bonus_granted_cents: i64,
    pub bonus_revoked_cents: i64,
    pub bonus_consumed_cents: i64,
    pub bonus_outstanding_end_cents: i64,

    pub room_user_liability_start_cents: i64,
    pub room_wallet_deposits_cents: i64,
    pub room_wallet_withdrawals_cents: i64,
    pub room_wallet_spend_cents: i64,
    pub room_user_liability_end_cents: i64,
}

impl RoomFinancialSummary {
    /// Net settlement: what the platform owes the room once the room's own
    /// wallet fees are offset against the platform-wallet sales due to it.
    pub fn platform_owes_room_cents(&self) -> i64 {
        self.total_due_to_room_cents - self.room_wallet_arenamatic_fees_cents
    }

    /// Revenue types with humanized labels, in key order.
    pub fn breakdown_rows(&self) -> Vec<(String, &WalletBreakdown)> {
        self.all_wallet_breakdown
            .iter()
            .map(|(k, v)| (format::humanize_key(k), v))
            .collect()
    }

    pub fn money(&self, cents: i64) -> String {
        format::currency(cents)
    }
}

/// One row of `/web/financials/monthly-summary/{slug}`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct MonthlyRow {
    pub period_start: Option<String>,
    pub period_end: Option<String>,
    pub month: Option<String>,
    pub sales_platform_cents: i64,
    pub sales_room_cents: i64,
    pub sales_total_cents: i64,
    pub tax_platform_cents: i64,
    pub tax_room_cents: i64,
    pub tax_total_cents: i64,
    pub arenamatic_fees_platform_cents: i64,
    pub arenamatic_fees_room_cents: i64,
    pub arenamatic_fees_total_cents: i64,
    pub processing_fees_cents: i64,
    pub net_cents: i64,
}

impl MonthlyRow {
    fn anchor(&self) -> Option<NaiveDate> {
        [&self.period_start, &self.month, &self.period_end]
            .into_iter()
            .flatten()
            .find_map(|raw| parse_month_anchor(raw))
    }

    /// `May 2024`, or `?` when the backend sent nothing parseable.
    pub fn label(&self) -> String {
        self.anchor()
            .map(|d| d.format("%b %Y").to_string())
            .unwrap_or_else(|| "?".to_string())
    }

    /// Date range that drills into this month on the summary tab.
    pub fn range(&self) -> Option<DateRange> {
        let start = self
            .period_start
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok());
        let end = self
            .period_end
            .as_deref()
            .and_then(|s| NaiveDate::parse_from_str(s.get(..10)?, "%Y-%m-%d").ok());
        match (start, end) {
            (Some(start), Some(end)) => Some(DateRange { start, end }),
            _ => self.anchor().map(DateRange::month_of),
        }
    }
}

fn parse_month_anchor(raw: &str) -> Option<NaiveDate> {
    let head = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(head, "%Y-%m-%d")
        .ok()
        .or_else(|| NaiveDate::parse_from_str(&format!("{}-01", raw.get(..7)?), "%Y-%m-%d").ok())
}

#[derive(Debug, Clone, Deserialize, Default)]
pub struct MonthlySummaryResponse {
    #[serde(default)]
    pub months: Vec<MonthlyRow>,
}

/// A ledger line shared by the spend/refund, deposit/withdrawal and bonus
/// ledgers. Amounts are tax-excluded cents.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct TransactionRow {
    #[serde(default)]
    pub id: Option<i64>,
    pub date: String,
    #[serde(default)]
    pub user: String,
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub revenue_type: Option<String>,
    #[serde(default)]
    pub amount: i64,
    #[serde(default)]
    pub tax: Option<i64>,
    #[serde(default)]
    pub bonus_spend: Option<i64>,
    #[serde(default)]
    pub room_spend: Option<i64>,
    #[serde(default)]
    pub arenamatic_spend: Option<i64>,
    #[serde(default)]
    pub arenamatic_fee: Option<i64>,
    #[serde(default)]
    pub processing_fee: Option<i64>,
    #[serde(default)]
    pub revenue: Option<i64>,
    #[serde(default)]
    pub due_to_club: Option<i64>,
    #[serde(default)]
    pub note: String,
    #[serde(default)]
    pub is_refund: bool,
    #[serde(default)]
    pub refunded: bool,
}

/// What the refund column shows for a spend/refund row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefundState {
    Refundable(i64),
    Refunded,
    Reversal,
    None,
}

impl TransactionRow {
    pub fn when(&self, tz: Tz) -> String {
        format::short_date_time(&self.date, tz)
    }

    pub fn amount_label(&self) -> String {
        format::currency(self.amount)
    }

    pub fn cell(&self, cents: Option<i64>) -> String {
        format::optional_currency(cents)
    }

    pub fn revenue_type_label(&self) -> &str {
        self.revenue_type.as_deref().unwrap_or("")
    }

    pub fn spend_label(&self) -> &'static str {
        if self.kind == "spend" {
            "Spend"
        } else {
            "Refund"
        }
    }

    pub fn deposit_label(&self) -> &'static str {
        if self.kind == "room_cash_deposit" {
            "Deposit"
        } else {
            "Withdrawal"
        }
    }

    pub fn bonus_label(&self) -> &str {
        match self.kind.as_str() {
            "bonus_granted" => "Grant",
            "bonus_revoked" => "Revoke",
            "spend" => "Consumed",
            other => other,
        }
    }

    pub fn refund_state(&self) -> RefundState {
        if self.refunded {
            RefundState::Refunded
        } else if self.is_refund {
            RefundState::Reversal
        } else if let Some(id) = self.id {
            RefundState::Refundable(id)
        } else {
            RefundState::None
        }
    }

    pub fn refundable_id(&self) -> Option<i64> {
        match self.refund_state() {
            RefundState::Refundable(id) => Some(id),
            _ => None,
        }
    }
}

/// Inclusive reporting window, serialized as `YYYY-MM-DD`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// First of the month through `today`.
    pub fn month_to_date(today: NaiveDate) -> Self {
        Self {
            start: first_of_month(today),
            end: today,
        }
    }

    /// The whole calendar month containing `date`.
    pub fn month_of(date: NaiveDate) -> Self {
        let start = first_of_month(date);
        let end = start
            .checked_add_months(Months::new(1))
            .and_then(|d| d.pred_opt())
            .unwrap_or(start);
        Self { start, end }
    }

    /// Builds a range from optional query values, falling back to
    /// month-to-date and swapping reversed bounds.
    pub fn from_query(start: Option<&str>, end: Option<&str>, today: NaiveDate) -> Self {
        let default = Self::month_to_date(today);
        let parse = |v: Option<&str>| v.and_then(|s| NaiveDate::parse_from_str(s, "%Y-%m-%d").ok());
        let start = parse(start).unwrap_or(default.start);
        let end = parse(end).unwrap_or(default.end);
        if start <= end {
            Self { start, end }
        } else {
            Self {
                start: end,
                end: start,
            }
        }
    }

    pub fn start_str(&self) -> String {
        self.start.format("%Y-%m-%d").to_string()
    }

    pub fn end_str(&self) -> String {
        self.end.format("%Y-%m-%d").to_string()
    }

    /// `YYYY-MM` of the start date, used to preselect the month picker.
    pub fn month_key(&self) -> String {
        self.start.format("%Y-%m").to_string()
    }
}

fn first_of_month(date: NaiveDate) -> NaiveDate {
    date.with_day(1).unwrap_or(date)
}

/// Entry of the month picker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthOption {
    pub label: String,
    pub value: String,
    pub range: DateRange,
}

/// The current month and the eleven before it, newest first.
pub fn recent_months(today: NaiveDate, count: u32) -> Vec<MonthOption> {
    let current = first_of_month(today);
    (0..count)
        .filter_map(|i| current.checked_sub_months(Months::new(i)))
        .map(|start| MonthOption {
            label: start.format("%B %Y").to_string(),
            value: start.format("%Y-%m").to_string(),
            range: DateRange::month_of(start),
        })
        .collect()
}

/// One page of a ledger.
pub type LedgerPage = Page<TransactionRow>;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RefundRequest {
    pub original_tx_id: i64,
}
