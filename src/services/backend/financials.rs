use reqwest::Method;

use super::{segment, ApiBase, ApiError, BackendClient, CallContext};
use crate::models::financials::{
    DateRange, LedgerPage, MonthlySummaryResponse, RefundRequest, LEDGER_PAGE_SIZE,
    MONTHLY_SUMMARY_MONTHS,
};
use crate::models::{MonthlyRow, RoomFinancialSummary, TransactionRow};

/// The paginated transaction ledgers of a room.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ledger {
    SpendRefund,
    DepositsWithdrawals,
    BonusGrantRevoke,
}

impl Ledger {
    pub const ALL: [Ledger; 3] = [
        Ledger::SpendRefund,
        Ledger::DepositsWithdrawals,
        Ledger::BonusGrantRevoke,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Ledger::SpendRefund => "spend-refund",
            Ledger::DepositsWithdrawals => "deposits-withdrawals",
            Ledger::BonusGrantRevoke => "bonus-grant-revoke",
        }
    }

    pub fn from_path(path: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|l| l.path() == path)
    }

    pub fn title(&self) -> &'static str {
        match self {
            Ledger::SpendRefund => "Spend / Refund",
            Ledger::DepositsWithdrawals => "Deposits / Withdrawals",
            Ledger::BonusGrantRevoke => "Bonus Grants / Revokes",
        }
    }
}

impl BackendClient {
    #[tracing::instrument(skip(self, id_token))]
    pub async fn monthly_summary(
        &self,
        id_token: &str,
        slug: &str,
    ) -> Result<Vec<MonthlyRow>, ApiError> {
        let response: MonthlySummaryResponse = self
            .get_json(
                ApiBase::Financials,
                &format!(
                    "/web/financials/monthly-summary/{}?months={}",
                    segment(slug)?,
                    MONTHLY_SUMMARY_MONTHS
                ),
                CallContext::bearer(id_token).with_api_key(),
            )
            .await?;
        Ok(response.months)
    }

    #[tracing::instrument(skip(self, id_token))]
    pub async fn room_summary(
        &self,
        id_token: &str,
        slug: &str,
        range: &DateRange,
    ) -> Result<RoomFinancialSummary, ApiError> {
        self.get_json(
            ApiBase::Financials,
            &format!(
                "/web/financials/room-summary/{}?start_date={}&end_date={}",
                segment(slug)?,
                range.start_str(),
                range.end_str()
            ),
            CallContext::bearer(id_token).with_api_key(),
        )
        .await
    }

    /// One page of `ledger`, starting at `offset`.
    #[tracing::instrument(skip(self, id_token))]
    pub async fn ledger(
        &self,
        id_token: &str,
        slug: &str,
        ledger: Ledger,
        range: &DateRange,
        offset: usize,
    ) -> Result<LedgerPage, ApiError> {
        let rows: Vec<TransactionRow> = self
            .get_json(
                ApiBase::Financials,
                &format!(
                    "/web/financials/{}/{}?limit={}&offset={}&start_date={}&end_date={}",
                    ledger.path(),
                    segment(slug)?,
                    LEDGER_PAGE_SIZE,
                    offset,
                    range.start_str(),
                    range.end_str()
                ),
                CallContext::bearer(id_token).with_api_key(),
            )
            .await?;
        Ok(LedgerPage::new(rows, offset, LEDGER_PAGE_SIZE))
    }

    #[tracing::instrument(skip(self, id_token))]
    pub async fn refund(
        &self,
        id_token: &str,
        slug: &str,
        original_tx_id: i64,
    ) -> Result<(), ApiError> {
        self.send_empty(
            Method::POST,
            ApiBase::Financials,
            &format!("/web/financials/refund/{}", segment(slug)?),
            CallContext::bearer(id_token).with_api_key(),
            Some(&RefundRequest { original_tx_id }),
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ledger_paths() {
        for ledger in Ledger::ALL {
            assert_eq!(Ledger::from_path(ledger.path()), Some(ledger));
        }
        assert_eq!(Ledger::from_path("payouts"), None);
    }
}
