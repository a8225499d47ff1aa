//! Member dashboard: a member's holdings across loans, savings, shares, deposits and fees.

use chrono::{Months, NaiveDate};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use strum::Display;
use utoipa::ToSchema;
use uuid::Uuid;

use super::math;
use super::period::{month_buckets, ReportingPeriod};
use super::ranking::{group_by, most_recent};
use super::{RECENT_LIMIT, TREND_MONTHS};
use crate::entities::fixed_deposit::{self, FixedDepositStatus};
use crate::entities::loan::{self, LoanStatus};
use crate::entities::savings_account::{self, SavingsAccountStatus};
use crate::entities::savings_transaction::{self, SavingsTransactionType};
use crate::entities::share_account::{self, ShareAccountStatus};
use crate::entities::{
    fee_charge, fee_definition, loan_product, loan_repayment, loan_schedule, member, savings_product,
};

/// Length of the merged activity feed.
pub const MEMBER_ACTIVITY_LIMIT: usize = 15;
const UPCOMING_LIMIT: usize = 10;

#[derive(Debug, Clone)]
pub struct MemberSnapshot {
    pub member: member::Model,
    pub loans: Vec<loan::Model>,
    pub loan_products: Vec<loan_product::Model>,
    pub repayments: Vec<loan_repayment::Model>,
    pub schedules: Vec<loan_schedule::Model>,
    pub savings_accounts: Vec<savings_account::Model>,
    pub savings_products: Vec<savings_product::Model>,
    pub savings_transactions: Vec<savings_transaction::Model>,
    pub share_accounts: Vec<share_account::Model>,
    pub fixed_deposits: Vec<fixed_deposit::Model>,
    pub fee_charges: Vec<fee_charge::Model>,
    pub fee_definitions: Vec<fee_definition::Model>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MemberDashboard {
    pub member_id: Uuid,
    pub member_number: String,
    pub member_name: String,
    pub member_since: NaiveDate,
    pub is_active: bool,
    pub overview: MemberOverview,
    pub loan_portfolio: LoanPortfolioSummary,
    pub savings_portfolio: SavingsPortfolioSummary,
    pub share_portfolio: SharePortfolioSummary,
    pub fixed_deposits: FixedDepositSummary,
    pub fees: FeesSummary,
    pub repayment_performance: RepaymentPerformance,
    pub recent_transactions: Vec<MemberTransaction>,
    pub upcoming_payments: Vec<UpcomingPayment>,
    pub product_holdings: Vec<ProductHolding>,
    pub credit_indicators: CreditIndicators,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MemberOverview {
    pub total_net_worth: Decimal,
    pub total_assets: Decimal,
    pub total_liabilities: Decimal,
    pub total_products: usize,
    pub active_loans: usize,
    pub active_savings_accounts: usize,
    pub total_shares: i64,
    pub active_fixed_deposits: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoanPortfolioSummary {
    pub total_loans: usize,
    pub active_loans: usize,
    pub completed_loans: usize,
    pub total_borrowed: Decimal,
    pub total_outstanding: Decimal,
    pub total_principal_outstanding: Decimal,
    pub total_interest_outstanding: Decimal,
    pub total_repaid: Decimal,
    pub average_interest_rate: Decimal,
    pub active_loan_details: Vec<LoanDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct LoanDetail {
    pub loan_id: Uuid,
    pub loan_number: String,
    pub product_name: String,
    pub principal_amount: Decimal,
    pub outstanding_principal: Decimal,
    pub outstanding_interest: Decimal,
    pub total_outstanding: Decimal,
    pub interest_rate: Decimal,
    pub disbursement_date: NaiveDate,
    pub expected_end_date: NaiveDate,
    /// Days to the next unpaid installment, if one is scheduled.
    pub days_until_next_payment: Option<i64>,
    pub days_overdue: i64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SavingsPortfolioSummary {
    pub total_accounts: usize,
    pub active_accounts: usize,
    pub dormant_accounts: usize,
    pub total_balance: Decimal,
    pub total_deposits: Decimal,
    pub total_withdrawals: Decimal,
    pub total_interest_earned: Decimal,
    pub average_balance: Decimal,
    pub account_details: Vec<SavingsAccountDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SavingsAccountDetail {
    pub account_id: Uuid,
    pub account_number: String,
    pub product_name: String,
    pub current_balance: Decimal,
    pub interest_rate: Decimal,
    pub interest_earned: Decimal,
    pub opened_date: NaiveDate,
    pub last_transaction_date: Option<NaiveDate>,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SharePortfolioSummary {
    pub total_share_accounts: usize,
    pub total_shares: i64,
    pub total_share_value: Decimal,
    /// Not tracked: dividends are not recorded.
    pub total_dividends_earned: Option<Decimal>,
    pub current_share_price: Decimal,
    pub account_details: Vec<ShareAccountDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ShareAccountDetail {
    pub account_id: Uuid,
    pub account_number: String,
    pub number_of_shares: i32,
    pub share_value: Decimal,
    pub total_value: Decimal,
    pub purchase_date: NaiveDate,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FixedDepositSummary {
    pub total_deposits: usize,
    pub active_deposits: usize,
    pub matured_deposits: usize,
    pub total_principal: Decimal,
    pub total_interest_earned: Decimal,
    pub total_maturity_value: Decimal,
    pub deposit_details: Vec<FixedDepositDetail>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FixedDepositDetail {
    pub deposit_id: Uuid,
    pub certificate_number: String,
    pub principal_amount: Decimal,
    pub interest_rate: Decimal,
    pub accrued_interest: Decimal,
    pub maturity_amount: Decimal,
    pub start_date: NaiveDate,
    pub maturity_date: NaiveDate,
    pub days_to_maturity: i64,
    pub status: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeesSummary {
    pub total_fees_charged: Decimal,
    pub total_fees_paid: Decimal,
    pub total_fees_outstanding: Decimal,
    pub total_fee_transactions: usize,
    pub fees_by_type: Vec<FeeBreakdown>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct FeeBreakdown {
    pub fee_type: String,
    pub total_amount: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct RepaymentPerformance {
    pub total_payments_made: usize,
    pub on_time_payments: usize,
    pub late_payments: usize,
    pub on_time_payment_percentage: Decimal,
    pub total_principal_repaid: Decimal,
    pub total_interest_repaid: Decimal,
    /// Not tracked: needs arrears history.
    pub current_days_overdue: Option<i64>,
    pub max_days_overdue: Option<i64>,
    pub last_12_months: Vec<MonthlyRepaymentSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MonthlyRepaymentSummary {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub expected_amount: Decimal,
    pub actual_amount: Decimal,
    pub variance: Decimal,
    pub on_time: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize, ToSchema)]
pub enum Direction {
    Credit,
    Debit,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct MemberTransaction {
    pub transaction_id: Uuid,
    pub transaction_date: NaiveDate,
    pub transaction_type: String,
    pub description: String,
    pub account_number: String,
    pub amount: Decimal,
    pub direction: Direction,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct UpcomingPayment {
    pub due_date: NaiveDate,
    pub loan_number: String,
    pub principal_due: Decimal,
    pub interest_due: Decimal,
    pub total_due: Decimal,
    pub days_until_due: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ProductHolding {
    pub product_type: String,
    pub product_name: String,
    pub count: i64,
    pub total_value: Decimal,
    pub status: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, Serialize, Deserialize, ToSchema)]
pub enum RiskCategory {
    #[strum(serialize = "Low Risk")]
    #[serde(rename = "Low Risk")]
    Low,
    #[strum(serialize = "Medium Risk")]
    #[serde(rename = "Medium Risk")]
    Medium,
    #[strum(serialize = "High Risk")]
    #[serde(rename = "High Risk")]
    High,
    #[strum(serialize = "Very High Risk")]
    #[serde(rename = "Very High Risk")]
    VeryHigh,
}

impl RiskCategory {
    pub fn from_score(score: Decimal) -> Self {
        if score >= Decimal::from(90) {
            RiskCategory::Low
        } else if score >= Decimal::from(70) {
            RiskCategory::Medium
        } else if score >= Decimal::from(50) {
            RiskCategory::High
        } else {
            RiskCategory::VeryHigh
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct CreditIndicators {
    pub repayment_score: Decimal,
    pub risk_category: RiskCategory,
    pub membership_tenure_days: i64,
    pub total_lifetime_borrowing: Decimal,
    pub total_lifetime_repaid: Decimal,
    pub total_loans_completed: usize,
    pub total_defaulted_loans: usize,
    pub debt_to_income_ratio: Decimal,
    pub is_eligible_for_new_loan: bool,
    pub max_eligible_loan_amount: Decimal,
}

const ELIGIBLE_SCORE: Decimal = dec!(70);
const MAX_DEBT_TO_INCOME: Decimal = dec!(50);
/// Ceiling on total borrowing: three years of income.
const INCOME_MULTIPLE_MONTHS: Decimal = dec!(36);
const MONTHS_PER_YEAR: Decimal = dec!(12);

/// Product and account names keyed by id.
struct Names<'a> {
    loan_products: HashMap<Uuid, &'a str>,
    savings_products: HashMap<Uuid, &'a savings_product::Model>,
    fee_definitions: HashMap<Uuid, &'a str>,
    loan_numbers: HashMap<Uuid, &'a str>,
    account_numbers: HashMap<Uuid, &'a str>,
}

impl<'a> Names<'a> {
    fn new(snapshot: &'a MemberSnapshot) -> Self {
        Self {
            loan_products: snapshot
                .loan_products
                .iter()
                .map(|p| (p.id, p.name.as_str()))
                .collect(),
            savings_products: snapshot.savings_products.iter().map(|p| (p.id, p)).collect(),
            fee_definitions: snapshot
                .fee_definitions
                .iter()
                .map(|f| (f.id, f.name.as_str()))
                .collect(),
            loan_numbers: snapshot
                .loans
                .iter()
                .map(|l| (l.id, l.loan_number.as_str()))
                .collect(),
            account_numbers: snapshot
                .savings_accounts
                .iter()
                .map(|a| (a.id, a.account_number.as_str()))
                .collect(),
        }
    }

    fn lookup(map: &HashMap<Uuid, &'a str>, id: Option<Uuid>) -> String {
        id.and_then(|id| map.get(&id))
            .map(|name| name.to_string())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn loan_product(&self, loan: &loan::Model) -> String {
        Self::lookup(&self.loan_products, loan.loan_product_id)
    }

    fn savings_product(&self, account: &savings_account::Model) -> Option<&'a savings_product::Model> {
        account
            .savings_product_id
            .and_then(|id| self.savings_products.get(&id).copied())
    }

    fn savings_product_name(&self, account: &savings_account::Model) -> String {
        self.savings_product(account)
            .map(|p| p.name.clone())
            .unwrap_or_else(|| "Unknown".to_string())
    }

    fn fee_type(&self, charge: &fee_charge::Model) -> String {
        Self::lookup(&self.fee_definitions, charge.fee_definition_id)
    }

    fn loan_number(&self, loan_id: Uuid) -> String {
        Self::lookup(&self.loan_numbers, Some(loan_id))
    }

    fn account_number(&self, account_id: Uuid) -> String {
        Self::lookup(&self.account_numbers, Some(account_id))
    }
}

fn is_active_loan(loan: &loan::Model) -> bool {
    loan.is(LoanStatus::Disbursed)
}

pub fn build(snapshot: &MemberSnapshot, period: &ReportingPeriod) -> MemberDashboard {
    let names = Names::new(snapshot);
    let member = &snapshot.member;

    MemberDashboard {
        member_id: member.id,
        member_number: member.member_number.clone(),
        member_name: member.full_name(),
        member_since: member.join_date,
        is_active: member.is_active,
        overview: overview(snapshot),
        loan_portfolio: loan_portfolio(snapshot, &names, period),
        savings_portfolio: savings_portfolio(snapshot, &names),
        share_portfolio: share_portfolio(&snapshot.share_accounts),
        fixed_deposits: fixed_deposit_summary(&snapshot.fixed_deposits, period),
        fees: fees_summary(&snapshot.fee_charges, &names),
        repayment_performance: repayment_performance(&snapshot.repayments, &snapshot.schedules, period),
        recent_transactions: recent_transactions(snapshot, &names),
        upcoming_payments: upcoming_payments(&snapshot.schedules, &names, period),
        product_holdings: product_holdings(snapshot, &names),
        credit_indicators: credit_indicators(snapshot, period),
    }
}

pub fn overview(snapshot: &MemberSnapshot) -> MemberOverview {
    let loans: Vec<&loan::Model> = snapshot.loans.iter().filter(|l| is_active_loan(l)).collect();
    let savings: Vec<&savings_account::Model> = snapshot
        .savings_accounts
        .iter()
        .filter(|s| s.is(SavingsAccountStatus::Active))
        .collect();
    let shares: Vec<&share_account::Model> = snapshot
        .share_accounts
        .iter()
        .filter(|s| s.is(ShareAccountStatus::Active))
        .collect();
    let deposits: Vec<&fixed_deposit::Model> = snapshot
        .fixed_deposits
        .iter()
        .filter(|f| f.is(FixedDepositStatus::Active))
        .collect();

    let assets = savings.iter().map(|s| s.balance).sum::<Decimal>()
        + shares.iter().map(|s| s.total_share_value).sum::<Decimal>()
        + deposits.iter().map(|f| f.maturity_value()).sum::<Decimal>();
    let liabilities: Decimal = loans.iter().map(|l| l.total_outstanding()).sum();

    MemberOverview {
        total_net_worth: assets - liabilities,
        total_assets: assets,
        total_liabilities: liabilities,
        total_products: loans.len() + savings.len() + shares.len() + deposits.len(),
        active_loans: loans.len(),
        active_savings_accounts: savings.len(),
        total_shares: shares.iter().map(|s| i64::from(s.number_of_shares)).sum(),
        active_fixed_deposits: deposits.len(),
    }
}

fn loan_portfolio(snapshot: &MemberSnapshot, names: &Names<'_>, period: &ReportingPeriod) -> LoanPortfolioSummary {
    let today = period.today;
    let active: Vec<&loan::Model> = snapshot.loans.iter().filter(|l| is_active_loan(l)).collect();

    let details = active
        .iter()
        .map(|loan| {
            let expected_end = loan.expected_end_date.unwrap_or_else(|| {
                u32::try_from(loan.term_months)
                    .ok()
                    .and_then(|months| today.checked_add_months(Months::new(months)))
                    .unwrap_or(today)
            });
            let next_due = snapshot
                .schedules
                .iter()
                .filter(|s| s.loan_id == loan.id && !s.is_paid && s.due_date >= today)
                .map(|s| s.due_date)
                .min();

            LoanDetail {
                loan_id: loan.id,
                loan_number: loan.loan_number.clone(),
                product_name: names.loan_product(loan),
                principal_amount: loan.principal_amount,
                outstanding_principal: loan.outstanding_principal,
                outstanding_interest: loan.outstanding_interest,
                total_outstanding: loan.total_outstanding(),
                interest_rate: loan.interest_rate,
                disbursement_date: loan.disbursement_date.unwrap_or(today),
                expected_end_date: expected_end,
                days_until_next_payment: next_due.map(|due| period.days_until(due)),
                days_overdue: (today - expected_end).num_days().max(0),
                status: loan.status.clone(),
            }
        })
        .collect();

    LoanPortfolioSummary {
        total_loans: snapshot.loans.len(),
        active_loans: active.len(),
        completed_loans: snapshot.loans.iter().filter(|l| l.is(LoanStatus::Closed)).count(),
        total_borrowed: math::sum_by(&snapshot.loans, |l| l.principal_amount),
        total_outstanding: active.iter().map(|l| l.total_outstanding()).sum(),
        total_principal_outstanding: active.iter().map(|l| l.outstanding_principal).sum(),
        total_interest_outstanding: active.iter().map(|l| l.outstanding_interest).sum(),
        total_repaid: math::sum_by(&snapshot.repayments, |r| r.total_amount),
        average_interest_rate: math::average(active.iter().map(|l| l.interest_rate), Decimal::ZERO),
        active_loan_details: details,
    }
}

fn sum_of_kind(transactions: &[&savings_transaction::Model], kind: SavingsTransactionType) -> Decimal {
    transactions.iter().filter(|t| t.is(kind)).map(|t| t.amount).sum()
}

fn savings_portfolio(snapshot: &MemberSnapshot, names: &Names<'_>) -> SavingsPortfolioSummary {
    let accounts = &snapshot.savings_accounts;
    let all: Vec<&savings_transaction::Model> = snapshot.savings_transactions.iter().collect();
    let total_balance = math::sum_by(accounts, |a| a.balance);

    let details = accounts
        .iter()
        .map(|account| {
            let own: Vec<&savings_transaction::Model> = snapshot
                .savings_transactions
                .iter()
                .filter(|t| t.savings_account_id == account.id)
                .collect();
            SavingsAccountDetail {
                account_id: account.id,
                account_number: account.account_number.clone(),
                product_name: names.savings_product_name(account),
                current_balance: account.balance,
                interest_rate: names
                    .savings_product(account)
                    .map(|p| p.interest_rate)
                    .unwrap_or_default(),
                interest_earned: sum_of_kind(&own, SavingsTransactionType::Interest),
                opened_date: account.opened_date,
                last_transaction_date: own.iter().map(|t| t.transaction_date).max(),
                status: account.status.clone(),
            }
        })
        .collect();

    SavingsPortfolioSummary {
        total_accounts: accounts.len(),
        active_accounts: accounts.iter().filter(|a| a.is(SavingsAccountStatus::Active)).count(),
        dormant_accounts: accounts.iter().filter(|a| a.is(SavingsAccountStatus::Dormant)).count(),
        total_balance,
        total_deposits: sum_of_kind(&all, SavingsTransactionType::Deposit),
        total_withdrawals: sum_of_kind(&all, SavingsTransactionType::Withdrawal),
        total_interest_earned: sum_of_kind(&all, SavingsTransactionType::Interest),
        average_balance: math::ratio(total_balance, Decimal::from(accounts.len()), Decimal::ZERO),
        account_details: details,
    }
}

pub fn share_portfolio(accounts: &[share_account::Model]) -> SharePortfolioSummary {
    let active: Vec<&share_account::Model> = accounts
        .iter()
        .filter(|s| s.is(ShareAccountStatus::Active))
        .collect();
    let total_shares: i64 = active.iter().map(|s| i64::from(s.number_of_shares)).sum();
    let total_value: Decimal = active.iter().map(|s| s.total_share_value).sum();

    SharePortfolioSummary {
        total_share_accounts: accounts.len(),
        total_shares,
        total_share_value: total_value,
        total_dividends_earned: None,
        current_share_price: math::ratio(total_value, Decimal::from(total_shares), Decimal::ZERO),
        account_details: accounts
            .iter()
            .map(|account| ShareAccountDetail {
                account_id: account.id,
                account_number: account.account_number.clone(),
                number_of_shares: account.number_of_shares,
                share_value: math::ratio(
                    account.total_share_value,
                    Decimal::from(account.number_of_shares),
                    Decimal::ZERO,
                ),
                total_value: account.total_share_value,
                purchase_date: account.opened_date,
                status: account.status.clone(),
            })
            .collect(),
    }
}

fn fixed_deposit_summary(deposits: &[fixed_deposit::Model], period: &ReportingPeriod) -> FixedDepositSummary {
    let active: Vec<&fixed_deposit::Model> = deposits
        .iter()
        .filter(|f| f.is(FixedDepositStatus::Active))
        .collect();

    FixedDepositSummary {
        total_deposits: deposits.len(),
        active_deposits: active.len(),
        matured_deposits: deposits.iter().filter(|f| f.is(FixedDepositStatus::Matured)).count(),
        total_principal: active.iter().map(|f| f.principal_amount).sum(),
        total_interest_earned: math::sum_by(deposits, |f| f.interest_earned),
        total_maturity_value: active.iter().map(|f| f.maturity_value()).sum(),
        deposit_details: deposits
            .iter()
            .map(|deposit| FixedDepositDetail {
                deposit_id: deposit.id,
                certificate_number: deposit.certificate_number.clone(),
                principal_amount: deposit.principal_amount,
                interest_rate: deposit.interest_rate,
                accrued_interest: deposit.interest_earned,
                maturity_amount: deposit.maturity_value(),
                start_date: deposit.deposit_date,
                maturity_date: deposit.maturity_date,
                days_to_maturity: period.days_until(deposit.maturity_date).max(0),
                status: deposit.status.clone(),
            })
            .collect(),
    }
}

fn fees_summary(charges: &[fee_charge::Model], names: &Names<'_>) -> FeesSummary {
    let charged = math::sum_by(charges, |f| f.amount);
    let paid = math::sum_by(charges, |f| f.amount_paid);

    let fees_by_type = group_by(
        charges,
        |charge| names.fee_type(charge),
        |acc: &mut (Decimal, usize), charge| {
            acc.0 += charge.amount;
            acc.1 += 1;
        },
    )
    .into_iter()
    .map(|(fee_type, (total_amount, count))| FeeBreakdown {
        fee_type,
        total_amount,
        count,
    })
    .collect();

    FeesSummary {
        total_fees_charged: charged,
        total_fees_paid: paid,
        total_fees_outstanding: charged - paid,
        total_fee_transactions: charges.len(),
        fees_by_type,
    }
}

/// Whether a repayment landed on or before the due date of its loan's nearest installment.
///
/// Equally near installments resolve to the first one listed.
fn paid_on_time(repayment: &loan_repayment::Model, schedules: &[loan_schedule::Model]) -> bool {
    schedules
        .iter()
        .filter(|s| s.loan_id == repayment.loan_id)
        .min_by_key(|s| (s.due_date - repayment.repayment_date).num_days().abs())
        .is_some_and(|s| repayment.repayment_date <= s.due_date)
}

fn on_time_count(repayments: &[loan_repayment::Model], schedules: &[loan_schedule::Model]) -> usize {
    repayments.iter().filter(|r| paid_on_time(r, schedules)).count()
}

/// Share of repayments made on time, 100 when nothing has been repaid yet.
pub fn repayment_score(repayments: &[loan_repayment::Model], schedules: &[loan_schedule::Model]) -> Decimal {
    math::count_percentage(on_time_count(repayments, schedules), repayments.len(), math::HUNDRED)
}

pub fn repayment_performance(
    repayments: &[loan_repayment::Model],
    schedules: &[loan_schedule::Model],
    period: &ReportingPeriod,
) -> RepaymentPerformance {
    let on_time = on_time_count(repayments, schedules);

    let last_12_months = month_buckets(period.today, TREND_MONTHS)
        .into_iter()
        .map(|bucket| {
            let due: Vec<&loan_schedule::Model> = schedules
                .iter()
                .filter(|s| bucket.contains(s.due_date))
                .collect();
            let paid: Vec<&loan_repayment::Model> = repayments
                .iter()
                .filter(|r| bucket.contains(r.repayment_date))
                .collect();
            let expected: Decimal = due.iter().map(|s| s.amount_due()).sum();
            let actual: Decimal = paid.iter().map(|r| r.total_amount).sum();

            MonthlyRepaymentSummary {
                year: bucket.year(),
                month: bucket.month(),
                expected_amount: expected,
                actual_amount: actual,
                variance: actual - expected,
                on_time: paid.iter().all(|r| {
                    due.iter()
                        .any(|s| s.loan_id == r.loan_id && r.repayment_date <= s.due_date)
                }),
                label: bucket.label,
            }
        })
        .collect();

    RepaymentPerformance {
        total_payments_made: repayments.len(),
        on_time_payments: on_time,
        late_payments: repayments.len() - on_time,
        on_time_payment_percentage: math::count_percentage(on_time, repayments.len(), math::HUNDRED),
        total_principal_repaid: math::sum_by(repayments, |r| r.principal_amount),
        total_interest_repaid: math::sum_by(repayments, |r| r.interest_amount),
        current_days_overdue: None,
        max_days_overdue: None,
        last_12_months,
    }
}

/// Newest repayments and savings movements merged into one feed.
fn recent_transactions(snapshot: &MemberSnapshot, names: &Names<'_>) -> Vec<MemberTransaction> {
    let repayments = most_recent(
        snapshot.repayments.iter().collect::<Vec<_>>(),
        RECENT_LIMIT,
        |r| r.repayment_date,
    )
    .into_iter()
    .map(|r| MemberTransaction {
        transaction_id: r.id,
        transaction_date: r.repayment_date,
        transaction_type: "Loan Repayment".to_string(),
        description: format!("Payment via {}", r.payment_method),
        account_number: names.loan_number(r.loan_id),
        amount: r.total_amount,
        direction: Direction::Debit,
    });

    let savings = most_recent(
        snapshot.savings_transactions.iter().collect::<Vec<_>>(),
        RECENT_LIMIT,
        |t| t.transaction_date,
    )
    .into_iter()
    .map(|t| MemberTransaction {
        transaction_id: t.id,
        transaction_date: t.transaction_date,
        transaction_type: t.transaction_type.clone(),
        description: t
            .description
            .clone()
            .unwrap_or_else(|| t.transaction_type.clone()),
        account_number: names.account_number(t.savings_account_id),
        amount: t.amount,
        direction: if t.is_credit() {
            Direction::Credit
        } else {
            Direction::Debit
        },
    });

    most_recent(
        repayments.chain(savings).collect(),
        MEMBER_ACTIVITY_LIMIT,
        |t| t.transaction_date,
    )
}

fn upcoming_payments(
    schedules: &[loan_schedule::Model],
    names: &Names<'_>,
    period: &ReportingPeriod,
) -> Vec<UpcomingPayment> {
    let mut open: Vec<&loan_schedule::Model> = schedules
        .iter()
        .filter(|s| !s.is_paid && s.due_date >= period.today)
        .collect();
    open.sort_by_key(|s| s.due_date);

    open.into_iter()
        .take(UPCOMING_LIMIT)
        .map(|s| UpcomingPayment {
            due_date: s.due_date,
            loan_number: names.loan_number(s.loan_id),
            principal_due: s.principal_amount,
            interest_due: s.interest_amount,
            total_due: s.amount_due(),
            days_until_due: period.days_until(s.due_date),
        })
        .collect()
}

fn product_holdings(snapshot: &MemberSnapshot, names: &Names<'_>) -> Vec<ProductHolding> {
    let holding = |product_type: &str, product_name: String, count: i64, total_value: Decimal| ProductHolding {
        product_type: product_type.to_string(),
        product_name,
        count,
        total_value,
        status: "Active".to_string(),
    };

    let loans = group_by(
        snapshot.loans.iter().filter(|l| is_active_loan(l)),
        |loan| names.loan_product(loan),
        |acc: &mut (i64, Decimal), loan| {
            acc.0 += 1;
            acc.1 += loan.total_outstanding();
        },
    );
    let savings = group_by(
        snapshot
            .savings_accounts
            .iter()
            .filter(|a| a.is(SavingsAccountStatus::Active)),
        |account| names.savings_product_name(account),
        |acc: &mut (i64, Decimal), account| {
            acc.0 += 1;
            acc.1 += account.balance;
        },
    );

    let mut holdings: Vec<ProductHolding> = loans
        .into_iter()
        .map(|(name, (count, value))| holding("Loan", name, count, value))
        .chain(
            savings
                .into_iter()
                .map(|(name, (count, value))| holding("Savings", name, count, value)),
        )
        .collect();

    let shares: Vec<&share_account::Model> = snapshot
        .share_accounts
        .iter()
        .filter(|s| s.is(ShareAccountStatus::Active))
        .collect();
    if !shares.is_empty() {
        holdings.push(holding(
            "Shares",
            "Share Capital".to_string(),
            shares.iter().map(|s| i64::from(s.number_of_shares)).sum(),
            shares.iter().map(|s| s.total_share_value).sum(),
        ));
    }

    let deposits: Vec<&fixed_deposit::Model> = snapshot
        .fixed_deposits
        .iter()
        .filter(|f| f.is(FixedDepositStatus::Active))
        .collect();
    if !deposits.is_empty() {
        holdings.push(holding(
            "Fixed Deposit",
            "Term Deposits".to_string(),
            deposits.len() as i64,
            deposits.iter().map(|f| f.principal_amount).sum(),
        ));
    }

    holdings
}

pub fn credit_indicators(snapshot: &MemberSnapshot, period: &ReportingPeriod) -> CreditIndicators {
    let member = &snapshot.member;
    let score = repayment_score(&snapshot.repayments, &snapshot.schedules);
    let defaulted = snapshot.loans.iter().filter(|l| l.is(LoanStatus::WrittenOff)).count();
    let active_debt: Decimal = snapshot
        .loans
        .iter()
        .filter(|l| is_active_loan(l))
        .map(|l| l.outstanding_principal)
        .sum();

    let monthly_income = member.monthly_income.unwrap_or_default();
    let debt_to_income = math::percentage(active_debt, monthly_income * MONTHS_PER_YEAR, Decimal::ZERO);
    let max_eligible = if monthly_income > Decimal::ZERO {
        (monthly_income * INCOME_MULTIPLE_MONTHS - active_debt).max(Decimal::ZERO)
    } else {
        Decimal::ZERO
    };

    CreditIndicators {
        repayment_score: score,
        risk_category: RiskCategory::from_score(score),
        membership_tenure_days: (period.today - member.join_date).num_days(),
        total_lifetime_borrowing: math::sum_by(&snapshot.loans, |l| l.principal_amount),
        total_lifetime_repaid: math::sum_by(&snapshot.repayments, |r| r.total_amount),
        total_loans_completed: snapshot.loans.iter().filter(|l| l.is(LoanStatus::Closed)).count(),
        total_defaulted_loans: defaulted,
        debt_to_income_ratio: debt_to_income,
        is_eligible_for_new_loan: member.is_active
            && score >= ELIGIBLE_SCORE
            && defaulted == 0
            && debt_to_income < MAX_DEBT_TO_INCOME,
        max_eligible_loan_amount: max_eligible,
    }
}
