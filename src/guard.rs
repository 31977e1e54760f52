//! Pre-flight balance guard
//!
//! Reads the relayer balance fresh on every check and compares it to
//! the configured minimum with exact integer arithmetic. The verdict
//! is returned to the caller; the service layer decides whether to
//! tear down subscriptions and halt.

use primitive_types::U256;

use crate::error::Result;
use crate::provider::WhisperProvider;

/// Relayer account funding check
#[derive(Debug, Clone)]
pub struct BalanceGuard {
    account: String,
    minimum: U256,
}

/// Outcome of one balance check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BalanceVerdict {
    /// Balance strictly above the minimum
    Sufficient(U256),
    /// Balance at or below the minimum; the relay must halt
    Insufficient(U256),
}

impl BalanceGuard {
    pub fn new(account: impl Into<String>, minimum: U256) -> Self {
        Self {
            account: account.into(),
            minimum,
        }
    }

    pub fn account(&self) -> &str {
        &self.account
    }

    pub fn minimum(&self) -> U256 {
        self.minimum
    }

    /// Query the current balance and judge it against the minimum
    ///
    /// Never cached: each call is a fresh query.
    pub async fn check(&self, provider: &dyn WhisperProvider) -> Result<BalanceVerdict> {
        let balance = provider.balance(&self.account).await?;
        if balance <= self.minimum {
            Ok(BalanceVerdict::Insufficient(balance))
        } else {
            Ok(BalanceVerdict::Sufficient(balance))
        }
    }
}
