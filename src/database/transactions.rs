// ABOUTME: Unit-of-work guard around a SQLx transaction with rollback on drop
// ABOUTME: Recipe writes run every nested change through one guard and commit once
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

//! Transaction management with an RAII guard
//!
//! ```text
//! let mut guard = TransactionGuard::begin(&pool).await?;
//! sqlx::query("INSERT INTO recipes ...").execute(guard.executor()?).await?;
//! sqlx::query("INSERT INTO recipe_sections ...").execute(guard.executor()?).await?;
//! guard.commit().await?;
//! ```
//!
//! Returning early with `?` drops the guard and the transaction is rolled
//! back, so a failed reconciliation never leaves half-applied nested rows.
//! There is no retry: the caller resubmits.

use recipe_core::errors::{AppError, AppResult};
use sqlx::{Database, Pool, Transaction};
use tracing::{debug, warn};

/// RAII guard for database transactions ensuring automatic rollback on drop
pub struct TransactionGuard<'c, DB: Database> {
    transaction: Option<Transaction<'c, DB>>,
    committed: bool,
}

impl<'c, DB: Database> TransactionGuard<'c, DB> {
    /// Wrap an existing `SQLx` transaction
    #[must_use]
    pub fn new(transaction: Transaction<'c, DB>) -> Self {
        debug!("TransactionGuard created - transaction will auto-rollback if not committed");
        Self {
            transaction: Some(transaction),
            committed: false,
        }
    }

    /// Commit the transaction and consume the guard
    ///
    /// # Errors
    ///
    /// Returns an error if the transaction was already consumed or the commit fails
    pub async fn commit(mut self) -> AppResult<()> {
        let tx = self
            .transaction
            .take()
            .ok_or_else(|| AppError::internal("Transaction already consumed - cannot commit"))?;

        tx.commit()
            .await
            .map_err(|e| AppError::database(format!("Transaction commit failed: {e}")))?;
        self.committed = true;
        debug!("TransactionGuard committed successfully");
        Ok(())
    }

    /// Get the underlying connection for executing queries
    ///
    /// # Errors
    ///
    /// Returns an error if the guard is used after commit
    pub fn executor(&mut self) -> AppResult<&mut <DB as Database>::Connection> {
        self.transaction.as_deref_mut().ok_or_else(|| {
            AppError::internal("Transaction already consumed - guard used after commit")
        })
    }
}

impl TransactionGuard<'static, sqlx::Sqlite> {
    /// Begin a transaction on the pool
    ///
    /// # Errors
    ///
    /// Returns an error if no connection can be acquired
    pub async fn begin(pool: &Pool<sqlx::Sqlite>) -> AppResult<Self> {
        let tx = pool.begin().await?;
        Ok(Self::new(tx))
    }
}

impl<DB: Database> Drop for TransactionGuard<'_, DB> {
    fn drop(&mut self) {
        if self.transaction.is_some() && !self.committed {
            warn!("TransactionGuard dropped without commit - transaction will be rolled back");
        }
    }
}
