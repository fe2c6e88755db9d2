//! Execution boundary.
//!
//! The compiler never talks to a database. These helpers hand a [`Compiled`]
//! query to anything implementing [`GenericClient`] (a `tokio_postgres`
//! client or transaction) and map driver failures to [`Error::Query`], so
//! callers can tell a bad query from a bad connection.
//!
//! ```ignore
//! let rows = schema.compile(&q)?.fetch_all(&client).await?;
//! ```

use tokio_postgres::Row;
use tokio_postgres::types::ToSql;

use crate::compile::Compiled;
use crate::error::{Error, Result};

/// A trait that unifies database clients and transactions.
pub trait GenericClient: Send + Sync {
    /// Execute a query and return all rows.
    fn query(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = Result<Vec<Row>>> + Send;

    /// Execute a query and return the first row, if any.
    fn query_opt(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = Result<Option<Row>>> + Send {
        async move {
            let rows = self.query(sql, params).await?;
            Ok(rows.into_iter().next())
        }
    }

    /// Execute a query and return the **first** row.
    ///
    /// Returns [`Error::NotFound`] if no rows are returned. Extra rows are
    /// ignored.
    fn query_one(
        &self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> impl std::future::Future<Output = Result<Row>> + Send {
        async move {
            self.query_opt(sql, params)
                .await?
                .ok_or_else(|| Error::NotFound("expected one row, got none".into()))
        }
    }
}

impl GenericClient for tokio_postgres::Client {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        Ok(tokio_postgres::Client::query(self, sql, params).await?)
    }
}

impl GenericClient for tokio_postgres::Transaction<'_> {
    async fn query(&self, sql: &str, params: &[&(dyn ToSql + Sync)]) -> Result<Vec<Row>> {
        Ok(tokio_postgres::Transaction::query(self, sql, params).await?)
    }
}

impl Compiled {
    /// Run the query and return all rows.
    pub async fn fetch_all(&self, conn: &impl GenericClient) -> Result<Vec<Row>> {
        tracing::trace!(target: "pgselect.exec", sql = %self.sql, params = self.params.len());
        conn.query(&self.sql, &self.params_ref()).await
    }

    /// Run the query and return the first row, failing if there is none.
    pub async fn fetch_one(&self, conn: &impl GenericClient) -> Result<Row> {
        tracing::trace!(target: "pgselect.exec", sql = %self.sql, params = self.params.len());
        conn.query_one(&self.sql, &self.params_ref()).await
    }

    /// Run the query and return the first row, if any.
    pub async fn fetch_opt(&self, conn: &impl GenericClient) -> Result<Option<Row>> {
        tracing::trace!(target: "pgselect.exec", sql = %self.sql, params = self.params.len());
        conn.query_opt(&self.sql, &self.params_ref()).await
    }
}
