use std::sync::Arc;

use tracing::{info, warn};

use super::PipelineError;
use super::guard::check_read_only;
use crate::db::{ConnectionProvider, Row};

/// Runs generated SQL on a connection of its own.
pub struct QueryExecutor {
    connections: Arc<dyn ConnectionProvider>,
    read_only_guard: bool,
}

impl QueryExecutor {
    pub fn new(connections: Arc<dyn ConnectionProvider>, read_only_guard: bool) -> Self {
        Self {
            connections,
            read_only_guard,
        }
    }

    /// Returns every row; the connection is closed whatever the outcome.
    pub async fn execute(&self, sql: &str) -> Result<Vec<Row>, PipelineError> {
        if self.read_only_guard {
            check_read_only(sql).map_err(|v| {
                warn!("Refusing to run SQL: {}", v);
                PipelineError::UnsafeSql(v.to_string())
            })?;
        }

        let mut conn = self.connections.open().await?;
        let rows = conn.fetch_rows(sql).await;
        if let Err(e) = conn.close().await {
            warn!("Failed to close database connection: {}", e);
        }

        let rows = rows?;
        info!("Query returned {} rows", rows.len());
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::testing::{MockConnections, Script, row};
    use serde_json::json;

    #[tokio::test]
    async fn rows_come_back_and_the_connection_is_closed() {
        let connections = MockConnections::new(Script::Rows(vec![row(&[("count", json!(1000))])]));
        let executor = QueryExecutor::new(connections.clone(), true);

        let rows = executor.execute("SELECT COUNT(*) FROM orders").await.unwrap();

        assert_eq!(rows, vec![row(&[("count", json!(1000))])]);
        assert_eq!((connections.opened(), connections.closed()), (1, 1));
    }

    #[tokio::test]
    async fn sql_errors_are_client_faults_and_still_close() {
        let connections =
            MockConnections::new(Script::QueryError("relation \"sales\" does not exist".to_string()));
        let executor = QueryExecutor::new(connections.clone(), true);

        let err = executor.execute("SELECT * FROM sales").await.unwrap_err();

        assert_eq!(
            err,
            PipelineError::Execution("relation \"sales\" does not exist".to_string())
        );
        assert_eq!((connections.opened(), connections.closed()), (1, 1));
    }

    #[tokio::test]
    async fn conversion_errors_are_unexpected_and_still_close() {
        let connections = MockConnections::new(Script::DecodeError);
        let executor = QueryExecutor::new(connections.clone(), true);

        let err = executor.execute("SELECT AVG(age) AS ratio FROM customers").await.unwrap_err();

        assert!(matches!(err, PipelineError::Unexpected(_)));
        assert_eq!(connections.closed(), 1);
    }

    #[tokio::test]
    async fn unreachable_database_is_a_connection_fault() {
        let executor = QueryExecutor::new(MockConnections::new(Script::Unreachable), true);

        let err = executor.execute("SELECT 1").await.unwrap_err();

        assert!(matches!(err, PipelineError::Connection(_)));
    }

    #[tokio::test]
    async fn guard_rejects_writes_before_connecting() {
        let connections = MockConnections::new(Script::Rows(vec![]));
        let executor = QueryExecutor::new(connections.clone(), true);

        let err = executor.execute("DROP TABLE orders").await.unwrap_err();

        assert!(matches!(err, PipelineError::UnsafeSql(_)));
        assert_eq!(connections.opened(), 0);
    }

    #[tokio::test]
    async fn guard_can_be_switched_off() {
        let connections = MockConnections::new(Script::Rows(vec![]));
        let executor = QueryExecutor::new(connections.clone(), false);

        executor.execute("VACUUM orders").await.unwrap();

        assert_eq!(connections.executed.lock().unwrap().as_slice(), ["VACUUM orders"]);
    }
}
