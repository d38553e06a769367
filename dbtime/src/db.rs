use chrono::{DateTime, Utc};
use lambda_runtime::tracing;
use thiserror::Error;
use tokio::task::JoinHandle;
use tokio_postgres::{Client, NoTls};

const NOW_QUERY: &str = "select now()";

/// One failure class per step of the invocation's database work. The display
/// strings double as the response body when a step fails; the driver error
/// stays behind `source` for the logs.
#[derive(Debug, Error)]
pub enum DbError {
    #[error("failed to open database connection")]
    Connect(#[source] tokio_postgres::Error),
    #[error("database liveness check failed")]
    Ping(#[source] tokio_postgres::Error),
    #[error("failed to prepare the clock query")]
    Prepare(#[source] tokio_postgres::Error),
    #[error("clock query failed")]
    Query(#[source] tokio_postgres::Error),
}

/// A connection owned by a single invocation: the client half plus the
/// spawned task driving the socket until the client is dropped.
pub struct Database {
    client: Client,
    driver: JoinHandle<()>,
}

impl Database {
    pub async fn connect(conninfo: &str) -> Result<Self, DbError> {
        let (client, connection) = tokio_postgres::connect(conninfo, NoTls)
            .await
            .map_err(DbError::Connect)?;

        let driver = tokio::spawn(async move {
            if let Err(err) = connection.await {
                tracing::warn!(?err, "database connection ended with an error");
            }
        });

        Ok(Self { client, driver })
    }

    /// Liveness check: one empty simple-query round trip.
    pub async fn ping(&self) -> Result<(), DbError> {
        self.client.batch_execute(";").await.map_err(DbError::Ping)
    }

    pub async fn current_time(&self) -> Result<DateTime<Utc>, DbError> {
        let statement = self
            .client
            .prepare(NOW_QUERY)
            .await
            .map_err(DbError::Prepare)?;
        let row = self
            .client
            .query_one(&statement, &[])
            .await
            .map_err(DbError::Query)?;
        row.try_get(0).map_err(DbError::Query)
    }

    /// Releases the connection: drops the client and waits for the driver
    /// task to finish tearing the socket down.
    pub async fn close(self) {
        drop(self.client);
        if self.driver.await.is_err() {
            tracing::warn!("database connection driver task panicked");
        }
    }
}

/// Runs one invocation's database work end to end. The connection is closed
/// before returning on success and failure alike.
pub async fn fetch_current_time(conninfo: &str) -> Result<DateTime<Utc>, DbError> {
    let db = Database::connect(conninfo).await?;
    let fetched = match db.ping().await {
        Ok(()) => db.current_time().await,
        Err(err) => Err(err),
    };
    db.close().await;
    fetched
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn unparseable_conninfo_is_a_connect_failure() {
        let err = fetch_current_time("definitely not a conninfo")
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Connect(_)));
    }

    #[test]
    fn error_messages_name_the_failed_step() {
        let driver_err = || "garbage".parse::<tokio_postgres::Config>().unwrap_err();

        assert_eq!(
            DbError::Connect(driver_err()).to_string(),
            "failed to open database connection"
        );
        assert_eq!(
            DbError::Ping(driver_err()).to_string(),
            "database liveness check failed"
        );
        assert_eq!(
            DbError::Prepare(driver_err()).to_string(),
            "failed to prepare the clock query"
        );
        assert_eq!(DbError::Query(driver_err()).to_string(), "clock query failed");
    }
}
