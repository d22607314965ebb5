use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use sqlx::postgres::PgConnection;
use sqlx::Connection;
use tracing::{debug, info, warn};

use super::records::{BulkRecord, Customer, Item, Order};
use super::sample::UTF8_BOM;
use super::schema::TABLES;
use super::{CUSTOMERS_FILE, IngestError, ITEMS_FILE, ORDERS_FILE};
use crate::db::PgConnectionProvider;

/// Row counts after an import, in load order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportReport {
    pub tables: Vec<(&'static str, i64)>,
}

/// Reads a header-ed CSV file into records. A leading UTF-8 BOM is skipped.
pub fn read_records<T: BulkRecord>(path: &Path) -> Result<Vec<T>, IngestError> {
    let file = File::open(path).map_err(|source| IngestError::MissingFile {
        path: path.to_path_buf(),
        source,
    })?;
    let mut reader = BufReader::new(file);
    if reader.fill_buf()?.starts_with(UTF8_BOM) {
        reader.consume(UTF8_BOM.len());
    }

    let mut csv_reader = ::csv::ReaderBuilder::new()
        .trim(::csv::Trim::All)
        .from_reader(reader);
    csv_reader
        .deserialize()
        .collect::<Result<Vec<T>, _>>()
        .map_err(|source| IngestError::Csv {
            path: path.to_path_buf(),
            source,
        })
}

pub struct CsvLoader {
    provider: PgConnectionProvider,
}

impl CsvLoader {
    pub fn new(provider: PgConnectionProvider) -> Self {
        Self { provider }
    }

    /// Creates missing tables, then replaces the contents of customers, items
    /// and orders with `customers.csv`, `items.csv` and `orders.csv` from `dir`.
    pub async fn import_dir(&self, dir: &Path) -> Result<ImportReport, IngestError> {
        let mut conn = self.provider.connect().await?;
        info!("Connected to {}", self.provider.settings());

        let result = Self::import_with(&mut conn, dir).await;
        if let Err(e) = conn.close().await {
            warn!("Failed to close loader connection: {}", e);
        }
        result
    }

    async fn import_with(conn: &mut PgConnection, dir: &Path) -> Result<ImportReport, IngestError> {
        for table in TABLES {
            sqlx::query(&table.to_create_table_sql())
                .execute(&mut *conn)
                .await?;
            debug!("Ensured table {} exists", table.name);
        }

        Self::load_table::<Customer>(conn, dir.join(CUSTOMERS_FILE)).await?;
        Self::load_table::<Item>(conn, dir.join(ITEMS_FILE)).await?;
        Self::load_table::<Order>(conn, dir.join(ORDERS_FILE)).await?;

        let mut tables = Vec::with_capacity(TABLES.len());
        for table in TABLES {
            let count: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM {}", table.name))
                .fetch_one(&mut *conn)
                .await?;
            tables.push((table.name, count));
        }

        Ok(ImportReport { tables })
    }

    /// Truncates the record's table and inserts every row in one transaction.
    /// An empty file leaves the table untouched.
    async fn load_table<T>(conn: &mut PgConnection, path: PathBuf) -> Result<usize, IngestError>
    where
        T: BulkRecord + 'static,
    {
        let table = T::TABLE.name;
        let read_path = path.clone();
        let records = tokio::task::spawn_blocking(move || read_records::<T>(&read_path))
            .await
            .map_err(|e| IngestError::IoError(std::io::Error::other(e)))??;

        if records.is_empty() {
            info!("{} is empty, leaving table {} unchanged", path.display(), table);
            return Ok(0);
        }

        let count = records.len();
        let insert = T::TABLE.insert_sql();
        let mut tx = conn.begin().await?;
        sqlx::query(&format!("TRUNCATE TABLE {} CASCADE", table))
            .execute(&mut *tx)
            .await?;
        for record in records {
            record.bind(sqlx::query(&insert)).execute(&mut *tx).await?;
        }
        tx.commit().await?;

        info!("Imported {} records into {}", count, table);
        Ok(count)
    }
}
