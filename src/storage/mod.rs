use ethers::types::{Address, H256};
use log::{debug, info, warn};
use rusqlite::{ffi, params, Connection, OptionalExtension};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use crate::errors::StoreError;
use crate::metrics::record_price_writes;
use crate::pricing::PriceSample;

const UPSERT_PRICE: &str = "INSERT INTO prices (token_address, time, price, source)
    VALUES (?1, ?2, ?3, ?4)
    ON CONFLICT (token_address, time) DO UPDATE SET
        price = excluded.price,
        source = excluded.source";

/// Durable record of processed transactions and resolved prices.
///
/// Every write is safe to replay: timestamps are insert-once, token
/// associations tolerate duplicates and prices are last-write-wins on
/// `(token_address, time)`.
pub struct PriceStore {
    conn: Mutex<Connection>,
}

impl PriceStore {
    /// Open or create the database at `path`
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let conn = Connection::open(path.as_ref())?;
        info!("Opened price store at {}", path.as_ref().display());
        Self::init(conn)
    }

    pub fn open_in_memory() -> Result<Self, StoreError> {
        Self::init(Connection::open_in_memory()?)
    }

    fn init(conn: Connection) -> Result<Self, StoreError> {
        conn.execute_batch(include_str!("../../sql/schema.sql"))?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>, StoreError> {
        self.conn.lock().map_err(|_| StoreError::Poisoned)
    }

    /// Record when a transaction happened. Re-recording a known transaction is a
    /// no-op; returns whether a new row was written.
    pub fn write_transaction_timestamp(&self, tx_hash: H256, time: u64) -> Result<bool, StoreError> {
        let inserted = self.conn()?.execute(
            "INSERT INTO transaction_timestamp (tx_hash, time) VALUES (?1, ?2)
            ON CONFLICT (tx_hash) DO NOTHING",
            params![tx_hash.as_bytes(), to_sql_time(time)?],
        )?;
        Ok(inserted > 0)
    }

    /// Record which tokens each transaction touched, in a single transaction.
    pub fn write_transaction_tokens(&self, pairs: &[(H256, Address)]) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        {
            let mut stmt =
                tx.prepare("INSERT INTO transaction_tokens (tx_hash, token_address) VALUES (?1, ?2)")?;
            for (tx_hash, token) in pairs {
                stmt.execute(params![tx_hash.as_bytes(), token.as_bytes()])?;
            }
        }
        tx.commit()?;

        debug!("Stored {} transaction token rows", pairs.len());
        Ok(pairs.len())
    }

    /// Upsert prices in one transaction. Rows the price column rejects are logged
    /// and skipped while the rest of the batch commits; any other failure rolls
    /// the whole batch back. Returns the number of rows written.
    pub fn write_prices(&self, samples: &[PriceSample]) -> Result<usize, StoreError> {
        let mut conn = self.conn()?;
        let tx = conn.transaction()?;
        let mut written = 0;
        {
            let mut stmt = tx.prepare(UPSERT_PRICE)?;
            for sample in samples {
                let result = stmt.execute(params![
                    sample.token_address.as_bytes(),
                    to_sql_time(sample.observed_at)?,
                    sample.price,
                    sample.source,
                ]);
                match result {
                    Ok(_) => written += 1,
                    Err(rusqlite::Error::SqliteFailure(e, _))
                        if is_rejected_price(e.extended_code) =>
                    {
                        let err = StoreError::ValueOutOfRange {
                            token: sample.token_address,
                            time: sample.observed_at,
                            price: sample.price,
                        };
                        warn!("Skipping price row: {}", err);
                    }
                    Err(e) => return Err(e.into()),
                }
            }
        }
        tx.commit()?;

        record_price_writes(written, samples.len() - written);
        Ok(written)
    }

    /// Most recently recorded transaction: greatest `time`, later insert on ties.
    pub fn get_latest_checkpoint(&self) -> Result<Option<H256>, StoreError> {
        let hash: Option<Vec<u8>> = self
            .conn()?
            .query_row(
                "SELECT tx_hash FROM transaction_timestamp ORDER BY time DESC, seq DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        hash.map(|bytes| to_h256(&bytes)).transpose()
    }

    pub fn get_transaction_timestamp(&self, tx_hash: H256) -> Result<Option<u64>, StoreError> {
        let time: Option<i64> = self
            .conn()?
            .query_row(
                "SELECT time FROM transaction_timestamp WHERE tx_hash = ?1",
                params![tx_hash.as_bytes()],
                |row| row.get(0),
            )
            .optional()?;
        time.map(from_sql_time).transpose()
    }

    /// Tokens associated with `tx_hash`, in insertion order, duplicates included.
    pub fn get_transaction_tokens(&self, tx_hash: H256) -> Result<Vec<Address>, StoreError> {
        let conn = self.conn()?;
        let mut stmt = conn.prepare(
            "SELECT token_address FROM transaction_tokens WHERE tx_hash = ?1 ORDER BY rowid",
        )?;
        let rows = stmt
            .query_map(params![tx_hash.as_bytes()], |row| row.get::<_, Vec<u8>>(0))?
            .collect::<Result<Vec<_>, _>>()?;

        rows.iter().map(|bytes| to_address(bytes)).collect()
    }

    pub fn get_price(&self, token: Address, time: u64) -> Result<Option<PriceSample>, StoreError> {
        let row: Option<(f64, String)> = self
            .conn()?
            .query_row(
                "SELECT price, source FROM prices WHERE token_address = ?1 AND time = ?2",
                params![token.as_bytes(), to_sql_time(time)?],
                |row| Ok((row.get(0)?, row.get(1)?)),
            )
            .optional()?;

        Ok(row.map(|(price, source)| PriceSample {
            token_address: token,
            observed_at: time,
            price,
            source,
        }))
    }

    pub fn count_prices(&self) -> Result<usize, StoreError> {
        let n: i64 = self
            .conn()?
            .query_row("SELECT COUNT(*) FROM prices", [], |row| row.get(0))?;
        Ok(n as usize)
    }
}

/// CHECK on the price range, or NOT NULL for a NaN price bound as NULL.
fn is_rejected_price(extended_code: std::os::raw::c_int) -> bool {
    extended_code == ffi::SQLITE_CONSTRAINT_CHECK || extended_code == ffi::SQLITE_CONSTRAINT_NOTNULL
}

fn to_sql_time(time: u64) -> Result<i64, StoreError> {
    i64::try_from(time).map_err(|_| StoreError::TimeOutOfRange(time))
}

fn from_sql_time(time: i64) -> Result<u64, StoreError> {
    u64::try_from(time).map_err(|_| StoreError::NegativeTime(time))
}

fn to_h256(bytes: &[u8]) -> Result<H256, StoreError> {
    if bytes.len() != 32 {
        return Err(StoreError::CorruptValue {
            column: "tx_hash",
            len: bytes.len(),
        });
    }
    Ok(H256::from_slice(bytes))
}

fn to_address(bytes: &[u8]) -> Result<Address, StoreError> {
    if bytes.len() != 20 {
        return Err(StoreError::CorruptValue {
            column: "token_address",
            len: bytes.len(),
        });
    }
    Ok(Address::from_slice(bytes))
}
