use std::fs;
use std::path::Path;

use rusqlite::{ffi, params, Connection, ErrorCode, Savepoint, ToSql, Transaction};
use tracing::debug;

use crate::error::Result;
use crate::models::{AddrRecord, MmsRecord, PartRecord, Record, SmsRecord};
use crate::schema::{addrs, mmss, parts, smss};

/// Path that selects an in-memory staging store
pub const IN_MEMORY: &str = ":memory:";

/// Result of staging one row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// Row stored
    Inserted,
    /// An identical row is already staged
    Duplicate,
    /// Row refused for structural reasons; carries the reason
    Rejected(String),
}

impl InsertOutcome {
    /// True when the row was stored
    #[must_use]
    pub const fn is_inserted(&self) -> bool {
        matches!(self, Self::Inserted)
    }
}

/// Staging store holding the four relations for one merge run
pub struct StagingStore {
    conn: Connection,
}

impl StagingStore {
    /// Open (or create) a staging database file, or [`IN_MEMORY`]
    pub fn open(database_path: &str) -> Result<Self> {
        if database_path == IN_MEMORY {
            return Self::open_in_memory();
        }

        // Create parent directory if it doesn't exist
        if let Some(parent) = Path::new(database_path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(database_path)?;
        Self::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    /// Open a transient store
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        Self::run_migrations(&conn)?;
        Ok(Self { conn })
    }

    fn run_migrations(conn: &Connection) -> Result<()> {
        conn.execute_batch(include_str!("../migrations/2020-01-01-000000_create_staging_tables/up.sql"))?;
        Ok(())
    }

    /// Truncate all four relations
    pub fn clear(&self) -> Result<()> {
        self.conn.execute_batch(&format!(
            "DELETE FROM {}; DELETE FROM {}; DELETE FROM {}; DELETE FROM {};",
            parts::TABLE,
            addrs::TABLE,
            mmss::TABLE,
            smss::TABLE
        ))?;
        debug!("Cleared staging store");
        Ok(())
    }

    /// Start a write batch; nothing is visible to readers until it commits
    pub fn begin_batch(&mut self) -> Result<StagingBatch<'_>> {
        Ok(StagingBatch { tx: self.conn.transaction()? })
    }

    /// Number of staged SMS rows
    pub fn sms_count(&self) -> Result<usize> {
        self.count(smss::TABLE)
    }

    /// Number of staged MMS rows
    pub fn mms_count(&self) -> Result<usize> {
        self.count(mmss::TABLE)
    }

    /// Number of staged part rows
    pub fn part_count(&self) -> Result<usize> {
        self.count(parts::TABLE)
    }

    /// Number of staged address rows
    pub fn addr_count(&self) -> Result<usize> {
        self.count(addrs::TABLE)
    }

    fn count(&self, table: &str) -> Result<usize> {
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), params![], |row| row.get::<_, usize>(0))?;
        Ok(count)
    }

    /// Visit every SMS ordered by sent date
    pub fn for_each_sms<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(SmsRecord) -> Result<()>,
    {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM {} ORDER BY CAST(\"{}\" AS INTEGER), rowid",
            smss::SCHEMA.select_list(),
            smss::TABLE,
            smss::DATE_SENT
        ))?;
        let mut rows = stmt.query(params![])?;
        while let Some(row) = rows.next()? {
            visit(SmsRecord { fields: Record::from_row(&smss::SCHEMA, row, 0)? })?;
        }
        Ok(())
    }

    /// Visit every MMS ordered by sent date, with parts and addresses loaded
    pub fn for_each_mms<F>(&self, mut visit: F) -> Result<()>
    where
        F: FnMut(MmsRecord) -> Result<()>,
    {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT \"{}\", {} FROM {} ORDER BY CAST(\"{}\" AS INTEGER), \"{}\"",
            mmss::ID,
            mmss::SCHEMA.select_list(),
            mmss::TABLE,
            mmss::DATE_SENT,
            mmss::ID
        ))?;
        let mut rows = stmt.query(params![])?;
        while let Some(row) = rows.next()? {
            let id: i64 = row.get(0)?;
            let fields = Record::from_row(&mmss::SCHEMA, row, 1)?;
            let parts = self.parts_for(id)?;
            let addrs = self.addrs_for(id)?;
            visit(MmsRecord { id, fields, parts, addrs })?;
        }
        Ok(())
    }

    fn parts_for(&self, id_mms: i64) -> Result<Vec<PartRecord>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {} FROM {} WHERE \"{}\" = ? ORDER BY rowid",
            parts::SCHEMA.select_list(),
            parts::TABLE,
            parts::FK_ID_MMS
        ))?;
        let rows = stmt.query_map(params![id_mms], |row| {
            Record::from_row(&parts::SCHEMA, row, 0).map(|fields| PartRecord { fields })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }

    fn addrs_for(&self, id_mms: i64) -> Result<Vec<AddrRecord>> {
        let mut stmt = self.conn.prepare_cached(&format!(
            "SELECT {} FROM {} WHERE \"{}\" = ? ORDER BY rowid",
            addrs::SCHEMA.select_list(),
            addrs::TABLE,
            addrs::FK_ID_MMS
        ))?;
        let rows = stmt.query_map(params![id_mms], |row| {
            Record::from_row(&addrs::SCHEMA, row, 0).map(|fields| AddrRecord { fields })
        })?;
        Ok(rows.collect::<rusqlite::Result<Vec<_>>>()?)
    }
}

/// Open write transaction against the staging store
pub struct StagingBatch<'a> {
    tx: Transaction<'a>,
}

impl StagingBatch<'_> {
    /// Stage one SMS
    pub fn insert_sms(&self, sms: &SmsRecord) -> Result<InsertOutcome> {
        let mut stmt = self.tx.prepare_cached(&smss::SCHEMA.insert_sql())?;
        classify(stmt.execute(rusqlite::params_from_iter(sms.fields.values())))
    }

    /// Stage one MMS with its parts and addresses.
    ///
    /// The whole record goes in under a savepoint: if any part or address is
    /// refused, nothing of this MMS stays staged.
    pub fn insert_mms(&mut self, mms: &MmsRecord) -> Result<InsertOutcome> {
        let savepoint = self.tx.savepoint()?;

        let outcome = insert_keyed(&savepoint, &mmss::SCHEMA.insert_sql(), mms.id, &mms.fields)?;
        if !outcome.is_inserted() {
            return Ok(outcome);
        }

        let part_sql = parts::SCHEMA.insert_sql();
        for part in &mms.parts {
            if let InsertOutcome::Rejected(reason) = insert_keyed(&savepoint, &part_sql, mms.id, &part.fields)? {
                return Ok(InsertOutcome::Rejected(format!("part: {reason}")));
            }
        }

        let addr_sql = addrs::SCHEMA.insert_sql();
        for addr in &mms.addrs {
            if let InsertOutcome::Rejected(reason) = insert_keyed(&savepoint, &addr_sql, mms.id, &addr.fields)? {
                return Ok(InsertOutcome::Rejected(format!("addr: {reason}")));
            }
        }

        savepoint.commit()?;
        Ok(InsertOutcome::Inserted)
    }

    /// Make the batch visible
    pub fn commit(self) -> Result<()> {
        self.tx.commit()?;
        Ok(())
    }
}

fn insert_keyed(savepoint: &Savepoint<'_>, sql: &str, key: i64, fields: &Record) -> Result<InsertOutcome> {
    let mut stmt = savepoint.prepare_cached(sql)?;
    let mut values: Vec<&dyn ToSql> = Vec::with_capacity(fields.values().len() + 1);
    values.push(&key);
    values.extend(fields.values().iter().map(|value| value as &dyn ToSql));
    classify(stmt.execute(values.as_slice()))
}

/// Split an insert result into "already there", "refused" and fatal errors.
fn classify(result: rusqlite::Result<usize>) -> Result<InsertOutcome> {
    match result {
        Ok(_) => Ok(InsertOutcome::Inserted),
        Err(rusqlite::Error::SqliteFailure(err, message)) => {
            let reason = message.unwrap_or_else(|| err.to_string());
            match err.code {
                ErrorCode::ConstraintViolation
                    if err.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
                        || err.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY =>
                {
                    Ok(InsertOutcome::Duplicate)
                }
                ErrorCode::ConstraintViolation | ErrorCode::TypeMismatch => Ok(InsertOutcome::Rejected(reason)),
                _ => Err(rusqlite::Error::SqliteFailure(err, Some(reason)).into()),
            }
        }
        Err(err @ (rusqlite::Error::InvalidParameterCount(..) | rusqlite::Error::ToSqlConversionFailure(_))) => {
            Ok(InsertOutcome::Rejected(err.to_string()))
        }
        Err(err) => Err(err.into()),
    }
}
