//! Citizen repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Allocate import ids and persist whole batches atomically.
//! - Look up citizens by `(import_id, citizen_id)` and enumerate an import.
//! - Provide a per-import unit of work for read-modify-write updates.
//!
//! # Invariants
//! - Import ids come from `imports.id AUTOINCREMENT`: monotonic, never reused.
//! - Every write path runs in a `BEGIN IMMEDIATE` transaction, so writers
//!   are serialized and a failed call leaves no partial rows.
//! - Read paths reject undecodable persisted state instead of masking it.

use crate::db::migrations::{current_user_version, latest_version};
use crate::db::DbError;
use crate::graph::KinshipStore;
use crate::model::citizen::{Citizen, CitizenId, Gender, ImportId, RelativeSet};
use chrono::NaiveDate;
use log::{error, info};
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::time::Instant;

const CITIZEN_SELECT_SQL: &str = "SELECT
    citizen_id,
    town,
    street,
    building,
    apartment,
    name,
    birth_date,
    gender
FROM citizens";

/// Storage date format; sorts lexically in date order.
const DB_DATE_FORMAT: &str = "%Y-%m-%d";

pub type RepoResult<T> = Result<T, RepoError>;

/// Repository error for citizen persistence and query operations.
#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    ImportNotFound(ImportId),
    CitizenNotFound {
        import_id: ImportId,
        citizen_id: CitizenId,
    },
    /// Connection schema is not at the expected migrated version.
    UninitializedConnection {
        expected_version: u32,
        actual_version: u32,
    },
    InvalidData(String),
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::ImportNotFound(id) => write!(f, "import not found: {id}"),
            Self::CitizenNotFound {
                import_id,
                citizen_id,
            } => write!(f, "citizen {citizen_id} not found in import {import_id}"),
            Self::UninitializedConnection {
                expected_version,
                actual_version,
            } => write!(
                f,
                "citizen repository requires schema version {expected_version}, got {actual_version}"
            ),
            Self::InvalidData(message) => write!(f, "invalid persisted citizen data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            _ => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Read-modify-write access to one import inside a unit of work.
pub trait ImportScope: KinshipStore {
    /// Loads one citizen of the scoped import.
    fn citizen(&self, citizen_id: CitizenId) -> RepoResult<Option<Citizen>>;
    /// Overwrites every field of an existing citizen, relatives included.
    fn save_citizen(&mut self, citizen: &Citizen) -> RepoResult<()>;
}

/// Repository interface over imports and their citizens.
pub trait CitizenRepository {
    /// Persists a new import with all of its citizens and returns its id.
    ///
    /// Citizens must already be unique by id and symmetric.
    fn create_import(&mut self, citizens: &[Citizen]) -> RepoResult<ImportId>;
    fn import_exists(&self, import_id: ImportId) -> RepoResult<bool>;
    fn get_citizen(&self, import_id: ImportId, citizen_id: CitizenId)
        -> RepoResult<Option<Citizen>>;
    /// Lists the citizens of an import in batch order.
    ///
    /// Returns `ImportNotFound` for an unknown import.
    fn list_citizens(&self, import_id: ImportId) -> RepoResult<Vec<Citizen>>;
    /// Runs `work` against one import; commits on `Ok`, discards every write
    /// on `Err`.
    fn with_import<T, E, F>(&mut self, import_id: ImportId, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn ImportScope) -> Result<T, E>,
        E: From<RepoError>;
}

/// SQLite-backed citizen repository.
pub struct SqliteCitizenRepository<'conn> {
    conn: &'conn mut Connection,
}

impl<'conn> SqliteCitizenRepository<'conn> {
    /// Constructs a repository from a migrated connection.
    pub fn try_new(conn: &'conn mut Connection) -> RepoResult<Self> {
        let actual_version = current_user_version(conn)?;
        let expected_version = latest_version();
        if actual_version != expected_version {
            return Err(RepoError::UninitializedConnection {
                expected_version,
                actual_version,
            });
        }
        Ok(Self { conn })
    }
}

impl CitizenRepository for SqliteCitizenRepository<'_> {
    fn create_import(&mut self, citizens: &[Citizen]) -> RepoResult<ImportId> {
        let started_at = Instant::now();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute("INSERT INTO imports DEFAULT VALUES;", [])?;
        let import_id = tx.last_insert_rowid();

        {
            let mut insert_citizen = tx.prepare(
                "INSERT INTO citizens (
                    import_id,
                    citizen_id,
                    town,
                    street,
                    building,
                    apartment,
                    name,
                    birth_date,
                    gender
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            )?;
            for citizen in citizens {
                insert_citizen.execute(params![
                    import_id,
                    citizen.citizen_id,
                    citizen.town.as_str(),
                    citizen.street.as_str(),
                    citizen.building.as_str(),
                    citizen.apartment,
                    citizen.name.as_str(),
                    date_to_db(citizen.birth_date),
                    citizen.gender.as_str(),
                ])?;
            }

            let mut insert_relative = tx.prepare(
                "INSERT INTO citizen_relatives (import_id, citizen_id, relative_id)
                 VALUES (?1, ?2, ?3);",
            )?;
            for citizen in citizens {
                for relative_id in &citizen.relatives {
                    insert_relative.execute(params![import_id, citizen.citizen_id, relative_id])?;
                }
            }
        }

        tx.commit()?;
        info!(
            "event=import_persist module=repo status=ok import_id={} citizens={} duration_ms={}",
            import_id,
            citizens.len(),
            started_at.elapsed().as_millis()
        );
        Ok(import_id)
    }

    fn import_exists(&self, import_id: ImportId) -> RepoResult<bool> {
        import_exists_in(self.conn, import_id)
    }

    fn get_citizen(
        &self,
        import_id: ImportId,
        citizen_id: CitizenId,
    ) -> RepoResult<Option<Citizen>> {
        load_citizen(self.conn, import_id, citizen_id)
    }

    fn list_citizens(&self, import_id: ImportId) -> RepoResult<Vec<Citizen>> {
        // One read transaction so rows and relatives come from the same snapshot.
        let tx = self.conn.unchecked_transaction()?;
        if !import_exists_in(&tx, import_id)? {
            return Err(RepoError::ImportNotFound(import_id));
        }

        let mut relatives = load_import_relatives(&tx, import_id)?;
        let mut stmt = tx.prepare(&format!(
            "{CITIZEN_SELECT_SQL}
             WHERE import_id = ?1
             ORDER BY id ASC;"
        ))?;
        let mut rows = stmt.query([import_id])?;
        let mut citizens = Vec::new();
        while let Some(row) = rows.next()? {
            let mut citizen = parse_citizen_row(row)?;
            citizen.relatives = relatives.remove(&citizen.citizen_id).unwrap_or_default();
            citizens.push(citizen);
        }
        drop(rows);
        drop(stmt);
        tx.finish()?;

        Ok(citizens)
    }

    fn with_import<T, E, F>(&mut self, import_id: ImportId, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn ImportScope) -> Result<T, E>,
        E: From<RepoError>,
    {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)
            .map_err(RepoError::from)?;
        if !import_exists_in(&tx, import_id)? {
            return Err(RepoError::ImportNotFound(import_id).into());
        }

        let mut scope = SqliteImportScope {
            conn: &tx,
            import_id,
        };
        let value = match work(&mut scope) {
            Ok(value) => value,
            Err(err) => {
                // Dropping `tx` rolls back every staged write.
                error!(
                    "event=import_scope module=repo status=rollback import_id={}",
                    import_id
                );
                return Err(err);
            }
        };

        tx.commit().map_err(RepoError::from)?;
        Ok(value)
    }
}

/// Unit-of-work view of one import bound to an open transaction.
struct SqliteImportScope<'tx> {
    conn: &'tx Connection,
    import_id: ImportId,
}

impl KinshipStore for SqliteImportScope<'_> {
    fn import_id(&self) -> ImportId {
        self.import_id
    }

    fn citizen_exists(&self, citizen_id: CitizenId) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(
                SELECT 1
                FROM citizens
                WHERE import_id = ?1 AND citizen_id = ?2
            );",
            params![self.import_id, citizen_id],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn insert_relative(&mut self, owner: CitizenId, relative_id: CitizenId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "INSERT OR IGNORE INTO citizen_relatives (import_id, citizen_id, relative_id)
             VALUES (?1, ?2, ?3);",
            params![self.import_id, owner, relative_id],
        )?;
        Ok(changed == 1)
    }

    fn remove_relative(&mut self, owner: CitizenId, relative_id: CitizenId) -> RepoResult<bool> {
        let changed = self.conn.execute(
            "DELETE FROM citizen_relatives
             WHERE import_id = ?1 AND citizen_id = ?2 AND relative_id = ?3;",
            params![self.import_id, owner, relative_id],
        )?;
        Ok(changed == 1)
    }
}

impl ImportScope for SqliteImportScope<'_> {
    fn citizen(&self, citizen_id: CitizenId) -> RepoResult<Option<Citizen>> {
        load_citizen(self.conn, self.import_id, citizen_id)
    }

    fn save_citizen(&mut self, citizen: &Citizen) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE citizens
             SET
                town = ?3,
                street = ?4,
                building = ?5,
                apartment = ?6,
                name = ?7,
                birth_date = ?8,
                gender = ?9
             WHERE import_id = ?1 AND citizen_id = ?2;",
            params![
                self.import_id,
                citizen.citizen_id,
                citizen.town.as_str(),
                citizen.street.as_str(),
                citizen.building.as_str(),
                citizen.apartment,
                citizen.name.as_str(),
                date_to_db(citizen.birth_date),
                citizen.gender.as_str(),
            ],
        )?;
        if changed == 0 {
            return Err(RepoError::CitizenNotFound {
                import_id: self.import_id,
                citizen_id: citizen.citizen_id,
            });
        }

        self.conn.execute(
            "DELETE FROM citizen_relatives WHERE import_id = ?1 AND citizen_id = ?2;",
            params![self.import_id, citizen.citizen_id],
        )?;
        for relative_id in &citizen.relatives {
            self.conn.execute(
                "INSERT INTO citizen_relatives (import_id, citizen_id, relative_id)
                 VALUES (?1, ?2, ?3);",
                params![self.import_id, citizen.citizen_id, relative_id],
            )?;
        }
        Ok(())
    }
}

fn import_exists_in(conn: &Connection, import_id: ImportId) -> RepoResult<bool> {
    let exists: i64 = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM imports WHERE id = ?1);",
        [import_id],
        |row| row.get(0),
    )?;
    Ok(exists == 1)
}

fn load_citizen(
    conn: &Connection,
    import_id: ImportId,
    citizen_id: CitizenId,
) -> RepoResult<Option<Citizen>> {
    let citizen = conn
        .query_row(
            &format!(
                "{CITIZEN_SELECT_SQL}
                 WHERE import_id = ?1 AND citizen_id = ?2;"
            ),
            params![import_id, citizen_id],
            |row| Ok(parse_citizen_row(row)),
        )
        .optional()?
        .transpose()?;

    let Some(mut citizen) = citizen else {
        return Ok(None);
    };
    citizen.relatives = load_relatives(conn, import_id, citizen_id)?;
    Ok(Some(citizen))
}

fn load_relatives(
    conn: &Connection,
    import_id: ImportId,
    citizen_id: CitizenId,
) -> RepoResult<RelativeSet> {
    let mut stmt = conn.prepare(
        "SELECT relative_id
         FROM citizen_relatives
         WHERE import_id = ?1 AND citizen_id = ?2;",
    )?;
    let mut rows = stmt.query(params![import_id, citizen_id])?;
    let mut relatives = RelativeSet::new();
    while let Some(row) = rows.next()? {
        relatives.insert(row.get(0)?);
    }
    Ok(relatives)
}

fn load_import_relatives(
    conn: &Connection,
    import_id: ImportId,
) -> RepoResult<HashMap<CitizenId, RelativeSet>> {
    let mut stmt = conn.prepare(
        "SELECT citizen_id, relative_id
         FROM citizen_relatives
         WHERE import_id = ?1;",
    )?;
    let mut rows = stmt.query([import_id])?;
    let mut relatives: HashMap<CitizenId, RelativeSet> = HashMap::new();
    while let Some(row) = rows.next()? {
        relatives
            .entry(row.get(0)?)
            .or_default()
            .insert(row.get(1)?);
    }
    Ok(relatives)
}

fn parse_citizen_row(row: &Row<'_>) -> RepoResult<Citizen> {
    let date_text: String = row.get("birth_date")?;
    let birth_date = NaiveDate::parse_from_str(&date_text, DB_DATE_FORMAT).map_err(|_| {
        RepoError::InvalidData(format!(
            "invalid birth date `{date_text}` in citizens.birth_date"
        ))
    })?;

    let gender_text: String = row.get("gender")?;
    let gender = Gender::parse(&gender_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid gender `{gender_text}` in citizens.gender"))
    })?;

    Ok(Citizen {
        citizen_id: row.get("citizen_id")?,
        town: row.get("town")?,
        street: row.get("street")?,
        building: row.get("building")?,
        apartment: row.get("apartment")?,
        name: row.get("name")?,
        birth_date,
        gender,
        relatives: RelativeSet::new(),
    })
}

fn date_to_db(date: NaiveDate) -> String {
    date.format(DB_DATE_FORMAT).to_string()
}
