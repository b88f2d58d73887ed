use rusqlite::{Connection, DatabaseName, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub struct Database {
    conn: Connection,
}

impl Database {
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path.as_ref())?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.init_schema()?;
        debug!("Opened ledger at {}", path.as_ref().display());
        Ok(db)
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.configure_pragmas()?;
        db.init_schema()?;
        Ok(db)
    }

    /// Every statement commits on its own; FULL sync makes each commit
    /// durable before it returns.
    fn configure_pragmas(&self) -> Result<()> {
        self.conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA synchronous = FULL;
             PRAGMA busy_timeout = 5000;",
        )?;
        debug!("SQLite pragmas configured (WAL mode, full sync)");
        Ok(())
    }

    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(include_str!("schema.sql"))?;
        debug!("SQLite schema initialized");
        Ok(())
    }

    pub fn connection(&self) -> &Connection {
        &self.conn
    }

    /// Copy the whole database to `dest`, or to a timestamped file in the
    /// working directory. Uses the online backup API so an open WAL is
    /// included.
    pub fn backup(&self, dest: Option<&Path>) -> Result<PathBuf> {
        let dest = match dest {
            Some(p) => p.to_path_buf(),
            None => PathBuf::from(format!(
                "pwd_tools_backup_{}.db",
                chrono::Local::now().format("%Y%m%d_%H%M%S")
            )),
        };
        self.conn.backup(DatabaseName::Main, &dest, None)?;
        info!("Database backed up to {}", dest.display());
        Ok(dest)
    }
}
