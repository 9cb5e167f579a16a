//! Phase 3: Read the catalog of every configured database connection.
//!
//! A connection that cannot be opened or read is logged and skipped; the
//! remaining connections are still documented.

use crate::analysers::sql::mysql::MysqlAnalyser;
use crate::analysers::sql::postgres::PostgresAnalyser;
use crate::analysers::sql::Database;
use crate::config::{AimapConfig, AnalysisResult, DatabaseConnection, DatabaseType};
use crate::error::{AimapError, Result};

pub fn run_databases_phase(config: &AimapConfig, result: &mut AnalysisResult) -> Result<()> {
    for conn in &config.databases.connections {
        log::info!("reading database connection {}", conn.name);
        match analyse_connection(conn, result) {
            Ok(db) => result.databases.push(db),
            Err(e) => log::error!("database connection {} skipped: {}", conn.name, e),
        }
    }
    Ok(())
}

fn analyse_connection(conn: &DatabaseConnection, result: &mut AnalysisResult) -> Result<Database> {
    match conn.database_type() {
        Some(DatabaseType::Postgres) => {
            let mut analyser = PostgresAnalyser::connect(conn)?;
            super::extract(&mut analyser, result)
        }
        Some(DatabaseType::Mysql) => {
            let mut analyser = MysqlAnalyser::connect(conn)?;
            super::extract(&mut analyser, result)
        }
        None => Err(AimapError::Config(format!(
            "invalid database type {:?}",
            conn.db_type
        ))),
    }
}
