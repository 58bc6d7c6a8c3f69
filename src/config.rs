//! Runtime settings for the `roadmap` CLI.

use std::path::PathBuf;

use anyhow::{Context, Result};
use uuid::Uuid;

use crate::db::{self, Database};

/// Settings loaded from environment variables, overridable from the command line.
#[derive(Clone, Debug, Default)]
pub struct Config {
    /// Database file (from ROADMAP_DB). Defaults to the per-user data directory.
    pub database_path: Option<PathBuf>,
    /// Employee acting on roadmaps (from ROADMAP_EMPLOYEE_ID).
    pub employee_id: Option<Uuid>,
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self> {
        Self::from_vars(
            std::env::var("ROADMAP_DB").ok(),
            std::env::var("ROADMAP_EMPLOYEE_ID").ok(),
        )
    }

    fn from_vars(database: Option<String>, employee: Option<String>) -> Result<Self> {
        let database_path = database
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(PathBuf::from);

        let employee_id = employee
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .map(|s| Uuid::parse_str(&s).context("ROADMAP_EMPLOYEE_ID is not a valid UUID"))
            .transpose()?;

        Ok(Self {
            database_path,
            employee_id,
        })
    }

    /// Apply command-line overrides on top of the environment.
    pub fn with_overrides(mut self, database_path: Option<PathBuf>, employee_id: Option<Uuid>) -> Self {
        if database_path.is_some() {
            self.database_path = database_path;
        }
        if employee_id.is_some() {
            self.employee_id = employee_id;
        }
        self
    }

    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database_path {
            Some(path) => Ok(path.clone()),
            None => db::default_path(),
        }
    }

    /// Open and migrate the configured database.
    pub fn open_database(&self) -> Result<Database> {
        let db = Database::open(self.database_path()?)?;
        db.migrate()?;
        Ok(db)
    }

    /// The acting employee, required by every command that changes a roadmap.
    pub fn employee(&self) -> Result<Uuid> {
        self.employee_id
            .ok_or_else(|| anyhow::anyhow!("No employee set: pass --as or set ROADMAP_EMPLOYEE_ID"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_environment_has_no_overrides() {
        let config = Config::from_vars(None, None).unwrap();
        assert!(config.database_path.is_none());
        assert!(config.employee_id.is_none());
        assert!(config.employee().is_err());
    }

    #[test]
    fn parses_employee_and_path() {
        let id = Uuid::new_v4();
        let config =
            Config::from_vars(Some("/tmp/plans.db".to_string()), Some(format!(" {} ", id))).unwrap();
        assert_eq!(config.database_path, Some(PathBuf::from("/tmp/plans.db")));
        assert_eq!(config.employee().unwrap(), id);
    }

    #[test]
    fn rejects_malformed_employee_id() {
        assert!(Config::from_vars(None, Some("not-a-uuid".to_string())).is_err());
    }

    #[test]
    fn blank_values_are_ignored() {
        let config = Config::from_vars(Some("  ".to_string()), Some(String::new())).unwrap();
        assert!(config.database_path.is_none());
        assert!(config.employee_id.is_none());
    }

    #[test]
    fn overrides_replace_environment_values() {
        let env_id = Uuid::new_v4();
        let flag_id = Uuid::new_v4();
        let config = Config {
            database_path: Some(PathBuf::from("/env.db")),
            employee_id: Some(env_id),
        }
        .with_overrides(None, Some(flag_id));

        assert_eq!(config.database_path, Some(PathBuf::from("/env.db")));
        assert_eq!(config.employee_id, Some(flag_id));
    }
}
