use anyhow::{bail, Context, Result};
use std::env;

const INSTANCE_CONNECTION_NAME: &str = "INSTANCE_CONNECTION_NAME";
const DATABASE_NAME: &str = "DATABASE_NAME";
const DATABASE_USER: &str = "DATABASE_USER";
const PASSWORD: &str = "PASSWORD";
const HANDLER_MODE: &str = "HANDLER_MODE";

/// What the handler does with an invocation: answer with the fixed greeting,
/// or read the clock from the database.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    Echo,
    Query,
}

/// Connection settings and handler mode, read from the environment once at
/// startup and passed into every invocation.
pub struct Config {
    pub instance_connection_name: String,
    pub database_name: String,
    pub database_user: String,
    pub password: String,
    pub mode: Mode,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Ok(Self {
            instance_connection_name: require(INSTANCE_CONNECTION_NAME)?,
            database_name: require(DATABASE_NAME)?,
            database_user: require(DATABASE_USER)?,
            password: require(PASSWORD)?,
            mode: parse_mode(env::var(HANDLER_MODE).ok().as_deref())?,
        })
    }

    /// The conninfo handed to the driver. The proxy expects the instance
    /// connection name in the host position and plaintext on the wire.
    pub fn conninfo(&self) -> String {
        format!(
            "host={} dbname={} user={} password={} sslmode=disable",
            self.instance_connection_name, self.database_name, self.database_user, self.password
        )
    }
}

fn require(name: &str) -> Result<String> {
    env::var(name).with_context(|| format!("{name} is not set"))
}

fn parse_mode(value: Option<&str>) -> Result<Mode> {
    match value {
        None | Some("query") => Ok(Mode::Query),
        Some("echo") => Ok(Mode::Echo),
        Some(other) => bail!("{HANDLER_MODE} must be \"echo\" or \"query\", not {other:?}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> Config {
        Config {
            instance_connection_name: "project:region:instance".to_string(),
            database_name: "postgres".to_string(),
            database_user: "app".to_string(),
            password: "hunter2".to_string(),
            mode: Mode::Query,
        }
    }

    #[test]
    fn conninfo_matches_the_documented_template() {
        assert_eq!(
            config().conninfo(),
            "host=project:region:instance dbname=postgres user=app password=hunter2 sslmode=disable"
        );
    }

    #[test]
    fn mode_defaults_to_query() {
        assert_eq!(parse_mode(None).unwrap(), Mode::Query);
    }

    #[test]
    fn mode_accepts_both_variants() {
        assert_eq!(parse_mode(Some("echo")).unwrap(), Mode::Echo);
        assert_eq!(parse_mode(Some("query")).unwrap(), Mode::Query);
    }

    #[test]
    fn mode_rejects_anything_else() {
        assert!(parse_mode(Some("both")).is_err());
        assert!(parse_mode(Some("")).is_err());
        assert!(parse_mode(Some("Echo")).is_err());
    }
}
