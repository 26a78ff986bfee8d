use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SqliteConfig {
    pub dbname: String,
    /// Directory holding the file; the current directory when unset.
    #[serde(default)]
    pub path: Option<PathBuf>,
}

impl SqliteConfig {
    pub const MEMORY: &'static str = ":memory:";

    pub fn new(dbname: &str) -> Self {
        Self {
            dbname: dbname.to_string(),
            path: None,
        }
    }

    pub fn in_memory() -> Self {
        Self::new(Self::MEMORY)
    }

    pub fn with_path(mut self, path: impl AsRef<Path>) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    pub fn is_memory(&self) -> bool {
        self.dbname == Self::MEMORY
    }

    pub fn file_path(&self) -> std::io::Result<PathBuf> {
        match &self.path {
            Some(dir) => std::path::absolute(dir.join(&self.dbname)),
            None => Ok(std::env::current_dir()?.join(&self.dbname)),
        }
    }
}

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    5432
}

fn default_connect_timeout() -> u64 {
    10
}

#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostgresConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub database: String,
    pub user: String,
    #[serde(default)]
    pub password: String,
    /// Seconds to wait for the server before giving up.
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64,
}

impl PostgresConfig {
    pub fn new(database: &str, user: &str) -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            database: database.to_string(),
            user: user.to_string(),
            password: String::new(),
            connect_timeout: default_connect_timeout(),
        }
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn password(mut self, password: &str) -> Self {
        self.password = password.to_string();
        self
    }

    pub fn host(mut self, host: &str, port: u16) -> Self {
        self.host = host.to_string();
        self.port = port;
        self
    }

    pub fn connect_timeout(mut self, secs: u64) -> Self {
        self.connect_timeout = secs;
        self
    }

    /// `user@host:port/database`, safe to log.
    pub fn target(&self) -> String {
        format!("{}@{}:{}/{}", self.user, self.host, self.port, self.database)
    }
}

impl fmt::Debug for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgresConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("database", &self.database)
            .field("user", &self.user)
            .field("password", &"******")
            .field("connect_timeout", &self.connect_timeout)
            .finish()
    }
}

impl fmt::Display for PostgresConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "PostgreSQL database credentials:")?;
        writeln!(f, "    host: {}", self.host)?;
        writeln!(f, "    database: {}", self.database)?;
        writeln!(f, "    user: {}", self.user)?;
        writeln!(f, "    password: ******")?;
        write!(f, "    port: {}", self.port)
    }
}
