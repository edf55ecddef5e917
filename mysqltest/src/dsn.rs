//! Datasource names for connecting to a test instance.
//!
//! A DSN is assembled from a sequence of [`DatasourceOption`] values reduced
//! left to right into a [`Datasource`], which renders in the Go-driver style
//! `user:password@address/dbname[?query]`:
//!
//! ```text
//! root:@unix(/tmp/mysqltest123/tmp/mysql.sock)/test
//! root:secret@tcp(127.0.0.1:40123)/app?multiStatements=true&parseTime=true
//! ```
//!
//! The structured [`Datasource`] is also what the readiness probe connects
//! with, so the string form is only ever produced for callers.

#[cfg(all(test, feature = "property-tests"))]
mod proptests;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Connection protocol of a datasource.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Protocol {
    /// Unix domain socket.
    Unix,
    /// TCP host and port.
    Tcp,
}

impl fmt::Display for Protocol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unix => write!(f, "unix"),
            Self::Tcp => write!(f, "tcp"),
        }
    }
}

impl FromStr for Protocol {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "unix" => Ok(Self::Unix),
            "tcp" => Ok(Self::Tcp),
            _ => Err(format!("unknown protocol '{s}' (expected unix or tcp)")),
        }
    }
}

/// One recognized datasource option.
///
/// Later options in a sequence override earlier ones of the same kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DatasourceOption {
    /// Connection protocol.
    Protocol(Protocol),
    /// Socket path; only used with [`Protocol::Unix`].
    Socket(PathBuf),
    /// Host name; only used with [`Protocol::Tcp`].
    Host(String),
    /// Port number; only used with [`Protocol::Tcp`].
    Port(u16),
    /// Database name.
    Dbname(String),
    /// User name.
    User(String),
    /// Password.
    Password(String),
    /// Appends `parseTime=<bool>` to the query.
    ParseTime(bool),
    /// Appends `multiStatements=<bool>` to the query.
    MultiStatements(bool),
}

impl DatasourceOption {
    /// Whether this option sets the protocol.
    #[must_use]
    pub const fn is_protocol(&self) -> bool {
        matches!(self, Self::Protocol(_))
    }
}

/// A fully reduced datasource descriptor.
///
/// # Examples
///
/// ```
/// use mysqltest::dsn::{Datasource, DatasourceOption, Protocol};
///
/// let ds = Datasource::from_options([
///     DatasourceOption::Dbname("test".into()),
///     DatasourceOption::User("root".into()),
///     DatasourceOption::Protocol(Protocol::Unix),
///     DatasourceOption::Socket("/tmp/x.sock".into()),
/// ]);
/// assert_eq!(ds.to_string(), "root:@unix(/tmp/x.sock)/test");
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Datasource {
    protocol: Protocol,
    socket: Option<PathBuf>,
    host: String,
    port: u16,
    dbname: String,
    user: String,
    password: String,
    parse_time: Option<bool>,
    multi_statements: Option<bool>,
}

impl Default for Datasource {
    fn default() -> Self {
        Self {
            protocol: Protocol::Tcp,
            socket: None,
            host: "localhost".to_string(),
            port: 3306,
            dbname: "test".to_string(),
            user: "root".to_string(),
            password: String::new(),
            parse_time: None,
            multi_statements: None,
        }
    }
}

impl Datasource {
    /// Reduce a sequence of options over the defaults.
    #[must_use]
    pub fn from_options(options: impl IntoIterator<Item = DatasourceOption>) -> Self {
        let mut ds = Self::default();
        for option in options {
            ds.apply(option);
        }
        ds
    }

    /// Apply a single option, replacing any earlier value.
    pub fn apply(&mut self, option: DatasourceOption) {
        match option {
            DatasourceOption::Protocol(protocol) => self.protocol = protocol,
            DatasourceOption::Socket(socket) => self.socket = Some(socket),
            DatasourceOption::Host(host) => self.host = host,
            DatasourceOption::Port(port) => self.port = port,
            DatasourceOption::Dbname(dbname) => self.dbname = dbname,
            DatasourceOption::User(user) => self.user = user,
            DatasourceOption::Password(password) => self.password = password,
            DatasourceOption::ParseTime(value) => self.parse_time = Some(value),
            DatasourceOption::MultiStatements(value) => self.multi_statements = Some(value),
        }
    }

    /// Builder form of [`apply`](Self::apply).
    #[must_use]
    pub fn with(mut self, option: DatasourceOption) -> Self {
        self.apply(option);
        self
    }

    /// The connection protocol.
    #[must_use]
    pub const fn protocol(&self) -> Protocol {
        self.protocol
    }

    /// The socket path, if one was given.
    #[must_use]
    pub fn socket(&self) -> Option<&Path> {
        self.socket.as_deref()
    }

    /// The TCP host.
    #[must_use]
    pub fn host(&self) -> &str {
        &self.host
    }

    /// The TCP port.
    #[must_use]
    pub const fn port(&self) -> u16 {
        self.port
    }

    /// The database name.
    #[must_use]
    pub fn dbname(&self) -> &str {
        &self.dbname
    }

    /// The user name.
    #[must_use]
    pub fn user(&self) -> &str {
        &self.user
    }

    /// The password; empty means none.
    #[must_use]
    pub fn password(&self) -> &str {
        &self.password
    }

    /// The `parseTime` flag, if set.
    #[must_use]
    pub const fn parse_time(&self) -> Option<bool> {
        self.parse_time
    }

    /// The `multiStatements` flag, if set.
    #[must_use]
    pub const fn multi_statements(&self) -> Option<bool> {
        self.multi_statements
    }

    /// The address part alone: `unix(<socket>)` or `tcp(<host>:<port>)`.
    ///
    /// # Examples
    ///
    /// ```
    /// use mysqltest::dsn::Datasource;
    ///
    /// assert_eq!(Datasource::default().address(), "tcp(localhost:3306)");
    /// ```
    #[must_use]
    pub fn address(&self) -> String {
        match self.protocol {
            Protocol::Unix => format!(
                "unix({})",
                self.socket
                    .as_deref()
                    .map(|s| s.display().to_string())
                    .unwrap_or_default()
            ),
            Protocol::Tcp => format!("tcp({}:{})", self.host, self.port),
        }
    }

    /// Query parameters that were set, sorted by name.
    fn query(&self) -> Vec<(&'static str, bool)> {
        let mut params = Vec::with_capacity(2);
        if let Some(value) = self.multi_statements {
            params.push(("multiStatements", value));
        }
        if let Some(value) = self.parse_time {
            params.push(("parseTime", value));
        }
        params
    }
}

impl fmt::Display for Datasource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}:{}@{}/{}",
            self.user,
            self.password,
            self.address(),
            self.dbname
        )?;

        let query = self.query();
        for (i, (name, value)) in query.iter().enumerate() {
            let sep = if i == 0 { '?' } else { '&' };
            write!(f, "{sep}{name}={value}")?;
        }
        Ok(())
    }
}

/// Render a DSN string from a sequence of options.
///
/// # Examples
///
/// ```
/// use mysqltest::dsn::{datasource, DatasourceOption};
///
/// let dsn = datasource([
///     DatasourceOption::Host("localhost".into()),
///     DatasourceOption::Port(3306),
///     DatasourceOption::ParseTime(true),
/// ]);
/// assert_eq!(dsn, "root:@tcp(localhost:3306)/test?parseTime=true");
/// ```
#[must_use]
pub fn datasource(options: impl IntoIterator<Item = DatasourceOption>) -> String {
    Datasource::from_options(options).to_string()
}
