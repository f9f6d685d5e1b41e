use clap::{Args, Parser};
use std::fmt;
use std::time::Duration;

/// Runtime configuration for the sales API.
///
/// Every field can be given as a long flag or as a `SALES_`-prefixed
/// environment variable. Flags win over the environment, the environment
/// wins over the defaults.
#[derive(Debug, Clone, Parser)]
#[command(name = "sales-api", about = "Garage sale products API", version)]
pub struct Config {
    #[command(flatten)]
    pub web: WebConfig,

    #[command(flatten)]
    pub db: DbConfig,
}

#[derive(Debug, Clone, Args)]
pub struct WebConfig {
    /// Address the HTTP listener binds to
    #[arg(
        long = "web-address",
        env = "SALES_WEB_ADDRESS",
        default_value = "localhost:8000"
    )]
    pub address: String,

    /// Time allowed for a client to send the request head
    #[arg(
        long = "web-read-timeout",
        env = "SALES_WEB_READ_TIMEOUT",
        default_value = "5s",
        value_parser = parse_duration
    )]
    pub read_timeout: Duration,

    /// Time allowed for a client to drain the response before the connection is dropped
    #[arg(
        long = "web-write-timeout",
        env = "SALES_WEB_WRITE_TIMEOUT",
        default_value = "5s",
        value_parser = parse_duration
    )]
    pub write_timeout: Duration,

    /// Upper bound for draining in-flight requests on shutdown, in whole seconds
    #[arg(
        long = "web-shutdown-timeout",
        env = "SALES_WEB_SHUTDOWN_TIMEOUT",
        default_value = "5s",
        value_parser = parse_whole_seconds
    )]
    pub shutdown_timeout: Duration,
}

#[derive(Clone, Args)]
pub struct DbConfig {
    #[arg(long = "db-user", env = "SALES_DB_USER", default_value = "postgres")]
    pub user: String,

    #[arg(
        long = "db-password",
        env = "SALES_DB_PASSWORD",
        default_value = "postgres",
        hide_default_value = true,
        hide_env_values = true
    )]
    pub password: String,

    /// Database host, optionally with `:port`
    #[arg(long = "db-host", env = "SALES_DB_HOST", default_value = "localhost")]
    pub host: String,

    #[arg(long = "db-name", env = "SALES_DB_NAME", default_value = "postgres")]
    pub name: String,

    /// Connect without TLS (sslmode=disable)
    #[arg(long = "db-disable-tls", env = "SALES_DB_DISABLE_TLS", default_value_t = false)]
    pub disable_tls: bool,
}

// Password stays out of logs and panic messages.
impl fmt::Debug for DbConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DbConfig")
            .field("user", &self.user)
            .field("password", &"<redacted>")
            .field("host", &self.host)
            .field("name", &self.name)
            .field("disable_tls", &self.disable_tls)
            .finish()
    }
}

impl Config {
    /// Loads `.env` (if present) and then parses flags and environment.
    ///
    /// `--help` and parse errors terminate the process through clap, with
    /// exit code 0 and 2 respectively.
    pub fn load() -> Self {
        dotenvy::dotenv().ok();
        Config::parse()
    }
}

impl fmt::Display for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "--web-address={} --web-read-timeout={:?} --web-write-timeout={:?} \
             --web-shutdown-timeout={:?} --db-user={} --db-host={} --db-name={} \
             --db-disable-tls={}",
            self.web.address,
            self.web.read_timeout,
            self.web.write_timeout,
            self.web.shutdown_timeout,
            self.db.user,
            self.db.host,
            self.db.name,
            self.db.disable_tls,
        )
    }
}

/// Parses durations such as `250ms`, `5s`, `2m` or `1h`. A bare number is seconds.
pub fn parse_duration(value: &str) -> Result<Duration, String> {
    let value = value.trim();
    let unit_start = value
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(value.len());
    let (digits, unit) = value.split_at(unit_start);

    let amount: u64 = digits
        .parse()
        .map_err(|_| format!("invalid duration `{}`", value))?;

    let duration = match unit {
        "" | "s" => Some(Duration::from_secs(amount)),
        "ms" => Some(Duration::from_millis(amount)),
        "m" => amount.checked_mul(60).map(Duration::from_secs),
        "h" => amount.checked_mul(3600).map(Duration::from_secs),
        other => return Err(format!("unknown unit `{}` in duration `{}`", other, value)),
    }
    .ok_or_else(|| format!("duration `{}` is too large", value))?;

    if duration.is_zero() {
        return Err(format!("duration `{}` must be greater than zero", value));
    }

    Ok(duration)
}

/// Like [`parse_duration`], but the result must be a whole number of seconds.
///
/// The HTTP server only enforces its shutdown deadline at second granularity.
pub fn parse_whole_seconds(value: &str) -> Result<Duration, String> {
    let duration = parse_duration(value)?;
    if duration.subsec_nanos() != 0 {
        return Err(format!(
            "duration `{}` must be a whole number of seconds",
            value.trim()
        ));
    }
    Ok(duration)
}
