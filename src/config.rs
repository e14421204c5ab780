//! Provides the CLI option parser
//!
//! Used to parse argv, an optional config file and the environment into a
//! struct that the server or agent can consume as configuration data. Later
//! sources win: defaults, then the config file, then flags, then the
//! environment.

use agent::Format;
use clap::{App, Arg, ArgMatches};
use constants::{ADDRESS_ENV, DEFAULT_ADDRESS, DEFAULT_POLL_INTERVAL, DEFAULT_REPORT_INTERVAL,
                DEFAULT_WORKERS, POLL_INTERVAL_ENV, REPORT_INTERVAL_ENV};
use std::env;
use std::error;
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::str::FromStr;
use std::time::Duration;
use toml;

const VERSION: Option<&'static str> = option_env!("CARGO_PKG_VERSION");

fn default_version() -> String {
    VERSION.unwrap_or("unknown").to_string()
}

/// Configuration errors
#[derive(Debug, PartialEq)]
pub enum Error {
    /// The config file could not be read.
    Io(String),
    /// The config file is not valid TOML.
    Parse(String),
    /// A setting has the wrong type or an unacceptable value.
    Invalid(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            Error::Io(ref e) => write!(f, "could not read config file: {}", e),
            Error::Parse(ref e) => write!(f, "could not parse config file: {}", e),
            Error::Invalid(ref e) => write!(f, "invalid configuration: {}", e),
        }
    }
}

impl error::Error for Error {}

/// Configuration of the `tallyd` server.
#[derive(Debug, Clone, PartialEq)]
pub struct ServerArgs {
    /// The `host:port` to listen on.
    pub address: String,
    /// Number of HTTP worker threads.
    pub workers: usize,
    /// The verbosity setting. The higher the value the more chatty
    /// tallyd gets.
    pub verbose: u64,
    /// Version string. This is set automatically.
    pub version: String,
}

impl Default for ServerArgs {
    fn default() -> Self {
        ServerArgs {
            address: DEFAULT_ADDRESS.to_string(),
            workers: DEFAULT_WORKERS,
            verbose: 0,
            version: default_version(),
        }
    }
}

impl ServerArgs {
    /// Reject settings the server cannot start with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.address.trim().is_empty() {
            return Err(Error::Invalid("address must not be empty".into()));
        }
        if self.workers == 0 {
            return Err(Error::Invalid("workers must be at least 1".into()));
        }
        Ok(())
    }
}

/// Configuration of the `tallyd-agent` reporter.
#[derive(Debug, Clone, PartialEq)]
pub struct AgentArgs {
    /// The `host:port` of the collector, optionally with a scheme.
    pub address: String,
    /// Seconds between samples.
    pub poll_interval: u64,
    /// Seconds between reports. Must not be shorter than `poll_interval`.
    pub report_interval: u64,
    /// How samples are put on the wire.
    pub format: Format,
    /// Gzip JSON bodies. Ignored by the path format.
    pub compress: bool,
    /// The verbosity setting.
    pub verbose: u64,
    /// Version string. This is set automatically.
    pub version: String,
}

impl Default for AgentArgs {
    fn default() -> Self {
        AgentArgs {
            address: DEFAULT_ADDRESS.to_string(),
            poll_interval: DEFAULT_POLL_INTERVAL,
            report_interval: DEFAULT_REPORT_INTERVAL,
            format: Format::default(),
            compress: true,
            verbose: 0,
            version: default_version(),
        }
    }
}

impl AgentArgs {
    /// Reject settings the agent cannot run with.
    pub fn validate(&self) -> Result<(), Error> {
        if self.address.trim().is_empty() {
            return Err(Error::Invalid("address must not be empty".into()));
        }
        if self.poll_interval == 0 {
            return Err(Error::Invalid("poll-interval must be positive".into()));
        }
        if self.report_interval == 0 {
            return Err(Error::Invalid("report-interval must be positive".into()));
        }
        if self.report_interval < self.poll_interval {
            return Err(Error::Invalid(format!(
                "report-interval ({}s) is shorter than poll-interval ({}s)",
                self.report_interval, self.poll_interval
            )));
        }
        Ok(())
    }

    /// `poll_interval` as a `Duration`.
    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval)
    }

    /// `report_interval` as a `Duration`.
    pub fn report_interval(&self) -> Duration {
        Duration::from_secs(self.report_interval)
    }
}

fn config_file_arg() -> Arg<'static, 'static> {
    Arg::with_name("config-file")
        .long("config")
        .short("C")
        .value_name("config")
        .help("The config file to feed in.")
        .takes_value(true)
}

fn address_arg(help: &'static str) -> Arg<'static, 'static> {
    Arg::with_name("address")
        .long("address")
        .short("a")
        .value_name("host:port")
        .help(help)
        .takes_value(true)
}

fn verbose_arg() -> Arg<'static, 'static> {
    Arg::with_name("verbose")
        .short("v")
        .multiple(true)
        .help("Turn on verbose output.")
}

/// The command line of `tallyd`.
pub fn server_app() -> App<'static, 'static> {
    App::new("tallyd")
        .version(VERSION.unwrap_or("unknown"))
        .about("collects and serves counter and gauge metrics over HTTP")
        .arg(config_file_arg())
        .arg(address_arg("Address to listen on."))
        .arg(
            Arg::with_name("workers")
                .long("workers")
                .short("w")
                .value_name("count")
                .help("Number of HTTP worker threads.")
                .takes_value(true),
        )
        .arg(verbose_arg())
}

/// The command line of `tallyd-agent`.
pub fn agent_app() -> App<'static, 'static> {
    App::new("tallyd-agent")
        .version(VERSION.unwrap_or("unknown"))
        .about("samples process metrics and reports them to tallyd")
        .arg(config_file_arg())
        .arg(address_arg("Address of the tallyd collector."))
        .arg(
            Arg::with_name("poll-interval")
                .long("poll-interval")
                .short("p")
                .value_name("seconds")
                .help("Seconds between samples.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("report-interval")
                .long("report-interval")
                .short("r")
                .value_name("seconds")
                .help("Seconds between reports.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("format")
                .long("format")
                .short("f")
                .possible_values(&["json", "path"])
                .help("How metrics are sent to the collector.")
                .takes_value(true),
        )
        .arg(
            Arg::with_name("no-compress")
                .long("no-compress")
                .help("Do not gzip JSON reports."),
        )
        .arg(verbose_arg())
}

/// Parse the `tallyd` arguments from the process command line and
/// environment.
pub fn parse_server_args() -> Result<ServerArgs, Error> {
    server_args_from(&server_app().get_matches(), |k| env::var(k).ok())
}

/// Parse the `tallyd-agent` arguments from the process command line and
/// environment.
pub fn parse_agent_args() -> Result<AgentArgs, Error> {
    agent_args_from(&agent_app().get_matches(), |k| env::var(k).ok())
}

fn read_config_file(path: &str) -> Result<String, Error> {
    let mut fp = File::open(path).map_err(|e| Error::Io(format!("{}: {}", path, e)))?;
    let mut buffer = String::new();
    fp.read_to_string(&mut buffer)
        .map_err(|e| Error::Io(format!("{}: {}", path, e)))?;
    Ok(buffer)
}

fn parse_number<T>(name: &str, raw: &str) -> Result<T, Error>
where
    T: FromStr,
{
    raw.trim()
        .parse::<T>()
        .map_err(|_| Error::Invalid(format!("{} must be a non-negative integer, got {:?}", name, raw)))
}

/// An environment variable that is set but empty counts as unset.
fn non_empty<F>(env: &F, key: &str) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    env(key).filter(|v| !v.trim().is_empty())
}

fn toml_table(buffer: &str) -> Result<toml::Value, Error> {
    toml::from_str(buffer).map_err(|e| Error::Parse(e.to_string()))
}

fn toml_string(value: &toml::Value, key: &str) -> Result<Option<String>, Error> {
    match value.get(key) {
        None => Ok(None),
        Some(v) => v.as_str()
            .map(|s| Some(s.to_string()))
            .ok_or_else(|| Error::Invalid(format!("{} must be a string", key))),
    }
}

fn toml_u64(value: &toml::Value, key: &str) -> Result<Option<u64>, Error> {
    match value.get(key) {
        None => Ok(None),
        Some(v) => match v.as_integer() {
            Some(i) if i >= 0 => Ok(Some(i as u64)),
            _ => Err(Error::Invalid(format!(
                "{} must be a non-negative integer",
                key
            ))),
        },
    }
}

fn toml_bool(value: &toml::Value, key: &str) -> Result<Option<bool>, Error> {
    match value.get(key) {
        None => Ok(None),
        Some(v) => v.as_bool()
            .map(Some)
            .ok_or_else(|| Error::Invalid(format!("{} must be a boolean", key))),
    }
}

fn server_from_toml(buffer: &str) -> Result<ServerArgs, Error> {
    let mut args = ServerArgs::default();
    let value = toml_table(buffer)?;

    if let Some(address) = toml_string(&value, "address")? {
        args.address = address;
    }
    if let Some(workers) = toml_u64(&value, "workers")? {
        args.workers = workers as usize;
    }
    Ok(args)
}

fn agent_from_toml(buffer: &str) -> Result<AgentArgs, Error> {
    let mut args = AgentArgs::default();
    let value = toml_table(buffer)?;

    if let Some(address) = toml_string(&value, "address")? {
        args.address = address;
    }
    if let Some(poll) = toml_u64(&value, "poll-interval")? {
        args.poll_interval = poll;
    }
    if let Some(report) = toml_u64(&value, "report-interval")? {
        args.report_interval = report;
    }
    if let Some(format) = toml_string(&value, "format")? {
        args.format = format.parse().map_err(Error::Invalid)?;
    }
    if let Some(compress) = toml_bool(&value, "compress")? {
        args.compress = compress;
    }
    Ok(args)
}

/// Parse a `tallyd` configuration file.
///
/// ```toml
/// address = "0.0.0.0:8080"
/// workers = 8
/// ```
pub fn parse_server_config_file(buffer: &str) -> Result<ServerArgs, Error> {
    let args = server_from_toml(buffer)?;
    args.validate()?;
    Ok(args)
}

/// Parse a `tallyd-agent` configuration file.
///
/// ```toml
/// address = "localhost:8080"
/// poll-interval = 2
/// report-interval = 10
/// format = "json"
/// compress = true
/// ```
pub fn parse_agent_config_file(buffer: &str) -> Result<AgentArgs, Error> {
    let args = agent_from_toml(buffer)?;
    args.validate()?;
    Ok(args)
}

/// Build `ServerArgs` from parsed flags and an environment lookup.
pub fn server_args_from<F>(matches: &ArgMatches, env: F) -> Result<ServerArgs, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let mut args = match matches.value_of("config-file") {
        Some(path) => server_from_toml(&read_config_file(path)?)?,
        None => ServerArgs::default(),
    };

    if let Some(address) = matches.value_of("address") {
        args.address = address.to_string();
    }
    if let Some(workers) = matches.value_of("workers") {
        args.workers = parse_number("workers", workers)?;
    }
    args.verbose = matches.occurrences_of("verbose");

    if let Some(address) = non_empty(&env, ADDRESS_ENV) {
        args.address = address;
    }

    args.validate()?;
    Ok(args)
}

/// Build `AgentArgs` from parsed flags and an environment lookup.
pub fn agent_args_from<F>(matches: &ArgMatches, env: F) -> Result<AgentArgs, Error>
where
    F: Fn(&str) -> Option<String>,
{
    let mut args = match matches.value_of("config-file") {
        Some(path) => agent_from_toml(&read_config_file(path)?)?,
        None => AgentArgs::default(),
    };

    if let Some(address) = matches.value_of("address") {
        args.address = address.to_string();
    }
    if let Some(poll) = matches.value_of("poll-interval") {
        args.poll_interval = parse_number("poll-interval", poll)?;
    }
    if let Some(report) = matches.value_of("report-interval") {
        args.report_interval = parse_number("report-interval", report)?;
    }
    if let Some(format) = matches.value_of("format") {
        args.format = format.parse().map_err(Error::Invalid)?;
    }
    if matches.is_present("no-compress") {
        args.compress = false;
    }
    args.verbose = matches.occurrences_of("verbose");

    if let Some(address) = non_empty(&env, ADDRESS_ENV) {
        args.address = address;
    }
    if let Some(poll) = non_empty(&env, POLL_INTERVAL_ENV) {
        args.poll_interval = parse_number(POLL_INTERVAL_ENV, &poll)?;
    }
    if let Some(report) = non_empty(&env, REPORT_INTERVAL_ENV) {
        args.report_interval = parse_number(REPORT_INTERVAL_ENV, &report)?;
    }

    args.validate()?;
    Ok(args)
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashMap;
    use std::fs::File;
    use std::io::Write;
    use tempdir::TempDir;

    fn no_env(_: &str) -> Option<String> {
        None
    }

    #[test]
    fn config_file_server_defaults() {
        let args = parse_server_config_file("").unwrap();
        assert_eq!(args.address, "localhost:8080");
        assert_eq!(args.workers, 4);
    }

    #[test]
    fn config_file_server() {
        let config = r#"
address = "0.0.0.0:9000"
workers = 16
"#;
        let args = parse_server_config_file(config).unwrap();
        assert_eq!(args.address, "0.0.0.0:9000");
        assert_eq!(args.workers, 16);
    }

    #[test]
    fn config_file_server_zero_workers() {
        let config = r#"
workers = 0
"#;
        assert!(parse_server_config_file(config).is_err());
    }

    #[test]
    fn config_file_agent_defaults() {
        let args = parse_agent_config_file("").unwrap();
        assert_eq!(args.address, "localhost:8080");
        assert_eq!(args.poll_interval, 2);
        assert_eq!(args.report_interval, 10);
        assert_eq!(args.format, Format::Json);
        assert!(args.compress);
        assert_eq!(args.poll_interval(), Duration::from_secs(2));
    }

    #[test]
    fn config_file_agent() {
        let config = r#"
address = "http://collector:9090"
poll-interval = 1
report-interval = 5
format = "path"
compress = false
"#;
        let args = parse_agent_config_file(config).unwrap();
        assert_eq!(args.address, "http://collector:9090");
        assert_eq!(args.poll_interval, 1);
        assert_eq!(args.report_interval, 5);
        assert_eq!(args.format, Format::Path);
        assert!(!args.compress);
    }

    #[test]
    fn config_file_agent_rejects_bad_intervals() {
        let zero = r#"
poll-interval = 0
"#;
        assert!(parse_agent_config_file(zero).is_err());

        let backwards = r#"
poll-interval = 10
report-interval = 2
"#;
        match parse_agent_config_file(backwards) {
            Err(Error::Invalid(_)) => {}
            other => panic!("unexpected {:?}", other),
        }

        let negative = r#"
report-interval = -1
"#;
        assert!(parse_agent_config_file(negative).is_err());
    }

    #[test]
    fn config_file_agent_rejects_wrong_types() {
        assert!(parse_agent_config_file("address = 12").is_err());
        assert!(parse_agent_config_file("compress = \"yes\"").is_err());
        assert!(parse_agent_config_file("format = \"xml\"").is_err());
    }

    #[test]
    fn config_file_not_toml() {
        match parse_agent_config_file("this is [not toml") {
            Err(Error::Parse(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn config_file_empty_address() {
        assert!(parse_server_config_file("address = \"\"").is_err());
        assert!(parse_agent_config_file("address = \"  \"").is_err());
    }

    #[test]
    fn server_flags_override_defaults() {
        let matches = server_app().get_matches_from(vec![
            "tallyd", "-a", "127.0.0.1:7000", "-w", "2", "-vv",
        ]);
        let args = server_args_from(&matches, no_env).unwrap();
        assert_eq!(args.address, "127.0.0.1:7000");
        assert_eq!(args.workers, 2);
        assert_eq!(args.verbose, 2);
    }

    #[test]
    fn env_overrides_flags() {
        let matches =
            server_app().get_matches_from(vec!["tallyd", "-a", "127.0.0.1:7000"]);
        let args = server_args_from(&matches, |k| {
            if k == "ADDRESS" {
                Some("127.0.0.1:7001".to_string())
            } else {
                None
            }
        }).unwrap();
        assert_eq!(args.address, "127.0.0.1:7001");
    }

    #[test]
    fn agent_precedence_file_flags_env() {
        let dir = TempDir::new("tallyd").unwrap();
        let path = dir.path().join("agent.toml");
        let mut fp = File::create(&path).unwrap();
        fp.write_all(
            br#"
address = "file:1"
poll-interval = 3
report-interval = 30
format = "path"
"#,
        ).unwrap();
        fp.sync_all().unwrap();

        let matches = agent_app().get_matches_from(vec![
            "tallyd-agent",
            "-C",
            path.to_str().unwrap(),
            "-a",
            "flag:2",
            "-p",
            "4",
            "--no-compress",
        ]);

        let mut env = HashMap::new();
        env.insert("REPORT_INTERVAL", "40".to_string());
        let args = agent_args_from(&matches, |k| env.get(k).cloned()).unwrap();

        assert_eq!(args.address, "flag:2");
        assert_eq!(args.poll_interval, 4);
        assert_eq!(args.report_interval, 40);
        assert_eq!(args.format, Format::Path);
        assert!(!args.compress);
    }

    #[test]
    fn empty_env_is_ignored() {
        let matches = agent_app().get_matches_from(vec![
            "tallyd-agent", "-a", "127.0.0.1:7000", "-p", "3",
        ]);
        let args = agent_args_from(&matches, |_| Some(String::new())).unwrap();
        assert_eq!(args.address, "127.0.0.1:7000");
        assert_eq!(args.poll_interval, 3);
        assert_eq!(args.report_interval, 10);

        let matches = server_app().get_matches_from(vec!["tallyd"]);
        let args = server_args_from(&matches, |_| Some(String::new())).unwrap();
        assert_eq!(args.address, "localhost:8080");
    }

    #[test]
    fn agent_env_must_be_numeric() {
        let matches = agent_app().get_matches_from(vec!["tallyd-agent"]);
        let res = agent_args_from(&matches, |k| {
            if k == "POLL_INTERVAL" {
                Some("soon".to_string())
            } else {
                None
            }
        });
        assert!(res.is_err());
    }

    #[test]
    fn agent_env_report_shorter_than_poll() {
        let matches = agent_app().get_matches_from(vec!["tallyd-agent", "-p", "5"]);
        let res = agent_args_from(&matches, |k| {
            if k == "REPORT_INTERVAL" {
                Some("1".to_string())
            } else {
                None
            }
        });
        assert!(res.is_err());
    }

    #[test]
    fn missing_config_file() {
        let dir = TempDir::new("tallyd").unwrap();
        let path = dir.path().join("absent.toml");
        let matches = server_app()
            .get_matches_from(vec!["tallyd", "-C", path.to_str().unwrap()]);
        match server_args_from(&matches, no_env) {
            Err(Error::Io(_)) => {}
            other => panic!("unexpected {:?}", other),
        }
    }
}
