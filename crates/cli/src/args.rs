//! Command-line surface of the `querycontext` binary.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use contract::HttpMethod;

/// Default location of the persisted cookie map.
pub const DEFAULT_COOKIE_FILE: &str = ".querycontext/cookies.json";

#[derive(Parser, Debug)]
#[command(name = "querycontext")]
#[command(about = "Authenticated backend calls with normalised JSON output", long_about = None)]
pub struct CliConfig {
    /// Backend base URL; falls back to BACKEND_URL, then NEXT_PUBLIC_BAKEND_URL
    #[arg(long, global = true, env = "BACKEND_URL")]
    pub base_url: Option<String>,

    /// JSON file holding persisted cookies, including the auth token
    #[arg(long, global = true, env = "QUERYCONTEXT_COOKIE_FILE", default_value = DEFAULT_COOKIE_FILE)]
    pub cookie_file: PathBuf,

    /// Per-request timeout in seconds
    #[arg(
        long,
        global = true,
        env = "BACKEND_TIMEOUT_SECS",
        value_parser = clap::value_parser!(u64).range(1..)
    )]
    pub timeout_secs: Option<u64>,

    /// Log output format on stderr
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Pretty)]
    pub log_format: LogFormat,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum LogFormat {
    Pretty,
    Json,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Read an endpoint with GET
    Get {
        /// Path relative to the base URL, query string included
        endpoint: String,
    },
    /// Send a mutation and announce it to cache listeners
    Mutate(MutateArgs),
    /// Ask the backend who the stored token belongs to
    Session,
    /// Log in and store the returned token
    Login(LoginArgs),
    /// Manage the stored auth token
    #[command(subcommand)]
    Token(TokenAction),
}

#[derive(Args, Debug)]
pub struct MutateArgs {
    /// Path relative to the base URL
    pub endpoint: String,

    /// HTTP method
    #[arg(long, value_enum, default_value_t = MutateMethod::Post)]
    pub method: MutateMethod,

    /// JSON body text
    #[arg(long, conflicts_with_all = ["field", "file"])]
    pub json: Option<String>,

    /// Multipart text field, as name=value
    #[arg(long, value_parser = parse_pair)]
    pub field: Vec<(String, String)>,

    /// Multipart file field, as name=path
    #[arg(long, value_parser = parse_file_pair)]
    pub file: Vec<(String, PathBuf)>,
}

#[derive(Args, Debug)]
pub struct LoginArgs {
    /// Account email
    pub email: String,

    /// Account password
    #[arg(long, env = "QUERYCONTEXT_PASSWORD", hide_env_values = true)]
    pub password: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum MutateMethod {
    Post,
    Put,
    Delete,
}

impl From<MutateMethod> for HttpMethod {
    fn from(method: MutateMethod) -> Self {
        match method {
            MutateMethod::Post => HttpMethod::Post,
            MutateMethod::Put => HttpMethod::Put,
            MutateMethod::Delete => HttpMethod::Delete,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum TokenAction {
    /// Store a new auth token
    Set { value: String },
    /// Print the stored auth token
    Get,
    /// Forget the stored auth token
    Delete,
}

fn parse_pair(raw: &str) -> Result<(String, String), String> {
    match raw.split_once('=') {
        Some((name, value)) if !name.trim().is_empty() => {
            Ok((name.trim().to_owned(), value.to_owned()))
        }
        _ => Err(format!("expected name=value, got `{raw}`")),
    }
}

fn parse_file_pair(raw: &str) -> Result<(String, PathBuf), String> {
    parse_pair(raw).map(|(name, path)| (name, PathBuf::from(path)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        CliConfig::command().debug_assert();
    }

    #[test]
    fn pair_keeps_equals_in_value() {
        assert_eq!(
            parse_pair("token=a=b").unwrap(),
            ("token".to_owned(), "a=b".to_owned())
        );
        assert!(parse_pair("novalue").is_err());
        assert!(parse_pair("=x").is_err());
    }

    #[test]
    fn mutate_collects_fields_and_files() {
        let cli = CliConfig::try_parse_from([
            "querycontext",
            "--base-url",
            "http://localhost:8000",
            "mutate",
            "/api/auth/update-profile/",
            "--method",
            "put",
            "--field",
            "prenom=John",
            "--file",
            "photo_profile=me.png",
        ])
        .unwrap();

        let Command::Mutate(args) = cli.command else {
            panic!("expected mutate");
        };
        assert_eq!(HttpMethod::from(args.method), HttpMethod::Put);
        assert_eq!(args.field, vec![("prenom".to_owned(), "John".to_owned())]);
        assert_eq!(args.file[0].1, PathBuf::from("me.png"));
        assert_eq!(cli.base_url.as_deref(), Some("http://localhost:8000"));
    }

    #[test]
    fn json_and_fields_are_exclusive() {
        let parsed = CliConfig::try_parse_from([
            "querycontext",
            "mutate",
            "/api/x",
            "--json",
            "{}",
            "--field",
            "a=b",
        ]);
        assert!(parsed.is_err());
    }

    #[test]
    fn zero_timeout_is_rejected_at_parse_time() {
        let parsed = CliConfig::try_parse_from(["querycontext", "--timeout-secs", "0", "session"]);
        assert!(parsed.is_err());

        let cli =
            CliConfig::try_parse_from(["querycontext", "--timeout-secs", "30", "session"]).unwrap();
        assert_eq!(cli.timeout_secs, Some(30));
    }

    #[test]
    fn login_takes_email_and_password() {
        let cli = CliConfig::try_parse_from([
            "querycontext",
            "login",
            "a@b.com",
            "--password",
            "secret",
        ])
        .unwrap();
        let Command::Login(args) = cli.command else {
            panic!("expected login");
        };
        assert_eq!(args.email, "a@b.com");
        assert_eq!(args.password, "secret");
    }

    #[test]
    fn token_subcommands_parse() {
        let cli = CliConfig::try_parse_from(["querycontext", "token", "set", "abc"]).unwrap();
        assert!(matches!(cli.command, Command::Token(TokenAction::Set { ref value }) if value == "abc"));
        assert_eq!(cli.log_format, LogFormat::Pretty);
    }
}
