#![forbid(unsafe_code)]

//! Bot settings. Each key resolves from its CLI flag, then its `GTD_*`
//! environment variable, then the YAML file named by `--config`, then the
//! built-in default.

use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const DEFAULT_STORAGE_DIR: &str = ".gtd";
pub const DEFAULT_BOT_NAME: &str = "gtd";

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Config {
    pub site: String,
    pub email: String,
    pub api_key: String,
    pub storage_dir: PathBuf,
    pub bot_name: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Invocation {
    Run(Config),
    Help,
    Version,
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("unknown argument `{0}` (see --help)")]
    UnknownArgument(String),
    #[error("flag {0} needs a value")]
    MissingValue(String),
    #[error("missing setting `{key}`: pass --{flag}, set {env}, or add it to the config file")]
    Missing {
        key: &'static str,
        flag: &'static str,
        env: &'static str,
    },
    #[error("reading {}: {source}", path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parsing {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        source: serde_yaml::Error,
    },
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct FileConfig {
    site: Option<String>,
    email: Option<String>,
    api_key: Option<String>,
    storage_dir: Option<PathBuf>,
    bot_name: Option<String>,
}

#[derive(Debug, Default)]
struct CliArgs {
    config: Option<PathBuf>,
    site: Option<String>,
    email: Option<String>,
    api_key: Option<String>,
    storage_dir: Option<PathBuf>,
    bot_name: Option<String>,
}

pub fn usage() -> &'static str {
    "gtd_bot: GTD assistant for Zulip\n\n\
USAGE:\n\
  gtd_bot [--config FILE] [--site URL] [--email EMAIL] [--api-key KEY]\n\
          [--storage-dir DIR] [--bot-name NAME]\n\
\n\
FLAGS:\n\
  -h, --help       Print this help and exit\n\
  -V, --version    Print version and exit\n\
\n\
ENVIRONMENT:\n\
  GTD_CONFIG, GTD_SITE, GTD_EMAIL, GTD_API_KEY, GTD_STORAGE_DIR, GTD_BOT_NAME\n\
  RUST_LOG (default: info)\n"
}

pub fn version_line() -> String {
    format!("gtd_bot {}", env!("CARGO_PKG_VERSION"))
}

pub fn parse_invocation(
    args: impl IntoIterator<Item = String>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<Invocation, ConfigError> {
    let args = args.into_iter().collect::<Vec<_>>();
    if args.iter().any(|arg| matches!(arg.as_str(), "-h" | "--help")) {
        return Ok(Invocation::Help);
    }
    if args.iter().any(|arg| matches!(arg.as_str(), "-V" | "--version")) {
        return Ok(Invocation::Version);
    }

    let cli = parse_args(args)?;
    let config_path = cli
        .config
        .clone()
        .or_else(|| env("GTD_CONFIG").map(PathBuf::from));
    let file = match config_path {
        Some(path) => load_file(&path)?,
        None => FileConfig::default(),
    };
    resolve(cli, &env, file).map(Invocation::Run)
}

fn parse_args(args: Vec<String>) -> Result<CliArgs, ConfigError> {
    let mut cli = CliArgs::default();
    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        let slot = match arg.as_str() {
            "--config" => {
                cli.config = Some(PathBuf::from(required_value(&arg, args.next())?));
                continue;
            }
            "--storage-dir" => {
                cli.storage_dir = Some(PathBuf::from(required_value(&arg, args.next())?));
                continue;
            }
            "--site" => &mut cli.site,
            "--email" => &mut cli.email,
            "--api-key" => &mut cli.api_key,
            "--bot-name" => &mut cli.bot_name,
            _ => return Err(ConfigError::UnknownArgument(arg)),
        };
        *slot = Some(required_value(&arg, args.next())?);
    }
    Ok(cli)
}

fn required_value(flag: &str, value: Option<String>) -> Result<String, ConfigError> {
    value
        .filter(|value| !value.starts_with("--"))
        .ok_or_else(|| ConfigError::MissingValue(flag.to_string()))
}

fn load_file(path: &Path) -> Result<FileConfig, ConfigError> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    serde_yaml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn resolve(
    cli: CliArgs,
    env: &impl Fn(&str) -> Option<String>,
    file: FileConfig,
) -> Result<Config, ConfigError> {
    let required = |cli: Option<String>,
                    file: Option<String>,
                    key: &'static str,
                    flag: &'static str,
                    env_key: &'static str| {
        cli.or_else(|| env(env_key))
            .or(file)
            .filter(|value| !value.trim().is_empty())
            .ok_or(ConfigError::Missing {
                key,
                flag,
                env: env_key,
            })
    };

    let site = required(cli.site, file.site, "site", "site", "GTD_SITE")?;
    let email = required(cli.email, file.email, "email", "email", "GTD_EMAIL")?;
    let api_key = required(cli.api_key, file.api_key, "api_key", "api-key", "GTD_API_KEY")?;
    let storage_dir = cli
        .storage_dir
        .or_else(|| env("GTD_STORAGE_DIR").map(PathBuf::from))
        .or(file.storage_dir)
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STORAGE_DIR));
    let bot_name = cli
        .bot_name
        .or_else(|| env("GTD_BOT_NAME"))
        .or(file.bot_name)
        .unwrap_or_else(|| DEFAULT_BOT_NAME.to_string());

    Ok(Config {
        site,
        email,
        api_key,
        storage_dir,
        bot_name,
    })
}
