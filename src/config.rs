use anyhow::{Context, Result};
use clap::Parser;
use serde::Deserialize;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Parser, Debug)]
#[command(name = "bibliotheca")]
#[command(about = "Runs the bibliotheca catalog service", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    /// Overrides `app.database` from the config file
    #[arg(short = 'd', long = "database")]
    pub database: Option<String>,

    /// Overrides `app.port` from the config file
    #[arg(short = 'p', long = "port")]
    pub port: Option<u16>,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".bibliotheca")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone, PartialEq)]
pub struct App {
    #[serde(default = "default_database")]
    database: String,
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,
}

fn default_database() -> String {
    "library.sqlite".to_string()
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5002
}

impl Default for App {
    fn default() -> Self {
        App {
            database: default_database(),
            host: default_host(),
            port: default_port(),
        }
    }
}

impl App {
    pub fn get_db(&self) -> &str {
        &self.database
    }

    pub fn get_host(&self) -> &str {
        &self.host
    }

    pub fn get_port(&self) -> u16 {
        self.port
    }

    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Resolves the database location against `data_dir` unless it is already absolute.
    pub fn database_path(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(&self.database)
    }
}

#[derive(Debug, Deserialize, Default, Clone, PartialEq)]
pub struct Config {
    #[serde(default)]
    pub app: App,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let cfg = Config::load_config(path)?;
        Ok(cfg)
    }

    /// Loads `path` if it exists, otherwise returns the built-in defaults.
    pub fn new_or_default(path: &Path) -> Result<Self> {
        if path.exists() {
            let path = path
                .to_str()
                .with_context(|| format!("config path {:?} is not valid UTF-8", path))?;
            return Config::new(path);
        }
        tracing::info!(path = ?path, "no config file found, using defaults");
        Ok(Config::default())
    }

    pub fn apply_cli(&mut self, cli: &Cli) {
        if let Some(database) = &cli.database {
            self.app.database = database.clone();
        }
        if let Some(port) = cli.port {
            self.app.port = port;
        }
    }

    fn load_config(path: &str) -> Result<Config> {
        let yaml_str = fs::read_to_string(path).with_context(|| format!("failed to read config {path}"))?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Config> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        Ok(config)
    }

    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut result = yaml_str.to_string();
        let mut offset = 0;

        while let Some(start) = result[offset..].find("${") {
            let actual_start = offset + start;
            if let Some(end) = result[actual_start..].find("}") {
                let var_name = &result[actual_start + 2..actual_start + end];

                // ${VAR:-default}
                let env_value = if let Some(default_start) = var_name.find(":-") {
                    let actual_var = &var_name[..default_start];
                    let default_val = &var_name[default_start + 2..];
                    env::var(actual_var).unwrap_or_else(|_| default_val.to_string())
                } else {
                    env::var(var_name).unwrap_or_else(|_| {
                        tracing::warn!("environment variable '{}' not found", var_name);
                        String::new()
                    })
                };

                result.replace_range(actual_start..actual_start + end + 1, &env_value);
                offset = actual_start + env_value.len();
            } else {
                break;
            }
        }

        Ok(result)
    }
}
