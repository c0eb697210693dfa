use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JiraConfig {
    pub url: String,
    #[serde(default)]
    pub username: String,
    /// Inline API token. Prefer `token_env`.
    #[serde(default)]
    pub token: Option<String>,
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "JIRA_TOKEN".to_string()
}

impl Default for JiraConfig {
    fn default() -> Self {
        Self {
            url: "http://localhost:8080".to_string(),
            username: String::new(),
            token: None,
            token_env: default_token_env(),
        }
    }
}

impl JiraConfig {
    /// The inline token if set, otherwise the value of `token_env`.
    pub fn token(&self) -> Result<String> {
        if let Some(token) = &self.token {
            return Ok(token.clone());
        }
        match std::env::var(&self.token_env) {
            Ok(token) if !token.is_empty() => Ok(token),
            _ => bail!(
                "No JIRA token: set `jira.token` in the config or export {}",
                self.token_env
            ),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EditorConfig {
    pub program: String,
    pub service: String,
}

impl Default for EditorConfig {
    fn default() -> Self {
        Self {
            program: "9p".to_string(),
            service: "acme".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryConfig {
    pub mine: String,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            mine: "assignee = currentUser() AND resolution = Unresolved order by updated DESC"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub jira: JiraConfig,
    /// Root under which every window name is created.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    #[serde(default)]
    pub prefix: String,
    #[serde(default)]
    pub queries: QueryConfig,
    #[serde(default)]
    pub editor: EditorConfig,
}

fn default_namespace() -> String {
    "/jira".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jira: JiraConfig::default(),
            namespace: default_namespace(),
            prefix: String::new(),
            queries: QueryConfig::default(),
            editor: EditorConfig::default(),
        }
    }
}

impl Config {
    pub fn load(config_path: Option<PathBuf>) -> Result<Self> {
        let path = config_path.unwrap_or_else(Self::default_config_path);

        if path.exists() {
            let content = std::fs::read_to_string(&path)
                .with_context(|| format!("Failed to read config file: {:?}", path))?;
            let config: Config = serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {:?}", path))?;
            Ok(config)
        } else {
            tracing::debug!("no config at {:?}, using defaults", path);
            Ok(Config::default())
        }
    }

    pub fn default_config_path() -> PathBuf {
        if let Some(config_path) = std::env::var_os("ACME_JIRA_CONFIG") {
            PathBuf::from(config_path)
        } else {
            dirs::config_dir()
                .unwrap_or_else(|| PathBuf::from("."))
                .join("acme-jira")
                .join("config.yaml")
        }
    }

    pub fn with_prefix(mut self, prefix: Option<String>) -> Self {
        if let Some(prefix) = prefix {
            self.prefix = prefix;
        }
        self
    }

    /// The normalized path every window title is placed under.
    pub fn window_prefix(&self) -> String {
        crate::utils::join_path(&self.namespace, &self.prefix)
    }
}
