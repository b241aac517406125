//! Configuration types.
//!
//! The config file is JSON with a `parser` section (mail account, sender,
//! repository, output location) and an `extractor` section that is passed
//! through untouched to the downstream extractor input.

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

use secrecy::SecretString;
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Environment variable that overrides `parser.passwd`.
pub const PASSWORD_ENV: &str = "INBOX_MINER_PASSWD";

/// Default IMAPS port.
pub const DEFAULT_IMAP_PORT: u16 = 993;

/// Supported mail providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MailHost {
    Gmail,
    Outlook,
    Yahoo,
}

impl MailHost {
    /// IMAP server for this provider.
    pub fn imap_domain(self) -> &'static str {
        match self {
            Self::Gmail => "imap.gmail.com",
            Self::Outlook => "outlook.office365.com",
            Self::Yahoo => "imap.mail.yahoo.com",
        }
    }
}

/// Notification sources the miner knows about.
///
/// Only GitHub has a corroboration rule. Jira is accepted so configs can name
/// it, but it never yields identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SenderKind {
    Github,
    Jira,
}

impl SenderKind {
    /// Display name used in the IMAP `FROM` search.
    pub fn from_name(self) -> &'static str {
        match self {
            Self::Github => "Github",
            Self::Jira => "Jira",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Self::Github => "github",
            Self::Jira => "jira",
        }
    }
}

/// A repository identifier of the form `owner/name`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RepoSlug {
    owner: String,
    name: String,
}

impl RepoSlug {
    pub fn owner(&self) -> &str {
        &self.owner
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

impl FromStr for RepoSlug {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |message: &str| ConfigError::InvalidValue {
            key: "parser.repo".into(),
            message: format!("{message}: {s:?}"),
        };

        let (owner, name) = s
            .trim()
            .split_once('/')
            .ok_or_else(|| invalid("expected owner/name"))?;

        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(invalid("expected owner/name"));
        }
        if s.chars().any(char::is_whitespace) {
            return Err(invalid("whitespace is not allowed"));
        }

        Ok(Self {
            owner: owner.to_string(),
            name: name.to_string(),
        })
    }
}

impl TryFrom<String> for RepoSlug {
    type Error = ConfigError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<RepoSlug> for String {
    fn from(slug: RepoSlug) -> Self {
        slug.to_string()
    }
}

impl fmt::Display for RepoSlug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.owner, self.name)
    }
}

/// The `parser` section of the config file.
#[derive(Debug, Clone, Deserialize)]
pub struct ParserConfig {
    pub host: MailHost,
    /// Mailbox login (usually the email address).
    pub addr: String,
    #[serde(default)]
    pub passwd: Option<SecretString>,
    pub sender: SenderKind,
    pub repo: RepoSlug,
    pub output_dir: PathBuf,
    #[serde(default = "default_mailbox")]
    pub mailbox: String,
    #[serde(default = "default_imap_port")]
    pub imap_port: u16,
}

fn default_mailbox() -> String {
    "INBOX".to_string()
}

fn default_imap_port() -> u16 {
    DEFAULT_IMAP_PORT
}

/// Full miner configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct MinerConfig {
    pub parser: ParserConfig,
    /// Settings forwarded verbatim to the extractor input.
    #[serde(default = "empty_object")]
    pub extractor: serde_json::Value,
}

fn empty_object() -> serde_json::Value {
    serde_json::Value::Object(serde_json::Map::new())
}

impl MinerConfig {
    /// Parse and validate a config from JSON text, applying [`PASSWORD_ENV`].
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Self::from_json_with_password(text, std::env::var(PASSWORD_ENV).ok())
    }

    /// Like [`from_json`](Self::from_json), with the password override given
    /// explicitly instead of read from the environment.
    pub fn from_json_with_password(
        text: &str,
        password_override: Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config: Self = serde_json::from_str(text)?;
        config.apply_password_override(password_override);
        config.validate()?;
        Ok(config)
    }

    /// Read and validate a config file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_json(&text)
    }

    /// A non-empty override takes precedence over the file's password.
    fn apply_password_override(&mut self, passwd: Option<String>) {
        if let Some(passwd) = passwd.filter(|p| !p.is_empty()) {
            self.parser.passwd = Some(SecretString::from(passwd));
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.parser.addr.trim().is_empty() {
            return Err(ConfigError::MissingRequired {
                key: "parser.addr".into(),
                hint: "Set it to the mailbox login address.".into(),
            });
        }
        if self.parser.passwd.is_none() {
            return Err(ConfigError::MissingRequired {
                key: "parser.passwd".into(),
                hint: format!("Set it in the config file or export {PASSWORD_ENV}."),
            });
        }
        if !self.extractor.is_object() {
            return Err(ConfigError::InvalidValue {
                key: "extractor".into(),
                message: "must be a JSON object".into(),
            });
        }
        Ok(())
    }

    /// Directory the extractor input is written to: `<output_dir>/<repo name>`.
    pub fn repo_output_dir(&self) -> PathBuf {
        self.parser.output_dir.join(self.parser.repo.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::ExposeSecret;

    const SAMPLE: &str = r#"{
        "parser": {
            "host": "gmail",
            "addr": "dev@example.com",
            "passwd": "hunter2",
            "sender": "github",
            "repo": "acme/widget",
            "output_dir": "./out"
        },
        "extractor": { "auth_file": "pat.txt", "fields": ["title"] }
    }"#;

    #[test]
    fn parses_full_config() {
        let config = MinerConfig::from_json(SAMPLE).unwrap();
        assert_eq!(config.parser.host, MailHost::Gmail);
        assert_eq!(config.parser.sender, SenderKind::Github);
        assert_eq!(config.parser.repo.to_string(), "acme/widget");
        assert_eq!(config.parser.mailbox, "INBOX");
        assert_eq!(config.parser.imap_port, 993);
        assert_eq!(config.extractor["auth_file"], "pat.txt");
        assert_eq!(config.repo_output_dir(), PathBuf::from("./out/widget"));
    }

    #[test]
    fn host_domains() {
        assert_eq!(MailHost::Gmail.imap_domain(), "imap.gmail.com");
        assert_eq!(MailHost::Outlook.imap_domain(), "outlook.office365.com");
        assert_eq!(MailHost::Yahoo.imap_domain(), "imap.mail.yahoo.com");
    }

    #[test]
    fn sender_search_names() {
        assert_eq!(SenderKind::Github.from_name(), "Github");
        assert_eq!(SenderKind::Jira.from_name(), "Jira");
    }

    #[test]
    fn unknown_host_is_rejected() {
        let text = SAMPLE.replace("\"gmail\"", "\"aol\"");
        assert!(matches!(
            MinerConfig::from_json(&text),
            Err(ConfigError::ParseError(_))
        ));
    }

    #[test]
    fn repo_slug_parses() {
        let slug: RepoSlug = "acme/widget".parse().unwrap();
        assert_eq!(slug.owner(), "acme");
        assert_eq!(slug.name(), "widget");
    }

    #[test]
    fn repo_slug_rejects_bad_shapes() {
        for bad in ["widget", "/widget", "acme/", "a/b/c", "ac me/widget", ""] {
            assert!(bad.parse::<RepoSlug>().is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn extractor_section_defaults_to_empty_object() {
        let text = r#"{"parser": {"host": "yahoo", "addr": "a@b.c", "passwd": "x",
            "sender": "jira", "repo": "o/n", "output_dir": "/tmp"}}"#;
        let config = MinerConfig::from_json(text).unwrap();
        assert!(config.extractor.as_object().unwrap().is_empty());
    }

    #[test]
    fn non_object_extractor_is_rejected() {
        let text = r#"{"parser": {"host": "yahoo", "addr": "a@b.c", "passwd": "x",
            "sender": "jira", "repo": "o/n", "output_dir": "/tmp"}, "extractor": [1]}"#;
        assert!(matches!(
            MinerConfig::from_json(text),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    fn password(config: &MinerConfig) -> &str {
        config.parser.passwd.as_ref().unwrap().expose_secret()
    }

    #[test]
    fn missing_password_is_reported() {
        let text = SAMPLE.replace("\"passwd\": \"hunter2\",", "");
        match MinerConfig::from_json_with_password(&text, None) {
            Err(ConfigError::MissingRequired { key, .. }) => assert_eq!(key, "parser.passwd"),
            other => panic!("expected MissingRequired, got {other:?}"),
        }
    }

    #[test]
    fn password_override_wins_over_file() {
        let config =
            MinerConfig::from_json_with_password(SAMPLE, Some("from-env".into())).unwrap();
        assert_eq!(password(&config), "from-env");
    }

    #[test]
    fn empty_password_override_is_ignored() {
        let config = MinerConfig::from_json_with_password(SAMPLE, Some(String::new())).unwrap();
        assert_eq!(password(&config), "hunter2");
    }

    #[test]
    fn file_password_used_without_override() {
        let config = MinerConfig::from_json_with_password(SAMPLE, None).unwrap();
        assert_eq!(password(&config), "hunter2");
    }

    #[test]
    fn password_override_fills_missing_file_password() {
        let text = SAMPLE.replace("\"passwd\": \"hunter2\",", "");
        let config = MinerConfig::from_json_with_password(&text, Some("from-env".into())).unwrap();
        assert_eq!(password(&config), "from-env");
    }

    #[test]
    fn password_is_kept_secret() {
        let config = MinerConfig::from_json_with_password(SAMPLE, None).unwrap();
        assert!(!format!("{:?}", config.parser).contains("hunter2"));
    }
}
