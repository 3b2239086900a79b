mod file_config;

pub use file_config::{AnnouncementsConfig, FileConfig};

use crate::announcements::{AnnouncementSource, RetryPolicy, DEFAULT_CONTENT_BASE_URL, DEFAULT_ENVIRONMENT};
use anyhow::{anyhow, bail, Result};

/// CLI arguments that can be used for config resolution.
/// This struct mirrors the CLI arguments that can be overridden by TOML config.
#[derive(Debug, Clone, Default)]
pub struct CliConfig {
    pub user_storage_url: Option<String>,
    pub trigger_api_url: Option<String>,
    pub notification_api_url: Option<String>,
    pub request_timeout_sec: u64,
    pub bearer_token: Option<String>,
    pub storage_key: Option<String>,
    pub announcements_space_id: Option<String>,
    pub announcements_access_token: Option<String>,
    pub announcements_environment: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    // Endpoints, required only by the commands that talk to them
    pub user_storage_url: Option<String>,
    pub trigger_api_url: Option<String>,
    pub notification_api_url: Option<String>,
    pub request_timeout_sec: u64,

    // Backend credentials, CLI or environment only
    pub bearer_token: Option<String>,
    pub storage_key: Option<String>,

    pub announcements: AnnouncementsSettings,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnnouncementsSettings {
    pub space_id: Option<String>,
    pub access_token: Option<String>,
    pub environment: String,
    pub base_url: String,
    pub retries: u32,
    pub retry_delay_ms: u64,
    pub attempt_timeout_sec: u64,
}

impl Default for AnnouncementsSettings {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            space_id: None,
            access_token: None,
            environment: DEFAULT_ENVIRONMENT.to_string(),
            base_url: DEFAULT_CONTENT_BASE_URL.to_string(),
            retries: retry.retries,
            retry_delay_ms: retry.retry_delay_ms,
            attempt_timeout_sec: retry.attempt_timeout_secs,
        }
    }
}

impl AnnouncementsSettings {
    /// `None` unless both space id and access token are set.
    pub fn source(&self) -> Option<AnnouncementSource> {
        match (&self.space_id, &self.access_token) {
            (Some(space_id), Some(access_token)) => Some(AnnouncementSource {
                space_id: space_id.clone(),
                access_token: access_token.clone(),
                environment: self.environment.clone(),
                base_url: self.base_url.clone(),
            }),
            _ => None,
        }
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy {
            retries: self.retries,
            retry_delay_ms: self.retry_delay_ms,
            attempt_timeout_secs: self.attempt_timeout_sec,
        }
    }
}

impl AppConfig {
    /// Resolve configuration from CLI arguments and optional TOML file config.
    /// TOML values override CLI values where present.
    pub fn resolve(cli: &CliConfig, file_config: Option<FileConfig>) -> Result<Self> {
        let file = file_config.unwrap_or_default();

        let user_storage_url = file
            .user_storage_url
            .or_else(|| cli.user_storage_url.clone());
        let trigger_api_url = file.trigger_api_url.or_else(|| cli.trigger_api_url.clone());
        let notification_api_url = file
            .notification_api_url
            .or_else(|| cli.notification_api_url.clone());

        for (name, url) in [
            ("user_storage_url", &user_storage_url),
            ("trigger_api_url", &trigger_api_url),
            ("notification_api_url", &notification_api_url),
        ] {
            if let Some(url) = url {
                validate_url(name, url)?;
            }
        }

        let request_timeout_sec = file.request_timeout_sec.unwrap_or(cli.request_timeout_sec);
        if request_timeout_sec == 0 {
            bail!("request_timeout_sec must be greater than zero");
        }

        // Announcement settings - merge file config with CLI and defaults
        let defaults = AnnouncementsSettings::default();
        let ann_file = file.announcements.unwrap_or_default();
        let announcements = AnnouncementsSettings {
            space_id: ann_file
                .space_id
                .or_else(|| cli.announcements_space_id.clone()),
            access_token: ann_file
                .access_token
                .or_else(|| cli.announcements_access_token.clone()),
            environment: ann_file
                .environment
                .or_else(|| cli.announcements_environment.clone())
                .unwrap_or(defaults.environment),
            base_url: ann_file.base_url.unwrap_or(defaults.base_url),
            retries: ann_file.retries.unwrap_or(defaults.retries),
            retry_delay_ms: ann_file.retry_delay_ms.unwrap_or(defaults.retry_delay_ms),
            attempt_timeout_sec: ann_file
                .attempt_timeout_sec
                .unwrap_or(defaults.attempt_timeout_sec),
        };
        validate_url("announcements.base_url", &announcements.base_url)?;
        if announcements.retries == 0 {
            bail!("announcements.retries must be at least 1");
        }
        if announcements.attempt_timeout_sec == 0 {
            bail!("announcements.attempt_timeout_sec must be greater than zero");
        }

        Ok(Self {
            user_storage_url,
            trigger_api_url,
            notification_api_url,
            request_timeout_sec,
            bearer_token: cli.bearer_token.clone(),
            storage_key: cli.storage_key.clone(),
            announcements,
        })
    }

    pub fn require_user_storage_url(&self) -> Result<&str> {
        self.user_storage_url.as_deref().ok_or_else(|| {
            anyhow!("user_storage_url must be specified via --user-storage-url or in config file")
        })
    }

    pub fn require_trigger_api_url(&self) -> Result<&str> {
        self.trigger_api_url.as_deref().ok_or_else(|| {
            anyhow!("trigger_api_url must be specified via --trigger-api-url or in config file")
        })
    }

    pub fn require_notification_api_url(&self) -> Result<&str> {
        self.notification_api_url.as_deref().ok_or_else(|| {
            anyhow!(
                "notification_api_url must be specified via --notification-api-url or in config file"
            )
        })
    }
}

fn validate_url(name: &str, url: &str) -> Result<()> {
    if !(url.starts_with("http://") || url.starts_with("https://")) {
        bail!("{} must be an http(s) URL, got {:?}", name, url);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_cli() -> CliConfig {
        CliConfig {
            user_storage_url: Some("http://cli-storage".to_string()),
            trigger_api_url: Some("http://cli-triggers".to_string()),
            notification_api_url: Some("http://cli-notifications".to_string()),
            request_timeout_sec: 30,
            bearer_token: Some("token".to_string()),
            storage_key: Some("key".to_string()),
            ..Default::default()
        }
    }

    #[test]
    fn test_resolve_cli_only() {
        let config = AppConfig::resolve(&make_cli(), None).unwrap();

        assert_eq!(config.require_user_storage_url().unwrap(), "http://cli-storage");
        assert_eq!(config.require_trigger_api_url().unwrap(), "http://cli-triggers");
        assert_eq!(
            config.require_notification_api_url().unwrap(),
            "http://cli-notifications"
        );
        assert_eq!(config.request_timeout_sec, 30);
        assert_eq!(config.bearer_token.as_deref(), Some("token"));
        assert_eq!(config.announcements, AnnouncementsSettings::default());
        assert!(config.announcements.source().is_none());
    }

    #[test]
    fn test_resolve_toml_overrides_cli() {
        let file_config = FileConfig {
            user_storage_url: Some("https://toml-storage".to_string()),
            request_timeout_sec: Some(5),
            announcements: Some(AnnouncementsConfig {
                space_id: Some("space".to_string()),
                access_token: Some("access".to_string()),
                retries: Some(5),
                ..Default::default()
            }),
            ..Default::default()
        };

        let config = AppConfig::resolve(&make_cli(), Some(file_config)).unwrap();

        // TOML values should override CLI
        assert_eq!(config.user_storage_url.as_deref(), Some("https://toml-storage"));
        assert_eq!(config.request_timeout_sec, 5);
        // CLI value used when TOML doesn't specify
        assert_eq!(config.trigger_api_url.as_deref(), Some("http://cli-triggers"));

        let source = config.announcements.source().unwrap();
        assert_eq!(source.space_id, "space");
        assert_eq!(source.environment, DEFAULT_ENVIRONMENT);
        assert_eq!(config.announcements.retry_policy().retries, 5);
        assert_eq!(config.announcements.retry_policy().retry_delay_ms, 1000);
    }

    #[test]
    fn test_resolve_missing_url_error() {
        let config = AppConfig::resolve(&CliConfig {
            request_timeout_sec: 30,
            ..Default::default()
        }, None)
        .unwrap();
        let err = config.require_user_storage_url().unwrap_err();
        assert!(err.to_string().contains("user_storage_url must be specified"));
    }

    #[test]
    fn test_resolve_invalid_url_error() {
        let cli = CliConfig {
            trigger_api_url: Some("ftp://triggers".to_string()),
            ..make_cli()
        };
        let err = AppConfig::resolve(&cli, None).unwrap_err();
        assert!(err.to_string().contains("trigger_api_url must be an http(s) URL"));
    }

    #[test]
    fn test_resolve_zero_retries_error() {
        let file_config = FileConfig {
            announcements: Some(AnnouncementsConfig {
                retries: Some(0),
                ..Default::default()
            }),
            ..Default::default()
        };
        let err = AppConfig::resolve(&make_cli(), Some(file_config)).unwrap_err();
        assert!(err.to_string().contains("retries must be at least 1"));
    }

    #[test]
    fn test_backend_credentials_ignore_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        std::io::Write::write_all(
            &mut file,
            b"bearer_token = \"from-file\"\nstorage_key = \"from-file\"\n",
        )
        .unwrap();
        let file_config = FileConfig::load(file.path()).unwrap();

        let config = AppConfig::resolve(&make_cli(), Some(file_config)).unwrap();
        assert_eq!(config.bearer_token.as_deref(), Some("token"));
        assert_eq!(config.storage_key.as_deref(), Some("key"));
    }

    #[test]
    fn test_announcement_token_may_come_from_toml() {
        let file_config = FileConfig {
            announcements: Some(AnnouncementsConfig {
                space_id: Some("space".to_string()),
                access_token: Some("file-token".to_string()),
                ..Default::default()
            }),
            ..Default::default()
        };
        let config = AppConfig::resolve(&make_cli(), Some(file_config)).unwrap();
        assert_eq!(config.announcements.source().unwrap().access_token, "file-token");
    }

    #[test]
    fn test_resolve_zero_timeout_error() {
        let cli = CliConfig {
            request_timeout_sec: 0,
            ..make_cli()
        };
        assert!(AppConfig::resolve(&cli, None).is_err());
    }
}
