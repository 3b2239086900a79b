use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use notify_sync::announcements::FeatureAnnouncementFetcher;
use notify_sync::config::{AppConfig, CliConfig, FileConfig};
use notify_sync::notifications::{MarkAsReadRequest, StaticAuth, FEATURES_ANNOUNCEMENT};
use notify_sync::triggers::{self, TriggerKind};
use notify_sync::user_storage::{create_hashed_key, UserStorageFeature};
use notify_sync::{NotificationsService, TriggerApiClient, TriggerLifecycleManager, UserStorage, UserStorageClient};

const VERSION: &str = concat!(env!("CARGO_PKG_VERSION"), "-", env!("GIT_HASH"));

#[derive(Parser, Debug)]
#[command(name = "notify-sync", version = VERSION, about = "Sync user storage and on-chain notification triggers")]
struct CliArgs {
    /// Path to a TOML config file. Values there override CLI arguments.
    #[clap(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the user storage API (e.g. https://host/api/v1/userstorage).
    #[clap(long)]
    pub user_storage_url: Option<String>,

    /// Base URL of the trigger API.
    #[clap(long)]
    pub trigger_api_url: Option<String>,

    /// Base URL of the notification API.
    #[clap(long)]
    pub notification_api_url: Option<String>,

    /// Timeout in seconds for backend requests.
    #[clap(long, default_value_t = 30)]
    pub request_timeout_sec: u64,

    /// Bearer token used for every backend request.
    #[clap(long, env = "NOTIFY_SYNC_BEARER_TOKEN", hide_env_values = true)]
    pub bearer_token: Option<String>,

    /// Secret mixed into every hashed key.
    #[clap(long, env = "NOTIFY_SYNC_STORAGE_KEY", hide_env_values = true)]
    pub storage_key: Option<String>,

    #[command(flatten)]
    pub announcements: AnnouncementArgs,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Args, Debug)]
struct AnnouncementArgs {
    /// Content source space id.
    #[clap(long = "announcements-space-id")]
    pub space_id: Option<String>,

    /// Content source access token.
    #[clap(long = "announcements-access-token", env = "NOTIFY_SYNC_ANNOUNCEMENTS_TOKEN", hide_env_values = true)]
    pub access_token: Option<String>,

    /// Content source environment.
    #[clap(long = "announcements-environment")]
    pub environment: Option<String>,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Raw access to user storage feature collections.
    #[command(subcommand)]
    Storage(StorageCommand),

    /// Inspect and change on-chain notification triggers.
    #[command(subcommand)]
    Triggers(TriggersCommand),

    /// Fetch notifications and manage their read state.
    #[command(subcommand)]
    Notifications(NotificationsCommand),

    /// Feature announcements from the content source.
    #[command(subcommand)]
    Announcements(AnnouncementsCommand),
}

#[derive(Subcommand, Debug)]
enum StorageCommand {
    /// Print one entry, or the whole collection when no key is given.
    Get {
        feature: String,
        #[clap(long)]
        key: Option<String>,
        /// Treat --key as an already hashed key.
        #[clap(long)]
        hashed: bool,
    },

    /// Upsert one entry.
    Put {
        feature: String,
        key: String,
        data: String,
        #[clap(long)]
        hashed: bool,
    },

    /// Delete one entry, or the whole collection when no key is given.
    Delete {
        feature: String,
        #[clap(long)]
        key: Option<String>,
        #[clap(long)]
        hashed: bool,
    },
}

#[derive(Subcommand, Debug)]
enum TriggersCommand {
    /// Print every stored trigger.
    List,

    /// Create and enable every trigger for an account.
    EnableAccount { address: String },

    /// Delete every trigger of an account.
    DisableAccount { address: String },

    /// Create and enable a trigger kind on every stored chain.
    EnableKind { kind: TriggerKind },

    /// Delete every trigger of a kind.
    DisableKind { kind: TriggerKind },
}

#[derive(Subcommand, Debug)]
enum NotificationsCommand {
    /// Fetch the merged notification feed.
    Fetch {
        /// Include feature announcements.
        #[clap(long)]
        with_announcements: bool,
    },

    /// Mark notifications as read.
    MarkRead {
        #[clap(required = true)]
        ids: Vec<String>,
        /// The ids are feature announcements, recorded locally only.
        #[clap(long)]
        announcement: bool,
    },
}

#[derive(Subcommand, Debug)]
enum AnnouncementsCommand {
    /// Fetch and render feature announcements.
    Fetch,
}

impl CliArgs {
    fn to_cli_config(&self) -> CliConfig {
        CliConfig {
            user_storage_url: self.user_storage_url.clone(),
            trigger_api_url: self.trigger_api_url.clone(),
            notification_api_url: self.notification_api_url.clone(),
            request_timeout_sec: self.request_timeout_sec,
            bearer_token: self.bearer_token.clone(),
            storage_key: self.storage_key.clone(),
            announcements_space_id: self.announcements.space_id.clone(),
            announcements_access_token: self.announcements.access_token.clone(),
            announcements_environment: self.announcements.environment.clone(),
        }
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn storage_client(config: &AppConfig) -> Result<UserStorageClient> {
    let mut client = UserStorageClient::new(config.require_user_storage_url()?, config.request_timeout_sec)
        .context("Failed to create user storage client")?;
    if let Some(token) = &config.bearer_token {
        client = client.with_bearer_token(token.as_str());
    }
    Ok(client)
}

fn announcement_fetcher(config: &AppConfig) -> Result<FeatureAnnouncementFetcher> {
    FeatureAnnouncementFetcher::new(
        config.announcements.source(),
        config.announcements.retry_policy(),
    )
    .context("Failed to create announcement fetcher")
}

fn build_service(config: &AppConfig) -> Result<NotificationsService> {
    let storage = storage_client(config)?;
    let api = TriggerApiClient::new(
        config.require_trigger_api_url()?,
        config.require_notification_api_url()?,
        config.request_timeout_sec,
    )
    .context("Failed to create trigger API client")?;

    let lifecycle = TriggerLifecycleManager::new(Arc::new(storage), Arc::new(api));
    let auth = StaticAuth::new(config.bearer_token.clone(), config.storage_key.clone());
    Ok(NotificationsService::new(
        lifecycle,
        announcement_fetcher(config)?,
        Arc::new(auth),
    ))
}

/// Hash `key` with the storage key unless it is already hashed.
fn resolve_key(config: &AppConfig, key: &str, hashed: bool) -> Result<String> {
    if hashed {
        return Ok(key.to_string());
    }
    let storage_key = config
        .storage_key
        .as_deref()
        .context("A storage key is required to hash entry keys (--storage-key or NOTIFY_SYNC_STORAGE_KEY)")?;
    Ok(create_hashed_key(key, storage_key))
}

async fn run_storage(config: &AppConfig, command: StorageCommand) -> Result<()> {
    let client = storage_client(config)?;
    match command {
        StorageCommand::Get { feature, key, hashed } => {
            let feature = UserStorageFeature::from(feature.as_str());
            match key {
                Some(key) => {
                    let hashed_key = resolve_key(config, &key, hashed)?;
                    print_json(&client.get_entry(&feature, &hashed_key).await?)?;
                }
                None => print_json(&client.get_all(&feature).await?)?,
            }
        }
        StorageCommand::Put {
            feature,
            key,
            data,
            hashed,
        } => {
            let feature = UserStorageFeature::from(feature.as_str());
            let hashed_key = resolve_key(config, &key, hashed)?;
            client.put(&feature, &hashed_key, &data).await?;
            info!(feature = %feature, "Entry stored");
        }
        StorageCommand::Delete { feature, key, hashed } => {
            let feature = UserStorageFeature::from(feature.as_str());
            match key {
                Some(key) => {
                    let hashed_key = resolve_key(config, &key, hashed)?;
                    client.delete_entry(&feature, &hashed_key).await?;
                }
                None => client.delete_all(&feature).await?,
            }
            info!(feature = %feature, "Deleted");
        }
    }
    Ok(())
}

async fn run_triggers(config: &AppConfig, command: TriggersCommand) -> Result<()> {
    let service = build_service(config)?;
    let snapshot = service.load_triggers().await?;

    let updated = match command {
        TriggersCommand::List => snapshot,
        TriggersCommand::EnableAccount { address } => {
            if snapshot.is_empty() {
                service.create_on_chain_triggers(&[address]).await?
            } else {
                service.update_on_chain_triggers_by_account(&address).await?
            }
        }
        TriggersCommand::DisableAccount { address } => {
            service.delete_on_chain_triggers_by_account(&address).await?
        }
        TriggersCommand::EnableKind { kind } => service.update_on_chain_triggers_by_kind(kind).await?,
        TriggersCommand::DisableKind { kind } => service.delete_on_chain_triggers_by_kind(kind).await?,
    };

    print_json(&triggers::flatten(&updated))
}

async fn run_notifications(config: &AppConfig, command: NotificationsCommand) -> Result<()> {
    let service = build_service(config)?;
    match command {
        NotificationsCommand::Fetch { with_announcements } => {
            service.load_triggers().await?;
            service.set_notifications_enabled(true).await;
            service
                .set_feature_announcements_enabled(with_announcements)
                .await;
            print_json(&service.fetch_and_update_notifications().await)
        }
        NotificationsCommand::MarkRead { ids, announcement } => {
            let notification_type = if announcement {
                FEATURES_ANNOUNCEMENT
            } else {
                "on_chain"
            };
            let requests: Vec<MarkAsReadRequest> = ids
                .into_iter()
                .map(|id| MarkAsReadRequest {
                    id,
                    notification_type: notification_type.to_string(),
                    is_read: false,
                })
                .collect();
            service.mark_notifications_as_read(&requests).await?;
            let read: Vec<String> = service.state().await.read_ids.into_iter().collect();
            print_json(&read)
        }
    }
}

async fn run_announcements(config: &AppConfig, command: AnnouncementsCommand) -> Result<()> {
    match command {
        AnnouncementsCommand::Fetch => {
            let fetcher = announcement_fetcher(config)?;
            if !fetcher.is_configured() {
                anyhow::bail!("Announcements need --announcements-space-id and an access token");
            }
            print_json(&fetcher.get_feature_announcement_notifications().await)
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli_args = CliArgs::parse();

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            EnvFilter::builder()
                .with_default_directive(LevelFilter::INFO.into())
                .with_env_var("LOG_LEVEL")
                .from_env_lossy(),
        )
        .try_init()
        .context("Failed to initialize logging")?;

    let file_config = match &cli_args.config {
        Some(path) => Some(FileConfig::load(path)?),
        None => None,
    };
    let config = AppConfig::resolve(&cli_args.to_cli_config(), file_config)?;
    info!(version = VERSION, "notify-sync starting");

    match cli_args.command {
        Command::Storage(command) => run_storage(&config, command).await,
        Command::Triggers(command) => run_triggers(&config, command).await,
        Command::Notifications(command) => run_notifications(&config, command).await,
        Command::Announcements(command) => run_announcements(&config, command).await,
    }
}
