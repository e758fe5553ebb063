use std::sync::Arc;

use anyhow::{Context, Result};
use teloxide::prelude::*;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use debo::bot::{self, BotDeps};
use debo::config::{BotConfig, StoreBackend};
use debo::conversation::Engine;
use debo::dialogue::DialogueState;
use debo::directory::ProfessionalDirectory;
use debo::feedback::{FeedbackService, WebhookRatingSink};
use debo::google::GoogleClient;
use debo::registry::Registry;
use debo::session::SessionStorage;
use debo::store::{MemoryStore, PostgresStore, RecordStore, SheetsStore};
use debo::upload::{DriveStorage, TelegramFileSource, UploadRelay};

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let json = std::env::var("LOG_FORMAT").map(|v| v.eq_ignore_ascii_case("json")).unwrap_or(false);

    if json {
        tracing_subscriber::fmt().with_env_filter(filter).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}

async fn open_store(config: &BotConfig) -> Result<Arc<dyn RecordStore>> {
    let store: Arc<dyn RecordStore> = match config.backend {
        StoreBackend::Sheets => {
            let sheets = config.sheets.clone().context("Sheets backend selected without sheet settings")?;
            let token = config
                .google_token
                .clone()
                .context("Sheets backend selected without a Google access token")?;
            let client = GoogleClient::new("sheets", token, config.recovery.clone())?;
            info!(spreadsheet = %sheets.spreadsheet_id, sheet = %sheets.sheet_name, "Using Google Sheets store");
            Arc::new(SheetsStore::new(client, sheets))
        }
        StoreBackend::Postgres => {
            let url = config
                .database_url
                .as_deref()
                .context("Postgres backend selected without DATABASE_URL")?;
            info!("Using PostgreSQL store");
            Arc::new(PostgresStore::connect(url).await?)
        }
        StoreBackend::Memory => {
            warn!("Using in-memory store, registrations are lost on restart");
            Arc::new(MemoryStore::new())
        }
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    init_tracing();

    info!("Starting Debo registration bot");

    let config = BotConfig::from_env()?;
    let bot = Bot::new(config.telegram_token.clone());

    let store = open_store(&config).await?;
    let registry = Arc::new(Registry::connect(store).await?);

    let directory = Arc::new(ProfessionalDirectory::new());
    if let Err(e) = directory.reload(&registry).await {
        warn!(error = %e, "Professional directory unavailable, buttons will show raw ids");
    }

    let storage: Arc<dyn debo::upload::RemoteStorage> = match &config.google_token {
        Some(token) => Arc::new(DriveStorage::new(GoogleClient::new(
            "drive",
            token.clone(),
            config.recovery.clone(),
        )?)),
        None => anyhow::bail!("Document uploads need GOOGLE_ACCESS_TOKEN or GOOGLE_ACCESS_TOKEN_FILE"),
    };
    let relay = Arc::new(UploadRelay::new(
        Arc::new(TelegramFileSource::new(bot.clone())),
        storage,
        config.folders.clone(),
        config.max_upload_bytes,
    ));

    let feedback = FeedbackService::new(
        Arc::new(WebhookRatingSink::new(
            config.rating_webhook_url.clone(),
            config.recovery.operation_timeout(),
        )),
        directory,
        config.session_ttl,
    );
    if config.rating_webhook_url.is_none() {
        warn!("RATING_WEBHOOK_URL not set, ratings cannot be recorded");
    }

    let dialogue_storage = SessionStorage::<DialogueState>::new(config.session_ttl);
    dialogue_storage.spawn_sweeper(config.session_sweep_interval);
    feedback
        .sessions()
        .spawn_sweeper("feedback", config.session_sweep_interval);

    let deps = Arc::new(BotDeps {
        engine: Engine::new(registry, relay),
        feedback,
        admin_user_ids: config.admin_user_ids.clone(),
    });

    info!(
        admins = config.admin_user_ids.len(),
        session_ttl_secs = config.session_ttl.as_secs(),
        "Bot initialized, starting dispatcher"
    );

    Dispatcher::builder(bot, bot::schema())
        .dependencies(dptree::deps![dialogue_storage, deps])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;

    Ok(())
}
