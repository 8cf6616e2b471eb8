//! Core application

use std::sync::Arc;

use anyhow::{Result, anyhow};

use crate::api::ApiServer;
use crate::core::cli::{self, CliConfig, Commands};
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME, APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::crawl::NaverNewsFetcher;
use crate::data::store::SqliteNewsStore;
use crate::data::vector::HttpVectorSink;
use crate::data::{Deduplicator, NewsBus};
use crate::domain::news::{NewsAnalyzer, NewsArchiver, NewsCollector, NewsPipeline};
use crate::llm;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub store: Arc<SqliteNewsStore>,
    pub pipeline: Arc<NewsPipeline>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let (cli_config, command) = cli::parse();
        match command {
            Some(Commands::Start) | None => {}
        }

        let app = Self::init(&cli_config).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &CliConfig) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        let bus = Arc::new(
            NewsBus::from_config(&config.infra)
                .await
                .map_err(|e| anyhow!("Failed to initialize stream bus: {e}"))?,
        );
        tracing::debug!(backend = bus.backend_name(), "Stream bus initialized");

        let dedup = Arc::new(
            Deduplicator::from_config(&config.infra)
                .await
                .map_err(|e| anyhow!("Failed to initialize dedup window: {e}"))?,
        );

        let store = Arc::new(
            SqliteNewsStore::init(&config.database.sqlite_path)
                .await
                .map_err(|e| anyhow!("Failed to initialize store: {e}"))?,
        );

        let llm_provider = llm::create_provider(&config.llm)
            .map_err(|e| anyhow!("Failed to initialize LLM provider: {e}"))?;
        tracing::debug!(provider = llm_provider.provider_name(), "LLM provider ready");

        let sink = Arc::new(
            HttpVectorSink::new(config.vector.clone())
                .map_err(|e| anyhow!("Failed to initialize vector sink: {e}"))?,
        );

        let fetcher = Arc::new(
            NaverNewsFetcher::new().map_err(|e| anyhow!("Failed to initialize crawler: {e}"))?,
        );

        let collector = NewsCollector::new(
            Arc::clone(&bus),
            dedup,
            fetcher,
            &config.pipeline,
        );
        let analyzer = NewsAnalyzer::new(
            Arc::clone(&bus),
            llm_provider,
            Arc::clone(&store) as _,
            &config.pipeline,
        );
        let archiver = NewsArchiver::new(Arc::clone(&bus), sink as _, &config.vector);

        let pipeline = Arc::new(NewsPipeline::new(
            collector,
            analyzer,
            archiver,
            Arc::clone(&store) as _,
            &config.pipeline,
        ));

        Ok(Self {
            shutdown: ShutdownService::new(),
            config,
            store,
            pipeline,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        // Start the pipeline daemon alongside the HTTP server
        app.shutdown
            .register(app.pipeline.start(app.shutdown.subscribe()))
            .await;

        tracing::info!(
            host = %app.config.server.host,
            port = app.config.server.port,
            "{APP_NAME} started"
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;

        app.shutdown.shutdown().await;
        app.store.close().await;

        Ok(())
    }
}
