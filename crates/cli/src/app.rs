//! Shared context construction for every subcommand (SPEC_FULL §1, §6):
//! load `.env`, resolve the active profile, load+validate the YAML config,
//! resolve credentials, and open the pieces each subcommand needs. No
//! subcommand builds these by hand — they all go through here so the
//! config/credentials contract is enforced in exactly one place.

use std::path::PathBuf;

use grammers_client::{Client, Config as ClientConfig, InitParams};
use grammers_session::Session;

use pulse_config::ConfigError;
use pulse_core::config::{AggregatorConfig, Credentials, CredentialsError};
use pulse_embed::{create_embedder, EmbeddingService};
use pulse_llm::{create_provider, LlmError, LlmProvider};
use pulse_storage::{Storage, StorageError};

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error(transparent)]
    Credentials(#[from] CredentialsError),
    #[error("configuration is invalid:\n{0}")]
    InvalidConfig(String),
    #[error(transparent)]
    Storage(#[from] StorageError),
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Embedding(#[from] pulse_embed::EmbeddingError),
    #[error("telegram client error: {0}")]
    Telegram(String),
}

impl AppError {
    /// Process exit code (SPEC_FULL §6): 2 for startup validation/auth
    /// failures the operator must fix by hand, 1 for everything else
    /// (transient platform/LLM/storage errors a retry may resolve).
    pub fn exit_code(&self) -> i32 {
        match self {
            AppError::Config(_) | AppError::Credentials(_) | AppError::InvalidConfig(_) => 2,
            AppError::Storage(_) | AppError::Llm(_) | AppError::Embedding(_) | AppError::Telegram(_) => 1,
        }
    }
}

/// Everything a subcommand needs, built once at startup.
pub struct AppContext {
    pub profile: String,
    pub config: AggregatorConfig,
    pub credentials: Credentials,
    pub storage: Storage,
}

impl AppContext {
    pub async fn load() -> Result<Self, AppError> {
        pulse_core::config::load_dotenv();
        let profile = pulse_core::config::active_profile();

        let base_path = PathBuf::from("config/config.yaml");
        let config = pulse_config::load(&base_path, &profile)?;

        let validation = pulse_config::validate_config(&config);
        if !validation.valid {
            return Err(AppError::InvalidConfig(validation.to_report()));
        }

        let credentials = Credentials::from_env(&profile)?;

        let db_path = config.paths.expand(&config.paths.db_file_pattern, &profile);
        std::fs::create_dir_all(&config.paths.data_dir).ok();
        let storage = Storage::connect(std::path::Path::new(&db_path), &config.database).await?;

        Ok(Self { profile, config, credentials, storage })
    }

    pub fn build_embedder(&self) -> Result<EmbeddingService, AppError> {
        let embedder = create_embedder(
            &self.config.embeddings,
            Some(self.credentials.llm_api_key.as_str()),
            768,
        )?;
        Ok(EmbeddingService::new(embedder, self.config.embeddings.normalization.clone(), 4096))
    }

    pub fn build_llm_provider(&self) -> Result<Box<dyn LlmProvider>, AppError> {
        Ok(create_provider(&self.config.llm, &self.credentials)?)
    }

    pub fn session_path(&self) -> PathBuf {
        std::fs::create_dir_all(&self.config.paths.sessions_dir).ok();
        PathBuf::from(
            self.config
                .paths
                .expand(&self.config.paths.session_file_pattern, &self.profile),
        )
    }

    /// Connect a raw Telegram user-session client, same session file the
    /// listener uses. Used by the subcommands that publish or interact
    /// directly (`processor`, `send-status`, `auth`) rather than observing.
    pub async fn connect_telegram_client(&self) -> Result<Client, AppError> {
        let session = Session::load_file_or_create(self.session_path())
            .map_err(|e| AppError::Telegram(e.to_string()))?;

        let client = Client::connect(ClientConfig {
            session,
            api_id: self.credentials.api_id,
            api_hash: self.credentials.api_hash.clone(),
            params: InitParams::default(),
        })
        .await
        .map_err(|e| AppError::Telegram(e.to_string()))?;

        Ok(client)
    }
}
