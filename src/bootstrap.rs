//! Wiring of settings, database, state, and modules into a runnable service.

use anyhow::Context;
use axum::Router;
use libris_db::Database;
use libris_kernel::{settings::Settings, InitCtx, ModuleRegistry};

use crate::modules;
use crate::state::AppState;

pub struct Application {
    settings: Settings,
    db: Database,
    state: AppState,
    registry: ModuleRegistry,
}

impl Application {
    /// Open the configured database and assemble the application.
    pub async fn connect(settings: Settings) -> anyhow::Result<Self> {
        let db = Database::connect(&settings.database.url, settings.database.max_connections)
            .await
            .with_context(|| format!("failed to open database {}", settings.database.url))?;
        Self::with_database(settings, db)
    }

    pub fn with_database(settings: Settings, db: Database) -> anyhow::Result<Self> {
        let state = AppState::from_settings(&settings, db.clone())?;

        let mut registry = ModuleRegistry::new();
        modules::register_all(&mut registry, &state)?;

        Ok(Self {
            settings,
            db,
            state,
            registry,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn state(&self) -> &AppState {
        &self.state
    }

    pub fn registry(&self) -> &ModuleRegistry {
        &self.registry
    }

    /// Apply pending module migrations. Returns how many ran.
    pub async fn migrate(&self) -> anyhow::Result<usize> {
        let migrations = self.registry.collect_migrations();
        let applied = self.db.apply_migrations(&migrations).await?;
        tracing::info!(applied, known = migrations.len(), "migrations complete");
        Ok(applied)
    }

    /// Migrate, then run every module's `init` hook.
    pub async fn prepare(&self) -> anyhow::Result<()> {
        self.migrate().await?;
        self.registry.init_modules(&self.init_ctx()).await
    }

    pub fn router(&self) -> Router {
        libris_http::build_router(&self.registry, &self.settings)
    }

    /// Serve until shutdown, then stop modules and close the pool.
    pub async fn run(self) -> anyhow::Result<()> {
        self.prepare().await?;
        self.registry.start_modules(&self.init_ctx()).await?;

        let served = libris_http::start_server(self.router(), &self.settings).await;

        if let Err(err) = self.registry.stop_modules().await {
            tracing::error!(error = %err, "module shutdown failed");
        }
        self.db.close().await;
        served
    }

    fn init_ctx(&self) -> InitCtx<'_> {
        InitCtx {
            settings: &self.settings,
            db: &self.db,
        }
    }
}
