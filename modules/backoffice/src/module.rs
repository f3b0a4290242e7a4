use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwapOption;
use async_trait::async_trait;
use axum::Router;
use modkit::{DbModule, Module, ModuleCtx, RestfulModule, TracedClient};
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info, warn};

use crate::api::rest::routes;
use crate::config::BackofficeConfig;
use crate::domain::ports::IdentityVerifier;
use crate::domain::repo::Repositories;
use crate::domain::service::{Integrations, Service, ServiceConfig};
use crate::infra::agent::{HttpOrchestrator, SpeechToText, SqliteSandbox};
use crate::infra::identity::JwksVerifier;
use crate::infra::mail::SmtpMailer;
use crate::infra::storage::{migrations::Migrator, SeaOrmRecordStore};

pub const MODULE_NAME: &str = "backoffice";

const OUTBOUND_TIMEOUT: Duration = Duration::from_secs(30);

/// Everything the REST layer needs once `init` has run.
struct Wiring {
    service: Arc<Service>,
    verifier: Arc<dyn IdentityVerifier>,
}

/// The back-office module: storage, domain service, integrations and REST routes.
#[derive(Default)]
pub struct Backoffice {
    wiring: ArcSwapOption<Wiring>,
}

impl Backoffice {
    pub fn new() -> Self {
        Self::default()
    }

    /// Domain service, available after `init`.
    pub fn service(&self) -> Option<Arc<Service>> {
        self.wiring.load().as_ref().map(|w| w.service.clone())
    }
}

#[async_trait]
impl Module for Backoffice {
    async fn init(&self, ctx: &ModuleCtx) -> anyhow::Result<()> {
        info!("Initializing backoffice module");

        let cfg: BackofficeConfig = ctx.module_config();
        debug!(
            "Loaded backoffice config: default_page_size={}, max_page_size={}",
            cfg.default_page_size, cfg.max_page_size
        );
        if cfg.identity.domain.trim().is_empty() && cfg.identity.jwks_url.is_none() {
            warn!("Identity issuer is not configured; authenticated routes will reject every token");
        }
        if cfg.mail.credentials().is_none() {
            warn!("SMTP credentials are not configured; invoice emails will not be sent");
        }

        let db = ctx.db_required()?;
        let store = SeaOrmRecordStore::new(db.sea());
        let repos = Repositories::from_store(Arc::new(store));

        let http = TracedClient::with_timeout(OUTBOUND_TIMEOUT)?;
        let integrations = Integrations {
            mailer: Arc::new(SmtpMailer::new(cfg.mail.clone())?),
            orchestrator: Arc::new(HttpOrchestrator::new(cfg.orchestrator.clone(), http.clone())),
            sandbox: Arc::new(SqliteSandbox::default()),
            transcriber: Arc::new(SpeechToText::new(cfg.transcription.clone(), http.clone())),
        };
        let verifier: Arc<dyn IdentityVerifier> = Arc::new(JwksVerifier::new(&cfg.identity, http));

        let service = Service::new(
            repos,
            integrations,
            ServiceConfig {
                default_page_size: cfg.default_page_size,
                max_page_size: cfg.max_page_size,
            },
        );

        self.wiring.store(Some(Arc::new(Wiring {
            service: Arc::new(service),
            verifier,
        })));
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }
}

#[async_trait]
impl DbModule for Backoffice {
    async fn migrate(&self, db: &modkit_db::DbHandle) -> anyhow::Result<()> {
        info!("Running backoffice database migrations");
        Migrator::up(db.seaorm(), None).await?;
        info!("Backoffice database migrations completed successfully");
        Ok(())
    }
}

impl RestfulModule for Backoffice {
    fn register_rest(&self, _ctx: &ModuleCtx, router: Router) -> anyhow::Result<Router> {
        info!("Registering backoffice REST routes");

        let wiring = self
            .wiring
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))?;

        let router = routes::register_routes(router, wiring.service.clone(), wiring.verifier.clone())?;
        info!("Backoffice REST routes registered successfully");
        Ok(router)
    }
}
