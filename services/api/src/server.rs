use crate::cli::ServeArgs;
use crate::infra::{AppState, ConfiguredStore};
use crate::routes::{with_funnel_routes, FunnelServices};
use axum::Extension;
use axum_prometheus::PrometheusMetricLayer;
use chrono::Utc;
use lead_funnel::config::AppConfig;
use lead_funnel::error::AppError;
use lead_funnel::telemetry;
use lead_funnel::workflows::admin::{AdminService, AdminTables};
use lead_funnel::workflows::registration::{
    LeadCaptureFlow, MasterclassFlow, RecordStore, RegistrationService,
};
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

pub(crate) async fn run(mut args: ServeArgs) -> Result<(), AppError> {
    let mut config = AppConfig::load()?;

    if let Some(host) = args.host.take() {
        config.server.host = host;
    }
    if let Some(port) = args.port.take() {
        config.server.port = port;
    }

    telemetry::init(&config.telemetry)?;

    let (prometheus_layer, prometheus_handle) = PrometheusMetricLayer::pair();
    let readiness_flag = Arc::new(std::sync::atomic::AtomicBool::new(false));
    let app_state = AppState {
        readiness: readiness_flag.clone(),
        metrics: Arc::new(prometheus_handle),
    };

    let store = Arc::new(ConfiguredStore::from_config(&config)?);
    if matches!(store.as_ref(), ConfiguredStore::Memory(_)) {
        warn!("STORE_URL not set; registrations are kept in memory only");
    }

    let ttl = config.funnel.session_ttl;
    let masterclass = Arc::new(RegistrationService::new(
        Arc::new(MasterclassFlow::from_config(&config.funnel)),
        store.clone(),
        ttl,
    ));
    let leads = Arc::new(RegistrationService::new(
        Arc::new(LeadCaptureFlow::from_config(&config.funnel)),
        store.clone(),
        ttl,
    ));
    let admin = config.admin.token.clone().map(|token| {
        Arc::new(AdminService::new(
            store.clone(),
            AdminTables::from_config(&config.funnel),
            token,
        ))
    });
    if admin.is_none() {
        info!("ADMIN_TOKEN not set; reporting routes disabled");
    }

    tokio::spawn(sweep_sessions(masterclass.clone(), leads.clone()));

    let app = with_funnel_routes(FunnelServices {
        masterclass,
        leads,
        admin,
    })
    .layer(Extension(app_state))
    .layer(prometheus_layer);

    let addr = config.server.socket_addr()?;
    let listener = tokio::net::TcpListener::bind(addr).await?;
    readiness_flag.store(true, Ordering::Release);

    info!(
        ?config.environment,
        %addr,
        store = store.describe(),
        event_date = %config.funnel.event_date,
        "lead funnel service ready"
    );

    axum::serve(listener, app).await?;
    Ok(())
}

/// Periodically drops abandoned sessions from both funnels.
async fn sweep_sessions<S>(
    masterclass: Arc<RegistrationService<MasterclassFlow, S>>,
    leads: Arc<RegistrationService<LeadCaptureFlow, S>>,
) where
    S: RecordStore + 'static,
{
    let mut interval = tokio::time::interval(SWEEP_INTERVAL);
    loop {
        interval.tick().await;
        let now = Utc::now();
        let removed = masterclass.sweep_expired(now) + leads.sweep_expired(now);
        if removed > 0 {
            debug!(
                removed,
                masterclass_open = masterclass.open_sessions(),
                leads_open = leads.open_sessions(),
                "session sweep"
            );
        }
    }
}
