use actix_web::{web, App, HttpResponse, HttpServer, Responder};
use anyhow::{Context, Result};
use prometheus::{Encoder, TextEncoder};
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinSet;
use tracing::info;

use engagement_service::config::Config;
use engagement_service::gateway::{
    ws_handler, CredentialVerifier, GatewayState, HttpCredentialVerifier, RoomBroadcaster,
    RoomRegistry,
};
use engagement_service::repository::PgEngagementLedger;
use engagement_service::services::{
    CompositePublisher, EngagementPublisher, EngagementService, KafkaEngagementProducer,
    KafkaEventProducerConfig, RedisCounterStore,
};
use engagement_service::workers::{reconciliation::ReconciliationWorker, redis_health};

async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut terminate =
            signal(SignalKind::terminate()).expect("Failed to install SIGTERM handler");

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {},
            _ = terminate.recv() => {},
        }
    }

    #[cfg(not(unix))]
    {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    }
}

async fn metrics_endpoint() -> impl Responder {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::default_registry().gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => HttpResponse::Ok()
            .content_type(encoder.format_type())
            .body(buffer),
        Err(e) => HttpResponse::InternalServerError().body(format!("error: {}", e)),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt::init();

    info!("Starting engagement-service");

    // Load configuration
    let config = Config::from_env().context("Failed to load configuration")?;
    info!(
        "Configuration loaded: env={}, http_port={}",
        config.app.env, config.app.http_port
    );

    // Initialize database pool
    let pg_pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(10))
        .idle_timeout(Duration::from_secs(600))
        .max_lifetime(Duration::from_secs(1800))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;

    // Verify database connection
    sqlx::query("SELECT 1")
        .execute(&pg_pool)
        .await
        .context("Failed to verify database connection")?;
    info!("Database pool created and verified");

    // Run database migrations
    sqlx::migrate!("./migrations")
        .run(&pg_pool)
        .await
        .context("Failed to run database migrations")?;
    info!("Database migrations completed");

    // Initialize Redis connection
    let redis_client =
        redis::Client::open(config.redis.url.as_str()).context("Failed to create Redis client")?;
    let redis_conn = redis::aio::ConnectionManager::new(redis_client)
        .await
        .context("Failed to connect to Redis")?;
    info!("Redis connection established");

    // Collaborator seams
    let ledger = Arc::new(PgEngagementLedger::new(pg_pool.clone()));
    let counter_store = Arc::new(RedisCounterStore::new(redis_conn));
    info!("Ledger and counter store initialized");

    // Fan-out gateway registry
    let registry = RoomRegistry::new();

    // Event sinks: room gateway always, Kafka when configured
    let mut sinks: Vec<Arc<dyn EngagementPublisher>> =
        vec![Arc::new(RoomBroadcaster::new(registry.clone()))];

    match KafkaEventProducerConfig::from_env() {
        Some(kafka_config) => match KafkaEngagementProducer::new(&kafka_config) {
            Ok(producer) => {
                sinks.push(Arc::new(producer));
                info!("Kafka event producer initialized");
            }
            Err(e) => {
                tracing::warn!("Failed to initialize Kafka event producer: {}", e);
            }
        },
        None => info!("Kafka event producer disabled: KAFKA_BROKERS not configured"),
    }

    let publisher = Arc::new(CompositePublisher::new(sinks));

    // The engine, consumed by the request-handling controllers
    let engine = EngagementService::new(ledger.clone(), counter_store.clone(), publisher);
    info!("Engagement engine initialized");

    // Counter store health check keepalive
    let health_counters = counter_store.clone();
    tokio::spawn(async move {
        redis_health::start_redis_health_check(
            health_counters,
            redis_health::RedisHealthConfig::default(),
        )
        .await;
    });
    info!("Counter store health check background job started");

    // Gateway state
    let verifier: Arc<dyn CredentialVerifier> =
        Arc::new(HttpCredentialVerifier::new(&config.gateway.auth_url));
    let gateway_state = GatewayState {
        registry: registry.clone(),
        verifier,
        heartbeat: Duration::from_secs(config.gateway.heartbeat_secs),
        client_timeout: Duration::from_secs(config.gateway.client_timeout_secs),
    };

    let http_addr = format!("{}:{}", config.app.host, config.app.http_port);
    info!("Starting HTTP server on http://{}", http_addr);

    let mut join_set = JoinSet::new();

    // Spawn HTTP server task (health checks, metrics, WebSocket gateway)
    let engine_data = web::Data::new(engine.clone());
    let gateway_data = web::Data::new(gateway_state.clone());
    let http_server = HttpServer::new(move || {
        App::new()
            .app_data(engine_data.clone())
            .app_data(gateway_data.clone())
            .route("/health", web::get().to(|| async { "OK" }))
            .route("/ready", web::get().to(|| async { "READY" }))
            .route("/metrics", web::get().to(metrics_endpoint))
            .service(ws_handler)
    })
    .bind(&http_addr)
    .context("Failed to bind HTTP server")?
    .run();

    join_set.spawn(async move {
        http_server
            .await
            .map_err(|e| anyhow::anyhow!("HTTP server error: {}", e))
    });
    info!("HTTP server started");

    // Start the counter reconciliation sweep
    let reconciliation = ReconciliationWorker::new(
        ledger.clone(),
        counter_store.clone(),
        config.reconciliation.clone(),
    );
    join_set.spawn(async move {
        reconciliation.run().await;
        Ok(())
    });
    info!("Reconciliation worker started");

    info!("engagement-service is running");

    tokio::select! {
        _ = shutdown_signal() => {
            info!("Shutdown signal received");
        }
        Some(result) = join_set.join_next() => {
            match result {
                Ok(Ok(())) => info!("Task completed"),
                Ok(Err(e)) => {
                    tracing::error!("Task failed: {:#}", e);
                    return Err(e);
                }
                Err(e) => {
                    tracing::error!("Task panicked: {:#}", e);
                    return Err(anyhow::anyhow!("Task panicked: {}", e));
                }
            }
        }
    }

    join_set.abort_all();
    info!("engagement-service shutting down");
    Ok(())
}
