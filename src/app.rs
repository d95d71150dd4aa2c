/*
 * Responsibility
 * - tracing / panic hook の初期化
 * - Config読み込み → AuthPipeline 生成 → Router 組み立て
 * - Middleware の適用 (cookie auth / CORS / security headers / http)
 * - axum::serve() で起動 (remote addr 取得のため connect info 付き)
 */
use std::net::SocketAddr;
use std::{panic, process};

use anyhow::{Context, Result};
use axum::Router;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::api;
use crate::api::v1::handlers::health::health;
use crate::config::Config;
use crate::middleware;
use crate::services::auth::build_auth_pipeline;
use crate::state::AppState;

fn init_tracing() {
    // RUST_LOG があればそれを優先
    // 例: RUST_LOG=info,auth_tkt=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        tracing::error!(?info, "panic");

        // development は即死させて気付けるようにする
        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        config = ?config,
        "starting auth_tkt service in {:?} mode on {}",
        config.app_env,
        config.addr
    );

    let app = build_app(&config)?;

    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .await?;
    Ok(())
}

/// Build the full application (state + routes + middleware) from `config`.
///
/// Fails when the auth_tkt options are inconsistent (e.g. reissue >= timeout).
pub fn build_app(config: &Config) -> Result<Router> {
    let auth = build_auth_pipeline(config).context("invalid auth_tkt configuration")?;
    let state = AppState::new(auth, config.server_name.as_str());

    Ok(build_router(state, config))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = Router::new()
        .route("/health", axum::routing::get(health))
        .nest("/api/v1", api::v1::routes(state.clone()))
        .with_state(state);

    let router = middleware::security_headers::apply(router);
    let router = middleware::cors::apply(router, config);
    middleware::http::apply(router)
}
