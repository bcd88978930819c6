//! HTTP surface: the download endpoint over the vault pipeline.
//!
//! One state struct, one router, one handler. The handler runs the
//! pipeline stages in their fixed order and maps every [`AccessError`] to
//! its public status and body; diagnostic detail stays in tracing and the
//! audit log.

use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use anyhow::Context;
use axum::body::Body;
use axum::extract::{Query, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Redirect, Response};
use axum::routing::get;
use axum::Router;
use serde::Deserialize;
use uuid::Uuid;

use vault::authz::{authorize, AuthzGrant, Principal, RoleFolderMap};
use vault::config::Config;
use vault::delivery::{self, DeliveryBody};
use vault::policy::{DeliveryPlan, DeliveryPolicy, MimeWhitelist, CACHE_CONTROL, SECURITY_HEADERS};
use vault::resolve::VaultRoot;
use vault::sanitize::sanitize_request_path;
use vault::validate::VaultRelPath;
use vault::{AccessError, AuditLog};

use crate::identity::{IdentityProvider, TokenIdentity};

/// Shared per-process state behind the router.
pub struct GatewayState {
    pub root: VaultRoot,
    pub policy: DeliveryPolicy,
    pub role_folders: RoleFolderMap,
    pub chunk_size: usize,
    pub identity: Arc<dyn IdentityProvider>,
    pub audit: Option<AuditLog>,
}

pub type SharedState = Arc<GatewayState>;

impl GatewayState {
    /// Build the state from a validated configuration.
    pub fn from_config(config: &Config) -> anyhow::Result<Self> {
        let root = VaultRoot::open(&config.vault.root).with_context(|| {
            format!("Failed to open vault root: {}", config.vault.root.display())
        })?;

        let policy = DeliveryPolicy::new(
            config.vault.max_file_size,
            config.vault.direct_download_threshold,
            MimeWhitelist::from_map(config.vault.mime_types.clone()),
        );

        let audit = if config.audit.enabled {
            Some(
                AuditLog::open(
                    &config.audit.log_dir,
                    config.audit.max_size,
                    config.audit.max_files,
                )
                .with_context(|| {
                    format!("Failed to open audit log in {}", config.audit.log_dir.display())
                })?,
            )
        } else {
            None
        };

        Ok(Self {
            root,
            policy,
            role_folders: config.vault.role_folders.clone(),
            chunk_size: config.vault.chunk_size,
            identity: Arc::new(TokenIdentity::new(&config.identity)),
            audit,
        })
    }
}

/// Build the application router.
pub fn build_router(state: SharedState) -> Router {
    Router::new()
        .route("/download", get(download))
        .route("/healthz", get(healthz))
        .with_state(state)
}

/// Run the server until shutdown.
pub async fn run(config: &Config) -> anyhow::Result<()> {
    let state = Arc::new(GatewayState::from_config(config)?);

    let listener = tokio::net::TcpListener::bind(&config.server.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.server.bind_addr))?;
    tracing::info!(
        addr = %listener.local_addr()?,
        vault_root = %state.root.as_path().display(),
        "vaultgate listening"
    );

    axum::serve(listener, build_router(state))
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    tracing::info!("vaultgate stopped");
    Ok(())
}

/// Resolves on SIGINT or SIGTERM.
async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};

        let mut term = match signal(SignalKind::terminate()) {
            Ok(term) => term,
            Err(err) => {
                tracing::error!(%err, "failed to install SIGTERM handler");
                // Fall back to ctrl-c only.
                let _ = tokio::signal::ctrl_c().await;
                return;
            }
        };

        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("Received SIGINT, shutting down");
            }
            _ = term.recv() => {
                tracing::info!("Received SIGTERM, shutting down");
            }
        }
    }

    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        tracing::info!("Received ctrl-c, shutting down");
    }
}

async fn healthz() -> &'static str {
    "ok"
}

#[derive(Debug, Deserialize)]
struct DownloadParams {
    file: Option<String>,
}

async fn download(
    State(state): State<SharedState>,
    headers: HeaderMap,
    Query(params): Query<DownloadParams>,
) -> Response {
    let request_id = Uuid::new_v4();
    let raw = params.file.as_deref();

    let Some(principal) = state.identity.principal_for(&headers) else {
        tracing::debug!(%request_id, "unauthenticated request, redirecting to login");
        audit(&state, &format!(
            "{} id={} redirect file={:?}",
            now_secs(),
            request_id,
            raw.unwrap_or("")
        ));
        return Redirect::to(state.identity.login_url()).into_response();
    };

    match handle_download(&state, request_id, &principal, raw).await {
        Ok(response) => response,
        Err(err) => {
            tracing::debug!(%request_id, %err, "request denied");
            audit(&state, &format!(
                "{} id={} deny status={} file={:?}",
                now_secs(),
                request_id,
                err.status(),
                raw.unwrap_or("")
            ));
            error_response(&err)
        }
    }
}

/// The pipeline, stage by stage. Order is load-bearing: authorization
/// happens before any filesystem access.
async fn handle_download(
    state: &GatewayState,
    request_id: Uuid,
    principal: &Principal,
    raw: Option<&str>,
) -> Result<Response, AccessError> {
    let sanitized = sanitize_request_path(raw);
    let rel = VaultRelPath::parse(&sanitized)?;
    let grant = authorize(&principal.roles, &rel, &state.role_folders)?;
    let resolved = state.root.resolve(&rel)?;
    let plan = state.policy.evaluate(&resolved)?;
    let body = delivery::prepare(&resolved.path, &plan, state.chunk_size).await?;

    let grant_label = match &grant {
        AuthzGrant::Administrator => "administrator".to_string(),
        AuthzGrant::FolderMatch { role, .. } => format!("role:{role}"),
    };
    audit(state, &format!(
        "{} id={} allow file={} grant={} size={} mode={}",
        now_secs(),
        request_id,
        rel,
        grant_label,
        plan.size,
        if plan.chunked { "chunked" } else { "direct" }
    ));
    tracing::info!(
        %request_id,
        file = %rel,
        grant = %grant_label,
        size = plan.size,
        chunked = plan.chunked,
        "serving file"
    );

    Ok(success_response(&plan, body))
}

fn success_response(plan: &DeliveryPlan, body: DeliveryBody) -> Response {
    let body = match body {
        DeliveryBody::Direct(bytes) => Body::from(bytes),
        DeliveryBody::Chunked(stream) => Body::from_stream(stream),
    };

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, plan.mime.as_str())
        .header(header::CONTENT_LENGTH, plan.size)
        .header(header::CACHE_CONTROL, CACHE_CONTROL);
    for (name, value) in SECURITY_HEADERS {
        builder = builder.header(*name, *value);
    }

    builder.body(body).unwrap_or_else(|err| {
        tracing::error!(%err, "failed to build response");
        error_response(&AccessError::Io(std::io::Error::other("response build failed")))
    })
}

fn error_response(err: &AccessError) -> Response {
    let status =
        StatusCode::from_u16(err.status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, err.public_message()).into_response()
}

fn audit(state: &GatewayState, line: &str) {
    if let Some(log) = &state.audit {
        if let Err(err) = log.append(line) {
            tracing::warn!(%err, "audit append failed");
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}
