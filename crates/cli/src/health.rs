//! Health checks (SPEC_FULL §6, §8): database connectivity, listener
//! heartbeat freshness, disk and memory headroom, and platform/LLM
//! credential presence. Exposed both as a one-shot `check-health` command
//! and as a long-running `/health` HTTP endpoint.
//!
//! Grounded on `monitoring/healthcheck.py`'s `HealthChecker`/`HealthStatus`/
//! `SystemHealth` shape and its three-way healthy/degraded/unhealthy
//! status. Disk headroom is approximated by a writability probe rather
//! than a free-bytes syscall, since nothing in the workspace's dependency
//! stack exposes that portably; Telegram/LLM reachability are reduced to
//! credential-presence checks rather than live round-trips, consistent
//! with this crate's thin admin-surface scope.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use serde::Serialize;

use pulse_storage::Storage;

use crate::app::AppContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthState {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthState {
    fn worst(self, other: Self) -> Self {
        use HealthState::*;
        match (self, other) {
            (Unhealthy, _) | (_, Unhealthy) => Unhealthy,
            (Degraded, _) | (_, Degraded) => Degraded,
            _ => Healthy,
        }
    }

    /// 0 healthy, 1 degraded, 2 unhealthy (SPEC_FULL §6, §8).
    pub fn exit_code(self) -> i32 {
        match self {
            HealthState::Healthy => 0,
            HealthState::Degraded => 1,
            HealthState::Unhealthy => 2,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub component: &'static str,
    pub status: HealthState,
    pub message: String,
    pub latency_ms: Option<f64>,
    pub details: serde_json::Value,
}

#[derive(Debug, Serialize)]
pub struct SystemHealth {
    pub status: HealthState,
    pub components: Vec<HealthStatus>,
    pub timestamp: chrono::DateTime<chrono::Utc>,
}

pub struct HealthChecker {
    storage: Storage,
    heartbeat_path: PathBuf,
    heartbeat_max_age: Duration,
    data_dir: PathBuf,
    has_llm_key: bool,
    has_telegram_credentials: bool,
}

impl HealthChecker {
    pub fn from_context(ctx: &AppContext) -> Self {
        Self {
            storage: ctx.storage.clone(),
            heartbeat_path: ctx.config.listener.healthcheck.heartbeat_path.clone(),
            heartbeat_max_age: Duration::from_secs(ctx.config.listener.healthcheck.max_age_seconds),
            data_dir: ctx.config.paths.data_dir.clone(),
            has_llm_key: !ctx.credentials.llm_api_key.is_empty(),
            has_telegram_credentials: ctx.credentials.api_id > 0 && !ctx.credentials.api_hash.is_empty(),
        }
    }

    pub async fn check_all(&self) -> SystemHealth {
        let components = vec![
            self.check_database().await,
            self.check_listener_heartbeat(),
            self.check_disk_space(),
            self.check_memory(),
            self.check_telegram_credentials(),
            self.check_llm_credentials(),
        ];
        let status = components
            .iter()
            .fold(HealthState::Healthy, |acc, c| acc.worst(c.status));
        SystemHealth {
            status,
            components,
            timestamp: chrono::Utc::now(),
        }
    }

    async fn check_database(&self) -> HealthStatus {
        let start = Instant::now();
        match self.storage.get_stats().await {
            Ok(stats) => HealthStatus {
                component: "database",
                status: HealthState::Healthy,
                message: "database operational".to_string(),
                latency_ms: Some(start.elapsed().as_secs_f64() * 1000.0),
                details: serde_json::json!({
                    "ingested": stats.ingested,
                    "published": stats.published,
                }),
            },
            Err(err) => HealthStatus {
                component: "database",
                status: HealthState::Unhealthy,
                message: format!("database error: {err}"),
                latency_ms: Some(start.elapsed().as_secs_f64() * 1000.0),
                details: serde_json::Value::Null,
            },
        }
    }

    fn check_listener_heartbeat(&self) -> HealthStatus {
        let metadata = match std::fs::metadata(&self.heartbeat_path) {
            Ok(m) => m,
            Err(_) => {
                return HealthStatus {
                    component: "listener_heartbeat",
                    status: HealthState::Unhealthy,
                    message: "heartbeat file does not exist".to_string(),
                    latency_ms: None,
                    details: serde_json::json!({ "path": self.heartbeat_path }),
                };
            }
        };
        let age = metadata
            .modified()
            .ok()
            .and_then(|m| m.elapsed().ok())
            .unwrap_or(Duration::MAX);

        if age > self.heartbeat_max_age {
            HealthStatus {
                component: "listener_heartbeat",
                status: HealthState::Unhealthy,
                message: format!("listener heartbeat too old ({}s)", age.as_secs()),
                latency_ms: None,
                details: serde_json::json!({
                    "age_seconds": age.as_secs(),
                    "max_age_seconds": self.heartbeat_max_age.as_secs(),
                }),
            }
        } else {
            HealthStatus {
                component: "listener_heartbeat",
                status: HealthState::Healthy,
                message: format!("listener active ({}s ago)", age.as_secs()),
                latency_ms: None,
                details: serde_json::json!({ "age_seconds": age.as_secs() }),
            }
        }
    }

    fn check_disk_space(&self) -> HealthStatus {
        let probe = self.data_dir.join(".healthcheck-probe");
        match std::fs::write(&probe, b"ok") {
            Ok(()) => {
                let _ = std::fs::remove_file(&probe);
                HealthStatus {
                    component: "disk_space",
                    status: HealthState::Healthy,
                    message: "data directory writable".to_string(),
                    latency_ms: None,
                    details: serde_json::json!({ "path": self.data_dir }),
                }
            }
            Err(err) => HealthStatus {
                component: "disk_space",
                status: HealthState::Unhealthy,
                message: format!("data directory not writable: {err}"),
                latency_ms: None,
                details: serde_json::json!({ "path": self.data_dir }),
            },
        }
    }

    fn check_memory(&self) -> HealthStatus {
        const WARNING_PERCENT: f64 = 20.0;
        const CRITICAL_PERCENT: f64 = 10.0;

        let Ok(meminfo) = std::fs::read_to_string("/proc/meminfo") else {
            return HealthStatus {
                component: "memory",
                status: HealthState::Healthy,
                message: "memory check not available on this platform".to_string(),
                latency_ms: None,
                details: serde_json::Value::Null,
            };
        };

        let mut total_kb = None;
        let mut available_kb = None;
        for line in meminfo.lines() {
            if let Some(rest) = line.strip_prefix("MemTotal:") {
                total_kb = rest.split_whitespace().next().and_then(|v| v.parse::<u64>().ok());
            } else if let Some(rest) = line.strip_prefix("MemAvailable:") {
                available_kb = rest.split_whitespace().next().and_then(|v| v.parse::<u64>().ok());
            }
        }

        let (Some(total), Some(available)) = (total_kb, available_kb) else {
            return HealthStatus {
                component: "memory",
                status: HealthState::Degraded,
                message: "could not parse /proc/meminfo".to_string(),
                latency_ms: None,
                details: serde_json::Value::Null,
            };
        };

        let free_percent = available as f64 / total as f64 * 100.0;
        let status = if free_percent < CRITICAL_PERCENT {
            HealthState::Unhealthy
        } else if free_percent < WARNING_PERCENT {
            HealthState::Degraded
        } else {
            HealthState::Healthy
        };

        HealthStatus {
            component: "memory",
            status,
            message: format!("memory: {free_percent:.1}% free"),
            latency_ms: None,
            details: serde_json::json!({
                "total_mb": total / 1024,
                "available_mb": available / 1024,
                "free_percent": free_percent,
            }),
        }
    }

    fn check_telegram_credentials(&self) -> HealthStatus {
        if self.has_telegram_credentials {
            HealthStatus {
                component: "telegram_credentials",
                status: HealthState::Healthy,
                message: "api_id/api_hash configured".to_string(),
                latency_ms: None,
                details: serde_json::Value::Null,
            }
        } else {
            HealthStatus {
                component: "telegram_credentials",
                status: HealthState::Unhealthy,
                message: "api_id/api_hash missing".to_string(),
                latency_ms: None,
                details: serde_json::Value::Null,
            }
        }
    }

    fn check_llm_credentials(&self) -> HealthStatus {
        if self.has_llm_key {
            HealthStatus {
                component: "llm_credentials",
                status: HealthState::Healthy,
                message: "llm api key configured".to_string(),
                latency_ms: None,
                details: serde_json::Value::Null,
            }
        } else {
            HealthStatus {
                component: "llm_credentials",
                status: HealthState::Degraded,
                message: "llm api key missing".to_string(),
                latency_ms: None,
                details: serde_json::Value::Null,
            }
        }
    }
}

// ── HTTP endpoint ───────────────────────────────────────────────────

pub fn router(checker: Arc<HealthChecker>) -> Router {
    Router::new().route("/health", get(health_handler)).with_state(checker)
}

async fn health_handler(State(checker): State<Arc<HealthChecker>>) -> (StatusCode, Json<SystemHealth>) {
    let health = checker.check_all().await;
    let code = match health.status {
        HealthState::Unhealthy => StatusCode::SERVICE_UNAVAILABLE,
        _ => StatusCode::OK,
    };
    (code, Json(health))
}

pub async fn serve(checker: HealthChecker, host: &str, port: u16) -> std::io::Result<()> {
    let app = router(Arc::new(checker));
    let listener = tokio::net::TcpListener::bind((host, port)).await?;
    tracing::info!(%host, port, "healthcheck server listening");
    axum::serve(listener, app).await
}

/// Human-readable report for the `check-health` command's default (non-JSON,
/// non-quiet) output mode.
pub fn print_report(health: &SystemHealth) {
    let emoji = |s: HealthState| match s {
        HealthState::Healthy => "[OK]",
        HealthState::Degraded => "[WARN]",
        HealthState::Unhealthy => "[FAIL]",
    };

    println!("system health: {:?} ({})", health.status, health.timestamp);
    for component in &health.components {
        println!("{} {} - {}", emoji(component.status), component.component, component.message);
        if let Some(latency) = component.latency_ms {
            println!("    latency: {latency:.2}ms");
        }
    }
}
