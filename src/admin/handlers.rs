use axum::extract::FromRef;
use axum::response::IntoResponse;
use axum::Json;
use serde::Serialize;

use crate::bundle::{Bundle, GateStatus, InitMode};
use crate::routing::HandlerResult;

#[derive(Debug, Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub gate: GateSummary,
    pub cache: CacheSummary,
}

#[derive(Debug, Serialize)]
pub struct GateSummary {
    pub mode: InitMode,
    pub status: GateStatus,
}

#[derive(Debug, Serialize)]
pub struct CacheSummary {
    pub entries: usize,
    pub bytes: usize,
    pub keys: Vec<String>,
    pub coalescing: bool,
}

impl SystemStatus {
    pub fn of(bundle: &Bundle) -> Self {
        let cache = bundle.cache();
        SystemStatus {
            version: env!("CARGO_PKG_VERSION"),
            gate: GateSummary {
                mode: bundle.gate().mode(),
                status: bundle.gate().status(),
            },
            cache: CacheSummary {
                entries: cache.len(),
                bytes: cache.total_bytes(),
                keys: cache.keys(),
                coalescing: bundle.coalescing(),
            },
        }
    }
}

pub async fn get_status<S>(state: S) -> HandlerResult
where
    Bundle: FromRef<S>,
{
    let bundle = Bundle::from_ref(&state);
    Ok(Json(SystemStatus::of(&bundle)).into_response())
}
