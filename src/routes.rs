use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};
use serde::{de, Deserialize, Deserializer, Serialize};
use tracing::warn;
use uuid::Uuid;

use crate::cpu_stress::{LoadGenerator, DEFAULT_TARGET_PERCENT};
use crate::flash::{FlashMessage, FLASH_COOKIE};
use crate::pages;
use crate::sys_info;

const STRESS_TEST_PAGE: &str = "/stress-test";
const HTML: &str = "text/html; charset=utf-8";

/// Shared state handed to every handler.
pub struct AppState {
    pub generator: LoadGenerator,
    pub instance_id: String,
}

impl AppState {
    pub fn new(generator: LoadGenerator) -> Self {
        Self {
            generator,
            instance_id: Uuid::new_v4().to_string(),
        }
    }

    pub fn report(&self) -> StatusReport {
        let run = self.generator.status();
        let memory = sys_info::memory_snapshot();

        StatusReport {
            is_stressing: run.is_stressing,
            current_target: run.current_target,
            available_processors: sys_info::available_processors(),
            max_memory: memory.max_mb,
            free_memory: memory.free_mb,
            total_memory: memory.total_mb,
            active_workers: run.active_workers,
            instance_id: self.instance_id.clone(),
        }
    }
}

/// Body of `GET /stress-test/status`. Memory figures are in MB.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct StatusReport {
    pub is_stressing: bool,
    pub current_target: u32,
    pub available_processors: usize,
    pub max_memory: u64,
    pub free_memory: u64,
    pub total_memory: u64,
    pub active_workers: usize,
    pub instance_id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StartParams {
    #[serde(default, deserialize_with = "blank_as_none")]
    target_cpu_percent: Option<i64>,
}

// A cleared number input posts `targetCpuPercent=`; treat it like a missing field.
fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    match raw.as_deref().map(str::trim) {
        None | Some("") => Ok(None),
        Some(value) => value
            .parse::<i64>()
            .map(Some)
            .map_err(<D::Error as de::Error>::custom),
    }
}

fn redirect_with(flash: FlashMessage) -> HttpResponse {
    HttpResponse::SeeOther()
        .insert_header((header::LOCATION, STRESS_TEST_PAGE))
        .cookie(flash.to_cookie())
        .finish()
}

#[get("/")]
async fn index() -> impl Responder {
    HttpResponse::Ok()
        .content_type(HTML)
        .body(pages::index())
}

#[get("/welcome")]
async fn welcome() -> impl Responder {
    HttpResponse::Ok()
        .content_type(HTML)
        .body(pages::welcome())
}

#[get("")]
async fn stress_test_page(req: HttpRequest, state: web::Data<AppState>) -> impl Responder {
    let cookie = req.cookie(FLASH_COOKIE);
    let flash = cookie
        .as_ref()
        .and_then(|c| c.value().parse::<FlashMessage>().ok());

    let mut resp = HttpResponse::Ok();
    resp.content_type(HTML);
    if cookie.is_some() {
        resp.cookie(FlashMessage::removal_cookie());
    }

    resp.body(pages::stress_test(&state.report(), flash))
}

#[post("/start")]
async fn start_stress(
    params: web::Form<StartParams>,
    state: web::Data<AppState>,
) -> impl Responder {
    let target = params
        .target_cpu_percent
        .unwrap_or(i64::from(DEFAULT_TARGET_PERCENT));

    let flash = match state.generator.start(target) {
        Ok(accepted) => FlashMessage::Started { target: accepted },
        Err(e) => {
            warn!(requested = target, "start request rejected: {}", e);
            e.into()
        }
    };

    redirect_with(flash)
}

#[post("/stop")]
async fn stop_stress(state: web::Data<AppState>) -> impl Responder {
    let flash = match state.generator.stop() {
        Ok(()) => FlashMessage::Stopped,
        Err(e) => e.into(),
    };

    redirect_with(flash)
}

#[get("/status")]
async fn status_json(state: web::Data<AppState>) -> impl Responder {
    HttpResponse::Ok().json(state.report())
}

/// Registers every route. Expects `web::Data<AppState>` in app data.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(index).service(welcome).service(
        web::scope(STRESS_TEST_PAGE)
            .service(stress_test_page)
            .service(start_stress)
            .service(stop_stress)
            .service(status_json),
    );
}
