use actix_web::{Error, HttpResponse, error::InternalError, get, http::StatusCode, post, web};
use chrono::Datelike;
use common::NewAnnotation;
use serde::{Deserialize, Serialize};

use crate::calendar::{MergedStt, ViewState};
use crate::neto::CustomerLookupRequest;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CalendarQuery {
    #[serde(default)]
    pub month: Option<u32>,
    #[serde(default)]
    pub refresh: Option<bool>,
}

#[derive(Debug, Serialize)]
pub struct CalendarViewResponse {
    pub month: u32,
    pub state: ViewState,
    pub entries: Vec<MergedStt>,
}

#[get("/calendar/view")]
pub async fn calendar_view(
    query: web::Query<CalendarQuery>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let month = query.month.unwrap_or_else(|| chrono::Utc::now().month());
    if !(1..=12).contains(&month) {
        return Err(
            InternalError::new("Month must be between 1 and 12.", StatusCode::BAD_REQUEST).into(),
        );
    }

    let entries = if query.refresh.unwrap_or(true) {
        app_state.calendar.refresh(&app_state.db, month).await
    } else {
        app_state.calendar.set_month(month).await
    };

    Ok(HttpResponse::Ok().json(CalendarViewResponse {
        month,
        state: app_state.calendar.state().await,
        entries,
    }))
}

#[post("/calendar/getCustomer")]
pub async fn get_customer(
    payload: web::Json<CustomerLookupRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let response = app_state
        .neto
        .get_customers(payload.into_inner().filter)
        .await
        .map_err(|e| {
            log::error!("Error calling the Neto API: {:#}", e);
            InternalError::new(
                "Failed to fetch customer info from the Neto API.",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        })?;

    Ok(HttpResponse::Ok().json(response))
}

#[post("/calendar/saveSchedule")]
pub async fn save_schedule(
    payload: web::Json<NewAnnotation>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let annotation = payload.into_inner();
    if let Err(e) = annotation.validate() {
        return Err(InternalError::new(e.to_string(), StatusCode::BAD_REQUEST).into());
    }
    let scheduled_at = annotation
        .scheduled_at()
        .map_err(|e| InternalError::new(e.to_string(), StatusCode::BAD_REQUEST))?;

    let saved = app_state
        .db
        .save_annotation(annotation.object_id, annotation.month, scheduled_at)
        .await
        .map_err(|e| {
            log::error!("Failed to save schedule annotation: {:#}", e);
            InternalError::new(
                "Failed to save schedule. Please try again later.",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        })?;

    Ok(HttpResponse::Ok().json(saved))
}
