use actix_web::{
    Error, HttpResponse, delete, error::InternalError, get, http::StatusCode, post, put, web,
};
use common::{NewStt, SttUpdate};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
struct ActionResponse {
    success: bool,
    message: &'static str,
}

#[post("/stt/create")]
pub async fn create_stt(
    payload: web::Json<NewStt>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let new_stt = payload.into_inner();
    if let Err(e) = new_stt.validate() {
        return Err(InternalError::new(e.to_string(), StatusCode::BAD_REQUEST).into());
    }

    let record = app_state.db.save_stt(&new_stt).await.map_err(|e| {
        log::error!("Failed to create STT entry: {:#}", e);
        InternalError::new(
            "Failed to create STT entry. Please try again later.",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    })?;

    Ok(HttpResponse::Created().json(record))
}

#[get("/stt/list/json")]
pub async fn list_stt(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let records = app_state.db.get_stt_list().await.map_err(|e| {
        log::error!("Failed to fetch STT entries: {}", e);
        InternalError::new(
            "Failed to fetch STT entries. Please try again later.",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    })?;

    Ok(HttpResponse::Ok().json(records))
}

#[put("/stt/{id}")]
pub async fn update_stt(
    path: web::Path<i64>,
    payload: web::Json<SttUpdate>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();

    let maybe_record = app_state
        .db
        .update_stt(id, &payload.into_inner())
        .await
        .map_err(|e| {
            log::error!("Failed to update STT entry {}: {:#}", id, e);
            InternalError::new(
                "Failed to update STT entry. Please try again later.",
                StatusCode::INTERNAL_SERVER_ERROR,
            )
        })?;

    match maybe_record {
        Some(record) => Ok(HttpResponse::Ok().json(record)),
        None => {
            log::warn!("STT entry not found: {}", id);
            Err(InternalError::new("STT entry not found.", StatusCode::NOT_FOUND).into())
        }
    }
}

#[delete("/stt/{id}")]
pub async fn delete_stt(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();

    let deleted = app_state.db.soft_delete_stt(id).await.map_err(|e| {
        log::error!("Failed to delete STT entry {}: {:#}", id, e);
        InternalError::new(
            "Failed to delete STT entry. Please try again later.",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    })?;

    if !deleted {
        log::warn!("STT entry not found: {}", id);
        return Err(InternalError::new("STT entry not found.", StatusCode::NOT_FOUND).into());
    }

    Ok(HttpResponse::Ok().json(ActionResponse {
        success: true,
        message: "STT entry soft deleted successfully",
    }))
}

#[get("/stt/customers")]
pub async fn list_customers(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let customers = app_state.neto.get_active_customers().await.map_err(|e| {
        log::error!("Failed to fetch customers from the Neto API: {:#}", e);
        InternalError::new(
            "Failed to fetch customers. Please try again later.",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    })?;

    Ok(HttpResponse::Ok().json(customers))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::test_support::test_state;
    use actix_web::{App, test};
    use serde_json::json;

    #[actix_web::test]
    async fn create_rejects_new_entry_without_recurrence_fields() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(create_stt),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/stt/create")
            .set_json(json!({
                "machine_sku": "SKU-1",
                "machine_name": "Press 1",
                "entry_type": "new",
                "send_to": "ops@example.com"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn create_then_list_returns_the_entry() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(create_stt)
                .service(list_stt),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/stt/create")
            .set_json(json!({
                "machine_sku": "SKU-1",
                "machine_name": "Press 1",
                "entry_type": "old",
                "stt_batch_id": 12
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);

        let req = test::TestRequest::get().uri("/stt/list/json").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["machine_sku"], "SKU-1");
        assert_eq!(body[0]["entry_type"], "old");
        assert_eq!(body[0]["stt_batch_id"], 12);
    }

    #[actix_web::test]
    async fn delete_is_soft_and_then_404s() {
        let dir = tempfile::tempdir().unwrap();
        let state = test_state(&dir).await;
        let app = test::init_service(
            App::new()
                .app_data(web::Data::new(state))
                .service(create_stt)
                .service(delete_stt)
                .service(list_stt),
        )
        .await;

        let req = test::TestRequest::post()
            .uri("/stt/create")
            .set_json(json!({
                "machine_sku": "SKU-1",
                "machine_name": "Press 1",
                "entry_type": "old",
                "stt_batch_id": 3
            }))
            .to_request();
        let created: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        let id = created["id"].as_i64().unwrap();

        let req = test::TestRequest::delete()
            .uri(&format!("/stt/{id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::OK);

        let req = test::TestRequest::get().uri("/stt/list/json").to_request();
        let body: serde_json::Value = test::call_and_read_body_json(&app, req).await;
        assert!(body.as_array().unwrap().is_empty());

        let req = test::TestRequest::delete()
            .uri(&format!("/stt/{id}"))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
