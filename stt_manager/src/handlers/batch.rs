use actix_web::{
    Error, HttpResponse, delete, error::InternalError, get, http::StatusCode, post, put, web,
};
use common::{
    BatchCreateError, BatchCreateResponse, BulkBatchResponse, BulkLookupError, NewBatch,
    SttBatch, month_name,
};
use serde::{Deserialize, Serialize};

use crate::state::AppState;

/// A single batch or a `batches` list; entries are processed one by one
/// either way.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum CreateBatchPayload {
    Many { batches: Vec<NewBatch> },
    One(Box<NewBatch>),
}

#[post("/stt_batch/create")]
pub async fn create_batch(
    payload: web::Json<CreateBatchPayload>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let batches = match payload.into_inner() {
        CreateBatchPayload::Many { batches } => batches,
        CreateBatchPayload::One(batch) => vec![*batch],
    };
    if batches.is_empty() {
        return Err(InternalError::new("No batch data provided", StatusCode::BAD_REQUEST).into());
    }

    let mut created_batches = Vec::new();
    let mut errors = Vec::new();

    for (index, batch) in batches.iter().enumerate() {
        let missing = batch.missing_fields();
        if !missing.is_empty() {
            errors.push(BatchCreateError {
                index,
                error: "Missing required fields".to_string(),
                fields: Some(missing.iter().map(|f| f.to_string()).collect()),
            });
            continue;
        }
        let invalid = batch.invalid_fields();
        if !invalid.is_empty() {
            errors.push(BatchCreateError {
                index,
                error: "Invalid field values".to_string(),
                fields: Some(invalid.iter().map(|f| f.to_string()).collect()),
            });
            continue;
        }

        let fields = match batch.normalized() {
            Ok(fields) => fields,
            Err(e) => {
                errors.push(BatchCreateError {
                    index,
                    error: e.to_string(),
                    fields: None,
                });
                continue;
            }
        };

        match app_state.db.save_batch(&fields).await {
            Ok(saved) => created_batches.push(saved),
            Err(e) => {
                log::error!("Failed to save STT batch at index {}: {:#}", index, e);
                errors.push(BatchCreateError {
                    index,
                    error: "Failed to process batch entry".to_string(),
                    fields: None,
                });
            }
        }
    }

    let status = if errors.len() == batches.len() {
        StatusCode::BAD_REQUEST
    } else {
        StatusCode::MULTI_STATUS
    };
    let response = BatchCreateResponse {
        success: !created_batches.is_empty(),
        total_submitted: batches.len(),
        total_created: created_batches.len(),
        total_failed: errors.len(),
        created_batches,
        errors: (!errors.is_empty()).then_some(errors),
    };

    Ok(HttpResponse::build(status).json(response))
}

/// Batch row plus the spelled-out start month for the listing table.
#[derive(Debug, Serialize)]
pub struct BatchListItem {
    #[serde(flatten)]
    pub batch: SttBatch,
    pub month_start_name: String,
}

#[get("/stt_batch/list/json")]
pub async fn list_batches(app_state: web::Data<AppState>) -> Result<HttpResponse, Error> {
    let batches = app_state.db.get_batch_list().await.map_err(|e| {
        log::error!("Failed to fetch STT batches: {}", e);
        InternalError::new(
            "Failed to fetch STT batch entries. Please try again later.",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    })?;

    let items: Vec<BatchListItem> = batches
        .into_iter()
        .map(|batch| BatchListItem {
            month_start_name: month_name(batch.month_start).to_string(),
            batch,
        })
        .collect();

    Ok(HttpResponse::Ok().json(items))
}

#[get("/stt_batch/{id}")]
pub async fn get_batch(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();

    let maybe_batch = app_state.db.get_batch(id).await.map_err(|e| {
        log::error!("Database error fetching STT batch {}: {}", id, e);
        InternalError::new(
            "Internal server error while fetching STT batch.",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    })?;

    match maybe_batch {
        Some(batch) => Ok(HttpResponse::Ok().json(batch)),
        None => {
            log::warn!("STT batch not found: {}", id);
            Err(InternalError::new("STT Batch entry not found.", StatusCode::NOT_FOUND).into())
        }
    }
}

#[put("/stt_batch/{id}")]
pub async fn update_batch(
    path: web::Path<i64>,
    payload: web::Json<NewBatch>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();

    let fields = payload
        .normalized()
        .map_err(|e| InternalError::new(e.to_string(), StatusCode::BAD_REQUEST))?;

    let maybe_batch = app_state.db.update_batch(id, &fields).await.map_err(|e| {
        log::error!("Failed to update STT batch {}: {:#}", id, e);
        InternalError::new(
            "Failed to update STT Batch entry. Please try again later.",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    })?;

    match maybe_batch {
        Some(batch) => Ok(HttpResponse::Ok().json(batch)),
        None => {
            log::warn!("STT batch not found: {}", id);
            Err(InternalError::new("STT Batch entry not found.", StatusCode::NOT_FOUND).into())
        }
    }
}

#[delete("/stt_batch/{id}")]
pub async fn delete_batch(
    path: web::Path<i64>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let id = path.into_inner();

    let deleted = app_state.db.soft_delete_batch(id).await.map_err(|e| {
        log::error!("Failed to delete STT batch {}: {:#}", id, e);
        InternalError::new(
            "Failed to delete STT Batch entry. Please try again later.",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    })?;

    if !deleted {
        log::warn!("STT batch not found: {}", id);
        return Err(InternalError::new("STT Batch entry not found.", StatusCode::NOT_FOUND).into());
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "success": true,
        "message": "STT Batch entry soft deleted successfully"
    })))
}

/// Batch ids for a bulk lookup: a JSON array or a comma-separated string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum BatchIds {
    List(Vec<i64>),
    Csv(String),
}

impl BatchIds {
    fn tokens(&self) -> Vec<String> {
        match self {
            BatchIds::List(ids) => ids.iter().map(|id| id.to_string()).collect(),
            BatchIds::Csv(raw) => raw
                .split(',')
                .map(|token| token.trim().to_string())
                .filter(|token| !token.is_empty())
                .collect(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct MultipleBatchRequest {
    #[serde(alias = "batchIds")]
    pub batch_ids: BatchIds,
}

#[post("/stt_batch/multiple")]
pub async fn lookup_batches(
    payload: web::Json<MultipleBatchRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, Error> {
    let tokens = payload.batch_ids.tokens();
    if tokens.is_empty() {
        return Err(InternalError::new("No batch IDs provided", StatusCode::BAD_REQUEST).into());
    }

    let mut ids = Vec::new();
    let mut errors = Vec::new();
    for token in &tokens {
        match token.parse::<i64>() {
            Ok(id) => ids.push(id),
            Err(_) => errors.push(BulkLookupError {
                id: token.clone(),
                message: "Invalid batch id".to_string(),
            }),
        }
    }

    let outcome = app_state.db.get_batches_by_ids(&ids).await.map_err(|e| {
        log::error!("Bulk batch lookup failed: {:#}", e);
        InternalError::new(
            "Failed to fetch STT Batch entries. Please try again later.",
            StatusCode::INTERNAL_SERVER_ERROR,
        )
    })?;
    errors.extend(outcome.errors);

    let response = BulkBatchResponse {
        success: !outcome.results.is_empty(),
        total_requested: tokens.len(),
        total_found: outcome.results.len(),
        results: outcome.results,
        errors: (!errors.is_empty()).then_some(errors),
    };

    Ok(HttpResponse::Ok().json(response))
}
