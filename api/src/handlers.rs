use crate::query_payload::{RagDataQuery, RelevantTextPayload};
use crate::rag_response::{HiResponse, RagDataResponse, RelevantTextResponse};
use crate::AppState;
use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use rag_chunks::{join_chunks, ErrorResponse};

pub async fn hi() -> Json<HiResponse> {
    Json(HiResponse {
        message: "Hi".to_string(),
    })
}

pub async fn get_rag_data(
    State(state): State<AppState>,
    Query(params): Query<RagDataQuery>,
) -> Json<RagDataResponse> {
    match state.rag_data.lookup(&params.file_name) {
        Some(fields) => Json(RagDataResponse::Found {
            data: fields.to_vec(),
        }),
        None => {
            log::info!("No rag data for '{}'", params.file_name);
            Json(RagDataResponse::NotFound {
                error: "File name not found.".to_string(),
            })
        }
    }
}

pub async fn relevant_text(
    State(state): State<AppState>,
    Json(payload): Json<RelevantTextPayload>,
) -> Result<Json<RelevantTextResponse>, (StatusCode, Json<ErrorResponse>)> {
    let chunks = state
        .retriever
        .retrieve(&payload.text, &payload.query)
        .await
        .map_err(|e| {
            log::error!("Relevant chunk retrieval failed: {:#}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ErrorResponse {
                    status: "error".to_string(),
                    error: format!("{:#}", e),
                }),
            )
        })?;

    Ok(Json(RelevantTextResponse {
        text: join_chunks(&chunks),
        chunks,
    }))
}
