use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;

use super::{CloneVoiceResponse, HealthResponse};
use crate::api::routes::AppState;
use crate::error::AppError;
use crate::tts::VoiceInfo;

pub async fn synthesize(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Response, AppError> {
    let mut text = String::new();
    let mut voice_id: Option<String> = None;

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let name = field.name().unwrap_or_default().to_string();
        match name.as_str() {
            "text" => text = field.text().await.map_err(bad_multipart)?,
            "voice_id" => {
                let value = field.text().await.map_err(bad_multipart)?;
                if !value.is_empty() {
                    voice_id = Some(value);
                }
            }
            _ => {}
        }
    }

    let artifact = state.gateway.synthesize(&text, voice_id.as_deref()).await?;
    let format = artifact.format();
    let bytes = artifact.into_bytes()?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, format.content_type().to_string()),
            (
                header::CONTENT_DISPOSITION,
                format!("attachment; filename=speech.{}", format.extension()),
            ),
        ],
        bytes,
    )
        .into_response())
}

pub async fn list_voices(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<VoiceInfo>>, AppError> {
    let voices = state.gateway.voices().await?;
    Ok(Json(voices))
}

pub async fn clone_voice(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<CloneVoiceResponse>, AppError> {
    let mut sample: Option<(Vec<u8>, String)> = None;
    let mut voice_id = String::new();
    let mut name = String::new();

    while let Some(field) = multipart.next_field().await.map_err(bad_multipart)? {
        let field_name = field.name().unwrap_or_default().to_string();
        match field_name.as_str() {
            "audio" => {
                let extension = field
                    .file_name()
                    .map(std::path::Path::new)
                    .and_then(|p| p.extension())
                    .and_then(|e| e.to_str())
                    .unwrap_or("wav")
                    .to_string();
                let bytes = field.bytes().await.map_err(bad_multipart)?;
                sample = Some((bytes.to_vec(), extension));
            }
            "voice_id" => voice_id = field.text().await.map_err(bad_multipart)?,
            "name" => name = field.text().await.map_err(bad_multipart)?,
            _ => {}
        }
    }

    let (bytes, extension) =
        sample.ok_or_else(|| AppError::InvalidInput("No audio provided".to_string()))?;
    if name.is_empty() {
        name = voice_id.clone();
    }

    let reference = state
        .gateway
        .clone_voice(&voice_id, &name, &bytes, &extension)
        .await?;

    Ok(Json(CloneVoiceResponse {
        status: "ok".to_string(),
        voice_id,
        name: reference.name,
    }))
}

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

fn bad_multipart(e: MultipartError) -> AppError {
    AppError::InvalidInput(format!("Invalid form data: {}", e))
}
