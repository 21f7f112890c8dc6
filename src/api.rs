use std::{
    io::{Cursor, Write},
    sync::Arc,
};

use axum::{
    extract::{Multipart, State},
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use utoipa::ToSchema;
use zip::{write::SimpleFileOptions, CompressionMethod, ZipWriter};

use crate::{
    render::{
        batch::{
            generate_batch, generate_preview, parse_position, parse_position_overrides, Placement,
        },
        hex_color,
        text::{Alignment, TextStyle},
        RenderError,
    },
    state::AppState,
};

/// Boundary guardrail; the render core itself has no batch size opinion.
pub const MAX_BATCH_NAMES: usize = 300;

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{0}")]
    BadRequest(String),
    #[error("{0}")]
    Render(#[from] RenderError),
    #[error("internal: {0}")]
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::BadRequest(_)
            | ApiError::Render(RenderError::Template(_) | RenderError::InvalidColor(_)) => {
                StatusCode::BAD_REQUEST
            }
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "detail": self.to_string() }));
        (status, body).into_response()
    }
}

#[derive(Debug, Serialize, ToSchema)]
pub struct HealthResponse {
    pub status: String,
}

#[utoipa::path(get, path = "/health", tag = "doortag", responses((status = 200, body = HealthResponse)))]
pub async fn health() -> impl IntoResponse {
    Json(HealthResponse { status: "ok".into() })
}

#[utoipa::path(
    get,
    path = "/fonts",
    tag = "doortag",
    responses((status = 200, description = "Logical names of available fonts", body = Vec<String>))
)]
pub async fn fonts(State(st): State<Arc<AppState>>) -> impl IntoResponse {
    Json(st.fonts.names())
}

/// Everything the tag endpoints accept as multipart form fields. Unknown
/// fields are ignored.
#[derive(Default)]
struct TagForm {
    images: Vec<Vec<u8>>,
    names_raw: String,
    font_color: Option<String>,
    font_name: Option<String>,
    text_position: Option<String>,
    position: Option<String>,
    positions: Option<String>,
}

async fn read_form(mut multipart: Multipart) -> Result<TagForm, ApiError> {
    let mut form = TagForm::default();
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::BadRequest(format!("invalid multipart body: {e}")))?
    {
        let name = field.name().unwrap_or("").to_string();
        let read_err = |e: axum::extract::multipart::MultipartError| {
            ApiError::BadRequest(format!("failed to read field {name:?}: {e}"))
        };
        match name.as_str() {
            "images" => {
                // Browsers submit an empty part when no file was picked.
                let bytes = field.bytes().await.map_err(read_err)?;
                if !bytes.is_empty() {
                    form.images.push(bytes.to_vec());
                }
            }
            "names" => form.names_raw = field.text().await.map_err(read_err)?,
            "font_color" => form.font_color = Some(field.text().await.map_err(read_err)?),
            "font_name" => form.font_name = Some(field.text().await.map_err(read_err)?),
            "text_position" => form.text_position = Some(field.text().await.map_err(read_err)?),
            "position" => form.position = Some(field.text().await.map_err(read_err)?),
            "positions" => form.positions = Some(field.text().await.map_err(read_err)?),
            _ => {}
        }
    }
    Ok(form)
}

/// One name per line, trimmed, empty lines dropped.
fn parse_names(raw: &str) -> Vec<String> {
    raw.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

fn alignment_preset(text_position: Option<&str>) -> Alignment {
    match text_position.map(str::trim) {
        Some("top") => Alignment::Top,
        Some("bottom") => Alignment::Bottom,
        _ => Alignment::Center,
    }
}

fn style_from(form: &TagForm) -> Result<TextStyle, ApiError> {
    let color = hex_color(form.font_color.as_deref().unwrap_or("#FFFFFF"))?;
    Ok(TextStyle {
        color,
        ..TextStyle::default()
    })
}

#[utoipa::path(
    post,
    path = "/preview",
    tag = "doortag",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Fields: images (files, first used), names (newline-separated, first used), \
                       font_color, font_name, text_position (center|top|bottom), \
                       position (JSON {\"x\",\"y\"} fractional anchor)"
    ),
    responses(
        (status = 200, description = "Preview PNG", content_type = "image/png", body = Vec<u8>),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn preview(
    State(st): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_form(multipart).await?;
    let names = parse_names(&form.names_raw);
    if form.images.is_empty() || names.is_empty() {
        return Err(ApiError::BadRequest(
            "Need at least one image and one name for preview.".into(),
        ));
    }

    let style = style_from(&form)?;
    let placement = match form.position.as_deref().and_then(parse_position) {
        Some(anchor) => Placement::At(anchor),
        None => Placement::Preset(alignment_preset(form.text_position.as_deref())),
    };

    let png = generate_preview(
        &form.images[0],
        &names[0],
        &st.fonts,
        form.font_name.as_deref().unwrap_or_default(),
        &style,
        placement,
    )?;

    Ok((
        StatusCode::OK,
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("image/png")),
            (
                header::CONTENT_DISPOSITION,
                HeaderValue::from_static("inline; filename=\"preview.png\""),
            ),
        ],
        png,
    )
        .into_response())
}

#[utoipa::path(
    post,
    path = "/generate",
    tag = "doortag",
    request_body(
        content = String,
        content_type = "multipart/form-data",
        description = "Fields: images (files), names (newline-separated), font_color, font_name, \
                       positions (JSON map of template index to {\"x\",\"y\"})"
    ),
    responses(
        (status = 200, description = "ZIP of rendered tags", content_type = "application/zip", body = Vec<u8>),
        (status = 400, description = "Invalid request")
    )
)]
pub async fn generate(
    State(st): State<Arc<AppState>>,
    multipart: Multipart,
) -> Result<Response, ApiError> {
    let form = read_form(multipart).await?;
    let names = parse_names(&form.names_raw);
    if form.images.is_empty() {
        return Err(ApiError::BadRequest("Please upload at least one image.".into()));
    }
    if names.is_empty() {
        return Err(ApiError::BadRequest("Please provide at least one name.".into()));
    }
    if names.len() > MAX_BATCH_NAMES {
        return Err(ApiError::BadRequest(format!(
            "Too many names. Please limit to {MAX_BATCH_NAMES} per batch."
        )));
    }

    let style = style_from(&form)?;
    let overrides = form
        .positions
        .as_deref()
        .map(parse_position_overrides)
        .unwrap_or_default();

    let results = generate_batch(
        &form.images,
        &names,
        &st.fonts,
        form.font_name.as_deref().unwrap_or_default(),
        &style,
        &overrides,
    )?;

    let archive = build_zip(&results)?;
    let zip_name = format!(
        "door_tags_{}.zip",
        chrono::Local::now().format("%Y%m%d_%H%M%S")
    );
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{zip_name}\""))
        .map_err(|e| ApiError::Internal(e.to_string()))?;

    Ok((
        StatusCode::OK,
        [
            (
                header::CONTENT_TYPE,
                HeaderValue::from_static("application/zip"),
            ),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        archive,
    )
        .into_response())
}

/// Deflate-compressed ZIP with entries in batch order.
fn build_zip(entries: &[(String, Vec<u8>)]) -> Result<Vec<u8>, ApiError> {
    let mut writer = ZipWriter::new(Cursor::new(Vec::new()));
    let options = SimpleFileOptions::default().compression_method(CompressionMethod::Deflated);
    for (filename, bytes) in entries {
        writer
            .start_file(filename, options)
            .map_err(|e| ApiError::Internal(format!("zip: {e}")))?;
        writer
            .write_all(bytes)
            .map_err(|e| ApiError::Internal(format!("zip: {e}")))?;
    }
    let cursor = writer
        .finish()
        .map_err(|e| ApiError::Internal(format!("zip: {e}")))?;
    Ok(cursor.into_inner())
}
