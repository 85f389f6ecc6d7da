use crate::AppState;
use crate::api::models::upload::{IMAGE_FIELD, UploadResponse};
use crate::db::models::chat_images::ChatImageCreateDBRequest;
use crate::errors::{Error, Result};
use crate::naming;
use axum::{
    Json,
    body::Bytes,
    extract::{Multipart, OriginalUri, State, multipart::MultipartRejection},
    http::{HeaderMap, Uri, header},
};
use chrono::Utc;
use tracing::{debug, info, instrument, warn};

/// The image part of an upload, fully buffered
struct ImageUpload {
    original_name: String,
    content: Bytes,
}

/// Find the first `image` part that carries a filename. Parts without one are plain form values
/// and do not count as a file.
async fn read_image_field(multipart: &mut Multipart) -> Result<Option<ImageUpload>> {
    while let Some(field) = multipart.next_field().await.map_err(|e| Error::MalformedUpload { message: e.to_string() })? {
        if field.name() != Some(IMAGE_FIELD) {
            continue;
        }

        let Some(original_name) = field.file_name().map(str::to_string) else {
            debug!("Ignoring image field without a filename");
            continue;
        };

        let content = field.bytes().await.map_err(|e| Error::MalformedUpload { message: e.to_string() })?;
        return Ok(Some(ImageUpload { original_name, content }));
    }

    Ok(None)
}

/// Host the client addressed: the `Host` header, or the URI authority for HTTP/2 requests
fn request_host(headers: &HeaderMap, uri: &Uri) -> String {
    headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .map(str::to_string)
        .or_else(|| uri.authority().map(|authority| authority.to_string()))
        .unwrap_or_default()
}

/// Accept one uploaded image, store it and record where it can be fetched.
///
/// Steps run strictly in order: find the `image` part, derive the stored filename, make sure
/// the upload directory exists, write the bytes, build the public URL and insert the
/// `(filename, url)` row over a fresh database connection. The file write and the insert are
/// not transactional; if the insert fails the file stays on disk unless
/// `uploads.remove_orphans` is set.
#[instrument(skip_all, fields(filename = tracing::field::Empty))]
pub async fn upload_image(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    headers: HeaderMap,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart = multipart.map_err(|rejection| {
        debug!(error = %rejection, "Request is not a multipart upload");
        Error::MissingFile
    })?;

    let upload = read_image_field(&mut multipart).await?.ok_or(Error::MissingFile)?;

    let uploads = &state.config.uploads;
    let filename = naming::destination_filename(uploads.filename_strategy, &upload.original_name, Utc::now());
    tracing::Span::current().record("filename", filename.as_str());

    // A failure here surfaces as a failed write below
    if let Err(e) = state.storage.prepare().await {
        warn!(error = %e, "Could not create upload directory");
    }

    let path = state
        .storage
        .store(&filename, &upload.content)
        .await
        .map_err(|source| Error::WriteFailed { source })?;
    debug!(path = %path.display(), size_bytes = upload.content.len(), "Stored uploaded image");

    let host = request_host(&headers, &uri);
    let url = naming::public_url(&host, uri.path(), &uploads.url_segment(), &filename);

    let request = ChatImageCreateDBRequest { filename, url };
    let record = match state.store.record(&request).await {
        Ok(record) => record,
        Err(e) => {
            if uploads.remove_orphans {
                if let Err(remove_err) = state.storage.remove(&request.filename).await {
                    warn!(error = %remove_err, "Failed to remove file after database insert failed");
                }
            } else {
                warn!(path = %path.display(), "Stored image has no database record");
            }
            return Err(e.into());
        }
    };

    info!(id = record.id, url = %record.url, "Image uploaded");
    Ok(Json(UploadResponse::success(record.url)))
}
