use crate::application::{StaticResourceService, Upload};
use crate::domain::page::DEFAULT_PAGE_SIZE;
use crate::domain::{Page, PageRequest, Principal, Resource, ResourceId, ResourceType};
use crate::error::{ResourceError, ResourceResult};
use crate::ports::{BlobStore, DispatchPort, ResourceRegistry, UserDirectory};
use axum::{
    extract::{multipart::Field, Multipart, Path, Query, State},
    Extension, Json,
};
use futures::{StreamExt, TryStreamExt};
use serde::Deserialize;
use std::sync::Arc;

type SharedService<R, B, M, U> = Arc<StaticResourceService<R, B, M, U>>;

fn principal_of(principal: &Option<Extension<Principal>>) -> Option<&Principal> {
    principal.as_ref().map(|Extension(principal)| principal)
}

#[derive(Debug, Deserialize)]
pub struct PageParams {
    page: Option<usize>,
    size: Option<usize>,
}

impl From<PageParams> for PageRequest {
    fn from(params: PageParams) -> Self {
        PageRequest::new(
            params.page.unwrap_or(0),
            params.size.unwrap_or(DEFAULT_PAGE_SIZE),
        )
    }
}

#[derive(Debug, Deserialize)]
pub struct CreateParams {
    #[serde(rename = "type")]
    kind: Option<ResourceType>,
}

pub async fn list<R, B, M, U>(
    State(service): State<SharedService<R, B, M, U>>,
    principal: Option<Extension<Principal>>,
    Path(kind): Path<ResourceType>,
    Query(params): Query<PageParams>,
) -> ResourceResult<Json<Page<Resource>>>
where
    R: ResourceRegistry + Clone,
    B: BlobStore + Clone,
    M: DispatchPort + Clone,
    U: UserDirectory + Clone,
{
    let page = service
        .list(principal_of(&principal), kind, params.into())
        .await?;
    Ok(Json(page))
}

pub async fn load<R, B, M, U>(
    State(service): State<SharedService<R, B, M, U>>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<ResourceId>,
) -> ResourceResult<Json<Resource>>
where
    R: ResourceRegistry + Clone,
    B: BlobStore + Clone,
    M: DispatchPort + Clone,
    U: UserDirectory + Clone,
{
    let resource = service.load(principal_of(&principal), &id).await?;
    Ok(Json(resource))
}

/// Multipart upload. The `type` comes from the query string or from a form
/// field sent before the `file` part.
pub async fn create<R, B, M, U>(
    State(service): State<SharedService<R, B, M, U>>,
    principal: Option<Extension<Principal>>,
    Query(params): Query<CreateParams>,
    mut multipart: Multipart,
) -> ResourceResult<Json<Resource>>
where
    R: ResourceRegistry + Clone,
    B: BlobStore + Clone,
    M: DispatchPort + Clone,
    U: UserDirectory + Clone,
{
    let mut declared = params.kind;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ResourceError::InvalidUpload(e.body_text()))?
    {
        match field.name() {
            Some("type") => {
                let raw = field
                    .text()
                    .await
                    .map_err(|e| ResourceError::InvalidUpload(e.body_text()))?;
                let kind = raw
                    .parse::<ResourceType>()
                    .map_err(|e| ResourceError::InvalidUpload(e.to_string()))?;
                declared = Some(kind);
            }
            Some("file") => {
                let declared = declared.ok_or_else(|| {
                    ResourceError::InvalidUpload("resource type must precede the file".to_string())
                })?;
                let upload = upload_from_field(declared, field);
                let resource = service.add(principal_of(&principal), upload).await?;
                return Ok(Json(resource));
            }
            _ => continue,
        }
    }

    Err(ResourceError::InvalidUpload("missing file part".to_string()))
}

fn upload_from_field<'a>(declared: ResourceType, field: Field<'a>) -> Upload<'a> {
    let file_name = field.file_name().unwrap_or("upload").to_string();
    let content_type = match field.content_type() {
        Some(content_type) => content_type.to_string(),
        None => mime_guess::from_path(&file_name)
            .first_or_octet_stream()
            .essence_str()
            .to_string(),
    };
    let body = field
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))
        .boxed();

    Upload {
        declared,
        file_name,
        content_type,
        body,
    }
}

pub async fn delete<R, B, M, U>(
    State(service): State<SharedService<R, B, M, U>>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<ResourceId>,
) -> ResourceResult<Json<Resource>>
where
    R: ResourceRegistry + Clone,
    B: BlobStore + Clone,
    M: DispatchPort + Clone,
    U: UserDirectory + Clone,
{
    let resource = service.delete(principal_of(&principal), &id).await?;
    Ok(Json(resource))
}

pub async fn toggle_public<R, B, M, U>(
    State(service): State<SharedService<R, B, M, U>>,
    principal: Option<Extension<Principal>>,
    Path(id): Path<ResourceId>,
) -> ResourceResult<Json<Resource>>
where
    R: ResourceRegistry + Clone,
    B: BlobStore + Clone,
    M: DispatchPort + Clone,
    U: UserDirectory + Clone,
{
    let resource = service.toggle_public(principal_of(&principal), &id).await?;
    Ok(Json(resource))
}
