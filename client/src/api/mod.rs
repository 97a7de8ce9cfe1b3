use std::error::Error as StdError;
use std::future::Future;
use std::path::{Path, PathBuf};

use anyhow::Result;
use const_format::formatcp;
use displaydoc::Display;
use futures::future::join_all;
use reqwest::{
    header::{HeaderMap, HeaderValue, USER_AGENT},
    multipart::{Form, Part},
    Client as HttpClient, Response, StatusCode, Url,
};

use crate::config::ClientConfig;
use crate::version::ROOMFORGE_DISTRIBUTOR;
use roomforge::api::v1::furniture::FurnitureItem;
use roomforge::api::v1::ErrorResponse;
use roomforge::api::v1::phone_upload::{
    validate_photo_count, PhoneUploadResponse, PhoneUploadStatusResponse,
};
use roomforge::api::v1::project::{
    CreateProjectFromSession, CreateProjectResponse, ProjectId, ProjectStatusResponse,
};
use roomforge::session::SessionToken;

/// The User-Agent string of the roomforge client.
const ROOMFORGE_USER_AGENT: &str = formatcp!(
    "Roomforge/{} ({})",
    env!("CARGO_PKG_VERSION"),
    ROOMFORGE_DISTRIBUTOR
);

/// Multipart field name the backend expects photos under.
const PHOTO_FIELD: &str = "files";

/// The backend API client.
#[derive(Debug, Clone)]
pub struct ApiClient {
    /// Base endpoint of the backend.
    endpoint: Url,

    /// An initialized HTTP client.
    client: HttpClient,
}

/// An API error.
#[derive(Debug, Display)]
pub enum ApiError {
    /// {0}
    Rejection(ErrorResponse),

    /// HTTP {0}: {1}
    Unstructured(StatusCode, String),
}

/// The slice of the backend the session flows depend on.
///
/// `ApiClient` implements this over HTTP; tests implement it with
/// scripted responses so every state transition can be driven without a
/// network.
pub trait Backend: Clone + Send + Sync + 'static {
    fn create_project_from_photos(
        &self,
        photos: Vec<PathBuf>,
    ) -> impl Future<Output = Result<CreateProjectResponse>> + Send;

    fn create_project_from_session(
        &self,
        token: SessionToken,
    ) -> impl Future<Output = Result<CreateProjectResponse>> + Send;

    fn project_status(
        &self,
        id: ProjectId,
    ) -> impl Future<Output = Result<ProjectStatusResponse>> + Send;

    fn upload_status(
        &self,
        token: SessionToken,
    ) -> impl Future<Output = Result<PhoneUploadStatusResponse>> + Send;

    fn submit_phone_photos(
        &self,
        token: SessionToken,
        photos: Vec<PathBuf>,
    ) -> impl Future<Output = Result<PhoneUploadResponse>> + Send;
}

impl ApiClient {
    pub fn new(config: &ClientConfig) -> Result<Self> {
        Ok(Self {
            endpoint: config.endpoint.clone(),
            client: build_http_client(),
        })
    }

    /// Sets the API endpoint of this client.
    pub fn set_endpoint(&mut self, endpoint: &str) -> Result<()> {
        self.endpoint = Url::parse(endpoint)?;
        Ok(())
    }

    /// Creates a project from photos picked on this machine.
    pub async fn create_project_from_photos(
        &self,
        photos: &[PathBuf],
    ) -> Result<CreateProjectResponse> {
        validate_photo_count(photos.len())?;
        let endpoint = self.endpoint.join("projects")?;

        let parts = join_all(photos.iter().map(|path| photo_part(path)))
            .await
            .into_iter()
            .collect::<Result<Vec<Part>>>()?;
        let mut form = Form::new();
        for part in parts {
            form = form.part(PHOTO_FIELD, part);
        }

        let res = self.client.post(endpoint).multipart(form).send().await?;

        if res.status().is_success() {
            Ok(res.json().await?)
        } else {
            let api_error = ApiError::try_from_response(res).await?;
            Err(api_error.into())
        }
    }

    /// Creates a project from a completed phone-upload session.
    pub async fn create_project_from_session(
        &self,
        token: &SessionToken,
    ) -> Result<CreateProjectResponse> {
        let endpoint = self.endpoint.join("projects")?;
        let payload = CreateProjectFromSession {
            phone_upload_id: token.clone(),
        };

        let res = self.client.post(endpoint).json(&payload).send().await?;

        if res.status().is_success() {
            Ok(res.json().await?)
        } else {
            let api_error = ApiError::try_from_response(res).await?;
            Err(api_error.into())
        }
    }

    /// Returns the processing status of a project.
    pub async fn get_project(&self, id: &ProjectId) -> Result<ProjectStatusResponse> {
        let endpoint = self.endpoint.join("projects/")?.join(id.as_str())?;

        let res = self.client.get(endpoint).send().await?;

        if res.status().is_success() {
            Ok(res.json().await?)
        } else {
            let api_error = ApiError::try_from_response(res).await?;
            Err(api_error.into())
        }
    }

    /// Submits photos from the phone against an upload session.
    pub async fn phone_upload(
        &self,
        token: &SessionToken,
        photos: &[PathBuf],
    ) -> Result<PhoneUploadResponse> {
        validate_photo_count(photos.len())?;
        let endpoint = self
            .endpoint
            .join(&format!("api/phone-upload/{}", token))?;

        let parts = join_all(photos.iter().map(|path| photo_part(path)))
            .await
            .into_iter()
            .collect::<Result<Vec<Part>>>()?;
        let mut form = Form::new();
        for part in parts {
            form = form.part(PHOTO_FIELD, part);
        }

        let res = self.client.post(endpoint).multipart(form).send().await?;

        if res.status().is_success() {
            Ok(res.json().await?)
        } else {
            let api_error = ApiError::try_from_response(res).await?;
            Err(api_error.into())
        }
    }

    /// Returns the upload state of a phone session.
    pub async fn phone_upload_status(
        &self,
        token: &SessionToken,
    ) -> Result<PhoneUploadStatusResponse> {
        let endpoint = self
            .endpoint
            .join(&format!("api/phone-upload-status/{}", token))?;

        let res = self.client.get(endpoint).send().await?;

        if res.status().is_success() {
            Ok(res.json().await?)
        } else {
            let api_error = ApiError::try_from_response(res).await?;
            Err(api_error.into())
        }
    }

    /// Lists the furniture catalog, optionally filtered.
    pub async fn list_furniture(
        &self,
        category: Option<&str>,
        style: Option<&str>,
    ) -> Result<Vec<FurnitureItem>> {
        let mut endpoint = self.endpoint.join("furniture")?;
        {
            let mut query = endpoint.query_pairs_mut();
            if let Some(category) = category {
                query.append_pair("category", category);
            }
            if let Some(style) = style {
                query.append_pair("style", style);
            }
        }

        let res = self.client.get(endpoint).send().await?;

        if res.status().is_success() {
            Ok(res.json().await?)
        } else {
            let api_error = ApiError::try_from_response(res).await?;
            Err(api_error.into())
        }
    }
}

impl Backend for ApiClient {
    async fn create_project_from_photos(
        &self,
        photos: Vec<PathBuf>,
    ) -> Result<CreateProjectResponse> {
        ApiClient::create_project_from_photos(self, &photos).await
    }

    async fn create_project_from_session(
        &self,
        token: SessionToken,
    ) -> Result<CreateProjectResponse> {
        ApiClient::create_project_from_session(self, &token).await
    }

    async fn project_status(&self, id: ProjectId) -> Result<ProjectStatusResponse> {
        self.get_project(&id).await
    }

    async fn upload_status(&self, token: SessionToken) -> Result<PhoneUploadStatusResponse> {
        self.phone_upload_status(&token).await
    }

    async fn submit_phone_photos(
        &self,
        token: SessionToken,
        photos: Vec<PathBuf>,
    ) -> Result<PhoneUploadResponse> {
        self.phone_upload(&token, &photos).await
    }
}

/// Reads one photo into a multipart part, guessing the MIME type from
/// the file extension.
async fn photo_part(path: &Path) -> Result<Part> {
    let bytes = tokio::fs::read(path).await?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "photo".to_owned());

    let mime = match path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
        .as_deref()
    {
        Some("png") => "image/png",
        Some("webp") => "image/webp",
        Some("heic") => "image/heic",
        _ => "image/jpeg",
    };

    let part = Part::bytes(bytes).file_name(file_name).mime_str(mime)?;
    Ok(part)
}

impl StdError for ApiError {}

impl ApiError {
    async fn try_from_response(response: Response) -> Result<Self> {
        let status = response.status();
        let text = response.text().await?;
        match serde_json::from_str(&text) {
            Ok(rejection) => Ok(Self::Rejection(rejection)),
            Err(_) => Ok(Self::Unstructured(status, text)),
        }
    }
}

fn build_http_client() -> HttpClient {
    let mut headers = HeaderMap::new();
    headers.insert(USER_AGENT, HeaderValue::from_static(ROOMFORGE_USER_AGENT));

    reqwest::Client::builder()
        .default_headers(headers)
        .build()
        .unwrap()
}
