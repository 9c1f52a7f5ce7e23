use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    response::Json,
    routing::{delete, get, post},
};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use submap_core::{
    config::data_dir_from_env_value, CoreConfig, FsSubjectMappingStore, MappingError, MappingId,
    NewSubjectMapping, PluginManifest, SubjectMapping, SubjectMappingService,
};

/// Application state shared across REST API handlers
///
/// Holds the mapping service for data operations plus the plugin manifest
/// built once at startup.
#[derive(Clone)]
struct AppState {
    mapping_service: SubjectMappingService,
    manifest: Arc<PluginManifest>,
}

/// Health status response
#[derive(serde::Serialize, utoipa::ToSchema)]
struct HealthRes {
    ok: bool,
    message: String,
}

/// A subject mapping as exposed over REST
#[derive(serde::Serialize, utoipa::ToSchema)]
struct Mapping {
    id: String,
    subject_id: String,
    record_id: String,
    source: String,
    created: String,
    updated: String,
}

impl From<SubjectMapping> for Mapping {
    fn from(m: SubjectMapping) -> Self {
        Self {
            id: m.id.to_string(),
            subject_id: m.subject_id,
            record_id: m.record_id,
            source: m.source,
            created: m.created.to_rfc3339(),
            updated: m.updated.to_rfc3339(),
        }
    }
}

/// List of subject mappings
#[derive(serde::Serialize, utoipa::ToSchema)]
struct ListMappingsRes {
    mappings: Vec<Mapping>,
}

impl ListMappingsRes {
    fn from_mappings(mappings: Vec<SubjectMapping>) -> Self {
        Self {
            mappings: mappings.into_iter().map(Mapping::from).collect(),
        }
    }
}

/// Mapping creation request
#[derive(serde::Deserialize, utoipa::ToSchema)]
struct CreateMappingReq {
    subject_id: String,
    record_id: String,
    source: String,
}

/// One declared data-model type
#[derive(serde::Serialize, utoipa::ToSchema)]
struct DataModelRes {
    schema_element: String,
    singular: String,
    plural: String,
}

/// The plugin manifest as exposed over REST
#[derive(serde::Serialize, utoipa::ToSchema)]
struct PluginManifestRes {
    id: String,
    name: String,
    data_models: Vec<DataModelRes>,
}

impl From<&PluginManifest> for PluginManifestRes {
    fn from(manifest: &PluginManifest) -> Self {
        Self {
            id: manifest.id.to_string(),
            name: manifest.name.to_string(),
            data_models: manifest
                .data_models
                .iter()
                .map(|m| DataModelRes {
                    schema_element: m.schema_element.to_string(),
                    singular: m.singular.to_string(),
                    plural: m.plural.to_string(),
                })
                .collect(),
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        health,
        list_mappings,
        create_mapping,
        get_mapping,
        delete_mapping,
        find_by_subject,
        find_by_record,
        find_by_source,
        data_models
    ),
    components(schemas(
        HealthRes,
        Mapping,
        ListMappingsRes,
        CreateMappingReq,
        DataModelRes,
        PluginManifestRes
    ))
)]
struct ApiDoc;

/// Main entry point for the subject mapping service
///
/// Resolves configuration from the environment once, wires the file-backed
/// store into the mapping service, and serves the REST API.
///
/// # Environment Variables
/// - `SUBMAP_REST_ADDR`: REST server address (default: "0.0.0.0:3000")
/// - `SUBMAP_DATA_DIR`: Directory for mapping data storage (default: "/mapping_data")
///
/// # Returns
/// * `Ok(())` - If the server starts and runs successfully
/// * `Err(anyhow::Error)` - If startup or runtime fails
#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("submap=info".parse()?),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let rest_addr = std::env::var("SUBMAP_REST_ADDR").unwrap_or_else(|_| "0.0.0.0:3000".into());
    let data_dir = data_dir_from_env_value(std::env::var("SUBMAP_DATA_DIR").ok());

    let cfg = CoreConfig::new(data_dir)?;
    let store = FsSubjectMappingStore::new(&cfg)?;
    let mapping_service = SubjectMappingService::new(Arc::new(store));
    let manifest = submap_core::plugin_manifest()?;

    tracing::info!("++ Starting submap REST on {}", rest_addr);
    tracing::info!("++ Mapping data dir: {}", cfg.mapping_data_dir().display());
    for model in &manifest.data_models {
        tracing::info!(
            "++ Registered data model {} ({} / {})",
            model.schema_element,
            model.singular,
            model.plural
        );
    }

    let app = Router::new()
        .route("/health", get(health))
        .route("/mappings", get(list_mappings))
        .route("/mappings", post(create_mapping))
        .route("/mappings/:id", get(get_mapping))
        .route("/mappings/:id", delete(delete_mapping))
        .route("/mappings/subject/:subject_id", get(find_by_subject))
        .route("/mappings/record/:source/:record_id", get(find_by_record))
        .route("/mappings/source/:source", get(find_by_source))
        .route("/data-models", get(data_models))
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CorsLayer::permissive())
        .with_state(AppState {
            mapping_service,
            manifest: Arc::new(manifest),
        });

    let listener = tokio::net::TcpListener::bind(&rest_addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

/// Maps a storage fault onto a REST status code, logging the detail.
fn storage_error(e: MappingError) -> (StatusCode, &'static str) {
    tracing::error!("Storage error: {:?}", e);
    (StatusCode::INTERNAL_SERVER_ERROR, "Internal error")
}

#[utoipa::path(
    get,
    path = "/health",
    responses(
        (status = 200, description = "Health check response", body = HealthRes)
    )
)]
/// Health check endpoint for the REST API
///
/// Used for monitoring and load balancer health checks.
async fn health(State(_state): State<AppState>) -> Json<HealthRes> {
    Json(HealthRes {
        ok: true,
        message: "submap is alive".into(),
    })
}

#[utoipa::path(
    get,
    path = "/mappings",
    responses(
        (status = 200, description = "List of subject mappings", body = ListMappingsRes),
        (status = 500, description = "Internal server error")
    )
)]
/// List all subject mappings
async fn list_mappings(
    State(state): State<AppState>,
) -> Result<Json<ListMappingsRes>, (StatusCode, &'static str)> {
    let mappings = state.mapping_service.list().map_err(storage_error)?;
    Ok(Json(ListMappingsRes::from_mappings(mappings)))
}

#[utoipa::path(
    post,
    path = "/mappings",
    request_body = CreateMappingReq,
    responses(
        (status = 200, description = "Mapping created", body = Mapping),
        (status = 400, description = "Bad request"),
        (status = 500, description = "Internal server error")
    )
)]
/// Create a new subject mapping
///
/// Rejects a missing subject ID or one that already has a mapping.
async fn create_mapping(
    State(state): State<AppState>,
    Json(req): Json<CreateMappingReq>,
) -> Result<Json<Mapping>, (StatusCode, &'static str)> {
    match state.mapping_service.create(NewSubjectMapping {
        subject_id: req.subject_id,
        record_id: req.record_id,
        source: req.source,
    }) {
        Ok(mapping) => Ok(Json(mapping.into())),
        Err(MappingError::InvalidInput(_)) => {
            Err((StatusCode::BAD_REQUEST, "subject_id is required"))
        }
        Err(MappingError::DuplicateSubjectId(_)) => Err((
            StatusCode::BAD_REQUEST,
            "a mapping for this subject already exists",
        )),
        Err(e) => Err(storage_error(e)),
    }
}

#[utoipa::path(
    get,
    path = "/mappings/{id}",
    responses(
        (status = 200, description = "The mapping", body = Mapping),
        (status = 400, description = "Invalid mapping ID"),
        (status = 404, description = "No such mapping"),
        (status = 500, description = "Internal server error")
    )
)]
/// Retrieve a mapping by its storage ID
async fn get_mapping(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Mapping>, (StatusCode, &'static str)> {
    let id = MappingId::parse(&id).map_err(|_| (StatusCode::BAD_REQUEST, "Invalid mapping ID"))?;
    match state.mapping_service.retrieve(&id).map_err(storage_error)? {
        Some(mapping) => Ok(Json(mapping.into())),
        None => Err((StatusCode::NOT_FOUND, "No such mapping")),
    }
}

#[utoipa::path(
    delete,
    path = "/mappings/{id}",
    responses(
        (status = 200, description = "Mapping deleted"),
        (status = 400, description = "Invalid mapping ID"),
        (status = 404, description = "No such mapping"),
        (status = 500, description = "Internal server error")
    )
)]
/// Delete a mapping by its storage ID
async fn delete_mapping(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, (StatusCode, &'static str)> {
    let id = MappingId::parse(&id).map_err(|_| (StatusCode::BAD_REQUEST, "Invalid mapping ID"))?;
    match state.mapping_service.delete(&id) {
        Ok(()) => Ok(StatusCode::OK),
        Err(MappingError::NotFound(_)) => Err((StatusCode::NOT_FOUND, "No such mapping")),
        Err(e) => Err(storage_error(e)),
    }
}

#[utoipa::path(
    get,
    path = "/mappings/subject/{subject_id}",
    responses(
        (status = 200, description = "The mapping for the subject", body = Mapping),
        (status = 404, description = "No mapping for the subject"),
        (status = 500, description = "Internal server error")
    )
)]
/// Find the mapping for an internal subject ID
async fn find_by_subject(
    State(state): State<AppState>,
    Path(subject_id): Path<String>,
) -> Result<Json<Mapping>, (StatusCode, &'static str)> {
    match state
        .mapping_service
        .find_by_subject_id(&subject_id)
        .map_err(storage_error)?
    {
        Some(mapping) => Ok(Json(mapping.into())),
        None => Err((StatusCode::NOT_FOUND, "No mapping for the subject")),
    }
}

#[utoipa::path(
    get,
    path = "/mappings/record/{source}/{record_id}",
    responses(
        (status = 200, description = "The first matching mapping", body = Mapping),
        (status = 404, description = "No mapping for the record"),
        (status = 500, description = "Internal server error")
    )
)]
/// Find the mapping for a record ID within a source system
///
/// If duplicate (record, source) pairs exist, the first mapping found wins.
async fn find_by_record(
    State(state): State<AppState>,
    Path((source, record_id)): Path<(String, String)>,
) -> Result<Json<Mapping>, (StatusCode, &'static str)> {
    match state
        .mapping_service
        .find_by_record_id(&record_id, &source)
        .map_err(storage_error)?
    {
        Some(mapping) => Ok(Json(mapping.into())),
        None => Err((StatusCode::NOT_FOUND, "No mapping for the record")),
    }
}

#[utoipa::path(
    get,
    path = "/mappings/source/{source}",
    responses(
        (status = 200, description = "All mappings from the source system", body = ListMappingsRes),
        (status = 500, description = "Internal server error")
    )
)]
/// List all mappings from a source system
///
/// Returns an empty list (never 404) when no mapping matches.
async fn find_by_source(
    State(state): State<AppState>,
    Path(source): Path<String>,
) -> Result<Json<ListMappingsRes>, (StatusCode, &'static str)> {
    let mappings = state
        .mapping_service
        .find_by_source(&source)
        .map_err(storage_error)?;
    Ok(Json(ListMappingsRes::from_mappings(mappings)))
}

#[utoipa::path(
    get,
    path = "/data-models",
    responses(
        (status = 200, description = "The plugin manifest", body = PluginManifestRes)
    )
)]
/// The data-model types this plugin declares to the platform
async fn data_models(State(state): State<AppState>) -> Json<PluginManifestRes> {
    Json(PluginManifestRes::from(state.manifest.as_ref()))
}
