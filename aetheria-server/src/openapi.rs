//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3.0 specification for the Aetheria API.

use utoipa::OpenApi;

use crate::handlers::{
    EnhanceActionRequest, EnhanceActionResponse, EnhancementListResponse, EnhancementResponse,
    GalleryEntryResponse, GalleryResponse, HealthResponse, ImageListResponse, ImageResponse,
    ReadyResponse, TransformActionRequest, TransformActionResponse, VariationListResponse,
    VariationResponse, VariationsActionRequest, VariationsActionResponse, VariationsRequest,
};

/// Aetheria API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Aetheria - Image Workspace API",
        version = "0.1.0",
        description = r#"
## Upload, enhance and restyle photos

Aetheria stores uploaded photos, runs them through a hosted generative
image model and keeps a per-user history of every result.

### How It Works

1. **Upload** an image via `POST /api/v1/images` (optionally with `transform=desaturate`)
2. **Enhance** it via `POST /api/v1/images/{id}/enhance`
3. **Restyle** it via `POST /api/v1/images/{id}/variations` with a free-text prompt
4. Browse the **history** via `GET /api/v1/images` or `GET /api/v1/gallery`

Owner-scoped routes read the user id from the `x-user-id` header.
The `/api/v1/actions/*` routes transform data URIs without storing anything.
"#,
        license(name = "MIT OR Apache-2.0")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Images", description = "Upload and browse image history"),
        (name = "Transforms", description = "Enhance and restyle stored images"),
        (name = "Actions", description = "Stateless transforms on data URIs"),
        (name = "Objects", description = "Stored object retrieval"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::images::upload_image,
        crate::handlers::images::list_images,
        crate::handlers::images::get_image,
        crate::handlers::images::list_enhancements,
        crate::handlers::images::list_variations,
        crate::handlers::images::enhance_image,
        crate::handlers::images::generate_variations,
        crate::handlers::images::gallery,
        crate::handlers::actions::enhance_action,
        crate::handlers::actions::variations_action,
        crate::handlers::actions::transform_action,
        crate::handlers::objects::get_object,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            ImageResponse,
            ImageListResponse,
            EnhancementResponse,
            EnhancementListResponse,
            VariationResponse,
            VariationListResponse,
            VariationsRequest,
            GalleryEntryResponse,
            GalleryResponse,
            EnhanceActionRequest,
            EnhanceActionResponse,
            VariationsActionRequest,
            VariationsActionResponse,
            TransformActionRequest,
            TransformActionResponse,
        )
    )
)]
pub struct ApiDoc;
