//! HTTP request handlers
//!
//! This module contains all the request handlers for the API endpoints.

pub mod actions;
pub mod health;
pub mod images;
pub mod objects;

pub use crate::state::AppState;
pub use actions::{
    enhance_action, transform_action, variations_action, EnhanceActionRequest,
    EnhanceActionResponse, TransformActionRequest, TransformActionResponse,
    VariationsActionRequest, VariationsActionResponse,
};
pub use health::{health, ready, HealthResponse, ReadyResponse};
pub use images::{
    enhance_image, gallery, generate_variations, get_image, list_enhancements, list_images,
    list_variations, upload_image, EnhancementListResponse, EnhancementResponse,
    GalleryEntryResponse, GalleryResponse, ImageListResponse, ImageResponse,
    VariationListResponse, VariationResponse, VariationsRequest,
};
pub use objects::get_object;
