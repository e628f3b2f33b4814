pub mod asset_overlay;
pub mod collage_error;
pub mod collage_generator;
pub mod compositor;
pub mod config;
pub mod handlers_collage;
pub mod handlers_health;
pub mod handlers_resize;
pub mod handlers_results;
pub mod image_codec;
pub mod layout;
pub mod photo_fetcher;
pub mod routes;
pub mod storage;
pub mod upload_form;
pub mod warp_helpers;
