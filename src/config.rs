use std::env;
use std::path::PathBuf;

use crate::collage_generator::RenderSettings;

#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub host: String,
    pub results_path: String,
    pub assets_path: String,
    pub logo_file: String,
    pub signature_file: String,
    pub max_upload_mb: u64,
    pub jpeg_quality: u8,
    pub public_base_url: String,
}

impl Config {
    pub fn from_env() -> Result<Self, Box<dyn std::error::Error>> {
        let port: u16 = env::var("PHOTO_COLLAGE_PORT")
            .or_else(|_| env::var("PORT"))
            .unwrap_or_else(|_| "8080".to_string())
            .parse()?;

        let jpeg_quality: u8 = env::var("PHOTO_COLLAGE_JPEG_QUALITY")
            .unwrap_or_else(|_| "95".to_string())
            .parse()?;
        if !(1..=100).contains(&jpeg_quality) {
            return Err(format!("JPEG quality must be 1-100, got {}", jpeg_quality).into());
        }

        Ok(Config {
            port,
            host: env::var("PHOTO_COLLAGE_HOST").unwrap_or_else(|_| "0.0.0.0".to_string()),
            results_path: env::var("PHOTO_COLLAGE_RESULTS_PATH")
                .unwrap_or_else(|_| "./data/results".to_string()),
            assets_path: env::var("PHOTO_COLLAGE_ASSETS_PATH")
                .unwrap_or_else(|_| "./assets".to_string()),
            logo_file: env::var("PHOTO_COLLAGE_LOGO_FILE")
                .unwrap_or_else(|_| "logo.png".to_string()),
            signature_file: env::var("PHOTO_COLLAGE_SIGNATURE_FILE")
                .unwrap_or_else(|_| "signature.png".to_string()),
            max_upload_mb: env::var("PHOTO_COLLAGE_MAX_UPLOAD_MB")
                .unwrap_or_else(|_| "5".to_string())
                .parse()?,
            jpeg_quality,
            public_base_url: env::var("PHOTO_COLLAGE_PUBLIC_BASE_URL")
                .unwrap_or_else(|_| format!("http://localhost:{}", port)),
        })
    }

    pub fn max_upload_bytes(&self) -> u64 {
        self.max_upload_mb * 1024 * 1024
    }

    pub fn render_settings(&self) -> RenderSettings {
        RenderSettings {
            assets_dir: PathBuf::from(&self.assets_path),
            logo_file: self.logo_file.clone(),
            signature_file: self.signature_file.clone(),
            max_upload_bytes: self.max_upload_bytes(),
            jpeg_quality: self.jpeg_quality,
        }
    }
}
