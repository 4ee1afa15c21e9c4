// ABOUTME: Picture processing for uploads: decode, resize, thumbnail and JPEG encoding
// ABOUTME: Also shortens long upload file names before they are stored as picture names
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Recipe Server Contributors

use image::codecs::jpeg::JpegEncoder;
use image::imageops::FilterType;
use image::DynamicImage;
use recipe_core::constants::{messages, pictures};
use recipe_core::errors::{AppError, AppResult};

use crate::config::PictureConfig;

/// Encoded picture and thumbnail
#[derive(Debug, Clone)]
pub struct ProcessedPicture {
    /// JPEG scaled to fit the configured bounding box
    pub data: Vec<u8>,
    /// Square JPEG thumbnail
    pub thumbnail: Vec<u8>,
}

/// Decode an upload and produce the stored JPEGs
///
/// CPU bound; callers run it on the blocking pool.
///
/// # Errors
///
/// Returns `VALIDATION_FAILED` with `{file: invalidValue}` for bytes that are
/// not a supported image, or an internal error if encoding fails
pub fn process_upload(bytes: &[u8], config: PictureConfig) -> AppResult<ProcessedPicture> {
    let image = image::load_from_memory(bytes).map_err(|e| {
        tracing::debug!(error = %e, "Rejected undecodable upload");
        AppError::invalid_field("file", messages::INVALID_VALUE)
    })?;

    let fitted = image.resize(config.image_dimension, config.image_dimension, FilterType::Lanczos3);
    let thumbnail = image.resize_to_fill(
        config.thumbnail_dimension,
        config.thumbnail_dimension,
        FilterType::Lanczos3,
    );

    Ok(ProcessedPicture {
        data: encode_jpeg(&fitted, pictures::IMAGE_QUALITY)?,
        thumbnail: encode_jpeg(&thumbnail, pictures::THUMBNAIL_QUALITY)?,
    })
}

fn encode_jpeg(image: &DynamicImage, quality: u8) -> AppResult<Vec<u8>> {
    let mut buffer = Vec::new();
    JpegEncoder::new_with_quality(&mut buffer, quality)
        .encode_image(&image.to_rgb8())
        .map_err(|e| AppError::internal(format!("JPEG encoding failed: {e}")))?;
    Ok(buffer)
}

/// Picture name for an uploaded file name
///
/// Names of 80 characters or more keep their first 75 characters followed
/// by `...`.
#[must_use]
pub fn picture_name(file_name: &str) -> String {
    if file_name.chars().count() < pictures::NAME_TRUNCATE_AT {
        return file_name.to_owned();
    }
    let mut name: String = file_name.chars().take(pictures::NAME_KEEP).collect();
    name.push_str("...");
    name
}
