//! Single-image analysis: decode, sharpness, subject detection, and centering.

use image::metadata::Orientation;
use image::{DynamicImage, GrayImage, ImageDecoder, ImageReader};
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::types::{BlurCategory, CenterCategory, ImageAnalysis};
use crate::utils::config::{BLUR_SCORE_DECIMALS, CENTER_SCORE_DECIMALS};
use crate::vision::{self, Capability, DetectionBox, VisionModels};

#[derive(Error, Debug)]
pub enum AnalyzeError {
    /// The file could not be read or decoded (corrupt or unsupported format).
    #[error("cannot load image {path}: {source}")]
    Load {
        path: PathBuf,
        source: image::ImageError,
    },
    /// Decoded image has no pixels.
    #[error("empty image {0}")]
    Empty(PathBuf),
}

/// Round to `decimals` places, as stored in the cache.
pub fn round_to(value: f64, decimals: i32) -> f64 {
    let f = 10f64.powi(decimals);
    (value * f).round() / f
}

/// Largest box by area. Ties keep the first one in `boxes` order.
pub fn largest_detection(boxes: &[DetectionBox]) -> Option<DetectionBox> {
    boxes.iter().fold(None, |best: Option<DetectionBox>, b| match best {
        Some(cur) if cur.area() >= b.area() => Some(cur),
        _ => Some(*b),
    })
}

/// Distance from the box center to the image center, each axis normalized by its image dimension.
/// 0.0 is dead center; a corner box approaches ~0.7.
pub fn center_score(bbox: &DetectionBox, width: u32, height: u32) -> f64 {
    let (cx, cy) = bbox.center();
    let (w, h) = (width as f64, height as f64);
    let dx = (cx - w / 2.0) / w;
    let dy = (cy - h / 2.0) / h;
    (dx * dx + dy * dy).sqrt()
}

/// Analyze already-decoded grayscale pixels.
///
/// With no detections the center score is 0.0 ("well centered"). That is a convention for
/// "nothing to judge", not a composition verdict.
pub fn analyze_gray(gray: &GrayImage, models: &VisionModels) -> anyhow::Result<ImageAnalysis> {
    let (width, height) = gray.dimensions();

    let blur_score = round_to(vision::sharpness(gray)?, BLUR_SCORE_DECIMALS);

    let faces = models.detect(Capability::HumanFace, gray);
    let cats = models.detect(Capability::CatFace, gray);

    let mut all = faces.clone();
    all.extend_from_slice(&cats);
    let score = match largest_detection(&all) {
        Some(bbox) => center_score(&bbox, width, height),
        None => 0.0,
    };
    let center_score = round_to(score, CENTER_SCORE_DECIMALS);

    Ok(ImageAnalysis {
        width,
        height,
        blur_score,
        blur_category: BlurCategory::from_score(blur_score),
        has_person: !faces.is_empty(),
        has_pet: !cats.is_empty(),
        center_score,
        center_category: CenterCategory::from_score(center_score),
    })
}

/// Decode by content rather than extension, then apply the EXIF orientation if any.
fn decode_oriented(path: &Path) -> Result<DynamicImage, image::ImageError> {
    let mut decoder = ImageReader::open(path)?
        .with_guessed_format()?
        .into_decoder()?;
    let orientation = decoder.orientation().unwrap_or(Orientation::NoTransforms);
    let mut img = DynamicImage::from_decoder(decoder)?;
    img.apply_orientation(orientation);
    Ok(img)
}

/// Decode `path` and analyze it. Decode failure is the only hard error.
pub fn analyze_image(path: &Path, models: &VisionModels) -> Result<ImageAnalysis, AnalyzeError> {
    let img = decode_oriented(path).map_err(|source| AnalyzeError::Load {
        path: path.to_path_buf(),
        source,
    })?;
    if img.width() == 0 || img.height() == 0 {
        return Err(AnalyzeError::Empty(path.to_path_buf()));
    }
    let gray = vision::to_gray(&img.to_rgb8());
    analyze_gray(&gray, models).map_err(|_| AnalyzeError::Empty(path.to_path_buf()))
}
