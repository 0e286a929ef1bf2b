//! Vision primitives: Laplacian sharpness and per-capability object detection.
//!
//! Detection goes through [`VisionModels`], an explicit capability object built once and passed
//! by reference to the analyzer. Each capability's model loads lazily on first use and at most
//! once per [`VisionModels`]; a model that fails to load leaves the capability
//! [`ModelStatus::Unavailable`] and every later `detect` returns an empty list.

pub mod cascade;
pub mod grouping;

use anyhow::{Result, bail};
use image::{GrayImage, ImageBuffer, Luma, RgbImage};
use imageproc::filter::filter3x3;
use log::{debug, warn};
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use crate::utils::config::DetectorConsts;

pub use cascade::{CascadeError, HaarCascade};
pub use grouping::group_rectangles;

type GrayF32 = ImageBuffer<Luma<f32>, Vec<f32>>;

/// 4-neighbour discrete Laplacian.
const LAPLACIAN_KERNEL: [f32; 9] = [0.0, 1.0, 0.0, 1.0, -4.0, 1.0, 0.0, 1.0, 0.0];

/// Axis-aligned box in pixel coordinates, origin top-left.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct DetectionBox {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl DetectionBox {
    pub fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub fn area(&self) -> u64 {
        self.width as u64 * self.height as u64
    }

    pub fn center(&self) -> (f64, f64) {
        (
            self.x as f64 + self.width as f64 / 2.0,
            self.y as f64 + self.height as f64 / 2.0,
        )
    }
}

/// What a detector looks for.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Capability {
    HumanFace,
    CatFace,
}

impl Capability {
    pub fn params(&self) -> DetectorParams {
        match self {
            Capability::HumanFace => DetectorParams {
                scale_factor: DetectorConsts::SCALE_FACTOR,
                min_neighbors: DetectorConsts::FACE_MIN_NEIGHBORS,
                min_size: DetectorConsts::FACE_MIN_SIZE,
            },
            Capability::CatFace => DetectorParams {
                scale_factor: DetectorConsts::SCALE_FACTOR,
                min_neighbors: DetectorConsts::CAT_FACE_MIN_NEIGHBORS,
                min_size: DetectorConsts::CAT_FACE_MIN_SIZE,
            },
        }
    }

    /// Cascade files to try, in order.
    pub fn cascade_files(&self) -> &'static [&'static str] {
        match self {
            Capability::HumanFace => DetectorConsts::FACE_CASCADES,
            Capability::CatFace => DetectorConsts::CAT_FACE_CASCADES,
        }
    }
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Capability::HumanFace => f.write_str("face"),
            Capability::CatFace => f.write_str("cat face"),
        }
    }
}

/// Multi-scale detector tuning.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct DetectorParams {
    /// Window growth per scale step.
    pub scale_factor: f64,
    /// Candidate clusters need more than this many members to count as a detection.
    pub min_neighbors: usize,
    /// Smallest detection (width, height) in pixels.
    pub min_size: (u32, u32),
}

/// Pluggable detection backend. Implementations never fail; "nothing found" is an empty list.
pub trait Detector: Send + Sync {
    fn detect(&self, gray: &GrayImage, params: &DetectorParams) -> Vec<DetectionBox>;
}

/// Load state of one capability.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModelStatus {
    /// Not requested yet.
    NotLoaded,
    Loaded,
    /// Load failed or no model configured; detection returns nothing.
    Unavailable,
}

enum ModelSource {
    /// Load OpenCV cascades from this directory (None: no directory found).
    CascadeDir(Option<PathBuf>),
    /// Detectors were supplied up front.
    Injected,
}

type DetectorSlot = OnceLock<Option<Box<dyn Detector>>>;

/// Detection capabilities shared by every analysis in a process.
pub struct VisionModels {
    source: ModelSource,
    face: DetectorSlot,
    cat_face: DetectorSlot,
}

impl VisionModels {
    /// Lazily load cascades from `cascade_dir` on first detect per capability.
    pub fn from_cascade_dir(cascade_dir: Option<PathBuf>) -> Self {
        Self {
            source: ModelSource::CascadeDir(cascade_dir),
            face: OnceLock::new(),
            cat_face: OnceLock::new(),
        }
    }

    /// Use the given detectors; `None` leaves that capability unavailable.
    pub fn with_detectors(
        face: Option<Box<dyn Detector>>,
        cat_face: Option<Box<dyn Detector>>,
    ) -> Self {
        let models = Self {
            source: ModelSource::Injected,
            face: OnceLock::new(),
            cat_face: OnceLock::new(),
        };
        let _ = models.face.set(face);
        let _ = models.cat_face.set(cat_face);
        models
    }

    /// No detection at all; every image reports no subjects.
    pub fn disabled() -> Self {
        Self::with_detectors(None, None)
    }

    fn slot(&self, capability: Capability) -> &DetectorSlot {
        match capability {
            Capability::HumanFace => &self.face,
            Capability::CatFace => &self.cat_face,
        }
    }

    /// Current load state, without triggering a load.
    pub fn status(&self, capability: Capability) -> ModelStatus {
        match self.slot(capability).get() {
            None => ModelStatus::NotLoaded,
            Some(Some(_)) => ModelStatus::Loaded,
            Some(None) => ModelStatus::Unavailable,
        }
    }

    /// Load the capability's model if needed and report whether detection is possible.
    pub fn is_available(&self, capability: Capability) -> bool {
        self.detector(capability).is_some()
    }

    fn detector(&self, capability: Capability) -> Option<&dyn Detector> {
        self.slot(capability)
            .get_or_init(|| self.load(capability))
            .as_deref()
    }

    /// Run detection for `capability` with its standard parameters. Empty when unavailable.
    pub fn detect(&self, capability: Capability, gray: &GrayImage) -> Vec<DetectionBox> {
        match self.detector(capability) {
            Some(d) => d.detect(gray, &capability.params()),
            None => Vec::new(),
        }
    }

    fn load(&self, capability: Capability) -> Option<Box<dyn Detector>> {
        let dir = match &self.source {
            ModelSource::Injected => return None,
            ModelSource::CascadeDir(None) => {
                warn!(
                    "No cascade directory found (set --cascade-dir or {}); {} detection disabled",
                    crate::utils::PackagePaths::get().cascade_dir_env(),
                    capability
                );
                return None;
            }
            ModelSource::CascadeDir(Some(dir)) => dir,
        };
        match load_first_cascade(dir, capability.cascade_files()) {
            Some(cascade) => Some(Box::new(cascade)),
            None => {
                warn!(
                    "Failed to load {} cascade classifier from {}; {} detection disabled",
                    capability,
                    dir.display(),
                    capability
                );
                None
            }
        }
    }
}

fn load_first_cascade(dir: &Path, files: &[&str]) -> Option<HaarCascade> {
    for file in files {
        let path = dir.join(file);
        match HaarCascade::load(&path) {
            Ok(cascade) => {
                debug!("Loaded cascade {}", path.display());
                return Some(cascade);
            }
            Err(e) => debug!("Skipping cascade {}: {}", path.display(), e),
        }
    }
    None
}

/// BT.601 luma (0.299 R + 0.587 G + 0.114 B) in 14-bit fixed point, rounded half up.
pub fn to_gray(rgb: &RgbImage) -> GrayImage {
    const SHIFT: u32 = 14;
    const R: u32 = 4899;
    const G: u32 = 9617;
    const B: u32 = 1868;
    ImageBuffer::from_fn(rgb.width(), rgb.height(), |x, y| {
        let [r, g, b] = rgb.get_pixel(x, y).0;
        let luma = (r as u32 * R + g as u32 * G + b as u32 * B + (1 << (SHIFT - 1))) >> SHIFT;
        Luma([luma as u8])
    })
}

/// Variance of the Laplacian of `gray`. Higher is sharper. Errors only on an empty image.
pub fn sharpness(gray: &GrayImage) -> Result<f64> {
    let (w, h) = gray.dimensions();
    if w == 0 || h == 0 {
        bail!("cannot compute sharpness of an empty image");
    }
    let gray_f: GrayF32 = ImageBuffer::from_fn(w, h, |x, y| Luma([gray.get_pixel(x, y)[0] as f32]));
    let lap: Vec<f32> = filter3x3(&gray_f, &LAPLACIAN_KERNEL).into_raw();

    let n = lap.len() as f64;
    let mean = lap.iter().map(|&v| v as f64).sum::<f64>() / n;
    let var = lap
        .iter()
        .map(|&v| {
            let d = v as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    Ok(var)
}
