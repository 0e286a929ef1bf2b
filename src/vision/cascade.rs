//! Haar cascade classifier over OpenCV's cascade XML format (`opencv-cascade-classifier`).
//!
//! Features are scaled instead of the image: one integral image per call, the detection window
//! grows by `scale_factor` per step, and candidate windows are merged with
//! [`group_rectangles`](super::group_rectangles). Only upright (non-tilted) HAAR features are
//! supported; cascades containing tilted features are rejected at load.

use image::GrayImage;
use image::imageops::{self, FilterType};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

use super::{DetectionBox, Detector, DetectorParams, group_rectangles};
use crate::utils::config::DetectorConsts;

/// Longer image side used for detection; bigger images are downscaled first and boxes mapped back.
const MAX_DETECT_SIDE: u32 = 1600;

#[derive(Error, Debug)]
pub enum CascadeError {
    #[error("read {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("parse cascade XML: {0}")]
    Xml(#[from] quick_xml::de::DeError),
    #[error("unsupported cascade: {0}")]
    Unsupported(String),
    #[error("malformed cascade: {0}")]
    Malformed(String),
}

// ---- XML shape ----

/// OpenCV writes sequences as repeated `<_>` children.
#[derive(Debug, Deserialize)]
struct Seq<T> {
    #[serde(rename = "_", default = "Vec::new")]
    items: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct StorageXml {
    cascade: CascadeXml,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CascadeXml {
    stage_type: String,
    feature_type: String,
    height: String,
    width: String,
    stages: Seq<StageXml>,
    features: Seq<FeatureXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct StageXml {
    stage_threshold: String,
    weak_classifiers: Seq<WeakXml>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct WeakXml {
    internal_nodes: String,
    leaf_values: String,
}

#[derive(Debug, Deserialize)]
struct FeatureXml {
    rects: Seq<String>,
    #[serde(default)]
    tilted: Option<String>,
}

// ---- Parsed model ----

#[derive(Clone, Copy, Debug)]
struct WeightedRect {
    x: u32,
    y: u32,
    w: u32,
    h: u32,
    weight: f64,
}

#[derive(Clone, Debug)]
struct Feature {
    rects: Vec<WeightedRect>,
}

/// Split node. A child `<= 0` is leaf index `-child`; `> 0` is another node index.
#[derive(Clone, Copy, Debug)]
struct Node {
    left: i32,
    right: i32,
    feature: usize,
    threshold: f64,
}

#[derive(Clone, Debug)]
struct WeakClassifier {
    nodes: Vec<Node>,
    leaves: Vec<f64>,
}

#[derive(Clone, Debug)]
struct Stage {
    threshold: f64,
    classifiers: Vec<WeakClassifier>,
}

/// Boosted cascade of Haar-feature trees.
#[derive(Clone, Debug)]
pub struct HaarCascade {
    window: (u32, u32),
    stages: Vec<Stage>,
    features: Vec<Feature>,
}

fn parse_num<T: std::str::FromStr>(s: &str, what: &str) -> Result<T, CascadeError> {
    s.trim()
        .parse()
        .map_err(|_| CascadeError::Malformed(format!("{what}: {s:?}")))
}

fn parse_list<T: std::str::FromStr>(s: &str, what: &str) -> Result<Vec<T>, CascadeError> {
    s.split_whitespace().map(|t| parse_num(t, what)).collect()
}

impl HaarCascade {
    /// Load a cascade XML file.
    pub fn load(path: &Path) -> Result<Self, CascadeError> {
        let xml = std::fs::read_to_string(path).map_err(|source| CascadeError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_xml(&xml)
    }

    /// Parse cascade XML text.
    pub fn from_xml(xml: &str) -> Result<Self, CascadeError> {
        let storage: StorageXml = quick_xml::de::from_str(xml)?;
        let c = storage.cascade;
        if c.stage_type.trim() != "BOOST" {
            return Err(CascadeError::Unsupported(format!("stage type {}", c.stage_type.trim())));
        }
        if c.feature_type.trim() != "HAAR" {
            return Err(CascadeError::Unsupported(format!("feature type {}", c.feature_type.trim())));
        }
        let window = (
            parse_num::<u32>(&c.width, "width")?,
            parse_num::<u32>(&c.height, "height")?,
        );
        if window.0 < 3 || window.1 < 3 {
            return Err(CascadeError::Malformed(format!("window {}x{}", window.0, window.1)));
        }

        let features = c
            .features
            .items
            .iter()
            .map(|f| parse_feature(f, window))
            .collect::<Result<Vec<_>, _>>()?;

        let stages = c
            .stages
            .items
            .iter()
            .map(|s| parse_stage(s, features.len()))
            .collect::<Result<Vec<_>, _>>()?;
        if stages.is_empty() {
            return Err(CascadeError::Malformed("no stages".into()));
        }

        Ok(Self {
            window,
            stages,
            features,
        })
    }

    /// Base detection window (width, height).
    pub fn window(&self) -> (u32, u32) {
        self.window
    }

    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Multi-scale sliding-window detection followed by neighbor grouping.
    pub fn detect_multi_scale(&self, gray: &GrayImage, params: &DetectorParams) -> Vec<DetectionBox> {
        let (orig_w, orig_h) = gray.dimensions();
        if orig_w < self.window.0 || orig_h < self.window.1 {
            return Vec::new();
        }

        let longer = orig_w.max(orig_h);
        let (img, ratio) = if longer > MAX_DETECT_SIDE {
            let ratio = MAX_DETECT_SIDE as f64 / longer as f64;
            let w = ((orig_w as f64 * ratio).round() as u32).max(1);
            let h = ((orig_h as f64 * ratio).round() as u32).max(1);
            (imageops::resize(gray, w, h, FilterType::Triangle), ratio)
        } else {
            (gray.clone(), 1.0)
        };
        let (img_w, img_h) = img.dimensions();
        let integral = IntegralImage::new(&img);
        let scale_factor = params.scale_factor.max(1.0001);

        let mut candidates = Vec::new();
        let mut scale = 1.0_f64;
        loop {
            let win_w = (self.window.0 as f64 * scale).round() as u32;
            let win_h = (self.window.1 as f64 * scale).round() as u32;
            if win_w > img_w || win_h > img_h {
                break;
            }
            // Min size is in full-resolution pixels.
            if win_w as f64 / ratio >= params.min_size.0 as f64
                && win_h as f64 / ratio >= params.min_size.1 as f64
            {
                let scaled = ScaledCascade::new(self, scale);
                let step = ((if scale > 2.0 { 1.0 } else { 2.0 }) * scale).round().max(1.0) as usize;
                for y in (0..=(img_h - win_h) as usize).step_by(step) {
                    for x in (0..=(img_w - win_w) as usize).step_by(step) {
                        if scaled.accepts(self, &integral, x, y) {
                            candidates.push(DetectionBox::new(x as u32, y as u32, win_w, win_h));
                        }
                    }
                }
            }
            scale *= scale_factor;
        }

        let grouped = group_rectangles(&candidates, params.min_neighbors, DetectorConsts::GROUP_EPS);
        if ratio == 1.0 {
            return grouped;
        }
        grouped
            .into_iter()
            .map(|b| {
                DetectionBox::new(
                    (b.x as f64 / ratio).round() as u32,
                    (b.y as f64 / ratio).round() as u32,
                    (b.width as f64 / ratio).round() as u32,
                    (b.height as f64 / ratio).round() as u32,
                )
            })
            .collect()
    }
}

impl Detector for HaarCascade {
    fn detect(&self, gray: &GrayImage, params: &DetectorParams) -> Vec<DetectionBox> {
        self.detect_multi_scale(gray, params)
    }
}

fn parse_feature(f: &FeatureXml, window: (u32, u32)) -> Result<Feature, CascadeError> {
    if let Some(t) = &f.tilted
        && t.trim() != "0"
    {
        return Err(CascadeError::Unsupported("tilted features".into()));
    }
    let rects = f
        .rects
        .items
        .iter()
        .map(|r| {
            let v: Vec<f64> = parse_list(r, "rect")?;
            if v.len() != 5 {
                return Err(CascadeError::Malformed(format!("rect {r:?}")));
            }
            let rect = WeightedRect {
                x: v[0] as u32,
                y: v[1] as u32,
                w: v[2] as u32,
                h: v[3] as u32,
                weight: v[4],
            };
            if rect.w == 0 || rect.h == 0 {
                return Err(CascadeError::Malformed(format!("empty rect {r:?}")));
            }
            if rect.x + rect.w > window.0 || rect.y + rect.h > window.1 {
                return Err(CascadeError::Malformed(format!("rect outside window {r:?}")));
            }
            Ok(rect)
        })
        .collect::<Result<Vec<_>, _>>()?;
    if rects.is_empty() {
        return Err(CascadeError::Malformed("feature without rects".into()));
    }
    Ok(Feature { rects })
}

fn parse_stage(s: &StageXml, n_features: usize) -> Result<Stage, CascadeError> {
    let threshold = parse_num(&s.stage_threshold, "stageThreshold")?;
    let classifiers = s
        .weak_classifiers
        .items
        .iter()
        .map(|w| parse_weak(w, n_features))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Stage {
        threshold,
        classifiers,
    })
}

fn parse_weak(w: &WeakXml, n_features: usize) -> Result<WeakClassifier, CascadeError> {
    let raw: Vec<f64> = parse_list(&w.internal_nodes, "internalNodes")?;
    let leaves: Vec<f64> = parse_list(&w.leaf_values, "leafValues")?;
    if raw.is_empty() || raw.len() % 4 != 0 {
        return Err(CascadeError::Malformed(format!(
            "internalNodes has {} values",
            raw.len()
        )));
    }
    let nodes: Vec<Node> = raw
        .chunks_exact(4)
        .map(|c| Node {
            left: c[0] as i32,
            right: c[1] as i32,
            feature: c[2] as usize,
            threshold: c[3],
        })
        .collect();
    // Children point forward so evaluation always terminates.
    for (i, n) in nodes.iter().enumerate() {
        if n.feature >= n_features {
            return Err(CascadeError::Malformed(format!("feature index {}", n.feature)));
        }
        for child in [n.left, n.right] {
            let ok = if child > 0 {
                (child as usize) > i && (child as usize) < nodes.len()
            } else {
                ((-child) as usize) < leaves.len()
            };
            if !ok {
                return Err(CascadeError::Malformed(format!("tree child {child}")));
            }
        }
    }
    Ok(WeakClassifier { nodes, leaves })
}

// ---- Evaluation ----

/// Summed-area tables of pixel values and squared values, (w+1) x (h+1).
struct IntegralImage {
    stride: usize,
    sum: Vec<u64>,
    sqsum: Vec<u64>,
}

impl IntegralImage {
    fn new(img: &GrayImage) -> Self {
        let (w, h) = (img.width() as usize, img.height() as usize);
        let stride = w + 1;
        let mut sum = vec![0u64; stride * (h + 1)];
        let mut sqsum = vec![0u64; stride * (h + 1)];
        let raw = img.as_raw();
        for y in 0..h {
            let mut row = 0u64;
            let mut row_sq = 0u64;
            for x in 0..w {
                let v = raw[y * w + x] as u64;
                row += v;
                row_sq += v * v;
                let i = (y + 1) * stride + x + 1;
                sum[i] = sum[i - stride] + row;
                sqsum[i] = sqsum[i - stride] + row_sq;
            }
        }
        Self { stride, sum, sqsum }
    }

    #[inline]
    fn rect(table: &[u64], stride: usize, x: usize, y: usize, w: usize, h: usize) -> u64 {
        let a = table[y * stride + x];
        let b = table[y * stride + x + w];
        let c = table[(y + h) * stride + x];
        let d = table[(y + h) * stride + x + w];
        (d + a) - (b + c)
    }

    #[inline]
    fn sum(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        Self::rect(&self.sum, self.stride, x, y, w, h) as f64
    }

    #[inline]
    fn sqsum(&self, x: usize, y: usize, w: usize, h: usize) -> f64 {
        Self::rect(&self.sqsum, self.stride, x, y, w, h) as f64
    }
}

#[derive(Clone, Copy)]
struct ScaledRect {
    x: usize,
    y: usize,
    w: usize,
    h: usize,
    weight: f64,
}

/// Features resized for one window scale, weights pre-divided by the normalization area.
struct ScaledCascade {
    features: Vec<Vec<ScaledRect>>,
    norm: (usize, usize, usize, usize),
    inv_area: f64,
}

impl ScaledCascade {
    fn new(cascade: &HaarCascade, scale: f64) -> Self {
        let s = |v: u32| (v as f64 * scale).round() as usize;
        let (win_w, win_h) = (s(cascade.window.0), s(cascade.window.1));
        // Variance window excludes a one-pixel border of the base window.
        let (nx, ny) = (s(1), s(1));
        let norm = (
            nx,
            ny,
            s(cascade.window.0 - 2).clamp(1, win_w - nx),
            s(cascade.window.1 - 2).clamp(1, win_h - ny),
        );
        let inv_area = 1.0 / (norm.2 * norm.3) as f64;

        let features = cascade
            .features
            .iter()
            .map(|f| {
                let mut rects: Vec<ScaledRect> = f
                    .rects
                    .iter()
                    .map(|r| {
                        let (x, y) = (s(r.x), s(r.y));
                        // Rounding may push a rect one pixel past the window edge.
                        ScaledRect {
                            x,
                            y,
                            w: s(r.w).clamp(1, win_w - x),
                            h: s(r.h).clamp(1, win_h - y),
                            weight: r.weight,
                        }
                    })
                    .collect();
                // Rounding changes areas; rebalance the first rect so weighted areas still cancel.
                if rects.len() > 1 {
                    let rest: f64 = rects[1..]
                        .iter()
                        .map(|r| r.weight * (r.w * r.h) as f64)
                        .sum();
                    let area0 = (rects[0].w * rects[0].h) as f64;
                    rects[0].weight = -rest / area0;
                }
                for r in &mut rects {
                    r.weight *= inv_area;
                }
                rects
            })
            .collect();

        Self {
            features,
            norm,
            inv_area,
        }
    }

    #[inline]
    fn feature_value(&self, ii: &IntegralImage, feature: usize, x: usize, y: usize) -> f64 {
        self.features[feature]
            .iter()
            .map(|r| r.weight * ii.sum(x + r.x, y + r.y, r.w, r.h))
            .sum()
    }

    /// True when the window at (x, y) passes every stage.
    fn accepts(&self, cascade: &HaarCascade, ii: &IntegralImage, x: usize, y: usize) -> bool {
        let (nx, ny, nw, nh) = self.norm;
        let mean = ii.sum(x + nx, y + ny, nw, nh) * self.inv_area;
        let var = ii.sqsum(x + nx, y + ny, nw, nh) * self.inv_area - mean * mean;
        let std = if var > 0.0 { var.sqrt() } else { 1.0 };

        for stage in &cascade.stages {
            let mut total = 0.0;
            for wc in &stage.classifiers {
                let mut idx = 0usize;
                loop {
                    let node = &wc.nodes[idx];
                    let value = self.feature_value(ii, node.feature, x, y);
                    let next = if value < node.threshold * std {
                        node.left
                    } else {
                        node.right
                    };
                    if next <= 0 {
                        total += wc.leaves[(-next) as usize];
                        break;
                    }
                    idx = next as usize;
                }
            }
            if total < stage.threshold {
                return false;
            }
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    /// One stage, one stump on a left-dark/right-bright edge feature.
    const EDGE_CASCADE: &str = r#"<?xml version="1.0"?>
<opencv_storage>
<cascade type_id="opencv-cascade-classifier">
  <stageType>BOOST</stageType>
  <featureType>HAAR</featureType>
  <height>8</height>
  <width>8</width>
  <stageNum>1</stageNum>
  <stages>
    <!-- stage 0 -->
    <_>
      <maxWeakCount>1</maxWeakCount>
      <stageThreshold>0.5</stageThreshold>
      <weakClassifiers>
        <_>
          <internalNodes>
            0 -1 0 0.25</internalNodes>
          <leafValues>
            -1. 1.</leafValues></_></weakClassifiers></_></stages>
  <features>
    <_>
      <rects>
        <_>
          1 1 3 6 -1.</_>
        <_>
          4 1 3 6 1.</_></rects></_></features></cascade>
</opencv_storage>
"#;

    fn params(min_neighbors: usize) -> DetectorParams {
        DetectorParams {
            scale_factor: 1.1,
            min_neighbors,
            min_size: (8, 8),
        }
    }

    #[test]
    fn parses_opencv_layout() {
        let c = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        assert_eq!(c.window(), (8, 8));
        assert_eq!(c.stage_count(), 1);
        assert_eq!(c.features.len(), 1);
        assert_eq!(c.features[0].rects.len(), 2);
    }

    #[test]
    fn rejects_tilted_features() {
        let xml = EDGE_CASCADE.replace("</rects></_></features>", "</rects><tilted>1</tilted></_></features>");
        assert!(matches!(
            HaarCascade::from_xml(&xml),
            Err(CascadeError::Unsupported(_))
        ));
    }

    #[test]
    fn rejects_zero_sized_rect_on_window_edge() {
        let xml = EDGE_CASCADE.replace("4 1 3 6 1.", "8 1 0 6 1.");
        assert!(matches!(
            HaarCascade::from_xml(&xml),
            Err(CascadeError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_tree_child_pointing_back() {
        let xml = EDGE_CASCADE.replace(
            "0 -1 0 0.25</internalNodes>",
            "1 -1 0 0.25\n            1 0 0 0.25</internalNodes>",
        );
        assert!(matches!(
            HaarCascade::from_xml(&xml),
            Err(CascadeError::Malformed(_))
        ));
    }

    #[test]
    fn rejects_out_of_range_feature_index() {
        let xml = EDGE_CASCADE.replace("0 -1 0 0.25", "0 -1 3 0.25");
        assert!(matches!(
            HaarCascade::from_xml(&xml),
            Err(CascadeError::Malformed(_))
        ));
    }

    #[test]
    fn finds_edge_and_ignores_flat_image() {
        let c = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let flat = GrayImage::from_pixel(40, 40, Luma([90]));
        assert!(c.detect_multi_scale(&flat, &params(0)).is_empty());

        let edge = GrayImage::from_fn(40, 40, |x, _| if x < 20 { Luma([10]) } else { Luma([240]) });
        let found = c.detect_multi_scale(&edge, &params(0));
        assert!(!found.is_empty());
        for b in &found {
            assert!(b.x < 20 && b.x + b.width > 20, "box {b:?} should straddle the edge");
        }
    }

    #[test]
    fn image_smaller_than_window_yields_nothing() {
        let c = HaarCascade::from_xml(EDGE_CASCADE).unwrap();
        let tiny = GrayImage::from_pixel(4, 4, Luma([0]));
        assert!(c.detect_multi_scale(&tiny, &params(0)).is_empty());
    }
}
