// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Serde structures of the supported region file formats.
//!
//! Unknown fields are ignored, so files carrying extra metadata (COCO
//! `info`/`licenses`, LabelMe `imageData`) load unchanged.

use serde::{Deserialize, Serialize};

/// LabelMe-style annotation file: one document per file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LabelMeFile {
    #[serde(default)]
    pub shapes: Vec<LabelMeShape>,
    /// Image the shapes were drawn on, if recorded.
    #[serde(rename = "imagePath", default, skip_serializing_if = "Option::is_none")]
    pub image_path: Option<String>,
}

/// One labeled shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelMeShape {
    pub label: String,
    /// `[x, y]` vertices in image coordinates.
    pub points: Vec<[f64; 2]>,
    /// `"polygon"` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape_type: Option<String>,
}

/// COCO instance-segmentation file: one document per image.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoDataset {
    pub images: Vec<CocoImage>,
    #[serde(default)]
    pub annotations: Vec<CocoAnnotation>,
    #[serde(default)]
    pub categories: Vec<CocoCategory>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoImage {
    pub id: u64,
    /// Filename; its stem is the document identifier.
    pub file_name: String,
    #[serde(default)]
    pub width: u32,
    #[serde(default)]
    pub height: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoCategory {
    pub id: u32,
    pub name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CocoAnnotation {
    pub id: u64,
    pub image_id: u64,
    pub category_id: u32,
    /// `[x, y, width, height]`, used as the outline when there is no
    /// segmentation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bbox: Option<[f64; 4]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub segmentation: Option<CocoSegmentation>,
}

/// Polygon parts or a run-length mask.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum CocoSegmentation {
    /// `[[x1, y1, x2, y2, ...], ...]`; each part is a separate outline.
    Polygon(Vec<Vec<f64>>),
    /// Run-length encoded mask with integer or compressed string counts.
    Rle(CocoRle),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CocoRle {
    pub counts: serde_json::Value,
    /// `[height, width]`.
    pub size: [u32; 2],
}
