// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Region file loaders.
//!
//! Four layouts are understood:
//!
//! - **LabelMe-style** files, `{"shapes": [{"label", "points", "shape_type"}]}`,
//!   hold one document named after the file stem.
//! - **`.lif`** files share the LabelMe layout; their label identifiers are
//!   replaced by the region type they encode (see [`lif_region_type`]).
//! - **COCO** instance-segmentation files hold one document per image, named
//!   after the stem of the image `file_name`. Every image yields a set, so an
//!   image without annotations is an empty document rather than a missing
//!   one.
//! - **`cat_info.xml`** box files hold one document named after the file
//!   stem.
//!
//! Region outlines are not validated here; invalid outlines are reported by
//! the evaluator as excluded regions.

mod catinfo;
mod lif;
mod types;

pub use catinfo::parse_catinfo;
pub use lif::lif_region_type;
pub use types::{
    CocoAnnotation, CocoCategory, CocoDataset, CocoImage, CocoRle, CocoSegmentation, LabelMeFile,
    LabelMeShape,
};

use crate::{
    Error,
    geometry::Point,
    region::{Region, RegionSet, Role},
};
use std::{collections::HashMap, fs::File, io::BufReader, path::Path};

/// Options for region reading.
#[derive(Debug, Clone, Default)]
pub struct RegionReadOptions {
    /// Keep only regions with one of these labels (empty = all).
    pub label_filter: Vec<String>,
}

/// Loader for region files.
///
/// # Example
///
/// ```rust,no_run
/// use segeval::{RegionReader, Role};
///
/// let reader = RegionReader::new();
/// let reference = reader.read_labelme("truth/page-001.json", Role::Reference)?;
/// println!("Loaded {} regions", reference.len());
/// # Ok::<(), segeval::Error>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct RegionReader {
    options: RegionReadOptions,
}

fn document_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().into_owned())
        .unwrap_or_default()
}

fn open_json(path: &Path) -> Result<BufReader<File>, Error> {
    let file = File::open(path)?;
    Ok(BufReader::with_capacity(64 * 1024, file))
}

fn coords_to_outline(coords: &[f64]) -> Result<Vec<Point>, Error> {
    if coords.len() % 2 != 0 {
        return Err(Error::InvalidParameters(format!(
            "polygon has an odd number of coordinates ({})",
            coords.len()
        )));
    }
    Ok(coords.chunks_exact(2).map(|c| Point::new(c[0], c[1])).collect())
}

fn shape_to_region(shape: &LabelMeShape) -> Result<Region, Error> {
    let mut outline: Vec<Point> = shape.points.iter().copied().map(Point::from).collect();
    match shape.shape_type.as_deref().unwrap_or("polygon") {
        "polygon" => {
            if outline.len() > 3 && outline.first() == outline.last() {
                outline.pop();
            }
            Ok(Region::new(shape.label.clone(), outline))
        }
        "rectangle" => match outline.as_slice() {
            [a, b] => {
                let (x0, x1) = (a.x.min(b.x), a.x.max(b.x));
                let (y0, y1) = (a.y.min(b.y), a.y.max(b.y));
                Ok(Region::rectangle(shape.label.clone(), x0, y0, x1 - x0, y1 - y0))
            }
            _ => Ok(Region::new(shape.label.clone(), outline)),
        },
        other => Err(Error::UnsupportedShape(other.to_string())),
    }
}

fn annotation_to_regions(annotation: &CocoAnnotation, label: &str) -> Result<Vec<Region>, Error> {
    match (&annotation.segmentation, annotation.bbox) {
        (Some(CocoSegmentation::Polygon(parts)), _) if !parts.is_empty() => parts
            .iter()
            .map(|coords| Ok(Region::new(label, coords_to_outline(coords)?)))
            .collect(),
        (Some(CocoSegmentation::Rle(_)), _) => Err(Error::UnsupportedShape(format!(
            "run-length mask in annotation {}",
            annotation.id
        ))),
        (_, Some([x, y, width, height])) => Ok(vec![Region::rectangle(label, x, y, width, height)]),
        _ => Err(Error::InvalidParameters(format!(
            "annotation {} has neither segmentation nor bbox",
            annotation.id
        ))),
    }
}

impl RegionReader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_options(options: RegionReadOptions) -> Self {
        Self { options }
    }

    pub fn options(&self) -> &RegionReadOptions {
        &self.options
    }

    fn finish(&self, set: RegionSet) -> RegionSet {
        if self.options.label_filter.is_empty() {
            set
        } else {
            set.restrict_to(&self.options.label_filter)
        }
    }

    /// Read a LabelMe-style file as one document named after the file stem.
    pub fn read_labelme<P: AsRef<Path>>(&self, path: P, role: Role) -> Result<RegionSet, Error> {
        let path = path.as_ref();
        let file: LabelMeFile = serde_json::from_reader(open_json(path)?)?;
        self.load_labelme(&document_name(path), file, role)
    }

    /// Convert a parsed LabelMe file.
    pub fn load_labelme(
        &self,
        document: &str,
        file: LabelMeFile,
        role: Role,
    ) -> Result<RegionSet, Error> {
        let regions = file
            .shapes
            .iter()
            .map(shape_to_region)
            .collect::<Result<Vec<_>, _>>()?;
        log::debug!("{}: read {} {} regions", document, regions.len(), role);
        Ok(self.finish(RegionSet::new(document, role, regions)))
    }

    /// Read a COCO file, one set per image in file order.
    pub fn read_coco<P: AsRef<Path>>(&self, path: P, role: Role) -> Result<Vec<RegionSet>, Error> {
        let dataset: CocoDataset = serde_json::from_reader(open_json(path.as_ref())?)?;
        self.load_coco(dataset, role)
    }

    /// Convert a parsed COCO dataset.
    ///
    /// Polygon segmentations with several parts become one region per part.
    /// Annotations without a segmentation use their bounding box.
    pub fn load_coco(&self, dataset: CocoDataset, role: Role) -> Result<Vec<RegionSet>, Error> {
        let labels: HashMap<u32, &str> = dataset
            .categories
            .iter()
            .map(|c| (c.id, c.name.as_str()))
            .collect();

        let mut by_image: HashMap<u64, Vec<Region>> = HashMap::new();
        for annotation in &dataset.annotations {
            let fallback = annotation.category_id.to_string();
            let label = labels
                .get(&annotation.category_id)
                .copied()
                .unwrap_or(fallback.as_str());
            by_image
                .entry(annotation.image_id)
                .or_default()
                .extend(annotation_to_regions(annotation, label)?);
        }

        let sets: Vec<RegionSet> = dataset
            .images
            .iter()
            .map(|image| {
                let regions = by_image.remove(&image.id).unwrap_or_default();
                let document = document_name(Path::new(&image.file_name));
                self.finish(RegionSet::new(document, role, regions))
            })
            .collect();

        if !by_image.is_empty() {
            log::warn!(
                "{} annotated image ids are missing from the image list",
                by_image.len()
            );
        }
        log::debug!("read {} {} documents from COCO", sets.len(), role);
        Ok(sets)
    }

    /// Read a `.lif` file, labeling each region with its type.
    pub fn read_lif<P: AsRef<Path>>(&self, path: P, role: Role) -> Result<RegionSet, Error> {
        let path = path.as_ref();
        let file: LabelMeFile = serde_json::from_reader(open_json(path)?)?;
        self.load_lif(&document_name(path), file, role)
    }

    /// Convert a parsed `.lif` file.
    pub fn load_lif(
        &self,
        document: &str,
        file: LabelMeFile,
        role: Role,
    ) -> Result<RegionSet, Error> {
        let regions = file
            .shapes
            .iter()
            .map(|shape| {
                let mut region = shape_to_region(shape)?;
                region.label = lif_region_type(&shape.label)?.to_string();
                Ok(region)
            })
            .collect::<Result<Vec<_>, Error>>()?;
        log::debug!("{}: read {} {} regions", document, regions.len(), role);
        Ok(self.finish(RegionSet::new(document, role, regions)))
    }

    /// Read a `cat_info.xml` box file as one document named after the file
    /// stem.
    pub fn read_catinfo<P: AsRef<Path>>(&self, path: P, role: Role) -> Result<RegionSet, Error> {
        let path = path.as_ref();
        let xml = std::fs::read_to_string(path)?;
        self.load_catinfo(&document_name(path), &xml, role)
    }

    /// Convert the text of a `cat_info.xml` file.
    pub fn load_catinfo(&self, document: &str, xml: &str, role: Role) -> Result<RegionSet, Error> {
        let regions = parse_catinfo(xml)?;
        log::debug!("{}: read {} {} boxes", document, regions.len(), role);
        Ok(self.finish(RegionSet::new(document, role, regions)))
    }

    /// Read any supported file.
    ///
    /// `.lif` and `.xml` files are read by extension. `.json` files are
    /// COCO files when they carry an `images` key and LabelMe-style files
    /// when they carry `shapes`.
    pub fn read<P: AsRef<Path>>(&self, path: P, role: Role) -> Result<Vec<RegionSet>, Error> {
        let path = path.as_ref();
        let extension = path
            .extension()
            .map(|e| e.to_string_lossy().to_lowercase())
            .unwrap_or_default();
        match extension.as_str() {
            "lif" => return Ok(vec![self.read_lif(path, role)?]),
            "xml" => return Ok(vec![self.read_catinfo(path, role)?]),
            "json" => {}
            _ => return Err(Error::UnsupportedFormat(path.display().to_string())),
        }

        let value: serde_json::Value = serde_json::from_reader(open_json(path)?)?;
        if value.get("images").is_some() {
            self.load_coco(serde_json::from_value(value)?, role)
        } else if value.get("shapes").is_some() {
            let file = serde_json::from_value(value)?;
            Ok(vec![self.load_labelme(&document_name(path), file, role)?])
        } else {
            Err(Error::UnsupportedFormat(format!(
                "{}: neither a shapes nor a COCO file",
                path.display()
            )))
        }
    }
}
