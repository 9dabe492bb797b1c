// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! `cat_info.xml` box annotations.
//!
//! ```xml
//! <coins>
//!     <coin>
//!         <image face="avert" x="817" y="180" w="256" h="254" id="9"/>
//!         <image face="revert" x="1113" y="175" w="255" h="255" id="6"/>
//!         <label x="1071" y="408" w="43" h="25" id="1"/>
//!     </coin>
//! </coins>
//! ```
//!
//! Every `<image>` element becomes a `coin` region and every `<label>`
//! element a `label` region, both as axis-aligned rectangles. Other elements
//! are ignored.

use crate::{Error, region::Region};

fn box_attribute(node: &roxmltree::Node, name: &str) -> Result<f64, Error> {
    let value = node.attribute(name).ok_or_else(|| {
        Error::InvalidParameters(format!(
            "<{}> at byte {} has no '{}' attribute",
            node.tag_name().name(),
            node.range().start,
            name
        ))
    })?;
    value.trim().parse::<f64>().map_err(|_| {
        Error::InvalidParameters(format!(
            "<{}> attribute {}=\"{}\" is not a number",
            node.tag_name().name(),
            name,
            value
        ))
    })
}

/// Regions of a `cat_info.xml` document, in document order.
pub fn parse_catinfo(xml: &str) -> Result<Vec<Region>, Error> {
    let doc = roxmltree::Document::parse(xml)?;
    doc.descendants()
        .filter(|node| node.is_element())
        .filter_map(|node| match node.tag_name().name() {
            "image" => Some((node, "coin")),
            "label" => Some((node, "label")),
            _ => None,
        })
        .map(|(node, label)| {
            Ok(Region::rectangle(
                label,
                box_attribute(&node, "x")?,
                box_attribute(&node, "y")?,
                box_attribute(&node, "w")?,
                box_attribute(&node, "h")?,
            ))
        })
        .collect()
}
