// SPDX-License-Identifier: Apache-2.0
// Copyright © 2025 Au-Zone Technologies. All Rights Reserved.

//! Region types of `.lif` label files.
//!
//! A `.lif` file uses the LabelMe shape layout, but each label is an
//! identifier whose first character encodes the region type:
//!
//! | Label            | Type    |
//! |------------------|---------|
//! | `ca101`, `cr7`, `ci3` | `coin` (obverse, reverse or isolated side) |
//! | `l101`           | `label` |
//! | `t101`           | `text`  |
//! | `n`              | `noise` |

use crate::Error;

/// Region type of a `.lif` label identifier.
pub fn lif_region_type(label: &str) -> Result<&'static str, Error> {
    let invalid = || Error::InvalidLabel(label.to_string());
    let mut chars = label.chars();
    match (chars.next(), chars.next(), chars.next()) {
        (Some('c'), Some('a' | 'r' | 'i'), Some(_)) => Ok("coin"),
        (Some('l'), Some(_), _) => Ok("label"),
        (Some('t'), Some(_), _) => Ok("text"),
        (Some('n'), _, _) => Ok("noise"),
        _ => Err(invalid()),
    }
}
