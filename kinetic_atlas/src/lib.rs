// Copyright 2026 the Kinetic Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rectangle packing for texture atlases.
//!
//! `kinetic_atlas` hands out sub-rectangles of one fixed area, such as a
//! glyph or image atlas, and takes them back when content is evicted. It is
//! `no_std` compatible (with `alloc`).
//!
//! ```
//! use kinetic_atlas::{AreaAllocator, AtlasSize};
//!
//! let mut atlas = AreaAllocator::new(AtlasSize::new(256, 256));
//! let glyph = atlas.allocate(AtlasSize::new(64, 64)).unwrap();
//! assert_eq!((glyph.x, glyph.y), (0, 0));
//! assert!(atlas.deallocate(glyph));
//! assert!(atlas.is_empty());
//! ```
//!
//! **[`AreaAllocator`]**: A binary space partitioning tree. Free space is
//! split along whichever axis wastes less area, and freed leaves merge with
//! free neighbors on the same split axis. Merging is local, so some free
//! space across differently oriented splits can stay fragmented.
//!
//! **[`AtlasRect`] / [`AtlasSize`]**: Integer geometry, convertible to
//! `kurbo` types for drawing.
//!
//! # Crate features
//!
//! - `std` (disabled by default): Enables `std` support in dependencies.

#![no_std]
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

extern crate alloc;

mod allocator;
mod geometry;

pub use allocator::{AreaAllocator, AtlasLeaf, DEFAULT_MARGIN};
pub use geometry::{AtlasRect, AtlasSize};
