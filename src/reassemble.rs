//! Page reassembly
//!
//! Slices are grouped into consecutive runs of [`GROUP_SIZE`] in index order
//! and each run is stacked top-to-bottom into one composite page. A trailing
//! run shorter than a full group is dropped.
//!
//! # Algorithm
//!
//! 1. List slices ascending by index
//! 2. Cut into windows of `GROUP_SIZE` starting at offset 0
//! 3. Decode each slice and convert to RGB
//! 4. Canvas width = widest slice, height = sum of slice heights
//! 5. Paste slices at x = 0 with no vertical gap; narrower slices leave the
//!    black canvas visible on their right

use std::path::PathBuf;

use image::{imageops, RgbImage};
use thiserror::Error;
use tracing::{debug, info};

use crate::progress::ProgressCallback;
use crate::slice::{Slice, SliceError, SliceStore, GROUP_SIZE};

// ============================================================
// Error Types
// ============================================================

/// Reassembly error types
#[derive(Debug, Error)]
pub enum ReassembleError {
    #[error("Invalid slice image {path}: {reason}")]
    InvalidImage { path: PathBuf, reason: String },

    #[error(transparent)]
    Store(#[from] SliceError),
}

pub type Result<T> = std::result::Result<T, ReassembleError>;

// ============================================================
// Data Structures
// ============================================================

/// A full run of consecutive slices forming one logical page
#[derive(Debug, Clone, Copy)]
pub struct SliceGroup<'a> {
    /// 0-based group number
    pub index: usize,
    /// Exactly `GROUP_SIZE` slices
    pub slices: &'a [Slice],
}

/// One reconstructed page
#[derive(Debug, Clone)]
pub struct CompositePage {
    /// 0-based group number this page was built from
    pub group_index: usize,
    /// First and last slice index in the group
    pub slice_range: (u32, u32),
    /// Stitched RGB image
    pub image: RgbImage,
}

impl CompositePage {
    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }
}

// ============================================================
// Grouping and stitching
// ============================================================

/// Split ascending slices into complete groups; leftovers are ignored
pub fn group_slices(slices: &[Slice]) -> Vec<SliceGroup<'_>> {
    slices
        .chunks_exact(GROUP_SIZE)
        .enumerate()
        .map(|(index, slices)| SliceGroup { index, slices })
        .collect()
}

/// Stack images vertically, left-aligned, with no spacing
pub fn stitch(images: &[RgbImage]) -> RgbImage {
    let width = images.iter().map(RgbImage::width).max().unwrap_or(0);
    let height = images.iter().map(RgbImage::height).sum();

    let mut canvas = RgbImage::new(width, height);
    let mut y_offset: i64 = 0;
    for img in images {
        imageops::replace(&mut canvas, img, 0, y_offset);
        y_offset += i64::from(img.height());
    }
    canvas
}

/// Decode one slice file to RGB
pub fn load_slice(slice: &Slice) -> Result<RgbImage> {
    let bytes = slice.read_bytes()?;
    let img = image::load_from_memory(&bytes).map_err(|e| ReassembleError::InvalidImage {
        path: slice.path.clone(),
        reason: e.to_string(),
    })?;
    Ok(img.to_rgb8())
}

/// Rebuilds logical pages from a slice folder
pub struct PageReassembler;

impl PageReassembler {
    /// Build every complete composite page, in group order
    pub fn reassemble(
        store: &SliceStore,
        progress: &dyn ProgressCallback,
    ) -> Result<Vec<CompositePage>> {
        let slices = store.list()?;
        let groups = group_slices(&slices);
        let dropped = slices.len() - groups.len() * GROUP_SIZE;

        info!(
            slices = slices.len(),
            pages = groups.len(),
            dropped,
            "reassembling pages"
        );
        progress.on_stitch_start(slices.len(), groups.len());

        let total = groups.len();
        let mut pages = Vec::with_capacity(total);
        for group in &groups {
            pages.push(Self::build_page(group)?);
            progress.on_stitch_progress(pages.len(), total);
        }
        Ok(pages)
    }

    /// Decode and stitch one group
    pub fn build_page(group: &SliceGroup<'_>) -> Result<CompositePage> {
        let images = group
            .slices
            .iter()
            .map(load_slice)
            .collect::<Result<Vec<_>>>()?;
        let image = stitch(&images);

        let first = group.slices.first().map_or(0, |s| s.index);
        let last = group.slices.last().map_or(0, |s| s.index);
        debug!(
            group = group.index,
            first,
            last,
            width = image.width(),
            height = image.height(),
            "page stitched"
        );

        Ok(CompositePage {
            group_index: group.index,
            slice_range: (first, last),
            image,
        })
    }
}

// ============================================================
// Tests
// ============================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::progress::NoProgress;
    use image::{ImageFormat, Rgb};
    use std::io::Cursor;
    use tempfile::tempdir;

    fn solid(width: u32, height: u32, value: u8) -> RgbImage {
        RgbImage::from_pixel(width, height, Rgb([value, value, value]))
    }

    fn png_bytes(img: &RgbImage) -> Vec<u8> {
        let mut buf = Cursor::new(Vec::new());
        img.write_to(&mut buf, ImageFormat::Png).unwrap();
        buf.into_inner()
    }

    fn fake_slices(n: u32) -> Vec<Slice> {
        (1..=n)
            .map(|index| Slice {
                index,
                path: PathBuf::from(crate::slice::slice_file_name(index)),
            })
            .collect()
    }

    #[test]
    fn test_group_slices_drops_short_tail() {
        for n in 0..=17u32 {
            let slices = fake_slices(n);
            let groups = group_slices(&slices);
            assert_eq!(groups.len(), (n / 5) as usize, "n = {}", n);
            assert!(groups.iter().all(|g| g.slices.len() == GROUP_SIZE));
        }
    }

    #[test]
    fn test_group_slices_are_consecutive() {
        let slices = fake_slices(12);
        let groups = group_slices(&slices);
        assert_eq!(groups[0].index, 0);
        assert_eq!(groups[1].index, 1);
        assert_eq!(groups[1].slices[0].index, 6);
        assert_eq!(groups[1].slices[4].index, 10);
    }

    #[test]
    fn test_stitch_dimensions() {
        let images = vec![
            solid(100, 10, 1),
            solid(120, 20, 2),
            solid(80, 30, 3),
            solid(120, 5, 4),
            solid(90, 15, 5),
        ];
        let page = stitch(&images);
        assert_eq!(page.width(), 120);
        assert_eq!(page.height(), 80);
    }

    #[test]
    fn test_stitch_places_slices_without_gaps() {
        let images = vec![solid(4, 2, 10), solid(4, 3, 20), solid(4, 1, 30)];
        let page = stitch(&images);

        assert_eq!(page.get_pixel(0, 0), &Rgb([10, 10, 10]));
        assert_eq!(page.get_pixel(3, 1), &Rgb([10, 10, 10]));
        assert_eq!(page.get_pixel(0, 2), &Rgb([20, 20, 20]));
        assert_eq!(page.get_pixel(0, 4), &Rgb([20, 20, 20]));
        assert_eq!(page.get_pixel(2, 5), &Rgb([30, 30, 30]));
    }

    #[test]
    fn test_stitch_narrow_slice_leaves_background() {
        let images = vec![solid(6, 2, 200), solid(3, 2, 100)];
        let page = stitch(&images);

        assert_eq!(page.get_pixel(2, 3), &Rgb([100, 100, 100]));
        assert_eq!(page.get_pixel(3, 3), &Rgb([0, 0, 0]));
        assert_eq!(page.get_pixel(5, 3), &Rgb([0, 0, 0]));
    }

    #[test]
    fn test_stitch_empty() {
        let page = stitch(&[]);
        assert_eq!(page.dimensions(), (0, 0));
    }

    #[test]
    fn test_reassemble_from_store() {
        let dir = tempdir().unwrap();
        let store = SliceStore::create(dir.path()).unwrap();
        let heights = [10, 20, 30, 40, 50, 5, 5, 5, 5, 5, 7, 7];
        for (i, &h) in heights.iter().enumerate() {
            let width = 50 + i as u32;
            store
                .write(i as u32 + 1, &png_bytes(&solid(width, h, i as u8)))
                .unwrap();
        }

        let pages = PageReassembler::reassemble(&store, &NoProgress).unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].height(), 150);
        assert_eq!(pages[0].width(), 54);
        assert_eq!(pages[0].slice_range, (1, 5));
        assert_eq!(pages[1].height(), 25);
        assert_eq!(pages[1].width(), 59);
        assert_eq!(pages[1].slice_range, (6, 10));
    }

    #[test]
    fn test_reassemble_too_few_slices() {
        let dir = tempdir().unwrap();
        let store = SliceStore::create(dir.path()).unwrap();
        for index in 1..=3 {
            store.write(index, &png_bytes(&solid(4, 4, 9))).unwrap();
        }

        let pages = PageReassembler::reassemble(&store, &NoProgress).unwrap();
        assert!(pages.is_empty());
    }

    #[test]
    fn test_reassemble_converts_grayscale() {
        let dir = tempdir().unwrap();
        let store = SliceStore::create(dir.path()).unwrap();
        let gray = image::GrayImage::from_pixel(3, 2, image::Luma([77]));
        for index in 1..=5 {
            let mut buf = Cursor::new(Vec::new());
            gray.write_to(&mut buf, ImageFormat::Png).unwrap();
            store.write(index, &buf.into_inner()).unwrap();
        }

        let pages = PageReassembler::reassemble(&store, &NoProgress).unwrap();
        assert_eq!(pages[0].image.get_pixel(1, 9), &Rgb([77, 77, 77]));
    }

    #[test]
    fn test_reassemble_corrupt_slice() {
        let dir = tempdir().unwrap();
        let store = SliceStore::create(dir.path()).unwrap();
        for index in 1..=5 {
            store.write(index, b"not an image").unwrap();
        }

        let err = PageReassembler::reassemble(&store, &NoProgress).unwrap_err();
        assert!(matches!(err, ReassembleError::InvalidImage { .. }));
    }
}
