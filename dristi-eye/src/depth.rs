//! Depth maps and relative distance lookup

use crate::error::VisionError;
use dristi_core::{BoundingBox, Detection, DistanceCategory};
use image::imageops::{self, FilterType};
use image::{ImageBuffer, Luma};

/// Dense per-pixel relative depth, row-major.
///
/// After `normalized()` values lie in [0, 1] with larger meaning closer.
#[derive(Debug, Clone, PartialEq)]
pub struct DepthMap {
    width: u32,
    height: u32,
    data: Vec<f32>,
}

impl DepthMap {
    pub fn new(width: u32, height: u32, data: Vec<f32>) -> Result<Self, VisionError> {
        let expected = (width as usize)
            .checked_mul(height as usize)
            .ok_or_else(|| VisionError::Processing("Depth map dimensions overflow".to_string()))?;

        if data.len() != expected {
            return Err(VisionError::Processing(format!(
                "Depth map has {} values, expected {}x{}={}",
                data.len(),
                width,
                height,
                expected
            )));
        }

        Ok(Self { width, height, data })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> Option<f32> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.data.get(y as usize * self.width as usize + x as usize).copied()
    }

    /// Min-max normalize to [0, 1]. A flat map normalizes to all zeros.
    pub fn normalized(&self) -> DepthMap {
        let (min, max) = self
            .data
            .iter()
            .filter(|v| v.is_finite())
            .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));

        let range = max - min;
        let data = if !range.is_finite() || range <= f32::EPSILON {
            vec![0.0; self.data.len()]
        } else {
            self.data
                .iter()
                .map(|&v| if v.is_finite() { (v - min) / range } else { 0.0 })
                .collect()
        };

        DepthMap {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Bilinear resample to `width` x `height`. Values are clamped to [0, 1],
    /// so resample after `normalized()`.
    pub fn resized(&self, width: u32, height: u32) -> Result<DepthMap, VisionError> {
        if (width, height) == (self.width, self.height) {
            return Ok(self.clone());
        }
        if self.width == 0 || self.height == 0 || width == 0 || height == 0 {
            return Err(VisionError::Processing(format!(
                "Cannot resize depth map {}x{} to {}x{}",
                self.width, self.height, width, height
            )));
        }

        let levels: Vec<u16> = self
            .data
            .iter()
            .map(|&v| (v.clamp(0.0, 1.0) * u16::MAX as f32).round() as u16)
            .collect();
        let buffer = ImageBuffer::<Luma<u16>, Vec<u16>>::from_raw(self.width, self.height, levels)
            .ok_or_else(|| VisionError::Processing("Depth map buffer size mismatch".to_string()))?;

        let scaled = imageops::resize(&buffer, width, height, FilterType::Triangle);
        let data = scaled
            .into_raw()
            .into_iter()
            .map(|v| v as f32 / u16::MAX as f32)
            .collect();
        DepthMap::new(width, height, data)
    }

    /// Distance bucket for the median depth inside `bbox`.
    ///
    /// The box is truncated to whole pixels and clamped to the map; an empty
    /// region yields `DistanceCategory::Unknown`.
    pub fn estimate_distance(&self, bbox: &BoundingBox) -> DistanceCategory {
        let clamp_x = |v: f32| (v.trunc().max(0.0) as u32).min(self.width);
        let clamp_y = |v: f32| (v.trunc().max(0.0) as u32).min(self.height);

        let (x1, x2) = (clamp_x(bbox.x1), clamp_x(bbox.x2));
        let (y1, y2) = (clamp_y(bbox.y1), clamp_y(bbox.y2));

        if x2 <= x1 || y2 <= y1 {
            return DistanceCategory::Unknown;
        }

        let mut region = Vec::with_capacity(((x2 - x1) * (y2 - y1)) as usize);
        for y in y1..y2 {
            let row = y as usize * self.width as usize;
            region.extend_from_slice(&self.data[row + x1 as usize..row + x2 as usize]);
        }

        match median(&mut region) {
            Some(d) => DistanceCategory::from_normalized_depth(d),
            None => DistanceCategory::Unknown,
        }
    }

    /// Set the distance of every detection from this map
    pub fn annotate(&self, objects: &mut [Detection]) {
        for obj in objects.iter_mut() {
            obj.distance = Some(self.estimate_distance(&obj.bbox));
        }
    }
}

/// Median with the mean of the two middle values for even lengths
fn median(values: &mut [f32]) -> Option<f32> {
    if values.is_empty() {
        return None;
    }

    values.sort_by(|a, b| a.total_cmp(b));
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        Some((values[mid - 1] + values[mid]) / 2.0)
    } else {
        Some(values[mid])
    }
}
