//! JSON image stacks.
//!
//! A stack is `{"width", "height", "frames": [{"energy_loss", "exposure",
//! "data"}]}` with row-major `data`. `null` samples read as NaN, and NaN
//! samples are written back as `null`.

use eftem::{ElementalMapSet, ImageView, OwnedImage, Shift};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

#[derive(Debug, Deserialize, Serialize)]
pub struct FrameJson {
    #[serde(default)]
    pub energy_loss: Option<f32>,
    #[serde(default)]
    pub exposure: Option<f32>,
    pub data: Vec<Option<f32>>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct StackJson {
    pub width: usize,
    pub height: usize,
    pub frames: Vec<FrameJson>,
}

/// Stack held as owned frames with optional per-frame metadata.
pub struct Stack {
    pub frames: Vec<OwnedImage>,
    pub energy_losses: Vec<Option<f32>>,
    pub exposures: Vec<Option<f32>>,
}

impl Stack {
    pub fn load(path: impl AsRef<Path>) -> Result<Self, Box<dyn std::error::Error>> {
        let text = fs::read_to_string(path)?;
        let json: StackJson = serde_json::from_str(&text)?;
        Self::from_json(json)
    }

    pub fn from_json(json: StackJson) -> Result<Self, Box<dyn std::error::Error>> {
        let mut frames = Vec::with_capacity(json.frames.len());
        let mut energy_losses = Vec::with_capacity(json.frames.len());
        let mut exposures = Vec::with_capacity(json.frames.len());
        for frame in json.frames {
            let data = frame
                .data
                .into_iter()
                .map(|v| v.unwrap_or(f32::NAN))
                .collect();
            frames.push(OwnedImage::new(data, json.width, json.height)?);
            energy_losses.push(frame.energy_loss);
            exposures.push(frame.exposure);
        }
        Ok(Self {
            frames,
            energy_losses,
            exposures,
        })
    }

    pub fn views(&self) -> Vec<ImageView<'_, f32>> {
        self.frames.iter().map(OwnedImage::view).collect()
    }

    /// Energy losses of every frame; an error if any frame lacks one.
    pub fn require_energy_losses(&self) -> Result<Vec<f32>, Box<dyn std::error::Error>> {
        let mut losses = Vec::with_capacity(self.energy_losses.len());
        for (idx, loss) in self.energy_losses.iter().enumerate() {
            match loss {
                Some(loss) => losses.push(*loss),
                None => return Err(format!("frame {} has no energy_loss", idx + 1).into()),
            }
        }
        Ok(losses)
    }

    /// Exposures of every frame, or `None` unless all frames carry one.
    pub fn exposures(&self) -> Option<Vec<f32>> {
        self.exposures.iter().copied().collect()
    }

    pub fn to_json(&self) -> StackJson {
        let (width, height) = self
            .frames
            .first()
            .map_or((0, 0), |f| (f.width(), f.height()));
        let frames = self
            .frames
            .iter()
            .zip(&self.energy_losses)
            .zip(&self.exposures)
            .map(|((frame, &energy_loss), &exposure)| FrameJson {
                energy_loss,
                exposure,
                data: image_data(frame),
            })
            .collect();
        StackJson {
            width,
            height,
            frames,
        }
    }
}

fn image_data(image: &OwnedImage) -> Vec<Option<f32>> {
    image
        .data()
        .iter()
        .map(|&v| if v.is_nan() { None } else { Some(v) })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct ShiftRecord {
    pub frame: usize,
    pub dx: i32,
    pub dy: i32,
}

impl ShiftRecord {
    pub fn list(shifts: &[Shift]) -> Vec<Self> {
        shifts
            .iter()
            .enumerate()
            .map(|(idx, s)| Self {
                frame: idx + 1,
                dx: s.dx,
                dy: s.dy,
            })
            .collect()
    }
}

#[derive(Debug, Serialize)]
pub struct DriftOutput {
    pub drift: Vec<ShiftRecord>,
    pub shift: Option<Vec<ShiftRecord>>,
}

#[derive(Debug, Serialize)]
pub struct MapJson {
    pub energy_loss: Option<f32>,
    pub data: Vec<Option<f32>>,
}

#[derive(Debug, Serialize)]
pub struct MapOutput {
    pub method: &'static str,
    pub edge_energy_loss: f32,
    pub width: usize,
    pub height: usize,
    pub error_pixels: usize,
    pub r: Vec<Option<f32>>,
    pub a: Vec<Option<f32>>,
    pub errors: Vec<u8>,
    pub elemental: Vec<MapJson>,
}

impl MapOutput {
    pub fn new(maps: &ElementalMapSet, edge_energy_loss: f32) -> Self {
        let elemental = maps
            .elemental_maps()
            .iter()
            .zip(maps.post_edge_losses())
            .map(|(map, &loss)| MapJson {
                energy_loss: Some(loss),
                data: image_data(map),
            })
            .collect();
        Self {
            method: maps.method().label(),
            edge_energy_loss,
            width: maps.width(),
            height: maps.height(),
            error_pixels: maps.error_pixel_count(),
            r: image_data(maps.r_map()),
            a: image_data(maps.a_map()),
            errors: maps.error_map().to_vec(),
            elemental,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{Stack, StackJson};

    #[test]
    fn null_samples_read_as_nan_and_write_back_as_null() {
        let json: StackJson = serde_json::from_str(
            r#"{"width": 2, "height": 1, "frames": [
                {"energy_loss": 100.0, "exposure": 2.0, "data": [1.0, null]},
                {"energy_loss": 120.0, "data": [3.0, 4.0]}
            ]}"#,
        )
        .unwrap();
        let stack = Stack::from_json(json).unwrap();
        assert!(stack.frames[0].get(1, 0).unwrap().is_nan());
        assert_eq!(stack.require_energy_losses().unwrap(), vec![100.0, 120.0]);
        assert_eq!(stack.exposures(), None);

        let out = stack.to_json();
        assert_eq!(out.frames[0].data, vec![Some(1.0), None]);
        assert_eq!(out.frames[1].exposure, None);
    }

    #[test]
    fn frame_size_is_checked() {
        let json: StackJson = serde_json::from_str(
            r#"{"width": 2, "height": 2, "frames": [{"data": [1.0, 2.0, 3.0]}]}"#,
        )
        .unwrap();
        assert!(Stack::from_json(json).is_err());
        let json: StackJson =
            serde_json::from_str(r#"{"width": 1, "height": 1, "frames": [{"data": [1.0]}]}"#)
                .unwrap();
        assert!(Stack::from_json(json).unwrap().require_energy_losses().is_err());
    }
}
