/// # Preprocessor
/// Resize(256) -> CenterCrop(224) -> [0,1] -> per-channel normalize, CHW layout.
/// The order and rounding match the torchvision transforms the model was trained with.
use crate::decode::DecodedImage;
use image::imageops::{self, FilterType};
use ndarray::Array3;

pub const RESIZE_SHORTER: u32 = 256;
pub const CROP: u32 = 224;

/// Long/short ratio above which the long axis is trimmed before resizing.
/// The 224 crop only ever sees the central 224/256 of the short side's length.
pub const MAX_RESIZE_RATIO: u32 = 4;

// ImageNet normalization constants
pub const MEAN: [f32; 3] = [0.485, 0.456, 0.406];
pub const STD: [f32; 3] = [0.229, 0.224, 0.225];

/// Normalized 3x224x224 input, consumed once by the engine
#[derive(Debug, Clone, PartialEq)]
pub struct PreprocessedTensor(Array3<f32>);

impl PreprocessedTensor {
    pub fn shape(&self) -> &[usize] {
        self.0.shape()
    }

    pub fn as_array(&self) -> &Array3<f32> {
        &self.0
    }

    pub fn is_finite(&self) -> bool {
        self.0.iter().all(|v| v.is_finite())
    }
}

/// Target size with the shorter side at `shorter`, longer side truncated like torchvision.
pub fn resized_dimensions(width: u32, height: u32, shorter: u32) -> (u32, u32) {
    if width <= height {
        let long = (shorter as u64 * height as u64 / width as u64) as u32;
        (shorter, long)
    } else {
        let long = (shorter as u64 * width as u64 / height as u64) as u32;
        (long, shorter)
    }
}

/// Top-left corner of the centered `crop` window; half-pixel offsets round to even.
pub fn center_crop_origin(width: u32, height: u32, crop: u32) -> (u32, u32) {
    let offset = |side: u32| ((side.saturating_sub(crop)) as f64 / 2.0).round_ties_even() as u32;
    (offset(width), offset(height))
}

/// Centered source window `(x, y, width, height)` that still covers the final crop.
///
/// Strips longer than `MAX_RESIZE_RATIO` are trimmed along the long axis so the
/// resized bitmap stays bounded. The trim keeps the parity of the long side, so the
/// window center coincides with the image center.
pub fn source_window(width: u32, height: u32) -> (u32, u32, u32, u32) {
    let short = width.min(height);
    let long = width.max(height);
    let budget = short.saturating_mul(MAX_RESIZE_RATIO);
    if long <= budget {
        return (0, 0, width, height);
    }
    let kept = budget + (long - budget) % 2;
    let start = (long - kept) / 2;
    if width >= height {
        (start, 0, kept, height)
    } else {
        (0, start, width, kept)
    }
}

pub fn preprocess(image: &DecodedImage) -> PreprocessedTensor {
    let (x, y, sw, sh) = source_window(image.width(), image.height());
    let trimmed;
    let source = if (sw, sh) == (image.width(), image.height()) {
        image.as_rgb()
    } else {
        trimmed = imageops::crop_imm(image.as_rgb(), x, y, sw, sh).to_image();
        &trimmed
    };

    let (w, h) = resized_dimensions(sw, sh, RESIZE_SHORTER);
    let resized = imageops::resize(source, w, h, FilterType::Triangle);

    let (left, top) = center_crop_origin(w, h, CROP);
    let cropped = imageops::crop_imm(&resized, left, top, CROP, CROP).to_image();

    let mut tensor = Array3::<f32>::zeros((3, CROP as usize, CROP as usize));
    for (x, y, pixel) in cropped.enumerate_pixels() {
        for c in 0..3 {
            tensor[[c, y as usize, x as usize]] =
                (pixel[c] as f32 / 255.0 - MEAN[c]) / STD[c];
        }
    }
    PreprocessedTensor(tensor)
}
