//! Image filters used to turn a confidence map into a semi-dense depth map.
//!
//! All filters replicate the outermost row or column when the window leaves the image.

use crate::{GrayFloatImage, PlaneIndexImage};
use image::{GrayImage, Luma};
use std::f32;

/// The Gaussian function.
///
/// # Arguments
/// * `x` - the offset.
/// * `r` - sigma.
/// # Return value
/// The kernel value at x.
fn gaussian(x: f32, r: f32) -> f32 {
    ((2.0 * f32::consts::PI).sqrt() * r).recip() * (-x.powi(2) / (2.0 * r.powi(2))).exp()
}

/// Generate a normalized Gaussian kernel of odd size.
///
/// # Arguments
/// * `r` - sigma.
/// * `kernel_size` - The size of the kernel.
/// # Return value
/// The kernel (a vector).
pub fn gaussian_kernel(r: f32, kernel_size: usize) -> Vec<f32> {
    debug_assert!(kernel_size % 2 == 1, "kernel_size must be odd");
    let half_width = (kernel_size / 2) as i32;
    let mut kernel: Vec<f32> = (-half_width..=half_width)
        .map(|i| gaussian(i as f32, r))
        .collect();
    let sum: f32 = kernel.iter().sum();
    for val in kernel.iter_mut() {
        *val /= sum;
    }
    kernel
}

/// The sigma used for a Gaussian window of `kernel_size` when none is given explicitly.
pub fn default_sigma(kernel_size: usize) -> f32 {
    0.3 * ((kernel_size as f32 - 1.0) * 0.5 - 1.0) + 0.8
}

pub fn horizontal_filter(image: &GrayFloatImage, kernel: &[f32]) -> GrayFloatImage {
    let half = (kernel.len() / 2) as i64;
    let width = image.width() as i64;
    let mut output = GrayFloatImage::new(image.width(), image.height());
    for (row_in, row_out) in image
        .as_raw()
        .chunks_exact(image.width().max(1) as usize)
        .zip(output.chunks_exact_mut(image.width().max(1) as usize))
    {
        for (x, out) in row_out.iter_mut().enumerate() {
            *out = kernel
                .iter()
                .enumerate()
                .map(|(k, &weight)| {
                    let source = (x as i64 + k as i64 - half).clamp(0, width - 1);
                    weight * row_in[source as usize]
                })
                .sum();
        }
    }
    output
}

pub fn vertical_filter(image: &GrayFloatImage, kernel: &[f32]) -> GrayFloatImage {
    let half = (kernel.len() / 2) as i64;
    let width = image.width() as usize;
    let height = image.height() as i64;
    let input = image.as_raw();
    let mut output = GrayFloatImage::new(image.width(), image.height());
    for (y, row_out) in output.chunks_exact_mut(width.max(1)).enumerate() {
        for (k, &weight) in kernel.iter().enumerate() {
            let source = (y as i64 + k as i64 - half).clamp(0, height - 1) as usize;
            let row_in = &input[source * width..(source + 1) * width];
            for (out, &value) in row_out.iter_mut().zip(row_in) {
                *out += weight * value;
            }
        }
    }
    output
}

pub fn separable_filter(
    image: &GrayFloatImage,
    h_kernel: &[f32],
    v_kernel: &[f32],
) -> GrayFloatImage {
    let h = horizontal_filter(image, h_kernel);
    vertical_filter(&h, v_kernel)
}

/// Binomial weights that replace the sampled Gaussian for the smallest windows.
const SMALL_GAUSSIAN_KERNELS: [&[f32]; 4] = [
    &[1.0],
    &[0.25, 0.5, 0.25],
    &[0.0625, 0.25, 0.375, 0.25, 0.0625],
    &[0.03125, 0.109375, 0.21875, 0.28125, 0.21875, 0.109375, 0.03125],
];

/// The Gaussian window of `kernel_size` used when no sigma is given.
///
/// Windows up to 7 pixels use fixed binomial weights, larger ones sample a Gaussian with
/// [`default_sigma`].
pub fn blur_kernel(kernel_size: usize) -> Vec<f32> {
    match SMALL_GAUSSIAN_KERNELS.get(kernel_size / 2) {
        Some(kernel) if kernel.len() == kernel_size => kernel.to_vec(),
        _ => gaussian_kernel(default_sigma(kernel_size), kernel_size),
    }
}

/// Blurs an 8-bit image with a Gaussian window of `kernel_size`, rounding back to 8 bits.
pub fn gaussian_blur_u8(image: &GrayImage, kernel_size: usize) -> GrayImage {
    let kernel = blur_kernel(kernel_size);
    let float = GrayFloatImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([image.get_pixel(x, y)[0] as f32])
    });
    let blurred = separable_filter(&float, &kernel, &kernel);
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        Luma([blurred.get_pixel(x, y)[0].round().clamp(0.0, 255.0) as u8])
    })
}

/// Linearly rescales `image` so that its minimum maps to 0 and its maximum to 255.
///
/// An image without contrast maps to all zeros.
pub fn normalize_to_u8(image: &GrayFloatImage) -> GrayImage {
    let (min, max) = image
        .as_raw()
        .iter()
        .fold((f32::INFINITY, f32::NEG_INFINITY), |(lo, hi), &v| {
            (lo.min(v), hi.max(v))
        });
    let range = (max - min) as f64;
    if !(range.is_finite() && range > 0.0) {
        return GrayImage::new(image.width(), image.height());
    }
    let scale = 255.0 / range;
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let value = (image.get_pixel(x, y)[0] - min) as f64 * scale;
        Luma([value.round().clamp(0.0, 255.0) as u8])
    })
}

/// Gaussian adaptive threshold. A pixel is set to `1` when it exceeds the Gaussian weighted
/// mean of its `kernel_size` neighbourhood by more than `c` (truncated to an integer).
pub fn adaptive_threshold(image: &GrayImage, kernel_size: usize, c: f64) -> GrayImage {
    let mean = gaussian_blur_u8(image, kernel_size);
    let delta = c.floor() as i32;
    GrayImage::from_fn(image.width(), image.height(), |x, y| {
        let src = image.get_pixel(x, y)[0] as i32;
        let local = mean.get_pixel(x, y)[0] as i32;
        Luma([u8::from(src - local > delta)])
    })
}

/// Median filter over the plane indices that only looks at masked pixels.
///
/// Every masked pixel takes the median of the masked pixels inside its `size` window, using
/// the lower of the two middle values for even counts. Unmasked pixels are copied unchanged.
pub fn masked_median_filter(
    indices: &PlaneIndexImage,
    mask: &GrayImage,
    size: usize,
) -> PlaneIndexImage {
    let half = (size / 2) as i64;
    let (width, height) = (indices.width() as i64, indices.height() as i64);
    let mut window = Vec::with_capacity(size * size);
    let mut output = indices.clone();
    for (x, y, pixel) in output.enumerate_pixels_mut() {
        if mask.get_pixel(x, y)[0] == 0 {
            continue;
        }
        window.clear();
        for wy in (y as i64 - half).max(0)..=(y as i64 + half).min(height - 1) {
            for wx in (x as i64 - half).max(0)..=(x as i64 + half).min(width - 1) {
                if mask.get_pixel(wx as u32, wy as u32)[0] != 0 {
                    window.push(indices.get_pixel(wx as u32, wy as u32)[0]);
                }
            }
        }
        window.sort_unstable();
        pixel[0] = window[(window.len() - 1) / 2];
    }
    output
}
