use image::{GrayImage, Luma};

use crate::shared::frame::{Frame, CHANNELS};

// BT.601 luma weights in 14-bit fixed point.
const R_WEIGHT: u32 = 4899;
const G_WEIGHT: u32 = 9617;
const B_WEIGHT: u32 = 1868;
const SHIFT: u32 = 14;

/// Converts an RGB frame to 8-bit luma (`0.299 R + 0.587 G + 0.114 B`).
pub fn to_grayscale(frame: &Frame) -> GrayImage {
    let width = frame.width() as usize;
    let data = frame.data();
    GrayImage::from_fn(frame.width(), frame.height(), |x, y| {
        let offset = (y as usize * width + x as usize) * CHANNELS;
        Luma([luma(data[offset], data[offset + 1], data[offset + 2])])
    })
}

fn luma(r: u8, g: u8, b: u8) -> u8 {
    let sum = r as u32 * R_WEIGHT + g as u32 * G_WEIGHT + b as u32 * B_WEIGHT;
    ((sum + (1 << (SHIFT - 1))) >> SHIFT) as u8
}
