//! PNG output decoded back with an independent decoder.

use renderer::png::{encode_png, transparent_tile};

// ============================================================================
// Helper functions
// ============================================================================

fn decode(png: &[u8]) -> image::RgbaImage {
    image::load_from_memory_with_format(png, image::ImageFormat::Png)
        .expect("PNG should decode")
        .to_rgba8()
}

/// Density-like tile: a handful of ramp colors plus transparent pixels.
fn quantized_pixels(width: usize, height: usize) -> Vec<u8> {
    let colors: [[u8; 4]; 5] = [
        [0, 0, 0, 0],
        [0, 128, 255, 120],
        [0, 255, 255, 150],
        [255, 255, 0, 200],
        [255, 0, 0, 255],
    ];
    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&colors[(x / 8 + y / 8) % colors.len()]);
        }
    }
    pixels
}

/// Smooth RGBA gradient with far more than 256 colors.
fn gradient_pixels(width: usize, height: usize) -> Vec<u8> {
    let mut pixels = Vec::with_capacity(width * height * 4);
    for y in 0..height {
        for x in 0..width {
            pixels.extend_from_slice(&[x as u8, y as u8, (x ^ y) as u8, 255]);
        }
    }
    pixels
}

// ============================================================================
// Round trips
// ============================================================================

#[test]
fn test_indexed_png_decodes_to_same_pixels() {
    let pixels = quantized_pixels(256, 256);
    let png = encode_png(&pixels, 256, 256).unwrap();

    // Color type 3 in IHDR
    assert_eq!(png[25], 3);

    let decoded = decode(&png);
    assert_eq!(decoded.dimensions(), (256, 256));
    assert_eq!(decoded.as_raw(), &pixels);
}

#[test]
fn test_rgba_png_decodes_to_same_pixels() {
    let pixels = gradient_pixels(256, 256);
    let png = encode_png(&pixels, 256, 256).unwrap();

    assert_eq!(png[25], 6);
    assert_eq!(decode(&png).as_raw(), &pixels);
}

#[test]
fn test_small_image_sequential_path() {
    let pixels = quantized_pixels(16, 8);
    let png = encode_png(&pixels, 16, 8).unwrap();
    let decoded = decode(&png);
    assert_eq!(decoded.dimensions(), (16, 8));
    assert_eq!(decoded.as_raw(), &pixels);
}

#[test]
fn test_indexed_smaller_than_rgba_for_quantized_tiles() {
    let quantized = encode_png(&quantized_pixels(256, 256), 256, 256).unwrap();
    let gradient = encode_png(&gradient_pixels(256, 256), 256, 256).unwrap();
    assert!(quantized.len() < gradient.len());
}

// ============================================================================
// Transparent tile
// ============================================================================

#[test]
fn test_transparent_tile_is_fully_transparent() {
    let png = transparent_tile(256).unwrap();
    let decoded = decode(&png);

    assert_eq!(decoded.dimensions(), (256, 256));
    assert!(decoded.pixels().all(|p| p.0[3] == 0));
}

#[test]
fn test_transparent_tile_is_stable() {
    assert_eq!(transparent_tile(256).unwrap(), transparent_tile(256).unwrap());
}
