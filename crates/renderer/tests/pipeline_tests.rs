//! End-to-end rendering of sample blocks.

use renderer::{render_block, AlphaPolicy, RenderSettings, DEFAULT_TILE_SIZE};
use tile_common::{RenderDefaults, RenderParams, SampleBlock};

fn decode(png: &[u8]) -> image::RgbaImage {
    image::load_from_memory(png).expect("PNG should decode").to_rgba8()
}

fn default_settings(policy: AlphaPolicy) -> RenderSettings {
    RenderSettings::new(
        &RenderParams::from_defaults(&RenderDefaults::default()),
        DEFAULT_TILE_SIZE,
        true,
        policy,
    )
}

/// 12x12 block peaking at 150 in the middle.
fn peaked_block() -> SampleBlock {
    let mut data = vec![1.0f32; 144];
    for row in 4..8 {
        for col in 4..8 {
            data[row * 12 + col] = 150.0;
        }
    }
    SampleBlock::new(12, 12, data)
}

// =============================================================================
// Color ramp
// =============================================================================

#[test]
fn test_peak_renders_bright_red_and_visible() {
    let png = render_block(&peaked_block(), &default_settings(AlphaPolicy::default()))
        .unwrap()
        .expect("block has data");
    let image = decode(&png);
    assert_eq!(image.dimensions(), (256, 256));

    // Above the alpha floor and in the upper band of the ramp
    let hot = image
        .pixels()
        .filter(|p| p.0[3] > 100 && p.0[0] >= p.0[1] && p.0[0] == 255)
        .count();
    assert!(hot > 0);

    // Centre of the tile sits on the 150 plateau
    let center = image.get_pixel(128, 128).0;
    assert_eq!(center[0], 255);
    assert!(center[3] > 230);
}

#[test]
fn test_floor_policy_keeps_low_values_visible() {
    let block = SampleBlock::new(4, 4, vec![0.5; 16]);
    let png = render_block(&block, &default_settings(AlphaPolicy::default()))
        .unwrap()
        .unwrap();
    assert!(decode(&png).pixels().all(|p| p.0[3] >= 100));
}

#[test]
fn test_floor_policy_hides_values_below_min() {
    // Default range starts at 0.1
    let block = SampleBlock::new(4, 4, vec![0.05; 16]);
    let png = render_block(&block, &default_settings(AlphaPolicy::default()))
        .unwrap()
        .expect("block is not blank");
    assert!(decode(&png).pixels().all(|p| p.0[3] == 0));
}

#[test]
fn test_proportional_policy_caps_alpha_by_opacity() {
    let png = render_block(&peaked_block(), &default_settings(AlphaPolicy::ProportionalOpacity))
        .unwrap()
        .unwrap();
    // opacity 0.7 -> at most 179
    assert!(decode(&png).pixels().all(|p| p.0[3] <= 179));
}

// =============================================================================
// No-data handling
// =============================================================================

#[test]
fn test_nodata_regions_are_transparent() {
    let mut block = SampleBlock::new(8, 8, vec![50.0; 64]);
    for row in 0..8 {
        for col in 0..4 {
            block.valid[row * 8 + col] = false;
        }
    }

    let png = render_block(&block, &default_settings(AlphaPolicy::default()))
        .unwrap()
        .unwrap();
    let image = decode(&png);

    assert_eq!(image.get_pixel(10, 128).0[3], 0);
    assert!(image.get_pixel(245, 128).0[3] > 0);
}

#[test]
fn test_grayscale_rendering() {
    let params = RenderParams {
        color: false,
        ..RenderParams::from_defaults(&RenderDefaults::default())
    };
    let settings = RenderSettings::new(&params, 64, true, AlphaPolicy::default());
    let png = render_block(&peaked_block(), &settings).unwrap().unwrap();

    let image = decode(&png);
    assert_eq!(image.dimensions(), (64, 64));
    assert!(image.pixels().all(|p| p.0[0] == p.0[1] && p.0[1] == p.0[2]));
}

#[test]
fn test_rendering_is_deterministic() {
    let settings = default_settings(AlphaPolicy::default());
    let a = render_block(&peaked_block(), &settings).unwrap();
    let b = render_block(&peaked_block(), &settings).unwrap();
    assert_eq!(a, b);
}
