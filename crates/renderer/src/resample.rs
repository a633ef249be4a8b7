//! Bicubic resampling of sample blocks to the output tile size.

use rayon::prelude::*;
use tile_common::SampleBlock;

/// Catmull-Rom weights for taps at offsets -1, 0, 1, 2 from the floor sample.
#[inline]
fn catmull_rom_weights(t: f64) -> [f64; 4] {
    let t2 = t * t;
    let t3 = t2 * t;
    [
        0.5 * (-t3 + 2.0 * t2 - t),
        0.5 * (3.0 * t3 - 5.0 * t2 + 2.0),
        0.5 * (-3.0 * t3 + 4.0 * t2 + t),
        0.5 * (t3 - t2),
    ]
}

/// Source taps for one output coordinate along an axis.
#[derive(Debug, Clone, Copy)]
struct AxisTaps {
    indices: [usize; 4],
    weights: [f64; 4],
    nearest: usize,
}

fn axis_taps(dst_len: usize, src_len: usize) -> Vec<AxisTaps> {
    let scale = src_len as f64 / dst_len as f64;
    let last = src_len as isize - 1;
    (0..dst_len)
        .map(|i| {
            // Align pixel centres, not edges
            let src = (i as f64 + 0.5) * scale - 0.5;
            let base = src.floor();
            let weights = catmull_rom_weights(src - base);
            let base = base as isize;
            let mut indices = [0usize; 4];
            for (k, idx) in indices.iter_mut().enumerate() {
                *idx = (base - 1 + k as isize).clamp(0, last) as usize;
            }
            AxisTaps {
                indices,
                weights,
                nearest: (src.round() as isize).clamp(0, last) as usize,
            }
        })
        .collect()
}

/// Resample a block to `out_width` x `out_height`.
///
/// Returns `None` for blocks smaller than 2x2. No-data samples contribute
/// zero to the kernel; an output pixel is valid when its nearest source
/// pixel is.
pub fn resample_block(block: &SampleBlock, out_width: usize, out_height: usize) -> Option<SampleBlock> {
    if block.width < 2 || block.height < 2 || out_width == 0 || out_height == 0 {
        return None;
    }
    if block.width == out_width && block.height == out_height {
        return Some(block.clone());
    }

    let cols = axis_taps(out_width, block.width);
    let rows = axis_taps(out_height, block.height);

    let mut data = vec![0.0f32; out_width * out_height];
    let mut valid = vec![false; out_width * out_height];

    data.par_chunks_mut(out_width)
        .zip(valid.par_chunks_mut(out_width))
        .enumerate()
        .for_each(|(y, (data_row, valid_row))| {
            let ry = &rows[y];
            for (x, cx) in cols.iter().enumerate() {
                let mut acc = 0.0f64;
                for (wy, &sy) in ry.weights.iter().zip(&ry.indices) {
                    let row_start = sy * block.width;
                    let mut row_acc = 0.0f64;
                    for (wx, &sx) in cx.weights.iter().zip(&cx.indices) {
                        let idx = row_start + sx;
                        if block.valid[idx] {
                            row_acc += wx * block.data[idx] as f64;
                        }
                    }
                    acc += wy * row_acc;
                }
                data_row[x] = acc as f32;
                valid_row[x] = block.valid[ry.nearest * block.width + cx.nearest];
            }
        });

    Some(SampleBlock {
        width: out_width,
        height: out_height,
        data,
        valid,
    })
}
