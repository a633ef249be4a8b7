//! GeoTIFF raster source backed by the `tiff` decoder.
//!
//! Only tags are read when the file is opened. Window reads decode the
//! strips or tiles that intersect the window and keep them in a bounded LRU
//! so neighbouring tiles reuse the same decoded chunks.

use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tiff::decoder::{Decoder, DecodingResult};
use tiff::tags::Tag;
use tile_common::{GeoTransform, PixelWindow, SampleBlock};
use tracing::{debug, info};

use super::{check_window, RasterSource};
use crate::cache::{ChunkCache, DecodedChunk};
use crate::error::{RasterError, Result};
use crate::types::{ChunkCacheStats, DatasetMetadata};

// GeoTIFF / GDAL tag numbers
const TAG_MODEL_PIXEL_SCALE: u16 = 33550;
const TAG_MODEL_TIEPOINT: u16 = 33922;
const TAG_MODEL_TRANSFORMATION: u16 = 34264;
const TAG_GEO_KEY_DIRECTORY: u16 = 34735;
const TAG_GDAL_NODATA: u16 = 42113;

// GeoKey ids
const KEY_RASTER_TYPE: u16 = 1025;
const KEY_GEOGRAPHIC_TYPE: u16 = 2048;
const KEY_PROJECTED_CS_TYPE: u16 = 3072;

const RASTER_PIXEL_IS_POINT: u16 = 2;
const USER_DEFINED: u16 = 32767;

/// Default decoded-chunk budget when none is configured.
pub const DEFAULT_CHUNK_CACHE_BYTES: usize = 256 * 1024 * 1024;

/// How samples are laid out in the file.
#[derive(Debug, Clone, Copy)]
struct ChunkLayout {
    chunk_width: usize,
    chunk_height: usize,
    chunks_across: usize,
    /// Distance between consecutive band-1 samples inside a chunk.
    sample_step: usize,
}

impl ChunkLayout {
    fn index(&self, chunk_row: usize, chunk_col: usize) -> u32 {
        (chunk_row * self.chunks_across + chunk_col) as u32
    }
}

struct TiffState {
    decoder: Decoder<BufReader<File>>,
    cache: ChunkCache,
}

impl TiffState {
    /// Band-1 samples of one chunk.
    fn chunk(&mut self, index: u32, layout: &ChunkLayout) -> Result<Arc<DecodedChunk>> {
        if let Some(data) = self.cache.get(index) {
            return Ok(data);
        }

        let (data_w, data_h) = self.decoder.chunk_data_dimensions(index);
        let (data_w, data_h) = (data_w as usize, data_h as usize);
        let values = decoding_result_to_f32(self.decoder.read_chunk(index)?)?;

        // Edge chunks may come back either cropped or padded to the full chunk width
        let row_stride = if values.len() == data_w * data_h * layout.sample_step {
            data_w * layout.sample_step
        } else if values.len() >= layout.chunk_width * data_h * layout.sample_step {
            layout.chunk_width * layout.sample_step
        } else {
            return Err(RasterError::read_failed(format!(
                "chunk {} decoded to {} samples, expected {}x{}",
                index,
                values.len(),
                data_w,
                data_h
            )));
        };

        let mut band = Vec::with_capacity(data_w * data_h);
        for row in 0..data_h {
            let start = row * row_stride;
            band.extend(
                (0..data_w).map(|col| values[start + col * layout.sample_step]),
            );
        }

        let chunk = Arc::new(DecodedChunk {
            width: data_w,
            height: data_h,
            data: band,
        });
        self.cache.insert(index, Arc::clone(&chunk));
        Ok(chunk)
    }
}

/// A GeoTIFF file opened for windowed reads.
///
/// Reads are serialized on one decoder; concurrent requests queue on the
/// mutex inside blocking tasks rather than on the async executor.
pub struct GeoTiffSource {
    metadata: DatasetMetadata,
    layout: ChunkLayout,
    state: Arc<Mutex<TiffState>>,
}

impl GeoTiffSource {
    /// Open a GeoTIFF with the default chunk cache budget.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::open_with_cache(path, DEFAULT_CHUNK_CACHE_BYTES)
    }

    /// Open a GeoTIFF, keeping up to `cache_bytes` of decoded chunks.
    pub fn open_with_cache(path: impl AsRef<Path>, cache_bytes: usize) -> Result<Self> {
        let path = path.as_ref();
        let path_str = path.display().to_string();

        let file = File::open(path).map_err(|e| RasterError::open_failed(&path_str, e.to_string()))?;
        let mut decoder = Decoder::new(BufReader::new(file))
            .map_err(|e| RasterError::open_failed(&path_str, e.to_string()))?;

        let (width, height) = decoder.dimensions()?;
        let (width, height) = (width as usize, height as usize);
        if width == 0 || height == 0 {
            return Err(RasterError::invalid_metadata("raster has zero size"));
        }

        let band_count = find_u16_vec(&mut decoder, Tag::SamplesPerPixel)?
            .and_then(|v| v.first().copied())
            .unwrap_or(1) as usize;
        let planar = find_u16_vec(&mut decoder, Tag::PlanarConfiguration)?
            .and_then(|v| v.first().copied())
            .unwrap_or(1)
            == 2;
        let bits = find_u16_vec(&mut decoder, Tag::BitsPerSample)?
            .and_then(|v| v.first().copied())
            .unwrap_or(1);
        let format = find_u16_vec(&mut decoder, Tag::SampleFormat)?
            .and_then(|v| v.first().copied())
            .unwrap_or(1);

        let geo_keys = find_u16_vec(&mut decoder, Tag::from_u16_exhaustive(TAG_GEO_KEY_DIRECTORY))?
            .unwrap_or_default();
        let transform = read_transform(&mut decoder, &geo_keys)?;
        let nodata = read_nodata(&mut decoder)?;
        let crs = crs_from_geo_keys(&geo_keys);

        let (chunk_w, chunk_h) = decoder.chunk_dimensions();
        let (chunk_w, chunk_h) = (chunk_w as usize, chunk_h as usize);
        if chunk_w == 0 || chunk_h == 0 {
            return Err(RasterError::invalid_metadata("zero-sized strips or tiles"));
        }
        let layout = ChunkLayout {
            chunk_width: chunk_w,
            chunk_height: chunk_h,
            chunks_across: width.div_ceil(chunk_w),
            sample_step: if planar { 1 } else { band_count.max(1) },
        };

        let metadata = DatasetMetadata {
            path: path_str,
            width,
            height,
            bounds: transform.bounds(width, height),
            transform,
            crs,
            nodata,
            band_count,
            dtype: dtype_name(format, bits),
            chunk_shape: (chunk_w, chunk_h),
        };

        info!(
            path = %metadata.path,
            width,
            height,
            crs = %metadata.crs,
            dtype = %metadata.dtype,
            chunk_width = chunk_w,
            chunk_height = chunk_h,
            nodata = ?nodata,
            "Opened GeoTIFF"
        );

        Ok(Self {
            metadata,
            layout,
            state: Arc::new(Mutex::new(TiffState {
                decoder,
                cache: ChunkCache::new(cache_bytes),
            })),
        })
    }
}

#[async_trait]
impl RasterSource for GeoTiffSource {
    fn metadata(&self) -> &DatasetMetadata {
        &self.metadata
    }

    async fn read_window(&self, window: &PixelWindow) -> Result<SampleBlock> {
        check_window(window, &self.metadata)?;

        let state = Arc::clone(&self.state);
        let layout = self.layout;
        let window = *window;
        let nodata = self.metadata.nodata;

        tokio::task::spawn_blocking(move || {
            let mut state = state
                .lock()
                .map_err(|_| RasterError::read_failed("decoder lock poisoned"))?;
            read_window_blocking(&mut state, &layout, &window, nodata)
        })
        .await
        .map_err(|e| RasterError::read_failed(format!("read task failed: {}", e)))?
    }

    fn cache_stats(&self) -> ChunkCacheStats {
        match self.state.lock() {
            Ok(state) => state.cache.stats(),
            Err(_) => ChunkCacheStats::default(),
        }
    }
}

fn read_window_blocking(
    state: &mut TiffState,
    layout: &ChunkLayout,
    window: &PixelWindow,
    nodata: Option<f64>,
) -> Result<SampleBlock> {
    let mut values = vec![0.0f32; window.pixel_count()];

    let first_chunk_row = window.row_off / layout.chunk_height;
    let last_chunk_row = (window.row_end() - 1) / layout.chunk_height;
    let first_chunk_col = window.col_off / layout.chunk_width;
    let last_chunk_col = (window.col_end() - 1) / layout.chunk_width;

    for chunk_row in first_chunk_row..=last_chunk_row {
        for chunk_col in first_chunk_col..=last_chunk_col {
            let index = layout.index(chunk_row, chunk_col);
            let chunk = state.chunk(index, layout)?;

            let chunk_top = chunk_row * layout.chunk_height;
            let chunk_left = chunk_col * layout.chunk_width;

            let row_start = window.row_off.max(chunk_top);
            let row_end = window.row_end().min(chunk_top + chunk.height);
            let col_start = window.col_off.max(chunk_left);
            let col_end = window.col_end().min(chunk_left + chunk.width);
            if row_end <= row_start || col_end <= col_start {
                continue;
            }
            let n = col_end - col_start;

            for row in row_start..row_end {
                let src = (row - chunk_top) * chunk.width + (col_start - chunk_left);
                let dst = (row - window.row_off) * window.width + (col_start - window.col_off);
                values[dst..dst + n].copy_from_slice(&chunk.data[src..src + n]);
            }
        }
    }

    debug!(window = ?window, "Decoded window");
    Ok(SampleBlock::from_values(window.width, window.height, values, nodata))
}

/// SHORT tag values; single-valued tags come back as one-element vectors.
fn find_u16_vec(decoder: &mut Decoder<BufReader<File>>, tag: Tag) -> Result<Option<Vec<u16>>> {
    Ok(decoder.find_tag_unsigned_vec::<u16>(tag)?)
}

fn find_f64_vec(decoder: &mut Decoder<BufReader<File>>, tag: u16) -> Result<Option<Vec<f64>>> {
    Ok(decoder
        .find_tag(Tag::from_u16_exhaustive(tag))?
        .map(|v| v.into_f64_vec())
        .transpose()?)
}

/// Georeferencing from the model transformation, or tiepoint plus scale.
fn read_transform(decoder: &mut Decoder<BufReader<File>>, geo_keys: &[u16]) -> Result<GeoTransform> {
    let matrix = find_f64_vec(decoder, TAG_MODEL_TRANSFORMATION)?;
    let tiepoint = find_f64_vec(decoder, TAG_MODEL_TIEPOINT)?;
    let scale = find_f64_vec(decoder, TAG_MODEL_PIXEL_SCALE)?;

    let transform = transform_from_tags(matrix.as_deref(), tiepoint.as_deref(), scale.as_deref())?;

    if geo_key(geo_keys, KEY_RASTER_TYPE) == Some(RASTER_PIXEL_IS_POINT) {
        // Tie points name pixel centres; shift to the corner convention
        let (x, y) = transform.apply(-0.5, -0.5);
        return Ok(GeoTransform {
            origin_x: x,
            origin_y: y,
            ..transform
        });
    }
    Ok(transform)
}

fn transform_from_tags(
    matrix: Option<&[f64]>,
    tiepoint: Option<&[f64]>,
    scale: Option<&[f64]>,
) -> Result<GeoTransform> {
    if let Some(m) = matrix {
        if m.len() < 16 {
            return Err(RasterError::invalid_metadata(format!(
                "ModelTransformation has {} values, expected 16",
                m.len()
            )));
        }
        return Ok(GeoTransform::from_gdal([m[3], m[0], m[1], m[7], m[4], m[5]]));
    }

    match (tiepoint, scale) {
        (Some(tp), Some(sc)) if tp.len() >= 6 && sc.len() >= 2 => {
            if sc[0] == 0.0 || sc[1] == 0.0 {
                return Err(RasterError::invalid_metadata("ModelPixelScale is zero"));
            }
            let (i, j, x, y) = (tp[0], tp[1], tp[3], tp[4]);
            Ok(GeoTransform::north_up(x - i * sc[0], y + j * sc[1], sc[0], sc[1]))
        }
        _ => Err(RasterError::invalid_metadata(
            "no ModelTransformation or ModelTiepoint + ModelPixelScale tags",
        )),
    }
}

fn read_nodata(decoder: &mut Decoder<BufReader<File>>) -> Result<Option<f64>> {
    let raw = match decoder.find_tag(Tag::from_u16_exhaustive(TAG_GDAL_NODATA))? {
        Some(value) => value.into_string()?,
        None => return Ok(None),
    };
    Ok(parse_nodata(&raw))
}

fn parse_nodata(raw: &str) -> Option<f64> {
    raw.trim_matches(char::from(0)).trim().parse().ok()
}

/// Value of a key stored inline in the GeoKeyDirectory.
fn geo_key(keys: &[u16], id: u16) -> Option<u16> {
    keys.get(4..)?
        .chunks_exact(4)
        .find(|entry| entry[0] == id && entry[1] == 0)
        .map(|entry| entry[3])
}

fn crs_from_geo_keys(keys: &[u16]) -> String {
    [KEY_PROJECTED_CS_TYPE, KEY_GEOGRAPHIC_TYPE]
        .iter()
        .filter_map(|id| geo_key(keys, *id))
        .find(|code| *code != 0 && *code != USER_DEFINED)
        .map(|code| format!("EPSG:{}", code))
        .unwrap_or_else(|| "EPSG:4326".to_string())
}

fn dtype_name(sample_format: u16, bits: u16) -> String {
    let kind = match sample_format {
        2 => "int",
        3 => "float",
        _ => "uint",
    };
    format!("{}{}", kind, bits)
}

fn decoding_result_to_f32(result: DecodingResult) -> Result<Vec<f32>> {
    #[allow(unreachable_patterns)]
    let values = match result {
        DecodingResult::U8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::U32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::U64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I8(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I16(v) => v.into_iter().map(f32::from).collect(),
        DecodingResult::I32(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::I64(v) => v.into_iter().map(|x| x as f32).collect(),
        DecodingResult::F32(v) => v,
        DecodingResult::F64(v) => v.into_iter().map(|x| x as f32).collect(),
        _ => return Err(RasterError::read_failed("unsupported sample type")),
    };
    Ok(values)
}
