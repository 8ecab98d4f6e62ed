//! Conversion between sample grids and block vectors.
//!
//! A [`Grid`] is a row-major, channel-interleaved 2-D array of samples (a
//! grayscale or RGB image, or any other multi-channel raster). The
//! [`Vectorizer`] cuts it into blocks, visiting block origins row by row, and
//! turns each block into one [`Vector`]. Reconstruction visits blocks in the
//! same order.
//!
//! ```text
//!  width = 5, block = 2x2            block order
//!  ┌──┬──┬──┬──┬──┐                  ┌─────┬─────┬──┐
//!  │  │  │  │  │  │                  │  0  │  1  │2 │
//!  ├──┼──┼──┼──┼──┤       ──►        ├─────┼─────┼──┤
//!  │  │  │  │  │  │                  │  3  │  4  │5 │
//!  ├──┼──┼──┼──┼──┤                  └─────┴─────┴──┘
//!  │  │  │  │  │  │                  (edge blocks are clipped)
//!  └──┴──┴──┴──┴──┘
//! ```

use std::fmt;
use std::str::FromStr;

use codevec_core::{Assignment, Codebook, Error, Result, Vector};
use serde::{de, Deserialize, Deserializer, Serialize};

/// Dimensions of a grid; persisted with every artifact.
///
/// Every layout is non-empty and holds at most [`GridLayout::MAX_SAMPLES`]
/// samples, including layouts read back from an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GridLayout {
    height: usize,
    width: usize,
    channels: usize,
}

impl GridLayout {
    /// Largest grid accepted, in samples.
    pub const MAX_SAMPLES: usize = 1 << 30;

    /// Create a layout, rejecting empty or oversized grids.
    pub fn new(height: usize, width: usize, channels: usize) -> Result<Self> {
        if height == 0 || width == 0 || channels == 0 {
            return Err(Error::invalid(format!(
                "grid dimensions must be non-zero, got {}x{}x{}",
                height, width, channels
            )));
        }
        let samples = height
            .checked_mul(width)
            .and_then(|n| n.checked_mul(channels))
            .filter(|&n| n <= Self::MAX_SAMPLES);
        if samples.is_none() {
            return Err(Error::invalid(format!(
                "{}x{}x{} grid exceeds {} samples",
                height,
                width,
                channels,
                Self::MAX_SAMPLES
            )));
        }
        Ok(Self {
            height,
            width,
            channels,
        })
    }

    /// Rows of samples.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Columns of samples.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Samples per grid position (1 = grayscale, 3 = RGB).
    pub fn channels(&self) -> usize {
        self.channels
    }

    /// Total number of samples.
    pub fn sample_count(&self) -> usize {
        self.height * self.width * self.channels
    }
}

impl<'de> Deserialize<'de> for GridLayout {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Fields {
            height: usize,
            width: usize,
            channels: usize,
        }

        let fields = Fields::deserialize(deserializer)?;
        GridLayout::new(fields.height, fields.width, fields.channels).map_err(de::Error::custom)
    }
}

/// A 2-D grid of samples, row-major with interleaved channels.
#[derive(Debug, Clone, PartialEq)]
pub struct Grid {
    layout: GridLayout,
    samples: Vec<f64>,
}

impl Grid {
    /// Create a grid, validating the sample count against the layout.
    pub fn new(height: usize, width: usize, channels: usize, samples: Vec<f64>) -> Result<Self> {
        let layout = GridLayout::new(height, width, channels)?;
        Self::with_layout(layout, samples)
    }

    /// Create a grid with an existing layout.
    pub fn with_layout(layout: GridLayout, samples: Vec<f64>) -> Result<Self> {
        if samples.len() != layout.sample_count() {
            return Err(Error::invalid(format!(
                "{}x{}x{} grid needs {} samples, got {}",
                layout.height,
                layout.width,
                layout.channels,
                layout.sample_count(),
                samples.len()
            )));
        }
        Ok(Self { layout, samples })
    }

    /// Create a grid from 8-bit samples.
    pub fn from_u8(height: usize, width: usize, channels: usize, samples: &[u8]) -> Result<Self> {
        Self::new(
            height,
            width,
            channels,
            samples.iter().map(|&s| f64::from(s)).collect(),
        )
    }

    /// Grid dimensions.
    pub fn layout(&self) -> GridLayout {
        self.layout
    }

    /// Rows.
    pub fn height(&self) -> usize {
        self.layout.height
    }

    /// Columns.
    pub fn width(&self) -> usize {
        self.layout.width
    }

    /// Channels per position.
    pub fn channels(&self) -> usize {
        self.layout.channels
    }

    /// All samples, row-major and channel-interleaved.
    pub fn samples(&self) -> &[f64] {
        &self.samples
    }

    /// The channel values at row `y`, column `x`.
    pub fn pixel(&self, y: usize, x: usize) -> &[f64] {
        let c = self.layout.channels;
        let offset = (y * self.layout.width + x) * c;
        &self.samples[offset..offset + c]
    }

    /// Samples rounded and clamped into `0..=255`.
    pub fn to_u8(&self) -> Vec<u8> {
        let range = SampleRange::default();
        self.samples
            .iter()
            .map(|&s| range.quantize(s) as u8)
            .collect()
    }

    /// Consume the grid, returning its samples.
    pub fn into_samples(self) -> Vec<f64> {
        self.samples
    }
}

/// Block size in grid positions.
///
/// Both sides are non-zero and a block covers at most
/// [`GridLayout::MAX_SAMPLES`] positions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct BlockShape {
    height: usize,
    width: usize,
}

impl BlockShape {
    /// Single-sample blocks (per-pixel color quantization).
    pub const SINGLE: BlockShape = BlockShape {
        height: 1,
        width: 1,
    };

    /// Create a block shape, rejecting zero-sized or oversized blocks.
    pub fn new(height: usize, width: usize) -> Result<Self> {
        if height == 0 || width == 0 {
            return Err(Error::invalid(format!(
                "block dimensions must be non-zero, got {}x{}",
                height, width
            )));
        }
        if height
            .checked_mul(width)
            .map_or(true, |area| area > GridLayout::MAX_SAMPLES)
        {
            return Err(Error::invalid(format!(
                "{}x{} block exceeds {} positions",
                height,
                width,
                GridLayout::MAX_SAMPLES
            )));
        }
        Ok(Self { height, width })
    }

    /// Rows per block.
    pub fn height(&self) -> usize {
        self.height
    }

    /// Columns per block.
    pub fn width(&self) -> usize {
        self.width
    }

    /// Grid positions per block.
    pub fn area(&self) -> usize {
        self.height * self.width
    }
}

impl<'de> Deserialize<'de> for BlockShape {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Fields {
            height: usize,
            width: usize,
        }

        let fields = Fields::deserialize(deserializer)?;
        BlockShape::new(fields.height, fields.width).map_err(de::Error::custom)
    }
}

impl Default for BlockShape {
    fn default() -> Self {
        BlockShape {
            height: 2,
            width: 2,
        }
    }
}

impl fmt::Display for BlockShape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.height, self.width)
    }
}

impl FromStr for BlockShape {
    type Err = Error;

    /// Parse `"HxW"` or a single number for square blocks.
    fn from_str(s: &str) -> Result<Self> {
        let parse = |part: &str| {
            part.trim()
                .parse::<usize>()
                .map_err(|_| Error::invalid(format!("invalid block shape '{}'", s)))
        };
        match s.split_once(['x', 'X']) {
            Some((h, w)) => BlockShape::new(parse(h)?, parse(w)?),
            None => {
                let side = parse(s)?;
                BlockShape::new(side, side)
            }
        }
    }
}

/// How a block becomes a vector.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum BlockEncoding {
    /// One component per channel: the channel mean over the block.
    /// A 1x1 block yields the raw sample values.
    #[default]
    #[serde(rename = "mean")]
    Mean,
    /// Every sample of the block, row-major and channel-interleaved.
    /// Edge blocks are padded by repeating the last row/column.
    #[serde(rename = "samples")]
    Samples,
}

impl FromStr for BlockEncoding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "mean" => Ok(BlockEncoding::Mean),
            "samples" => Ok(BlockEncoding::Samples),
            other => Err(Error::invalid(format!("unknown block encoding '{}'", other))),
        }
    }
}

/// Valid output sample range; reconstruction rounds then clamps into it.
///
/// Bounds are finite with `min <= max`, also when read from an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SampleRange {
    min: f64,
    max: f64,
}

impl SampleRange {
    /// Create a range, rejecting inverted or non-finite bounds.
    pub fn new(min: f64, max: f64) -> Result<Self> {
        if !min.is_finite() || !max.is_finite() || min > max {
            return Err(Error::invalid(format!("invalid sample range {}..={}", min, max)));
        }
        Ok(Self { min, max })
    }

    /// Smallest representable sample.
    pub fn min(&self) -> f64 {
        self.min
    }

    /// Largest representable sample.
    pub fn max(&self) -> f64 {
        self.max
    }

    /// Round to nearest and clamp.
    #[inline]
    pub fn quantize(&self, value: f64) -> f64 {
        value.round().clamp(self.min, self.max)
    }
}

impl<'de> Deserialize<'de> for SampleRange {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        #[derive(Deserialize)]
        struct Fields {
            min: f64,
            max: f64,
        }

        let fields = Fields::deserialize(deserializer)?;
        SampleRange::new(fields.min, fields.max).map_err(de::Error::custom)
    }
}

impl Default for SampleRange {
    fn default() -> Self {
        SampleRange {
            min: 0.0,
            max: 255.0,
        }
    }
}

/// Cuts grids into block vectors and paints them back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Vectorizer {
    block: BlockShape,
    encoding: BlockEncoding,
}

impl Vectorizer {
    /// Create a vectorizer.
    pub fn new(block: BlockShape, encoding: BlockEncoding) -> Self {
        Self { block, encoding }
    }

    /// Block shape.
    pub fn block(&self) -> BlockShape {
        self.block
    }

    /// Block encoding.
    pub fn encoding(&self) -> BlockEncoding {
        self.encoding
    }

    /// Block rows and columns covering `layout`.
    pub fn block_grid(&self, layout: &GridLayout) -> (usize, usize) {
        (
            layout.height.div_ceil(self.block.height),
            layout.width.div_ceil(self.block.width),
        )
    }

    /// Number of vectors produced for `layout`.
    pub fn block_count(&self, layout: &GridLayout) -> usize {
        let (rows, cols) = self.block_grid(layout);
        rows * cols
    }

    /// Dimension of each produced vector.
    pub fn vector_dim(&self, channels: usize) -> usize {
        match self.encoding {
            BlockEncoding::Mean => channels,
            BlockEncoding::Samples => self.block.area().saturating_mul(channels),
        }
    }

    /// Turn a grid into one vector per block, row-major over block origins.
    pub fn vectorize(&self, grid: &Grid) -> Result<Vec<Vector>> {
        let layout = grid.layout();
        let (rows, cols) = self.block_grid(&layout);
        let dim = self.vector_dim(layout.channels);
        let mut vectors = Vec::with_capacity(rows * cols);

        for by in 0..rows {
            for bx in 0..cols {
                let y0 = by * self.block.height;
                let x0 = bx * self.block.width;
                let mut components = Vec::with_capacity(dim);

                match self.encoding {
                    BlockEncoding::Mean => {
                        components.resize(layout.channels, 0.0);
                        let y1 = (y0 + self.block.height).min(layout.height);
                        let x1 = (x0 + self.block.width).min(layout.width);
                        for y in y0..y1 {
                            for x in x0..x1 {
                                for (acc, &s) in components.iter_mut().zip(grid.pixel(y, x)) {
                                    *acc += s;
                                }
                            }
                        }
                        let count = ((y1 - y0) * (x1 - x0)) as f64;
                        for c in components.iter_mut() {
                            *c /= count;
                        }
                    }
                    BlockEncoding::Samples => {
                        for dy in 0..self.block.height {
                            let y = (y0 + dy).min(layout.height - 1);
                            for dx in 0..self.block.width {
                                let x = (x0 + dx).min(layout.width - 1);
                                components.extend_from_slice(grid.pixel(y, x));
                            }
                        }
                    }
                }

                vectors.push(Vector::from(components));
            }
        }

        Ok(vectors)
    }

    /// Paint each block with its codeword, rounding and clamping into `range`.
    pub fn reconstruct(
        &self,
        codebook: &Codebook,
        assignment: &Assignment,
        layout: GridLayout,
        range: SampleRange,
    ) -> Result<Grid> {
        let expected_dim = self.vector_dim(layout.channels);
        if codebook.dim() != expected_dim {
            return Err(Error::format(format!(
                "codeword dimension {} does not match {} {} blocks of {} channels ({})",
                codebook.dim(),
                self.block,
                match self.encoding {
                    BlockEncoding::Mean => "mean",
                    BlockEncoding::Samples => "sample",
                },
                layout.channels,
                expected_dim
            )));
        }

        let (rows, cols) = self.block_grid(&layout);
        if assignment.len() != rows * cols {
            return Err(Error::format(format!(
                "assignment has {} indices but the grid has {} blocks",
                assignment.len(),
                rows * cols
            )));
        }

        let channels = layout.channels;
        let mut samples = vec![0.0; layout.sample_count()];

        for (block_index, &code) in assignment.iter().enumerate() {
            let codeword = codebook.get(code).ok_or_else(|| {
                Error::format(format!(
                    "block {} refers to codeword {} of {}",
                    block_index,
                    code,
                    codebook.len()
                ))
            })?;
            let values = codeword.as_slice();

            let y0 = (block_index / cols) * self.block.height;
            let x0 = (block_index % cols) * self.block.width;
            let y1 = (y0 + self.block.height).min(layout.height);
            let x1 = (x0 + self.block.width).min(layout.width);

            for y in y0..y1 {
                for x in x0..x1 {
                    let source = match self.encoding {
                        BlockEncoding::Mean => values,
                        BlockEncoding::Samples => {
                            let offset = ((y - y0) * self.block.width + (x - x0)) * channels;
                            &values[offset..offset + channels]
                        }
                    };
                    let target = (y * layout.width + x) * channels;
                    for (dst, &v) in samples[target..target + channels].iter_mut().zip(source) {
                        *dst = range.quantize(v);
                    }
                }
            }
        }

        Grid::with_layout(layout, samples)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gray(height: usize, width: usize, values: &[f64]) -> Grid {
        Grid::new(height, width, 1, values.to_vec()).unwrap()
    }

    #[test]
    fn test_single_sample_vectors_are_raw_values() {
        let grid = Grid::new(1, 2, 3, vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0]).unwrap();
        let v = Vectorizer::new(BlockShape::SINGLE, BlockEncoding::Mean);
        let vectors = v.vectorize(&grid).unwrap();

        assert_eq!(vectors.len(), 2);
        assert_eq!(vectors[0].as_slice(), &[1.0, 2.0, 3.0]);
        assert_eq!(vectors[1].as_slice(), &[4.0, 5.0, 6.0]);
    }

    #[test]
    fn test_block_mean_row_major_with_clipping() {
        // 3x3 grid, 2x2 blocks -> 2x2 blocks, edges clipped
        let grid = gray(3, 3, &[1.0, 3.0, 10.0, 5.0, 7.0, 20.0, 100.0, 200.0, 50.0]);
        let v = Vectorizer::new(BlockShape::new(2, 2).unwrap(), BlockEncoding::Mean);
        let vectors = v.vectorize(&grid).unwrap();

        let values: Vec<f64> = vectors.iter().map(|v| v.as_slice()[0]).collect();
        assert_eq!(values, vec![4.0, 15.0, 150.0, 50.0]);
    }

    #[test]
    fn test_samples_encoding_pads_edges() {
        let grid = gray(1, 3, &[1.0, 2.0, 3.0]);
        let v = Vectorizer::new(BlockShape::new(2, 2).unwrap(), BlockEncoding::Samples);
        assert_eq!(v.vector_dim(1), 4);

        let vectors = v.vectorize(&grid).unwrap();
        assert_eq!(vectors[0].as_slice(), &[1.0, 2.0, 1.0, 2.0]);
        assert_eq!(vectors[1].as_slice(), &[3.0, 3.0, 3.0, 3.0]);
    }

    #[test]
    fn test_reconstruct_mean_blocks() {
        let layout = GridLayout::new(3, 3, 1).unwrap();
        let v = Vectorizer::new(BlockShape::new(2, 2).unwrap(), BlockEncoding::Mean);
        let codebook = Codebook::new(vec![Vector::from([10.4]), Vector::from([300.0])]).unwrap();
        let assignment = Assignment::new(vec![0, 1, 1, 0]);

        let grid = v
            .reconstruct(&codebook, &assignment, layout, SampleRange::default())
            .unwrap();
        assert_eq!(
            grid.samples(),
            &[10.0, 10.0, 255.0, 10.0, 10.0, 255.0, 255.0, 255.0, 10.0]
        );
    }

    #[test]
    fn test_samples_roundtrip_is_exact_with_identity_codebook() {
        let grid = gray(2, 3, &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0]);
        let v = Vectorizer::new(BlockShape::new(2, 2).unwrap(), BlockEncoding::Samples);
        let vectors = v.vectorize(&grid).unwrap();
        let codebook = Codebook::new(vectors.clone()).unwrap();
        let assignment = Assignment::new((0..vectors.len()).collect());

        let rebuilt = v
            .reconstruct(&codebook, &assignment, grid.layout(), SampleRange::default())
            .unwrap();
        assert_eq!(rebuilt, grid);
    }

    #[test]
    fn test_reconstruct_rejects_mismatched_artifacts() {
        let layout = GridLayout::new(2, 2, 1).unwrap();
        let v = Vectorizer::new(BlockShape::SINGLE, BlockEncoding::Mean);
        let codebook = Codebook::new(vec![Vector::from([1.0])]).unwrap();

        let short = Assignment::new(vec![0, 0, 0]);
        assert!(matches!(
            v.reconstruct(&codebook, &short, layout, SampleRange::default()),
            Err(Error::FormatMismatch(_))
        ));

        let out_of_range = Assignment::new(vec![0, 0, 0, 1]);
        assert!(matches!(
            v.reconstruct(&codebook, &out_of_range, layout, SampleRange::default()),
            Err(Error::FormatMismatch(_))
        ));

        let rgb = GridLayout::new(2, 2, 3).unwrap();
        assert!(matches!(
            v.reconstruct(&codebook, &Assignment::new(vec![0; 4]), rgb, SampleRange::default()),
            Err(Error::FormatMismatch(_))
        ));
    }

    #[test]
    fn test_grid_validation() {
        assert!(Grid::new(2, 2, 1, vec![0.0; 3]).is_err());
        assert!(Grid::new(0, 2, 1, Vec::new()).is_err());
        assert!(BlockShape::new(0, 1).is_err());
        assert!(SampleRange::new(10.0, 0.0).is_err());
    }

    #[test]
    fn test_oversized_layouts_are_rejected() {
        assert!(GridLayout::new(1 << 40, 1 << 40, 1).is_err());
        assert!(GridLayout::new(usize::MAX, 2, 1).is_err());
        assert!(GridLayout::new(GridLayout::MAX_SAMPLES, 1, 2).is_err());
        assert!(GridLayout::new(GridLayout::MAX_SAMPLES, 1, 1).is_ok());

        assert!(BlockShape::new(1 << 40, 1 << 40).is_err());
        assert!(BlockShape::new(usize::MAX, 2).is_err());

        let layout = GridLayout::new(4, 4, 1).unwrap();
        let block = BlockShape::new(1 << 15, 1 << 15).unwrap();
        let huge = Vectorizer::new(block, BlockEncoding::Samples);
        assert_eq!(huge.block_count(&layout), 1);
    }

    #[test]
    fn test_sample_range_rejects_unusable_bounds() {
        assert!(SampleRange::new(255.0, 0.0).is_err());
        assert!(SampleRange::new(f64::NAN, 255.0).is_err());
        assert!(SampleRange::new(0.0, f64::INFINITY).is_err());
        let flat = SampleRange::new(7.0, 7.0).unwrap();
        assert_eq!(flat.quantize(100.0), 7.0);
    }

    #[test]
    fn test_deserialize_validates_fields() {
        let range: SampleRange = serde_json::from_str(r#"{"min":0.0,"max":15.0}"#).unwrap();
        assert_eq!(range.quantize(99.0), 15.0);
        assert!(serde_json::from_str::<SampleRange>(r#"{"min":255.0,"max":0.0}"#).is_err());

        let block: BlockShape = serde_json::from_str(r#"{"height":3,"width":2}"#).unwrap();
        assert_eq!(block.area(), 6);
        assert!(serde_json::from_str::<BlockShape>(r#"{"height":0,"width":2}"#).is_err());

        assert!(serde_json::from_str::<GridLayout>(
            r#"{"height":1099511627776,"width":1099511627776,"channels":1}"#
        )
        .is_err());
        let empty = r#"{"height":2,"width":0,"channels":1}"#;
        assert!(serde_json::from_str::<GridLayout>(empty).is_err());
    }

    #[test]
    fn test_parse_block_shape() {
        assert_eq!("2x3".parse::<BlockShape>().unwrap(), BlockShape::new(2, 3).unwrap());
        assert_eq!("4".parse::<BlockShape>().unwrap(), BlockShape::new(4, 4).unwrap());
        assert!("0x2".parse::<BlockShape>().is_err());
        assert!("wide".parse::<BlockShape>().is_err());
        assert_eq!(BlockShape::default().to_string(), "2x2");
        assert_eq!("samples".parse::<BlockEncoding>().unwrap(), BlockEncoding::Samples);
    }

    #[test]
    fn test_to_u8_clamps() {
        let grid = gray(1, 3, &[-4.0, 127.6, 999.0]);
        assert_eq!(grid.to_u8(), vec![0, 128, 255]);
    }
}
