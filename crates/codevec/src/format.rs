//! VQC (Vector-Quantized Codes) artifact format.
//!
//! An artifact carries everything needed to rebuild the grid: the codebook,
//! the per-block codeword indices, and the grid/block layout they refer to.

use std::collections::BTreeMap;
use std::io::{Read, Write};
use std::path::Path;

use codevec_core::{Assignment, Codebook, Error, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::vectorize::{BlockEncoding, BlockShape, GridLayout, SampleRange, Vectorizer};
use crate::{VQC_MAGIC, VQC_VERSION};

/// VQC file header.
///
/// # Binary Layout
///
/// ```text
/// Offset  Size   Field
/// ──────  ────   ─────
/// 0       4      magic ("VQC\0")
/// 4       2      version (u16)
/// 6       4      codebook_size (u32)
/// 10      4      vector_dim (u32)
/// 14      8      vector_count (u64)
/// 22      8      metadata_offset (u64)
/// 30      8      codebook_offset (u64)
/// 38      8      index_offset (u64)
/// 46      8      file_size (u64)
/// ──────────────────────────────────
/// Total: 54 bytes, little-endian
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VqcHeader {
    /// Magic bytes
    pub magic: [u8; 4],
    /// Format version
    pub version: u16,
    /// Number of codewords
    pub codebook_size: u32,
    /// Components per codeword
    pub vector_dim: u32,
    /// Number of encoded vectors (blocks)
    pub vector_count: u64,
    /// Metadata section offset
    pub metadata_offset: u64,
    /// Codebook section offset
    pub codebook_offset: u64,
    /// Index section offset
    pub index_offset: u64,
    /// Total file size
    pub file_size: u64,
}

impl VqcHeader {
    /// Header size in bytes
    pub const SIZE: usize = 54;

    /// Serialize to bytes
    pub fn to_bytes(&self) -> [u8; VqcHeader::SIZE] {
        let mut bytes = [0u8; VqcHeader::SIZE];
        bytes[0..4].copy_from_slice(&self.magic);
        bytes[4..6].copy_from_slice(&self.version.to_le_bytes());
        bytes[6..10].copy_from_slice(&self.codebook_size.to_le_bytes());
        bytes[10..14].copy_from_slice(&self.vector_dim.to_le_bytes());
        bytes[14..22].copy_from_slice(&self.vector_count.to_le_bytes());
        bytes[22..30].copy_from_slice(&self.metadata_offset.to_le_bytes());
        bytes[30..38].copy_from_slice(&self.codebook_offset.to_le_bytes());
        bytes[38..46].copy_from_slice(&self.index_offset.to_le_bytes());
        bytes[46..54].copy_from_slice(&self.file_size.to_le_bytes());
        bytes
    }

    /// Deserialize from bytes, checking magic, version and section order.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() < Self::SIZE {
            return Err(Error::format(format!(
                "header too short: {} of {} bytes",
                bytes.len(),
                Self::SIZE
            )));
        }

        let u16_at = |o: usize| u16::from_le_bytes([bytes[o], bytes[o + 1]]);
        let u32_at = |o: usize| {
            u32::from_le_bytes([bytes[o], bytes[o + 1], bytes[o + 2], bytes[o + 3]])
        };
        let u64_at = |o: usize| {
            let mut b = [0u8; 8];
            b.copy_from_slice(&bytes[o..o + 8]);
            u64::from_le_bytes(b)
        };

        let magic = [bytes[0], bytes[1], bytes[2], bytes[3]];
        if magic != VQC_MAGIC {
            return Err(Error::format("invalid magic bytes"));
        }

        let header = Self {
            magic,
            version: u16_at(4),
            codebook_size: u32_at(6),
            vector_dim: u32_at(10),
            vector_count: u64_at(14),
            metadata_offset: u64_at(22),
            codebook_offset: u64_at(30),
            index_offset: u64_at(38),
            file_size: u64_at(46),
        };

        if header.version != VQC_VERSION {
            return Err(Error::format(format!(
                "unsupported version {}, expected {}",
                header.version, VQC_VERSION
            )));
        }
        if header.metadata_offset != Self::SIZE as u64
            || header.codebook_offset < header.metadata_offset
            || header.index_offset < header.codebook_offset
            || header.file_size < header.index_offset
        {
            return Err(Error::format("section offsets out of order"));
        }
        if header.codebook_size == 0 || header.vector_dim == 0 {
            return Err(Error::format("empty codebook in header"));
        }

        Ok(header)
    }
}

/// Everything besides codebook and indices that decoding needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VqcMetadata {
    /// Original grid dimensions
    pub layout: GridLayout,
    /// Block shape used when vectorizing
    pub block: BlockShape,
    /// How blocks were turned into vectors
    pub encoding: BlockEncoding,
    /// Output sample range for reconstruction
    pub range: SampleRange,
    /// Creation timestamp (seconds since the Unix epoch)
    pub created_at: u64,
    /// Encoder version
    pub encoder_version: String,
    /// Free-form annotations (training summary and the like)
    pub extra: BTreeMap<String, String>,
}

impl VqcMetadata {
    /// Create metadata for a grid encoded with `vectorizer`.
    pub fn new(layout: GridLayout, vectorizer: &Vectorizer, range: SampleRange) -> Self {
        Self {
            layout,
            block: vectorizer.block(),
            encoding: vectorizer.encoding(),
            range,
            created_at: std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .map(|d| d.as_secs())
                .unwrap_or(0),
            encoder_version: env!("CARGO_PKG_VERSION").to_string(),
            extra: BTreeMap::new(),
        }
    }

    /// The vectorizer that produced (and can invert) the artifact.
    pub fn vectorizer(&self) -> Vectorizer {
        Vectorizer::new(self.block, self.encoding)
    }
}

/// Codeword indices stored at the narrowest width that fits the codebook.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum PackedIndices {
    /// k ≤ 256
    U8(Vec<u8>),
    /// k ≤ 65536
    U16(Vec<u16>),
    /// Larger codebooks
    U32(Vec<u32>),
}

impl PackedIndices {
    /// Pack an assignment for a codebook of `k` codewords.
    pub fn pack(assignment: &Assignment, k: usize) -> Result<Self> {
        if let Some(max) = assignment.max_index() {
            if max >= k {
                return Err(Error::invalid(format!(
                    "index {} out of range for {} codewords",
                    max, k
                )));
            }
        }

        let narrow = |_: std::num::TryFromIntError| Error::invalid("codebook too large to index");
        Ok(if k <= 1 << 8 {
            PackedIndices::U8(
                assignment
                    .iter()
                    .map(|&i| u8::try_from(i).map_err(narrow))
                    .collect::<Result<_>>()?,
            )
        } else if k <= 1 << 16 {
            PackedIndices::U16(
                assignment
                    .iter()
                    .map(|&i| u16::try_from(i).map_err(narrow))
                    .collect::<Result<_>>()?,
            )
        } else {
            PackedIndices::U32(
                assignment
                    .iter()
                    .map(|&i| u32::try_from(i).map_err(narrow))
                    .collect::<Result<_>>()?,
            )
        })
    }

    /// Widen back into an assignment.
    pub fn unpack(&self) -> Assignment {
        match self {
            PackedIndices::U8(v) => v.iter().map(|&i| usize::from(i)).collect(),
            PackedIndices::U16(v) => v.iter().map(|&i| usize::from(i)).collect(),
            PackedIndices::U32(v) => v.iter().map(|&i| i as usize).collect(),
        }
    }

    /// Number of indices.
    pub fn len(&self) -> usize {
        match self {
            PackedIndices::U8(v) => v.len(),
            PackedIndices::U16(v) => v.len(),
            PackedIndices::U32(v) => v.len(),
        }
    }

    /// True when there are no indices.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Bytes per stored index.
    pub fn index_width(&self) -> usize {
        match self {
            PackedIndices::U8(_) => 1,
            PackedIndices::U16(_) => 2,
            PackedIndices::U32(_) => 4,
        }
    }
}

/// VQC artifact container
#[derive(Debug, Clone, PartialEq)]
pub struct VqcFile {
    /// Layout and provenance
    pub metadata: VqcMetadata,
    /// Trained codebook
    pub codebook: Codebook,
    /// One codeword index per block, row-major over block origins
    pub assignment: Assignment,
}

impl VqcFile {
    /// Create an artifact, checking that its parts describe the same grid.
    pub fn new(metadata: VqcMetadata, codebook: Codebook, assignment: Assignment) -> Result<Self> {
        let file = Self {
            metadata,
            codebook,
            assignment,
        };
        file.validate()?;
        Ok(file)
    }

    /// Check cross-section consistency.
    pub fn validate(&self) -> Result<()> {
        let vectorizer = self.metadata.vectorizer();
        let layout = &self.metadata.layout;
        let expected_dim = vectorizer.vector_dim(layout.channels());
        if self.codebook.dim() != expected_dim {
            return Err(Error::format(format!(
                "codeword dimension {} does not match layout ({})",
                self.codebook.dim(),
                expected_dim
            )));
        }

        let blocks = vectorizer.block_count(layout);
        if self.assignment.len() != blocks {
            return Err(Error::format(format!(
                "{} indices for {} blocks",
                self.assignment.len(),
                blocks
            )));
        }

        if let Some(position) = self
            .assignment
            .iter()
            .position(|&i| i >= self.codebook.len())
        {
            return Err(Error::format(format!(
                "index {} at position {} exceeds codebook size {}",
                self.assignment.indices()[position],
                position,
                self.codebook.len()
            )));
        }

        Ok(())
    }

    /// Header describing this artifact for the given section sizes.
    fn header(&self, metadata_len: usize, codebook_len: usize, index_len: usize) -> Result<VqcHeader> {
        let too_large = |_| Error::invalid("codebook too large for the VQC header");
        let metadata_offset = VqcHeader::SIZE as u64;
        let codebook_offset = metadata_offset + metadata_len as u64;
        let index_offset = codebook_offset + codebook_len as u64;
        Ok(VqcHeader {
            magic: VQC_MAGIC,
            version: VQC_VERSION,
            codebook_size: u32::try_from(self.codebook.len()).map_err(too_large)?,
            vector_dim: u32::try_from(self.codebook.dim()).map_err(too_large)?,
            vector_count: self.assignment.len() as u64,
            metadata_offset,
            codebook_offset,
            index_offset,
            file_size: index_offset + index_len as u64,
        })
    }

    /// Write to a writer
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<()> {
        let encode = |e: bincode::Error| Error::invalid(format!("serialization failed: {}", e));
        let metadata_bytes = bincode::serialize(&self.metadata).map_err(encode)?;
        let codebook_bytes = bincode::serialize(&self.codebook).map_err(encode)?;
        let indices = PackedIndices::pack(&self.assignment, self.codebook.len())?;
        let index_bytes = bincode::serialize(&indices).map_err(encode)?;

        let header = self.header(metadata_bytes.len(), codebook_bytes.len(), index_bytes.len())?;

        writer.write_all(&header.to_bytes())?;
        writer.write_all(&metadata_bytes)?;
        writer.write_all(&codebook_bytes)?;
        writer.write_all(&index_bytes)?;
        writer.flush()?;

        debug!(
            k = self.codebook.len(),
            dim = self.codebook.dim(),
            vectors = self.assignment.len(),
            index_width = indices.index_width(),
            bytes = header.file_size,
            "wrote VQC artifact"
        );
        Ok(())
    }

    /// Read from a reader
    pub fn read_from<R: Read>(reader: &mut R) -> Result<Self> {
        let mut header_bytes = [0u8; VqcHeader::SIZE];
        reader.read_exact(&mut header_bytes)?;
        let header = VqcHeader::from_bytes(&header_bytes)?;

        let metadata_bytes = read_section(
            reader,
            header.codebook_offset - header.metadata_offset,
            "metadata",
        )?;
        let codebook_bytes = read_section(
            reader,
            header.index_offset - header.codebook_offset,
            "codebook",
        )?;
        let index_bytes = read_section(reader, header.file_size - header.index_offset, "index")?;

        let metadata: VqcMetadata = bincode::deserialize(&metadata_bytes)
            .map_err(|e| Error::format(format!("metadata section: {}", e)))?;
        let codebook: Codebook = bincode::deserialize(&codebook_bytes)
            .map_err(|e| Error::format(format!("codebook section: {}", e)))?;
        let indices: PackedIndices = bincode::deserialize(&index_bytes)
            .map_err(|e| Error::format(format!("index section: {}", e)))?;

        if codebook.len() as u64 != u64::from(header.codebook_size)
            || codebook.dim() as u64 != u64::from(header.vector_dim)
        {
            return Err(Error::format(format!(
                "header declares a {}x{} codebook, section holds {}x{}",
                header.codebook_size,
                header.vector_dim,
                codebook.len(),
                codebook.dim()
            )));
        }
        if indices.len() as u64 != header.vector_count {
            return Err(Error::format(format!(
                "header declares {} indices, section holds {}",
                header.vector_count,
                indices.len()
            )));
        }

        Self::new(metadata, codebook, indices.unpack())
    }

    /// Write to file path
    pub fn save(&self, path: &Path) -> Result<()> {
        let mut file = std::io::BufWriter::new(std::fs::File::create(path)?);
        self.write_to(&mut file)
    }

    /// Read from file path
    pub fn load(path: &Path) -> Result<Self> {
        let mut file = std::io::BufReader::new(std::fs::File::open(path)?);
        Self::read_from(&mut file)
    }

    /// Serialized size in bytes.
    pub fn encoded_size(&self) -> Result<u64> {
        let mut counter = ByteCounter(0);
        self.write_to(&mut counter)?;
        Ok(counter.0)
    }

    /// Size of the raw 8-bit grid divided by the artifact size.
    pub fn compression_ratio(&self) -> Result<f64> {
        let encoded = self.encoded_size()?;
        if encoded == 0 {
            return Ok(0.0);
        }
        Ok(self.metadata.layout.sample_count() as f64 / encoded as f64)
    }
}

/// Read exactly `len` bytes without trusting `len` for the allocation.
fn read_section<R: Read>(reader: &mut R, len: u64, name: &str) -> Result<Vec<u8>> {
    let mut bytes = Vec::new();
    reader.by_ref().take(len).read_to_end(&mut bytes)?;
    if bytes.len() as u64 != len {
        return Err(Error::format(format!(
            "truncated {} section: {} of {} bytes",
            name,
            bytes.len(),
            len
        )));
    }
    Ok(bytes)
}

struct ByteCounter(u64);

impl Write for ByteCounter {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0 += buf.len() as u64;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use codevec_core::Vector;
    use std::io::Cursor;

    fn sample_file() -> VqcFile {
        let layout = GridLayout::new(2, 3, 1).unwrap();
        let vectorizer = Vectorizer::new(BlockShape::SINGLE, BlockEncoding::Mean);
        let metadata = VqcMetadata::new(layout, &vectorizer, SampleRange::default());
        let codebook = Codebook::new(vec![Vector::from([10.0]), Vector::from([200.0])]).unwrap();
        let assignment = Assignment::new(vec![0, 0, 1, 1, 0, 1]);
        VqcFile::new(metadata, codebook, assignment).unwrap()
    }

    fn encode(file: &VqcFile) -> Vec<u8> {
        let mut buffer = Vec::new();
        file.write_to(&mut buffer).unwrap();
        buffer
    }

    #[test]
    fn test_header_serialization() {
        let buffer = encode(&sample_file());
        let header = VqcHeader::from_bytes(&buffer).unwrap();

        assert_eq!(header.magic, VQC_MAGIC);
        assert_eq!(header.version, VQC_VERSION);
        assert_eq!(header.codebook_size, 2);
        assert_eq!(header.vector_dim, 1);
        assert_eq!(header.vector_count, 6);
        assert_eq!(header.file_size, buffer.len() as u64);
    }

    #[test]
    fn test_vqc_file_roundtrip() {
        let file = sample_file();
        let restored = VqcFile::read_from(&mut Cursor::new(encode(&file))).unwrap();
        assert_eq!(restored, file);
        assert_eq!(restored.metadata.vectorizer().block(), BlockShape::SINGLE);
    }

    #[test]
    fn test_bad_magic() {
        let mut buffer = encode(&sample_file());
        buffer[0] = b'X';
        assert!(matches!(
            VqcFile::read_from(&mut Cursor::new(buffer)),
            Err(Error::FormatMismatch(_))
        ));
    }

    #[test]
    fn test_truncated_file() {
        let buffer = encode(&sample_file());
        let cut = buffer[..buffer.len() - 3].to_vec();
        assert!(matches!(
            VqcFile::read_from(&mut Cursor::new(cut)),
            Err(Error::FormatMismatch(_))
        ));

        let header_only = buffer[..10].to_vec();
        assert!(matches!(
            VqcFile::read_from(&mut Cursor::new(header_only)),
            Err(Error::Io(_))
        ));
    }

    #[test]
    fn test_header_count_mismatch() {
        let mut buffer = encode(&sample_file());
        // vector_count field
        buffer[14..22].copy_from_slice(&7u64.to_le_bytes());
        assert!(matches!(
            VqcFile::read_from(&mut Cursor::new(buffer)),
            Err(Error::FormatMismatch(_))
        ));
    }

    // Metadata section offsets: layout 54..78, block 78..94, encoding 94..98,
    // range 98..114.
    #[test]
    fn test_rejects_invalid_sample_range() {
        let mut inverted = encode(&sample_file());
        inverted[98..106].copy_from_slice(&255.0f64.to_le_bytes());
        inverted[106..114].copy_from_slice(&0.0f64.to_le_bytes());
        assert!(matches!(
            VqcFile::read_from(&mut Cursor::new(inverted)),
            Err(Error::FormatMismatch(_))
        ));

        let mut nan = encode(&sample_file());
        nan[98..106].copy_from_slice(&f64::NAN.to_le_bytes());
        assert!(matches!(
            VqcFile::read_from(&mut Cursor::new(nan)),
            Err(Error::FormatMismatch(_))
        ));
    }

    #[test]
    fn test_rejects_oversized_layout() {
        let mut buffer = encode(&sample_file());
        buffer[54..62].copy_from_slice(&(1u64 << 40).to_le_bytes());
        buffer[62..70].copy_from_slice(&(1u64 << 40).to_le_bytes());
        assert!(matches!(
            VqcFile::read_from(&mut Cursor::new(buffer)),
            Err(Error::FormatMismatch(_))
        ));

        let mut zero_block = encode(&sample_file());
        zero_block[78..86].copy_from_slice(&0u64.to_le_bytes());
        assert!(matches!(
            VqcFile::read_from(&mut Cursor::new(zero_block)),
            Err(Error::FormatMismatch(_))
        ));
    }

    #[test]
    fn test_new_rejects_inconsistent_parts() {
        let file = sample_file();

        let short = Assignment::new(vec![0, 1]);
        assert!(VqcFile::new(file.metadata.clone(), file.codebook.clone(), short).is_err());

        let out_of_range = Assignment::new(vec![0, 0, 1, 1, 0, 2]);
        assert!(VqcFile::new(file.metadata.clone(), file.codebook.clone(), out_of_range).is_err());

        let rgb = Codebook::new(vec![Vector::from([1.0, 2.0, 3.0])]).unwrap();
        assert!(VqcFile::new(file.metadata, rgb, Assignment::new(vec![0; 6])).is_err());
    }

    #[test]
    fn test_index_packing_width() {
        let a = Assignment::new(vec![0, 255]);
        assert_eq!(PackedIndices::pack(&a, 256).unwrap().index_width(), 1);
        assert_eq!(PackedIndices::pack(&a, 257).unwrap().index_width(), 2);
        assert_eq!(PackedIndices::pack(&a, 70_000).unwrap().index_width(), 4);
        assert!(PackedIndices::pack(&a, 200).is_err());

        let packed = PackedIndices::pack(&a, 300).unwrap();
        assert_eq!(packed.unpack(), a);
    }

    #[test]
    fn test_encoded_size_matches_buffer() {
        let file = sample_file();
        assert_eq!(file.encoded_size().unwrap(), encode(&file).len() as u64);
        assert!(file.compression_ratio().unwrap() > 0.0);
    }
}
