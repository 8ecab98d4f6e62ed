//! Binary Netpbm (PGM `P5` / PPM `P6`) reading and writing.
//!
//! Only 8-bit rasters (maxval ≤ 255) are supported. Samples are loaded
//! as-is; the maxval is not rescaled.

use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Read, Write};
use std::path::Path;

use codevec_core::{Error, Result};
use tracing::debug;

use crate::vectorize::{Grid, GridLayout};

/// Read a binary PGM or PPM image.
pub fn read_pnm<R: BufRead>(reader: &mut R) -> Result<Grid> {
    let magic = next_token(reader)?;
    let channels = match magic.as_str() {
        "P5" => 1,
        "P6" => 3,
        other => {
            return Err(Error::format(format!(
                "unsupported Netpbm magic '{}', expected P5 or P6",
                other
            )))
        }
    };

    let width = parse_field(reader, "width")?;
    let height = parse_field(reader, "height")?;
    let maxval = parse_field(reader, "maxval")?;
    if maxval == 0 || maxval > 255 {
        return Err(Error::format(format!(
            "maxval {} unsupported, only 8-bit images are read",
            maxval
        )));
    }

    let layout = GridLayout::new(height, width, channels)
        .map_err(|e| Error::format(format!("invalid image dimensions: {}", e)))?;

    // Allocate only what the stream delivers.
    let len = layout.sample_count();
    let mut raster = Vec::new();
    reader.by_ref().take(len as u64).read_to_end(&mut raster)?;
    if raster.len() != len {
        return Err(Error::format(format!(
            "truncated raster: {} of {} bytes",
            raster.len(),
            len
        )));
    }
    debug!(width, height, channels, "read Netpbm image");

    Grid::with_layout(layout, raster.iter().map(|&s| f64::from(s)).collect())
}

/// Write a grid as binary PGM (1 channel) or PPM (3 channels).
pub fn write_pnm<W: Write>(writer: &mut W, grid: &Grid) -> Result<()> {
    let magic = match grid.channels() {
        1 => "P5",
        3 => "P6",
        n => {
            return Err(Error::format(format!(
                "Netpbm stores 1 or 3 channels, grid has {}",
                n
            )))
        }
    };

    write!(writer, "{}\n{} {}\n255\n", magic, grid.width(), grid.height())?;
    writer.write_all(&grid.to_u8())?;
    writer.flush()?;
    Ok(())
}

/// Load an image from a file path.
pub fn load(path: &Path) -> Result<Grid> {
    let mut reader = BufReader::new(File::open(path)?);
    read_pnm(&mut reader)
}

/// Save an image to a file path.
pub fn save(path: &Path, grid: &Grid) -> Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    write_pnm(&mut writer, grid)
}

fn parse_field<R: BufRead>(reader: &mut R, name: &str) -> Result<usize> {
    let token = next_token(reader)?;
    token
        .parse()
        .map_err(|_| Error::format(format!("invalid Netpbm {} '{}'", name, token)))
}

/// Next whitespace-delimited header token, skipping `#` comments.
///
/// Consumes exactly one whitespace byte after the token, which is where the
/// raster starts after maxval.
fn next_token<R: BufRead>(reader: &mut R) -> Result<String> {
    let mut token = Vec::new();
    let mut byte = [0u8; 1];

    loop {
        if reader.read(&mut byte)? == 0 {
            if token.is_empty() {
                return Err(Error::format("truncated Netpbm header"));
            }
            break;
        }
        match byte[0] {
            b'#' if token.is_empty() => {
                let mut comment = Vec::new();
                reader.read_until(b'\n', &mut comment)?;
            }
            b if b.is_ascii_whitespace() => {
                if !token.is_empty() {
                    break;
                }
            }
            b => token.push(b),
        }
    }

    String::from_utf8(token).map_err(|_| Error::format("non-ASCII Netpbm header"))
}
