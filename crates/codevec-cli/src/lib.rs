//! Codevec command-line front end
//!
//! Compresses binary Netpbm images into VQC artifacts and decodes them back.
//!
//! ## Usage
//!
//! ```bash
//! # 32 codewords over 2x2 block means (the defaults)
//! codevec compress photo.ppm photo.vqc
//!
//! # Full-block vectors, reproducible training, with a preview image
//! codevec compress photo.ppm photo.vqc -k 64 --block 4x4 --encoding samples \
//!     --seed 7 --preview preview.ppm
//!
//! # Decode and inspect
//! codevec decompress photo.vqc restored.ppm
//! codevec inspect photo.vqc
//! ```

pub mod config;

pub use config::{load_session_config, ConfigError, ConfigResult, SessionOverrides};
