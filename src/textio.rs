//! Generic text-file opening.
//!
//! Call sets arrive either plain or gzip-compressed; the opener picks
//! the decoder by extension and hands back one buffered line reader.

use std::fs::File;
use std::io::{BufRead, BufReader, Read};
use std::path::Path;

use flate2::read::MultiGzDecoder;

use crate::vcf::VcfError;

/// Buffer size for input readers (256KB).
const READ_BUFFER_SIZE: usize = 256 * 1024;

/// Open a text file for line reading, transparently decompressing
/// `.gz` inputs.
pub fn open_textfile<P: AsRef<Path>>(path: P) -> Result<Box<dyn BufRead>, VcfError> {
    let path = path.as_ref();
    let file = File::open(path)?;

    let reader: Box<dyn Read> = if path.extension().is_some_and(|ext| ext == "gz") {
        Box::new(MultiGzDecoder::new(file))
    } else {
        Box::new(file)
    };

    Ok(Box::new(BufReader::with_capacity(READ_BUFFER_SIZE, reader)))
}
