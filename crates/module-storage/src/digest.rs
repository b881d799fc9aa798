//! Package content digests.

use std::fs;
use std::io;
use std::path::Path;

/// Computes the lowercase hex MD5 digest of a file's content.
pub(crate) fn file_md5(path: &Path) -> io::Result<String> {
    let bytes = fs::read(path)?;
    Ok(format!("{:x}", md5::compute(bytes)))
}
