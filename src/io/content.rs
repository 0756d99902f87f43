//! Content comparison.
//!
//! Decides whether a detected path collision is benign (same bytes twice)
//! or a real conflict. Purely read-only; sources are opened read-only so a
//! read-only file compares the same as a writable one.

use std::io::{self, Read};

use crate::core::package::MemberSource;

/// Whether two member content sources are byte-identical.
///
/// Lengths are compared first as a cheap rejection; contents are then read
/// in 64 KiB chunks.
pub fn content_equals(a: &MemberSource, b: &MemberSource) -> io::Result<bool> {
    if a.len()? != b.len()? {
        return Ok(false);
    }

    let mut reader_a = a.open()?;
    let mut reader_b = b.open()?;
    let mut buf_a = vec![0u8; 65536];
    let mut buf_b = vec![0u8; 65536];

    loop {
        let n_a = fill(&mut reader_a, &mut buf_a)?;
        let n_b = fill(&mut reader_b, &mut buf_b)?;
        if n_a != n_b || buf_a[..n_a] != buf_b[..n_b] {
            return Ok(false);
        }
        if n_a == 0 {
            return Ok(true);
        }
    }
}

/// Read until the buffer is full or the reader is exhausted.
fn fill(reader: &mut impl Read, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        let n = reader.read(&mut buf[filled..])?;
        if n == 0 {
            break;
        }
        filled += n;
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_identical_bytes() {
        let a = MemberSource::Bytes(b"same content".to_vec());
        let b = MemberSource::Bytes(b"same content".to_vec());
        assert!(content_equals(&a, &b).unwrap());
    }

    #[test]
    fn test_length_mismatch_short_circuits() {
        let a = MemberSource::Bytes(b"short".to_vec());
        let b = MemberSource::Bytes(b"much longer content".to_vec());
        assert!(!content_equals(&a, &b).unwrap());
    }

    #[test]
    fn test_same_length_different_bytes() {
        let a = MemberSource::Bytes(b"abcdef".to_vec());
        let b = MemberSource::Bytes(b"abcdeX".to_vec());
        assert!(!content_equals(&a, &b).unwrap());
    }

    #[test]
    fn test_file_against_bytes() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("data.bin");
        std::fs::write(&path, b"on disk").unwrap();

        let file = MemberSource::File(path);
        let bytes = MemberSource::Bytes(b"on disk".to_vec());
        assert!(content_equals(&file, &bytes).unwrap());
    }

    #[test]
    fn test_read_only_file_compares_like_writable() {
        let dir = tempdir().unwrap();
        let writable = dir.path().join("a.bin");
        let readonly = dir.path().join("b.bin");
        std::fs::write(&writable, b"payload").unwrap();
        std::fs::write(&readonly, b"payload").unwrap();

        let mut perms = std::fs::metadata(&readonly).unwrap().permissions();
        perms.set_readonly(true);
        std::fs::set_permissions(&readonly, perms).unwrap();

        let a = MemberSource::File(writable);
        let b = MemberSource::File(readonly.clone());
        assert!(content_equals(&a, &b).unwrap());

        // Restore so the temp dir can be cleaned up on all platforms
        let mut perms = std::fs::metadata(&readonly).unwrap().permissions();
        #[allow(clippy::permissions_set_readonly_false)]
        perms.set_readonly(false);
        std::fs::set_permissions(&readonly, perms).unwrap();
    }

    #[test]
    fn test_missing_file_surfaces_io_error() {
        let a = MemberSource::File(std::path::PathBuf::from("/nonexistent/file"));
        let b = MemberSource::Bytes(vec![]);
        assert!(content_equals(&a, &b).is_err());
    }

    #[test]
    fn test_large_content_spanning_chunks() {
        let big: Vec<u8> = (0..200_000u32).map(|i| (i % 251) as u8).collect();
        let mut tweaked = big.clone();
        let last = tweaked.len() - 1;
        tweaked[last] ^= 0xFF;

        let a = MemberSource::Bytes(big.clone());
        let b = MemberSource::Bytes(big);
        let c = MemberSource::Bytes(tweaked);
        assert!(content_equals(&a, &b).unwrap());
        assert!(!content_equals(&a, &c).unwrap());
    }
}
