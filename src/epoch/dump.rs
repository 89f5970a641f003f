// src/epoch/dump.rs
//! On-disk cache/dataset dumps
//!
//! A dump is two little-endian magic words followed by the data words, also
//! little-endian, so files move between hosts unchanged. File names carry the
//! algorithm revision and the first eight bytes of the epoch seed.

use crate::types::H256;
use crate::utils::error::FrkhashError;
use std::fs;
use std::io::{BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

/// Marker at the start of every dump
pub const DUMP_MAGIC: [u32; 2] = [0xbaddcafe, 0xfee1dead];

/// Bumped whenever the generation algorithm changes incompatibly
pub const ALGORITHM_REVISION: u32 = 23;

/// Path of the dump for a seed
///
/// # Arguments
/// * `dir` - Dump directory
/// * `kind` - `"cache"` or `"full"`
/// * `seed` - Epoch seed hash
pub fn dump_path(dir: &Path, kind: &str, seed: &H256) -> PathBuf {
    dir.join(format!(
        "{}-R{}-{}",
        kind,
        ALGORITHM_REVISION,
        hex::encode(&seed[..8])
    ))
}

/// Bytes decoded per read while loading a dump
const READ_CHUNK: usize = 1 << 16;

/// Loads a dump, checking the magic and the expected word count
///
/// The payload is decoded chunk by chunk straight into the result, so peak
/// memory stays at one copy of the data.
///
/// # Returns
/// * `Err(FrkhashError::InvalidDumpMagic)` - if the marker is missing or wrong
/// * `Err(FrkhashError::InputError)` - if the payload has the wrong length
/// * `Err(FrkhashError::IoError)` - if the file can't be read
pub fn load(path: &Path, expected_words: usize) -> Result<Vec<u32>, FrkhashError> {
    let file = fs::File::open(path)?;
    let len = file.metadata()?.len();
    if len < 8 {
        return Err(FrkhashError::InvalidDumpMagic);
    }
    let mut input = BufReader::new(file);

    let mut head = [0u8; 8];
    input.read_exact(&mut head)?;
    for (word, magic) in head.chunks_exact(4).zip(DUMP_MAGIC) {
        if u32::from_le_bytes([word[0], word[1], word[2], word[3]]) != magic {
            return Err(FrkhashError::InvalidDumpMagic);
        }
    }

    let body = len - 8;
    let expected = expected_words as u64 * 4;
    if body != expected {
        return Err(FrkhashError::InputError(format!(
            "dump {} holds {} bytes, expected {}",
            path.display(),
            body,
            expected
        )));
    }

    let mut words = Vec::with_capacity(expected_words);
    let mut chunk = vec![0u8; READ_CHUNK];
    while words.len() < expected_words {
        let take = ((expected_words - words.len()) * 4).min(READ_CHUNK);
        input.read_exact(&mut chunk[..take])?;
        words.extend(
            chunk[..take]
                .chunks_exact(4)
                .map(|c| u32::from_le_bytes([c[0], c[1], c[2], c[3]])),
        );
    }
    Ok(words)
}

/// Writes a dump through a temporary file so readers never see a partial one
pub fn store(path: &Path, words: &[u32]) -> Result<(), FrkhashError> {
    if let Some(dir) = path.parent() {
        fs::create_dir_all(dir)?;
    }
    let tmp = path.with_extension("tmp");
    {
        let mut out = BufWriter::new(fs::File::create(&tmp)?);
        for magic in DUMP_MAGIC {
            out.write_all(&magic.to_le_bytes())?;
        }
        for word in words {
            out.write_all(&word.to_le_bytes())?;
        }
        out.flush()?;
    }
    fs::rename(&tmp, path)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dump_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dump_path(dir.path(), "cache", &[0xab; 32]);
        assert!(path.ends_with("cache-R23-abababababababab"));

        let words = vec![1, 0xdeadbeef, 3];
        store(&path, &words).unwrap();
        assert_eq!(load(&path, 3).unwrap(), words);

        let raw = fs::read(&path).unwrap();
        assert_eq!(raw[..8], [0xfe, 0xca, 0xdd, 0xba, 0xad, 0xde, 0xe1, 0xfe]);
    }

    #[test]
    fn multi_chunk_dump_loads_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let path = dump_path(dir.path(), "full", &[1; 32]);
        let words: Vec<u32> = (0..(READ_CHUNK as u32 / 4) * 3 + 5)
            .map(|i| i.wrapping_mul(0x9e37_79b9))
            .collect();
        store(&path, &words).unwrap();
        assert_eq!(load(&path, words.len()).unwrap(), words);
    }

    #[test]
    fn wrong_magic_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache-R23-0000000000000000");
        fs::write(&path, [0u8; 16]).unwrap();
        assert_eq!(load(&path, 2).unwrap_err(), FrkhashError::InvalidDumpMagic);

        fs::write(&path, [0xfe, 0xca]).unwrap();
        assert_eq!(load(&path, 0).unwrap_err(), FrkhashError::InvalidDumpMagic);
    }

    #[test]
    fn truncated_payload_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("full");
        store(&path, &[1, 2, 3]).unwrap();
        assert!(matches!(load(&path, 4), Err(FrkhashError::InputError(_))));
    }

    #[test]
    fn missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load(&dir.path().join("absent"), 1),
            Err(FrkhashError::IoError(_))
        ));
    }
}
