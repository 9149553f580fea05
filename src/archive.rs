//! Archive and compression handling for ingestion inputs.
//!
//! Source files arrive as bare XML/TSV, gzip- or xz-compressed single
//! files, or tar archives of either. Detection is by extension; decoding
//! itself runs on a blocking thread the way the teacher's `decompress_gz`
//! did, since `flate2`/`xz2`/`tar` are synchronous readers.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::ffi::OsStr;
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Read, Write};
use std::path::{Path, PathBuf};
use xz2::read::XzDecoder;

/// How an ingestion input file is packaged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveKind {
    Plain,
    Gzip,
    Xz,
    TarGzip,
    TarXz,
    Tar,
}

/// Sniffs the packaging of `path` from its extension chain.
pub fn detect_kind(path: &Path) -> ArchiveKind {
    let lower = path.to_string_lossy().to_lowercase();
    if lower.ends_with(".tar.gz") || lower.ends_with(".tgz") {
        ArchiveKind::TarGzip
    } else if lower.ends_with(".tar.xz") || lower.ends_with(".txz") {
        ArchiveKind::TarXz
    } else if lower.ends_with(".tar") {
        ArchiveKind::Tar
    } else if path.extension() == Some(OsStr::new("gz")) {
        ArchiveKind::Gzip
    } else if path.extension() == Some(OsStr::new("xz")) {
        ArchiveKind::Xz
    } else {
        ArchiveKind::Plain
    }
}

/// Produces a plain, readable file for `path`, decompressing/extracting
/// into `work_dir` as needed. Returns the path to the usable plain file.
///
/// For tar archives, the *first* regular file entry is extracted; WN-LMF
/// and CILI distributions are single-document archives, so ambiguity here
/// would indicate a malformed input rather than a case to disambiguate.
pub async fn materialize_plain_file(path: &Path, work_dir: &Path) -> Result<PathBuf> {
    let kind = detect_kind(path);
    if kind == ArchiveKind::Plain {
        return Ok(path.to_path_buf());
    }

    std::fs::create_dir_all(work_dir)?;
    let path = path.to_path_buf();
    let work_dir = work_dir.to_path_buf();

    tokio::task::spawn_blocking(move || match kind {
        ArchiveKind::Plain => unreachable!(),
        ArchiveKind::Gzip => {
            let dest = work_dir.join(strip_one_suffix(&path, ".gz"));
            decompress_gz(&path, &dest)?;
            Ok(dest)
        }
        ArchiveKind::Xz => {
            let dest = work_dir.join(strip_one_suffix(&path, ".xz"));
            decompress_xz(&path, &dest)?;
            Ok(dest)
        }
        ArchiveKind::Tar => extract_first_tar_entry(File::open(&path)?, &work_dir),
        ArchiveKind::TarGzip => {
            let file = File::open(&path)?;
            extract_first_tar_entry(GzDecoder::new(BufReader::new(file)), &work_dir)
        }
        ArchiveKind::TarXz => {
            let file = File::open(&path)?;
            extract_first_tar_entry(XzDecoder::new(BufReader::new(file)), &work_dir)
        }
    })
    .await?
}

fn strip_one_suffix(path: &Path, suffix: &str) -> String {
    let name = path.file_name().unwrap_or_default().to_string_lossy();
    name.strip_suffix(suffix).unwrap_or(&name).to_string()
}

fn decompress_gz(src: &Path, dest: &Path) -> Result<()> {
    let mut decoder = GzDecoder::new(BufReader::new(File::open(src)?));
    let mut out = BufWriter::new(File::create(dest)?);
    io::copy(&mut decoder, &mut out)?;
    out.flush()?;
    Ok(())
}

fn decompress_xz(src: &Path, dest: &Path) -> Result<()> {
    let mut decoder = XzDecoder::new(BufReader::new(File::open(src)?));
    let mut out = BufWriter::new(File::create(dest)?);
    io::copy(&mut decoder, &mut out)?;
    out.flush()?;
    Ok(())
}

fn extract_first_tar_entry<R: Read>(reader: R, work_dir: &Path) -> Result<PathBuf> {
    let mut archive = tar::Archive::new(reader);
    for entry in archive.entries()? {
        let mut entry = entry?;
        if !entry.header().entry_type().is_file() {
            continue;
        }
        let name = entry
            .path()?
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| "extracted".to_string());
        let dest = work_dir.join(name);
        let mut out = BufWriter::new(File::create(&dest)?);
        io::copy(&mut entry, &mut out)?;
        out.flush()?;
        return Ok(dest);
    }
    Err(Error::Archive("archive contains no regular file entries".into()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_kinds_from_extension() {
        assert_eq!(detect_kind(Path::new("wn.xml")), ArchiveKind::Plain);
        assert_eq!(detect_kind(Path::new("wn.xml.gz")), ArchiveKind::Gzip);
        assert_eq!(detect_kind(Path::new("wn.xml.xz")), ArchiveKind::Xz);
        assert_eq!(detect_kind(Path::new("wn.tar.gz")), ArchiveKind::TarGzip);
        assert_eq!(detect_kind(Path::new("wn.tar.xz")), ArchiveKind::TarXz);
        assert_eq!(detect_kind(Path::new("wn.tar")), ArchiveKind::Tar);
    }

    #[tokio::test]
    async fn plain_file_passes_through_unchanged() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("wn.xml");
        std::fs::write(&src, "<LexicalResource/>").unwrap();
        let result = materialize_plain_file(&src, dir.path()).await.unwrap();
        assert_eq!(result, src);
    }

    #[tokio::test]
    async fn gzip_file_is_decompressed() {
        use flate2::Compression;
        use flate2::write::GzEncoder;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("wn.xml.gz");
        let content = b"<LexicalResource/>";
        let mut encoder = GzEncoder::new(File::create(&src).unwrap(), Compression::default());
        encoder.write_all(content).unwrap();
        encoder.finish().unwrap();

        let work = dir.path().join("work");
        let result = materialize_plain_file(&src, &work).await.unwrap();
        assert_eq!(std::fs::read(result).unwrap(), content);
    }
}
