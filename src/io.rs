use crate::codec::LineDecoder;
use crate::{ConvertResult, Csv2SqlError};
use async_compression::tokio::bufread::{GzipDecoder, ZstdDecoder};
use std::path::{Path, PathBuf};
use tokio::fs::{File, OpenOptions};
use tokio::io::{AsyncRead, BufReader};
use tokio_util::codec::FramedRead;

/// Line stream over a (possibly compressed) source file, already decoded to UTF-8.
pub type SourceLines = FramedRead<Box<dyn AsyncRead + Unpin + Send>, LineDecoder>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Gzip,
    Zstd,
}

impl Compression {
    /// Guess from the file extension only.
    pub fn from_path(path: &Path) -> Self {
        let ext = path
            .extension()
            .and_then(|s| s.to_str())
            .unwrap_or_default()
            .to_ascii_lowercase();
        match ext.as_str() {
            "gz" | "gzip" => Compression::Gzip,
            "zst" | "zstd" => Compression::Zstd,
            _ => Compression::None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct SourceMeta {
    /// just the file name (used for messages and destination naming)
    pub name: String,
    pub compression: Compression,
    /// Which character encoding to expect (defaults to UTF-8)
    pub charset: &'static encoding_rs::Encoding,
}

impl SourceMeta {
    pub fn from_path(path: &Path, charset: &'static encoding_rs::Encoding) -> Self {
        let name = path
            .file_name()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self {
            name,
            compression: Compression::from_path(path),
            charset,
        }
    }
}

/// Open a local source file as a stream of decoded lines.
pub async fn open_source(path: &Path, meta: &SourceMeta) -> ConvertResult<SourceLines> {
    let file = File::open(path).await?;

    // Use a larger buffer for fewer syscalls (1 MiB)
    let buf = BufReader::with_capacity(1 << 20, file);
    let reader: Box<dyn AsyncRead + Unpin + Send> = match meta.compression {
        Compression::Gzip => Box::new(GzipDecoder::new(buf)),
        Compression::Zstd => Box::new(ZstdDecoder::new(buf)),
        Compression::None => Box::new(buf),
    };

    Ok(FramedRead::new(reader, LineDecoder::new(meta.charset)))
}

/// `<dir>/<name>.sql`: a compression suffix is dropped, then a trailing
/// `.csv` (any case) is replaced, otherwise `.sql` is appended.
pub fn destination_path(source: &Path, destination_dir: &Path) -> PathBuf {
    let mut name = source
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();

    if Compression::from_path(source) != Compression::None {
        if let Some(dot) = name.rfind('.') {
            name.truncate(dot);
        }
    }
    if name.len() >= 4 && name.is_char_boundary(name.len() - 4) {
        let stem_len = name.len() - 4;
        if name[stem_len..].eq_ignore_ascii_case(".csv") {
            name.truncate(stem_len);
        }
    }
    name.push_str(".sql");
    destination_dir.join(name)
}

/// Create the destination, refusing to touch anything already at `path`.
pub(crate) async fn create_destination(path: &Path) -> ConvertResult<File> {
    if tokio::fs::try_exists(path).await? {
        return Err(Csv2SqlError::DestinationExists(path.to_path_buf()));
    }
    OpenOptions::new()
        .write(true)
        .create_new(true)
        .open(path)
        .await
        .map_err(|e| match e.kind() {
            std::io::ErrorKind::AlreadyExists => Csv2SqlError::DestinationExists(path.to_path_buf()),
            _ => Csv2SqlError::Io(e),
        })
}
