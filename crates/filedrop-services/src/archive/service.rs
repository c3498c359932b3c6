use std::fs::File;
use std::io::{self, Seek, SeekFrom};

use anyhow::{Context, Result};
use tokio_util::io::ReaderStream;
use zip::write::{FileOptions, ZipWriter};
use zip::CompressionMethod;

use filedrop_storage::{FileEntry, LocalStorage};

/// Finished archive, ready to stream
pub struct ArchiveStream {
    pub entries: usize,
    pub size_bytes: u64,
    pub stream: ReaderStream<tokio::fs::File>,
}

/// Builds a ZIP of everything currently in storage
///
/// The archive is assembled on the blocking pool into an anonymous temporary
/// file, which is then streamed back; neither the inputs nor the archive are held
/// in memory.
#[derive(Clone)]
pub struct ArchiveService {
    storage: LocalStorage,
}

impl ArchiveService {
    pub fn new(storage: LocalStorage) -> Self {
        Self { storage }
    }

    #[tracing::instrument(skip(self), fields(operation = "build_archive"))]
    pub async fn build(&self) -> Result<ArchiveStream> {
        let start = std::time::Instant::now();
        let storage = self.storage.clone();

        let (file, entries) = tokio::task::spawn_blocking(move || -> Result<(File, usize)> {
            let files = storage
                .regular_files_blocking()
                .context("Failed to list storage contents")?;
            write_zip(&files)
        })
        .await
        .context("Archive task failed")??;

        let size_bytes = file
            .metadata()
            .map(|m| m.len())
            .context("Failed to stat archive")?;

        tracing::info!(
            entries = entries,
            size_bytes = size_bytes,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Archive built"
        );

        Ok(ArchiveStream {
            entries,
            size_bytes,
            stream: ReaderStream::new(tokio::fs::File::from_std(file)),
        })
    }
}

/// Write `files` into a deflated ZIP inside a temp file, rewound to the start.
fn write_zip(files: &[FileEntry]) -> Result<(File, usize)> {
    let spool = tempfile::tempfile().context("Failed to create archive spool file")?;
    let mut zip = ZipWriter::new(spool);
    let base_options = FileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o644);

    let mut written = 0;
    for entry in files {
        let mut source = match File::open(&entry.path) {
            Ok(f) => f,
            // Deleted between listing and now.
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                tracing::debug!(name = %entry.name, "Skipping file removed during archiving");
                continue;
            }
            Err(e) => {
                return Err(e).with_context(|| format!("Failed to open {}", entry.path.display()))
            }
        };

        let options = base_options.large_file(entry.size_bytes >= u64::from(u32::MAX));
        zip.start_file(entry.name.as_str(), options)
            .with_context(|| format!("Failed to add file to ZIP: {}", entry.name))?;
        io::copy(&mut source, &mut zip)
            .with_context(|| format!("Failed to write file data to ZIP: {}", entry.name))?;
        written += 1;
    }

    let mut spool = zip.finish().context("Failed to finalize ZIP archive")?;
    spool
        .seek(SeekFrom::Start(0))
        .context("Failed to rewind archive")?;
    Ok((spool, written))
}
