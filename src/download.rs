use indicatif::{ProgressBar, ProgressStyle};
use std::fs::File;
use std::io::{ErrorKind, Read, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

use crate::auth::BearerToken;
use crate::catalog::ProductDownloadInfo;
use crate::client::Client;
use crate::error::{Error, Result, format_api_error};
use crate::report::Reporter;
use crate::transport::Transport;
use crate::util::partial_path;

pub const DEFAULT_CHUNK_SIZE: usize = 4096;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DownloadOutcome {
    /// A file with the product's resource id was already present.
    Skipped(PathBuf),
    Downloaded { path: PathBuf, bytes: u64 },
}

impl<T: Transport> Client<T> {
    /// Streams a product archive to `dir/<resource_id>`.
    ///
    /// An existing file of that name counts as downloaded and no request is made. The body
    /// goes to `<resource_id>.partial` first and is renamed once complete; on error the
    /// partial file is removed.
    pub fn download(
        &self,
        token: &BearerToken,
        info: &ProductDownloadInfo,
        dir: &Path,
        reporter: &mut dyn Reporter,
    ) -> Result<DownloadOutcome> {
        let target = dir.join(&info.resource_id);
        if target.exists() {
            reporter.message(&format!(
                "File {} already exists, skipping download.",
                target.display()
            ));
            return Ok(DownloadOutcome::Skipped(target));
        }

        std::fs::create_dir_all(dir)?;
        reporter.message(&format!("Started downloading {}", info.resource_id));

        let partial = partial_path(&target);
        let finished = self
            .stream_to(token, info, &partial)
            .and_then(|bytes| {
                std::fs::rename(&partial, &target)?;
                Ok(bytes)
            });
        let bytes = match finished {
            Ok(bytes) => bytes,
            Err(e) => {
                remove_partial(&partial);
                return Err(e);
            }
        };

        info!(resource_id = %info.resource_id, bytes, "download complete");
        reporter.message(&format!("Finished downloading {}", info.resource_id));
        Ok(DownloadOutcome::Downloaded {
            path: target,
            bytes,
        })
    }

    fn stream_to(
        &self,
        token: &BearerToken,
        info: &ProductDownloadInfo,
        out_path: &Path,
    ) -> Result<u64> {
        let transfer_error = |detail: String| Error::Transfer {
            resource_id: info.resource_id.clone(),
            detail,
        };

        let mut stream = self
            .transport
            .open_stream(&info.href, token.as_header())
            .map_err(|e| transfer_error(e.to_string()))?;
        if !stream.status.is_success() {
            let mut body = String::new();
            stream.body.read_to_string(&mut body).ok();
            return Err(transfer_error(format_api_error(
                stream.status,
                &info.href,
                &body,
            )));
        }
        debug!(href = %info.href, length = ?stream.content_length, "download stream opened");

        let pb = if self.progress {
            let pb = match stream.content_length {
                Some(len) => ProgressBar::new(len),
                None => ProgressBar::new_spinner(),
            };
            if let Ok(style) = ProgressStyle::with_template(
                "{spinner:.green} {bytes}/{total_bytes} ({bytes_per_sec}) {wide_bar} {eta}",
            ) {
                pb.set_style(style.progress_chars("=>-"));
            }
            Some(pb)
        } else {
            None
        };

        let mut out = File::create(out_path)?;
        let mut buf = vec![0u8; self.chunk_size];
        let mut written: u64 = 0;
        loop {
            let n = match stream.body.read(&mut buf) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) => return Err(transfer_error(format!("download interrupted: {}", e))),
            };
            out.write_all(&buf[..n])?;
            written += n as u64;
            if let Some(pb) = &pb {
                pb.inc(n as u64);
            }
        }
        out.flush()?;

        if let Some(pb) = &pb {
            pb.finish_and_clear();
        }
        Ok(written)
    }
}

fn remove_partial(partial: &Path) {
    if let Err(e) = std::fs::remove_file(partial) {
        if e.kind() != ErrorKind::NotFound {
            warn!(path = %partial.display(), "could not remove partial download: {}", e);
        }
    }
}
