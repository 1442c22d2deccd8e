use std::fs::File;
use std::io::{self, BufRead, BufReader, ErrorKind, Seek, SeekFrom};
use std::path::{Path, PathBuf};

use log::{debug, info, warn};

/// Incremental reader over a single growing log file.
///
/// The cursor is a byte offset advanced only past fully terminated lines, so
/// a line is never returned twice and a completed line is never dropped. The
/// file is re-opened on every poll; a rotation that replaces the file is
/// detected by the length falling below the cursor.
pub struct LogTailer {
    path: PathBuf,
    position: u64,
}

impl LogTailer {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            position: 0,
        }
    }

    /// Read all lines appended since the previous successful poll.
    ///
    /// A missing or unreadable file is not an error: the poll returns empty
    /// and the next scheduled poll retries. An unterminated trailing line is
    /// left in place until a later poll sees its newline.
    pub fn poll(&mut self) -> io::Result<Vec<String>> {
        let file = match File::open(&self.path) {
            Ok(file) => file,
            Err(err) if matches!(err.kind(), ErrorKind::NotFound | ErrorKind::PermissionDenied) => {
                debug!("source {:?} unavailable ({}), retrying next poll", self.path, err);
                return Ok(Vec::new());
            }
            Err(err) => return Err(err),
        };

        let len = file.metadata()?.len();
        if len < self.position {
            info!(
                "source {:?} shrank from {} to {} bytes, rereading from the top",
                self.path, self.position, len
            );
            self.position = 0;
        }

        let mut reader = BufReader::new(file);
        reader.seek(SeekFrom::Start(self.position))?;

        // Lines are read as raw bytes and converted lossily: a sensor that
        // emits garbage bytes produces one garbled line for the parser to
        // reject, it never stalls the cursor.
        let mut lines = Vec::new();
        let mut buffer = Vec::new();
        loop {
            buffer.clear();
            let bytes_read = match reader.read_until(b'\n', &mut buffer) {
                Ok(n) => n,
                Err(err) => {
                    // Keep what was completed; the cursor already points
                    // past it, so the next poll resumes at the failure.
                    warn!("read error on {:?}: {}", self.path, err);
                    break;
                }
            };
            if bytes_read == 0 {
                break;
            }
            if buffer.last() != Some(&b'\n') {
                // Writer is mid-line; pick it up once terminated.
                break;
            }
            self.position += bytes_read as u64;
            let line = String::from_utf8_lossy(&buffer);
            lines.push(line.trim_end_matches(&['\r', '\n'][..]).to_string());
        }

        Ok(lines)
    }

    #[allow(dead_code)]
    pub fn path(&self) -> &Path {
        &self.path
    }
}
