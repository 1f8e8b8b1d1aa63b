use std::{
    fs::{File, OpenOptions},
    io::{self, BufWriter, Write},
    path::Path,
};

use crate::error::{AppError, AppResult};

/// Where one statement's rendered rows go: the caller's writer, or the
/// export file opened in append mode. The file is flushed and closed when
/// the target is dropped, also on the error path.
pub enum OutputTarget<'a> {
    Inherit(&'a mut dyn Write),
    File(BufWriter<File>),
}

impl<'a> OutputTarget<'a> {
    pub fn open(export_path: Option<&Path>, fallback: &'a mut dyn Write) -> AppResult<Self> {
        match export_path {
            None => Ok(OutputTarget::Inherit(fallback)),
            Some(p) => Ok(OutputTarget::File(BufWriter::new(open_append(p)?))),
        }
    }
}

/// Opens `path` for appending, creating it when missing.
pub fn open_append(path: &Path) -> AppResult<File> {
    OpenOptions::new()
        .create(true)
        .append(true)
        .open(path)
        .map_err(|source| AppError::ExportPath {
            path: path.to_path_buf(),
            source,
        })
}

impl Write for OutputTarget<'_> {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            OutputTarget::Inherit(w) => w.write(buf),
            OutputTarget::File(f) => f.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            OutputTarget::Inherit(w) => w.flush(),
            OutputTarget::File(f) => f.flush(),
        }
    }
}

impl Drop for OutputTarget<'_> {
    fn drop(&mut self) {
        if let Err(e) = self.flush() {
            tracing::warn!(error=%e, "failed to flush output");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn export_file_is_appended_across_targets() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.json");
        let mut stdout_stand_in = Vec::new();
        for chunk in ["a\n", "b\n"] {
            let mut t = OutputTarget::open(Some(path.as_path()), &mut stdout_stand_in).unwrap();
            t.write_all(chunk.as_bytes()).unwrap();
        }
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "a\nb\n");
        assert!(stdout_stand_in.is_empty());
    }

    #[test]
    fn unwritable_export_path_is_reported() {
        let dir = tempfile::tempdir().unwrap();
        let err = open_append(&dir.path().join("missing").join("out.json")).unwrap_err();
        assert_eq!(err.code(), "EXPORT_PATH");
    }
}
