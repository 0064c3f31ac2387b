use eyre::{Context, Result, eyre};
use std::fs::{self, File, Metadata};
use std::io::{self, ErrorKind};
use std::path::Path;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TransferOutcome {
    /// Destination was created as a hard link to the source.
    Linked,
    /// Destination was written byte-for-byte and synced.
    Copied,
    /// Destination already is the source file.
    Unchanged,
}

/// Put `src` at `dst`, linking when possible and copying otherwise.
///
/// Running it again for the same pair is a no-op once `dst` shares the
/// source's identity. An existing, different regular file at `dst` is
/// overwritten.
pub fn transfer_file(src: &Path, dst: &Path) -> Result<TransferOutcome> {
    let src_meta = fs::metadata(src)
        .wrap_err_with(|| format!("Failed to stat source: {}", src.display()))?;
    if !src_meta.is_file() {
        return Err(eyre!(
            "Non-regular source file: {} ({:?})",
            src.display(),
            src_meta.file_type()
        ));
    }

    match fs::metadata(dst) {
        Ok(dst_meta) => {
            if !dst_meta.is_file() {
                return Err(eyre!(
                    "Non-regular destination file: {} ({:?})",
                    dst.display(),
                    dst_meta.file_type()
                ));
            }
            if same_file(src, &src_meta, dst, &dst_meta) {
                return Ok(TransferOutcome::Unchanged);
            }
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {}
        Err(e) => {
            return Err(e)
                .wrap_err_with(|| format!("Failed to stat destination: {}", dst.display()));
        }
    }

    if fs::hard_link(src, dst).is_ok() {
        return Ok(TransferOutcome::Linked);
    }

    copy_contents(src, dst)
        .wrap_err_with(|| format!("Failed to copy {} → {}", src.display(), dst.display()))?;
    Ok(TransferOutcome::Copied)
}

fn copy_contents(src: &Path, dst: &Path) -> io::Result<()> {
    let mut input = File::open(src)?;
    // Both handles close on drop, on every path out of here.
    let mut output = File::create(dst)?;
    io::copy(&mut input, &mut output)?;
    output.sync_all()
}

#[cfg(unix)]
fn same_file(_src: &Path, src_meta: &Metadata, _dst: &Path, dst_meta: &Metadata) -> bool {
    use std::os::unix::fs::MetadataExt;
    src_meta.dev() == dst_meta.dev() && src_meta.ino() == dst_meta.ino()
}

#[cfg(not(unix))]
fn same_file(src: &Path, _src_meta: &Metadata, dst: &Path, _dst_meta: &Metadata) -> bool {
    match (fs::canonicalize(src), fs::canonicalize(dst)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn links_new_destination() {
        let tmp = tempdir().expect("temp");
        let src = tmp.path().join("IMG.jpg");
        let dst = tmp.path().join("out.jpg");
        fs::write(&src, b"jpeg bytes").expect("src");

        let outcome = transfer_file(&src, &dst).expect("transfer");
        assert_eq!(outcome, TransferOutcome::Linked);
        assert_eq!(fs::read(&dst).expect("read"), b"jpeg bytes");
    }

    #[test]
    fn second_transfer_is_unchanged() {
        let tmp = tempdir().expect("temp");
        let src = tmp.path().join("IMG.jpg");
        let dst = tmp.path().join("out.jpg");
        fs::write(&src, b"jpeg bytes").expect("src");

        transfer_file(&src, &dst).expect("first");
        let outcome = transfer_file(&src, &dst).expect("second");
        assert_eq!(outcome, TransferOutcome::Unchanged);
        assert_eq!(fs::read(&dst).expect("read"), b"jpeg bytes");
    }

    #[test]
    fn same_path_is_unchanged() {
        let tmp = tempdir().expect("temp");
        let src = tmp.path().join("IMG.jpg");
        fs::write(&src, b"data").expect("src");

        assert_eq!(
            transfer_file(&src, &src).expect("transfer"),
            TransferOutcome::Unchanged
        );
        assert_eq!(fs::read(&src).expect("read"), b"data");
    }

    #[test]
    fn stale_destination_is_replaced() {
        let tmp = tempdir().expect("temp");
        let src = tmp.path().join("IMG.jpg");
        let dst = tmp.path().join("out.jpg");
        fs::write(&src, b"fresh").expect("src");
        fs::write(&dst, b"stale contents").expect("dst");

        let outcome = transfer_file(&src, &dst).expect("transfer");
        assert_eq!(outcome, TransferOutcome::Copied);
        assert_eq!(fs::read(&dst).expect("read"), b"fresh");
        assert_eq!(fs::read(&src).expect("read"), b"fresh");
    }

    #[test]
    fn copy_contents_writes_identical_bytes() {
        let tmp = tempdir().expect("temp");
        let src = tmp.path().join("VID.mp4");
        let dst = tmp.path().join("copy.mp4");
        let payload: Vec<u8> = (0..64 * 1024).map(|i| (i % 251) as u8).collect();
        fs::write(&src, &payload).expect("src");

        copy_contents(&src, &dst).expect("copy");
        assert_eq!(fs::read(&dst).expect("read"), payload);
    }

    #[test]
    fn missing_source_fails() {
        let tmp = tempdir().expect("temp");
        let err = transfer_file(&tmp.path().join("nope.jpg"), &tmp.path().join("out.jpg"))
            .unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to stat source"));
        assert!(!tmp.path().join("out.jpg").exists());
    }

    #[test]
    fn directory_source_fails() {
        let tmp = tempdir().expect("temp");
        let err = transfer_file(tmp.path(), &tmp.path().join("out.jpg")).unwrap_err();
        assert!(format!("{:#}", err).contains("Non-regular source file"));
    }

    #[test]
    fn directory_destination_fails() {
        let tmp = tempdir().expect("temp");
        let src = tmp.path().join("IMG.jpg");
        let dst = tmp.path().join("taken");
        fs::write(&src, b"data").expect("src");
        fs::create_dir(&dst).expect("dir");

        let err = transfer_file(&src, &dst).unwrap_err();
        assert!(format!("{:#}", err).contains("Non-regular destination file"));
    }

    #[test]
    fn missing_destination_folder_fails() {
        let tmp = tempdir().expect("temp");
        let src = tmp.path().join("IMG.jpg");
        fs::write(&src, b"data").expect("src");

        let err = transfer_file(&src, &tmp.path().join("absent/out.jpg")).unwrap_err();
        assert!(format!("{:#}", err).contains("Failed to copy"));
    }
}
