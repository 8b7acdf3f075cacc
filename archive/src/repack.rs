//! Repacking an unpacked wheel tree and unpacking a wheel into one.

use super::descriptor::{HeaderMessage, WHEEL_FILENAME, WheelDescriptor};
use super::error::{ArchiveError, Result};
use super::naming::{BuildTag, DistributionIdentity, split_dist_info_dir};
use super::options::WriterOptions;
use super::reader::WheelReader;
use super::writer::WheelWriter;
use log::{debug, info};
use std::fs;
use std::path::{Path, PathBuf};

const LOG_TARGET: &str = "wheelwright::repack";
const BUILD_KEY: &str = "Build";

/// Pack the unpacked wheel at `directory` into a new wheel in `dest_dir`.
///
/// The file name is taken from the single `.dist-info` directory and the
/// tags in its WHEEL file. With `build_number` set, the `Build:` line of
/// WHEEL is replaced (or added) on disk before packing; an empty string
/// removes it. With `None`, any existing build line is kept.
///
/// Returns the path of the new wheel.
///
/// # Errors
///
/// Returns [`ArchiveError::InvalidLayout`] when `directory` holds zero or
/// several `.dist-info` directories or WHEEL lists no tags,
/// [`ArchiveError::BadFilename`] for an invalid build number, and writer
/// errors.
///
/// # Examples
///
/// ```no_run
/// use std::path::Path;
/// use wheelwright_archive::options::WriterOptions;
/// use wheelwright_archive::repack::pack_directory;
///
/// let wheel = pack_directory(
///     Path::new("build/pkg-1.0"),
///     Path::new("dist"),
///     Some("2"),
///     WriterOptions::default(),
/// )
/// .expect("repacked");
/// assert!(wheel.ends_with("pkg-1.0-2-py3-none-any.whl"));
/// ```
pub fn pack_directory(
    directory: &Path,
    dest_dir: &Path,
    build_number: Option<&str>,
    options: WriterOptions,
) -> Result<PathBuf> {
    let dist_info = find_dist_info_dir(directory)?;
    let dist_info_name = dist_info
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_default();
    let Some((name, version)) = split_dist_info_dir(&dist_info_name) else {
        return Err(layout_error(&dist_info, "malformed .dist-info name"));
    };

    let wheel_path = dist_info.join(WHEEL_FILENAME);
    let text = fs::read_to_string(&wheel_path)?;
    let message = HeaderMessage::parse(&text);
    if message.get_all("Tag").next().is_none() {
        return Err(layout_error(
            &wheel_path,
            "no tags present; cannot determine the wheel file name",
        ));
    }
    let mut descriptor = WheelDescriptor::parse(&text)?;

    if let Some(requested) = build_number {
        let build = match requested {
            "" => None,
            value => Some(BuildTag::try_from(value)?),
        };
        if build.as_ref() != descriptor.build() {
            fs::write(&wheel_path, replace_build_line(&text, build.as_ref()))?;
            debug!(
                target: LOG_TARGET,
                "set build number of {} to {:?}",
                wheel_path.display(),
                build.as_ref().map(BuildTag::as_str)
            );
            descriptor = descriptor.with_build(build);
        }
    }

    let identity = DistributionIdentity::new(name, version)
        .with_tags(descriptor.tags().clone())
        .with_build(descriptor.build().cloned());
    let target = dest_dir.join(identity.filename());
    info!(target: LOG_TARGET, "repacking {} as {}", directory.display(), target.display());

    let mut writer = WheelWriter::create(&target, Some(identity), options)?;
    writer.write_from_directory(directory)?;
    writer.finish()?;
    Ok(target)
}

/// Unpack the wheel at `path` into `dest/<name>-<version>`.
///
/// The target directory is created if needed. Returns its path.
///
/// # Errors
///
/// Returns [`ArchiveError::BadFilename`] for a malformed wheel name, and
/// reader and extraction errors.
pub fn unpack_wheel(path: &Path, dest: &Path) -> Result<PathBuf> {
    let mut reader = WheelReader::open(path)?;
    let namever = match reader.identity() {
        Some(identity) => format!("{}-{}", identity.name(), identity.version()),
        None => return Err(ArchiveError::MissingMetadataDirectory),
    };
    let destination = dest.join(namever);
    fs::create_dir_all(&destination)?;
    info!(target: LOG_TARGET, "unpacking to {}", destination.display());
    reader.extract_to(&destination)?;
    Ok(destination)
}

fn find_dist_info_dir(directory: &Path) -> Result<PathBuf> {
    if !directory.is_dir() {
        return Err(ArchiveError::NotADirectory {
            path: directory.to_path_buf(),
        });
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(directory)? {
        let entry = entry?;
        let name = entry.file_name();
        let is_dist_info = split_dist_info_dir(&name.to_string_lossy())
            .is_some_and(|(_, version)| version.starts_with(|c: char| c.is_ascii_digit()));
        if is_dist_info && entry.file_type()?.is_dir() {
            found.push(entry.path());
        }
    }
    match found.len() {
        1 => Ok(found.remove(0)),
        0 => Err(layout_error(directory, "no .dist-info directory found")),
        _ => Err(layout_error(directory, "multiple .dist-info directories found")),
    }
}

/// Replace, insert or remove the `Build:` header, leaving other lines as-is.
fn replace_build_line(text: &str, build: Option<&BuildTag>) -> String {
    let replacement = build.map(|build| format!("{BUILD_KEY}: {build}"));
    let mut lines: Vec<&str> = text.lines().collect();
    let header_end = lines
        .iter()
        .position(|line| line.is_empty())
        .unwrap_or(lines.len());
    let existing = lines[..header_end]
        .iter()
        .position(|line| is_build_line(line));

    match (existing, replacement.as_deref()) {
        (Some(index), Some(line)) => lines[index] = line,
        (Some(index), None) => {
            lines.remove(index);
        }
        (None, Some(line)) => lines.insert(header_end, line),
        (None, None) => {}
    }

    let mut rendered = lines.join("\n");
    rendered.push('\n');
    rendered
}

fn is_build_line(line: &str) -> bool {
    line.split_once(':')
        .is_some_and(|(key, _)| key.trim().eq_ignore_ascii_case(BUILD_KEY))
}

fn layout_error(path: &Path, reason: &str) -> ArchiveError {
    ArchiveError::InvalidLayout {
        path: path.to_path_buf(),
        reason: reason.to_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::{fixture, rstest};
    use tempfile::TempDir;

    const WHEEL_TEXT: &str = "Wheel-Version: 1.0\nGenerator: test\nRoot-Is-Purelib: true\n\
                              Tag: py2-none-any\nTag: py3-none-any\n";

    #[fixture]
    fn unpacked() -> TempDir {
        let temp = TempDir::new().expect("temp dir");
        let tree = temp.path().join("pkg-1.0");
        fs::create_dir_all(tree.join("pkg")).expect("package dir");
        fs::create_dir_all(tree.join("pkg-1.0.dist-info")).expect("dist-info dir");
        fs::write(tree.join("pkg/__init__.py"), b"").expect("module");
        fs::write(tree.join("pkg-1.0.dist-info/WHEEL"), WHEEL_TEXT).expect("WHEEL");
        fs::write(
            tree.join("pkg-1.0.dist-info/METADATA"),
            "Metadata-Version: 2.1\nName: pkg\nVersion: 1.0\n\n",
        )
        .expect("METADATA");
        fs::write(tree.join("pkg-1.0.dist-info/RECORD"), "stale,,\n").expect("RECORD");
        temp
    }

    #[rstest]
    fn packs_with_compressed_tags(unpacked: TempDir) {
        let tree = unpacked.path().join("pkg-1.0");
        let wheel = pack_directory(&tree, unpacked.path(), None, WriterOptions::default())
            .expect("packed");
        assert_eq!(
            wheel.file_name().and_then(|name| name.to_str()),
            Some("pkg-1.0-py2.py3-none-any.whl")
        );

        let mut reader = WheelReader::open(&wheel).expect("wheel opens");
        reader.verify_all().expect("intact");
        assert_eq!(reader.read_metadata_file("WHEEL").expect("WHEEL"), WHEEL_TEXT.as_bytes());
        assert!(reader.record().get("stale").is_none());
    }

    #[rstest]
    fn build_number_is_written_to_wheel_and_name(unpacked: TempDir) {
        let tree = unpacked.path().join("pkg-1.0");
        let wheel = pack_directory(&tree, unpacked.path(), Some("7b"), WriterOptions::default())
            .expect("packed");
        assert!(wheel.ends_with("pkg-1.0-7b-py2.py3-none-any.whl"));

        let on_disk =
            fs::read_to_string(tree.join("pkg-1.0.dist-info/WHEEL")).expect("WHEEL rewritten");
        assert!(on_disk.contains("Build: 7b\n"));
        let mut reader = WheelReader::open(&wheel).expect("wheel opens");
        let descriptor = reader.descriptor().expect("descriptor parses");
        assert_eq!(descriptor.build().map(BuildTag::as_str), Some("7b"));
    }

    #[rstest]
    fn empty_build_number_removes_existing(unpacked: TempDir) {
        let tree = unpacked.path().join("pkg-1.0");
        let wheel_file = tree.join("pkg-1.0.dist-info/WHEEL");
        fs::write(&wheel_file, format!("{WHEEL_TEXT}Build: 3\n")).expect("WHEEL");

        let kept = pack_directory(&tree, unpacked.path(), None, WriterOptions::default())
            .expect("packed");
        assert!(kept.ends_with("pkg-1.0-3-py2.py3-none-any.whl"));

        let removed = pack_directory(&tree, unpacked.path(), Some(""), WriterOptions::default())
            .expect("packed");
        assert!(removed.ends_with("pkg-1.0-py2.py3-none-any.whl"));
        assert_eq!(fs::read_to_string(&wheel_file).expect("WHEEL"), WHEEL_TEXT);
    }

    #[rstest]
    fn rejects_invalid_build_number(unpacked: TempDir) {
        let tree = unpacked.path().join("pkg-1.0");
        assert!(matches!(
            pack_directory(&tree, unpacked.path(), Some("beta"), WriterOptions::default()),
            Err(ArchiveError::BadFilename { .. })
        ));
    }

    #[rstest]
    fn rejects_wheel_without_tags(unpacked: TempDir) {
        let tree = unpacked.path().join("pkg-1.0");
        fs::write(
            tree.join("pkg-1.0.dist-info/WHEEL"),
            "Wheel-Version: 1.0\nRoot-Is-Purelib: true\n",
        )
        .expect("WHEEL");
        assert!(matches!(
            pack_directory(&tree, unpacked.path(), None, WriterOptions::default()),
            Err(ArchiveError::InvalidLayout { .. })
        ));
    }

    #[rstest]
    fn rejects_multiple_metadata_directories(unpacked: TempDir) {
        let tree = unpacked.path().join("pkg-1.0");
        fs::create_dir(tree.join("other-2.0.dist-info")).expect("second dist-info");
        let err = pack_directory(&tree, unpacked.path(), None, WriterOptions::default())
            .expect_err("ambiguous layout");
        assert!(matches!(err, ArchiveError::InvalidLayout { reason, .. } if reason.contains("multiple")));
    }

    #[test]
    fn rejects_tree_without_metadata_directory() {
        let temp = TempDir::new().expect("temp dir");
        fs::create_dir(temp.path().join("pkg-latest.dist-info")).expect("non-numeric version");
        assert!(matches!(
            pack_directory(temp.path(), temp.path(), None, WriterOptions::default()),
            Err(ArchiveError::InvalidLayout { .. })
        ));
    }

    #[rstest]
    fn unpack_restores_packed_tree(unpacked: TempDir) {
        let tree = unpacked.path().join("pkg-1.0");
        let wheel = pack_directory(&tree, unpacked.path(), None, WriterOptions::default())
            .expect("packed");
        let dest = unpacked.path().join("out");

        let destination = unpack_wheel(&wheel, &dest).expect("unpacked");
        assert_eq!(destination, dest.join("pkg-1.0"));
        assert!(destination.join("pkg/__init__.py").is_file());
        assert_eq!(
            fs::read_to_string(destination.join("pkg-1.0.dist-info/WHEEL")).expect("WHEEL"),
            WHEEL_TEXT
        );
    }

    #[rstest]
    #[case::replace("A: 1\nBuild: 2\nTag: x\n", Some("5"), "A: 1\nBuild: 5\nTag: x\n")]
    #[case::insert("A: 1\n\nbody\n", Some("5"), "A: 1\nBuild: 5\n\nbody\n")]
    #[case::remove("A: 1\nbuild: 2\n", None, "A: 1\n")]
    #[case::absent("A: 1\n", None, "A: 1\n")]
    fn rewrites_build_line(
        #[case] text: &str,
        #[case] build: Option<&str>,
        #[case] expected: &str,
    ) {
        let build = build.map(|value| BuildTag::try_from(value).expect("valid build"));
        assert_eq!(replace_build_line(text, build.as_ref()), expected);
    }
}
