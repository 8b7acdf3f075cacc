//! Unit tests for the wheel writer.

use super::*;
use crate::options::Compression;
use crate::record_codec::parse_record;
use rstest::{fixture, rstest};
use std::io::Cursor;
use tempfile::TempDir;
use zip::{CompressionMethod, ZipArchive};

const HELLO: &[u8] = b"print('hello, world!')\n\n\n";

#[fixture]
fn temp_dir() -> TempDir {
    TempDir::new().expect("temp dir creation succeeds")
}

#[fixture]
fn identity() -> DistributionIdentity {
    DistributionIdentity::new("pkg", "1.0")
}

fn memory_writer(identity: DistributionIdentity, options: WriterOptions) -> WheelWriter<Cursor<Vec<u8>>> {
    WheelWriter::new(Cursor::new(Vec::new()), identity, options)
}

fn finish_to_archive(writer: WheelWriter<Cursor<Vec<u8>>>) -> ZipArchive<Cursor<Vec<u8>>> {
    let sink = writer.into_inner().expect("finish succeeds");
    ZipArchive::new(Cursor::new(sink.into_inner())).expect("valid zip")
}

fn read_entry(archive: &mut ZipArchive<Cursor<Vec<u8>>>, name: &str) -> Vec<u8> {
    let mut entry = archive.by_name(name).expect("entry present");
    let mut data = Vec::new();
    entry.read_to_end(&mut data).expect("entry readable");
    data
}

#[rstest]
fn writes_entries_then_metadata_then_record(identity: DistributionIdentity) {
    let mut writer = memory_writer(identity, WriterOptions::default());
    writer
        .write_entry("hello/hello.py", HELLO, None)
        .expect("entry written");
    let mut archive = finish_to_archive(writer);

    let names: Vec<&str> = archive.file_names().collect();
    assert_eq!(
        names,
        [
            "hello/hello.py",
            "pkg-1.0.dist-info/WHEEL",
            "pkg-1.0.dist-info/METADATA",
            "pkg-1.0.dist-info/RECORD",
        ]
    );
    assert_eq!(read_entry(&mut archive, "hello/hello.py"), HELLO);
}

#[rstest]
fn record_lists_itself_once_with_blank_fields(identity: DistributionIdentity) {
    let mut writer = memory_writer(identity, WriterOptions::default());
    writer
        .write_entry("hello/hello.py", HELLO, None)
        .expect("entry written");
    let mut archive = finish_to_archive(writer);

    let text = String::from_utf8(read_entry(&mut archive, "pkg-1.0.dist-info/RECORD"))
        .expect("utf-8 RECORD");
    assert_eq!(text.matches("pkg-1.0.dist-info/RECORD").count(), 1);
    assert!(text.ends_with("pkg-1.0.dist-info/RECORD,,\n"));

    let record = parse_record(&text).expect("parses");
    let row = record.get("hello/hello.py").expect("row present");
    assert_eq!(row.size(), Some(25));
    assert_eq!(
        row.hash().map(FileHash::digest),
        Some(HashAlgorithm::Sha256.digest(HELLO).as_slice())
    );
}

#[rstest]
fn synthesised_metadata_and_descriptor(identity: DistributionIdentity) {
    let options = WriterOptions::default()
        .with_generator("test-gen (1)")
        .with_root_is_purelib(false);
    let writer = memory_writer(identity, options);
    let mut archive = finish_to_archive(writer);

    let metadata = read_entry(&mut archive, "pkg-1.0.dist-info/METADATA");
    assert_eq!(
        metadata,
        b"Metadata-Version: 2.1\nName: pkg\nVersion: 1.0\n\n"
    );
    let wheel = read_entry(&mut archive, "pkg-1.0.dist-info/WHEEL");
    assert_eq!(
        wheel,
        concat!(
            "Wheel-Version: 1.0\n",
            "Generator: test-gen (1)\n",
            "Root-Is-Purelib: false\n",
            "Tag: py3-none-any\n",
            "\n",
        )
        .as_bytes()
    );
}

#[rstest]
fn explicit_metadata_suppresses_defaults(identity: DistributionIdentity) {
    let mut writer = memory_writer(identity, WriterOptions::default());
    writer
        .write_metadata([("Summary", "A test package")])
        .expect("metadata written");
    let archive = finish_to_archive(writer);

    let names: Vec<&str> = archive.file_names().collect();
    assert_eq!(
        names,
        ["pkg-1.0.dist-info/METADATA", "pkg-1.0.dist-info/RECORD"]
    );
}

#[rstest]
fn explicit_descriptor_suppresses_defaults(identity: DistributionIdentity) {
    let mut writer = memory_writer(identity, WriterOptions::default());
    writer.write_descriptor().expect("WHEEL written");
    let archive = finish_to_archive(writer);
    assert!(!archive.file_names().any(|name| name.ends_with("/METADATA")));
}

#[rstest]
fn descriptor_carries_build_tag_and_sorted_tags() {
    let tags = crate::naming::TagSet::from_axes(&["py3", "py2"], &["none"], &["any"])
        .expect("valid tags");
    let identity = DistributionIdentity::new("pkg", "1.0")
        .with_tags(tags)
        .with_build(Some(crate::naming::BuildTag::try_from("7").expect("valid build")));
    let writer = memory_writer(identity, WriterOptions::default());
    let mut archive = finish_to_archive(writer);

    let wheel = String::from_utf8(read_entry(&mut archive, "pkg-1.0.dist-info/WHEEL"))
        .expect("utf-8 WHEEL");
    assert!(wheel.contains("Build: 7\nTag: py2-none-any\nTag: py3-none-any\n"));
}

#[rstest]
#[case::backslashes("hello\\hello.py", "hello/hello.py")]
#[case::leading_slash("/hello/hello.py", "hello/hello.py")]
#[case::dot_segments("./hello//hello.py", "hello/hello.py")]
fn normalises_entry_paths(#[case] given: &str, #[case] stored: &str) {
    assert_eq!(normalize_entry_path(given).expect("valid path"), stored);
}

#[rstest]
#[case::empty("")]
#[case::only_slashes("//")]
#[case::parent("pkg/../../etc/passwd")]
fn rejects_invalid_entry_paths(identity: DistributionIdentity, #[case] path: &str) {
    let mut writer = memory_writer(identity, WriterOptions::default());
    let err = writer.write_entry(path, b"x", None).expect_err("invalid path");
    assert!(matches!(err, ArchiveError::InvalidEntryPath { .. }));
    writer
        .write_entry("pkg/ok.py", b"x", None)
        .expect("writer stays usable after a rejected path");
}

#[rstest]
fn rejects_explicit_record_entry(identity: DistributionIdentity) {
    let mut writer = memory_writer(identity, WriterOptions::default());
    let err = writer
        .write_metadata_file("RECORD", b"forged")
        .expect_err("RECORD is reserved");
    assert!(matches!(err, ArchiveError::InvalidEntryPath { .. }));
}

#[rstest]
fn signature_files_are_written_but_not_recorded(identity: DistributionIdentity) {
    let mut writer = memory_writer(identity, WriterOptions::default());
    writer
        .write_metadata_file("RECORD.jws", b"{}")
        .expect("control file written");
    assert!(writer.record().is_empty());
    let archive = finish_to_archive(writer);
    assert!(archive.file_names().any(|name| name == "pkg-1.0.dist-info/RECORD.jws"));
}

#[rstest]
fn write_after_finish_is_rejected(identity: DistributionIdentity) {
    let mut writer = memory_writer(identity, WriterOptions::default());
    writer.finish().expect("finish succeeds");
    assert!(matches!(
        writer.write_entry("late.py", b"", None),
        Err(ArchiveError::WriteAfterClose)
    ));
    assert!(matches!(writer.finish(), Err(ArchiveError::WriteAfterClose)));
}

#[rstest]
fn data_and_metadata_helpers_root_paths(identity: DistributionIdentity) {
    let mut writer = memory_writer(identity, WriterOptions::default());
    writer
        .write_data_file("/scripts/run/", b"#!/bin/sh\n")
        .expect("data file written");
    writer
        .write_metadata_file(" entry_points.txt ", b"[console_scripts]\n")
        .expect("metadata file written");
    assert!(writer.record().contains("pkg-1.0.data/scripts/run"));
    assert!(writer.record().contains("pkg-1.0.dist-info/entry_points.txt"));
}

#[rstest]
fn stream_content_is_hashed(identity: DistributionIdentity) {
    let mut writer = memory_writer(identity, WriterOptions::default());
    let mut source = Cursor::new(HELLO.to_vec());
    writer
        .write_entry("hello/hello.py", &mut source as &mut dyn Read, None)
        .expect("stream written");
    let row = writer.record().get("hello/hello.py").expect("row present");
    assert_eq!(row.size(), Some(25));
}

#[rstest]
fn entries_carry_default_timestamp_mode_and_compression(identity: DistributionIdentity) {
    let mut writer = memory_writer(identity, WriterOptions::default());
    writer
        .write_entry("hello/hello.py", HELLO, None)
        .expect("entry written");
    let mut archive = finish_to_archive(writer);

    let entry = archive.by_name("hello/hello.py").expect("entry present");
    let modified = entry.last_modified().expect("timestamp stored");
    assert_eq!((modified.year(), modified.month(), modified.day()), (1980, 1, 1));
    assert_eq!(entry.unix_mode().map(|mode| mode & 0o777), Some(DEFAULT_ENTRY_MODE));
    assert_eq!(entry.compression(), CompressionMethod::Deflated);
}

#[rstest]
fn source_date_epoch_overrides_per_call_timestamp(identity: DistributionIdentity) {
    let options = WriterOptions::default()
        .with_source_date_epoch(Some(1_700_000_000))
        .with_compression(Compression::Stored);
    let mut writer = memory_writer(identity, options);
    writer
        .write_entry(
            "hello/hello.py",
            HELLO,
            Some(EntryTimestamp::from_unix(400_000_000)),
        )
        .expect("entry written");
    let mut archive = finish_to_archive(writer);

    let entry = archive.by_name("hello/hello.py").expect("entry present");
    let modified = entry.last_modified().expect("timestamp stored");
    assert_eq!((modified.year(), modified.month(), modified.day()), (2023, 11, 14));
    assert_eq!(entry.compression(), CompressionMethod::Stored);
}

#[rstest]
fn configured_algorithm_is_recorded(identity: DistributionIdentity) {
    let options = WriterOptions::default().with_hash_algorithm(HashAlgorithm::Sha512);
    let mut writer = memory_writer(identity, options);
    writer
        .write_entry("hello/hello.py", HELLO, None)
        .expect("entry written");
    let row = writer.record().get("hello/hello.py").expect("row present");
    assert_eq!(row.hash().map(FileHash::algorithm), Some(HashAlgorithm::Sha512));
}

#[rstest]
fn identical_inputs_produce_identical_bytes(identity: DistributionIdentity) {
    let build = || {
        let mut writer = memory_writer(identity.clone(), WriterOptions::default());
        writer
            .write_entry("hello/hello.py", HELLO, None)
            .expect("entry written");
        writer.into_inner().expect("finish succeeds").into_inner()
    };
    assert_eq!(build(), build());
}

#[rstest]
fn create_parses_identity_from_filename(temp_dir: TempDir) {
    let path = temp_dir.path().join("foo-2-py2.py3-none-any.whl");
    let mut writer = WheelWriter::create(&path, None, WriterOptions::default())
        .expect("writer opens");
    assert_eq!(writer.identity().tags().len(), 2);
    assert_eq!(writer.dist_info_dir(), "foo-2.dist-info");
    writer.finish().expect("finish succeeds");
    assert!(path.exists());
}

#[rstest]
fn create_rejects_bad_filename_without_touching_disk(temp_dir: TempDir) {
    let path = temp_dir.path().join("not-a-wheel.zip");
    let result = WheelWriter::create(&path, None, WriterOptions::default());
    assert!(matches!(result, Err(ArchiveError::BadFilename { .. })));
    assert!(!path.exists());
}

#[rstest]
fn dropping_unfinished_writer_deletes_file(temp_dir: TempDir) {
    let path = temp_dir.path().join("pkg-1.0-py3-none-any.whl");
    {
        let mut writer = WheelWriter::create(&path, None, WriterOptions::default())
            .expect("writer opens");
        writer
            .write_entry("hello/hello.py", HELLO, None)
            .expect("entry written");
    }
    assert!(!path.exists());
}

#[rstest]
fn scoped_write_aborts_on_error(temp_dir: TempDir) {
    let path = temp_dir.path().join("pkg-1.0-py3-none-any.whl");
    let result: Result<()> = write_wheel(&path, None, WriterOptions::default(), |writer| {
        writer.write_entry("hello/hello.py", HELLO, None)?;
        Err(ArchiveError::FileNotFound {
            path: "missing.py".to_owned(),
        })
    });
    assert!(matches!(result, Err(ArchiveError::FileNotFound { .. })));
    assert!(!path.exists());
}

#[rstest]
fn scoped_write_finishes_on_success(temp_dir: TempDir) {
    let path = temp_dir.path().join("pkg-1.0-py3-none-any.whl");
    let rows = write_wheel(&path, None, WriterOptions::default(), |writer| {
        writer.write_entry("hello/hello.py", HELLO, None)?;
        Ok(writer.record().len())
    })
    .expect("wheel written");
    assert_eq!(rows, 1);

    let file = File::open(&path).expect("wheel exists");
    let archive = ZipArchive::new(file).expect("valid zip");
    assert!(archive.file_names().any(|name| name == "pkg-1.0.dist-info/RECORD"));
}

#[rstest]
fn write_from_directory_skips_existing_record(temp_dir: TempDir, identity: DistributionIdentity) {
    let root = temp_dir.path();
    fs::create_dir_all(root.join("pkg/sub")).expect("mkdir");
    fs::create_dir_all(root.join("pkg-1.0.dist-info")).expect("mkdir");
    fs::write(root.join("pkg/__init__.py"), b"").expect("write");
    fs::write(root.join("pkg/sub/mod.py"), b"x = 1\n").expect("write");
    fs::write(root.join("pkg-1.0.dist-info/RECORD"), b"stale\n").expect("write");

    let mut writer = memory_writer(identity, WriterOptions::default());
    writer.write_from_directory(root).expect("tree written");
    let paths: Vec<&str> = writer.record().iter().map(RecordEntry::path).collect();
    assert_eq!(paths, ["pkg/__init__.py", "pkg/sub/mod.py"]);

    let mut archive = finish_to_archive(writer);
    let record = read_entry(&mut archive, "pkg-1.0.dist-info/RECORD");
    assert!(!String::from_utf8_lossy(&record).contains("stale"));
}

#[rstest]
fn write_from_directory_requires_directory(temp_dir: TempDir, identity: DistributionIdentity) {
    let file = temp_dir.path().join("plain.txt");
    fs::write(&file, b"").expect("write");
    let mut writer = memory_writer(identity, WriterOptions::default());
    assert!(matches!(
        writer.write_from_directory(&file),
        Err(ArchiveError::NotADirectory { .. })
    ));
    assert!(matches!(
        writer.write_from_directory(&temp_dir.path().join("missing")),
        Err(ArchiveError::NotADirectory { .. })
    ));
}

#[cfg(unix)]
#[rstest]
fn path_content_keeps_file_permissions(temp_dir: TempDir, identity: DistributionIdentity) {
    use std::os::unix::fs::PermissionsExt;

    let script = temp_dir.path().join("run.sh");
    fs::write(&script, b"#!/bin/sh\n").expect("write");
    fs::set_permissions(&script, fs::Permissions::from_mode(0o755)).expect("chmod");

    let mut writer = memory_writer(identity, WriterOptions::default());
    writer
        .write_entry("bin/run.sh", script.as_path(), None)
        .expect("entry written");
    let mut archive = finish_to_archive(writer);
    let entry = archive.by_name("bin/run.sh").expect("entry present");
    assert_eq!(entry.unix_mode().map(|mode| mode & 0o777), Some(0o755));
}

#[rstest]
fn unreadable_path_content_aborts_writer(temp_dir: TempDir) {
    let path = temp_dir.path().join("pkg-1.0-py3-none-any.whl");
    let missing = temp_dir.path().join("missing.py");
    let mut writer = WheelWriter::create(&path, None, WriterOptions::default())
        .expect("writer opens");
    writer
        .write_entry("hello/hello.py", HELLO, None)
        .expect("entry written");

    let err = writer
        .write_entry("pkg/missing.py", missing.as_path(), None)
        .expect_err("source is missing");

    assert!(matches!(err, ArchiveError::Io(_)));
    assert!(!path.exists());
    assert!(matches!(
        writer.write_entry("hello/again.py", HELLO, None),
        Err(ArchiveError::WriteAfterClose)
    ));
    assert!(matches!(writer.finish(), Err(ArchiveError::WriteAfterClose)));
}
