//! Tests for Segment
//!
//! These tests verify:
//! - Offsets are assigned from the base offset, one per append
//! - Reads outside [base, next) are rejected
//! - A segment is maxed by either its store or its index limit
//! - Reopen recovers next_offset, including after a lost store tail
//! - Sealing and removal

use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;

use seglog::log::{Layout, Segment, SegmentState};
use seglog::{LogError, SegmentConfig};
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

/// Room for exactly three index entries
fn small_config() -> SegmentConfig {
    SegmentConfig {
        max_store_bytes: 1024,
        max_index_bytes: 3 * 12,
        initial_offset: 16,
        layout: Layout::default(),
    }
}

fn open_segment(dir: &Path, base_offset: u64, config: SegmentConfig) -> Segment {
    Segment::open(dir, base_offset, config).unwrap()
}

// =============================================================================
// Append / Read Tests
// =============================================================================

#[test]
fn test_new_segment_starts_at_base_offset() {
    let temp = setup_temp_dir();
    let segment = open_segment(temp.path(), 16, small_config());

    assert_eq!(segment.base_offset(), 16);
    assert_eq!(segment.next_offset(), 16);
    assert!(segment.is_empty());
    assert!(!segment.is_maxed());
    assert_eq!(segment.state(), SegmentState::Writable);
}

#[test]
fn test_append_assigns_consecutive_offsets() {
    let temp = setup_temp_dir();
    let mut segment = open_segment(temp.path(), 16, small_config());

    assert_eq!(segment.append(b"hello world").unwrap(), 16);
    assert_eq!(segment.append(b"hello world").unwrap(), 17);
    assert_eq!(segment.append(b"hello world").unwrap(), 18);

    assert_eq!(segment.len(), 3);
    assert_eq!(segment.next_offset(), 19);

    for offset in 16..19 {
        let record = segment.read(offset).unwrap();
        assert_eq!(record.offset, offset);
        assert_eq!(&record.value[..], b"hello world");
    }
}

#[test]
fn test_read_outside_range_is_out_of_range() {
    let temp = setup_temp_dir();
    let mut segment = open_segment(temp.path(), 16, small_config());

    segment.append(b"one").unwrap();

    assert!(matches!(
        segment.read(15),
        Err(LogError::OffsetOutOfRange { offset: 15 })
    ));
    assert!(matches!(
        segment.read(17),
        Err(LogError::OffsetOutOfRange { offset: 17 })
    ));
    assert!(segment.contains(16));
    assert!(!segment.contains(17));
}

// =============================================================================
// Capacity Tests
// =============================================================================

#[test]
fn test_maxed_by_index() {
    let temp = setup_temp_dir();
    let mut segment = open_segment(temp.path(), 16, small_config());

    for _ in 0..3 {
        assert!(!segment.is_maxed());
        segment.append(b"hello world").unwrap();
    }
    assert!(segment.is_maxed());

    let store_size = segment.store().size();
    assert!(matches!(
        segment.append(b"hello world"),
        Err(LogError::IndexExhausted)
    ));

    // The refused append left nothing behind in the store
    assert_eq!(segment.store().size(), store_size);
    assert_eq!(segment.next_offset(), 19);
}

#[test]
fn test_maxed_by_store() {
    let temp = setup_temp_dir();
    let config = SegmentConfig {
        max_store_bytes: 3 * 19,
        max_index_bytes: 1024,
        ..small_config()
    };
    let mut segment = open_segment(temp.path(), 16, config);

    segment.append(b"hello world").unwrap();
    segment.append(b"hello world").unwrap();
    assert!(!segment.is_maxed());

    segment.append(b"hello world").unwrap();
    assert!(segment.is_maxed());
}

// =============================================================================
// Recovery Tests
// =============================================================================

#[test]
fn test_reopen_recovers_next_offset() {
    let temp = setup_temp_dir();

    {
        let mut segment = open_segment(temp.path(), 16, small_config());
        segment.append(b"first").unwrap();
        segment.append(b"second").unwrap();
        segment.close().unwrap();
    }

    let mut segment = open_segment(temp.path(), 16, small_config());
    assert_eq!(segment.next_offset(), 18);
    assert_eq!(&segment.read(17).unwrap().value[..], b"second");

    assert_eq!(segment.append(b"third").unwrap(), 18);
    assert!(segment.is_maxed());
}

#[test]
fn test_reopen_discards_entries_past_store_end() {
    let temp = setup_temp_dir();
    let config = SegmentConfig {
        max_index_bytes: 1024,
        ..small_config()
    };

    {
        let mut segment = open_segment(temp.path(), 16, config);
        segment.append(b"hello world").unwrap();
        segment.append(b"hello world").unwrap();
        segment.close().unwrap();
    }

    // Lose the second record from the store, keep both index entries
    let store_path = Segment::store_path(temp.path(), 16);
    let file = OpenOptions::new().write(true).open(&store_path).unwrap();
    file.set_len(19).unwrap();
    drop(file);

    let mut segment = open_segment(temp.path(), 16, config);
    assert_eq!(segment.next_offset(), 17);
    assert_eq!(segment.index().len(), 1);
    assert!(matches!(
        segment.read(17),
        Err(LogError::OffsetOutOfRange { offset: 17 })
    ));

    assert_eq!(segment.append(b"again").unwrap(), 17);
    assert_eq!(&segment.read(17).unwrap().value[..], b"again");
}

#[test]
fn test_reopen_discards_record_with_torn_payload() {
    let temp = setup_temp_dir();
    let config = SegmentConfig {
        max_index_bytes: 1024,
        ..small_config()
    };

    {
        let mut segment = open_segment(temp.path(), 16, config);
        segment.append(b"hello world").unwrap();
        segment.append(b"hello world").unwrap();
        segment.close().unwrap();
    }

    // Second record keeps its length prefix and three payload bytes
    let store_path = Segment::store_path(temp.path(), 16);
    let file = OpenOptions::new().write(true).open(&store_path).unwrap();
    file.set_len(19 + 8 + 3).unwrap();
    drop(file);

    let mut segment = open_segment(temp.path(), 16, config);
    assert_eq!(segment.next_offset(), 17);
    assert_eq!(segment.store().size(), 19);
    assert_eq!(std::fs::metadata(&store_path).unwrap().len(), 19);

    assert_eq!(segment.append(b"again").unwrap(), 17);
    assert_eq!(&segment.read(16).unwrap().value[..], b"hello world");
    assert_eq!(&segment.read(17).unwrap().value[..], b"again");
}

#[test]
fn test_reopen_truncates_unindexed_store_tail() {
    let temp = setup_temp_dir();
    let config = SegmentConfig {
        max_index_bytes: 1024,
        ..small_config()
    };

    {
        let mut segment = open_segment(temp.path(), 16, config);
        segment.append(b"indexed").unwrap();
        segment.close().unwrap();
    }

    // Bytes past the last indexed record, as a crash between store and index leaves
    let store_path = Segment::store_path(temp.path(), 16);
    let mut file = OpenOptions::new().append(true).open(&store_path).unwrap();
    file.write_all(&[0, 0, 0, 0, 0, 0, 0, 2, b'x']).unwrap();
    drop(file);

    let mut segment = open_segment(temp.path(), 16, config);
    assert_eq!(segment.next_offset(), 17);
    assert_eq!(segment.store().size(), 15);

    assert_eq!(segment.append(b"next").unwrap(), 17);
    assert_eq!(&segment.read(17).unwrap().value[..], b"next");
}

// =============================================================================
// Lifecycle Tests
// =============================================================================

#[test]
fn test_sealed_segment_rejects_appends() {
    let temp = setup_temp_dir();
    let mut segment = open_segment(temp.path(), 16, small_config());

    segment.append(b"one").unwrap();
    segment.seal();

    assert_eq!(segment.state(), SegmentState::Sealed);
    assert!(matches!(
        segment.append(b"two"),
        Err(LogError::SegmentSealed { base_offset: 16 })
    ));

    // Still readable
    assert_eq!(&segment.read(16).unwrap().value[..], b"one");
}

#[test]
fn test_remove_deletes_files() {
    let temp = setup_temp_dir();
    let mut segment = open_segment(temp.path(), 16, small_config());
    segment.append(b"one").unwrap();

    let store_path = Segment::store_path(temp.path(), 16);
    let index_path = Segment::index_path(temp.path(), 16);
    assert!(store_path.exists());
    assert!(index_path.exists());

    segment.remove().unwrap();

    assert!(!store_path.exists());
    assert!(!index_path.exists());
}

// =============================================================================
// File Naming Tests
// =============================================================================

#[test]
fn test_file_names_are_zero_padded() {
    let dir = Path::new("/data");

    assert_eq!(
        Segment::store_path(dir, 16),
        dir.join("00000000000000000016.store")
    );
    assert_eq!(
        Segment::index_path(dir, 16),
        dir.join("00000000000000000016.index")
    );
}

#[test]
fn test_parse_base_offset() {
    assert_eq!(
        Segment::parse_base_offset(Path::new("00000000000000000042.store")),
        Some(42)
    );
    assert_eq!(
        Segment::parse_base_offset(Path::new("/data/00000000000000000042.index")),
        Some(42)
    );

    assert_eq!(Segment::parse_base_offset(Path::new("42.store")), None);
    assert_eq!(
        Segment::parse_base_offset(Path::new("00000000000000000042.log")),
        None
    );
    assert_eq!(
        Segment::parse_base_offset(Path::new("0000000000000000004x.store")),
        None
    );
    assert_eq!(Segment::parse_base_offset(Path::new("notes.txt")), None);
}
