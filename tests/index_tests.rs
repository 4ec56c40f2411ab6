//! Tests for Index
//!
//! These tests verify:
//! - Entries are written and read back by slot
//! - Empty / out-of-bounds reads report EndOfIndex
//! - Capacity exhaustion reports IndexExhausted
//! - The file is pre-sized while open and shrunk on close (or drop)
//! - Recovery from cleanly closed and crash-shaped files

use std::fs::{self, File};
use std::io::Write;
use std::path::PathBuf;

use seglog::log::{Index, Layout};
use seglog::LogError;
use tempfile::TempDir;

// =============================================================================
// Helper Functions
// =============================================================================

fn setup_temp_index() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("test.index");
    (temp_dir, path)
}

fn open_index(path: &PathBuf, max_index_bytes: u64) -> Index {
    Index::open(path, max_index_bytes, Layout::default()).unwrap()
}

fn file_len(path: &PathBuf) -> u64 {
    fs::metadata(path).unwrap().len()
}

// =============================================================================
// Open Tests
// =============================================================================

#[test]
fn test_new_index_is_empty_and_presized() {
    let (_temp, path) = setup_temp_index();
    let index = open_index(&path, 1024);

    assert!(index.is_empty());
    assert_eq!(index.len(), 0);
    assert_eq!(index.capacity(), 1024);
    assert_eq!(file_len(&path), 1024);
}

#[test]
fn test_empty_index_reads_fail() {
    let (_temp, path) = setup_temp_index();
    let index = open_index(&path, 1024);

    assert!(matches!(index.read(0), Err(LogError::EndOfIndex)));
    assert!(matches!(index.last(), Err(LogError::EndOfIndex)));
}

// =============================================================================
// Read / Write Tests
// =============================================================================

#[test]
fn test_write_and_read_entries() {
    let (_temp, path) = setup_temp_index();
    let mut index = open_index(&path, 1024);

    index.write(0, 0).unwrap();
    index.write(1, 19).unwrap();
    index.write(2, 42).unwrap();

    assert_eq!(index.len(), 3);
    assert_eq!(index.size(), 36);
    assert_eq!(index.read(0).unwrap(), (0, 0));
    assert_eq!(index.read(1).unwrap(), (1, 19));
    assert_eq!(index.read(2).unwrap(), (2, 42));
    assert_eq!(index.last().unwrap(), (2, 42));
}

#[test]
fn test_read_beyond_written_entries_fails() {
    let (_temp, path) = setup_temp_index();
    let mut index = open_index(&path, 1024);

    index.write(0, 0).unwrap();

    assert!(matches!(index.read(1), Err(LogError::EndOfIndex)));
    assert!(matches!(index.read(80), Err(LogError::EndOfIndex)));
}

#[test]
fn test_write_past_capacity_is_exhausted() {
    let (_temp, path) = setup_temp_index();
    let mut index = open_index(&path, 36);

    for i in 0..3 {
        index.write(i, i as u64 * 10).unwrap();
    }

    assert!(index.is_full());
    assert!(matches!(index.write(3, 30), Err(LogError::IndexExhausted)));
    assert_eq!(index.len(), 3);
}

#[test]
fn test_capacity_not_multiple_of_entry_width() {
    let (_temp, path) = setup_temp_index();
    let mut index = open_index(&path, 30);

    index.write(0, 0).unwrap();
    assert!(!index.is_full());
    index.write(1, 10).unwrap();

    // 24 bytes used, another 12 would overrun the 30-byte region
    assert!(index.is_full());
    assert!(matches!(index.write(2, 20), Err(LogError::IndexExhausted)));
}

#[test]
fn test_truncate_entries() {
    let (_temp, path) = setup_temp_index();
    let mut index = open_index(&path, 1024);

    index.write(0, 0).unwrap();
    index.write(1, 10).unwrap();
    index.write(2, 20).unwrap();

    index.truncate_entries(1);

    assert_eq!(index.len(), 1);
    assert_eq!(index.last().unwrap(), (0, 0));
    assert!(matches!(index.read(1), Err(LogError::EndOfIndex)));

    index.write(1, 99).unwrap();
    assert_eq!(index.last().unwrap(), (1, 99));
}

// =============================================================================
// Close / Recovery Tests
// =============================================================================

#[test]
fn test_close_shrinks_file_to_used_bytes() {
    let (_temp, path) = setup_temp_index();
    let mut index = open_index(&path, 1024);

    index.write(0, 0).unwrap();
    index.write(1, 19).unwrap();
    index.close().unwrap();

    assert_eq!(file_len(&path), 24);
}

#[test]
fn test_drop_shrinks_file_to_used_bytes() {
    let (_temp, path) = setup_temp_index();

    {
        let mut index = open_index(&path, 1024);
        index.write(0, 0).unwrap();
    }

    assert_eq!(file_len(&path), 12);
}

#[test]
fn test_on_disk_entries_are_big_endian() {
    let (_temp, path) = setup_temp_index();
    let mut index = open_index(&path, 1024);

    index.write(0, 0).unwrap();
    index.write(1, 0x0102).unwrap();
    index.close().unwrap();

    let bytes = fs::read(&path).unwrap();
    assert_eq!(&bytes[12..16], &1u32.to_be_bytes());
    assert_eq!(&bytes[16..24], &0x0102u64.to_be_bytes());
}

#[test]
fn test_reopen_recovers_entries() {
    let (_temp, path) = setup_temp_index();

    {
        let mut index = open_index(&path, 1024);
        index.write(0, 0).unwrap();
        index.write(1, 19).unwrap();
        index.write(2, 38).unwrap();
        index.close().unwrap();
    }

    let index = open_index(&path, 1024);
    assert_eq!(index.len(), 3);
    assert_eq!(index.last().unwrap(), (2, 38));
    assert_eq!(file_len(&path), 1024);
}

#[test]
fn test_reopen_ignores_zeroed_tail_of_presized_file() {
    let (_temp, path) = setup_temp_index();

    // Two real entries followed by the zeroed tail an unclean shutdown leaves
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&0u64.to_be_bytes());
    bytes.extend_from_slice(&1u32.to_be_bytes());
    bytes.extend_from_slice(&19u64.to_be_bytes());
    bytes.resize(120, 0);
    File::create(&path).unwrap().write_all(&bytes).unwrap();

    let index = open_index(&path, 120);
    assert_eq!(index.len(), 2);
    assert_eq!(index.last().unwrap(), (1, 19));
}

#[test]
fn test_existing_file_larger_than_capacity_is_kept() {
    let (_temp, path) = setup_temp_index();

    {
        let mut index = open_index(&path, 1024);
        for i in 0..5 {
            index.write(i, i as u64 * 10).unwrap();
        }
        index.close().unwrap();
    }

    // A smaller limit must not cut off existing entries
    let index = open_index(&path, 24);
    assert_eq!(index.len(), 5);
    assert!(index.is_full());
}
