//! Tests for the WAL reader
//!
//! Verifies sequential reads, the iterator adapter, and resynchronization
//! around partial/corrupt trailing records.

use std::fs::File;
use std::io::Write;
use std::path::PathBuf;

use atlaskv::wal::{Operation, WalReader, WalWriter};
use tempfile::TempDir;

fn setup_temp_wal() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().unwrap();
    let wal_path = temp_dir.path().join("test.wal");
    (temp_dir, wal_path)
}

fn write_entries(path: &PathBuf, ops: &[(Operation, u64)]) {
    let mut writer = WalWriter::create(path).unwrap();
    for (op, ts) in ops {
        writer.append(op.clone(), *ts).unwrap();
    }
}

// =============================================================================
// Basic Reading Tests
// =============================================================================

#[test]
fn read_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn read_single_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, &[(Operation::Put { key: b"key1".to_vec(), value: b"value1".to_vec() }, 1)]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    let record = reader.next_record().unwrap().unwrap();

    assert_eq!(record.timestamp, 1);
    assert!(matches!(record.operation, Operation::Put { .. }));
}

#[test]
fn read_multiple_entries_in_order() {
    let (_temp, wal_path) = setup_temp_wal();
    let ops = vec![
        (Operation::Put { key: b"k1".to_vec(), value: b"v1".to_vec() }, 1),
        (Operation::Put { key: b"k2".to_vec(), value: b"v2".to_vec() }, 2),
        (Operation::Delete { key: b"k1".to_vec() }, 3),
        (Operation::Put { key: b"k3".to_vec(), value: b"v3".to_vec() }, 4),
    ];
    write_entries(&wal_path, &ops);

    let mut reader = WalReader::open(&wal_path).unwrap();
    for (op, ts) in &ops {
        let record = reader.next_record().unwrap().unwrap();
        assert_eq!(record.timestamp, *ts);
        assert_eq!(&record.operation, op);
    }
    assert!(reader.next_record().unwrap().is_none());
}

// =============================================================================
// Iterator Tests
// =============================================================================

#[test]
fn iterator_over_empty_file() {
    let (_temp, wal_path) = setup_temp_wal();
    File::create(&wal_path).unwrap();

    let reader = WalReader::open(&wal_path).unwrap();
    assert_eq!(reader.records().count(), 0);
}

#[test]
fn iterator_yields_every_entry() {
    let (_temp, wal_path) = setup_temp_wal();
    let ops = vec![
        (Operation::Put { key: b"a".to_vec(), value: b"1".to_vec() }, 1),
        (Operation::Put { key: b"b".to_vec(), value: b"2".to_vec() }, 2),
        (Operation::Delete { key: b"a".to_vec() }, 3),
    ];
    write_entries(&wal_path, &ops);

    let reader = WalReader::open(&wal_path).unwrap();
    let records: Vec<_> = reader.records().map(|r| r.unwrap()).collect();

    assert_eq!(records.len(), 3);
    for (i, record) in records.iter().enumerate() {
        assert_eq!(record.timestamp, ops[i].1);
    }
}

// =============================================================================
// Partial Write / Resynchronization Tests
// =============================================================================

#[test]
fn partial_trailing_record_stops_iteration_without_error() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, &[(Operation::Put { key: b"k".to_vec(), value: b"v".to_vec() }, 1)]);

    // Simulate a crash mid-append: a few garbage bytes trailing the last
    // complete record.
    let mut file = std::fs::OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0u8; 5]).unwrap();
    file.sync_all().unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_record().unwrap().is_some());
    assert!(reader.next_record().unwrap().is_none());
}

#[test]
fn position_tracks_last_fully_decoded_record() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, &[(Operation::Put { key: b"k".to_vec(), value: b"v".to_vec() }, 1)]);
    let good_len = std::fs::metadata(&wal_path).unwrap().len();

    let mut file = std::fs::OpenOptions::new().append(true).open(&wal_path).unwrap();
    file.write_all(&[0u8; 8]).unwrap();
    file.sync_all().unwrap();

    let mut reader = WalReader::open(&wal_path).unwrap();
    assert!(reader.next_record().unwrap().is_some());
    assert!(reader.next_record().unwrap().is_none());
    assert_eq!(reader.position(), good_len);
}

// =============================================================================
// Edge Cases
// =============================================================================

#[test]
fn large_entry_reads_back_whole() {
    let (_temp, wal_path) = setup_temp_wal();
    let large_value = vec![0xAB; 1024 * 1024];
    write_entries(&wal_path, &[(Operation::Put { key: b"big".to_vec(), value: large_value.clone() }, 1)]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    let record = reader.next_record().unwrap().unwrap();
    match record.operation {
        Operation::Put { value, .. } => assert_eq!(value, large_value),
        _ => panic!("expected Put operation"),
    }
}

#[test]
fn delete_operation_round_trips() {
    let (_temp, wal_path) = setup_temp_wal();
    write_entries(&wal_path, &[(Operation::Delete { key: b"deleted_key".to_vec() }, 5)]);

    let mut reader = WalReader::open(&wal_path).unwrap();
    let record = reader.next_record().unwrap().unwrap();

    assert_eq!(record.timestamp, 5);
    match record.operation {
        Operation::Delete { key } => assert_eq!(key, b"deleted_key"),
        _ => panic!("expected Delete operation"),
    }
}
