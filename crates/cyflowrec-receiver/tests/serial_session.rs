#![cfg(unix)]

use std::io::Write;
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use cyflowrec_frame::FrameError;
use cyflowrec_receiver::{
    CollisionPolicy, ReceiveError, Receiver, ReceiverConfig, SessionStats, StoragePolicy,
};

const MESSAGE_TIMEOUT: Duration = Duration::from_millis(100);
const QUIET: Duration = Duration::from_millis(300);

fn unique_temp_dir(tag: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!(
        "cyflowrec-it-{tag}-{}-{}",
        std::process::id(),
        std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .expect("time should be after epoch")
            .as_nanos()
    ));
    std::fs::create_dir_all(&dir).expect("temp dir should be creatable");
    dir
}

/// Run a receiver on its own thread until the sending side hangs up.
fn spawn_receiver(
    channel: UnixStream,
    config: ReceiverConfig,
) -> thread::JoinHandle<(ReceiveError, SessionStats)> {
    thread::spawn(move || {
        let mut receiver = Receiver::new(channel, config);
        let err = receiver.run().expect_err("run only returns on channel faults");
        (err, receiver.session().stats().clone())
    })
}

fn config(root: &Path) -> ReceiverConfig {
    ReceiverConfig::new(root).with_message_timeout(MESSAGE_TIMEOUT)
}

/// Write in small pieces with short pauses, like the instrument does.
fn send_slowly(stream: &mut UnixStream, bytes: &[u8]) {
    for chunk in bytes.chunks(7) {
        stream.write_all(chunk).expect("write should succeed");
        thread::sleep(Duration::from_millis(2));
    }
}

#[test]
fn silence_mid_payload_resynchronises_without_restart() {
    let root = unique_temp_dir("resync");
    let (mut instrument, port) = UnixStream::pair().unwrap();
    let handle = spawn_receiver(port, config(&root));

    send_slowly(&mut instrument, b"[FILENAME]<LOST.FCS>[FILESIZE]<100>only part");
    thread::sleep(QUIET);
    send_slowly(&mut instrument, b"[FILENAME]<A01.FCS>[FILESIZE]<5>HELLO");
    thread::sleep(Duration::from_millis(20));
    drop(instrument);

    let (err, stats) = handle.join().unwrap();
    assert!(matches!(
        err,
        ReceiveError::Channel(FrameError::ConnectionClosed)
    ));
    assert_eq!(stats.aborted, 1);
    assert_eq!(stats.stored, 1);
    assert_eq!(std::fs::read(root.join("A01.FCS")).unwrap(), b"HELLO");
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn protocol_violation_discards_until_quiet() {
    let root = unique_temp_dir("discard");
    let (mut instrument, port) = UnixStream::pair().unwrap();
    let handle = spawn_receiver(port, config(&root));

    send_slowly(&mut instrument, b"[FILENAME]<BAD NAME.FCS>[FILESIZE]<3>abc");
    // Still discarding: this well-formed message is swallowed too.
    send_slowly(&mut instrument, b"[FILENAME]<SWALLOWED.FCS>[FILESIZE]<3>abc");
    thread::sleep(QUIET);
    send_slowly(&mut instrument, b"[FILENAME]<GOOD.FCS>[FILESIZE]<3>abc");
    thread::sleep(Duration::from_millis(20));
    drop(instrument);

    let (_err, stats) = handle.join().unwrap();
    assert_eq!(stats.protocol_errors, 1);
    assert_eq!(stats.stored, 1);
    assert!(!root.join("SWALLOWED.FCS").exists());
    assert_eq!(std::fs::read(root.join("GOOD.FCS")).unwrap(), b"abc");
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn large_payload_arrives_in_bounded_chunks() {
    let root = unique_temp_dir("large");
    let (mut instrument, port) = UnixStream::pair().unwrap();
    let handle = spawn_receiver(port, config(&root));

    let payload: Vec<u8> = (0..9732u32).map(|i| (i % 251) as u8).collect();
    let mut wire = format!("[FILENAME]<A0000001.FCS>[FILESIZE]<{}>", payload.len()).into_bytes();
    wire.extend_from_slice(&payload);
    instrument.write_all(&wire).unwrap();
    drop(instrument);

    let (_err, stats) = handle.join().unwrap();
    assert_eq!(stats.stored, 1);
    assert_eq!(std::fs::read(root.join("A0000001.FCS")).unwrap(), payload);
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn drop_policy_over_the_wire_keeps_first_file() {
    let root = unique_temp_dir("drop");
    let (mut instrument, port) = UnixStream::pair().unwrap();
    let config = config(&root).with_policy(StoragePolicy {
        create_missing_dirs: false,
        on_name_collision: CollisionPolicy::Drop,
    });
    let handle = spawn_receiver(port, config);

    instrument
        .write_all(b"[FILENAME]<A01.FCS>[FILESIZE]<5>HELLO[FILENAME]<A01.FCS>[FILESIZE]<7>GOODBYE")
        .unwrap();
    drop(instrument);

    let (_err, stats) = handle.join().unwrap();
    assert_eq!(stats.stored, 1);
    assert_eq!(stats.dropped, 1);
    assert_eq!(std::fs::read(root.join("A01.FCS")).unwrap(), b"HELLO");
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn replace_policy_over_the_wire_keeps_second_file() {
    let root = unique_temp_dir("replace");
    let (mut instrument, port) = UnixStream::pair().unwrap();
    let handle = spawn_receiver(port, config(&root));

    instrument
        .write_all(b"[FILENAME]<A01.FCS>[FILESIZE]<5>HELLO[FILENAME]<A01.FCS>[FILESIZE]<7>GOODBYE")
        .unwrap();
    drop(instrument);

    let (_err, stats) = handle.join().unwrap();
    assert_eq!(stats.stored, 2);
    assert_eq!(std::fs::read(root.join("A01.FCS")).unwrap(), b"GOODBYE");
    let _ = std::fs::remove_dir_all(&root);
}

#[test]
fn storage_directory_policy() {
    for create_missing_dirs in [false, true] {
        let root = unique_temp_dir("dirs");
        let storage = root.join("missing");
        let (mut instrument, port) = UnixStream::pair().unwrap();
        let config = config(&storage).with_policy(StoragePolicy {
            create_missing_dirs,
            on_name_collision: CollisionPolicy::Replace,
        });
        let handle = spawn_receiver(port, config);

        instrument
            .write_all(b"[FILENAME]<A01.FCS>[FILESIZE]<5>HELLO")
            .unwrap();
        drop(instrument);

        let (_err, stats) = handle.join().unwrap();
        if create_missing_dirs {
            assert_eq!(stats.stored, 1);
            assert_eq!(std::fs::read(storage.join("A01.FCS")).unwrap(), b"HELLO");
        } else {
            assert_eq!(stats.unstored, 1);
            assert!(!storage.exists());
        }
        let _ = std::fs::remove_dir_all(&root);
    }
}
