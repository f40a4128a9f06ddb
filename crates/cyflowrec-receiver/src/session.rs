use std::time::Duration;

use cyflowrec_frame::{ReadEvent, CHUNK_CAPACITY};
use tracing::{debug, error, info, warn};

use crate::buffer::FieldBuffer;
use crate::config::ReceiverConfig;
use crate::error::ProtocolError;
use crate::storage::{PayloadSink, TransferOutcome};

const KEY_OPEN: u8 = b'[';
const KEY_CLOSE: u8 = b']';
const VALUE_OPEN: u8 = b'<';
const VALUE_CLOSE: u8 = b'>';

const FILENAME_KEY: &[u8] = b"FILENAME";
const FILESIZE_KEY: &[u8] = b"FILESIZE";

/// Counters over the lifetime of a session.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionStats {
    /// Transfers written completely.
    pub stored: u64,
    /// Transfers thrown away because the file already existed.
    pub dropped: u64,
    /// Transfers thrown away because the destination could not be opened.
    pub unstored: u64,
    /// Transfers whose file is shorter than the payload.
    pub truncated: u64,
    /// Transfers cut off by a timeout or a channel fault.
    pub aborted: u64,
    /// Protocol violations that triggered discarding.
    pub protocol_errors: u64,
}

impl SessionStats {
    fn record(&mut self, outcome: TransferOutcome) {
        match outcome {
            TransferOutcome::Stored => self.stored += 1,
            TransferOutcome::Dropped => self.dropped += 1,
            TransferOutcome::Unstored => self.unstored += 1,
            TransferOutcome::Truncated => self.truncated += 1,
        }
    }
}

/// Metadata gathered from the fields of the current message.
#[derive(Debug, Default)]
struct Metadata {
    file_name: Option<String>,
    file_size: Option<u64>,
}

struct PayloadTransfer {
    sink: PayloadSink,
    declared: u64,
    received: u64,
}

impl PayloadTransfer {
    fn remaining(&self) -> u64 {
        self.declared - self.received
    }

    fn is_complete(&self) -> bool {
        self.received >= self.declared
    }

    /// Consume as much of `bytes` as the payload still needs and return the
    /// number of bytes taken.
    fn consume(&mut self, bytes: &[u8]) -> usize {
        let take = usize::try_from(self.remaining())
            .unwrap_or(usize::MAX)
            .min(bytes.len());
        self.sink.write(&bytes[..take]);
        self.received += take as u64;
        take
    }
}

enum Phase {
    /// Waiting for the `[` that opens a message.
    Idle,
    /// Collecting a key name up to `]`.
    Key,
    /// Reading the `<value>` of FILENAME.
    FileName { opened: bool },
    /// Reading the `<value>` of FILESIZE.
    FileSize { opened: bool },
    /// Skipping the value of an unrecognised key.
    UnknownValue,
    /// After a value: another `[KEY]` or the first payload byte.
    NextField,
    /// Streaming the payload to storage.
    Payload(PayloadTransfer),
    /// Ignoring everything until the line goes quiet.
    Discarding { discarded: u64 },
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Key => "key",
            Phase::FileName { .. } => "file-name",
            Phase::FileSize { .. } => "file-size",
            Phase::UnknownValue => "unknown-value",
            Phase::NextField => "next-field",
            Phase::Payload(_) => "payload",
            Phase::Discarding { .. } => "discarding",
        }
    }
}

enum Key {
    FileName,
    FileSize,
    Unknown(String),
}

impl Key {
    fn classify(text: &[u8]) -> Self {
        match text {
            FILENAME_KEY => Key::FileName,
            FILESIZE_KEY => Key::FileSize,
            other => Key::Unknown(String::from_utf8_lossy(other).into_owned()),
        }
    }
}

/// Protocol state machine for one serial line.
///
/// Feed it every [`ReadEvent`] produced by the frame reader. Between events it
/// reports how many bytes it wants next ([`Session::next_read_len`]) and how
/// long to wait for them ([`Session::timeout`]).
pub struct Session {
    config: ReceiverConfig,
    phase: Phase,
    field: FieldBuffer,
    metadata: Metadata,
    stats: SessionStats,
}

impl Session {
    pub fn new(config: ReceiverConfig) -> Self {
        Self {
            config,
            phase: Phase::Idle,
            field: FieldBuffer::new(),
            metadata: Metadata::default(),
            stats: SessionStats::default(),
        }
    }

    pub fn config(&self) -> &ReceiverConfig {
        &self.config
    }

    pub fn stats(&self) -> &SessionStats {
        &self.stats
    }

    /// True while no message is in progress.
    pub fn is_idle(&self) -> bool {
        matches!(self.phase, Phase::Idle)
    }

    /// Short name of the current phase, for diagnostics.
    pub fn phase_name(&self) -> &'static str {
        self.phase.name()
    }

    /// How long to wait for the next byte. `None` while idle.
    pub fn timeout(&self) -> Option<Duration> {
        match self.phase {
            Phase::Idle => None,
            _ => Some(self.config.message_timeout),
        }
    }

    /// Number of bytes to request from the channel next.
    pub fn next_read_len(&self) -> usize {
        match &self.phase {
            Phase::Payload(transfer) => usize::try_from(transfer.remaining())
                .unwrap_or(usize::MAX)
                .min(CHUNK_CAPACITY),
            Phase::Discarding { .. } => CHUNK_CAPACITY,
            _ => 1,
        }
    }

    pub fn handle(&mut self, event: ReadEvent<'_>) {
        match event {
            ReadEvent::Data(bytes) => self.feed(bytes),
            ReadEvent::Timeout => self.on_timeout(),
        }
    }

    /// Process bytes received from the channel.
    ///
    /// Chunks may split or join protocol elements arbitrarily.
    pub fn feed(&mut self, mut bytes: &[u8]) {
        while !bytes.is_empty() {
            match &mut self.phase {
                Phase::Payload(transfer) => {
                    let taken = transfer.consume(bytes);
                    bytes = &bytes[taken..];
                    self.finish_if_complete();
                }
                Phase::Discarding { discarded } => {
                    if *discarded == 0 {
                        warn!("start discarding received data until the no-data timeout expires");
                    }
                    *discarded += bytes.len() as u64;
                    return;
                }
                _ => {
                    self.on_byte(bytes[0]);
                    bytes = &bytes[1..];
                }
            }
        }
    }

    /// The line stayed quiet for the whole timeout.
    ///
    /// Resets to idle from any phase.
    pub fn on_timeout(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle => {}
            Phase::Discarding { discarded } => {
                info!(
                    discarded_bytes = discarded,
                    "discarding of received data stopped, ready to receive the next file"
                );
            }
            Phase::Payload(transfer) => {
                error!(
                    file_name = %transfer.sink.file_name(),
                    path = %transfer.sink.path().display(),
                    received = transfer.received,
                    declared = transfer.declared,
                    "timeout, data reception not completed"
                );
                self.stats.aborted += 1;
            }
            phase => {
                error!(phase = phase.name(), "timeout, data reception not completed");
                self.stats.aborted += 1;
            }
        }
        self.reset();
    }

    /// Release everything owned by the current message after a channel fault.
    pub fn abort(&mut self) {
        match std::mem::replace(&mut self.phase, Phase::Idle) {
            Phase::Idle | Phase::Discarding { .. } => {}
            Phase::Payload(transfer) => {
                error!(
                    file_name = %transfer.sink.file_name(),
                    path = %transfer.sink.path().display(),
                    received = transfer.received,
                    declared = transfer.declared,
                    "reception aborted"
                );
                self.stats.aborted += 1;
            }
            phase => {
                error!(phase = phase.name(), "reception aborted");
                self.stats.aborted += 1;
            }
        }
        self.reset();
    }

    fn reset(&mut self) {
        self.phase = Phase::Idle;
        self.field.clear();
        self.metadata = Metadata::default();
    }

    fn on_byte(&mut self, byte: u8) {
        let result = match self.phase {
            Phase::Idle => self.on_idle(byte),
            Phase::Key => self.on_key(byte),
            Phase::FileName { opened } => self.on_file_name(byte, opened),
            Phase::FileSize { opened } => self.on_file_size(byte, opened),
            Phase::UnknownValue => {
                if byte == VALUE_CLOSE {
                    self.phase = Phase::NextField;
                }
                Ok(())
            }
            Phase::NextField => self.on_next_field(byte),
            Phase::Payload(_) | Phase::Discarding { .. } => Ok(()),
        };

        if let Err(err) = result {
            error!(%err, phase = self.phase.name(), "protocol violation");
            self.stats.protocol_errors += 1;
            self.start_discarding();
        }
    }

    fn on_idle(&mut self, byte: u8) -> Result<(), ProtocolError> {
        if byte != KEY_OPEN {
            // A stray byte does not invalidate the session.
            error!(err = %ProtocolError::UnexpectedByte(byte), "ignoring byte");
            return Ok(());
        }
        info!("start receiving");
        self.enter_key();
        Ok(())
    }

    fn on_key(&mut self, byte: u8) -> Result<(), ProtocolError> {
        if byte != KEY_CLOSE {
            return self
                .field
                .push(byte)
                .map_err(|_| ProtocolError::KeyTooLong);
        }

        match Key::classify(self.field.as_bytes()) {
            Key::FileName => {
                if let Some(previous) = self.metadata.file_name.take() {
                    warn!(%previous, "received FILENAME key again, previous file name discarded");
                    self.metadata.file_size = None;
                }
                self.phase = Phase::FileName { opened: false };
            }
            Key::FileSize => {
                if self.metadata.file_name.is_none() {
                    return Err(ProtocolError::FileSizeBeforeFileName);
                }
                if self.metadata.file_size.is_some() {
                    return Err(ProtocolError::DuplicateFileSize);
                }
                self.phase = Phase::FileSize { opened: false };
            }
            Key::Unknown(key) => {
                debug!(%key, "received unknown key");
                self.phase = Phase::UnknownValue;
            }
        }
        self.field.clear();
        Ok(())
    }

    fn on_file_name(&mut self, byte: u8, opened: bool) -> Result<(), ProtocolError> {
        if !opened {
            return self.open_value("FILENAME", byte, Phase::FileName { opened: true });
        }
        if byte != VALUE_CLOSE {
            return self
                .field
                .push(byte)
                .map_err(|_| ProtocolError::FileNameTooLong);
        }

        let file_name = validate_file_name(self.field.as_bytes())?;
        debug!(%file_name, "received FILENAME");
        self.metadata.file_name = Some(file_name);
        self.field.clear();
        self.phase = Phase::NextField;
        Ok(())
    }

    fn on_file_size(&mut self, byte: u8, opened: bool) -> Result<(), ProtocolError> {
        if !opened {
            return self.open_value("FILESIZE", byte, Phase::FileSize { opened: true });
        }
        if byte != VALUE_CLOSE {
            return self
                .field
                .push(byte)
                .map_err(|_| ProtocolError::FileSizeTooLong);
        }

        let file_size = parse_file_size(self.field.as_bytes())?;
        debug!(file_size, "received FILESIZE");
        self.metadata.file_size = Some(file_size);
        self.field.clear();
        self.phase = Phase::NextField;
        Ok(())
    }

    fn open_value(&mut self, key: &'static str, byte: u8, next: Phase) -> Result<(), ProtocolError> {
        if byte != VALUE_OPEN {
            return Err(ProtocolError::MissingValueOpen { key, found: byte });
        }
        self.phase = next;
        Ok(())
    }

    fn on_next_field(&mut self, byte: u8) -> Result<(), ProtocolError> {
        if byte == KEY_OPEN {
            self.enter_key();
            return Ok(());
        }

        let Some(declared) = self.metadata.file_size else {
            return Err(ProtocolError::MissingFileSize);
        };
        // A size is only accepted after a name.
        let Some(file_name) = self.metadata.file_name.take() else {
            return Err(ProtocolError::MissingFileSize);
        };

        let path = self.config.storage_path(&file_name);
        info!(%file_name, path = %path.display(), size = declared, "receiving file content");
        let sink = PayloadSink::open(file_name, path, self.config.policy);

        let mut transfer = PayloadTransfer {
            sink,
            declared,
            received: 0,
        };
        transfer.consume(&[byte]);
        self.phase = Phase::Payload(transfer);
        self.finish_if_complete();
        Ok(())
    }

    fn finish_if_complete(&mut self) {
        if !matches!(&self.phase, Phase::Payload(transfer) if transfer.is_complete()) {
            return;
        }
        if let Phase::Payload(transfer) = std::mem::replace(&mut self.phase, Phase::Idle) {
            let outcome = transfer.sink.finish();
            self.stats.record(outcome);
        }
        self.reset();
    }

    fn enter_key(&mut self) {
        self.field.clear();
        self.phase = Phase::Key;
    }

    fn start_discarding(&mut self) {
        self.field.clear();
        self.phase = Phase::Discarding { discarded: 0 };
    }
}

fn validate_file_name(text: &[u8]) -> Result<String, ProtocolError> {
    if text.is_empty() {
        return Err(ProtocolError::EmptyFileName);
    }
    if !text.iter().all(|&b| b.is_ascii_alphanumeric() || b == b'.') {
        return Err(ProtocolError::ForbiddenFileNameChars(
            String::from_utf8_lossy(text).into_owned(),
        ));
    }
    Ok(String::from_utf8_lossy(text).into_owned())
}

/// Parse a declared payload size in `1..=u64::MAX`.
///
/// Leading whitespace and one `+` sign are accepted before the digits.
fn parse_file_size(text: &[u8]) -> Result<u64, ProtocolError> {
    let shown = || String::from_utf8_lossy(text).into_owned();
    let start = text
        .iter()
        .position(|&b| !is_c_space(b))
        .unwrap_or(text.len());
    let unsigned = &text[start..];
    let digits = unsigned.strip_prefix(b"+").unwrap_or(unsigned);
    if digits.is_empty() || !digits.iter().all(u8::is_ascii_digit) {
        return Err(ProtocolError::InvalidFileSize(shown()));
    }

    let size = std::str::from_utf8(digits)
        .ok()
        .and_then(|digits| digits.parse::<u64>().ok())
        .ok_or_else(|| ProtocolError::FileSizeOutOfRange(shown()))?;
    if size == 0 {
        return Err(ProtocolError::ZeroFileSize);
    }
    Ok(size)
}

/// Whitespace as the C locale defines it, vertical tab included.
fn is_c_space(byte: u8) -> bool {
    byte.is_ascii_whitespace() || byte == 0x0b
}
