use std::convert::Infallible;

use cyflowrec_frame::FrameReader;
use cyflowrec_transport::ByteChannel;
use tracing::{error, info};

use crate::config::ReceiverConfig;
use crate::error::{ReceiveError, Result};
use crate::session::Session;

/// Drives a [`Session`] from a channel until the channel fails.
pub struct Receiver<T> {
    reader: FrameReader<T>,
    session: Session,
}

impl<T: ByteChannel> Receiver<T> {
    pub fn new(channel: T, config: ReceiverConfig) -> Self {
        Self {
            reader: FrameReader::new(channel),
            session: Session::new(config),
        }
    }

    /// Receive files until polling or reading the channel fails.
    ///
    /// Only returns on failure. Before the error is returned, the transfer
    /// in progress is aborted and its file closed.
    pub fn run(&mut self) -> Result<Infallible> {
        info!(
            storage_root = %self.session.config().storage_root.display(),
            "ready to receive files"
        );
        loop {
            self.step()?;
        }
    }

    /// Perform one poll cycle and feed the resulting event to the session.
    pub fn step(&mut self) -> Result<()> {
        let len = self.session.next_read_len();
        let timeout = self.session.timeout();

        match self.reader.poll_read(len, timeout) {
            Ok(event) => {
                self.session.handle(event);
                Ok(())
            }
            Err(err) => {
                error!(%err, "cannot read serial device");
                self.session.abort();
                Err(ReceiveError::Channel(err))
            }
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    /// Borrow the underlying channel.
    pub fn channel(&self) -> &T {
        self.reader.get_ref()
    }

    /// Consume the receiver and return the channel.
    pub fn into_inner(self) -> T {
        self.reader.into_inner()
    }
}
