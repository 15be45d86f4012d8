use std::fs::File;
use std::io::{Error, ErrorKind, Read, Result};
use std::os::fd::{AsFd, AsRawFd, BorrowedFd};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::{trace, warn};

use super::{EdgeTrigger, SignalSource};
use crate::{
    chip::Chip,
    line::{
        event::{EdgeEvent, EdgeKind, Timestamp},
        options::{EdgeDetect, KeyConfig},
        values::Level,
    },
    uapi,
};

/// How often the event reader re-checks for shutdown while the line is quiet.
const READER_TICK: Duration = Duration::from_millis(100);

/// A key wired to a line of a Linux GPIO character device.
///
/// The kernel reports edges on the line's file descriptor; a reader thread
/// forwards each one to the key line's [`EdgeTrigger`].
#[derive(Debug)]
pub struct CdevLine {
    offset: u32,
    line_fd: Arc<File>,
    stop: Arc<AtomicBool>,
    reader: Mutex<Option<JoinHandle<()>>>,
}

impl CdevLine {
    /// Request `offset` on `chip` as an input with the edges and bias of `config`.
    pub fn request(chip: &Chip, offset: u32, config: &KeyConfig) -> crate::errors::Result<Self> {
        let line_fd = chip.request_key_line(offset, config)?;
        Ok(Self {
            offset,
            line_fd: Arc::new(line_fd),
            stop: Arc::new(AtomicBool::new(false)),
            reader: Mutex::new(None),
        })
    }

    pub fn offset(&self) -> u32 {
        self.offset
    }
}

impl SignalSource for CdevLine {
    fn read_level(&self) -> Result<Level> {
        let mut data = uapi::v2::gpio_line_values { bits: 0, mask: 1 };
        let _ = unsafe { uapi::v2::gpio_line_get_values(self.line_fd.as_raw_fd(), &mut data)? };
        Ok(Level::new(data.bits & 1 != 0))
    }

    fn on_edge_notify(&self, edges: EdgeDetect, trigger: EdgeTrigger) -> Result<()> {
        let mut reader = self.reader.lock();
        if reader.is_some() {
            return Err(Error::new(
                ErrorKind::AlreadyExists,
                "line already has an edge subscriber",
            ));
        }

        let line_fd = Arc::clone(&self.line_fd);
        let stop = Arc::clone(&self.stop);
        let offset = self.offset;
        let handle = std::thread::Builder::new()
            .name(format!("gpio-key-edge-{offset}"))
            .spawn(move || {
                if let Err(err) = forward_edges(&line_fd, &stop, edges, &trigger) {
                    warn!(offset, "edge reader stopped: {err}");
                }
            })?;
        *reader = Some(handle);
        Ok(())
    }

    fn release(&self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.reader.lock().take() {
            if handle.join().is_err() {
                warn!(offset = self.offset, "edge reader panicked");
            }
        }
    }
}

impl Drop for CdevLine {
    fn drop(&mut self) {
        self.release();
    }
}

fn forward_edges(
    line_fd: &File,
    stop: &AtomicBool,
    edges: EdgeDetect,
    trigger: &EdgeTrigger,
) -> Result<()> {
    while !stop.load(Ordering::SeqCst) {
        if !wait_for_readable(line_fd.as_fd(), Some(READER_TICK))? {
            continue;
        }

        let Some(event) = read_event(line_fd)? else {
            continue;
        };
        // Edge timestamps come from the kernel's monotonic clock.
        let latency_ns = Timestamp::now()
            .as_nanos()
            .saturating_sub(event.timestamp().as_nanos());
        trace!(
            seqno = event.sequence(),
            kind = ?event.kind(),
            latency_ns,
            "raw edge"
        );

        let wanted = match event.kind() {
            EdgeKind::Rising => matches!(edges, EdgeDetect::Rising | EdgeDetect::Both),
            EdgeKind::Falling => matches!(edges, EdgeDetect::Falling | EdgeDetect::Both),
        };
        if wanted {
            trigger.on_edge();
        }
    }
    Ok(())
}

/// Read one kernel edge record. `Ok(None)` when no complete record was
/// available or the record is not an edge.
fn read_event(mut line_fd: &File) -> Result<Option<EdgeEvent>> {
    let mut buf = [0; uapi::v2::LINE_EVENT_SIZE];
    {
        let mut buf_ptr = &mut buf[..];

        loop {
            match line_fd.read(buf_ptr) {
                Ok(0) => return Ok(None),
                Ok(read) => buf_ptr = &mut std::mem::take(&mut buf_ptr)[read..],
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock) => return Ok(None),
                Err(e) if matches!(e.kind(), ErrorKind::Interrupted) => (),
                Err(e) => return Err(e),
            }

            if buf_ptr.is_empty() {
                break;
            }
        }
    }

    let data = unsafe { uapi::v2::gpio_line_event::from_bytes(buf) };

    let kind = if data.id == uapi::v2::LineEventId::RISING_EDGE {
        EdgeKind::Rising
    } else if data.id == uapi::v2::LineEventId::FALLING_EDGE {
        EdgeKind::Falling
    } else {
        return Ok(None);
    };

    Ok(Some(EdgeEvent::new(
        Timestamp::from_nanos(data.timestamp_ns),
        kind,
        data.line_seqno,
    )))
}

fn wait_for_readable(fd: BorrowedFd<'_>, timeout: Option<Duration>) -> Result<bool> {
    let pollfd = nix::poll::PollFd::new(fd, nix::poll::PollFlags::POLLIN);
    let timeout = timeout
        .map(|t| u16::try_from(t.as_millis()).unwrap_or(u16::MAX))
        .map(nix::poll::PollTimeout::from)
        .unwrap_or(nix::poll::PollTimeout::NONE);

    match nix::poll::poll(&mut [pollfd], timeout) {
        Ok(0) => Ok(false),
        Ok(_) => Ok(true),
        Err(nix::Error::EINTR) => Ok(false),
        Err(err) => Err(err.into()),
    }
}
