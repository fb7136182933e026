//! The request queue: a named pipe (or file, or stdin) with one request per line.

use std::path::Path;

use anyhow::{Context, Result};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncRead};
use tokio::sync::mpsc;

use crate::request::{parse_line, Request};

/// Capacity of the channel between the line reader and the dispatcher. Kept
/// minimal so a full admission gate stalls reading instead of buffering.
pub const INTAKE_CAPACITY: usize = 1;

/// Path that selects stdin instead of a file.
pub const STDIN_PATH: &str = "-";

/// Byte source behind the intake.
pub type Queue = Box<dyn AsyncRead + Send + Unpin>;

pub fn channel() -> (mpsc::Sender<Request>, mpsc::Receiver<Request>) {
    mpsc::channel(INTAKE_CAPACITY)
}

/// Opens the queue for reading.
///
/// The path is opened read-write and created if missing. Holding a write end
/// ourselves means a FIFO never reports EOF when the last external writer
/// goes away; a regular file is read to its end and then closes the intake.
///
/// FIFOs are read through the reactor rather than a blocking thread, so a
/// read waiting on an idle pipe ends when its future is dropped.
pub async fn open_queue(path: &Path) -> Result<Queue> {
    if path == Path::new(STDIN_PATH) {
        return Ok(Box::new(tokio::io::stdin()));
    }
    #[cfg(unix)]
    let fifo = open_fifo(path).await?;
    #[cfg(not(unix))]
    let fifo: Option<Queue> = None;
    if let Some(fifo) = fifo {
        return Ok(fifo);
    }
    let file = tokio::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(path)
        .await
        .with_context(|| format!("open request queue {}", path.display()))?;
    Ok(Box::new(file))
}

#[cfg(unix)]
async fn open_fifo(path: &Path) -> Result<Option<Queue>> {
    use std::os::unix::fs::FileTypeExt;

    match tokio::fs::metadata(path).await {
        Ok(meta) if meta.file_type().is_fifo() => {}
        _ => return Ok(None),
    }
    // O_RDWR on a FIFO does not wait for a peer.
    let file = std::fs::OpenOptions::new()
        .read(true)
        .write(true)
        .open(path)
        .with_context(|| format!("open request queue {}", path.display()))?;
    let receiver = tokio::net::unix::pipe::Receiver::from_file(file)
        .with_context(|| format!("register request queue {}", path.display()))?;
    Ok(Some(Box::new(receiver)))
}

/// Line accounting for one intake run.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct IntakeStats {
    pub lines: u64,
    pub queued: u64,
    pub rejected: u64,
}

/// Reads lines until EOF, queueing every valid request. Malformed lines are
/// logged and skipped; blank lines are ignored. Sending waits while the
/// dispatcher is saturated.
pub async fn feed<R>(mut reader: R, tx: &mpsc::Sender<Request>) -> Result<IntakeStats>
where
    R: AsyncBufRead + Unpin,
{
    let mut stats = IntakeStats::default();
    let mut buf = Vec::new();
    loop {
        buf.clear();
        let n = reader
            .read_until(b'\n', &mut buf)
            .await
            .context("read request queue")?;
        if n == 0 {
            break;
        }
        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }
        stats.lines += 1;

        match parse_line(&line) {
            Ok(request) => {
                tracing::debug!(request = %request, "queued request");
                tx.send(request)
                    .await
                    .map_err(|_| anyhow::anyhow!("dispatcher stopped accepting requests"))?;
                stats.queued += 1;
            }
            Err(e) => {
                stats.rejected += 1;
                tracing::warn!(line = %line.trim(), "error parsing line: {}", e);
            }
        }
    }
    Ok(stats)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Quality;

    #[tokio::test]
    async fn feed_queues_valid_and_skips_bad_lines() {
        let input: &[u8] = b"nodeA https://example.com/a best\n\
            \n\
            nodeB\n\
            nodeC https://example.com/c 4k\n\
            nodeD https://example.com/d bestaudio extra\n\
            nodeE https://example.com/e";
        let (tx, mut rx) = mpsc::channel(16);

        let stats = feed(input, &tx).await.unwrap();
        drop(tx);

        assert_eq!(
            stats,
            IntakeStats {
                lines: 5,
                queued: 2,
                rejected: 3
            }
        );
        let first = rx.recv().await.unwrap();
        assert_eq!(first.destination, "nodeA");
        assert_eq!(first.quality, Quality::Best);
        let second = rx.recv().await.unwrap();
        assert_eq!(second.url, "https://example.com/e");
        assert_eq!(second.quality, Quality::Medium);
        assert!(rx.recv().await.is_none());
    }

    #[tokio::test]
    async fn feed_fails_when_dispatcher_is_gone() {
        let input: &[u8] = b"nodeA https://example.com/a\n";
        let (tx, rx) = mpsc::channel(1);
        drop(rx);
        let err = feed(input, &tx).await.unwrap_err();
        assert!(err.to_string().contains("dispatcher stopped"));
    }

    #[tokio::test]
    async fn open_queue_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("queue");
        let reader = open_queue(&path).await.unwrap();
        assert!(path.exists());

        let (tx, _rx) = mpsc::channel(1);
        let stats = feed(tokio::io::BufReader::new(reader), &tx).await.unwrap();
        assert_eq!(stats, IntakeStats::default());
    }

    #[cfg(unix)]
    fn make_fifo(dir: &Path) -> std::path::PathBuf {
        let path = dir.join("queue.fifo");
        let status = std::process::Command::new("mkfifo")
            .arg(&path)
            .status()
            .unwrap();
        assert!(status.success());
        path
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn fifo_queue_delivers_lines_from_writers() {
        use std::io::Write;

        let dir = tempfile::tempdir().unwrap();
        let path = make_fifo(dir.path());
        let reader = open_queue(&path).await.unwrap();
        let (tx, mut rx) = mpsc::channel(4);
        let feeding = tokio::spawn(async move { feed(tokio::io::BufReader::new(reader), &tx).await });

        // A writer coming and going must not end the intake.
        let mut writer = std::fs::OpenOptions::new().write(true).open(&path).unwrap();
        writer.write_all(b"nodeA https://example.com/a\n").unwrap();
        drop(writer);

        let first = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(first.destination, "nodeA");
        assert!(!feeding.is_finished());
        feeding.abort();
    }

    /// An interrupted intake on an idle FIFO must not keep the runtime alive.
    #[cfg(unix)]
    #[test]
    fn idle_fifo_read_does_not_block_runtime_shutdown() {
        let dir = tempfile::tempdir().unwrap();
        let path = make_fifo(dir.path());

        let (done_tx, done_rx) = std::sync::mpsc::channel();
        let worker = std::thread::spawn(move || {
            let rt = tokio::runtime::Builder::new_multi_thread()
                .enable_all()
                .build()
                .unwrap();
            rt.block_on(async {
                let reader = open_queue(&path).await.unwrap();
                let (tx, _rx) = mpsc::channel(1);
                let interrupted = tokio::time::timeout(
                    std::time::Duration::from_millis(100),
                    feed(tokio::io::BufReader::new(reader), &tx),
                )
                .await;
                assert!(interrupted.is_err(), "idle FIFO should not reach EOF");
            });
            drop(rt);
            done_tx.send(()).unwrap();
        });

        done_rx
            .recv_timeout(std::time::Duration::from_secs(5))
            .expect("runtime shutdown hung on the FIFO read");
        worker.join().unwrap();
    }

    #[tokio::test]
    async fn open_queue_reports_unopenable_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing-dir").join("queue");
        let err = open_queue(&path).await.err().unwrap();
        assert!(format!("{:#}", err).contains("open request queue"));
    }
}
