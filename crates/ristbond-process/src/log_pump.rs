//! Line-oriented forwarding of child output to tracing and a per-process file.

use futures::stream::{self, Stream, StreamExt};
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWriteExt, BufReader};
use tokio::task::JoinHandle;

/// Target used for re-emitted child output.
pub const CHILD_TARGET: &str = "ristbond::child";

fn lines<R>(reader: R) -> impl Stream<Item = String>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    stream::unfold(BufReader::new(reader), |mut reader| async move {
        let mut buf = Vec::new();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let line = String::from_utf8_lossy(&buf)
                    .trim_end_matches(['\r', '\n'])
                    .to_string();
                Some((line, reader))
            }
        }
    })
}

/// Spawn the pump for one process. It ends once both streams close.
pub(crate) fn spawn<O, E>(name: String, stdout: O, stderr: E, mut file: File) -> JoinHandle<()>
where
    O: AsyncRead + Unpin + Send + 'static,
    E: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut merged = std::pin::pin!(stream::select(lines(stdout), lines(stderr)));
        let mut file_ok = true;

        while let Some(line) = merged.next().await {
            tracing::info!(target: CHILD_TARGET, process = %name, "{line}");

            if file_ok {
                let written = async {
                    file.write_all(line.as_bytes()).await?;
                    file.write_all(b"\n").await?;
                    file.flush().await
                }
                .await;
                if let Err(e) = written {
                    tracing::warn!("log file for {name} is no longer writable: {e}");
                    file_ok = false;
                }
            }
        }

        let _ = file.flush().await;
        tracing::debug!("log pump for {name} finished");
    })
}
