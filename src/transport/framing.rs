use futures::StreamExt;
use std::io;
use tokio::io::AsyncRead;
use tokio_util::codec::{FramedRead, LengthDelimitedCodec};

/// Reads the single message a peer sends on a fresh connection. Returns `Ok(None)` if the peer
/// closed the connection without sending anything.
pub(crate) async fn read_message<R>(reader: R) -> Result<Option<String>, io::Error>
where
    R: AsyncRead + Unpin,
{
    let mut frames = FramedRead::new(reader, LengthDelimitedCodec::new());

    match frames.next().await {
        Some(frame) => {
            let frame = frame?;
            String::from_utf8(frame.to_vec())
                .map(Some)
                .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
        }
        None => Ok(None),
    }
}
