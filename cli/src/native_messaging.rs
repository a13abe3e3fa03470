//! Native-messaging host loop.
//!
//! Each frame is a 32-bit length in native byte order followed by that many bytes of UTF-8 JSON.
//! Requests are answered one at a time, in order, with exactly one response each.
//!
//! The browser starts `texty bridge` through a native-messaging host manifest shipped with the
//! extension. The extension's background worker forwards each `makeApiCall` message from the page
//! overlay with `chrome.runtime.sendNativeMessage` and returns this loop's reply as the
//! `sendMessage` response.

use std::io::ErrorKind;

use anyhow::Context;
use texty_protocol::BridgeRequest;
use texty_protocol::BridgeResponse;
use tokio::io::AsyncRead;
use tokio::io::AsyncReadExt;
use tokio::io::AsyncWrite;
use tokio::io::AsyncWriteExt;

use crate::completion_client::CompletionCaller;

/// Largest message the browser accepts from a native host.
pub const MAX_OUTGOING_MESSAGE_BYTES: usize = 1024 * 1024;
/// Largest message the browser sends to a native host.
pub const MAX_INCOMING_MESSAGE_BYTES: usize = 64 * 1024 * 1024;

/// Reads one frame. Returns `None` when the peer closed the stream between frames.
pub async fn read_message<R: AsyncRead + Unpin>(reader: &mut R) -> anyhow::Result<Option<Vec<u8>>> {
    let mut header = [0u8; 4];
    match reader.read_exact(&mut header).await {
        Ok(_) => {}
        Err(err) if err.kind() == ErrorKind::UnexpectedEof => return Ok(None),
        Err(err) => return Err(anyhow::Error::new(err).context("read message length")),
    }

    let len = u32::from_ne_bytes(header) as usize;
    if len > MAX_INCOMING_MESSAGE_BYTES {
        anyhow::bail!("incoming message of {len} bytes exceeds {MAX_INCOMING_MESSAGE_BYTES}");
    }
    let mut body = vec![0u8; len];
    reader
        .read_exact(&mut body)
        .await
        .with_context(|| format!("read {len}-byte message body"))?;
    Ok(Some(body))
}

pub async fn write_message<W: AsyncWrite + Unpin>(writer: &mut W, body: &[u8]) -> anyhow::Result<()> {
    if body.len() > MAX_OUTGOING_MESSAGE_BYTES {
        anyhow::bail!(
            "outgoing message of {} bytes exceeds {MAX_OUTGOING_MESSAGE_BYTES}",
            body.len()
        );
    }
    let len = u32::try_from(body.len()).context("message length overflows u32")?;
    writer
        .write_all(&len.to_ne_bytes())
        .await
        .context("write message length")?;
    writer.write_all(body).await.context("write message body")?;
    writer.flush().await.context("flush message")?;
    Ok(())
}

async fn respond_to<C: CompletionCaller>(caller: &C, frame: &[u8]) -> BridgeResponse {
    match BridgeRequest::parse(frame) {
        Ok(BridgeRequest::MakeApiCall(call)) => caller.call(&call).await,
        Err(err) => {
            tracing::warn!("rejecting bridge message: {err}");
            BridgeResponse::err(err.to_string())
        }
    }
}

fn encode_response(response: &BridgeResponse) -> anyhow::Result<Vec<u8>> {
    let encoded = serde_json::to_vec(response).context("encode bridge response")?;
    if encoded.len() <= MAX_OUTGOING_MESSAGE_BYTES {
        return Ok(encoded);
    }
    tracing::warn!(
        bytes = encoded.len(),
        "bridge response too large for native messaging"
    );
    serde_json::to_vec(&BridgeResponse::err(format!(
        "response of {} bytes exceeds the native messaging limit",
        encoded.len()
    )))
    .context("encode bridge error response")
}

/// Serves requests until the peer closes the stream.
pub async fn serve<R, W, C>(reader: &mut R, writer: &mut W, caller: &C) -> anyhow::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
    C: CompletionCaller,
{
    while let Some(frame) = read_message(reader).await? {
        let response = respond_to(caller, &frame).await;
        let encoded = encode_response(&response)?;
        write_message(writer, &encoded).await?;
    }
    tracing::debug!("native messaging peer closed the stream");
    Ok(())
}
