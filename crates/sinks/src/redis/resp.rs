//! Minimal RESP2 codec
//!
//! Commands are arrays of bulk strings:
//!
//! ```text
//! *3\r\n$5\r\nRPUSH\r\n$4\r\nlogs\r\n$5\r\nhello\r\n
//! ```
//!
//! Only the reply types a write-only client can receive are decoded:
//! simple strings, errors, integers and bulk strings.

use bytes::{BufMut, Bytes, BytesMut};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncReadExt};

use crate::SinkError;

/// Longest header line accepted from the server
const MAX_LINE: usize = 64 * 1024;

/// Largest bulk reply accepted, matching Redis' own `proto-max-bulk-len`
const MAX_BULK: usize = 512 * 1024 * 1024;

/// A decoded server reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    /// `+OK`
    Simple(String),
    /// `-ERR message`
    Error(String),
    /// `:42`
    Integer(i64),
    /// `$n` payload, `None` for `$-1`
    Bulk(Option<Bytes>),
}

/// Encode a command as an array of bulk strings
pub fn encode_command<A: AsRef<[u8]>>(args: &[A], buf: &mut BytesMut) {
    let payload: usize = args.iter().map(|a| a.as_ref().len()).sum();
    buf.reserve(16 + payload + args.len() * 16);

    put_header(buf, b'*', args.len());
    for arg in args {
        let arg = arg.as_ref();
        put_header(buf, b'$', arg.len());
        buf.put_slice(arg);
        buf.put_slice(b"\r\n");
    }
}

fn put_header(buf: &mut BytesMut, prefix: u8, len: usize) {
    buf.put_u8(prefix);
    buf.put_slice(len.to_string().as_bytes());
    buf.put_slice(b"\r\n");
}

/// Read a single reply
///
/// # Errors
///
/// `SinkError::Closed` on EOF, `SinkError::Protocol` on malformed or
/// unsupported replies, `SinkError::Io` on read failures.
pub async fn read_reply<R>(reader: &mut R) -> Result<Reply, SinkError>
where
    R: AsyncBufRead + Unpin,
{
    let line = read_line(reader).await?;
    let (&kind, rest) = line
        .split_first()
        .ok_or_else(|| SinkError::protocol("empty reply line"))?;
    let text = std::str::from_utf8(rest)
        .map_err(|_| SinkError::protocol("reply header is not UTF-8"))?;

    match kind {
        b'+' => Ok(Reply::Simple(text.to_string())),
        b'-' => Ok(Reply::Error(text.to_string())),
        b':' => text
            .parse()
            .map(Reply::Integer)
            .map_err(|_| SinkError::protocol(format!("invalid integer reply: {text}"))),
        b'$' => {
            let len: i64 = text
                .parse()
                .map_err(|_| SinkError::protocol(format!("invalid bulk length: {text}")))?;
            if len < 0 {
                return Ok(Reply::Bulk(None));
            }
            let len = usize::try_from(len)
                .ok()
                .filter(|&len| len <= MAX_BULK)
                .ok_or_else(|| SinkError::protocol(format!("bulk reply too large: {len}")))?;

            let mut data = vec![0u8; len + 2];
            read_exact(reader, &mut data).await?;
            if !data.ends_with(b"\r\n") {
                return Err(SinkError::protocol("bulk reply missing terminator"));
            }
            data.truncate(len);
            Ok(Reply::Bulk(Some(Bytes::from(data))))
        }
        other => Err(SinkError::protocol(format!(
            "unsupported reply type '{}'",
            other as char
        ))),
    }
}

async fn read_line<R>(reader: &mut R) -> Result<Vec<u8>, SinkError>
where
    R: AsyncBufRead + Unpin,
{
    let mut line = Vec::new();
    let n = reader
        .take(MAX_LINE as u64)
        .read_until(b'\n', &mut line)
        .await?;

    if n == 0 {
        return Err(SinkError::Closed);
    }
    if !line.ends_with(b"\r\n") {
        return Err(SinkError::protocol("reply line missing terminator"));
    }

    line.truncate(line.len() - 2);
    Ok(line)
}

async fn read_exact<R>(reader: &mut R, buf: &mut [u8]) -> Result<(), SinkError>
where
    R: AsyncBufRead + Unpin,
{
    match reader.read_exact(buf).await {
        Ok(_) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::UnexpectedEof => Err(SinkError::Closed),
        Err(e) => Err(SinkError::Io(e)),
    }
}
