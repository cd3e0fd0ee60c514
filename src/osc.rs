//! Minimal OSC 1.0 codec.
//!
//! Only what the bridge needs: plain messages with `i f s b T F d h`
//! arguments, and bundles, which are flattened since the bridge has no
//! notion of time tags.
//!
//! ```text
//! "/strip/fader\0\0\0\0"  ",if\0"  00 00 00 03  3f 00 00 00
//!  address (padded)      tags     int32 3      float32 0.5
//! ```
//!
//! Every string and blob is padded with NULs to a multiple of four bytes.

use crate::error::OscError;
use crate::{Message, Value};

const BUNDLE_TAG: &[u8] = b"#bundle\0";

/// Decode a datagram into its messages. A plain message yields one entry.
pub fn decode(packet: &[u8]) -> Result<Vec<Message>, OscError> {
    let mut out = Vec::new();
    decode_into(packet, &mut out)?;
    Ok(out)
}

fn decode_into(packet: &[u8], out: &mut Vec<Message>) -> Result<(), OscError> {
    if packet.starts_with(BUNDLE_TAG) {
        // Skip the 8 byte time tag.
        let mut reader = Reader { buf: packet, pos: BUNDLE_TAG.len() + 8 };
        if reader.pos > packet.len() {
            return Err(OscError::Truncated { offset: packet.len() });
        }
        while reader.pos < packet.len() {
            let size = reader.i32()?;
            let size = usize::try_from(size).map_err(|_| OscError::Truncated { offset: reader.pos })?;
            let element = reader.take(size)?;
            decode_into(element, out)?;
        }
        return Ok(());
    }
    out.push(decode_message(packet)?);
    Ok(())
}

fn decode_message(packet: &[u8]) -> Result<Message, OscError> {
    let mut reader = Reader { buf: packet, pos: 0 };
    let address = reader.string()?;
    if !address.starts_with('/') {
        return Err(OscError::BadAddress { address });
    }

    // Some senders omit the type tag string for argument-less messages.
    if reader.pos >= packet.len() {
        return Ok(Message::new(address, Vec::new()));
    }
    let tags = reader.string()?;
    let Some(tags) = tags.strip_prefix(',') else { return Err(OscError::MissingTypeTags) };

    let mut args = Vec::with_capacity(tags.len());
    for tag in tags.chars() {
        let value = match tag {
            'i' => Value::Int(i64::from(reader.i32()?)),
            'h' => Value::Int(i64::from_be_bytes(reader.array()?)),
            'f' => Value::Float(f64::from(f32::from_be_bytes(reader.array()?))),
            'd' => Value::Float(f64::from_be_bytes(reader.array()?)),
            's' => Value::Str(reader.string()?),
            'b' => {
                let len = usize::try_from(reader.i32()?).map_err(|_| OscError::Truncated { offset: reader.pos })?;
                let blob = reader.take(len)?.to_vec();
                reader.align()?;
                Value::Blob(blob)
            }
            'T' => Value::Bool(true),
            'F' => Value::Bool(false),
            other => return Err(OscError::UnsupportedType { tag: other }),
        };
        args.push(value);
    }
    Ok(Message::new(address, args))
}

struct Reader<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    fn take(&mut self, len: usize) -> Result<&'a [u8], OscError> {
        let end = self.pos.checked_add(len).filter(|&end| end <= self.buf.len());
        let Some(end) = end else { return Err(OscError::Truncated { offset: self.pos }) };
        let slice = &self.buf[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    fn array<const N: usize>(&mut self) -> Result<[u8; N], OscError> {
        let offset = self.pos;
        self.take(N)?.try_into().map_err(|_| OscError::Truncated { offset })
    }

    fn i32(&mut self) -> Result<i32, OscError> {
        Ok(i32::from_be_bytes(self.array()?))
    }

    fn align(&mut self) -> Result<(), OscError> {
        let pad = (4 - self.pos % 4) % 4;
        self.take(pad).map(|_| ())
    }

    fn string(&mut self) -> Result<String, OscError> {
        let start = self.pos;
        let rest = self.buf.get(start..).unwrap_or_default();
        let Some(nul) = rest.iter().position(|&b| b == 0) else { return Err(OscError::Truncated { offset: start }) };
        let text = std::str::from_utf8(&rest[..nul]).map_err(|_| OscError::BadString { offset: start })?.to_string();
        // The terminator plus padding always ends on a 4-byte boundary.
        self.take((nul / 4 + 1) * 4)?;
        Ok(text)
    }
}

/// Encode one message.
pub fn encode(message: &Message) -> Vec<u8> {
    let mut tags = String::from(",");
    let mut payload = Vec::new();
    for arg in &message.args {
        match arg {
            Value::Int(v) => match i32::try_from(*v) {
                Ok(small) => {
                    tags.push('i');
                    payload.extend_from_slice(&small.to_be_bytes());
                }
                Err(_) => {
                    tags.push('h');
                    payload.extend_from_slice(&v.to_be_bytes());
                }
            },
            Value::Float(v) => {
                tags.push('f');
                payload.extend_from_slice(&(*v as f32).to_be_bytes());
            }
            Value::Str(s) => {
                tags.push('s');
                push_string(&mut payload, s);
            }
            Value::Blob(b) => {
                tags.push('b');
                payload.extend_from_slice(&(b.len() as i32).to_be_bytes());
                payload.extend_from_slice(b);
                pad(&mut payload);
            }
            Value::Bool(true) => tags.push('T'),
            Value::Bool(false) => tags.push('F'),
        }
    }

    let mut out = Vec::with_capacity(message.address.len() + tags.len() + payload.len() + 8);
    push_string(&mut out, &message.address);
    push_string(&mut out, &tags);
    out.extend_from_slice(&payload);
    out
}

fn push_string(buf: &mut Vec<u8>, s: &str) {
    buf.extend_from_slice(s.as_bytes());
    buf.push(0);
    pad(buf);
}

fn pad(buf: &mut Vec<u8>) {
    while buf.len() % 4 != 0 {
        buf.push(0);
    }
}
