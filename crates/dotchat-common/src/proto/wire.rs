//! Encoder and decoder for the wire format.
//!
//! Decode mirrors encode exactly. The bytestream hands over bytes
//! verbatim; every byte-order decision is made here, so integers of 16
//! bits and up are byte-swapped on little-endian hosts.

use super::message::Message;
use super::value::{Tag, Value, ValueList, ValueMap};
use super::{MAGIC, MAX_SHORT_LEN, PROTOCOL_MAJOR, PROTOCOL_MINOR};
use crate::bytestream::ByteStream;
use crate::error::{ChatError, Result};

/// Encode a full message, magic number and version included, appending to
/// `out`.
///
/// Fails with [`ChatError::MessageTooBig`] when the command, a key, a
/// string value or a map entry count exceeds the one-byte length the format
/// allows; `out` must be considered poisoned in that case.
pub fn encode(msg: &Message, out: &mut ByteStream) -> Result<()> {
    out.write(&MAGIC);
    out.write(&[PROTOCOL_MAJOR, PROTOCOL_MINOR]);
    put_str(msg.command(), "command", out)?;
    put_map(msg.args(), out)
}

/// Decode one message starting at the stream cursor.
///
/// On success the cursor sits just past the message, so back-to-back
/// messages in one stream decode in sequence. [`ChatError::Truncated`]
/// means the stream holds a prefix of a valid message; callers feeding from
/// a live transport treat it as "read more bytes and retry".
pub fn decode(stream: &mut ByteStream) -> Result<Message> {
    let magic = stream.extract::<2>().ok_or(ChatError::Truncated)?;
    if magic != MAGIC {
        return Err(ChatError::BadFraming);
    }

    let [major, minor] = stream.extract::<2>().ok_or(ChatError::Truncated)?;
    if major > PROTOCOL_MAJOR || (major == PROTOCOL_MAJOR && minor > PROTOCOL_MINOR) {
        return Err(ChatError::IncompatibleVersion { major, minor });
    }

    let command = take_str(stream)?;
    let args = take_map(stream)?;
    Ok(Message::with_args(command, args))
}

fn put_str(s: &str, what: &str, out: &mut ByteStream) -> Result<()> {
    if s.len() > MAX_SHORT_LEN {
        return Err(ChatError::MessageTooBig(format!(
            "{what} of {} bytes exceeds {MAX_SHORT_LEN}",
            s.len()
        )));
    }
    out.write(&[s.len() as u8]);
    out.write(s.as_bytes());
    Ok(())
}

fn put_map(map: &ValueMap, out: &mut ByteStream) -> Result<()> {
    if map.len() > MAX_SHORT_LEN {
        return Err(ChatError::MessageTooBig(format!(
            "map of {} entries exceeds {MAX_SHORT_LEN}",
            map.len()
        )));
    }
    out.write(&[map.len() as u8]);
    for (key, value) in map.iter() {
        put_str(key, "key", out)?;
        out.write(&[value.tag() as u8]);
        put_value(value, out)?;
    }
    Ok(())
}

fn put_value(value: &Value, out: &mut ByteStream) -> Result<()> {
    match value {
        Value::Int8(v) => out.write(&v.to_be_bytes()),
        Value::Int16(v) => out.write(&v.to_be_bytes()),
        Value::Int32(v) => out.write(&v.to_be_bytes()),
        Value::UInt8(v) => out.write(&v.to_be_bytes()),
        Value::UInt16(v) => out.write(&v.to_be_bytes()),
        Value::UInt32(v) => out.write(&v.to_be_bytes()),
        Value::Char(c) => out.write(&[*c]),
        Value::Str(s) => put_str(s, "string value", out)?,
        Value::Object(map) => put_map(map, out)?,
        Value::List(list) => {
            // element tag once up front; element bodies don't repeat it
            out.write(&[list.elem_tag() as u8]);
            out.write(&(list.len() as u32).to_be_bytes());
            for item in list.iter() {
                put_value(item, out)?;
            }
        }
    }
    Ok(())
}

fn take_str(stream: &mut ByteStream) -> Result<String> {
    let [len] = stream.extract::<1>().ok_or(ChatError::Truncated)?;
    let mut buf = vec![0u8; len as usize];
    if stream.read(&mut buf) != len as usize {
        return Err(ChatError::Truncated);
    }
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

fn take_map(stream: &mut ByteStream) -> Result<ValueMap> {
    let [count] = stream.extract::<1>().ok_or(ChatError::Truncated)?;
    let mut map = ValueMap::new();
    for _ in 0..count {
        let key = take_str(stream)?;
        let [raw_tag] = stream.extract::<1>().ok_or(ChatError::Truncated)?;
        let tag = Tag::try_from(raw_tag)?;
        let value = take_value(tag, stream)?;
        // duplicate keys on the wire: last write wins
        map.set(key, value);
    }
    Ok(map)
}

fn take_value(tag: Tag, stream: &mut ByteStream) -> Result<Value> {
    Ok(match tag {
        Tag::Int8 => Value::Int8(i8::from_be_bytes(
            stream.extract::<1>().ok_or(ChatError::Truncated)?,
        )),
        Tag::Int16 => Value::Int16(i16::from_be_bytes(
            stream.extract::<2>().ok_or(ChatError::Truncated)?,
        )),
        Tag::Int32 => Value::Int32(i32::from_be_bytes(
            stream.extract::<4>().ok_or(ChatError::Truncated)?,
        )),
        Tag::UInt8 => Value::UInt8(u8::from_be_bytes(
            stream.extract::<1>().ok_or(ChatError::Truncated)?,
        )),
        Tag::UInt16 => Value::UInt16(u16::from_be_bytes(
            stream.extract::<2>().ok_or(ChatError::Truncated)?,
        )),
        Tag::UInt32 => Value::UInt32(u32::from_be_bytes(
            stream.extract::<4>().ok_or(ChatError::Truncated)?,
        )),
        Tag::Char => {
            let [c] = stream.extract::<1>().ok_or(ChatError::Truncated)?;
            Value::Char(c)
        }
        Tag::Str => Value::Str(take_str(stream)?),
        Tag::Object => Value::Object(take_map(stream)?),
        Tag::List => {
            let [raw_elem] = stream.extract::<1>().ok_or(ChatError::Truncated)?;
            let elem = Tag::try_from(raw_elem)?;
            let count = u32::from_be_bytes(stream.extract::<4>().ok_or(ChatError::Truncated)?);
            let mut list = ValueList::new(elem);
            for _ in 0..count {
                list.push(take_value(elem, stream)?)?;
            }
            Value::List(list)
        }
    })
}
