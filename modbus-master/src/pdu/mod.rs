//! Encoding and decoding of Modbus protocol data units
//!
//! Every PDU starts with its function code byte. Decoding is cursor based:
//! reads are length checked and a short or over-long payload is an error.

use scursor::{ReadCursor, WriteCursor};

use crate::error::{DataError, PduError};

pub(crate) mod display;
mod file;
mod request;
mod response;

pub use request::Request;
pub use response::Response;

/// Encode a request PDU, function code included
pub fn encode_request(request: &Request) -> Result<Vec<u8>, PduError> {
    request.encode()
}

/// Decode a request PDU, function code included
pub fn decode_request(bytes: &[u8]) -> Result<Request, PduError> {
    Request::decode(bytes)
}

/// Encode a response PDU, function code included
pub fn encode_response(response: &Response) -> Result<Vec<u8>, PduError> {
    response.encode()
}

/// Decode a response PDU, function code included
///
/// A function byte with the high bit set decodes as [`Response::Exception`].
pub fn decode_response(bytes: &[u8]) -> Result<Response, PduError> {
    Response::decode(bytes)
}

/// room for the largest PDU the count limits allow, the 253 byte limit is applied when framing
const ENCODE_BUFFER_LENGTH: usize = 264;

pub(crate) fn serialize<F>(write: F) -> Result<Vec<u8>, PduError>
where
    F: FnOnce(&mut WriteCursor) -> Result<(), PduError>,
{
    let mut buffer = [0u8; ENCODE_BUFFER_LENGTH];
    let mut cursor = WriteCursor::new(&mut buffer);
    write(&mut cursor)?;
    let length = cursor.position();
    Ok(buffer[..length].to_vec())
}

pub(crate) fn expect_empty(cursor: &ReadCursor) -> Result<(), DataError> {
    match cursor.remaining() {
        0 => Ok(()),
        count => Err(DataError::TrailingBytes(count)),
    }
}

pub(crate) fn check_count(count: u16, max: u16) -> Result<u16, PduError> {
    if count == 0 || count > max {
        return Err(PduError::IllegalCount(count));
    }
    Ok(count)
}

/// length of a value list as a wire count, saturated so that it fails the bounds check
pub(crate) fn count_of(len: usize) -> u16 {
    u16::try_from(len).unwrap_or(u16::MAX)
}

/// byte count field that must be exactly the rest of the payload
pub(crate) fn read_byte_count(cursor: &mut ReadCursor) -> Result<usize, PduError> {
    let count = cursor.read_u8()? as usize;
    if count != cursor.remaining() {
        return Err(DataError::ByteCountMismatch(count, cursor.remaining()).into());
    }
    Ok(count)
}

pub(crate) fn byte_count_of(len: usize) -> Result<u8, PduError> {
    u8::try_from(len).map_err(|_| PduError::IllegalAddress)
}

pub(crate) fn read_registers(cursor: &mut ReadCursor, count: usize) -> Result<Vec<u16>, PduError> {
    let mut values = Vec::with_capacity(count);
    for _ in 0..count {
        values.push(cursor.read_u16_be()?);
    }
    Ok(values)
}

pub(crate) fn write_registers(cursor: &mut WriteCursor, values: &[u16]) -> Result<(), PduError> {
    for value in values {
        cursor.write_u16_be(*value)?;
    }
    Ok(())
}

pub(crate) fn coil_from_u16(value: u16) -> Result<bool, DataError> {
    match value {
        crate::constants::coil::ON => Ok(true),
        crate::constants::coil::OFF => Ok(false),
        _ => Err(DataError::UnknownCoilState(value)),
    }
}

pub(crate) fn coil_to_u16(value: bool) -> u16 {
    if value {
        crate::constants::coil::ON
    } else {
        crate::constants::coil::OFF
    }
}
