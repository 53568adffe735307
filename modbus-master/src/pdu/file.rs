use scursor::{ReadCursor, WriteCursor};

use crate::constants::file::{REFERENCE_TYPE, SUB_REQUEST_LENGTH};
use crate::error::{DataError, PduError};
use crate::pdu::{byte_count_of, read_registers, write_registers};
use crate::types::{FileRecord, FileRecordRequest};

fn check_reference_type(cursor: &mut ReadCursor) -> Result<(), PduError> {
    match cursor.read_u8()? {
        REFERENCE_TYPE => Ok(()),
        other => Err(DataError::BadReferenceType(other).into()),
    }
}

/// sub-items are consumed from a cursor limited to the declared byte count
fn sub_cursor<'a>(cursor: &mut ReadCursor<'a>) -> Result<ReadCursor<'a>, PduError> {
    let count = crate::pdu::read_byte_count(cursor)?;
    Ok(ReadCursor::new(cursor.read_bytes(count)?))
}

pub(crate) fn write_read_requests(
    cursor: &mut WriteCursor,
    items: &[FileRecordRequest],
) -> Result<(), PduError> {
    if items.is_empty() {
        return Err(PduError::IllegalCount(0));
    }
    cursor.write_u8(byte_count_of(items.len() * SUB_REQUEST_LENGTH)?)?;
    for item in items {
        cursor.write_u8(REFERENCE_TYPE)?;
        cursor.write_u16_be(item.file_number)?;
        cursor.write_u16_be(item.record_number)?;
        cursor.write_u16_be(item.record_length)?;
    }
    Ok(())
}

pub(crate) fn read_read_requests(
    cursor: &mut ReadCursor,
) -> Result<Vec<FileRecordRequest>, PduError> {
    let mut items = sub_cursor(cursor)?;
    if items.is_empty() {
        return Err(PduError::IllegalCount(0));
    }
    let mut requests = Vec::new();
    while !items.is_empty() {
        if items.remaining() < SUB_REQUEST_LENGTH {
            return Err(DataError::InsufficientBytes.into());
        }
        check_reference_type(&mut items)?;
        requests.push(FileRecordRequest::new(
            items.read_u16_be()?,
            items.read_u16_be()?,
            items.read_u16_be()?,
        ));
    }
    Ok(requests)
}

pub(crate) fn write_read_responses(
    cursor: &mut WriteCursor,
    records: &[Vec<u16>],
) -> Result<(), PduError> {
    let total: usize = records.iter().map(|r| 2 + 2 * r.len()).sum();
    cursor.write_u8(byte_count_of(total)?)?;
    for record in records {
        cursor.write_u8(byte_count_of(1 + 2 * record.len())?)?;
        cursor.write_u8(REFERENCE_TYPE)?;
        write_registers(cursor, record)?;
    }
    Ok(())
}

pub(crate) fn read_read_responses(cursor: &mut ReadCursor) -> Result<Vec<Vec<u16>>, PduError> {
    let mut items = sub_cursor(cursor)?;
    let mut records = Vec::new();
    while !items.is_empty() {
        let length = items.read_u8()? as usize;
        if length == 0 || length > items.remaining() {
            return Err(DataError::InsufficientBytes.into());
        }
        check_reference_type(&mut items)?;
        let data_length = length - 1;
        if data_length % 2 != 0 {
            return Err(DataError::OddRegisterBytes(data_length).into());
        }
        records.push(read_registers(&mut items, data_length / 2)?);
    }
    Ok(records)
}

/// write requests and their echoes share one layout
pub(crate) fn write_records(
    cursor: &mut WriteCursor,
    records: &[FileRecord],
) -> Result<(), PduError> {
    if records.is_empty() {
        return Err(PduError::IllegalCount(0));
    }
    let total: usize = records
        .iter()
        .map(|r| SUB_REQUEST_LENGTH + 2 * r.data.len())
        .sum();
    cursor.write_u8(byte_count_of(total)?)?;
    for record in records {
        cursor.write_u8(REFERENCE_TYPE)?;
        cursor.write_u16_be(record.file_number)?;
        cursor.write_u16_be(record.record_number)?;
        cursor.write_u16_be(crate::pdu::count_of(record.data.len()))?;
        write_registers(cursor, &record.data)?;
    }
    Ok(())
}

pub(crate) fn read_records(cursor: &mut ReadCursor) -> Result<Vec<FileRecord>, PduError> {
    let mut items = sub_cursor(cursor)?;
    if items.is_empty() {
        return Err(PduError::IllegalCount(0));
    }
    let mut records = Vec::new();
    while !items.is_empty() {
        if items.remaining() < SUB_REQUEST_LENGTH {
            return Err(DataError::InsufficientBytes.into());
        }
        check_reference_type(&mut items)?;
        let file_number = items.read_u16_be()?;
        let record_number = items.read_u16_be()?;
        let length = items.read_u16_be()? as usize;
        if 2 * length > items.remaining() {
            return Err(DataError::InsufficientBytes.into());
        }
        let data = read_registers(&mut items, length)?;
        records.push(FileRecord::new(file_number, record_number, data));
    }
    Ok(records)
}
