use scursor::{ReadCursor, WriteCursor};

use crate::common::bits;
use crate::common::function::FunctionCode;
use crate::constants::limits;
use crate::error::{DataError, PduError};
use crate::pdu::{
    check_count, coil_from_u16, coil_to_u16, count_of, expect_empty, file, read_byte_count,
    read_registers, serialize, write_registers,
};
use crate::types::{Diagnostic, FileRecord, FileRecordRequest, Indexed, MaskWrite};

/// Request PDU for each supported function code
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Request {
    /// 0x01
    ReadCoils {
        /// first coil
        address: u16,
        /// number of coils, `1..=0x7D0`
        count: u16,
    },
    /// 0x02
    ReadDiscreteInputs {
        /// first input
        address: u16,
        /// number of inputs, `1..=0x7D0`
        count: u16,
    },
    /// 0x03
    ReadHoldingRegisters {
        /// first register
        address: u16,
        /// number of registers, `1..=0x7D`
        count: u16,
    },
    /// 0x04
    ReadInputRegisters {
        /// first register
        address: u16,
        /// number of registers, `1..=0x7D`
        count: u16,
    },
    /// 0x05
    WriteSingleCoil(Indexed<bool>),
    /// 0x06
    WriteSingleRegister(Indexed<u16>),
    /// 0x07
    ReadExceptionStatus,
    /// 0x08
    Diagnostics(Diagnostic),
    /// 0x0B
    GetCommEventCounter,
    /// 0x0C
    GetCommEventLog,
    /// 0x0F
    WriteMultipleCoils {
        /// first coil
        address: u16,
        /// coil values, `1..=0x7D0` of them
        values: Vec<bool>,
    },
    /// 0x10
    WriteMultipleRegisters {
        /// first register
        address: u16,
        /// register values, `1..=0x78` of them
        values: Vec<u16>,
    },
    /// 0x11
    ReportSlaveId,
    /// 0x14
    ReadFileRecord(Vec<FileRecordRequest>),
    /// 0x15
    WriteFileRecord(Vec<FileRecord>),
    /// 0x16
    MaskWriteRegister(MaskWrite),
    /// 0x17
    ReadWriteMultipleRegisters {
        /// first register to read
        read_address: u16,
        /// number of registers to read, `1..=0x7D`
        read_count: u16,
        /// first register to write
        write_address: u16,
        /// values to write, `1..=0x79` of them
        values: Vec<u16>,
    },
    /// 0x18
    ReadFifoQueue {
        /// FIFO pointer address
        address: u16,
    },
}

impl Request {
    /// Function code of the request
    pub fn function(&self) -> FunctionCode {
        match self {
            Request::ReadCoils { .. } => FunctionCode::ReadCoils,
            Request::ReadDiscreteInputs { .. } => FunctionCode::ReadDiscreteInputs,
            Request::ReadHoldingRegisters { .. } => FunctionCode::ReadHoldingRegisters,
            Request::ReadInputRegisters { .. } => FunctionCode::ReadInputRegisters,
            Request::WriteSingleCoil(_) => FunctionCode::WriteSingleCoil,
            Request::WriteSingleRegister(_) => FunctionCode::WriteSingleRegister,
            Request::ReadExceptionStatus => FunctionCode::ReadExceptionStatus,
            Request::Diagnostics(_) => FunctionCode::Diagnostics,
            Request::GetCommEventCounter => FunctionCode::GetCommEventCounter,
            Request::GetCommEventLog => FunctionCode::GetCommEventLog,
            Request::WriteMultipleCoils { .. } => FunctionCode::WriteMultipleCoils,
            Request::WriteMultipleRegisters { .. } => FunctionCode::WriteMultipleRegisters,
            Request::ReportSlaveId => FunctionCode::ReportSlaveId,
            Request::ReadFileRecord(_) => FunctionCode::ReadFileRecord,
            Request::WriteFileRecord(_) => FunctionCode::WriteFileRecord,
            Request::MaskWriteRegister(_) => FunctionCode::MaskWriteRegister,
            Request::ReadWriteMultipleRegisters { .. } => FunctionCode::ReadWriteMultipleRegisters,
            Request::ReadFifoQueue { .. } => FunctionCode::ReadFifoQueue,
        }
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, PduError> {
        serialize(|cursor| {
            cursor.write_u8(self.function().get_value())?;
            self.serialize_body(cursor)
        })
    }

    fn serialize_body(&self, cursor: &mut WriteCursor) -> Result<(), PduError> {
        match self {
            Request::ReadCoils { address, count }
            | Request::ReadDiscreteInputs { address, count } => {
                cursor.write_u16_be(*address)?;
                cursor.write_u16_be(check_count(*count, limits::MAX_READ_COILS_COUNT)?)?;
            }
            Request::ReadHoldingRegisters { address, count }
            | Request::ReadInputRegisters { address, count } => {
                cursor.write_u16_be(*address)?;
                cursor.write_u16_be(check_count(*count, limits::MAX_READ_REGISTERS_COUNT)?)?;
            }
            Request::WriteSingleCoil(value) => {
                cursor.write_u16_be(value.index)?;
                cursor.write_u16_be(coil_to_u16(value.value))?;
            }
            Request::WriteSingleRegister(value) => {
                cursor.write_u16_be(value.index)?;
                cursor.write_u16_be(value.value)?;
            }
            Request::ReadExceptionStatus
            | Request::GetCommEventCounter
            | Request::GetCommEventLog
            | Request::ReportSlaveId => {}
            Request::Diagnostics(diagnostic) => {
                cursor.write_u16_be(diagnostic.sub_function)?;
                cursor.write_u16_be(diagnostic.data)?;
            }
            Request::WriteMultipleCoils { address, values } => {
                let count = check_count(count_of(values.len()), limits::MAX_WRITE_COILS_COUNT)?;
                let packed = bits::pack(values);
                cursor.write_u16_be(*address)?;
                cursor.write_u16_be(count)?;
                cursor.write_u8(crate::pdu::byte_count_of(packed.len())?)?;
                cursor.write_bytes(&packed)?;
            }
            Request::WriteMultipleRegisters { address, values } => {
                let count = check_count(
                    count_of(values.len()),
                    limits::MAX_WRITE_REGISTERS_COUNT,
                )?;
                cursor.write_u16_be(*address)?;
                cursor.write_u16_be(count)?;
                cursor.write_u8(crate::pdu::byte_count_of(2 * values.len())?)?;
                write_registers(cursor, values)?;
            }
            Request::ReadFileRecord(items) => file::write_read_requests(cursor, items)?,
            Request::WriteFileRecord(records) => file::write_records(cursor, records)?,
            Request::MaskWriteRegister(mask) => {
                cursor.write_u16_be(mask.address)?;
                cursor.write_u16_be(mask.and_mask)?;
                cursor.write_u16_be(mask.or_mask)?;
            }
            Request::ReadWriteMultipleRegisters {
                read_address,
                read_count,
                write_address,
                values,
            } => {
                let read_count = check_count(*read_count, limits::MAX_READ_REGISTERS_COUNT)?;
                let write_count = check_count(
                    count_of(values.len()),
                    limits::MAX_READ_WRITE_REGISTERS_WRITE_COUNT,
                )?;
                cursor.write_u16_be(*read_address)?;
                cursor.write_u16_be(read_count)?;
                cursor.write_u16_be(*write_address)?;
                cursor.write_u16_be(write_count)?;
                cursor.write_u8(crate::pdu::byte_count_of(2 * values.len())?)?;
                write_registers(cursor, values)?;
            }
            Request::ReadFifoQueue { address } => {
                cursor.write_u16_be(*address)?;
            }
        }
        Ok(())
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, PduError> {
        let mut cursor = ReadCursor::new(bytes);
        let raw = cursor.read_u8()?;
        let function = FunctionCode::get(raw).ok_or(PduError::IllegalFuncCode(raw))?;
        let request = Self::parse_body(function, &mut cursor)?;
        expect_empty(&cursor)?;
        Ok(request)
    }

    fn parse_body(function: FunctionCode, cursor: &mut ReadCursor) -> Result<Self, PduError> {
        let request = match function {
            FunctionCode::ReadCoils => Request::ReadCoils {
                address: cursor.read_u16_be()?,
                count: check_count(cursor.read_u16_be()?, limits::MAX_READ_COILS_COUNT)?,
            },
            FunctionCode::ReadDiscreteInputs => Request::ReadDiscreteInputs {
                address: cursor.read_u16_be()?,
                count: check_count(cursor.read_u16_be()?, limits::MAX_READ_COILS_COUNT)?,
            },
            FunctionCode::ReadHoldingRegisters => Request::ReadHoldingRegisters {
                address: cursor.read_u16_be()?,
                count: check_count(cursor.read_u16_be()?, limits::MAX_READ_REGISTERS_COUNT)?,
            },
            FunctionCode::ReadInputRegisters => Request::ReadInputRegisters {
                address: cursor.read_u16_be()?,
                count: check_count(cursor.read_u16_be()?, limits::MAX_READ_REGISTERS_COUNT)?,
            },
            FunctionCode::WriteSingleCoil => {
                let index = cursor.read_u16_be()?;
                let value = coil_from_u16(cursor.read_u16_be()?)?;
                Request::WriteSingleCoil(Indexed::new(index, value))
            }
            FunctionCode::WriteSingleRegister => {
                let index = cursor.read_u16_be()?;
                let value = cursor.read_u16_be()?;
                Request::WriteSingleRegister(Indexed::new(index, value))
            }
            FunctionCode::ReadExceptionStatus => Request::ReadExceptionStatus,
            FunctionCode::Diagnostics => {
                let sub_function = cursor.read_u16_be()?;
                let data = cursor.read_u16_be()?;
                Request::Diagnostics(Diagnostic::new(sub_function, data))
            }
            FunctionCode::GetCommEventCounter => Request::GetCommEventCounter,
            FunctionCode::GetCommEventLog => Request::GetCommEventLog,
            FunctionCode::WriteMultipleCoils => {
                let address = cursor.read_u16_be()?;
                let count = check_count(cursor.read_u16_be()?, limits::MAX_WRITE_COILS_COUNT)?;
                let byte_count = read_byte_count(cursor)?;
                let expected = bits::num_bytes_for_bits(count);
                if byte_count != expected {
                    return Err(DataError::UnexpectedByteCount(expected, byte_count).into());
                }
                let packed = cursor.read_bytes(byte_count)?;
                let values = bits::unpack(packed, count).ok_or(DataError::InsufficientBytes)?;
                Request::WriteMultipleCoils { address, values }
            }
            FunctionCode::WriteMultipleRegisters => {
                let address = cursor.read_u16_be()?;
                let count =
                    check_count(cursor.read_u16_be()?, limits::MAX_WRITE_REGISTERS_COUNT)?;
                let byte_count = read_byte_count(cursor)?;
                let expected = 2 * count as usize;
                if byte_count != expected {
                    return Err(DataError::UnexpectedByteCount(expected, byte_count).into());
                }
                let values = read_registers(cursor, count as usize)?;
                Request::WriteMultipleRegisters { address, values }
            }
            FunctionCode::ReportSlaveId => Request::ReportSlaveId,
            FunctionCode::ReadFileRecord => {
                Request::ReadFileRecord(file::read_read_requests(cursor)?)
            }
            FunctionCode::WriteFileRecord => Request::WriteFileRecord(file::read_records(cursor)?),
            FunctionCode::MaskWriteRegister => {
                let address = cursor.read_u16_be()?;
                let and_mask = cursor.read_u16_be()?;
                let or_mask = cursor.read_u16_be()?;
                Request::MaskWriteRegister(MaskWrite::new(address, and_mask, or_mask))
            }
            FunctionCode::ReadWriteMultipleRegisters => {
                let read_address = cursor.read_u16_be()?;
                let read_count =
                    check_count(cursor.read_u16_be()?, limits::MAX_READ_REGISTERS_COUNT)?;
                let write_address = cursor.read_u16_be()?;
                let write_count = check_count(
                    cursor.read_u16_be()?,
                    limits::MAX_READ_WRITE_REGISTERS_WRITE_COUNT,
                )?;
                let byte_count = read_byte_count(cursor)?;
                let expected = 2 * write_count as usize;
                if byte_count != expected {
                    return Err(DataError::UnexpectedByteCount(expected, byte_count).into());
                }
                let values = read_registers(cursor, write_count as usize)?;
                Request::ReadWriteMultipleRegisters {
                    read_address,
                    read_count,
                    write_address,
                    values,
                }
            }
            FunctionCode::ReadFifoQueue => Request::ReadFifoQueue {
                address: cursor.read_u16_be()?,
            },
        };
        Ok(request)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(request: Request, expected: &[u8]) {
        assert_eq!(request.encode().unwrap(), expected);
        assert_eq!(Request::decode(expected).unwrap(), request);
    }

    #[test]
    fn read_coils_count_bounds() {
        for count in [1, limits::MAX_READ_COILS_COUNT] {
            let request = Request::ReadCoils { address: 0, count };
            let bytes = request.encode().unwrap();
            assert_eq!(Request::decode(&bytes).unwrap(), request);
        }
        for count in [0, limits::MAX_READ_COILS_COUNT + 1] {
            let request = Request::ReadCoils { address: 0, count };
            assert_eq!(request.encode(), Err(PduError::IllegalCount(count)));
            let [hi, lo] = count.to_be_bytes();
            assert_eq!(
                Request::decode(&[0x01, 0x00, 0x00, hi, lo]),
                Err(PduError::IllegalCount(count))
            );
        }
    }

    #[test]
    fn read_register_count_bounds() {
        let request = Request::ReadHoldingRegisters {
            address: 7,
            count: 0x7E,
        };
        assert_eq!(request.encode(), Err(PduError::IllegalCount(0x7E)));
        round_trip(
            Request::ReadInputRegisters {
                address: 0x0102,
                count: 0x7D,
            },
            &[0x04, 0x01, 0x02, 0x00, 0x7D],
        );
    }

    #[test]
    fn single_writes() {
        round_trip(
            Request::WriteSingleCoil(Indexed::new(0x00AC, true)),
            &[0x05, 0x00, 0xAC, 0xFF, 0x00],
        );
        round_trip(
            Request::WriteSingleRegister(Indexed::new(0x0001, 0x0003)),
            &[0x06, 0x00, 0x01, 0x00, 0x03],
        );
    }

    #[test]
    fn rejects_unknown_coil_state() {
        assert_eq!(
            Request::decode(&[0x05, 0x00, 0x01, 0xAB, 0xCD]),
            Err(PduError::IllegalData(DataError::UnknownCoilState(0xABCD)))
        );
    }

    #[test]
    fn fixed_shapes_have_no_payload() {
        round_trip(Request::ReadExceptionStatus, &[0x07]);
        round_trip(Request::GetCommEventCounter, &[0x0B]);
        round_trip(Request::GetCommEventLog, &[0x0C]);
        round_trip(Request::ReportSlaveId, &[0x11]);
        round_trip(
            Request::Diagnostics(Diagnostic::new(0x0000, 0xA537)),
            &[0x08, 0x00, 0x00, 0xA5, 0x37],
        );
        assert_eq!(
            Request::decode(&[0x07, 0x00]),
            Err(PduError::IllegalData(DataError::TrailingBytes(1)))
        );
    }

    #[test]
    fn write_multiple_coils() {
        let values = vec![true, false, true, true, false, false, true, true, true, false];
        round_trip(
            Request::WriteMultipleCoils {
                address: 0x0013,
                values,
            },
            &[0x0F, 0x00, 0x13, 0x00, 0x0A, 0x02, 0xCD, 0x01],
        );
    }

    #[test]
    fn write_multiple_coils_inclusive_bound() {
        let request = Request::WriteMultipleCoils {
            address: 0,
            values: vec![true; limits::MAX_WRITE_COILS_COUNT as usize],
        };
        let bytes = request.encode().unwrap();
        assert_eq!(Request::decode(&bytes).unwrap(), request);

        let request = Request::WriteMultipleCoils {
            address: 0,
            values: vec![true; limits::MAX_WRITE_COILS_COUNT as usize + 1],
        };
        assert_eq!(request.encode(), Err(PduError::IllegalCount(0x7D1)));
    }

    #[test]
    fn write_multiple_rejects_byte_count_disagreement() {
        // byte count says 3 but only 2 bytes follow
        assert_eq!(
            Request::decode(&[0x10, 0x00, 0x01, 0x00, 0x01, 0x03, 0x00, 0x0A]),
            Err(PduError::IllegalData(DataError::ByteCountMismatch(3, 2)))
        );
        // byte count agrees with the buffer but not with the register count
        assert_eq!(
            Request::decode(&[0x10, 0x00, 0x01, 0x00, 0x02, 0x02, 0x00, 0x0A]),
            Err(PduError::IllegalData(DataError::UnexpectedByteCount(4, 2)))
        );
    }

    #[test]
    fn write_multiple_registers() {
        round_trip(
            Request::WriteMultipleRegisters {
                address: 0x0001,
                values: vec![0x000A, 0x0102],
            },
            &[0x10, 0x00, 0x01, 0x00, 0x02, 0x04, 0x00, 0x0A, 0x01, 0x02],
        );
        let request = Request::WriteMultipleRegisters {
            address: 0,
            values: vec![0; limits::MAX_WRITE_REGISTERS_COUNT as usize + 1],
        };
        assert_eq!(request.encode(), Err(PduError::IllegalCount(0x79)));
    }

    #[test]
    fn file_records() {
        round_trip(
            Request::ReadFileRecord(vec![
                FileRecordRequest::new(4, 1, 2),
                FileRecordRequest::new(3, 9, 2),
            ]),
            &[
                0x14, 0x0E, 0x06, 0x00, 0x04, 0x00, 0x01, 0x00, 0x02, 0x06, 0x00, 0x03, 0x00,
                0x09, 0x00, 0x02,
            ],
        );
        round_trip(
            Request::WriteFileRecord(vec![FileRecord::new(4, 7, vec![0x06AF, 0x04BE, 0x100D])]),
            &[
                0x15, 0x0D, 0x06, 0x00, 0x04, 0x00, 0x07, 0x00, 0x03, 0x06, 0xAF, 0x04, 0xBE,
                0x10, 0x0D,
            ],
        );
    }

    #[test]
    fn file_record_rejects_bad_reference_type() {
        assert_eq!(
            Request::decode(&[0x14, 0x07, 0x05, 0x00, 0x04, 0x00, 0x01, 0x00, 0x02]),
            Err(PduError::IllegalData(DataError::BadReferenceType(0x05)))
        );
    }

    #[test]
    fn file_record_rejects_item_longer_than_byte_count() {
        // record length of 3 registers but only 2 follow
        assert_eq!(
            Request::decode(&[
                0x15, 0x0B, 0x06, 0x00, 0x04, 0x00, 0x07, 0x00, 0x03, 0x06, 0xAF, 0x04, 0xBE,
            ]),
            Err(PduError::IllegalData(DataError::InsufficientBytes))
        );
    }

    #[test]
    fn mask_write_is_seven_bytes() {
        let bytes = Request::MaskWriteRegister(MaskWrite::new(0x0004, 0x00F2, 0x0025))
            .encode()
            .unwrap();
        assert_eq!(bytes, &[0x16, 0x00, 0x04, 0x00, 0xF2, 0x00, 0x25]);
    }

    #[test]
    fn read_write_multiple_registers() {
        round_trip(
            Request::ReadWriteMultipleRegisters {
                read_address: 0x0003,
                read_count: 0x0006,
                write_address: 0x000E,
                values: vec![0x00FF, 0x00FF, 0x00FF],
            },
            &[
                0x17, 0x00, 0x03, 0x00, 0x06, 0x00, 0x0E, 0x00, 0x03, 0x06, 0x00, 0xFF, 0x00,
                0xFF, 0x00, 0xFF,
            ],
        );
        let request = Request::ReadWriteMultipleRegisters {
            read_address: 0,
            read_count: 1,
            write_address: 0,
            values: vec![0; 0x7A],
        };
        assert_eq!(request.encode(), Err(PduError::IllegalCount(0x7A)));
    }

    #[test]
    fn read_fifo_queue() {
        round_trip(
            Request::ReadFifoQueue { address: 0x04DE },
            &[0x18, 0x04, 0xDE],
        );
    }

    #[test]
    fn unknown_function_code() {
        assert_eq!(
            Request::decode(&[0x2B, 0x0E]),
            Err(PduError::IllegalFuncCode(0x2B))
        );
    }

    #[test]
    fn short_buffer_is_illegal_data() {
        assert_eq!(
            Request::decode(&[0x03, 0x00]),
            Err(PduError::IllegalData(DataError::InsufficientBytes))
        );
        assert_eq!(
            Request::decode(&[]),
            Err(PduError::IllegalData(DataError::InsufficientBytes))
        );
    }
}
