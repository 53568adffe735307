use scursor::{ReadCursor, WriteCursor};

use crate::common::function::FunctionCode;
use crate::constants::{limits, run_indicator};
use crate::error::{DataError, PduError};
use crate::exception::{ExceptionCode, ExceptionResponse};
use crate::pdu::{
    byte_count_of, coil_from_u16, coil_to_u16, count_of, expect_empty, file, read_byte_count,
    read_registers, serialize, write_registers,
};
use crate::types::{
    AddressRange, CommEventCounter, CommEventLog, Diagnostic, FileRecord, Indexed, MaskWrite,
    SlaveId,
};

/// Response PDU for each supported function code
///
/// Read responses keep their data as it appeared on the wire, the requesting
/// side knows the count needed to interpret it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Response {
    /// 0x01, packed bits LSB-first
    ReadCoils {
        /// packed coil states
        data: Vec<u8>,
    },
    /// 0x02, packed bits LSB-first
    ReadDiscreteInputs {
        /// packed input states
        data: Vec<u8>,
    },
    /// 0x03, big-endian registers
    ReadHoldingRegisters {
        /// two bytes per register
        data: Vec<u8>,
    },
    /// 0x04, big-endian registers
    ReadInputRegisters {
        /// two bytes per register
        data: Vec<u8>,
    },
    /// 0x05, echo of the request
    WriteSingleCoil(Indexed<bool>),
    /// 0x06, echo of the request
    WriteSingleRegister(Indexed<u16>),
    /// 0x07
    ReadExceptionStatus(u8),
    /// 0x08
    Diagnostics(Diagnostic),
    /// 0x0B
    GetCommEventCounter(CommEventCounter),
    /// 0x0C
    GetCommEventLog(CommEventLog),
    /// 0x0F, address and count of the request
    WriteMultipleCoils(AddressRange),
    /// 0x10, address and count of the request
    WriteMultipleRegisters(AddressRange),
    /// 0x11
    ReportSlaveId(SlaveId),
    /// 0x14, registers of each requested record
    ReadFileRecord(Vec<Vec<u16>>),
    /// 0x15, echo of the request
    WriteFileRecord(Vec<FileRecord>),
    /// 0x16, echo of the request
    MaskWriteRegister(MaskWrite),
    /// 0x17, big-endian registers
    ReadWriteMultipleRegisters {
        /// two bytes per register
        data: Vec<u8>,
    },
    /// 0x18
    ReadFifoQueue(Vec<u16>),
    /// any function with the high bit set
    Exception(ExceptionResponse),
}

impl Response {
    /// Logical function code of the response
    pub fn function(&self) -> FunctionCode {
        match self {
            Response::ReadCoils { .. } => FunctionCode::ReadCoils,
            Response::ReadDiscreteInputs { .. } => FunctionCode::ReadDiscreteInputs,
            Response::ReadHoldingRegisters { .. } => FunctionCode::ReadHoldingRegisters,
            Response::ReadInputRegisters { .. } => FunctionCode::ReadInputRegisters,
            Response::WriteSingleCoil(_) => FunctionCode::WriteSingleCoil,
            Response::WriteSingleRegister(_) => FunctionCode::WriteSingleRegister,
            Response::ReadExceptionStatus(_) => FunctionCode::ReadExceptionStatus,
            Response::Diagnostics(_) => FunctionCode::Diagnostics,
            Response::GetCommEventCounter(_) => FunctionCode::GetCommEventCounter,
            Response::GetCommEventLog(_) => FunctionCode::GetCommEventLog,
            Response::WriteMultipleCoils(_) => FunctionCode::WriteMultipleCoils,
            Response::WriteMultipleRegisters(_) => FunctionCode::WriteMultipleRegisters,
            Response::ReportSlaveId(_) => FunctionCode::ReportSlaveId,
            Response::ReadFileRecord(_) => FunctionCode::ReadFileRecord,
            Response::WriteFileRecord(_) => FunctionCode::WriteFileRecord,
            Response::MaskWriteRegister(_) => FunctionCode::MaskWriteRegister,
            Response::ReadWriteMultipleRegisters { .. } => {
                FunctionCode::ReadWriteMultipleRegisters
            }
            Response::ReadFifoQueue(_) => FunctionCode::ReadFifoQueue,
            Response::Exception(ex) => ex.function,
        }
    }

    pub(crate) fn encode(&self) -> Result<Vec<u8>, PduError> {
        serialize(|cursor| {
            if let Response::Exception(ex) = self {
                cursor.write_u8(ex.function.as_error())?;
                cursor.write_u8(ex.code.into())?;
                return Ok(());
            }
            cursor.write_u8(self.function().get_value())?;
            self.serialize_body(cursor)
        })
    }

    fn serialize_body(&self, cursor: &mut WriteCursor) -> Result<(), PduError> {
        match self {
            Response::ReadCoils { data }
            | Response::ReadDiscreteInputs { data }
            | Response::ReadHoldingRegisters { data }
            | Response::ReadInputRegisters { data }
            | Response::ReadWriteMultipleRegisters { data } => {
                cursor.write_u8(byte_count_of(data.len())?)?;
                cursor.write_bytes(data)?;
            }
            Response::WriteSingleCoil(value) => {
                cursor.write_u16_be(value.index)?;
                cursor.write_u16_be(coil_to_u16(value.value))?;
            }
            Response::WriteSingleRegister(value) => {
                cursor.write_u16_be(value.index)?;
                cursor.write_u16_be(value.value)?;
            }
            Response::ReadExceptionStatus(status) => cursor.write_u8(*status)?,
            Response::Diagnostics(diagnostic) => {
                cursor.write_u16_be(diagnostic.sub_function)?;
                cursor.write_u16_be(diagnostic.data)?;
            }
            Response::GetCommEventCounter(counter) => {
                cursor.write_u16_be(counter.status)?;
                cursor.write_u16_be(counter.event_count)?;
            }
            Response::GetCommEventLog(log) => {
                cursor.write_u8(byte_count_of(6 + log.events.len())?)?;
                cursor.write_u16_be(log.status)?;
                cursor.write_u16_be(log.event_count)?;
                cursor.write_u16_be(log.message_count)?;
                cursor.write_bytes(&log.events)?;
            }
            Response::WriteMultipleCoils(range) | Response::WriteMultipleRegisters(range) => {
                cursor.write_u16_be(range.start)?;
                cursor.write_u16_be(range.count)?;
            }
            Response::ReportSlaveId(id) => {
                cursor.write_u8(byte_count_of(2 + id.additional_data.len())?)?;
                cursor.write_u8(id.slave_id)?;
                cursor.write_u8(if id.run_indicator {
                    run_indicator::ON
                } else {
                    run_indicator::OFF
                })?;
                cursor.write_bytes(&id.additional_data)?;
            }
            Response::ReadFileRecord(records) => file::write_read_responses(cursor, records)?,
            Response::WriteFileRecord(records) => file::write_records(cursor, records)?,
            Response::MaskWriteRegister(mask) => {
                cursor.write_u16_be(mask.address)?;
                cursor.write_u16_be(mask.and_mask)?;
                cursor.write_u16_be(mask.or_mask)?;
            }
            Response::ReadFifoQueue(values) => {
                let fifo_count = count_of(values.len());
                if fifo_count > limits::MAX_FIFO_COUNT {
                    return Err(PduError::IllegalCount(fifo_count));
                }
                cursor.write_u16_be(2 + 2 * fifo_count)?;
                cursor.write_u16_be(fifo_count)?;
                write_registers(cursor, values)?;
            }
            Response::Exception(_) => {}
        }
        Ok(())
    }

    pub(crate) fn decode(bytes: &[u8]) -> Result<Self, PduError> {
        let mut cursor = ReadCursor::new(bytes);
        let raw = cursor.read_u8()?;

        if raw & 0x80 != 0 {
            let function =
                FunctionCode::get(raw & 0x7F).ok_or(PduError::IllegalFuncCode(raw))?;
            let code = ExceptionCode::from(cursor.read_u8()?);
            expect_empty(&cursor)?;
            return Ok(Response::Exception(ExceptionResponse::new(function, code)));
        }

        let function = FunctionCode::get(raw).ok_or(PduError::IllegalFuncCode(raw))?;
        let response = Self::parse_body(function, &mut cursor)?;
        expect_empty(&cursor)?;
        Ok(response)
    }

    fn parse_body(function: FunctionCode, cursor: &mut ReadCursor) -> Result<Self, PduError> {
        let response = match function {
            FunctionCode::ReadCoils => Response::ReadCoils {
                data: read_bits(cursor)?,
            },
            FunctionCode::ReadDiscreteInputs => Response::ReadDiscreteInputs {
                data: read_bits(cursor)?,
            },
            FunctionCode::ReadHoldingRegisters => Response::ReadHoldingRegisters {
                data: read_register_bytes(cursor)?,
            },
            FunctionCode::ReadInputRegisters => Response::ReadInputRegisters {
                data: read_register_bytes(cursor)?,
            },
            FunctionCode::WriteSingleCoil => {
                let index = cursor.read_u16_be()?;
                let value = coil_from_u16(cursor.read_u16_be()?)?;
                Response::WriteSingleCoil(Indexed::new(index, value))
            }
            FunctionCode::WriteSingleRegister => {
                let index = cursor.read_u16_be()?;
                let value = cursor.read_u16_be()?;
                Response::WriteSingleRegister(Indexed::new(index, value))
            }
            FunctionCode::ReadExceptionStatus => Response::ReadExceptionStatus(cursor.read_u8()?),
            FunctionCode::Diagnostics => {
                let sub_function = cursor.read_u16_be()?;
                let data = cursor.read_u16_be()?;
                Response::Diagnostics(Diagnostic::new(sub_function, data))
            }
            FunctionCode::GetCommEventCounter => {
                let status = cursor.read_u16_be()?;
                let event_count = cursor.read_u16_be()?;
                Response::GetCommEventCounter(CommEventCounter {
                    status,
                    event_count,
                })
            }
            FunctionCode::GetCommEventLog => {
                let byte_count = read_byte_count(cursor)?;
                if byte_count < 6 {
                    return Err(DataError::InsufficientBytes.into());
                }
                let status = cursor.read_u16_be()?;
                let event_count = cursor.read_u16_be()?;
                let message_count = cursor.read_u16_be()?;
                let events = cursor.read_bytes(byte_count - 6)?.to_vec();
                Response::GetCommEventLog(CommEventLog {
                    status,
                    event_count,
                    message_count,
                    events,
                })
            }
            FunctionCode::WriteMultipleCoils => {
                let start = cursor.read_u16_be()?;
                let count = cursor.read_u16_be()?;
                Response::WriteMultipleCoils(AddressRange::new(start, count))
            }
            FunctionCode::WriteMultipleRegisters => {
                let start = cursor.read_u16_be()?;
                let count = cursor.read_u16_be()?;
                Response::WriteMultipleRegisters(AddressRange::new(start, count))
            }
            FunctionCode::ReportSlaveId => {
                let byte_count = read_byte_count(cursor)?;
                if byte_count < 2 {
                    return Err(DataError::InsufficientBytes.into());
                }
                let slave_id = cursor.read_u8()?;
                let run_indicator = match cursor.read_u8()? {
                    run_indicator::ON => true,
                    run_indicator::OFF => false,
                    other => return Err(DataError::UnknownRunIndicator(other).into()),
                };
                let additional_data = cursor.read_bytes(byte_count - 2)?.to_vec();
                Response::ReportSlaveId(SlaveId {
                    slave_id,
                    run_indicator,
                    additional_data,
                })
            }
            FunctionCode::ReadFileRecord => {
                Response::ReadFileRecord(file::read_read_responses(cursor)?)
            }
            FunctionCode::WriteFileRecord => Response::WriteFileRecord(file::read_records(cursor)?),
            FunctionCode::MaskWriteRegister => {
                let address = cursor.read_u16_be()?;
                let and_mask = cursor.read_u16_be()?;
                let or_mask = cursor.read_u16_be()?;
                Response::MaskWriteRegister(MaskWrite::new(address, and_mask, or_mask))
            }
            FunctionCode::ReadWriteMultipleRegisters => Response::ReadWriteMultipleRegisters {
                data: read_register_bytes(cursor)?,
            },
            FunctionCode::ReadFifoQueue => {
                let byte_count = cursor.read_u16_be()? as usize;
                if byte_count != cursor.remaining() {
                    return Err(DataError::ByteCountMismatch(byte_count, cursor.remaining()).into());
                }
                let fifo_count = cursor.read_u16_be()?;
                if fifo_count > limits::MAX_FIFO_COUNT {
                    return Err(DataError::FifoCountTooLarge(fifo_count).into());
                }
                let expected = 2 + 2 * fifo_count as usize;
                if byte_count != expected {
                    return Err(DataError::UnexpectedByteCount(expected, byte_count).into());
                }
                Response::ReadFifoQueue(read_registers(cursor, fifo_count as usize)?)
            }
        };
        Ok(response)
    }
}

fn read_bits(cursor: &mut ReadCursor) -> Result<Vec<u8>, PduError> {
    let byte_count = read_byte_count(cursor)?;
    Ok(cursor.read_bytes(byte_count)?.to_vec())
}

fn read_register_bytes(cursor: &mut ReadCursor) -> Result<Vec<u8>, PduError> {
    let byte_count = read_byte_count(cursor)?;
    if byte_count % 2 != 0 {
        return Err(DataError::OddRegisterBytes(byte_count).into());
    }
    Ok(cursor.read_bytes(byte_count)?.to_vec())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn round_trip(response: Response, expected: &[u8]) {
        assert_eq!(response.encode().unwrap(), expected);
        assert_eq!(Response::decode(expected).unwrap(), response);
    }

    #[test]
    fn read_responses() {
        round_trip(
            Response::ReadCoils {
                data: vec![0xC1, 0x03],
            },
            &[0x01, 0x02, 0xC1, 0x03],
        );
        round_trip(
            Response::ReadInputRegisters {
                data: vec![0x00, 0x0A],
            },
            &[0x04, 0x02, 0x00, 0x0A],
        );
    }

    #[test]
    fn rejects_odd_register_data() {
        assert_eq!(
            Response::decode(&[0x03, 0x03, 0x00, 0x0A, 0x01]),
            Err(PduError::IllegalData(DataError::OddRegisterBytes(3)))
        );
    }

    #[test]
    fn rejects_byte_count_mismatch() {
        assert_eq!(
            Response::decode(&[0x01, 0x03, 0xC1, 0x03]),
            Err(PduError::IllegalData(DataError::ByteCountMismatch(3, 2)))
        );
    }

    #[test]
    fn exception_response_decodes_logical_function() {
        round_trip(
            Response::Exception(ExceptionResponse::new(
                FunctionCode::ReadHoldingRegisters,
                ExceptionCode::IllegalDataAddress,
            )),
            &[0x83, 0x02],
        );
        let response = Response::decode(&[0x98, 0x0B]).unwrap();
        assert_eq!(response.function(), FunctionCode::ReadFifoQueue);
        assert_eq!(
            response,
            Response::Exception(ExceptionResponse::new(
                FunctionCode::ReadFifoQueue,
                ExceptionCode::GatewayTargetDeviceFailedToRespond,
            ))
        );
    }

    #[test]
    fn exception_with_unknown_logical_function() {
        assert_eq!(
            Response::decode(&[0xAB, 0x01]),
            Err(PduError::IllegalFuncCode(0xAB))
        );
    }

    #[test]
    fn exception_with_trailing_bytes() {
        assert_eq!(
            Response::decode(&[0x81, 0x02, 0x00]),
            Err(PduError::IllegalData(DataError::TrailingBytes(1)))
        );
    }

    #[test]
    fn fixed_shapes() {
        round_trip(Response::ReadExceptionStatus(0x6D), &[0x07, 0x6D]);
        round_trip(
            Response::GetCommEventCounter(CommEventCounter {
                status: 0xFFFF,
                event_count: 0x0108,
            }),
            &[0x0B, 0xFF, 0xFF, 0x01, 0x08],
        );
        round_trip(
            Response::GetCommEventLog(CommEventLog {
                status: 0x0000,
                event_count: 0x0108,
                message_count: 0x0121,
                events: vec![0x20, 0x00],
            }),
            &[
                0x0C, 0x08, 0x00, 0x00, 0x01, 0x08, 0x01, 0x21, 0x20, 0x00,
            ],
        );
        round_trip(
            Response::ReportSlaveId(SlaveId {
                slave_id: 0x2A,
                run_indicator: true,
                additional_data: vec![0x01, 0x02],
            }),
            &[0x11, 0x04, 0x2A, 0xFF, 0x01, 0x02],
        );
    }

    #[test]
    fn rejects_unknown_run_indicator() {
        assert_eq!(
            Response::decode(&[0x11, 0x02, 0x2A, 0x01]),
            Err(PduError::IllegalData(DataError::UnknownRunIndicator(0x01)))
        );
    }

    #[test]
    fn write_echoes() {
        round_trip(
            Response::WriteMultipleCoils(AddressRange::new(0x0013, 0x000A)),
            &[0x0F, 0x00, 0x13, 0x00, 0x0A],
        );
        round_trip(
            Response::MaskWriteRegister(MaskWrite::new(0x0004, 0x00F2, 0x0025)),
            &[0x16, 0x00, 0x04, 0x00, 0xF2, 0x00, 0x25],
        );
    }

    #[test]
    fn read_file_record_response() {
        round_trip(
            Response::ReadFileRecord(vec![vec![0x0DFE, 0x0020], vec![0x33CD, 0x0040]]),
            &[
                0x14, 0x0C, 0x05, 0x06, 0x0D, 0xFE, 0x00, 0x20, 0x05, 0x06, 0x33, 0xCD, 0x00,
                0x40,
            ],
        );
    }

    #[test]
    fn read_file_record_item_overruns_byte_count() {
        assert_eq!(
            Response::decode(&[0x14, 0x04, 0x05, 0x06, 0x0D, 0xFE]),
            Err(PduError::IllegalData(DataError::InsufficientBytes))
        );
    }

    #[test]
    fn read_fifo_queue_response() {
        round_trip(
            Response::ReadFifoQueue(vec![0x01B8, 0x1284]),
            &[0x18, 0x00, 0x06, 0x00, 0x02, 0x01, 0xB8, 0x12, 0x84],
        );
        assert_eq!(
            Response::decode(&[0x18, 0x00, 0x04, 0x00, 0x02, 0x01, 0xB8]),
            Err(PduError::IllegalData(DataError::UnexpectedByteCount(6, 4)))
        );
    }

    #[test]
    fn fifo_count_above_limit() {
        let mut bytes = vec![0x18, 0x00, 0x42, 0x00, 0x20];
        bytes.extend(std::iter::repeat(0).take(64));
        assert_eq!(
            Response::decode(&bytes),
            Err(PduError::IllegalData(DataError::FifoCountTooLarge(0x20)))
        );
    }
}
