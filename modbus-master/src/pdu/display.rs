use std::fmt::{Display, Formatter, Result};

use crate::common::bits;
use crate::common::phys::format_bytes;
use crate::decode::PduDecodeLevel;
use crate::pdu::{Request, Response};
use crate::types::{Indexed, ValuesDisplay};

pub(crate) struct RequestDisplay<'a> {
    level: PduDecodeLevel,
    request: &'a Request,
}

impl<'a> RequestDisplay<'a> {
    pub(crate) fn new(level: PduDecodeLevel, request: &'a Request) -> Self {
        Self { level, request }
    }
}

pub(crate) struct ResponseDisplay<'a> {
    level: PduDecodeLevel,
    response: &'a Response,
}

impl<'a> ResponseDisplay<'a> {
    pub(crate) fn new(level: PduDecodeLevel, response: &'a Response) -> Self {
        Self { level, response }
    }
}

impl Display for RequestDisplay<'_> {
    fn fmt(&self, f: &mut Formatter) -> Result {
        write!(f, "{}", self.request.function())?;
        if !self.level.data_headers() {
            return Ok(());
        }
        let level = self.level;
        match self.request {
            Request::ReadCoils { address, count }
            | Request::ReadDiscreteInputs { address, count }
            | Request::ReadHoldingRegisters { address, count }
            | Request::ReadInputRegisters { address, count } => {
                write!(f, " start: {address:#06X} qty: {count}")
            }
            Request::WriteSingleCoil(value) => write!(f, " {value}"),
            Request::WriteSingleRegister(value) => write!(f, " {value}"),
            Request::ReadExceptionStatus
            | Request::GetCommEventCounter
            | Request::GetCommEventLog
            | Request::ReportSlaveId => Ok(()),
            Request::Diagnostics(d) => write!(
                f,
                " sub-function: {:#06X} data: {:#06X}",
                d.sub_function, d.data
            ),
            Request::WriteMultipleCoils { address, values } => {
                write!(f, " {}", ValuesDisplay::new(level, *address, values))
            }
            Request::WriteMultipleRegisters { address, values } => {
                write!(f, " {}", ValuesDisplay::new(level, *address, values))
            }
            Request::ReadFileRecord(items) => {
                write!(f, " records: {}", items.len())?;
                if level.data_values() {
                    for item in items {
                        write!(
                            f,
                            "\nfile: {} record: {} length: {}",
                            item.file_number, item.record_number, item.record_length
                        )?;
                    }
                }
                Ok(())
            }
            Request::WriteFileRecord(records) => {
                write!(f, " records: {}", records.len())?;
                if level.data_values() {
                    for record in records {
                        write!(
                            f,
                            "\nfile: {} record: {} {}",
                            record.file_number,
                            record.record_number,
                            ValuesDisplay::new(level, 0, &record.data)
                        )?;
                    }
                }
                Ok(())
            }
            Request::MaskWriteRegister(m) => write!(
                f,
                " address: {:#06X} and: {:#06X} or: {:#06X}",
                m.address, m.and_mask, m.or_mask
            ),
            Request::ReadWriteMultipleRegisters {
                read_address,
                read_count,
                write_address,
                values,
            } => write!(
                f,
                " read start: {read_address:#06X} qty: {read_count} write {}",
                ValuesDisplay::new(level, *write_address, values)
            ),
            Request::ReadFifoQueue { address } => write!(f, " address: {address:#06X}"),
        }
    }
}

impl Display for ResponseDisplay<'_> {
    fn fmt(&self, f: &mut Formatter) -> Result {
        if let Response::Exception(ex) = self.response {
            return write!(f, "{ex}");
        }
        write!(f, "{}", self.response.function())?;
        if !self.level.data_headers() {
            return Ok(());
        }
        let level = self.level;
        match self.response {
            Response::ReadCoils { data } | Response::ReadDiscreteInputs { data } => {
                write!(f, " bytes: {}", data.len())?;
                if level.data_values() {
                    let count = crate::pdu::count_of(data.len() * 8);
                    if let Some(values) = bits::unpack(data, count) {
                        for (value, index) in values.iter().zip(0u16..) {
                            write!(f, "\n{}", Indexed::new(index, *value))?;
                        }
                    }
                }
                Ok(())
            }
            Response::ReadHoldingRegisters { data }
            | Response::ReadInputRegisters { data }
            | Response::ReadWriteMultipleRegisters { data } => {
                write!(f, " bytes: {}", data.len())?;
                if level.data_values() {
                    format_bytes(f, data)?;
                }
                Ok(())
            }
            Response::WriteSingleCoil(value) => write!(f, " {value}"),
            Response::WriteSingleRegister(value) => write!(f, " {value}"),
            Response::ReadExceptionStatus(status) => write!(f, " status: {status:#04X}"),
            Response::Diagnostics(d) => write!(
                f,
                " sub-function: {:#06X} data: {:#06X}",
                d.sub_function, d.data
            ),
            Response::GetCommEventCounter(c) => write!(
                f,
                " status: {:#06X} events: {}",
                c.status, c.event_count
            ),
            Response::GetCommEventLog(log) => {
                write!(
                    f,
                    " status: {:#06X} events: {} messages: {}",
                    log.status, log.event_count, log.message_count
                )?;
                if level.data_values() {
                    format_bytes(f, &log.events)?;
                }
                Ok(())
            }
            Response::WriteMultipleCoils(range) | Response::WriteMultipleRegisters(range) => {
                write!(f, " {range}")
            }
            Response::ReportSlaveId(id) => {
                write!(f, " id: {:#04X} running: {}", id.slave_id, id.run_indicator)?;
                if level.data_values() {
                    format_bytes(f, &id.additional_data)?;
                }
                Ok(())
            }
            Response::ReadFileRecord(records) => {
                write!(f, " records: {}", records.len())?;
                if level.data_values() {
                    for record in records {
                        write!(f, "\n{}", ValuesDisplay::new(level, 0, record))?;
                    }
                }
                Ok(())
            }
            Response::WriteFileRecord(records) => write!(f, " records: {}", records.len()),
            Response::MaskWriteRegister(m) => write!(
                f,
                " address: {:#06X} and: {:#06X} or: {:#06X}",
                m.address, m.and_mask, m.or_mask
            ),
            Response::ReadFifoQueue(values) => {
                write!(f, " {}", ValuesDisplay::new(level, 0, values))
            }
            Response::Exception(_) => Ok(()),
        }
    }
}
