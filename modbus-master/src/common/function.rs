use std::fmt::{Display, Formatter};

mod constants {
    pub(crate) const READ_COILS: u8 = 0x01;
    pub(crate) const READ_DISCRETE_INPUTS: u8 = 0x02;
    pub(crate) const READ_HOLDING_REGISTERS: u8 = 0x03;
    pub(crate) const READ_INPUT_REGISTERS: u8 = 0x04;
    pub(crate) const WRITE_SINGLE_COIL: u8 = 0x05;
    pub(crate) const WRITE_SINGLE_REGISTER: u8 = 0x06;
    pub(crate) const READ_EXCEPTION_STATUS: u8 = 0x07;
    pub(crate) const DIAGNOSTICS: u8 = 0x08;
    pub(crate) const GET_COMM_EVENT_COUNTER: u8 = 0x0B;
    pub(crate) const GET_COMM_EVENT_LOG: u8 = 0x0C;
    pub(crate) const WRITE_MULTIPLE_COILS: u8 = 0x0F;
    pub(crate) const WRITE_MULTIPLE_REGISTERS: u8 = 0x10;
    pub(crate) const REPORT_SLAVE_ID: u8 = 0x11;
    pub(crate) const READ_FILE_RECORD: u8 = 0x14;
    pub(crate) const WRITE_FILE_RECORD: u8 = 0x15;
    pub(crate) const MASK_WRITE_REGISTER: u8 = 0x16;
    pub(crate) const READ_WRITE_MULTIPLE_REGISTERS: u8 = 0x17;
    pub(crate) const READ_FIFO_QUEUE: u8 = 0x18;
}

/// Function codes supported by the master
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum FunctionCode {
    /// 0x01
    ReadCoils = constants::READ_COILS,
    /// 0x02
    ReadDiscreteInputs = constants::READ_DISCRETE_INPUTS,
    /// 0x03
    ReadHoldingRegisters = constants::READ_HOLDING_REGISTERS,
    /// 0x04
    ReadInputRegisters = constants::READ_INPUT_REGISTERS,
    /// 0x05
    WriteSingleCoil = constants::WRITE_SINGLE_COIL,
    /// 0x06
    WriteSingleRegister = constants::WRITE_SINGLE_REGISTER,
    /// 0x07
    ReadExceptionStatus = constants::READ_EXCEPTION_STATUS,
    /// 0x08
    Diagnostics = constants::DIAGNOSTICS,
    /// 0x0B
    GetCommEventCounter = constants::GET_COMM_EVENT_COUNTER,
    /// 0x0C
    GetCommEventLog = constants::GET_COMM_EVENT_LOG,
    /// 0x0F
    WriteMultipleCoils = constants::WRITE_MULTIPLE_COILS,
    /// 0x10
    WriteMultipleRegisters = constants::WRITE_MULTIPLE_REGISTERS,
    /// 0x11
    ReportSlaveId = constants::REPORT_SLAVE_ID,
    /// 0x14
    ReadFileRecord = constants::READ_FILE_RECORD,
    /// 0x15
    WriteFileRecord = constants::WRITE_FILE_RECORD,
    /// 0x16
    MaskWriteRegister = constants::MASK_WRITE_REGISTER,
    /// 0x17
    ReadWriteMultipleRegisters = constants::READ_WRITE_MULTIPLE_REGISTERS,
    /// 0x18
    ReadFifoQueue = constants::READ_FIFO_QUEUE,
}

impl Display for FunctionCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            FunctionCode::ReadCoils => "READ COILS",
            FunctionCode::ReadDiscreteInputs => "READ DISCRETE INPUTS",
            FunctionCode::ReadHoldingRegisters => "READ HOLDING REGISTERS",
            FunctionCode::ReadInputRegisters => "READ INPUT REGISTERS",
            FunctionCode::WriteSingleCoil => "WRITE SINGLE COIL",
            FunctionCode::WriteSingleRegister => "WRITE SINGLE REGISTER",
            FunctionCode::ReadExceptionStatus => "READ EXCEPTION STATUS",
            FunctionCode::Diagnostics => "DIAGNOSTICS",
            FunctionCode::GetCommEventCounter => "GET COMM EVENT COUNTER",
            FunctionCode::GetCommEventLog => "GET COMM EVENT LOG",
            FunctionCode::WriteMultipleCoils => "WRITE MULTIPLE COILS",
            FunctionCode::WriteMultipleRegisters => "WRITE MULTIPLE REGISTERS",
            FunctionCode::ReportSlaveId => "REPORT SLAVE ID",
            FunctionCode::ReadFileRecord => "READ FILE RECORD",
            FunctionCode::WriteFileRecord => "WRITE FILE RECORD",
            FunctionCode::MaskWriteRegister => "MASK WRITE REGISTER",
            FunctionCode::ReadWriteMultipleRegisters => "READ/WRITE MULTIPLE REGISTERS",
            FunctionCode::ReadFifoQueue => "READ FIFO QUEUE",
        };
        write!(f, "{} ({:#04X})", name, self.get_value())
    }
}

impl FunctionCode {
    /// Raw byte value
    pub const fn get_value(self) -> u8 {
        self as u8
    }

    /// Function byte of the exception response for this function
    pub const fn as_error(self) -> u8 {
        self.get_value() | 0x80
    }

    /// Look up a function code by its raw byte value
    pub fn get(value: u8) -> Option<Self> {
        match value {
            constants::READ_COILS => Some(FunctionCode::ReadCoils),
            constants::READ_DISCRETE_INPUTS => Some(FunctionCode::ReadDiscreteInputs),
            constants::READ_HOLDING_REGISTERS => Some(FunctionCode::ReadHoldingRegisters),
            constants::READ_INPUT_REGISTERS => Some(FunctionCode::ReadInputRegisters),
            constants::WRITE_SINGLE_COIL => Some(FunctionCode::WriteSingleCoil),
            constants::WRITE_SINGLE_REGISTER => Some(FunctionCode::WriteSingleRegister),
            constants::READ_EXCEPTION_STATUS => Some(FunctionCode::ReadExceptionStatus),
            constants::DIAGNOSTICS => Some(FunctionCode::Diagnostics),
            constants::GET_COMM_EVENT_COUNTER => Some(FunctionCode::GetCommEventCounter),
            constants::GET_COMM_EVENT_LOG => Some(FunctionCode::GetCommEventLog),
            constants::WRITE_MULTIPLE_COILS => Some(FunctionCode::WriteMultipleCoils),
            constants::WRITE_MULTIPLE_REGISTERS => Some(FunctionCode::WriteMultipleRegisters),
            constants::REPORT_SLAVE_ID => Some(FunctionCode::ReportSlaveId),
            constants::READ_FILE_RECORD => Some(FunctionCode::ReadFileRecord),
            constants::WRITE_FILE_RECORD => Some(FunctionCode::WriteFileRecord),
            constants::MASK_WRITE_REGISTER => Some(FunctionCode::MaskWriteRegister),
            constants::READ_WRITE_MULTIPLE_REGISTERS => {
                Some(FunctionCode::ReadWriteMultipleRegisters)
            }
            constants::READ_FIFO_QUEUE => Some(FunctionCode::ReadFifoQueue),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_code_round_trips_through_its_byte() {
        for raw in 0..=0x7Fu8 {
            if let Some(code) = FunctionCode::get(raw) {
                assert_eq!(code.get_value(), raw);
            }
        }
        let supported = (0..=0xFFu8).filter_map(FunctionCode::get).count();
        assert_eq!(supported, 18);
    }

    #[test]
    fn error_byte_sets_high_bit() {
        assert_eq!(FunctionCode::ReadCoils.as_error(), 0x81);
        assert_eq!(FunctionCode::ReadFifoQueue.as_error(), 0x98);
        assert_eq!(FunctionCode::get(0x81), None);
    }
}
