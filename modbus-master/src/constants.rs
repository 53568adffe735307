pub(crate) mod coil {
    /// u16 representation of COIL == ON when performing write single coil
    pub(crate) const ON: u16 = 0xFF00;
    /// u16 representation of COIL == OFF when performing write single coil
    pub(crate) const OFF: u16 = 0x0000;
}

pub(crate) mod run_indicator {
    pub(crate) const ON: u8 = 0xFF;
    pub(crate) const OFF: u8 = 0x00;
}

/// Count limits enforced by the PDU codec
pub mod limits {
    /// Maximum count allowed in a read coils/discrete inputs request
    pub const MAX_READ_COILS_COUNT: u16 = 0x07D0;
    /// Maximum count allowed in a read holding/input registers request
    pub const MAX_READ_REGISTERS_COUNT: u16 = 0x007D;
    /// Maximum count allowed in a `write multiple coils` request
    pub const MAX_WRITE_COILS_COUNT: u16 = 0x07D0;
    /// Maximum count allowed in a `write multiple registers` request
    pub const MAX_WRITE_REGISTERS_COUNT: u16 = 0x0078;
    /// Maximum write count allowed in a `read/write multiple registers` request
    pub const MAX_READ_WRITE_REGISTERS_WRITE_COUNT: u16 = 0x0079;
    /// Maximum number of registers returned by `read FIFO queue`
    pub const MAX_FIFO_COUNT: u16 = 31;
    /// Maximum length of a PDU (function code + payload) on the wire
    pub const MAX_PDU_LENGTH: usize = 253;
}

pub(crate) mod file {
    /// the only reference type defined for file record sub-requests
    pub(crate) const REFERENCE_TYPE: u8 = 0x06;
    /// reference type + file number + record number + record length
    pub(crate) const SUB_REQUEST_LENGTH: usize = 7;
}

pub(crate) mod exceptions {
    pub(crate) const ILLEGAL_FUNCTION: u8 = 0x01;
    pub(crate) const ILLEGAL_DATA_ADDRESS: u8 = 0x02;
    pub(crate) const ILLEGAL_DATA_VALUE: u8 = 0x03;
    pub(crate) const SERVER_DEVICE_FAILURE: u8 = 0x04;
    pub(crate) const ACKNOWLEDGE: u8 = 0x05;
    pub(crate) const SERVER_DEVICE_BUSY: u8 = 0x06;
    pub(crate) const MEMORY_PARITY_ERROR: u8 = 0x08;
    pub(crate) const GATEWAY_PATH_UNAVAILABLE: u8 = 0x0A;
    pub(crate) const GATEWAY_TARGET_DEVICE_FAILED_TO_RESPOND: u8 = 0x0B;
}
