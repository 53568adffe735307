//! Application data unit framing for TCP, RTU and ASCII
//!
//! A [`Framer`] wraps a PDU in its transport envelope, unwraps a received
//! envelope and measures the next complete frame at the front of a stream.

use crate::common::phys::format_bytes;
use crate::decode::AduDecodeLevel;
use crate::error::FrameError;
use crate::types::UnitId;

pub(crate) mod ascii;
pub(crate) mod rtu;
pub(crate) mod tcp;

pub use ascii::AsciiFramer;
pub use rtu::RtuFramer;
pub use tcp::TcpFramer;

pub(crate) mod constants {
    /// largest PDU accepted by any framer
    pub(crate) const MAX_PDU_LENGTH: usize = crate::constants::limits::MAX_PDU_LENGTH;
}

/// MBAP header of a TCP frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TcpHeader {
    /// transaction identifier
    pub transaction: u16,
    /// protocol identifier, always 0
    pub protocol: u16,
    /// byte count of unit id + function code + payload
    pub length: u16,
    /// unit identifier
    pub unit_id: u8,
}

/// Header of an RTU or ASCII frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct SerialHeader {
    /// serial address
    pub address: u8,
}

/// Header of any frame
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Header {
    /// MBAP header
    Tcp(TcpHeader),
    /// serial address
    Serial(SerialHeader),
}

impl Header {
    /// Unit id or serial address carried by the header
    pub fn unit_id(&self) -> UnitId {
        match self {
            Header::Tcp(h) => UnitId::new(h.unit_id),
            Header::Serial(h) => UnitId::new(h.address),
        }
    }

    /// Key matching a response carrying this header to its request
    pub fn correlation_id(&self, function: u8) -> CorrelationId {
        match self {
            Header::Tcp(h) => CorrelationId::Transaction(h.transaction),
            Header::Serial(_) => CorrelationId::Function(function & 0x7F),
        }
    }
}

impl std::fmt::Display for Header {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            Header::Tcp(h) => write!(
                f,
                "tx_id: {:#06X} unit: {:#04X} len: {}",
                h.transaction, h.unit_id, h.length
            ),
            Header::Serial(h) => write!(f, "address: {:#04X}", h.address),
        }
    }
}

/// Key under which a pending call waits for its response
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CorrelationId {
    /// MBAP transaction id
    Transaction(u16),
    /// logical function code, serial lines carry no transaction id
    Function(u8),
    /// reserved for the connect handshake
    Handshake,
}

impl std::fmt::Display for CorrelationId {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            CorrelationId::Transaction(id) => write!(f, "transaction {id:#06X}"),
            CorrelationId::Function(code) => write!(f, "function {code:#04X}"),
            CorrelationId::Handshake => f.write_str("connect handshake"),
        }
    }
}

/// Which side produced the bytes being framed
///
/// RTU frame lengths depend on whether a request or a response is expected.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Direction {
    /// master to slave
    Request,
    /// slave to master
    Response,
}

/// Header and PDU of a received frame
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Frame {
    /// envelope header
    pub header: Header,
    /// function code and payload
    pub pdu: Vec<u8>,
}

/// Transport specific envelope around a PDU
pub trait Framer: Send + Sync + 'static {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Header for an outgoing request
    ///
    /// Serial framers ignore the transaction id.
    fn header(&self, unit_id: UnitId, transaction: u16) -> Header;

    /// Key that a response with this header and function byte is delivered under
    fn correlation_id(&self, header: &Header, function: u8) -> CorrelationId {
        header.correlation_id(function)
    }

    /// Build the complete frame for a PDU
    fn wrap(&self, header: &Header, pdu: &[u8]) -> Result<Vec<u8>, FrameError>;

    /// Validate a complete frame and split it into header and PDU
    fn unwrap(&self, frame: &[u8]) -> Result<Frame, FrameError>;

    /// Length of the complete frame at the front of `buffer`
    ///
    /// Returns `Ok(None)` until enough bytes are present to tell, and an error
    /// when the bytes can never form a frame.
    fn frame_length(
        &self,
        buffer: &[u8],
        direction: Direction,
    ) -> Result<Option<usize>, FrameError>;

    /// Largest frame this framer produces or accepts
    fn max_frame_length(&self) -> usize;

    /// Number of leading bytes in `buffer` that can't start a frame
    ///
    /// Framers with a start delimiter skip to it, the others never skip.
    fn noise_length(&self, _buffer: &[u8]) -> usize {
        0
    }
}

pub(crate) fn check_pdu_length(pdu: &[u8]) -> Result<(), FrameError> {
    if pdu.len() > constants::MAX_PDU_LENGTH {
        return Err(FrameError::PduTooLarge(pdu.len(), constants::MAX_PDU_LENGTH));
    }
    Ok(())
}

pub(crate) struct AduDisplay<'a> {
    level: AduDecodeLevel,
    frame: &'a Frame,
}

impl<'a> AduDisplay<'a> {
    pub(crate) fn new(level: AduDecodeLevel, frame: &'a Frame) -> Self {
        Self { level, frame }
    }
}

impl std::fmt::Display for AduDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} (len = {})", self.frame.header, self.frame.pdu.len())?;
        if self.level.payload_enabled() {
            format_bytes(f, &self.frame.pdu)?;
        }
        Ok(())
    }
}

/// Wrapping transaction counter
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct TxId {
    value: u16,
}

impl TxId {
    pub(crate) fn new(value: u16) -> Self {
        TxId { value }
    }

    pub(crate) fn next(&mut self) -> u16 {
        let ret = self.value;
        self.value = self.value.wrapping_add(1);
        ret
    }
}
