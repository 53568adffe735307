use crate::frame::CorrelationId;

/// Top level error type returned by every master operation
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum RequestError {
    /// An I/O error occurred on the socket
    Io(std::io::ErrorKind),
    /// A PDU could not be encoded or decoded
    Pdu(PduError),
    /// A frame could not be built or received
    Frame(FrameError),
    /// Another call with the same correlation id is already outstanding
    DuplicatePending(CorrelationId),
    /// No response arrived before the response timeout elapsed
    Timeout,
    /// The connection closed while the call was outstanding
    Disconnected,
    /// The master has no connection to send on
    NoConnection,
    /// The call was cancelled through [`Correlator::cancel`](crate::client::Correlator::cancel)
    Cancelled,
    /// The correlator went away while the call was outstanding
    Shutdown,
}

impl std::error::Error for RequestError {}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            RequestError::Io(kind) => write!(f, "i/o error: {kind}"),
            RequestError::Pdu(err) => write!(f, "pdu error: {err}"),
            RequestError::Frame(err) => write!(f, "frame error: {err}"),
            RequestError::DuplicatePending(id) => {
                write!(f, "a call correlated by {id} is already outstanding")
            }
            RequestError::Timeout => {
                f.write_str("timeout occurred before receiving a response from the server")
            }
            RequestError::Disconnected => {
                f.write_str("connection was lost while waiting for a response")
            }
            RequestError::NoConnection => f.write_str("no connection exists to the Modbus server"),
            RequestError::Cancelled => f.write_str("the call was cancelled"),
            RequestError::Shutdown => f.write_str("the master was shut down"),
        }
    }
}

impl From<std::io::Error> for RequestError {
    fn from(err: std::io::Error) -> Self {
        RequestError::Io(err.kind())
    }
}

impl From<PduError> for RequestError {
    fn from(err: PduError) -> Self {
        RequestError::Pdu(err)
    }
}

impl From<FrameError> for RequestError {
    fn from(err: FrameError) -> Self {
        RequestError::Frame(err)
    }
}

impl From<DataError> for RequestError {
    fn from(err: DataError) -> Self {
        RequestError::Pdu(PduError::IllegalData(err))
    }
}

/// Errors raised while encoding or decoding a PDU
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PduError {
    /// Function code is not one of the supported codes, or doesn't match the request
    IllegalFuncCode(u8),
    /// Encoded PDU doesn't fit in the maximum PDU size
    IllegalAddress,
    /// A count is zero or above the limit for its function
    IllegalCount(u16),
    /// The payload is malformed
    IllegalData(DataError),
}

impl std::error::Error for PduError {}

impl std::fmt::Display for PduError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            PduError::IllegalFuncCode(code) => write!(f, "illegal function code: {code:#04X}"),
            PduError::IllegalAddress => f.write_str("encoded pdu exceeds the maximum pdu size"),
            PduError::IllegalCount(count) => write!(f, "count of {count} is out of range"),
            PduError::IllegalData(err) => write!(f, "illegal data: {err}"),
        }
    }
}

impl From<DataError> for PduError {
    fn from(err: DataError) -> Self {
        PduError::IllegalData(err)
    }
}

impl From<scursor::ReadError> for PduError {
    fn from(_: scursor::ReadError) -> Self {
        PduError::IllegalData(DataError::InsufficientBytes)
    }
}

impl From<scursor::WriteError> for PduError {
    fn from(_: scursor::WriteError) -> Self {
        PduError::IllegalAddress
    }
}

/// Specific reasons a PDU payload is rejected
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum DataError {
    /// The payload ended before all fields were read
    InsufficientBytes,
    /// Bytes remained after all fields were read
    TrailingBytes(usize),
    /// A byte count field disagrees with the bytes that follow: (declared, actual)
    ByteCountMismatch(usize, usize),
    /// A byte count field disagrees with what the request implies: (expected, declared)
    UnexpectedByteCount(usize, usize),
    /// A coil value other than 0xFF00 or 0x0000
    UnknownCoilState(u16),
    /// A run indicator other than 0xFF or 0x00
    UnknownRunIndicator(u8),
    /// A file record reference type other than 6
    BadReferenceType(u8),
    /// Register data with an odd number of bytes
    OddRegisterBytes(usize),
    /// A FIFO count above the maximum of 31
    FifoCountTooLarge(u16),
    /// A response echo doesn't match the request
    EchoMismatch,
}

impl std::error::Error for DataError {}

impl std::fmt::Display for DataError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            DataError::InsufficientBytes => {
                f.write_str("payload ended before all fields were read")
            }
            DataError::TrailingBytes(count) => {
                write!(f, "{count} bytes remained after all fields were read")
            }
            DataError::ByteCountMismatch(declared, actual) => {
                write!(f, "byte count of {declared} doesn't match the {actual} bytes that follow")
            }
            DataError::UnexpectedByteCount(expected, declared) => {
                write!(f, "expected a byte count of {expected} but received {declared}")
            }
            DataError::UnknownCoilState(value) => {
                write!(f, "received coil state with unspecified value: {value:#06X}")
            }
            DataError::UnknownRunIndicator(value) => {
                write!(f, "received run indicator with unspecified value: {value:#04X}")
            }
            DataError::BadReferenceType(value) => {
                write!(f, "file record reference type must be 6, received {value}")
            }
            DataError::OddRegisterBytes(count) => {
                write!(f, "register data has an odd number of bytes: {count}")
            }
            DataError::FifoCountTooLarge(count) => {
                write!(f, "fifo count of {count} exceeds the maximum of 31")
            }
            DataError::EchoMismatch => f.write_str("response echo doesn't match the request"),
        }
    }
}

/// Errors raised while wrapping or unwrapping an ADU
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum FrameError {
    /// MBAP protocol id other than zero
    UnknownProtocolId(u16),
    /// MBAP length field is zero
    LengthZero,
    /// A length exceeds the maximum: (actual, maximum)
    LengthTooBig(usize, usize),
    /// MBAP length field disagrees with the bytes present: (declared, actual)
    LengthMismatch(usize, usize),
    /// Not enough bytes to hold the envelope
    FrameTooShort(usize),
    /// RTU checksum doesn't match the frame contents
    CrcMismatch {
        /// checksum carried by the frame
        received: u16,
        /// checksum computed over the frame
        expected: u16,
    },
    /// ASCII checksum doesn't match the frame contents
    LrcMismatch {
        /// checksum carried by the frame
        received: u8,
        /// checksum computed over the frame
        expected: u8,
    },
    /// ASCII frame doesn't begin with ':'
    MissingStart,
    /// ASCII frame doesn't end with CR LF
    MissingEnd,
    /// ASCII frame body isn't valid hex
    InvalidHex,
    /// RTU length can't be determined for this function code
    UnknownFunctionCode(u8),
    /// PDU too large to wrap: (actual, maximum)
    PduTooLarge(usize, usize),
    /// Header type doesn't belong to this framer
    WrongHeader,
}

impl std::error::Error for FrameError {}

impl std::fmt::Display for FrameError {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        match self {
            FrameError::UnknownProtocolId(id) => {
                write!(f, "received frame with non-Modbus protocol id: {id}")
            }
            FrameError::LengthZero => {
                f.write_str("received frame with the length field set to zero")
            }
            FrameError::LengthTooBig(size, max) => write!(
                f,
                "received frame with length ({size}) that exceeds max allowed size ({max})"
            ),
            FrameError::LengthMismatch(declared, actual) => {
                write!(f, "frame declares {declared} bytes but {actual} are present")
            }
            FrameError::FrameTooShort(size) => write!(f, "frame of {size} bytes is too short"),
            FrameError::CrcMismatch { received, expected } => write!(
                f,
                "received crc value {received:#06X} that doesn't match the calculated value {expected:#06X}"
            ),
            FrameError::LrcMismatch { received, expected } => write!(
                f,
                "received lrc value {received:#04X} that doesn't match the calculated value {expected:#04X}"
            ),
            FrameError::MissingStart => f.write_str("ascii frame doesn't begin with ':'"),
            FrameError::MissingEnd => f.write_str("ascii frame doesn't end with CR LF"),
            FrameError::InvalidHex => f.write_str("ascii frame contains invalid hex characters"),
            FrameError::UnknownFunctionCode(code) => {
                write!(f, "can't determine frame length for function code {code:#04X}")
            }
            FrameError::PduTooLarge(size, max) => {
                write!(f, "pdu of {size} bytes exceeds the maximum of {max}")
            }
            FrameError::WrongHeader => f.write_str("header type doesn't match the framer"),
        }
    }
}

/// Returned when a delivery names a correlation id with no outstanding call
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct NoSuchPending(pub CorrelationId);

impl std::error::Error for NoSuchPending {}

impl std::fmt::Display for NoSuchPending {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "no outstanding call correlated by {}", self.0)
    }
}
