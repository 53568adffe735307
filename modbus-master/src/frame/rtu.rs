use crate::common::checksum::crc16;
use crate::common::function::FunctionCode;
use crate::error::FrameError;
use crate::frame::{check_pdu_length, Direction, Frame, Framer, Header, SerialHeader};
use crate::types::UnitId;

pub(crate) mod constants {
    pub(crate) const ADDRESS_LENGTH: usize = 1;
    pub(crate) const FUNCTION_CODE_LENGTH: usize = 1;
    pub(crate) const CRC_LENGTH: usize = 2;
    pub(crate) const MIN_FRAME_LENGTH: usize = ADDRESS_LENGTH + FUNCTION_CODE_LENGTH + CRC_LENGTH;
    pub(crate) const MAX_FRAME_LENGTH: usize =
        ADDRESS_LENGTH + crate::frame::constants::MAX_PDU_LENGTH + CRC_LENGTH;
}

/// How to find the length of the body that follows the function code
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum LengthMode {
    /// the body always has this length
    Fixed(usize),
    /// the last of the first `n` body bytes is a byte count of what follows
    Offset(usize),
    /// the last two of the first `n` body bytes are a big-endian byte count of what follows
    Offset16(usize),
}

/// Modbus RTU framing carried over a byte stream: address, PDU, CRC16 low byte first
#[derive(Clone, Copy, Debug, Default)]
pub struct RtuFramer;

impl RtuFramer {
    /// Create the framer
    pub fn new() -> Self {
        Self
    }

    fn length_mode(function: u8, direction: Direction) -> Result<LengthMode, FrameError> {
        if direction == Direction::Response && function & 0x80 != 0 {
            return Ok(LengthMode::Fixed(1));
        }

        let code = FunctionCode::get(function).ok_or(FrameError::UnknownFunctionCode(function))?;

        let mode = match direction {
            Direction::Request => match code {
                FunctionCode::ReadCoils
                | FunctionCode::ReadDiscreteInputs
                | FunctionCode::ReadHoldingRegisters
                | FunctionCode::ReadInputRegisters
                | FunctionCode::WriteSingleCoil
                | FunctionCode::WriteSingleRegister
                | FunctionCode::Diagnostics => LengthMode::Fixed(4),
                FunctionCode::ReadExceptionStatus
                | FunctionCode::GetCommEventCounter
                | FunctionCode::GetCommEventLog
                | FunctionCode::ReportSlaveId => LengthMode::Fixed(0),
                FunctionCode::WriteMultipleCoils | FunctionCode::WriteMultipleRegisters => {
                    LengthMode::Offset(5)
                }
                FunctionCode::ReadFileRecord | FunctionCode::WriteFileRecord => {
                    LengthMode::Offset(1)
                }
                FunctionCode::MaskWriteRegister => LengthMode::Fixed(6),
                FunctionCode::ReadWriteMultipleRegisters => LengthMode::Offset(9),
                FunctionCode::ReadFifoQueue => LengthMode::Fixed(2),
            },
            Direction::Response => match code {
                FunctionCode::ReadCoils
                | FunctionCode::ReadDiscreteInputs
                | FunctionCode::ReadHoldingRegisters
                | FunctionCode::ReadInputRegisters
                | FunctionCode::GetCommEventLog
                | FunctionCode::ReportSlaveId
                | FunctionCode::ReadFileRecord
                | FunctionCode::WriteFileRecord
                | FunctionCode::ReadWriteMultipleRegisters => LengthMode::Offset(1),
                FunctionCode::WriteSingleCoil
                | FunctionCode::WriteSingleRegister
                | FunctionCode::WriteMultipleCoils
                | FunctionCode::WriteMultipleRegisters
                | FunctionCode::Diagnostics
                | FunctionCode::GetCommEventCounter => LengthMode::Fixed(4),
                FunctionCode::ReadExceptionStatus => LengthMode::Fixed(1),
                FunctionCode::MaskWriteRegister => LengthMode::Fixed(6),
                FunctionCode::ReadFifoQueue => LengthMode::Offset16(2),
            },
        };

        Ok(mode)
    }
}

impl Framer for RtuFramer {
    fn name(&self) -> &'static str {
        "RTU"
    }

    fn header(&self, unit_id: UnitId, _transaction: u16) -> Header {
        Header::Serial(SerialHeader {
            address: unit_id.value,
        })
    }

    fn wrap(&self, header: &Header, pdu: &[u8]) -> Result<Vec<u8>, FrameError> {
        let address = match header {
            Header::Serial(h) => h.address,
            Header::Tcp(_) => return Err(FrameError::WrongHeader),
        };
        check_pdu_length(pdu)?;

        let mut frame = Vec::with_capacity(pdu.len() + 3);
        frame.push(address);
        frame.extend_from_slice(pdu);
        let crc = crc16(&frame);
        frame.extend_from_slice(&crc.to_le_bytes());
        Ok(frame)
    }

    fn unwrap(&self, frame: &[u8]) -> Result<Frame, FrameError> {
        if frame.len() < constants::MIN_FRAME_LENGTH {
            return Err(FrameError::FrameTooShort(frame.len()));
        }
        if frame.len() > constants::MAX_FRAME_LENGTH {
            return Err(FrameError::LengthTooBig(frame.len(), constants::MAX_FRAME_LENGTH));
        }

        let (body, crc) = frame.split_at(frame.len() - constants::CRC_LENGTH);
        let received = u16::from_le_bytes([crc[0], crc[1]]);
        let expected = crc16(body);
        if received != expected {
            return Err(FrameError::CrcMismatch { received, expected });
        }

        Ok(Frame {
            header: Header::Serial(SerialHeader { address: body[0] }),
            pdu: body[constants::ADDRESS_LENGTH..].to_vec(),
        })
    }

    fn frame_length(
        &self,
        buffer: &[u8],
        direction: Direction,
    ) -> Result<Option<usize>, FrameError> {
        // address and function code
        let prefix = constants::ADDRESS_LENGTH + constants::FUNCTION_CODE_LENGTH;
        if buffer.len() < prefix {
            return Ok(None);
        }

        let body = match Self::length_mode(buffer[1], direction)? {
            LengthMode::Fixed(length) => length,
            LengthMode::Offset(offset) => match buffer.get(prefix + offset - 1) {
                Some(count) => offset + *count as usize,
                None => return Ok(None),
            },
            LengthMode::Offset16(offset) => {
                match buffer.get(prefix + offset - 2..prefix + offset) {
                    Some([high, low]) => offset + u16::from_be_bytes([*high, *low]) as usize,
                    _ => return Ok(None),
                }
            }
        };

        let total = prefix + body + constants::CRC_LENGTH;
        if total > constants::MAX_FRAME_LENGTH {
            return Err(FrameError::LengthTooBig(total, constants::MAX_FRAME_LENGTH));
        }
        if buffer.len() < total {
            return Ok(None);
        }
        Ok(Some(total))
    }

    fn max_frame_length(&self) -> usize {
        constants::MAX_FRAME_LENGTH
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::{decode_request, Request};

    const READ_COILS_REQUEST: &[u8] = &[0x2A, 0x01, 0x00, 0x10, 0x00, 0x13, 0x7A, 0x19];

    #[test]
    fn wraps_with_crc_low_byte_first() {
        let framer = RtuFramer::new();
        let header = framer.header(UnitId::new(0x2A), 0);
        let frame = framer
            .wrap(&header, &[0x01, 0x00, 0x10, 0x00, 0x13])
            .unwrap();
        assert_eq!(frame, READ_COILS_REQUEST);
    }

    #[test]
    fn unwraps_valid_frame() {
        let frame = RtuFramer::new().unwrap(READ_COILS_REQUEST).unwrap();
        assert_eq!(frame.header.unit_id(), UnitId::new(0x2A));
        assert_eq!(
            decode_request(&frame.pdu).unwrap(),
            Request::ReadCoils {
                address: 0x10,
                count: 0x13
            }
        );
    }

    #[test]
    fn flipped_bit_fails_checksum_until_recomputed() {
        let framer = RtuFramer::new();
        let mut frame = READ_COILS_REQUEST.to_vec();
        frame[3] ^= 0x01;
        assert!(matches!(
            framer.unwrap(&frame),
            Err(FrameError::CrcMismatch { received: 0x197A, .. })
        ));

        let crc = crc16(&frame[..frame.len() - 2]);
        let end = frame.len();
        frame[end - 2..].copy_from_slice(&crc.to_le_bytes());
        assert!(framer.unwrap(&frame).is_ok());
    }

    #[test]
    fn fixed_length_frames() {
        let framer = RtuFramer::new();
        assert_eq!(
            framer.frame_length(&READ_COILS_REQUEST[..1], Direction::Request),
            Ok(None)
        );
        assert_eq!(
            framer.frame_length(&READ_COILS_REQUEST[..7], Direction::Request),
            Ok(None)
        );
        assert_eq!(
            framer.frame_length(READ_COILS_REQUEST, Direction::Request),
            Ok(Some(8))
        );
        // exception response
        assert_eq!(
            framer.frame_length(&[0x01, 0x83, 0x02, 0xC0, 0xF1, 0xFF], Direction::Response),
            Ok(Some(5))
        );
        // read exception status request is address, function and crc
        assert_eq!(
            framer.frame_length(&[0x01, 0x07, 0x41, 0xE2], Direction::Request),
            Ok(Some(4))
        );
    }

    #[test]
    fn byte_count_frames() {
        let framer = RtuFramer::new();
        // read holding registers response with 4 data bytes
        let response = [0x01, 0x03, 0x04, 0x00, 0x0A, 0x00, 0x0B, 0x00, 0x00];
        assert_eq!(framer.frame_length(&response[..2], Direction::Response), Ok(None));
        assert_eq!(framer.frame_length(&response, Direction::Response), Ok(Some(9)));

        // write multiple registers request, byte count is the 5th body byte
        let request = [0x01, 0x10, 0x00, 0x01, 0x00, 0x01, 0x02, 0x00, 0x0A, 0x00, 0x00];
        assert_eq!(framer.frame_length(&request[..6], Direction::Request), Ok(None));
        assert_eq!(framer.frame_length(&request, Direction::Request), Ok(Some(11)));

        // fifo response, two byte count
        let fifo = [0x01, 0x18, 0x00, 0x04, 0x00, 0x01, 0x12, 0x34, 0x00, 0x00];
        assert_eq!(framer.frame_length(&fifo[..3], Direction::Response), Ok(None));
        assert_eq!(framer.frame_length(&fifo, Direction::Response), Ok(Some(10)));
    }

    #[test]
    fn unknown_function_cannot_be_framed() {
        let framer = RtuFramer::new();
        assert_eq!(
            framer.frame_length(&[0x01, 0x2B], Direction::Response),
            Err(FrameError::UnknownFunctionCode(0x2B))
        );
        assert_eq!(
            framer.frame_length(&[0x01, 0x81], Direction::Request),
            Err(FrameError::UnknownFunctionCode(0x81))
        );
    }

    #[test]
    fn oversized_byte_count_is_rejected() {
        let framer = RtuFramer::new();
        assert_eq!(
            framer.frame_length(&[0x01, 0x18, 0x01, 0x00], Direction::Response),
            Err(FrameError::LengthTooBig(262, 256))
        );
    }
}
