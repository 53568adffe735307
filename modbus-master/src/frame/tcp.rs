use crate::error::FrameError;
use crate::frame::{check_pdu_length, Direction, Frame, Framer, Header, TcpHeader};
use crate::types::UnitId;

pub(crate) mod constants {
    pub(crate) const HEADER_LENGTH: usize = 7;
    /// unit id plus the largest PDU
    pub(crate) const MAX_LENGTH_FIELD: usize = crate::frame::constants::MAX_PDU_LENGTH + 1;
    pub(crate) const MAX_FRAME_LENGTH: usize =
        HEADER_LENGTH + crate::frame::constants::MAX_PDU_LENGTH;
}

/// Modbus TCP framing: MBAP header, no checksum
#[derive(Clone, Copy, Debug, Default)]
pub struct TcpFramer;

impl TcpFramer {
    /// Create the framer
    pub fn new() -> Self {
        Self
    }

    fn parse_header(buffer: &[u8]) -> Result<TcpHeader, FrameError> {
        let header = match buffer {
            [t0, t1, p0, p1, l0, l1, unit_id, ..] => TcpHeader {
                transaction: u16::from_be_bytes([*t0, *t1]),
                protocol: u16::from_be_bytes([*p0, *p1]),
                length: u16::from_be_bytes([*l0, *l1]),
                unit_id: *unit_id,
            },
            _ => return Err(FrameError::FrameTooShort(buffer.len())),
        };

        if header.protocol != 0 {
            return Err(FrameError::UnknownProtocolId(header.protocol));
        }

        // the unit id counts towards the length
        if header.length == 0 {
            return Err(FrameError::LengthZero);
        }

        if header.length as usize > constants::MAX_LENGTH_FIELD {
            return Err(FrameError::LengthTooBig(
                header.length as usize,
                constants::MAX_LENGTH_FIELD,
            ));
        }

        Ok(header)
    }
}

impl Framer for TcpFramer {
    fn name(&self) -> &'static str {
        "TCP"
    }

    fn header(&self, unit_id: UnitId, transaction: u16) -> Header {
        Header::Tcp(TcpHeader {
            transaction,
            protocol: 0,
            length: 0,
            unit_id: unit_id.value,
        })
    }

    fn wrap(&self, header: &Header, pdu: &[u8]) -> Result<Vec<u8>, FrameError> {
        let header = match header {
            Header::Tcp(h) => h,
            Header::Serial(_) => return Err(FrameError::WrongHeader),
        };
        check_pdu_length(pdu)?;

        // bounded by the check above
        let length = (pdu.len() + 1) as u16;
        let mut frame = Vec::with_capacity(constants::HEADER_LENGTH + pdu.len());
        frame.extend_from_slice(&header.transaction.to_be_bytes());
        frame.extend_from_slice(&0u16.to_be_bytes());
        frame.extend_from_slice(&length.to_be_bytes());
        frame.push(header.unit_id);
        frame.extend_from_slice(pdu);
        Ok(frame)
    }

    fn unwrap(&self, frame: &[u8]) -> Result<Frame, FrameError> {
        let header = Self::parse_header(frame)?;
        let actual = frame.len() - (constants::HEADER_LENGTH - 1);
        if header.length as usize != actual {
            return Err(FrameError::LengthMismatch(header.length as usize, actual));
        }
        Ok(Frame {
            header: Header::Tcp(header),
            pdu: frame[constants::HEADER_LENGTH..].to_vec(),
        })
    }

    fn frame_length(
        &self,
        buffer: &[u8],
        _direction: Direction,
    ) -> Result<Option<usize>, FrameError> {
        if buffer.len() < constants::HEADER_LENGTH {
            return Ok(None);
        }
        let header = Self::parse_header(buffer)?;
        let total = constants::HEADER_LENGTH - 1 + header.length as usize;
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
    use crate::frame::CorrelationId;
    use crate::pdu::{decode_request, decode_response, Request, Response};

    fn bytes(text: &str) -> Vec<u8> {
        hex::decode(text).unwrap()
    }

    #[test]
    fn wraps_read_coils_request() {
        let framer = TcpFramer::new();
        let header = framer.header(UnitId::new(1), 6);
        let frame = framer
            .wrap(&header, &[0x01, 0x00, 0x00, 0x00, 0x0A])
            .unwrap();
        assert_eq!(frame, bytes("00060000000601010000000A"));
    }

    #[test]
    fn unwraps_read_coils_request() {
        let frame = TcpFramer::new()
            .unwrap(&bytes("00060000000601010000000A"))
            .unwrap();
        assert_eq!(frame.header.correlation_id(frame.pdu[0]), CorrelationId::Transaction(6));
        assert_eq!(frame.header.unit_id(), UnitId::new(1));
        assert_eq!(
            decode_request(&frame.pdu).unwrap(),
            Request::ReadCoils {
                address: 0,
                count: 10
            }
        );
    }

    #[test]
    fn unwraps_read_coils_response() {
        let frame = TcpFramer::new()
            .unwrap(&bytes("05CB00000005010102C103"))
            .unwrap();
        let data = match decode_response(&frame.pdu).unwrap() {
            Response::ReadCoils { data } => data,
            other => panic!("unexpected response: {other:?}"),
        };
        let set: Vec<usize> = crate::common::bits::unpack(&data, 10)
            .unwrap()
            .iter()
            .enumerate()
            .filter(|(_, bit)| **bit)
            .map(|(index, _)| index)
            .collect();
        assert_eq!(set, vec![0, 6, 7, 8, 9]);
    }

    #[test]
    fn unwraps_read_input_registers_response() {
        let frame = TcpFramer::new()
            .unwrap(&bytes(
                "1D7A0000001D01041A020001000000000000000000000000000000000000000400",
            ))
            .unwrap_err();
        // one register short of the declared length
        assert_eq!(frame, FrameError::LengthMismatch(0x1D, 0x1B));

        let frame = TcpFramer::new()
            .unwrap(&bytes(
                "1D7A0000001D01041A0200010000000000000000000000000000000000000004001000",
            ))
            .unwrap();
        let data = match decode_response(&frame.pdu).unwrap() {
            Response::ReadInputRegisters { data } => data,
            other => panic!("unexpected response: {other:?}"),
        };
        let block = crate::types::RegisterBlock::new(0, data);
        assert_eq!(
            block.values(),
            vec![512, 256, 0, 0, 0, 0, 0, 0, 0, 0, 0, 1024, 4096]
        );
    }

    #[test]
    fn rejects_bad_headers() {
        let framer = TcpFramer::new();
        assert_eq!(
            framer.unwrap(&bytes("0001000100020101")),
            Err(FrameError::UnknownProtocolId(1))
        );
        assert_eq!(
            framer.unwrap(&bytes("00010000000001")),
            Err(FrameError::LengthZero)
        );
        assert_eq!(
            framer.unwrap(&bytes("000100000100010101")),
            Err(FrameError::LengthTooBig(0x100, 254))
        );
        assert_eq!(
            framer.unwrap(&bytes("000100")),
            Err(FrameError::FrameTooShort(3))
        );
    }

    #[test]
    fn measures_frames_in_a_stream() {
        let framer = TcpFramer::new();
        let mut stream = bytes("00060000000601010000000A");
        stream.extend(bytes("0007000000"));
        assert_eq!(framer.frame_length(&stream[..5], Direction::Request), Ok(None));
        assert_eq!(framer.frame_length(&stream[..11], Direction::Request), Ok(None));
        assert_eq!(framer.frame_length(&stream, Direction::Request), Ok(Some(12)));
        assert_eq!(
            framer.frame_length(&bytes("00010002000601"), Direction::Response),
            Err(FrameError::UnknownProtocolId(2))
        );
    }

    #[test]
    fn rejects_oversized_pdu() {
        let framer = TcpFramer::new();
        let header = framer.header(UnitId::new(1), 0);
        assert_eq!(
            framer.wrap(&header, &[0u8; 254]),
            Err(FrameError::PduTooLarge(254, 253))
        );
        assert!(framer.wrap(&header, &[0u8; 253]).is_ok());
    }
}
