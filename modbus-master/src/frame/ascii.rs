use crate::common::checksum::lrc;
use crate::error::FrameError;
use crate::frame::{check_pdu_length, Direction, Frame, Framer, Header, SerialHeader};
use crate::types::UnitId;

pub(crate) mod constants {
    pub(crate) const START: u8 = b':';
    pub(crate) const END: &[u8] = b"\r\n";
    /// ':' + hex(address + function code + lrc) + CRLF
    pub(crate) const MIN_FRAME_LENGTH: usize = 1 + 2 * 3 + 2;
    pub(crate) const MAX_FRAME_LENGTH: usize =
        1 + 2 * (1 + crate::frame::constants::MAX_PDU_LENGTH + 1) + 2;
}

/// Modbus ASCII framing carried over a byte stream
///
/// `':'`, then address, PDU and LRC as upper-case hex, then CR LF.
#[derive(Clone, Copy, Debug, Default)]
pub struct AsciiFramer;

impl AsciiFramer {
    /// Create the framer
    pub fn new() -> Self {
        Self
    }
}

impl Framer for AsciiFramer {
    fn name(&self) -> &'static str {
        "ASCII"
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

        let mut binary = Vec::with_capacity(pdu.len() + 2);
        binary.push(address);
        binary.extend_from_slice(pdu);
        binary.push(lrc(&binary));

        let mut frame = Vec::with_capacity(2 * binary.len() + 3);
        frame.push(constants::START);
        frame.extend_from_slice(hex::encode_upper(&binary).as_bytes());
        frame.extend_from_slice(constants::END);
        Ok(frame)
    }

    fn unwrap(&self, frame: &[u8]) -> Result<Frame, FrameError> {
        if frame.first() != Some(&constants::START) {
            return Err(FrameError::MissingStart);
        }
        if !frame.ends_with(constants::END) {
            return Err(FrameError::MissingEnd);
        }
        if frame.len() < constants::MIN_FRAME_LENGTH {
            return Err(FrameError::FrameTooShort(frame.len()));
        }
        if frame.len() > constants::MAX_FRAME_LENGTH {
            return Err(FrameError::LengthTooBig(frame.len(), constants::MAX_FRAME_LENGTH));
        }

        let text = &frame[1..frame.len() - constants::END.len()];
        let binary = hex::decode(text).map_err(|_| FrameError::InvalidHex)?;

        let (body, checksum) = binary.split_at(binary.len() - 1);
        let received = checksum[0];
        let expected = lrc(body);
        if received != expected {
            return Err(FrameError::LrcMismatch { received, expected });
        }

        Ok(Frame {
            header: Header::Serial(SerialHeader { address: body[0] }),
            pdu: body[1..].to_vec(),
        })
    }

    fn frame_length(
        &self,
        buffer: &[u8],
        _direction: Direction,
    ) -> Result<Option<usize>, FrameError> {
        match buffer.first() {
            None => return Ok(None),
            Some(&constants::START) => {}
            Some(_) => return Err(FrameError::MissingStart),
        }

        match buffer
            .windows(constants::END.len())
            .position(|window| window == constants::END)
        {
            Some(pos) => Ok(Some(pos + constants::END.len())),
            None if buffer.len() >= constants::MAX_FRAME_LENGTH => {
                Err(FrameError::LengthTooBig(buffer.len(), constants::MAX_FRAME_LENGTH))
            }
            None => Ok(None),
        }
    }

    fn max_frame_length(&self) -> usize {
        constants::MAX_FRAME_LENGTH
    }

    fn noise_length(&self, buffer: &[u8]) -> usize {
        buffer
            .iter()
            .position(|b| *b == constants::START)
            .unwrap_or(buffer.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pdu::{decode_request, Request};

    const READ_HOLDING_REQUEST: &[u8] = b":1103006B00037E\r\n";

    #[test]
    fn wraps_in_text_envelope() {
        let framer = AsciiFramer::new();
        let header = framer.header(UnitId::new(0x11), 0);
        let frame = framer
            .wrap(&header, &[0x03, 0x00, 0x6B, 0x00, 0x03])
            .unwrap();
        assert_eq!(frame, READ_HOLDING_REQUEST);
        assert_eq!(frame.first(), Some(&b':'));
        assert!(frame.ends_with(b"\r\n"));
        let hex = &frame[1..frame.len() - 2];
        assert!(hex
            .iter()
            .all(|c| c.is_ascii_digit() || (b'A'..=b'F').contains(c)));
    }

    #[test]
    fn unwraps_text_envelope() {
        let frame = AsciiFramer::new().unwrap(READ_HOLDING_REQUEST).unwrap();
        assert_eq!(frame.header.unit_id(), UnitId::new(0x11));
        assert_eq!(
            decode_request(&frame.pdu).unwrap(),
            Request::ReadHoldingRegisters {
                address: 0x6B,
                count: 3
            }
        );
    }

    #[test]
    fn rejects_missing_delimiters() {
        let framer = AsciiFramer::new();
        assert_eq!(
            framer.unwrap(b"1103006B00037E\r\n"),
            Err(FrameError::MissingStart)
        );
        assert_eq!(
            framer.unwrap(b":1103006B00037E"),
            Err(FrameError::MissingEnd)
        );
        assert_eq!(
            framer.unwrap(b":1103006B00037E\n"),
            Err(FrameError::MissingEnd)
        );
    }

    #[test]
    fn rejects_bad_lrc_and_bad_hex() {
        let framer = AsciiFramer::new();
        assert_eq!(
            framer.unwrap(b":1103006B00037F\r\n"),
            Err(FrameError::LrcMismatch {
                received: 0x7F,
                expected: 0x7E
            })
        );
        assert_eq!(
            framer.unwrap(b":1103006B0003ZZ\r\n"),
            Err(FrameError::InvalidHex)
        );
        assert_eq!(
            framer.unwrap(b":1103006B00037\r\n"),
            Err(FrameError::InvalidHex)
        );
    }

    #[test]
    fn splits_stream_on_terminator() {
        let framer = AsciiFramer::new();
        let mut stream = READ_HOLDING_REQUEST.to_vec();
        stream.extend_from_slice(b":11");
        assert_eq!(framer.frame_length(&stream[..5], Direction::Response), Ok(None));
        assert_eq!(
            framer.frame_length(&stream, Direction::Response),
            Ok(Some(READ_HOLDING_REQUEST.len()))
        );
        assert_eq!(
            framer.frame_length(b"garbage", Direction::Response),
            Err(FrameError::MissingStart)
        );
    }

    #[test]
    fn skips_to_the_next_start_delimiter() {
        let framer = AsciiFramer::new();
        let mut stream = b"\x00\r\n".to_vec();
        stream.extend_from_slice(READ_HOLDING_REQUEST);
        assert_eq!(framer.noise_length(&stream), 3);
        assert_eq!(framer.noise_length(READ_HOLDING_REQUEST), 0);
        assert_eq!(framer.noise_length(b"noise"), 5);
        assert_eq!(framer.noise_length(b""), 0);
    }

    #[test]
    fn unterminated_stream_is_bounded() {
        let framer = AsciiFramer::new();
        let mut stream = vec![b':'];
        stream.extend(std::iter::repeat(b'0').take(constants::MAX_FRAME_LENGTH));
        assert_eq!(
            framer.frame_length(&stream, Direction::Response),
            Err(FrameError::LengthTooBig(514, 513))
        );
    }
}
