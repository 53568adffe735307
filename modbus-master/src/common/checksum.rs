use crc::{Crc, CRC_16_MODBUS};

const CRC: Crc<u16> = Crc::<u16>::new(&CRC_16_MODBUS);

/// CRC16 used by RTU framing (reflected 0xA001, initial value 0xFFFF)
pub fn crc16(data: &[u8]) -> u16 {
    CRC.checksum(data)
}

/// Longitudinal redundancy check used by ASCII framing
///
/// The two's complement of the 8-bit sum of every byte.
pub fn lrc(data: &[u8]) -> u8 {
    let sum = data.iter().fold(0u8, |acc, b| acc.wrapping_add(*b));
    0xFFu8.wrapping_sub(sum).wrapping_add(1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitwise_crc16(data: &[u8]) -> u16 {
        let mut crc: u16 = 0xFFFF;
        for byte in data {
            crc ^= *byte as u16;
            for _ in 0..8 {
                if crc & 0x0001 != 0 {
                    crc = (crc >> 1) ^ 0xA001;
                } else {
                    crc >>= 1;
                }
            }
        }
        crc
    }

    #[test]
    fn crc_matches_known_frame() {
        // 2A 01 00 10 00 13 is followed on the wire by 7A 19
        let data = [0x2A, 0x01, 0x00, 0x10, 0x00, 0x13];
        assert_eq!(crc16(&data).to_le_bytes(), [0x7A, 0x19]);
    }

    #[test]
    fn crc_agrees_with_bitwise_definition() {
        let samples: [&[u8]; 4] = [
            &[],
            &[0x01],
            &[0x11, 0x03, 0x00, 0x6B, 0x00, 0x03],
            b"123456789",
        ];
        for sample in samples {
            assert_eq!(crc16(sample), bitwise_crc16(sample));
        }
        assert_eq!(crc16(b"123456789"), 0x4B37);
    }

    #[test]
    fn lrc_is_twos_complement_of_sum() {
        // read holding registers, unit 0x11, address 0x006B, count 3
        assert_eq!(lrc(&[0x11, 0x03, 0x00, 0x6B, 0x00, 0x03]), 0x7E);
        assert_eq!(lrc(&[]), 0x00);
        assert_eq!(lrc(&[0xFF, 0x01]), 0x00);
    }
}
