use std::fmt::Write;

use crate::decode::PhysDecodeLevel;

const BYTES_PER_LINE: usize = 18;

pub(crate) struct PhysDisplay<'a> {
    level: PhysDecodeLevel,
    data: &'a [u8],
}

impl<'a> PhysDisplay<'a> {
    pub(crate) fn new(level: PhysDecodeLevel, data: &'a [u8]) -> Self {
        Self { level, data }
    }
}

impl std::fmt::Display for PhysDisplay<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(f, "{} bytes", self.data.len())?;
        if self.level.data_enabled() {
            format_bytes(f, self.data)?;
        }
        Ok(())
    }
}

/// write bytes as upper-case hex, one line per chunk
pub(crate) fn format_bytes(f: &mut std::fmt::Formatter, bytes: &[u8]) -> std::fmt::Result {
    for chunk in bytes.chunks(BYTES_PER_LINE) {
        writeln!(f)?;
        for (i, byte) in chunk.iter().enumerate() {
            if i != 0 {
                f.write_char(' ')?;
            }
            write!(f, "{byte:02X}")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn length_only_omits_bytes() {
        let text = PhysDisplay::new(PhysDecodeLevel::Length, &[0x01, 0x02]).to_string();
        assert_eq!(text, "2 bytes");
    }

    #[test]
    fn data_level_wraps_long_frames() {
        let bytes: Vec<u8> = (0..20).collect();
        let text = PhysDisplay::new(PhysDecodeLevel::Data, &bytes).to_string();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0], "20 bytes");
        assert!(lines[1].starts_with("00 01 02"));
        assert_eq!(lines[2], "12 13");
    }
}
