/// Controls what a master logs about the traffic it sends and receives
///
/// Each layer is logged independently at the INFO level: the decoded PDU,
/// the framing envelope (MBAP header, serial address) and the raw bytes.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct DecodeLevel {
    /// Decoding of the function code and payload
    pub pdu: PduDecodeLevel,
    /// Decoding of the framing envelope
    pub adu: AduDecodeLevel,
    /// Logging of the bytes read from and written to the socket
    pub physical: PhysDecodeLevel,
}

/// How much of each PDU gets logged
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PduDecodeLevel {
    /// Log nothing
    #[default]
    Nothing,
    /// Log the function code only
    FunctionCode,
    /// Log the function code and a summary of the payload (addresses, counts)
    DataHeaders,
    /// Log the function code, the summary and every value
    DataValues,
}

/// How much of each framing envelope gets logged
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum AduDecodeLevel {
    /// Log nothing
    #[default]
    Nothing,
    /// Log the header fields
    Header,
    /// Log the header fields and the PDU bytes as hex
    Payload,
}

/// How much socket traffic gets logged
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum PhysDecodeLevel {
    /// Log nothing
    #[default]
    Nothing,
    /// Log the number of bytes of each read and write
    Length,
    /// Log the length and the bytes themselves
    Data,
}

impl DecodeLevel {
    /// Nothing is logged
    pub fn nothing() -> Self {
        Self::default()
    }

    /// Every layer is logged at its most verbose setting
    pub fn full() -> Self {
        Self::new(
            PduDecodeLevel::DataValues,
            AduDecodeLevel::Payload,
            PhysDecodeLevel::Data,
        )
    }

    /// Build a level from its three parts
    pub fn new(pdu: PduDecodeLevel, adu: AduDecodeLevel, physical: PhysDecodeLevel) -> Self {
        Self { pdu, adu, physical }
    }
}

impl From<PduDecodeLevel> for DecodeLevel {
    fn from(pdu: PduDecodeLevel) -> Self {
        Self {
            pdu,
            ..Self::default()
        }
    }
}

impl PduDecodeLevel {
    pub(crate) fn enabled(self) -> bool {
        !matches!(self, PduDecodeLevel::Nothing)
    }

    pub(crate) fn data_headers(self) -> bool {
        matches!(
            self,
            PduDecodeLevel::DataHeaders | PduDecodeLevel::DataValues
        )
    }

    pub(crate) fn data_values(self) -> bool {
        matches!(self, PduDecodeLevel::DataValues)
    }
}

impl AduDecodeLevel {
    pub(crate) fn enabled(self) -> bool {
        !matches!(self, AduDecodeLevel::Nothing)
    }

    pub(crate) fn payload_enabled(self) -> bool {
        matches!(self, AduDecodeLevel::Payload)
    }
}

impl PhysDecodeLevel {
    pub(crate) fn enabled(self) -> bool {
        !matches!(self, PhysDecodeLevel::Nothing)
    }

    pub(crate) fn data_enabled(self) -> bool {
        matches!(self, PhysDecodeLevel::Data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_cumulative() {
        assert!(!PduDecodeLevel::FunctionCode.data_headers());
        assert!(PduDecodeLevel::DataValues.data_headers());
        assert!(PduDecodeLevel::DataValues.data_values());
        assert!(!AduDecodeLevel::Header.payload_enabled());
        assert!(PhysDecodeLevel::Length.enabled());
        assert!(!PhysDecodeLevel::Length.data_enabled());
    }

    #[test]
    fn pdu_level_converts_into_full_level() {
        let level: DecodeLevel = PduDecodeLevel::DataHeaders.into();
        assert_eq!(level.pdu, PduDecodeLevel::DataHeaders);
        assert_eq!(level.adu, AduDecodeLevel::Nothing);
        assert_eq!(level.physical, PhysDecodeLevel::Nothing);
    }
}
