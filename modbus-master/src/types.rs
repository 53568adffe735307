use crate::decode::PduDecodeLevel;

/// Modbus unit identifier, a type-safe wrapper around `u8`
///
/// On TCP this is the MBAP unit id, on RTU and ASCII it is the serial address.
#[derive(Clone, Copy, Debug, PartialEq, PartialOrd, Ord, Eq, Hash)]
pub struct UnitId {
    /// underlying raw value
    pub value: u8,
}

impl UnitId {
    /// Create a new UnitId
    pub fn new(value: u8) -> Self {
        Self { value }
    }
}

/// `0xFF` is the conventional unit id for devices addressed over TCP
impl Default for UnitId {
    fn default() -> Self {
        Self { value: 0xFF }
    }
}

impl std::fmt::Display for UnitId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:#04X}", self.value)
    }
}

/// Value and its address
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Indexed<T> {
    /// address of the value
    pub index: u16,
    /// associated value
    pub value: T,
}

impl<T> Indexed<T> {
    /// Create a new indexed value
    pub fn new(index: u16, value: T) -> Self {
        Indexed { index, value }
    }
}

impl<T> From<(u16, T)> for Indexed<T> {
    fn from((index, value): (u16, T)) -> Self {
        Self::new(index, value)
    }
}

impl std::fmt::Display for Indexed<bool> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "idx: {:#06X} value: {}", self.index, self.value as i32)
    }
}

impl std::fmt::Display for Indexed<u16> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "idx: {:#06X} value: {:#06X}", self.index, self.value)
    }
}

/// Start and count echoed by the multiple-write functions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AddressRange {
    /// starting address of the range
    pub start: u16,
    /// count of elements in the range
    pub count: u16,
}

impl AddressRange {
    /// Create a range from its start and count
    pub fn new(start: u16, count: u16) -> Self {
        Self { start, count }
    }
}

impl std::fmt::Display for AddressRange {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "start: {:#06X} qty: {}", self.start, self.count)
    }
}

/// Block of registers returned by a register read
///
/// Keeps the raw big-endian bytes so that callers can reinterpret pairs of
/// registers (32-bit integers, floats) under their own word order.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RegisterBlock {
    start: u16,
    bytes: Vec<u8>,
}

impl RegisterBlock {
    pub(crate) fn new(start: u16, bytes: Vec<u8>) -> Self {
        Self { start, bytes }
    }

    /// Address of the first register
    pub fn start(&self) -> u16 {
        self.start
    }

    /// Number of registers in the block
    pub fn len(&self) -> usize {
        self.bytes.len() / 2
    }

    /// True if the block holds no registers
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Raw big-endian bytes, two per register
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Register values without addresses
    pub fn values(&self) -> Vec<u16> {
        self.bytes
            .chunks_exact(2)
            .map(|pair| u16::from_be_bytes([pair[0], pair[1]]))
            .collect()
    }

    /// Iterate over the registers with their addresses
    pub fn iter(&self) -> impl Iterator<Item = Indexed<u16>> + '_ {
        self.bytes
            .chunks_exact(2)
            .zip(0u16..)
            .map(move |(pair, offset)| {
                Indexed::new(
                    self.start.wrapping_add(offset),
                    u16::from_be_bytes([pair[0], pair[1]]),
                )
            })
    }
}

/// Fields of a `mask write register` request and its echo
///
/// The server computes `(current AND and_mask) OR (or_mask AND NOT and_mask)`.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MaskWrite {
    /// register address
    pub address: u16,
    /// AND mask
    pub and_mask: u16,
    /// OR mask
    pub or_mask: u16,
}

impl MaskWrite {
    /// Create a mask write
    pub fn new(address: u16, and_mask: u16, or_mask: u16) -> Self {
        Self {
            address,
            and_mask,
            or_mask,
        }
    }
}

/// Diagnostics sub-function and its data word, used in both directions
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Diagnostic {
    /// sub-function code
    pub sub_function: u16,
    /// data word
    pub data: u16,
}

impl Diagnostic {
    /// Create a diagnostic
    pub fn new(sub_function: u16, data: u16) -> Self {
        Self { sub_function, data }
    }
}

/// Response to `get comm event counter`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommEventCounter {
    /// 0xFFFF while a previous command is still processing
    pub status: u16,
    /// number of successful messages
    pub event_count: u16,
}

/// Response to `get comm event log`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CommEventLog {
    /// 0xFFFF while a previous command is still processing
    pub status: u16,
    /// number of successful messages
    pub event_count: u16,
    /// number of messages processed
    pub message_count: u16,
    /// event bytes, most recent first
    pub events: Vec<u8>,
}

/// Response to `report slave id`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SlaveId {
    /// device specific identifier
    pub slave_id: u8,
    /// true when the device reports 0xFF (running)
    pub run_indicator: bool,
    /// device specific trailing bytes
    pub additional_data: Vec<u8>,
}

/// One sub-request of a `read file record`
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FileRecordRequest {
    /// file number
    pub file_number: u16,
    /// starting record within the file
    pub record_number: u16,
    /// number of registers to read
    pub record_length: u16,
}

impl FileRecordRequest {
    /// Create a sub-request
    pub fn new(file_number: u16, record_number: u16, record_length: u16) -> Self {
        Self {
            file_number,
            record_number,
            record_length,
        }
    }
}

/// One sub-request of a `write file record` and its echo
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct FileRecord {
    /// file number
    pub file_number: u16,
    /// starting record within the file
    pub record_number: u16,
    /// register values
    pub data: Vec<u16>,
}

impl FileRecord {
    /// Create a record
    pub fn new(file_number: u16, record_number: u16, data: Vec<u16>) -> Self {
        Self {
            file_number,
            record_number,
            data,
        }
    }
}

pub(crate) struct ValuesDisplay<'a, T> {
    level: PduDecodeLevel,
    start: u16,
    values: &'a [T],
}

impl<'a, T> ValuesDisplay<'a, T> {
    pub(crate) fn new(level: PduDecodeLevel, start: u16, values: &'a [T]) -> Self {
        Self {
            level,
            start,
            values,
        }
    }
}

impl<T> std::fmt::Display for ValuesDisplay<'_, T>
where
    T: Copy,
    Indexed<T>: std::fmt::Display,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "start: {:#06X} qty: {}", self.start, self.values.len())?;
        if self.level.data_values() {
            for (value, offset) in self.values.iter().zip(0u16..) {
                write!(
                    f,
                    "\n{}",
                    Indexed::new(self.start.wrapping_add(offset), *value)
                )?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn register_block_exposes_raw_and_typed_views() {
        let block = RegisterBlock::new(10, vec![0x02, 0x00, 0x01, 0x00]);
        assert_eq!(block.len(), 2);
        assert_eq!(block.as_bytes(), &[0x02, 0x00, 0x01, 0x00]);
        assert_eq!(block.values(), vec![512, 256]);
        let indexed: Vec<Indexed<u16>> = block.iter().collect();
        assert_eq!(indexed, vec![Indexed::new(10, 512), Indexed::new(11, 256)]);
    }

    #[test]
    fn displays_values_with_addresses() {
        let values = [true, false];
        let text = ValuesDisplay::new(PduDecodeLevel::DataValues, 3, &values).to_string();
        assert_eq!(
            text,
            "start: 0x0003 qty: 2\nidx: 0x0003 value: 1\nidx: 0x0004 value: 0"
        );
        let text = ValuesDisplay::new(PduDecodeLevel::DataHeaders, 3, &values).to_string();
        assert_eq!(text, "start: 0x0003 qty: 2");
    }

    #[test]
    fn unit_id_defaults_to_the_tcp_convention() {
        assert_eq!(UnitId::default(), UnitId::new(0xFF));
        assert_eq!(UnitId::new(1).to_string(), "0x01");
    }
}
