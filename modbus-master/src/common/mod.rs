pub(crate) mod bits;
pub(crate) mod buffer;
/// CRC-16 and LRC checksums used by the serial framings
pub mod checksum;
/// Function codes
pub mod function;
pub(crate) mod phys;
