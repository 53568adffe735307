//! An async implementation of a [Modbus](http://modbus.org/) master using
//! [Tokio](https://docs.rs/tokio).
//!
//! # Features
//!
//! * Panic-free parsing of every supported PDU
//! * MBAP (TCP), RTU and ASCII framing, all carried over a TCP stream
//! * Concurrent calls, correlated by transaction id or by function code
//! * Protocol logging at the PDU, ADU and physical layers via `tracing`
//!
//! # Supported Functions
//!
//! * Read Coils
//! * Read Discrete Inputs
//! * Read Holding Registers
//! * Read Input Registers
//! * Write Single Coil
//! * Write Single Register
//! * Read Exception Status
//! * Diagnostics
//! * Get Comm Event Counter
//! * Get Comm Event Log
//! * Write Multiple Coils
//! * Write Multiple Registers
//! * Report Slave ID
//! * Read File Record
//! * Write File Record
//! * Mask Write Register
//! * Read/Write Multiple Registers
//! * Read FIFO Queue
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//!
//! use modbus_master::client::{Master, MasterConfig, Reply};
//! use modbus_master::UnitId;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let master = Master::tcp(MasterConfig::new().response_timeout(Duration::from_secs(1)));
//!     master.connect("127.0.0.1:502".parse()?).await?;
//!
//!     match master.read_coils(UnitId::new(1), 0, 5).await? {
//!         Reply::Value(coils) => {
//!             for coil in coils {
//!                 println!("index: {} value: {}", coil.index, coil.value);
//!             }
//!         }
//!         Reply::Exception(ex) => println!("{}", ex),
//!     }
//!     Ok(())
//! }
//! ```

/// Master API
pub mod client;
/// Checksums and function codes
pub mod common;
/// Protocol constants
pub mod constants;
/// Logging levels for the protocol layers
pub mod decode;
/// Error types
pub mod error;
/// Exception codes and exception responses
pub mod exception;
/// Transport framing
pub mod frame;
/// Protocol data unit codec
pub mod pdu;
/// Values carried by requests and responses
pub mod types;

pub use crate::decode::{AduDecodeLevel, DecodeLevel, PduDecodeLevel, PhysDecodeLevel};
pub use crate::error::{DataError, FrameError, NoSuchPending, PduError, RequestError};
pub use crate::exception::{ExceptionCode, ExceptionResponse};
pub use crate::types::{
    AddressRange, CommEventCounter, CommEventLog, Diagnostic, FileRecord, FileRecordRequest,
    Indexed, MaskWrite, RegisterBlock, SlaveId, UnitId,
};
