use std::net::SocketAddr;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tracing::Instrument;

use crate::client::correlator::{Correlator, Delivery};
use crate::client::endpoint::{Endpoint, EndpointHandler};
use crate::client::listener::{ConnectionState, Listener, NullListener};
use crate::common::bits;
use crate::decode::DecodeLevel;
use crate::error::{DataError, PduError, RequestError};
use crate::exception::ExceptionResponse;
use crate::frame::{
    AduDisplay, AsciiFramer, CorrelationId, Frame, Framer, Header, RtuFramer, TcpFramer, TxId,
};
use crate::pdu::display::{RequestDisplay, ResponseDisplay};
use crate::pdu::{decode_response, encode_request, Request, Response};
use crate::types::{
    AddressRange, CommEventCounter, CommEventLog, Diagnostic, FileRecord, FileRecordRequest,
    Indexed, MaskWrite, RegisterBlock, SlaveId, UnitId,
};

/// Settings applied to every call a master makes
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct MasterConfig {
    /// how long a call waits for its response
    pub response_timeout: Duration,
    /// how long `connect` waits for the TCP connection
    pub connect_timeout: Duration,
    /// protocol logging
    pub decode: DecodeLevel,
}

impl Default for MasterConfig {
    fn default() -> Self {
        Self {
            response_timeout: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(5),
            decode: DecodeLevel::default(),
        }
    }
}

impl MasterConfig {
    /// Default configuration
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the response timeout
    pub fn response_timeout(mut self, value: Duration) -> Self {
        self.response_timeout = value;
        self
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, value: Duration) -> Self {
        self.connect_timeout = value;
        self
    }

    /// Set the decode level
    pub fn decode(mut self, value: DecodeLevel) -> Self {
        self.decode = value;
        self
    }
}

/// Outcome of a call that reached the slave
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply<T> {
    /// the slave performed the request
    Value(T),
    /// the slave answered with an exception response
    Exception(ExceptionResponse),
}

impl<T> Reply<T> {
    /// The value, if the slave didn't reply with an exception
    pub fn value(self) -> Option<T> {
        match self {
            Reply::Value(value) => Some(value),
            Reply::Exception(_) => None,
        }
    }

    /// The exception, if the slave replied with one
    pub fn exception(&self) -> Option<ExceptionResponse> {
        match self {
            Reply::Value(_) => None,
            Reply::Exception(ex) => Some(*ex),
        }
    }

    /// Convert into a `Result` with the exception as the error
    pub fn into_result(self) -> Result<T, ExceptionResponse> {
        match self {
            Reply::Value(value) => Ok(value),
            Reply::Exception(ex) => Err(ex),
        }
    }

    /// Transform the value, leaving an exception untouched
    pub fn map<U, M>(self, map: M) -> Reply<U>
    where
        M: FnOnce(T) -> U,
    {
        match self {
            Reply::Value(value) => Reply::Value(map(value)),
            Reply::Exception(ex) => Reply::Exception(ex),
        }
    }

    fn try_map<U, M>(self, map: M) -> Result<Reply<U>, RequestError>
    where
        M: FnOnce(T) -> Result<U, RequestError>,
    {
        match self {
            Reply::Value(value) => Ok(Reply::Value(map(value)?)),
            Reply::Exception(ex) => Ok(Reply::Exception(ex)),
        }
    }
}

struct StateTracker {
    state: ConnectionState,
    listener: Box<dyn Listener<ConnectionState>>,
}

/// Routes endpoint events into the correlator
struct Dispatcher<F: Framer> {
    framer: Arc<F>,
    correlator: Arc<Correlator>,
    tracker: Mutex<StateTracker>,
    decode: DecodeLevel,
}

impl<F: Framer> Dispatcher<F> {
    fn state(&self) -> ConnectionState {
        self.tracker
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .state
    }

    fn set_state(&self, state: ConnectionState) {
        let mut tracker = self.tracker.lock().unwrap_or_else(PoisonError::into_inner);
        if tracker.state != state {
            tracker.state = state;
            tracker.listener.update(state);
        }
    }

    fn fail_pending(&self) {
        let count = self.correlator.fail_all(RequestError::Disconnected);
        if count > 0 {
            tracing::warn!("{} outstanding calls failed by disconnect", count);
        }
    }
}

impl<F: Framer> EndpointHandler for Dispatcher<F> {
    fn on_connect(&self, peer: SocketAddr) {
        tracing::info!("connected to {} ({})", peer, self.framer.name());
        self.set_state(ConnectionState::Connected);
        if let Err(err) = self
            .correlator
            .deliver(CorrelationId::Handshake, Ok(Delivery::Connected))
        {
            tracing::debug!("{}", err);
        }
    }

    fn on_disconnect(&self, peer: SocketAddr) {
        tracing::info!("disconnected from {}", peer);
        self.set_state(ConnectionState::Disconnected);
        self.fail_pending();
    }

    fn on_frame(&self, frame: Frame) {
        let function = match frame.pdu.first() {
            Some(function) => *function,
            None => {
                tracing::warn!("discarding frame with an empty pdu");
                return;
            }
        };
        let id = self.framer.correlation_id(&frame.header, function);

        let result = match decode_response(&frame.pdu) {
            Ok(response) => {
                if self.decode.pdu.enabled() {
                    tracing::info!(
                        "PDU RX - {}",
                        ResponseDisplay::new(self.decode.pdu, &response)
                    );
                }
                Ok(Delivery::Response(response))
            }
            Err(err) => {
                tracing::warn!("response for {} failed to decode: {}", id, err);
                Err(RequestError::Pdu(err))
            }
        };

        if let Err(err) = self.correlator.deliver(id, result) {
            tracing::warn!("discarding response: {}", err);
        }
    }
}

#[derive(Default)]
struct Link {
    peer: Option<SocketAddr>,
    endpoint: Option<Endpoint>,
}

/// Modbus master over a TCP byte stream, generic over the framing
///
/// Calls may be made concurrently from many tasks. On TCP they are matched by
/// transaction id, on RTU and ASCII by function code, so at most one call per
/// function code may be outstanding on a serial master.
pub struct Master<F: Framer> {
    framer: Arc<F>,
    config: MasterConfig,
    dispatcher: Arc<Dispatcher<F>>,
    tx_id: Mutex<TxId>,
    link: tokio::sync::Mutex<Link>,
}

/// Master using MBAP framing
pub type TcpMaster = Master<TcpFramer>;
/// Master using RTU framing over a TCP stream
pub type RtuMaster = Master<RtuFramer>;
/// Master using ASCII framing over a TCP stream
pub type AsciiMaster = Master<AsciiFramer>;

impl Master<TcpFramer> {
    /// Create a disconnected TCP master
    pub fn tcp(config: MasterConfig) -> Self {
        Self::new(TcpFramer::new(), config)
    }
}

impl Master<RtuFramer> {
    /// Create a disconnected RTU master
    pub fn rtu(config: MasterConfig) -> Self {
        Self::new(RtuFramer::new(), config)
    }
}

impl Master<AsciiFramer> {
    /// Create a disconnected ASCII master
    pub fn ascii(config: MasterConfig) -> Self {
        Self::new(AsciiFramer::new(), config)
    }
}

impl<F: Framer> Master<F> {
    /// Create a disconnected master
    pub fn new(framer: F, config: MasterConfig) -> Self {
        Self::with_listener(framer, config, NullListener::create())
    }

    /// Create a disconnected master that reports connection state changes
    pub fn with_listener(
        framer: F,
        config: MasterConfig,
        listener: Box<dyn Listener<ConnectionState>>,
    ) -> Self {
        let framer = Arc::new(framer);
        let dispatcher = Arc::new(Dispatcher {
            framer: framer.clone(),
            correlator: Correlator::new(),
            tracker: Mutex::new(StateTracker {
                state: ConnectionState::Disconnected,
                listener,
            }),
            decode: config.decode,
        });
        Self {
            framer,
            config,
            dispatcher,
            tx_id: Mutex::new(TxId::default()),
            link: tokio::sync::Mutex::new(Link::default()),
        }
    }

    /// Current connection state
    pub fn state(&self) -> ConnectionState {
        self.dispatcher.state()
    }

    /// Configuration supplied at construction
    pub fn config(&self) -> &MasterConfig {
        &self.config
    }

    /// Connect to `addr`, replacing any existing connection
    ///
    /// Returns once the receive task is running.
    pub async fn connect(&self, addr: SocketAddr) -> Result<(), RequestError> {
        let mut link = self.link.lock().await;
        if let Some(endpoint) = link.endpoint.take() {
            endpoint.close().await;
        }
        link.peer = Some(addr);
        self.open(&mut link, addr).await
    }

    /// Connect again to the address of the last `connect`
    pub async fn reconnect(&self) -> Result<(), RequestError> {
        let mut link = self.link.lock().await;
        let addr = link.peer.ok_or(RequestError::NoConnection)?;
        if let Some(endpoint) = link.endpoint.take() {
            endpoint.close().await;
        }
        self.open(&mut link, addr).await
    }

    /// Close the connection, outstanding calls fail with `Disconnected`
    pub async fn close(&self) {
        let mut link = self.link.lock().await;
        if let Some(endpoint) = link.endpoint.take() {
            endpoint.close().await;
        }
        self.dispatcher.set_state(ConnectionState::Disconnected);
        self.dispatcher.fail_pending();
    }

    async fn open(&self, link: &mut Link, addr: SocketAddr) -> Result<(), RequestError> {
        tracing::info!("connecting to {} ({})", addr, self.framer.name());
        self.dispatcher.set_state(ConnectionState::Connecting);

        let handshake = self
            .dispatcher
            .correlator
            .register(CorrelationId::Handshake)?;

        let handler: Arc<dyn EndpointHandler> = self.dispatcher.clone();
        let endpoint = match Endpoint::connect(
            addr,
            self.framer.clone(),
            handler,
            self.config.decode,
            self.config.connect_timeout,
        )
        .await
        {
            Ok(endpoint) => endpoint,
            Err(err) => {
                tracing::warn!("failed to connect to {}: {}", addr, err);
                self.dispatcher.set_state(ConnectionState::Disconnected);
                return Err(err);
            }
        };
        link.endpoint = Some(endpoint);

        match handshake.wait(self.config.connect_timeout).await {
            Ok(_) => Ok(()),
            Err(err) => {
                if let Some(endpoint) = link.endpoint.take() {
                    endpoint.close().await;
                }
                Err(err)
            }
        }
    }

    fn next_transaction(&self) -> u16 {
        self.tx_id
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .next()
    }

    /// Send any request and wait for its response
    ///
    /// The response is checked to carry the request's function code.
    pub async fn call(
        &self,
        unit_id: UnitId,
        request: Request,
    ) -> Result<Reply<Response>, RequestError> {
        let header = self.framer.header(unit_id, self.next_transaction());
        let id = self
            .framer
            .correlation_id(&header, request.function().get_value());
        self.transact(header, id, request)
            .instrument(tracing::info_span!("Transaction", id = %id))
            .await
    }

    async fn transact(
        &self,
        header: Header,
        id: CorrelationId,
        request: Request,
    ) -> Result<Reply<Response>, RequestError> {
        let function = request.function();
        let decode = self.config.decode;

        let pdu = encode_request(&request)?;
        if decode.pdu.enabled() {
            tracing::info!("PDU TX - {}", RequestDisplay::new(decode.pdu, &request));
        }

        let frame = self.framer.wrap(&header, &pdu)?;
        if decode.adu.enabled() {
            if let Ok(adu) = self.framer.unwrap(&frame) {
                tracing::info!("ADU TX - {}", AduDisplay::new(decode.adu, &adu));
            }
        }

        // a connection swap holds the link lock, calls sent afterwards outlive it
        let pending = {
            let link = self.link.lock().await;
            let endpoint = link.endpoint.as_ref().ok_or(RequestError::NoConnection)?;
            let pending = self.dispatcher.correlator.register(id)?;
            endpoint.send(&frame).await?;
            pending
        };

        match pending.wait(self.config.response_timeout).await? {
            Delivery::Response(Response::Exception(ex)) => {
                if ex.function != function {
                    return Err(PduError::IllegalFuncCode(ex.function.as_error()).into());
                }
                Ok(Reply::Exception(ex))
            }
            Delivery::Response(response) => {
                if response.function() != function {
                    return Err(unexpected(&response));
                }
                Ok(Reply::Value(response))
            }
            // only the handshake id is ever handed `Connected`
            Delivery::Connected => Err(PduError::IllegalFuncCode(function.get_value()).into()),
        }
    }

    /// Read coils (0x01)
    pub async fn read_coils(
        &self,
        unit_id: UnitId,
        address: u16,
        count: u16,
    ) -> Result<Reply<Vec<Indexed<bool>>>, RequestError> {
        self.call(unit_id, Request::ReadCoils { address, count })
            .await?
            .try_map(|response| match response {
                Response::ReadCoils { data } => indexed_bits(address, count, &data),
                other => Err(unexpected(&other)),
            })
    }

    /// Read discrete inputs (0x02)
    pub async fn read_discrete_inputs(
        &self,
        unit_id: UnitId,
        address: u16,
        count: u16,
    ) -> Result<Reply<Vec<Indexed<bool>>>, RequestError> {
        self.call(unit_id, Request::ReadDiscreteInputs { address, count })
            .await?
            .try_map(|response| match response {
                Response::ReadDiscreteInputs { data } => indexed_bits(address, count, &data),
                other => Err(unexpected(&other)),
            })
    }

    /// Read holding registers (0x03)
    pub async fn read_holding_registers(
        &self,
        unit_id: UnitId,
        address: u16,
        count: u16,
    ) -> Result<Reply<RegisterBlock>, RequestError> {
        self.call(unit_id, Request::ReadHoldingRegisters { address, count })
            .await?
            .try_map(|response| match response {
                Response::ReadHoldingRegisters { data } => register_block(address, count, data),
                other => Err(unexpected(&other)),
            })
    }

    /// Read input registers (0x04)
    pub async fn read_input_registers(
        &self,
        unit_id: UnitId,
        address: u16,
        count: u16,
    ) -> Result<Reply<RegisterBlock>, RequestError> {
        self.call(unit_id, Request::ReadInputRegisters { address, count })
            .await?
            .try_map(|response| match response {
                Response::ReadInputRegisters { data } => register_block(address, count, data),
                other => Err(unexpected(&other)),
            })
    }

    /// Write single coil (0x05)
    pub async fn write_single_coil(
        &self,
        unit_id: UnitId,
        value: Indexed<bool>,
    ) -> Result<Reply<Indexed<bool>>, RequestError> {
        self.call(unit_id, Request::WriteSingleCoil(value))
            .await?
            .try_map(|response| match response {
                Response::WriteSingleCoil(echo) => check_echo(value, echo),
                other => Err(unexpected(&other)),
            })
    }

    /// Write single register (0x06)
    pub async fn write_single_register(
        &self,
        unit_id: UnitId,
        value: Indexed<u16>,
    ) -> Result<Reply<Indexed<u16>>, RequestError> {
        self.call(unit_id, Request::WriteSingleRegister(value))
            .await?
            .try_map(|response| match response {
                Response::WriteSingleRegister(echo) => check_echo(value, echo),
                other => Err(unexpected(&other)),
            })
    }

    /// Write multiple coils (0x0F)
    pub async fn write_multiple_coils(
        &self,
        unit_id: UnitId,
        address: u16,
        values: Vec<bool>,
    ) -> Result<Reply<AddressRange>, RequestError> {
        let expected = AddressRange::new(address, crate::pdu::count_of(values.len()));
        self.call(unit_id, Request::WriteMultipleCoils { address, values })
            .await?
            .try_map(|response| match response {
                Response::WriteMultipleCoils(echo) => check_echo(expected, echo),
                other => Err(unexpected(&other)),
            })
    }

    /// Write multiple registers (0x10)
    pub async fn write_multiple_registers(
        &self,
        unit_id: UnitId,
        address: u16,
        values: Vec<u16>,
    ) -> Result<Reply<AddressRange>, RequestError> {
        let expected = AddressRange::new(address, crate::pdu::count_of(values.len()));
        self.call(unit_id, Request::WriteMultipleRegisters { address, values })
            .await?
            .try_map(|response| match response {
                Response::WriteMultipleRegisters(echo) => check_echo(expected, echo),
                other => Err(unexpected(&other)),
            })
    }

    /// Read exception status (0x07)
    pub async fn read_exception_status(&self, unit_id: UnitId) -> Result<Reply<u8>, RequestError> {
        self.call(unit_id, Request::ReadExceptionStatus)
            .await?
            .try_map(|response| match response {
                Response::ReadExceptionStatus(status) => Ok(status),
                other => Err(unexpected(&other)),
            })
    }

    /// Diagnostics (0x08)
    pub async fn diagnostics(
        &self,
        unit_id: UnitId,
        diagnostic: Diagnostic,
    ) -> Result<Reply<Diagnostic>, RequestError> {
        self.call(unit_id, Request::Diagnostics(diagnostic))
            .await?
            .try_map(|response| match response {
                Response::Diagnostics(value) => Ok(value),
                other => Err(unexpected(&other)),
            })
    }

    /// Get comm event counter (0x0B)
    pub async fn get_comm_event_counter(
        &self,
        unit_id: UnitId,
    ) -> Result<Reply<CommEventCounter>, RequestError> {
        self.call(unit_id, Request::GetCommEventCounter)
            .await?
            .try_map(|response| match response {
                Response::GetCommEventCounter(value) => Ok(value),
                other => Err(unexpected(&other)),
            })
    }

    /// Get comm event log (0x0C)
    pub async fn get_comm_event_log(
        &self,
        unit_id: UnitId,
    ) -> Result<Reply<CommEventLog>, RequestError> {
        self.call(unit_id, Request::GetCommEventLog)
            .await?
            .try_map(|response| match response {
                Response::GetCommEventLog(value) => Ok(value),
                other => Err(unexpected(&other)),
            })
    }

    /// Report slave id (0x11)
    pub async fn report_slave_id(&self, unit_id: UnitId) -> Result<Reply<SlaveId>, RequestError> {
        self.call(unit_id, Request::ReportSlaveId)
            .await?
            .try_map(|response| match response {
                Response::ReportSlaveId(value) => Ok(value),
                other => Err(unexpected(&other)),
            })
    }

    /// Read file record (0x14), one register list per sub-request
    pub async fn read_file_record(
        &self,
        unit_id: UnitId,
        items: Vec<FileRecordRequest>,
    ) -> Result<Reply<Vec<Vec<u16>>>, RequestError> {
        let expected = items.len();
        self.call(unit_id, Request::ReadFileRecord(items))
            .await?
            .try_map(|response| match response {
                Response::ReadFileRecord(records) if records.len() == expected => Ok(records),
                Response::ReadFileRecord(_) => Err(DataError::EchoMismatch.into()),
                other => Err(unexpected(&other)),
            })
    }

    /// Write file record (0x15)
    pub async fn write_file_record(
        &self,
        unit_id: UnitId,
        records: Vec<FileRecord>,
    ) -> Result<Reply<Vec<FileRecord>>, RequestError> {
        let expected = records.clone();
        self.call(unit_id, Request::WriteFileRecord(records))
            .await?
            .try_map(|response| match response {
                Response::WriteFileRecord(echo) => check_echo(expected, echo),
                other => Err(unexpected(&other)),
            })
    }

    /// Mask write register (0x16)
    pub async fn mask_write_register(
        &self,
        unit_id: UnitId,
        mask: MaskWrite,
    ) -> Result<Reply<MaskWrite>, RequestError> {
        self.call(unit_id, Request::MaskWriteRegister(mask))
            .await?
            .try_map(|response| match response {
                Response::MaskWriteRegister(echo) => check_echo(mask, echo),
                other => Err(unexpected(&other)),
            })
    }

    /// Read/write multiple registers (0x17), the writes happen before the reads
    pub async fn read_write_multiple_registers(
        &self,
        unit_id: UnitId,
        read_address: u16,
        read_count: u16,
        write_address: u16,
        values: Vec<u16>,
    ) -> Result<Reply<RegisterBlock>, RequestError> {
        let request = Request::ReadWriteMultipleRegisters {
            read_address,
            read_count,
            write_address,
            values,
        };
        self.call(unit_id, request)
            .await?
            .try_map(|response| match response {
                Response::ReadWriteMultipleRegisters { data } => {
                    register_block(read_address, read_count, data)
                }
                other => Err(unexpected(&other)),
            })
    }

    /// Read FIFO queue (0x18)
    pub async fn read_fifo_queue(
        &self,
        unit_id: UnitId,
        address: u16,
    ) -> Result<Reply<Vec<u16>>, RequestError> {
        self.call(unit_id, Request::ReadFifoQueue { address })
            .await?
            .try_map(|response| match response {
                Response::ReadFifoQueue(values) => Ok(values),
                other => Err(unexpected(&other)),
            })
    }
}

fn unexpected(response: &Response) -> RequestError {
    PduError::IllegalFuncCode(response.function().get_value()).into()
}

fn check_echo<T: PartialEq>(expected: T, echo: T) -> Result<T, RequestError> {
    if expected != echo {
        return Err(DataError::EchoMismatch.into());
    }
    Ok(echo)
}

fn indexed_bits(address: u16, count: u16, data: &[u8]) -> Result<Vec<Indexed<bool>>, RequestError> {
    let expected = bits::num_bytes_for_bits(count);
    if data.len() != expected {
        return Err(DataError::UnexpectedByteCount(expected, data.len()).into());
    }
    let values = bits::unpack(data, count).ok_or(DataError::InsufficientBytes)?;
    Ok(values
        .into_iter()
        .zip(0u16..)
        .map(|(value, offset)| Indexed::new(address.wrapping_add(offset), value))
        .collect())
}

fn register_block(address: u16, count: u16, data: Vec<u8>) -> Result<RegisterBlock, RequestError> {
    let expected = 2 * count as usize;
    if data.len() != expected {
        return Err(DataError::UnexpectedByteCount(expected, data.len()).into());
    }
    Ok(RegisterBlock::new(address, data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::common::function::FunctionCode;

    #[test]
    fn bit_reads_must_match_the_requested_count() {
        assert_eq!(
            indexed_bits(0, 10, &[0xC1]),
            Err(RequestError::Pdu(PduError::IllegalData(DataError::UnexpectedByteCount(2, 1))))
        );
        let bits = indexed_bits(100, 10, &[0xC1, 0x03]).unwrap();
        let set: Vec<u16> = bits.iter().filter(|b| b.value).map(|b| b.index).collect();
        assert_eq!(set, vec![100, 106, 107, 108, 109]);
    }

    #[test]
    fn register_reads_must_match_the_requested_count() {
        assert_eq!(
            register_block(0, 2, vec![0x00, 0x01]),
            Err(RequestError::Pdu(PduError::IllegalData(DataError::UnexpectedByteCount(4, 2))))
        );
    }

    #[test]
    fn reply_helpers() {
        let reply: Reply<u8> = Reply::Value(3);
        assert_eq!(reply.clone().map(|v| v * 2), Reply::Value(6));
        assert_eq!(reply.into_result(), Ok(3));

        let ex = ExceptionResponse::new(
            FunctionCode::ReadCoils,
            crate::exception::ExceptionCode::IllegalDataAddress,
        );
        let reply: Reply<u8> = Reply::Exception(ex);
        assert_eq!(reply.exception(), Some(ex));
        assert_eq!(reply.value(), None);
    }

    #[test]
    fn config_builder() {
        let config = MasterConfig::new()
            .response_timeout(Duration::from_millis(250))
            .decode(DecodeLevel::full());
        assert_eq!(config.response_timeout, Duration::from_millis(250));
        assert_eq!(config.connect_timeout, Duration::from_secs(5));
        assert_eq!(config.decode, DecodeLevel::full());
    }

    #[tokio::test]
    async fn call_waiting_for_the_link_survives_a_disconnect_broadcast() {
        use tokio::io::{AsyncReadExt, AsyncWriteExt};

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let slave = tokio::spawn(async move {
            let (mut stream, _) = listener.accept().await.unwrap();
            let mut request = [0u8; 8];
            stream.read_exact(&mut request).await.unwrap();
            let mut response = request[..2].to_vec();
            response.extend_from_slice(&[0x00, 0x00, 0x00, 0x03, request[6], 0x07, 0x6D]);
            stream.write_all(&response).await.unwrap();
            stream
        });

        let master = Master::tcp(MasterConfig::default());
        master.connect(addr).await.unwrap();

        // a connection swap holds the link while it fails the outstanding calls
        let link = master.link.lock().await;
        let call = master.read_exception_status(UnitId::new(1));
        tokio::pin!(call);
        assert!(
            tokio::time::timeout(Duration::from_millis(50), &mut call)
                .await
                .is_err()
        );
        assert_eq!(master.dispatcher.correlator.pending(), 0);
        master.dispatcher.fail_pending();
        drop(link);

        assert_eq!(call.await, Ok(Reply::Value(0x6D)));
        drop(slave.await.unwrap());
    }

    #[tokio::test]
    async fn calls_without_connection_fail() {
        let master = Master::tcp(MasterConfig::default());
        assert_eq!(master.state(), ConnectionState::Disconnected);
        assert_eq!(
            master.read_coils(UnitId::new(1), 0, 10).await,
            Err(RequestError::NoConnection)
        );
        assert_eq!(
            master.read_coils(UnitId::new(1), 0, 0).await,
            Err(RequestError::Pdu(PduError::IllegalCount(0)))
        );
        assert_eq!(master.reconnect().await, Err(RequestError::NoConnection));
    }
}
