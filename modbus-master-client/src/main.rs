//! Command-line Modbus master

use std::fmt::Formatter;
use std::net::SocketAddr;
use std::num::ParseIntError;
use std::str::FromStr;
use std::time::Duration;

use clap::{Args, Parser, Subcommand, ValueEnum};

use modbus_master::client::{Master, MasterConfig, Reply};
use modbus_master::frame::Framer;
use modbus_master::*;

#[derive(Debug)]
enum Error {
    BadInt(ParseIntError),
    BadCharInBitString(char),
    BadFileRecord(String),
    Request(RequestError),
}

#[derive(Copy, Clone, ValueEnum)]
enum Transport {
    /// MBAP framing
    Tcp,
    /// RTU framing carried over TCP
    Rtu,
    /// ASCII framing carried over TCP
    Ascii,
}

#[derive(Copy, Clone, ValueEnum)]
enum Decode {
    Nothing,
    Function,
    Headers,
    Values,
    Full,
}

impl From<Decode> for DecodeLevel {
    fn from(value: Decode) -> Self {
        match value {
            Decode::Nothing => DecodeLevel::nothing(),
            Decode::Function => PduDecodeLevel::FunctionCode.into(),
            Decode::Headers => PduDecodeLevel::DataHeaders.into(),
            Decode::Values => PduDecodeLevel::DataValues.into(),
            Decode::Full => DecodeLevel::full(),
        }
    }
}

#[derive(Parser)]
#[command(name = "modbus-master-client")]
#[command(about = "A command line program for making Modbus master requests")]
#[command(version)]
struct Cli {
    #[arg(long, default_value = "127.0.0.1:502", help = "A socket address")]
    host: SocketAddr,

    #[arg(short = 'i', long, default_value = "1", help = "The unit id of the Modbus slave")]
    id: u8,

    #[arg(
        short = 't',
        long,
        value_enum,
        default_value = "tcp",
        help = "Framing used on the connection"
    )]
    transport: Transport,

    #[arg(long, default_value = "1000", help = "Response timeout in milliseconds")]
    timeout: u64,

    #[arg(long, default_value = "5000", help = "Connect timeout in milliseconds")]
    connect_timeout: u64,

    #[arg(short = 'p', long, help = "Optional polling period in milliseconds")]
    period: Option<u64>,

    #[arg(short = 'd', long, value_enum, default_value = "values", help = "Protocol logging level")]
    decode: Decode,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    #[command(name = "rc", about = "read coils")]
    ReadCoils(ReadArgs),

    #[command(name = "rdi", about = "read discrete inputs")]
    ReadDiscreteInputs(ReadArgs),

    #[command(name = "rhr", about = "read holding registers")]
    ReadHoldingRegisters(ReadArgs),

    #[command(name = "rir", about = "read input registers")]
    ReadInputRegisters(ReadArgs),

    #[command(name = "wsc", about = "write single coil")]
    WriteSingleCoil(WriteSingleCoilArgs),

    #[command(name = "wsr", about = "write single register")]
    WriteSingleRegister(WriteSingleRegisterArgs),

    #[command(name = "wmc", about = "write multiple coils")]
    WriteMultipleCoils(WriteMultipleArgs),

    #[command(name = "wmr", about = "write multiple registers")]
    WriteMultipleRegisters(WriteMultipleArgs),

    #[command(name = "res", about = "read exception status")]
    ReadExceptionStatus,

    #[command(name = "diag", about = "diagnostics")]
    Diagnostics(DiagnosticsArgs),

    #[command(name = "cec", about = "get comm event counter")]
    GetCommEventCounter,

    #[command(name = "cel", about = "get comm event log")]
    GetCommEventLog,

    #[command(name = "rsi", about = "report slave id")]
    ReportSlaveId,

    #[command(name = "rfr", about = "read file record")]
    ReadFileRecord(ReadFileRecordArgs),

    #[command(name = "wfr", about = "write file record")]
    WriteFileRecord(WriteFileRecordArgs),

    #[command(name = "mwr", about = "mask write register")]
    MaskWriteRegister(MaskWriteArgs),

    #[command(name = "rwr", about = "read/write multiple registers")]
    ReadWriteMultipleRegisters(ReadWriteArgs),

    #[command(name = "fifo", about = "read FIFO queue")]
    ReadFifoQueue(FifoArgs),
}

#[derive(Args)]
struct ReadArgs {
    #[arg(short = 's', long, help = "the starting address")]
    start: u16,

    #[arg(short = 'q', long, help = "quantity of values")]
    quantity: u16,
}

#[derive(Args)]
struct WriteSingleCoilArgs {
    #[arg(short = 'i', long, help = "the address of the coil")]
    index: u16,

    #[arg(short = 'v', long, help = "the value of the coil (true or false)")]
    value: bool,
}

#[derive(Args)]
struct WriteSingleRegisterArgs {
    #[arg(short = 'i', long, help = "the address of the register")]
    index: u16,

    #[arg(short = 'v', long, help = "the value of the register")]
    value: u16,
}

#[derive(Args)]
struct WriteMultipleArgs {
    #[arg(short = 's', long, help = "the starting address")]
    start: u16,

    #[arg(
        short = 'v',
        long,
        help = "coils as a string of 1 and 0 (e.g. 10100011), registers as a comma delimited list (e.g. 1,4,7)"
    )]
    values: String,
}

#[derive(Args)]
struct DiagnosticsArgs {
    #[arg(short = 's', long, default_value = "0", help = "the sub-function code")]
    sub_function: u16,

    #[arg(short = 'v', long, default_value = "0", help = "the data word")]
    data: u16,
}

#[derive(Args)]
struct ReadFileRecordArgs {
    #[arg(
        short = 'r',
        long,
        help = "sub-requests as file:record:length, comma delimited (e.g. 4:1:2,3:9:2)"
    )]
    records: String,
}

#[derive(Args)]
struct WriteFileRecordArgs {
    #[arg(short = 'f', long, help = "the file number")]
    file: u16,

    #[arg(short = 'r', long, help = "the record number")]
    record: u16,

    #[arg(short = 'v', long, help = "the register values as a comma delimited list")]
    values: String,
}

#[derive(Args)]
struct MaskWriteArgs {
    #[arg(short = 'i', long, help = "the address of the register")]
    index: u16,

    #[arg(short = 'a', long, help = "the AND mask")]
    and_mask: u16,

    #[arg(short = 'o', long, help = "the OR mask")]
    or_mask: u16,
}

#[derive(Args)]
struct ReadWriteArgs {
    #[arg(long, help = "the starting address of the read")]
    read_start: u16,

    #[arg(long, help = "quantity of registers to read")]
    read_quantity: u16,

    #[arg(long, help = "the starting address of the write")]
    write_start: u16,

    #[arg(short = 'v', long, help = "the values to write as a comma delimited list")]
    values: String,
}

#[derive(Args)]
struct FifoArgs {
    #[arg(short = 'a', long, help = "the FIFO pointer address")]
    address: u16,
}

#[tokio::main(flavor = "multi_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .with_target(false)
        .init();

    if let Err(ref e) = run().await {
        println!("error: {e}");
    }

    Ok(())
}

async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = master_config(&cli);

    match cli.transport {
        Transport::Tcp => run_master(Master::tcp(config), &cli).await,
        Transport::Rtu => run_master(Master::rtu(config), &cli).await,
        Transport::Ascii => run_master(Master::ascii(config), &cli).await,
    }
}

fn master_config(cli: &Cli) -> MasterConfig {
    MasterConfig::new()
        .response_timeout(Duration::from_millis(cli.timeout))
        .connect_timeout(Duration::from_millis(cli.connect_timeout))
        .decode(cli.decode.into())
}

async fn run_master<F: Framer>(
    master: Master<F>,
    cli: &Cli,
) -> Result<(), Box<dyn std::error::Error>> {
    master.connect(cli.host).await.map_err(Error::from)?;

    let unit_id = UnitId::new(cli.id);
    match cli.period {
        None => run_command(&cli.command, &master, unit_id)
            .await
            .map_err(Into::into),
        Some(period_ms) => {
            let period = Duration::from_millis(period_ms);
            loop {
                if let Err(err) = run_command(&cli.command, &master, unit_id).await {
                    tracing::warn!("{err}");
                    if master.state() != client::ConnectionState::Connected {
                        master.reconnect().await.map_err(Error::from)?;
                    }
                }
                tokio::time::sleep(period).await
            }
        }
    }
}

async fn run_command<F: Framer>(
    command: &Command,
    master: &Master<F>,
    unit_id: UnitId,
) -> Result<(), Error> {
    match command {
        Command::ReadCoils(args) => {
            let reply = master.read_coils(unit_id, args.start, args.quantity).await?;
            print_reply(reply, |values| {
                for x in values {
                    println!("index: {} value: {}", x.index, x.value)
                }
            });
        }
        Command::ReadDiscreteInputs(args) => {
            let reply = master
                .read_discrete_inputs(unit_id, args.start, args.quantity)
                .await?;
            print_reply(reply, |values| {
                for x in values {
                    println!("index: {} value: {}", x.index, x.value)
                }
            });
        }
        Command::ReadHoldingRegisters(args) => {
            let reply = master
                .read_holding_registers(unit_id, args.start, args.quantity)
                .await?;
            print_reply(reply, print_registers);
        }
        Command::ReadInputRegisters(args) => {
            let reply = master
                .read_input_registers(unit_id, args.start, args.quantity)
                .await?;
            print_reply(reply, print_registers);
        }
        Command::WriteSingleCoil(args) => {
            let reply = master
                .write_single_coil(unit_id, Indexed::new(args.index, args.value))
                .await?;
            print_reply(reply, |x| println!("index: {} value: {}", x.index, x.value));
        }
        Command::WriteSingleRegister(args) => {
            let reply = master
                .write_single_register(unit_id, Indexed::new(args.index, args.value))
                .await?;
            print_reply(reply, |x| println!("index: {} value: {}", x.index, x.value));
        }
        Command::WriteMultipleCoils(args) => {
            let values = parse_bit_values(&args.values)?;
            let reply = master
                .write_multiple_coils(unit_id, args.start, values)
                .await?;
            print_reply(reply, |range| println!("{range}"));
        }
        Command::WriteMultipleRegisters(args) => {
            let values = parse_register_values(&args.values)?;
            let reply = master
                .write_multiple_registers(unit_id, args.start, values)
                .await?;
            print_reply(reply, |range| println!("{range}"));
        }
        Command::ReadExceptionStatus => {
            let reply = master.read_exception_status(unit_id).await?;
            print_reply(reply, |status| println!("status: {status:#04X}"));
        }
        Command::Diagnostics(args) => {
            let reply = master
                .diagnostics(unit_id, Diagnostic::new(args.sub_function, args.data))
                .await?;
            print_reply(reply, |diag| {
                println!(
                    "sub-function: {:#06X} data: {:#06X}",
                    diag.sub_function, diag.data
                )
            });
        }
        Command::GetCommEventCounter => {
            let reply = master.get_comm_event_counter(unit_id).await?;
            print_reply(reply, |counter| {
                println!(
                    "status: {:#06X} event count: {}",
                    counter.status, counter.event_count
                )
            });
        }
        Command::GetCommEventLog => {
            let reply = master.get_comm_event_log(unit_id).await?;
            print_reply(reply, |log| {
                println!(
                    "status: {:#06X} event count: {} message count: {}",
                    log.status, log.event_count, log.message_count
                );
                for (pos, event) in log.events.iter().enumerate() {
                    println!("event {pos}: {event:#04X}");
                }
            });
        }
        Command::ReportSlaveId => {
            let reply = master.report_slave_id(unit_id).await?;
            print_reply(reply, |id| {
                println!(
                    "slave id: {:#04X} running: {} additional data: {:02X?}",
                    id.slave_id, id.run_indicator, id.additional_data
                )
            });
        }
        Command::ReadFileRecord(args) => {
            let requests = parse_file_requests(&args.records)?;
            let reply = master.read_file_record(unit_id, requests.clone()).await?;
            print_reply(reply, |records| {
                for (request, values) in requests.iter().zip(records) {
                    println!(
                        "file: {} record: {} values: {:?}",
                        request.file_number, request.record_number, values
                    );
                }
            });
        }
        Command::WriteFileRecord(args) => {
            let values = parse_register_values(&args.values)?;
            let record = FileRecord::new(args.file, args.record, values);
            let reply = master.write_file_record(unit_id, vec![record]).await?;
            print_reply(reply, |records| {
                for record in records {
                    println!(
                        "file: {} record: {} length: {}",
                        record.file_number,
                        record.record_number,
                        record.data.len()
                    );
                }
            });
        }
        Command::MaskWriteRegister(args) => {
            let mask = MaskWrite::new(args.index, args.and_mask, args.or_mask);
            let reply = master.mask_write_register(unit_id, mask).await?;
            print_reply(reply, |mask| {
                println!(
                    "index: {} and: {:#06X} or: {:#06X}",
                    mask.address, mask.and_mask, mask.or_mask
                )
            });
        }
        Command::ReadWriteMultipleRegisters(args) => {
            let values = parse_register_values(&args.values)?;
            let reply = master
                .read_write_multiple_registers(
                    unit_id,
                    args.read_start,
                    args.read_quantity,
                    args.write_start,
                    values,
                )
                .await?;
            print_reply(reply, print_registers);
        }
        Command::ReadFifoQueue(args) => {
            let reply = master.read_fifo_queue(unit_id, args.address).await?;
            print_reply(reply, |values| {
                for (pos, value) in values.iter().enumerate() {
                    println!("{pos}: {value}");
                }
            });
        }
    }
    Ok(())
}

fn print_reply<T, P>(reply: Reply<T>, print: P)
where
    P: FnOnce(T),
{
    match reply {
        Reply::Value(value) => print(value),
        Reply::Exception(ex) => println!("{ex}"),
    }
}

fn print_registers(block: RegisterBlock) {
    for x in block.iter() {
        println!("index: {} value: {}", x.index, x.value)
    }
}

fn parse_bit_values(values_str: &str) -> Result<Vec<bool>, Error> {
    let mut values: Vec<bool> = Vec::new();
    for c in values_str.chars().rev() {
        match c {
            '0' => values.push(false),
            '1' => values.push(true),
            _ => return Err(Error::BadCharInBitString(c)),
        }
    }
    Ok(values)
}

fn parse_register_values(values_str: &str) -> Result<Vec<u16>, ParseIntError> {
    let mut values: Vec<u16> = Vec::new();
    for value in values_str.split(',') {
        values.push(u16::from_str(value.trim())?);
    }
    Ok(values)
}

fn parse_file_requests(values_str: &str) -> Result<Vec<FileRecordRequest>, Error> {
    let mut requests = Vec::new();
    for item in values_str.split(',') {
        let parts = item
            .split(':')
            .map(|part| u16::from_str(part.trim()))
            .collect::<Result<Vec<u16>, ParseIntError>>()?;
        match parts.as_slice() {
            [file, record, length] => {
                requests.push(FileRecordRequest::new(*file, *record, *length))
            }
            _ => return Err(Error::BadFileRecord(item.to_string())),
        }
    }
    Ok(requests)
}

impl std::error::Error for Error {}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut Formatter) -> Result<(), std::fmt::Error> {
        match self {
            Error::BadInt(err) => err.fmt(f),
            Error::BadCharInBitString(char) => write!(f, "Bad character in bit string: {char}"),
            Error::BadFileRecord(item) => {
                write!(f, "Bad file record '{item}', expected file:record:length")
            }
            Error::Request(err) => err.fmt(f),
        }
    }
}

impl From<RequestError> for Error {
    fn from(err: RequestError) -> Self {
        Error::Request(err)
    }
}

impl From<ParseIntError> for Error {
    fn from(err: ParseIntError) -> Self {
        Error::BadInt(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn timeouts_come_from_the_command_line() {
        let cli = Cli::try_parse_from([
            "modbus-master-client",
            "--timeout",
            "250",
            "--connect-timeout",
            "1500",
            "res",
        ])
        .unwrap();
        let config = master_config(&cli);
        assert_eq!(config.response_timeout, Duration::from_millis(250));
        assert_eq!(config.connect_timeout, Duration::from_millis(1500));

        let cli = Cli::try_parse_from(["modbus-master-client", "res"]).unwrap();
        assert_eq!(master_config(&cli).connect_timeout, Duration::from_secs(5));
    }

    #[test]
    fn parses_bit_strings_least_significant_last() {
        assert_eq!(parse_bit_values("110").unwrap(), vec![false, true, true]);
        assert!(matches!(parse_bit_values("102"), Err(Error::BadCharInBitString('2'))));
    }

    #[test]
    fn parses_register_lists() {
        assert_eq!(parse_register_values("1, 4,7").unwrap(), vec![1, 4, 7]);
        assert!(parse_register_values("1,x").is_err());
    }

    #[test]
    fn parses_file_requests() {
        assert_eq!(
            parse_file_requests("4:1:2,3:9:2").unwrap(),
            vec![
                FileRecordRequest::new(4, 1, 2),
                FileRecordRequest::new(3, 9, 2)
            ]
        );
        assert!(matches!(parse_file_requests("4:1"), Err(Error::BadFileRecord(_))));
    }
}
