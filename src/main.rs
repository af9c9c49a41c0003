use clap::{Args, Parser, Subcommand};
use rs232_session::config::{unescape, Config, ConfigLoader, LogFormat};
use rs232_session::port::available_ports;
use rs232_session::session::REPORT_TARGET;
use rs232_session::{trim_delimiter, Parity, Session, SessionOptions, StopBits};
use std::io::Write;
use std::path::PathBuf;
use tracing::{debug, info};
use tracing_subscriber::filter::Directive;
use tracing_subscriber::EnvFilter;

// Command-line arguments
#[derive(Parser, Debug)]
#[command(
    name = "rs232",
    version,
    about = "Line-oriented access to a serial port.",
    long_about = "Opens a serial port, writes delimiter-terminated lines and prints whatever \
                  arrives within the read timeout. Settings come from rs232.toml, RS232_* \
                  environment variables and the flags below, in increasing priority."
)]
struct Cli {
    /// Configuration file to load instead of the standard locations.
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Port name or alias, e.g. COM3 or /dev/ttyUSB0.
    #[arg(short, long, global = true)]
    port: Option<String>,

    #[command(flatten)]
    line: LineArgs,

    /// Log the byte count of every read and write.
    #[arg(long, global = true)]
    report: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Args, Debug, Default)]
struct LineArgs {
    /// Baud rate.
    #[arg(short, long, global = true)]
    baud: Option<u32>,

    /// Data bits per character (5-8).
    #[arg(long, global = true)]
    byte_size: Option<u8>,

    /// Parity: none, odd, even, mark or space.
    #[arg(long, global = true)]
    parity: Option<Parity>,

    /// Stop bits: 1, 1.5 or 2.
    #[arg(long, global = true)]
    stop_bits: Option<StopBits>,

    /// Line delimiter; \r, \n and \t escapes are expanded.
    #[arg(short, long, global = true)]
    delimiter: Option<String>,

    /// Maximum gap between two received bytes, in milliseconds.
    #[arg(long, global = true)]
    read_interval: Option<u32>,

    /// Per-byte read timeout, in milliseconds.
    #[arg(long, global = true)]
    read_multiplier: Option<u32>,

    /// Fixed part of the read timeout, in milliseconds.
    #[arg(long, global = true)]
    read_constant: Option<u32>,

    /// Per-byte write timeout, in milliseconds.
    #[arg(long, global = true)]
    write_multiplier: Option<u32>,

    /// Fixed part of the write timeout, in milliseconds.
    #[arg(long, global = true)]
    write_constant: Option<u32>,
}

impl LineArgs {
    fn to_options(&self) -> SessionOptions {
        SessionOptions {
            baud_rate: self.baud,
            byte_size: self.byte_size,
            parity: self.parity,
            stop_bits: self.stop_bits,
            delimiter: self.delimiter.as_deref().map(unescape),
            read_interval_timeout: self.read_interval,
            read_total_timeout_multiplier: self.read_multiplier,
            read_total_timeout_constant: self.read_constant,
            write_total_timeout_multiplier: self.write_multiplier,
            write_total_timeout_constant: self.write_constant,
            ..SessionOptions::default()
        }
    }
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List serial ports present on this machine.
    Ports,
    /// Write one line.
    Write {
        /// Text to send; the delimiter is appended.
        text: String,
    },
    /// Read once and print what arrived.
    Read {
        /// Keep the trailing delimiter in the output.
        #[arg(long)]
        raw: bool,
    },
    /// Write one line, then read the reply.
    Query {
        /// Text to send; the delimiter is appended.
        text: String,
        /// Keep the trailing delimiter in the output.
        #[arg(long)]
        raw: bool,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let loader = match &cli.config {
        Some(path) => ConfigLoader::load_from(path)?,
        None => ConfigLoader::load()?,
    };
    let report = cli.report || loader.config().serial.report;
    init_tracing(loader.config(), report);
    if let Some(path) = &loader.config_path {
        debug!(path = %path.display(), "loaded configuration");
    }
    let config = loader.into_config();

    if let Command::Ports = cli.command {
        for name in available_ports()? {
            println!("{name}");
        }
        return Ok(());
    }

    let port = cli
        .port
        .clone()
        .or_else(|| config.serial.port.clone())
        .ok_or("no port given; pass --port or set serial.port in rs232.toml")?;
    let address = config.serial.resolve_port(&port);
    let options = config.session.clone().overridden_by(&cli.line.to_options());

    let mut session = Session::open(&address, &options)?;
    session.set_report(report);
    info!(address = %address, "session open");

    let mut stdout = std::io::stdout().lock();
    match cli.command {
        Command::Ports => {}
        Command::Write { text } => {
            session.write(text)?;
        }
        Command::Read { raw } => {
            let delimiter = session.delimiter().to_vec();
            let data = session.read()?;
            stdout.write_all(printable(data, &delimiter, raw))?;
            stdout.write_all(b"\n")?;
        }
        Command::Query { text, raw } => {
            let delimiter = session.delimiter().to_vec();
            let data = session.query(text)?;
            stdout.write_all(printable(data, &delimiter, raw))?;
            stdout.write_all(b"\n")?;
        }
    }
    stdout.flush()?;

    session.close()?;
    Ok(())
}

fn printable<'a>(data: &'a [u8], delimiter: &[u8], raw: bool) -> &'a [u8] {
    if raw {
        data
    } else {
        trim_delimiter(data, delimiter)
    }
}

/// `RUST_LOG` wins over the configured level. Report events are always let
/// through while reporting is on.
fn log_filter(config: &Config, report: bool) -> EnvFilter {
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(&config.logging.level))
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    if !report {
        return filter;
    }
    match format!("{REPORT_TARGET}=info").parse::<Directive>() {
        Ok(directive) => filter.add_directive(directive),
        Err(_) => filter,
    }
}

fn init_tracing(config: &Config, report: bool) {
    let builder = tracing_subscriber::fmt()
        .with_env_filter(log_filter(config, report))
        .with_writer(std::io::stderr);

    match config.logging.format {
        LogFormat::Pretty => builder.pretty().init(),
        LogFormat::Compact => builder.compact().with_target(false).init(),
        LogFormat::Full => builder.init(),
    }
}
