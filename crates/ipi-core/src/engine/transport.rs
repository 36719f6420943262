use super::config::{Address, ConnectConfig};
use super::progress::{Progress, ProgressReporter};
use std::io::{self, Read, Write};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};
#[cfg(unix)]
use std::os::unix::net::UnixStream;
use std::thread;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("Failed to connect to {address} after {attempts} attempt(s): {source}")]
    Connect {
        address: String,
        attempts: u32,
        #[source]
        source: io::Error,
    },

    #[error("Timed out after {0:?} waiting for a command from the server")]
    CommandTimeout(Duration),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),
}

/// A byte stream the driver can talk over.
pub trait Transport: Read + Write {
    /// Sets the read timeout applied while waiting for a command token.
    fn set_command_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        let _ = timeout;
        Ok(())
    }

    /// Shuts the stream down. Dropping the stream closes it as well.
    fn close(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn set_command_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        (**self).set_command_timeout(timeout)
    }

    fn close(&mut self) -> io::Result<()> {
        (**self).close()
    }
}

impl Transport for TcpStream {
    fn set_command_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }

    fn close(&mut self) -> io::Result<()> {
        ignore_not_connected(self.shutdown(Shutdown::Both))
    }
}

#[cfg(unix)]
impl Transport for UnixStream {
    fn set_command_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        self.set_read_timeout(timeout)
    }

    fn close(&mut self) -> io::Result<()> {
        ignore_not_connected(self.shutdown(Shutdown::Both))
    }
}

fn ignore_not_connected(result: io::Result<()>) -> io::Result<()> {
    match result {
        Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(()),
        other => other,
    }
}

/// A connected socket to the server.
#[derive(Debug)]
pub enum Connection {
    Tcp(TcpStream),
    #[cfg(unix)]
    Unix(UnixStream),
}

impl Read for Connection {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Connection::Tcp(s) => s.read(buf),
            #[cfg(unix)]
            Connection::Unix(s) => s.read(buf),
        }
    }
}

impl Write for Connection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        match self {
            Connection::Tcp(s) => s.write(buf),
            #[cfg(unix)]
            Connection::Unix(s) => s.write(buf),
        }
    }

    fn flush(&mut self) -> io::Result<()> {
        match self {
            Connection::Tcp(s) => s.flush(),
            #[cfg(unix)]
            Connection::Unix(s) => s.flush(),
        }
    }
}

impl Transport for Connection {
    fn set_command_timeout(&mut self, timeout: Option<Duration>) -> io::Result<()> {
        match self {
            Connection::Tcp(s) => s.set_command_timeout(timeout),
            #[cfg(unix)]
            Connection::Unix(s) => s.set_command_timeout(timeout),
        }
    }

    fn close(&mut self) -> io::Result<()> {
        match self {
            Connection::Tcp(s) => Transport::close(s),
            #[cfg(unix)]
            Connection::Unix(s) => Transport::close(s),
        }
    }
}

/// Connects to the server, retrying up to `config.attempts` times.
pub fn connect(
    config: &ConnectConfig,
    reporter: &ProgressReporter,
) -> Result<Connection, ConnectionError> {
    let attempts = config.attempts.max(1);
    let address = config.address.to_string();
    let mut last_error = None;

    for attempt in 1..=attempts {
        reporter.report(Progress::Connecting {
            address: address.clone(),
            attempt,
        });
        debug!("Connecting to {} (attempt {}/{})", address, attempt, attempts);

        match connect_once(&config.address, config.timeout) {
            Ok(connection) => {
                info!("Connected to {}", address);
                reporter.report(Progress::Connected {
                    address: address.clone(),
                });
                return Ok(connection);
            }
            Err(e) => {
                warn!("Connection attempt {} to {} failed: {}", attempt, address, e);
                last_error = Some(e);
                if attempt < attempts {
                    thread::sleep(config.retry_delay);
                }
            }
        }
    }

    Err(ConnectionError::Connect {
        address,
        attempts,
        source: last_error
            .unwrap_or_else(|| io::Error::new(io::ErrorKind::NotConnected, "no attempt made")),
    })
}

fn connect_once(address: &Address, timeout: Duration) -> io::Result<Connection> {
    match address {
        Address::Tcp { host, port } => {
            let mut last_error = None;
            for socket_addr in (host.as_str(), *port).to_socket_addrs()? {
                match TcpStream::connect_timeout(&socket_addr, timeout) {
                    Ok(stream) => {
                        stream.set_nodelay(true)?;
                        return Ok(Connection::Tcp(stream));
                    }
                    Err(e) => last_error = Some(e),
                }
            }
            Err(last_error.unwrap_or_else(|| {
                io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("{} did not resolve to any address", host),
                )
            }))
        }
        #[cfg(unix)]
        Address::Unix { path } => Ok(Connection::Unix(UnixStream::connect(path)?)),
        #[cfg(not(unix))]
        Address::Unix { path } => Err(io::Error::new(
            io::ErrorKind::Unsupported,
            format!(
                "Unix domain sockets are not supported on this platform: {}",
                path.display()
            ),
        )),
    }
}
