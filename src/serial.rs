//! RS-485 serial transport
//!
//! Blocking [`Transport`] over the `SerialPort` API re-exported by
//! `tokio-serial`. The RTS line doubles as the transceiver's driver-enable
//! signal; adapters with automatic direction control can turn that off.

use std::io::{self, Read, Write};
use std::time::Duration;

use tokio_serial::{DataBits, Parity as SerialParity, SerialPort, StopBits};
use tracing::info;

use crate::config::{ByteFormat, MasterConfig, Parity};
use crate::error::{ModbusError, ModbusResult};
use crate::transport::Transport;

/// Read timeout of the underlying port. Only reached if `read_byte` is
/// called with nothing pending.
const READ_TIMEOUT: Duration = Duration::from_millis(10);

/// Serial port driven as a half-duplex Modbus RTU line.
pub struct SerialTransport {
    port: Box<dyn SerialPort>,
    rts_direction_control: bool,
}

impl SerialTransport {
    /// Open `path` with the baud rate and byte format of `config`.
    pub fn open(path: &str, config: &MasterConfig) -> ModbusResult<Self> {
        config.validate()?;
        let format = config.byte_format;
        let port = tokio_serial::new(path, config.baud_rate)
            .data_bits(data_bits(format)?)
            .parity(parity(format.parity))
            .stop_bits(stop_bits(format)?)
            .timeout(READ_TIMEOUT)
            .open()
            .map_err(|e| ModbusError::transport(format!("failed to open {}: {}", path, e)))?;

        info!(
            "[MODBUS-RTU] opened {} at {} baud ({}{}{})",
            path,
            config.baud_rate,
            format.data_bits,
            parity_letter(format.parity),
            format.stop_bits
        );
        Ok(Self::from_port(port))
    }

    /// Wrap an already opened port
    pub fn from_port(port: Box<dyn SerialPort>) -> Self {
        Self {
            port,
            rts_direction_control: true,
        }
    }

    /// Enable or disable driving RTS around each transmission
    pub fn with_rts_direction_control(mut self, enabled: bool) -> Self {
        self.rts_direction_control = enabled;
        self
    }
}

impl std::fmt::Debug for SerialTransport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SerialTransport")
            .field("port", &self.port.name())
            .field("rts_direction_control", &self.rts_direction_control)
            .finish()
    }
}

impl Transport for SerialTransport {
    fn write(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.port.write_all(bytes)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.port.flush()
    }

    fn bytes_available(&mut self) -> io::Result<usize> {
        let pending = self.port.bytes_to_read()?;
        Ok(usize::try_from(pending).unwrap_or(usize::MAX))
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.port.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn set_transmit_enabled(&mut self, enabled: bool) -> io::Result<()> {
        if self.rts_direction_control {
            self.port.write_request_to_send(enabled)?;
        }
        Ok(())
    }
}

fn data_bits(format: ByteFormat) -> ModbusResult<DataBits> {
    match format.data_bits {
        5 => Ok(DataBits::Five),
        6 => Ok(DataBits::Six),
        7 => Ok(DataBits::Seven),
        8 => Ok(DataBits::Eight),
        other => Err(ModbusError::configuration(format!(
            "invalid data bits: {}",
            other
        ))),
    }
}

fn stop_bits(format: ByteFormat) -> ModbusResult<StopBits> {
    match format.stop_bits {
        1 => Ok(StopBits::One),
        2 => Ok(StopBits::Two),
        other => Err(ModbusError::configuration(format!(
            "invalid stop bits: {}",
            other
        ))),
    }
}

fn parity(parity: Parity) -> SerialParity {
    match parity {
        Parity::None => SerialParity::None,
        Parity::Even => SerialParity::Even,
        Parity::Odd => SerialParity::Odd,
    }
}

fn parity_letter(parity: Parity) -> char {
    match parity {
        Parity::None => 'N',
        Parity::Even => 'E',
        Parity::Odd => 'O',
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_byte_format_mapping() {
        let format = ByteFormat::EIGHT_E_ONE;
        assert_eq!(data_bits(format).unwrap(), DataBits::Eight);
        assert_eq!(stop_bits(format).unwrap(), StopBits::One);
        assert_eq!(parity(format.parity), SerialParity::Even);
        assert_eq!(parity_letter(format.parity), 'E');

        assert_eq!(stop_bits(ByteFormat::EIGHT_N_TWO).unwrap(), StopBits::Two);
        let bad = ByteFormat {
            data_bits: 4,
            ..ByteFormat::EIGHT_N_ONE
        };
        assert!(data_bits(bad).is_err());
    }

    #[test]
    fn test_open_missing_port_fails() {
        let result = SerialTransport::open("/dev/does-not-exist-modbus", &MasterConfig::default());
        assert!(matches!(result, Err(ModbusError::Transport { .. })));
    }
}
