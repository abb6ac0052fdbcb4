// Modbus TCP 客户端实现
// 提供与通风设备的通信接口，支持读取和写入保持寄存器

use std::net::{SocketAddr, ToSocketAddrs};
use std::time::Duration;
use thiserror::Error;
use tokio_modbus::client::sync::{tcp, Context};
use tokio_modbus::prelude::*;

/// Modbus 通信错误类型
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ModbusError {
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Not connected")]
    NotConnected,
    #[error("Operation timed out")]
    Timeout,
    #[error("Protocol error: {0}")]
    Protocol(String),
    #[error("Modbus exception: {0}")]
    Exception(String),
    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Blocking register-level access to one Modbus TCP endpoint.
///
/// Every call blocks the calling thread until the device answers or the
/// request times out.
pub trait Transport: Send {
    /// Open a session to the endpoint the transport was built for
    fn connect(&mut self) -> Result<(), ModbusError>;

    /// Close the session
    fn close(&mut self) -> Result<(), ModbusError>;

    /// Read `count` holding registers starting at `address` from station `unit`
    fn read_holding_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModbusError>;

    /// Write `values` to consecutive holding registers starting at `address`
    fn write_multiple_registers(
        &mut self,
        unit: u8,
        address: u16,
        values: &[u16],
    ) -> Result<(), ModbusError>;

    /// Human readable endpoint, used in log messages
    fn endpoint(&self) -> String;
}

/// Modbus TCP 客户端结构体
/// 同步 Modbus TCP 通信，连接延迟建立
pub struct ModbusClient {
    /// 目标主机地址
    host: String,
    /// 目标端口
    port: u16,
    /// 请求超时时间
    timeout: Duration,
    /// TCP 客户端连接
    client: Option<Context>,
}

impl ModbusClient {
    /// 创建新的 ModbusClient 实例，默认超时 5 秒
    pub fn new(host: &str, port: u16) -> Self {
        Self::with_timeout(host, port, Duration::from_secs(5))
    }

    /// 使用自定义超时创建 ModbusClient
    ///
    /// # Arguments
    /// * `host` - Host name or IP address of the unit
    /// * `port` - Modbus TCP port
    /// * `timeout` - Timeout applied to every request
    pub fn with_timeout(host: &str, port: u16, timeout: Duration) -> Self {
        Self {
            host: host.to_string(),
            port,
            timeout,
            client: None,
        }
    }

    /// 检查连接是否已建立
    pub fn is_connected(&self) -> bool {
        self.client.is_some()
    }

    fn resolve(&self) -> Result<SocketAddr, ModbusError> {
        (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| ModbusError::ConnectionFailed(format!("Invalid address: {}", e)))?
            .next()
            .ok_or_else(|| {
                ModbusError::ConnectionFailed(format!("No address for {}", self.host))
            })
    }

    fn context(&mut self, unit: u8) -> Result<&mut Context, ModbusError> {
        let ctx = self.client.as_mut().ok_or(ModbusError::NotConnected)?;
        ctx.set_slave(Slave(unit));
        Ok(ctx)
    }

    /// Flatten the nested tokio-modbus result into our error type
    fn map_result<T>(result: tokio_modbus::Result<T>) -> Result<T, ModbusError> {
        match result {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(code)) => Err(ModbusError::Exception(format!("{:?}", code))),
            Err(tokio_modbus::Error::Transport(e)) if e.kind() == std::io::ErrorKind::TimedOut => {
                Err(ModbusError::Timeout)
            }
            Err(e) => Err(ModbusError::Protocol(e.to_string())),
        }
    }
}

impl Transport for ModbusClient {
    fn connect(&mut self) -> Result<(), ModbusError> {
        let socket_addr = self.resolve()?;
        let mut ctx =
            tcp::connect(socket_addr).map_err(|e| ModbusError::ConnectionFailed(e.to_string()))?;
        ctx.set_timeout(Some(self.timeout));
        self.client = Some(ctx);
        Ok(())
    }

    /// Dropping the context closes the socket
    fn close(&mut self) -> Result<(), ModbusError> {
        self.client = None;
        Ok(())
    }

    fn read_holding_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModbusError> {
        let ctx = self.context(unit)?;
        let words = Self::map_result(ctx.read_holding_registers(address, count))?;
        if words.len() != count as usize {
            return Err(ModbusError::InvalidData(format!(
                "expected {} registers at {}, got {}",
                count,
                address,
                words.len()
            )));
        }
        Ok(words)
    }

    fn write_multiple_registers(
        &mut self,
        unit: u8,
        address: u16,
        values: &[u16],
    ) -> Result<(), ModbusError> {
        let ctx = self.context(unit)?;
        Self::map_result(ctx.write_multiple_registers(address, values))
    }

    fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Drop for ModbusClient {
    /// 在结构体销毁时自动断开连接
    fn drop(&mut self) {
        self.client = None;
    }
}
