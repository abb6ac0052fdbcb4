// 连接管理
// Owns the single Modbus TCP session to the unit.
//
// The transport lives behind one mutex. Establishing the session happens under
// that lock, and the refresh cycle and commands keep holding it for their whole
// device interaction, so the two can never interleave on the wire.

use crate::drivers::{ModbusError, Transport};
use crate::error::BridgeError;
use log::{debug, error, info};
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

/// The session state plus the transport it guards
#[derive(Debug)]
pub struct Session<T: Transport> {
    transport: T,
    connected: bool,
}

impl<T: Transport> Session<T> {
    pub fn is_connected(&self) -> bool {
        self.connected
    }

    /// Open the session unless it is already open
    pub fn connect(&mut self) -> Result<(), BridgeError> {
        if self.connected {
            return Ok(());
        }
        let start = Instant::now();
        let endpoint = self.transport.endpoint();
        info!("Pluggit: connecting to {}", endpoint);
        self.transport
            .connect()
            .map_err(|source| BridgeError::Connection {
                endpoint: endpoint.clone(),
                source,
            })?;
        self.connected = true;
        info!("Pluggit: connected to {}", endpoint);
        debug!("Pluggit: connection took {:?}", start.elapsed());
        Ok(())
    }

    /// Close the session. Close errors are logged and dropped, the session is
    /// always marked disconnected afterwards.
    pub fn disconnect(&mut self) {
        let start = Instant::now();
        if self.connected {
            if let Err(source) = self.transport.close() {
                let err = BridgeError::Disconnect {
                    endpoint: self.transport.endpoint(),
                    source,
                };
                debug!("Pluggit: {}", err);
            }
        }
        self.connected = false;
        debug!("Pluggit: disconnect took {:?}", start.elapsed());
    }

    pub fn read_holding_registers(
        &mut self,
        unit: u8,
        address: u16,
        count: u16,
    ) -> Result<Vec<u16>, ModbusError> {
        if !self.connected {
            return Err(ModbusError::NotConnected);
        }
        self.transport.read_holding_registers(unit, address, count)
    }

    pub fn write_multiple_registers(
        &mut self,
        unit: u8,
        address: u16,
        values: &[u16],
    ) -> Result<(), ModbusError> {
        if !self.connected {
            return Err(ModbusError::NotConnected);
        }
        self.transport.write_multiple_registers(unit, address, values)
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }
}

/// Shared owner of the session
#[derive(Debug)]
pub struct ConnectionManager<T: Transport> {
    session: Mutex<Session<T>>,
}

impl<T: Transport> ConnectionManager<T> {
    pub fn new(transport: T) -> Self {
        Self {
            session: Mutex::new(Session {
                transport,
                connected: false,
            }),
        }
    }

    /// Take exclusive ownership of the session for a sequence of requests.
    /// The lock is released when the guard is dropped.
    pub fn lock(&self) -> Result<MutexGuard<'_, Session<T>>, BridgeError> {
        self.session.lock().map_err(|_| BridgeError::LockPoisoned)
    }

    /// Connect if not connected. Failures are logged and leave the session
    /// disconnected; the return value tells whether a session is open.
    pub fn connect(&self) -> bool {
        let mut session = match self.lock() {
            Ok(session) => session,
            Err(e) => {
                error!("Pluggit: {}", e);
                return false;
            }
        };
        match session.connect() {
            Ok(()) => true,
            Err(e) => {
                error!("Pluggit: {}", e);
                false
            }
        }
    }

    pub fn disconnect(&self) {
        match self.lock() {
            Ok(mut session) => session.disconnect(),
            Err(e) => error!("Pluggit: {}", e),
        }
    }

    pub fn is_connected(&self) -> bool {
        self.lock().map(|s| s.is_connected()).unwrap_or(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Default)]
    struct Counting {
        opens: Arc<AtomicUsize>,
        closes: Arc<AtomicUsize>,
        refuse: bool,
        fail_close: bool,
    }

    impl Transport for Counting {
        fn connect(&mut self) -> Result<(), ModbusError> {
            self.opens.fetch_add(1, Ordering::SeqCst);
            if self.refuse {
                Err(ModbusError::ConnectionFailed("refused".into()))
            } else {
                Ok(())
            }
        }

        fn close(&mut self) -> Result<(), ModbusError> {
            self.closes.fetch_add(1, Ordering::SeqCst);
            if self.fail_close {
                Err(ModbusError::Protocol("reset by peer".into()))
            } else {
                Ok(())
            }
        }

        fn read_holding_registers(
            &mut self,
            _unit: u8,
            _address: u16,
            count: u16,
        ) -> Result<Vec<u16>, ModbusError> {
            Ok(vec![0; count as usize])
        }

        fn write_multiple_registers(
            &mut self,
            _unit: u8,
            _address: u16,
            _values: &[u16],
        ) -> Result<(), ModbusError> {
            Ok(())
        }

        fn endpoint(&self) -> String {
            "test:502".into()
        }
    }

    #[test]
    fn connect_twice_opens_once() {
        let opens = Arc::new(AtomicUsize::new(0));
        let manager = ConnectionManager::new(Counting {
            opens: opens.clone(),
            ..Default::default()
        });
        assert!(manager.connect());
        assert!(manager.connect());
        assert_eq!(opens.load(Ordering::SeqCst), 1);
        assert!(manager.is_connected());
    }

    #[test]
    fn concurrent_connects_open_once() {
        let opens = Arc::new(AtomicUsize::new(0));
        let manager = Arc::new(ConnectionManager::new(Counting {
            opens: opens.clone(),
            ..Default::default()
        }));
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let m = manager.clone();
                std::thread::spawn(move || m.connect())
            })
            .collect();
        for h in handles {
            assert!(h.join().unwrap());
        }
        assert_eq!(opens.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn failed_connect_stays_disconnected() {
        let manager = ConnectionManager::new(Counting {
            refuse: true,
            ..Default::default()
        });
        assert!(!manager.connect());
        assert!(!manager.is_connected());
        let mut session = manager.lock().unwrap();
        assert!(matches!(
            session.connect(),
            Err(BridgeError::Connection { .. })
        ));
        assert_eq!(
            session.read_holding_registers(1, 168, 1),
            Err(ModbusError::NotConnected)
        );
    }

    #[test]
    fn close_errors_are_swallowed() {
        let closes = Arc::new(AtomicUsize::new(0));
        let manager = ConnectionManager::new(Counting {
            closes: closes.clone(),
            fail_close: true,
            ..Default::default()
        });
        manager.connect();
        manager.disconnect();
        assert!(!manager.is_connected());
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn disconnect_when_idle_does_not_close() {
        let closes = Arc::new(AtomicUsize::new(0));
        let manager = ConnectionManager::new(Counting {
            closes: closes.clone(),
            ..Default::default()
        });
        manager.disconnect();
        assert_eq!(closes.load(Ordering::SeqCst), 0);
    }
}
