//! Loopback fake devices for exercising the protocol engine in tests.
//!
//! Linux routes the whole 127.0.0.0/8 block to the loopback interface, so
//! replies can be sent from distinct addresses such as 127.0.0.2 to stand in
//! for several devices on one host.

use std::net::{SocketAddr, UdpSocket};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use serde_json::Value;

/// One datagram a fake device sends back.
pub(crate) struct Reply {
    from: Option<&'static str>,
    body: Vec<u8>,
}

impl Reply {
    pub(crate) fn json(value: Value) -> Self {
        Reply {
            from: None,
            body: serde_json::to_vec(&value).unwrap(),
        }
    }

    pub(crate) fn raw(body: &[u8]) -> Self {
        Reply {
            from: None,
            body: body.to_vec(),
        }
    }

    /// Send this reply from a fresh socket bound to `ip` instead of the
    /// device's own socket.
    pub(crate) fn from_ip(mut self, ip: &'static str) -> Self {
        self.from = Some(ip);
        self
    }
}

type Handler = Box<dyn Fn(&Value) -> Vec<Reply> + Send + 'static>;

/// A UDP responder running on its own thread until dropped.
pub(crate) struct FakeDevice {
    addr: SocketAddr,
    stop: Arc<AtomicBool>,
    requests: Arc<Mutex<Vec<Value>>>,
    handle: Option<JoinHandle<()>>,
}

impl FakeDevice {
    pub(crate) fn start<F>(bind: &str, handler: F) -> Self
    where
        F: Fn(&Value) -> Vec<Reply> + Send + 'static,
    {
        let socket = UdpSocket::bind(bind).unwrap();
        socket
            .set_read_timeout(Some(Duration::from_millis(20)))
            .unwrap();
        let addr = socket.local_addr().unwrap();
        let stop = Arc::new(AtomicBool::new(false));
        let requests = Arc::new(Mutex::new(Vec::new()));
        let handler: Handler = Box::new(handler);

        let handle = {
            let stop = Arc::clone(&stop);
            let requests = Arc::clone(&requests);
            thread::spawn(move || {
                let mut buffer = [0u8; 4096];
                while !stop.load(Ordering::SeqCst) {
                    let Ok((size, peer)) = socket.recv_from(&mut buffer) else {
                        continue;
                    };
                    let request: Value =
                        serde_json::from_slice(&buffer[..size]).unwrap_or(Value::Null);
                    requests.lock().unwrap().push(request.clone());
                    for reply in handler(&request) {
                        match reply.from {
                            Some(ip) => {
                                let other = UdpSocket::bind((ip, 0)).unwrap();
                                other.send_to(&reply.body, peer).unwrap();
                            }
                            None => {
                                socket.send_to(&reply.body, peer).unwrap();
                            }
                        }
                    }
                }
            })
        };

        FakeDevice {
            addr,
            stop,
            requests,
            handle: Some(handle),
        }
    }

    /// A device that answers every request with the same JSON body.
    pub(crate) fn replying(bind: &str, body: Value) -> Self {
        Self::start(bind, move |_| vec![Reply::json(body.clone())])
    }

    /// A device that reads requests and never answers.
    pub(crate) fn silent(bind: &str) -> Self {
        Self::start(bind, |_| Vec::new())
    }

    pub(crate) fn port(&self) -> u16 {
        self.addr.port()
    }

    pub(crate) fn requests(&self) -> Vec<Value> {
        self.requests.lock().unwrap().clone()
    }
}

impl Drop for FakeDevice {
    fn drop(&mut self) {
        self.stop.store(true, Ordering::SeqCst);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}
