//! In-memory transport for unit tests.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, Once};

use futures::future::BoxFuture;
use log::{Level, LevelFilter, Log, Metadata, Record};
use serde_json::{Value, json};

use crate::errors::Error;
use crate::transport::{Method, Transport};

/// A request seen by [`FakeTransport`].
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Call {
    pub address: String,
    pub method: Method,
    pub path: String,
    pub body: Option<Value>,
}

#[derive(Debug, Clone)]
enum Reply {
    Value(Value),
    Timeout,
}

/// Serves canned responses keyed by method and path and records every call.
///
/// Unrouted PUT/POST/DELETE requests answer with a generic success entry;
/// unrouted GETs answer with an "unavailable resource" error entry.
#[derive(Debug, Clone, Default)]
pub(crate) struct FakeTransport {
    routes: Arc<Mutex<HashMap<(Method, String), Reply>>>,
    calls: Arc<Mutex<Vec<Call>>>,
}

impl FakeTransport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn route(&self, method: Method, path: &str, response: Value) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Reply::Value(response));
        self
    }

    pub fn time_out(&self, method: Method, path: &str) -> &Self {
        self.routes
            .lock()
            .unwrap()
            .insert((method, path.to_string()), Reply::Timeout);
        self
    }

    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().unwrap().clone()
    }

    pub fn calls_with(&self, method: Method) -> Vec<Call> {
        self.calls()
            .into_iter()
            .filter(|call| call.method == method)
            .collect()
    }

    pub fn reset_calls(&self) {
        self.calls.lock().unwrap().clear();
    }
}

impl Transport for FakeTransport {
    fn request<'a>(
        &'a self,
        address: &'a str,
        method: Method,
        path: &'a str,
        body: Option<&'a Value>,
    ) -> BoxFuture<'a, Result<Value, Error>> {
        self.calls.lock().unwrap().push(Call {
            address: address.to_string(),
            method,
            path: path.to_string(),
            body: body.cloned(),
        });

        let reply = self
            .routes
            .lock()
            .unwrap()
            .get(&(method, path.to_string()))
            .cloned();

        let result = match reply {
            Some(Reply::Value(value)) => Ok(value),
            Some(Reply::Timeout) => Err(Error::timeout(method, &format!("http://{address}{path}"))),
            None if method == Method::Get => Ok(json!([{
                "error": {"type": 3, "address": path, "description": "resource not available"}
            }])),
            None => Ok(json!([{"success": {path: body.cloned().unwrap_or(Value::Null)}}])),
        };
        Box::pin(async move { result })
    }
}

/// Light listing shared by several test modules.
pub(crate) fn lights_fixture() -> Value {
    json!({
        "1": {
            "name": "Living Room Bulb",
            "type": "Extended color light",
            "modelid": "LCT001",
            "uniqueid": "00:17:88:01:00:bd:c7:b9-0b",
            "state": {
                "on": true, "bri": 144, "hue": 13088, "sat": 212,
                "xy": [0.5128, 0.4147], "ct": 467, "alert": "none",
                "effect": "none", "colormode": "xy", "reachable": true
            }
        },
        "2": {
            "name": "Kitchen",
            "type": "Dimmable light",
            "modelid": "LWB004",
            "uniqueid": "00:17:88:01:00:bd:c7:ba-0b",
            "state": {"on": false, "bri": 0, "alert": "none", "reachable": true}
        }
    })
}

/// Process-wide logger keeping every record in memory.
struct CaptureLogger {
    records: Mutex<Vec<(String, Level, String)>>,
}

impl Log for CaptureLogger {
    fn enabled(&self, _: &Metadata) -> bool {
        true
    }

    fn log(&self, record: &Record) {
        self.records.lock().unwrap().push((
            record.target().to_string(),
            record.level(),
            record.args().to_string(),
        ));
    }

    fn flush(&self) {}
}

static LOGGER: CaptureLogger = CaptureLogger {
    records: Mutex::new(Vec::new()),
};
static INSTALL: Once = Once::new();

/// Install the capturing logger if needed.
pub(crate) fn capture_logs() {
    INSTALL.call_once(|| {
        if log::set_logger(&LOGGER).is_ok() {
            log::set_max_level(LevelFilter::Trace);
        }
    });
}

/// Records logged so far under `target`. Tests run in parallel, so each one
/// picks a target of its own.
pub(crate) fn captured_logs(target: &str) -> Vec<(Level, String)> {
    capture_logs();
    LOGGER
        .records
        .lock()
        .unwrap()
        .iter()
        .filter(|(t, _, _)| t == target)
        .map(|(_, level, message)| (*level, message.clone()))
        .collect()
}
