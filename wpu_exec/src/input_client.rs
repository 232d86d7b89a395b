//! # Input Client
//!
//! Subscribes to the waypoint updater inputs (vehicle pose, base waypoints and the stop
//! waypoint index) and writes each message into the data store from a background thread, so
//! that the cycle never waits on the network.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    wp::WpuInput,
};
use log::{error, info, warn};
use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use crate::data_store::DataStore;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct InputClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum InputClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not start the background thread: {0}")]
    ThreadError(std::io::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl InputClient {
    /// Create a new instance of the input client.
    ///
    /// This function will not block until the client connects.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        ds: Arc<DataStore>,
    ) -> Result<Self, InputClientError> {
        Self::with_endpoint(ctx, &params.input_endpoint, ds)
    }

    /// Create the client connected to an explicit endpoint.
    pub fn with_endpoint(
        ctx: &zmq::Context,
        endpoint: &str,
        ds: Arc<DataStore>,
    ) -> Result<Self, InputClientError> {
        // No conflate, the base waypoints must not be dropped in favour of a pose
        let socket_options = SocketOptions {
            connect_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, endpoint)
            .map_err(InputClientError::SocketError)?;

        let bg_run = Arc::new(AtomicBool::new(true));
        let connected = Arc::new(AtomicBool::new(false));

        let bg_run_clone = bg_run.clone();
        let connected_clone = connected.clone();

        let bg_jh = thread::Builder::new()
            .name(String::from("input_client"))
            .spawn(move || bg_thread(socket, bg_run_clone, connected_clone, ds))
            .map_err(InputClientError::ThreadError)?;

        Ok(Self {
            bg_jh: Some(bg_jh),
            bg_run,
            connected,
        })
    }

    /// Return if the client is connected to the input publisher.
    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::Relaxed)
    }

    /// Return if the background thread is still running.
    pub fn is_running(&self) -> bool {
        self.bg_run.load(Ordering::Relaxed)
    }
}

impl Drop for InputClient {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            if jh.join().is_err() {
                warn!("InputClient background thread panicked");
            }
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Background thread, applies every message received to the data store.
fn bg_thread(
    socket: MonitoredSocket,
    run: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    ds: Arc<DataStore>,
) {
    // While instructed to run
    while run.load(Ordering::Relaxed) {
        let is_connected = socket.connected();
        if connected.swap(is_connected, Ordering::Relaxed) != is_connected {
            info!("InputClient connected: {}", is_connected);
        }

        let input = match socket.recv_json::<WpuInput>() {
            Ok(Some(i)) => i,
            Ok(None) => continue,
            Err(MonitoredSocketError::NonUtf8Message) => {
                warn!("Non UTF-8 message on the input socket");
                continue;
            }
            Err(MonitoredSocketError::DeserializeError(e)) => {
                warn!("Error deserialising input message: {}", e);
                continue;
            }
            Err(e) => {
                error!("Error receiving input message: {}", e);
                break;
            }
        };

        if let Err(e) = ds.apply(&input) {
            warn!("Could not apply input message: {}", e);
        }
    }

    run.store(false, Ordering::Relaxed);
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::wp::PoseMsg;
    use std::time::{Duration, Instant};

    #[test]
    fn test_inputs_reach_data_store() {
        let ctx = zmq::Context::new();
        let endpoint = "inproc://input_client_test";

        let publisher = ctx.socket(zmq::PUB).unwrap();
        publisher.bind(endpoint).unwrap();

        let ds = Arc::new(DataStore::default());
        let client = InputClient::with_endpoint(&ctx, endpoint, ds.clone()).unwrap();

        let pose = serde_json::to_string(&WpuInput::Pose(PoseMsg::from_position(7.0, 8.0, 0.0)))
            .unwrap();
        let stop = serde_json::to_string(&WpuInput::TrafficWaypoint(12)).unwrap();

        // Keep publishing until the subscription has joined
        let start = Instant::now();
        while (ds.pose().is_none() || ds.stop_idx().is_none())
            && start.elapsed() < Duration::from_secs(5)
        {
            publisher.send("not json", 0).unwrap();
            publisher.send(pose.as_str(), 0).unwrap();
            publisher.send(stop.as_str(), 0).unwrap();
            thread::sleep(Duration::from_millis(10));
        }

        assert_eq!(ds.pose().unwrap().position_m[0], 7.0);
        assert_eq!(ds.stop_idx(), Some(12));

        // Malformed messages do not stop the client
        assert!(client.is_running());

        drop(client);
    }
}
