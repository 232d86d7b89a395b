//! # Final Waypoints Server
//!
//! Publishes the lane produced on each cycle to the downstream consumers.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::{
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
    wp::LaneMsg,
};
use log::trace;

use crate::{sched::PlanSink, wp_updater::Lane};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Final waypoints server
pub struct FinalWpsServer {
    socket: MonitoredSocket,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FinalWpsServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the lane: {0}")]
    SendError(MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FinalWpsServer {
    /// Create a new instance of the final waypoints server.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(ctx: &zmq::Context, params: &NetParams) -> Result<Self, FinalWpsServerError> {
        Self::with_endpoint(ctx, &params.final_wps_endpoint)
    }

    /// Create the server bound to an explicit endpoint.
    pub fn with_endpoint(ctx: &zmq::Context, endpoint: &str) -> Result<Self, FinalWpsServerError> {
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            connect_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            send_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::PUB, socket_options, endpoint)
            .map_err(FinalWpsServerError::SocketError)?;

        Ok(Self { socket })
    }

    /// Publish a lane.
    pub fn send(&mut self, lane: &Lane) -> Result<(), FinalWpsServerError> {
        trace!("Publishing lane {} ({} waypoints)", lane.header.seq, lane.len());

        self.socket
            .send_json(&LaneMsg::from(lane))
            .map_err(FinalWpsServerError::SendError)
    }
}

impl PlanSink for FinalWpsServer {
    type Error = FinalWpsServerError;

    fn publish(&mut self, lane: &Lane) -> Result<(), Self::Error> {
        self.send(lane)
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::{
        loc::Pose,
        track::test::straight_track,
        wp_updater::{InputData, Params, WpUpdater},
    };
    use std::{sync::Arc, thread, time::Duration};
    use util::module::State;

    #[test]
    fn test_lane_published() {
        let ctx = zmq::Context::new();
        let endpoint = "inproc://final_wps_server_test";
        let mut server = FinalWpsServer::with_endpoint(&ctx, endpoint).unwrap();

        let sub = ctx.socket(zmq::SUB).unwrap();
        sub.set_subscribe(b"").unwrap();
        sub.set_rcvtimeo(50).unwrap();
        sub.connect(endpoint).unwrap();

        let mut wpu = WpUpdater::new(Params {
            lookahead_wps: 5,
            ..Default::default()
        })
        .unwrap();
        let (lane, _) = wpu
            .proc(&InputData {
                pose: Some(Pose::from_position2(2.0, 0.0)),
                stop_idx: None,
                track: Some(Arc::new(straight_track(10, 3.0))),
            })
            .unwrap();
        let lane = lane.unwrap();

        // Subscribers miss messages sent before they have joined, so keep sending
        let mut received = None;
        for _ in 0..100 {
            server.publish(&lane).unwrap();
            if let Ok(Ok(s)) = sub.recv_string(0) {
                received = Some(s);
                break;
            }
            thread::sleep(Duration::from_millis(10));
        }

        let msg: LaneMsg = serde_json::from_str(&received.unwrap()).unwrap();
        assert_eq!(msg, LaneMsg::from(&lane));
        assert_eq!(msg.waypoints.len(), 5);
        assert_eq!(msg.waypoints[0].pose.position_m, [2.0, 0.0, 0.0]);
    }
}
