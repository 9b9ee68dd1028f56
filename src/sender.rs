use std::net::UdpSocket;

use serde::Serialize;

use crate::error::SendError;
use crate::extractor::Extraction;
use crate::types::Landmark;

/// One tick's wire payload. Keys are always present; "nothing detected"
/// encodes as an empty array, never null or a missing key. Face, hand, and
/// fingertip data carry the first detection only.
#[derive(Debug, Serialize)]
pub struct Payload<'a> {
    pub pose_data: &'a [Landmark],
    pub expression_data: &'a [Landmark],
    pub hand_data: &'a [Landmark],
    pub fingertip_data: &'a [Landmark],
}

impl<'a> Payload<'a> {
    pub fn from_extraction(out: &'a Extraction) -> Self {
        Self {
            pose_data: &out.pose.points,
            expression_data: out
                .faces
                .first()
                .map(|f| f.points.as_slice())
                .unwrap_or(&[]),
            hand_data: out
                .hands
                .first()
                .map(|h| h.points.as_slice())
                .unwrap_or(&[]),
            fingertip_data: out
                .fingertips
                .first()
                .map(|t| t.points.as_slice())
                .unwrap_or(&[]),
        }
    }

    pub fn encode(&self) -> Result<Vec<u8>, SendError> {
        Ok(serde_json::to_vec(self)?)
    }
}

/// Connectionless telemetry sender: every send binds a fresh ephemeral
/// socket, transmits one datagram, and releases it. At-most-once, unordered,
/// lossy by design.
pub struct UdpSender {
    host: String,
    port: u16,
}

impl UdpSender {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn send(&self, payload: &Payload<'_>) -> Result<(), SendError> {
        let bytes = payload.encode()?;
        let socket = UdpSocket::bind(("0.0.0.0", 0))?;
        socket.send_to(&bytes, (self.host.as_str(), self.port))?;
        Ok(())
    }

    /// Telemetry semantics: failures are logged and the datagram is dropped.
    /// Never stalls or fails the tick.
    pub fn send_best_effort(&self, payload: &Payload<'_>) {
        if let Err(e) = self.send(payload) {
            log::warn!("dropping landmark datagram to {}: {}", self.endpoint(), e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::time::Duration;

    #[derive(Deserialize)]
    struct DecodedPayload {
        pose_data: Vec<Landmark>,
        expression_data: Vec<Landmark>,
        hand_data: Vec<Landmark>,
        fingertip_data: Vec<Landmark>,
    }

    const EMPTY: &[Landmark] = &[];

    #[test]
    fn empty_detections_round_trip_as_empty_arrays() {
        let payload = Payload {
            pose_data: EMPTY,
            expression_data: EMPTY,
            hand_data: EMPTY,
            fingertip_data: EMPTY,
        };

        let bytes = payload.encode().unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        for key in ["pose_data", "expression_data", "hand_data", "fingertip_data"] {
            let field = value.get(key).expect("key must be present");
            assert!(field.is_array());
            assert!(field.as_array().unwrap().is_empty());
        }

        let decoded: DecodedPayload = serde_json::from_slice(&bytes).unwrap();
        assert!(decoded.pose_data.is_empty());
        assert!(decoded.expression_data.is_empty());
        assert!(decoded.hand_data.is_empty());
        assert!(decoded.fingertip_data.is_empty());
    }

    #[test]
    fn datagram_arrives_on_loopback() {
        let receiver = UdpSocket::bind("127.0.0.1:0").unwrap();
        receiver
            .set_read_timeout(Some(Duration::from_secs(2)))
            .unwrap();
        let port = receiver.local_addr().unwrap().port();

        let pose = vec![Landmark::new("NOSE", 0.5, 0.4, -0.1)];
        let payload = Payload {
            pose_data: &pose,
            expression_data: EMPTY,
            hand_data: EMPTY,
            fingertip_data: EMPTY,
        };

        let sender = UdpSender::new("127.0.0.1", port);
        sender.send(&payload).unwrap();

        let mut buf = [0u8; 65536];
        let (n, _) = receiver.recv_from(&mut buf).unwrap();
        let decoded: DecodedPayload = serde_json::from_slice(&buf[..n]).unwrap();
        assert_eq!(decoded.pose_data.len(), 1);
        assert_eq!(decoded.pose_data[0].name, "NOSE");
    }

    #[test]
    fn unreachable_host_is_swallowed() {
        let pose = Vec::new();
        let payload = Payload {
            pose_data: &pose,
            expression_data: EMPTY,
            hand_data: EMPTY,
            fingertip_data: EMPTY,
        };

        // Unresolvable host name: send fails, best-effort path must not panic.
        let sender = UdpSender::new("host.invalid", 9);
        sender.send_best_effort(&payload);
    }
}
