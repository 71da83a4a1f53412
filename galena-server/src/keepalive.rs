use std::{
    sync::{Arc, Mutex},
    time::{Duration, Instant},
};

use galena_defs::packet::play;
use galena_util::connection::ConnectionSender;
use thiserror::Error;

pub const DEFAULT_SEND_INTERVAL: Duration = Duration::from_secs(10);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
#[error("Player timed out")]
pub struct KeepAliveTimeout;

#[derive(Debug)]
struct Heartbeat {
    token: i32,
    sent: Instant,
}

/// The PLAY-state liveness sub-protocol. A timer thread emits a KeepAlive
/// with a random 7-bit token every `send_interval` and records the send
/// time; the connection worker calls [`KeepAlive::check`] and fails the
/// connection once any outstanding heartbeat exceeds `timeout`. The timer
/// thread exits on its next tick after the connection closes.
#[derive(Debug)]
pub struct KeepAlive {
    heartbeats: Arc<Mutex<Vec<Heartbeat>>>,
    timeout: Duration,
}

impl KeepAlive {
    pub fn start(sender: ConnectionSender, send_interval: Duration, timeout: Duration) -> Self {
        let heartbeats = Arc::new(Mutex::new(Vec::new()));

        let emitter_heartbeats = heartbeats.clone();
        std::thread::spawn(move || {
            loop {
                if sender.is_closed() {
                    break;
                }
                let token = rand::random_range(0..128);
                emitter_heartbeats.lock().unwrap().push(Heartbeat {
                    token,
                    sent: Instant::now(),
                });
                if sender.send(&play::KeepAlive { id: token }).is_err() {
                    break;
                }
                std::thread::sleep(send_interval);
            }
        });

        Self {
            heartbeats,
            timeout,
        }
    }

    /// Removes the heartbeat matching an inbound token; unknown tokens are
    /// ignored.
    pub fn acknowledge(&self, token: i32) {
        self.heartbeats
            .lock()
            .unwrap()
            .retain(|heartbeat| heartbeat.token != token);
    }

    pub fn check(&self) -> Result<(), KeepAliveTimeout> {
        if self
            .heartbeats
            .lock()
            .unwrap()
            .iter()
            .any(|heartbeat| heartbeat.sent.elapsed() > self.timeout)
        {
            return Err(KeepAliveTimeout);
        }
        Ok(())
    }

    #[cfg(test)]
    fn push_for_test(&self, token: i32, sent: Instant) {
        self.heartbeats
            .lock()
            .unwrap()
            .push(Heartbeat { token, sent });
    }

    #[cfg(test)]
    fn outstanding(&self) -> usize {
        self.heartbeats.lock().unwrap().len()
    }
}

#[cfg(test)]
mod test {
    use std::time::{Duration, Instant};

    use super::KeepAlive;

    fn detached() -> KeepAlive {
        KeepAlive {
            heartbeats: std::sync::Arc::new(std::sync::Mutex::new(Vec::new())),
            timeout: Duration::from_millis(50),
        }
    }

    #[test]
    fn stale_heartbeat_times_out() {
        let keepalive = detached();
        keepalive.push_for_test(12, Instant::now() - Duration::from_millis(100));
        assert!(keepalive.check().is_err());
    }

    #[test]
    fn fresh_heartbeat_passes() {
        let keepalive = detached();
        keepalive.push_for_test(12, Instant::now());
        assert!(keepalive.check().is_ok());
    }

    #[test]
    fn acknowledge_removes_matching_token() {
        let keepalive = detached();
        keepalive.push_for_test(12, Instant::now() - Duration::from_millis(100));
        keepalive.push_for_test(90, Instant::now());
        keepalive.acknowledge(12);
        assert_eq!(keepalive.outstanding(), 1);
        // With the stale entry acknowledged, later checks see nothing old.
        assert!(keepalive.check().is_ok());
        // Mismatched tokens are ignored.
        keepalive.acknowledge(7);
        assert_eq!(keepalive.outstanding(), 1);
    }
}
