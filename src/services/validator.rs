//! Post-provisioning validation hand-off.
//!
//! Provisioning only enqueues; the work runs outside the request.

use std::time::Duration;

use tokio::net::TcpStream;
use uuid::Uuid;

use crate::models::ManagedServer;

pub const DEFAULT_PROBE_ATTEMPTS: u32 = 10;
const PROBE_INTERVAL: Duration = Duration::from_secs(15);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Receives freshly registered servers for asynchronous validation.
pub trait ServerValidator: Send + Sync {
    /// Must return immediately.
    fn enqueue(&self, server: &ManagedServer);
}

/// Probes the server's SSH port until it accepts a TCP connection or the
/// attempts run out, then logs the outcome.
#[derive(Debug, Clone)]
pub struct SshReachabilityValidator {
    attempts: u32,
    interval: Duration,
}

impl SshReachabilityValidator {
    pub fn new(attempts: u32) -> Self {
        Self {
            attempts: attempts.max(1),
            interval: PROBE_INTERVAL,
        }
    }
}

impl ServerValidator for SshReachabilityValidator {
    fn enqueue(&self, server: &ManagedServer) {
        let address = probe_address(&server.ip, server.ssh_port);
        let server_id = server.id;
        let attempts = self.attempts;
        let interval = self.interval;

        tracing::info!(server_id = %server_id, address = %address, "Queued server validation");
        tokio::spawn(async move {
            probe_ssh(server_id, address, attempts, interval).await;
        });
    }
}

/// `host:port`, bracketing IPv6 literals.
pub fn probe_address(ip: &str, port: i32) -> String {
    if ip.contains(':') {
        format!("[{}]:{}", ip, port)
    } else {
        format!("{}:{}", ip, port)
    }
}

/// Returns whether the port became reachable within `attempts` tries.
pub async fn probe_ssh(server_id: Uuid, address: String, attempts: u32, interval: Duration) -> bool {
    for attempt in 1..=attempts {
        match tokio::time::timeout(CONNECT_TIMEOUT, TcpStream::connect(&address)).await {
            Ok(Ok(_)) => {
                tracing::info!(server_id = %server_id, attempt, "Server is reachable over SSH");
                return true;
            }
            Ok(Err(e)) => {
                tracing::debug!(server_id = %server_id, attempt, error = %e, "SSH port not reachable yet");
            }
            Err(_) => {
                tracing::debug!(server_id = %server_id, attempt, "SSH connect timed out");
            }
        }

        if attempt < attempts {
            tokio::time::sleep(interval).await;
        }
    }

    tracing::warn!(server_id = %server_id, attempts, "Server did not become reachable over SSH");
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_probe_address_brackets_ipv6() {
        assert_eq!(probe_address("203.0.113.5", 22), "203.0.113.5:22");
        assert_eq!(probe_address("2a01:4f8::1", 22), "[2a01:4f8::1]:22");
    }

    #[tokio::test]
    async fn test_probe_succeeds_on_listening_port() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();

        assert!(probe_ssh(Uuid::new_v4(), address, 1, Duration::from_millis(1)).await);
    }

    #[tokio::test]
    async fn test_probe_gives_up_after_attempts() {
        // Bind then drop to get a port with nothing listening
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap().to_string();
        drop(listener);

        assert!(!probe_ssh(Uuid::new_v4(), address, 2, Duration::from_millis(1)).await);
    }
}
