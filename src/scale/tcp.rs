// src/scale/tcp.rs
//
// Line-oriented TCP scale client speaking the SICS-style `SI` immediate
// weight command. The connection is lazy and reused across reads; a failed
// exchange drops it so the next read reconnects.

use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;

use super::{ScaleError, WeightReader};

pub struct TcpScale {
    addr: String,
    read_timeout: Duration,
    conn: Mutex<Option<BufReader<TcpStream>>>,
}

impl TcpScale {
    pub fn new(addr: String, read_timeout: Duration) -> Self {
        Self {
            addr,
            read_timeout,
            conn: Mutex::new(None),
        }
    }

    async fn exchange(&self) -> Result<f64, ScaleError> {
        let mut slot = self.conn.lock().await;
        if slot.is_none() {
            let stream = TcpStream::connect(self.addr.as_str()).await?;
            *slot = Some(BufReader::new(stream));
        }
        let conn = slot.as_mut().unwrap();

        let result = async {
            conn.get_mut().write_all(b"SI\r\n").await?;
            let mut line = String::new();
            let n = conn.read_line(&mut line).await?;
            if n == 0 {
                return Err(ScaleError::Io(std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    "scale closed connection",
                )));
            }
            parse_weight_line(&line)
        }
        .await;

        if result.is_err() {
            // Stale half-open connections produce garbage; start fresh.
            *slot = None;
        }
        result
    }
}

/// Responses look like `S S     100.05 g`; the weight is the first numeric
/// token after the status fields.
fn parse_weight_line(line: &str) -> Result<f64, ScaleError> {
    line.split_whitespace()
        .find_map(|tok| tok.parse::<f64>().ok())
        .ok_or_else(|| ScaleError::Malformed(line.trim().to_string()))
}

#[async_trait]
impl WeightReader for TcpScale {
    async fn read_net_weight(&self) -> Result<f64, ScaleError> {
        match timeout(self.read_timeout, self.exchange()).await {
            Ok(result) => result,
            Err(_) => {
                // Whatever is mid-flight on the socket is unusable now.
                *self.conn.lock().await = None;
                Err(ScaleError::Timeout)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_sics_weight_line() {
        assert_eq!(parse_weight_line("S S     100.05 g\r\n").unwrap(), 100.05);
        assert_eq!(parse_weight_line("S S -0.42 kg").unwrap(), -0.42);
    }

    #[test]
    fn rejects_line_without_number() {
        assert!(matches!(
            parse_weight_line("I\r\n"),
            Err(ScaleError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn unreachable_device_times_out() {
        // Reserved TEST-NET-1 address, nothing listens there.
        let scale = TcpScale::new("192.0.2.1:4305".to_string(), Duration::from_millis(50));
        let err = scale.read_net_weight().await.unwrap_err();
        assert!(matches!(err, ScaleError::Timeout | ScaleError::Io(_)));
    }
}
