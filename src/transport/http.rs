//! HTTP transport: one short-lived GET request per command

use crate::transport::traits::CommandTransport;
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use ptz_shared::{codec, OutboundCommand};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::time::timeout;

/// Where and how to reach the camera backend
#[derive(Debug, Clone)]
pub struct HttpConfig {
    /// Backend host name or address
    pub host: String,
    /// Backend port
    pub port: u16,
    /// Connection timeout
    pub connect_timeout: Duration,
    /// Time allowed for the request to be written and the status line read
    pub response_timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            host: "localhost".into(),
            port: 8888,
            connect_timeout: Duration::from_secs(2),
            response_timeout: Duration::from_secs(5),
        }
    }
}

impl HttpConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            ..Default::default()
        }
    }

    /// Value of the Host header
    pub fn authority(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Sends each command as `GET /{path}?{query}` to the backend
pub struct HttpTransport {
    config: HttpConfig,
}

impl HttpTransport {
    pub fn new(config: HttpConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HttpConfig {
        &self.config
    }

    async fn exchange(&self, stream: &mut TcpStream, request: &str) -> Result<u16> {
        stream.write_all(request.as_bytes()).await?;

        let mut response = Vec::new();
        let mut buf = [0u8; 1024];

        loop {
            let n = stream.read(&mut buf).await?;
            if n == 0 {
                return Err(anyhow!("Backend closed connection before responding"));
            }
            response.extend_from_slice(&buf[..n]);

            if let Some(status) = codec::decode_status(&response)? {
                return Ok(status);
            }
        }
    }
}

#[async_trait]
impl CommandTransport for HttpTransport {
    async fn send(&self, command: &OutboundCommand) -> Result<()> {
        let addr = (self.config.host.as_str(), self.config.port);
        let mut stream = timeout(self.config.connect_timeout, TcpStream::connect(addr))
            .await
            .map_err(|_| anyhow!("Connect to {} timed out", self.config.authority()))??;

        let request = codec::encode_request(command, &self.config.authority());
        let status = timeout(
            self.config.response_timeout,
            self.exchange(&mut stream, &request),
        )
        .await
        .map_err(|_| anyhow!("No response from {}", self.config.authority()))??;

        if !(200..300).contains(&status) {
            return Err(anyhow!("Backend answered {} for {}", status, command));
        }

        Ok(())
    }

    fn name(&self) -> &'static str {
        "HTTP"
    }
}
