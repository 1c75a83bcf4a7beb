//! Panel sessions: route widget events from one input source

use super::input::{parse_line, PanelEvent};
use crate::command::RateLimitedDispatcher;
use crate::settings::SettingsStore;
use crate::transport::CommandQueue;
use anyhow::{anyhow, Result};
use ptz_shared::{mapping, CameraId, ChannelId};
use std::collections::HashSet;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Everything a session needs, shared by all sessions
#[derive(Clone)]
pub struct PanelContext {
    pub dispatcher: RateLimitedDispatcher,
    pub settings: Arc<SettingsStore>,
    pub outbox: CommandQueue,
}

/// One input source with its own camera selection
pub struct PanelSession {
    ctx: PanelContext,
    camera: Option<CameraId>,
    /// Channels moved by this session, returned to rest when it ends
    touched: HashSet<ChannelId>,
}

impl PanelSession {
    pub fn new(ctx: PanelContext) -> Self {
        Self {
            ctx,
            camera: None,
            touched: HashSet::new(),
        }
    }

    pub fn camera(&self) -> Option<CameraId> {
        self.camera
    }

    fn require_camera(&self) -> Result<CameraId> {
        self.camera
            .ok_or_else(|| anyhow!("No camera selected (use `camera <id>` first)"))
    }

    /// Apply one event. Returns text to show the operator, if any.
    pub async fn handle(&mut self, event: PanelEvent) -> Result<Option<String>> {
        match event {
            PanelEvent::SelectCamera(camera) => {
                if let Some(previous) = self.camera.filter(|c| *c != camera) {
                    self.release_touched(previous).await;
                }
                info!("[PANEL] Camera {} selected", camera);
                self.camera = Some(camera);
            }
            PanelEvent::Sample { channel, sample } => {
                let camera = self.require_camera()?;
                self.ctx.dispatcher.submit(camera, channel, sample).await?;
                self.touched.insert(channel);
            }
            PanelEvent::Release(channel) => {
                let camera = self.require_camera()?;
                self.ctx.dispatcher.release(camera, channel).await?;
                self.touched.remove(&channel);
            }
            PanelEvent::AutoFocus(on) => {
                let camera = self.require_camera()?;
                self.ctx.outbox.push(mapping::auto_focus_command(camera, on));
            }
            PanelEvent::AutoIris(on) => {
                let camera = self.require_camera()?;
                self.ctx.outbox.push(mapping::auto_iris_command(camera, on));
            }
            PanelEvent::CreatePreset { tags } => {
                let camera = self.require_camera()?;
                self.ctx
                    .outbox
                    .push(mapping::create_preset_command(camera, &tags));
            }
            PanelEvent::SetSensitivity { key, value } => {
                self.ctx.settings.set(key, value).await?;
            }
            PanelEvent::ResetSettings => {
                self.ctx.settings.clear().await;
            }
            PanelEvent::ShowSettings => {
                let text = self
                    .ctx
                    .settings
                    .snapshot()
                    .await
                    .iter()
                    .map(|(key, value)| format!("{}={}", key, value))
                    .collect::<Vec<_>>()
                    .join(" ");
                return Ok(Some(text));
            }
        }

        Ok(None)
    }

    /// Parse and apply one input line, producing the reply for the client
    pub async fn process_line(&mut self, line: &str) -> Option<String> {
        let event = match parse_line(line) {
            Ok(Some(event)) => event,
            Ok(None) => return None,
            Err(e) => {
                warn!("[PANEL] Bad input {:?}: {}", line.trim(), e);
                return Some(format!("error: {}", e));
            }
        };

        debug!("[PANEL] Event: {:?}", event);

        match self.handle(event).await {
            Ok(Some(text)) => Some(text),
            Ok(None) => Some("ok".into()),
            Err(e) => {
                warn!("[PANEL] {}", e);
                Some(format!("error: {}", e))
            }
        }
    }

    /// Stop anything this session left moving
    pub async fn close(&mut self) {
        if let Some(camera) = self.camera {
            self.release_touched(camera).await;
        }
    }

    async fn release_touched(&mut self, camera: CameraId) {
        let channels: Vec<ChannelId> = self.touched.drain().collect();
        for channel in channels {
            if let Err(e) = self.ctx.dispatcher.release(camera, channel).await {
                error!("[PANEL] Failed to release {}: {}", channel, e);
            }
        }
    }
}

/// Feed lines from `reader` into a fresh session, writing replies to `writer`
pub async fn run_lines<R, W>(ctx: PanelContext, reader: R, mut writer: W) -> Result<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut session = PanelSession::new(ctx);
    let mut lines = reader.lines();

    let result = async {
        while let Some(line) = lines.next_line().await? {
            if let Some(reply) = session.process_line(&line).await {
                writer.write_all(reply.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
            }
        }
        Ok::<(), anyhow::Error>(())
    }
    .await;

    session.close().await;
    result
}

/// Accept panel clients on `listener`, one session per connection
pub async fn serve(listener: TcpListener, ctx: PanelContext) -> Result<()> {
    info!("[PANEL] Listening on {}", listener.local_addr()?);

    loop {
        let (socket, addr) = listener.accept().await?;
        info!("[PANEL] Client connected: {}", addr);

        let ctx = ctx.clone();
        tokio::spawn(async move {
            let (reader, writer) = socket.into_split();
            let reader = tokio::io::BufReader::new(reader);

            match run_lines(ctx, reader, writer).await {
                Ok(()) => info!("[PANEL] Client disconnected: {}", addr),
                Err(e) => warn!("[PANEL] Client {} dropped: {}", addr, e),
            }
        });
    }
}
