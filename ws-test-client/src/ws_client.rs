use anyhow::{Context, Result};
use futures_util::stream::StreamExt;
use futures_util::SinkExt;
use log::*;
use serde_json::Value;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio_tungstenite::{connect_async, tungstenite::Message};

/// One text frame received from the server, parsed as JSON.
#[derive(Debug, Clone)]
pub struct Frame {
    pub data: Value,
}

impl Frame {
    /// The `message` payload every notification frame carries.
    pub fn message(&self) -> &Value {
        &self.data["message"]
    }
}

pub struct Connection {
    pub label: String,
    frame_rx: mpsc::UnboundedReceiver<Frame>,
    close_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: tokio::task::JoinHandle<()>,
}

impl Connection {
    pub async fn establish(ws_url: &str, label: String) -> Result<Self> {
        let (socket, _response) = connect_async(ws_url)
            .await
            .with_context(|| format!("Failed to open websocket to {ws_url}"))?;
        let (mut sink, mut stream) = socket.split();

        let (frame_tx, frame_rx) = mpsc::unbounded_channel();
        let (close_tx, mut close_rx) = tokio::sync::oneshot::channel::<()>();

        let task_label = label.clone();
        let handle = tokio::spawn(async move {
            loop {
                tokio::select! {
                    _ = &mut close_rx => {
                        if let Err(e) = sink.close().await {
                            debug!("Close failed for {}: {}", task_label, e);
                        }
                        break;
                    }
                    message = stream.next() => match message {
                        Some(Ok(Message::Text(text))) => {
                            match serde_json::from_str(text.as_str()) {
                                Ok(data) => {
                                    if frame_tx.send(Frame { data }).is_err() {
                                        debug!("Frame receiver dropped for {}", task_label);
                                        break;
                                    }
                                }
                                Err(e) => warn!("Non-JSON frame for {}: {}", task_label, e),
                            }
                        }
                        Some(Ok(Message::Close(frame))) => {
                            debug!("Server closed websocket for {}: {:?}", task_label, frame);
                            break;
                        }
                        Some(Ok(_)) => {
                            // Pings are answered by tungstenite
                        }
                        Some(Err(e)) => {
                            warn!("Websocket error for {}: {}", task_label, e);
                            break;
                        }
                        None => {
                            debug!("Websocket stream ended for {}", task_label);
                            break;
                        }
                    }
                }
            }
        });

        Ok(Self {
            label,
            frame_rx,
            close_tx: Some(close_tx),
            handle,
        })
    }

    pub async fn wait_for_frame(&mut self, timeout: Duration) -> Result<Frame> {
        match tokio::time::timeout(timeout, self.frame_rx.recv()).await {
            Ok(Some(frame)) => Ok(frame),
            Ok(None) => anyhow::bail!("Websocket connection closed"),
            Err(_) => anyhow::bail!("Timeout after {:?} waiting for a frame", timeout),
        }
    }

    /// Succeeds if no frame arrives within `window`.
    pub async fn expect_silence(&mut self, window: Duration) -> Result<()> {
        match tokio::time::timeout(window, self.frame_rx.recv()).await {
            Ok(Some(frame)) => anyhow::bail!("Unexpected frame: {}", frame.data),
            Ok(None) => anyhow::bail!("Websocket connection closed"),
            Err(_) => Ok(()),
        }
    }

    pub async fn close(mut self) {
        if let Some(close_tx) = self.close_tx.take() {
            let _ = close_tx.send(());
        }
        let _ = self.handle.await;
    }
}

/// Maps an `http(s)://` base URL onto the matching `ws(s)://` URL for `path`.
pub fn ws_url(base_url: &str, path: &str) -> String {
    let base = base_url.trim_end_matches('/');
    let base = if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}")
    } else {
        base.to_string()
    };
    format!("{base}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ws_url_swaps_scheme_and_joins_path() {
        assert_eq!(
            ws_url("http://localhost:4000/", "/ws/products/"),
            "ws://localhost:4000/ws/products/"
        );
        assert_eq!(
            ws_url("https://example.com", "/ws/products/"),
            "wss://example.com/ws/products/"
        );
    }
}
