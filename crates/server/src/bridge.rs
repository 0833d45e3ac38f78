//! Newline-delimited JSON bridge between the host and the worker.
//!
//! Each input line is one `InboundFrame`; each output line is the
//! `OutboundFrame` with the same `id`. Frames are handled concurrently, so
//! replies may be written out of order. Logging stays on stderr.

use haven_core::Error;
use serde::{Deserialize, Serialize};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};

use crate::error::BridgeError;
use crate::events::Event;
use crate::handler::Worker;
use crate::outcome::Outcome;

#[derive(Debug, Clone, Deserialize)]
pub struct InboundFrame {
    pub id: u64,
    pub event: Event,
}

#[derive(Debug, Clone, Serialize)]
pub struct OutboundFrame {
    pub id: u64,
    pub outcome: Outcome,
}

/// Counters reported when the bridge shuts down.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct BridgeStats {
    pub frames: u64,
    /// Most frame tasks alive at once.
    pub peak_in_flight: usize,
}

/// Serve frames from `input` until end of stream, then drain in-flight
/// events and flush every reply. Finished frame tasks are reaped before the
/// next line is read. Reading stops early if the output side fails.
pub async fn run<R, W>(worker: Worker, input: R, output: W) -> Result<BridgeStats, BridgeError>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (tx, rx) = mpsc::unbounded_channel::<OutboundFrame>();
    let mut writer = tokio::spawn(write_frames(output, rx));

    let mut lines = input.lines();
    let mut in_flight = JoinSet::new();
    let mut stats = BridgeStats::default();

    loop {
        tokio::select! {
            biased;

            finished = &mut writer => {
                tracing::error!(pending = in_flight.len(), "output closed, no longer reading input");
                finished.map_err(|e| BridgeError::Writer(e.to_string()))??;
                return Err(BridgeError::Writer("writer stopped before input closed".into()));
            }
            Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => reap(joined),
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                let Some(frame) = parse_frame(&line) else { continue };

                let worker = worker.clone();
                let tx = tx.clone();
                in_flight.spawn(async move {
                    let outcome = handle_frame(worker, frame.event).await;
                    if tx.send(OutboundFrame { id: frame.id, outcome }).is_err() {
                        tracing::error!(id = frame.id, "reply dropped, writer is gone");
                    }
                });
                stats.frames += 1;
                stats.peak_in_flight = stats.peak_in_flight.max(in_flight.len());
            }
        }
    }

    tracing::info!(pending = in_flight.len(), "input closed, draining events");
    while let Some(joined) = in_flight.join_next().await {
        reap(joined);
    }

    drop(tx);
    writer.await.map_err(|e| BridgeError::Writer(e.to_string()))??;
    Ok(stats)
}

fn parse_frame(line: &str) -> Option<InboundFrame> {
    if line.trim().is_empty() {
        return None;
    }
    serde_json::from_str(line)
        .map_err(|e| tracing::warn!(error = %e, "skipping malformed frame"))
        .ok()
}

fn reap(joined: Result<(), JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "frame task aborted");
    }
}

/// Run one event in its own task so a panicking handler still yields an
/// outcome for its frame.
async fn handle_frame(worker: Worker, event: Event) -> Outcome {
    let kind = event.kind();
    match tokio::spawn(async move { worker.dispatch(event).await }).await {
        Ok(outcome) => outcome,
        Err(e) => {
            tracing::error!(%kind, error = %e, "event handler panicked");
            Worker::aborted(kind, &Error::InvalidInput(format!("{kind} handler aborted")))
        }
    }
}

async fn write_frames<W>(mut output: W, mut rx: mpsc::UnboundedReceiver<OutboundFrame>) -> Result<(), BridgeError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(frame) = rx.recv().await {
        let mut line = serde_json::to_vec(&frame)?;
        line.push(b'\n');
        output.write_all(&line).await?;
        output.flush().await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockNetwork, ORIGIN, worker_with};
    use async_trait::async_trait;
    use haven_client::Network;
    use haven_core::{Request, Response, ResponseType};
    use serde_json::{Value, json};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::io::BufReader;

    struct PanickingNetwork;

    #[async_trait]
    impl Network for PanickingNetwork {
        async fn fetch(&self, request: &Request) -> Result<Response, Error> {
            panic!("network stack blew up fetching {}", request.url);
        }
    }

    async fn exchange(worker: Worker, input: &str) -> Vec<Value> {
        let (client, server) = tokio::io::duplex(64 * 1024);
        run(worker, input.as_bytes(), server).await.unwrap();

        let mut replies = Vec::new();
        let mut lines = tokio::io::BufReader::new(client).lines();
        while let Some(line) = lines.next_line().await.unwrap() {
            replies.push(serde_json::from_str::<Value>(&line).unwrap());
        }
        replies.sort_by_key(|r| r["id"].as_u64());
        replies
    }

    #[tokio::test]
    async fn test_replies_carry_frame_ids() {
        let worker = worker_with(Arc::new(MockNetwork::new())).await;
        let input = concat!(
            r#"{"id":1,"event":{"kind":"message","data":{"type":"GET_VERSION"},"ports":[7]}}"#,
            "\n",
            r#"{"id":2,"event":{"kind":"message","data":{"type":"SKIP_WAITING"}}}"#,
            "\n",
        );

        let replies = exchange(worker, input).await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(
            replies[0]["outcome"]["effects"][0],
            json!({"effect": "post_message", "target": {"port": 7}, "message": {"version": "request-system-v1.0.0"}})
        );
        assert_eq!(replies[1]["outcome"]["effects"][0], json!({"effect": "skip_waiting"}));
    }

    #[tokio::test]
    async fn test_malformed_lines_are_skipped() {
        let worker = worker_with(Arc::new(MockNetwork::new())).await;
        let input = "not json\n\n{\"id\":9,\"event\":{\"kind\":\"bogus\"}}\n{\"id\":3,\"event\":{\"kind\":\"push\"}}\n";

        let replies = exchange(worker, input).await;
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0]["id"], 3);
        assert_eq!(replies[0]["outcome"]["effects"][0]["effect"], "show_notification");
    }

    #[tokio::test]
    async fn test_fetch_frame_reports_decision() {
        let network = Arc::new(MockNetwork::new());
        network.respond(
            &format!("{ORIGIN}/app.js"),
            Response::new(200, "ok").with_type(ResponseType::Basic),
        );
        let worker = worker_with(network).await;
        let input = concat!(r#"{"id":5,"event":{"kind":"fetch","request":{"url":"/app.js"}}}"#, "\n");

        let replies = exchange(worker, input).await;
        assert_eq!(replies[0]["outcome"]["fetch"]["decision"], "respond");
        assert_eq!(replies[0]["outcome"]["fetch"]["source"], "network");
    }

    #[tokio::test]
    async fn test_empty_input_writes_nothing() {
        let worker = worker_with(Arc::new(MockNetwork::new())).await;
        assert!(exchange(worker, "").await.is_empty());
    }

    #[tokio::test]
    async fn test_panicking_handler_still_answers_its_frame() {
        let worker = worker_with(Arc::new(PanickingNetwork)).await;
        let input = concat!(
            r#"{"id":1,"event":{"kind":"fetch","request":{"url":"/boom.js"}}}"#,
            "\n",
            r#"{"id":2,"event":{"kind":"message","data":{"type":"SKIP_WAITING"}}}"#,
            "\n",
        );

        let replies = exchange(worker, input).await;
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[0]["outcome"]["fetch"]["decision"], "failed");
        assert_eq!(replies[0]["outcome"]["fetch"]["code"], -32602);
        assert_eq!(replies[1]["outcome"]["effects"][0]["effect"], "skip_waiting");
    }

    #[tokio::test]
    async fn test_finished_frames_are_reaped_while_reading() {
        let worker = worker_with(Arc::new(MockNetwork::new())).await;
        let (mut host_in, worker_in) = tokio::io::duplex(4096);
        let (host_out, worker_out) = tokio::io::duplex(64 * 1024);
        let bridge = tokio::spawn(run(worker, BufReader::new(worker_in), worker_out));

        let mut replies = BufReader::new(host_out).lines();
        for id in 0..20u64 {
            let frame = format!("{{\"id\":{id},\"event\":{{\"kind\":\"message\",\"data\":{{\"type\":\"SKIP_WAITING\"}}}}}}\n");
            host_in.write_all(frame.as_bytes()).await.unwrap();
            let reply: Value = serde_json::from_str(&replies.next_line().await.unwrap().unwrap()).unwrap();
            assert_eq!(reply["id"], id);
        }
        drop(host_in);

        let stats = bridge.await.unwrap().unwrap();
        assert_eq!(stats.frames, 20);
        assert!(stats.peak_in_flight <= 2, "peak {}", stats.peak_in_flight);
    }

    #[tokio::test]
    async fn test_closed_output_stops_reading() {
        let worker = worker_with(Arc::new(MockNetwork::new())).await;
        let (mut host_in, worker_in) = tokio::io::duplex(4096);
        let (host_out, worker_out) = tokio::io::duplex(4096);
        drop(host_out);

        host_in.write_all(b"{\"id\":1,\"event\":{\"kind\":\"push\"}}\n").await.unwrap();

        let result = tokio::time::timeout(Duration::from_secs(5), run(worker, BufReader::new(worker_in), worker_out))
            .await
            .expect("bridge kept reading after its output closed");
        assert!(matches!(result, Err(BridgeError::Io(_))));
        drop(host_in);
    }
}
