use rollcall_core::{FeatureExtractor, FeatureVector, Identity, MatchVerdict, Matcher};
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("no face detected in the captured image")]
    NoFaceDetected,
    #[error("engine thread exited")]
    ChannelClosed,
    #[error("failed to spawn engine thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Simulated processing time for the extraction and matching stages.
#[derive(Debug, Clone, Copy, Default)]
pub struct Latency {
    pub capture: Duration,
    pub matching: Duration,
}

/// Messages sent from request handlers to the engine thread.
enum EngineRequest {
    Capture {
        image: Vec<u8>,
        reply: oneshot::Sender<Result<FeatureVector, EngineError>>,
    },
    Match {
        captured: FeatureVector,
        gallery: Vec<Identity>,
        reply: oneshot::Sender<MatchVerdict>,
    },
}

/// Clone-safe handle to the engine thread.
///
/// Requests run to completion once started; dropping the returned future
/// only discards the result.
#[derive(Clone)]
pub struct EngineHandle {
    tx: mpsc::Sender<EngineRequest>,
}

impl EngineHandle {
    /// Extract a feature vector from a raw image.
    pub async fn capture(&self, image: Vec<u8>) -> Result<FeatureVector, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Capture {
                image,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)?
    }

    /// Compare a captured vector against a gallery snapshot.
    pub async fn match_gallery(
        &self,
        captured: FeatureVector,
        gallery: Vec<Identity>,
    ) -> Result<MatchVerdict, EngineError> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.tx
            .send(EngineRequest::Match {
                captured,
                gallery,
                reply: reply_tx,
            })
            .await
            .map_err(|_| EngineError::ChannelClosed)?;
        reply_rx.await.map_err(|_| EngineError::ChannelClosed)
    }
}

/// Spawn the engine on a dedicated OS thread that owns the extractor and matcher.
pub fn spawn_engine(
    mut extractor: Box<dyn FeatureExtractor>,
    matcher: Box<dyn Matcher + Send>,
    latency: Latency,
) -> Result<EngineHandle, EngineError> {
    let (tx, mut rx) = mpsc::channel::<EngineRequest>(4);

    std::thread::Builder::new()
        .name("rollcall-engine".into())
        .spawn(move || {
            tracing::info!(
                capture_ms = latency.capture.as_millis() as u64,
                match_ms = latency.matching.as_millis() as u64,
                "engine thread started"
            );
            while let Some(req) = rx.blocking_recv() {
                match req {
                    EngineRequest::Capture { image, reply } => {
                        std::thread::sleep(latency.capture);
                        let result = extractor.extract(&image).ok_or(EngineError::NoFaceDetected);
                        match &result {
                            Ok(v) => tracing::debug!(quality = v.quality, "capture: face extracted"),
                            Err(_) => tracing::debug!(bytes = image.len(), "capture: no face"),
                        }
                        let _ = reply.send(result);
                    }
                    EngineRequest::Match {
                        captured,
                        gallery,
                        reply,
                    } => {
                        std::thread::sleep(latency.matching);
                        let verdict = matcher.compare(&captured, &gallery);
                        tracing::info!(
                            gallery = gallery.len(),
                            status = %verdict.status,
                            confidence = verdict.confidence,
                            "match complete"
                        );
                        let _ = reply.send(verdict);
                    }
                }
            }
            tracing::info!("engine thread exiting");
        })?;

    Ok(EngineHandle { tx })
}
