use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use bytes::Bytes;
use log::{debug, info, trace, warn};
use streamkit_rtmp::chunk_io::Packet;
use streamkit_rtmp::messages::MediaType;
use streamkit_rtmp::sessions::{
    MediaHandler, MediaPayload, PolicyOutcome, ServerSession, ServerSessionConfig,
    ServerSessionError, ServerSessionEvent, ServerSessionHandler, ServerSessionResult,
    StreamMetadata,
};
use streamkit_rtmp::time::RtmpTimestamp;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::broadcast::{self, error::RecvError};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

const FRAME_BACKLOG: usize = 512;
const READ_BUFFER_SIZE: usize = 4096;

#[derive(Clone, Debug)]
pub struct MediaFrame {
    media_type: MediaType,
    data: Bytes,
    timestamp: RtmpTimestamp,
}

pub struct PublishedStream {
    frames: broadcast::Sender<MediaFrame>,
    metadata: Option<StreamMetadata>,
}

/// Streams currently being published, keyed by `app/stream`
pub type StreamRegistry = Arc<Mutex<HashMap<String, PublishedStream>>>;

pub struct Connection {
    id: usize,
    registry: StreamRegistry,
}

struct Subscription {
    stream_id: u32,
    frames: broadcast::Receiver<MediaFrame>,
}

impl Connection {
    pub fn new(id: usize, registry: StreamRegistry) -> Connection {
        Connection { id, registry }
    }

    pub async fn run(self, mut socket: TcpStream) -> Result<(), BoxError> {
        let handler = RelayHandler::new(self.id, self.registry.clone());
        let mut session = ServerSession::new(ServerSessionConfig::new(), handler);
        let mut buffer = vec![0_u8; READ_BUFFER_SIZE];
        let mut subscription: Option<Subscription> = None;

        loop {
            tokio::select! {
                read = socket.read(&mut buffer) => {
                    let bytes_read = read?;
                    if bytes_read == 0 {
                        info!("Connection {}: Client disconnected", self.id);
                        return Ok(());
                    }

                    let results = match session.handle_input(&buffer[..bytes_read]) {
                        Ok(results) => results,
                        Err(ServerSessionError::PolicyRejected { outcome, stream_name, final_response }) => {
                            warn!(
                                "Connection {}: Request for stream '{}' rejected ({:?})",
                                self.id, stream_name, outcome
                            );

                            socket.write_all(&final_response.bytes).await?;
                            return Ok(());
                        }

                        Err(error) => return Err(error.into()),
                    };

                    for result in results {
                        match result {
                            ServerSessionResult::OutboundResponse(packet) => {
                                socket.write_all(&packet.bytes).await?;
                            }

                            ServerSessionResult::RaisedEvent(event) => {
                                for packet in self.handle_event(&mut session, &mut subscription, event)? {
                                    socket.write_all(&packet.bytes).await?;
                                }
                            }

                            ServerSessionResult::UnhandleableMessageReceived(payload) => {
                                debug!("Connection {}: Unhandleable message type {}", self.id, payload.type_id);
                            }
                        }
                    }
                }

                frame = next_frame(&mut subscription) => {
                    let stream_id = match subscription {
                        Some(ref subscription) => subscription.stream_id,
                        None => continue,
                    };

                    match frame {
                        Ok(frame) => {
                            let packet = match frame.media_type {
                                MediaType::Video => session.send_video_data(stream_id, frame.data, frame.timestamp, true)?,
                                MediaType::Audio => session.send_audio_data(stream_id, frame.data, frame.timestamp, true)?,
                            };

                            socket.write_all(&packet.bytes).await?;
                        }

                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Connection {}: Player fell behind, skipped {} frames", self.id, skipped);
                        }

                        Err(RecvError::Closed) => {
                            info!("Connection {}: Publisher went away, ending playback", self.id);
                            let packet = session.send_stream_eof(stream_id)?;
                            socket.write_all(&packet.bytes).await?;
                            subscription = None;
                        }
                    }
                }
            }
        }
    }

    fn handle_event(
        &self,
        session: &mut ServerSession<RelayHandler>,
        subscription: &mut Option<Subscription>,
        event: ServerSessionEvent,
    ) -> Result<Vec<Packet>, ServerSessionError> {
        let mut packets = Vec::new();
        match event {
            ServerSessionEvent::ConnectionAccepted { app_name } => {
                info!("Connection {}: Connected to app '{}'", self.id, app_name);
            }

            ServerSessionEvent::PublishStreamStarted { app_name, stream_name, .. } => {
                info!("Connection {}: Publishing on '{}/{}'", self.id, app_name, stream_name);
            }

            ServerSessionEvent::PublishStreamFinished { app_name, stream_name } => {
                info!("Connection {}: Finished publishing on '{}/{}'", self.id, app_name, stream_name);
                session.handler_mut().stop_publishing();
            }

            ServerSessionEvent::StreamMetadataChanged { app_name, stream_name, metadata } => {
                let key = stream_key(&app_name, &stream_name);
                if let Some(stream) = lock(&self.registry).get_mut(&key) {
                    stream.metadata = Some(metadata);
                }
            }

            ServerSessionEvent::PlayStreamStarted { app_name, stream_name, stream_id } => {
                info!("Connection {}: Playing '{}/{}' on stream {}", self.id, app_name, stream_name, stream_id);

                let key = stream_key(&app_name, &stream_name);
                let metadata = lock(&self.registry).get(&key).and_then(|stream| stream.metadata.clone());
                if let Some(metadata) = metadata {
                    packets.push(session.send_metadata(stream_id, &metadata)?);
                }

                if let Some(frames) = session.handler_mut().pending_frames.take() {
                    *subscription = Some(Subscription { stream_id, frames });
                }
            }

            ServerSessionEvent::PlayStreamFinished { app_name, stream_name } => {
                info!("Connection {}: Stopped playing '{}/{}'", self.id, app_name, stream_name);
                *subscription = None;
            }

            other => debug!("Connection {}: Event raised: {:?}", self.id, other),
        }

        Ok(packets)
    }
}

async fn next_frame(subscription: &mut Option<Subscription>) -> Result<MediaFrame, RecvError> {
    match subscription {
        Some(subscription) => subscription.frames.recv().await,
        None => std::future::pending().await,
    }
}

/// Answers publish and play requests against the shared registry and forwards published media
struct RelayHandler {
    connection_id: usize,
    registry: StreamRegistry,
    published_key: Option<String>,
    publisher: Option<broadcast::Sender<MediaFrame>>,
    pending_frames: Option<broadcast::Receiver<MediaFrame>>,
}

impl RelayHandler {
    fn new(connection_id: usize, registry: StreamRegistry) -> RelayHandler {
        RelayHandler {
            connection_id,
            registry,
            published_key: None,
            publisher: None,
            pending_frames: None,
        }
    }

    fn stop_publishing(&mut self) {
        self.publisher = None;
        if let Some(key) = self.published_key.take() {
            lock(&self.registry).remove(&key);
        }
    }
}

impl Drop for RelayHandler {
    fn drop(&mut self) {
        self.stop_publishing();
    }
}

impl MediaHandler for RelayHandler {
    fn on_media(&mut self, payload: MediaPayload<'_>) {
        if !payload.is_first_fragment || !payload.is_last_fragment {
            return;
        }

        if let Some(ref frames) = self.publisher {
            trace!(
                "Connection {}: {:?} frame of {} bytes at {}",
                self.connection_id,
                payload.media_type,
                payload.data.len(),
                payload.timestamp.value
            );

            // An error only means nobody is watching yet
            let _ = frames.send(MediaFrame {
                media_type: payload.media_type,
                data: Bytes::copy_from_slice(payload.data),
                timestamp: payload.timestamp,
            });
        }
    }
}

impl ServerSessionHandler for RelayHandler {
    fn on_publish(&mut self, app_name: &str, stream_name: &str) -> PolicyOutcome {
        let key = stream_key(app_name, stream_name);
        let mut streams = lock(&self.registry);
        if streams.contains_key(&key) {
            return PolicyOutcome::Occupied;
        }

        let (frames, _) = broadcast::channel(FRAME_BACKLOG);
        streams.insert(
            key.clone(),
            PublishedStream {
                frames: frames.clone(),
                metadata: None,
            },
        );

        self.publisher = Some(frames);
        self.published_key = Some(key);
        PolicyOutcome::Accepted
    }

    fn on_play(&mut self, app_name: &str, stream_name: &str) -> PolicyOutcome {
        let key = stream_key(app_name, stream_name);
        let streams = lock(&self.registry);
        match streams.get(&key) {
            Some(stream) => {
                self.pending_frames = Some(stream.frames.subscribe());
                PolicyOutcome::Accepted
            }

            None => PolicyOutcome::Failure,
        }
    }
}

fn stream_key(app_name: &str, stream_name: &str) -> String {
    format!("{}/{}", app_name, stream_name)
}

fn lock(registry: &StreamRegistry) -> MutexGuard<'_, HashMap<String, PublishedStream>> {
    registry.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
