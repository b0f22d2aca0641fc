mod active_stream;
mod config;
mod errors;
mod events;
mod handler;
mod result;
mod session_state;


use std::collections::HashMap;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use log::{debug, trace, warn};
use streamkit_amf0::Amf0Value;

use self::active_stream::{ActiveStream, StreamState};
use self::session_state::SessionState;
use super::media::MediaStreamIndexes;
use crate::chunk_io::{ChunkEncoder, ChunkEvent, ChunkReassembler, Packet, PartialPayload};
use crate::handshake::{Handshake, HandshakeProcessResult, HandshakeState, PeerType};
use crate::messages::{MediaType, MessagePayload, PeerBandwidthLimitType, RtmpMessage, UserControlEventType};
use crate::sessions::{MediaPayload, ReceiveWindow, StreamMetadata};
use crate::time::RtmpTimestamp;

pub use self::config::ServerSessionConfig;
pub use self::errors::ServerSessionError;
pub use self::events::ServerSessionEvent;
pub use self::handler::{PolicyOutcome, ServerSessionHandler};
pub use self::result::ServerSessionResult;

/// A session that represents the server side of a single RTMP connection.
///
/// The `ServerSession` takes every byte the client sends, starting with the first handshake
/// byte, and returns the packets to send back along with events the application may react to.
/// Publish and play requests are decided by the `ServerSessionHandler`, which also receives the
/// media of any stream the client publishes.
///
/// The `ServerSession` does not care how bytes come in or get sent out, but leaves that up to the
/// application utilizing it.
///
/// Due to the header compression properties of the RTMP chunking protocol it is required that
/// all bytes are passed into the `ServerSession` in order, that all responses returned by the
/// `ServerSession` are sent to the client **in order**, and that no additional bytes are sent to
/// the client.  Any violation of these rules have a high probability of causing RTMP chunk parsing
/// errors by the peer or by the `ServerSession` instance itself.
pub struct ServerSession<H: ServerSessionHandler> {
    start_time: Instant,
    config: ServerSessionConfig,
    handler: H,
    handshake: Handshake,
    reassembler: ChunkReassembler,
    encoder: ChunkEncoder,
    receive_window: ReceiveWindow,
    current_state: SessionState,
    connected_app_name: Option<String>,
    object_encoding: f64,
    active_streams: HashMap<u32, ActiveStream>,
    next_stream_id: u32,
    metadata: Option<StreamMetadata>,
    media_indexes: MediaStreamIndexes,
}

impl<H: ServerSessionHandler> ServerSession<H> {
    pub fn new(config: ServerSessionConfig, handler: H) -> ServerSession<H> {
        let mut reassembler = ChunkReassembler::new();
        reassembler.set_deliver_media_fragments(config.deliver_media_fragments);

        ServerSession {
            start_time: Instant::now(),
            receive_window: ReceiveWindow::new(config.window_ack_size),
            config,
            handler,
            handshake: Handshake::new(PeerType::Server),
            reassembler,
            encoder: ChunkEncoder::new(),
            current_state: SessionState::Started,
            connected_app_name: None,
            object_encoding: 0.0,
            active_streams: HashMap::new(),
            next_stream_id: 1,
            metadata: None,
            media_indexes: MediaStreamIndexes::new(),
        }
    }

    /// Takes in bytes received from the client and returns any responses or events that can be
    /// reacted to.  Any error is fatal: the session refuses further input afterwards.
    pub fn handle_input(&mut self, bytes: &[u8]) -> Result<Vec<ServerSessionResult>, ServerSessionError> {
        if self.current_state == SessionState::Closed {
            return Err(ServerSessionError::SessionClosed);
        }

        let mut results = Vec::new();
        match self.process_input(bytes, &mut results) {
            Ok(()) => Ok(results),
            Err(ServerSessionError::PolicyRejected {
                outcome,
                stream_name,
                final_response,
            }) => {
                self.current_state = SessionState::Closed;
                Err(ServerSessionError::PolicyRejected {
                    outcome,
                    stream_name,
                    final_response: prepend_responses(results, final_response),
                })
            }

            Err(error) => {
                self.current_state = SessionState::Closed;
                Err(error)
            }
        }
    }

    pub fn handshake_state(&self) -> HandshakeState {
        self.handshake.state()
    }

    /// Metadata most recently published by the client
    pub fn metadata(&self) -> Option<&StreamMetadata> {
        self.metadata.as_ref()
    }

    pub fn app_name(&self) -> Option<&str> {
        self.connected_app_name.as_deref()
    }

    /// Name of the stream the client is currently publishing or playing
    pub fn stream_name(&self) -> Option<&str> {
        self.active_streams
            .values()
            .find_map(|stream| match stream.current_state {
                StreamState::Publishing { ref stream_name } => Some(stream_name.as_str()),
                StreamState::Playing { ref stream_name } => Some(stream_name.as_str()),
                StreamState::Created => None,
            })
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    /// Prepares metadata information to be sent to the client
    pub fn send_metadata(&mut self, stream_id: u32, metadata: &StreamMetadata) -> Result<Packet, ServerSessionError> {
        let message = RtmpMessage::Amf0Data {
            values: metadata.to_data_values(),
        };

        let payload = message.into_message_payload(self.get_epoch(), stream_id)?;
        let packet = self.encoder.serialize(&payload, false, false)?;
        Ok(packet)
    }

    /// Prepare video data to be sent to the client
    pub fn send_video_data(
        &mut self,
        stream_id: u32,
        data: Bytes,
        timestamp: RtmpTimestamp,
        can_be_dropped: bool,
    ) -> Result<Packet, ServerSessionError> {
        let message = RtmpMessage::VideoData { data };
        let payload = message.into_message_payload(timestamp, stream_id)?;
        let packet = self.encoder.serialize(&payload, false, can_be_dropped)?;
        Ok(packet)
    }

    /// Prepare audio data to be sent to the client
    pub fn send_audio_data(
        &mut self,
        stream_id: u32,
        data: Bytes,
        timestamp: RtmpTimestamp,
        can_be_dropped: bool,
    ) -> Result<Packet, ServerSessionError> {
        let message = RtmpMessage::AudioData { data };
        let payload = message.into_message_payload(timestamp, stream_id)?;
        let packet = self.encoder.serialize(&payload, false, can_be_dropped)?;
        Ok(packet)
    }

    pub fn send_stream_begin(&mut self, stream_id: u32) -> Result<Packet, ServerSessionError> {
        self.send_user_control_stream_event(UserControlEventType::StreamBegin, stream_id)
    }

    /// Tells the client that playback of the stream has ended
    pub fn send_stream_eof(&mut self, stream_id: u32) -> Result<Packet, ServerSessionError> {
        self.send_user_control_stream_event(UserControlEventType::StreamEof, stream_id)
    }

    fn send_user_control_stream_event(
        &mut self,
        event_type: UserControlEventType,
        stream_id: u32,
    ) -> Result<Packet, ServerSessionError> {
        let payload = stream_event_message(event_type, stream_id).into_message_payload(self.get_epoch(), 0)?;
        let packet = self.encoder.serialize(&payload, false, false)?;
        Ok(packet)
    }

    fn process_input(&mut self, bytes: &[u8], results: &mut Vec<ServerSessionResult>) -> Result<(), ServerSessionError> {
        if self.handshake.state() != HandshakeState::Done {
            match self.handshake.process_bytes(bytes)? {
                HandshakeProcessResult::InProgress { response_bytes } => {
                    push_raw_response(results, response_bytes);
                    return Ok(());
                }

                HandshakeProcessResult::Completed {
                    response_bytes,
                    remaining_bytes,
                } => {
                    push_raw_response(results, response_bytes);
                    results.push(ServerSessionResult::RaisedEvent(ServerSessionEvent::HandshakeCompleted));
                    self.process_chunks(&remaining_bytes, results)?;
                }
            }
        } else {
            self.process_chunks(bytes, results)?;
        }

        if let Some(sequence_number) = self.receive_window.take_acknowledgement() {
            trace!("Acknowledging {} received bytes", sequence_number);
            let message = RtmpMessage::Acknowledgement { sequence_number };
            let payload = message.into_message_payload(self.get_epoch(), 0)?;
            let packet = self.encoder.serialize(&payload, false, false)?;
            results.push(ServerSessionResult::OutboundResponse(packet));
        }

        Ok(())
    }

    fn process_chunks(&mut self, bytes: &[u8], results: &mut Vec<ServerSessionResult>) -> Result<(), ServerSessionError> {
        self.receive_window.record_received(bytes.len());

        let mut remaining = bytes;
        loop {
            let (event, consumed) = self.reassembler.input(remaining)?;
            remaining = &remaining[consumed..];

            match event {
                None => break,
                Some(ChunkEvent::MediaFragment(fragment)) => self.handle_media_fragment(&fragment),
                Some(ChunkEvent::Message(payload)) => self.handle_message(payload, results)?,
            }
        }

        Ok(())
    }

    fn handle_message(&mut self, payload: MessagePayload, results: &mut Vec<ServerSessionResult>) -> Result<(), ServerSessionError> {
        let message = payload.to_rtmp_message()?;
        let stream_id = payload.message_stream_id;

        match message {
            RtmpMessage::Abort { stream_id } => self.reassembler.abort(stream_id),

            RtmpMessage::Acknowledgement { sequence_number } => {
                let event = ServerSessionEvent::AcknowledgementReceived {
                    bytes_received: sequence_number,
                };

                results.push(ServerSessionResult::RaisedEvent(event));
            }

            RtmpMessage::Amf0Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            } => self.handle_amf0_command(
                stream_id,
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
                results,
            )?,

            RtmpMessage::Amf0Data { values } => self.handle_amf0_data(values, stream_id, results),

            RtmpMessage::AudioData { data } => {
                self.handle_media(MediaType::Audio, &data, stream_id, payload.timestamp)
            }

            RtmpMessage::VideoData { data } => {
                self.handle_media(MediaType::Video, &data, stream_id, payload.timestamp)
            }

            RtmpMessage::SetChunkSize { size } => {
                debug!("Client chunk size changing to {}", size);
                self.reassembler.set_max_chunk_size(size as usize)?;

                let event = ServerSessionEvent::ClientChunkSizeChanged { new_chunk_size: size };
                results.push(ServerSessionResult::RaisedEvent(event));
            }

            RtmpMessage::SetPeerBandwidth { size, .. } => {
                let message = RtmpMessage::WindowAcknowledgement { size };
                let packet = self.serialize_message(message, 0)?;
                results.push(ServerSessionResult::OutboundResponse(packet));
            }

            RtmpMessage::UserControl {
                event_type,
                timestamp,
                ..
            } => self.handle_user_control(event_type, timestamp, results)?,

            RtmpMessage::WindowAcknowledgement { size } => {
                debug!("Client acknowledgement window set to {}", size);
                self.receive_window.set_window_size(size);
            }

            RtmpMessage::Unknown { .. } => {
                results.push(ServerSessionResult::UnhandleableMessageReceived(payload));
            }
        }

        Ok(())
    }

    fn handle_user_control(
        &mut self,
        event_type: UserControlEventType,
        timestamp: Option<RtmpTimestamp>,
        results: &mut Vec<ServerSessionResult>,
    ) -> Result<(), ServerSessionError> {
        match event_type {
            UserControlEventType::PingRequest => {
                let message = RtmpMessage::UserControl {
                    event_type: UserControlEventType::PingResponse,
                    stream_id: None,
                    buffer_length: None,
                    timestamp,
                };

                let packet = self.serialize_message(message, 0)?;
                results.push(ServerSessionResult::OutboundResponse(packet));
            }

            UserControlEventType::PingResponse => {
                let event = ServerSessionEvent::PingResponseReceived {
                    timestamp: timestamp.unwrap_or_default(),
                };

                results.push(ServerSessionResult::RaisedEvent(event));
            }

            other => debug!("Ignoring user control event {:?}", other),
        }

        Ok(())
    }

    fn handle_amf0_command(
        &mut self,
        stream_id: u32,
        name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_args: Vec<Amf0Value>,
        results: &mut Vec<ServerSessionResult>,
    ) -> Result<(), ServerSessionError> {
        match name.as_str() {
            "connect" => self.handle_command_connect(transaction_id, command_object, results),
            "createStream" => self.handle_command_create_stream(transaction_id, results),
            "publish" => self.handle_command_publish(stream_id, transaction_id, additional_args, results),
            "play" => self.handle_command_play(stream_id, transaction_id, additional_args, results),
            "closeStream" => {
                self.handle_command_end_stream(stream_id, additional_args, false, results);
                Ok(())
            }

            "deleteStream" => {
                self.handle_command_end_stream(stream_id, additional_args, true, results);
                Ok(())
            }

            "releaseStream" | "FCPublish" | "FCUnpublish" => {
                debug!("Ignoring '{}' command", name);
                Ok(())
            }

            "_result" => {
                let event = ServerSessionEvent::CommandResultReceived {
                    transaction_id,
                    command_object,
                    additional_values: additional_args,
                };

                results.push(ServerSessionResult::RaisedEvent(event));
                Ok(())
            }

            "_error" => {
                let event = ServerSessionEvent::CommandErrorReceived {
                    transaction_id,
                    command_object,
                    additional_values: additional_args,
                };

                results.push(ServerSessionResult::RaisedEvent(event));
                Ok(())
            }

            _ => {
                let event = ServerSessionEvent::UnhandleableAmf0Command {
                    command_name: name,
                    additional_values: additional_args,
                    transaction_id,
                    command_object,
                };

                results.push(ServerSessionResult::RaisedEvent(event));
                Ok(())
            }
        }
    }

    fn handle_command_connect(
        &mut self,
        transaction_id: f64,
        command_object: Amf0Value,
        results: &mut Vec<ServerSessionResult>,
    ) -> Result<(), ServerSessionError> {
        let mut properties = command_object
            .into_properties()
            .ok_or(ServerSessionError::NoAppNameForConnectionRequest)?;

        let mut app_name = properties
            .remove("app")
            .and_then(Amf0Value::into_string)
            .ok_or(ServerSessionError::NoAppNameForConnectionRequest)?;

        if app_name.ends_with('/') {
            app_name.pop();
        }

        if app_name.is_empty() {
            return Err(ServerSessionError::NoAppNameForConnectionRequest);
        }

        self.object_encoding = properties
            .get("objectEncoding")
            .and_then(Amf0Value::as_number)
            .unwrap_or(0.0);

        self.connected_app_name = Some(app_name.clone());
        self.current_state = SessionState::Connected;

        let mut command_object_properties = HashMap::new();
        command_object_properties.insert("fmsVer".to_string(), Amf0Value::Utf8String(self.config.fms_version.clone()));
        command_object_properties.insert("capabilities".to_string(), Amf0Value::Number(31.0));
        command_object_properties.insert("mode".to_string(), Amf0Value::Number(1.0));

        let description = "Successfully connected on app: ".to_string() + &app_name;
        let mut additional_properties = create_status_object("status", "NetConnection.Connect.Success", &description);
        additional_properties.insert("objectEncoding".to_string(), Amf0Value::Number(self.object_encoding));

        let epoch = self.get_epoch();
        let messages = [
            RtmpMessage::WindowAcknowledgement {
                size: self.config.window_ack_size,
            },
            RtmpMessage::SetPeerBandwidth {
                size: self.config.peer_bandwidth,
                limit_type: PeerBandwidthLimitType::Dynamic,
            },
            stream_event_message(UserControlEventType::StreamBegin, 0),
            RtmpMessage::Amf0Command {
                command_name: "_result".to_string(),
                transaction_id,
                command_object: Amf0Value::Object(command_object_properties),
                additional_arguments: vec![Amf0Value::Object(additional_properties)],
            },
        ];

        let mut bytes = BytesMut::new();
        for message in messages.iter().cloned() {
            let payload = message.into_message_payload(epoch, 0)?;
            self.encoder.serialize_into(&payload, false, &mut bytes)?;
        }

        let chunk_size_packet = self.encoder.set_max_chunk_size(self.config.chunk_size, epoch)?;
        bytes.extend_from_slice(&chunk_size_packet.bytes);

        results.push(ServerSessionResult::OutboundResponse(Packet {
            bytes: bytes.freeze(),
            can_be_dropped: false,
        }));

        results.push(ServerSessionResult::RaisedEvent(ServerSessionEvent::ConnectionAccepted { app_name }));
        Ok(())
    }

    fn handle_command_create_stream(
        &mut self,
        transaction_id: f64,
        results: &mut Vec<ServerSessionResult>,
    ) -> Result<(), ServerSessionError> {
        let new_stream_id = self.next_stream_id;
        self.next_stream_id += 1;
        self.active_streams.insert(new_stream_id, ActiveStream::new());

        let packet = self.create_command_response(
            "_result",
            transaction_id,
            vec![Amf0Value::Number(new_stream_id as f64)],
            0,
        )?;

        results.push(ServerSessionResult::OutboundResponse(packet));
        Ok(())
    }

    fn handle_command_end_stream(
        &mut self,
        message_stream_id: u32,
        arguments: Vec<Amf0Value>,
        delete: bool,
        results: &mut Vec<ServerSessionResult>,
    ) {
        let app_name = match self.connected_app_name {
            Some(ref name) => name.clone(),
            None => return,
        };

        // deleteStream names the stream in its arguments, closeStream is sent on the stream itself
        let stream_id = arguments
            .first()
            .and_then(Amf0Value::as_number)
            .map(|x| x as u32)
            .unwrap_or(message_stream_id);

        let previous_state = if delete {
            self.active_streams.remove(&stream_id).map(|stream| stream.current_state)
        } else {
            self.active_streams
                .get_mut(&stream_id)
                .map(|stream| std::mem::replace(&mut stream.current_state, StreamState::Created))
        };

        let event = match previous_state {
            Some(StreamState::Publishing { stream_name }) => {
                ServerSessionEvent::PublishStreamFinished { app_name, stream_name }
            }

            Some(StreamState::Playing { stream_name }) => {
                ServerSessionEvent::PlayStreamFinished { app_name, stream_name }
            }

            _ => return,
        };

        results.push(ServerSessionResult::RaisedEvent(event));
    }

    fn handle_command_publish(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
        arguments: Vec<Amf0Value>,
        results: &mut Vec<ServerSessionResult>,
    ) -> Result<(), ServerSessionError> {
        let app_name = match (self.current_state, self.connected_app_name.clone()) {
            (SessionState::Connected, Some(app_name)) => app_name,
            _ => {
                let packet = self.create_error_packet("NetStream.Publish.Start", "Can't publish before connecting", transaction_id, stream_id)?;
                results.push(ServerSessionResult::OutboundResponse(packet));
                return Ok(());
            }
        };

        let stream_name = match arguments.into_iter().next().and_then(Amf0Value::into_string) {
            Some(name) if !name.is_empty() => name,
            _ => {
                let packet = self.create_error_packet("NetStream.Publish.Start", "Invalid publish arguments", transaction_id, stream_id)?;
                results.push(ServerSessionResult::OutboundResponse(packet));
                return Ok(());
            }
        };

        if !self.active_streams.contains_key(&stream_id) {
            let packet = self.create_error_packet("NetStream.Publish.Start", "Publish requested on a stream that was not created", transaction_id, stream_id)?;
            results.push(ServerSessionResult::OutboundResponse(packet));
            return Ok(());
        }

        let outcome = self.handler.on_publish(&app_name, &stream_name);
        debug!("Publish request for {}/{} resulted in {:?}", app_name, stream_name, outcome);

        if outcome != PolicyOutcome::Accepted {
            let (code, description) = match outcome {
                PolicyOutcome::Occupied => ("NetStream.Publish.BadName", "Already publishing"),
                _ => ("NetStream.Publish.Failed", "Publishing was refused"),
            };

            let final_response = self.create_status_packet("error", code, description, stream_id)?;
            return Err(ServerSessionError::PolicyRejected {
                outcome,
                stream_name,
                final_response,
            });
        }

        if let Some(stream) = self.active_streams.get_mut(&stream_id) {
            stream.current_state = StreamState::Publishing {
                stream_name: stream_name.clone(),
            };
        }

        let description = format!("Successfully started publishing on stream {}", stream_name);
        let epoch = self.get_epoch();
        let mut bytes = BytesMut::new();

        let begin_payload = stream_event_message(UserControlEventType::StreamBegin, stream_id).into_message_payload(epoch, 0)?;
        self.encoder.serialize_into(&begin_payload, false, &mut bytes)?;

        let status_payload = status_message("status", "NetStream.Publish.Start", &description).into_message_payload(epoch, stream_id)?;
        self.encoder.serialize_into(&status_payload, false, &mut bytes)?;

        results.push(ServerSessionResult::OutboundResponse(Packet {
            bytes: bytes.freeze(),
            can_be_dropped: false,
        }));

        let event = ServerSessionEvent::PublishStreamStarted {
            app_name,
            stream_name,
            stream_id,
        };

        results.push(ServerSessionResult::RaisedEvent(event));
        Ok(())
    }

    fn handle_command_play(
        &mut self,
        stream_id: u32,
        transaction_id: f64,
        arguments: Vec<Amf0Value>,
        results: &mut Vec<ServerSessionResult>,
    ) -> Result<(), ServerSessionError> {
        let app_name = match (self.current_state, self.connected_app_name.clone()) {
            (SessionState::Connected, Some(app_name)) => app_name,
            _ => {
                let packet = self.create_error_packet("NetStream.Play.Start", "Can't play before connecting", transaction_id, stream_id)?;
                results.push(ServerSessionResult::OutboundResponse(packet));
                return Ok(());
            }
        };

        let stream_name = match arguments.into_iter().next().and_then(Amf0Value::into_string) {
            Some(name) if !name.is_empty() => name,
            _ => {
                let packet = self.create_error_packet("NetStream.Play.Start", "Invalid play arguments", transaction_id, stream_id)?;
                results.push(ServerSessionResult::OutboundResponse(packet));
                return Ok(());
            }
        };

        if !self.active_streams.contains_key(&stream_id) {
            let packet = self.create_error_packet("NetStream.Play.Start", "Play requested on a stream that was not created", transaction_id, stream_id)?;
            results.push(ServerSessionResult::OutboundResponse(packet));
            return Ok(());
        }

        let outcome = self.handler.on_play(&app_name, &stream_name);
        debug!("Play request for {}/{} resulted in {:?}", app_name, stream_name, outcome);

        if outcome != PolicyOutcome::Accepted {
            let (code, description) = match outcome {
                PolicyOutcome::Occupied => ("NetStream.Play.Failed", "Stream is not available for playback"),
                _ => ("NetStream.Play.StreamNotFound", "Stream not found"),
            };

            let final_response = self.create_status_packet("error", code, description, stream_id)?;
            return Err(ServerSessionError::PolicyRejected {
                outcome,
                stream_name,
                final_response,
            });
        }

        if let Some(stream) = self.active_streams.get_mut(&stream_id) {
            stream.current_state = StreamState::Playing {
                stream_name: stream_name.clone(),
            };
        }

        let mut data_start_properties = HashMap::new();
        data_start_properties.insert("code".to_string(), Amf0Value::Utf8String("NetStream.Data.Start".to_string()));

        let description = format!("Successfully started playback on stream {}", stream_name);
        let messages = [
            (stream_event_message(UserControlEventType::StreamBegin, stream_id), 0),
            (status_message("status", "NetStream.Play.Reset", "Reset stream"), stream_id),
            (status_message("status", "NetStream.Play.Start", &description), stream_id),
            (
                RtmpMessage::Amf0Data {
                    values: vec![
                        Amf0Value::Utf8String("|RtmpSampleAccess".to_string()),
                        Amf0Value::Boolean(false),
                        Amf0Value::Boolean(false),
                    ],
                },
                stream_id,
            ),
            (
                RtmpMessage::Amf0Data {
                    values: vec![
                        Amf0Value::Utf8String("onStatus".to_string()),
                        Amf0Value::Object(data_start_properties),
                    ],
                },
                stream_id,
            ),
        ];

        let epoch = self.get_epoch();
        let mut bytes = BytesMut::new();
        for (message, message_stream_id) in messages.iter().cloned() {
            let payload = message.into_message_payload(epoch, message_stream_id)?;
            self.encoder.serialize_into(&payload, false, &mut bytes)?;
        }

        results.push(ServerSessionResult::OutboundResponse(Packet {
            bytes: bytes.freeze(),
            can_be_dropped: false,
        }));

        let event = ServerSessionEvent::PlayStreamStarted {
            app_name,
            stream_name,
            stream_id,
        };

        results.push(ServerSessionResult::RaisedEvent(event));
        Ok(())
    }

    fn handle_amf0_data(&mut self, values: Vec<Amf0Value>, stream_id: u32, results: &mut Vec<ServerSessionResult>) {
        let stream_name = match self.active_streams.get(&stream_id).map(|stream| &stream.current_state) {
            Some(StreamState::Publishing { stream_name }) => stream_name.clone(),
            _ => {
                debug!("Ignoring data message on stream {} which is not publishing", stream_id);
                return;
            }
        };

        let metadata = match StreamMetadata::from_data_values(values) {
            Some(metadata) => metadata,
            None => return,
        };

        self.metadata = Some(metadata.clone());
        let event = ServerSessionEvent::StreamMetadataChanged {
            app_name: self.connected_app_name.clone().unwrap_or_default(),
            stream_name,
            metadata,
        };

        results.push(ServerSessionResult::RaisedEvent(event));
    }

    fn handle_media(&mut self, media_type: MediaType, data: &[u8], stream_id: u32, timestamp: RtmpTimestamp) {
        if !self.is_publishing_on(stream_id) {
            warn!("Received {:?} data on stream {} which is not publishing, dropping it", media_type, stream_id);
            return;
        }

        let stream_index = self.media_indexes.index_for(media_type);
        self.handler.on_media(MediaPayload::complete(stream_index, media_type, data, timestamp));
    }

    fn handle_media_fragment(&mut self, fragment: &PartialPayload<'_>) {
        if !self.is_publishing_on(fragment.message_stream_id) {
            if fragment.is_first {
                warn!(
                    "Received {:?} data on stream {} which is not publishing, dropping it",
                    fragment.media_type, fragment.message_stream_id
                );
            }

            return;
        }

        let stream_index = self.media_indexes.index_for(fragment.media_type);
        self.handler.on_media(MediaPayload::from_fragment(stream_index, fragment));
    }

    fn is_publishing_on(&self, stream_id: u32) -> bool {
        self.current_state == SessionState::Connected
            && self
                .active_streams
                .get(&stream_id)
                .map_or(false, ActiveStream::is_publishing)
    }

    fn serialize_message(&mut self, message: RtmpMessage, stream_id: u32) -> Result<Packet, ServerSessionError> {
        let payload = message.into_message_payload(self.get_epoch(), stream_id)?;
        let packet = self.encoder.serialize(&payload, false, false)?;
        Ok(packet)
    }

    fn create_command_response(
        &mut self,
        command_name: &str,
        transaction_id: f64,
        additional_arguments: Vec<Amf0Value>,
        stream_id: u32,
    ) -> Result<Packet, ServerSessionError> {
        let message = RtmpMessage::Amf0Command {
            command_name: command_name.to_string(),
            transaction_id,
            command_object: Amf0Value::Null,
            additional_arguments,
        };

        self.serialize_message(message, stream_id)
    }

    fn create_error_packet(&mut self, code: &str, description: &str, transaction_id: f64, stream_id: u32) -> Result<Packet, ServerSessionError> {
        let status_object = create_status_object("error", code, description);
        self.create_command_response("_error", transaction_id, vec![Amf0Value::Object(status_object)], stream_id)
    }

    fn create_status_packet(&mut self, level: &str, code: &str, description: &str, stream_id: u32) -> Result<Packet, ServerSessionError> {
        self.serialize_message(status_message(level, code, description), stream_id)
    }

    fn get_epoch(&self) -> RtmpTimestamp {
        // Wraps after ~49 days, same as the peer's timestamps
        RtmpTimestamp::new(self.start_time.elapsed().as_millis() as u32)
    }
}

// Responses already encoded for the rejected input go out ahead of the rejection
fn prepend_responses(results: Vec<ServerSessionResult>, final_response: Packet) -> Packet {
    let mut bytes = BytesMut::new();
    for result in results {
        if let ServerSessionResult::OutboundResponse(packet) = result {
            bytes.extend_from_slice(&packet.bytes);
        }
    }

    bytes.extend_from_slice(&final_response.bytes);
    Packet {
        bytes: bytes.freeze(),
        can_be_dropped: false,
    }
}

fn push_raw_response(results: &mut Vec<ServerSessionResult>, bytes: Vec<u8>) {
    if !bytes.is_empty() {
        results.push(ServerSessionResult::OutboundResponse(Packet {
            bytes: Bytes::from(bytes),
            can_be_dropped: false,
        }));
    }
}

fn stream_event_message(event_type: UserControlEventType, stream_id: u32) -> RtmpMessage {
    RtmpMessage::UserControl {
        event_type,
        stream_id: Some(stream_id),
        buffer_length: None,
        timestamp: None,
    }
}

fn status_message(level: &str, code: &str, description: &str) -> RtmpMessage {
    RtmpMessage::Amf0Command {
        command_name: "onStatus".to_string(),
        transaction_id: 0.0,
        command_object: Amf0Value::Null,
        additional_arguments: vec![Amf0Value::Object(create_status_object(level, code, description))],
    }
}

fn create_status_object(level: &str, code: &str, description: &str) -> HashMap<String, Amf0Value> {
    let mut properties = HashMap::new();
    properties.insert("level".to_string(), Amf0Value::Utf8String(level.to_string()));
    properties.insert("code".to_string(), Amf0Value::Utf8String(code.to_string()));
    properties.insert("description".to_string(), Amf0Value::Utf8String(description.to_string()));
    properties
}
