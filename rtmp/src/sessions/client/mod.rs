mod config;
mod errors;
mod events;
mod result;
mod rtmp_url;
mod state;


use std::collections::HashMap;
use std::time::Instant;

use bytes::{Bytes, BytesMut};
use log::{debug, warn};
use streamkit_amf0::Amf0Value;

use super::media::MediaStreamIndexes;
use crate::chunk_io::{ChunkEncoder, ChunkEvent, ChunkReassembler, Packet, PartialPayload};
use crate::handshake::{Handshake, HandshakeProcessResult, HandshakeState, PeerType};
use crate::messages::{MediaType, MessagePayload, RtmpMessage, UserControlEventType};
use crate::sessions::{MediaHandler, MediaPayload, ReceiveWindow, StreamMetadata};
use crate::time::RtmpTimestamp;

pub use self::config::ClientSessionConfig;
pub use self::errors::ClientSessionError;
pub use self::events::ClientSessionEvent;
pub use self::result::ClientSessionResult;
pub use self::rtmp_url::{RtmpUrl, RtmpUrlError};
pub use self::state::ClientState;

const CONNECT_TRANSACTION_ID: f64 = 1.0;
const CREATE_STREAM_TRANSACTION_ID: f64 = 2.0;
const PLAY_TRANSACTION_ID: f64 = 0.0;

/// A session that pulls a single stream from an RTMP server.
///
/// Once `start()` has produced the opening handshake bytes, the session drives the whole
/// `connect`, `createStream` and `play` sequence by itself from the server's responses.  Audio and
/// video sent by the server are handed to the `MediaHandler`.
///
/// Like the server session, it does no I/O.  Every packet it returns must be sent to the server in
/// order.
pub struct ClientSession<H: MediaHandler> {
    start_time: Instant,
    config: ClientSessionConfig,
    url: RtmpUrl,
    handler: H,
    handshake: Handshake,
    reassembler: ChunkReassembler,
    encoder: ChunkEncoder,
    receive_window: ReceiveWindow,
    current_state: ClientState,
    metadata: Option<StreamMetadata>,
    media_indexes: MediaStreamIndexes,
}

impl<H: MediaHandler> ClientSession<H> {
    pub fn new(config: ClientSessionConfig, url: RtmpUrl, handler: H) -> ClientSession<H> {
        let mut reassembler = ChunkReassembler::new();
        reassembler.set_deliver_media_fragments(config.deliver_media_fragments);

        ClientSession {
            start_time: Instant::now(),
            receive_window: ReceiveWindow::new(config.window_ack_size),
            config,
            url,
            handler,
            handshake: Handshake::new(PeerType::Client),
            reassembler,
            encoder: ChunkEncoder::new(),
            current_state: ClientState::Handshaking,
            metadata: None,
            media_indexes: MediaStreamIndexes::new(),
        }
    }

    /// Creates the bytes that open the handshake.  These must be the first bytes sent to the
    /// server.
    pub fn start(&mut self) -> Result<Packet, ClientSessionError> {
        let bytes = match self.handshake.generate_outbound_p0_and_p1()? {
            HandshakeProcessResult::InProgress { response_bytes } => response_bytes,
            HandshakeProcessResult::Completed { response_bytes, .. } => response_bytes,
        };

        Ok(Packet {
            bytes: Bytes::from(bytes),
            can_be_dropped: false,
        })
    }

    /// Takes in bytes received from the server and returns any responses or events that can be
    /// reacted to.  Any error is fatal: the session refuses further input afterwards.
    pub fn handle_input(&mut self, bytes: &[u8]) -> Result<Vec<ClientSessionResult>, ClientSessionError> {
        if self.current_state == ClientState::Closed {
            return Err(ClientSessionError::SessionClosed);
        }

        let mut results = Vec::new();
        let outcome = self.process_input(bytes, &mut results);
        if outcome.is_err() {
            self.current_state = ClientState::Closed;
        }

        outcome.map(|_| results)
    }

    pub fn state(&self) -> ClientState {
        self.current_state
    }

    pub fn url(&self) -> &RtmpUrl {
        &self.url
    }

    /// Metadata most recently sent by the server for the stream being played
    pub fn metadata(&self) -> Option<&StreamMetadata> {
        self.metadata.as_ref()
    }

    pub fn handler(&self) -> &H {
        &self.handler
    }

    pub fn handler_mut(&mut self) -> &mut H {
        &mut self.handler
    }

    fn process_input(&mut self, bytes: &[u8], results: &mut Vec<ClientSessionResult>) -> Result<(), ClientSessionError> {
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
                    results.push(ClientSessionResult::RaisedEvent(ClientSessionEvent::HandshakeCompleted));

                    let packet = self.create_connect_request()?;
                    results.push(ClientSessionResult::OutboundResponse(packet));
                    self.current_state = ClientState::Connecting;

                    self.process_chunks(&remaining_bytes, results)?;
                }
            }
        } else {
            self.process_chunks(bytes, results)?;
        }

        if let Some(sequence_number) = self.receive_window.take_acknowledgement() {
            let packet = self.serialize_message(RtmpMessage::Acknowledgement { sequence_number }, 0)?;
            results.push(ClientSessionResult::OutboundResponse(packet));
        }

        Ok(())
    }

    fn process_chunks(&mut self, bytes: &[u8], results: &mut Vec<ClientSessionResult>) -> Result<(), ClientSessionError> {
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

    fn handle_message(&mut self, payload: MessagePayload, results: &mut Vec<ClientSessionResult>) -> Result<(), ClientSessionError> {
        let message = payload.to_rtmp_message()?;

        match message {
            RtmpMessage::Abort { stream_id } => self.reassembler.abort(stream_id),

            RtmpMessage::Acknowledgement { sequence_number } => {
                let event = ClientSessionEvent::AcknowledgementReceived {
                    bytes_received: sequence_number,
                };

                results.push(ClientSessionResult::RaisedEvent(event));
            }

            RtmpMessage::Amf0Command {
                command_name,
                transaction_id,
                command_object,
                additional_arguments,
            } => self.handle_amf0_command(command_name, transaction_id, command_object, additional_arguments, results)?,

            RtmpMessage::Amf0Data { values } => self.handle_amf0_data(values, results),

            RtmpMessage::AudioData { data } => {
                self.handle_media(MediaType::Audio, &data, payload.message_stream_id, payload.timestamp)
            }

            RtmpMessage::VideoData { data } => {
                self.handle_media(MediaType::Video, &data, payload.message_stream_id, payload.timestamp)
            }

            RtmpMessage::SetChunkSize { size } => {
                debug!("Server chunk size changing to {}", size);
                self.reassembler.set_max_chunk_size(size as usize)?;

                let event = ClientSessionEvent::ServerChunkSizeChanged { new_chunk_size: size };
                results.push(ClientSessionResult::RaisedEvent(event));
            }

            RtmpMessage::SetPeerBandwidth { size, .. } => {
                let packet = self.serialize_message(RtmpMessage::WindowAcknowledgement { size }, 0)?;
                results.push(ClientSessionResult::OutboundResponse(packet));
            }

            RtmpMessage::UserControl {
                event_type,
                stream_id,
                timestamp,
                ..
            } => self.handle_user_control(event_type, stream_id, timestamp, results)?,

            RtmpMessage::WindowAcknowledgement { size } => {
                debug!("Server acknowledgement window set to {}", size);
                self.receive_window.set_window_size(size);
            }

            RtmpMessage::Unknown { .. } => {
                results.push(ClientSessionResult::UnhandleableMessageReceived(payload));
            }
        }

        Ok(())
    }

    fn handle_user_control(
        &mut self,
        event_type: UserControlEventType,
        stream_id: Option<u32>,
        timestamp: Option<RtmpTimestamp>,
        results: &mut Vec<ClientSessionResult>,
    ) -> Result<(), ClientSessionError> {
        match event_type {
            UserControlEventType::PingRequest => {
                let message = RtmpMessage::UserControl {
                    event_type: UserControlEventType::PingResponse,
                    stream_id: None,
                    buffer_length: None,
                    timestamp,
                };

                let packet = self.serialize_message(message, 0)?;
                results.push(ClientSessionResult::OutboundResponse(packet));
            }

            UserControlEventType::PingResponse => {
                let event = ClientSessionEvent::PingResponseReceived {
                    timestamp: timestamp.unwrap_or_default(),
                };

                results.push(ClientSessionResult::RaisedEvent(event));
            }

            UserControlEventType::StreamEof => {
                let stream_id = stream_id.unwrap_or_default();
                if self.current_state.stream_id() == Some(stream_id) {
                    let event = ClientSessionEvent::PlaybackFinished { stream_id };
                    results.push(ClientSessionResult::RaisedEvent(event));
                }
            }

            other => debug!("Ignoring user control event {:?}", other),
        }

        Ok(())
    }

    fn handle_amf0_command(
        &mut self,
        name: String,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_args: Vec<Amf0Value>,
        results: &mut Vec<ClientSessionResult>,
    ) -> Result<(), ClientSessionError> {
        match name.as_str() {
            "_result" => self.handle_result(transaction_id, command_object, additional_args, results),
            "_error" => self.handle_error(transaction_id, command_object, additional_args, results),
            "onStatus" => {
                self.handle_on_status(additional_args, results);
                Ok(())
            }

            "onBWDone" => {
                debug!("Ignoring onBWDone");
                Ok(())
            }

            _ => {
                let event = ClientSessionEvent::UnhandleableAmf0Command {
                    command_name: name,
                    transaction_id,
                    command_object,
                    additional_values: additional_args,
                };

                results.push(ClientSessionResult::RaisedEvent(event));
                Ok(())
            }
        }
    }

    fn handle_result(
        &mut self,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_args: Vec<Amf0Value>,
        results: &mut Vec<ClientSessionResult>,
    ) -> Result<(), ClientSessionError> {
        match (self.current_state, transaction_id) {
            (ClientState::Connecting, id) if id == CONNECT_TRANSACTION_ID => {
                results.push(ClientSessionResult::RaisedEvent(ClientSessionEvent::ConnectionRequestAccepted));

                let message = command_message("createStream", CREATE_STREAM_TRANSACTION_ID, Vec::new());
                let packet = self.serialize_message(message, 0)?;
                results.push(ClientSessionResult::OutboundResponse(packet));
                self.current_state = ClientState::CreatingStream;
            }

            (ClientState::CreatingStream, id) if id == CREATE_STREAM_TRANSACTION_ID => {
                let stream_id = additional_args
                    .iter()
                    .find_map(Amf0Value::as_number)
                    .ok_or(ClientSessionError::CreateStreamResponseHadNoStreamNumber)?
                    as u32;

                results.push(ClientSessionResult::RaisedEvent(ClientSessionEvent::StreamCreated { stream_id }));

                let packet = self.create_play_request(stream_id)?;
                results.push(ClientSessionResult::OutboundResponse(packet));
                self.current_state = ClientState::PlayRequested { stream_id };
            }

            _ => {
                let event = ClientSessionEvent::UnknownTransactionResultReceived {
                    transaction_id,
                    command_object,
                    additional_values: additional_args,
                };

                results.push(ClientSessionResult::RaisedEvent(event));
            }
        }

        Ok(())
    }

    fn handle_error(
        &mut self,
        transaction_id: f64,
        command_object: Amf0Value,
        additional_args: Vec<Amf0Value>,
        results: &mut Vec<ClientSessionResult>,
    ) -> Result<(), ClientSessionError> {
        let command = match (self.current_state, transaction_id) {
            (ClientState::Connecting, id) if id == CONNECT_TRANSACTION_ID => "connect",
            (ClientState::CreatingStream, id) if id == CREATE_STREAM_TRANSACTION_ID => "createStream",
            _ => {
                let event = ClientSessionEvent::UnhandleableAmf0Command {
                    command_name: "_error".to_string(),
                    transaction_id,
                    command_object,
                    additional_values: additional_args,
                };

                results.push(ClientSessionResult::RaisedEvent(event));
                return Ok(());
            }
        };

        let status = additional_args.first().and_then(Amf0Value::as_properties);
        let read = |key: &str| {
            status
                .and_then(|properties| properties.get(key))
                .and_then(Amf0Value::as_str)
                .map(str::to_string)
        };

        Err(ClientSessionError::RequestRejected {
            command: command.to_string(),
            code: read("code"),
            description: read("description"),
        })
    }

    fn handle_on_status(&mut self, additional_args: Vec<Amf0Value>, results: &mut Vec<ClientSessionResult>) {
        let mut properties = match additional_args.into_iter().find_map(Amf0Value::into_properties) {
            Some(properties) => properties,
            None => {
                warn!("Received onStatus without a status object");
                return;
            }
        };

        let mut take = |key: &str| properties.remove(key).and_then(Amf0Value::into_string);
        let level = take("level").unwrap_or_default();
        let code = take("code").unwrap_or_default();
        let description = take("description");

        if code == "NetStream.Play.Start" {
            if let ClientState::PlayRequested { stream_id } = self.current_state {
                self.current_state = ClientState::Playing { stream_id };

                let event = ClientSessionEvent::PlaybackStarted {
                    stream_name: self.url.stream_name.clone(),
                    stream_id,
                };

                results.push(ClientSessionResult::RaisedEvent(event));
            }
        }

        results.push(ClientSessionResult::RaisedEvent(ClientSessionEvent::StatusReceived {
            level,
            code,
            description,
        }));
    }

    fn handle_amf0_data(&mut self, values: Vec<Amf0Value>, results: &mut Vec<ClientSessionResult>) {
        match StreamMetadata::from_data_values(values) {
            Some(metadata) => {
                self.metadata = Some(metadata.clone());
                let event = ClientSessionEvent::StreamMetadataReceived { metadata };
                results.push(ClientSessionResult::RaisedEvent(event));
            }

            None => debug!("Ignoring data message that is not metadata"),
        }
    }

    fn handle_media(&mut self, media_type: MediaType, data: &[u8], stream_id: u32, timestamp: RtmpTimestamp) {
        if !self.is_receiving_on(stream_id) {
            warn!("Received {:?} data on stream {} which is not being played, dropping it", media_type, stream_id);
            return;
        }

        let stream_index = self.media_indexes.index_for(media_type);
        self.handler.on_media(MediaPayload::complete(stream_index, media_type, data, timestamp));
    }

    fn handle_media_fragment(&mut self, fragment: &PartialPayload<'_>) {
        if !self.is_receiving_on(fragment.message_stream_id) {
            if fragment.is_first {
                warn!(
                    "Received {:?} data on stream {} which is not being played, dropping it",
                    fragment.media_type, fragment.message_stream_id
                );
            }

            return;
        }

        let stream_index = self.media_indexes.index_for(fragment.media_type);
        self.handler.on_media(MediaPayload::from_fragment(stream_index, fragment));
    }

    // Some servers start sending media before confirming playback
    fn is_receiving_on(&self, stream_id: u32) -> bool {
        self.current_state.stream_id() == Some(stream_id)
    }

    fn create_connect_request(&mut self) -> Result<Packet, ClientSessionError> {
        let mut properties = HashMap::new();
        properties.insert("app".to_string(), Amf0Value::Utf8String(self.url.app.clone()));
        properties.insert("flashVer".to_string(), Amf0Value::Utf8String(self.config.flash_version.clone()));
        properties.insert("tcUrl".to_string(), Amf0Value::Utf8String(self.url.tc_url()));
        properties.insert("fpad".to_string(), Amf0Value::Boolean(false));
        properties.insert("capabilities".to_string(), Amf0Value::Number(15.0));
        properties.insert("audioCodecs".to_string(), Amf0Value::Number(f64::from(0x0FFF)));
        properties.insert("videoCodecs".to_string(), Amf0Value::Number(f64::from(0x00FF)));
        properties.insert("videoFunction".to_string(), Amf0Value::Number(1.0));

        let message = RtmpMessage::Amf0Command {
            command_name: "connect".to_string(),
            transaction_id: CONNECT_TRANSACTION_ID,
            command_object: Amf0Value::Object(properties),
            additional_arguments: Vec::new(),
        };

        self.serialize_message(message, 0)
    }

    fn create_play_request(&mut self, stream_id: u32) -> Result<Packet, ClientSessionError> {
        let arguments = vec![
            Amf0Value::Utf8String(self.url.stream_name.clone()),
            Amf0Value::Number(-2.0),
            Amf0Value::Number(-1.0),
            Amf0Value::Boolean(true),
        ];

        let buffer_length = RtmpMessage::UserControl {
            event_type: UserControlEventType::SetBufferLength,
            stream_id: Some(stream_id),
            buffer_length: Some(self.config.playback_buffer_length_ms),
            timestamp: None,
        };

        let epoch = self.get_epoch();
        let play = command_message("play", PLAY_TRANSACTION_ID, arguments).into_message_payload(epoch, stream_id)?;
        let buffer_length = buffer_length.into_message_payload(epoch, 0)?;

        let mut bytes = BytesMut::new();
        self.encoder.serialize_into(&play, false, &mut bytes)?;
        self.encoder.serialize_into(&buffer_length, false, &mut bytes)?;

        Ok(Packet {
            bytes: bytes.freeze(),
            can_be_dropped: false,
        })
    }

    fn serialize_message(&mut self, message: RtmpMessage, stream_id: u32) -> Result<Packet, ClientSessionError> {
        let payload = message.into_message_payload(self.get_epoch(), stream_id)?;
        let packet = self.encoder.serialize(&payload, false, false)?;
        Ok(packet)
    }

    fn get_epoch(&self) -> RtmpTimestamp {
        RtmpTimestamp::new(self.start_time.elapsed().as_millis() as u32)
    }
}

fn push_raw_response(results: &mut Vec<ClientSessionResult>, bytes: Vec<u8>) {
    if !bytes.is_empty() {
        results.push(ClientSessionResult::OutboundResponse(Packet {
            bytes: Bytes::from(bytes),
            can_be_dropped: false,
        }));
    }
}

fn command_message(name: &str, transaction_id: f64, arguments: Vec<Amf0Value>) -> RtmpMessage {
    RtmpMessage::Amf0Command {
        command_name: name.to_string(),
        transaction_id,
        command_object: Amf0Value::Null,
        additional_arguments: arguments,
    }
}
