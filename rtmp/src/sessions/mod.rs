/// This module contains implemented session abstractions.
///
/// A session is an abstraction that reacts to incoming RTMP bytes with packets to be sent as a
/// response, as well as raising events that applications can perform custom logic on.  Sessions
/// own the handshake, chunk reassembler, chunk encoder and acknowledgement window of a single
/// connection and never touch a socket themselves.
mod client;
mod flow_control;
mod media;
mod server;

use std::collections::HashMap;

use streamkit_amf0::Amf0Value;

pub use self::client::{
    ClientSession, ClientSessionConfig, ClientSessionError, ClientSessionEvent,
    ClientSessionResult, ClientState, RtmpUrl, RtmpUrlError,
};
pub use self::flow_control::ReceiveWindow;
pub use self::media::{MediaHandler, MediaPayload};
pub use self::server::{
    PolicyOutcome, ServerSession, ServerSessionConfig, ServerSessionError, ServerSessionEvent,
    ServerSessionHandler, ServerSessionResult,
};

/// Contains the metadata information a stream may advertise on publishing
#[derive(PartialEq, Debug, Clone, Default)]
pub struct StreamMetadata {
    pub video_width: Option<u32>,
    pub video_height: Option<u32>,
    pub video_codec: Option<String>,
    pub video_frame_rate: Option<f32>,
    pub video_bitrate_kbps: Option<u32>,
    pub audio_codec: Option<String>,
    pub audio_bitrate_kbps: Option<u32>,
    pub audio_sample_rate: Option<u32>,
    pub audio_channels: Option<u32>,
    pub audio_is_stereo: Option<bool>,
    pub encoder: Option<String>,
}

impl StreamMetadata {
    pub fn new() -> StreamMetadata {
        StreamMetadata::default()
    }

    /// Reads the metadata out of an `onMetaData` data message, which may be wrapped in a
    /// `@setDataFrame` call.  Returns `None` for any other data message.
    pub fn from_data_values(values: Vec<Amf0Value>) -> Option<StreamMetadata> {
        let mut values = values.into_iter();
        let mut name = values.next()?;
        if name.as_str() == Some("@setDataFrame") {
            name = values.next()?;
        }

        if name.as_str() != Some("onMetaData") {
            return None;
        }

        let properties = values.next()?.into_properties()?;
        let mut metadata = StreamMetadata::new();
        metadata.apply_values(properties);
        Some(metadata)
    }

    fn apply_values(&mut self, properties: HashMap<String, Amf0Value>) {
        for (key, value) in properties {
            let number = value.as_number();
            match key.as_ref() {
                "width" => self.video_width = number.map(|x| x as u32),
                "height" => self.video_height = number.map(|x| x as u32),
                "videocodecid" => self.video_codec = codec_name(value),
                "videodatarate" => self.video_bitrate_kbps = number.map(|x| x as u32),
                "framerate" => self.video_frame_rate = number.map(|x| x as f32),
                "audiocodecid" => self.audio_codec = codec_name(value),
                "audiodatarate" => self.audio_bitrate_kbps = number.map(|x| x as u32),
                "audiosamplerate" => self.audio_sample_rate = number.map(|x| x as u32),
                "audiochannels" => self.audio_channels = number.map(|x| x as u32),
                "stereo" => self.audio_is_stereo = value.as_boolean(),
                "encoder" => self.encoder = value.into_string(),
                _ => (),
            }
        }
    }

    /// Builds the `onMetaData` data message values that advertise this metadata to a player
    pub fn to_data_values(&self) -> Vec<Amf0Value> {
        let mut properties = HashMap::with_capacity(11);
        let mut insert_number = |key: &str, value: Option<f64>| {
            if let Some(value) = value {
                properties.insert(key.to_string(), Amf0Value::Number(value));
            }
        };

        insert_number("width", self.video_width.map(f64::from));
        insert_number("height", self.video_height.map(f64::from));
        insert_number("videodatarate", self.video_bitrate_kbps.map(f64::from));
        insert_number("framerate", self.video_frame_rate.map(f64::from));
        insert_number("audiodatarate", self.audio_bitrate_kbps.map(f64::from));
        insert_number("audiosamplerate", self.audio_sample_rate.map(f64::from));
        insert_number("audiochannels", self.audio_channels.map(f64::from));

        if let Some(ref codec) = self.video_codec {
            properties.insert("videocodecid".to_string(), Amf0Value::Utf8String(codec.clone()));
        }

        if let Some(ref codec) = self.audio_codec {
            properties.insert("audiocodecid".to_string(), Amf0Value::Utf8String(codec.clone()));
        }

        if let Some(stereo) = self.audio_is_stereo {
            properties.insert("stereo".to_string(), Amf0Value::Boolean(stereo));
        }

        if let Some(ref encoder) = self.encoder {
            properties.insert("encoder".to_string(), Amf0Value::Utf8String(encoder.clone()));
        }

        vec![
            Amf0Value::Utf8String("onMetaData".to_string()),
            Amf0Value::Object(properties),
        ]
    }
}

// Codec ids come through as numbers (FLV codec ids) from most encoders, strings from some
fn codec_name(value: Amf0Value) -> Option<String> {
    match value {
        Amf0Value::Utf8String(name) => Some(name),
        Amf0Value::Number(id) => Some((id as u32).to_string()),
        _ => None,
    }
}
