use crate::chunk_io::PartialPayload;
use crate::messages::MediaType;
use crate::time::RtmpTimestamp;

/// Receives the audio and video a session pulls out of the connection
pub trait MediaHandler {
    fn on_media(&mut self, payload: MediaPayload<'_>);
}

/// Audio or video data handed to a `MediaHandler`.
///
/// When media fragment delivery is enabled `data` is a single chunk's worth of the frame and the
/// fragment flags mark where the frame starts and ends.  Otherwise `data` is the whole frame and
/// both flags are set.
#[derive(Debug, PartialEq)]
pub struct MediaPayload<'a> {
    /// Index of the media stream in order of first appearance on the connection
    pub stream_index: usize,
    pub media_type: MediaType,
    pub data: &'a [u8],
    pub timestamp: RtmpTimestamp,
    pub is_first_fragment: bool,
    pub is_last_fragment: bool,
}

impl<'a> MediaPayload<'a> {
    pub(crate) fn complete(
        stream_index: usize,
        media_type: MediaType,
        data: &'a [u8],
        timestamp: RtmpTimestamp,
    ) -> MediaPayload<'a> {
        MediaPayload {
            stream_index,
            media_type,
            data,
            timestamp,
            is_first_fragment: true,
            is_last_fragment: true,
        }
    }

    pub(crate) fn from_fragment(stream_index: usize, fragment: &PartialPayload<'a>) -> MediaPayload<'a> {
        MediaPayload {
            stream_index,
            media_type: fragment.media_type,
            data: fragment.data,
            timestamp: fragment.timestamp,
            is_first_fragment: fragment.is_first,
            is_last_fragment: fragment.is_last,
        }
    }
}

/// Hands out stream indexes to media types in the order they first show up
#[derive(Debug, Default)]
pub(crate) struct MediaStreamIndexes {
    seen: Vec<MediaType>,
}

impl MediaStreamIndexes {
    pub fn new() -> MediaStreamIndexes {
        MediaStreamIndexes { seen: Vec::new() }
    }

    pub fn index_for(&mut self, media_type: MediaType) -> usize {
        match self.seen.iter().position(|x| *x == media_type) {
            Some(index) => index,
            None => {
                self.seen.push(media_type);
                self.seen.len() - 1
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn indexes_follow_first_appearance() {
        let mut indexes = MediaStreamIndexes::new();

        assert_eq!(indexes.index_for(MediaType::Video), 0);
        assert_eq!(indexes.index_for(MediaType::Audio), 1);
        assert_eq!(indexes.index_for(MediaType::Video), 0);
        assert_eq!(indexes.index_for(MediaType::Audio), 1);
    }
}
