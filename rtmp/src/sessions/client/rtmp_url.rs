use thiserror::Error;
use url::Url;

pub const DEFAULT_PORT: u16 = 1935;

#[derive(Debug, Error)]
pub enum RtmpUrlError {
    #[error("The url could not be parsed: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("Scheme '{scheme}' is not supported, only rtmp is")]
    UnsupportedScheme { scheme: String },

    #[error("The url has no host")]
    MissingHost,

    #[error("The url has no application name in its path")]
    MissingAppName,

    #[error("The url has no stream name in its path")]
    MissingStreamName,
}

/// The parts of an `rtmp://host[:port]/app/stream` address a client needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtmpUrl {
    pub host: String,
    pub port: u16,
    pub app: String,

    /// Everything after the app, including any query string (stream keys often carry one)
    pub stream_name: String,
}

impl RtmpUrl {
    pub fn parse(input: &str) -> Result<RtmpUrl, RtmpUrlError> {
        let url = Url::parse(input)?;
        if url.scheme() != "rtmp" {
            return Err(RtmpUrlError::UnsupportedScheme {
                scheme: url.scheme().to_string(),
            });
        }

        let host = match url.host_str() {
            Some(host) if !host.is_empty() => host.to_string(),
            _ => return Err(RtmpUrlError::MissingHost),
        };

        let mut segments = url.path_segments().ok_or(RtmpUrlError::MissingAppName)?;
        let app = match segments.next() {
            Some(app) if !app.is_empty() => app.to_string(),
            _ => return Err(RtmpUrlError::MissingAppName),
        };

        let mut stream_name = segments.collect::<Vec<_>>().join("/");
        if stream_name.is_empty() {
            return Err(RtmpUrlError::MissingStreamName);
        }

        if let Some(query) = url.query() {
            stream_name.push('?');
            stream_name.push_str(query);
        }

        Ok(RtmpUrl {
            host,
            port: url.port().unwrap_or(DEFAULT_PORT),
            app,
            stream_name,
        })
    }

    /// The `tcUrl` value sent with `connect`
    pub fn tc_url(&self) -> String {
        format!("rtmp://{}:{}/{}", self.host, self.port, self.app)
    }

    /// Address suitable for opening the TCP connection
    pub fn socket_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
