//! Frame sources and the kinds of input they can be opened from.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

/// Trait for anything that yields decoded frames in presentation order.
///
/// Each frame is handed over exactly once; ownership passes to the caller.
/// `None` means the stream has ended and will not resume.
pub trait FrameSource {
    type Frame;

    fn next_frame(&mut self) -> Option<Self::Frame>;

    fn kind(&self) -> &SourceKind;
}

/// Which imgur endpoint resolves an imgur id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImgurApi {
    Image,
    Album,
    Gallery,
}

/// Where frames come from. Parsed once at the source boundary so the rest
/// of the system never inspects source strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceKind {
    Webcam,
    Video { url: String },
    Image { url: String },
    Imgur { api: ImgurApi, id: String },
}

impl SourceKind {
    /// Sources whose frames keep changing without a loop point.
    pub fn is_live(&self) -> bool {
        matches!(self, Self::Webcam)
    }

    pub fn is_still(&self) -> bool {
        matches!(self, Self::Image { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("source `{0}` is not an absolute url")]
    NotAUrl(String),
    #[error("unrecognised imgur path `{0}`")]
    ImgurPath(String),
}

impl FromStr for SourceKind {
    type Err = SourceError;

    fn from_str(source: &str) -> Result<Self, Self::Err> {
        if source == "WEBCAM" {
            return Ok(Self::Webcam);
        }
        let Some((_, rest)) = source.split_once("://") else {
            return Err(SourceError::NotAUrl(source.to_string()));
        };
        let (host, path) = match rest.find('/') {
            Some(idx) => (&rest[..idx], &rest[idx..]),
            None => (rest, "/"),
        };
        if host.is_empty() {
            return Err(SourceError::NotAUrl(source.to_string()));
        }
        let path = path.split(['?', '#']).next().unwrap_or_default();

        if host == "imgur.com" || host == "i.imgur.com" {
            return parse_imgur(path);
        }
        if path.ends_with(".mp4") {
            Ok(Self::Video {
                url: source.to_string(),
            })
        } else {
            Ok(Self::Image {
                url: source.to_string(),
            })
        }
    }
}

fn parse_imgur(path: &str) -> Result<SourceKind, SourceError> {
    let stem = path.trim_start_matches('/').split('.').next().unwrap_or_default();
    let parts: Vec<&str> = stem.split('/').filter(|p| !p.is_empty()).collect();
    let (api, id) = match parts.as_slice() {
        [id] => (ImgurApi::Image, *id),
        ["a" | "album", id] => (ImgurApi::Album, *id),
        ["g" | "gallery", id] => (ImgurApi::Gallery, *id),
        _ => return Err(SourceError::ImgurPath(path.to_string())),
    };
    Ok(SourceKind::Imgur {
        api,
        id: id.to_string(),
    })
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Webcam => f.write_str("webcam"),
            Self::Video { url } => write!(f, "video {url}"),
            Self::Image { url } => write!(f, "image {url}"),
            Self::Imgur { api, id } => write!(f, "imgur {api:?} {id}"),
        }
    }
}

/// Frame source backed by any iterator of frames.
pub struct IterSource<I: Iterator> {
    kind: SourceKind,
    frames: I,
}

impl<I: Iterator> IterSource<I> {
    pub fn new(kind: SourceKind, frames: impl IntoIterator<IntoIter = I>) -> Self {
        Self {
            kind,
            frames: frames.into_iter(),
        }
    }
}

impl<I: Iterator> FrameSource for IterSource<I> {
    type Frame = I::Item;

    fn next_frame(&mut self) -> Option<I::Item> {
        self.frames.next()
    }

    fn kind(&self) -> &SourceKind {
        &self.kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> SourceKind {
        s.parse().unwrap()
    }

    #[test]
    fn test_webcam() {
        assert_eq!(parse("WEBCAM"), SourceKind::Webcam);
        assert!(parse("WEBCAM").is_live());
    }

    #[test]
    fn test_video_and_image_urls() {
        assert_eq!(
            parse("https://example.com/clips/walk.mp4"),
            SourceKind::Video {
                url: "https://example.com/clips/walk.mp4".into()
            }
        );
        let still = parse("https://example.com/pics/face.png?size=large");
        assert!(still.is_still());
    }

    #[test]
    fn test_imgur_endpoints() {
        assert_eq!(
            parse("https://i.imgur.com/AbC123.gifv"),
            SourceKind::Imgur {
                api: ImgurApi::Image,
                id: "AbC123".into()
            }
        );
        assert_eq!(
            parse("https://imgur.com/a/xyz"),
            SourceKind::Imgur {
                api: ImgurApi::Album,
                id: "xyz".into()
            }
        );
        assert_eq!(
            parse("https://imgur.com/gallery/qq9"),
            SourceKind::Imgur {
                api: ImgurApi::Gallery,
                id: "qq9".into()
            }
        );
    }

    #[test]
    fn test_rejects_bad_sources() {
        assert!(matches!(
            "webcam".parse::<SourceKind>(),
            Err(SourceError::NotAUrl(_))
        ));
        assert!(matches!(
            "https://imgur.com/t/funny/abc".parse::<SourceKind>(),
            Err(SourceError::ImgurPath(_))
        ));
    }

    #[test]
    fn test_iter_source_is_single_pass() {
        let mut source = IterSource::new(SourceKind::Webcam, vec![1, 2]);
        assert_eq!(source.next_frame(), Some(1));
        assert_eq!(source.next_frame(), Some(2));
        assert_eq!(source.next_frame(), None);
        assert_eq!(source.kind(), &SourceKind::Webcam);
    }
}
