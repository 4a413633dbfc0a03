use reqwest::header::HeaderValue;

/// Photo as returned by the upstream service, stored verbatim in the cache.
#[derive(Clone, Debug, PartialEq)]
pub struct CachedPhoto {
    pub mime_type: HeaderValue,
    pub image: Vec<u8>,
}

impl CachedPhoto {
    pub fn new(mime_type: HeaderValue, image: Vec<u8>) -> Self {
        Self { mime_type, image }
    }

    pub fn len(&self) -> usize {
        self.image.len()
    }

    pub fn is_empty(&self) -> bool {
        self.image.is_empty()
    }
}

/// `.` and `..` segments would let a reference climb out of the upstream
/// base path once the URL is normalized
pub fn has_dot_segment(reference: &str) -> bool {
    reference
        .split(['/', '\\'])
        .any(|segment| segment == "." || segment == "..")
}
