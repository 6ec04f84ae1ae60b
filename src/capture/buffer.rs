use super::device::MediaFragment;

/// Fragments of one continuous recording, in arrival order
///
/// Spans the whole interview, not a single question.
#[derive(Debug)]
pub struct CaptureBuffer {
    fragments: Vec<MediaFragment>,
    mime_type: String,
    byte_len: usize,
}

impl CaptureBuffer {
    pub fn new(mime_type: impl Into<String>) -> Self {
        Self {
            fragments: Vec::new(),
            mime_type: mime_type.into(),
            byte_len: 0,
        }
    }

    pub fn push(&mut self, fragment: MediaFragment) {
        // Recorders can emit empty fragments on flush
        if fragment.data.is_empty() {
            return;
        }
        self.byte_len += fragment.data.len();
        self.fragments.push(fragment);
    }

    pub fn len(&self) -> usize {
        self.fragments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fragments.is_empty()
    }

    pub fn byte_len(&self) -> usize {
        self.byte_len
    }

    /// Join every buffered fragment into one payload and clear the buffer
    pub fn assemble(&mut self) -> FinishedMedia {
        let fragments = std::mem::take(&mut self.fragments);
        let duration_ms = match (fragments.first(), fragments.last()) {
            (Some(first), Some(last)) => last.timestamp_ms.saturating_sub(first.timestamp_ms),
            _ => 0,
        };

        let mut data = Vec::with_capacity(self.byte_len);
        for fragment in &fragments {
            data.extend_from_slice(&fragment.data);
        }
        self.byte_len = 0;

        FinishedMedia {
            data,
            mime_type: self.mime_type.clone(),
            fragment_count: fragments.len(),
            duration_ms,
        }
    }
}

/// The single assembled recording, handed to the upload exactly once
///
/// Deliberately not `Clone`.
#[derive(Debug)]
pub struct FinishedMedia {
    data: Vec<u8>,
    mime_type: String,
    fragment_count: usize,
    duration_ms: u64,
}

impl FinishedMedia {
    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn data(&self) -> &[u8] {
        &self.data
    }

    pub fn mime_type(&self) -> &str {
        &self.mime_type
    }

    pub fn fragment_count(&self) -> usize {
        self.fragment_count
    }

    /// Span between the first and last fragment timestamps
    pub fn duration_ms(&self) -> u64 {
        self.duration_ms
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fragment(data: &[u8], timestamp_ms: u64) -> MediaFragment {
        MediaFragment {
            data: data.to_vec(),
            timestamp_ms,
        }
    }

    #[test]
    fn test_assemble_joins_fragments_in_order() {
        let mut buffer = CaptureBuffer::new("video/webm");
        buffer.push(fragment(b"abc", 100));
        buffer.push(fragment(b"", 150));
        buffer.push(fragment(b"de", 200));
        buffer.push(fragment(b"f", 1300));

        assert_eq!(buffer.len(), 3, "Empty fragments are skipped");
        assert_eq!(buffer.byte_len(), 6);

        let media = buffer.assemble();
        assert_eq!(media.data(), b"abcdef");
        assert_eq!(media.mime_type(), "video/webm");
        assert_eq!(media.fragment_count(), 3);
        assert_eq!(media.duration_ms(), 1200);

        // Buffer is released after assembly
        assert!(buffer.is_empty());
        assert_eq!(buffer.byte_len(), 0);
    }

    #[test]
    fn test_assemble_empty_buffer() {
        let mut buffer = CaptureBuffer::new("video/webm");
        let media = buffer.assemble();

        assert!(media.is_empty());
        assert_eq!(media.duration_ms(), 0);
        assert_eq!(media.fragment_count(), 0);
    }
}
