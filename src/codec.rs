use bytes::{Buf, BytesMut};
use std::io;
use tokio_util::codec::Decoder;

/// Decodes a byte stream in any `encoding_rs` charset into UTF-8 lines.
///
/// Lines end at `\n`; a trailing `\r` is dropped. A BOM is consumed,
/// malformed sequences become U+FFFD. A final line without terminator is
/// still emitted.
pub struct LineDecoder {
    decoder: encoding_rs::Decoder,
    pending: String,
    finished: bool,
}

impl LineDecoder {
    pub fn new(encoding: &'static encoding_rs::Encoding) -> Self {
        Self {
            decoder: encoding.new_decoder(),
            pending: String::new(),
            finished: false,
        }
    }

    fn transcode(&mut self, src: &mut BytesMut, last: bool) {
        let needed = self
            .decoder
            .max_utf8_buffer_length(src.len())
            .unwrap_or_else(|| src.len() * 3 + 16);
        self.pending.reserve(needed);
        let (_result, bytes_read, _had_errors) =
            self.decoder.decode_to_string(&src[..], &mut self.pending, last);
        src.advance(bytes_read);
    }

    fn take_line(&mut self) -> Option<String> {
        let end = self.pending.find('\n')?;
        let mut line: String = self.pending.drain(..=end).collect();
        line.pop();
        if line.ends_with('\r') {
            line.pop();
        }
        Some(line)
    }
}

impl Decoder for LineDecoder {
    type Item = String;
    type Error = io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        loop {
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
            if src.is_empty() {
                return Ok(None);
            }
            self.transcode(src, false);
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(line) = self.decode(buf)? {
            return Ok(Some(line));
        }
        if !self.finished {
            self.finished = true;
            self.transcode(buf, true);
            buf.clear();
            if let Some(line) = self.take_line() {
                return Ok(Some(line));
            }
        }
        if self.pending.is_empty() {
            return Ok(None);
        }
        let mut line = std::mem::take(&mut self.pending);
        if line.ends_with('\r') {
            line.pop();
        }
        Ok(Some(line))
    }
}
