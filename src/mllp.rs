//! MLLP block framing.
//!
//! Every HL7 payload on the wire is wrapped as `<VT> payload <FS><CR>`. [`MllpCodec`] plugs that
//! framing into a tokio [`Framed`](tokio_util::codec::Framed) transport; [`frame`] and [`strip`]
//! do the same for a single buffer held in memory.

use bytes::buf::{Buf, BufMut};
use bytes::BytesMut;
use log::{debug, trace};
use tokio_util::codec::{Decoder, Encoder};

use crate::error::MllpError;

/// Vertical-Tab char, the marker for the start of a message
pub const BLOCK_HEADER: u8 = 0x0B;
/// File-Separator char + CR, the marker for the end of a message
pub const BLOCK_FOOTER: [u8; 2] = [0x1C, 0x0D];

/// Wraps a payload in the MLLP start and end blocks.
pub fn frame(payload: &[u8]) -> BytesMut {
    let mut dst = BytesMut::with_capacity(payload.len() + 3);
    dst.put_u8(BLOCK_HEADER);
    dst.put_slice(payload);
    dst.put_slice(&BLOCK_FOOTER);
    dst
}

/// Removes the MLLP start and end blocks from a single complete frame.
///
/// Bytes ahead of the start block are ignored, as the receiving side of the protocol requires.
/// Anything else out of place is a framing error.
pub fn strip(framed: &[u8]) -> Result<&[u8], MllpError> {
    let start = framed
        .iter()
        .position(|b| *b == BLOCK_HEADER)
        .ok_or_else(|| MllpError::Framing("missing start block (0x0B)".to_string()))?;

    framed[start + 1..]
        .strip_suffix(&BLOCK_FOOTER[..])
        .ok_or_else(|| MllpError::Framing("missing end block (0x1C 0x0D)".to_string()))
}

/// A codec producing and consuming MLLP frames.
///
/// Decoded items are the payload bytes with the framing removed. A stream that ends part way
/// through a frame is reported as [`MllpError::Framing`] rather than being silently dropped.
#[derive(Default)]
pub struct MllpCodec {
    // If we receive the start of a message in a call to decode but not the end, we need to buffer the content
    // and prepend it to the data in the next call
    buffer: BytesMut,
}

impl MllpCodec {
    /// Creates a new codec, generally for use within a tokio `Framed`.
    /// ```
    /// use hl7_adt_client::mllp::MllpCodec;
    /// let mllp = MllpCodec::new();
    /// ```
    pub fn new() -> Self {
        MllpCodec {
            buffer: BytesMut::new(),
        }
    }

    /// MLLP is synchronous, so there is at most one message in the buffer and its footer sits at
    /// the very end.
    fn get_footer_position(src: &BytesMut) -> Option<usize> {
        let mut iter = src.iter().rev().enumerate().peekable(); //search from end
        loop {
            let cur = iter.next();
            let next = iter.peek();

            match (cur, next) {
                (Some((_, cur_ele)), Some((i, next_ele))) => {
                    if cur_ele == &BLOCK_FOOTER[1] && *next_ele == &BLOCK_FOOTER[0] {
                        let index = src.len() - i - 1;
                        trace!("MLLP: Found footer at index {}", index);
                        return Some(index);
                    }
                }
                (_, None) => {
                    trace!("MLLP: Unable to find footer...");
                    return None;
                }
                _ => {} //keep looping
            }
        }
    }
}

// Used for the outbound ADT message and for ACKs sent back by the listener.
impl Encoder<BytesMut> for MllpCodec {
    type Error = MllpError;

    fn encode(&mut self, event: BytesMut, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(event.len() + 3);
        dst.put_u8(BLOCK_HEADER);
        dst.put_slice(&event);
        dst.put_slice(&BLOCK_FOOTER);

        debug!("MLLP: Encoded {} payload bytes for send", event.len());
        Ok(())
    }
}

impl Decoder for MllpCodec {
    type Item = BytesMut;
    type Error = MllpError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        // Bytes prior to the BLOCK_HEADER are ignored.
        let result = if self.buffer.is_empty() {
            trace!("Empty local buffer, operating on passed buffer only");
            decode_internal(src)
        } else {
            self.buffer.reserve(src.len());
            self.buffer.put_slice(src);
            src.advance(src.len());

            trace!("Operating on concat of previous and current buffers");
            decode_internal(&mut self.buffer)
        };

        if result.is_none() && self.buffer.is_empty() {
            // hold on to the partial frame for the next call
            self.buffer.reserve(src.len());
            self.buffer.put_slice(src);
            src.advance(src.len());
        }

        Ok(result)
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        if let Some(message) = self.decode(buf)? {
            return Ok(Some(message));
        }

        if self.buffer.is_empty() {
            return Ok(None);
        }

        let pending = self.buffer.len();
        self.buffer.clear();
        Err(MllpError::Framing(format!(
            "stream closed with {} bytes of an unterminated frame",
            pending
        )))
    }
}

fn decode_internal(buf_to_process: &mut BytesMut) -> Option<BytesMut> {
    let start_offset = buf_to_process.iter().position(|b| *b == BLOCK_HEADER)?;
    let end_offset = MllpCodec::get_footer_position(buf_to_process)?;

    if end_offset < start_offset {
        // a stray footer ahead of the header, keep waiting for the real one
        return None;
    }

    let mut result = buf_to_process
        .split_to(end_offset + 2) //get the footer bytes
        .split_to(end_offset); // grab our data from the buffer, consuming (and losing) the footer

    result.advance(start_offset + 1); //move to start of data

    Some(result)
}
