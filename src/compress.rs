//! Compression codecs backing the compression & cache layer (spec §4.3,
//! §4.4, §4.6). Whole-body compression feeds the artifact cache; the
//! streaming variant feeds the stream pump's unknown-total path.
//!
//! `flate2` and `brotli` are the gzip/deflate/br implementations this
//! corpus reaches for (e.g. `other_examples/6060049c_CosmicHorrorDev-...`'s
//! `GzEncoder`/`CompressorWriter` pair, `other_examples/56f0da59_zydou-arti...`'s
//! `DeflateEncoder`).

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use brotli::CompressorWriter;
use flate2::write::{DeflateEncoder, GzEncoder};
use flate2::Compression;

use crate::negotiation::Encoding;

/// A `Write` sink brotli's `CompressorWriter` writes into, backed by a
/// shared buffer we can drain without depending on any accessor method
/// `CompressorWriter` itself may or may not expose.
#[derive(Clone, Default)]
struct SharedSink(Arc<Mutex<Vec<u8>>>);

impl Write for SharedSink {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

const BROTLI_BUFFER_SIZE: usize = 4096;
const BROTLI_QUALITY: u32 = 6;
const BROTLI_LGWIN: u32 = 22;

/// Compresses a whole buffer in one shot, used by the File reader (§4.4
/// step 6) before the result is admitted to the artifact cache.
pub fn compress_whole(data: &[u8], encoding: Encoding) -> io::Result<Vec<u8>> {
    match encoding {
        Encoding::Identity => Ok(data.to_vec()),
        Encoding::Gzip => {
            let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
        Encoding::Deflate => {
            let mut encoder = DeflateEncoder::new(Vec::new(), Compression::default());
            encoder.write_all(data)?;
            encoder.finish()
        }
        Encoding::Br => {
            let sink = SharedSink::default();
            let mut encoder =
                CompressorWriter::new(sink.clone(), BROTLI_BUFFER_SIZE, BROTLI_QUALITY, BROTLI_LGWIN);
            encoder.write_all(data)?;
            encoder.flush()?;
            drop(encoder);
            Ok(std::mem::take(&mut *sink.0.lock().unwrap()))
        }
    }
}

enum Inner {
    Gzip(GzEncoder<Vec<u8>>),
    Deflate(DeflateEncoder<Vec<u8>>),
    Br(CompressorWriter<SharedSink>, Arc<Mutex<Vec<u8>>>),
}

/// Pipelined compressor interposed between a read stream and the HTTP
/// writer (spec §4.6, Design Notes "pipelined compressor"). `feed` returns
/// whatever compressed bytes became available for this chunk; the final
/// flush happens in `finish`.
pub struct StreamCompressor {
    inner: Inner,
}

impl StreamCompressor {
    pub fn new(encoding: Encoding) -> Self {
        let inner = match encoding {
            Encoding::Gzip => Inner::Gzip(GzEncoder::new(Vec::new(), Compression::default())),
            Encoding::Deflate => {
                Inner::Deflate(DeflateEncoder::new(Vec::new(), Compression::default()))
            }
            Encoding::Br => {
                let sink = SharedSink::default();
                let buf = sink.0.clone();
                Inner::Br(
                    CompressorWriter::new(sink, BROTLI_BUFFER_SIZE, BROTLI_QUALITY, BROTLI_LGWIN),
                    buf,
                )
            }
            Encoding::Identity => {
                // Never constructed for identity; callers gate on `encoding != identity`.
                Inner::Gzip(GzEncoder::new(Vec::new(), Compression::default()))
            }
        };
        Self { inner }
    }

    pub fn feed(&mut self, chunk: &[u8]) -> io::Result<Vec<u8>> {
        match &mut self.inner {
            Inner::Gzip(enc) => {
                enc.write_all(chunk)?;
                enc.flush()?;
                Ok(std::mem::take(enc.get_mut()))
            }
            Inner::Deflate(enc) => {
                enc.write_all(chunk)?;
                enc.flush()?;
                Ok(std::mem::take(enc.get_mut()))
            }
            Inner::Br(enc, buf) => {
                enc.write_all(chunk)?;
                enc.flush()?;
                Ok(std::mem::take(&mut *buf.lock().unwrap()))
            }
        }
    }

    pub fn finish(self) -> io::Result<Vec<u8>> {
        match self.inner {
            Inner::Gzip(enc) => enc.finish(),
            Inner::Deflate(enc) => enc.finish(),
            Inner::Br(mut enc, buf) => {
                enc.flush()?;
                drop(enc);
                Ok(std::mem::take(&mut *buf.lock().unwrap()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roundtrip_gzip(data: &[u8]) -> Vec<u8> {
        use flate2::read::GzDecoder;
        use std::io::Read;
        let mut decoder = GzDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        out
    }

    fn roundtrip_deflate(data: &[u8]) -> Vec<u8> {
        use flate2::read::DeflateDecoder;
        use std::io::Read;
        let mut decoder = DeflateDecoder::new(data);
        let mut out = Vec::new();
        decoder.read_to_end(&mut out).unwrap();
        out
    }

    #[test]
    fn identity_is_a_no_op() {
        let data = b"hello world";
        assert_eq!(compress_whole(data, Encoding::Identity).unwrap(), data);
    }

    #[test]
    fn gzip_whole_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = compress_whole(&data, Encoding::Gzip).unwrap();
        assert_ne!(compressed, data);
        assert_eq!(roundtrip_gzip(&compressed), data);
    }

    #[test]
    fn deflate_whole_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = compress_whole(&data, Encoding::Deflate).unwrap();
        assert_eq!(roundtrip_deflate(&compressed), data);
    }

    #[test]
    fn brotli_whole_round_trips() {
        let data = b"the quick brown fox jumps over the lazy dog".repeat(20);
        let compressed = compress_whole(&data, Encoding::Br).unwrap();
        let mut out = Vec::new();
        brotli::BrotliDecompress(&mut &compressed[..], &mut out).unwrap();
        assert_eq!(out, data);
    }

    #[test]
    fn streaming_gzip_round_trips_across_chunks() {
        let mut compressor = StreamCompressor::new(Encoding::Gzip);
        let mut out = Vec::new();
        out.extend(compressor.feed(b"hello ").unwrap());
        out.extend(compressor.feed(b"world").unwrap());
        out.extend(compressor.finish().unwrap());
        assert_eq!(roundtrip_gzip(&out), b"hello world");
    }
}
