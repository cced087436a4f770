// VOPL container format.
//
// A .vopl file is a 16-byte header followed by one payload in whichever of
// the five candidate encodings came out smallest for the chunk, optionally
// zlib-wrapped.
//
// # Modules
//
// - `header`   — magic/version framing, header parse and rebuild
// - `encoding` — the five payload codecs and size-optimal selection
// - `codec`    — whole-file encode/decode entry points

pub mod codec;
pub mod encoding;
pub mod header;

pub use codec::{PACK_BPP, decode, decode_payload, encode, encode_adaptive, encode_with_bpp};
pub use encoding::{EncodedPayload, Encoding, best_encoding};
pub use header::{COMPRESSED_FLAG, HEADER_LEN, MAGIC, VERSION, VoplHeader, build, parse_header};
