//! ABI infrastructure - call encoding and return decoding

pub mod codec;
