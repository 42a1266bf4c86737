// Word-stream framing uses explicit 'as' casts to split the count/opcode
// word.
#![allow(clippy::cast_possible_truncation)]

mod binary;
mod opcode;

pub use binary::{
    GENERATOR, Header, MAGIC, RawInstruction, VERSION, bytes_to_words, decode_module,
    words_to_bytes,
};
pub use opcode::{Op, Section};
