//! Property-oriented tests for reassembly across arbitrary chunk boundaries.

mod delimiter_codec;
mod length_codec;
mod shared;
