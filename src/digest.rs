// Copyright 2024 the Tectonic Project
// Licensed under the MIT License

//! A streaming 160-bit hash with field separators.
//!
//! [`DigestComputer`]/[`DigestData`] are a type alias over a RustCrypto
//! [`digest::Digest`] implementation plus the `GenericArray` output it
//! produces. A rule key is defined as 160 bits, so `sha1` is the hasher,
//! rather than the wider `sha2` family used for general-purpose content
//! hashing elsewhere.

use digest::Digest as _;
use generic_array::GenericArray;
use sha1::Sha1;
use std::fmt;

/// The hasher backing the Digest Sink and the File-Hash Oracle.
type DigestComputer = Sha1;

/// The raw byte array produced by [`DigestComputer`].
type DigestData = GenericArray<u8, <DigestComputer as digest::OutputSizeUser>::OutputSize>;

fn write_hex(bytes: &[u8], f: &mut fmt::Formatter<'_>) -> fmt::Result {
    for b in bytes {
        write!(f, "{b:02x}")?;
    }
    Ok(())
}

/// An opaque 160-bit digest identifying a rule's cacheable output.
///
/// The textual form (via [`fmt::Display`] or [`fmt::LowerHex`]) is the
/// lowercase hexadecimal encoding of the digest.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct RuleKey(DigestData);

/// A 160-bit content digest of a file or archive member, as produced by the
/// File-Hash Oracle.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Sha1HashCode(DigestData);

macro_rules! impl_digest_wrapper {
    ($ty:ident) => {
        impl $ty {
            pub(crate) fn from_raw(data: DigestData) -> Self {
                Self(data)
            }

            /// The raw digest bytes.
            pub fn as_bytes(&self) -> &[u8] {
                self.0.as_slice()
            }
        }

        impl fmt::LowerHex for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write_hex(&self.0, f)
            }
        }

        impl fmt::Display for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                fmt::LowerHex::fmt(self, f)
            }
        }

        impl fmt::Debug for $ty {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}({})", stringify!($ty), self)
            }
        }
    };
}

impl_digest_wrapper!(RuleKey);
impl_digest_wrapper!(Sha1HashCode);

/// Types whose big-endian, fixed-width byte encoding [`DigestSink::absorb_fixed`]
/// knows how to produce.
///
/// Implemented for the signed integer widths and the two IEEE-754 float
/// widths a rule key can carry; floats are absorbed via their raw bit
/// pattern so that the encoding is a pure function of the value.
pub trait FixedWidth {
    /// Buffer large enough for any implementor; avoids an allocation per
    /// absorbed primitive.
    type Bytes: AsRef<[u8]>;

    fn big_endian_bytes(&self) -> Self::Bytes;
}

macro_rules! impl_fixed_width_int {
    ($ty:ty) => {
        impl FixedWidth for $ty {
            type Bytes = [u8; std::mem::size_of::<$ty>()];

            fn big_endian_bytes(&self) -> Self::Bytes {
                self.to_be_bytes()
            }
        }
    };
}

impl_fixed_width_int!(i8);
impl_fixed_width_int!(i16);
impl_fixed_width_int!(i32);
impl_fixed_width_int!(i64);

impl FixedWidth for f32 {
    type Bytes = [u8; 4];

    fn big_endian_bytes(&self) -> Self::Bytes {
        self.to_bits().to_be_bytes()
    }
}

impl FixedWidth for f64 {
    type Bytes = [u8; 8];

    fn big_endian_bytes(&self) -> Self::Bytes {
        self.to_bits().to_be_bytes()
    }
}

/// Wraps a streaming hash, with the zero-byte field separator that
/// disambiguates one absorbed field from the next.
///
/// `DigestSink` itself knows nothing about key-context stacks or field
/// names; that bookkeeping lives one layer up, in `builder.rs`, which is the
/// only thing that drives this type.
#[derive(Default)]
pub struct DigestSink {
    hasher: DigestComputer,
}

impl DigestSink {
    pub fn new() -> Self {
        DigestSink {
            hasher: DigestComputer::new(),
        }
    }

    /// Append raw bytes.
    pub fn absorb_bytes(&mut self, bytes: &[u8]) {
        self.hasher.update(bytes);
    }

    /// Append the UTF-8 bytes of a string.
    ///
    /// Pinned to UTF-8 across all platforms; rule keys are not persisted
    /// across implementations, so there is no compatibility reason to chase
    /// a platform-native encoding instead.
    pub fn absorb_chars(&mut self, s: &str) {
        self.hasher.update(s.as_bytes());
    }

    /// Append a single zero byte.
    pub fn absorb_separator(&mut self) {
        self.hasher.update([0u8]);
    }

    /// Append a number in big-endian fixed-width form.
    pub fn absorb_fixed<T: FixedWidth>(&mut self, value: T) {
        self.hasher.update(value.big_endian_bytes());
    }

    /// Consume the sink and produce the digest.
    pub fn finalize(self) -> RuleKey {
        RuleKey::from_raw(self.hasher.finalize())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scenario_1_bool_field() {
        // set("flag", true) -> "flag", sep, "t", sep
        let mut sink = DigestSink::new();
        sink.absorb_chars("flag");
        sink.absorb_separator();
        sink.absorb_chars("t");
        sink.absorb_separator();
        let key = sink.finalize();
        assert_eq!(format!("{key:x}"), "27075d92a806620d6b83c39cf26e24d70ff79604");
    }

    #[test]
    fn scenario_2_int_field() {
        // set("n", 7i32) -> "n", sep, BE 00 00 00 07, sep
        let mut sink = DigestSink::new();
        sink.absorb_chars("n");
        sink.absorb_separator();
        sink.absorb_fixed(7i32);
        sink.absorb_separator();
        let key = sink.finalize();
        assert_eq!(format!("{key:x}"), "4763d284b40c6dcd33e6f22ed9ae602640b56593");
    }

    #[test]
    fn scenario_3_empty_input_digest() {
        let key = DigestSink::new().finalize();
        assert_eq!(format!("{key:x}"), "da39a3ee5e6b4b0d3255bfef95601890afd80709");
    }

    #[test]
    fn scenario_4_sequence_shares_field_name() {
        // set("xs", [1i32, 2i32]) -> "xs", sep, BE 1, sep, BE 2, sep
        let mut sink = DigestSink::new();
        sink.absorb_chars("xs");
        sink.absorb_separator();
        sink.absorb_fixed(1i32);
        sink.absorb_separator();
        sink.absorb_fixed(2i32);
        sink.absorb_separator();
        let key = sink.finalize();
        assert_eq!(format!("{key:x}"), "ebf311cca71536b27a6f158aa504681c01a9c137");
    }

    #[test]
    fn scenario_5_ordered_map_field_name_redrain() {
        // set("m", {"a" -> 1i32, "b" -> 2i32}) ->
        //   "m", sep, "{", sep,
        //   "m", sep, "a", sep, " -> ", sep, "m", sep, BE 00 00 00 01, sep,
        //   "m", sep, "b", sep, " -> ", sep, "m", sep, BE 00 00 00 02, sep,
        //   "}", sep
        //
        // The field name is re-drained at every entry's key and value
        // boundary, since the key-context stack is pushed and popped around
        // each one independently.
        let mut sink = DigestSink::new();
        sink.absorb_chars("m");
        sink.absorb_separator();
        sink.absorb_chars("{");
        sink.absorb_separator();

        sink.absorb_chars("m");
        sink.absorb_separator();
        sink.absorb_chars("a");
        sink.absorb_separator();
        sink.absorb_chars(" -> ");
        sink.absorb_separator();
        sink.absorb_chars("m");
        sink.absorb_separator();
        sink.absorb_fixed(1i32);
        sink.absorb_separator();

        sink.absorb_chars("m");
        sink.absorb_separator();
        sink.absorb_chars("b");
        sink.absorb_separator();
        sink.absorb_chars(" -> ");
        sink.absorb_separator();
        sink.absorb_chars("m");
        sink.absorb_separator();
        sink.absorb_fixed(2i32);
        sink.absorb_separator();

        sink.absorb_chars("}");
        sink.absorb_separator();

        let key = sink.finalize();
        assert_eq!(format!("{key:x}"), "da27b0ccd26c98c1e009c3a72e1e28ec857b68ac");
    }

    #[test]
    fn float_uses_bit_pattern() {
        let mut a = DigestSink::new();
        a.absorb_fixed(1.5f64);
        let mut b = DigestSink::new();
        b.absorb_fixed(1.5f64);
        assert_eq!(a.finalize().as_bytes(), b.finalize().as_bytes());
    }

    #[test]
    fn display_is_lowercase_hex() {
        let key = DigestSink::new().finalize();
        let text = format!("{key}");
        assert!(text.chars().all(|c| c.is_ascii_hexdigit() && !c.is_ascii_uppercase()));
        assert_eq!(text.len(), 40); // 160 bits
    }
}
