//! Sample codec: IBM System/360 single precision and IEEE-754 single precision.
//!
//! # IBM float layout
//! ```text
//! bit 31      sign
//! bits 30..24 exponent, base 16, bias 64
//! bits 23..0  fraction f, value = f / 2^24
//! value = (-1)^sign * f / 2^24 * 16^(exponent - 64)
//! ```
//! IBM floats have a 24-bit fraction but a hexadecimal exponent, so a
//! normalised value carries between 21 and 24 significant bits.  Converting
//! IEEE data to IBM therefore loses up to three bits of precision; converting
//! IBM to `f64` is always exact.
//!
//! IBM encode rounds to nearest, saturates values beyond the IBM range (and
//! infinities) to the largest finite magnitude, and flushes underflow and NaN
//! to zero.
//!
//! IBM samples are always stored big-endian, whatever the file's
//! endianness.  Only IEEE samples and header integers follow it.

use byteorder::{BigEndian, ByteOrder, LittleEndian};
use serde::{Deserialize, Serialize};

use crate::endian::Endianness;
use crate::error::{Result, SegyError};

/// Size of one sample on disk.
pub const SAMPLE_SIZE: usize = 4;

const IBM_MAX_MAGNITUDE: u32 = 0x7FFF_FFFF;
const TWO_POW_24: f64 = 16_777_216.0;

/// On-disk sample representation, selected by the file header's
/// `DataSampleFormat` code.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SampleFormat {
    IbmFloat,
    IeeeFloat,
}

impl SampleFormat {
    pub fn from_code(code: i32) -> Result<Self> {
        match code {
            1 => Ok(SampleFormat::IbmFloat),
            5 => Ok(SampleFormat::IeeeFloat),
            other => Err(SegyError::UnsupportedSampleFormat(other)),
        }
    }

    pub fn code(self) -> i32 {
        match self {
            SampleFormat::IbmFloat  => 1,
            SampleFormat::IeeeFloat => 5,
        }
    }
}

/// Convert the 32 bits of an IBM float to `f64`.  Exact.
pub fn ibm_to_ieee(bits: u32) -> f64 {
    let fraction = bits & 0x00FF_FFFF;
    if fraction == 0 {
        return 0.0;
    }
    let exponent = ((bits >> 24) & 0x7F) as i32;
    let magnitude = fraction as f64 * 2f64.powi(4 * (exponent - 64) - 24);
    if bits >> 31 == 1 { -magnitude } else { magnitude }
}

/// Convert `value` to the 32 bits of an IBM float.
pub fn ieee_to_ibm(value: f64) -> u32 {
    if value == 0.0 || value.is_nan() {
        return 0;
    }
    let sign = if value.is_sign_negative() { 0x8000_0000 } else { 0 };
    let mut magnitude = value.abs();
    if magnitude.is_infinite() {
        return sign | IBM_MAX_MAGNITUDE;
    }

    // Scale into [1/16, 1) so that magnitude = fraction * 16^(exponent - 64).
    let mut exponent: i32 = 64;
    while magnitude >= 1.0 {
        magnitude /= 16.0;
        exponent += 1;
    }
    while magnitude < 0.0625 {
        magnitude *= 16.0;
        exponent -= 1;
    }

    let mut fraction = (magnitude * TWO_POW_24).round() as u32;
    if fraction == 1 << 24 {
        // Rounding carried into a new hex digit.
        fraction = 1 << 20;
        exponent += 1;
    }
    if exponent > 127 {
        return sign | IBM_MAX_MAGNITUDE;
    }
    if exponent < 0 {
        return 0;
    }
    sign | ((exponent as u32) << 24) | fraction
}

fn read_u32(bytes: &[u8], endian: Endianness) -> u32 {
    match endian {
        Endianness::Big    => BigEndian::read_u32(bytes),
        Endianness::Little => LittleEndian::read_u32(bytes),
    }
}

fn write_u32(bytes: &mut [u8], value: u32, endian: Endianness) {
    match endian {
        Endianness::Big    => BigEndian::write_u32(bytes, value),
        Endianness::Little => LittleEndian::write_u32(bytes, value),
    }
}

fn decode_bits(bytes: &[u8], format: SampleFormat, endian: Endianness) -> f64 {
    match format {
        SampleFormat::IbmFloat  => ibm_to_ieee(BigEndian::read_u32(bytes)),
        SampleFormat::IeeeFloat => f32::from_bits(read_u32(bytes, endian)) as f64,
    }
}

/// Decode one 4-byte sample.
pub fn decode_sample(bytes: [u8; 4], format: SampleFormat, endian: Endianness) -> f64 {
    decode_bits(&bytes, format, endian)
}

/// Encode one sample into its 4-byte on-disk form.
pub fn encode_sample(value: f64, format: SampleFormat, endian: Endianness) -> [u8; 4] {
    let mut out = [0u8; 4];
    match format {
        SampleFormat::IbmFloat  => BigEndian::write_u32(&mut out, ieee_to_ibm(value)),
        SampleFormat::IeeeFloat => write_u32(&mut out, (value as f32).to_bits(), endian),
    }
    out
}

/// Decode `out.len()` consecutive samples from `bytes`.
pub fn decode_samples(bytes: &[u8], format: SampleFormat, endian: Endianness, out: &mut [f64]) -> Result<()> {
    let needed = out.len() * SAMPLE_SIZE;
    if bytes.len() < needed {
        return Err(SegyError::TruncatedBuffer { offset: 0, needed });
    }
    for (dst, src) in out.iter_mut().zip(bytes.chunks_exact(SAMPLE_SIZE)) {
        *dst = decode_bits(src, format, endian);
    }
    Ok(())
}

/// Append the on-disk encoding of `samples` to `out`.
pub fn encode_samples(samples: &[f64], format: SampleFormat, endian: Endianness, out: &mut Vec<u8>) {
    out.reserve(samples.len() * SAMPLE_SIZE);
    for &v in samples {
        out.extend_from_slice(&encode_sample(v, format, endian));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn ibm_one() {
        let v = decode_sample([0x41, 0x10, 0x00, 0x00], SampleFormat::IbmFloat, Endianness::Big);
        assert_eq!(v, 1.0);
        assert_eq!(ieee_to_ibm(1.0), 0x4110_0000);
    }

    #[test]
    fn ibm_known_values() {
        assert_eq!(ibm_to_ieee(0xC276_A000), -118.625);
        assert_eq!(ieee_to_ibm(-118.625), 0xC276_A000);
        assert_eq!(ibm_to_ieee(0x4080_0000), 0.5);
        assert_eq!(ibm_to_ieee(0), 0.0);
        assert_eq!(ieee_to_ibm(0.0), 0);
    }

    #[test]
    fn ibm_ignores_file_endianness() {
        for endian in [Endianness::Big, Endianness::Little] {
            let bytes = encode_sample(1.0, SampleFormat::IbmFloat, endian);
            assert_eq!(bytes, [0x41, 0x10, 0x00, 0x00]);
            assert_eq!(decode_sample(bytes, SampleFormat::IbmFloat, endian), 1.0);
        }
        let mut out = [0f64; 1];
        decode_samples(&[0xC2, 0x76, 0xA0, 0x00], SampleFormat::IbmFloat, Endianness::Little, &mut out).unwrap();
        assert_eq!(out, [-118.625]);
    }

    #[test]
    fn ibm_saturates_and_flushes() {
        assert_eq!(ieee_to_ibm(f64::INFINITY), 0x7FFF_FFFF);
        assert_eq!(ieee_to_ibm(f64::NEG_INFINITY), 0xFFFF_FFFF);
        assert_eq!(ieee_to_ibm(1e300), 0x7FFF_FFFF);
        assert_eq!(ieee_to_ibm(1e-300), 0);
        assert_eq!(ieee_to_ibm(f64::NAN), 0);
    }

    #[test]
    fn rounding_carry_bumps_exponent() {
        // Just below 1.0: rounds up to exactly 1.0.
        let v = 1.0 - 2f64.powi(-30);
        assert_eq!(ieee_to_ibm(v), 0x4110_0000);
    }

    #[test]
    fn format_codes() {
        assert_eq!(SampleFormat::from_code(1).unwrap(), SampleFormat::IbmFloat);
        assert_eq!(SampleFormat::from_code(5).unwrap(), SampleFormat::IeeeFloat);
        assert!(matches!(SampleFormat::from_code(3), Err(SegyError::UnsupportedSampleFormat(3))));
    }

    #[test]
    fn slice_helpers() {
        let values = [1.5, -2.25, 0.0, 1024.0];
        let mut bytes = Vec::new();
        encode_samples(&values, SampleFormat::IbmFloat, Endianness::Big, &mut bytes);
        assert_eq!(bytes.len(), 16);
        let mut out = [0f64; 4];
        decode_samples(&bytes, SampleFormat::IbmFloat, Endianness::Big, &mut out).unwrap();
        assert_eq!(out, values);
    }

    proptest! {
        #[test]
        fn ieee_path_is_exact(bits in any::<u32>(), little in any::<bool>()) {
            let x = f32::from_bits(bits);
            prop_assume!(!x.is_nan());
            let endian = if little { Endianness::Little } else { Endianness::Big };
            let mut raw = [0u8; 4];
            write_u32(&mut raw, bits, endian);
            let v = decode_sample(raw, SampleFormat::IeeeFloat, endian);
            prop_assert_eq!(encode_sample(v, SampleFormat::IeeeFloat, endian), raw);
        }

        #[test]
        fn ibm_path_within_precision(x in -1.0e30f64..1.0e30f64) {
            prop_assume!(x.abs() > 1.0e-30);
            let back = ibm_to_ieee(ieee_to_ibm(x));
            prop_assert!((back - x).abs() <= x.abs() * 2f64.powi(-20));
        }

        #[test]
        fn ibm_values_are_fixed_points(exp in 8u32..120, frac in 1u32..0x0100_0000, neg in any::<bool>()) {
            let bits = (u32::from(neg) << 31) | (exp << 24) | frac;
            let v = ibm_to_ieee(bits);
            prop_assert_eq!(ibm_to_ieee(ieee_to_ibm(v)), v);
        }
    }
}
