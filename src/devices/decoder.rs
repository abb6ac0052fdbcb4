// 寄存器值解码
// Raw register words to typed values, and typed values to published item values

use super::registers::{Parameter, ValueKind};
use crate::types::{BypassState, ItemValue, UnitMode};
use std::fmt;

/// Result of one register read
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum DecodedValue {
    Integer(u16),
    /// Already rounded to two decimals
    Temperature(f64),
}

impl fmt::Display for DecodedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DecodedValue::Integer(v) => write!(f, "{}", v),
            DecodedValue::Temperature(v) => write!(f, "{:.2}", v),
        }
    }
}

/// Decoding failures
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DecodeError {
    #[error("expected {expected} register(s), got {actual}")]
    WrongLength { expected: usize, actual: usize },
}

/// Join two registers, high word first, into an IEEE754 single
pub fn f32_from_be_words(high: u16, low: u16) -> f32 {
    f32::from_bits(((high as u32) << 16) | low as u32)
}

/// Split a float into the two words the unit stores, high word first
pub fn f32_to_be_words(value: f32) -> [u16; 2] {
    let bits = value.to_bits();
    [(bits >> 16) as u16, bits as u16]
}

/// Round to two decimals on the exact binary value, ties to even
pub fn round2(value: f64) -> f64 {
    format!("{:.2}", value).parse().unwrap_or(value)
}

/// Decode the words read for a value of the given kind
pub fn decode(kind: ValueKind, words: &[u16]) -> Result<DecodedValue, DecodeError> {
    let expected = kind.register_count() as usize;
    if words.len() != expected {
        return Err(DecodeError::WrongLength {
            expected,
            actual: words.len(),
        });
    }
    match kind {
        ValueKind::UInt16 => Ok(DecodedValue::Integer(words[0])),
        ValueKind::Float32BigEndianDualRegister => {
            let value = f32_from_be_words(words[0], words[1]) as f64;
            Ok(DecodedValue::Temperature(round2(value)))
        }
    }
}

/// Map a decoded reading to the value published on the bound item.
///
/// `None` means the item is left unchanged for this cycle.
pub fn translate(parameter: Parameter, value: DecodedValue) -> Option<ItemValue> {
    match (parameter, value) {
        (Parameter::WeekProgramNumber, DecodedValue::Integer(raw)) => {
            Some(ItemValue::Int(raw as i64 + 1))
        }
        (Parameter::UnitMode, DecodedValue::Integer(raw)) => UnitMode::from_raw(raw)
            .label()
            .map(|label| ItemValue::Text(label.to_string())),
        (Parameter::BypassActualState, DecodedValue::Integer(raw)) => BypassState::from_raw(raw)
            .label()
            .map(|label| ItemValue::Text(label.to_string())),
        (_, DecodedValue::Integer(raw)) => Some(ItemValue::Int(raw as i64)),
        (_, DecodedValue::Temperature(t)) => Some(ItemValue::Float(t)),
    }
}
