// 设备模块 - Pluggit 通风设备
// Register map and value decoding for the ventilation unit

pub mod decoder;
pub mod registers;

// 重新导出主要类型，方便外部使用
pub use decoder::{decode, translate, DecodeError, DecodedValue};
pub use registers::{Parameter, Register, UnknownParameter, ValueKind};
