// Pluggit AP310 寄存器表
// Named parameters of the ventilation unit and where they live.
//
// The PDU addresses registers starting at zero, so every address below is one
// less than the holding register number in the vendor documentation
// (e.g. holding register 40169 is addressed as 168).

use std::fmt;
use std::str::FromStr;

/// How a parameter is encoded in the register bank
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    /// One register holding the unsigned value directly
    UInt16,
    /// Two consecutive registers forming a big-endian IEEE754 float,
    /// read through the secondary station id
    Float32BigEndianDualRegister,
}

impl ValueKind {
    /// Number of registers occupied by a value of this kind
    pub fn register_count(&self) -> u16 {
        match self {
            ValueKind::UInt16 => 1,
            ValueKind::Float32BigEndianDualRegister => 2,
        }
    }
}

/// Readable parameters of the unit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Parameter {
    /// Outdoor air temperature, °C
    T1,
    /// Supply air temperature, °C
    T2,
    /// Extract air temperature, °C
    T3,
    /// Exhaust air temperature, °C
    T4,
    UnitMode,
    BypassActualState,
    /// Manual fan speed level 0-4
    FanSpeedLevel,
    /// Active week program, zero-based on the device
    WeekProgramNumber,
    /// Remaining filter lifetime in days
    FilterRemainingTime,
    /// VOC sensor value in ppm, 0 when no sensor is installed
    Voc,
    /// Minimum outdoor temperature for opening the bypass, °C
    BypassTmin,
    /// Maximum outdoor temperature for opening the bypass, °C
    BypassTmax,
}

/// Entry of the register map
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Register {
    pub parameter: Parameter,
    /// Zero-based PDU address
    pub address: u16,
    pub kind: ValueKind,
}

/// Error returned when a name is not in the register map
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown parameter '{0}'")]
pub struct UnknownParameter(pub String);

impl Parameter {
    pub const ALL: [Parameter; 12] = [
        Parameter::T1,
        Parameter::T2,
        Parameter::T3,
        Parameter::T4,
        Parameter::UnitMode,
        Parameter::BypassActualState,
        Parameter::FanSpeedLevel,
        Parameter::Voc,
        Parameter::BypassTmin,
        Parameter::BypassTmax,
        Parameter::WeekProgramNumber,
        Parameter::FilterRemainingTime,
    ];

    /// Look a parameter up by its short or vendor name
    pub fn lookup(name: &str) -> Result<Parameter, UnknownParameter> {
        Parameter::ALL
            .iter()
            .copied()
            .find(|p| p.name() == name || p.vendor_name() == name)
            .ok_or_else(|| UnknownParameter(name.to_string()))
    }

    pub fn register(&self) -> Register {
        use ValueKind::*;
        let (address, kind) = match self {
            Parameter::T1 => (133, Float32BigEndianDualRegister),
            Parameter::T2 => (135, Float32BigEndianDualRegister),
            Parameter::T3 => (137, Float32BigEndianDualRegister),
            Parameter::T4 => (139, Float32BigEndianDualRegister),
            Parameter::UnitMode => (168, UInt16),
            Parameter::BypassActualState => (198, UInt16),
            Parameter::FanSpeedLevel => (324, UInt16),
            Parameter::Voc => (430, UInt16),
            Parameter::BypassTmin => (444, Float32BigEndianDualRegister),
            Parameter::BypassTmax => (446, Float32BigEndianDualRegister),
            Parameter::WeekProgramNumber => (466, UInt16),
            Parameter::FilterRemainingTime => (554, UInt16),
        };
        Register {
            parameter: *self,
            address,
            kind,
        }
    }

    pub fn address(&self) -> u16 {
        self.register().address
    }

    pub fn kind(&self) -> ValueKind {
        self.register().kind
    }

    pub fn name(&self) -> &'static str {
        match self {
            Parameter::T1 => "T1",
            Parameter::T2 => "T2",
            Parameter::T3 => "T3",
            Parameter::T4 => "T4",
            Parameter::UnitMode => "UnitMode",
            Parameter::BypassActualState => "BypassActualState",
            Parameter::FanSpeedLevel => "FanSpeedLevel",
            Parameter::Voc => "Voc",
            Parameter::BypassTmin => "BypassTmin",
            Parameter::BypassTmax => "BypassTmax",
            Parameter::WeekProgramNumber => "WeekProgramNumber",
            Parameter::FilterRemainingTime => "FilterRemainingTime",
        }
    }

    /// Parameter name used in the vendor register list
    pub fn vendor_name(&self) -> &'static str {
        match self {
            Parameter::T1 => "prmRamIdxT1",
            Parameter::T2 => "prmRamIdxT2",
            Parameter::T3 => "prmRamIdxT3",
            Parameter::T4 => "prmRamIdxT4",
            Parameter::UnitMode => "prmRamIdxUnitMode",
            Parameter::BypassActualState => "prmRamIdxBypassActualState",
            Parameter::FanSpeedLevel => "prmRomIdxSpeedLevel",
            Parameter::Voc => "prmVOC",
            Parameter::BypassTmin => "prmBypassTmin",
            Parameter::BypassTmax => "prmBypassTmax",
            Parameter::WeekProgramNumber => "prmNumOfWeekProgram",
            Parameter::FilterRemainingTime => "prmFilterRemainingTime",
        }
    }
}

impl FromStr for Parameter {
    type Err = UnknownParameter;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Parameter::lookup(s)
    }
}

impl fmt::Display for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
