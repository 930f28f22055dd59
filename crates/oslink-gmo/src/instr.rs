//! Instruction tape vocabulary.
//!
//! Nonlinear rows arrive as flat postfix tapes of `(opcode, field)` pairs.
//! The opcode numbering here matches the native instruction set; the field
//! is an address into the variable or constant pool, stored one-based, or an
//! argument count, or a function code, depending on the opcode.

/// One tape instruction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Instr {
    pub opcode: i32,
    pub field: i32,
}

/// The instruction tape of one nonlinear row.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Tape {
    instrs: Vec<Instr>,
}

impl Tape {
    pub fn new(instrs: Vec<Instr>) -> Tape {
        Tape { instrs }
    }

    /// Builds a tape from `(opcode, field)` pairs.
    pub fn from_pairs(pairs: &[(i32, i32)]) -> Tape {
        Tape {
            instrs: pairs
                .iter()
                .map(|&(opcode, field)| Instr { opcode, field })
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.instrs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instrs.is_empty()
    }

    pub fn instrs(&self) -> &[Instr] {
        &self.instrs
    }
}

/// Tape opcodes, in native numbering.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpCode {
    NoOp,
    PushV,
    PushI,
    Store,
    Add,
    AddV,
    AddI,
    Sub,
    SubV,
    SubI,
    Mul,
    MulV,
    MulI,
    Div,
    DivV,
    DivI,
    UMin,
    UMinV,
    Swap,
    Header,
    StoreS,
    EquScale,
    End,
    CallArg1,
    CallArg2,
    CallArgN,
    FuncArgN,
    PushS,
    Popup,
    Arg,
    MulIAdd,
    PushZero,
}

impl OpCode {
    /// Resolves a raw opcode number.
    pub fn from_code(code: i32) -> Option<OpCode> {
        Some(match code {
            0 => OpCode::NoOp,
            1 => OpCode::PushV,
            2 => OpCode::PushI,
            3 => OpCode::Store,
            4 => OpCode::Add,
            5 => OpCode::AddV,
            6 => OpCode::AddI,
            7 => OpCode::Sub,
            8 => OpCode::SubV,
            9 => OpCode::SubI,
            10 => OpCode::Mul,
            11 => OpCode::MulV,
            12 => OpCode::MulI,
            13 => OpCode::Div,
            14 => OpCode::DivV,
            15 => OpCode::DivI,
            16 => OpCode::UMin,
            17 => OpCode::UMinV,
            18 => OpCode::Swap,
            19 => OpCode::Header,
            20 => OpCode::StoreS,
            21 => OpCode::EquScale,
            22 => OpCode::End,
            23 => OpCode::CallArg1,
            24 => OpCode::CallArg2,
            25 => OpCode::CallArgN,
            26 => OpCode::FuncArgN,
            27 => OpCode::PushS,
            28 => OpCode::Popup,
            29 => OpCode::Arg,
            30 => OpCode::MulIAdd,
            31 => OpCode::PushZero,
            _ => return None,
        })
    }

    /// The native mnemonic, for log and error messages.
    pub fn name(&self) -> &'static str {
        match self {
            OpCode::NoOp => "nlNoOp",
            OpCode::PushV => "nlPushV",
            OpCode::PushI => "nlPushI",
            OpCode::Store => "nlStore",
            OpCode::Add => "nlAdd",
            OpCode::AddV => "nlAddV",
            OpCode::AddI => "nlAddI",
            OpCode::Sub => "nlSub",
            OpCode::SubV => "nlSubV",
            OpCode::SubI => "nlSubI",
            OpCode::Mul => "nlMul",
            OpCode::MulV => "nlMulV",
            OpCode::MulI => "nlMulI",
            OpCode::Div => "nlDiv",
            OpCode::DivV => "nlDivV",
            OpCode::DivI => "nlDivI",
            OpCode::UMin => "nlUMin",
            OpCode::UMinV => "nlUMinV",
            OpCode::Swap => "nlSwap",
            OpCode::Header => "nlHeader",
            OpCode::StoreS => "nlStoreS",
            OpCode::EquScale => "nlEquScale",
            OpCode::End => "nlEnd",
            OpCode::CallArg1 => "nlCallArg1",
            OpCode::CallArg2 => "nlCallArg2",
            OpCode::CallArgN => "nlCallArgN",
            OpCode::FuncArgN => "nlFuncArgN",
            OpCode::PushS => "nlPushS",
            OpCode::Popup => "nlPopup",
            OpCode::Arg => "nlArg",
            OpCode::MulIAdd => "nlMulIAdd",
            OpCode::PushZero => "nlPushZero",
        }
    }
}

/// Intrinsic functions the decoder can express, in native numbering.
///
/// The native function table is much larger; codes outside this set raise
/// an unsupported-function error during decoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FuncCode {
    Min,
    Max,
    Sqr,
    Exp,
    Log,
    Log10,
    Sqrt,
    Abs,
    Cos,
    Sin,
    Power,
    Pi,
    Log2,
    RPower,
    Div,
    Div0,
    SlLog10,
    SqLog10,
    SlExp,
    SqExp,
    SlRec,
    SqRec,
    CvPower,
    VcPower,
    Poly,
}

impl FuncCode {
    /// Resolves a raw function code.
    pub fn from_code(code: i32) -> Option<FuncCode> {
        Some(match code {
            7 => FuncCode::Min,
            8 => FuncCode::Max,
            9 => FuncCode::Sqr,
            10 => FuncCode::Exp,
            11 => FuncCode::Log,
            12 => FuncCode::Log10,
            13 => FuncCode::Sqrt,
            14 => FuncCode::Abs,
            15 => FuncCode::Cos,
            16 => FuncCode::Sin,
            21 => FuncCode::Power,
            45 => FuncCode::Pi,
            50 => FuncCode::Log2,
            64 => FuncCode::RPower,
            66 => FuncCode::Div,
            67 => FuncCode::Div0,
            68 => FuncCode::SlLog10,
            69 => FuncCode::SqLog10,
            70 => FuncCode::SlExp,
            71 => FuncCode::SqExp,
            72 => FuncCode::SlRec,
            73 => FuncCode::SqRec,
            74 => FuncCode::CvPower,
            75 => FuncCode::VcPower,
            108 => FuncCode::Poly,
            _ => return None,
        })
    }
}
