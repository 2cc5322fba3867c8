//! Opcode set and bytecode wire format.
//!
//! One opcode byte followed by zero or more operand bytes. The only
//! operand shape defined so far is a 4-byte unsigned little-endian index.
//! This is the format a compiler collaborator emits ([`BytecodeBuilder`])
//! and a disassembler parses ([`decode_at`], [`BytecodeDecoder`]).

use core::fmt;

use num_enum::{IntoPrimitive, TryFromPrimitive};
use strum_macros::{Display as StrumDisplay, IntoStaticStr};
use thiserror::Error;

/// Bytecode opcodes.
///
/// The numbering is sparse: the gaps belong to instructions (further push
/// variants, stores, sends, jumps) that are not defined yet. An undefined
/// byte decodes to [`DecodeError::UnknownOpcode`] until the instruction
/// exists. Every new opcode must declare its operand width here and keep
/// the interpreter's all-or-nothing stepping rule.
#[derive(
    StrumDisplay,
    IntoStaticStr,
    TryFromPrimitive,
    IntoPrimitive,
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
)]
#[repr(u8)]
pub enum Opcode {
    /// Push a literal-pool entry. Operand: `index:u32` little-endian.
    PushLiteral = 0,
    /// Push the activation's receiver.
    PushSelf = 3,
    /// Discard the top of the operand stack.
    Pop = 11,
}

impl Opcode {
    /// Operand bytes following the opcode byte.
    pub const fn operand_width(self) -> usize {
        match self {
            Opcode::PushLiteral => 4,
            Opcode::PushSelf | Opcode::Pop => 0,
        }
    }

    /// Total encoded width, opcode byte included.
    pub const fn width(self) -> usize {
        1 + self.operand_width()
    }
}

/// A decoded instruction with its operands resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Instruction {
    PushLiteral { index: u32 },
    PushSelf,
    Pop,
}

impl Instruction {
    pub const fn opcode(self) -> Opcode {
        match self {
            Instruction::PushLiteral { .. } => Opcode::PushLiteral,
            Instruction::PushSelf => Opcode::PushSelf,
            Instruction::Pop => Opcode::Pop,
        }
    }

    pub const fn width(self) -> usize {
        self.opcode().width()
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Instruction::PushLiteral { index } => {
                write!(f, "PushLiteral #{index}")
            }
            Instruction::PushSelf => write!(f, "PushSelf"),
            Instruction::Pop => write!(f, "Pop"),
        }
    }
}

/// Failure to decode one instruction from a byte stream.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum DecodeError {
    #[error("unknown opcode {opcode:#04x} at byte offset {offset}")]
    UnknownOpcode { opcode: u8, offset: usize },

    #[error(
        "truncated {opcode} at byte offset {offset}: \
         needs {needed} operand bytes, {remaining} remain"
    )]
    TruncatedOperand {
        opcode: Opcode,
        offset: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("byte offset {offset} is past the end of the {len}-byte stream")]
    OutOfBounds { offset: usize, len: usize },
}

/// Decode the instruction at `offset`.
///
/// Returns the instruction and the offset of the next one. Multi-byte
/// operands are read as exactly 4 little-endian unsigned bytes; if fewer
/// remain, the instruction is truncated and nothing is consumed.
pub fn decode_at(
    bytes: &[u8],
    offset: usize,
) -> Result<(Instruction, usize), DecodeError> {
    let Some(&byte) = bytes.get(offset) else {
        return Err(DecodeError::OutOfBounds {
            offset,
            len: bytes.len(),
        });
    };

    let opcode = Opcode::try_from(byte).map_err(|_| {
        DecodeError::UnknownOpcode {
            opcode: byte,
            offset,
        }
    })?;

    let needed = opcode.operand_width();
    let remaining = bytes.len() - (offset + 1);
    if remaining < needed {
        return Err(DecodeError::TruncatedOperand {
            opcode,
            offset,
            needed,
            remaining,
        });
    }

    let instruction = match opcode {
        Opcode::PushLiteral => {
            let mut operand = [0u8; 4];
            operand.copy_from_slice(&bytes[offset + 1..offset + 5]);
            Instruction::PushLiteral {
                index: u32::from_le_bytes(operand),
            }
        }
        Opcode::PushSelf => Instruction::PushSelf,
        Opcode::Pop => Instruction::Pop,
    };

    Ok((instruction, offset + opcode.width()))
}

/// Streaming decoder over a byte slice, for disassembly.
///
/// Yields instructions until the stream ends; a decode failure is yielded
/// once and ends the stream.
pub struct BytecodeDecoder<'a> {
    bytes: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> BytecodeDecoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self {
            bytes,
            offset: 0,
            failed: false,
        }
    }

    /// Byte offset of the next instruction.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl Iterator for BytecodeDecoder<'_> {
    type Item = Result<Instruction, DecodeError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.offset >= self.bytes.len() {
            return None;
        }
        match decode_at(self.bytes, self.offset) {
            Ok((instruction, next)) => {
                self.offset = next;
                Some(Ok(instruction))
            }
            Err(err) => {
                self.failed = true;
                Some(Err(err))
            }
        }
    }
}

/// Builds a bytecode byte sequence in the wire format.
pub struct BytecodeBuilder {
    buf: Vec<u8>,
}

impl BytecodeBuilder {
    pub fn new() -> Self {
        Self { buf: Vec::new() }
    }

    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: Vec::with_capacity(capacity),
        }
    }

    /// Current byte offset in the bytecode stream.
    pub fn current_offset(&self) -> usize {
        self.buf.len()
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.buf
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    // ── emit helpers ───────────────────────────────────────────────

    fn emit_op(&mut self, op: Opcode) {
        self.buf.push(op.into());
    }

    fn emit_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_le_bytes());
    }

    /// `PushLiteral <index:u32>` — push a literal-pool entry.
    pub fn push_literal(&mut self, index: u32) {
        self.emit_op(Opcode::PushLiteral);
        self.emit_u32(index);
    }

    /// `PushSelf` — push the receiver.
    pub fn push_self(&mut self) {
        self.emit_op(Opcode::PushSelf);
    }

    /// `Pop` — discard the stack top.
    pub fn pop(&mut self) {
        self.emit_op(Opcode::Pop);
    }
}

impl Default for BytecodeBuilder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decode_all(bytes: &[u8]) -> Vec<Instruction> {
        BytecodeDecoder::new(bytes)
            .collect::<Result<Vec<_>, _>>()
            .expect("stream decodes cleanly")
    }

    #[test]
    fn opcode_bytes_match_wire_format() {
        assert_eq!(u8::from(Opcode::PushLiteral), 0);
        assert_eq!(u8::from(Opcode::PushSelf), 3);
        assert_eq!(u8::from(Opcode::Pop), 11);
        assert_eq!(Opcode::try_from(0), Ok(Opcode::PushLiteral));
        assert!(Opcode::try_from(1).is_err(), "gap bytes are undefined");
        assert!(Opcode::try_from(0xFF).is_err());
    }

    #[test]
    fn widths() {
        assert_eq!(Opcode::PushLiteral.width(), 5);
        assert_eq!(Opcode::PushSelf.width(), 1);
        assert_eq!(Opcode::Pop.width(), 1);
    }

    #[test]
    fn push_literal_encodes_little_endian() {
        let mut b = BytecodeBuilder::new();
        b.push_literal(0x0102_0304);
        assert_eq!(b.as_bytes(), &[0, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn builder_decoder_roundtrip() {
        let mut b = BytecodeBuilder::new();
        b.push_literal(0);
        b.push_self();
        b.pop();
        b.push_literal(42);
        assert_eq!(b.current_offset(), 12);

        assert_eq!(
            decode_all(&b.into_bytes()),
            vec![
                Instruction::PushLiteral { index: 0 },
                Instruction::PushSelf,
                Instruction::Pop,
                Instruction::PushLiteral { index: 42 },
            ]
        );
    }

    #[test]
    fn decode_at_reports_next_offset() {
        let mut b = BytecodeBuilder::new();
        b.push_literal(7);
        b.pop();
        let bytes = b.into_bytes();

        let (instr, next) = decode_at(&bytes, 0).unwrap();
        assert_eq!(instr, Instruction::PushLiteral { index: 7 });
        assert_eq!(next, 5);

        let (instr, next) = decode_at(&bytes, 5).unwrap();
        assert_eq!(instr, Instruction::Pop);
        assert_eq!(next, 6);
    }

    #[test]
    fn unknown_opcode_fails() {
        let err = decode_at(&[7], 0).unwrap_err();
        assert_eq!(
            err,
            DecodeError::UnknownOpcode {
                opcode: 7,
                offset: 0
            }
        );
    }

    #[test]
    fn truncated_operand_fails() {
        // PushLiteral with only 2 of its 4 operand bytes.
        let err = decode_at(&[0, 0xAA, 0xBB], 0).unwrap_err();
        assert_eq!(
            err,
            DecodeError::TruncatedOperand {
                opcode: Opcode::PushLiteral,
                offset: 0,
                needed: 4,
                remaining: 2
            }
        );
    }

    #[test]
    fn out_of_bounds_offset_fails() {
        let err = decode_at(&[11], 1).unwrap_err();
        assert_eq!(err, DecodeError::OutOfBounds { offset: 1, len: 1 });
    }

    #[test]
    fn decoder_stops_after_error() {
        let mut decoder = BytecodeDecoder::new(&[3, 0xFF, 11]);
        assert_eq!(decoder.next(), Some(Ok(Instruction::PushSelf)));
        assert!(matches!(
            decoder.next(),
            Some(Err(DecodeError::UnknownOpcode {
                opcode: 0xFF,
                offset: 1
            }))
        ));
        assert_eq!(decoder.next(), None);
    }

    #[test]
    fn display_instructions() {
        assert_eq!(
            Instruction::PushLiteral { index: 5 }.to_string(),
            "PushLiteral #5"
        );
        assert_eq!(Instruction::PushSelf.to_string(), "PushSelf");
        assert_eq!(Instruction::Pop.to_string(), "Pop");
        assert_eq!(Opcode::PushLiteral.to_string(), "PushLiteral");
    }
}
