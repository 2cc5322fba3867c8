//! The stepping engine: advance a context by exactly one instruction.

use log::trace;
use thiserror::Error;

use crate::bytecode::{self, DecodeError, Instruction};
use crate::{Heap, Value};

/// Why a step did not complete.
///
/// Every variant is reported to the immediate caller and is recoverable:
/// the activation cannot proceed, the process can. A failed step leaves
/// the context exactly as it was, so retrying yields the same result.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum StepError {
    #[error("context reference does not resolve to a context object")]
    InvalidContext,

    #[error("method slot does not resolve to a compiled method")]
    InvalidMethod,

    #[error("method's bytes slot does not resolve to a byte array")]
    MissingBytecode,

    #[error("method's literals slot does not resolve to an array")]
    MissingLiterals,

    #[error("context's stack slot does not resolve to an array")]
    MissingStack,

    /// The instruction pointer is at or past the end of the bytecode.
    /// This is the normal end-of-activation signal rather than a defect
    /// in the method; callers that drive a context to completion stop on
    /// it (see [`StepError::is_exhausted`]).
    #[error(
        "instruction pointer {ip} is past the end of the {len}-byte bytecode"
    )]
    BytecodeExhausted { ip: usize, len: usize },

    #[error("unknown opcode {opcode:#04x} at instruction pointer {ip}")]
    UnknownOpcode { opcode: u8, ip: usize },

    #[error(
        "truncated instruction at {ip}: \
         {needed} operand bytes needed, {remaining} remain"
    )]
    TruncatedInstruction {
        ip: usize,
        needed: usize,
        remaining: usize,
    },

    #[error("literal index {index} out of range for a pool of {len}")]
    LiteralOutOfRange { index: u32, len: usize },

    #[error("pop on an empty operand stack")]
    StackUnderflow,
}

impl StepError {
    /// Whether this is the ran-off-the-end condition, the signal that the
    /// activation should return to its sender, as opposed to a malformed
    /// method or a violated stack discipline.
    pub const fn is_exhausted(self) -> bool {
        matches!(self, StepError::BytecodeExhausted { .. })
    }
}

/// Execute exactly one instruction of `context`.
///
/// Either the instruction's full effect is applied and the instruction
/// pointer advances by the instruction's exact byte width, or the context
/// is left completely unchanged and the failure is reported. No
/// instruction is ever partially applied.
pub fn step(heap: &mut Heap, context: Value) -> Result<(), StepError> {
    let ctx = heap.context(context).ok_or(StepError::InvalidContext)?;
    let method_value = ctx.method();
    let receiver = ctx.receiver();
    let stack_value = ctx.stack();
    let ip = ctx.instruction_offset() as usize;

    let method = heap.method(method_value).ok_or(StepError::InvalidMethod)?;
    let literals_value = method.literals();
    let bytes = heap
        .byte_array(method.bytes())
        .ok_or(StepError::MissingBytecode)?;
    let len = bytes.len();
    if ip >= len {
        return Err(StepError::BytecodeExhausted { ip, len });
    }

    let (instruction, next_ip) = bytecode::decode_at(bytes.as_bytes(), ip)
        .map_err(|err| match err {
            DecodeError::UnknownOpcode { opcode, .. } => {
                StepError::UnknownOpcode { opcode, ip }
            }
            DecodeError::TruncatedOperand {
                needed, remaining, ..
            } => StepError::TruncatedInstruction {
                ip,
                needed,
                remaining,
            },
            DecodeError::OutOfBounds { .. } => {
                StepError::BytecodeExhausted { ip, len }
            }
        })?;

    trace!("step at {ip}: {instruction}");

    // Every check precedes the first mutation: a failing step must leave
    // the stack and instruction pointer exactly as they were.
    match instruction {
        Instruction::PushLiteral { index } => {
            let literals = heap
                .array(literals_value)
                .ok_or(StepError::MissingLiterals)?;
            let literal = literals.get(index as usize).ok_or(
                StepError::LiteralOutOfRange {
                    index,
                    len: literals.len(),
                },
            )?;
            let stack = heap
                .array_mut(stack_value)
                .ok_or(StepError::MissingStack)?;
            stack.push(literal);
        }
        Instruction::PushSelf => {
            let stack = heap
                .array_mut(stack_value)
                .ok_or(StepError::MissingStack)?;
            stack.push(receiver);
        }
        Instruction::Pop => {
            let stack = heap
                .array_mut(stack_value)
                .ok_or(StepError::MissingStack)?;
            stack.pop().ok_or(StepError::StackUnderflow)?;
        }
    }

    let ctx = heap.context_mut(context).ok_or(StepError::InvalidContext)?;
    ctx.set_instruction_offset(next_ip as u32);
    Ok(())
}

// ── observation ────────────────────────────────────────────────────
//
// Read access for callers and tests; none of these mutate.

pub fn instruction_pointer(heap: &Heap, context: Value) -> Option<u32> {
    Some(heap.context(context)?.instruction_offset())
}

pub fn stack_depth(heap: &Heap, context: Value) -> Option<usize> {
    Some(heap.context_stack(context)?.len())
}

pub fn stack_top(heap: &Heap, context: Value) -> Option<Value> {
    heap.context_stack(context)?.back()
}

pub fn stack_values(heap: &Heap, context: Value) -> Option<Vec<Value>> {
    Some(heap.context_stack(context)?.fields().to_vec())
}
