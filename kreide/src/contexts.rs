use crate::Value;

/// One activation of a compiled method.
///
/// ```text
/// [method 8B] [receiver 8B] [stack 8B] [instruction_pointer 8B]
/// ```
///
/// Slot-only object like [`CompiledMethod`](crate::CompiledMethod).
/// `method` and `receiver` are fixed for the activation's lifetime;
/// `stack` (a Pointer to the operand-stack [`Array`](crate::Array)) and
/// `instruction_pointer` (a tagged integer byte offset) are mutated only
/// by the interpreter driving this context.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Context {
    method: Value,
    receiver: Value,
    stack: Value,
    instruction_pointer: Value,
}

const _: () = assert!(size_of::<Context>() == 4 * size_of::<Value>());

impl Context {
    /// A fresh activation: instruction pointer at 0, operand stack as
    /// given (callers allocate it empty).
    pub fn new(method: Value, receiver: Value, stack: Value) -> Self {
        Self {
            method,
            receiver,
            stack,
            instruction_pointer: Value::from_i64(0),
        }
    }

    #[inline]
    pub fn method(&self) -> Value {
        self.method
    }

    #[inline]
    pub fn receiver(&self) -> Value {
        self.receiver
    }

    #[inline]
    pub fn stack(&self) -> Value {
        self.stack
    }

    #[inline]
    pub fn instruction_pointer(&self) -> Value {
        self.instruction_pointer
    }

    #[inline]
    pub fn set_stack(&mut self, stack: Value) {
        self.stack = stack;
    }

    #[inline]
    pub fn set_instruction_pointer(&mut self, ip: Value) {
        self.instruction_pointer = ip;
    }

    /// The instruction pointer as an unsigned byte offset.
    ///
    /// A slot that is not a tagged integer, is negative, or exceeds
    /// `u32::MAX` reads as 0.
    pub fn instruction_offset(&self) -> u32 {
        if !self.instruction_pointer.is_integer() {
            return 0;
        }
        let value = self.instruction_pointer.to_i64();
        if value < 0 || value > u32::MAX as i64 {
            return 0;
        }
        value as u32
    }

    pub fn set_instruction_offset(&mut self, ip: u32) {
        self.instruction_pointer = Value::from_i64(ip as i64);
    }
}
