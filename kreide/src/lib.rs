mod arrays;
mod bytearrays;
pub mod bytecode;
mod contexts;
mod header;
mod heap;
pub mod interpreter;
mod methods;
mod value;

pub use arrays::Array;
pub use bytearrays::ByteArray;
pub use bytecode::{
    BytecodeBuilder, BytecodeDecoder, DecodeError, Instruction, Opcode,
    decode_at,
};
pub use contexts::Context;
pub use header::{Header, HeaderFlags, ObjectType};
pub use heap::Heap;
pub use interpreter::{
    StepError, instruction_pointer, stack_depth, stack_top, stack_values,
    step,
};
pub use methods::CompiledMethod;
pub use value::{Value, ValueTag};
