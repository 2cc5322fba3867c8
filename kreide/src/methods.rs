use crate::Value;

/// A compiled method: bytecode, literal pool, and call shape.
///
/// ```text
/// [bytes 8B] [literals 8B] [num_args 8B] [num_temps 8B] [primitive_number 8B]
/// ```
///
/// Slot-only object: every field is a tagged [`Value`], nothing else.
/// `bytes` points to a [`ByteArray`](crate::ByteArray) holding the
/// instruction stream, `literals` to an [`Array`](crate::Array) holding
/// compile-time constants; the three counts are tagged integers. All five
/// slots are set at construction and never reassigned — the interpreter
/// treats a method body as read-only, which is what makes sharing one
/// method between re-entrant activations sound.
///
/// A `primitive_number` of zero means no primitive; a nonzero value
/// designates a primitive operation to run before the bytecode. Primitive
/// dispatch itself lives outside this core.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompiledMethod {
    bytes: Value,
    literals: Value,
    num_args: Value,
    num_temps: Value,
    primitive_number: Value,
}

const _: () = assert!(size_of::<CompiledMethod>() == 5 * size_of::<Value>());

impl CompiledMethod {
    /// Construction from already-tagged slots.
    pub fn new(
        bytes: Value,
        literals: Value,
        num_args: Value,
        num_temps: Value,
        primitive_number: Value,
    ) -> Self {
        Self {
            bytes,
            literals,
            num_args,
            num_temps,
            primitive_number,
        }
    }

    #[inline]
    pub fn bytes(&self) -> Value {
        self.bytes
    }

    #[inline]
    pub fn literals(&self) -> Value {
        self.literals
    }

    #[inline]
    pub fn num_args(&self) -> Value {
        self.num_args
    }

    #[inline]
    pub fn num_temps(&self) -> Value {
        self.num_temps
    }

    #[inline]
    pub fn primitive_number(&self) -> Value {
        self.primitive_number
    }

    /// Whether a primitive must run before the bytecode.
    #[inline]
    pub fn has_primitive(&self) -> bool {
        self.primitive_number.is_integer() && self.primitive_number.to_i64() != 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Slot-only layout: five Value slots and not a byte more. A hidden
    // native field would change the size and trip this check.
    #[test]
    fn layout_is_five_value_slots() {
        assert_eq!(size_of::<CompiledMethod>(), 40);
        assert_eq!(align_of::<CompiledMethod>(), align_of::<Value>());
    }

    #[test]
    fn slots_are_stored_as_given() {
        let m = CompiledMethod::new(
            Value::from_pointer(0x10),
            Value::from_pointer(0x20),
            Value::from_i64(2),
            Value::from_i64(3),
            Value::from_i64(0),
        );
        assert_eq!(m.bytes(), Value::from_pointer(0x10));
        assert_eq!(m.literals(), Value::from_pointer(0x20));
        assert_eq!(m.num_args().to_i64(), 2);
        assert_eq!(m.num_temps().to_i64(), 3);
        assert!(!m.has_primitive());
    }

    #[test]
    fn nonzero_primitive_number_is_reported() {
        let m = CompiledMethod::new(
            Value::nil(),
            Value::nil(),
            Value::from_i64(0),
            Value::from_i64(0),
            Value::from_i64(7),
        );
        assert!(m.has_primitive());
        assert_eq!(m.primitive_number().to_i64(), 7);
    }
}
