use log::debug;

use crate::{
    Array, ByteArray, CompiledMethod, Context, Header, ObjectType, Value,
};

/// Arena addresses are object handles scaled to look like aligned heap
/// addresses: entry `i` lives at `(i + 1) << 3`. Every address is nonzero
/// and 8-byte aligned, so it tags directly into a Pointer [`Value`] and
/// can never collide with `nil`.
const ADDRESS_SHIFT: u64 = 3;
const ADDRESS_ALIGN: u64 = 1 << ADDRESS_SHIFT;

struct HeapEntry {
    header: Header,
    body: ObjectBody,
}

enum ObjectBody {
    Array(Array),
    ByteArray(ByteArray),
    Method(CompiledMethod),
    Context(Context),
}

/// The object memory: a contiguous store of heap objects referenced by
/// stable handles.
///
/// Objects are reachable only through Pointer-tagged values handed out by
/// the `alloc_*` constructors. The arena owns every object for the
/// program's lifetime; collection and compaction belong to a future
/// component, so no address is ever reused or invalidated.
///
/// Resolution is typed: asking for the wrong object kind, passing `nil`,
/// a non-pointer value, or an address this arena never issued yields
/// `None`, never a wrong object.
pub struct Heap {
    entries: Vec<HeapEntry>,
}

impl Heap {
    pub fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Number of live objects.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    // ── address mapping ────────────────────────────────────────────

    fn address_of(index: usize) -> u64 {
        ((index as u64) + 1) << ADDRESS_SHIFT
    }

    fn index_of(addr: u64) -> Option<usize> {
        if addr == 0 || addr % ADDRESS_ALIGN != 0 {
            return None;
        }
        Some(((addr >> ADDRESS_SHIFT) - 1) as usize)
    }

    // ── allocation ─────────────────────────────────────────────────

    fn alloc(&mut self, ty: ObjectType, body: ObjectBody) -> Value {
        let addr = Self::address_of(self.entries.len());
        self.entries.push(HeapEntry {
            header: Header::new(ty),
            body,
        });
        debug!("alloc {ty:?} at {addr:#x}");
        Value::from_pointer(addr)
    }

    pub fn alloc_array(&mut self, fields: &[Value]) -> Value {
        self.alloc(ObjectType::Array, ObjectBody::Array(Array::from_slice(fields)))
    }

    /// Allocate an array of `len` slots, each initialized to `nil`.
    pub fn alloc_array_with_len(&mut self, len: usize) -> Value {
        self.alloc(ObjectType::Array, ObjectBody::Array(Array::with_len(len)))
    }

    pub fn alloc_byte_array(&mut self, bytes: &[u8]) -> Value {
        self.alloc(
            ObjectType::ByteArray,
            ObjectBody::ByteArray(ByteArray::from_slice(bytes)),
        )
    }

    /// Allocate a byte array of `len` zero bytes.
    pub fn alloc_byte_array_with_len(&mut self, len: usize) -> Value {
        self.alloc(
            ObjectType::ByteArray,
            ObjectBody::ByteArray(ByteArray::with_len(len)),
        )
    }

    pub fn alloc_method(&mut self, method: CompiledMethod) -> Value {
        self.alloc(ObjectType::Method, ObjectBody::Method(method))
    }

    /// Loader-style construction: allocate the bytecode and literal bodies
    /// and the method referencing them in one call.
    pub fn alloc_method_with(
        &mut self,
        bytecode: &[u8],
        literals: &[Value],
        num_args: u32,
        num_temps: u32,
        primitive_number: u32,
    ) -> Value {
        let bytes = self.alloc_byte_array(bytecode);
        let literals = self.alloc_array(literals);
        self.alloc_method(CompiledMethod::new(
            bytes,
            literals,
            Value::from_i64(num_args as i64),
            Value::from_i64(num_temps as i64),
            Value::from_i64(primitive_number as i64),
        ))
    }

    /// Activate `method` on `receiver`: a fresh context with an empty
    /// operand stack and instruction pointer 0.
    pub fn alloc_context(&mut self, method: Value, receiver: Value) -> Value {
        let stack = self.alloc_array(&[]);
        self.alloc(
            ObjectType::Context,
            ObjectBody::Context(Context::new(method, receiver, stack)),
        )
    }

    // ── resolution ─────────────────────────────────────────────────

    fn entry(&self, value: Value) -> Option<&HeapEntry> {
        if !value.is_pointer() {
            return None;
        }
        let index = Self::index_of(value.to_pointer())?;
        self.entries.get(index)
    }

    fn entry_mut(&mut self, value: Value) -> Option<&mut HeapEntry> {
        if !value.is_pointer() {
            return None;
        }
        let index = Self::index_of(value.to_pointer())?;
        self.entries.get_mut(index)
    }

    pub fn object_type(&self, value: Value) -> Option<ObjectType> {
        Some(self.entry(value)?.header.object_type())
    }

    pub fn array(&self, value: Value) -> Option<&Array> {
        match &self.entry(value)?.body {
            ObjectBody::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn array_mut(&mut self, value: Value) -> Option<&mut Array> {
        match &mut self.entry_mut(value)?.body {
            ObjectBody::Array(array) => Some(array),
            _ => None,
        }
    }

    pub fn byte_array(&self, value: Value) -> Option<&ByteArray> {
        match &self.entry(value)?.body {
            ObjectBody::ByteArray(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn byte_array_mut(&mut self, value: Value) -> Option<&mut ByteArray> {
        match &mut self.entry_mut(value)?.body {
            ObjectBody::ByteArray(bytes) => Some(bytes),
            _ => None,
        }
    }

    pub fn method(&self, value: Value) -> Option<&CompiledMethod> {
        match &self.entry(value)?.body {
            ObjectBody::Method(method) => Some(method),
            _ => None,
        }
    }

    pub fn context(&self, value: Value) -> Option<&Context> {
        match &self.entry(value)?.body {
            ObjectBody::Context(context) => Some(context),
            _ => None,
        }
    }

    pub fn context_mut(&mut self, value: Value) -> Option<&mut Context> {
        match &mut self.entry_mut(value)?.body {
            ObjectBody::Context(context) => Some(context),
            _ => None,
        }
    }

    // ── method convenience accessors ───────────────────────────────

    /// Resolve a method's instruction stream.
    pub fn method_bytecode(&self, method: Value) -> Option<&ByteArray> {
        self.byte_array(self.method(method)?.bytes())
    }

    /// Resolve a method's literal pool.
    pub fn method_literals(&self, method: Value) -> Option<&Array> {
        self.array(self.method(method)?.literals())
    }

    pub fn bytecode_size(&self, method: Value) -> Option<usize> {
        Some(self.method_bytecode(method)?.len())
    }

    /// Bounds failures propagate from the byte array itself.
    pub fn bytecode_at(&self, method: Value, index: usize) -> Option<u8> {
        self.method_bytecode(method)?.get(index)
    }

    pub fn literal_count(&self, method: Value) -> Option<usize> {
        Some(self.method_literals(method)?.len())
    }

    pub fn literal_at(&self, method: Value, index: usize) -> Option<Value> {
        self.method_literals(method)?.get(index)
    }

    // ── context convenience accessors ──────────────────────────────

    /// Resolve a context's operand stack.
    pub fn context_stack(&self, context: Value) -> Option<&Array> {
        self.array(self.context(context)?.stack())
    }

    pub fn context_stack_mut(&mut self, context: Value) -> Option<&mut Array> {
        let stack = self.context(context)?.stack();
        self.array_mut(stack)
    }
}

impl Default for Heap {
    fn default() -> Self {
        Self::new()
    }
}
