// frame.rs
//
// The evaluation context: what the debuggee's current frame knows. The
// interpreter never reaches for process state on its own; everything comes
// through a `Frame`.

use rustc_hash::FxHashMap;

use crate::types::Type;
use crate::value::Value;

pub trait Frame {
    /// Current value of a variable visible in the frame.
    fn variable(&self, name: &str) -> Option<Value>;

    /// A named struct, class or enum type.
    fn tagged_type(&self, _name: &str) -> Option<Type> {
        None
    }

    /// Address of a variable in the debuggee's memory.
    fn address_of(&self, _name: &str) -> Option<u64> {
        None
    }

    /// Reads a value of type `ty` from the debuggee's memory.
    fn read(&self, _address: u64, _ty: &Type) -> Option<Value> {
        None
    }
}

/// A frame snapshot held entirely in memory.
#[derive(Debug, Clone, Default)]
pub struct StaticFrame {
    variables: FxHashMap<String, Value>,
    addresses: FxHashMap<String, u64>,
    types: FxHashMap<String, Type>,
    // Keyed by type too, so a record and its first field can share an address.
    memory: FxHashMap<(u64, Type), Value>,
}

impl StaticFrame {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_variable(mut self, name: impl Into<String>, value: Value) -> Self {
        self.variables.insert(name.into(), value);
        self
    }

    /// Declares a variable that also lives at `address`, so `&name` works.
    pub fn with_variable_at(mut self, name: impl Into<String>, value: Value, address: u64) -> Self {
        let name = name.into();
        self.memory.insert((address, value.ty().clone()), value.clone());
        self.addresses.insert(name.clone(), address);
        self.variables.insert(name, value);
        self
    }

    pub fn with_type(mut self, name: impl Into<String>, ty: Type) -> Self {
        self.types.insert(name.into(), ty);
        self
    }

    pub fn with_memory(mut self, address: u64, value: Value) -> Self {
        self.memory.insert((address, value.ty().clone()), value);
        self
    }
}

impl Frame for StaticFrame {
    fn variable(&self, name: &str) -> Option<Value> {
        self.variables.get(name).cloned()
    }

    fn tagged_type(&self, name: &str) -> Option<Type> {
        self.types.get(name).cloned()
    }

    fn address_of(&self, name: &str) -> Option<u64> {
        self.addresses.get(name).copied()
    }

    fn read(&self, address: u64, ty: &Type) -> Option<Value> {
        self.memory.get(&(address, ty.clone())).cloned()
    }
}
