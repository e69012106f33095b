//! Register cells and the named register set exposed to external queriers.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;
use sha1::{Digest, Sha1};
use trackplay_core::{RegisterValue, ValueKind};

use super::simulation::SimulationError;

/// Handle of a register inside a [`RegisterSet`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct RegisterId(usize);

impl RegisterId {
    /// Position of the register in declaration order.
    pub fn index(self) -> usize {
        self.0
    }
}

impl fmt::Display for RegisterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "register#{}", self.0)
    }
}

/// One value slot with an initial default.
///
/// Reads always succeed. Writes are only reachable from fired effects, which
/// live inside this crate.
#[derive(Debug, Clone, PartialEq)]
pub struct RegisterCell<T> {
    default: T,
    current: Option<T>,
}

impl<T: Clone> RegisterCell<T> {
    /// Creates an uninitialized cell that reads as `default`.
    pub fn new(default: T) -> Self {
        Self {
            default,
            current: None,
        }
    }

    /// Returns the last written value, or the default if never written.
    pub fn read(&self) -> T {
        self.current.as_ref().unwrap_or(&self.default).clone()
    }

    /// Returns the declared default.
    pub fn default_value(&self) -> &T {
        &self.default
    }

    /// Returns true once any effect has written the cell.
    pub fn is_written(&self) -> bool {
        self.current.is_some()
    }

    pub(crate) fn write(&mut self, value: T) {
        self.current = Some(value);
    }

    pub(crate) fn reset(&mut self) {
        self.current = None;
    }
}

#[derive(Debug, Clone)]
struct NamedRegister {
    name: String,
    kind: ValueKind,
    cell: RegisterCell<RegisterValue>,
}

/// Registers declared by a model, addressable by id or stable name.
#[derive(Debug, Clone, Default)]
pub struct RegisterSet {
    registers: Vec<NamedRegister>,
    by_name: HashMap<String, RegisterId>,
}

impl RegisterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Declares a register reading as the zero value of `kind`.
    ///
    /// # Errors
    ///
    /// - `SimulationError::DuplicateRegister` - A register with this name already exists
    pub fn declare(&mut self, name: &str, kind: ValueKind) -> Result<RegisterId, SimulationError> {
        self.declare_with_default(name, RegisterValue::default_for(kind))
    }

    /// Declares a register with an explicit default; its kind follows the default.
    ///
    /// # Errors
    ///
    /// - `SimulationError::DuplicateRegister` - A register with this name already exists
    pub fn declare_with_default(
        &mut self,
        name: &str,
        default: RegisterValue,
    ) -> Result<RegisterId, SimulationError> {
        if self.by_name.contains_key(name) {
            return Err(SimulationError::DuplicateRegister {
                name: name.to_string(),
            });
        }

        let id = RegisterId(self.registers.len());
        tracing::debug!("Declared register {name} ({}) as {id}", default.kind());
        self.registers.push(NamedRegister {
            name: name.to_string(),
            kind: default.kind(),
            cell: RegisterCell::new(default),
        });
        self.by_name.insert(name.to_string(), id);
        Ok(id)
    }

    /// Looks up a register by name.
    pub fn id(&self, name: &str) -> Option<RegisterId> {
        self.by_name.get(name).copied()
    }

    /// Returns the stable name of `id`.
    pub fn name(&self, id: RegisterId) -> Option<&str> {
        self.registers.get(id.0).map(|r| r.name.as_str())
    }

    /// Returns the value kind of `id`.
    pub fn kind(&self, id: RegisterId) -> Option<ValueKind> {
        self.registers.get(id.0).map(|r| r.kind)
    }

    /// Returns the cell behind `id`.
    pub fn cell(&self, id: RegisterId) -> Option<&RegisterCell<RegisterValue>> {
        self.registers.get(id.0).map(|r| &r.cell)
    }

    /// Reads the current value of `id`.
    ///
    /// # Errors
    ///
    /// - `SimulationError::UnknownRegister` - `id` was not issued by this set
    pub fn read(&self, id: RegisterId) -> Result<RegisterValue, SimulationError> {
        self.cell(id)
            .map(RegisterCell::read)
            .ok_or_else(|| SimulationError::UnknownRegister {
                register: id.to_string(),
            })
    }

    /// Reads the current value of the register called `name`.
    ///
    /// # Errors
    ///
    /// - `SimulationError::UnknownRegister` - No register has this name
    pub fn read_by_name(&self, name: &str) -> Result<RegisterValue, SimulationError> {
        let id = self.id(name).ok_or_else(|| SimulationError::UnknownRegister {
            register: name.to_string(),
        })?;
        self.read(id)
    }

    /// Register names in declaration order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.registers.iter().map(|r| r.name.as_str())
    }

    pub fn len(&self) -> usize {
        self.registers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registers.is_empty()
    }

    /// Checks that `value` may be written to `id`.
    ///
    /// # Errors
    ///
    /// - `SimulationError::UnknownRegister` - `id` was not issued by this set
    /// - `SimulationError::KindMismatch` - `value` has a different kind than the register
    pub fn check_write(&self, id: RegisterId, value: &RegisterValue) -> Result<(), SimulationError> {
        let register = self
            .registers
            .get(id.0)
            .ok_or_else(|| SimulationError::UnknownRegister {
                register: id.to_string(),
            })?;

        if register.kind != value.kind() {
            return Err(SimulationError::KindMismatch {
                register: register.name.clone(),
                expected: register.kind,
                found: value.kind(),
            });
        }
        Ok(())
    }

    pub(crate) fn write(&mut self, id: RegisterId, value: RegisterValue) -> Result<(), SimulationError> {
        self.check_write(id, &value)?;
        self.registers[id.0].cell.write(value);
        Ok(())
    }

    /// Copy of this set with every cell back at its default.
    pub fn cleared(&self) -> RegisterSet {
        let mut fresh = self.clone();
        for register in &mut fresh.registers {
            register.cell.reset();
        }
        fresh
    }

    /// Drops every register declared after the first `len`.
    pub(crate) fn truncate(&mut self, len: usize) {
        for register in self.registers.drain(len.min(self.registers.len())..) {
            self.by_name.remove(&register.name);
        }
    }

    /// Captures the current value of every register.
    pub fn snapshot(&self) -> RegisterSnapshot {
        let values: BTreeMap<String, RegisterValue> = self
            .registers
            .iter()
            .map(|r| (r.name.clone(), r.cell.read()))
            .collect();

        let mut hasher = Sha1::new();
        let mut buffer = Vec::new();
        for (name, value) in &values {
            buffer.clear();
            buffer.extend_from_slice(&(name.len() as u64).to_be_bytes());
            buffer.extend_from_slice(name.as_bytes());
            value.encode_canonical(&mut buffer);
            hasher.update(&buffer);
        }

        RegisterSnapshot {
            values,
            digest: hex::encode(hasher.finalize()),
        }
    }
}

/// Register values at one instant plus a digest for cheap comparison.
///
/// Equal digests mean bit-identical register contents.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RegisterSnapshot {
    pub values: BTreeMap<String, RegisterValue>,
    /// Hex SHA-1 over the canonical encoding of every name and value
    pub digest: String,
}

impl RegisterSnapshot {
    pub fn get(&self, name: &str) -> Option<&RegisterValue> {
        self.values.get(name)
    }
}
