//! Lexical environments: a chain of frames, each mapping names to values
//! with an optional parent.
//!
//! Environments are shared (`Rc<RefCell<_>>`) because closures keep the
//! frame that was active at their `def` alive after the enclosing block
//! exits. Frames point only at parents, never at children, so the chain is
//! a tree.

use std::{cell::RefCell, rc::Rc};

use ahash::AHashMap;

use crate::value::Value;

/// Shared handle to an environment frame.
pub(crate) type EnvRef = Rc<RefCell<Env>>;

/// One environment frame.
pub(crate) struct Env {
    values: AHashMap<String, Value>,
    pub(crate) parent: Option<EnvRef>,
}

impl Env {
    /// Creates a root frame with no parent.
    pub(crate) fn root() -> EnvRef {
        Rc::new(RefCell::new(Self {
            values: AHashMap::new(),
            parent: None,
        }))
    }

    /// Creates a child frame of `parent`.
    pub(crate) fn child(parent: &EnvRef) -> EnvRef {
        Rc::new(RefCell::new(Self {
            values: AHashMap::new(),
            parent: Some(Rc::clone(parent)),
        }))
    }

    /// Unconditionally binds `name` in this frame, shadowing any outer
    /// binding of the same name.
    pub(crate) fn define(&mut self, name: impl Into<String>, value: Value) {
        self.values.insert(name.into(), value);
    }

    /// Looks `name` up, walking parent frames; the innermost binding wins.
    pub(crate) fn get(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.values.get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|p| p.borrow().get(name))
    }

    /// Updates the nearest frame that already binds `name`.
    ///
    /// Returns `false` when no frame in the chain binds it; the caller
    /// decides whether that is an error or a fresh `define`.
    pub(crate) fn set(&mut self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.values.get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.parent {
            Some(parent) => parent.borrow_mut().set(name, value),
            None => false,
        }
    }
}
