//! The per-request user-data bag.
//!
//! Middleware publishes parsed artifacts (a JSON body, request cookies)
//! here for later handlers in the chain. The bag is keyed by type rather
//! than by string, so each middleware defines a newtype for what it stores
//! and lookups stay spelled-out and collision-free.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;

/// A type-keyed map of request-scoped values.
#[derive(Default)]
pub struct Extensions {
    map: HashMap<TypeId, Box<dyn Any + Send + Sync>>,
}

impl Extensions {
    /// Creates an empty bag.
    pub fn new() -> Extensions {
        Extensions::default()
    }

    /// Stores a value, returning the previous value of the same type.
    pub fn insert<T: Send + Sync + 'static>(&mut self, value: T) -> Option<T> {
        self.map
            .insert(TypeId::of::<T>(), Box::new(value))
            .and_then(|boxed| boxed.downcast().ok())
            .map(|boxed| *boxed)
    }

    /// Borrows the stored value of a type.
    pub fn get<T: Send + Sync + 'static>(&self) -> Option<&T> {
        self.map
            .get(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_ref())
    }

    /// Mutably borrows the stored value of a type.
    pub fn get_mut<T: Send + Sync + 'static>(&mut self) -> Option<&mut T> {
        self.map
            .get_mut(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast_mut())
    }

    /// Removes and returns the stored value of a type.
    pub fn remove<T: Send + Sync + 'static>(&mut self) -> Option<T> {
        self.map
            .remove(&TypeId::of::<T>())
            .and_then(|boxed| boxed.downcast().ok())
            .map(|boxed| *boxed)
    }

    /// Drops every stored value; used when a request is reset for
    /// pipelining.
    pub fn clear(&mut self) {
        self.map.clear();
    }

    /// The number of stored values.
    pub fn len(&self) -> usize {
        self.map.len()
    }

    /// Whether the bag is empty.
    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

// The contents are type-erased; all Debug can say is how many there are.
impl fmt::Debug for Extensions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extensions")
            .field("len", &self.len())
            .finish()
    }
}
