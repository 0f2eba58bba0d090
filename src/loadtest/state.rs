//! Per-actor session state.
//!
//! A [`VirtualUserState`] belongs to exactly one virtual user. Scenario
//! actions receive it by `&mut` and address values through typed
//! [`StateKey`]s, so a key always reads back the type it was declared with.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;
use std::marker::PhantomData;

/// Typed key into a [`VirtualUserState`].
///
/// Declare keys as constants next to the scenarios that use them:
///
/// ```
/// use svcload::loadtest::state::{StateKey, VirtualUserState};
///
/// const USER_IDS: StateKey<Vec<i64>> = StateKey::new("user_ids");
///
/// let mut state = VirtualUserState::new();
/// state.get_or_default(&USER_IDS).push(42);
/// assert_eq!(state.get(&USER_IDS), Some(&vec![42]));
/// ```
pub struct StateKey<T> {
    name: &'static str,
    _marker: PhantomData<fn() -> T>,
}

impl<T> StateKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _marker: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl<T> Clone for StateKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for StateKey<T> {}

impl<T> fmt::Debug for StateKey<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("StateKey").field(&self.name).finish()
    }
}

/// Session-scoped values of one virtual user (e.g. identifiers of entities
/// it created). Created when the actor starts, dropped when it stops.
#[derive(Default)]
pub struct VirtualUserState {
    values: HashMap<&'static str, Box<dyn Any + Send + Sync>>,
}

impl fmt::Debug for VirtualUserState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.values.keys()).finish()
    }
}

impl VirtualUserState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, returning the previous value of the same type.
    pub fn insert<T>(&mut self, key: &StateKey<T>, value: T) -> Option<T>
    where
        T: Any + Send + Sync,
    {
        self.values
            .insert(key.name, Box::new(value))
            .and_then(|old| old.downcast::<T>().ok())
            .map(|old| *old)
    }

    pub fn get<T: Any>(&self, key: &StateKey<T>) -> Option<&T> {
        self.values.get(key.name)?.downcast_ref::<T>()
    }

    pub fn get_mut<T: Any>(&mut self, key: &StateKey<T>) -> Option<&mut T> {
        self.values.get_mut(key.name)?.downcast_mut::<T>()
    }

    /// Mutable access to the value under `key`, inserting `T::default()`
    /// when absent or when the slot holds a different type.
    pub fn get_or_default<T>(&mut self, key: &StateKey<T>) -> &mut T
    where
        T: Any + Send + Sync + Default,
    {
        let slot = self
            .values
            .entry(key.name)
            .or_insert_with(|| Box::new(T::default()));
        if !slot.is::<T>() {
            *slot = Box::new(T::default());
        }
        slot.downcast_mut::<T>()
            .unwrap_or_else(|| unreachable!("slot was just set to the key's type"))
    }

    pub fn remove<T: Any>(&mut self, key: &StateKey<T>) -> Option<T> {
        if !self.values.get(key.name)?.is::<T>() {
            return None;
        }
        self.values
            .remove(key.name)
            .and_then(|value| value.downcast::<T>().ok())
            .map(|value| *value)
    }

    pub fn contains<T: Any>(&self, key: &StateKey<T>) -> bool {
        self.get(key).is_some()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
