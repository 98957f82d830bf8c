use std::fmt;
use std::hash::{Hash, Hasher};
use std::rc::Rc;

/// Reference-counted handle whose `PartialEq`/`Eq`/`Hash` compare the
/// pointer, not the payload. Two `Interned<T>` built from equal-looking
/// data are distinct objects unless one is cloned from the other; this is
/// how the symbol types get "identity by object, not by name".
pub struct Interned<T>(Rc<T>);

impl<T> Interned<T> {
    pub fn new(value: T) -> Self {
        Interned(Rc::new(value))
    }

    pub fn ptr_key(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }
}

impl<T> Clone for Interned<T> {
    fn clone(&self) -> Self {
        Interned(Rc::clone(&self.0))
    }
}

impl<T> std::ops::Deref for Interned<T> {
    type Target = T;
    fn deref(&self) -> &T {
        &self.0
    }
}

impl<T> PartialEq for Interned<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

impl<T> Eq for Interned<T> {}

impl<T> Hash for Interned<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.ptr_key().hash(state);
    }
}

impl<T: fmt::Debug> fmt::Debug for Interned<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
