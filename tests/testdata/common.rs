//! Lock types and structs shared by the other fixtures.

pub struct Mutex;

impl Mutex {
    pub fn lock(&self) {}
    pub fn unlock(&self) {}
}

pub trait Locker {
    fn lock(&self);
    fn unlock(&self);
}

/// S1 is a struct with one protected field.
struct S1 {
    /// protected_field1 is protected by mu.
    protected_field1: i32,
    mu: Mutex,
}
