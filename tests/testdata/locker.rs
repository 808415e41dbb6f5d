struct S5 {
    /// field is protected by mu_int. Not really since mu_int has no lock methods.
    field: i32,
    mu_int: i32, // want `lock mu_int doesn't implement Locker \(lock/unlock\)`
}

type LockerAlias = Box<dyn Locker>;

struct S6 {
    /// s6f is protected by mu.
    s6f: i32,
    mu: LockerAlias,
}

/// MyLocker takes its receiver by value on purpose.
#[derive(Clone, Copy)]
struct MyLocker;

impl MyLocker {
    fn lock(self) {}
    fn unlock(self) {}
}

struct S7 {
    /// s7f is protected by mu
    s7f: i32,
    mu: MyLocker,
}

struct TraitLock;

impl Locker for TraitLock {
    fn lock(&self) {}
    fn unlock(&self) {}
}

struct S8 {
    /// s8f is protected by mu
    s8f: i32,
    mu: std::sync::Arc<TraitLock>,
}

struct HalfLock;

impl HalfLock {
    fn lock(&self) {}
}

struct S9 {
    /// s9f is protected by mu
    s9f: i32,
    mu: HalfLock, // want `lock mu doesn't implement Locker`
}

struct S10 {
    /// s10f is protected by missing_mu
    s10f: i32, // want `lock missing_mu not found in struct S10`
    mu: Mutex,
}

fn use_lockers(s6: &S6, s7: &S7, s8: &S8) -> i32 {
    s6.mu.lock();
    s7.mu.lock();
    s8.mu.lock();
    s6.s6f + s7.s7f + s8.s8f
}
