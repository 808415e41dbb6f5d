struct DeferLockStruct {
    /// i is protected by mu.
    i: i32,
    mu: Mutex,
}

fn protected_access_in_defer() {
    let mut s = DeferLockStruct::default();

    defer! {
        s.mu.lock();
        s.i = 42;
    }
}

fn not_protected_access_in_defer() {
    let mut s = DeferLockStruct::default();

    defer! {
        s.i = 42; // want `not protected access to shared field i, use s.mu.lock\(\)`
    }
}

fn lock_in_defer_access_in_func() {
    let mut s = DeferLockStruct::default();
    defer!(s.mu.lock());

    s.i = 42; // want `not protected access to shared field i, use s.mu.lock\(\)`
}

fn defer_access_after_lock_in_func() {
    let mut s = DeferLockStruct::default();
    s.mu.lock();

    defer! {
        s.i = 42;
    }

    // Not reported, although the deferred unlock runs before the access.
    defer! { s.mu.unlock(); }
}

fn lock_and_access_in_different_defers() {
    let mut s = DeferLockStruct::default();
    defer!(s.mu.lock());

    defer! {
        s.i = 42; // want `not protected access to shared field i, use s.mu.lock\(\)`
    }
}

fn guarded_with_deferred_unlock(s: &mut DeferLockStruct) {
    s.mu.lock();
    defer! { s.mu.unlock(); }
    s.i = 1;
}
