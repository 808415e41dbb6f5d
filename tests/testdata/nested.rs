struct Inner {
    /// i is protected by mu.
    i: i32,
    mu: Box<dyn Locker>,
}

struct Outer {
    n: Inner,
}

fn nested_access(o: &mut Outer) {
    // Access to a protected field of a nested struct is not tracked.
    o.n.i = 42;
}

fn nested_function1(s: &mut Inner) {
    let f = || {
        // Locked later in the text, so this is reported.
        s.i = 42; // want `not protected access to shared field i, use s.mu.lock\(\)`
    };

    s.mu.lock();

    f();
}

fn nested_function2(s: &mut Inner) {
    s.mu.lock();

    (|| {
        s.i = 42;
    })();
}

fn nested_fun(f: &mut Inner) {
    let unlock = || f.mu.unlock();
    f.mu.lock();
    unlock();

    // Not protected, but not reported either.
    f.i = 42;
}

fn outer_fn(s: &mut Inner) {
    s.mu.lock();

    fn helper(s: &mut Inner) {
        s.i = 1; // want `not protected access to shared field i, use s.mu.lock\(\)`
    }

    s.i = 2;
}

fn branches(s: &mut Inner, cond: bool) {
    if cond {
        s.mu.lock();
    }
    // Ordering is textual, so the lock in the branch counts.
    s.i = 3;
}
