fn wrong_lock() {
    let mut s = S1 { protected_field1: 0, mu: Mutex };
    let mu = Mutex;
    mu.lock(); // not related lock

    s.protected_field1 = 42; // want `not protected access to shared field protected_field1, use s.mu.lock\(\)`
}

fn unlocked_too_early(s: &mut S1) {
    s.mu.lock();
    s.mu.unlock();
    s.protected_field1 = 42; // want `not protected access to shared field protected_field1`
}

fn relocked(s: &mut S1) {
    s.mu.lock();
    s.mu.unlock();
    s.mu.lock();
    s.protected_field1 = 42;
}
