fn different_objects() {
    let p1 = S1 { protected_field1: 0, mu: Mutex };
    let mut p2 = S1 { protected_field1: 0, mu: Mutex };

    p1.mu.lock();
    p2.protected_field1 = 42; // want `not protected access to shared field protected_field1, use p2.mu.lock\(\)`
}

fn shadowed() {
    let s = S1 { protected_field1: 0, mu: Mutex };
    s.mu.lock();
    let s = S1 { protected_field1: 1, mu: Mutex };
    let _ = s.protected_field1; // want `use s.mu.lock\(\)`
}
