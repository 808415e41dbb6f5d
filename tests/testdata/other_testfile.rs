impl S1 {
    /// A method defined for a struct declared in another file.
    fn func_in_other_file(&mut self) {
        self.protected_field1 = 42; // want `not protected access to shared field protected_field1, use self.mu.lock\(\)`
    }
}

/// S4 is a struct in another file with a protected field.
struct S4 {
    /// s4_protected_field protected by s4_mu.
    s4_protected_field: i32,
    /// s4_mu protects s4_protected_field.
    s4_mu: Mutex,
}

fn use_s4(s: &S4) -> i32 {
    s.s4_mu.lock();
    s.s4_protected_field
}
