struct ExportedProtected {
    /// protected_field is protected by mu.
    pub protected_field: i32, // want `exported protected field ExportedProtected.protected_field`
    mu: Mutex,
}

struct ExportedMutex {
    /// i is protected by exported_mu.
    i: i32,
    pub exported_mu: Mutex, // want `exported mutex ExportedMutex.exported_mu`
}

/// Restricted visibility stays inside the crate.
pub struct CrateVisible {
    /// i is protected by mu.
    pub(crate) i: i32,
    pub(super) mu: Mutex,
}

struct ExportedBoth {
    /// Only the protected field is reported: p is protected by m.
    pub p: i32, // want `exported protected field ExportedBoth.p`
    pub m: Mutex,
}
