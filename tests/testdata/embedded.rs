struct Embed(
    /// protected by mu. The lock field is public to make sure that it is not
    /// reported for an anonymous field.
    i32,
    pub Mutex,
);

struct EmbedsStruct {
    /// Named field holding another struct, not protected.
    inner: S1,
    mu: Mutex,
}
