static GLOBAL: S1 = S1 {
    protected_field1: 0,
    mu: Mutex,
};

static VALUE: i32 = GLOBAL.protected_field1; // want `protected field protected_field1 of GLOBAL is accessed outside of a function`

enum Message {
    Update {
        /// value is protected by mu
        value: i32, // want `protected field value is not declared in a struct`
    },
    Quit,
}
