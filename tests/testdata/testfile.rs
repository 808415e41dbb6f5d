const HELLO: &str = "Hello, World!";

static FOO: &str = HELLO;

/// It cannot be protected by anything.
fn main_like() {
    println!("{}", FOO);
}

/// Fields with all kinds of documentation.
struct Fields {
    /// field1
    /// multiline comment
    field1: i32,
    field2: i32, // field2 comment
    /**
     * field 3 comment
     * that is also multiline.
     */
    field3: i32,

    /// protected by mu
    field5: i32,
    /// protected by: mu
    field6: i32, // want `found 0 "protected by " in comment " protected by: mu", expected exact one`
    /// protected by "mu"
    field7: i32,
    /// protected by first, protected by second
    field8: i32, // want `found 2 "protected by " in comment`
    /// protected by ...
    field9: i32, // want `failed to parse lock name from comment " protected by ..."`
    /// field10 is protected by mu // want protected by nothing
    field10: i32,
    mu: Mutex,
}

impl Fields {
    fn func1(&mut self) {
        self.field5 = 42; // want `not protected access to shared field field5, use self.mu.lock\(\)`
    }

    fn func2(&mut self) {
        self.mu.lock();
        defer! { self.mu.unlock(); }
        self.field5 = 42;
        self.field7 = self.field10;
    }

    fn in_macro(&self) {
        println!("{}", self.field7); // want `not protected access to shared field field7`
    }
}
