/// Decoding policy.
///
/// Built once by the caller and passed by reference to every stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Options {
    /// Materialize subprograms and methods.
    pub functions: bool,
    /// Materialize the contents of function bodies (other than parameters).
    pub function_bodies: bool,
    /// Materialize lexical blocks as scopes.
    ///
    /// When disabled, blocks are transparent: anything inside them that is
    /// materialized attaches to the enclosing function.
    pub lexical_blocks: bool,
    /// Materialize variables declared inside function bodies.
    pub local_variables: bool,
    /// Replace repeated top-level definitions with the first one seen.
    pub deduplicate: bool,
    /// Apply relocations to the debug sections of unlinked object files.
    pub relocations: bool,
}

impl Default for Options {
    fn default() -> Self {
        Options {
            functions: true,
            function_bodies: true,
            lexical_blocks: false,
            local_variables: false,
            deduplicate: true,
            relocations: true,
        }
    }
}

impl Options {
    pub fn lexical_blocks(&mut self, enable: bool) -> &mut Self {
        self.lexical_blocks = enable;
        self
    }

    pub fn local_variables(&mut self, enable: bool) -> &mut Self {
        self.local_variables = enable;
        self
    }

    pub fn deduplicate(&mut self, enable: bool) -> &mut Self {
        self.deduplicate = enable;
        self
    }
}
