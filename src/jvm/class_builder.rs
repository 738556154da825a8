use super::{
    narrow_constant_index, Attribute, BinaryName, ClassAccessFlags, ClassConstantIndex, ClassFile,
    CodeBuilder, Constant, ConstantIndex, ConstantsPool, Error, FieldRefConstantIndex,
    Instruction, InvokeType, Method, MethodAccessFlags, MethodRefConstantIndex,
    NameAndTypeConstantIndex, StringConstantIndex, Utf8ConstantIndex, Version,
};
use std::collections::HashMap;

/// Lifecycle of a [`ClassBuilder`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum BuilderState {
    /// Nothing has been allocated yet
    Empty,

    /// Bootstrap constants are in place and code can be emitted
    Initialized,

    /// The class file has been produced, so no further changes are possible
    Finalized,
}

/// Symbol tables kept by a [`ClassBuilder`]
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SymbolKind {
    Class,
    Field,
    Method,
    Utf8,
}

/// Constants allocated by a single field or method reference
///
/// The run is always laid out as: reference, class, class name, name & type, member name,
/// member descriptor.
#[derive(Copy, Clone, Debug)]
struct MemberRun {
    first: ConstantIndex,
    name: Utf8ConstantIndex,
    descriptor: Utf8ConstantIndex,
}

/// Constants allocated during initialization that the method table needs
#[derive(Copy, Clone, Debug)]
struct Bootstrap {
    object_init: MethodRefConstantIndex,
    init_name: Utf8ConstantIndex,
    init_descriptor: Utf8ConstantIndex,
    this_class: ClassConstantIndex,
    super_class: ClassConstantIndex,
    code_name: Utf8ConstantIndex,
    main_name: Utf8ConstantIndex,
    main_descriptor: Utf8ConstantIndex,
}

/// Builds up a class with a default constructor and a `main` method that prints things
///
/// This is the whole compilation session: it owns the constants pool, the symbol tables mapping
/// names to pool indices, and the body of `main`. Usage goes through three phases:
///
///   1. [`ClassBuilder::initialize`] allocates the constants every class needs (the `Object`
///      constructor, `System.out`, `PrintStream.println`, etc.)
///   2. [`ClassBuilder::emit_print`] (and the lower-level `add_*` methods) extend the pool and the
///      body of `main`
///   3. [`ClassBuilder::finalize`] produces the [`ClassFile`]
///
/// Calling these out of order produces [`Error::SequencingViolation`].
///
/// The pool is never deduplicated. Each `add_*` call allocates fresh slots, and the symbol table
/// entry for a name always points at the latest allocation.
#[derive(Debug)]
pub struct ClassBuilder {
    this_class_name: BinaryName,
    state: BuilderState,
    constants: ConstantsPool,

    classes: HashMap<String, ClassConstantIndex>,
    fields: HashMap<String, FieldRefConstantIndex>,
    methods: HashMap<String, MethodRefConstantIndex>,

    /// Points at either a `Utf8` or a `String` constant (string literals share this table)
    utf8s: HashMap<String, ConstantIndex>,

    /// Body of `main`, not including the final `return`
    main_code: CodeBuilder,

    bootstrap: Option<Bootstrap>,
}

impl ClassBuilder {
    pub const OBJECT_CLASS: &'static str = "java/lang/Object";
    pub const INIT: &'static str = "<init>";
    pub const VOID_DESCRIPTOR: &'static str = "()V";
    pub const CODE: &'static str = "Code";
    pub const MAIN: &'static str = "main";
    pub const MAIN_DESCRIPTOR: &'static str = "([Ljava/lang/String;)V";
    pub const SYSTEM_CLASS: &'static str = "java/lang/System";
    pub const OUT: &'static str = "out";
    pub const PRINT_STREAM_DESCRIPTOR: &'static str = "Ljava/io/PrintStream;";
    pub const PRINT_STREAM_CLASS: &'static str = "java/io/PrintStream";
    pub const PRINTLN: &'static str = "println";
    pub const PRINTLN_DESCRIPTOR: &'static str = "(Ljava/lang/String;)V";

    /// Stack budget of `main`: `System.out` and the string being printed
    pub const MAIN_MAX_STACK: u16 = 2;

    /// Locals budget of `main`: just the `String[]` argument
    pub const MAIN_MAX_LOCALS: u16 = 1;

    /// Create an empty builder (call [`ClassBuilder::initialize`] before anything else)
    pub fn new(this_class_name: BinaryName) -> ClassBuilder {
        ClassBuilder {
            this_class_name,
            state: BuilderState::Empty,
            constants: ConstantsPool::new(),
            classes: HashMap::new(),
            fields: HashMap::new(),
            methods: HashMap::new(),
            utf8s: HashMap::new(),
            main_code: CodeBuilder::new(Self::MAIN_MAX_STACK, Self::MAIN_MAX_LOCALS),
            bootstrap: None,
        }
    }

    pub fn state(&self) -> BuilderState {
        self.state
    }

    /// Name of the class being built
    pub fn this_class_name(&self) -> &BinaryName {
        &self.this_class_name
    }

    /// Constants allocated so far
    pub fn constants(&self) -> &ConstantsPool {
        &self.constants
    }

    /// Instructions emitted into `main` so far
    pub fn main_instructions(&self) -> &[Instruction] {
        self.main_code.instructions()
    }

    fn expect_state(&self, expected: BuilderState, operation: &'static str) -> Result<(), Error> {
        if self.state == expected {
            Ok(())
        } else {
            Err(Error::SequencingViolation {
                operation,
                state: self.state,
            })
        }
    }

    /// Allocate the constants that every generated class needs
    ///
    /// In order: the `Object` constructor reference, this class, the `Code`/`main`/main
    /// descriptor strings, the `System.out` field reference, and the `PrintStream.println`
    /// method reference.
    pub fn initialize(&mut self) -> Result<(), Error> {
        self.expect_state(BuilderState::Empty, "initialize")?;
        self.state = BuilderState::Initialized;

        let object_init = self.push_member_run(
            SymbolKind::Method,
            Self::INIT,
            Self::OBJECT_CLASS,
            Self::VOID_DESCRIPTOR,
        )?;
        let this_class_name = self.this_class_name.as_str().to_owned();
        let this_class = self.add_class(&this_class_name)?;
        let code_name = self.add_utf8(Self::CODE)?;
        let main_name = self.add_utf8(Self::MAIN)?;
        let main_descriptor = self.add_utf8(Self::MAIN_DESCRIPTOR)?;
        self.add_field_ref(Self::OUT, Self::SYSTEM_CLASS, Self::PRINT_STREAM_DESCRIPTOR)?;
        self.add_method_ref(Self::PRINTLN, Self::PRINT_STREAM_CLASS, Self::PRINTLN_DESCRIPTOR)?;

        self.bootstrap = Some(Bootstrap {
            object_init: MethodRefConstantIndex(object_init.first),
            init_name: object_init.name,
            init_descriptor: object_init.descriptor,
            this_class,
            super_class: self.lookup_class(Self::OBJECT_CLASS)?,
            code_name,
            main_name,
            main_descriptor,
        });
        log::debug!(
            "Initialized class '{}' with {} bootstrap constants",
            self.this_class_name,
            self.constants.len()
        );
        Ok(())
    }

    /// Allocate a method reference run (6 slots) and register the method name
    pub fn add_method_ref(
        &mut self,
        name: &str,
        class: &str,
        descriptor: &str,
    ) -> Result<MethodRefConstantIndex, Error> {
        self.expect_state(BuilderState::Initialized, "add a method reference")?;
        let run = self.push_member_run(SymbolKind::Method, name, class, descriptor)?;
        Ok(MethodRefConstantIndex(run.first))
    }

    /// Allocate a field reference run (6 slots) and register the field name
    pub fn add_field_ref(
        &mut self,
        name: &str,
        class: &str,
        descriptor: &str,
    ) -> Result<FieldRefConstantIndex, Error> {
        self.expect_state(BuilderState::Initialized, "add a field reference")?;
        let run = self.push_member_run(SymbolKind::Field, name, class, descriptor)?;
        Ok(FieldRefConstantIndex(run.first))
    }

    fn push_member_run(
        &mut self,
        kind: SymbolKind,
        name: &str,
        class: &str,
        descriptor: &str,
    ) -> Result<MemberRun, Error> {
        let first = self.constants.reserve(6)?;
        let class_index = ClassConstantIndex(first.offset(1));
        let class_name = Utf8ConstantIndex(first.offset(2));
        let name_and_type = NameAndTypeConstantIndex(first.offset(3));
        let member_name = Utf8ConstantIndex(first.offset(4));
        let member_descriptor = Utf8ConstantIndex(first.offset(5));

        let member = match kind {
            SymbolKind::Field => Constant::FieldRef(class_index, name_and_type),
            _ => Constant::MethodRef(class_index, name_and_type),
        };
        self.constants.push_run(vec![
            member,
            Constant::Class(class_name),
            Constant::Utf8(class.to_owned()),
            Constant::NameAndType {
                name: member_name,
                descriptor: member_descriptor,
            },
            Constant::Utf8(name.to_owned()),
            Constant::Utf8(descriptor.to_owned()),
        ])?;

        match kind {
            SymbolKind::Field => {
                log::debug!("Field '{}' at #{}", name, first.0);
                self.fields.insert(name.to_owned(), FieldRefConstantIndex(first));
            }
            _ => {
                log::debug!("Method '{}' at #{}", name, first.0);
                self.methods.insert(name.to_owned(), MethodRefConstantIndex(first));
            }
        }
        self.classes.insert(class.to_owned(), class_index);
        self.utf8s.insert(class.to_owned(), class_name.0);
        self.utf8s.insert(name.to_owned(), member_name.0);
        self.utf8s.insert(descriptor.to_owned(), member_descriptor.0);

        Ok(MemberRun {
            first,
            name: member_name,
            descriptor: member_descriptor,
        })
    }

    /// Allocate a class constant and its name (2 slots) and register the class name
    pub fn add_class(&mut self, name: &str) -> Result<ClassConstantIndex, Error> {
        self.expect_state(BuilderState::Initialized, "add a class")?;
        let first = self.constants.reserve(2)?;
        let class = ClassConstantIndex(first);
        let class_name = Utf8ConstantIndex(first.offset(1));
        self.constants.push_run(vec![
            Constant::Class(class_name),
            Constant::Utf8(name.to_owned()),
        ])?;

        log::debug!("Class '{}' at #{}", name, first.0);
        self.classes.insert(name.to_owned(), class);
        self.utf8s.insert(name.to_owned(), class_name.0);
        Ok(class)
    }

    /// Allocate a standalone UTF-8 constant (1 slot) and register it
    pub fn add_utf8(&mut self, text: &str) -> Result<Utf8ConstantIndex, Error> {
        self.expect_state(BuilderState::Initialized, "add a UTF-8 constant")?;
        let index = self
            .constants
            .push_run(vec![Constant::Utf8(text.to_owned())])?;
        self.utf8s.insert(text.to_owned(), index);
        Ok(Utf8ConstantIndex(index))
    }

    /// Allocate a string literal and its contents (2 slots)
    ///
    /// The text is registered in the UTF-8 symbol table pointing at the `String` constant, so a
    /// literal shadows any earlier name with the same text.
    pub fn add_string_literal(&mut self, text: &str) -> Result<StringConstantIndex, Error> {
        self.expect_state(BuilderState::Initialized, "add a string literal")?;
        let first = self.constants.reserve(2)?;
        self.constants.push_run(vec![
            Constant::String(Utf8ConstantIndex(first.offset(1))),
            Constant::Utf8(text.to_owned()),
        ])?;
        self.utf8s.insert(text.to_owned(), first);
        Ok(StringConstantIndex(first))
    }

    pub fn lookup_class(&self, name: &str) -> Result<ClassConstantIndex, Error> {
        self.classes
            .get(name)
            .copied()
            .ok_or_else(|| Self::unresolved(SymbolKind::Class, name))
    }

    pub fn lookup_field(&self, name: &str) -> Result<FieldRefConstantIndex, Error> {
        self.fields
            .get(name)
            .copied()
            .ok_or_else(|| Self::unresolved(SymbolKind::Field, name))
    }

    pub fn lookup_method(&self, name: &str) -> Result<MethodRefConstantIndex, Error> {
        self.methods
            .get(name)
            .copied()
            .ok_or_else(|| Self::unresolved(SymbolKind::Method, name))
    }

    /// Latest `Utf8` or `String` constant registered under this text
    pub fn lookup_utf8(&self, text: &str) -> Result<ConstantIndex, Error> {
        self.utf8s
            .get(text)
            .copied()
            .ok_or_else(|| Self::unresolved(SymbolKind::Utf8, text))
    }

    fn unresolved(kind: SymbolKind, name: &str) -> Error {
        Error::UnresolvedSymbol {
            kind,
            name: name.to_owned(),
        }
    }

    /// Emit code into `main` to print a line of text
    ///
    /// This allocates a fresh string literal and appends:
    ///
    /// ```text
    /// getstatic     java/lang/System.out
    /// ldc           "<text>"
    /// invokevirtual java/io/PrintStream.println
    /// ```
    ///
    /// Only the narrow `ldc` is used, so this fails with [`Error::IndexOverflow`] once the pool
    /// has grown past index 255.
    pub fn emit_print(&mut self, text: &str) -> Result<(), Error> {
        self.expect_state(BuilderState::Initialized, "emit a print")?;
        let field = self.lookup_field(Self::OUT)?;
        self.add_string_literal(text)?;
        let string = self.lookup_utf8(text)?;
        let method = self.lookup_method(Self::PRINTLN)?;

        let narrow_string = narrow_constant_index(string).ok_or(Error::IndexOverflow(string))?;
        log::debug!("Printing {:?} (string #{})", text, string.0);
        self.main_code.push_instruction(Instruction::GetStatic(field))?;
        self.main_code.push_instruction(Instruction::Ldc(narrow_string))?;
        self.main_code
            .push_instruction(Instruction::Invoke(InvokeType::Virtual, method))?;
        Ok(())
    }

    /// Produce the class file: a public class extending `Object` with a default constructor and
    /// a `public static void main(String[])` containing everything emitted so far
    pub fn finalize(&mut self) -> Result<ClassFile, Error> {
        self.expect_state(BuilderState::Initialized, "finalize")?;
        let bootstrap = match self.bootstrap {
            Some(bootstrap) => bootstrap,
            None => {
                return Err(Error::SequencingViolation {
                    operation: "finalize",
                    state: BuilderState::Empty,
                })
            }
        };
        self.state = BuilderState::Finalized;

        // Default constructor just delegates to `Object.<init>`
        let mut init_code = CodeBuilder::new(1, 1);
        init_code.push_instruction(Instruction::ALoad(0))?;
        init_code.push_instruction(Instruction::Invoke(
            InvokeType::Special,
            bootstrap.object_init,
        ))?;
        init_code.push_instruction(Instruction::Return)?;
        let init_code = init_code.result()?;

        let mut main_code = std::mem::replace(
            &mut self.main_code,
            CodeBuilder::new(Self::MAIN_MAX_STACK, Self::MAIN_MAX_LOCALS),
        );
        main_code.push_instruction(Instruction::Return)?;
        let main_code = main_code.result()?;

        let methods = vec![
            Method {
                access_flags: MethodAccessFlags::PUBLIC,
                name_index: bootstrap.init_name,
                descriptor_index: bootstrap.init_descriptor,
                attributes: vec![Attribute::new(bootstrap.code_name, &init_code)?],
            },
            Method {
                access_flags: MethodAccessFlags::PUBLIC | MethodAccessFlags::STATIC,
                name_index: bootstrap.main_name,
                descriptor_index: bootstrap.main_descriptor,
                attributes: vec![Attribute::new(bootstrap.code_name, &main_code)?],
            },
        ];

        self.constants.check_references()?;
        let constants = std::mem::take(&mut self.constants);
        log::debug!(
            "Finalized class '{}': {} constants, {} bytes of code in main",
            self.this_class_name,
            constants.len(),
            main_code.code_array.0.len()
        );

        Ok(ClassFile {
            version: Version::JAVA8,
            constants,
            access_flags: ClassAccessFlags::PUBLIC | ClassAccessFlags::SUPER,
            this_class: bootstrap.this_class,
            super_class: bootstrap.super_class,
            interfaces: vec![],
            fields: vec![],
            methods,
            attributes: vec![],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn builder() -> ClassBuilder {
        let name = BinaryName::from_string(String::from("Test")).unwrap();
        let mut builder = ClassBuilder::new(name);
        builder.initialize().unwrap();
        builder
    }

    fn index<T: Into<ConstantIndex>>(lookup: Result<T, Error>) -> ConstantIndex {
        lookup.unwrap().into()
    }

    #[test]
    fn bootstrap_layout() {
        let builder = builder();
        assert_eq!(builder.constants().len(), 23);
        assert_eq!(index(builder.lookup_method("<init>")), ConstantIndex(1));
        assert_eq!(index(builder.lookup_class("java/lang/Object")), ConstantIndex(2));
        assert_eq!(index(builder.lookup_class("Test")), ConstantIndex(7));
        assert_eq!(builder.lookup_utf8("Code").unwrap(), ConstantIndex(9));
        assert_eq!(builder.lookup_utf8("main").unwrap(), ConstantIndex(10));
        assert_eq!(index(builder.lookup_field("out")), ConstantIndex(12));
        assert_eq!(index(builder.lookup_method("println")), ConstantIndex(18));

        let tags: Vec<u8> = builder.constants().iter().map(|(_, c)| c.tag()).collect();
        assert_eq!(
            tags,
            vec![10, 7, 1, 12, 1, 1, 7, 1, 1, 1, 1, 9, 7, 1, 12, 1, 1, 10, 7, 1, 12, 1, 1]
        );
    }

    #[test]
    fn member_runs_point_forward_into_their_own_run() {
        let mut builder = builder();
        let method = builder.add_method_ref("foo", "a/B", "()I").unwrap();
        let first = ConstantIndex::from(method);
        assert_eq!(
            builder.constants().get(first),
            Some(&Constant::MethodRef(
                ClassConstantIndex(first.offset(1)),
                NameAndTypeConstantIndex(first.offset(3))
            ))
        );
        assert_eq!(
            builder.constants().get(first.offset(5)),
            Some(&Constant::Utf8(String::from("()I")))
        );
    }

    #[test]
    fn repeated_references_are_not_deduplicated() {
        let mut builder = builder();
        let before = builder.constants().len();
        let first = builder.add_field_ref("x", "a/B", "I").unwrap();
        let second = builder.add_field_ref("x", "a/B", "I").unwrap();
        assert_eq!(builder.constants().len(), before + 12);
        assert_ne!(first, second);
        assert_eq!(builder.lookup_field("x").unwrap(), second);
    }

    #[test]
    fn string_literals_shadow_names() {
        let mut builder = builder();
        let literal = builder.add_string_literal("main").unwrap();
        assert_eq!(builder.lookup_utf8("main").unwrap(), ConstantIndex::from(literal));

        // The method table still uses the name allocated during initialization
        let class = builder.finalize().unwrap();
        assert_eq!(class.methods[1].name_index, Utf8ConstantIndex(ConstantIndex(10)));
    }

    #[test]
    fn emit_print_sequence() {
        let mut builder = builder();
        builder.emit_print("hello").unwrap();
        assert_eq!(
            builder.main_instructions(),
            &[
                Instruction::GetStatic(FieldRefConstantIndex(ConstantIndex(12))),
                Instruction::Ldc(24),
                Instruction::Invoke(InvokeType::Virtual, MethodRefConstantIndex(ConstantIndex(18))),
            ]
        );
        assert_eq!(
            builder.constants().get(ConstantIndex(25)),
            Some(&Constant::Utf8(String::from("hello")))
        );
    }

    #[test]
    fn print_index_overflow_is_reported() {
        let mut builder = builder();
        // Bootstrap takes 23 slots and each print takes 2, so string #255 is the last that fits
        for i in 0..116 {
            builder.emit_print(&i.to_string()).unwrap();
        }
        assert!(matches!(
            builder.emit_print("one too many"),
            Err(Error::IndexOverflow(ConstantIndex(256)))
        ));
    }

    #[test]
    fn oversized_literal_is_rejected() {
        let mut builder = builder();
        let before = builder.constants().len();
        assert!(matches!(
            builder.emit_print(&"a".repeat(70_000)),
            Err(Error::ConstantTooLong { length: 70_000 })
        ));
        assert_eq!(builder.constants().len(), before);
        assert!(builder.main_instructions().is_empty());

        builder.add_string_literal(&"a".repeat(65_535)).unwrap();
        let bytes = builder.finalize().unwrap().to_bytes().unwrap();
        assert!(ClassFile::parse(&bytes).is_ok());
    }

    #[test]
    fn full_pool_is_reported_not_panicked() {
        let mut builder = builder();
        while builder.add_utf8("x").is_ok() {}
        assert_eq!(builder.constants().len(), 65_534);

        assert!(matches!(
            builder.add_string_literal("s"),
            Err(Error::ConstantPoolOverflow { requested: 2, .. })
        ));
        assert!(matches!(
            builder.add_class("a/B"),
            Err(Error::ConstantPoolOverflow { requested: 2, .. })
        ));
        assert!(matches!(
            builder.add_method_ref("foo", "a/B", "()V"),
            Err(Error::ConstantPoolOverflow { requested: 6, .. })
        ));
        assert_eq!(builder.constants().len(), 65_534);
    }

    #[test]
    fn sequencing_violations() {
        let mut empty = ClassBuilder::new(BinaryName::from_string(String::from("Test")).unwrap());
        assert!(matches!(
            empty.emit_print("too early"),
            Err(Error::SequencingViolation { state: BuilderState::Empty, .. })
        ));
        assert!(matches!(
            empty.finalize(),
            Err(Error::SequencingViolation { state: BuilderState::Empty, .. })
        ));

        let mut builder = builder();
        assert!(matches!(
            builder.initialize(),
            Err(Error::SequencingViolation { state: BuilderState::Initialized, .. })
        ));
        builder.finalize().unwrap();
        assert!(matches!(
            builder.finalize(),
            Err(Error::SequencingViolation { state: BuilderState::Finalized, .. })
        ));
        assert!(matches!(
            builder.emit_print("too late"),
            Err(Error::SequencingViolation { state: BuilderState::Finalized, .. })
        ));
    }

    #[test]
    fn unknown_names_are_unresolved() {
        let builder = builder();
        assert!(matches!(
            builder.lookup_method("printf"),
            Err(Error::UnresolvedSymbol { kind: SymbolKind::Method, .. })
        ));
    }
}
