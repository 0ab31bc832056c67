//! Static types and the core type provider.

use strand_common::Interner;

use crate::element::{ClassRef, LibraryElement};

/// A static type.
#[derive(Clone, PartialEq, Eq, Hash, Debug)]
pub enum Type {
    /// Unknown; assignable to and from everything.
    Dynamic,
    /// The result of a `void` function.
    Void,
    /// An instance of a class.
    Interface(ClassRef),
    /// A function with the given return type.
    Function(Box<Type>),
}

impl Type {
    /// Returns `true` for [`Type::Dynamic`].
    pub fn is_dynamic(&self) -> bool {
        matches!(self, Type::Dynamic)
    }

    /// The class of an interface type.
    pub fn class(&self) -> Option<&ClassRef> {
        match self {
            Type::Interface(c) => Some(c),
            _ => None,
        }
    }

    /// Renders the type for diagnostics.
    pub fn display(&self, interner: &Interner) -> String {
        match self {
            Type::Dynamic => "dynamic".to_string(),
            Type::Void => "void".to_string(),
            Type::Interface(c) => interner.resolve(c.name).to_string(),
            Type::Function(ret) => format!("{} Function()", ret.display(interner)),
        }
    }
}

/// The well-known classes of the core library.
///
/// A class missing from the core library yields [`Type::Dynamic`] so that a
/// trimmed core never causes spurious type warnings.
#[derive(Clone, Debug, Default)]
pub struct TypeProvider {
    object: Option<ClassRef>,
    null: Option<ClassRef>,
    bool_: Option<ClassRef>,
    num: Option<ClassRef>,
    int: Option<ClassRef>,
    double: Option<ClassRef>,
    string: Option<ClassRef>,
    list: Option<ClassRef>,
    function: Option<ClassRef>,
    type_: Option<ClassRef>,
}

impl TypeProvider {
    /// Looks up the well-known classes in the core library element.
    pub fn from_core(core: &LibraryElement, interner: &Interner) -> Self {
        let find = |name: &str| {
            let ident = interner.get(name)?;
            core.classes.get(&ident).map(|c| c.class_ref())
        };
        Self {
            object: find("Object"),
            null: find("Null"),
            bool_: find("bool"),
            num: find("num"),
            int: find("int"),
            double: find("double"),
            string: find("String"),
            list: find("List"),
            function: find("Function"),
            type_: find("Type"),
        }
    }

    fn of(class: &Option<ClassRef>) -> Type {
        class.clone().map_or(Type::Dynamic, Type::Interface)
    }

    /// `Object`.
    pub fn object_type(&self) -> Type {
        Self::of(&self.object)
    }

    /// `Null`.
    pub fn null_type(&self) -> Type {
        Self::of(&self.null)
    }

    /// `bool`.
    pub fn bool_type(&self) -> Type {
        Self::of(&self.bool_)
    }

    /// `num`.
    pub fn num_type(&self) -> Type {
        Self::of(&self.num)
    }

    /// `int`.
    pub fn int_type(&self) -> Type {
        Self::of(&self.int)
    }

    /// `double`.
    pub fn double_type(&self) -> Type {
        Self::of(&self.double)
    }

    /// `String`.
    pub fn string_type(&self) -> Type {
        Self::of(&self.string)
    }

    /// `List`.
    pub fn list_type(&self) -> Type {
        Self::of(&self.list)
    }

    /// `Type`.
    pub fn type_type(&self) -> Type {
        Self::of(&self.type_)
    }

    /// The root class.
    pub fn object_class(&self) -> Option<&ClassRef> {
        self.object.as_ref()
    }

    /// The class of `null`.
    pub fn null_class(&self) -> Option<&ClassRef> {
        self.null.as_ref()
    }

    /// The class every function value implements.
    pub fn function_class(&self) -> Option<&ClassRef> {
        self.function.as_ref()
    }

    /// Returns `true` if `ty` is `int`, `double` or `num`.
    pub fn is_numeric(&self, ty: &Type) -> bool {
        match ty.class() {
            Some(c) => [&self.num, &self.int, &self.double]
                .into_iter()
                .any(|k| k.as_ref() == Some(c)),
            None => false,
        }
    }

    /// The type of an arithmetic expression over `lhs` and `rhs`.
    pub fn arithmetic_result(&self, lhs: &Type, rhs: &Type) -> Type {
        if *lhs == self.string_type() && !lhs.is_dynamic() {
            return lhs.clone();
        }
        if !self.is_numeric(lhs) {
            return Type::Dynamic;
        }
        if lhs == rhs {
            return lhs.clone();
        }
        if self.is_numeric(rhs) {
            self.num_type()
        } else {
            Type::Dynamic
        }
    }
}
