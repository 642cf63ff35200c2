//! Structural type descriptors and the supertype hierarchy the repository resolves against.

use std::collections::{HashMap, HashSet, VecDeque};
use std::fmt;

use crate::config::Directive;

/// Names of the built-in types
pub mod names {
    pub const ANY: &str = "any";
    pub const NUMBER: &str = "number";
    pub const COMPARABLE: &str = "comparable";
    pub const CHAR_SEQUENCE: &str = "char_sequence";
    pub const ITERABLE: &str = "iterable";
    pub const COLLECTION: &str = "collection";

    pub const BOOL: &str = "bool";
    pub const CHAR: &str = "char";
    pub const I8: &str = "i8";
    pub const I16: &str = "i16";
    pub const I32: &str = "i32";
    pub const I64: &str = "i64";
    pub const U8: &str = "u8";
    pub const U16: &str = "u16";
    pub const U32: &str = "u32";
    pub const U64: &str = "u64";
    pub const BIGINT: &str = "bigint";
    pub const F32: &str = "f32";
    pub const F64: &str = "f64";
    pub const DECIMAL: &str = "decimal";
    pub const STRING: &str = "string";
    pub const LIST: &str = "list";
    pub const SET: &str = "set";
    pub const MAP: &str = "map";
    pub const ARRAY: &str = "array";
    pub const OPTIONAL: &str = "optional";
    pub const PAIR: &str = "pair";
    pub const TRIPLE: &str = "triple";
    pub const FUNCTION: &str = "function";
    pub const INSTANT: &str = "instant";
    pub const DURATION: &str = "duration";
}

/// Description of a parameter's type handed to the repository
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDescriptor {
    /// A raw type name with type arguments
    Named {
        name: String,
        args: Vec<TypeDescriptor>,
        directives: Vec<Directive>,
    },
    Array {
        element: Box<TypeDescriptor>,
        directives: Vec<Directive>,
    },
    /// A closed domain of named variants
    Enumeration {
        name: String,
        variants: Vec<String>,
        directives: Vec<Directive>,
    },
    /// `?`, `? extends upper` or `? super lower`
    Wildcard {
        upper: Option<Box<TypeDescriptor>>,
        lower: Option<Box<TypeDescriptor>>,
    },
    /// An unbound type variable
    Variable(String),
}

impl TypeDescriptor {
    pub fn named(name: impl Into<String>) -> Self {
        TypeDescriptor::Named {
            name: name.into(),
            args: Vec::new(),
            directives: Vec::new(),
        }
    }

    pub fn generic(name: impl Into<String>, args: Vec<TypeDescriptor>) -> Self {
        TypeDescriptor::Named {
            name: name.into(),
            args,
            directives: Vec::new(),
        }
    }

    pub fn array(element: TypeDescriptor) -> Self {
        TypeDescriptor::Array {
            element: Box::new(element),
            directives: Vec::new(),
        }
    }

    pub fn enumeration<S: Into<String>>(
        name: impl Into<String>,
        variants: impl IntoIterator<Item = S>,
    ) -> Self {
        TypeDescriptor::Enumeration {
            name: name.into(),
            variants: variants.into_iter().map(Into::into).collect(),
            directives: Vec::new(),
        }
    }

    /// The unconstrained wildcard `?`
    pub fn wildcard() -> Self {
        TypeDescriptor::Wildcard {
            upper: None,
            lower: None,
        }
    }

    pub fn extends(upper: TypeDescriptor) -> Self {
        TypeDescriptor::Wildcard {
            upper: Some(Box::new(upper)),
            lower: None,
        }
    }

    pub fn super_of(lower: TypeDescriptor) -> Self {
        TypeDescriptor::Wildcard {
            upper: None,
            lower: Some(Box::new(lower)),
        }
    }

    pub fn variable(name: impl Into<String>) -> Self {
        TypeDescriptor::Variable(name.into())
    }

    /// Attach a directive. Wildcards and variables carry none and are returned unchanged.
    pub fn with_directive(mut self, directive: Directive) -> Self {
        match &mut self {
            TypeDescriptor::Named { directives, .. }
            | TypeDescriptor::Array { directives, .. }
            | TypeDescriptor::Enumeration { directives, .. } => directives.push(directive),
            TypeDescriptor::Wildcard { .. } | TypeDescriptor::Variable(_) => {}
        }
        self
    }

    pub fn directives(&self) -> &[Directive] {
        match self {
            TypeDescriptor::Named { directives, .. }
            | TypeDescriptor::Array { directives, .. }
            | TypeDescriptor::Enumeration { directives, .. } => directives,
            TypeDescriptor::Wildcard { .. } | TypeDescriptor::Variable(_) => &[],
        }
    }

    /// Whether this stands for "any type at all": `?` or a type variable
    pub fn is_unconstrained(&self) -> bool {
        matches!(
            self,
            TypeDescriptor::Wildcard {
                upper: None,
                lower: None
            } | TypeDescriptor::Variable(_)
        )
    }
}

impl fmt::Display for TypeDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeDescriptor::Named { name, args, .. } => {
                write!(f, "{}", name)?;
                if !args.is_empty() {
                    write!(f, "<")?;
                    for (index, arg) in args.iter().enumerate() {
                        if index > 0 {
                            write!(f, ", ")?;
                        }
                        write!(f, "{}", arg)?;
                    }
                    write!(f, ">")?;
                }
                Ok(())
            }
            TypeDescriptor::Array { element, .. } => write!(f, "{}[]", element),
            TypeDescriptor::Enumeration { name, .. } => write!(f, "{}", name),
            TypeDescriptor::Wildcard { upper: None, lower: None } => write!(f, "?"),
            TypeDescriptor::Wildcard {
                lower: Some(lower), ..
            } => write!(f, "? super {}", lower),
            TypeDescriptor::Wildcard {
                upper: Some(upper), ..
            } => write!(f, "? extends {}", upper),
            TypeDescriptor::Variable(name) => write!(f, "{}", name),
        }
    }
}

/// Direct supertypes per raw type name.
///
/// Every type is implicitly a subtype of [`names::ANY`].
#[derive(Debug, Clone)]
pub struct TypeHierarchy {
    supertypes: HashMap<String, Vec<String>>,
}

impl TypeHierarchy {
    /// An empty hierarchy holding only the universal root
    pub fn new() -> Self {
        let mut supertypes = HashMap::new();
        supertypes.insert(names::ANY.to_string(), Vec::new());
        Self { supertypes }
    }

    /// The hierarchy of the built-in types
    pub fn builtin() -> Self {
        use names::*;

        let mut hierarchy = Self::new();
        for root in [NUMBER, COMPARABLE, CHAR_SEQUENCE, ITERABLE] {
            hierarchy.declare(root, &[ANY]);
        }
        hierarchy.declare(COLLECTION, &[ITERABLE]);

        for scalar in [BOOL, CHAR, INSTANT, DURATION] {
            hierarchy.declare(scalar, &[COMPARABLE]);
        }
        for numeric in [I8, I16, I32, I64, U8, U16, U32, U64, BIGINT, F32, F64, DECIMAL] {
            hierarchy.declare(numeric, &[NUMBER, COMPARABLE]);
        }
        hierarchy.declare(STRING, &[CHAR_SEQUENCE, COMPARABLE]);
        hierarchy.declare(LIST, &[COLLECTION]);
        hierarchy.declare(SET, &[COLLECTION]);
        for other in [MAP, ARRAY, OPTIONAL, PAIR, TRIPLE, FUNCTION] {
            hierarchy.declare(other, &[ANY]);
        }
        hierarchy
    }

    /// Declare `name` with its direct supertypes, replacing any earlier declaration
    pub fn declare(&mut self, name: impl Into<String>, supertypes: &[&str]) -> &mut Self {
        self.supertypes.insert(
            name.into(),
            supertypes.iter().map(|s| s.to_string()).collect(),
        );
        self
    }

    pub fn is_declared(&self, name: &str) -> bool {
        self.supertypes.contains_key(name)
    }

    /// `name` followed by all of its supertypes, breadth first, ending at the root
    pub fn ancestry(&self, name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut order = Vec::new();
        let mut queue = VecDeque::from([name.to_string()]);

        while let Some(current) = queue.pop_front() {
            if !seen.insert(current.clone()) {
                continue;
            }
            if let Some(parents) = self.supertypes.get(&current) {
                queue.extend(parents.iter().cloned());
            }
            order.push(current);
        }

        if !seen.contains(names::ANY) {
            order.push(names::ANY.to_string());
        }
        order
    }

    /// Whether a value of type `from` may be used where `to` is requested
    pub fn is_assignable(&self, from: &str, to: &str) -> bool {
        self.ancestry(from).iter().any(|ancestor| ancestor == to)
    }
}

impl Default for TypeHierarchy {
    fn default() -> Self {
        Self::builtin()
    }
}
