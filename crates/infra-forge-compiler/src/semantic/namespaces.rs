//! Builtin function namespaces.
//!
//! Every program implicitly imports `sys` and `az`. Their functions can be
//! called unqualified, unless a user declaration shadows the name, or
//! qualified as `sys.concat(...)`.

use super::types::TypeKind;

/// How a builtin's return type is determined.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReturnType {
    Fixed(TypeKind),
    /// Same type as the argument at this position.
    Argument(usize),
}

/// A builtin function signature.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FunctionSignature {
    pub name: &'static str,
    pub min_args: usize,
    /// `None` for variadic functions.
    pub max_args: Option<usize>,
    pub returns: ReturnType,
}

impl FunctionSignature {
    const fn new(
        name: &'static str,
        min_args: usize,
        max_args: Option<usize>,
        returns: ReturnType,
    ) -> Self {
        Self {
            name,
            min_args,
            max_args,
            returns,
        }
    }

    pub fn accepts(&self, count: usize) -> bool {
        count >= self.min_args && self.max_args.is_none_or(|max| count <= max)
    }

    /// Human-readable arity, e.g. `2`, `1 to 3`, `at least 1`.
    pub fn arity(&self) -> std::string::String {
        match self.max_args {
            Some(max) if max == self.min_args => max.to_string(),
            Some(max) => format!("{} to {max}", self.min_args),
            None => format!("at least {}", self.min_args),
        }
    }
}

/// A namespace of builtin functions.
#[derive(Debug, Clone, Copy)]
pub struct Namespace {
    pub name: &'static str,
    pub functions: &'static [FunctionSignature],
}

impl Namespace {
    pub fn function(&self, name: &str) -> Option<&'static FunctionSignature> {
        self.functions.iter().find(|f| f.name == name)
    }
}

use ReturnType::{Argument, Fixed};
use TypeKind::{Any, Array, Bool, Int, Object, String};

const fn f(
    name: &'static str,
    min_args: usize,
    max_args: usize,
    returns: ReturnType,
) -> FunctionSignature {
    FunctionSignature::new(name, min_args, Some(max_args), returns)
}

const fn variadic(name: &'static str, min_args: usize, returns: ReturnType) -> FunctionSignature {
    FunctionSignature::new(name, min_args, None, returns)
}

const SYS_FUNCTIONS: &[FunctionSignature] = &[
    variadic("concat", 1, Argument(0)),
    variadic("format", 1, Fixed(String)),
    f("toLower", 1, 1, Fixed(String)),
    f("toUpper", 1, 1, Fixed(String)),
    f("trim", 1, 1, Fixed(String)),
    f("length", 1, 1, Fixed(Int)),
    f("substring", 1, 3, Fixed(String)),
    f("replace", 3, 3, Fixed(String)),
    f("split", 2, 2, Fixed(Array)),
    f("startsWith", 2, 2, Fixed(Bool)),
    f("endsWith", 2, 2, Fixed(Bool)),
    f("indexOf", 2, 2, Fixed(Int)),
    f("lastIndexOf", 2, 2, Fixed(Int)),
    f("padLeft", 2, 3, Fixed(String)),
    f("string", 1, 1, Fixed(String)),
    f("int", 1, 1, Fixed(Int)),
    f("bool", 1, 1, Fixed(Bool)),
    f("json", 1, 1, Fixed(Any)),
    f("base64", 1, 1, Fixed(String)),
    f("dataUri", 1, 1, Fixed(String)),
    f("uri", 2, 2, Fixed(String)),
    variadic("uniqueString", 1, Fixed(String)),
    f("guid", 1, 5, Fixed(String)),
    f("if", 3, 3, Argument(1)),
    f("equals", 2, 2, Fixed(Bool)),
    f("not", 1, 1, Fixed(Bool)),
    variadic("and", 2, Fixed(Bool)),
    variadic("or", 2, Fixed(Bool)),
    f("empty", 1, 1, Fixed(Bool)),
    f("contains", 2, 2, Fixed(Bool)),
    f("add", 2, 2, Fixed(Int)),
    f("sub", 2, 2, Fixed(Int)),
    f("mul", 2, 2, Fixed(Int)),
    f("div", 2, 2, Fixed(Int)),
    f("mod", 2, 2, Fixed(Int)),
    variadic("min", 1, Fixed(Int)),
    variadic("max", 1, Fixed(Int)),
    variadic("union", 1, Argument(0)),
    variadic("intersection", 1, Argument(0)),
    f("first", 1, 1, Fixed(Any)),
    f("last", 1, 1, Fixed(Any)),
    f("take", 2, 2, Argument(0)),
    f("skip", 2, 2, Argument(0)),
    f("array", 1, 1, Fixed(Array)),
    f("range", 2, 2, Fixed(Array)),
    variadic("coalesce", 1, Fixed(Any)),
];

const AZ_FUNCTIONS: &[FunctionSignature] = &[
    f("resourceGroup", 0, 0, Fixed(Object)),
    f("subscription", 0, 0, Fixed(Object)),
    f("deployment", 0, 0, Fixed(Object)),
    f("environment", 0, 0, Fixed(Object)),
    f("tenant", 0, 0, Fixed(Object)),
    variadic("resourceId", 2, Fixed(String)),
    f("reference", 1, 3, Fixed(Object)),
    f("listKeys", 2, 2, Fixed(Object)),
    f("providers", 1, 2, Fixed(Object)),
];

/// The implicitly imported namespaces, in lookup order.
pub const NAMESPACES: &[Namespace] = &[
    Namespace {
        name: "sys",
        functions: SYS_FUNCTIONS,
    },
    Namespace {
        name: "az",
        functions: AZ_FUNCTIONS,
    },
];

pub fn namespace(name: &str) -> Option<&'static Namespace> {
    NAMESPACES.iter().find(|ns| ns.name == name)
}

/// Finds a builtin in any namespace, ignoring case. Template-format
/// function names are case-insensitive.
pub fn find_function_ignore_case(name: &str) -> Option<&'static FunctionSignature> {
    NAMESPACES
        .iter()
        .flat_map(|ns| ns.functions.iter())
        .find(|f| f.name.eq_ignore_ascii_case(name))
}

/// True for namespace and builtin function names.
pub fn is_builtin_name(name: &str) -> bool {
    namespace(name).is_some()
        || NAMESPACES
            .iter()
            .any(|ns| ns.function(name).is_some())
}
