//! Built-in grammars for common languages.
//!
//! These are ordinary descriptors registered ahead of anything found on
//! disk, so a user file claiming the same extension replaces them.

use crate::GrammarDescriptor;

/// Compact table form of a descriptor.
struct Builtin {
    name: &'static str,
    extensions: &'static [&'static str],
    keywords: [&'static [&'static str]; 4],
    operators: &'static [&'static str],
    line_comment: &'static str,
    block_comment: (&'static str, &'static str),
    string2: &'static [char],
    case_sensitive: bool,
    property_pattern: bool,
}

impl Builtin {
    fn descriptor(&self) -> GrammarDescriptor {
        let strings = |words: &[&str]| words.iter().map(|w| w.to_string()).collect::<Vec<_>>();
        let mut descriptor = GrammarDescriptor::new(self.name);
        descriptor.extensions = strings(self.extensions);
        descriptor.keywords1 = strings(self.keywords[0]);
        descriptor.keywords2 = strings(self.keywords[1]);
        descriptor.keywords3 = strings(self.keywords[2]);
        descriptor.keywords4 = strings(self.keywords[3]);
        descriptor.operators = strings(self.operators);
        descriptor.line_comment = self.line_comment.to_string();
        descriptor.block_comment_start = self.block_comment.0.to_string();
        descriptor.block_comment_end = self.block_comment.1.to_string();
        descriptor.string2_delimiters = self.string2.to_vec();
        descriptor.case_sensitive = self.case_sensitive;
        descriptor.property_pattern = self.property_pattern;
        descriptor
    }
}

/// Descriptors for every built-in language, in registration order.
pub(crate) fn descriptors() -> Vec<GrammarDescriptor> {
    BUILTINS
        .iter()
        .map(Builtin::descriptor)
        .chain(std::iter::once(brainfuck()))
        .collect()
}

/// Every command character is an operator; anything else is commentary.
fn brainfuck() -> GrammarDescriptor {
    let mut descriptor = GrammarDescriptor::new("Brainfuck");
    descriptor.extensions = vec![".b".to_string(), ".bf".to_string()];
    descriptor.operators = ["<", ">", "+", "-", "[", "]", ".", ","]
        .iter()
        .map(|op| op.to_string())
        .collect();
    descriptor.string_delimiters.clear();
    descriptor.string2_delimiters.clear();
    descriptor.line_comment.clear();
    descriptor.block_comment_start.clear();
    descriptor.block_comment_end.clear();
    descriptor.detect_numbers = false;
    descriptor
}

const NONE: &[&str] = &[];

const C_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "%", "=", "==", "!=", "<", ">", "<=", ">=", "&&", "||", "!", "&", "|",
    "^", "~", "<<", ">>", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "<<=", ">>=", "++",
    "--", "->", "::", "?", ":", ";", ",", ".", "(", ")", "[", "]", "{", "}",
];

const SCRIPT_OPERATORS: &[&str] = &[
    "+", "-", "*", "/", "%", "=", "==", "!=", "<", ">", "<=", ">=", "**", "//", "+=", "-=",
    "*=", "/=", "=>", "->", ":", ";", ",", ".", "(", ")", "[", "]", "{", "}", "&", "|", "^",
    "~",
];

const C_KEYWORDS: &[&str] = &[
    "auto", "break", "case", "char", "const", "continue", "default", "do", "double", "else",
    "enum", "extern", "float", "for", "goto", "if", "inline", "int", "long", "register",
    "restrict", "return", "short", "signed", "sizeof", "static", "struct", "switch", "typedef",
    "union", "unsigned", "void", "volatile", "while", "_Bool", "_Atomic", "_Noreturn",
    "_Static_assert", "_Thread_local",
];

const CPP_KEYWORDS: &[&str] = &[
    "alignas", "alignof", "and", "asm", "auto", "bool", "break", "case", "catch", "char",
    "class", "concept", "const", "consteval", "constexpr", "const_cast", "continue", "co_await",
    "co_return", "co_yield", "decltype", "default", "delete", "do", "double", "dynamic_cast",
    "else", "enum", "explicit", "export", "extern", "false", "float", "for", "friend", "goto",
    "if", "inline", "int", "long", "mutable", "namespace", "new", "noexcept", "not", "nullptr",
    "operator", "or", "private", "protected", "public", "register", "reinterpret_cast",
    "requires", "return", "short", "signed", "sizeof", "static", "static_assert",
    "static_cast", "struct", "switch", "template", "this", "thread_local", "throw", "true",
    "try", "typedef", "typeid", "typename", "union", "unsigned", "using", "virtual", "void",
    "volatile", "wchar_t", "while", "override", "final",
];

const CPP_TYPES: &[&str] = &[
    "string", "vector", "map", "set", "unordered_map", "unordered_set", "array", "list",
    "deque", "queue", "stack", "pair", "tuple", "optional", "variant", "shared_ptr",
    "unique_ptr", "weak_ptr", "function", "size_t", "int8_t", "int16_t", "int32_t", "int64_t",
    "uint8_t", "uint16_t", "uint32_t", "uint64_t",
];

const RUST_KEYWORDS: &[&str] = &[
    "as", "async", "await", "break", "const", "continue", "crate", "dyn", "else", "enum",
    "extern", "fn", "for", "if", "impl", "in", "let", "loop", "match", "mod", "move", "mut",
    "pub", "ref", "return", "self", "Self", "static", "struct", "super", "trait", "type",
    "unsafe", "use", "where", "while",
];

const RUST_TYPES: &[&str] = &[
    "bool", "char", "f32", "f64", "i8", "i16", "i32", "i64", "i128", "isize", "str", "u8",
    "u16", "u32", "u64", "u128", "usize", "String", "Vec", "Option", "Result", "Box", "Rc",
    "Arc", "HashMap", "HashSet", "BTreeMap", "BTreeSet",
];

const RUST_CONSTANTS: &[&str] = &["true", "false", "None", "Some", "Ok", "Err"];

const PYTHON_KEYWORDS: &[&str] = &[
    "and", "as", "assert", "async", "await", "break", "class", "continue", "def", "del", "elif",
    "else", "except", "finally", "for", "from", "global", "if", "import", "in", "is", "lambda",
    "nonlocal", "not", "or", "pass", "raise", "return", "try", "while", "with", "yield",
];

const PYTHON_BUILTINS: &[&str] = &[
    "print", "len", "range", "enumerate", "zip", "map", "filter", "sorted", "reversed", "min",
    "max", "sum", "abs", "isinstance", "getattr", "setattr", "super", "open", "repr", "iter",
    "next", "int", "float", "str", "bool", "list", "dict", "tuple", "set", "bytes",
];

const PYTHON_CONSTANTS: &[&str] = &["True", "False", "None"];

const JS_KEYWORDS: &[&str] = &[
    "async", "await", "break", "case", "catch", "class", "const", "continue", "debugger",
    "default", "delete", "do", "else", "export", "extends", "finally", "for", "from",
    "function", "if", "import", "in", "instanceof", "let", "new", "of", "return", "static",
    "super", "switch", "this", "throw", "try", "typeof", "var", "void", "while", "with",
    "yield",
];

const JS_TYPES: &[&str] = &[
    "Array", "Object", "String", "Number", "Boolean", "Function", "Symbol", "Map", "Set",
    "Promise", "RegExp", "Error", "Date", "JSON", "Math",
];

const JS_CONSTANTS: &[&str] = &["true", "false", "null", "undefined", "NaN", "Infinity"];

const JAVA_KEYWORDS: &[&str] = &[
    "abstract", "assert", "break", "case", "catch", "class", "const", "continue", "default",
    "do", "else", "enum", "extends", "final", "finally", "for", "goto", "if", "implements",
    "import", "instanceof", "interface", "native", "new", "package", "private", "protected",
    "public", "return", "static", "strictfp", "super", "switch", "synchronized", "this",
    "throw", "throws", "transient", "try", "void", "volatile", "while", "var", "record",
];

const JAVA_TYPES: &[&str] = &[
    "boolean", "byte", "char", "double", "float", "int", "long", "short", "String", "Integer",
    "Long", "Double", "Object", "List", "ArrayList", "Map", "HashMap", "Set", "Optional",
    "Exception",
];

const JAVA_CONSTANTS: &[&str] = &["true", "false", "null"];

const LUA_KEYWORDS: &[&str] = &[
    "and", "break", "do", "else", "elseif", "end", "for", "function", "goto", "if", "in",
    "local", "not", "or", "repeat", "return", "then", "until", "while",
];

const LUA_CONSTANTS: &[&str] = &["true", "false", "nil"];

const SHELL_KEYWORDS: &[&str] = &[
    "if", "then", "else", "elif", "fi", "case", "esac", "for", "select", "while", "until", "do",
    "done", "in", "function", "time",
];

const SHELL_BUILTINS: &[&str] = &[
    "echo", "printf", "read", "cd", "pwd", "export", "unset", "local", "return", "exit",
    "source", "alias", "set", "shift", "test", "eval", "exec", "trap",
];

const SQL_KEYWORDS: &[&str] = &[
    "select", "from", "where", "insert", "into", "values", "update", "set", "delete", "create",
    "table", "drop", "alter", "index", "view", "join", "inner", "left", "right", "outer", "on",
    "group", "by", "order", "having", "limit", "offset", "union", "as", "distinct", "and", "or",
    "not", "in", "is", "like", "between", "exists", "case", "when", "then", "else", "end",
];

const SQL_TYPES: &[&str] = &[
    "int", "integer", "bigint", "smallint", "real", "float", "double", "decimal", "numeric",
    "char", "varchar", "text", "date", "time", "timestamp", "boolean", "blob",
];

const SQL_CONSTANTS: &[&str] = &["null", "true", "false"];

const CSS_KEYWORDS: &[&str] = &[
    "important", "media", "import", "keyframes", "charset", "supports",
];

const CSS_PROPERTIES: &[&str] = &[
    "color", "background", "border", "margin", "padding", "width", "height", "display",
    "position", "top", "right", "bottom", "left", "font", "opacity", "overflow", "transform",
    "transition", "animation", "cursor", "content", "gap", "grid", "flex",
];

const JSON_CONSTANTS: &[&str] = &["true", "false", "null"];

const YAML_CONSTANTS: &[&str] = &["true", "false", "null", "yes", "no", "on", "off"];

const BUILTINS: &[Builtin] = &[
    Builtin {
        name: "C",
        extensions: &[".c"],
        keywords: [C_KEYWORDS, NONE, NONE, NONE],
        operators: C_OPERATORS,
        line_comment: "//",
        block_comment: ("/*", "*/"),
        string2: &['\''],
        case_sensitive: true,
        property_pattern: false,
    },
    Builtin {
        name: "C++",
        extensions: &[
            ".C", ".cc", ".cpp", ".cxx", ".c++", ".h", ".H", ".hh", ".hpp", ".hxx", ".h++",
            ".cppm", ".ixx",
        ],
        keywords: [CPP_KEYWORDS, CPP_TYPES, NONE, NONE],
        operators: C_OPERATORS,
        line_comment: "//",
        block_comment: ("/*", "*/"),
        string2: &['\''],
        case_sensitive: true,
        property_pattern: false,
    },
    Builtin {
        name: "Rust",
        extensions: &[".rs"],
        keywords: [RUST_KEYWORDS, RUST_TYPES, RUST_CONSTANTS, NONE],
        operators: C_OPERATORS,
        line_comment: "//",
        block_comment: ("/*", "*/"),
        // Lifetimes make a quote-delimited char run unreliable
        string2: &[],
        case_sensitive: true,
        property_pattern: false,
    },
    Builtin {
        name: "Python",
        extensions: &[".py", ".pyw"],
        keywords: [PYTHON_KEYWORDS, PYTHON_BUILTINS, PYTHON_CONSTANTS, NONE],
        operators: SCRIPT_OPERATORS,
        line_comment: "#",
        block_comment: ("", ""),
        string2: &['\''],
        case_sensitive: true,
        property_pattern: false,
    },
    Builtin {
        name: "JavaScript",
        extensions: &[".js", ".mjs", ".cjs"],
        keywords: [JS_KEYWORDS, JS_TYPES, JS_CONSTANTS, NONE],
        operators: SCRIPT_OPERATORS,
        line_comment: "//",
        block_comment: ("/*", "*/"),
        string2: &['\'', '`'],
        case_sensitive: true,
        property_pattern: false,
    },
    Builtin {
        name: "Java",
        extensions: &[".java"],
        keywords: [JAVA_KEYWORDS, JAVA_TYPES, JAVA_CONSTANTS, NONE],
        operators: C_OPERATORS,
        line_comment: "//",
        block_comment: ("/*", "*/"),
        string2: &['\''],
        case_sensitive: true,
        property_pattern: false,
    },
    Builtin {
        name: "JSON",
        extensions: &[".json"],
        keywords: [JSON_CONSTANTS, NONE, NONE, NONE],
        operators: &[":", ",", "[", "]", "{", "}"],
        line_comment: "",
        block_comment: ("", ""),
        string2: &[],
        case_sensitive: true,
        property_pattern: true,
    },
    Builtin {
        name: "YAML",
        extensions: &[".yaml", ".yml"],
        keywords: [YAML_CONSTANTS, NONE, NONE, NONE],
        operators: &[":", "-", "|", ">", "[", "]", "{", "}", ","],
        line_comment: "#",
        block_comment: ("", ""),
        string2: &['\''],
        case_sensitive: false,
        property_pattern: true,
    },
    Builtin {
        name: "Lua",
        extensions: &[".lua"],
        keywords: [LUA_KEYWORDS, LUA_CONSTANTS, NONE, NONE],
        operators: &[
            "+", "-", "*", "/", "%", "^", "#", "==", "~=", "<=", ">=", "<", ">", "=", "..", "...",
            "(", ")", "{", "}", "[", "]", ";", ":", ",", ".",
        ],
        line_comment: "--",
        block_comment: ("--[[", "]]"),
        string2: &['\''],
        case_sensitive: true,
        property_pattern: false,
    },
    Builtin {
        name: "Bash",
        extensions: &[".sh", ".bash"],
        keywords: [SHELL_KEYWORDS, SHELL_BUILTINS, NONE, NONE],
        operators: &["|", "||", "&", "&&", ";", ";;", "<", ">", ">>", "=", "$", "(", ")", "[", "]"],
        line_comment: "#",
        block_comment: ("", ""),
        string2: &['\''],
        case_sensitive: true,
        property_pattern: false,
    },
    Builtin {
        name: "SQL",
        extensions: &[".sql"],
        keywords: [SQL_KEYWORDS, SQL_TYPES, SQL_CONSTANTS, NONE],
        operators: &["=", "<>", "!=", "<", ">", "<=", ">=", "+", "-", "*", "/", "(", ")", ",", ";", "."],
        line_comment: "--",
        block_comment: ("/*", "*/"),
        string2: &['\''],
        case_sensitive: false,
        property_pattern: false,
    },
    Builtin {
        name: "CSS",
        extensions: &[".css"],
        keywords: [CSS_KEYWORDS, CSS_PROPERTIES, NONE, NONE],
        operators: &["{", "}", ":", ";", ",", ">", "+", "~", "(", ")", "@", "!", "#", "."],
        line_comment: "",
        block_comment: ("/*", "*/"),
        string2: &['\''],
        case_sensitive: false,
        property_pattern: false,
    },
    Builtin {
        name: "HTML",
        extensions: &[".htm", ".html"],
        keywords: [NONE, NONE, NONE, NONE],
        operators: &["</", "/>", "<", ">", "="],
        line_comment: "",
        block_comment: ("<!--", "-->"),
        string2: &['\''],
        case_sensitive: false,
        property_pattern: false,
    },
    Builtin {
        name: "XML",
        extensions: &[".xml", ".xsd", ".svg"],
        keywords: [NONE, NONE, NONE, NONE],
        operators: &["</", "/>", "<?", "?>", "<", ">", "="],
        line_comment: "",
        block_comment: ("<!--", "-->"),
        string2: &['\''],
        case_sensitive: true,
        property_pattern: false,
    },
];
