//! Structural characters and identifier construction for the addressing
//! scheme.
//!
//! Every action identifier and variable key the engine emits is assembled
//! from a namespace name, a chain of state level names, and five reserved
//! structural characters. Names supplied by callers must not contain the
//! characters reserved for their role; that validation belongs to the
//! caller layer, not here.

/// Separates level names inside an input path string (`"Awake>Morning"`).
pub const LEVEL_SEPARATOR: char = '>';

/// Joins a namespace to a leaf address, and level names inside an address
/// (`"Home|Awake|Morning"`).
pub const BRANCH_SEPARATOR: char = '|';

/// Marks a context action identifier (`"Home+guests"`).
pub const CONTEXT_MARKER: char = '+';

/// Marks the exit variant of an action identifier (`"Home*"`).
pub const EXIT_MARKER: char = '*';

/// Replaces non-alphanumeric characters in generated variable keys.
pub const KEY_SEPARATOR: char = '_';

/// Characters forbidden in namespace, context, and group names.
pub const NAME_RESERVED: [char; 5] = [
    BRANCH_SEPARATOR,
    LEVEL_SEPARATOR,
    CONTEXT_MARKER,
    EXIT_MARKER,
    KEY_SEPARATOR,
];

/// Characters forbidden inside a state path. The level separator is what
/// delimits levels, so it stays legal.
pub const LEVEL_RESERVED: [char; 4] =
    [BRANCH_SEPARATOR, CONTEXT_MARKER, EXIT_MARKER, KEY_SEPARATOR];

/// Suffix of the prior-path mirror key.
pub const PRIOR_SUFFIX: &str = "__PriorState";

/// Suffix of the last-change timestamp mirror key.
pub const CHANGED_SUFFIX: &str = "__LastChange";

/// Suffix of the serialized active-context-list mirror key.
pub const CONTEXT_LIST_SUFFIX: &str = "__Contexts";

/// Infix of per-context indicator keys (`"Home__Context__guests"`).
pub const CONTEXT_FLAG_INFIX: &str = "__Context__";

/// Qualify a leaf address with its namespace: `Home` + `Awake|Morning`
/// becomes `Home|Awake|Morning`.
pub fn qualify(namespace: &str, address: &str) -> String {
    format!("{namespace}{BRANCH_SEPARATOR}{address}")
}

/// The exit variant of an action identifier.
pub fn exit_id(action: &str) -> String {
    format!("{action}{EXIT_MARKER}")
}

/// The context enter/exit variant of an action identifier.
pub fn context_id(action: &str, context: &str, entering: bool) -> String {
    if entering {
        format!("{action}{CONTEXT_MARKER}{context}")
    } else {
        format!("{action}{CONTEXT_MARKER}{context}{EXIT_MARKER}")
    }
}

/// Derive a variable key from a logical name: trim, replace every
/// non-alphanumeric character with [`KEY_SEPARATOR`], collapse separator
/// runs. Applying it twice is a fixed point.
pub fn variable_key(name: &str) -> String {
    collapse_separators(&replace_symbols(name))
}

/// Like [`variable_key`] but without run collapsing, so the fixed-suffix
/// technical keys stay visually distinct from ordinary leaf keys
/// (`Home__LastChange` vs `Home_Awake`).
pub fn technical_key(name: &str) -> String {
    replace_symbols(name)
}

fn replace_symbols(name: &str) -> String {
    name.trim()
        .chars()
        .map(|c| if c.is_alphanumeric() { c } else { KEY_SEPARATOR })
        .collect()
}

fn collapse_separators(mapped: &str) -> String {
    let mut out = String::with_capacity(mapped.len());
    for c in mapped.chars() {
        if c == KEY_SEPARATOR && out.ends_with(KEY_SEPARATOR) {
            continue;
        }
        out.push(c);
    }
    out
}
