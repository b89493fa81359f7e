//! Query-language reference printed by `pathfind docs`

use super::CliError;

/// Available documentation categories
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocCategory {
    Paths,
    Repeat,
    Slices,
    Conditions,
    Functions,
    Variables,
}

impl DocCategory {
    pub const ALL: [DocCategory; 6] = [
        DocCategory::Paths,
        DocCategory::Repeat,
        DocCategory::Slices,
        DocCategory::Conditions,
        DocCategory::Functions,
        DocCategory::Variables,
    ];

    /// Parse category name from string
    pub fn from_name(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "paths" | "path" | "syntax" => Some(Self::Paths),
            "repeat" | "descent" | "wildcard" => Some(Self::Repeat),
            "slices" | "slice" | "limit" => Some(Self::Slices),
            "conditions" | "condition" | "filters" | "filter" | "operators" => {
                Some(Self::Conditions)
            }
            "functions" | "function" | "capabilities" => Some(Self::Functions),
            "variables" | "variable" | "values" => Some(Self::Variables),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Paths => "paths",
            Self::Repeat => "repeat",
            Self::Slices => "slices",
            Self::Conditions => "conditions",
            Self::Functions => "functions",
            Self::Variables => "variables",
        }
    }

    fn content(self) -> &'static str {
        match self {
            Self::Paths => PATHS_DOC,
            Self::Repeat => REPEAT_DOC,
            Self::Slices => SLICES_DOC,
            Self::Conditions => CONDITIONS_DOC,
            Self::Functions => FUNCTIONS_DOC,
            Self::Variables => VARIABLES_DOC,
        }
    }
}

/// Get the docs overview (category listing)
pub fn get_docs_overview() -> &'static str {
    r#"PATHFIND DOCUMENTATION

A path expression navigates a JSON document segment by segment. Segments are
separated by dots; filters in brackets decide which branches go on.

DOCUMENTATION CATEGORIES

  paths         Field access, indexes, parent navigation
  repeat        Wildcard (*), recursive descent (#), conditional descent (+)
  slices        Offset/count windows: 3~5, -1
  conditions    Filters, comparison operators, & and |, literals, regexes
  functions     :name(args) calls and the builtin set
  variables     $name references bound with --var

QUICK REFERENCE

  name          Member "name"
  0             Array index 0
  .             Parent of the current value
  *             Every direct child
  #             This value and every descendant
  3~5           Five items starting at offset 3
  -1            The last item
  (cond)        Keep the value when cond holds
  :upper()      Call a function on the value

Run 'pathfind docs <category>' for detailed documentation.
"#
}

/// Get documentation for a specific category
pub fn get_doc_category(name: &str) -> Result<&'static str, CliError> {
    DocCategory::from_name(name)
        .map(DocCategory::content)
        .ok_or_else(|| CliError::UnknownCategory(name.to_string()))
}

const PATHS_DOC: &str = r#"PATHS - Field Access and Navigation

FIELD ACCESS
  name
    Member of an object. Names start with a letter or underscore and may
    contain letters, digits, '_' and '-'.

    Example:
      Input:  {"user": {"name": "Alice"}}
      Query:  user.name
      Output: ["Alice"]

    Constraints:
      - A missing or null member produces no result (never an error)

ARRAY INDEX
  0
    A number selects an array element (or an object member named "0").

    Example:
      Input:  {"items": ["a", "b", "c"]}
      Query:  items.1
      Output: ["b"]

PARENT
  .
    Step back to the value the current one was reached from.

    Example:
      Input:  {"user": {"name": "Alice", "age": 30}}
      Query:  user.name..age
      Output: [30]

TRUNCATION
  Text the grammar cannot place ends the path; everything after it is
  ignored. 'pathfind check' reports the ignored remainder.
"#;

const REPEAT_DOC: &str = r#"REPEAT - Fan-out Operators

WILDCARD
  *
    Every direct child of an array or object, in order.
  ^*
    The same, back to front.

    Example:
      Input:  [{"n": 1}, {"n": 2}]
      Query:  *.n
      Output: [1, 2]

RECURSIVE DESCENT
  #
    The current value and every value beneath it, pre-order (a node comes
    before anything nested inside it).
  ^#
    Children visited back to front.

    Example:
      Input:  {"a": {"name": "x"}, "b": [{"name": "y"}]}
      Query:  #name
      Output: ["x", "y"]

CONDITIONAL DESCENT
  +(cond)
    Continue only when cond holds. A '#' further down the path only visits
    values that satisfy the nearest enclosing '+' condition.

    Example:
      Input:  {"type": "dir", "children": [{"type": "file", "name": "a"}]}
      Query:  +(type == "file" | children).#name
"#;

const SLICES_DOC: &str = r#"SLICES - Offset and Count Windows

  N~M
    M items starting at offset N. M of 0 means "to the end".
  -N~M
    Offset counted from the end.
  -N
    The last N items.
  ^N~M
    The same window, visited back to front.

  Example:
    Input:  [1, 2, 3, 4, 5]
    Query:  1~2       Output: [2, 3]
    Query:  -1        Output: [5]
    Query:  ^0~2      Output: [2, 1]

  Constraints:
    - A window running past the end is clamped
    - An offset before the start selects everything
"#;

const CONDITIONS_DOC: &str = r#"CONDITIONS - Filters, Operators and Literals

FILTERS
  path(cond)    path[cond]
    Keep the current value when cond holds. The path continues after the
    closing bracket.

    Example:
      Input:  [{"maker": "Honda", "year": 2010}, {"maker": "Honda", "year": 2007}]
      Query:  *.(maker == "Honda" & year > 2009)
      Output: [{"maker": "Honda", "year": 2010}]

OPERATORS
  ==  !=  <  >  <=  >=     ('=' is accepted as '==')

  Constraints:
    - Integers and floats compare numerically
    - Strings compare lexicographically, booleans false < true
    - Ordering between different types is always false

COMBINATORS
  a & b    b is only evaluated when a holds
  a | b    the first operand that holds wins; later ones are skipped

NEGATION
  !a    !!a
    Each '!' inverts; the string "false" counts as false.

LITERALS
  2009  1.5  true  false  "text"  'text'  /regex/flags

  A regex on the right of '==' tests the left side as text:
    name == /^ho/i     name matches
    name != /^ho/i     name does not match
"#;

const FUNCTIONS_DOC: &str = r#"FUNCTIONS - Capability Calls

  :name
  :name(args)
  :name(args).other(args)
    Call a named capability on the current value. Arguments are JSON
    literals separated by commas. A bare ':' converts the value to text.

    Example:
      Input:  {"name": "alice"}
      Query:  name:upper()
      Output: ["ALICE"]

BUILTINS
  to_string              Text form of any value
  upper  lower  trim     String case and whitespace
  length  count          Size of a string, array or object
  keys  values           Object members
  type                   "null", "boolean", "number", "string", "array", "object"
  first  last            Array ends
  sum  min  max  avg     Numeric aggregates
  unique  sort  sort_desc  reverse  flatten
  contains(s)  starts_with(s)  ends_with(s)
  split(d)
  matches(re)

  Constraints:
    - Calling an unknown function is an error
"#;

const VARIABLES_DOC: &str = r#"VARIABLES - Query Values

  $name
    In a path: the member named by the variable. An unbound variable is
    skipped.
    In a condition: the variable's value. An unbound variable yields
    nothing.

    Example:
      pathfind find '*.(maker == $maker)' --var maker='"Honda"' -i autos.json
"#;
