/// An entry in the error code registry.
pub struct ErrorEntry {
    pub code: &'static str,
    pub short: &'static str,  // brief description for tooling
    pub long: &'static str,   // full explanation for --explain
}

/// All stable error codes of the compiler.
pub static REGISTRY: &[ErrorEntry] = &[
    // ── Lexer ────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SPN-L001",
        short: "unexpected character",
        long: r#"## SPN-L001: unexpected character

A character was found that does not start any token of a method body.

**Example:**

    x := y ` 2

Remove the character, or check for a missing quote on a comment (`'`).
"#,
    },
    ErrorEntry {
        code: "SPN-L002",
        short: "integer constant wider than 32 bits",
        long: r#"## SPN-L002: integer constant wider than 32 bits

Decimal, `$` hexadecimal and `%` binary constants must fit in 32 bits.

**Example:**

    x := $1_0000_0000
"#,
    },
    ErrorEntry {
        code: "SPN-L003",
        short: "invalid floating-point constant",
        long: r#"## SPN-L003: invalid floating-point constant

Float constants are IEEE-754 single precision. A constant too large for
single precision (such as `1e39`) cannot be represented.
"#,
    },

    // ── Syntax ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SPN-S001",
        short: "expected an expression term",
        long: r#"## SPN-S001: expected an expression term

An operand (constant, symbol, parenthesised expression, unary operator,
conversion or LOOKUP) was expected.

**Example:**

    x := 3 + * 4
"#,
    },
    ErrorEntry {
        code: "SPN-S002",
        short: "expected a specific token",
        long: r#"## SPN-S002: expected a specific token

The construct requires a particular token here, such as the `)` closing a
parenthesised expression or the `:` after a CASE match value.
"#,
    },
    ErrorEntry {
        code: "SPN-S003",
        short: "undefined symbol",
        long: r#"## SPN-S003: undefined symbol

An identifier is neither in the symbol file passed with `--symbols` nor
defined by a leading `NAME = value` line.

**Example:**

    x := count + 1     ' count was never declared
"#,
    },
    ErrorEntry {
        code: "SPN-S004",
        short: "expected end of line",
        long: r#"## SPN-S004: expected end of line

A statement or constant definition is complete but more tokens follow on
the same line. Each statement goes on its own line.
"#,
    },
    ErrorEntry {
        code: "SPN-S005",
        short: "ELSE/ELSEIF without IF",
        long: r#"## SPN-S005: ELSE/ELSEIF without IF

ELSEIF, ELSEIFNOT and ELSE must sit at the same indentation as the IF they
continue, directly after that IF's block.

**Example:**

    if a
      x := 1
      else          ' indented into the IF block
      x := 2
"#,
    },
    ErrorEntry {
        code: "SPN-S006",
        short: "misplaced or repeated OTHER",
        long: r#"## SPN-S006: misplaced or repeated OTHER

OTHER may appear once, as a match line of a CASE or CASE_FAST block.
"#,
    },
    ErrorEntry {
        code: "SPN-S007",
        short: "OTHER must be last",
        long: r#"## SPN-S007: OTHER must be last

No match line may follow the OTHER line of a CASE block.
"#,
    },
    ErrorEntry {
        code: "SPN-S008",
        short: "NEXT/QUIT outside REPEAT",
        long: r#"## SPN-S008: NEXT/QUIT outside REPEAT

NEXT and QUIT act on the innermost enclosing REPEAT. Used anywhere else
they have nothing to continue or leave.
"#,
    },
    ErrorEntry {
        code: "SPN-S009",
        short: "CASE_FAST value is not an integer constant",
        long: r#"## SPN-S009: CASE_FAST value is not an integer constant

CASE_FAST builds a jump table at compile time, so every match value and
range bound must fold to an integer constant.

**Fix:** use CASE for run-time match values.
"#,
    },
    ErrorEntry {
        code: "SPN-S010",
        short: "CASE_FAST value matched twice",
        long: r#"## SPN-S010: CASE_FAST value matched twice

Each value may select only one CASE_FAST block. Overlapping ranges count.

**Example:**

    case_fast x
      1..4: a := 1
      3: a := 2     ' 3 is already in 1..4
"#,
    },
    ErrorEntry {
        code: "SPN-S011",
        short: "expected a statement",
        long: r#"## SPN-S011: expected a statement

A line must start with an assignment target, a block keyword (IF, CASE,
CASE_FAST, REPEAT), NEXT, QUIT, RETURN or ABORT.
"#,
    },
    ErrorEntry {
        code: "SPN-S012",
        short: "symbol already defined",
        long: r#"## SPN-S012: symbol already defined

A `NAME = value` line names a symbol that already exists, either in the
symbol file or in an earlier definition. Names are case-insensitive.
"#,
    },
    ErrorEntry {
        code: "SPN-S013",
        short: "WHILE/UNTIL without REPEAT",
        long: r#"## SPN-S013: WHILE/UNTIL without REPEAT

A post-test WHILE or UNTIL must sit at the indentation of a bare REPEAT,
directly after its block.
"#,
    },
    ErrorEntry {
        code: "SPN-S014",
        short: "CASE block has no cases",
        long: r#"## SPN-S014: CASE block has no cases

A CASE needs at least one match line indented under it; a CASE_FAST needs
at least one match value besides OTHER.
"#,
    },
    ErrorEntry {
        code: "SPN-S015",
        short: "constant definition does not fold",
        long: r#"## SPN-S015: constant definition does not fold

The value of a `NAME = value` line refers to a run-time variable, so it has
no compile-time value.
"#,
    },
    ErrorEntry {
        code: "SPN-S016",
        short: "expected a variable",
        long: r#"## SPN-S016: expected a variable

Assignments, `REPEAT ... WITH v` and `REPEAT v FROM ...` need a local or
object variable.
"#,
    },
    ErrorEntry {
        code: "SPN-S017",
        short: "circular constant definition",
        long: r#"## SPN-S017: circular constant definition

Every remaining `NAME = value` line waits on another one, so none of them
can be folded:

    A = B + 1
    B = A * 2

Break the chain by giving one of the names a value that does not depend on
the others.
"#,
    },

    // ── Limits ───────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SPN-K001",
        short: "too many CASE match lines",
        long: r#"## SPN-K001: too many CASE match lines

A CASE may carry at most `case_limit` match lines (256 by default).
"#,
    },
    ErrorEntry {
        code: "SPN-K002",
        short: "too many ELSEIF clauses",
        long: r#"## SPN-K002: too many ELSEIF clauses

An IF may carry at most `elseif_limit` ELSEIF/ELSEIFNOT clauses (256 by default).
"#,
    },
    ErrorEntry {
        code: "SPN-K003",
        short: "CASE_FAST values span too wide a range",
        long: r#"## SPN-K003: CASE_FAST values span too wide a range

The jump table has one entry per value between the smallest and largest
match value, so `max - min` may not exceed `case_fast_span_limit` (255 by
default). Use CASE for sparse values.
"#,
    },
    ErrorEntry {
        code: "SPN-K004",
        short: "CASE_FAST blocks too large",
        long: r#"## SPN-K004: CASE_FAST blocks too large

Jump table entries are 16-bit offsets from the table, so every CASE_FAST
block must start within `case_fast_table_limit` bytes of it.
"#,
    },
    ErrorEntry {
        code: "SPN-K005",
        short: "blocks nested too deeply",
        long: r#"## SPN-K005: blocks nested too deeply

IF, CASE, CASE_FAST, REPEAT and LOOKUP constructs may nest at most
`block_nest_limit` levels (16 by default).
"#,
    },
    ErrorEntry {
        code: "SPN-K006",
        short: "program too large",
        long: r#"## SPN-K006: program too large

The object image may not exceed 1024KB.
"#,
    },

    // ── Type ─────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SPN-T001",
        short: "integer value in a float expression",
        long: r#"## SPN-T001: integer value in a float expression

An expression is integer or floating point throughout. Its first constant
or mode-specific operator decides which; integer constants and operators
may not follow once it is floating point.

**Example:**

    x := 1.5 & 3

**Fix:** convert explicitly with `ROUND()`/`TRUNC()` or `FLOAT()`.
"#,
    },
    ErrorEntry {
        code: "SPN-T002",
        short: "float value in an integer expression",
        long: r#"## SPN-T002: float value in an integer expression

The mirror of SPN-T001: a float constant or float-only operator (such as
`+.`) appears in an expression already decided to be integer.

**Example:**

    x := 3 & 1.5
"#,
    },
    ErrorEntry {
        code: "SPN-T003",
        short: "divide by zero",
        long: r#"## SPN-T003: divide by zero

A constant division or remainder has a zero divisor. Divisions by a
run-time value are not checked at compile time.
"#,
    },
    ErrorEntry {
        code: "SPN-T004",
        short: "floating-point overflow",
        long: r#"## SPN-T004: floating-point overflow

A constant float operation produced infinity or NaN, or ROUND/TRUNC got a
value outside the signed 32-bit range.
"#,
    },
    ErrorEntry {
        code: "SPN-T005",
        short: "operator has no run-time float form",
        long: r#"## SPN-T005: operator has no run-time float form

`#>`, `<#` and `<=>` can be folded on float constants but have no float
bytecode, so they cannot take run-time float operands.
"#,
    },

    // ── Range ────────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SPN-R001",
        short: "branch target out of range",
        long: r#"## SPN-R001: branch target out of range

Branch displacements are at most four bytes wide and reach about ±256MB.
"#,
    },

    // ── Internal ─────────────────────────────────────────────────────────────
    ErrorEntry {
        code: "SPN-I001",
        short: "branch relaxation did not converge",
        long: r#"## SPN-I001: branch relaxation did not converge

Branch sizes did not settle within `max_relaxation_passes` passes. Raising
the limit in the config file may help; please report the source.
"#,
    },
    ErrorEntry {
        code: "SPN-I002",
        short: "value stack underflow",
        long: r#"## SPN-I002: value stack underflow

The constant folder popped more operands than it pushed. This is a
compiler fault.
"#,
    },
    ErrorEntry {
        code: "SPN-I003",
        short: "inconsistent image or block state",
        long: r#"## SPN-I003: inconsistent image or block state

An image offset fell outside the written area, or relaxation passes saw
constructs in a different order. This is a compiler fault.
"#,
    },
    ErrorEntry {
        code: "SPN-I004",
        short: "operator applied in the wrong mode",
        long: r#"## SPN-I004: operator applied in the wrong mode

An operator reached evaluation or emission in a mode it has no form for.
This is a compiler fault.
"#,
    },
];

/// Look up an error entry by code (e.g. `"SPN-T003"`).
pub fn lookup(code: &str) -> Option<&'static ErrorEntry> {
    REGISTRY.iter().find(|e| e.code == code)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_known_code() {
        let e = lookup("SPN-T003").expect("SPN-T003 should be in registry");
        assert_eq!(e.code, "SPN-T003");
        assert!(!e.short.is_empty());
        assert!(e.long.contains("SPN-T003"));
    }

    #[test]
    fn lookup_unknown_returns_none() {
        assert!(lookup("SPN-X999").is_none());
        assert!(lookup("").is_none());
    }

    #[test]
    fn all_codes_unique() {
        let mut codes: Vec<&str> = REGISTRY.iter().map(|e| e.code).collect();
        codes.sort_unstable();
        let len_before = codes.len();
        codes.dedup();
        assert_eq!(codes.len(), len_before, "duplicate codes in registry");
    }

    #[test]
    fn every_long_text_names_its_code() {
        for entry in REGISTRY {
            assert!(entry.long.contains(entry.code), "{} long text lacks its code", entry.code);
        }
    }

    #[test]
    fn every_emitted_code_is_registered() {
        let sources = [
            include_str!("../lexer/mod.rs"),
            include_str!("../compiler/mod.rs"),
            include_str!("../compiler/resolve.rs"),
            include_str!("../compiler/emit.rs"),
            include_str!("../compiler/block.rs"),
            include_str!("../compiler/con.rs"),
        ];
        for source in sources {
            for (i, _) in source.match_indices("\"SPN-") {
                let code = &source[i + 1..i + 9];
                assert!(lookup(code).is_some(), "{code} is not registered");
            }
        }
    }
}
