#![allow(dead_code)]

use cdsynth::*;

pub fn load(src: &str) -> problem::Problem {
    let problem = parse::problem(src).unwrap();
    typecheck::problem(&problem).unwrap();
    problem
}

/// `S → str.++ S S | x | "."` with `x = "ab" ↦ "ab."`.
pub fn append_dot() -> problem::Problem {
    load(
        r#"
[Synth]
start = "S"
return = "Str"
inputs = { x = "Str" }
expect = "solved"

[Nonterminal.S]
sort = "Str"
productions = ["str.++ S S", "x", "\".\""]

[[Example]]
inputs = { x = "ab" }
output = "ab."
"#,
    )
}

/// The same grammar, with an example no derivation can reach.
pub fn empty_to_x() -> problem::Problem {
    load(
        r#"
[Synth]
start = "S"
return = "Str"
inputs = { x = "Str" }
expect = "unrealizable"

[Nonterminal.S]
sort = "Str"
productions = ["str.++ S S", "x", "\".\""]

[[Example]]
inputs = { x = "" }
output = "X"
"#,
    )
}

/// Two examples whose output lengths rule out every two-character literal.
pub fn pad_two() -> problem::Problem {
    load(
        r#"
[Synth]
start = "S"
return = "Str"
inputs = { x = "Str" }

[Nonterminal.S]
sort = "Str"
productions = ["x", "\"aa\"", "\"bb\"", "str.++ S S"]

[[Example]]
inputs = { x = "a" }
output = "aaa"

[[Example]]
inputs = { x = "aa" }
output = "aaaa"
"#,
    )
}

pub fn oracle() -> smt::Z3 {
    smt::Z3::new(None)
}

/// Every oracle backend, for checks that must hold for each of them.
pub fn oracles() -> Vec<Box<dyn oracle::Oracle>> {
    menu::Backend::all()
        .into_iter()
        .map(|b| b.oracle(&search::Config::default()).unwrap())
        .collect()
}
