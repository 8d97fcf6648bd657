pub mod backtrack;
pub mod benchmark;
pub mod bundled;
pub mod conflict;
pub mod decide;
pub mod encoder;
pub mod grammar;
pub mod interpret;
pub mod knowledge;
pub mod logic;
pub mod main_handler;
pub mod menu;
pub mod oracle;
pub mod parse;
pub mod problem;
pub mod propagate;
pub mod search;
pub mod semantics;
#[cfg(not(target_arch = "wasm32"))]
pub mod smt;
pub mod tree;
pub mod typecheck;
pub mod unparse;
pub mod util;

use wasm_bindgen::prelude::*;

#[wasm_bindgen]
pub fn parse_problem(src: String) -> Result<JsValue, String> {
    let problem = parse::problem(&src)?;
    serde_wasm_bindgen::to_value(&problem).map_err(|e| e.to_string())
}

#[wasm_bindgen]
pub fn synthesize(
    problem_src: String,
    timeout_ms: u64,
    seed: u64,
) -> Result<String, String> {
    let problem = parse::problem(&problem_src)?;
    typecheck::problem(&problem).map_err(|e| e.message)?;

    let config = search::Config {
        timeout_ms: Some(timeout_ms),
        seed,
        ..search::Config::default()
    };
    let mut oracle = menu::Backend::default().oracle(&config)?;

    let report = search::synthesize(&problem, &config, oracle.as_mut())?;
    match report.outcome {
        search::Outcome::Solved(program) => {
            Ok(unparse::define_fun(&problem, &program))
        }
        search::Outcome::Unrealizable => Err("Unrealizable".to_owned()),
        search::Outcome::Unknown(reason) => {
            Err(format!("Unknown ({:?})", reason))
        }
    }
}
