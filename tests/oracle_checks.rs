mod common;

use cdsynth::bundled::{self, Bundled};
use cdsynth::logic::*;
use cdsynth::oracle::*;
use cdsynth::parse;

fn t(src: &str) -> Formula {
    parse::template(src).unwrap()
}

#[test]
fn linear_satisfiability() {
    for mut o in common::oracles() {
        assert_eq!(
            o.satisfiable(&[t("a = b + c"), t("0 < b"), t("0 < c"), t("a = 2")]),
            SatResult::Sat
        );
        assert_eq!(
            o.satisfiable(&[t("a = b + c"), t("0 < b"), t("0 < c"), t("a = 1")]),
            SatResult::Unsat
        );
        assert_eq!(o.satisfiable(&[t("a = b"), t("a != b")]), SatResult::Unsat);
        assert_eq!(
            o.satisfiable(&[t("a >= 3"), t("a <= 3"), t("a != 3")]),
            SatResult::Unsat
        );
        assert_eq!(
            o.satisfiable(&[t("x - y = 1"), t("x = 5")]),
            SatResult::Sat,
            "{}",
            o.name()
        );
    }
}

#[test]
fn negated_inequalities() {
    for mut o in common::oracles() {
        let phi = Formula::not(t("a <= 3"));
        assert_eq!(o.satisfiable(&[phi.clone(), t("a <= 4")]), SatResult::Sat);
        assert_eq!(o.satisfiable(&[phi, t("a < 4")]), SatResult::Unsat);
    }
}

#[test]
fn boolean_structure() {
    let c = |n, l| Formula::choice(n, l);
    for mut o in common::oracles() {
        let root = Formula::or([c(0, "a"), c(0, "b")]);
        assert_eq!(o.satisfiable(&[root.clone()]), SatResult::Sat);
        assert_eq!(
            o.satisfiable(&[
                root.clone(),
                Formula::not(c(0, "a")),
                Formula::not(c(0, "b"))
            ]),
            SatResult::Unsat
        );
        assert_eq!(
            o.satisfiable(&[
                root,
                Formula::implies(c(0, "a"), t("n = 1")),
                Formula::implies(c(0, "b"), t("n = 2")),
                t("n = 3"),
            ]),
            SatResult::Unsat
        );
    }
}

#[test]
fn scopes_are_undone() {
    for mut o in common::oracles() {
        o.assert(&[t("a = 1")]);
        o.push();
        o.assert(&[t("a = 2")]);
        assert_eq!(o.check_sat(&[]), SatResult::Unsat);
        o.pop();
        assert_eq!(o.check_sat(&[]), SatResult::Sat);
    }
}

#[test]
#[should_panic]
fn unmatched_pop_panics() {
    let mut o = common::oracle();
    o.pop();
}

#[test]
#[should_panic]
fn unmatched_pop_panics_bundled() {
    let mut o = Bundled::new(bundled::Config::default());
    o.pop();
}

#[test]
fn cores_are_minimal_subsets_of_assumptions() {
    for mut o in common::oracles() {
        o.assert(&[t("out = 3")]);

        let assumptions =
            vec![t("a = 1"), t("out = a + b"), t("b = 1"), t("c = 7")];
        assert_eq!(o.check_sat(&assumptions), SatResult::Unsat);

        let core = o.unsat_core();
        assert_eq!(core.len(), 3, "{}: {:?}", o.name(), core);
        assert!(!core.contains(&t("c = 7")));
        assert!(core.iter().all(|f| assumptions.contains(f)));

        o.push();
        o.assert(&core);
        assert_eq!(o.check_sat(&[]), SatResult::Unsat);
        o.pop();

        assert_eq!(o.check_sat(&[t("a = 1")]), SatResult::Sat);
        assert!(o.unsat_core().is_empty());
    }
}

#[test]
fn validity() {
    for mut o in common::oracles() {
        assert_eq!(
            o.valid(&[t("o.len = 2"), t("o.first = 97")], &t("o.len = 2")),
            Validity::Valid
        );
        assert_eq!(
            o.valid(&[t("o.len = in.x.len")], &t("o.len = 2")),
            Validity::Invalid
        );
        assert_eq!(
            o.valid(&[t("o = a + b"), t("0 < a"), t("0 < b")], &t("2 <= o")),
            Validity::Valid
        );
    }
}

#[test]
fn wide_values_are_exact() {
    let min = i64::MIN;
    let max = i64::MAX;
    for mut o in common::oracles() {
        let pinned = [
            Formula::Eq(Term::var("a"), Term::Const(min)),
            Formula::Eq(Term::var("b"), Term::Const(max)),
        ];
        assert_eq!(o.satisfiable(&pinned), SatResult::Sat, "{}", o.name());

        // a - b = i64::MIN - i64::MAX does not fit in an i64
        let mut gap = pinned.to_vec();
        gap.push(Formula::Eq(
            Term::Sub(Box::new(Term::var("a")), Box::new(Term::var("b"))),
            Term::Sub(Box::new(Term::Const(min)), Box::new(Term::Const(max))),
        ));
        assert_eq!(o.satisfiable(&gap), SatResult::Sat, "{}", o.name());

        let mut off = pinned.to_vec();
        off.push(Formula::Eq(Term::var("a"), Term::var("b")));
        assert_eq!(o.satisfiable(&off), SatResult::Unsat, "{}", o.name());
    }
}

#[test]
fn pinned_values_ignore_the_search_window() {
    let mut o = Bundled::new(bundled::Config {
        bound: 10,
        ..bundled::Config::default()
    });
    assert_eq!(o.satisfiable(&[t("a = 20013")]), SatResult::Sat);
    assert_eq!(
        o.satisfiable(&[t("a = b + 1"), t("b = 5000"), t("0 < a")]),
        SatResult::Sat
    );
    assert_eq!(o.satisfiable(&[t("a = 5001"), t("a < 5000")]), SatResult::Unsat);
}

#[test]
fn windowed_refutation_is_unknown() {
    let mut o = Bundled::new(bundled::Config {
        bound: 10,
        ..bundled::Config::default()
    });
    // b lies far outside the window, but follows from a
    assert_eq!(
        o.satisfiable(&[t("0 <= a"), t("b = a + 1000000"), t("b != 1000000")]),
        SatResult::Sat
    );
    assert_eq!(
        o.satisfiable(&[t("x - y = 1"), t("y - x = 1")]),
        SatResult::Unknown
    );
}

#[test]
fn exhausted_budget_is_unknown() {
    let mut o = Bundled::new(bundled::Config {
        node_budget: 1,
        ..bundled::Config::default()
    });
    assert_eq!(
        o.satisfiable(&[t("a + b = 7"), t("a != b")]),
        SatResult::Unknown
    );
}
